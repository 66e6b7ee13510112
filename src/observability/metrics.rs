//! Metrics collection and exposition.
//!
//! # Metrics
//! - `geo_plugin_calls_total` (counter): plugin calls by outcome (ok, error)
//! - `geo_plugin_failures_total` (counter): failed calls by kind
//! - `geo_plugin_call_duration_seconds` (histogram): full call latency
//! - `geo_plugin_lookup_duration_seconds` (histogram): database lookup latency
//! - `geo_plugin_registrations_total` (counter): host registration events
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus endpoint is optional

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_call(outcome: &'static str, started: Instant) {
    metrics::counter!("geo_plugin_calls_total", "outcome" => outcome).increment(1);
    metrics::histogram!("geo_plugin_call_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_failure(kind: &'static str) {
    metrics::counter!("geo_plugin_failures_total", "kind" => kind).increment(1);
}

pub fn record_lookup(started: Instant) {
    metrics::histogram!("geo_plugin_lookup_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_registration(result: &'static str) {
    metrics::counter!("geo_plugin_registrations_total", "result" => result).increment(1);
}
