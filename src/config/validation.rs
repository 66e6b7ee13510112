//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, endpoint URL and header names
//! - Reject unsupported field codes before anything is served
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PluginConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::PluginConfig;
use crate::geo::{Field, FieldError, FieldSelection};
use crate::plugin::handler::split_host_port;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("database path is not set")]
    MissingDatabase,

    #[error("{field}: {value:?} is not a host:port address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("host endpoint {value:?} is invalid: {reason}")]
    InvalidEndpoint { value: String, reason: String },

    #[error("plugin name {0:?} must be non-empty and contain no '.'")]
    InvalidPluginName(String),

    #[error("{field}: {value:?} does not form a valid header name")]
    InvalidHeaderName { field: &'static str, value: String },

    #[error("fields: {0}")]
    Fields(#[from] FieldError),

    #[error("listener.request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("unknown log level {0:?}")]
    InvalidLogLevel(String),
}

/// Validate the whole configuration, collecting every problem.
pub fn validate_config(config: &PluginConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.database.path.is_empty() {
        errors.push(ValidationError::MissingDatabase);
    }

    if !is_listen_addr(&config.listener.address) {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.address",
            value: config.listener.address.clone(),
        });
    }
    if let Some(metrics) = &config.observability.metrics_address {
        check_socket_addr("observability.metrics_address", metrics, &mut errors);
    }

    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.host.register {
        if let Err(reason) = check_endpoint(&config.host.endpoint) {
            errors.push(ValidationError::InvalidEndpoint {
                value: config.host.endpoint.clone(),
                reason,
            });
        }
    }

    let name = &config.host.plugin_name;
    if name.is_empty() || name.contains('.') {
        errors.push(ValidationError::InvalidPluginName(name.clone()));
    }

    if let Err(e) = FieldSelection::parse(&config.headers.fields) {
        errors.push(e.into());
    }

    // Checked with the longest suffix so every emitted name is covered.
    let longest = Field::ALL
        .iter()
        .map(|f| f.header_suffix())
        .max_by_key(|s| s.len())
        .unwrap_or_default();
    if HeaderName::from_bytes(format!("{}{}", config.headers.prefix, longest).as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName {
            field: "headers.prefix",
            value: config.headers.prefix.clone(),
        });
    }

    let ip_source = &config.headers.ip_source;
    if !ip_source.is_empty() && HeaderName::from_bytes(ip_source.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName {
            field: "headers.ip_source",
            value: ip_source.clone(),
        });
    }

    if tracing::Level::from_str(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// `host:port` with a numeric port. The host may be empty (all interfaces),
/// an IP literal or a DNS name.
fn is_listen_addr(value: &str) -> bool {
    let Ok((host, port)) = split_host_port(value) else {
        return false;
    };
    port.parse::<u16>().is_ok()
        && (host.parse::<IpAddr>().is_ok()
            || host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.'))
}

fn check_endpoint(endpoint: &str) -> Result<(), String> {
    let url = Url::parse(endpoint).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme {other:?}")),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
