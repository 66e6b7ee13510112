//! Reproxy geolocation plugin.
//!
//! Looks up the client address of every proxied request in a local MMDB
//! geolocation database and hands the selected attributes back to reproxy as
//! request headers.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌────────────────────────────────────────────────┐
//!                    │               GEO PLUGIN                        │
//!   reproxy          │  ┌─────────┐   ┌──────────┐   ┌────────────┐   │
//!   HeaderThing ─────┼─▶│ plugin  │──▶│ handler  │──▶│ geo store  │   │
//!   call             │  │ server  │   │ client IP│   │ (maxminddb)│   │
//!                    │  └────┬────┘   └────┬─────┘   └────────────┘   │
//!   HeadersIn  ◀─────┼───────┘             │ map fields                │
//!                    │                     ▼                           │
//!                    │            X-Geo-Country, X-Geo-City, ...       │
//!                    │                                                 │
//!                    │  config · lifecycle · observability · register  │
//!                    └────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use reproxy_geo_plugin::config::{load_config, Cli};
use reproxy_geo_plugin::lifecycle;
use reproxy_geo_plugin::observability::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            logging::init(cli.log_level.as_deref().unwrap_or("info"));
            tracing::error!(error = %e, "Configuration rejected");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "reproxy-geo-plugin starting");
    tracing::info!(
        listen = %config.listener.address,
        host_endpoint = %config.host.endpoint,
        plugin_name = %config.host.plugin_name,
        database = %config.database.path,
        in_memory = config.database.in_memory,
        "Configuration loaded"
    );

    if let Err(e) = lifecycle::run(config).await {
        tracing::error!(error = %e, "Plugin failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
