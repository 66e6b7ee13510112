//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the geolocation database and build the handler
//! - Bind the listener, register with the host, serve until shutdown
//! - Withdraw the registration on the way out
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The database opens before the listener binds (traffic only when ready)
//! - Registration runs after bind, so the host can connect immediately
//! - Failed registration stops the plugin instead of serving unannounced

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::PluginConfig;
use crate::geo::{FieldError, FieldSelection, GeoStore, StoreError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::observability::metrics;
use crate::plugin::{GeoHandler, PluginServer, Registrar, Registration, RegistrationError};

/// Fatal errors before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid field selection: {0}")]
    Fields(#[from] FieldError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics exporter: {0}")]
    Metrics(String),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the plugin until a termination signal arrives.
pub async fn run(config: PluginConfig) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());
    serve(config, shutdown).await
}

/// Run the plugin until `shutdown` is triggered.
///
/// Registration runs in the background once the listener is bound. If the
/// host never accepts it, shutdown is triggered and the registration error is
/// returned: a plugin the host does not know about receives no calls.
pub async fn serve(config: PluginConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let fields = FieldSelection::parse(&config.headers.fields)?;
    let store = Arc::new(GeoStore::open(&config.database.path, config.database.in_memory)?);
    let handler = Arc::new(GeoHandler::new(
        store,
        fields,
        config.headers.prefix.clone(),
        Some(config.headers.ip_source.clone()),
    ));
    tracing::info!(
        fields = %handler.fields(),
        prefix = %handler.header_prefix(),
        ip_source = handler.ip_source().unwrap_or("<remote address>"),
        "Handler ready"
    );

    if let Some(addr) = &config.observability.metrics_address {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e: std::net::AddrParseError| StartupError::Metrics(e.to_string()))?;
        metrics::init_metrics(addr).map_err(|e| StartupError::Metrics(e.to_string()))?;
    }

    let bind_address = config.listener.bind_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: bind_address.clone(),
            source,
        })?;

    let registrar = if config.host.register {
        let registration =
            Registration::header_thing(&config.host.plugin_name, &config.listener.address);
        Some(Arc::new(Registrar::new(&config.host.endpoint, registration)?))
    } else {
        tracing::info!("Host registration disabled");
        None
    };

    // Resolves to None when shutdown wins before registration completes.
    let registration_task = registrar.clone().map(|registrar| {
        let shutdown = shutdown.clone();
        let stopped = shutdown.wait();
        tokio::spawn(async move {
            tokio::select! {
                result = registrar.register() => {
                    if let Err(e) = &result {
                        tracing::error!(error = %e, "Registration with plugin host failed, shutting down");
                        shutdown.trigger();
                    }
                    Some(result)
                }
                _ = stopped => None,
            }
        })
    });

    let server = PluginServer::new(
        handler,
        &config.host.plugin_name,
        Duration::from_secs(config.listener.request_timeout_secs),
    );
    let served = server.run(listener, shutdown.wait()).await;

    let registered = match registration_task {
        Some(task) => match task.await {
            Ok(Some(Ok(()))) => true,
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Registration task did not complete");
                false
            }
        },
        None => false,
    };

    if let (true, Some(registrar)) = (registered, registrar) {
        if let Err(e) = registrar.unregister().await {
            tracing::warn!(error = %e, "Failed to unregister from plugin host");
        }
    }

    served.map_err(StartupError::Serve)
}
