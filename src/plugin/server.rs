//! Plugin server.
//!
//! # Responsibilities
//! - Create the Axum router for plugin calls
//! - Wire up middleware (tracing, request timeout)
//! - Dispatch JSON-RPC calls to the handler
//! - Serve until the shutdown future resolves
//!
//! # Design Decisions
//! - Handler failures travel in the reply's `error` field, the HTTP status stays 200
//! - Lookups are synchronous and short, so they run inline on the worker
//!
//! # Compatibility
//! Calls are JSON-RPC 1.0 envelopes carried in HTTP `POST /` bodies. A stock
//! reproxy host dials plugins with Go `net/rpc` JSON codec over a raw TCP
//! stream, which this server does not speak. Registering with such a host
//! succeeds but its `HeaderThing` calls will fail; front the plugin with an
//! HTTP-speaking host or bridge, or set `host.register = false`.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::observability::metrics;
use crate::plugin::handler::GeoHandler;
use crate::plugin::protocol::{PluginRequest, RpcCall, RpcReply, HEADER_THING};

/// State injected into request handlers.
#[derive(Clone)]
pub struct ServerState {
    pub handler: Arc<GeoHandler>,
    /// Service name the host uses in `<Service>.<Method>`.
    pub service: Arc<str>,
}

/// HTTP server answering plugin calls from the host.
pub struct PluginServer {
    router: Router,
}

impl PluginServer {
    pub fn new(handler: Arc<GeoHandler>, service: &str, request_timeout: Duration) -> Self {
        let state = ServerState {
            handler,
            service: Arc::from(service),
        };
        Self {
            router: Self::build_router(state, request_timeout),
        }
    }

    #[allow(deprecated)]
    fn build_router(state: ServerState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/", post(rpc_handler))
            .route("/ping", get(ping))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Plugin server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Plugin server stopped");
        Ok(())
    }
}

async fn ping() -> &'static str {
    "pong"
}

async fn rpc_handler(State(state): State<ServerState>, Json(call): Json<RpcCall>) -> Json<RpcReply> {
    let started = Instant::now();
    let reply = dispatch(&state, call);
    let outcome = match &reply.error {
        None => "ok",
        Some(_) => "error",
    };
    metrics::record_call(outcome, started);
    Json(reply)
}

/// Route a call to the handler and build the reply.
pub fn dispatch(state: &ServerState, call: RpcCall) -> RpcReply {
    let unknown = match call.target() {
        None => Some(format!("rpc: service/method request ill-formed: {}", call.method)),
        Some((service, _)) if service != &*state.service => {
            Some(format!("rpc: can't find service {}", call.method))
        }
        Some((_, name)) if name != HEADER_THING => {
            Some(format!("rpc: can't find method {}", call.method))
        }
        Some(_) => None,
    };
    let RpcCall { params, id, .. } = call;
    if let Some(error) = unknown {
        return RpcReply::err(id, error);
    }

    let [param]: [Value; 1] = match params.try_into() {
        Ok(params) => params,
        Err(_) => return RpcReply::err(id, "rpc: invalid params"),
    };
    let request: PluginRequest = match serde_json::from_value(param) {
        Ok(request) => request,
        Err(e) => return RpcReply::err(id, format!("rpc: invalid params: {e}")),
    };

    match state.handler.header_thing(&request) {
        Ok(response) => RpcReply::ok(id, response),
        Err(e) => {
            tracing::warn!(
                remote_addr = %request.remote_addr,
                url = %request.url,
                kind = e.kind(),
                error = %e,
                "HeaderThing failed"
            );
            metrics::record_failure(e.kind());
            RpcReply::err(id, e.to_string())
        }
    }
}
