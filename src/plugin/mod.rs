//! Plugin subsystem.
//!
//! # Data Flow
//! ```text
//! host proxy ──POST / {method, params:[Request], id}──▶ server.rs
//!     → handler.rs (resolve client IP → GeoLocator → map fields)
//!     → {id, result: Response{HeadersIn}, error} ──▶ host proxy
//!
//! startup:  registration.rs ──POST {Name, Address, Methods}──▶ host
//! shutdown: registration.rs ──DELETE──▶ host
//! ```

pub mod handler;
pub mod protocol;
pub mod registration;
pub mod server;

pub use handler::{GeoHandler, HandlerError, ResolveError};
pub use protocol::{Headers, PluginRequest, PluginResponse, RpcCall, RpcReply, HEADER_THING};
pub use registration::{Registrar, Registration, RegistrationError, RetryPolicy};
pub use server::PluginServer;
