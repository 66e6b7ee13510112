//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (flags / environment override file values)
//!     → validation.rs (semantic checks)
//!     → PluginConfig (validated, immutable)
//!     → values moved into the handler and server at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults except the database path
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{load_config, ConfigError};
pub use schema::{DatabaseConfig, HeadersConfig, HostConfig, ListenerConfig, PluginConfig};
pub use validation::ValidationError;
