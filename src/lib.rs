//! Reproxy geolocation plugin library.

pub mod config;
pub mod geo;
pub mod lifecycle;
pub mod observability;
pub mod plugin;

pub use config::PluginConfig;
pub use geo::{FieldSelection, GeoLocator, GeoRecord, GeoStore};
pub use lifecycle::Shutdown;
pub use plugin::{GeoHandler, PluginServer};
