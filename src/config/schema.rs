//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the plugin.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the plugin.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PluginConfig {
    /// Plugin server listener.
    pub listener: ListenerConfig,

    /// Plugin host (reverse proxy) registration.
    pub host: HostConfig,

    /// Geolocation database.
    pub database: DatabaseConfig,

    /// Header emission.
    pub headers: HeadersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080"). Also announced to the host.
    pub address: String,

    /// Per-call timeout in seconds.
    pub request_timeout_secs: u64,
}

impl ListenerConfig {
    /// Address to bind. An empty host (`":8080"`) means all interfaces.
    pub fn bind_address(&self) -> String {
        if self.address.starts_with(':') {
            format!("0.0.0.0{}", self.address)
        } else {
            self.address.clone()
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 5,
        }
    }
}

/// Plugin host configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    /// Host plugin endpoint URL.
    pub endpoint: String,

    /// Name the plugin registers under; calls arrive as `<name>.HeaderThing`.
    pub plugin_name: String,

    /// Register with the host on startup.
    pub register: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8081".to_string(),
            plugin_name: "geo".to_string(),
            register: true,
        }
    }
}

/// Geolocation database configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the MMDB file.
    pub path: String,

    /// Read the whole file into memory instead of mapping it.
    pub in_memory: bool,
}

/// Header emission configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// Comma-separated field codes.
    pub fields: String,

    /// Prefix prepended to every header name.
    pub prefix: String,

    /// Header carrying the client IP; empty means use the remote address.
    pub ip_source: String,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            fields: "CF,CC,REG,CITY".to_string(),
            prefix: "X-Geo-".to_string(),
            ip_source: String::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus endpoint bind address; disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}
