//! Plugin call shapes exchanged with the reverse-proxy host.
//!
//! # Responsibilities
//! - Request/response bodies of the `HeaderThing` call
//! - Header multimap with Go `http.Header` JSON layout
//! - JSON-RPC 1.0 call/reply envelope
//!
//! # Design Decisions
//! - Field names follow the host's PascalCase JSON encoding
//! - `null` maps and arrays decode as empty values
//! - Unknown request fields (route match details, etc.) are ignored

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Name of the single method this plugin serves.
pub const HEADER_THING: &str = "HeaderThing";

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Header multimap: name → values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, Vec<String>>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `name`, keeping any existing values.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    /// First value for `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .find_map(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// All values stored under exactly `name`.
    pub fn values(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}

/// Proxied request as forwarded by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PluginRequest {
    #[serde(rename = "URL")]
    pub url: String,
    /// Connection peer, `host:port`.
    pub remote_addr: String,
    pub host: String,
    #[serde(deserialize_with = "nullable")]
    pub header: Headers,
    pub route: String,
}

/// Changes the host applies to the request before forwarding it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PluginResponse {
    pub status_code: u16,
    /// Headers merged into the upstream request.
    #[serde(deserialize_with = "nullable")]
    pub headers_in: Headers,
    #[serde(deserialize_with = "nullable")]
    pub headers_out: Headers,
    pub override_headers_in: bool,
    pub override_headers_out: bool,
}

/// JSON-RPC 1.0 call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcCall {
    /// `<Service>.<Method>`
    pub method: String,
    #[serde(default, deserialize_with = "nullable")]
    pub params: Vec<Value>,
    #[serde(default)]
    pub id: Value,
}

impl RpcCall {
    /// Split `method` into service and method name at the last dot.
    pub fn target(&self) -> Option<(&str, &str)> {
        self.method.rsplit_once('.')
    }
}

/// JSON-RPC 1.0 reply. Exactly one of `result` and `error` is non-null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReply {
    pub id: Value,
    pub result: Option<PluginResponse>,
    pub error: Option<String>,
}

impl RpcReply {
    pub fn ok(id: Value, result: PluginResponse) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Value, error: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.into()),
        }
    }
}
