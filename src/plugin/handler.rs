//! Request handler: client IP resolution and geolocation header mapping.
//!
//! # Responsibilities
//! - Resolve the client IP from a trusted header or the remote address
//! - Perform exactly one lookup per call
//! - Emit one `<prefix><suffix>` header per selected field
//!
//! # Design Decisions
//! - Trusted header names match case-insensitively
//! - Header values are taken verbatim; only the remote address is split as `host:port`
//! - A failed `host:port` split never falls back to a bare address
//! - Any failure yields no headers at all

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::geo::{FieldSelection, GeoLocator, GeoRecord, LookupError};
use crate::observability::metrics;
use crate::plugin::protocol::{Headers, PluginRequest, PluginResponse};

/// Failure to determine the client address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("missing port in address {0:?}")]
    MissingPort(String),

    #[error("too many colons in address {0:?}")]
    TooManyColons(String),

    #[error("missing ']' in address {0:?}")]
    MissingBracket(String),

    #[error("unexpected bracket in address {0:?}")]
    UnexpectedBracket(String),

    /// The candidate is empty or not an IP literal.
    #[error("wrong ip")]
    WrongIp,
}

/// Request-scoped failure of a `HeaderThing` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("error get ip, {0}")]
    Resolve(#[from] ResolveError),

    #[error("error get geolocation data for address {ip}, {source}")]
    Lookup {
        ip: IpAddr,
        #[source]
        source: LookupError,
    },
}

impl HandlerError {
    /// Short label used for the metrics outcome.
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerError::Resolve(_) => "resolve_error",
            HandlerError::Lookup {
                source: LookupError::NotFound,
                ..
            } => "not_found",
            HandlerError::Lookup { .. } => "lookup_error",
        }
    }
}

/// Split `host:port`. IPv6 hosts must be bracketed; the port must be present
/// but may be empty.
pub fn split_host_port(addr: &str) -> Result<(&str, &str), ResolveError> {
    let fail = |kind: fn(String) -> ResolveError| kind(addr.to_string());

    let colon = addr
        .rfind(':')
        .ok_or_else(|| fail(ResolveError::MissingPort))?;

    let (host, open_from, close_from) = if addr.starts_with('[') {
        let end = addr
            .find(']')
            .ok_or_else(|| fail(ResolveError::MissingBracket))?;
        if end + 1 == addr.len() {
            return Err(fail(ResolveError::MissingPort));
        }
        if end + 1 != colon {
            return Err(if addr.as_bytes()[end + 1] == b':' {
                fail(ResolveError::TooManyColons)
            } else {
                fail(ResolveError::MissingPort)
            });
        }
        (&addr[1..end], 1, end + 1)
    } else {
        let host = &addr[..colon];
        if host.contains(':') {
            return Err(fail(ResolveError::TooManyColons));
        }
        (host, 0, 0)
    };

    if addr[open_from..].contains('[') || addr[close_from..].contains(']') {
        return Err(fail(ResolveError::UnexpectedBracket));
    }
    Ok((host, &addr[colon + 1..]))
}

/// Parse an IP literal into its canonical form.
///
/// IPv4-mapped IPv6 addresses are reported as IPv4.
pub fn parse_ip(candidate: &str) -> Result<IpAddr, ResolveError> {
    candidate
        .parse::<IpAddr>()
        .map(|ip| ip.to_canonical())
        .map_err(|_| ResolveError::WrongIp)
}

/// Handles `HeaderThing` calls.
pub struct GeoHandler {
    locator: Arc<dyn GeoLocator>,
    fields: FieldSelection,
    header_prefix: String,
    ip_source: Option<String>,
}

impl GeoHandler {
    /// Create a handler. An empty `ip_source` means "use the remote address".
    pub fn new(
        locator: Arc<dyn GeoLocator>,
        fields: FieldSelection,
        header_prefix: impl Into<String>,
        ip_source: Option<String>,
    ) -> Self {
        Self {
            locator,
            fields,
            header_prefix: header_prefix.into(),
            ip_source: ip_source.filter(|s| !s.is_empty()),
        }
    }

    pub fn fields(&self) -> FieldSelection {
        self.fields
    }

    pub fn header_prefix(&self) -> &str {
        &self.header_prefix
    }

    pub fn ip_source(&self) -> Option<&str> {
        self.ip_source.as_deref()
    }

    /// Determine the client address for a request.
    pub fn resolve_client_ip(&self, req: &PluginRequest) -> Result<IpAddr, ResolveError> {
        let from_header = self
            .ip_source
            .as_deref()
            .and_then(|name| req.header.get(name))
            .filter(|v| !v.is_empty());

        let candidate = match from_header {
            Some(value) => value,
            None => split_host_port(&req.remote_addr)?.0,
        };

        parse_ip(candidate)
    }

    /// Append one header per selected field. Existing headers are kept.
    pub fn map_fields(&self, record: &GeoRecord, headers: &mut Headers) {
        for field in self.fields.iter() {
            headers.add(
                format!("{}{}", self.header_prefix, field.header_suffix()),
                record.value(field),
            );
        }
    }

    /// Serve one `HeaderThing` call.
    pub fn header_thing(&self, req: &PluginRequest) -> Result<PluginResponse, HandlerError> {
        let ip = self.resolve_client_ip(req)?;

        let started = Instant::now();
        let lookup = self.locator.locate(ip);
        metrics::record_lookup(started);
        let record = lookup.map_err(|source| HandlerError::Lookup { ip, source })?;

        let mut response = PluginResponse::default();
        self.map_fields(&record, &mut response.headers_in);

        tracing::debug!(
            client_ip = %ip,
            headers = response.headers_in.len(),
            "Geolocation headers mapped"
        );
        Ok(response)
    }
}
