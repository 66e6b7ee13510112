//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::Method, http::StatusCode, routing::any, Json, Router};
use reproxy_geo_plugin::geo::{FieldSelection, GeoLocator, GeoRecord, LookupError};
use reproxy_geo_plugin::lifecycle::Shutdown;
use reproxy_geo_plugin::plugin::{GeoHandler, PluginServer, Registration};
use tokio::net::TcpListener;

/// In-memory locator keyed by address.
pub struct StaticLocator {
    records: HashMap<IpAddr, GeoRecord>,
}

impl StaticLocator {
    pub fn new(records: impl IntoIterator<Item = (&'static str, GeoRecord)>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|(ip, record)| (ip.parse().unwrap(), record))
                .collect(),
        }
    }
}

impl GeoLocator for StaticLocator {
    fn locate(&self, ip: IpAddr) -> Result<GeoRecord, LookupError> {
        self.records.get(&ip).cloned().ok_or(LookupError::NotFound)
    }
}

pub fn tokyo() -> GeoRecord {
    GeoRecord {
        country_long: "Japan".into(),
        country_short: "JP".into(),
        region: "Tokyo".into(),
        city: "Tokyo".into(),
        latitude: 35.6895,
        longitude: 139.6917,
        timezone: "Asia/Tokyo".into(),
        ..Default::default()
    }
}

pub fn handler(fields: &str, ip_source: Option<&str>) -> GeoHandler {
    let locator = StaticLocator::new([("10.20.30.40", tokyo())]);
    GeoHandler::new(
        Arc::new(locator),
        FieldSelection::parse(fields).unwrap(),
        "X-Geo-",
        ip_source.map(str::to_string),
    )
}

/// Start a plugin server on an ephemeral port.
pub async fn start_plugin_server(handler: GeoHandler, service: &str) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = PluginServer::new(Arc::new(handler), service, Duration::from_secs(5));
    let wait = shutdown.wait();
    tokio::spawn(async move {
        server.run(listener, wait).await.unwrap();
    });

    (addr, shutdown)
}

/// Reserve a free local port. The port is released before returning.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Mock plugin host recording registration calls.
#[derive(Clone)]
pub struct MockHost {
    pub addr: SocketAddr,
    pub calls: Arc<Mutex<Vec<(Method, Registration)>>>,
}

impl MockHost {
    pub fn endpoint(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn calls(&self) -> Vec<(Method, Registration)> {
        self.calls.lock().unwrap().clone()
    }
}

/// Start a mock host answering every call with `status`.
pub async fn start_mock_host(status: StatusCode) -> MockHost {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));

    async fn record(
        State((calls, status)): State<(Arc<Mutex<Vec<(Method, Registration)>>>, StatusCode)>,
        method: Method,
        Json(body): Json<Registration>,
    ) -> StatusCode {
        calls.lock().unwrap().push((method, body));
        status
    }

    let app = Router::new()
        .route("/", any(record))
        .with_state((calls.clone(), status));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockHost { addr, calls }
}

/// Minimal MMDB encoder for fixtures.
pub mod mmdb {
    pub fn string(s: &str) -> Vec<u8> {
        assert!(s.len() < 29, "short strings only");
        let mut out = vec![0x40 | s.len() as u8];
        out.extend_from_slice(s.as_bytes());
        out
    }

    pub fn double(v: f64) -> Vec<u8> {
        let mut out = vec![0x68];
        out.extend_from_slice(&v.to_be_bytes());
        out
    }

    pub fn uint16(v: u16) -> Vec<u8> {
        let mut out = vec![0xA2];
        out.extend_from_slice(&v.to_be_bytes());
        out
    }

    pub fn uint32(v: u32) -> Vec<u8> {
        let mut out = vec![0xC4];
        out.extend_from_slice(&v.to_be_bytes());
        out
    }

    pub fn uint64(v: u64) -> Vec<u8> {
        let mut out = vec![0x08, 0x02];
        out.extend_from_slice(&v.to_be_bytes());
        out
    }

    pub fn array(items: Vec<Vec<u8>>) -> Vec<u8> {
        let mut out = vec![items.len() as u8, 0x04];
        out.extend(items.into_iter().flatten());
        out
    }

    pub fn map(pairs: Vec<(&str, Vec<u8>)>) -> Vec<u8> {
        let mut out = vec![0xE0 | pairs.len() as u8];
        for (key, value) in pairs {
            out.extend(string(key));
            out.extend(value);
        }
        out
    }

    /// IPv4 database with one search node: 0.0.0.0/1 maps to `record`,
    /// 128.0.0.0/1 has no data.
    pub fn database(record: Vec<u8>) -> Vec<u8> {
        let node_count: u32 = 1;
        let data_pointer = node_count + 16;

        let mut buf = Vec::new();
        buf.extend_from_slice(&data_pointer.to_be_bytes()[1..]);
        buf.extend_from_slice(&node_count.to_be_bytes()[1..]);
        buf.extend_from_slice(&[0u8; 16]);
        buf.extend(record);
        buf.extend_from_slice(b"\xAB\xCD\xEFMaxMind.com");
        buf.extend(map(vec![
            ("binary_format_major_version", uint16(2)),
            ("binary_format_minor_version", uint16(0)),
            ("build_epoch", uint64(1_700_000_000)),
            ("database_type", string("Test-City")),
            ("description", map(vec![("en", string("fixture"))])),
            ("ip_version", uint16(4)),
            ("languages", array(vec![string("en")])),
            ("node_count", uint32(node_count)),
            ("record_size", uint16(24)),
        ]));
        buf
    }

    /// City-shaped record for Tokyo with a few network attributes.
    pub fn tokyo_record() -> Vec<u8> {
        map(vec![
            (
                "country",
                map(vec![
                    ("iso_code", string("JP")),
                    ("names", map(vec![("en", string("Japan")), ("ja", string("Nihon"))])),
                ]),
            ),
            (
                "subdivisions",
                array(vec![map(vec![("names", map(vec![("en", string("Tokyo"))]))])]),
            ),
            ("city", map(vec![("names", map(vec![("en", string("Shinjuku"))]))])),
            (
                "location",
                map(vec![
                    ("latitude", double(35.6938)),
                    ("longitude", double(139.7034)),
                    ("time_zone", string("Asia/Tokyo")),
                ]),
            ),
            ("postal", map(vec![("code", string("160-0022"))])),
            ("isp", string("Example ISP")),
            ("mobile_country_code", string("440")),
            ("elevation", double(38.5)),
        ])
    }
}

/// Write the Tokyo fixture database to a temporary file.
pub fn fixture_database() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&mmdb::database(mmdb::tokyo_record())).unwrap();
    file.flush().unwrap();
    file
}
