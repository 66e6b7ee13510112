//! Geolocation database access.
//!
//! # Responsibilities
//! - Open an MMDB file either fully buffered in memory or memory-mapped
//! - Decode the record for an address into a `GeoRecord`
//!
//! # Design Decisions
//! - Binary format parsing and file mapping are delegated to `maxminddb`
//! - The backing is chosen once at startup; both readers share one lookup path
//! - The reader is immutable after open, so lookups need no locking

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use maxminddb::{MaxMindDBError, Metadata, Mmap, Reader};
use serde::Deserialize;
use thiserror::Error;

use crate::geo::record::GeoRecord;

/// Errors raised while opening the database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read database {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("invalid database {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

impl StoreError {
    fn open(path: &Path, err: MaxMindDBError) -> Self {
        let path = path.to_path_buf();
        match err {
            MaxMindDBError::IoError(reason) | MaxMindDBError::MapError(reason) => {
                StoreError::Io { path, reason }
            }
            other => StoreError::Invalid {
                path,
                reason: other.to_string(),
            },
        }
    }
}

/// Errors raised by a single lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The database has no record for the address.
    #[error("address not found in database")]
    NotFound,

    /// The record could not be read or decoded.
    #[error("database error: {0}")]
    Database(String),
}

impl From<MaxMindDBError> for LookupError {
    fn from(err: MaxMindDBError) -> Self {
        match err {
            MaxMindDBError::AddressNotFoundError(_) => LookupError::NotFound,
            other => LookupError::Database(other.to_string()),
        }
    }
}

/// Lookup seam used by the request handler.
pub trait GeoLocator: Send + Sync {
    /// Find the geolocation record for an address.
    fn locate(&self, ip: IpAddr) -> Result<GeoRecord, LookupError>;
}

enum DbReader {
    /// Whole file read into a heap buffer.
    Memory(Reader<Vec<u8>>),
    /// Read-only mapping of the file.
    Mapped(Reader<Mmap>),
}

impl DbReader {
    fn metadata(&self) -> &Metadata {
        match self {
            DbReader::Memory(reader) => &reader.metadata,
            DbReader::Mapped(reader) => &reader.metadata,
        }
    }

    fn lookup(&self, ip: IpAddr) -> Result<MmdbRecord<'_>, MaxMindDBError> {
        match self {
            DbReader::Memory(reader) => reader.lookup(ip),
            DbReader::Mapped(reader) => reader.lookup(ip),
        }
    }
}

/// Opened geolocation database.
pub struct GeoStore {
    reader: DbReader,
}

impl GeoStore {
    /// Open the database at `path`.
    ///
    /// With `in_memory` the file is read fully into a buffer, otherwise it is
    /// memory-mapped.
    pub fn open(path: impl AsRef<Path>, in_memory: bool) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let reader = if in_memory {
            Reader::<Vec<u8>>::open_readfile(path).map(DbReader::Memory)
        } else {
            Reader::<Mmap>::open_mmap(path).map(DbReader::Mapped)
        }
        .map_err(|e| StoreError::open(path, e))?;

        let metadata = reader.metadata();
        tracing::info!(
            path = %path.display(),
            in_memory,
            database_type = %metadata.database_type,
            build_epoch = metadata.build_epoch,
            ip_version = metadata.ip_version,
            "Geolocation database opened"
        );

        Ok(Self { reader })
    }

    pub fn database_type(&self) -> &str {
        &self.reader.metadata().database_type
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self.reader, DbReader::Memory(_))
    }
}

impl GeoLocator for GeoStore {
    fn locate(&self, ip: IpAddr) -> Result<GeoRecord, LookupError> {
        Ok(self.reader.lookup(ip)?.into_record())
    }
}

/// Record layout as stored in the database.
///
/// Location data follows the GeoIP2 City shape; the network attributes are
/// read from flat top-level keys when the database provides them.
#[derive(Debug, Default, Deserialize)]
struct MmdbRecord<'a> {
    #[serde(borrow)]
    country: Option<Place<'a>>,
    #[serde(borrow)]
    subdivisions: Option<Vec<Place<'a>>>,
    #[serde(borrow)]
    city: Option<Place<'a>>,
    #[serde(borrow)]
    location: Option<Location<'a>>,
    #[serde(borrow)]
    postal: Option<Postal<'a>>,
    #[serde(borrow)]
    isp: Option<&'a str>,
    #[serde(borrow)]
    domain: Option<&'a str>,
    #[serde(borrow)]
    net_speed: Option<&'a str>,
    #[serde(borrow)]
    idd_code: Option<&'a str>,
    #[serde(borrow)]
    area_code: Option<&'a str>,
    #[serde(borrow)]
    weather_station_code: Option<&'a str>,
    #[serde(borrow)]
    weather_station_name: Option<&'a str>,
    #[serde(borrow)]
    mcc: Option<&'a str>,
    #[serde(borrow)]
    mobile_country_code: Option<&'a str>,
    #[serde(borrow)]
    mnc: Option<&'a str>,
    #[serde(borrow)]
    mobile_network_code: Option<&'a str>,
    #[serde(borrow)]
    mobile_brand: Option<&'a str>,
    elevation: Option<f64>,
    #[serde(borrow)]
    usage_type: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct Place<'a> {
    #[serde(borrow)]
    iso_code: Option<&'a str>,
    #[serde(borrow)]
    names: Option<BTreeMap<&'a str, &'a str>>,
}

impl Place<'_> {
    fn english_name(&self) -> Option<&str> {
        self.names.as_ref()?.get("en").copied()
    }
}

#[derive(Debug, Default, Deserialize)]
struct Location<'a> {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(borrow)]
    time_zone: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct Postal<'a> {
    #[serde(borrow)]
    code: Option<&'a str>,
}

fn owned(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

impl MmdbRecord<'_> {
    fn into_record(self) -> GeoRecord {
        let location = self.location.unwrap_or_default();
        let region = self
            .subdivisions
            .as_deref()
            .and_then(|s| s.first())
            .and_then(|p| p.english_name());

        GeoRecord {
            country_long: owned(self.country.as_ref().and_then(|c| c.english_name())),
            country_short: owned(self.country.as_ref().and_then(|c| c.iso_code)),
            region: owned(region),
            city: owned(self.city.as_ref().and_then(|c| c.english_name())),
            isp: owned(self.isp),
            latitude: location.latitude.unwrap_or_default(),
            longitude: location.longitude.unwrap_or_default(),
            domain: owned(self.domain),
            zipcode: owned(self.postal.and_then(|p| p.code)),
            timezone: owned(location.time_zone),
            netspeed: owned(self.net_speed),
            iddcode: owned(self.idd_code),
            areacode: owned(self.area_code),
            weather_station_code: owned(self.weather_station_code),
            weather_station_name: owned(self.weather_station_name),
            mcc: owned(self.mcc.or(self.mobile_country_code)),
            mnc: owned(self.mnc.or(self.mobile_network_code)),
            mobile_brand: owned(self.mobile_brand),
            elevation: self.elevation.unwrap_or_default(),
            usage_type: owned(self.usage_type),
        }
    }
}
