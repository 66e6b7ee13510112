//! Geolocation subsystem.
//!
//! # Data Flow
//! ```text
//! fields option ("CF,CC,REG,CITY")
//!     → fields.rs (parse into FieldSelection, once at startup)
//!
//! database file
//!     → store.rs (buffer or mmap → maxminddb::Reader)
//!     → GeoLocator::locate(ip) → record.rs (GeoRecord)
//!     → GeoRecord::value(field) (header value text)
//! ```

pub mod fields;
pub mod record;
pub mod store;

pub use fields::{Field, FieldError, FieldSelection};
pub use record::GeoRecord;
pub use store::{GeoLocator, GeoStore, LookupError, StoreError};
