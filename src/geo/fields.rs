//! Field selection.
//!
//! # Responsibilities
//! - Map configuration short codes ("CF", "LAT", ...) to record attributes
//! - Parse the comma-separated field list into an immutable set
//! - Provide the header suffix emitted for each field
//!
//! # Design Decisions
//! - Codes match case-sensitively
//! - Parsing is all-or-nothing: one unknown code rejects the whole list
//! - The set is a bitmask over `Field`, iteration follows declaration order

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing a field list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// A token did not match any known field code.
    #[error("field {0:?} not supported")]
    Unsupported(String),

    /// The field list was empty.
    #[error("field list is empty")]
    Empty,
}

/// A geolocation attribute that can be emitted as a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    CountryFull,
    CountryCode,
    Region,
    City,
    Isp,
    Latitude,
    Longitude,
    Domain,
    Zipcode,
    Timezone,
    Netspeed,
    IddCode,
    AreaCode,
    WeatherStationCode,
    WeatherStationName,
    Mcc,
    Mnc,
    MobileBrand,
    Elevation,
    UsageType,
}

impl Field {
    /// Every field, in header emission order.
    pub const ALL: [Field; 20] = [
        Field::CountryFull,
        Field::CountryCode,
        Field::Region,
        Field::City,
        Field::Isp,
        Field::Latitude,
        Field::Longitude,
        Field::Domain,
        Field::Zipcode,
        Field::Timezone,
        Field::Netspeed,
        Field::IddCode,
        Field::AreaCode,
        Field::WeatherStationCode,
        Field::WeatherStationName,
        Field::Mcc,
        Field::Mnc,
        Field::MobileBrand,
        Field::Elevation,
        Field::UsageType,
    ];

    /// Short code used in the `fields` option.
    pub fn code(self) -> &'static str {
        match self {
            Field::CountryFull => "CF",
            Field::CountryCode => "CC",
            Field::Region => "REG",
            Field::City => "CITY",
            Field::Isp => "ISP",
            Field::Latitude => "LAT",
            Field::Longitude => "LON",
            Field::Domain => "DOM",
            Field::Zipcode => "ZIP",
            Field::Timezone => "TZ",
            Field::Netspeed => "NS",
            Field::IddCode => "IDD",
            Field::AreaCode => "AREA",
            Field::WeatherStationCode => "WEC",
            Field::WeatherStationName => "WEN",
            Field::Mcc => "MCC",
            Field::Mnc => "MNC",
            Field::MobileBrand => "MB",
            Field::Elevation => "EL",
            Field::UsageType => "UT",
        }
    }

    /// Header name suffix appended to the configured prefix.
    pub fn header_suffix(self) -> &'static str {
        match self {
            Field::CountryFull => "Country",
            Field::CountryCode => "Country-Code",
            Field::Region => "Region",
            Field::City => "City",
            Field::Isp => "Isp",
            Field::Latitude => "Latitude",
            Field::Longitude => "Longitude",
            Field::Domain => "Domain",
            Field::Zipcode => "Zipcode",
            Field::Timezone => "Timezone",
            Field::Netspeed => "Netspeed",
            Field::IddCode => "Iddcode",
            Field::AreaCode => "Areacode",
            Field::WeatherStationCode => "Weatherstationcode",
            Field::WeatherStationName => "Weatherstationname",
            Field::Mcc => "Mcc",
            Field::Mnc => "Mnc",
            Field::MobileBrand => "Mobilebrand",
            Field::Elevation => "Elevation",
            Field::UsageType => "Usagetype",
        }
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl FromStr for Field {
    type Err = FieldError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.code() == code)
            .ok_or_else(|| FieldError::Unsupported(code.to_string()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Immutable set of fields selected for header emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldSelection {
    bits: u32,
}

impl FieldSelection {
    /// Parse a comma-separated list of field codes, e.g. `"CF,CC,REG,CITY"`.
    pub fn parse(list: &str) -> Result<Self, FieldError> {
        if list.is_empty() {
            return Err(FieldError::Empty);
        }

        let mut selection = Self::default();
        for token in list.split(',') {
            selection.insert(token.parse()?);
        }
        Ok(selection)
    }

    /// Add a field to the selection. Inserting twice is a no-op.
    pub fn insert(&mut self, field: Field) {
        self.bits |= field.bit();
    }

    pub fn contains(&self, field: Field) -> bool {
        self.bits & field.bit() != 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Selected fields in emission order.
    pub fn iter(&self) -> impl Iterator<Item = Field> {
        let selection = *self;
        Field::ALL.into_iter().filter(move |f| selection.contains(*f))
    }
}

impl FromStr for FieldSelection {
    type Err = FieldError;

    fn from_str(list: &str) -> Result<Self, Self::Err> {
        Self::parse(list)
    }
}

impl fmt::Display for FieldSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(field.code())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fields() {
        let selection = FieldSelection::parse("CF,CC,REG,CITY").unwrap();
        assert_eq!(selection.len(), 4);
        assert!(selection.contains(Field::CountryFull));
        assert!(selection.contains(Field::CountryCode));
        assert!(selection.contains(Field::Region));
        assert!(selection.contains(Field::City));
        assert!(!selection.contains(Field::Isp));
        assert!(!selection.contains(Field::Latitude));
    }

    #[test]
    fn test_all_codes_parse() {
        let all = Field::ALL.map(Field::code).join(",");
        let selection = FieldSelection::parse(&all).unwrap();
        assert_eq!(selection.len(), Field::ALL.len());
        for field in Field::ALL {
            assert_eq!(field.code().parse::<Field>().unwrap(), field);
        }
    }

    #[test]
    fn test_duplicates_are_idempotent() {
        let once = FieldSelection::parse("LAT").unwrap();
        let twice = FieldSelection::parse("LAT,LAT,LAT").unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn test_unknown_code_rejects_whole_list() {
        let err = FieldSelection::parse("CF,BAD").unwrap_err();
        assert_eq!(err, FieldError::Unsupported("BAD".into()));
        assert!(err.to_string().contains("BAD"));
    }

    #[test]
    fn test_codes_are_case_sensitive() {
        assert!(FieldSelection::parse("cf").is_err());
        assert!(FieldSelection::parse("City").is_err());
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(FieldSelection::parse(""), Err(FieldError::Empty));
        assert_eq!(
            FieldSelection::parse("CF,,CC"),
            Err(FieldError::Unsupported(String::new()))
        );
        // No trimming: whitespace is part of the token
        assert!(FieldSelection::parse("CF, CC").is_err());
    }

    #[test]
    fn test_iter_follows_declaration_order() {
        let selection = FieldSelection::parse("UT,CF,LAT").unwrap();
        let fields: Vec<Field> = selection.iter().collect();
        assert_eq!(fields, vec![Field::CountryFull, Field::Latitude, Field::UsageType]);
        assert_eq!(selection.to_string(), "CF,LAT,UT");
    }

    #[test]
    fn test_header_suffixes_are_unique() {
        let mut suffixes: Vec<&str> = Field::ALL.iter().map(|f| f.header_suffix()).collect();
        suffixes.sort_unstable();
        suffixes.dedup();
        assert_eq!(suffixes.len(), Field::ALL.len());
    }
}
