//! Geolocation record returned by a lookup.

use crate::geo::fields::Field;

/// Attributes associated with an IP address.
///
/// Attributes the database does not carry are left empty (or `0.0`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoRecord {
    pub country_long: String,
    pub country_short: String,
    pub region: String,
    pub city: String,
    pub isp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub domain: String,
    pub zipcode: String,
    pub timezone: String,
    pub netspeed: String,
    pub iddcode: String,
    pub areacode: String,
    pub weather_station_code: String,
    pub weather_station_name: String,
    pub mcc: String,
    pub mnc: String,
    pub mobile_brand: String,
    pub elevation: f64,
    pub usage_type: String,
}

impl GeoRecord {
    /// Header value for a field.
    ///
    /// Coordinates use 8 decimal places, elevation 4; strings pass through.
    pub fn value(&self, field: Field) -> String {
        match field {
            Field::CountryFull => self.country_long.clone(),
            Field::CountryCode => self.country_short.clone(),
            Field::Region => self.region.clone(),
            Field::City => self.city.clone(),
            Field::Isp => self.isp.clone(),
            Field::Latitude => format!("{:.8}", self.latitude),
            Field::Longitude => format!("{:.8}", self.longitude),
            Field::Domain => self.domain.clone(),
            Field::Zipcode => self.zipcode.clone(),
            Field::Timezone => self.timezone.clone(),
            Field::Netspeed => self.netspeed.clone(),
            Field::IddCode => self.iddcode.clone(),
            Field::AreaCode => self.areacode.clone(),
            Field::WeatherStationCode => self.weather_station_code.clone(),
            Field::WeatherStationName => self.weather_station_name.clone(),
            Field::Mcc => self.mcc.clone(),
            Field::Mnc => self.mnc.clone(),
            Field::MobileBrand => self.mobile_brand.clone(),
            Field::Elevation => format!("{:.4}", self.elevation),
            Field::UsageType => self.usage_type.clone(),
        }
    }
}
