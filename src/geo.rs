//! Geolocation lookup.

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use crate::error::{Error, Result};

/// Geolocation record for a client address.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeoRecord {
    pub country_name: Option<String>,
    pub country_code: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl GeoRecord {
    /// Whether the record carries plottable coordinates.
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Geolocation collaborator.
///
/// Implementations resolve a client address to a [`GeoRecord`]. Missing data
/// is `None`, never an error; callers treat absence as "no geo-keyed
/// aggregation for this client".
pub trait Locate {
    /// Look up the geolocation record for an address.
    fn locate(&self, ip: Ipv4Addr) -> Option<GeoRecord>;
}

/// Locator backed by a MaxMind GeoLite2 City database.
pub struct MaxMindLocator {
    reader: maxminddb::Reader<Vec<u8>>,
}

impl MaxMindLocator {
    /// Open a GeoLite2 City database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader =
            maxminddb::Reader::open_readfile(path).map_err(|e| Error::GeoIp(e.to_string()))?;
        log::info!("loaded GeoIP database from {}", path.display());
        Ok(Self { reader })
    }
}

impl Locate for MaxMindLocator {
    fn locate(&self, ip: Ipv4Addr) -> Option<GeoRecord> {
        #[derive(serde::Deserialize)]
        struct Names {
            en: Option<String>,
        }

        #[derive(serde::Deserialize)]
        struct Country {
            iso_code: Option<String>,
            names: Option<Names>,
        }

        #[derive(serde::Deserialize)]
        struct City {
            names: Option<Names>,
        }

        #[derive(serde::Deserialize)]
        struct Location {
            latitude: Option<f64>,
            longitude: Option<f64>,
        }

        #[derive(serde::Deserialize)]
        struct CityResponse {
            country: Option<Country>,
            city: Option<City>,
            location: Option<Location>,
        }

        let result: CityResponse = self.reader.lookup(IpAddr::V4(ip)).ok()?;

        let mut record = GeoRecord::default();
        if let Some(country) = result.country {
            record.country_code = country.iso_code;
            record.country_name = country.names.and_then(|n| n.en);
        }
        record.city = result.city.and_then(|c| c.names).and_then(|n| n.en);
        if let Some(location) = result.location {
            record.latitude = location.latitude;
            record.longitude = location.longitude;
        }
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLocator(GeoRecord);

    impl Locate for FixedLocator {
        fn locate(&self, _ip: Ipv4Addr) -> Option<GeoRecord> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn test_locate_trait_object() {
        let record = GeoRecord {
            country_name: Some("France".to_string()),
            country_code: Some("FR".to_string()),
            ..GeoRecord::default()
        };
        let locator: &dyn Locate = &FixedLocator(record);
        let looked_up = locator.locate(Ipv4Addr::new(192, 0, 2, 1)).unwrap();
        assert_eq!(looked_up.country_code.as_deref(), Some("FR"));
        assert!(!looked_up.has_coordinates());
    }

    #[test]
    fn test_has_coordinates() {
        let mut record = GeoRecord::default();
        assert!(!record.has_coordinates());
        record.latitude = Some(48.85);
        assert!(!record.has_coordinates());
        record.longitude = Some(2.35);
        assert!(record.has_coordinates());
    }

    #[test]
    fn test_missing_database_errors() {
        assert!(MaxMindLocator::open("/nonexistent/GeoLite2-City.mmdb").is_err());
    }
}
