use crate::features::gps::GeoCoordinate;
use crate::features::location::{LocationSource, ResolvedLocation};
use crate::geocode::{GeocodeError, ReverseGeocode};
use reverse_geocoder::ReverseGeocoder;

/// Nearest-city lookup against the bundled GeoNames dataset. No network, no rate limit.
pub struct OfflineBackend {
    geocoder: ReverseGeocoder,
}

impl OfflineBackend {
    pub fn new() -> Self {
        Self {
            geocoder: ReverseGeocoder::new(),
        }
    }
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ReverseGeocode for OfflineBackend {
    async fn reverse(&self, coordinate: GeoCoordinate) -> Result<ResolvedLocation, GeocodeError> {
        let record = self
            .geocoder
            .search((coordinate.latitude(), coordinate.longitude()))
            .record;
        let country = rust_iso3166::from_alpha2(&record.cc).map(|country| country.name.to_string());
        let full_address = [
            Some(record.name.as_str()),
            Some(record.admin1.as_str()),
            country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

        Ok(ResolvedLocation {
            city: Some(record.name.clone()).filter(|name| !name.is_empty()),
            region: Some(record.admin1.clone()).filter(|admin1| !admin1.is_empty()),
            country,
            country_code: Some(record.cc.to_uppercase()),
            full_address: Some(full_address),
            coordinates: coordinate,
            source: LocationSource::GeocodedNow,
        })
    }

    fn is_rate_limited(&self) -> bool {
        false
    }
}
