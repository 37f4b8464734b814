use crate::features::gps::GeoCoordinate;
use crate::features::location::{LocationSource, ResolvedLocation};
use crate::geocode::{GeocodeError, GeocodingConfig, ReverseGeocode};
use reqwest::StatusCode;
use serde::Deserialize;

/// OpenStreetMap Nominatim `reverse` endpoint.
pub struct NominatimBackend {
    http: reqwest::Client,
    endpoint: String,
    language: String,
    zoom: u8,
}

impl NominatimBackend {
    pub fn new(config: &GeocodingConfig) -> Result<Self, GeocodeError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            language: config.language.clone(),
            zoom: config.zoom,
        })
    }
}

impl ReverseGeocode for NominatimBackend {
    async fn reverse(&self, coordinate: GeoCoordinate) -> Result<ResolvedLocation, GeocodeError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("lat", coordinate.latitude().to_string()),
                ("lon", coordinate.longitude().to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("zoom", self.zoom.to_string()),
                ("accept-language", self.language.clone()),
            ])
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(GeocodeError::Status(status));
        }
        let body: NominatimResponse = response.json().await?;
        body.into_location(coordinate)
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    region: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

impl NominatimResponse {
    fn into_location(self, coordinate: GeoCoordinate) -> Result<ResolvedLocation, GeocodeError> {
        let address = self.address.ok_or(GeocodeError::NoAddress)?;
        Ok(ResolvedLocation {
            city: address.city.or(address.town).or(address.village),
            region: address.state.or(address.region),
            country: address.country,
            country_code: address.country_code.map(|code| code.to_uppercase()),
            full_address: self.display_name,
            coordinates: coordinate,
            source: LocationSource::GeocodedNow,
        })
    }
}
