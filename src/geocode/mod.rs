//! Reverse geocoding: coordinates to place names, behind a shared cache and a rate limit.
mod cache;
mod client;
mod nominatim;
mod offline;

pub use cache::{CacheKey, GeocodeCache};
pub use client::{GeocodeProgress, GeocodingClient, GeocodingConfig};
pub use nominatim::NominatimBackend;
pub use offline::OfflineBackend;

use crate::features::gps::GeoCoordinate;
use crate::features::location::ResolvedLocation;
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geocoding service answered with status {0}")]
    Status(reqwest::StatusCode),

    #[error("Geocoding response contained no address")]
    NoAddress,
}

/// A reverse geocoding service.
pub trait ReverseGeocode: Send + Sync {
    fn reverse(
        &self,
        coordinate: GeoCoordinate,
    ) -> impl Future<Output = Result<ResolvedLocation, GeocodeError>> + Send;

    /// Whether calls must be spaced out by the client's call delay.
    fn is_rate_limited(&self) -> bool {
        true
    }
}
