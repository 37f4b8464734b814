use thiserror::Error;

/// The primary error type for the media-geotagger crate.
///
/// Per-file problems never surface here; they end up in [`crate::FileReport::error`].
#[derive(Error, Debug)]
pub enum GeotagError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not walk the directory tree")]
    Walk(#[from] walkdir::Error),

    #[error("Could not serialize the scan report")]
    Report(#[from] serde_json::Error),

    #[error("Geocoding client could not be created: {0}")]
    Geocode(#[from] crate::geocode::GeocodeError),

    #[error("Video probe could not be started: {0}")]
    Probe(#[from] crate::features::error::ProbeError),
}
