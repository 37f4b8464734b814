//! # Media Geotagger
//!
//! Check photo and video folders for capture dates and GPS positions, and tag photos with
//! the name of the place they were taken.
//!
//! This crate scans a directory tree, reads the EXIF block of images and the container
//! tags of videos, reverse geocodes GPS positions into place names, and can write those
//! names (plus any missing GPS fields) back into JPEG files without risking the original.
//!
//! ## Key Features
//!
//! - **GPS Codec**: Converts between decimal degrees and the EXIF rational degree/minute/second encoding.
//! - **Existing Locations**: Reads place names written by an earlier run from `GPSAreaInformation`, so those files never hit the network again.
//! - **Reverse Geocoding**: Nominatim lookups behind an in-memory cache keyed on a ~110 m grid, with a fixed delay after every call. An offline GeoNames backend is available too.
//! - **Safe Writes**: Every rewrite is backed up to `<file>.backup` first and restored if saving fails.
//! - **Reports**: Per-file results and directory statistics, exportable as JSON.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use media_geotagger::{Geotagger, GeocodeCache, GeocodingClient, GeocodingConfig, OfflineBackend};
//!
//! #[tokio::main]
//! async fn main() -> color_eyre::Result<()> {
//!     // Offline lookups need no network and no rate limit.
//!     let config = GeocodingConfig::default();
//!     let geocoder = GeocodingClient::new(OfflineBackend::new(), GeocodeCache::new(), &config);
//!
//!     let mut geotagger = Geotagger::builder()
//!         .root("assets")
//!         .geocoder(geocoder)
//!         .build();
//!     let report = geotagger.scan().await?;
//!
//!     for (place, count) in report.top_locations(5) {
//!         println!("{place}: {count} files");
//!     }
//!     report.export_json("report.json".as_ref())?;
//!
//!     Ok(())
//! }
//! ```

mod error;
pub mod features;
pub mod geocode;
mod geotagger;
pub mod mutation;
pub mod structs;
pub mod time;
pub mod utils;

pub use error::GeotagError;
pub use features::gps::GeoCoordinate;
pub use features::location::{LocationSource, ResolvedLocation};
pub use features::video::VideoProbe;
pub use geocode::{
    GeocodeCache, GeocodeError, GeocodingClient, GeocodingConfig, NominatimBackend,
    OfflineBackend, ReverseGeocode,
};
pub use geotagger::Geotagger;
pub use mutation::LocationWriter;
pub use structs::{FileReport, QuickScan, ScanReport, ScanStatistics};
