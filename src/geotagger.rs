use crate::GeotagError;
use crate::features::container::MetadataContainer;
use crate::features::error::ContainerError;
use crate::features::location::{ResolvedLocation, existing_location};
use crate::features::video::VideoProbe;
use crate::geocode::{GeocodingClient, ReverseGeocode};
use crate::mutation::{LocationWriter, WriteOutcome};
use crate::structs::{FileReport, QuickScan, ScanReport};
use crate::time::{CaptureDate, DateSource, system_date};
use crate::utils::{MediaKind, list_media_files};
use bon::bon;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Scans a directory of photos and videos for capture dates and GPS positions, and
/// optionally names and tags the places they were taken.
///
/// A scan runs in two phases. First every supported file is analysed: capture date,
/// file-system date, GPS position and any place name already embedded by an earlier run.
/// Then, if geocoding is enabled, only files with GPS and no place name are geocoded, and
/// when writing is enabled JPEGs get the result written into their EXIF block.
///
/// Use the builder pattern to construct an instance:
/// ```rust,no_run
/// # use media_geotagger::{Geotagger, GeotagError, GeocodeCache, GeocodingClient, GeocodingConfig, NominatimBackend};
/// # #[tokio::main]
/// # async fn main() -> Result<(), GeotagError> {
/// let config = GeocodingConfig::default();
/// let backend = NominatimBackend::new(&config)?;
/// let mut geotagger = Geotagger::builder()
///     .root("photos")
///     .geocoder(GeocodingClient::new(backend, GeocodeCache::new(), &config))
///     .write_locations(true)
///     .build();
/// let report = geotagger.scan().await?;
/// println!("{} files with a location", report.statistics.files_with_location);
/// # Ok(())
/// # }
/// ```
pub struct Geotagger<B> {
    root: PathBuf,
    geocoder: GeocodingClient<B>,
    video_probe: Option<VideoProbe>,
    writer: LocationWriter,
    write_locations: bool,
    include_hidden: bool,
    cancel_flag: Arc<AtomicBool>,
}

#[bon]
impl<B: ReverseGeocode> Geotagger<B> {
    /// Constructs a `Geotagger` via a builder pattern.
    ///
    /// # Builder Arguments
    ///
    /// * `root: PathBuf` - The directory to scan, recursively.
    /// * `geocoder: GeocodingClient<B>` - Resolves coordinates to place names. A client built from a disabled [`crate::GeocodingConfig`] turns the second phase off.
    /// * `video_probe: Option<VideoProbe>` - Reads creation time and location of videos. Without one, videos only get their file-system date.
    /// * `write_locations: bool` - (Default: `false`) Write newly resolved place names and missing GPS fields into JPEG files.
    /// * `include_hidden: bool` - (Default: `false`) Also scan files and directories whose name starts with a dot.
    /// * `cancel_flag: Arc<AtomicBool>` - (Default: a fresh flag) Setting it stops the scan before the next file. A file that is being rewritten is always finished first.
    #[builder]
    pub fn new(
        #[builder(into)] root: PathBuf,
        geocoder: GeocodingClient<B>,
        video_probe: Option<VideoProbe>,
        #[builder(default)] write_locations: bool,
        #[builder(default)] include_hidden: bool,
        #[builder(default)] cancel_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            root,
            geocoder,
            video_probe,
            writer: LocationWriter::new(),
            write_locations,
            include_hidden,
            cancel_flag,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn geocoder(&self) -> &GeocodingClient<B> {
        &self.geocoder
    }

    /// A handle to the flag that cancels the scan.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// Runs both phases over the directory tree.
    ///
    /// A cancelled scan returns the files analysed so far.
    ///
    /// # Errors
    ///
    /// Only a failure to walk the directory tree is fatal. Problems with single files are
    /// recorded in their [`FileReport`] and the scan carries on.
    pub async fn scan(&mut self) -> Result<ScanReport, GeotagError> {
        let files = list_media_files(&self.root, self.include_hidden)?;
        info!(
            "Analyzing {} media files in {}",
            files.len(),
            self.root.display()
        );

        let mut reports = Vec::with_capacity(files.len());
        for (path, kind) in files {
            if self.is_cancelled() {
                warn!("Scan cancelled after {} files", reports.len());
                return Ok(ScanReport::new(self.root.clone(), reports));
            }
            reports.push(self.analyze_file(&path, kind).await);
        }

        if self.geocoder.is_enabled() {
            self.geocode_pending(&mut reports).await;
        }
        Ok(ScanReport::new(self.root.clone(), reports))
    }

    /// First phase for a single file: everything that can be read without geocoding.
    pub async fn analyze_file(&mut self, path: &Path, kind: MediaKind) -> FileReport {
        let mut report = FileReport::new(path.to_path_buf(), kind);
        match fs::metadata(path) {
            Ok(metadata) => {
                report.file_size = metadata.len();
                report.system_date = system_date(&metadata);
            }
            Err(err) => {
                report.error = Some(format!("File access error: {err}"));
                return report;
            }
        }
        match kind {
            MediaKind::Image => analyze_image(&mut report),
            MediaKind::Video => self.analyze_video(&mut report).await,
        }
        report
    }

    async fn analyze_video(&mut self, report: &mut FileReport) {
        let Some(probe) = self.video_probe.as_mut() else {
            return;
        };
        match probe.probe(&report.path).await {
            Ok(tags) => {
                report.capture_date = tags
                    .creation_time
                    .map(|raw| CaptureDate::new(raw, DateSource::VideoContainer));
                report.gps = tags.coordinate;
            }
            Err(err) => {
                warn!("{} failed on {}: {err}", probe.name(), report.path.display());
                report.error = Some(err.to_string());
            }
        }
    }

    /// Second phase: geocode files with GPS and no place name, writing the result back
    /// when requested.
    async fn geocode_pending(&self, reports: &mut [FileReport]) {
        let pending: Vec<usize> = reports
            .iter()
            .enumerate()
            .filter(|(_, report)| report.needs_geocoding())
            .map(|(index, _)| index)
            .collect();
        let with_gps = reports.iter().filter(|report| report.gps.is_some()).count();
        if pending.is_empty() {
            info!("No files need geocoding ({with_gps} with GPS)");
            return;
        }
        info!(
            "Geocoding {} files ({} already have a location)",
            pending.len(),
            with_gps - pending.len()
        );
        self.geocoder.progress().set_total(pending.len());

        for index in pending {
            if self.is_cancelled() {
                warn!("Geocoding cancelled");
                break;
            }
            let report = &mut reports[index];
            let Some(coordinate) = report.gps else {
                continue;
            };
            let Some(location) = self.geocoder.resolve(coordinate).await else {
                continue;
            };
            if self.write_locations && report.kind == MediaKind::Image {
                self.write_location(report, &location);
            }
            report.location = Some(location);
        }
    }

    fn write_location(&self, report: &mut FileReport, location: &ResolvedLocation) {
        match self.writer.try_write_location(&report.path, location) {
            Ok(WriteOutcome::Written) => report.location_written = true,
            Ok(outcome) => debug!("Skipped writing {}: {outcome:?}", report.path.display()),
            Err(err) => {
                warn!("Writing location to {} failed: {err}", report.path.display());
                report.error = Some(err.to_string());
            }
        }
    }

    /// Counts files with GPS and with an embedded place name, without geocoding anything.
    pub async fn quick_scan(&mut self) -> Result<QuickScan, GeotagError> {
        let files = list_media_files(&self.root, self.include_hidden)?;
        let mut scan = QuickScan::default();
        for (path, kind) in files {
            if self.is_cancelled() {
                break;
            }
            scan.total_files += 1;
            match kind {
                MediaKind::Image => {
                    let Ok(Some(container)) = MetadataContainer::read_from_file(&path) else {
                        continue;
                    };
                    scan.files_with_gps += usize::from(container.has_gps_coordinate());
                    scan.files_with_location +=
                        usize::from(existing_location(&container).is_some());
                }
                MediaKind::Video => {
                    if let Some(probe) = self.video_probe.as_mut()
                        && let Ok(tags) = probe.probe(&path).await
                    {
                        scan.files_with_gps += usize::from(tags.coordinate.is_some());
                    }
                }
            }
        }
        Ok(scan)
    }
}

fn analyze_image(report: &mut FileReport) {
    let container = match MetadataContainer::read_from_file(&report.path) {
        Ok(Some(container)) => container,
        Ok(None) => {
            debug!("No EXIF block in {}", report.path.display());
            return;
        }
        Err(ContainerError::Io(err)) => {
            report.error = Some(format!("File access error: {err}"));
            return;
        }
        Err(err) => {
            // Corrupt metadata counts as no metadata.
            warn!("Ignoring EXIF of {}: {err}", report.path.display());
            return;
        }
    };

    report.capture_date = container
        .capture_date()
        .map(|(raw, field)| CaptureDate::new(raw, field.into()));
    report.gps = container.gps_coordinate();
    if let Some(coordinate) = report.gps
        && let Some(text) = existing_location(&container)
    {
        debug!("{} already tagged with {text:?}", report.path.display());
        report.location = Some(ResolvedLocation::from_embedded(&text, coordinate));
    }
}
