use crate::features::gps::GeoCoordinate;
use crate::features::location::ResolvedLocation;
use crate::time::CaptureDate;
use crate::utils::MediaKind;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// What a scan learned about one file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub file_size: u64,
    /// Capture date embedded in the file, parsed when the format is recognised.
    pub capture_date: Option<CaptureDate>,
    /// File-system modification time, in local time.
    pub system_date: Option<NaiveDateTime>,
    pub gps: Option<GeoCoordinate>,
    pub location: Option<ResolvedLocation>,
    pub location_written: bool,
    pub error: Option<String>,
}

impl FileReport {
    pub fn new(path: PathBuf, kind: MediaKind) -> Self {
        Self {
            path,
            kind,
            file_size: 0,
            capture_date: None,
            system_date: None,
            gps: None,
            location: None,
            location_written: false,
            error: None,
        }
    }

    /// Has GPS but no place name yet.
    pub fn needs_geocoding(&self) -> bool {
        self.gps.is_some() && self.location.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScanStatistics {
    pub total_files: usize,
    pub image_files: usize,
    pub video_files: usize,
    pub files_with_capture_date: usize,
    pub files_with_system_date: usize,
    /// Neither a capture date nor a file-system date.
    pub files_without_metadata: usize,
    pub files_with_gps: usize,
    pub files_with_location: usize,
    pub files_gps_written: usize,
    pub errors: usize,
}

impl ScanStatistics {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut stats = Self::default();
        for report in reports {
            stats.total_files += 1;
            match report.kind {
                MediaKind::Image => stats.image_files += 1,
                MediaKind::Video => stats.video_files += 1,
            }
            stats.files_with_capture_date += usize::from(report.capture_date.is_some());
            stats.files_with_system_date += usize::from(report.system_date.is_some());
            stats.files_without_metadata +=
                usize::from(report.capture_date.is_none() && report.system_date.is_none());
            stats.files_with_gps += usize::from(report.gps.is_some());
            stats.files_with_location += usize::from(report.location.is_some());
            stats.files_gps_written += usize::from(report.location_written);
            stats.errors += usize::from(report.error.is_some());
        }
        stats
    }
}

/// Most frequent place names as `("City, Country", count)`, most frequent first, ties by name.
pub fn top_locations(reports: &[FileReport], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for text in reports
        .iter()
        .filter_map(|report| report.location.as_ref()?.location_text())
    {
        *counts.entry(text).or_default() += 1;
    }
    let mut sorted: Vec<_> = counts.into_iter().collect();
    sorted.sort_by(|(a_name, a_count), (b_name, b_count)| {
        b_count.cmp(a_count).then_with(|| a_name.cmp(b_name))
    });
    sorted.truncate(limit);
    sorted
}

/// Counts from a GPS-only pass that reads metadata but never geocodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuickScan {
    pub total_files: usize,
    pub files_with_gps: usize,
    pub files_with_location: usize,
}

impl QuickScan {
    pub fn files_needing_geocoding(&self) -> usize {
        self.files_with_gps.saturating_sub(self.files_with_location)
    }
}

/// Full result of a scan, in the layout written by [`ScanReport::export_json`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScanReport {
    pub analysis_date: DateTime<Local>,
    pub directory_analyzed: PathBuf,
    pub statistics: ScanStatistics,
    pub detailed_results: Vec<FileReport>,
}

impl ScanReport {
    pub fn new(directory: PathBuf, detailed_results: Vec<FileReport>) -> Self {
        Self {
            analysis_date: Local::now(),
            directory_analyzed: directory,
            statistics: ScanStatistics::from_reports(&detailed_results),
            detailed_results,
        }
    }

    pub fn top_locations(&self, limit: usize) -> Vec<(String, usize)> {
        top_locations(&self.detailed_results, limit)
    }

    /// Writes the report as pretty-printed JSON, creating missing parent directories.
    pub fn export_json(&self, output: &Path) -> Result<(), crate::GeotagError> {
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(output, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::location::LocationSource;
    use tempfile::tempdir;

    fn report(kind: MediaKind, location: Option<(&str, &str)>) -> FileReport {
        let coordinate = GeoCoordinate::new(48.8566, 2.3522).unwrap();
        let mut report = FileReport::new(PathBuf::from("photo.jpg"), kind);
        report.system_date =
            NaiveDateTime::parse_from_str("2024-05-01 08:00:00", "%Y-%m-%d %H:%M:%S").ok();
        if let Some((city, country)) = location {
            report.gps = Some(coordinate);
            report.location = Some(ResolvedLocation {
                city: Some(city.to_string()),
                region: None,
                country: Some(country.to_string()),
                country_code: None,
                full_address: None,
                coordinates: coordinate,
                source: LocationSource::GeocodedNow,
            });
        }
        report
    }

    #[test]
    fn test_statistics_count_each_property() {
        let mut errored = report(MediaKind::Video, None);
        errored.error = Some("Video probe exited with 1".to_string());
        errored.system_date = None;
        let mut written = report(MediaKind::Image, Some(("Paris", "France")));
        written.location_written = true;

        let stats = ScanStatistics::from_reports(&[
            written,
            report(MediaKind::Image, None),
            errored,
        ]);

        assert_eq!(
            stats,
            ScanStatistics {
                total_files: 3,
                image_files: 2,
                video_files: 1,
                files_with_capture_date: 0,
                files_with_system_date: 2,
                files_without_metadata: 1,
                files_with_gps: 1,
                files_with_location: 1,
                files_gps_written: 1,
                errors: 1,
            }
        );
    }

    #[test]
    fn test_top_locations_order() {
        let reports = vec![
            report(MediaKind::Image, Some(("Lyon", "France"))),
            report(MediaKind::Image, Some(("Paris", "France"))),
            report(MediaKind::Image, Some(("Paris", "France"))),
            report(MediaKind::Image, Some(("Annecy", "France"))),
            report(MediaKind::Image, None),
        ];
        assert_eq!(
            top_locations(&reports, 2),
            vec![
                ("Paris, France".to_string(), 2),
                ("Annecy, France".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_export_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("reports/nested/scan.json");
        let scan = ScanReport::new(
            dir.path().to_path_buf(),
            vec![report(MediaKind::Image, Some(("Paris", "France")))],
        );

        scan.export_json(&output).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(value["statistics"]["total_files"], 1);
        assert_eq!(
            value["detailed_results"][0]["location"]["city"],
            "Paris"
        );
        assert!(value["analysis_date"].is_string());
        assert!(value["directory_analyzed"].is_string());
    }
}
