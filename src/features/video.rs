//! Container-level tags of video files, read through an external probe.

use crate::features::error::ProbeError;
use crate::features::gps::GeoCoordinate;
use exiftool::ExifTool;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const VERSION_TIMEOUT: Duration = Duration::from_secs(5);
const QUICKTIME_LOCATION_KEY: &str = "com.apple.quicktime.location.ISO6709";

/// Matches the leading latitude/longitude of an ISO 6709 string such as
/// `+37.7749-122.4194+000.000/`.
static ISO6709_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([+-]?\d+\.?\d*)([+-]\d+\.?\d*)").expect("Failed to compile ISO 6709 regex")
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoTags {
    pub creation_time: Option<String>,
    pub coordinate: Option<GeoCoordinate>,
}

/// The external tool used to read video tags.
pub enum VideoProbe {
    Ffprobe(PathBuf),
    Exiftool(ExifTool),
}

impl VideoProbe {
    /// Tries a list of likely ffprobe executables and keeps the first that answers
    /// `-version`.
    pub async fn locate_ffprobe() -> Option<Self> {
        for candidate in ffprobe_candidates() {
            if ffprobe_responds(&candidate).await {
                debug!("Using ffprobe at {}", candidate.display());
                return Some(Self::Ffprobe(candidate));
            }
        }
        None
    }

    /// Uses a user supplied ffprobe path, if it responds.
    pub async fn ffprobe_at(path: PathBuf) -> Result<Self, ProbeError> {
        if ffprobe_responds(&path).await {
            Ok(Self::Ffprobe(path))
        } else {
            Err(ProbeError::NotAvailable)
        }
    }

    pub fn exiftool() -> Result<Self, ProbeError> {
        Ok(Self::Exiftool(ExifTool::new()?))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ffprobe(_) => "ffprobe",
            Self::Exiftool(_) => "exiftool",
        }
    }

    pub async fn probe(&mut self, path: &Path) -> Result<VideoTags, ProbeError> {
        match self {
            Self::Ffprobe(executable) => probe_ffprobe(executable, path).await,
            Self::Exiftool(exiftool) => {
                let numeric = exiftool.json(path, &["-n"])?;
                Ok(tags_from_exiftool(&numeric))
            }
        }
    }
}

fn ffprobe_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("ffprobe"), PathBuf::from("ffprobe.exe")];
    if cfg!(windows) {
        candidates.extend(
            [
                r"C:\Program Files\ffmpeg\bin\ffprobe.exe",
                r"C:\ffmpeg\bin\ffprobe.exe",
                r"C:\Program Files (x86)\ffmpeg\bin\ffprobe.exe",
            ]
            .map(PathBuf::from),
        );
    }
    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        candidates.push(PathBuf::from(home).join("ffmpeg").join("bin").join("ffprobe.exe"));
    }
    candidates
}

async fn ffprobe_responds(executable: &Path) -> bool {
    let mut command = Command::new(executable);
    command.arg("-version").kill_on_drop(true);
    matches!(
        timeout(VERSION_TIMEOUT, command.output()).await,
        Ok(Ok(output)) if output.status.success()
    )
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeSection,
    #[serde(default)]
    streams: Vec<FfprobeSection>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeSection {
    #[serde(default)]
    tags: HashMap<String, String>,
}

async fn probe_ffprobe(executable: &Path, path: &Path) -> Result<VideoTags, ProbeError> {
    let mut command = Command::new(executable);
    command
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .kill_on_drop(true);
    let output = timeout(PROBE_TIMEOUT, command.output())
        .await
        .map_err(|_| ProbeError::Timeout(PROBE_TIMEOUT))??;
    if !output.status.success() {
        return Err(ProbeError::Failed(output.status));
    }
    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    Ok(tags_from_ffprobe(&parsed))
}

fn tags_from_ffprobe(output: &FfprobeOutput) -> VideoTags {
    let format_tags = &output.format.tags;
    let creation_time = format_tags
        .get("creation_time")
        .or_else(|| format_tags.get("date"))
        .or_else(|| {
            output
                .streams
                .iter()
                .find_map(|stream| stream.tags.get("creation_time"))
        })
        .cloned();
    let coordinate = format_tags
        .get("location")
        .or_else(|| format_tags.get(QUICKTIME_LOCATION_KEY))
        .and_then(|location| parse_video_location(location));
    VideoTags {
        creation_time,
        coordinate,
    }
}

fn tags_from_exiftool(numeric: &Value) -> VideoTags {
    let creation_time = ["CreationDate", "CreateDate", "MediaCreateDate", "TrackCreateDate"]
        .into_iter()
        .filter_map(|key| numeric.get(key).and_then(Value::as_str))
        .find(|date| !date.is_empty() && !date.starts_with("0000"))
        .map(str::to_string);
    let coordinate = match (
        numeric.get("GPSLatitude").and_then(Value::as_f64),
        numeric.get("GPSLongitude").and_then(Value::as_f64),
    ) {
        (Some(latitude), Some(longitude)) => GeoCoordinate::new(latitude, longitude).ok(),
        _ => None,
    };
    VideoTags {
        creation_time,
        coordinate,
    }
}

/// Parses a video location tag, either `"lat,lon"` or ISO 6709 (`+37.7749-122.4194+000.000/`).
pub fn parse_video_location(location: &str) -> Option<GeoCoordinate> {
    let location = location.trim();
    let (latitude, longitude) = if let Some((latitude, longitude)) = location.split_once(',') {
        let longitude = longitude.split(',').next().unwrap_or(longitude);
        (latitude.trim().parse().ok()?, longitude.trim().parse().ok()?)
    } else {
        let captures = ISO6709_REGEX.captures(location)?;
        (captures[1].parse().ok()?, captures[2].parse().ok()?)
    };
    match GeoCoordinate::new(latitude, longitude) {
        Ok(coordinate) => Some(coordinate),
        Err(err) => {
            warn!("Ignoring video location {location:?}: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_iso6709_location() {
        let coordinate = parse_video_location("+37.7749-122.4194+000.000/").unwrap();
        assert_eq!(coordinate.latitude(), 37.7749);
        assert_eq!(coordinate.longitude(), -122.4194);

        let coordinate = parse_video_location("-33.8688+151.2093/").unwrap();
        assert_eq!(coordinate.latitude(), -33.8688);
        assert_eq!(coordinate.longitude(), 151.2093);
    }

    #[test]
    fn test_parse_comma_location() {
        let coordinate = parse_video_location(" 48.8566, 2.3522 ").unwrap();
        assert_eq!(coordinate.latitude(), 48.8566);
        assert_eq!(coordinate.longitude(), 2.3522);
    }

    #[test]
    fn test_parse_invalid_location() {
        assert!(parse_video_location("").is_none());
        assert!(parse_video_location("somewhere").is_none());
        assert!(parse_video_location("+95.0000+010.0000/").is_none());
    }

    #[test]
    fn test_ffprobe_format_tags_take_precedence() {
        let parsed: FfprobeOutput = serde_json::from_value(json!({
            "format": {
                "tags": {
                    "creation_time": "2021-06-01T12:00:00.000000Z",
                    "location": "+48.8566+002.3522/"
                }
            },
            "streams": [{ "tags": { "creation_time": "2020-01-01T00:00:00.000000Z" } }]
        }))
        .unwrap();

        let tags = tags_from_ffprobe(&parsed);
        assert_eq!(
            tags.creation_time.as_deref(),
            Some("2021-06-01T12:00:00.000000Z")
        );
        assert_eq!(tags.coordinate.unwrap().latitude(), 48.8566);
    }

    #[test]
    fn test_ffprobe_stream_fallback_and_quicktime_key() {
        let parsed: FfprobeOutput = serde_json::from_value(json!({
            "format": {
                "tags": { "com.apple.quicktime.location.ISO6709": "+45.7640+004.8357+170.000/" }
            },
            "streams": [
                { "codec_type": "audio" },
                { "tags": { "creation_time": "2020-01-01T00:00:00.000000Z" } }
            ]
        }))
        .unwrap();

        let tags = tags_from_ffprobe(&parsed);
        assert_eq!(
            tags.creation_time.as_deref(),
            Some("2020-01-01T00:00:00.000000Z")
        );
        assert_eq!(tags.coordinate.unwrap().longitude(), 4.8357);
    }

    #[test]
    fn test_ffprobe_output_without_sections() {
        let parsed: FfprobeOutput = serde_json::from_value(json!({})).unwrap();
        assert_eq!(tags_from_ffprobe(&parsed), VideoTags::default());
    }

    #[test]
    fn test_exiftool_numeric_tags() {
        let numeric = json!({
            "CreateDate": "0000:00:00 00:00:00",
            "MediaCreateDate": "2022:08:14 18:30:00",
            "GPSLatitude": 52.379_189,
            "GPSLongitude": 4.899_431
        });
        let tags = tags_from_exiftool(&numeric);
        assert_eq!(tags.creation_time.as_deref(), Some("2022:08:14 18:30:00"));
        assert_eq!(tags.coordinate.unwrap().latitude(), 52.379_189);
    }
}
