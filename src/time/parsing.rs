//! Parsing of the date strings found in EXIF and video container tags.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

/// Parses a naive datetime as written in EXIF (`YYYY:MM:DD HH:MM:SS[.fff]`), also accepting
/// dashes as date separators.
pub fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    let formats = [
        "%Y:%m:%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y:%m:%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    formats
        .into_iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Parses a datetime carrying an explicit offset, in EXIF or RFC 3339 layout.
pub fn parse_datetime_offset(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S%z")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok())
}

/// Parses a datetime ending in `Z`, as ffprobe reports `creation_time`.
pub fn parse_datetime_utc_z(s: &str) -> Option<DateTime<Utc>> {
    if !s.ends_with('Z') {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%SZ")
        .ok()
        .map(|naive| naive.and_utc())
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Best-effort parse of any capture date string. Zoned values keep their wall-clock time;
/// `Z` values are read as UTC.
pub fn parse_capture_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim().trim_end_matches('\0');
    if raw.is_empty() || raw.starts_with("0000") {
        return None;
    }
    parse_naive(raw)
        .or_else(|| parse_datetime_utc_z(raw).map(|dt| dt.naive_utc()))
        .or_else(|| parse_datetime_offset(raw).map(|dt| dt.naive_local()))
}
