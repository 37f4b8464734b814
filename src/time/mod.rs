//! Capture and file-system dates of media files.
mod parsing;
mod structs;

pub use parsing::{parse_capture_date, parse_datetime_offset, parse_datetime_utc_z, parse_naive};
pub use structs::{CaptureDate, DateSource};

use chrono::{DateTime, Local, NaiveDateTime};
use std::fs::Metadata;

/// The modification time of a file in local time, used when no capture date is embedded.
pub fn system_date(metadata: &Metadata) -> Option<NaiveDateTime> {
    let modified = metadata.modified().ok()?;
    Some(DateTime::<Local>::from(modified).naive_local())
}
