use crate::features::container::{CaptureField, DateField, ImageField};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Where a capture date was found.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    DateTimeOriginal,
    DateTimeDigitized,
    /// IFD0 `DateTime`, the last modification recorded by the camera or editor.
    DateTime,
    /// `creation_time` (or equivalent) of a video container.
    VideoContainer,
}

impl From<DateField> for DateSource {
    fn from(field: DateField) -> Self {
        match field {
            DateField::Capture(CaptureField::DateTimeOriginal) => Self::DateTimeOriginal,
            DateField::Capture(CaptureField::DateTimeDigitized) => Self::DateTimeDigitized,
            DateField::Image(ImageField::DateTime) => Self::DateTime,
        }
    }
}

/// A capture date as stored in the file, plus its parsed value when the format is known.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CaptureDate {
    pub raw: String,
    pub parsed: Option<NaiveDateTime>,
    pub source: DateSource,
}

impl CaptureDate {
    pub fn new(raw: String, source: DateSource) -> Self {
        let parsed = super::parse_capture_date(&raw);
        Self {
            raw,
            parsed,
            source,
        }
    }
}
