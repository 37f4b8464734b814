//! Conversion between decimal degrees and the sexagesimal rational encoding
//! that EXIF uses for `GPSLatitude` / `GPSLongitude`.

use crate::features::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Denominator used for the seconds component, giving 4 decimals of sub-second precision.
pub const SECONDS_DENOMINATOR: u32 = 10_000;

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GeoCoordinate {
    latitude: f64,
    longitude: f64,
}

impl GeoCoordinate {
    /// Creates a coordinate, rejecting values outside `[-90, 90]` / `[-180, 180]` and NaN.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DecodeError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(DecodeError::OutOfRange {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

/// The single-character reference that carries the sign of a sexagesimal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    pub fn for_value(axis: Axis, value: f64) -> Self {
        match (axis, value < 0.0) {
            (Axis::Latitude, false) => Self::North,
            (Axis::Latitude, true) => Self::South,
            (Axis::Longitude, false) => Self::East,
            (Axis::Longitude, true) => Self::West,
        }
    }

    /// Parses an EXIF reference such as `"N"` or `"W\0"`.
    pub fn from_ref(reference: &str) -> Result<Self, DecodeError> {
        match reference.trim_end_matches('\0').trim() {
            "N" | "n" => Ok(Self::North),
            "S" | "s" => Ok(Self::South),
            "E" | "e" => Ok(Self::East),
            "W" | "w" => Ok(Self::West),
            other => Err(DecodeError::InvalidReference(other.to_string())),
        }
    }

    pub const fn as_char(self) -> char {
        match self {
            Self::North => 'N',
            Self::South => 'S',
            Self::East => 'E',
            Self::West => 'W',
        }
    }

    pub const fn is_negative(self) -> bool {
        matches!(self, Self::South | Self::West)
    }
}

/// An unsigned rational as stored in EXIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// The decimal value; a zero denominator yields 0 instead of dividing.
    pub fn value(self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            f64::from(self.numerator) / f64::from(self.denominator)
        }
    }
}

impl From<exif::Rational> for Rational {
    fn from(value: exif::Rational) -> Self {
        Self::new(value.num, value.denom)
    }
}

impl From<Rational> for exif::Rational {
    fn from(value: Rational) -> Self {
        Self {
            num: value.numerator,
            denom: value.denominator,
        }
    }
}

/// Degrees, minutes and seconds as rationals, plus the hemisphere reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SexagesimalGps {
    pub degrees: Rational,
    pub minutes: Rational,
    pub seconds: Rational,
    pub reference: Hemisphere,
}

impl SexagesimalGps {
    pub fn from_decimal(axis: Axis, value: f64) -> Self {
        let (degrees, minutes, seconds) = decimal_to_sexagesimal(value);
        Self {
            degrees: Rational::new(degrees, 1),
            minutes: Rational::new(minutes, 1),
            seconds: to_rational_seconds(seconds),
            reference: Hemisphere::for_value(axis, value),
        }
    }

    /// Builds from the raw rational list of a GPS field; fewer than three entries is malformed.
    pub fn from_components(
        components: &[Rational],
        reference: Hemisphere,
    ) -> Result<Self, DecodeError> {
        match components {
            [degrees, minutes, seconds, ..] => Ok(Self {
                degrees: *degrees,
                minutes: *minutes,
                seconds: *seconds,
                reference,
            }),
            _ => Err(DecodeError::MissingComponent(components.len())),
        }
    }

    pub fn to_decimal(&self) -> f64 {
        sexagesimal_to_decimal(self.degrees, self.minutes, self.seconds, self.reference)
    }

    pub const fn components(&self) -> [Rational; 3] {
        [self.degrees, self.minutes, self.seconds]
    }
}

/// Encodes a coordinate as `(latitude, longitude)` sexagesimal triples.
pub fn encode_coordinate(coordinate: GeoCoordinate) -> (SexagesimalGps, SexagesimalGps) {
    (
        SexagesimalGps::from_decimal(Axis::Latitude, coordinate.latitude()),
        SexagesimalGps::from_decimal(Axis::Longitude, coordinate.longitude()),
    )
}

/// Splits the magnitude of `value` into whole degrees, whole minutes and fractional seconds.
/// The sign is dropped; it travels in the [`Hemisphere`].
pub fn decimal_to_sexagesimal(value: f64) -> (u32, u32, f64) {
    let magnitude = value.abs();
    let degrees = magnitude.floor();
    let minutes_float = (magnitude - degrees) * 60.0;
    let minutes = minutes_float.floor();
    let seconds = (minutes_float - minutes) * 60.0;
    (degrees as u32, minutes as u32, seconds)
}

pub fn to_rational_seconds(seconds: f64) -> Rational {
    let numerator = (seconds * f64::from(SECONDS_DENOMINATOR)).round();
    Rational::new(numerator as u32, SECONDS_DENOMINATOR)
}

pub fn sexagesimal_to_decimal(
    degrees: Rational,
    minutes: Rational,
    seconds: Rational,
    reference: Hemisphere,
) -> f64 {
    let decimal = degrees.value() + minutes.value() / 60.0 + seconds.value() / 3600.0;
    if reference.is_negative() {
        -decimal
    } else {
        decimal
    }
}
