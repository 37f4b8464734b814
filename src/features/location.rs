use crate::features::container::MetadataContainer;
use crate::features::gps::GeoCoordinate;
use serde::{Deserialize, Serialize};

/// Character-code prefixes that may precede `GPSAreaInformation` text.
const CHARSET_PREFIXES: [&[u8; 8]; 2] = [b"ASCII\0\0\0", b"\0\0\0\0\0\0\0\0"];
const UNICODE_PREFIX: &[u8; 8] = b"UNICODE\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LocationSource {
    /// Read back from a place name already stored in the file.
    ExistingEmbedded,
    /// Produced by a reverse geocoding call during this run.
    GeocodedNow,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResolvedLocation {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub full_address: Option<String>,
    pub coordinates: GeoCoordinate,
    pub source: LocationSource,
}

impl ResolvedLocation {
    /// Builds a location from an embedded `"City, Country"` string. A single part is
    /// taken as the country.
    pub fn from_embedded(text: &str, coordinates: GeoCoordinate) -> Self {
        let parts: Vec<&str> = text.split(", ").map(str::trim).collect();
        let (city, country) = match parts.as_slice() {
            [city, country, ..] => (non_empty(city), non_empty(country)),
            [country] => (None, non_empty(country)),
            [] => (None, None),
        };
        Self {
            city,
            region: None,
            country,
            country_code: None,
            full_address: Some(text.to_string()),
            coordinates,
            source: LocationSource::ExistingEmbedded,
        }
    }

    /// The same place, reported for another coordinate that shares its cache bucket.
    #[must_use]
    pub fn at(&self, coordinates: GeoCoordinate) -> Self {
        Self {
            coordinates,
            ..self.clone()
        }
    }

    /// `"City, Country"` with empty parts left out; `None` when both are empty.
    pub fn location_text(&self) -> Option<String> {
        let parts: Vec<&str> = [self.city.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

fn non_empty(part: &str) -> Option<String> {
    (!part.is_empty()).then(|| part.to_string())
}

/// Returns the place name already written into `GPSAreaInformation`, if any.
pub fn existing_location(container: &MetadataContainer) -> Option<String> {
    decode_area_information(container.area_information()?)
}

/// Decodes raw `GPSAreaInformation` bytes: an 8-byte character-code prefix is dropped,
/// UTF-8 is tried first with Latin-1 as fallback, and NUL padding is trimmed.
pub fn decode_area_information(raw: &[u8]) -> Option<String> {
    let text = match raw.split_first_chunk::<8>() {
        Some((prefix, body)) if prefix == UNICODE_PREFIX => decode_utf16(body),
        Some((prefix, body)) if CHARSET_PREFIXES.contains(&prefix) => decode_text(body),
        _ => decode_text(raw),
    };
    let text = text.trim_matches('\0').trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn decode_text(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => body.iter().map(|&byte| char::from(byte)).collect(),
    }
}

/// UCS-2 without a byte order mark; mostly-ASCII text has its zero bytes first when
/// big-endian.
fn decode_utf16(body: &[u8]) -> String {
    let pairs = body.chunks_exact(2);
    let big_endian = pairs.clone().filter(|pair| pair[0] == 0).count()
        >= pairs.clone().filter(|pair| pair[1] == 0).count();
    let units = pairs.map(|pair| {
        if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        }
    });
    char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
