//! Typed view over an EXIF block.
//!
//! Fields are kept in four groups (image, capture, GPS, thumbnail) so the block can be
//! written back with every field it was read with. Only the fields this crate consumes
//! or produces get typed accessors.

use crate::features::error::{ContainerError, DecodeError};
use crate::features::gps::{
    Axis, GeoCoordinate, Hemisphere, Rational, SexagesimalGps, encode_coordinate,
};
use exif::{Context, Field, In, Reader, Tag, Value};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagGroup {
    /// IFD0 TIFF tags (`DateTime`, `Make`, ...).
    Image,
    /// Exif and interoperability sub-IFD tags.
    Capture,
    Gps,
    /// Everything attached to IFD1.
    Thumbnail,
}

impl TagGroup {
    pub fn of(field: &Field) -> Self {
        if field.ifd_num != In::PRIMARY {
            return Self::Thumbnail;
        }
        match field.tag.context() {
            Context::Gps => Self::Gps,
            Context::Exif | Context::Interop => Self::Capture,
            _ => Self::Image,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsField {
    VersionId,
    LatitudeRef,
    Latitude,
    LongitudeRef,
    Longitude,
    AreaInformation,
}

impl GpsField {
    pub const fn tag(self) -> Tag {
        match self {
            Self::VersionId => Tag::GPSVersionID,
            Self::LatitudeRef => Tag::GPSLatitudeRef,
            Self::Latitude => Tag::GPSLatitude,
            Self::LongitudeRef => Tag::GPSLongitudeRef,
            Self::Longitude => Tag::GPSLongitude,
            Self::AreaInformation => Tag::GPSAreaInformation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureField {
    DateTimeOriginal,
    DateTimeDigitized,
}

impl CaptureField {
    pub const fn tag(self) -> Tag {
        match self {
            Self::DateTimeOriginal => Tag::DateTimeOriginal,
            Self::DateTimeDigitized => Tag::DateTimeDigitized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageField {
    DateTime,
}

impl ImageField {
    pub const fn tag(self) -> Tag {
        match self {
            Self::DateTime => Tag::DateTime,
        }
    }
}

/// Which field a capture date was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Capture(CaptureField),
    Image(ImageField),
}

#[derive(Debug, Default)]
pub struct MetadataContainer {
    image: Vec<Field>,
    capture: Vec<Field>,
    gps: Vec<Field>,
    thumbnail: Vec<Field>,
    thumbnail_jpeg: Option<Vec<u8>>,
    little_endian: bool,
}

impl MetadataContainer {
    /// An empty block with all four groups present and nothing in them.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads the EXIF block of any container kamadak-exif understands (JPEG, HEIF, PNG,
    /// WebP, TIFF). `Ok(None)` means the file simply has no EXIF.
    pub fn read_from_file(path: &Path) -> Result<Option<Self>, ContainerError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Ok(Some(Self::from_exif(&exif))),
            Err(exif::Error::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Parses a bare TIFF-structured EXIF payload, as stored in a JPEG APP1 segment.
    pub fn from_tiff(raw: Vec<u8>) -> Result<Self, ContainerError> {
        let exif = Reader::new().read_raw(raw)?;
        Ok(Self::from_exif(&exif))
    }

    fn from_exif(exif: &exif::Exif) -> Self {
        let mut container = Self {
            little_endian: exif.little_endian(),
            thumbnail_jpeg: thumbnail_jpeg(exif),
            ..Self::default()
        };
        for field in exif.fields() {
            // The writer cannot encode types it does not know.
            if let Value::Unknown(typ, count, _) = field.value {
                warn!(
                    "Dropping EXIF field {} in {}: unknown type {typ} ({count} values)",
                    field.tag, field.ifd_num
                );
                continue;
            }
            container.push(Field {
                tag: field.tag,
                ifd_num: field.ifd_num,
                value: field.value.clone(),
            });
        }
        container
    }

    fn push(&mut self, field: Field) {
        self.group_mut(TagGroup::of(&field)).push(field);
    }

    fn group(&self, group: TagGroup) -> &[Field] {
        match group {
            TagGroup::Image => &self.image,
            TagGroup::Capture => &self.capture,
            TagGroup::Gps => &self.gps,
            TagGroup::Thumbnail => &self.thumbnail,
        }
    }

    fn group_mut(&mut self, group: TagGroup) -> &mut Vec<Field> {
        match group {
            TagGroup::Image => &mut self.image,
            TagGroup::Capture => &mut self.capture,
            TagGroup::Gps => &mut self.gps,
            TagGroup::Thumbnail => &mut self.thumbnail,
        }
    }

    fn primary_value(&self, group: TagGroup, tag: Tag) -> Option<&Value> {
        self.group(group)
            .iter()
            .find(|field| field.tag == tag && field.ifd_num == In::PRIMARY)
            .map(|field| &field.value)
    }

    fn fields(&self) -> impl Iterator<Item = &Field> {
        self.image
            .iter()
            .chain(&self.capture)
            .chain(&self.gps)
            .chain(&self.thumbnail)
    }

    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    pub fn gps(&self, field: GpsField) -> Option<&Value> {
        self.primary_value(TagGroup::Gps, field.tag())
    }

    /// Inserts or replaces a GPS field.
    pub fn set_gps(&mut self, field: GpsField, value: Value) {
        let tag = field.tag();
        self.gps.retain(|existing| existing.tag != tag);
        self.gps.push(Field {
            tag,
            ifd_num: In::PRIMARY,
            value,
        });
    }

    pub fn capture_text(&self, field: CaptureField) -> Option<String> {
        self.primary_value(TagGroup::Capture, field.tag())
            .and_then(ascii_text)
    }

    pub fn image_text(&self, field: ImageField) -> Option<String> {
        self.primary_value(TagGroup::Image, field.tag())
            .and_then(ascii_text)
    }

    /// The first capture date found, in order `DateTimeOriginal`, `DateTimeDigitized`,
    /// IFD0 `DateTime`.
    pub fn capture_date(&self) -> Option<(String, DateField)> {
        [CaptureField::DateTimeOriginal, CaptureField::DateTimeDigitized]
            .into_iter()
            .find_map(|field| {
                self.capture_text(field)
                    .map(|text| (text, DateField::Capture(field)))
            })
            .or_else(|| {
                self.image_text(ImageField::DateTime)
                    .map(|text| (text, DateField::Image(ImageField::DateTime)))
            })
    }

    /// Both rational triples and both references are present.
    pub fn has_gps_coordinate(&self) -> bool {
        [
            GpsField::Latitude,
            GpsField::LatitudeRef,
            GpsField::Longitude,
            GpsField::LongitudeRef,
        ]
        .into_iter()
        .all(|field| self.gps(field).is_some())
    }

    /// Decodes the GPS position. `None` only when the fields are absent; a malformed
    /// axis decodes to `0.0` and is logged.
    pub fn gps_coordinate(&self) -> Option<GeoCoordinate> {
        if !self.has_gps_coordinate() {
            return None;
        }
        let latitude = self
            .decode_axis(Axis::Latitude)
            .unwrap_or_else(|err| {
                warn!("Undecodable GPS latitude, using 0.0: {err}");
                0.0
            });
        let longitude = self
            .decode_axis(Axis::Longitude)
            .unwrap_or_else(|err| {
                warn!("Undecodable GPS longitude, using 0.0: {err}");
                0.0
            });
        GeoCoordinate::new(latitude, longitude).ok()
    }

    fn decode_axis(&self, axis: Axis) -> Result<f64, DecodeError> {
        let (value_field, ref_field, limit) = match axis {
            Axis::Latitude => (GpsField::Latitude, GpsField::LatitudeRef, 90.0),
            Axis::Longitude => (GpsField::Longitude, GpsField::LongitudeRef, 180.0),
        };
        let reference = self
            .gps(ref_field)
            .and_then(ascii_text)
            .ok_or(DecodeError::UnexpectedType("GPS reference"))?;
        let hemisphere = Hemisphere::from_ref(&reference)?;
        let components: Vec<Rational> = match self.gps(value_field) {
            Some(Value::Rational(rationals)) => {
                rationals.iter().copied().map(Rational::from).collect()
            }
            _ => return Err(DecodeError::UnexpectedType("GPS rational triple")),
        };
        let decimal = SexagesimalGps::from_components(&components, hemisphere)?.to_decimal();
        if decimal.abs() > limit {
            return Err(match axis {
                Axis::Latitude => DecodeError::OutOfRange {
                    latitude: decimal,
                    longitude: 0.0,
                },
                Axis::Longitude => DecodeError::OutOfRange {
                    latitude: 0.0,
                    longitude: decimal,
                },
            });
        }
        Ok(decimal)
    }

    /// Writes latitude/longitude triples and their references, adding `GPSVersionID`
    /// when the GPS group had none.
    pub fn set_gps_coordinate(&mut self, coordinate: GeoCoordinate) {
        let (latitude, longitude) = encode_coordinate(coordinate);
        if self.gps(GpsField::VersionId).is_none() {
            self.set_gps(GpsField::VersionId, Value::Byte(vec![2, 3, 0, 0]));
        }
        self.set_gps(GpsField::LatitudeRef, reference_value(latitude.reference));
        self.set_gps(GpsField::Latitude, rational_value(&latitude));
        self.set_gps(GpsField::LongitudeRef, reference_value(longitude.reference));
        self.set_gps(GpsField::Longitude, rational_value(&longitude));
    }

    pub fn area_information(&self) -> Option<&[u8]> {
        match self.gps(GpsField::AreaInformation)? {
            Value::Undefined(bytes, _) | Value::Byte(bytes) => Some(bytes),
            Value::Ascii(parts) => parts.first().map(Vec::as_slice),
            _ => None,
        }
    }

    /// Stores `text` as raw UTF-8 in `GPSAreaInformation`.
    pub fn set_area_information(&mut self, text: &str) {
        self.set_gps(
            GpsField::AreaInformation,
            Value::Undefined(text.as_bytes().to_vec(), 0),
        );
    }

    /// Serializes to a TIFF-structured EXIF payload, ready for a JPEG APP1 segment.
    pub fn to_tiff_bytes(&self) -> Result<Vec<u8>, ContainerError> {
        let mut fields: Vec<&Field> = self.fields().collect();
        fields.sort_by_key(|field| (field.ifd_num.index(), field.tag.number()));

        let mut writer = exif::experimental::Writer::new();
        for field in fields {
            writer.push_field(field);
        }
        if let Some(jpeg) = &self.thumbnail_jpeg {
            writer.set_jpeg(jpeg, In::THUMBNAIL);
        }

        let mut buffer = Cursor::new(Vec::new());
        writer.write(&mut buffer, self.little_endian)?;
        Ok(buffer.into_inner())
    }
}

fn ascii_text(value: &Value) -> Option<String> {
    let Value::Ascii(parts) = value else {
        return None;
    };
    let text = String::from_utf8_lossy(parts.first()?);
    let text = text.trim_end_matches('\0').trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn reference_value(hemisphere: Hemisphere) -> Value {
    Value::Ascii(vec![vec![hemisphere.as_char() as u8]])
}

fn rational_value(sexagesimal: &SexagesimalGps) -> Value {
    Value::Rational(
        sexagesimal
            .components()
            .into_iter()
            .map(exif::Rational::from)
            .collect(),
    )
}

pub(crate) fn thumbnail_jpeg(exif: &exif::Exif) -> Option<Vec<u8>> {
    let offset = exif
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let length = exif
        .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    exif.buf()
        .get(offset..offset.checked_add(length)?)
        .map(<[u8]>::to_vec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii(text: &str) -> Value {
        Value::Ascii(vec![text.as_bytes().to_vec()])
    }

    fn container_with(fields: Vec<Field>) -> MetadataContainer {
        let mut container = MetadataContainer::empty();
        for field in fields {
            container.push(field);
        }
        container
    }

    #[test]
    fn test_fields_are_grouped_by_ifd_and_context() {
        let container = container_with(vec![
            Field {
                tag: Tag::DateTime,
                ifd_num: In::PRIMARY,
                value: ascii("2021:01:01 10:00:00"),
            },
            Field {
                tag: Tag::DateTimeOriginal,
                ifd_num: In::PRIMARY,
                value: ascii("2021:01:01 09:00:00"),
            },
            Field {
                tag: Tag::GPSLatitudeRef,
                ifd_num: In::PRIMARY,
                value: ascii("N"),
            },
            Field {
                tag: Tag::Compression,
                ifd_num: In::THUMBNAIL,
                value: Value::Short(vec![6]),
            },
        ]);

        assert_eq!(container.group(TagGroup::Image).len(), 1);
        assert_eq!(container.group(TagGroup::Capture).len(), 1);
        assert_eq!(container.group(TagGroup::Gps).len(), 1);
        assert_eq!(container.group(TagGroup::Thumbnail).len(), 1);
    }

    #[test]
    fn test_capture_date_priority() {
        let container = container_with(vec![
            Field {
                tag: Tag::DateTime,
                ifd_num: In::PRIMARY,
                value: ascii("2021:01:01 10:00:00"),
            },
            Field {
                tag: Tag::DateTimeDigitized,
                ifd_num: In::PRIMARY,
                value: ascii("2021:01:01 09:30:00"),
            },
        ]);
        assert_eq!(
            container.capture_date(),
            Some((
                "2021:01:01 09:30:00".to_string(),
                DateField::Capture(CaptureField::DateTimeDigitized)
            ))
        );

        let container = container_with(vec![Field {
            tag: Tag::DateTime,
            ifd_num: In::PRIMARY,
            value: ascii("2021:01:01 10:00:00"),
        }]);
        assert_eq!(
            container.capture_date().map(|(_, field)| field),
            Some(DateField::Image(ImageField::DateTime))
        );

        assert!(MetadataContainer::empty().capture_date().is_none());
    }

    #[test]
    fn test_gps_absent_is_none() {
        let mut container = MetadataContainer::empty();
        assert!(container.gps_coordinate().is_none());

        // A reference without the rational triple is still "absent".
        container.set_gps(GpsField::LatitudeRef, ascii("N"));
        assert!(container.gps_coordinate().is_none());
    }

    #[test]
    fn test_malformed_axis_decodes_to_zero() {
        let mut container = MetadataContainer::empty();
        container.set_gps(GpsField::LatitudeRef, ascii("N"));
        container.set_gps(
            GpsField::Latitude,
            Value::Rational(vec![exif::Rational { num: 48, denom: 1 }]),
        );
        container.set_gps(GpsField::LongitudeRef, ascii("E"));
        container.set_gps(
            GpsField::Longitude,
            Value::Rational(vec![
                exif::Rational { num: 2, denom: 1 },
                exif::Rational { num: 21, denom: 1 },
                exif::Rational { num: 0, denom: 0 },
            ]),
        );

        let coordinate = container
            .gps_coordinate()
            .expect("fields are present, so GPS is present");
        assert_eq!(coordinate.latitude(), 0.0);
        assert!((coordinate.longitude() - 2.35).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_value_types_are_dropped() {
        #[rustfmt::skip]
        let raw = vec![
            b'I', b'I', 0x2a, 0x00, 0x08, 0x00, 0x00, 0x00,
            0x02, 0x00,
            // Make, type 99 (undefined by TIFF), one value
            0x0f, 0x01, 0x63, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // Model, ASCII, "EOS\0"
            0x10, 0x01, 0x02, 0x00, 0x04, 0x00, 0x00, 0x00, b'E', b'O', b'S', 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        let container = MetadataContainer::from_tiff(raw).expect("parsable");
        let tags: Vec<Tag> = container.fields().map(|field| field.tag).collect();
        assert_eq!(tags, vec![Tag::Model]);

        let reread = MetadataContainer::from_tiff(container.to_tiff_bytes().expect("serializable"))
            .expect("parsable");
        assert_eq!(reread.fields().count(), 1);
    }

    #[test]
    fn test_written_block_reads_back() {
        let mut container = MetadataContainer::empty();
        container.set_gps_coordinate(GeoCoordinate::new(-33.8688, 151.2093).unwrap());
        container.set_area_information("Sydney, Australia");

        let bytes = container.to_tiff_bytes().expect("serializable");
        let reread = MetadataContainer::from_tiff(bytes).expect("parsable");

        let coordinate = reread.gps_coordinate().expect("GPS written");
        assert!((coordinate.latitude() + 33.8688).abs() < 1e-4);
        assert!((coordinate.longitude() - 151.2093).abs() < 1e-4);
        assert_eq!(
            reread.area_information(),
            Some("Sydney, Australia".as_bytes())
        );
        assert!(reread.gps(GpsField::VersionId).is_some());
    }
}
