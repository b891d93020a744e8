//! EXIF fields via `kamadak-exif`: camera and lens identity, capture time,
//! image description and GPS position.

use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value};
use std::io::Cursor;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifData {
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens_make: Option<String>,
    pub lens_model: Option<String>,
    pub description: Option<String>,
    pub creation_date_time: Option<NaiveDateTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Read EXIF from an in-memory JPEG. No EXIF block → default.
pub fn read_exif(data: &[u8]) -> ExifData {
    match Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => from_exif(&exif),
        Err(_) => ExifData::default(),
    }
}

fn from_exif(exif: &Exif) -> ExifData {
    let string = |tag| {
        exif.get_field(tag, In::PRIMARY)
            .and_then(|f| exif_string(&f.value))
    };

    let creation_date_time = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime]
        .into_iter()
        .find_map(|tag| string(tag).and_then(|raw| parse_exif_datetime(&raw)));

    ExifData {
        camera_make: string(Tag::Make),
        camera_model: string(Tag::Model),
        lens_make: string(Tag::LensMake),
        lens_model: string(Tag::LensModel),
        description: string(Tag::ImageDescription),
        creation_date_time,
        latitude: gps_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 'S'),
        longitude: gps_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 'W'),
    }
}

fn exif_string(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(values) => values
            .first()
            .and_then(|raw| std::str::from_utf8(raw).ok())
            .map(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// EXIF dates are `YYYY:MM:DD HH:MM:SS` with no zone.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y:%m:%d %H:%M:%S").ok()
}

/// Degrees/minutes/seconds rationals to signed decimal degrees.
fn gps_coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag, negative: char) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let Value::Rational(parts) = &field.value else {
        return None;
    };
    if parts.len() < 3 {
        return None;
    }
    let degrees = dms_to_decimal(parts[0].to_f64(), parts[1].to_f64(), parts[2].to_f64());

    let reference = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(|f| exif_string(&f.value));
    match reference {
        Some(r) if r.starts_with(negative) => Some(-degrees),
        _ => Some(degrees),
    }
}

fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}
