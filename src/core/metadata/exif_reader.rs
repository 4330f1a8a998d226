//! EXIF capture date and GPS extraction for still images.

use super::gps::{coordinates_from_dms, Coordinates};
use super::MediaMetadata;
use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// EXIF date format: "YYYY:MM:DD HH:MM:SS"
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Reads `DateTimeOriginal` and GPS position with kamadak-exif
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifReader;

impl ExifReader {
    pub fn new() -> Self {
        Self
    }

    /// Read everything we use from one file; unreadable EXIF yields empty metadata
    pub fn read(&self, path: &Path) -> MediaMetadata {
        let Some(exif) = Self::open(path) else {
            return MediaMetadata::default();
        };

        MediaMetadata {
            capture_date: Self::capture_date(&exif, path),
            coordinates: Self::coordinates(&exif),
        }
    }

    fn open(path: &Path) -> Option<Exif> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Some(exif),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no readable EXIF");
                None
            }
        }
    }

    fn capture_date(exif: &Exif, path: &Path) -> Option<NaiveDateTime> {
        let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
        let raw = ascii_value(&field.value)?;
        let parsed = parse_exif_datetime(&raw);
        if parsed.is_none() {
            debug!(path = %path.display(), value = %raw, "malformed DateTimeOriginal");
        }
        parsed
    }

    fn coordinates(exif: &Exif) -> Option<Coordinates> {
        let latitude = rational_values(&exif.get_field(Tag::GPSLatitude, In::PRIMARY)?.value)?;
        let longitude = rational_values(&exif.get_field(Tag::GPSLongitude, In::PRIMARY)?.value)?;
        let latitude_ref = ascii_value(&exif.get_field(Tag::GPSLatitudeRef, In::PRIMARY)?.value)?;
        let longitude_ref =
            ascii_value(&exif.get_field(Tag::GPSLongitudeRef, In::PRIMARY)?.value)?;

        coordinates_from_dms(&latitude, &latitude_ref, &longitude, &longitude_ref)
    }
}

/// Parse an EXIF timestamp; it carries no zone and is taken as local time
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim_matches(|c: char| c == '"' || c == '\0' || c.is_whitespace());
    NaiveDateTime::parse_from_str(trimmed, EXIF_DATETIME_FORMAT).ok()
}

fn ascii_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        let bytes = vec.first()?;
        let s = std::str::from_utf8(bytes).ok()?;
        let trimmed = s.trim_end_matches('\0').trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    None
}

fn rational_values(value: &Value) -> Option<Vec<f64>> {
    match value {
        Value::Rational(vec) if !vec.is_empty() => Some(vec.iter().map(|r| r.to_f64()).collect()),
        _ => None,
    }
}
