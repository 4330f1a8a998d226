//! # Metadata Module
//!
//! Maps a media file to an optional capture date (and, for photos, an
//! optional GPS position).
//!
//! ## Sources
//! - Images: EXIF `DateTimeOriginal`, plus GPS latitude/longitude
//! - Videos: container `creation_time` reported by `ffprobe`
//!
//! A file without usable metadata is normal. Providers never fail: they
//! return `None` and the organizer files the item under the unknown-date
//! folder.

mod exif_reader;
pub mod gps;
mod video;

pub use exif_reader::{parse_exif_datetime, ExifReader};
pub use gps::Coordinates;
pub use video::{parse_creation_time, parse_probe_creation_time, FfprobeReader};

use crate::core::scanner::{MediaFile, MediaKind};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Metadata extracted from one file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Capture date in local wall-clock time
    pub capture_date: Option<NaiveDateTime>,
    /// Where the photo was taken, if recorded
    pub coordinates: Option<Coordinates>,
}

impl MediaMetadata {
    /// Metadata with only a capture date
    pub fn dated(date: NaiveDateTime) -> Self {
        Self {
            capture_date: Some(date),
            coordinates: None,
        }
    }

    /// Check if any metadata was extracted
    pub fn has_data(&self) -> bool {
        self.capture_date.is_some() || self.coordinates.is_some()
    }
}

/// Trait for metadata sources.
///
/// Implement this to plug in another extractor (e.g. exiftool) or a
/// fixed answer for tests.
pub trait MetadataProvider: Send + Sync {
    fn read(&self, file: &MediaFile) -> MediaMetadata;
}

/// Default provider: EXIF for images, ffprobe for videos
#[derive(Debug, Clone, Default)]
pub struct MediaMetadataReader {
    exif: ExifReader,
    video: FfprobeReader,
}

impl MediaMetadataReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific ffprobe binary for videos
    pub fn with_ffprobe(mut self, reader: FfprobeReader) -> Self {
        self.video = reader;
        self
    }
}

impl MetadataProvider for MediaMetadataReader {
    fn read(&self, file: &MediaFile) -> MediaMetadata {
        match file.kind {
            MediaKind::Video => MediaMetadata {
                capture_date: self.video.capture_date(&file.path),
                coordinates: None,
            },
            MediaKind::Image | MediaKind::Other => self.exif.read(&file.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn default_metadata_has_no_data() {
        assert!(!MediaMetadata::default().has_data());
    }

    #[test]
    fn dated_metadata_has_data() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(MediaMetadata::dated(date).has_data());
    }

    #[test]
    fn video_without_ffprobe_has_no_date() {
        let reader =
            MediaMetadataReader::new().with_ffprobe(FfprobeReader::with_binary("/nonexistent/ffprobe"));
        let file = MediaFile::new("/nonexistent/clip.mp4", 10, MediaKind::Video);

        assert_eq!(reader.read(&file), MediaMetadata::default());
    }
}
