//! # Scanner Module
//!
//! Lists candidate media files under a root directory.
//!
//! Candidates are regular, non-hidden, non-empty files with an accepted
//! extension. Listing is lazy: the walker yields files while it descends,
//! so an organize run can start placing before traversal finishes.
//!
//! ## Example
//! ```rust,ignore
//! use media_arranger::core::scanner::{FileListing, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! for file in scanner.list("/Users/me/Pictures".as_ref())? {
//!     println!("{}", file?.path.display());
//! }
//! ```

mod filter;
mod walker;

pub use filter::{MediaFilter, DEFAULT_IMAGE_EXTENSIONS, DEFAULT_VIDEO_EXTENSIONS};
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// A discovered media file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes at discovery time
    pub size: u64,
    /// Image or video, by extension
    pub kind: MediaKind,
    /// Capture date in local wall-clock time, once a metadata provider ran
    pub capture_date: Option<NaiveDateTime>,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>, size: u64, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            size,
            kind,
            capture_date: None,
        }
    }

    /// Attach the capture date found by a metadata provider
    pub fn with_capture_date(mut self, date: Option<NaiveDateTime>) -> Self {
        self.capture_date = date;
        self
    }

    /// Final path component; `None` only for paths such as `/` or `..`
    pub fn file_name(&self) -> Option<&OsStr> {
        self.path.file_name()
    }
}

/// Broad media category used for statistics and metadata lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    /// Accepted through a custom extension list but neither of the above
    Other,
}

impl MediaKind {
    /// Classify from a file extension (without dot, any case)
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_lowercase();
        if DEFAULT_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if DEFAULT_VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }
}

/// A lazy, finite stream of candidate files
pub type FileStream<'a> = Box<dyn Iterator<Item = Result<MediaFile, ScanError>> + Send + 'a>;

/// Source of candidate files.
///
/// Implement this to feed the engines from something other than a local
/// directory walk (tests, archives, remote listings).
pub trait FileListing: Send + Sync {
    /// Start listing under `root`.
    ///
    /// Fails up front when the root itself is unusable; per-entry
    /// problems are yielded as `Err` items and listing continues.
    fn list(&self, root: &Path) -> Result<FileStream<'_>, ScanError>;
}
