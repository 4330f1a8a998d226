//! File filtering logic for the scanner.

use super::MediaKind;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;

/// Image extensions accepted by default
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "heif", "gif", "webp", "tif", "tiff", "dng",
];

/// Video extensions accepted by default
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "avi", "mkv", "3gp"];

/// Decides which files are candidates and what kind of media they are
#[derive(Debug, Clone)]
pub struct MediaFilter {
    /// Lowercase extensions without the dot
    extensions: HashSet<String>,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl MediaFilter {
    /// Accept every default image and video extension
    pub fn new() -> Self {
        Self {
            extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .chain(DEFAULT_VIDEO_EXTENSIONS)
                .map(|e| e.to_string())
                .collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Replace the accepted extensions.
    ///
    /// Entries are trimmed, lowercased and may carry a leading dot
    /// (`".JPG"` and `"jpg"` are the same).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Whether hidden entries are accepted
    pub fn includes_hidden(&self) -> bool {
        self.include_hidden
    }

    /// Check a file name and extension; size is checked by the walker
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden && path.file_name().is_some_and(is_hidden_name) {
            return false;
        }

        match extension_of(path) {
            Some(ext) => self.extensions.contains(&ext),
            None => false,
        }
    }

    /// Classify a path by extension
    pub fn kind_of(&self, path: &Path) -> MediaKind {
        extension_of(path)
            .map(|ext| MediaKind::from_extension(&ext))
            .unwrap_or(MediaKind::Other)
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Dot-files are hidden
pub(crate) fn is_hidden_name(name: &OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_lowercase()
}
