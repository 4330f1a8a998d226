//! Directory walking implementation using walkdir.

use super::filter::{is_hidden_name, MediaFilter};
use super::{FileListing, FileStream, MediaFile};
use crate::error::ScanError;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for the directory scanner
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Custom extensions to accept (None = defaults)
    pub extensions: Option<Vec<String>>,
}

/// Scanner implementation using the walkdir crate
#[derive(Debug, Clone)]
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: MediaFilter,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = MediaFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions);
        }

        Self { config, filter }
    }

    /// The filter this scanner applies
    pub fn filter(&self) -> &MediaFilter {
        &self.filter
    }

    fn check_root(root: &Path) -> Result<(), ScanError> {
        if !root.exists() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        Ok(())
    }

    fn entry_error(error: walkdir::Error) -> ScanError {
        let path = error.path().map(|p| p.to_path_buf()).unwrap_or_default();

        if error.io_error().map(|e| e.kind()) == Some(io::ErrorKind::PermissionDenied) {
            ScanError::PermissionDenied { path }
        } else {
            let source = error
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
            ScanError::ReadEntry { path, source }
        }
    }
}

impl FileListing for WalkDirScanner {
    fn list(&self, root: &Path) -> Result<FileStream<'_>, ScanError> {
        Self::check_root(root)?;

        let mut walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        let include_hidden = self.filter.includes_hidden();
        let filter = &self.filter;

        let files = walker
            .into_iter()
            // Prune hidden directories below the root instead of descending
            .filter_entry(move |entry| {
                include_hidden || entry.depth() == 0 || !is_hidden_name(entry.file_name())
            })
            .filter_map(move |entry_result| {
                let entry = match entry_result {
                    Ok(entry) => entry,
                    Err(e) => return Some(Err(Self::entry_error(e))),
                };

                if !entry.file_type().is_file() || !filter.should_include(entry.path()) {
                    return None;
                }

                let metadata = match entry.metadata() {
                    Ok(metadata) => metadata,
                    Err(e) => return Some(Err(Self::entry_error(e))),
                };

                if metadata.len() == 0 {
                    debug!(path = %entry.path().display(), "skipping empty file");
                    return None;
                }

                let kind = filter.kind_of(entry.path());
                Some(Ok(MediaFile::new(entry.into_path(), metadata.len(), kind)))
            });

        Ok(Box::new(files))
    }
}
