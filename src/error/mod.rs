//! # Error Module
//!
//! Error types for the media arranger.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Isolate per file** - only a full destination disk or a bad
//!   configuration stops a run; everything else is counted and skipped
//!
//! A missing or malformed capture date is not an error at all: metadata
//! providers return `None` and the file lands in the unknown-date folder.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ArrangeError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Comparison error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Placement error: {0}")]
    Placement(#[from] PlacementError),

    #[error("Duplicate action error: {0}")]
    Action(#[from] ActionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Errors that occur while listing candidate files
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadEntry {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// The path the error refers to
    pub fn path(&self) -> &PathBuf {
        match self {
            ScanError::DirectoryNotFound { path }
            | ScanError::NotADirectory { path }
            | ScanError::PermissionDenied { path }
            | ScanError::ReadEntry { path, .. } => path,
        }
    }
}

/// Errors raised while deciding whether two files hold the same bytes
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl IdentityError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        IdentityError::Io {
            path: path.into(),
            source,
        }
    }

    /// The file that could not be read
    pub fn path(&self) -> &PathBuf {
        match self {
            IdentityError::Io { path, .. } => path,
        }
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            IdentityError::Io { source, .. } => source.kind(),
        }
    }
}

/// Errors raised while placing one file into the destination tree
#[derive(Error, Debug)]
pub enum PlacementError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No free name for {path} after {attempts} attempts")]
    CollisionResolution { path: PathBuf, attempts: u32 },

    #[error("Destination is full while writing {path}")]
    StorageFull { path: PathBuf },

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl PlacementError {
    /// Wrap an I/O error, promoting a full disk to [`PlacementError::StorageFull`]
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::StorageFull {
            PlacementError::StorageFull { path }
        } else {
            PlacementError::Io { path, source }
        }
    }

    /// Whether this failure should stop the whole run instead of one file
    pub fn is_fatal(&self) -> bool {
        match self {
            PlacementError::StorageFull { .. } => true,
            PlacementError::Identity(e) => e.io_kind() == io::ErrorKind::StorageFull,
            _ => false,
        }
    }
}

/// Errors raised by a move/delete action on one duplicate
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Failed to move {path} to {destination}: {source}")]
    Move {
        path: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Copy verification failed for {path}: source {expected} bytes, copy {actual} bytes")]
    VerificationFailed {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("No free name in {directory} for {name}")]
    NoFreeName { directory: PathBuf, name: String },
}

/// Invalid user-supplied settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown directory layout \"{value}\" (expected YYYY/MMM or YYYY/MMM/DD)")]
    UnknownLayout { value: String },

    #[error("Input dir \"{input}\" and output dir \"{output}\" can't overlap")]
    OverlappingDirectories { input: PathBuf, output: PathBuf },

    #[error("Input dir \"{path}\" is not readable: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error("{0}")]
    Invalid(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ArrangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/photos/vacation"),
        };
        assert!(error.to_string().contains("/photos/vacation"));
    }

    #[test]
    fn storage_full_is_promoted_and_fatal() {
        let error = PlacementError::io(
            "/dest/2024/Mar/a.jpg",
            io::Error::from(io::ErrorKind::StorageFull),
        );
        assert!(matches!(error, PlacementError::StorageFull { .. }));
        assert!(error.is_fatal());
    }

    #[test]
    fn ordinary_io_failure_is_not_fatal() {
        let error = PlacementError::io(
            "/dest/a.jpg",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(error, PlacementError::Io { .. }));
        assert!(!error.is_fatal());
    }

    #[test]
    fn collision_error_mentions_attempts() {
        let error = PlacementError::CollisionResolution {
            path: PathBuf::from("/dest/a.jpg"),
            attempts: 1000,
        };
        let message = error.to_string();
        assert!(message.contains("/dest/a.jpg"));
        assert!(message.contains("1000"));
    }

    #[test]
    fn overlapping_directories_names_both() {
        let error = ConfigError::OverlappingDirectories {
            input: PathBuf::from("/photos"),
            output: PathBuf::from("/photos/sorted"),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/sorted"));
        assert!(message.contains("can't overlap"));
    }
}
