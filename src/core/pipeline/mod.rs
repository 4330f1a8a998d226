//! # Pipeline Module
//!
//! Orchestrates whole runs over a directory tree.
//!
//! ## Organize
//! 1. **Scan** - a producer thread walks the source tree
//! 2. **Place** - worker threads read metadata and copy each file into
//!    the dated destination tree
//!
//! ## Detect duplicates
//! 1. **Scan** - files are bucketed by size as they are found
//! 2. **Group** - same-size files are compared by content
//! 3. **Act** - duplicates are reported, moved aside or deleted
//!
//! Both runs stop cooperatively when their [`CancellationToken`] trips.

mod cancel;
mod dedup;
mod organize;

pub use cancel::CancellationToken;
pub use dedup::{DedupPipeline, DedupPipelineBuilder, DedupReport};
pub use organize::{OrganizePipeline, OrganizePipelineBuilder, OrganizeReport};

use crate::error::{ConfigError, ScanError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// A file that was skipped, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl FileFailure {
    pub fn new(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<&ScanError> for FileFailure {
    fn from(error: &ScanError) -> Self {
        FileFailure::new(error.path(), error)
    }
}

/// Default worker count: one per available core
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Check that a root exists, is a directory and can be listed
pub(crate) fn validate_source(root: &Path) -> Result<(), crate::error::ArrangeError> {
    if !root.exists() {
        return Err(ScanError::DirectoryNotFound {
            path: root.to_path_buf(),
        }
        .into());
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory {
            path: root.to_path_buf(),
        }
        .into());
    }
    fs::read_dir(root).map_err(|e| ConfigError::Unreadable {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}

/// True when one directory contains the other (or they are the same)
pub(crate) fn directories_overlap(a: &Path, b: &Path) -> bool {
    let (a, b) = (resolve(a), resolve(b));
    a.starts_with(&b) || b.starts_with(&a)
}

/// Canonical form of a path that may not exist yet: the nearest existing
/// ancestor is canonicalized and the rest is appended lexically.
fn resolve(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut resolved = canonical;
            for component in rest.iter().rev() {
                resolved.push(component);
            }
            return normalize(&resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalize(&absolute),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
