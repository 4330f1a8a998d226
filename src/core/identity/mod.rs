//! # Identity Module
//!
//! Decides whether two files hold byte-identical content.
//!
//! ## Stages
//! 1. **Size** - different sizes are never identical; only a stat is needed
//! 2. **Partial digest** - SHA-256 over the first 1 MiB of each file
//! 3. **Full digest** - SHA-256 over the whole file, only when stage 2 matched
//!
//! Names, timestamps and permissions play no part in the decision.

mod digest;

pub use digest::{digest_file, ContentDigest};

use crate::error::IdentityError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::trace;

/// Default leading window hashed in stage 2
pub const PARTIAL_WINDOW_BYTES: u64 = 1024 * 1024;

/// Default read size while streaming
pub const CHUNK_BYTES: usize = 1024 * 1024;

/// Which stage settled a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Sizes differ; no content was read
    SizeMismatch,
    /// Leading windows differ
    PartialDigestMismatch,
    /// Leading windows match but the full content differs
    FullDigestMismatch,
    /// Same bytes
    Identical,
}

impl Verdict {
    pub fn is_identical(&self) -> bool {
        matches!(self, Verdict::Identical)
    }
}

/// Tuning for the staged comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Bytes hashed by the partial stage
    pub partial_window: u64,
    /// Bytes read per I/O call
    pub chunk_size: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            partial_window: PARTIAL_WINDOW_BYTES,
            chunk_size: CHUNK_BYTES,
        }
    }
}

/// Staged content comparator.
///
/// Holds no state besides its configuration, so one instance can be
/// shared by every worker of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityComparator {
    config: IdentityConfig,
}

impl IdentityComparator {
    pub fn new(config: IdentityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// True when both files hold the same bytes
    pub fn are_identical(&self, a: &Path, b: &Path) -> Result<bool, IdentityError> {
        Ok(self.compare(a, b)?.is_identical())
    }

    /// Compare two files, reporting which stage decided
    pub fn compare(&self, a: &Path, b: &Path) -> Result<Verdict, IdentityError> {
        let size_a = file_size(a)?;
        if a == b {
            return Ok(Verdict::Identical);
        }
        let size_b = file_size(b)?;

        if size_a != size_b {
            return Ok(Verdict::SizeMismatch);
        }

        if self.partial_digest(a)? != self.partial_digest(b)? {
            trace!(a = %a.display(), b = %b.display(), "partial digest mismatch");
            return Ok(Verdict::PartialDigestMismatch);
        }

        // The window already covered every byte
        if size_a <= self.config.partial_window {
            return Ok(Verdict::Identical);
        }

        if self.full_digest(a)? != self.full_digest(b)? {
            trace!(a = %a.display(), b = %b.display(), "full digest mismatch");
            return Ok(Verdict::FullDigestMismatch);
        }

        Ok(Verdict::Identical)
    }

    /// Digest of the leading window
    pub fn partial_digest(&self, path: &Path) -> Result<ContentDigest, IdentityError> {
        digest_file(path, Some(self.config.partial_window), self.config.chunk_size)
    }

    /// Digest of the whole file
    pub fn full_digest(&self, path: &Path) -> Result<ContentDigest, IdentityError> {
        digest_file(path, None, self.config.chunk_size)
    }
}

/// Convenience wrapper using the default configuration
pub fn are_identical(a: &Path, b: &Path) -> Result<bool, IdentityError> {
    IdentityComparator::default().are_identical(a, b)
}

fn file_size(path: &Path) -> Result<u64, IdentityError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| IdentityError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn small_window() -> IdentityComparator {
        IdentityComparator::new(IdentityConfig {
            partial_window: 8,
            chunk_size: 3,
        })
    }

    #[test]
    fn identical_content_different_names() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.jpg", b"holiday bytes");
        let b = write(&dir, "copy of a.jpg", b"holiday bytes");

        assert!(are_identical(&a, &b).unwrap());
    }

    #[test]
    fn comparison_is_symmetric() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.jpg", b"aaaa");
        let b = write(&dir, "b.jpg", b"aaab");
        let comparator = IdentityComparator::default();

        assert_eq!(
            comparator.compare(&a, &b).unwrap(),
            comparator.compare(&b, &a).unwrap()
        );
    }

    #[test]
    fn comparison_is_reflexive() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.jpg", b"anything");

        assert_eq!(
            IdentityComparator::default().compare(&a, &a).unwrap(),
            Verdict::Identical
        );
    }

    #[test]
    fn different_sizes_stop_at_first_stage() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.jpg", b"short");
        let b = write(&dir, "b.jpg", b"a little longer");

        assert_eq!(
            IdentityComparator::default().compare(&a, &b).unwrap(),
            Verdict::SizeMismatch
        );
    }

    #[test]
    fn differing_prefix_stops_at_partial_stage() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.jpg", b"XXXXXXXX-same-tail");
        let b = write(&dir, "b.jpg", b"YYYYYYYY-same-tail");

        assert_eq!(
            small_window().compare(&a, &b).unwrap(),
            Verdict::PartialDigestMismatch
        );
    }

    #[test]
    fn divergence_past_window_needs_full_stage() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.jpg", b"same-pre-tail-one");
        let b = write(&dir, "b.jpg", b"same-pre-tail-two");

        assert_eq!(
            small_window().compare(&a, &b).unwrap(),
            Verdict::FullDigestMismatch
        );
    }

    #[test]
    fn large_identical_files_match_after_full_stage() {
        let dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 256) as u8).collect();
        let a = write(&dir, "a.mp4", &content);
        let b = write(&dir, "b.mp4", &content);

        assert_eq!(small_window().compare(&a, &b).unwrap(), Verdict::Identical);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.jpg", b"data");
        let missing = dir.path().join("gone.jpg");

        let err = are_identical(&a, &missing).unwrap_err();
        assert_eq!(err.path(), &missing);
    }
}
