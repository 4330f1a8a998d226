//! Streaming SHA-256 digests over a whole file or its leading window.

use crate::error::IdentityError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// A SHA-256 digest of file content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest([u8; 32]);

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Hash at most `limit` leading bytes (all bytes when `None`), reading
/// `chunk_size` bytes at a time.
pub fn digest_file(
    path: &Path,
    limit: Option<u64>,
    chunk_size: usize,
) -> Result<ContentDigest, IdentityError> {
    let file = File::open(path).map_err(|e| IdentityError::io(path, e))?;
    let mut buffer = vec![0u8; chunk_size.max(1)];

    let hasher = match limit {
        Some(limit) => stream(file.take(limit), &mut buffer),
        None => stream(file, &mut buffer),
    }
    .map_err(|e| IdentityError::io(path, e))?;

    Ok(ContentDigest(hasher.finalize().into()))
}

fn stream<R: Read>(mut reader: R, buffer: &mut [u8]) -> io::Result<Sha256> {
    let mut hasher = Sha256::new();
    loop {
        match reader.read(buffer) {
            Ok(0) => return Ok(hasher),
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
