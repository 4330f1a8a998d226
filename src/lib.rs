//! # Media Arranger
//!
//! Sorts a photo and video library into a date-based folder tree and finds
//! files with identical content.
//!
//! ## Core Philosophy
//! - **Never lose a file** - sources are only read; nothing is overwritten
//! - **Content decides** - two files are duplicates only if every byte matches
//! - **Re-runs are safe** - placing the same library twice changes nothing
//!
//! ## Architecture
//! - `core` - Scanning, metadata, comparison, grouping and placement
//! - `events` - Event-driven progress reporting
//! - `error` - Error types with paths and context

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{ArrangeError, Result};

/// Initialize tracing for the library
///
/// This should be called once by the application entry point. `RUST_LOG`
/// wins when set; otherwise `verbose` selects `debug` over `warn`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // A subscriber may already be installed (tests, embedding apps)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
