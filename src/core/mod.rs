//! # Core Module
//!
//! The media arranging engine, independent of any front end.
//!
//! ## Modules
//! - `scanner` - Lists candidate media files under a directory
//! - `metadata` - Reads capture dates from EXIF and video containers
//! - `identity` - Decides whether two files hold the same bytes
//! - `grouping` - Finds sets of identical files and acts on them
//! - `placement` - Copies files into a date-based folder tree
//! - `stats` - Counts what a run did
//! - `pipeline` - Orchestrates organize and duplicate detection runs

pub mod grouping;
pub mod identity;
pub mod metadata;
pub mod pipeline;
pub mod placement;
pub mod scanner;
pub mod stats;

// Re-export commonly used types
pub use grouping::{group_duplicates, DuplicateAction, DuplicateGroup};
pub use identity::are_identical;
pub use metadata::{MediaMetadata, MetadataProvider};
pub use placement::{place, DirectoryLayout, PlacementOutcome};
pub use scanner::{FileListing, MediaFile, MediaKind};
pub use stats::{RunStats, StatsSummary};
