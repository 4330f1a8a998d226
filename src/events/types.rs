//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the organize and duplicate-detection runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// File listing events
    Scan(ScanEvent),
    /// Placement events (organize runs)
    Place(PlaceEvent),
    /// Duplicate grouping events
    Group(GroupEvent),
    /// Run-level events
    Pipeline(PipelineEvent),
}

/// Events while listing candidate files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Listing has started
    Started { root: PathBuf },
    /// A candidate file was found
    FileFound { path: PathBuf, size: u64 },
    /// An entry could not be read; listing continues
    Error { path: PathBuf, message: String },
    /// Listing finished
    Completed { total_files: usize },
}

/// How a single placement ended, without the error payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceStatus {
    Placed,
    SkippedIdentical,
    Renamed,
    Failed,
}

/// Events while placing files into the destination tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlaceEvent {
    /// A worker picked up a file
    Started { index: usize, path: PathBuf },
    /// A file was handled
    Finished(PlaceProgress),
}

/// Progress information for one placed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceProgress {
    /// Files finished so far, this one included
    pub completed: usize,
    /// Source path
    pub path: PathBuf,
    /// Where it ended up (or would have)
    pub destination: Option<PathBuf>,
    /// Outcome
    pub status: PlaceStatus,
}

/// Events while grouping duplicates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GroupEvent {
    /// Grouping started over this many same-size buckets
    Started {
        candidate_buckets: usize,
        candidate_files: usize,
    },
    /// One bucket was fully compared
    BucketCompared(GroupProgress),
    /// A duplicate group was found
    DuplicateFound { size: u64, members: usize },
    /// Grouping finished
    Completed {
        total_groups: usize,
        total_duplicates: usize,
    },
}

/// Progress information during grouping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupProgress {
    /// Buckets finished so far
    pub buckets_completed: usize,
    /// Buckets with two or more members
    pub total_buckets: usize,
    /// Pairwise comparisons performed in the finished bucket
    pub comparisons: usize,
}

/// Run-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Run has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Run completed
    Completed { duration_ms: u64 },
    /// Run was cancelled between files
    Cancelled,
    /// Run stopped on a fatal error
    Error { message: String },
}

/// Phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Placing,
    Grouping,
    Acting,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Placing => write!(f, "Placing"),
            PipelinePhase::Grouping => write!(f, "Grouping"),
            PipelinePhase::Acting => write!(f, "Applying action"),
        }
    }
}
