//! Duplicate detection run: scan, group by content, then act.

use super::{validate_source, CancellationToken, FileFailure};
use crate::core::grouping::{
    ActionReport, DuplicateAction, DuplicateActionExecutor, DuplicateGroup, DuplicateGrouper,
    SizeBuckets,
};
use crate::core::identity::IdentityComparator;
use crate::core::scanner::{FileListing, ScanConfig, WalkDirScanner};
use crate::core::stats::{RunStats, StatsSummary};
use crate::error::{ArrangeError, ConfigError};
use crate::events::{null_sender, Event, EventSender, PipelineEvent, PipelinePhase, ScanEvent};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{info, warn};

/// Result of a duplicate detection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupReport {
    /// Duplicate groups, canonical member first
    pub groups: Vec<DuplicateGroup>,
    /// Files listed under the root
    pub files_scanned: usize,
    /// Bytes held by non-canonical members
    pub reclaimable_bytes: u64,
    /// What the configured action did
    pub action: ActionReport,
    /// Files that could not be listed or read
    pub errors: Vec<FileFailure>,
    pub stats: StatsSummary,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl DedupReport {
    /// Files that are not canonical in their group
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.duplicates().len()).sum()
    }
}

/// Builder for [`DedupPipeline`]
#[derive(Default)]
pub struct DedupPipelineBuilder {
    root: PathBuf,
    scan_config: ScanConfig,
    action: DuplicateAction,
    comparator: IdentityComparator,
    listing: Option<Box<dyn FileListing>>,
    cancel: CancellationToken,
}

impl DedupPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory to search
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// What to do with duplicates once found
    pub fn action(mut self, action: DuplicateAction) -> Self {
        self.action = action;
        self
    }

    /// Accept only these extensions
    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.scan_config.extensions = Some(extensions);
        self
    }

    /// Include hidden files and directories
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.scan_config.include_hidden = include;
        self
    }

    /// Descend into symlinked directories
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.scan_config.follow_symlinks = follow;
        self
    }

    /// Stop descending below this depth (the root is depth 0)
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.scan_config.max_depth = depth;
        self
    }

    pub fn comparator(mut self, comparator: IdentityComparator) -> Self {
        self.comparator = comparator;
        self
    }

    /// Replace the directory walker
    pub fn listing(mut self, listing: Box<dyn FileListing>) -> Self {
        self.listing = Some(listing);
        self
    }

    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Result<DedupPipeline, ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("input directory is required".into()));
        }
        let scan_config = self.scan_config;
        Ok(DedupPipeline {
            root: self.root,
            action: self.action,
            comparator: self.comparator,
            listing: self
                .listing
                .unwrap_or_else(|| Box::new(WalkDirScanner::new(scan_config))),
            cancel: self.cancel,
        })
    }
}

/// Finds byte-identical files under one root
pub struct DedupPipeline {
    root: PathBuf,
    action: DuplicateAction,
    comparator: IdentityComparator,
    listing: Box<dyn FileListing>,
    cancel: CancellationToken,
}

impl DedupPipeline {
    pub fn builder() -> DedupPipelineBuilder {
        DedupPipelineBuilder::new()
    }

    pub fn action(&self) -> &DuplicateAction {
        &self.action
    }

    /// Run without events
    pub fn run(&self) -> Result<DedupReport, ArrangeError> {
        self.run_with_events(&null_sender())
    }

    /// Run with event reporting
    pub fn run_with_events(&self, events: &EventSender) -> Result<DedupReport, ArrangeError> {
        let start = Instant::now();
        validate_source(&self.root)?;

        events.send(Event::Pipeline(PipelineEvent::Started));

        // Phase 1: Scanning
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Scanning,
        }));
        events.send(Event::Scan(ScanEvent::Started {
            root: self.root.clone(),
        }));

        // Files already moved aside are not candidates again
        let excluded = match &self.action {
            DuplicateAction::Move { destination } => Some(destination.as_path()),
            _ => None,
        };

        let stats = RunStats::new();
        let buckets = SizeBuckets::new();
        let errors = Mutex::new(Vec::new());

        self.listing.list(&self.root)?.par_bridge().for_each(|item| {
            if self.cancel.is_cancelled() {
                return;
            }
            match item {
                Ok(file) => {
                    if excluded.is_some_and(|dir| file.path.starts_with(dir)) {
                        return;
                    }
                    stats.record_file(file.kind, file.size, true);
                    events.send(Event::Scan(ScanEvent::FileFound {
                        path: file.path.clone(),
                        size: file.size,
                    }));
                    buckets.insert(file);
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    events.send(Event::Scan(ScanEvent::Error {
                        path: e.path().clone(),
                        message: e.to_string(),
                    }));
                    stats.record_error();
                    errors
                        .lock()
                        .unwrap_or_else(|p| p.into_inner())
                        .push(FileFailure::from(&e));
                }
            }
        });

        let files_scanned = buckets.file_count();
        events.send(Event::Scan(ScanEvent::Completed {
            total_files: files_scanned,
        }));
        info!(files = files_scanned, root = %self.root.display(), "Scan finished");

        // Phase 2: Grouping
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Grouping,
        }));

        let grouping = DuplicateGrouper::new()
            .with_comparator(self.comparator)
            .with_events(events.clone())
            .with_cancellation(self.cancel.clone())
            .group(buckets);

        let mut errors = errors.into_inner().unwrap_or_else(|p| p.into_inner());
        for e in &grouping.errors {
            stats.record_error();
            errors.push(FileFailure::new(e.path(), e));
        }
        stats.add_duplicates(grouping.duplicate_count() as u64);

        // Phase 3: Acting
        let mut cancelled = self.cancel.is_cancelled();
        let action = if cancelled {
            ActionReport::default()
        } else {
            events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
                phase: PipelinePhase::Acting,
            }));
            DuplicateActionExecutor::new(self.action.clone())
                .with_cancellation(self.cancel.clone())
                .execute(&grouping.groups)
        };
        cancelled |= action.cancelled;

        let duration_ms = start.elapsed().as_millis() as u64;
        if cancelled {
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
        } else {
            events.send(Event::Pipeline(PipelineEvent::Completed { duration_ms }));
        }

        let reclaimable_bytes = grouping.reclaimable_bytes();
        info!(
            groups = grouping.groups.len(),
            reclaimable_bytes,
            duration_ms,
            "Duplicate detection finished"
        );

        Ok(DedupReport {
            groups: grouping.groups,
            files_scanned,
            reclaimable_bytes,
            action,
            errors,
            stats: stats.summary(),
            cancelled,
            duration_ms,
        })
    }
}
