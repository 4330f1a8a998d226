//! Organize run: scan the source tree and place every file by date.

use super::{default_workers, directories_overlap, validate_source, CancellationToken, FileFailure};
use crate::core::metadata::{MediaMetadataReader, MetadataProvider};
use crate::core::placement::{DirectoryLayout, PlacementContext, PlacementOutcome};
use crate::core::scanner::{FileListing, MediaFile, ScanConfig, WalkDirScanner};
use crate::core::stats::{RunStats, StatsSummary};
use crate::error::{ArrangeError, ConfigError, PlacementError};
use crate::events::{
    null_sender, Event, EventSender, PipelineEvent, PipelinePhase, PlaceEvent, PlaceProgress,
    ScanEvent,
};
use crossbeam_channel::bounded;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Queue slots per worker between the scanner and the workers
const QUEUE_SLOTS_PER_WORKER: usize = 4;

/// Result of an organize run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeReport {
    /// Counters for the run
    pub stats: StatsSummary,
    /// Files that could not be listed or placed
    pub failures: Vec<FileFailure>,
    /// The run stopped early; files placed so far are kept
    pub cancelled: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Settings for an organize run
#[derive(Debug, Clone)]
pub struct OrganizeConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub layout: DirectoryLayout,
    pub workers: usize,
    pub scan_config: ScanConfig,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            layout: DirectoryLayout::default(),
            workers: default_workers(),
            scan_config: ScanConfig::default(),
        }
    }
}

/// Builder for [`OrganizePipeline`]
#[derive(Default)]
pub struct OrganizePipelineBuilder {
    config: OrganizeConfig,
    listing: Option<Box<dyn FileListing>>,
    metadata: Option<Box<dyn MetadataProvider>>,
    cancel: CancellationToken,
}

impl OrganizePipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory to read media from
    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.config.source = source.into();
        self
    }

    /// Root of the dated tree
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.config.destination = destination.into();
        self
    }

    pub fn layout(mut self, layout: DirectoryLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Number of placement workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Accept only these extensions
    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.scan_config.extensions = Some(extensions);
        self
    }

    /// Include hidden files and directories
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.scan_config.include_hidden = include;
        self
    }

    /// Descend into symlinked directories
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.scan_config.follow_symlinks = follow;
        self
    }

    /// Stop descending below this depth (the root is depth 0)
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.config.scan_config.max_depth = depth;
        self
    }

    /// Replace the directory walker
    pub fn listing(mut self, listing: Box<dyn FileListing>) -> Self {
        self.listing = Some(listing);
        self
    }

    /// Replace the metadata reader
    pub fn metadata(mut self, metadata: Box<dyn MetadataProvider>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Result<OrganizePipeline, ConfigError> {
        if self.config.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.config.source.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("input directory is required".into()));
        }
        if self.config.destination.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output directory is required".into()));
        }

        let scan_config = self.config.scan_config.clone();
        Ok(OrganizePipeline {
            config: self.config,
            listing: self
                .listing
                .unwrap_or_else(|| Box::new(WalkDirScanner::new(scan_config))),
            metadata: self
                .metadata
                .unwrap_or_else(|| Box::new(MediaMetadataReader::new())),
            cancel: self.cancel,
        })
    }
}

/// Copies a media tree into a date-based layout
pub struct OrganizePipeline {
    config: OrganizeConfig,
    listing: Box<dyn FileListing>,
    metadata: Box<dyn MetadataProvider>,
    cancel: CancellationToken,
}

/// State shared by the scanner thread and the workers of one run
struct RunState<'a> {
    context: PlacementContext,
    stats: RunStats,
    failures: Mutex<Vec<FileFailure>>,
    fatal: Mutex<Option<PlacementError>>,
    halt: CancellationToken,
    completed: AtomicUsize,
    events: &'a EventSender,
}

impl RunState<'_> {
    fn fail(&self, failure: FileFailure) {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(failure);
    }
}

impl OrganizePipeline {
    pub fn builder() -> OrganizePipelineBuilder {
        OrganizePipelineBuilder::new()
    }

    pub fn config(&self) -> &OrganizeConfig {
        &self.config
    }

    /// Run without events
    pub fn run(&self) -> Result<OrganizeReport, ArrangeError> {
        self.run_with_events(&null_sender())
    }

    /// Run with event reporting.
    ///
    /// Per-file failures end up in the report. Only invalid directories
    /// and a full destination disk return an error.
    pub fn run_with_events(&self, events: &EventSender) -> Result<OrganizeReport, ArrangeError> {
        let start = Instant::now();
        let source = &self.config.source;
        let destination = &self.config.destination;

        validate_source(source)?;
        if directories_overlap(source, destination) {
            return Err(ConfigError::OverlappingDirectories {
                input: source.clone(),
                output: destination.clone(),
            }
            .into());
        }

        let stream = self.listing.list(source)?;

        events.send(Event::Pipeline(PipelineEvent::Started));
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Placing,
        }));
        events.send(Event::Scan(ScanEvent::Started {
            root: source.clone(),
        }));
        info!(
            source = %source.display(),
            destination = %destination.display(),
            layout = %self.config.layout,
            workers = self.config.workers,
            "Organizing"
        );

        let state = RunState {
            context: PlacementContext::new(destination, self.config.layout),
            stats: RunStats::new(),
            failures: Mutex::new(Vec::new()),
            fatal: Mutex::new(None),
            halt: CancellationToken::new(),
            completed: AtomicUsize::new(0),
            events,
        };

        let (tx, rx) = bounded::<(usize, MediaFile)>(self.config.workers * QUEUE_SLOTS_PER_WORKER);

        thread::scope(|scope| {
            let state = &state;

            scope.spawn(move || {
                let mut found = 0usize;
                for item in stream {
                    if self.stopped(state) {
                        break;
                    }
                    match item {
                        Ok(file) => {
                            events.send(Event::Scan(ScanEvent::FileFound {
                                path: file.path.clone(),
                                size: file.size,
                            }));
                            if tx.send((found, file)).is_err() {
                                break;
                            }
                            found += 1;
                        }
                        Err(e) => {
                            warn!(error = %e, "Skipping unreadable entry");
                            events.send(Event::Scan(ScanEvent::Error {
                                path: e.path().clone(),
                                message: e.to_string(),
                            }));
                            state.stats.record_error();
                            state.fail(FileFailure::from(&e));
                        }
                    }
                }
                events.send(Event::Scan(ScanEvent::Completed { total_files: found }));
            });

            for _ in 0..self.config.workers {
                let rx = rx.clone();
                scope.spawn(move || {
                    for (index, file) in rx.iter() {
                        if self.stopped(state) {
                            break;
                        }
                        self.process(index, &file, state);
                    }
                });
            }
            drop(rx);
        });

        let duration_ms = start.elapsed().as_millis() as u64;
        let RunState {
            stats,
            failures,
            fatal,
            ..
        } = state;

        if let Some(e) = fatal.into_inner().unwrap_or_else(|p| p.into_inner()) {
            error!(error = %e, "Organize run aborted");
            events.send(Event::Pipeline(PipelineEvent::Error {
                message: e.to_string(),
            }));
            return Err(e.into());
        }

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            info!("Organize run cancelled");
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
        } else {
            events.send(Event::Pipeline(PipelineEvent::Completed { duration_ms }));
        }

        let stats = stats.summary();
        info!(
            placed = stats.placed,
            duplicates = stats.duplicates,
            errors = stats.errors,
            duration_ms,
            "Organize run finished"
        );

        Ok(OrganizeReport {
            stats,
            failures: failures.into_inner().unwrap_or_else(|p| p.into_inner()),
            cancelled,
            duration_ms,
        })
    }

    fn stopped(&self, state: &RunState<'_>) -> bool {
        self.cancel.is_cancelled() || state.halt.is_cancelled()
    }

    fn process(&self, index: usize, file: &MediaFile, state: &RunState<'_>) {
        state.events.send(Event::Place(PlaceEvent::Started {
            index,
            path: file.path.clone(),
        }));

        let metadata = self.metadata.read(file);
        let capture_date = metadata.capture_date;
        if capture_date.is_none() {
            debug!(path = %file.path.display(), "No capture date");
        }
        state
            .stats
            .record_file(file.kind, file.size, capture_date.is_some());

        let outcome = state.context.place(file, capture_date);
        state.stats.record_placement(&outcome);

        let completed = state.completed.fetch_add(1, Ordering::Relaxed) + 1;
        state
            .events
            .send(Event::Place(PlaceEvent::Finished(PlaceProgress {
                completed,
                path: file.path.clone(),
                destination: outcome.destination().map(Path::to_path_buf),
                status: outcome.status(),
            })));

        if let PlacementOutcome::Failed(e) = outcome {
            if e.is_fatal() {
                state.halt.cancel();
                let mut fatal = state.fatal.lock().unwrap_or_else(|p| p.into_inner());
                if fatal.is_none() {
                    *fatal = Some(e);
                }
            } else {
                state.fail(FileFailure::new(&file.path, &e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::MediaMetadata;
    use crate::core::scanner::MediaKind;
    use crate::error::ScanError;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Dates keyed by file name
    struct FixedDates(HashMap<String, NaiveDateTime>);

    impl MetadataProvider for FixedDates {
        fn read(&self, file: &MediaFile) -> MediaMetadata {
            MediaMetadata {
                capture_date: file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(|name| self.0.get(name))
                    .copied(),
                coordinates: None,
            }
        }
    }

    /// Lists a fixed set of files regardless of what is on disk
    struct FixedListing(Vec<MediaFile>);

    impl FileListing for FixedListing {
        fn list(&self, _root: &Path) -> Result<crate::core::scanner::FileStream<'_>, ScanError> {
            Ok(Box::new(self.0.clone().into_iter().map(Ok)))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn pipeline(src: &Path, dest: &Path, dates: &[(&str, NaiveDateTime)]) -> OrganizePipelineBuilder {
        let dates = dates.iter().map(|(n, d)| (n.to_string(), *d)).collect();
        OrganizePipeline::builder()
            .source(src)
            .destination(dest)
            .layout(DirectoryLayout::YearMonthDay)
            .workers(3)
            .metadata(Box::new(FixedDates(dates)))
    }

    #[test]
    fn builder_rejects_zero_workers() {
        let result = OrganizePipeline::builder()
            .source("/in")
            .destination("/out")
            .workers(0)
            .build();
        assert!(matches!(result, Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn places_files_by_date() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(&src.path().join("a.jpg"), b"first");
        write(&src.path().join("trip/b.jpg"), b"second");
        write(&src.path().join("c.png"), b"third");

        let report = pipeline(
            src.path(),
            dest.path(),
            &[("a.jpg", date(2023, 7, 1)), ("b.jpg", date(2024, 3, 5))],
        )
        .build()
        .unwrap()
        .run()
        .unwrap();

        assert!(!report.cancelled);
        assert_eq!(report.stats.placed, 3);
        assert_eq!(report.stats.unknown_date_images, 1);
        assert!(dest.path().join("2023/Jul/1/a.jpg").exists());
        assert!(dest.path().join("2024/Mar/5/b.jpg").exists());
        assert!(dest.path().join("Unknown_Date/c.png").exists());
    }

    #[test]
    fn same_file_from_two_folders_is_stored_once() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(&src.path().join("one/a.jpg"), b"same bytes");
        write(&src.path().join("two/a.jpg"), b"same bytes");

        let report = pipeline(src.path(), dest.path(), &[("a.jpg", date(2023, 7, 1))])
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.stats.placed, 1);
        assert_eq!(report.stats.duplicates, 1);
        let day = dest.path().join("2023/Jul/1");
        assert_eq!(fs::read_dir(day).unwrap().count(), 1);
    }

    #[test]
    fn rerun_skips_everything() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(&src.path().join("a.jpg"), b"one");
        write(&src.path().join("b.jpg"), b"two");

        let run = || {
            pipeline(src.path(), dest.path(), &[])
                .build()
                .unwrap()
                .run()
                .unwrap()
        };
        run();
        let second = run();

        assert_eq!(second.stats.placed, 0);
        assert_eq!(second.stats.duplicates, 2);
    }

    #[test]
    fn vanished_file_does_not_stop_the_run() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let good = src.path().join("good.jpg");
        let gone = src.path().join("gone.jpg");
        write(&good, b"still here");
        let listing = FixedListing(vec![
            MediaFile::new(&gone, 7, MediaKind::Image),
            MediaFile::new(&good, 10, MediaKind::Image),
        ]);

        let report = pipeline(src.path(), dest.path(), &[])
            .listing(Box::new(listing))
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert!(!report.cancelled);
        assert_eq!(report.stats.placed, 1);
        assert_eq!(report.stats.errors, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, gone);
        assert_eq!(
            fs::read(dest.path().join("Unknown_Date/good.jpg")).unwrap(),
            b"still here"
        );
        assert!(!dest.path().join("Unknown_Date/gone.jpg").exists());
    }

    #[test]
    fn cancelled_before_start_places_nothing() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(&src.path().join("a.jpg"), b"one");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = pipeline(src.path(), dest.path(), &[])
            .cancellation(cancel)
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.stats.files_seen, 0);
        assert!(!dest.path().join("Unknown_Date").exists());
    }

    #[test]
    fn output_inside_input_is_rejected() {
        let src = TempDir::new().unwrap();
        let result = pipeline(src.path(), &src.path().join("sorted"), &[])
            .build()
            .unwrap()
            .run();

        assert!(matches!(
            result,
            Err(ArrangeError::Config(ConfigError::OverlappingDirectories { .. }))
        ));
    }

    #[test]
    fn missing_input_is_an_error() {
        let dest = TempDir::new().unwrap();
        let result = pipeline(&dest.path().join("missing"), dest.path(), &[])
            .build()
            .unwrap()
            .run();

        assert!(matches!(result, Err(ArrangeError::Scan(_))));
    }

    #[test]
    fn events_report_every_file() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(&src.path().join("a.jpg"), b"one");
        write(&src.path().join("b.jpg"), b"two");
        let (sender, receiver) = crate::events::EventChannel::new();

        pipeline(src.path(), dest.path(), &[])
            .build()
            .unwrap()
            .run_with_events(&sender)
            .unwrap();
        drop(sender);

        let finished = receiver
            .iter()
            .filter(|e| matches!(e, Event::Place(PlaceEvent::Finished(_))))
            .count();
        assert_eq!(finished, 2);
    }
}
