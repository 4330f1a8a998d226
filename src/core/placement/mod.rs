//! # Placement Module
//!
//! Copies one media file into a date-based tree under the destination root.
//!
//! ## Rules
//! - The source is only ever read; existing destination files are never
//!   overwritten
//! - Same name and same content already present: skipped
//! - Same name and different content: copied under
//!   `<stem>_similar_<millis>.<ext>`
//! - The copy gets the capture date as its access and modification time
//!   (the source's creation time when there is no capture date)
//!
//! A [`PlacementContext`] lives for one run and is shared by every worker.

mod layout;
pub mod naming;

pub use layout::{DirectoryLayout, UNKNOWN_DATE_DIR};

use crate::core::identity::IdentityComparator;
use crate::core::scanner::MediaFile;
use crate::error::PlacementError;
use crate::events::PlaceStatus;
use chrono::{Local, NaiveDateTime, TimeZone};
use dashmap::{DashMap, DashSet};
use filetime::FileTime;
use naming::{is_tagged_variant, tagged_candidates};
use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Rename attempts before giving up on a file
pub const MAX_RENAME_ATTEMPTS: u32 = 1000;

const RENAME_TAG: &str = "similar";

/// How placing one file ended
#[derive(Debug)]
pub enum PlacementOutcome {
    /// Copied under its own name
    Placed { destination: PathBuf },
    /// A file with the same name and content was already there
    SkippedIdenticalExists { existing: PathBuf },
    /// The name was taken by different content; copied under a new name
    PlacedWithRenameDueToDifferentContent { destination: PathBuf },
    /// Nothing was written
    Failed(PlacementError),
}

impl PlacementOutcome {
    /// The file now holding this content, if any
    pub fn destination(&self) -> Option<&Path> {
        match self {
            PlacementOutcome::Placed { destination }
            | PlacementOutcome::PlacedWithRenameDueToDifferentContent { destination } => {
                Some(destination)
            }
            PlacementOutcome::SkippedIdenticalExists { existing } => Some(existing),
            PlacementOutcome::Failed(_) => None,
        }
    }

    pub fn status(&self) -> PlaceStatus {
        match self {
            PlacementOutcome::Placed { .. } => PlaceStatus::Placed,
            PlacementOutcome::SkippedIdenticalExists { .. } => PlaceStatus::SkippedIdentical,
            PlacementOutcome::PlacedWithRenameDueToDifferentContent { .. } => PlaceStatus::Renamed,
            PlacementOutcome::Failed(_) => PlaceStatus::Failed,
        }
    }

    /// Whether the run must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlacementOutcome::Failed(e) if e.is_fatal())
    }
}

/// Per-run placement state.
///
/// Remembers which directories exist and serialises placements that
/// target the same file name, so two workers carrying identical files
/// never both write a copy.
///
/// The per-name lock is held while the incoming file is reserved, copied
/// and compared against existing files of that name. Only workers aiming
/// at the same destination name wait on each other; every other placement
/// proceeds without contention. A lock entry is dropped from the map once
/// no worker holds it.
#[derive(Debug)]
pub struct PlacementContext {
    root: PathBuf,
    layout: DirectoryLayout,
    comparator: IdentityComparator,
    created_dirs: DashSet<PathBuf>,
    name_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl PlacementContext {
    pub fn new(root: impl Into<PathBuf>, layout: DirectoryLayout) -> Self {
        Self {
            root: root.into(),
            layout,
            comparator: IdentityComparator::default(),
            created_dirs: DashSet::new(),
            name_locks: DashMap::new(),
        }
    }

    pub fn with_comparator(mut self, comparator: IdentityComparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> DirectoryLayout {
        self.layout
    }

    /// Place a file; failures come back as [`PlacementOutcome::Failed`]
    pub fn place(&self, file: &MediaFile, capture_date: Option<NaiveDateTime>) -> PlacementOutcome {
        match self.try_place(file, capture_date) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "Placement failed");
                PlacementOutcome::Failed(e)
            }
        }
    }

    /// Place a file, returning failures as errors
    pub fn try_place(
        &self,
        file: &MediaFile,
        capture_date: Option<NaiveDateTime>,
    ) -> Result<PlacementOutcome, PlacementError> {
        let folder = self
            .root
            .join(self.layout.folder_for(capture_date.map(|d| d.date())));
        self.ensure_dir(&folder)?;

        let Some(name) = file.file_name() else {
            return Err(PlacementError::io(
                &file.path,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            ));
        };
        let target = folder.join(name);

        let lock = self.name_lock(&target);
        let result = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            self.place_locked(file, capture_date, &folder, name, &target)
        };
        drop(lock);
        self.name_locks
            .remove_if(&target, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Placement steps that run while the target name is locked
    fn place_locked(
        &self,
        file: &MediaFile,
        capture_date: Option<NaiveDateTime>,
        folder: &Path,
        name: &OsStr,
        target: &Path,
    ) -> Result<PlacementOutcome, PlacementError> {
        match reserve(target) {
            Ok(out) => {
                copy_into(&file.path, out, target)?;
                apply_times(&file.path, target, capture_date);
                debug!(from = %file.path.display(), to = %target.display(), "Placed");
                return Ok(PlacementOutcome::Placed {
                    destination: target.to_path_buf(),
                });
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(PlacementError::io(target, e)),
        }

        if self.comparator.are_identical(&file.path, target)? {
            debug!(path = %file.path.display(), existing = %target.display(), "Identical file exists");
            return Ok(PlacementOutcome::SkippedIdenticalExists {
                existing: target.to_path_buf(),
            });
        }

        if let Some(existing) = self.find_renamed_copy(file, folder, name)? {
            debug!(path = %file.path.display(), existing = %existing.display(), "Identical renamed copy exists");
            return Ok(PlacementOutcome::SkippedIdenticalExists { existing });
        }

        for candidate in tagged_candidates(name, RENAME_TAG, MAX_RENAME_ATTEMPTS) {
            let renamed = folder.join(candidate);
            match reserve(&renamed) {
                Ok(out) => {
                    copy_into(&file.path, out, &renamed)?;
                    apply_times(&file.path, &renamed, capture_date);
                    debug!(from = %file.path.display(), to = %renamed.display(), "Placed under new name");
                    return Ok(PlacementOutcome::PlacedWithRenameDueToDifferentContent {
                        destination: renamed,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(PlacementError::io(&renamed, e)),
            }
        }

        Err(PlacementError::CollisionResolution {
            path: target.to_path_buf(),
            attempts: MAX_RENAME_ATTEMPTS,
        })
    }

    /// Create a destination directory once per run.
    ///
    /// `create_dir_all` succeeds when another worker created the directory
    /// first, so concurrent callers need no coordination.
    pub fn ensure_dir(&self, dir: &Path) -> Result<(), PlacementError> {
        if self.created_dirs.contains(dir) {
            return Ok(());
        }
        fs::create_dir_all(dir).map_err(|e| PlacementError::io(dir, e))?;
        self.created_dirs.insert(dir.to_path_buf());
        Ok(())
    }

    fn name_lock(&self, target: &Path) -> Arc<Mutex<()>> {
        self.name_locks
            .entry(target.to_path_buf())
            .or_default()
            .value()
            .clone()
    }

    /// Earlier `<stem>_similar_*` copies holding the same bytes
    fn find_renamed_copy(
        &self,
        file: &MediaFile,
        folder: &Path,
        name: &OsStr,
    ) -> Result<Option<PathBuf>, PlacementError> {
        let entries = fs::read_dir(folder).map_err(|e| PlacementError::io(folder, e))?;

        for entry in entries.flatten() {
            if !is_tagged_variant(name, RENAME_TAG, &entry.file_name()) {
                continue;
            }
            let same_size = entry.metadata().map(|m| m.len() == file.size).unwrap_or(false);
            if same_size && self.comparator.are_identical(&file.path, &entry.path())? {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }
}

/// Place one file with a throwaway context
pub fn place(
    file: &MediaFile,
    destination_root: &Path,
    layout: DirectoryLayout,
    capture_date: Option<NaiveDateTime>,
) -> PlacementOutcome {
    PlacementContext::new(destination_root, layout).place(file, capture_date)
}

fn reserve(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Copy `source` into the reserved `out`; the reservation is removed on failure
fn copy_into(source: &Path, mut out: File, target: &Path) -> Result<(), PlacementError> {
    let result = File::open(source)
        .map_err(|e| PlacementError::io(source, e))
        .and_then(|mut input| {
            io::copy(&mut input, &mut out).map_err(|e| PlacementError::io(target, e))
        });
    drop(out);

    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(target) {
            warn!(path = %target.display(), error = %cleanup, "Could not remove partial copy");
        }
        return Err(e);
    }
    Ok(())
}

/// Timestamp for the copy: capture date, else the source's creation time
fn timestamp_for(source: &Path, capture_date: Option<NaiveDateTime>) -> Option<SystemTime> {
    if let Some(date) = capture_date {
        if let Some(local) = Local.from_local_datetime(&date).earliest() {
            return Some(SystemTime::from(local));
        }
    }
    let meta = fs::metadata(source).ok()?;
    meta.created().or_else(|_| meta.modified()).ok()
}

fn apply_times(source: &Path, target: &Path, capture_date: Option<NaiveDateTime>) {
    let Some(time) = timestamp_for(source, capture_date) else {
        return;
    };
    let time = FileTime::from_system_time(time);
    if let Err(e) = filetime::set_file_times(target, time, time) {
        warn!(path = %target.display(), error = %e, "Could not set file times");
    }
}
