//! What to do with the non-canonical members of each duplicate group.

use super::DuplicateGroup;
use crate::core::pipeline::CancellationToken;
use crate::core::placement::naming::tagged_candidates;
use crate::error::ActionError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Attempts at finding a free name in the duplicates directory
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Action applied to every duplicate (never to the canonical member)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateAction {
    /// Report only
    #[default]
    None,
    /// Move duplicates into this directory
    Move { destination: PathBuf },
    /// Delete duplicates
    Delete,
}

/// One duplicate the action could not handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// What an action did
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionReport {
    /// (from, to) for each moved duplicate
    pub moved: Vec<(PathBuf, PathBuf)>,
    pub deleted: Vec<PathBuf>,
    pub failures: Vec<ActionFailure>,
    /// Bytes removed from their original location
    pub bytes_reclaimed: u64,
    /// The action stopped early
    pub cancelled: bool,
}

impl ActionReport {
    pub fn handled(&self) -> usize {
        self.moved.len() + self.deleted.len()
    }
}

/// Applies a [`DuplicateAction`] to a list of groups
#[derive(Debug, Clone, Default)]
pub struct DuplicateActionExecutor {
    action: DuplicateAction,
    cancel: CancellationToken,
}

impl DuplicateActionExecutor {
    pub fn new(action: DuplicateAction) -> Self {
        Self {
            action,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn action(&self) -> &DuplicateAction {
        &self.action
    }

    /// Apply the action; a failure on one file never stops the rest
    pub fn execute(&self, groups: &[DuplicateGroup]) -> ActionReport {
        let mut report = ActionReport::default();

        if self.action == DuplicateAction::None {
            return report;
        }

        if let DuplicateAction::Move { destination } = &self.action {
            if let Err(e) = fs::create_dir_all(destination) {
                warn!(path = %destination.display(), error = %e, "Cannot create duplicates directory");
                for path in groups.iter().flat_map(DuplicateGroup::duplicates) {
                    report.failures.push(ActionFailure {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
                return report;
            }
        }

        for group in groups {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            for path in group.duplicates() {
                let result = match &self.action {
                    DuplicateAction::None => Ok(()),
                    DuplicateAction::Delete => delete_duplicate(path).map(|()| {
                        report.deleted.push(path.clone());
                    }),
                    DuplicateAction::Move { destination } => {
                        move_into(path, destination).map(|target| {
                            report.moved.push((path.clone(), target));
                        })
                    }
                };

                match result {
                    Ok(()) => report.bytes_reclaimed += group.size(),
                    Err(e) => {
                        warn!(error = %e, "Duplicate action failed");
                        report.failures.push(ActionFailure {
                            path: path.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            handled = report.handled(),
            moved = report.moved.len(),
            deleted = report.deleted.len(),
            failed = report.failures.len(),
            "Duplicate action finished"
        );
        report
    }
}

fn delete_duplicate(path: &Path) -> Result<(), ActionError> {
    fs::remove_file(path).map_err(|source| ActionError::Delete {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "Deleted duplicate");
    Ok(())
}

/// Move `path` into `directory`, renaming on collision. Returns the new path.
fn move_into(path: &Path, directory: &Path) -> Result<PathBuf, ActionError> {
    let name = path.file_name().ok_or_else(|| ActionError::Move {
        path: path.to_path_buf(),
        destination: directory.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
    })?;
    let target = free_target(directory, name)?;

    fs::rename(path, &target).or_else(|_| {
        // rename fails across filesystems, fall back to copy+delete
        // with size verification before deleting the source
        copy_verify_delete(path, &target)
    })?;

    debug!(from = %path.display(), to = %target.display(), "Moved duplicate");
    Ok(target)
}

fn free_target(directory: &Path, name: &OsStr) -> Result<PathBuf, ActionError> {
    let direct = directory.join(name);
    if !direct.exists() {
        return Ok(direct);
    }
    tagged_candidates(name, "duplicate", MAX_NAME_ATTEMPTS)
        .map(|candidate| directory.join(candidate))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| ActionError::NoFreeName {
            directory: directory.to_path_buf(),
            name: name.to_string_lossy().into_owned(),
        })
}

fn copy_verify_delete(source: &Path, target: &Path) -> Result<(), ActionError> {
    let move_error = |e: io::Error| ActionError::Move {
        path: source.to_path_buf(),
        destination: target.to_path_buf(),
        source: e,
    };

    let expected = fs::metadata(source).map_err(move_error)?.len();
    fs::copy(source, target).map_err(move_error)?;

    let actual = fs::metadata(target).map_err(move_error)?.len();
    if actual != expected {
        // Copy was incomplete, keep the source
        let _ = fs::remove_file(target);
        return Err(ActionError::VerificationFailed {
            path: source.to_path_buf(),
            expected,
            actual,
        });
    }

    fs::remove_file(source).map_err(|e| ActionError::Delete {
        path: source.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn group_of(dir: &TempDir, names: &[&str], content: &[u8]) -> DuplicateGroup {
        let paths = names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                fs::write(&path, content).unwrap();
                path
            })
            .collect();
        DuplicateGroup::new(content.len() as u64, paths).unwrap()
    }

    #[test]
    fn none_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let group = group_of(&dir, &["a.jpg", "bb.jpg"], b"same");

        let report = DuplicateActionExecutor::new(DuplicateAction::None).execute(&[group.clone()]);

        assert_eq!(report.handled(), 0);
        assert!(group.members().iter().all(|p| p.exists()));
    }

    #[test]
    fn delete_keeps_canonical() {
        let dir = TempDir::new().unwrap();
        let group = group_of(&dir, &["a.jpg", "bb.jpg", "ccc.jpg"], b"same");

        let report = DuplicateActionExecutor::new(DuplicateAction::Delete).execute(&[group.clone()]);

        assert_eq!(report.deleted.len(), 2);
        assert_eq!(report.bytes_reclaimed, 8);
        assert!(group.canonical().exists());
        assert!(group.duplicates().iter().all(|p| !p.exists()));
    }

    #[test]
    fn move_keeps_canonical_and_renames_on_collision() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("Duplicate files");
        fs::create_dir_all(dir.path().join("x")).unwrap();
        fs::create_dir_all(&destination).unwrap();
        fs::write(destination.join("a.jpg"), b"already here").unwrap();

        let group = group_of(&dir, &["a.jpg", "x/a.jpg"], b"same");
        let executor = DuplicateActionExecutor::new(DuplicateAction::Move {
            destination: destination.clone(),
        });

        let report = executor.execute(&[group.clone()]);

        assert!(report.failures.is_empty());
        assert_eq!(report.moved.len(), 1);
        assert!(group.canonical().exists());
        assert!(!dir.path().join("x/a.jpg").exists());

        let (_, target) = &report.moved[0];
        let name = target.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("a_duplicate_"));
        assert_eq!(fs::read(target).unwrap(), b"same");
        assert_eq!(fs::read(destination.join("a.jpg")).unwrap(), b"already here");
    }

    #[test]
    fn failures_do_not_stop_the_action() {
        let dir = TempDir::new().unwrap();
        let first = group_of(&dir, &["a.jpg", "ab.jpg"], b"one");
        let second = group_of(&dir, &["b.jpg", "bb.jpg"], b"two");
        fs::remove_file(dir.path().join("ab.jpg")).unwrap();

        let report =
            DuplicateActionExecutor::new(DuplicateAction::Delete).execute(&[first, second]);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, dir.path().join("ab.jpg"));
        assert_eq!(report.deleted, vec![dir.path().join("bb.jpg")]);
    }

    #[test]
    fn cancelled_action_stops_between_groups() {
        let dir = TempDir::new().unwrap();
        let group = group_of(&dir, &["a.jpg", "bb.jpg"], b"same");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = DuplicateActionExecutor::new(DuplicateAction::Delete)
            .with_cancellation(cancel)
            .execute(&[group.clone()]);

        assert!(report.cancelled);
        assert!(group.members().iter().all(|p| p.exists()));
    }

    #[cfg(unix)]
    #[test]
    fn move_keeps_non_utf8_names() {
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("Duplicate files");
        let name = OsStr::from_bytes(b"caf\xe9.jpg");
        fs::create_dir_all(dir.path().join("x")).unwrap();
        let canonical = dir.path().join(name);
        let duplicate = dir.path().join("x").join(name);
        fs::write(&canonical, b"same").unwrap();
        fs::write(&duplicate, b"same").unwrap();
        let group = DuplicateGroup::new(4, vec![canonical.clone(), duplicate.clone()]).unwrap();

        let report = DuplicateActionExecutor::new(DuplicateAction::Move {
            destination: destination.clone(),
        })
        .execute(&[group]);

        assert!(report.failures.is_empty());
        assert_eq!(report.moved, vec![(duplicate.clone(), destination.join(name))]);
        assert!(destination.join(name).exists());
        assert!(canonical.exists());
        assert!(!duplicate.exists());
    }
}
