//! # Grouping Module
//!
//! Finds every set of two or more files with identical content.
//!
//! ## Algorithm
//! 1. Bucket files by size ([`SizeBuckets`]); files of different sizes are
//!    never compared
//! 2. Inside each bucket, compare pairs with the
//!    [`IdentityComparator`](crate::core::identity::IdentityComparator) and
//!    union the matches
//! 3. Report the classes with at least two members
//!
//! Buckets are compared in parallel; pairs inside one bucket run
//! sequentially. A pair whose members already share a class is skipped.
//!
//! ## Ordering
//! Members are sorted by path length, then lexicographically. The first
//! member is the canonical one and is never touched by a
//! [`DuplicateAction`].

mod actions;
mod union_find;

pub use actions::{ActionFailure, ActionReport, DuplicateAction, DuplicateActionExecutor};

use crate::core::identity::IdentityComparator;
use crate::core::pipeline::CancellationToken;
use crate::core::scanner::MediaFile;
use crate::error::IdentityError;
use crate::events::{Event, EventSender, GroupEvent, GroupProgress};
use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tracing::{debug, info, warn};
use union_find::UnionFind;

/// Order paths by length, then lexicographically
pub fn canonical_order(a: &Path, b: &Path) -> Ordering {
    let (a, b) = (a.as_os_str(), b.as_os_str());
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// A set of files with byte-identical content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    size: u64,
    members: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Build a group; members are put into canonical order.
    ///
    /// Returns `None` for fewer than two members.
    pub fn new(size: u64, mut members: Vec<PathBuf>) -> Option<Self> {
        if members.len() < 2 {
            return None;
        }
        members.sort_by(|a, b| canonical_order(a, b));
        Some(Self { size, members })
    }

    /// Size of each member in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// All members, canonical first
    pub fn members(&self) -> &[PathBuf] {
        &self.members
    }

    /// The member kept by any action
    pub fn canonical(&self) -> &Path {
        &self.members[0]
    }

    /// Every member except the canonical one
    pub fn duplicates(&self) -> &[PathBuf] {
        &self.members[1..]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Bytes freed by removing every duplicate
    pub fn reclaimable_bytes(&self) -> u64 {
        self.size * self.duplicates().len() as u64
    }
}

/// Files of one size
#[derive(Debug, Clone)]
pub struct SizeBucket {
    pub size: u64,
    pub files: Vec<MediaFile>,
}

/// Files keyed by size; safe to fill from many threads
#[derive(Debug, Default)]
pub struct SizeBuckets {
    buckets: DashMap<u64, Vec<MediaFile>>,
}

impl SizeBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, file: MediaFile) {
        self.buckets.entry(file.size).or_default().push(file);
    }

    /// Number of files inserted
    pub fn file_count(&self) -> usize {
        self.buckets.iter().map(|entry| entry.value().len()).sum()
    }

    /// Buckets that could hold duplicates, smallest size first.
    ///
    /// Files inside a bucket are sorted by path so results do not depend on
    /// insertion order.
    pub fn into_candidates(self) -> Vec<SizeBucket> {
        let mut candidates: Vec<SizeBucket> = self
            .buckets
            .into_iter()
            .filter(|(_, files)| files.len() >= 2)
            .map(|(size, mut files)| {
                files.sort_by(|a, b| a.path.cmp(&b.path));
                SizeBucket { size, files }
            })
            .collect();
        candidates.sort_by_key(|bucket| bucket.size);
        candidates
    }
}

impl FromIterator<MediaFile> for SizeBuckets {
    fn from_iter<I: IntoIterator<Item = MediaFile>>(iter: I) -> Self {
        let buckets = SizeBuckets::new();
        for file in iter {
            buckets.insert(file);
        }
        buckets
    }
}

/// Result of grouping a set of buckets
#[derive(Debug, Default)]
pub struct GroupingReport {
    /// Duplicate groups, ordered by canonical path
    pub groups: Vec<DuplicateGroup>,
    /// Pairwise comparisons performed
    pub comparisons: usize,
    /// Files that could not be read; their pairs counted as different
    pub errors: Vec<IdentityError>,
    /// Buckets were skipped because the run was cancelled
    pub cancelled: bool,
}

impl GroupingReport {
    /// Files that are not canonical in their group
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.duplicates().len()).sum()
    }

    pub fn reclaimable_bytes(&self) -> u64 {
        self.groups.iter().map(DuplicateGroup::reclaimable_bytes).sum()
    }
}

#[derive(Default)]
struct BucketResult {
    groups: Vec<DuplicateGroup>,
    comparisons: usize,
    errors: Vec<IdentityError>,
    cancelled: bool,
}

/// Groups same-size files by content
#[derive(Debug, Clone, Default)]
pub struct DuplicateGrouper {
    comparator: IdentityComparator,
    events: EventSender,
    cancel: CancellationToken,
}

impl DuplicateGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comparator(mut self, comparator: IdentityComparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Compare every candidate bucket and collect the groups
    pub fn group(&self, buckets: SizeBuckets) -> GroupingReport {
        let candidates = buckets.into_candidates();
        let candidate_files = candidates.iter().map(|b| b.files.len()).sum();
        let total_buckets = candidates.len();

        info!(
            buckets = total_buckets,
            files = candidate_files,
            "Grouping same-size files"
        );
        self.events.send(Event::Group(GroupEvent::Started {
            candidate_buckets: total_buckets,
            candidate_files,
        }));

        let completed = AtomicUsize::new(0);
        let results: Vec<BucketResult> = candidates
            .par_iter()
            .map(|bucket| {
                if self.cancel.is_cancelled() {
                    return BucketResult {
                        cancelled: true,
                        ..Default::default()
                    };
                }

                let result = self.group_bucket(bucket);
                let buckets_completed = completed.fetch_add(1, AtomicOrdering::Relaxed) + 1;
                self.events
                    .send(Event::Group(GroupEvent::BucketCompared(GroupProgress {
                        buckets_completed,
                        total_buckets,
                        comparisons: result.comparisons,
                    })));
                for group in &result.groups {
                    self.events.send(Event::Group(GroupEvent::DuplicateFound {
                        size: group.size(),
                        members: group.len(),
                    }));
                }
                result
            })
            .collect();

        let mut report = GroupingReport::default();
        for result in results {
            report.groups.extend(result.groups);
            report.comparisons += result.comparisons;
            report.errors.extend(result.errors);
            report.cancelled |= result.cancelled;
        }
        report
            .groups
            .sort_by(|a, b| canonical_order(a.canonical(), b.canonical()));

        self.events.send(Event::Group(GroupEvent::Completed {
            total_groups: report.groups.len(),
            total_duplicates: report.duplicate_count(),
        }));
        info!(
            groups = report.groups.len(),
            comparisons = report.comparisons,
            errors = report.errors.len(),
            "Grouping finished"
        );

        report
    }

    fn group_bucket(&self, bucket: &SizeBucket) -> BucketResult {
        let files = &bucket.files;
        let mut sets = UnionFind::new(files.len());
        let mut unreadable = vec![false; files.len()];
        let mut result = BucketResult::default();

        for i in 0..files.len() {
            for j in (i + 1)..files.len() {
                if unreadable[i] {
                    break;
                }
                if unreadable[j] || sets.same_set(i, j) {
                    continue;
                }

                result.comparisons += 1;
                match self.comparator.are_identical(&files[i].path, &files[j].path) {
                    Ok(true) => sets.union(i, j),
                    Ok(false) => {}
                    Err(e) => {
                        warn!(error = %e, "Skipping unreadable file");
                        if e.path() == &files[i].path {
                            unreadable[i] = true;
                        } else {
                            unreadable[j] = true;
                        }
                        result.errors.push(e);
                    }
                }
            }
        }

        result.groups = sets
            .sets(2)
            .into_iter()
            .filter_map(|set| {
                let members = set.into_iter().map(|i| files[i].path.clone()).collect();
                DuplicateGroup::new(bucket.size, members)
            })
            .collect();

        debug!(
            size = bucket.size,
            files = files.len(),
            groups = result.groups.len(),
            "Bucket compared"
        );
        result
    }
}

/// Group files with the default comparator
pub fn group_duplicates<I>(files: I) -> Vec<DuplicateGroup>
where
    I: IntoIterator<Item = MediaFile>,
{
    DuplicateGrouper::new()
        .group(files.into_iter().collect())
        .groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::MediaKind;
    use std::fs;
    use tempfile::TempDir;

    fn media(dir: &TempDir, name: &str, content: &[u8]) -> MediaFile {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        MediaFile::new(path, content.len() as u64, MediaKind::Image)
    }

    #[test]
    fn canonical_order_prefers_short_paths() {
        let mut paths = vec![
            PathBuf::from("/b/long-name.jpg"),
            PathBuf::from("/z.jpg"),
            PathBuf::from("/a.jpg"),
        ];
        paths.sort_by(|a, b| canonical_order(a, b));

        assert_eq!(
            paths,
            vec![
                PathBuf::from("/a.jpg"),
                PathBuf::from("/z.jpg"),
                PathBuf::from("/b/long-name.jpg"),
            ]
        );
    }

    #[test]
    fn group_needs_two_members() {
        assert!(DuplicateGroup::new(10, vec![PathBuf::from("/a.jpg")]).is_none());

        let group = DuplicateGroup::new(
            10,
            vec![
                PathBuf::from("/copies/a.jpg"),
                PathBuf::from("/a.jpg"),
                PathBuf::from("/b.jpg"),
            ],
        )
        .unwrap();
        assert_eq!(group.canonical(), Path::new("/a.jpg"));
        assert_eq!(group.duplicates().len(), 2);
        assert_eq!(group.reclaimable_bytes(), 20);
    }

    #[test]
    fn two_identical_one_different_same_size() {
        let dir = TempDir::new().unwrap();
        let same = vec![7u8; 500];
        let mut other = vec![7u8; 500];
        other[499] = 8;

        let files = vec![
            media(&dir, "a.jpg", &same),
            media(&dir, "b.jpg", &same),
            media(&dir, "c.jpg", &other),
        ];

        let groups = group_duplicates(files);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members().len(), 2);
        assert_eq!(groups[0].canonical(), dir.path().join("a.jpg"));
        assert_eq!(groups[0].duplicates(), &[dir.path().join("b.jpg")]);
    }

    #[test]
    fn different_sizes_are_never_grouped() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            media(&dir, "a.jpg", b"one"),
            media(&dir, "b.jpg", b"three"),
        ];

        let buckets: SizeBuckets = files.into_iter().collect();
        let report = DuplicateGrouper::new().group(buckets);

        assert!(report.groups.is_empty());
        assert_eq!(report.comparisons, 0);
    }

    #[test]
    fn transitive_members_skip_redundant_comparisons() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            media(&dir, "a.jpg", b"same"),
            media(&dir, "b.jpg", b"same"),
            media(&dir, "c.jpg", b"same"),
        ];

        let report = DuplicateGrouper::new().group(files.into_iter().collect());

        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].len(), 3);
        // a~b, a~c; b~c is implied
        assert_eq!(report.comparisons, 2);
    }

    #[test]
    fn groups_are_disjoint() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            media(&dir, "a1.jpg", b"AAAA"),
            media(&dir, "b1.jpg", b"BBBB"),
            media(&dir, "a2.jpg", b"AAAA"),
            media(&dir, "b2.jpg", b"BBBB"),
        ];

        let groups = group_duplicates(files);

        assert_eq!(groups.len(), 2);
        let mut all: Vec<&PathBuf> = groups.iter().flat_map(|g| g.members()).collect();
        let before = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), before);
    }

    #[test]
    fn unreadable_file_is_recorded_and_skipped() {
        let dir = TempDir::new().unwrap();
        let a = media(&dir, "a.jpg", b"same");
        let b = media(&dir, "b.jpg", b"same");
        let ghost = MediaFile::new(dir.path().join("0-gone.jpg"), 4, MediaKind::Image);

        let report = DuplicateGrouper::new().group(vec![ghost, a, b].into_iter().collect());

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].len(), 2);
    }

    #[test]
    fn cancelled_grouping_skips_buckets() {
        let dir = TempDir::new().unwrap();
        let files = vec![media(&dir, "a.jpg", b"same"), media(&dir, "b.jpg", b"same")];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = DuplicateGrouper::new()
            .with_cancellation(cancel)
            .group(files.into_iter().collect());

        assert!(report.cancelled);
        assert!(report.groups.is_empty());
    }
}
