//! # Stats Module
//!
//! Thread-safe counters for one run, and the summary printed at the end.
//!
//! Every counter is an atomic, so workers record outcomes without locks
//! and the final numbers are exact once the workers have joined.

use crate::core::placement::PlacementOutcome;
use crate::core::scanner::MediaKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by all workers of a run
#[derive(Debug, Default)]
pub struct RunStats {
    files_seen: AtomicU64,
    images: AtomicU64,
    videos: AtomicU64,
    unknown_date_images: AtomicU64,
    unknown_date_videos: AtomicU64,
    placed: AtomicU64,
    renamed: AtomicU64,
    duplicates: AtomicU64,
    errors: AtomicU64,
    image_bytes: AtomicU64,
    video_bytes: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a discovered file by kind and size
    pub fn record_file(&self, kind: MediaKind, size: u64, has_capture_date: bool) {
        self.files_seen.fetch_add(1, Ordering::Relaxed);
        match kind {
            MediaKind::Image => {
                self.images.fetch_add(1, Ordering::Relaxed);
                self.image_bytes.fetch_add(size, Ordering::Relaxed);
                if !has_capture_date {
                    self.unknown_date_images.fetch_add(1, Ordering::Relaxed);
                }
            }
            MediaKind::Video => {
                self.videos.fetch_add(1, Ordering::Relaxed);
                self.video_bytes.fetch_add(size, Ordering::Relaxed);
                if !has_capture_date {
                    self.unknown_date_videos.fetch_add(1, Ordering::Relaxed);
                }
            }
            MediaKind::Other => {}
        }
    }

    /// Count how a placement ended
    pub fn record_placement(&self, outcome: &PlacementOutcome) {
        match outcome {
            PlacementOutcome::Placed { .. } => {
                self.placed.fetch_add(1, Ordering::Relaxed);
            }
            PlacementOutcome::PlacedWithRenameDueToDifferentContent { .. } => {
                self.placed.fetch_add(1, Ordering::Relaxed);
                self.renamed.fetch_add(1, Ordering::Relaxed);
            }
            PlacementOutcome::SkippedIdenticalExists { .. } => {
                self.duplicates.fetch_add(1, Ordering::Relaxed);
            }
            PlacementOutcome::Failed(_) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Count duplicates found outside placement (grouping runs)
    pub fn add_duplicates(&self, count: u64) {
        self.duplicates.fetch_add(count, Ordering::Relaxed);
    }

    /// Count a file that could not be processed
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the counters.
    ///
    /// Exact once all recording threads have been joined.
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            files_seen: self.files_seen.load(Ordering::Acquire),
            images: self.images.load(Ordering::Acquire),
            videos: self.videos.load(Ordering::Acquire),
            unknown_date_images: self.unknown_date_images.load(Ordering::Acquire),
            unknown_date_videos: self.unknown_date_videos.load(Ordering::Acquire),
            placed: self.placed.load(Ordering::Acquire),
            renamed: self.renamed.load(Ordering::Acquire),
            duplicates: self.duplicates.load(Ordering::Acquire),
            errors: self.errors.load(Ordering::Acquire),
            image_bytes: self.image_bytes.load(Ordering::Acquire),
            video_bytes: self.video_bytes.load(Ordering::Acquire),
        }
    }
}

/// Snapshot of a run's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub files_seen: u64,
    pub images: u64,
    pub videos: u64,
    pub unknown_date_images: u64,
    pub unknown_date_videos: u64,
    pub placed: u64,
    pub renamed: u64,
    pub duplicates: u64,
    pub errors: u64,
    pub image_bytes: u64,
    pub video_bytes: u64,
}

impl StatsSummary {
    /// Mean image size; zero when there were no images
    pub fn average_image_bytes(&self) -> u64 {
        self.image_bytes.checked_div(self.images).unwrap_or(0)
    }

    /// Mean video size; zero when there were no videos
    pub fn average_video_bytes(&self) -> u64 {
        self.video_bytes.checked_div(self.videos).unwrap_or(0)
    }

    /// Images plus videos
    pub fn media_files(&self) -> u64 {
        self.images + self.videos
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Statistics ---")?;
        writeln!(f, "Files Seen: {}", self.files_seen)?;
        writeln!(f, "Total Images: {}", self.images)?;
        writeln!(f, "Total Videos: {}", self.videos)?;
        writeln!(f, "Images with Unknown Dates: {}", self.unknown_date_images)?;
        writeln!(f, "Videos with Unknown Dates: {}", self.unknown_date_videos)?;
        writeln!(f, "Files Placed: {}", self.placed)?;
        writeln!(f, "Renamed (different content): {}", self.renamed)?;
        writeln!(f, "Duplicate Files: {}", self.duplicates)?;
        writeln!(f, "Total Errors: {}", self.errors)?;
        writeln!(f, "Total Image Size: {}", format_bytes(self.image_bytes))?;
        writeln!(f, "Total Video Size: {}", format_bytes(self.video_bytes))?;
        writeln!(
            f,
            "Average Image Size: {}",
            format_bytes(self.average_image_bytes())
        )?;
        writeln!(
            f,
            "Average Video Size: {}",
            format_bytes(self.average_video_bytes())
        )?;
        write!(f, "Total Files Processed: {}", self.media_files())
    }
}

/// Render a byte count with 1024-based units and one decimal
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["KB", "MB", "GB", "TB", "PB", "EB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlacementError;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn averages_guard_against_empty_categories() {
        let summary = RunStats::new().summary();
        assert_eq!(summary.average_image_bytes(), 0);
        assert_eq!(summary.average_video_bytes(), 0);
        assert!(summary.to_string().contains("Average Video Size: 0 B"));
    }

    #[test]
    fn files_are_split_by_kind() {
        let stats = RunStats::new();
        stats.record_file(MediaKind::Image, 1000, true);
        stats.record_file(MediaKind::Image, 3000, false);
        stats.record_file(MediaKind::Video, 5000, false);
        stats.record_file(MediaKind::Other, 7, true);

        let summary = stats.summary();
        assert_eq!(summary.files_seen, 4);
        assert_eq!(summary.images, 2);
        assert_eq!(summary.videos, 1);
        assert_eq!(summary.unknown_date_images, 1);
        assert_eq!(summary.unknown_date_videos, 1);
        assert_eq!(summary.average_image_bytes(), 2000);
        assert_eq!(summary.media_files(), 3);
    }

    #[test]
    fn placement_outcomes_map_to_counters() {
        let stats = RunStats::new();
        let path = PathBuf::from("/out/a.jpg");
        stats.record_placement(&PlacementOutcome::Placed {
            destination: path.clone(),
        });
        stats.record_placement(&PlacementOutcome::PlacedWithRenameDueToDifferentContent {
            destination: path.clone(),
        });
        stats.record_placement(&PlacementOutcome::SkippedIdenticalExists {
            existing: path.clone(),
        });
        stats.record_placement(&PlacementOutcome::Failed(
            PlacementError::CollisionResolution { path, attempts: 3 },
        ));

        let summary = stats.summary();
        assert_eq!(summary.placed, 2);
        assert_eq!(summary.renamed, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.errors, 1);
    }

    #[test]
    fn concurrent_increments_are_exact() {
        let stats = Arc::new(RunStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_file(MediaKind::Image, 2, true);
                        stats.record_error();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = stats.summary();
        assert_eq!(summary.images, 8000);
        assert_eq!(summary.errors, 8000);
        assert_eq!(summary.image_bytes, 16000);
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
