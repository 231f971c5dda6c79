//! Build progress reporting.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Progress information during a build.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Number of files recorded so far.
    pub files_scanned: u64,
    /// Number of directories finished so far.
    pub dirs_scanned: u64,
    /// Total bytes hashed so far.
    pub bytes_scanned: u64,
    /// Most recent path processed.
    pub current_path: PathBuf,
    /// Number of skipped entries.
    pub errors_count: u64,
    /// Time elapsed since the build started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_scanned: 0,
            dirs_scanned: 0,
            bytes_scanned: 0,
            current_path: PathBuf::new(),
            errors_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate scan rate in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total items scanned (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared counters updated by every worker.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    files_scanned: AtomicU64,
    dirs_scanned: AtomicU64,
    bytes_scanned: AtomicU64,
    errors_count: AtomicU64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            files_scanned: AtomicU64::new(0),
            dirs_scanned: AtomicU64::new(0),
            bytes_scanned: AtomicU64::new(0),
            errors_count: AtomicU64::new(0),
        }
    }

    /// Count a file. Returns the file count including this one.
    pub fn record_file(&self, size: u64) -> u64 {
        self.bytes_scanned.fetch_add(size, Ordering::Relaxed);
        self.files_scanned.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_dir(&self) {
        self.dirs_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_errors(&self, count: u64) {
        self.errors_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self, current_path: PathBuf) -> ScanProgress {
        ScanProgress {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            dirs_scanned: self.dirs_scanned.load(Ordering::Relaxed),
            bytes_scanned: self.bytes_scanned.load(Ordering::Relaxed),
            current_path,
            errors_count: self.errors_count.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_snapshot() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.record_file(100), 1);
        assert_eq!(tracker.record_file(50), 2);
        tracker.record_dir();
        tracker.record_errors(2);

        let progress = tracker.snapshot(PathBuf::from("/tmp/x"));
        assert_eq!(progress.files_scanned, 2);
        assert_eq!(progress.bytes_scanned, 150);
        assert_eq!(progress.total_items(), 3);
        assert_eq!(progress.errors_count, 2);
    }

    #[test]
    fn test_rates_zero_elapsed() {
        let progress = ScanProgress::new();
        assert_eq!(progress.files_per_second(), 0.0);
        assert_eq!(progress.bytes_per_second(), 0.0);
    }
}
