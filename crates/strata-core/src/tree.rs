//! Finished hierarchy container and statistics.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::config::ScanConfig;
use crate::error::ScanWarning;
use crate::node::{DirectoryNode, DuplicateMap, FileRecord};

/// Summary statistics for a built hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Total size in bytes.
    pub total_size: u64,
    /// Total number of files.
    pub total_files: u64,
    /// Total number of directories, excluding the root.
    pub total_dirs: u64,
    /// Deepest directory level reached (root = 0).
    pub max_depth: u32,
    /// Largest file (hierarchy path, size).
    pub largest_file: Option<(String, u64)>,
}

impl TreeStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gather stats from a finished tree.
    pub fn collect(root: &DirectoryNode) -> Self {
        let mut stats = Self::new();
        stats.visit(root, root.name(), 0);
        stats
    }

    fn visit(&mut self, node: &DirectoryNode, path: &str, depth: u32) {
        for record in node.iter_files() {
            self.record_file(crate::node::join_path(path, &record.name), record.size_in_bytes);
        }
        for (name, child) in node.directories() {
            self.record_dir(depth + 1);
            self.visit(child, &crate::node::join_path(path, name), depth + 1);
        }
    }

    /// Update stats with a file entry.
    pub fn record_file(&mut self, path: String, size: u64) {
        self.total_files += 1;
        self.total_size += size;

        if self.largest_file.as_ref().is_none_or(|(_, s)| size > *s) {
            self.largest_file = Some((path, size));
        }
    }

    /// Record a directory.
    pub fn record_dir(&mut self, depth: u32) {
        self.total_dirs += 1;
        self.max_depth = self.max_depth.max(depth);
    }
}

/// A completed crawl: the aggregated tree plus everything learned while
/// building it.
///
/// Only ever produced fully built; there is no way to observe a hierarchy
/// whose aggregates are still pending.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    root: DirectoryNode,

    duplicates: DuplicateMap,

    /// Root path that was crawled.
    pub root_path: PathBuf,

    /// When this build finished.
    pub scanned_at: SystemTime,

    /// Duration of the build.
    pub scan_duration: Duration,

    /// Configuration used.
    pub config: ScanConfig,

    /// Summary statistics.
    pub stats: TreeStats,

    /// Entries skipped during the build.
    pub warnings: Vec<ScanWarning>,
}

impl Hierarchy {
    /// Create a hierarchy from a finished root node and the global duplicate
    /// groups. Per-node duplicate views are attached here.
    pub fn new(
        mut root: DirectoryNode,
        duplicates: DuplicateMap,
        root_path: PathBuf,
        config: ScanConfig,
        scan_duration: Duration,
        warnings: Vec<ScanWarning>,
    ) -> Self {
        root.attach_duplicate_views(&duplicates);
        let stats = TreeStats::collect(&root);
        Self {
            root,
            duplicates,
            root_path,
            scanned_at: SystemTime::now(),
            scan_duration,
            config,
            stats,
            warnings,
        }
    }

    /// Root directory node.
    pub fn root(&self) -> &DirectoryNode {
        &self.root
    }

    /// Name of the root directory, used as the first path segment.
    pub fn root_name(&self) -> &str {
        self.root.name()
    }

    /// Global duplicate groups (two or more members each).
    pub fn duplicate_groups(&self) -> &DuplicateMap {
        &self.duplicates
    }

    /// Get the total size of the tree.
    pub fn total_size(&self) -> u64 {
        self.root.aggregate_size()
    }

    /// Get the total number of files.
    pub fn total_files(&self) -> u64 {
        self.stats.total_files
    }

    /// Get the total number of directories.
    pub fn total_dirs(&self) -> u64 {
        self.stats.total_dirs
    }

    /// Every file with its hierarchy path, depth first.
    pub fn files(&self) -> Vec<(String, &FileRecord)> {
        self.root.files_with_paths(self.root.name())
    }

    /// Every directory (root included) with its hierarchy path.
    pub fn directories(&self) -> Vec<(String, &DirectoryNode)> {
        self.root.directories_with_paths(self.root.name())
    }

    /// Check if there were any warnings during the build.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
