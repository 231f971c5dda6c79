//! Duplicate reports over a built hierarchy.
//!
//! Content hashes are computed while the hierarchy is built, so a report
//! never touches the disk: it only joins the global duplicate groups with
//! the file sizes recorded in the tree and ranks them by reclaimable space.

use std::collections::HashMap;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use strata_core::{ContentHash, Hierarchy};

/// Configuration for duplicate reports.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct DuplicateConfig {
    /// Minimum file size to report (skip tiny files).
    #[builder(default = "0")]
    pub min_size: u64,

    /// Maximum number of groups to return (0 = unlimited).
    #[builder(default = "0")]
    pub max_groups: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            min_size: 0,
            max_groups: 0,
        }
    }
}

impl DuplicateConfig {
    /// Create a new config builder.
    pub fn builder() -> DuplicateConfigBuilder {
        DuplicateConfigBuilder::default()
    }
}

/// A group of files sharing the same content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash shared by all files in this group.
    pub hash: ContentHash,

    /// Size of each file in bytes.
    pub size: u64,

    /// Hierarchy paths of all files in the group, sorted.
    pub paths: Vec<String>,

    /// Wasted space: size * (count - 1).
    pub wasted_bytes: u64,
}

impl DuplicateGroup {
    /// Get the number of duplicate files.
    pub fn count(&self) -> usize {
        self.paths.len()
    }

    /// Check if keeping one file, how many could be deleted.
    pub fn deletable_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Groups of duplicate files, sorted by wasted space descending.
    pub groups: Vec<DuplicateGroup>,

    /// Total size of all duplicate files.
    pub total_duplicate_size: u64,

    /// Total wasted space (could be reclaimed).
    pub total_wasted_space: u64,

    /// Number of files in the hierarchy.
    pub files_analyzed: u64,

    /// Number of files that have duplicates.
    pub files_with_duplicates: u64,

    /// Number of reported groups.
    pub group_count: usize,
}

impl DuplicateReport {
    /// Report every duplicate group in `hierarchy`.
    pub fn from_hierarchy(hierarchy: &Hierarchy) -> Self {
        Self::from_hierarchy_with(hierarchy, &DuplicateConfig::default())
    }

    /// Report duplicate groups in `hierarchy` that pass `config`.
    pub fn from_hierarchy_with(hierarchy: &Hierarchy, config: &DuplicateConfig) -> Self {
        let files = hierarchy.files();
        let size_for_hash: HashMap<ContentHash, u64> = files
            .iter()
            .map(|(_, record)| (record.hash, record.size_in_bytes))
            .collect();

        let mut groups: Vec<DuplicateGroup> = hierarchy
            .duplicate_groups()
            .iter()
            .filter_map(|(hash, paths)| {
                let size = *size_for_hash.get(hash)?;
                Some(DuplicateGroup {
                    hash: *hash,
                    size,
                    paths: paths.clone(),
                    wasted_bytes: size * (paths.len() as u64).saturating_sub(1),
                })
            })
            .filter(|group| group.size >= config.min_size)
            .collect();

        // Sort by wasted space descending, hash for a stable order
        groups.sort_by(|a, b| {
            b.wasted_bytes
                .cmp(&a.wasted_bytes)
                .then_with(|| a.hash.cmp(&b.hash))
        });

        if config.max_groups > 0 && groups.len() > config.max_groups {
            groups.truncate(config.max_groups);
        }

        let total_duplicate_size: u64 = groups.iter().map(|g| g.size * g.paths.len() as u64).sum();
        let total_wasted_space: u64 = groups.iter().map(|g| g.wasted_bytes).sum();
        let files_with_duplicates: u64 = groups.iter().map(|g| g.paths.len() as u64).sum();
        let group_count = groups.len();

        debug!(group_count, total_wasted_space, "duplicate report built");

        Self {
            groups,
            total_duplicate_size,
            total_wasted_space,
            files_analyzed: files.len() as u64,
            files_with_duplicates,
            group_count,
        }
    }

    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Get total number of duplicate files across all groups.
    pub fn total_duplicate_files(&self) -> usize {
        self.groups.iter().map(|g| g.paths.len()).sum()
    }
}
