//! Summary statistics over a finished hierarchy.
//!
//! Answers the questions a first look at a tree usually asks: where the
//! bytes are by extension, which files and folders are biggest, and what is
//! empty.

use std::collections::BTreeMap;

use derive_builder::Builder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use strata_core::Hierarchy;

/// Configuration for summary analysis.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct SummaryConfig {
    /// Entries kept in each ranked list.
    #[builder(default = "5")]
    pub top_n: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self { top_n: 5 }
    }
}

impl SummaryConfig {
    /// Create a new config builder.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder::default()
    }
}

/// Bytes and files attributed to one extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionUsage {
    /// Extension with leading dot, `""` for files without one.
    pub extension: String,
    /// Total bytes of files with this extension.
    pub bytes: u64,
    /// Number of files with this extension.
    pub file_count: u64,
}

/// A hierarchy path and its size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizedPath {
    pub path: String,
    pub size: u64,
}

/// Summary statistics for one hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchySummary {
    /// Number of recorded files.
    pub total_files: u64,
    /// Number of directories below the root.
    pub total_directories: u64,
    /// Aggregate size of the root.
    pub total_size: u64,
    /// Bytes per extension.
    pub disk_usage_by_extension: BTreeMap<String, u64>,
    /// Extensions using the most bytes, largest first.
    pub most_used_extensions: Vec<ExtensionUsage>,
    /// Extensions using the fewest bytes, smallest first.
    pub least_used_extensions: Vec<ExtensionUsage>,
    /// Largest files, largest first.
    pub largest_files: Vec<SizedPath>,
    /// Largest directories below the root by aggregate size, largest first.
    pub largest_folders: Vec<SizedPath>,
    /// Directories with no files and no subdirectories.
    pub empty_directories: Vec<String>,
    /// Files of size zero.
    pub zero_byte_files: Vec<String>,
}

/// Computes a [`HierarchySummary`].
#[derive(Debug, Clone, Default)]
pub struct SummaryAnalyzer {
    config: SummaryConfig,
}

impl SummaryAnalyzer {
    /// Create an analyzer keeping the top five entries per list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with custom config.
    pub fn with_config(config: SummaryConfig) -> Self {
        Self { config }
    }

    /// Summarize `hierarchy`. Ties in every ranking are broken by name.
    pub fn analyze(&self, hierarchy: &Hierarchy) -> HierarchySummary {
        let top_n = self.config.top_n;
        let files = hierarchy.files();

        let mut usage: BTreeMap<String, ExtensionUsage> = BTreeMap::new();
        let mut zero_byte_files = Vec::new();
        for (path, record) in &files {
            let entry = usage
                .entry(record.extension.to_string())
                .or_insert_with(|| ExtensionUsage {
                    extension: record.extension.to_string(),
                    bytes: 0,
                    file_count: 0,
                });
            entry.bytes += record.size_in_bytes;
            entry.file_count += 1;

            if record.size_in_bytes == 0 {
                zero_byte_files.push(path.clone());
            }
        }

        let most_used_extensions = usage
            .values()
            .sorted_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.extension.cmp(&b.extension)))
            .take(top_n)
            .cloned()
            .collect();
        let least_used_extensions = usage
            .values()
            .sorted_by(|a, b| a.bytes.cmp(&b.bytes).then_with(|| a.extension.cmp(&b.extension)))
            .take(top_n)
            .cloned()
            .collect();

        let largest_files = largest(
            files
                .iter()
                .map(|(path, record)| SizedPath {
                    path: path.clone(),
                    size: record.size_in_bytes,
                }),
            top_n,
        );

        // The root is its own entry in `directories()`; rankings skip it
        let directories = hierarchy.directories();
        let below_root = directories.iter().skip(1);

        let largest_folders = largest(
            below_root.clone().map(|(path, node)| SizedPath {
                path: path.clone(),
                size: node.aggregate_size(),
            }),
            top_n,
        );

        let empty_directories: Vec<String> = below_root
            .filter(|(_, node)| node.is_empty())
            .map(|(path, _)| path.clone())
            .collect();

        debug!(
            extensions = usage.len(),
            empty_directories = empty_directories.len(),
            zero_byte_files = zero_byte_files.len(),
            "hierarchy summarized"
        );

        HierarchySummary {
            total_files: files.len() as u64,
            total_directories: directories.len().saturating_sub(1) as u64,
            total_size: hierarchy.total_size(),
            disk_usage_by_extension: usage.iter().map(|(ext, u)| (ext.clone(), u.bytes)).collect(),
            most_used_extensions,
            least_used_extensions,
            largest_files,
            largest_folders,
            empty_directories,
            zero_byte_files,
        }
    }
}

fn largest(entries: impl Iterator<Item = SizedPath>, n: usize) -> Vec<SizedPath> {
    entries
        .sorted_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)))
        .take(n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};
    use strata_core::{
        ContentHash, DirectoryNode, DuplicateMap, FileRecord, Permissions, ScanConfig, Timestamps,
        extension_of,
    };

    fn record(name: &str, size: u64) -> FileRecord {
        FileRecord {
            name: name.into(),
            extension: extension_of(name),
            size_in_bytes: size,
            timestamps: Timestamps::with_modified(UNIX_EPOCH),
            permissions: Permissions::from_mode(0o644),
            mime_type: "application/octet-stream".to_string(),
            hash: ContentHash::new([size as u8; 32]),
        }
    }

    fn sample() -> Hierarchy {
        let docs = DirectoryNode::assemble(
            "docs",
            [record("a.md", 300), record("b.md", 20), record("c.txt", 0)],
            [DirectoryNode::empty("drafts")],
        );
        let media = DirectoryNode::assemble("media", [record("big.png", 5000)], []);
        let root = DirectoryNode::assemble(
            "root",
            [record("README", 10), record("x.txt", 40)],
            [docs, media],
        );
        Hierarchy::new(
            root,
            DuplicateMap::new(),
            "/tmp/root".into(),
            ScanConfig::new("/tmp/root"),
            Duration::ZERO,
            Vec::new(),
        )
    }

    #[test]
    fn test_counts_and_usage() {
        let summary = SummaryAnalyzer::new().analyze(&sample());

        assert_eq!(summary.total_files, 6);
        assert_eq!(summary.total_directories, 3);
        assert_eq!(summary.total_size, 5370);
        assert_eq!(summary.disk_usage_by_extension[".md"], 320);
        assert_eq!(summary.disk_usage_by_extension[".txt"], 40);
        assert_eq!(summary.disk_usage_by_extension[""], 10);
    }

    #[test]
    fn test_extension_rankings() {
        let summary = SummaryAnalyzer::new().analyze(&sample());

        let most: Vec<_> = summary.most_used_extensions.iter().map(|u| u.extension.as_str()).collect();
        assert_eq!(most, vec![".png", ".md", ".txt", ""]);

        let least: Vec<_> = summary.least_used_extensions.iter().map(|u| u.extension.as_str()).collect();
        assert_eq!(least, vec!["", ".txt", ".md", ".png"]);
        assert_eq!(summary.most_used_extensions[1].file_count, 2);
    }

    #[test]
    fn test_largest_and_empty() {
        let summary = SummaryAnalyzer::with_config(SummaryConfig { top_n: 2 }).analyze(&sample());

        assert_eq!(
            summary.largest_files,
            vec![
                SizedPath { path: "root/media/big.png".into(), size: 5000 },
                SizedPath { path: "root/docs/a.md".into(), size: 300 },
            ]
        );
        assert_eq!(summary.largest_folders[0].path, "root/media");
        assert_eq!(summary.largest_folders[1].path, "root/docs");
        assert_eq!(summary.empty_directories, vec!["root/docs/drafts"]);
        assert_eq!(summary.zero_byte_files, vec!["root/docs/c.txt"]);
    }

    #[test]
    fn test_empty_hierarchy() {
        let hierarchy = Hierarchy::new(
            DirectoryNode::empty("root"),
            DuplicateMap::new(),
            "/tmp/root".into(),
            ScanConfig::new("/tmp/root"),
            Duration::ZERO,
            Vec::new(),
        );
        let summary = SummaryAnalyzer::new().analyze(&hierarchy);

        assert_eq!(summary.total_files, 0);
        assert_eq!(summary.total_directories, 0);
        assert!(summary.most_used_extensions.is_empty());
        assert!(summary.empty_directories.is_empty());
    }
}
