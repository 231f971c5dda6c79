//! Parallel hierarchy builder for strata.
//!
//! # Overview
//!
//! `strata-scan` walks a directory tree and produces a [`Hierarchy`]:
//!
//! - **Parallel traversal**: every directory fans out over its files and
//!   subdirectories on a rayon pool and fans back in before its node exists
//! - **Streaming hashes**: file contents go through BLAKE3 in fixed chunks
//! - **Duplicate index**: a concurrent hash map shared by all workers
//! - **Progress updates** via broadcast channels
//! - **Cancellation** through a [`CancellationToken`]
//!
//! # Example
//!
//! ```rust,no_run
//! let hierarchy = strata_scan::build_hierarchy("/path/to/root", Some([".txt"]), Some(2)).unwrap();
//!
//! println!("Total size: {} bytes", hierarchy.total_size());
//! println!("Duplicate groups: {}", hierarchy.duplicate_groups().len());
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use strata_scan::{HierarchyBuilder, ScanConfig};
//!
//! let builder = HierarchyBuilder::new();
//! let mut progress_rx = builder.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(progress) = progress_rx.blocking_recv() {
//!         println!("Hashed {} files", progress.files_scanned);
//!     }
//! });
//!
//! let hierarchy = builder.build(&ScanConfig::new("/path/to/root")).unwrap();
//! ```

use std::path::PathBuf;

mod ancestry;
mod builder;
mod duplicates;
mod metadata;
pub mod mime;
mod progress;

pub use builder::HierarchyBuilder;
pub use duplicates::DuplicateIndex;
pub use metadata::{MetadataExtractor, hash_reader};
pub use progress::ScanProgress;
pub use tokio_util::sync::CancellationToken;

// Re-export core types for convenience
pub use strata_core::{
    ContentHash, DirectoryNode, FileRecord, Hierarchy, PathFilter, ScanConfig, ScanError,
    ScanWarning, TreeStats, WarningKind,
};

/// Build the hierarchy rooted at `root`.
///
/// `extensions` restricts which files are recorded (`None` records all of
/// them). `depth` limits how many directory levels below the root are
/// expanded; `Some(0)` records only the root's own files.
pub fn build_hierarchy<I, S>(
    root: impl Into<PathBuf>,
    extensions: Option<I>,
    depth: Option<u32>,
) -> Result<Hierarchy, ScanError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let config = ScanConfig {
        extensions: extensions.map(|exts| {
            exts.into_iter()
                .map(|e| strata_core::normalize_extension(e.as_ref()))
                .collect()
        }),
        max_depth: depth,
        ..ScanConfig::new(root)
    };
    HierarchyBuilder::new().build(&config)
}
