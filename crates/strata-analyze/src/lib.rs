//! Analysis over strata hierarchies.
//!
//! Everything here is a read-only pass over a finished [`Hierarchy`]:
//!
//! - **Summary statistics** - usage by extension, largest files and folders,
//!   empty directories and zero-byte files
//! - **Duplicate reports** - the crawl-wide duplicate groups ranked by
//!   reclaimable space
//!
//! ```rust,no_run
//! use strata_analyze::{DuplicateReport, SummaryAnalyzer};
//!
//! let hierarchy = strata_scan::build_hierarchy("/path/to/root", None::<[&str; 0]>, None).unwrap();
//!
//! let summary = SummaryAnalyzer::new().analyze(&hierarchy);
//! for usage in &summary.most_used_extensions {
//!     println!("{}: {} bytes", usage.extension, usage.bytes);
//! }
//!
//! let report = DuplicateReport::from_hierarchy(&hierarchy);
//! println!("Found {} duplicate groups", report.group_count);
//! println!("Wasted space: {} bytes", report.total_wasted_space);
//! ```

mod duplicates;
mod summary;

pub use duplicates::{DuplicateConfig, DuplicateConfigBuilder, DuplicateGroup, DuplicateReport};
pub use summary::{
    ExtensionUsage, HierarchySummary, SizedPath, SummaryAnalyzer, SummaryConfig,
    SummaryConfigBuilder,
};

// Re-export core types
pub use strata_core::{ContentHash, Hierarchy};
