//! Core types for strata.
//!
//! This crate provides the data model shared by every other strata crate:
//! the immutable directory hierarchy, per-file records, the path filter and
//! build configuration.

mod config;
mod error;
mod filter;
mod node;
mod tree;

pub use config::{DEFAULT_CHUNK_SIZE, ScanConfig, ScanConfigBuilder};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use filter::{PathFilter, normalize_extension};
pub use node::{
    ContentHash, DirectoryNode, DuplicateMap, FileMap, FileRecord, ParseHashError, Permissions,
    Timestamps, extension_of, join_path,
};
pub use tree::{Hierarchy, TreeStats};
