//! Scan configuration types.

use std::collections::BTreeSet;
use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::filter::PathFilter;

/// Default read buffer for streaming hashes (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Configuration for a hierarchy build.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to crawl.
    pub root: PathBuf,

    /// Accepted file extensions (None = all files).
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    pub extensions: Option<BTreeSet<String>>,

    /// Maximum depth to expand (None = unlimited, 0 = root files only).
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Follow symbolic links. Links back into an ancestor are skipped.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub follow_symlinks: bool,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Number of worker threads (0 = rayon default).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Read buffer size used while hashing.
    #[builder(default = "DEFAULT_CHUNK_SIZE")]
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if self.chunk_size == Some(0) {
            return Err("Chunk size must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for crawling a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: None,
            max_depth: None,
            follow_symlinks: true,
            include_hidden: true,
            threads: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// The path filter described by this config.
    pub fn path_filter(&self) -> PathFilter {
        PathFilter::new(self.extensions.as_ref(), self.max_depth)
    }

    /// Check if hidden files should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
