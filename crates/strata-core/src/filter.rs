//! Extension and depth filtering.

use std::collections::BTreeSet;

use crate::node::extension_of;

/// Decides which files are recorded and which directories are expanded.
///
/// Extensions are normalized once on construction (lowercase, leading dot),
/// so `"TXT"`, `"txt"` and `".txt"` all select the same files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathFilter {
    extensions: Option<BTreeSet<String>>,
    max_depth: Option<u32>,
}

impl PathFilter {
    /// Create a filter. `None` means "no restriction" for either argument.
    pub fn new<I, S>(extensions: Option<I>, max_depth: Option<u32>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .map(|exts| exts.into_iter().map(|e| normalize_extension(e.as_ref())).collect()),
            max_depth,
        }
    }

    /// A filter that accepts everything.
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// The normalized extension set, if one is configured.
    pub fn extensions(&self) -> Option<&BTreeSet<String>> {
        self.extensions.as_ref()
    }

    /// The configured depth limit.
    pub fn max_depth(&self) -> Option<u32> {
        self.max_depth
    }

    /// Whether a file with this name is recorded.
    pub fn includes_file(&self, file_name: &str) -> bool {
        match &self.extensions {
            None => true,
            Some(exts) => exts.contains(extension_of(file_name).as_str()),
        }
    }

    /// Whether a subdirectory found while listing a directory at `level`
    /// is expanded. The root is level 0.
    ///
    /// Directories that are not expanded still appear as empty nodes.
    pub fn should_descend(&self, level: u32) -> bool {
        self.max_depth.is_none_or(|limit| level < limit)
    }
}

/// Lowercase an extension and make sure it starts with a dot.
///
/// An empty string stays empty and matches files without an extension.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
