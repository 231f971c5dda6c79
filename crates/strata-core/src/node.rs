//! File and directory node types.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use compact_str::{CompactString, format_compact};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// BLAKE3 content hash for duplicate detection.
///
/// Serialized as a 64 character lowercase hex string so it can be used as a
/// JSON object key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Error parsing a [`ContentHash`] from hex.
#[derive(Debug, Error, PartialEq)]
pub enum ParseHashError {
    /// Wrong number of hex digits.
    #[error("expected 64 hex digits, got {0}")]
    Length(usize),
    /// A character outside `[0-9a-fA-F]`.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(ParseHashError::Length(s.len()));
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        hex.parse().map_err(serde::de::Error::custom)
    }
}

/// File metadata timestamps, truncated to whole seconds.
///
/// Platforms that cannot report creation or access time fall back to the
/// modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Creation time.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,
    /// Last modification time.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub modified: DateTime<Utc>,
    /// Last access time.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub accessed: DateTime<Utc>,
}

impl Timestamps {
    /// Create timestamps with all three times.
    pub fn new(created: SystemTime, modified: SystemTime, accessed: SystemTime) -> Self {
        Self {
            created: to_utc_seconds(created),
            modified: to_utc_seconds(modified),
            accessed: to_utc_seconds(accessed),
        }
    }

    /// Create timestamps where every field is the modification time.
    pub fn with_modified(modified: SystemTime) -> Self {
        Self::new(modified, modified, modified)
    }

    /// Read timestamps out of an already-fetched metadata record.
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        Self::new(
            metadata.created().unwrap_or(modified),
            modified,
            metadata.accessed().unwrap_or(modified),
        )
    }
}

fn to_utc_seconds(time: SystemTime) -> DateTime<Utc> {
    let secs = match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    };
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Permission bits and the access flags derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// Mode bits (`0o7777` mask), serialized as an octal string such as `"644"`.
    #[serde(with = "octal_mode")]
    pub mode: u32,
    /// Any read bit is set.
    pub readable: bool,
    /// Any write bit is set.
    pub writable: bool,
    /// Any execute bit is set.
    pub executable: bool,
}

impl Permissions {
    /// Derive flags from raw mode bits.
    pub fn from_mode(mode: u32) -> Self {
        let mode = mode & 0o7777;
        Self {
            mode,
            readable: mode & 0o444 != 0,
            writable: mode & 0o222 != 0,
            executable: mode & 0o111 != 0,
        }
    }

    /// Read permissions out of an already-fetched metadata record.
    #[cfg(unix)]
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::PermissionsExt;
        Self::from_mode(metadata.permissions().mode())
    }

    /// Read permissions out of an already-fetched metadata record.
    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        if metadata.permissions().readonly() {
            Self::from_mode(0o444)
        } else {
            Self::from_mode(0o644)
        }
    }

    /// Octal mode string, e.g. `"755"`.
    pub fn mode_string(&self) -> String {
        format!("{:o}", self.mode)
    }
}

mod octal_mode {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(mode: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{mode:o}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let octal = String::deserialize(deserializer)?;
        u32::from_str_radix(&octal, 8).map_err(serde::de::Error::custom)
    }
}

/// Lowercased extension of a file name including the leading dot, or `""`.
///
/// Dotfiles without a second dot (`.bashrc`) have no extension.
pub fn extension_of(name: &str) -> CompactString {
    match Path::new(name).extension() {
        Some(ext) => format_compact!(".{}", ext.to_string_lossy().to_lowercase()),
        None => CompactString::default(),
    }
}

/// Join a `/`-separated hierarchy path with a child name.
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Metadata for a single included file.
///
/// `name` and `extension` are the keys the record is stored under in its
/// directory, so they are not repeated in serialized output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File name (not full path).
    #[serde(skip)]
    pub name: CompactString,

    /// Lowercased extension with leading dot, `""` when absent.
    #[serde(skip)]
    pub extension: CompactString,

    /// Size in bytes.
    pub size_in_bytes: u64,

    /// Creation, modification and access times.
    pub timestamps: Timestamps,

    /// Permission bits.
    pub permissions: Permissions,

    /// Detected MIME type.
    pub mime_type: String,

    /// Content hash.
    pub hash: ContentHash,
}

/// Files of one directory grouped by extension, then by file name.
pub type FileMap = BTreeMap<CompactString, BTreeMap<CompactString, FileRecord>>;

/// Duplicate groups: content hash to the sorted hierarchy paths sharing it.
pub type DuplicateMap = BTreeMap<ContentHash, Vec<String>>;

/// A directory in a finished hierarchy.
///
/// The aggregate size is computed in [`DirectoryNode::assemble`] from the
/// files and children it is given, so every node satisfies
/// `aggregate = Σ direct files + Σ child aggregates` by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    #[serde(skip)]
    name: CompactString,

    files: FileMap,

    directories: BTreeMap<CompactString, DirectoryNode>,

    duplicates: DuplicateMap,

    #[serde(rename = "size_in_bytes")]
    aggregate_size: u64,
}

impl DirectoryNode {
    /// Create an empty (terminal) directory node.
    pub fn empty(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Assemble a node from its finished files and child subtrees.
    pub fn assemble(
        name: impl Into<CompactString>,
        files: impl IntoIterator<Item = FileRecord>,
        children: impl IntoIterator<Item = DirectoryNode>,
    ) -> Self {
        let mut node = Self::empty(name);

        for record in files {
            node.aggregate_size += record.size_in_bytes;
            let previous = node
                .files
                .entry(record.extension.clone())
                .or_default()
                .insert(record.name.clone(), record);
            if let Some(previous) = previous {
                node.aggregate_size -= previous.size_in_bytes;
            }
        }

        for child in children {
            node.aggregate_size += child.aggregate_size;
            if let Some(previous) = node.directories.insert(child.name.clone(), child) {
                node.aggregate_size -= previous.aggregate_size;
            }
        }

        node
    }

    /// Directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Files grouped by extension.
    pub fn files(&self) -> &FileMap {
        &self.files
    }

    /// Child directories by name.
    pub fn directories(&self) -> &BTreeMap<CompactString, DirectoryNode> {
        &self.directories
    }

    /// Duplicate groups that have at least one member inside this subtree.
    pub fn duplicates(&self) -> &DuplicateMap {
        &self.duplicates
    }

    /// Total size of every file in this subtree.
    pub fn aggregate_size(&self) -> u64 {
        self.aggregate_size
    }

    /// Look up a direct file by name.
    pub fn file(&self, name: &str) -> Option<&FileRecord> {
        self.files.get(extension_of(name).as_str())?.get(name)
    }

    /// Look up a direct child directory by name.
    pub fn directory(&self, name: &str) -> Option<&DirectoryNode> {
        self.directories.get(name)
    }

    /// Iterate direct files in extension, then name order.
    pub fn iter_files(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values().flat_map(|group| group.values())
    }

    /// Number of files directly in this directory.
    pub fn direct_file_count(&self) -> usize {
        self.files.values().map(BTreeMap::len).sum()
    }

    /// Number of files in this subtree.
    pub fn total_file_count(&self) -> usize {
        self.direct_file_count()
            + self
                .directories
                .values()
                .map(DirectoryNode::total_file_count)
                .sum::<usize>()
    }

    /// Number of directories below this one.
    pub fn total_dir_count(&self) -> usize {
        self.directories
            .values()
            .map(|child| 1 + child.total_dir_count())
            .sum()
    }

    /// Whether the directory holds neither files nor subdirectories.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    /// Check the aggregate size invariant on every node of the subtree.
    pub fn is_aggregate_consistent(&self) -> bool {
        let direct: u64 = self.iter_files().map(|f| f.size_in_bytes).sum();
        let nested: u64 = self.directories.values().map(|c| c.aggregate_size).sum();
        direct + nested == self.aggregate_size
            && self.directories.values().all(DirectoryNode::is_aggregate_consistent)
    }

    /// Attach per-node duplicate views from the global duplicate groups.
    ///
    /// Each node receives every group with at least one member somewhere in
    /// its subtree; member lists are copied whole.
    pub fn attach_duplicate_views(&mut self, groups: &DuplicateMap) {
        self.collect_duplicate_views(groups);
    }

    fn collect_duplicate_views(&mut self, groups: &DuplicateMap) -> BTreeSet<ContentHash> {
        let mut hashes: BTreeSet<ContentHash> = self
            .iter_files()
            .map(|record| record.hash)
            .filter(|hash| groups.contains_key(hash))
            .collect();

        for child in self.directories.values_mut() {
            hashes.extend(child.collect_duplicate_views(groups));
        }

        self.duplicates = hashes
            .iter()
            .filter_map(|hash| groups.get(hash).map(|paths| (*hash, paths.clone())))
            .collect();
        hashes
    }

    /// Restore names that are only stored as map keys.
    ///
    /// Needed after deserialization, where names and extensions come from the
    /// enclosing object keys.
    pub fn adopt_name(&mut self, name: impl Into<CompactString>) {
        self.name = name.into();
        for (extension, group) in &mut self.files {
            for (file_name, record) in group.iter_mut() {
                record.name = file_name.clone();
                record.extension = extension.clone();
            }
        }
        for (child_name, child) in &mut self.directories {
            child.adopt_name(child_name.clone());
        }
    }

    /// Every file in the subtree with its hierarchy path, depth first.
    ///
    /// A directory's own files come before its children's; both in key order.
    pub fn files_with_paths(&self, base: &str) -> Vec<(String, &FileRecord)> {
        let mut out = Vec::new();
        self.push_files(base, &mut out);
        out
    }

    fn push_files<'a>(&'a self, base: &str, out: &mut Vec<(String, &'a FileRecord)>) {
        for record in self.iter_files() {
            out.push((join_path(base, &record.name), record));
        }
        for (name, child) in &self.directories {
            child.push_files(&join_path(base, name), out);
        }
    }

    /// This directory and every directory below it with its hierarchy path.
    pub fn directories_with_paths(&self, base: &str) -> Vec<(String, &DirectoryNode)> {
        let mut out = vec![(base.to_string(), self)];
        for (name, child) in &self.directories {
            out.extend(child.directories_with_paths(&join_path(base, name)));
        }
        out
    }
}
