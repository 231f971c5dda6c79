//! Rayon-based parallel hierarchy builder.

use std::collections::HashSet;
use std::fs::{self, DirEntry, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use strata_core::{
    DirectoryNode, FileRecord, Hierarchy, PathFilter, ScanConfig, ScanError, ScanWarning,
    join_path,
};

use crate::ancestry::Ancestry;
use crate::duplicates::DuplicateIndex;
use crate::metadata::MetadataExtractor;
use crate::progress::{ProgressTracker, ScanProgress};

/// Files between two progress broadcasts.
const PROGRESS_INTERVAL: u64 = 1000;

/// Builds a [`Hierarchy`] by walking a directory tree on a rayon pool.
///
/// Every directory fans out over its files and subdirectories in parallel
/// and fans back in before its node is assembled, so a node's aggregate size
/// is only computed once all of its children are finished.
pub struct HierarchyBuilder {
    progress_tx: broadcast::Sender<ScanProgress>,
    cancel: CancellationToken,
}

impl HierarchyBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Create a builder that stops when `cancel` is triggered.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx, cancel }
    }

    /// Subscribe to build progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Token that aborts builds run by this builder.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abort any running build. It returns [`ScanError::Interrupted`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Build the hierarchy described by `config`.
    ///
    /// Fails if the root is missing, is not a directory or cannot be listed,
    /// or if the build is cancelled. Problems with individual entries are
    /// collected in [`Hierarchy::warnings`] instead.
    pub fn build(&self, config: &ScanConfig) -> Result<Hierarchy, ScanError> {
        let start = Instant::now();
        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        let root_metadata = fs::metadata(&root_path).map_err(|e| ScanError::io(&root_path, e))?;
        if !root_metadata.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        let root_name = root_name(&config.root, &root_path);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("strata-scan-{i}"))
            .build()
            .map_err(|e| ScanError::Other {
                message: e.to_string(),
            })?;

        let walk = Walk {
            config,
            filter: config.path_filter(),
            extractor: MetadataExtractor::with_chunk_size(config.chunk_size),
            index: DuplicateIndex::new(),
            progress: ProgressTracker::new(),
            progress_tx: &self.progress_tx,
            cancel: &self.cancel,
        };

        let ancestry = Ancestry::root(&root_path, &root_metadata);
        let built = pool.install(|| walk.build_dir(&root_path, &root_name, &root_name, 0, &ancestry))?;

        let Walk {
            index, progress, ..
        } = walk;
        let _ = self.progress_tx.send(progress.snapshot(root_path.clone()));

        let mut warnings = built.warnings;
        warnings.sort_by(|a, b| a.path.cmp(&b.path));

        let hierarchy = Hierarchy::new(
            built.node,
            index.into_groups(),
            root_path,
            config.clone(),
            start.elapsed(),
            warnings,
        );

        info!(
            root = %hierarchy.root_path.display(),
            files = hierarchy.total_files(),
            dirs = hierarchy.total_dirs(),
            bytes = hierarchy.total_size(),
            duplicate_groups = hierarchy.duplicate_groups().len(),
            warnings = hierarchy.warnings.len(),
            "hierarchy built"
        );

        Ok(hierarchy)
    }
}

impl Default for HierarchyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Name of the hierarchy root.
///
/// Taken from the path as given, so a symlinked root keeps the link's name.
/// Paths such as `.` fall back to the resolved directory. A filesystem root
/// has no final component and is named after itself (`/`).
fn root_name(requested: &Path, canonical: &Path) -> String {
    if let Some(name) = requested.file_name().or_else(|| canonical.file_name()) {
        return name.to_string_lossy().into_owned();
    }

    let full = canonical.to_string_lossy();
    let trimmed = full.trim_end_matches(std::path::is_separator);
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A finished subtree and the entries skipped inside it.
struct Built {
    node: DirectoryNode,
    warnings: Vec<ScanWarning>,
}

/// Result of processing one entry: kept, or skipped with a reason.
enum Outcome<T> {
    Done(T),
    Skipped(ScanWarning),
}

/// What a directory entry turned out to be after following links.
enum Listed {
    File,
    Dir(Metadata),
}

/// State shared by every worker during one build.
struct Walk<'a> {
    config: &'a ScanConfig,
    filter: PathFilter,
    extractor: MetadataExtractor,
    index: DuplicateIndex,
    progress: ProgressTracker,
    progress_tx: &'a broadcast::Sender<ScanProgress>,
    cancel: &'a CancellationToken,
}

impl Walk<'_> {
    /// List one directory and build its node. `rel` is its hierarchy path.
    fn build_dir(
        &self,
        path: &Path,
        name: &str,
        rel: &str,
        level: u32,
        ancestry: &Ancestry,
    ) -> Result<Built, ScanError> {
        self.check_cancelled()?;
        debug!(path = %path.display(), level, "listing directory");

        let mut warnings = Vec::new();
        let read_dir = match fs::read_dir(path) {
            Ok(read_dir) => read_dir,
            Err(e) if level == 0 => return Err(ScanError::io(path, e)),
            Err(e) => {
                warnings.push(self.skip(path, &e));
                return Ok(Built {
                    node: DirectoryNode::empty(name),
                    warnings,
                });
            }
        };

        let mut listed: Vec<(PathBuf, String, Listed)> = Vec::new();

        for entry in read_dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warnings.push(self.skip(path, &e));
                    continue;
                }
            };

            let entry_name = entry.file_name().to_string_lossy().to_string();
            if self.config.should_skip_hidden(&entry_name) {
                continue;
            }

            match self.classify(&entry) {
                Ok(Some(Listed::File)) if !self.filter.includes_file(&entry_name) => {}
                Ok(Some(kind)) => listed.push((entry.path(), entry_name, kind)),
                Ok(None) => {}
                Err(warning) => warnings.push(warning),
            }
        }

        // Raw name order decides which entry keeps a clashing lossy name
        listed.sort_by(|a, b| a.0.cmp(&b.0));

        let mut taken = HashSet::with_capacity(listed.len());
        let mut files: Vec<(PathBuf, String)> = Vec::new();
        let mut dirs: Vec<(PathBuf, String, Metadata)> = Vec::new();
        for (entry_path, entry_name, kind) in listed {
            if !taken.insert(entry_name.clone()) {
                warnings.push(self.warn(ScanWarning::name_collision(&entry_path, &entry_name)));
                continue;
            }
            match kind {
                Listed::File => files.push((entry_path, entry_name)),
                Listed::Dir(metadata) => dirs.push((entry_path, entry_name, metadata)),
            }
        }

        let (file_outcomes, dir_outcomes) = rayon::join(
            || {
                files
                    .par_iter()
                    .map(|(file_path, file_name)| self.process_file(file_path, file_name, rel))
                    .collect::<Result<Vec<_>, ScanError>>()
            },
            || {
                dirs.par_iter()
                    .map(|(dir_path, dir_name, metadata)| {
                        self.process_dir(dir_path, dir_name, metadata, rel, level, ancestry)
                    })
                    .collect::<Result<Vec<_>, ScanError>>()
            },
        );

        let mut records = Vec::with_capacity(files.len());
        for outcome in file_outcomes? {
            match outcome {
                Outcome::Done(record) => records.push(record),
                Outcome::Skipped(warning) => warnings.push(warning),
            }
        }

        let mut children = Vec::with_capacity(dirs.len());
        for outcome in dir_outcomes? {
            match outcome {
                Outcome::Done(built) => {
                    children.push(built.node);
                    warnings.extend(built.warnings);
                }
                Outcome::Skipped(warning) => warnings.push(warning),
            }
        }

        let node = DirectoryNode::assemble(name, records, children);
        self.progress.record_dir();
        debug!(
            path = %path.display(),
            aggregate_size = node.aggregate_size(),
            "directory finished"
        );

        Ok(Built { node, warnings })
    }

    /// Resolve an entry's type, following symlinks when configured.
    fn classify(&self, entry: &DirEntry) -> Result<Option<Listed>, ScanWarning> {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| self.skip(&path, &e))?;

        if file_type.is_symlink() {
            if !self.config.follow_symlinks {
                return Ok(None);
            }
            return match fs::metadata(&path) {
                Ok(metadata) if metadata.is_dir() => Ok(Some(Listed::Dir(metadata))),
                Ok(metadata) if metadata.is_file() => Ok(Some(Listed::File)),
                Ok(_) => Ok(None),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    let target = fs::read_link(&path)
                        .map(|p| p.to_string_lossy().to_string())
                        .unwrap_or_default();
                    Err(self.warn(ScanWarning::broken_symlink(&path, &target)))
                }
                Err(e) => Err(self.skip(&path, &e)),
            };
        }

        if file_type.is_dir() {
            let metadata = entry.metadata().map_err(|e| self.skip(&path, &e))?;
            Ok(Some(Listed::Dir(metadata)))
        } else if file_type.is_file() {
            Ok(Some(Listed::File))
        } else {
            // Sockets, devices, fifos
            Ok(None)
        }
    }

    fn process_file(
        &self,
        path: &Path,
        name: &str,
        rel: &str,
    ) -> Result<Outcome<FileRecord>, ScanError> {
        self.check_cancelled()?;

        match self.extractor.extract(path) {
            Ok(record) => {
                self.index.insert(record.hash, join_path(rel, name));

                let recorded = self.progress.record_file(record.size_in_bytes);
                if recorded % PROGRESS_INTERVAL == 0 {
                    let _ = self.progress_tx.send(self.progress.snapshot(path.to_path_buf()));
                }
                Ok(Outcome::Done(record))
            }
            Err(e) => Ok(Outcome::Skipped(self.skip(path, &e))),
        }
    }

    fn process_dir(
        &self,
        path: &Path,
        name: &str,
        metadata: &Metadata,
        rel: &str,
        level: u32,
        ancestry: &Ancestry,
    ) -> Result<Outcome<Built>, ScanError> {
        let Some(child_ancestry) = ancestry.descend(path, metadata) else {
            return Ok(Outcome::Skipped(self.warn(ScanWarning::symlink_loop(path))));
        };

        if !self.filter.should_descend(level) {
            return Ok(Outcome::Done(Built {
                node: DirectoryNode::empty(name),
                warnings: Vec::new(),
            }));
        }

        self.build_dir(path, name, &join_path(rel, name), level + 1, &child_ancestry)
            .map(Outcome::Done)
    }

    fn skip(&self, path: &Path, error: &io::Error) -> ScanWarning {
        self.warn(ScanWarning::from_io(path, error))
    }

    fn warn(&self, warning: ScanWarning) -> ScanWarning {
        warn!(
            path = %warning.path.display(),
            kind = ?warning.kind,
            error = %warning.message,
            "skipping entry"
        );
        self.progress.record_errors(1);
        warning
    }

    fn check_cancelled(&self) -> Result<(), ScanError> {
        if self.cancel.is_cancelled() {
            Err(ScanError::Interrupted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::WarningKind;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.txt"), "another file here").unwrap();

        temp
    }

    #[test]
    fn test_basic_build() {
        let temp = create_test_tree();
        let hierarchy = HierarchyBuilder::new().build(&ScanConfig::new(temp.path())).unwrap();

        assert_eq!(hierarchy.stats.total_files, 4);
        assert_eq!(hierarchy.stats.total_dirs, 3);
        assert_eq!(hierarchy.total_size(), 5 + 17 + 4 + 17);
        assert!(hierarchy.root().is_aggregate_consistent());
        assert!(!hierarchy.has_warnings());
    }

    #[test]
    fn test_duplicate_paths_are_hierarchy_relative() {
        let temp = create_test_tree();
        fs::write(temp.path().join("dir2/copy.txt"), "hello").unwrap();

        let hierarchy = HierarchyBuilder::new().build(&ScanConfig::new(temp.path())).unwrap();
        let root = hierarchy.root_name().to_string();

        let groups = hierarchy.duplicate_groups();
        assert_eq!(groups.len(), 1);
        let paths = groups.values().next().unwrap();
        assert_eq!(
            paths,
            &vec![format!("{root}/dir2/copy.txt"), format!("{root}/file1.txt")]
        );
    }

    #[test]
    fn test_single_thread_matches_default_pool() {
        let temp = create_test_tree();
        let builder = HierarchyBuilder::new();

        let parallel = builder.build(&ScanConfig::new(temp.path())).unwrap();
        let serial = builder
            .build(
                &ScanConfig::builder()
                    .root(temp.path())
                    .threads(1usize)
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(parallel.root(), serial.root());
    }

    #[test]
    fn test_skip_hidden() {
        let temp = create_test_tree();
        fs::write(temp.path().join(".hidden"), "secret").unwrap();

        let config = ScanConfig::builder()
            .root(temp.path())
            .include_hidden(false)
            .build()
            .unwrap();
        let hierarchy = HierarchyBuilder::new().build(&config).unwrap();

        assert!(hierarchy.root().file(".hidden").is_none());
        assert_eq!(hierarchy.total_files(), 4);
    }

    #[test]
    fn test_cancelled_build_returns_no_tree() {
        let temp = create_test_tree();
        let builder = HierarchyBuilder::new();
        builder.cancel();

        let result = builder.build(&ScanConfig::new(temp.path()));
        assert!(matches!(result, Err(ScanError::Interrupted)));
    }

    #[test]
    fn test_progress_is_broadcast() {
        let temp = create_test_tree();
        let builder = HierarchyBuilder::new();
        let mut rx = builder.subscribe();

        builder.build(&ScanConfig::new(temp.path())).unwrap();

        let mut last = None;
        while let Ok(progress) = rx.try_recv() {
            last = Some(progress);
        }
        let last = last.expect("final progress snapshot");
        assert_eq!(last.files_scanned, 4);
        assert_eq!(last.dirs_scanned, 4);
    }

    #[test]
    fn test_small_build_sends_only_final_snapshot() {
        let temp = create_test_tree();
        let builder = HierarchyBuilder::new();
        let mut rx = builder.subscribe();

        builder.build(&ScanConfig::new(temp.path())).unwrap();

        let snapshots: Vec<ScanProgress> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].files_scanned, 4);
    }

    #[test]
    fn test_root_name() {
        assert_eq!(root_name(Path::new("/data/photos"), Path::new("/data/photos")), "photos");
        assert_eq!(root_name(Path::new("photos/"), Path::new("/data/photos")), "photos");
        assert_eq!(root_name(Path::new("."), Path::new("/data/photos")), "photos");
        assert_eq!(root_name(Path::new("/data/link"), Path::new("/data/photos")), "link");
        assert_eq!(root_name(Path::new("/"), Path::new("/")), "/");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_root_keeps_link_name() {
        let temp = create_test_tree();
        let link = temp.path().join("shortcut");
        std::os::unix::fs::symlink(temp.path().join("dir2"), &link).unwrap();

        let hierarchy = HierarchyBuilder::new().build(&ScanConfig::new(&link)).unwrap();

        assert_eq!(hierarchy.root_name(), "shortcut");
        assert!(hierarchy.root_path.ends_with("dir2"));
        let paths: Vec<String> = hierarchy.files().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["shortcut/file4.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_is_warning() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(temp.path().join("nowhere"), temp.path().join("dangling")).unwrap();

        let hierarchy = HierarchyBuilder::new().build(&ScanConfig::new(temp.path())).unwrap();

        assert_eq!(hierarchy.total_files(), 4);
        assert_eq!(hierarchy.warnings.len(), 1);
        assert_eq!(hierarchy.warnings[0].kind, WarningKind::BrokenSymlink);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_skipped() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(temp.path(), temp.path().join("dir1/subdir/back")).unwrap();

        let hierarchy = HierarchyBuilder::new().build(&ScanConfig::new(temp.path())).unwrap();

        let subdir = hierarchy
            .root()
            .directory("dir1")
            .and_then(|d| d.directory("subdir"))
            .unwrap();
        assert!(subdir.directory("back").is_none());
        assert_eq!(hierarchy.total_files(), 4);
        assert!(
            hierarchy
                .warnings
                .iter()
                .any(|w| w.kind == WarningKind::SymlinkLoop)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed_when_disabled() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(temp.path().join("file1.txt"), temp.path().join("alias.txt")).unwrap();

        let config = ScanConfig::builder()
            .root(temp.path())
            .follow_symlinks(false)
            .build()
            .unwrap();
        let hierarchy = HierarchyBuilder::new().build(&config).unwrap();

        assert!(hierarchy.root().file("alias.txt").is_none());
        assert!(hierarchy.duplicate_groups().is_empty());
    }
}
