//! Symlink loop detection.

use std::fs::Metadata;
use std::path::Path;

#[cfg(unix)]
type DirKey = (u64, u64);

#[cfg(not(unix))]
type DirKey = std::path::PathBuf;

/// Identities of the directories between the root and the one being listed.
///
/// A directory whose identity is already on the chain is a link back into an
/// ancestor; descending into it would never terminate.
#[derive(Debug, Clone, Default)]
pub(crate) struct Ancestry {
    chain: Vec<DirKey>,
}

impl Ancestry {
    /// Start a chain at the root directory.
    pub fn root(path: &Path, metadata: &Metadata) -> Self {
        Self {
            chain: dir_key(path, metadata).into_iter().collect(),
        }
    }

    /// Extend the chain with a child, or `None` if the child is an ancestor.
    pub fn descend(&self, path: &Path, metadata: &Metadata) -> Option<Self> {
        let Some(key) = dir_key(path, metadata) else {
            return Some(self.clone());
        };
        if self.chain.contains(&key) {
            return None;
        }
        let mut chain = self.chain.clone();
        chain.push(key);
        Some(Self { chain })
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.chain.len()
    }
}

#[cfg(unix)]
fn dir_key(_path: &Path, metadata: &Metadata) -> Option<DirKey> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn dir_key(path: &Path, _metadata: &Metadata) -> Option<DirKey> {
    path.canonicalize().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_descend_rejects_ancestor() {
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("sub");
        fs::create_dir(&sub).unwrap();

        let root_meta = fs::metadata(temp.path()).unwrap();
        let sub_meta = fs::metadata(&sub).unwrap();

        let root = Ancestry::root(temp.path(), &root_meta);
        let child = root.descend(&sub, &sub_meta).unwrap();
        assert_eq!(child.depth(), 2);

        assert!(child.descend(temp.path(), &root_meta).is_none());
        assert!(child.descend(&sub, &sub_meta).is_none());
    }
}
