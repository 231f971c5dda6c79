//! Crawl-wide content hash index.

use dashmap::DashMap;

use strata_core::{ContentHash, DuplicateMap};

/// Maps each content hash to every hierarchy path that produced it.
///
/// Workers insert concurrently while the tree is being built. Each insert
/// takes the write lock of the shard owning the hash, so appends to the same
/// path list are serialized and none are lost.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    entries: DashMap<ContentHash, Vec<String>>,
}

impl DuplicateIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Record that `path` has content `hash`.
    pub fn insert(&self, hash: ContentHash, path: impl Into<String>) {
        self.entries.entry(hash).or_default().push(path.into());
    }

    /// Number of distinct hashes seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths recorded for a hash, in insertion order.
    pub fn paths(&self, hash: &ContentHash) -> Option<Vec<String>> {
        self.entries.get(hash).map(|paths| paths.clone())
    }

    /// Snapshot of every hash with two or more paths, path lists sorted.
    pub fn groups(&self) -> DuplicateMap {
        self.entries
            .iter()
            .filter(|entry| entry.value().len() >= 2)
            .map(|entry| {
                let mut paths = entry.value().clone();
                paths.sort();
                (*entry.key(), paths)
            })
            .collect()
    }

    /// Consume the index into its duplicate groups.
    pub fn into_groups(self) -> DuplicateMap {
        self.entries
            .into_iter()
            .filter(|(_, paths)| paths.len() >= 2)
            .map(|(hash, mut paths)| {
                paths.sort();
                (hash, paths)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_single_paths_are_not_groups() {
        let index = DuplicateIndex::new();
        index.insert(ContentHash::new([1; 32]), "root/a.txt");
        index.insert(ContentHash::new([2; 32]), "root/b.txt");

        assert_eq!(index.len(), 2);
        assert!(index.groups().is_empty());
    }

    #[test]
    fn test_groups_sorted_paths() {
        let index = DuplicateIndex::new();
        let hash = ContentHash::new([3; 32]);
        index.insert(hash, "root/z.txt");
        index.insert(hash, "root/a.txt");

        let groups = index.groups();
        assert_eq!(groups[&hash], vec!["root/a.txt", "root/z.txt"]);
        assert_eq!(index.into_groups(), groups);
    }

    #[test]
    fn test_concurrent_inserts_are_not_lost() {
        let index = DuplicateIndex::new();

        (0..10_000u32).into_par_iter().for_each(|i| {
            let hash = ContentHash::new([(i % 10) as u8; 32]);
            index.insert(hash, format!("root/file{i}"));
        });

        let groups = index.into_groups();
        assert_eq!(groups.len(), 10);
        assert!(groups.values().all(|paths| paths.len() == 1000));
    }
}
