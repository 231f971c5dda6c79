use std::collections::BTreeSet;
use std::time::{Duration, UNIX_EPOCH};

use strata_core::{
    ContentHash, DirectoryNode, DuplicateMap, FileRecord, Hierarchy, PathFilter, Permissions,
    ScanConfig, ScanError, ScanWarning, Timestamps, WarningKind, extension_of,
};

fn record(name: &str, size: u64, hash_byte: u8) -> FileRecord {
    FileRecord {
        name: name.into(),
        extension: extension_of(name),
        size_in_bytes: size,
        timestamps: Timestamps::with_modified(UNIX_EPOCH + Duration::from_secs(1_000)),
        permissions: Permissions::from_mode(0o644),
        mime_type: "text/plain".to_string(),
        hash: ContentHash::new([hash_byte; 32]),
    }
}

#[test]
fn test_content_hash_hex_round_trip() {
    let hash = ContentHash::new([0xab; 32]);
    let hex = hash.to_hex();

    assert_eq!(hex.len(), 64);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(hex.parse::<ContentHash>().unwrap(), hash);
    assert_ne!(hash, ContentHash::new([0xcd; 32]));
}

#[test]
fn test_aggregate_invariant_example() {
    let sub = DirectoryNode::assemble("sub", [record("b.txt", 50, 2)], []);
    let root = DirectoryNode::assemble("root", [record("a.txt", 100, 1)], [sub]);

    assert_eq!(root.directory("sub").unwrap().aggregate_size(), 50);
    assert_eq!(root.aggregate_size(), 150);
    assert!(root.is_aggregate_consistent());
}

#[test]
fn test_files_grouped_by_extension() {
    let root = DirectoryNode::assemble(
        "root",
        [record("a.txt", 1, 1), record("b.TXT", 2, 2), record("Makefile", 3, 3)],
        [],
    );

    let extensions: Vec<&str> = root.files().keys().map(|k| k.as_str()).collect();
    assert_eq!(extensions, vec!["", ".txt"]);
    assert_eq!(root.files()[".txt"].len(), 2);
    assert_eq!(root.direct_file_count(), 3);
}

#[test]
fn test_hierarchy_views_and_stats() {
    let left = DirectoryNode::assemble("left", [record("x", 10, 7), record("y", 10, 7)], []);
    let right = DirectoryNode::assemble("right", [record("z", 4, 8)], []);
    let root = DirectoryNode::assemble("root", [], [left, right]);

    let groups = DuplicateMap::from([(
        ContentHash::new([7; 32]),
        vec!["root/left/x".to_string(), "root/left/y".to_string()],
    )]);
    let hierarchy = Hierarchy::new(
        root,
        groups.clone(),
        "/tmp/root".into(),
        ScanConfig::new("/tmp/root"),
        Duration::from_millis(5),
        Vec::new(),
    );

    assert_eq!(hierarchy.root().duplicates(), &groups);
    assert_eq!(hierarchy.root().directory("left").unwrap().duplicates(), &groups);
    assert!(hierarchy.root().directory("right").unwrap().duplicates().is_empty());

    assert_eq!(hierarchy.total_files(), 3);
    assert_eq!(hierarchy.total_dirs(), 2);
    assert_eq!(hierarchy.total_size(), 24);
    assert_eq!(hierarchy.stats.max_depth, 1);

    let paths: Vec<String> = hierarchy.files().into_iter().map(|(p, _)| p).collect();
    assert_eq!(paths, vec!["root/left/x", "root/left/y", "root/right/z"]);
}

#[test]
fn test_path_filter_contract() {
    let filter = PathFilter::new(Some(BTreeSet::from(["TXT".to_string()])), Some(1));

    assert!(filter.includes_file("notes.txt"));
    assert!(filter.includes_file("LOUD.TXT"));
    assert!(!filter.includes_file("image.png"));
    assert!(!filter.includes_file("txt"));

    assert!(filter.should_descend(0));
    assert!(!filter.should_descend(1));

    let all = PathFilter::accept_all();
    assert!(all.includes_file("anything.bin"));
    assert!(all.should_descend(10_000));
}

#[test]
fn test_scan_error_classification() {
    let not_found = ScanError::io("/missing", std::io::Error::from(std::io::ErrorKind::NotFound));
    assert!(matches!(not_found, ScanError::NotFound { .. }));

    let denied = ScanError::io("/secret", std::io::Error::from(std::io::ErrorKind::PermissionDenied));
    assert!(matches!(denied, ScanError::PermissionDenied { .. }));

    let vanished = ScanWarning::from_io("/tmp/gone", &std::io::Error::from(std::io::ErrorKind::NotFound));
    assert_eq!(vanished.kind, WarningKind::Vanished);
}

#[test]
fn test_config_serde_defaults() {
    let config: ScanConfig = serde_json::from_str(r#"{"root": "/data"}"#).unwrap();

    assert!(config.follow_symlinks);
    assert!(config.include_hidden);
    assert_eq!(config.threads, 0);
    assert!(config.extensions.is_none());
    assert!(config.path_filter().should_descend(100));
}
