//! CSV export: one row per recorded file, depth first.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use strata_core::Hierarchy;
use tracing::info;

use crate::error::{ExportError, ExportResult};

/// Column order of every exported CSV file.
pub const CSV_HEADER: [&str; 10] = [
    "path",
    "name",
    "extension",
    "size_in_bytes",
    "created",
    "modified",
    "accessed",
    "permissions",
    "mime_type",
    "hash",
];

fn rfc3339(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Write one row per file, depth first. Returns the number of data rows.
pub fn write_csv<W: Write>(hierarchy: &Hierarchy, writer: W) -> ExportResult<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;

    let files = hierarchy.files();
    for (path, record) in &files {
        let size = record.size_in_bytes.to_string();
        let created = rfc3339(&record.timestamps.created);
        let modified = rfc3339(&record.timestamps.modified);
        let accessed = rfc3339(&record.timestamps.accessed);
        let permissions = record.permissions.mode_string();
        let hash = record.hash.to_hex();

        wtr.write_record([
            path.as_str(),
            record.name.as_str(),
            record.extension.as_str(),
            &size,
            &created,
            &modified,
            &accessed,
            &permissions,
            &record.mime_type,
            &hash,
        ])?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(files.len())
}

/// Write the CSV export to `path`. Returns the number of data rows.
pub fn export_csv(hierarchy: &Hierarchy, path: &Path) -> ExportResult<usize> {
    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    let rows = write_csv(hierarchy, file).map_err(|e| e.at_path(path))?;

    info!(path = %path.display(), rows, "exported CSV");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};
    use strata_core::{
        ContentHash, DirectoryNode, DuplicateMap, FileRecord, Permissions, ScanConfig, Timestamps,
        extension_of,
    };

    fn record(name: &str, size: u64) -> FileRecord {
        FileRecord {
            name: name.into(),
            extension: extension_of(name),
            size_in_bytes: size,
            timestamps: Timestamps::with_modified(UNIX_EPOCH + Duration::from_secs(86_400)),
            permissions: Permissions::from_mode(0o755),
            mime_type: "text/x-shellscript".to_string(),
            hash: ContentHash::new([0xab; 32]),
        }
    }

    #[test]
    fn test_rows_and_columns() {
        let sub = DirectoryNode::assemble("bin", [record("run.sh", 12)], []);
        let root = DirectoryNode::assemble("proj", [record("build, now.sh", 3)], [sub]);
        let hierarchy = Hierarchy::new(
            root,
            DuplicateMap::new(),
            "/src/proj".into(),
            ScanConfig::new("/src/proj"),
            Duration::ZERO,
            Vec::new(),
        );

        let mut out = Vec::new();
        let rows = write_csv(&hierarchy, &mut out).unwrap();
        assert_eq!(rows, 2);

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, CSV_HEADER);

        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);

        // Root files first, the comma survives quoting
        assert_eq!(&records[0][0], "proj/build, now.sh");
        assert_eq!(&records[1][0], "proj/bin/run.sh");
        assert_eq!(&records[1][1], "run.sh");
        assert_eq!(&records[1][2], ".sh");
        assert_eq!(&records[1][3], "12");
        assert_eq!(&records[1][4], "1970-01-02T00:00:00Z");
        assert_eq!(&records[1][7], "755");
        assert_eq!(&records[1][8], "text/x-shellscript");
        assert_eq!(&records[1][9], "ab".repeat(32));
    }

    #[test]
    fn test_empty_hierarchy_has_header_only() {
        let hierarchy = Hierarchy::new(
            DirectoryNode::empty("root"),
            DuplicateMap::new(),
            "/root".into(),
            ScanConfig::new("/root"),
            Duration::ZERO,
            Vec::new(),
        );

        let mut out = Vec::new();
        assert_eq!(write_csv(&hierarchy, &mut out).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }
}
