//! JSON export and re-parse.
//!
//! The document is an object with a single key, the root directory name,
//! whose value is the root [`DirectoryNode`]. Names are only stored as
//! object keys, so parsing restores them with [`DirectoryNode::adopt_name`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use strata_core::{DirectoryNode, Hierarchy};
use tracing::info;

use crate::error::{ExportError, ExportResult};

fn document(hierarchy: &Hierarchy) -> BTreeMap<&str, &DirectoryNode> {
    BTreeMap::from([(hierarchy.root_name(), hierarchy.root())])
}

/// Serialize the hierarchy as compact JSON.
pub fn to_json_string(hierarchy: &Hierarchy) -> ExportResult<String> {
    Ok(serde_json::to_string(&document(hierarchy))?)
}

/// Write the hierarchy as pretty-printed JSON.
pub fn write_json<W: Write>(hierarchy: &Hierarchy, writer: W) -> ExportResult<()> {
    serde_json::to_writer_pretty(writer, &document(hierarchy))?;
    Ok(())
}

/// Write the hierarchy as pretty-printed JSON to `path`.
pub fn export_json(hierarchy: &Hierarchy, path: &Path) -> ExportResult<()> {
    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_json(hierarchy, &mut writer).map_err(|e| e.at_path(path))?;
    writer.flush().map_err(|e| ExportError::io(path, e))?;

    info!(path = %path.display(), "exported JSON");
    Ok(())
}

/// Parse a document produced by the JSON exporter back into its root node.
pub fn parse_hierarchy(json: &str) -> ExportResult<DirectoryNode> {
    let mut document: BTreeMap<String, DirectoryNode> = serde_json::from_str(json)?;
    if document.len() != 1 {
        return Err(ExportError::InvalidDocument {
            message: format!("expected one root entry, found {}", document.len()),
        });
    }

    let Some((name, mut root)) = document.pop_first() else {
        return Err(ExportError::InvalidDocument {
            message: "empty document".to_string(),
        });
    };
    root.adopt_name(name);
    Ok(root)
}
