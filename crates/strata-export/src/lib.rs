//! Exporters for strata hierarchies.
//!
//! Three formats, all read-only over a finished [`Hierarchy`]:
//!
//! - **JSON** - a lossless mirror of the tree, re-parseable with
//!   [`parse_hierarchy`]
//! - **CSV** - one row per file with a fixed column order ([`CSV_HEADER`])
//! - **HTML** - a single self-contained page embedding the JSON document
//!
//! ```rust,no_run
//! use strata_export::HierarchyExport;
//!
//! let hierarchy = strata_scan::build_hierarchy("/path/to/root", Some([".txt"]), None).unwrap();
//!
//! hierarchy.export_to_json("hierarchy.json").unwrap();
//! let rows = hierarchy.export_to_csv("hierarchy.csv").unwrap();
//! hierarchy.visualize_with_html("hierarchy.html").unwrap();
//! println!("{rows} files exported");
//! ```

mod error;
mod html;
mod json;
mod table;

use std::path::Path;

use strata_core::Hierarchy;

pub use error::{ExportError, ExportResult};
pub use html::{escape_html, export_html, render_html, render_html_with_summary};
pub use json::{export_json, parse_hierarchy, to_json_string, write_json};
pub use table::{CSV_HEADER, export_csv, write_csv};

/// Export operations available on a finished hierarchy.
pub trait HierarchyExport {
    /// Write the JSON document to `path`.
    fn export_to_json(&self, path: impl AsRef<Path>) -> ExportResult<()>;

    /// Write one CSV row per file to `path`. Returns the number of rows.
    fn export_to_csv(&self, path: impl AsRef<Path>) -> ExportResult<usize>;

    /// Write the HTML visualization to `path`.
    fn visualize_with_html(&self, path: impl AsRef<Path>) -> ExportResult<()>;
}

impl HierarchyExport for Hierarchy {
    fn export_to_json(&self, path: impl AsRef<Path>) -> ExportResult<()> {
        export_json(self, path.as_ref())
    }

    fn export_to_csv(&self, path: impl AsRef<Path>) -> ExportResult<usize> {
        export_csv(self, path.as_ref())
    }

    fn visualize_with_html(&self, path: impl AsRef<Path>) -> ExportResult<()> {
        export_html(self, path.as_ref())
    }
}
