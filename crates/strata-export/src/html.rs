//! Self-contained HTML visualization.
//!
//! The page carries the JSON export in the `data-hierarchy` attribute of the
//! `#hierarchy` element; the embedded script reads it from there and renders
//! the tree. A summary section is rendered server side.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use humansize::{BINARY, format_size};
use strata_analyze::{HierarchySummary, SizedPath, SummaryAnalyzer};
use strata_core::Hierarchy;
use tracing::info;

use crate::error::{ExportError, ExportResult};
use crate::json::to_json_string;

const TEMPLATE: &str = include_str!("../assets/tree.html");

/// Render the page for `hierarchy`, summarized with the default analyzer.
pub fn render_html(hierarchy: &Hierarchy) -> ExportResult<String> {
    let summary = SummaryAnalyzer::new().analyze(hierarchy);
    render_html_with_summary(hierarchy, &summary)
}

/// Render the page for `hierarchy` with a precomputed summary.
pub fn render_html_with_summary(
    hierarchy: &Hierarchy,
    summary: &HierarchySummary,
) -> ExportResult<String> {
    let data = escape_html(&to_json_string(hierarchy)?);
    let root_path = escape_html(&hierarchy.root_path.display().to_string());
    let summary = summary_section(summary);

    Ok(fill_template(
        TEMPLATE,
        &[
            ("ROOT_PATH", root_path.as_str()),
            ("SUMMARY", summary.as_str()),
            ("HIERARCHY_DATA", data.as_str()),
        ],
    ))
}

/// Write the page to `path`.
pub fn export_html(hierarchy: &Hierarchy, path: &Path) -> ExportResult<()> {
    let page = render_html(hierarchy)?;
    fs::write(path, page).map_err(|e| ExportError::io(path, e))?;

    info!(path = %path.display(), "exported HTML");
    Ok(())
}

/// Substitute `{{NAME}}` markers in one pass, so substituted text is never
/// scanned for further markers. Unknown markers are left as they are.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, value)| value.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let replacement = after.find("}}").and_then(|end| {
            let key = &after[..end];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, end + 2))
        });

        match replacement {
            Some((value, consumed)) => {
                out.push_str(value);
                rest = &after[consumed..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Escape text for use in element content or a double- or single-quoted
/// attribute value.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn summary_section(summary: &HierarchySummary) -> String {
    let mut html = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(html, "<h2>Summary Statistics</h2>\n<ul>");
    let _ = writeln!(html, "<li>Total Files: {}</li>", summary.total_files);
    let _ = writeln!(html, "<li>Total Directories: {}</li>", summary.total_directories);
    let _ = writeln!(html, "<li>Total Size: {}</li>", format_size(summary.total_size, BINARY));

    push_list(
        &mut html,
        "Disk Usage by Extension",
        summary
            .disk_usage_by_extension
            .iter()
            .map(|(ext, bytes)| (extension_label(ext), *bytes)),
    );
    push_list(
        &mut html,
        "Most Used Extensions",
        summary
            .most_used_extensions
            .iter()
            .map(|u| (extension_label(&u.extension), u.bytes)),
    );
    push_list(
        &mut html,
        "Least Used Extensions",
        summary
            .least_used_extensions
            .iter()
            .map(|u| (extension_label(&u.extension), u.bytes)),
    );
    push_list(&mut html, "Largest Files", sized(&summary.largest_files));
    push_list(&mut html, "Largest Folders", sized(&summary.largest_folders));

    let _ = writeln!(html, "<li>Empty Directories: {}</li>", summary.empty_directories.len());
    let _ = writeln!(html, "<li>Zero-Byte Files: {}</li>", summary.zero_byte_files.len());
    html.push_str("</ul>");
    html
}

fn sized(entries: &[SizedPath]) -> impl Iterator<Item = (String, u64)> + '_ {
    entries.iter().map(|e| (e.path.clone(), e.size))
}

fn extension_label(ext: &str) -> String {
    if ext.is_empty() {
        "(none)".to_string()
    } else {
        ext.to_string()
    }
}

fn push_list(html: &mut String, title: &str, items: impl Iterator<Item = (String, u64)>) {
    let _ = writeln!(html, "<li>{title}:<ul>");
    for (label, bytes) in items {
        let _ = writeln!(
            html,
            "<li>{}: {}</li>",
            escape_html(&label),
            format_size(bytes, BINARY)
        );
    }
    html.push_str("</ul></li>\n");
}
