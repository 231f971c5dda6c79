//! Export error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while exporting a hierarchy.
///
/// An export failure leaves the hierarchy itself untouched.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Writing the output file failed.
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A parsed document does not have exactly one root entry.
    #[error("Invalid hierarchy document: {message}")]
    InvalidDocument { message: String },
}

impl ExportError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the output path to I/O failures that surfaced through the
    /// JSON or CSV writer.
    pub(crate) fn at_path(self, path: &Path) -> Self {
        match self {
            Self::Json(e) if e.is_io() => Self::io(path, e.into()),
            Self::Csv(e) if e.is_io_error() => {
                let message = e.to_string();
                match e.into_kind() {
                    csv::ErrorKind::Io(source) => Self::io(path, source),
                    _ => Self::io(path, std::io::Error::other(message)),
                }
            }
            other => other,
        }
    }
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;
