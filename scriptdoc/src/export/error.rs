//! Error types for exporters

use crate::model::WritingForm;
use crate::template::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an export
///
/// Destination problems are reported as distinct variants so the caller
/// can suggest a remedy. Nothing is retried.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Parent directory of the destination does not exist
    #[error("Destination directory does not exist: {path}")]
    DestinationMissing { path: PathBuf },

    /// Destination or its directory is not writable
    #[error("Permission denied writing {path}")]
    PermissionDenied { path: PathBuf },

    /// Another application holds a lock file for the destination
    #[error("{path} is locked by another application (lock file {lock})")]
    Locked { path: PathBuf, lock: PathBuf },

    #[error("Export cancelled")]
    Cancelled,

    /// Target format has no representation for the writing form
    #[error("{format} export does not support {form} documents")]
    UnsupportedForm {
        format: &'static str,
        form: WritingForm,
    },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoder of the target format failed
    #[error("{format} encoding failed: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl From<zip::result::ZipError> for ExportError {
    fn from(e: zip::result::ZipError) -> Self {
        ExportError::Encode {
            format: "zip",
            message: e.to_string(),
        }
    }
}
