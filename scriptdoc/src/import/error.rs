//! Error types for importers

use crate::model::ModelError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an import
///
/// Recoverable damage inside a readable file never produces one of these;
/// it degrades to unformatted paragraphs instead.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Office container could not be opened as a zip archive
    #[error("Cannot open archive: {message}")]
    ArchiveOpen { message: String },

    /// Project database could not be opened or queried
    #[error("Cannot open project container: {message}")]
    ContainerOpen { message: String },

    /// Archive or container lacks a required part
    #[error("Missing part '{part}'")]
    MissingPart { part: String },

    #[error("Import cancelled")]
    Cancelled,

    /// Format could not be recognised
    #[error("Unrecognised input format: {0}")]
    UnknownFormat(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed spreadsheet: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<zip::result::ZipError> for ImportError {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::FileNotFound => ImportError::MissingPart {
                part: "archive member".to_string(),
            },
            other => ImportError::ArchiveOpen {
                message: other.to_string(),
            },
        }
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => ImportError::MissingPart {
                part: "scenario".to_string(),
            },
            other => ImportError::ContainerOpen {
                message: other.to_string(),
            },
        }
    }
}
