//! Error types for template loading and rule resolution

use crate::model::{ParagraphKind, WritingForm};
use std::path::PathBuf;
use thiserror::Error;

/// Template loading and lookup failures
///
/// Template errors fail closed: a missing rule is never replaced with a
/// made-up style.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Template '{template}' has no style rule for {kind}")]
    MissingRule {
        template: String,
        kind: ParagraphKind,
    },

    #[error("Template '{name}' uses schema version {version}; this build supports versions 1 to {supported}")]
    UnsupportedVersion {
        name: String,
        version: u32,
        supported: u32,
    },

    #[error("Template '{template}' defines a rule for '{slug}', which is not a {form} paragraph kind")]
    UnknownKind {
        template: String,
        form: WritingForm,
        slug: String,
    },

    #[error("Failed to parse template '{name}': {message}")]
    Parse { name: String, message: String },

    #[error("Template '{template}' is a {found} template, expected {expected}")]
    FormMismatch {
        template: String,
        expected: WritingForm,
        found: WritingForm,
    },

    #[error("Unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("Template name '{0}' is reserved for a built-in template")]
    ReservedName(String),

    #[error("Failed to access template file {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to serialize template '{name}': {message}")]
    Serialize { name: String, message: String },
}
