//! Error types for layout passes

use crate::template::TemplateError;
use thiserror::Error;

/// A relayout pass failed
///
/// Layout errors are recoverable: the engine keeps the last good layout and
/// stays dirty so the next pass retries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// Margins or indents leave no room for text
    #[error("Template '{template}' leaves no printable area ({width}pt x {height}pt)")]
    NoPrintableArea {
        template: String,
        width: f32,
        height: f32,
    },

    /// A paragraph measured to a negative height
    #[error("Paragraph {paragraph} has a negative computed height ({height}pt)")]
    NegativeHeight { paragraph: usize, height: f32 },

    /// The template could not style a paragraph
    #[error(transparent)]
    Template(#[from] TemplateError),
}
