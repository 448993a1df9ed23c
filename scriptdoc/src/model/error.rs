//! Error types for paragraph and document operations

use super::kind::{ParagraphKind, WritingForm};
use thiserror::Error;

/// Invalid paragraph or document operation
///
/// Model errors are always reported to the caller and never auto-corrected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Merge of two paragraphs whose kinds are not compatible
    #[error("Cannot merge a {first} paragraph with a {second} paragraph")]
    ParagraphKindMismatch {
        /// Kind of the first paragraph
        first: ParagraphKind,
        /// Kind of the second paragraph
        second: ParagraphKind,
    },

    /// Text offset beyond the end of the paragraph
    #[error("Offset {offset} is out of range for a paragraph of {len} characters")]
    OffsetOutOfRange {
        /// Requested offset
        offset: usize,
        /// Paragraph length in characters
        len: usize,
    },

    /// Paragraph index beyond the end of the document
    #[error("Paragraph index {index} is out of range (document has {len} paragraphs)")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of paragraphs in the document
        len: usize,
    },

    /// Paragraph of one writing form placed into a document of another
    #[error("A {expected} document cannot contain {found} paragraphs")]
    FormMismatch {
        /// Form of the document
        expected: WritingForm,
        /// Form of the offending paragraph
        found: WritingForm,
    },
}
