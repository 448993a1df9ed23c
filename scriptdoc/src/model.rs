//! Paragraph model
//!
//! Pure data describing a writing-form document: typed paragraphs made of
//! styled runs, grouped by structural nodes. No I/O happens here.

mod attributes;
mod document;
mod error;
mod kind;
mod paragraph;
mod scene_number;
mod text_run;

pub use attributes::{ParagraphAttributes, RevisionMark};
pub use document::{
    CastMember, Document, DocumentBuilder, EditRange, GroupKind, Node, ParagraphIter,
    StructuralGroup, TitleEntry, TitlePage,
};
pub use error::ModelError;
pub use kind::{
    AudioplayKind, ComicKind, KindRole, NovelKind, ParagraphKind, ScreenplayKind, StageplayKind,
    WritingForm,
};
pub use paragraph::Paragraph;
pub use scene_number::SceneNumber;
pub use text_run::{normalize_runs, runs_text, split_runs, TextFormatting, TextRun};
