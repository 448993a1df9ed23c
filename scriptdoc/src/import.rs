//! Format importers
//!
//! Every importer turns the bytes of one source grammar into a
//! [`Document`]. Typed sources (Fountain, FDX, scenario XML, styled DOCX)
//! map their own paragraph types; untyped text goes through the
//! [`classify`] state machine. Fragments that cannot be parsed become
//! visible unformatted paragraphs and are logged; only an unreadable
//! container aborts the import.

pub mod cast;
pub mod classify;
pub mod docx;
pub mod error;
pub mod fdx;
pub mod fountain;
pub mod legacy;
pub mod markdown;
pub mod plain;

pub use cast::{import_cast, CastFormat};
pub use error::ImportError;

use crate::cancel::CancelToken;
use crate::model::{
    CastMember, Document, DocumentBuilder, GroupKind, Paragraph, TitlePage, WritingForm,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Source formats understood by the importers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    /// Fountain screenplay markup
    Fountain,
    /// Final Draft XML
    Fdx,
    /// Scenario XML of the legacy project format
    Scenario,
    /// Legacy project database holding scenario XML
    Project,
    /// Word-processor document
    Docx,
    /// Untyped plain text
    Text,
    /// Markdown manuscript
    Markdown,
}

const SQLITE_MAGIC: &[u8] = b"SQLite format 3\0";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

impl ImportFormat {
    pub const ALL: [ImportFormat; 7] = [
        ImportFormat::Fountain,
        ImportFormat::Fdx,
        ImportFormat::Scenario,
        ImportFormat::Project,
        ImportFormat::Docx,
        ImportFormat::Text,
        ImportFormat::Markdown,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ImportFormat::Fountain => "fountain",
            ImportFormat::Fdx => "fdx",
            ImportFormat::Scenario => "scenario",
            ImportFormat::Project => "project",
            ImportFormat::Docx => "docx",
            ImportFormat::Text => "text",
            ImportFormat::Markdown => "markdown",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.slug() == slug || f.extensions().contains(&slug.as_str()))
    }

    /// File extensions mapped to this format
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ImportFormat::Fountain => &["fountain", "spmd"],
            ImportFormat::Fdx => &["fdx"],
            ImportFormat::Scenario => &["xml"],
            ImportFormat::Project => &["kitsp", "db", "sqlite"],
            ImportFormat::Docx => &["docx"],
            ImportFormat::Text => &["txt"],
            ImportFormat::Markdown => &["md", "markdown"],
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extensions().contains(&ext.as_str()))
    }

    /// Guess the format from the leading bytes, then the extension
    pub fn detect(path: Option<&Path>, bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(SQLITE_MAGIC) {
            return Some(ImportFormat::Project);
        }
        if bytes.starts_with(ZIP_MAGIC) {
            return Some(ImportFormat::Docx);
        }
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
        if head.contains("<FinalDraft") {
            return Some(ImportFormat::Fdx);
        }
        if head.contains("<scenario") {
            return Some(ImportFormat::Scenario);
        }
        path.and_then(Self::from_extension)
    }
}

impl std::fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// Options shared by importers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Writing form for sources that do not declare one
    pub form: Option<WritingForm>,
}

impl ImportOptions {
    pub fn with_form(form: WritingForm) -> Self {
        Self { form: Some(form) }
    }
}

/// A parser for one source grammar
pub trait Importer: Send + Sync {
    /// Format this importer reads
    fn format(&self) -> ImportFormat;

    /// Parse, checking `cancel` between paragraphs
    fn parse_with(&self, bytes: &[u8], cancel: &CancelToken) -> Result<Document, ImportError>;

    /// Parse without cancellation
    fn parse(&self, bytes: &[u8]) -> Result<Document, ImportError> {
        self.parse_with(bytes, &CancelToken::new())
    }
}

/// Importer for a format
pub fn importer_for(format: ImportFormat, options: &ImportOptions) -> Box<dyn Importer> {
    match format {
        ImportFormat::Fountain => Box::new(fountain::FountainImporter),
        ImportFormat::Fdx => Box::new(fdx::FdxImporter),
        ImportFormat::Scenario => Box::new(legacy::ScenarioImporter::new(options.form)),
        ImportFormat::Project => Box::new(legacy::ProjectImporter::new(options.form)),
        ImportFormat::Docx => Box::new(docx::DocxImporter::new(options.form)),
        ImportFormat::Text => Box::new(plain::PlainTextImporter::new(
            options.form.unwrap_or(WritingForm::Screenplay),
        )),
        ImportFormat::Markdown => Box::new(markdown::MarkdownImporter),
    }
}

/// Read and import a file, detecting its format unless one is given
pub fn import_file(
    path: &Path,
    format: Option<ImportFormat>,
    options: &ImportOptions,
    cancel: &CancelToken,
) -> Result<Document, ImportError> {
    let bytes = fs::read(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = format
        .or_else(|| ImportFormat::detect(Some(path), &bytes))
        .ok_or_else(|| ImportError::UnknownFormat(path.display().to_string()))?;
    log::info!("Importing {} as {}", path.display(), format);
    importer_for(format, options).parse_with(&bytes, cancel)
}

/// Decode text input, replacing invalid sequences
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes);
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Document builder that checks cancellation and counts degradations
pub(crate) struct Sink<'a> {
    builder: DocumentBuilder,
    cancel: &'a CancelToken,
    format: ImportFormat,
    paragraphs: usize,
    unformatted: usize,
}

impl<'a> Sink<'a> {
    pub(crate) fn new(form: WritingForm, format: ImportFormat, cancel: &'a CancelToken) -> Self {
        Self {
            builder: DocumentBuilder::new(form),
            cancel,
            format,
            paragraphs: 0,
            unformatted: 0,
        }
    }

    pub(crate) fn form(&self) -> WritingForm {
        self.builder.form()
    }

    pub(crate) fn check(&self) -> Result<(), ImportError> {
        if self.cancel.is_cancelled() {
            log::info!("{} import cancelled after {} paragraphs", self.format, self.paragraphs);
            return Err(ImportError::Cancelled);
        }
        Ok(())
    }

    pub(crate) fn push(&mut self, paragraph: Paragraph) -> Result<(), ImportError> {
        self.check()?;
        if paragraph.kind().is_unformatted() {
            self.unformatted += 1;
        }
        self.builder.push(paragraph)?;
        self.paragraphs += 1;
        Ok(())
    }

    /// Keep text that could not be parsed as a visible unformatted paragraph
    pub(crate) fn push_unformatted(
        &mut self,
        text: impl Into<String>,
        reason: &str,
    ) -> Result<(), ImportError> {
        let text = text.into();
        log::warn!("{}: kept as unformatted text ({}): {:?}", self.format, reason, text);
        let kind = self.builder.form().unformatted();
        self.push(Paragraph::new(kind, text))
    }

    pub(crate) fn open_group(&mut self, kind: GroupKind, title: impl Into<String>) {
        self.builder.open_group(kind, title);
    }

    pub(crate) fn close_group(&mut self) {
        self.builder.close_group();
    }

    pub(crate) fn depth(&self) -> usize {
        self.builder.depth()
    }

    pub(crate) fn title_page_mut(&mut self) -> &mut TitlePage {
        self.builder.title_page_mut()
    }

    pub(crate) fn add_cast_member(&mut self, member: CastMember) {
        self.builder.add_cast_member(member);
    }

    pub(crate) fn finish(self) -> Document {
        log::info!(
            "{} import produced {} paragraphs ({} unformatted)",
            self.format,
            self.paragraphs,
            self.unformatted
        );
        self.builder.build()
    }
}
