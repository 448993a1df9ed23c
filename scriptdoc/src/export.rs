//! Format exporters
//!
//! An exporter encodes a [`Document`] through its [`Template`] and the
//! current [`Layout`] into the bytes of one target format. What goes into
//! the output is decided once by [`ExportJob`] (title page, synopses,
//! notes, scene subset, highlighted speakers, revision marks) so every
//! format applies the options the same way.

pub mod destination;
pub mod docx;
pub mod error;
pub mod fdx;
pub mod fountain;
pub mod json;
pub mod legacy;
pub mod markdown;
pub mod report;
pub mod text;

pub use destination::{check_destination, write_destination};
pub use error::ExportError;
pub use report::{write_report, ReportFormat};

use crate::cancel::CancelToken;
use crate::corrector::character_name;
use crate::layout::Layout;
use crate::model::{
    Document, KindRole, Node, Paragraph, RevisionMark, SceneNumber, StructuralGroup,
};
use crate::template::Template;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Target formats produced by the exporters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Fountain,
    Fdx,
    /// Scenario XML of the legacy project format
    Scenario,
    /// Legacy project database
    Project,
    Docx,
    /// Paginated plain text
    Text,
    Markdown,
    /// Print-ready page description
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 8] = [
        ExportFormat::Fountain,
        ExportFormat::Fdx,
        ExportFormat::Scenario,
        ExportFormat::Project,
        ExportFormat::Docx,
        ExportFormat::Text,
        ExportFormat::Markdown,
        ExportFormat::Json,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ExportFormat::Fountain => "fountain",
            ExportFormat::Fdx => "fdx",
            ExportFormat::Scenario => "scenario",
            ExportFormat::Project => "project",
            ExportFormat::Docx => "docx",
            ExportFormat::Text => "text",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Json => "json",
        }
    }

    /// File extension written for this format
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Fountain => "fountain",
            ExportFormat::Fdx => "fdx",
            ExportFormat::Scenario => "xml",
            ExportFormat::Project => "kitsp",
            ExportFormat::Docx => "docx",
            ExportFormat::Text => "txt",
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.slug() == slug || f.extension() == slug)
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "markdown" => Some(ExportFormat::Markdown),
            "spmd" => Some(ExportFormat::Fountain),
            _ => Self::ALL.into_iter().find(|f| f.extension() == ext),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// What to include in an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Write the title page
    pub title_page: bool,
    /// Include synopsis paragraphs
    pub synopsis: bool,
    /// Include inline notes
    pub notes: bool,
    /// Speakers whose cues and speech are highlighted
    pub highlight: Vec<String>,
    /// 1-based positions of the scenes to export; all when unset
    pub scenes: Option<Vec<usize>>,
    /// Carry revision marks into the output
    pub revision_marks: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title_page: true,
            synopsis: true,
            notes: true,
            highlight: Vec::new(),
            scenes: None,
            revision_marks: false,
        }
    }
}

/// Document order walk of the structure tree
#[derive(Debug, Clone, Copy)]
pub enum Item<'a> {
    Open {
        group: &'a StructuralGroup,
        depth: usize,
    },
    Close {
        group: &'a StructuralGroup,
        depth: usize,
    },
    Paragraph {
        index: usize,
        paragraph: &'a Paragraph,
    },
}

fn walk<'a>(nodes: &'a [Node], depth: usize, index: &mut usize, out: &mut Vec<Item<'a>>) {
    for node in nodes {
        match node {
            Node::Paragraph(paragraph) => {
                out.push(Item::Paragraph {
                    index: *index,
                    paragraph,
                });
                *index += 1;
            }
            Node::Group(group) => {
                out.push(Item::Open { group, depth });
                walk(&group.children, depth + 1, index, out);
                out.push(Item::Close { group, depth });
            }
        }
    }
}

/// One export: the inputs plus the per-paragraph decisions of the options
pub struct ExportJob<'a> {
    pub document: &'a Document,
    pub template: &'a Template,
    pub layout: &'a Layout,
    pub options: &'a ExportOptions,
    included: Vec<bool>,
    highlighted: Vec<bool>,
}

impl<'a> ExportJob<'a> {
    pub fn new(
        document: &'a Document,
        template: &'a Template,
        layout: &'a Layout,
        options: &'a ExportOptions,
    ) -> Self {
        if layout.revision != document.revision() || layout.placements.len() != document.len() {
            log::warn!(
                "Exporting with a layout of revision {} for document revision {}",
                layout.revision,
                document.revision()
            );
        }
        Self {
            document,
            template,
            layout,
            options,
            included: included(document, options),
            highlighted: highlighted(document, &options.highlight),
        }
    }

    /// Whether the options keep paragraph `index`
    pub fn includes(&self, index: usize) -> bool {
        self.included.get(index).copied().unwrap_or(false)
    }

    /// Whether paragraph `index` belongs to a highlighted speaker
    pub fn is_highlighted(&self, index: usize) -> bool {
        self.highlighted.get(index).copied().unwrap_or(false)
    }

    /// Revision mark of a paragraph, when marks are exported
    pub fn revision(&self, paragraph: &'a Paragraph) -> Option<&'a RevisionMark> {
        if self.options.revision_marks {
            paragraph.attributes.revision.as_ref()
        } else {
            None
        }
    }

    pub fn scene_number(&self, index: usize) -> Option<SceneNumber> {
        self.layout.scene_number(index)
    }

    /// Whether the title page should be written
    pub fn title_page(&self) -> bool {
        self.options.title_page && !self.document.title_page.is_empty()
    }

    /// Included paragraphs in reading order
    pub fn paragraphs(&self) -> impl Iterator<Item = (usize, &'a Paragraph)> + '_ {
        self.document
            .paragraphs()
            .enumerate()
            .filter(|(i, _)| self.includes(*i))
    }

    /// Structure walk with excluded paragraphs removed
    pub fn items(&self) -> Vec<Item<'a>> {
        let mut out = Vec::new();
        walk(self.document.nodes(), 0, &mut 0, &mut out);
        out.retain(|item| match item {
            Item::Paragraph { index, .. } => self.includes(*index),
            _ => true,
        });
        out
    }

    /// Fail if the export was cancelled
    pub fn check(&self, cancel: &CancelToken) -> Result<(), ExportError> {
        if cancel.is_cancelled() {
            log::info!("Export cancelled");
            return Err(ExportError::Cancelled);
        }
        Ok(())
    }
}

fn included(document: &Document, options: &ExportOptions) -> Vec<bool> {
    let wanted: Option<BTreeSet<usize>> = options
        .scenes
        .as_ref()
        .map(|scenes| scenes.iter().copied().collect());
    let mut scene = 0;
    document
        .paragraphs()
        .map(|p| {
            if p.kind().is_scene_start() {
                scene += 1;
            }
            let in_subset = wanted.as_ref().map_or(true, |w| w.contains(&scene));
            let role_kept = match p.kind().role() {
                KindRole::Synopsis => options.synopsis,
                KindRole::Note => options.notes,
                _ => true,
            };
            in_subset && role_kept
        })
        .collect()
}

fn highlighted(document: &Document, names: &[String]) -> Vec<bool> {
    let names: BTreeSet<String> = names.iter().map(|n| character_name(n)).collect();
    let mut speaking = false;
    document
        .paragraphs()
        .map(|p| {
            let kind = p.kind();
            if kind.role() == KindRole::Character {
                speaking = names.contains(&character_name(&p.text()));
            } else if !kind.is_spoken() && kind.role() != KindRole::Parenthetical {
                speaking = false;
            }
            speaking
        })
        .collect()
}

/// A format encoder
pub trait Exporter: Send + Sync {
    /// Format this exporter writes
    fn format(&self) -> ExportFormat;

    /// Encode, checking `cancel` between paragraphs
    fn export_with(&self, job: &ExportJob<'_>, cancel: &CancelToken) -> Result<Vec<u8>, ExportError>;

    /// Encode without cancellation
    fn export(&self, job: &ExportJob<'_>) -> Result<Vec<u8>, ExportError> {
        self.export_with(job, &CancelToken::new())
    }
}

/// Exporter for a format
pub fn exporter_for(format: ExportFormat) -> Box<dyn Exporter> {
    match format {
        ExportFormat::Fountain => Box::new(fountain::FountainExporter),
        ExportFormat::Fdx => Box::new(fdx::FdxExporter),
        ExportFormat::Scenario => Box::new(legacy::ScenarioExporter),
        ExportFormat::Project => Box::new(legacy::ProjectExporter),
        ExportFormat::Docx => Box::new(docx::DocxExporter),
        ExportFormat::Text => Box::new(text::TextExporter),
        ExportFormat::Markdown => Box::new(markdown::MarkdownExporter),
        ExportFormat::Json => Box::new(json::JsonExporter),
    }
}

/// Export to a file, choosing the format from the extension unless given
///
/// The destination is checked before anything is encoded and nothing is
/// created besides the file itself.
pub fn export_file(
    path: &Path,
    format: Option<ExportFormat>,
    job: &ExportJob<'_>,
    cancel: &CancelToken,
) -> Result<(), ExportError> {
    let format = format
        .or_else(|| ExportFormat::from_extension(path))
        .ok_or_else(|| ExportError::Encode {
            format: "export",
            message: format!("cannot tell the format of {}", path.display()),
        })?;
    check_destination(path)?;
    log::info!("Exporting {} as {}", path.display(), format);
    let bytes = exporter_for(format).export_with(job, cancel)?;
    write_destination(path, &bytes)?;
    log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::layout::PaginationEngine;
    use crate::model::{DocumentBuilder, GroupKind, ParagraphKind, ScreenplayKind, WritingForm};
    use crate::template::builtin;
    use std::sync::Arc;

    pub(crate) fn sp(kind: ScreenplayKind, text: &str) -> Paragraph {
        Paragraph::new(ParagraphKind::Screenplay(kind), text)
    }

    /// Two scenes in an act, with a synopsis, a note and two speakers
    pub(crate) fn sample() -> Document {
        let mut builder = DocumentBuilder::new(WritingForm::Screenplay);
        builder.title_page_mut().set("Title", "Harbour Lights");
        builder.title_page_mut().set("Author", "J. Doe");
        builder.open_group(GroupKind::Act, "Act One");
        let paragraphs = [
            sp(ScreenplayKind::SceneHeading, "EXT. HARBOUR - NIGHT"),
            sp(ScreenplayKind::Synopsis, "Marta waits for the boat."),
            sp(ScreenplayKind::Action, "Fog rolls over the pier."),
            sp(ScreenplayKind::Character, "MARTA"),
            sp(ScreenplayKind::Parenthetical, "(quietly)"),
            sp(ScreenplayKind::Dialogue, "He is late."),
            sp(ScreenplayKind::InlineNote, "Check the tide tables."),
            sp(ScreenplayKind::SceneHeading, "INT. BOAT - NIGHT"),
            sp(ScreenplayKind::Character, "LEO"),
            sp(ScreenplayKind::Dialogue, "Almost there."),
            sp(ScreenplayKind::Transition, "CUT TO:"),
        ];
        for p in paragraphs {
            builder.push(p).unwrap();
        }
        builder.close_group();
        builder.build()
    }

    pub(crate) fn fixture() -> (Document, Arc<Template>, Arc<Layout>) {
        let document = sample();
        let template = builtin::fallback(WritingForm::Screenplay).unwrap();
        let mut engine = PaginationEngine::new(Arc::clone(&template));
        let layout = engine.relayout(&document).unwrap();
        (document, template, layout)
    }

    #[test]
    fn test_options_filter_paragraphs() {
        let (document, template, layout) = fixture();
        let options = ExportOptions {
            synopsis: false,
            notes: false,
            scenes: Some(vec![2]),
            ..ExportOptions::default()
        };
        let job = ExportJob::new(&document, &template, &layout, &options);
        let kept: Vec<usize> = job.paragraphs().map(|(i, _)| i).collect();
        assert_eq!(kept, [7, 8, 9, 10]);
    }

    #[test]
    fn test_highlight_follows_speaker() {
        let (document, template, layout) = fixture();
        let options = ExportOptions {
            highlight: vec!["marta".to_string()],
            ..ExportOptions::default()
        };
        let job = ExportJob::new(&document, &template, &layout, &options);
        let marked: Vec<usize> = (0..document.len()).filter(|i| job.is_highlighted(*i)).collect();
        assert_eq!(marked, [3, 4, 5]);
    }

    #[test]
    fn test_items_keep_structure() {
        let (document, template, layout) = fixture();
        let options = ExportOptions::default();
        let job = ExportJob::new(&document, &template, &layout, &options);
        let items = job.items();
        assert!(matches!(items.first(), Some(Item::Open { depth: 0, .. })));
        assert!(matches!(items.last(), Some(Item::Close { depth: 0, .. })));
        assert_eq!(items.len(), document.len() + 2);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ExportFormat::from_extension(Path::new("out/script.FDX")),
            Some(ExportFormat::Fdx)
        );
        assert_eq!(ExportFormat::from_slug("txt"), Some(ExportFormat::Text));
        assert_eq!(ExportFormat::from_extension(Path::new("script")), None);
    }
}
