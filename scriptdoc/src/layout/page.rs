//! Layout data: pages, fragments, scenes

use super::numbering::Numbering;
use crate::model::{ParagraphKind, SceneNumber};
use crate::template::Alignment;
use std::ops::Range;
use std::sync::Arc;

/// What a fragment prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentRole {
    /// Lines of a paragraph
    Text,
    /// `(MORE)` below dialogue broken across pages
    More,
    /// `NAME (CONT'D)` above the rest of broken dialogue
    ContinuedCue,
}

/// Part of a paragraph placed on one page
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Reading-order index of the paragraph
    pub paragraph: usize,
    pub kind: ParagraphKind,
    pub role: FragmentRole,
    /// Index of the first line within the paragraph's wrapped lines
    pub first_line: usize,
    pub lines: Vec<String>,
    /// Left edge relative to the printable area, in points
    pub x: f32,
    /// Top edge relative to the printable area, in points
    pub y: f32,
    pub width: f32,
    pub line_height: f32,
    pub align: Alignment,
}

impl Fragment {
    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }

    /// Whether the paragraph started on an earlier page
    pub fn is_continuation(&self) -> bool {
        self.role == FragmentRole::Text && self.first_line > 0
    }
}

/// One laid-out page
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number
    pub number: usize,
    pub fragments: Vec<Fragment>,
    /// Height used, in points
    pub used: f32,
}

impl Page {
    /// Text fragments only, skipping markers
    pub fn text_fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments
            .iter()
            .filter(|f| f.role == FragmentRole::Text)
    }
}

/// Where a paragraph landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// 0-based index of the page holding the first line
    pub first_page: usize,
    /// 0-based index of the page holding the last line
    pub last_page: usize,
}

/// Derived data for one scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneInfo {
    /// Index of the scene start paragraph
    pub paragraph: usize,
    /// Paragraphs belonging to the scene
    pub range: Range<usize>,
    pub heading: String,
    pub number: Option<SceneNumber>,
    /// 1-based page numbers
    pub first_page: usize,
    pub last_page: usize,
    /// Estimated duration in seconds
    pub duration: f64,
}

/// Page-accurate layout of a document revision under a template
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Document revision this layout was computed from
    pub revision: u64,
    pub template: String,
    pub pages: Vec<Arc<Page>>,
    /// One entry per paragraph
    pub placements: Vec<Placement>,
    pub numbering: Numbering,
    pub scenes: Vec<SceneInfo>,
    /// Estimated duration of the whole document in seconds
    pub duration: f64,
}

impl Layout {
    /// Layout with no pages, published before the first pass
    pub fn empty() -> Self {
        Self {
            revision: 0,
            template: String::new(),
            pages: Vec::new(),
            placements: Vec::new(),
            numbering: Numbering::default(),
            scenes: Vec::new(),
            duration: 0.0,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// 1-based page number where a paragraph starts
    pub fn page_of(&self, paragraph: usize) -> Option<usize> {
        self.placements.get(paragraph).map(|p| p.first_page + 1)
    }

    /// Scene containing a paragraph
    pub fn scene_of(&self, paragraph: usize) -> Option<&SceneInfo> {
        self.scenes.iter().find(|s| s.range.contains(&paragraph))
    }

    /// Scene number assigned to a scene start paragraph
    pub fn scene_number(&self, paragraph: usize) -> Option<SceneNumber> {
        self.numbering.scenes.get(&paragraph).copied()
    }
}
