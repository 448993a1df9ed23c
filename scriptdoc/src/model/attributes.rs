//! Kind-specific paragraph metadata

use super::scene_number::SceneNumber;
use serde::{Deserialize, Serialize};

/// Revision mark attached to a changed paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMark {
    /// Revision pass (1 = first revision)
    pub level: u8,
    /// Revision colour name or `#RRGGBB`
    pub color: Option<String>,
}

/// Paragraph metadata
///
/// Only a subset applies to any given kind; the rest stay at their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphAttributes {
    /// Locked scene number; pagination never renumbers a locked scene
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_lock: Option<SceneNumber>,

    /// Exclude this scene from numbering
    #[serde(default)]
    pub skip_numbering: bool,

    /// Story day tag (e.g. "DAY 3")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_day: Option<String>,

    /// Colour tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Revision mark
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<RevisionMark>,

    /// Character cue continues the same speaker after an interruption
    #[serde(default)]
    pub continued: bool,

    /// Character cue is the second half of a dual dialogue block
    #[serde(default)]
    pub dual_dialogue: bool,

    /// Force a page break before this paragraph
    #[serde(default)]
    pub page_break_before: bool,

    /// Centered action
    #[serde(default)]
    pub centered: bool,
}

impl ParagraphAttributes {
    /// Whether the scene number is locked
    pub fn is_locked(&self) -> bool {
        self.number_lock.is_some()
    }
}
