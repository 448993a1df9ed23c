//! Numbering and duration settings carried by a template

use crate::model::WritingForm;
use serde::{Deserialize, Serialize};

/// Where scene numbers are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberPosition {
    Left,
    Right,
    #[default]
    Both,
}

/// Scene, dialogue and page numbering conventions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NumberingConfig {
    pub scene_numbers: bool,
    pub scene_number_position: NumberPosition,
    pub dialogue_numbers: bool,
    /// Add the continuation marker to a cue when the same character resumes
    pub auto_continued: bool,
    pub continued_text: String,
    pub more_text: String,
    pub page_numbers: bool,
    /// Print the number on the first page too
    pub first_page_number: bool,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            scene_numbers: true,
            scene_number_position: NumberPosition::Both,
            dialogue_numbers: false,
            auto_continued: true,
            continued_text: "CONT'D".to_string(),
            more_text: "(MORE)".to_string(),
            page_numbers: true,
            first_page_number: false,
        }
    }
}

impl NumberingConfig {
    /// Conventional numbering for a writing form
    pub fn for_form(form: WritingForm) -> Self {
        match form {
            WritingForm::Screenplay | WritingForm::Stageplay | WritingForm::Comicbook => {
                Self::default()
            }
            WritingForm::Audioplay => Self {
                dialogue_numbers: true,
                ..Self::default()
            },
            WritingForm::Novel => Self {
                scene_numbers: false,
                auto_continued: false,
                ..Self::default()
            },
        }
    }

    /// The continuation marker as printed after a cue, e.g. `(CONT'D)`
    pub fn continued_marker(&self) -> String {
        format!("({})", self.continued_text)
    }
}

/// Fixed duration per printed page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageRate {
    pub seconds_per_page: f64,
}

/// Duration from reading speed in words
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WordRate {
    pub words_per_minute: f64,
}

/// Duration from reading speed in characters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CharacterRate {
    pub characters_per_second: f64,
    #[serde(default)]
    pub count_spaces: bool,
}

/// Per-role multipliers applied to each method's estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DurationWeights {
    /// Seconds added for every scene heading
    pub heading_seconds: f64,
    pub action: f64,
    pub dialogue: f64,
    pub lyrics: f64,
    pub other: f64,
}

impl Default for DurationWeights {
    fn default() -> Self {
        Self {
            heading_seconds: 0.0,
            action: 1.0,
            dialogue: 1.0,
            lyrics: 1.0,
            other: 1.0,
        }
    }
}

/// Relative weight of each method when more than one is enabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlendWeights {
    pub page: f64,
    pub word: f64,
    pub character: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            page: 1.0,
            word: 1.0,
            character: 1.0,
        }
    }
}

/// Duration estimation settings
///
/// A method missing from a file is disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DurationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<PageRate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_word: Option<WordRate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_character: Option<CharacterRate>,
    #[serde(default)]
    pub weights: DurationWeights,
    #[serde(default)]
    pub blend: BlendWeights,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            per_page: Some(PageRate {
                seconds_per_page: 60.0,
            }),
            per_word: None,
            per_character: None,
            weights: DurationWeights::default(),
            blend: BlendWeights::default(),
        }
    }
}

impl DurationConfig {
    /// Conventional estimate for a writing form
    ///
    /// Scripts use the page-a-minute rule; prose uses reading speed.
    pub fn for_form(form: WritingForm) -> Self {
        match form {
            WritingForm::Novel => Self {
                per_page: None,
                per_word: Some(WordRate {
                    words_per_minute: 250.0,
                }),
                ..Self::default()
            },
            WritingForm::Audioplay => Self {
                per_page: None,
                per_word: Some(WordRate {
                    words_per_minute: 150.0,
                }),
                weights: DurationWeights {
                    heading_seconds: 2.0,
                    ..DurationWeights::default()
                },
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    /// Whether any estimation method is enabled
    pub fn is_enabled(&self) -> bool {
        self.per_page.is_some() || self.per_word.is_some() || self.per_character.is_some()
    }
}
