//! Styled text runs
//!
//! A text run is a span of text with consistent inline formatting. Paragraph
//! content is always an ordered list of runs, never raw bytes.

use serde::{Deserialize, Serialize};

/// A span of text with consistent formatting
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextRun {
    /// The text content
    pub text: String,

    /// Bold formatting
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,

    /// Italic formatting
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,

    /// Underline formatting
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,

    /// Strikethrough formatting
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,

    /// Text colour as `#RRGGBB`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TextRun {
    /// Create a new plain text run
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Create a new text run with the specified formatting
    pub fn with_formatting(text: impl Into<String>, formatting: &TextFormatting) -> Self {
        Self {
            text: text.into(),
            bold: formatting.bold,
            italic: formatting.italic,
            underline: formatting.underline,
            strikethrough: formatting.strikethrough,
            color: formatting.color.clone(),
        }
    }

    /// Check if this text run has any formatting applied
    pub fn has_formatting(&self) -> bool {
        self.bold || self.italic || self.underline || self.strikethrough || self.color.is_some()
    }

    /// Formatting of this run without its text
    pub fn formatting(&self) -> TextFormatting {
        TextFormatting {
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            strikethrough: self.strikethrough,
            color: self.color.clone(),
        }
    }

    /// Whether two runs carry identical formatting
    pub fn same_formatting(&self, other: &TextRun) -> bool {
        self.bold == other.bold
            && self.italic == other.italic
            && self.underline == other.underline
            && self.strikethrough == other.strikethrough
            && self.color == other.color
    }

    /// Number of characters in the run
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Active formatting state while parsing inline markup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFormatting {
    /// Bold formatting active
    pub bold: bool,

    /// Italic formatting active
    pub italic: bool,

    /// Underline formatting active
    pub underline: bool,

    /// Strikethrough formatting active
    pub strikethrough: bool,

    /// Colour active
    pub color: Option<String>,
}

impl TextFormatting {
    /// Create a new empty formatting state
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if any formatting is active
    pub fn has_formatting(&self) -> bool {
        self.bold || self.italic || self.underline || self.strikethrough || self.color.is_some()
    }
}

/// Drop empty runs and coalesce neighbours with identical formatting
pub fn normalize_runs(runs: Vec<TextRun>) -> Vec<TextRun> {
    let mut result: Vec<TextRun> = Vec::with_capacity(runs.len());
    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        match result.last_mut() {
            Some(last) if last.same_formatting(&run) => last.text.push_str(&run.text),
            _ => result.push(run),
        }
    }
    result
}

/// Concatenated text of a run list
pub fn runs_text(runs: &[TextRun]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

/// Split a run list at a character offset
///
/// The caller guarantees `offset` is within the total length.
pub fn split_runs(runs: &[TextRun], offset: usize) -> (Vec<TextRun>, Vec<TextRun>) {
    let mut head = Vec::new();
    let mut tail = Vec::new();
    let mut remaining = offset;

    for run in runs {
        let len = run.char_len();
        if remaining >= len {
            head.push(run.clone());
            remaining -= len;
        } else if remaining == 0 {
            tail.push(run.clone());
        } else {
            let byte_index = run
                .text
                .char_indices()
                .nth(remaining)
                .map(|(i, _)| i)
                .unwrap_or(run.text.len());
            let mut left = run.clone();
            let mut right = run.clone();
            left.text = run.text[..byte_index].to_string();
            right.text = run.text[byte_index..].to_string();
            head.push(left);
            tail.push(right);
            remaining = 0;
        }
    }

    (normalize_runs(head), normalize_runs(tail))
}
