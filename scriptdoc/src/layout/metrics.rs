//! Font metrics, word wrap and per-paragraph measurement

use super::error::LayoutError;
use crate::model::{KindRole, Paragraph, ParagraphKind};
use crate::template::{Alignment, StyleRule, Template};

/// Average advance per em for known font families
///
/// Monospace faces are exact; proportional faces use a typical average
/// width for running text.
const ADVANCE_TABLE: [(&str, f32); 12] = [
    ("courier", 0.6),
    ("courier new", 0.6),
    ("courier prime", 0.6),
    ("courier final draft", 0.6),
    ("courier screenplay", 0.6),
    ("monospace", 0.6),
    ("times new roman", 0.46),
    ("times", 0.46),
    ("georgia", 0.5),
    ("garamond", 0.44),
    ("arial", 0.52),
    ("helvetica", 0.52),
];

/// Fallback advance for unknown proportional families
const DEFAULT_ADVANCE: f32 = 0.5;

/// Average advance per em of a font family
pub fn advance_ratio(family: &str) -> f32 {
    let family = family.trim().to_lowercase();
    ADVANCE_TABLE
        .iter()
        .find(|(name, _)| *name == family)
        .map(|(_, ratio)| *ratio)
        .unwrap_or(DEFAULT_ADVANCE)
}

/// Average character width in points for a rule
pub fn char_width(rule: &StyleRule) -> f32 {
    rule.font_size * advance_ratio(&rule.font_family)
}

/// Greedy word wrap to at most `max_chars` characters per line
///
/// Explicit newlines start a new line. Words longer than a line are broken.
/// Empty text yields one empty line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    for hard_line in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;
        for word in hard_line.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = if current_len == 0 {
                word.len()
            } else {
                current_len + 1 + word.len()
            };
            if needed > max_chars && current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word.iter());
            current_len += word.len();
        }
        lines.push(current);
    }
    lines
}

/// A paragraph measured against its style rule
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub kind: ParagraphKind,
    /// Wrapped, case-transformed lines as printed
    pub lines: Vec<String>,
    pub line_height: f32,
    /// Space above the paragraph in points; dropped at the top of a page
    pub space_before: f32,
    pub space_after: f32,
    /// Left edge relative to the printable area
    pub x: f32,
    pub width: f32,
    pub align: Alignment,
    /// Whether the paragraph takes part in the printed flow
    pub printable: bool,
    pub page_break_before: bool,
    pub words: usize,
    pub characters: usize,
    pub characters_no_spaces: usize,
}

impl Measurement {
    /// Measure a paragraph
    ///
    /// `index` only identifies the paragraph in errors.
    pub fn measure(
        index: usize,
        paragraph: &Paragraph,
        template: &Template,
        include_non_printing: bool,
    ) -> Result<Self, LayoutError> {
        let kind = paragraph.kind();
        let rule = template.rule(kind)?;

        let line_height = rule.line_height();
        if line_height < 0.0 || rule.space_before < 0.0 || rule.space_after < 0.0 {
            return Err(LayoutError::NegativeHeight {
                paragraph: index,
                height: line_height.min(rule.space_before * line_height),
            });
        }

        let width = rule.column_width(&template.page);
        let advance = char_width(rule);
        if width <= 0.0 || advance <= 0.0 {
            return Err(LayoutError::NoPrintableArea {
                template: template.name().to_string(),
                width,
                height: template.page.printable_height(),
            });
        }

        let mut text = rule.case.apply(&paragraph.text());
        if kind.role() == KindRole::Character && paragraph.attributes.continued {
            text.push(' ');
            text.push_str(&template.numbering.continued_marker());
        }
        // Tolerance keeps 432pt / 7.2pt at 60 columns despite rounding
        let max_chars = (width / advance + 1e-3).floor() as usize;

        let plain = paragraph.text();
        Ok(Self {
            kind,
            lines: wrap_text(&text, max_chars),
            line_height,
            space_before: rule.space_before * line_height,
            space_after: rule.space_after * line_height,
            x: rule.left_indent,
            width,
            align: if paragraph.attributes.centered {
                Alignment::Center
            } else {
                rule.align
            },
            printable: include_non_printing || !kind.is_non_printing(),
            page_break_before: rule.page_break_before || paragraph.attributes.page_break_before,
            words: plain.split_whitespace().count(),
            characters: plain.chars().count(),
            characters_no_spaces: plain.chars().filter(|c| !c.is_whitespace()).count(),
        })
    }

    /// Height of all lines, without spacing
    pub fn text_height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }

    pub fn keeps_with_next(&self) -> bool {
        self.printable && self.kind.keeps_with_next()
    }

    pub fn splittable(&self) -> bool {
        self.kind.splittable()
    }
}
