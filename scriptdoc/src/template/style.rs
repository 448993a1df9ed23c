//! Page geometry and per-kind style rules

use serde::{Deserialize, Serialize};

/// Points per inch
pub const POINTS_PER_INCH: f32 = 72.0;

/// Page size and margins, in points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    /// Left column share for two-column layouts (audio/visual scripts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_ratio: Option<f32>,
}

impl PageGeometry {
    /// US Letter with screenplay margins (1.5" binding edge)
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin_top: 72.0,
            margin_bottom: 72.0,
            margin_left: 108.0,
            margin_right: 72.0,
            split_ratio: None,
        }
    }

    /// ISO A4 with the same margins as [`PageGeometry::letter`]
    pub fn a4() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            ..Self::letter()
        }
    }

    /// Width available between the margins
    pub fn printable_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Height available between the margins
    pub fn printable_height(&self) -> f32 {
        self.height - self.margin_top - self.margin_bottom
    }
}

/// Case transform applied to a paragraph's text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseTransform {
    #[default]
    None,
    Upper,
    Lower,
}

impl CaseTransform {
    /// Apply the transform
    pub fn apply(self, text: &str) -> String {
        match self {
            CaseTransform::None => text.to_string(),
            CaseTransform::Upper => text.to_uppercase(),
            CaseTransform::Lower => text.to_lowercase(),
        }
    }
}

/// Horizontal alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Style rule governing one paragraph kind
///
/// Indents are in points from the printable area's edges; vertical spacing
/// is in lines of the rule's own line height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleRule {
    pub font_family: String,
    pub font_size: f32,
    pub case: CaseTransform,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub align: Alignment,
    pub left_indent: f32,
    pub right_indent: f32,
    pub space_before: f32,
    pub space_after: f32,
    pub line_spacing: f32,
    pub page_break_before: bool,
}

impl Default for StyleRule {
    fn default() -> Self {
        Self {
            font_family: "Courier Prime".to_string(),
            font_size: 12.0,
            case: CaseTransform::None,
            bold: false,
            italic: false,
            underline: false,
            color: None,
            align: Alignment::Left,
            left_indent: 0.0,
            right_indent: 0.0,
            space_before: 0.0,
            space_after: 0.0,
            line_spacing: 1.0,
            page_break_before: false,
        }
    }
}

impl StyleRule {
    /// Height of one line in points
    pub fn line_height(&self) -> f32 {
        self.font_size * self.line_spacing
    }

    /// Text column width given the page geometry
    pub fn column_width(&self, page: &PageGeometry) -> f32 {
        page.printable_width() - self.left_indent - self.right_indent
    }
}
