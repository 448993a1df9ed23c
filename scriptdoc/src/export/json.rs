//! Print-ready JSON page description
//!
//! Serialises the current layout with absolute positions in points, the
//! resolved style of every fragment and the per-paragraph export decisions,
//! so an external renderer can place each line without knowing templates.

use super::{ExportError, ExportFormat, ExportJob, Exporter};
use crate::cancel::CancelToken;
use crate::layout::{Fragment, FragmentRole};
use crate::template::{Alignment, CaseTransform};
use serde::Serialize;

/// Writes the JSON page description
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

/// Root of the JSON output
#[derive(Debug, Serialize)]
pub struct PrintDocument {
    pub template: String,
    pub form: String,
    pub page: PageSize,
    pub title_page: Vec<TitleLine>,
    pub pages: Vec<PrintPage>,
    pub scenes: Vec<PrintScene>,
    /// Estimated running time in seconds
    pub duration: f64,
}

#[derive(Debug, Serialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    /// Left column share for two-column scripts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_ratio: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct TitleLine {
    pub text: String,
    pub centered: bool,
}

#[derive(Debug, Serialize)]
pub struct PrintPage {
    pub number: usize,
    pub fragments: Vec<PrintFragment>,
}

/// One positioned block of lines
#[derive(Debug, Serialize)]
pub struct PrintFragment {
    pub paragraph: usize,
    pub kind: String,
    pub role: &'static str,
    /// Left edge from the page's left side
    pub x: f32,
    /// Top edge from the page's top
    pub y: f32,
    pub width: f32,
    pub line_height: f32,
    pub align: Alignment,
    pub lines: Vec<String>,
    pub style: PrintStyle,
    pub highlight: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PrintStyle {
    pub font_family: String,
    pub font_size: f32,
    pub case: CaseTransform,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PrintScene {
    pub paragraph: usize,
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    pub first_page: usize,
    pub last_page: usize,
    pub duration: f64,
}

fn role_name(role: FragmentRole) -> &'static str {
    match role {
        FragmentRole::Text => "text",
        FragmentRole::More => "more",
        FragmentRole::ContinuedCue => "continued_cue",
    }
}

impl Exporter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn export_with(&self, job: &ExportJob<'_>, cancel: &CancelToken) -> Result<Vec<u8>, ExportError> {
        let document = print_document(job, cancel)?;
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}

/// Build the page description for a job
pub fn print_document(
    job: &ExportJob<'_>,
    cancel: &CancelToken,
) -> Result<PrintDocument, ExportError> {
    let geometry = &job.template.page;
    let mut pages = Vec::with_capacity(job.layout.pages.len());
    for page in &job.layout.pages {
        job.check(cancel)?;
        let mut fragments = Vec::new();
        for fragment in page.fragments.iter().filter(|f| job.includes(f.paragraph)) {
            fragments.push(print_fragment(job, fragment)?);
        }
        pages.push(PrintPage {
            number: page.number,
            fragments,
        });
    }

    let title_page = if job.title_page() {
        super::fdx::title_page_lines(&job.document.title_page)
            .into_iter()
            .map(|(text, centered)| TitleLine {
                text: text.to_string(),
                centered,
            })
            .collect()
    } else {
        Vec::new()
    };

    let scenes = job
        .layout
        .scenes
        .iter()
        .filter(|scene| job.includes(scene.paragraph))
        .map(|scene| PrintScene {
            paragraph: scene.paragraph,
            heading: scene.heading.clone(),
            number: scene.number.map(|n| n.to_string()),
            first_page: scene.first_page,
            last_page: scene.last_page,
            duration: scene.duration,
        })
        .collect();

    Ok(PrintDocument {
        template: job.template.name().to_string(),
        form: job.document.form().slug().to_string(),
        page: PageSize {
            width: geometry.width,
            height: geometry.height,
            margin_top: geometry.margin_top,
            margin_bottom: geometry.margin_bottom,
            margin_left: geometry.margin_left,
            margin_right: geometry.margin_right,
            split_ratio: geometry.split_ratio,
        },
        title_page,
        pages,
        scenes,
        duration: job.layout.duration,
    })
}

fn print_fragment(job: &ExportJob<'_>, fragment: &Fragment) -> Result<PrintFragment, ExportError> {
    let rule = job.template.rule(fragment.kind)?;
    let geometry = &job.template.page;
    let paragraph = job.document.paragraph(fragment.paragraph);
    let scene_number = if fragment.kind.is_scene_start()
        && fragment.role == FragmentRole::Text
        && fragment.first_line == 0
        && job.template.numbering.scene_numbers
    {
        job.scene_number(fragment.paragraph).map(|n| n.to_string())
    } else {
        None
    };
    Ok(PrintFragment {
        paragraph: fragment.paragraph,
        kind: fragment.kind.slug().to_string(),
        role: role_name(fragment.role),
        x: geometry.margin_left + fragment.x,
        y: geometry.margin_top + fragment.y,
        width: fragment.width,
        line_height: fragment.line_height,
        align: fragment.align,
        lines: fragment.lines.clone(),
        style: PrintStyle {
            font_family: rule.font_family.clone(),
            font_size: rule.font_size,
            case: rule.case,
            bold: rule.bold,
            italic: rule.italic,
            underline: rule.underline,
            color: rule.color.clone(),
        },
        highlight: job.is_highlighted(fragment.paragraph),
        revision: paragraph.and_then(|p| job.revision(p)).map(|mark| mark.level),
        scene_number,
    })
}
