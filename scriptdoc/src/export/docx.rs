//! DOCX export using the docx-rs library
//!
//! Every paragraph kind of the template becomes a paragraph style with id
//! `{form}_{kind}`, built from the kind's style rule, so the DOCX importer
//! can map paragraphs straight back. Page size and margins come from the
//! template geometry.

use super::fdx::title_page_lines;
use super::{ExportError, ExportFormat, ExportJob, Exporter};
use crate::cancel::CancelToken;
use crate::import::docx::style_id;
use crate::model::{Paragraph as ScriptParagraph, TextRun};
use crate::template::{Alignment, StyleRule, Template};
use docx_rs::{
    AlignmentType, BreakType, Docx, LineSpacing, PageMargin, Paragraph, Run, RunFonts, Style,
    StyleType,
};
use std::io::Cursor;

/// Style id of title page paragraphs
pub const TITLE_PAGE_STYLE: &str = "title_page";

/// Twips per point
const TWIPS: f32 = 20.0;

/// Writes Microsoft Word documents
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExporter;

impl Exporter for DocxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn export_with(&self, job: &ExportJob<'_>, cancel: &CancelToken) -> Result<Vec<u8>, ExportError> {
        log::info!(
            "Creating DOCX with docx-rs: {} paragraphs, template '{}'",
            job.document.len(),
            job.template.name()
        );
        let mut docx = page_setup(Docx::new(), job.template);
        docx = add_kind_styles(docx, job.template)?;

        if job.title_page() {
            docx = docx.add_style(
                Style::new(TITLE_PAGE_STYLE, StyleType::Paragraph)
                    .name("Title Page")
                    .align(AlignmentType::Center),
            );
            for (line, centered) in title_page_lines(&job.document.title_page) {
                let align = if centered {
                    AlignmentType::Center
                } else {
                    AlignmentType::Left
                };
                docx = docx.add_paragraph(
                    Paragraph::new()
                        .style(TITLE_PAGE_STYLE)
                        .align(align)
                        .add_run(Run::new().add_text(line)),
                );
            }
            docx = docx.add_paragraph(
                Paragraph::new()
                    .style(TITLE_PAGE_STYLE)
                    .add_run(Run::new().add_break(BreakType::Page)),
            );
        }

        for (index, paragraph) in job.paragraphs() {
            job.check(cancel)?;
            let rule = job.template.rule(paragraph.kind())?;
            let page_break = paragraph.attributes.page_break_before || rule.page_break_before;
            docx = docx.add_paragraph(create_paragraph(job, index, paragraph, page_break));
        }

        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|e| ExportError::Encode {
                format: "DOCX",
                message: e.to_string(),
            })?;
        let bytes = buffer.into_inner();
        log::info!("Successfully built DOCX of {} bytes", bytes.len());
        Ok(bytes)
    }
}

fn twips(points: f32) -> i32 {
    (points * TWIPS).round() as i32
}

/// Page size and margins from the template geometry
fn page_setup(docx: Docx, template: &Template) -> Docx {
    let page = &template.page;
    docx.page_size(twips(page.width) as u32, twips(page.height) as u32)
        .page_margin(
            PageMargin::new()
                .top(twips(page.margin_top))
                .bottom(twips(page.margin_bottom))
                .left(twips(page.margin_left))
                .right(twips(page.margin_right)),
        )
}

/// Convert Alignment to AlignmentType for paragraph formatting
fn alignment_to_docx_alignment(alignment: Alignment) -> AlignmentType {
    match alignment {
        Alignment::Left => AlignmentType::Left,
        Alignment::Center => AlignmentType::Center,
        Alignment::Right => AlignmentType::Right,
        Alignment::Justify => AlignmentType::Both,
    }
}

/// One paragraph style per kind of the template's form
fn add_kind_styles(mut docx: Docx, template: &Template) -> Result<Docx, ExportError> {
    for kind in template.form().kinds() {
        let rule = template.rule(kind)?;
        docx = docx.add_style(kind_style(&style_id(kind), &kind.display_name(), rule));
    }
    Ok(docx)
}

fn kind_style(id: &str, name: &str, rule: &StyleRule) -> Style {
    let line_height = rule.line_height();
    let mut style = Style::new(id, StyleType::Paragraph)
        .name(name)
        .size((rule.font_size * 2.0).round() as usize) // docx-rs uses half-points
        .fonts(
            RunFonts::new()
                .ascii(&rule.font_family)
                .hi_ansi(&rule.font_family),
        )
        .align(alignment_to_docx_alignment(rule.align))
        .indent(
            Some(twips(rule.left_indent)),
            None,
            Some(twips(rule.right_indent)),
            None,
        )
        .line_spacing(
            LineSpacing::new()
                .before(twips(rule.space_before * line_height).max(0) as u32)
                .after(twips(rule.space_after * line_height).max(0) as u32)
                .line((240.0 * rule.line_spacing).round() as i32),
        );
    if rule.bold {
        style = style.bold();
    }
    if rule.italic {
        style = style.italic();
    }
    if rule.underline {
        style = style.underline("single");
    }
    if let Some(color) = &rule.color {
        style = style.color(color.trim_start_matches('#'));
    }
    style
}

fn create_paragraph(
    job: &ExportJob<'_>,
    index: usize,
    paragraph: &ScriptParagraph,
    page_break: bool,
) -> Paragraph {
    let mut para = Paragraph::new().style(&style_id(paragraph.kind()));
    if paragraph.attributes.centered {
        para = para.align(AlignmentType::Center);
    }
    if page_break {
        para = para.add_run(Run::new().add_break(BreakType::Page));
    }
    let highlight = job.is_highlighted(index);
    let revision = job.revision(paragraph).is_some();
    for text_run in paragraph.runs() {
        let mut run = create_run(text_run);
        if highlight {
            run = run.highlight("yellow");
        } else if revision {
            run = run.highlight("lightGray");
        }
        para = para.add_run(run);
    }
    para
}

/// Create a docx Run from a TextRun; line breaks and tabs become break and
/// tab elements
fn create_run(text_run: &TextRun) -> Run {
    let mut run = Run::new();
    for (i, line) in text_run.text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        for (j, piece) in line.split('\t').enumerate() {
            if j > 0 {
                run = run.add_tab();
            }
            if !piece.is_empty() {
                run = run.add_text(piece);
            }
        }
    }

    if text_run.bold {
        run = run.bold();
    }
    if text_run.italic {
        run = run.italic();
    }
    if text_run.underline {
        run = run.underline("single");
    }
    if text_run.strikethrough {
        run = run.strike();
    }
    if let Some(color) = &text_run.color {
        run = run.color(color.trim_start_matches('#'));
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::fixture;
    use crate::export::ExportOptions;
    use crate::import::docx::DocxImporter;
    use crate::import::Importer;

    #[test]
    fn test_styles_round_trip() {
        let (mut document, template, layout) = fixture();
        let mut action = document.paragraph(2).unwrap().clone();
        action.set_runs(vec![
            TextRun::new("Fog rolls over "),
            TextRun {
                bold: true,
                color: Some("#AA0000".to_string()),
                ..TextRun::new("the pier")
            },
            TextRun::new("."),
        ]);
        document.replace(2, action.clone()).unwrap();

        let options = ExportOptions::default();
        let job = ExportJob::new(&document, &template, &layout, &options);
        let bytes = DocxExporter.export(&job).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let back = DocxImporter::new(None).parse(&bytes).unwrap();
        let kinds: Vec<_> = back.paragraphs().map(|p| p.kind()).collect();
        let expected: Vec<_> = document.paragraphs().map(|p| p.kind()).collect();
        assert_eq!(kinds, expected);
        assert_eq!(back.paragraph(2).unwrap().runs(), action.runs());
        assert_eq!(back.title_page.title(), Some("Harbour Lights"));
        assert_eq!(back.title_page.get("Author"), Some("J. Doe"));
        assert!(!back.paragraph(0).unwrap().attributes.page_break_before);
    }
}
