//! Final Draft (FDX) exporter
//!
//! Synopses directly after a scene heading go into the heading's
//! `<SceneProperties>` summary; a cue marked as dual dialogue is wrapped
//! with the speech block before it in `<DualDialogue>`.

use super::{ExportError, ExportFormat, ExportJob, Exporter};
use crate::cancel::CancelToken;
use crate::import::fdx::type_for_kind;
use crate::model::{KindRole, Paragraph, ParagraphKind, TextRun, TitlePage, WritingForm};
use crate::xml::escape;
use std::fmt::Write;

/// Writes Final Draft XML
#[derive(Debug, Clone, Copy, Default)]
pub struct FdxExporter;

/// Highlight background, 16 bits per channel as Final Draft writes colours
const HIGHLIGHT_BACKGROUND: &str = "#FFFFFFFF0000";

struct Entry {
    role: KindRole,
    dual: bool,
    xml: String,
}

impl Exporter for FdxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Fdx
    }

    fn export_with(&self, job: &ExportJob<'_>, cancel: &CancelToken) -> Result<Vec<u8>, ExportError> {
        let form = job.document.form();
        if form != WritingForm::Screenplay {
            return Err(ExportError::UnsupportedForm {
                format: "FDX",
                form,
            });
        }

        let paragraphs: Vec<(usize, &Paragraph)> = job.paragraphs().collect();
        let mut entries = Vec::new();
        let mut i = 0;
        while i < paragraphs.len() {
            job.check(cancel)?;
            let (index, paragraph) = paragraphs[i];
            i += 1;
            let mut summaries = Vec::new();
            if paragraph.kind().is_scene_start() {
                while let Some((_, next)) = paragraphs.get(i) {
                    if next.kind().role() != KindRole::Synopsis {
                        break;
                    }
                    summaries.push(next.text());
                    i += 1;
                }
            }
            entries.push(Entry {
                role: paragraph.kind().role(),
                dual: paragraph.attributes.dual_dialogue,
                xml: render_paragraph(job, index, paragraph, &summaries),
            });
        }

        let mut out = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\" ?>\n\
             <FinalDraft DocumentType=\"Script\" Template=\"No\" Version=\"5\">\n  <Content>\n",
        );
        let mut i = 0;
        while i < entries.len() {
            let end = block_end(&entries, i);
            let next_end = block_end(&entries, end);
            let dual = entries[i].role == KindRole::Character
                && entries.get(end).is_some_and(|e| e.role == KindRole::Character && e.dual);
            if dual {
                out.push_str("    <DualDialogue>\n");
                for entry in &entries[i..next_end] {
                    out.push_str("  ");
                    out.push_str(&entry.xml);
                }
                out.push_str("    </DualDialogue>\n");
                i = next_end;
            } else {
                for entry in &entries[i..end] {
                    out.push_str(&entry.xml);
                }
                i = end;
            }
        }
        out.push_str("  </Content>\n");
        if job.title_page() {
            out.push_str(&render_title_page(job));
        }
        out.push_str("</FinalDraft>\n");
        Ok(out.into_bytes())
    }
}

/// End of the speech block starting at `start` (or just past `start`)
fn block_end(entries: &[Entry], start: usize) -> usize {
    if start >= entries.len() {
        return entries.len();
    }
    let mut end = start + 1;
    if entries[start].role == KindRole::Character {
        while entries.get(end).is_some_and(|e| {
            matches!(
                e.role,
                KindRole::Dialogue | KindRole::Parenthetical | KindRole::Lyrics
            )
        }) {
            end += 1;
        }
    }
    end
}

fn render_paragraph(
    job: &ExportJob<'_>,
    index: usize,
    paragraph: &Paragraph,
    summaries: &[String],
) -> String {
    let ParagraphKind::Screenplay(kind) = paragraph.kind() else {
        return String::new();
    };
    let mut attrs = format!(" Type=\"{}\"", type_for_kind(kind));
    let number = if job.template.numbering.scene_numbers {
        job.scene_number(index)
    } else {
        paragraph.attributes.number_lock
    };
    if let Some(number) = number.filter(|_| paragraph.kind().is_scene_start()) {
        let _ = write!(attrs, " Number=\"{}\"", number);
    }
    if paragraph.attributes.centered {
        attrs.push_str(" Alignment=\"Center\"");
    }
    if paragraph.attributes.page_break_before {
        attrs.push_str(" StartsNewPage=\"Yes\"");
    }

    let mut xml = format!("    <Paragraph{}>\n", attrs);
    if !summaries.is_empty() {
        xml.push_str("      <SceneProperties>\n        <Summary>\n");
        for summary in summaries {
            let _ = writeln!(
                xml,
                "          <Paragraph><Text>{}</Text></Paragraph>",
                escape(summary)
            );
        }
        xml.push_str("        </Summary>\n      </SceneProperties>\n");
    }
    xml.push_str("      ");
    let highlight = job.is_highlighted(index);
    let revision = job.revision(paragraph).map(|mark| mark.level);
    for run in paragraph.runs() {
        xml.push_str(&render_run(run, highlight, revision));
    }
    xml.push_str("\n    </Paragraph>\n");
    xml
}

fn render_run(run: &TextRun, highlight: bool, revision: Option<u8>) -> String {
    let styles: Vec<&str> = [
        (run.bold, "Bold"),
        (run.italic, "Italic"),
        (run.underline, "Underline"),
        (run.strikethrough, "Strikeout"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();

    let mut attrs = String::new();
    if !styles.is_empty() {
        let _ = write!(attrs, " Style=\"{}\"", styles.join("+"));
    }
    if let Some(color) = &run.color {
        let _ = write!(attrs, " Color=\"{}\"", escape(color));
    }
    if highlight {
        let _ = write!(attrs, " Background=\"{}\"", HIGHLIGHT_BACKGROUND);
    }
    if let Some(level) = revision {
        let _ = write!(attrs, " RevisionID=\"{}\"", level);
    }
    format!("<Text{}>{}</Text>", attrs, escape(&run.text))
}

/// Title page lines in reading order: title, credit and author centred,
/// then the remaining entries
pub(crate) fn title_page_lines(page: &TitlePage) -> Vec<(&str, bool)> {
    let mut lines: Vec<(&str, bool)> = Vec::new();
    for key in ["Title", "Credit", "Author"] {
        if let Some(value) = page.get(key) {
            lines.extend(value.lines().map(|l| (l, true)));
        }
    }
    if page.get("Author").is_some() && page.get("Credit").is_none() {
        lines.insert(1.min(lines.len()), ("Written by", true));
    }
    for entry in &page.entries {
        if !["Title", "Credit", "Author"].contains(&entry.key.as_str()) {
            lines.extend(entry.value.lines().map(|l| (l, false)));
        }
    }
    lines
}

fn render_title_page(job: &ExportJob<'_>) -> String {
    let lines = title_page_lines(&job.document.title_page);
    let mut xml = String::from("  <TitlePage>\n    <Content>\n");
    for (line, centered) in lines {
        let align = if centered { "Center" } else { "Left" };
        let _ = writeln!(
            xml,
            "      <Paragraph Alignment=\"{}\"><Text>{}</Text></Paragraph>",
            align,
            escape(line)
        );
    }
    xml.push_str("    </Content>\n  </TitlePage>\n");
    xml
}
