//! Markdown exporter
//!
//! Novels are written as the Markdown importer reads them: heading levels
//! for parts, chapters, scenes and beats, block quotes for synopses and a
//! thematic break for scene breaks. Other forms are rendered as a readable
//! manuscript with structural groups as headings and bold character cues.

use super::{ExportError, ExportFormat, ExportJob, Exporter, Item};
use crate::cancel::CancelToken;
use crate::import::markdown::SCENE_BREAK;
use crate::model::{KindRole, NovelKind, Paragraph, ParagraphKind, TextRun, WritingForm};

/// Writes Markdown manuscripts
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markdown
    }

    fn export_with(&self, job: &ExportJob<'_>, cancel: &CancelToken) -> Result<Vec<u8>, ExportError> {
        let mut output = String::new();
        if job.title_page() {
            output.push_str("<!--\n");
            for entry in &job.document.title_page.entries {
                // One line per entry so the importer can read it back
                let value = entry.value.lines().collect::<Vec<_>>().join(" / ");
                output.push_str(&format!("{}: {}\n", entry.key, value));
            }
            output.push_str("-->\n\n");
        }

        let novel = job.document.form() == WritingForm::Novel;
        for item in job.items() {
            match item {
                Item::Open { group, depth } if !novel => {
                    let prefix = "#".repeat((depth + 1).min(6));
                    output.push_str(&format!("{} {}\n\n", prefix, escape_text(&group.title)));
                }
                Item::Open { .. } | Item::Close { .. } => {}
                Item::Paragraph { paragraph, .. } => {
                    job.check(cancel)?;
                    if novel {
                        write_novel_block(&mut output, paragraph);
                    } else {
                        write_script_block(&mut output, paragraph);
                    }
                }
            }
        }
        Ok(output.into_bytes())
    }
}

/// Write a novel paragraph the way the importer maps it back
fn write_novel_block(output: &mut String, paragraph: &Paragraph) {
    let ParagraphKind::Novel(kind) = paragraph.kind() else {
        return;
    };
    let text = runs_to_markdown(paragraph.runs());
    match kind {
        NovelKind::SceneHeading if paragraph.text() == SCENE_BREAK => output.push_str("---\n\n"),
        NovelKind::PartHeading => output.push_str(&format!("# {}\n\n", text)),
        NovelKind::ChapterHeading => output.push_str(&format!("## {}\n\n", text)),
        NovelKind::SceneHeading => output.push_str(&format!("### {}\n\n", text)),
        NovelKind::BeatHeading => output.push_str(&format!("#### {}\n\n", text)),
        NovelKind::Synopsis => write_quote(output, &text),
        NovelKind::Unformatted => write_code(output, &paragraph.text()),
        NovelKind::Text => output.push_str(&format!("{}\n\n", text)),
    }
}

/// Write a script paragraph as manuscript Markdown
fn write_script_block(output: &mut String, paragraph: &Paragraph) {
    let kind = paragraph.kind();
    let text = runs_to_markdown(paragraph.runs());
    match kind.role() {
        KindRole::SceneHeading => output.push_str(&format!("### {}\n\n", text)),
        KindRole::Heading => output.push_str(&format!("#### {}\n\n", text)),
        KindRole::Character => {
            let mut cue = escape_text(&paragraph.text());
            if paragraph.attributes.dual_dialogue {
                cue.push_str(" ^");
            }
            output.push_str(&format!("**{}**\n\n", cue));
        }
        KindRole::Parenthetical => output.push_str(&format!("*{}*\n\n", escape_text(&paragraph.text()))),
        KindRole::Lyrics => output.push_str(&format!("> *{}*\n\n", escape_text(&paragraph.text()))),
        KindRole::Synopsis => write_quote(output, &text),
        KindRole::Note => {
            output.push_str(&format!("<!-- {} -->\n\n", paragraph.text().replace("--", "- -")));
        }
        KindRole::Unformatted => write_code(output, &paragraph.text()),
        KindRole::Transition => output.push_str(&format!("{}\n\n", text)),
        KindRole::Dialogue | KindRole::Body => {
            if paragraph.attributes.centered {
                output.push_str(&format!("<center>{}</center>\n\n", text));
            } else {
                output.push_str(&format!("{}\n\n", text));
            }
        }
    }
}

fn write_quote(output: &mut String, text: &str) {
    for line in text.lines() {
        output.push_str("> ");
        output.push_str(line);
        output.push('\n');
    }
    output.push('\n');
}

fn write_code(output: &mut String, text: &str) {
    output.push_str("```\n");
    for line in text.lines() {
        output.push_str(line);
        output.push('\n');
    }
    output.push_str("```\n\n");
}

/// Convert runs to inline Markdown, one line at a time
///
/// Underline and colour have no Markdown form and are dropped.
fn runs_to_markdown(runs: &[TextRun]) -> String {
    let mut lines: Vec<String> = vec![String::new()];
    for run in runs {
        for (i, piece) in run.text.split('\n').enumerate() {
            if i > 0 {
                lines.push(String::new());
            }
            if let Some(line) = lines.last_mut() {
                line.push_str(&wrap_run(piece, run));
            }
        }
    }
    let lines: Vec<String> = lines.iter().map(|l| escape_line_start(l)).collect();
    // Backslash before the newline is a hard break
    lines.join("\\\n")
}

fn wrap_run(text: &str, run: &TextRun) -> String {
    let escaped = escape_text(text);
    let core = escaped.trim();
    if core.is_empty() || !(run.bold || run.italic || run.strikethrough) {
        return escaped;
    }
    let lead = &escaped[..escaped.len() - escaped.trim_start().len()];
    let trail = &escaped[escaped.trim_end().len()..];
    let mut text = core.to_string();
    if run.bold {
        text = format!("**{}**", text);
    }
    if run.italic {
        text = format!("*{}*", text);
    }
    if run.strikethrough {
        text = format!("~~{}~~", text);
    }
    format!("{lead}{text}{trail}")
}

/// Backslash-escape inline Markdown punctuation
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '~' | '`' | '[' | ']' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape what would open a block at the start of a line
fn escape_line_start(line: &str) -> String {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if trimmed.starts_with(['#', '>', '-', '+', '=']) {
        format!("{}\\{}", indent, trimmed)
    } else if digits > 0 && trimmed[digits..].starts_with(['.', ')']) {
        format!("{}{}\\{}", indent, &trimmed[..digits], &trimmed[digits..])
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::fixture;
    use crate::export::ExportOptions;
    use crate::import::markdown::MarkdownImporter;
    use crate::import::Importer;
    use crate::layout::Layout;
    use crate::model::DocumentBuilder;
    use crate::template::builtin;

    fn novel() -> crate::model::Document {
        let p = |kind, text: &str| Paragraph::new(ParagraphKind::Novel(kind), text);
        let mut builder = DocumentBuilder::new(WritingForm::Novel);
        builder.title_page_mut().set("Title", "Salt");
        builder.title_page_mut().set("Author", "A. Writer");
        builder.push(p(NovelKind::PartHeading, "Part One")).unwrap();
        builder.push(p(NovelKind::ChapterHeading, "Chapter 1")).unwrap();
        builder.push(p(NovelKind::Synopsis, "The storm arrives.")).unwrap();
        builder
            .push(Paragraph::with_runs(
                ParagraphKind::Novel(NovelKind::Text),
                vec![
                    TextRun::new("Rain hit the "),
                    TextRun {
                        italic: true,
                        ..TextRun::new("old")
                    },
                    TextRun::new(" roof, "),
                    TextRun {
                        bold: true,
                        ..TextRun::new("hard")
                    },
                    TextRun::new("."),
                ],
            ))
            .unwrap();
        builder.push(p(NovelKind::SceneHeading, SCENE_BREAK)).unwrap();
        builder.push(p(NovelKind::Text, "1. Not a list, 2 * 3 stars")).unwrap();
        builder.build()
    }

    #[test]
    fn test_novel_round_trip() {
        let document = novel();
        let template = builtin::fallback(WritingForm::Novel).unwrap();
        let layout = Layout::empty();
        let options = ExportOptions::default();
        let job = ExportJob::new(&document, &template, &layout, &options);
        let bytes = MarkdownExporter.export(&job).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("# Part One\n\n## Chapter 1\n\n> The storm arrives.\n"));
        assert!(text.contains("Rain hit the *old* roof, **hard**."));
        assert!(text.contains("\n---\n"));

        let back = MarkdownImporter.parse(&bytes).unwrap();
        assert_eq!(back.nodes(), document.nodes());
        assert_eq!(back.title_page, document.title_page);
    }

    #[test]
    fn test_screenplay_manuscript() {
        let (document, template, layout) = fixture();
        let options = ExportOptions {
            title_page: false,
            ..ExportOptions::default()
        };
        let job = ExportJob::new(&document, &template, &layout, &options);
        let text = String::from_utf8(MarkdownExporter.export(&job).unwrap()).unwrap();
        assert!(text.starts_with("# Act One\n\n### EXT. HARBOUR - NIGHT\n"));
        assert!(text.contains("**MARTA**\n\n*(quietly)*\n\nHe is late.\n"));
        assert!(text.contains("<!-- Check the tide tables. -->"));
    }

    #[test]
    fn test_line_start_escapes() {
        assert_eq!(escape_line_start("# not a heading"), "\\# not a heading");
        assert_eq!(escape_line_start("12. twelve"), "12\\. twelve");
        assert_eq!(escape_line_start("plain"), "plain");
    }
}
