//! Fountain exporter
//!
//! Writes the inverse of the Fountain importer: elements separated by blank
//! lines, speech blocks kept tight, sigils added only where the bare text
//! would be read as a different element.

use super::{ExportError, ExportFormat, ExportJob, Exporter, Item};
use crate::cancel::CancelToken;
use crate::import::classify::{is_character_cue, is_scene_heading, is_transition};
use crate::model::{ParagraphKind, ScreenplayKind, TextRun, WritingForm};

/// Writes Fountain screenplays
#[derive(Debug, Clone, Copy, Default)]
pub struct FountainExporter;

/// Characters that force an element when they start a line
const SIGILS: &[char] = &['.', '@', '>', '~', '=', '#', '!', '['];

impl Exporter for FountainExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Fountain
    }

    fn export_with(&self, job: &ExportJob<'_>, cancel: &CancelToken) -> Result<Vec<u8>, ExportError> {
        let form = job.document.form();
        if form != WritingForm::Screenplay {
            return Err(ExportError::UnsupportedForm {
                format: "Fountain",
                form,
            });
        }

        let mut out = Writer::default();
        if job.title_page() {
            for entry in &job.document.title_page.entries {
                let mut lines = entry.value.lines();
                let first = lines.next().unwrap_or_default();
                let rest: Vec<&str> = lines.collect();
                if rest.is_empty() {
                    out.line(&format!("{}: {}", entry.key, first));
                } else {
                    out.line(&format!("{}:", entry.key));
                    for line in std::iter::once(first).chain(rest) {
                        out.line(&format!("    {}", line));
                    }
                }
            }
            out.blank();
        }

        let continued = job.template.numbering.continued_marker();
        for item in job.items() {
            let (index, paragraph) = match item {
                Item::Open { group, depth } => {
                    out.block(&format!("{} {}", "#".repeat(depth + 1), group.title));
                    continue;
                }
                Item::Close { .. } => continue,
                Item::Paragraph { index, paragraph } => (index, paragraph),
            };
            job.check(cancel)?;
            let ParagraphKind::Screenplay(kind) = paragraph.kind() else {
                continue;
            };
            if paragraph.attributes.page_break_before {
                out.block("===");
            }
            let text = encode_emphasis(paragraph.runs());
            let attributes = &paragraph.attributes;

            match kind {
                ScreenplayKind::SceneHeading => {
                    let plain = paragraph.text();
                    let mut line = if is_scene_heading(&plain) {
                        text
                    } else {
                        format!(".{}", text)
                    };
                    if let Some(number) = attributes.number_lock {
                        line.push_str(&format!(" #{}#", number));
                    }
                    out.block(&line);
                }
                ScreenplayKind::Character => {
                    let mut cue = paragraph.text();
                    if attributes.continued && !cue.to_uppercase().ends_with(&continued) {
                        cue = format!("{} {}", cue, continued);
                    }
                    if !is_character_cue(&cue) {
                        cue = format!("@{}", cue);
                    }
                    if attributes.dual_dialogue {
                        cue.push_str(" ^");
                    }
                    out.block(&cue);
                    out.speech = true;
                }
                ScreenplayKind::Parenthetical | ScreenplayKind::Dialogue if out.speech => {
                    out.line(&text);
                }
                ScreenplayKind::Lyrics if out.speech => out.line(&format!("~{}", text)),
                ScreenplayKind::Lyrics => out.block(&format!("~{}", text)),
                ScreenplayKind::Transition => {
                    if is_transition(&paragraph.text()) {
                        out.block(&text);
                    } else {
                        out.block(&format!("> {}", text));
                    }
                }
                ScreenplayKind::Synopsis => out.block(&format!("= {}", text)),
                ScreenplayKind::InlineNote => out.block(&format!("[[{}]]", paragraph.text())),
                ScreenplayKind::Action if attributes.centered => {
                    out.block(&format!("> {} <", text));
                }
                _ => {
                    let first = paragraph.text();
                    let first = first.lines().next().unwrap_or_default();
                    let ambiguous = is_scene_heading(first)
                        || is_transition(first)
                        || is_character_cue(first)
                        || first.starts_with(SIGILS)
                        || kind != ScreenplayKind::Action;
                    if ambiguous {
                        out.block(&format!("!{}", text));
                    } else {
                        out.block(&text);
                    }
                }
            }
            log::trace!("fountain: wrote paragraph {}", index);
        }
        Ok(out.finish().into_bytes())
    }
}

#[derive(Default)]
struct Writer {
    out: String,
    /// Inside a character's speech block
    speech: bool,
}

impl Writer {
    fn line(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    /// Start a new element after a blank line
    fn block(&mut self, text: &str) {
        self.blank();
        self.speech = false;
        self.line(text);
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Encode runs with Fountain emphasis markers, one line at a time
pub fn encode_emphasis(runs: &[TextRun]) -> String {
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
    lines.join("\n")
}

fn wrap_run(text: &str, run: &TextRun) -> String {
    let escaped: String = text
        .chars()
        .flat_map(|c| match c {
            '*' | '_' | '\\' => vec!['\\', c],
            c => vec![c],
        })
        .collect();
    let core = escaped.trim();
    if core.is_empty() || !(run.bold || run.italic || run.underline) {
        return escaped;
    }
    let lead = &escaped[..escaped.len() - escaped.trim_start().len()];
    let trail = &escaped[escaped.trim_end().len()..];
    let stars = match (run.bold, run.italic) {
        (true, true) => "***",
        (true, false) => "**",
        (false, true) => "*",
        (false, false) => "",
    };
    let under = if run.underline { "_" } else { "" };
    format!("{lead}{under}{stars}{core}{stars}{under}{trail}")
}
