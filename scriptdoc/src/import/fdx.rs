//! Final Draft (FDX) importer
//!
//! Reads `<Content>` paragraphs with their `Type`, `Number` and styled
//! `<Text>` runs, scene summaries from `<SceneProperties>`, dual dialogue
//! wrappers and the `<TitlePage>` block.

use super::{decode_text, ImportError, ImportFormat, Importer, Sink};
use crate::cancel::CancelToken;
use crate::model::{
    runs_text, Document, Paragraph, ParagraphKind, SceneNumber, ScreenplayKind, TextRun,
    WritingForm,
};
use crate::xml::{tokenize, XmlEvent};

/// Imports Final Draft XML screenplays
#[derive(Debug, Clone, Copy, Default)]
pub struct FdxImporter;

/// Screenplay kind for an FDX paragraph type
pub fn kind_for_type(name: &str) -> Option<ScreenplayKind> {
    let kind = match name.trim() {
        "Scene Heading" => ScreenplayKind::SceneHeading,
        "Action" | "General" => ScreenplayKind::Action,
        "Character" => ScreenplayKind::Character,
        "Parenthetical" => ScreenplayKind::Parenthetical,
        "Dialogue" => ScreenplayKind::Dialogue,
        "Transition" => ScreenplayKind::Transition,
        "Shot" => ScreenplayKind::Shot,
        "Lyrics" => ScreenplayKind::Lyrics,
        "Cast List" => ScreenplayKind::SceneCharacters,
        "Beat" | "Outline" => ScreenplayKind::BeatHeading,
        "Note" => ScreenplayKind::InlineNote,
        "Synopsis" => ScreenplayKind::Synopsis,
        _ => return None,
    };
    Some(kind)
}

/// FDX paragraph type for a screenplay kind
pub fn type_for_kind(kind: ScreenplayKind) -> &'static str {
    match kind {
        ScreenplayKind::SceneHeading => "Scene Heading",
        ScreenplayKind::Action | ScreenplayKind::Unformatted => "Action",
        ScreenplayKind::Character => "Character",
        ScreenplayKind::Parenthetical => "Parenthetical",
        ScreenplayKind::Dialogue => "Dialogue",
        ScreenplayKind::Transition => "Transition",
        ScreenplayKind::Shot => "Shot",
        ScreenplayKind::Lyrics => "Lyrics",
        ScreenplayKind::SceneCharacters => "Cast List",
        ScreenplayKind::BeatHeading => "Beat",
        ScreenplayKind::InlineNote => "Note",
        ScreenplayKind::Synopsis => "Synopsis",
    }
}

/// Paragraph collected from the stream before it is typed
#[derive(Default)]
struct Raw {
    kind: Option<String>,
    runs: Vec<TextRun>,
    number: Option<String>,
    centered: bool,
    page_break: bool,
}

impl Importer for FdxImporter {
    fn format(&self) -> ImportFormat {
        ImportFormat::Fdx
    }

    fn parse_with(&self, bytes: &[u8], cancel: &CancelToken) -> Result<Document, ImportError> {
        let text = decode_text(bytes);
        let events = tokenize(&text);
        let mut sink = Sink::new(WritingForm::Screenplay, ImportFormat::Fdx, cancel);

        let mut title_lines: Vec<String> = Vec::new();
        let mut in_title_page = false;
        let mut in_summary = false;
        let mut dual = false;
        let mut dual_cues = 0;
        let mut paragraph: Option<Raw> = None;
        let mut run: Option<TextRun> = None;
        let mut summary = String::new();
        let mut summaries: Vec<String> = Vec::new();

        for event in &events {
            match event {
                XmlEvent::Start { .. } | XmlEvent::Empty { .. } => {
                    let empty = matches!(event, XmlEvent::Empty { .. });
                    match event.local_name().unwrap_or_default() {
                        "TitlePage" if !empty => in_title_page = true,
                        "Summary" if !empty => in_summary = true,
                        "DualDialogue" if !empty => {
                            dual = true;
                            dual_cues = 0;
                        }
                        "Paragraph" if in_summary => summary.clear(),
                        "Paragraph" => {
                            paragraph = Some(Raw {
                                kind: event.attr("Type").map(str::to_string),
                                number: event.attr("Number").map(str::to_string),
                                centered: event.attr("Alignment") == Some("Center"),
                                page_break: event.attr("StartsNewPage") == Some("Yes"),
                                runs: Vec::new(),
                            });
                        }
                        "Text" if !empty => run = Some(text_run(event)),
                        _ => {}
                    }
                }
                XmlEvent::Text(content) => {
                    if in_summary {
                        summary.push_str(content);
                    } else if let Some(run) = run.as_mut() {
                        run.text.push_str(content);
                    }
                }
                XmlEvent::End { .. } => match event.local_name().unwrap_or_default() {
                    "TitlePage" => in_title_page = false,
                    "Summary" => in_summary = false,
                    "DualDialogue" => dual = false,
                    "Text" => {
                        if let (Some(run), Some(p)) = (run.take(), paragraph.as_mut()) {
                            p.runs.push(run);
                        }
                    }
                    "Paragraph" if in_summary => {
                        if !summary.trim().is_empty() {
                            summaries.push(summary.trim().to_string());
                        }
                    }
                    "Paragraph" => {
                        let Some(raw) = paragraph.take() else { continue };
                        if in_title_page {
                            title_lines.push(runs_text(&raw.runs));
                            continue;
                        }
                        let is_cue = raw.kind.as_deref() == Some("Character");
                        let mut built = build(raw, &mut sink)?;
                        if let Some(p) = built.as_mut() {
                            if dual && is_cue {
                                dual_cues += 1;
                                p.attributes.dual_dialogue = dual_cues > 1;
                            }
                        }
                        if let Some(p) = built {
                            sink.push(p)?;
                        }
                        for synopsis in summaries.drain(..) {
                            sink.push(Paragraph::new(
                                ParagraphKind::Screenplay(ScreenplayKind::Synopsis),
                                synopsis,
                            ))?;
                        }
                    }
                    _ => {}
                },
            }
        }

        apply_title_page(&title_lines, &mut sink);
        Ok(sink.finish())
    }
}

fn text_run(event: &XmlEvent) -> TextRun {
    let style = event.attr("Style").unwrap_or_default();
    let has = |name: &str| style.split('+').any(|s| s.eq_ignore_ascii_case(name));
    TextRun {
        text: String::new(),
        bold: has("Bold"),
        italic: has("Italic"),
        underline: has("Underline"),
        strikethrough: has("Strikeout"),
        color: event.attr("Color").map(str::to_string),
    }
}

/// Type a collected paragraph; unknown types are kept as unformatted
fn build(raw: Raw, sink: &mut Sink<'_>) -> Result<Option<Paragraph>, ImportError> {
    let kind = match raw.kind.as_deref() {
        Some(name) => match kind_for_type(name) {
            Some(kind) => ParagraphKind::Screenplay(kind),
            None => {
                sink.push_unformatted(
                    runs_text(&raw.runs),
                    &format!("unknown paragraph type '{}'", name),
                )?;
                return Ok(None);
            }
        },
        None => ParagraphKind::Screenplay(ScreenplayKind::Action),
    };
    let mut paragraph = Paragraph::with_runs(kind, raw.runs);
    paragraph.attributes.centered = raw.centered;
    paragraph.attributes.page_break_before = raw.page_break;
    if kind.is_scene_start() {
        paragraph.attributes.number_lock = raw.number.as_deref().and_then(SceneNumber::parse);
    }
    Ok(Some(paragraph))
}

/// Title page paragraphs: title first, `Written by` credit, author, rest
pub(crate) fn apply_title_page(lines: &[String], sink: &mut Sink<'_>) {
    let mut lines = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty());
    let Some(title) = lines.next() else { return };
    let page = sink.title_page_mut();
    page.set("Title", title);
    let mut rest = Vec::new();
    while let Some(line) = lines.next() {
        let lower = line.to_lowercase();
        if page.get("Credit").is_none() && (lower == "by" || lower.starts_with("written by")) {
            page.set("Credit", line);
            if let Some(author) = lines.next() {
                page.set("Author", author);
            }
        } else {
            rest.push(line);
        }
    }
    if !rest.is_empty() {
        page.set("Contact", rest.join("\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no" ?>
<FinalDraft DocumentType="Script" Template="No" Version="5">
  <Content>
    <Paragraph Number="4" Type="Scene Heading">
      <SceneProperties Length="1/8" Page="1" Title="">
        <Summary>
          <Paragraph><Text>Maya breaks in.</Text></Paragraph>
        </Summary>
      </SceneProperties>
      <Text>INT. VAULT - NIGHT</Text>
    </Paragraph>
    <Paragraph Type="Action">
      <Text>The door </Text><Text Style="Bold+Underline">swings</Text><Text> open.</Text>
    </Paragraph>
    <DualDialogue>
      <Paragraph Type="Character"><Text>MAYA</Text></Paragraph>
      <Paragraph Type="Dialogue"><Text>Now!</Text></Paragraph>
      <Paragraph Type="Character"><Text>JONES</Text></Paragraph>
      <Paragraph Type="Dialogue"><Text>Not yet!</Text></Paragraph>
    </DualDialogue>
    <Paragraph Type="Mystery"><Text>Strange &amp; new</Text></Paragraph>
  </Content>
  <TitlePage>
    <Content>
      <Paragraph Alignment="Center"><Text>The Heist</Text></Paragraph>
      <Paragraph Alignment="Center"><Text>Written by</Text></Paragraph>
      <Paragraph Alignment="Center"><Text>Sam Doe</Text></Paragraph>
    </Content>
  </TitlePage>
</FinalDraft>
"#;

    #[test]
    fn test_paragraph_types_and_runs() {
        let doc = FdxImporter.parse(SAMPLE.as_bytes()).unwrap();
        let kinds: Vec<&str> = doc.paragraphs().map(|p| p.kind().slug()).collect();
        assert_eq!(
            kinds,
            [
                "scene_heading",
                "synopsis",
                "action",
                "character",
                "dialogue",
                "character",
                "dialogue",
                "unformatted"
            ]
        );
        let heading = doc.paragraph(0).unwrap();
        assert_eq!(heading.text(), "INT. VAULT - NIGHT");
        assert_eq!(heading.attributes.number_lock, Some(SceneNumber::new(4)));
        assert_eq!(doc.paragraph(1).unwrap().text(), "Maya breaks in.");

        let action = doc.paragraph(2).unwrap();
        assert_eq!(action.text(), "The door swings open.");
        assert!(action.runs().iter().any(|r| r.bold && r.underline && r.text == "swings"));

        assert!(!doc.paragraph(3).unwrap().attributes.dual_dialogue);
        assert!(doc.paragraph(5).unwrap().attributes.dual_dialogue);
        assert_eq!(doc.paragraph(7).unwrap().text(), "Strange & new");
    }

    #[test]
    fn test_title_page() {
        let doc = FdxImporter.parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(doc.title_page.title(), Some("The Heist"));
        assert_eq!(doc.title_page.get("Author"), Some("Sam Doe"));
    }
}
