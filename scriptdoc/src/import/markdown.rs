//! Markdown manuscript importer
//!
//! Converts the pulldown-cmark event stream into novel paragraphs. Heading
//! levels map to the novel hierarchy (part, chapter, scene, beat), block
//! quotes become synopses and thematic breaks become scene breaks. An
//! HTML comment of `Key: value` lines opening the file is the title page.

use super::{ImportError, ImportFormat, Importer, Sink};
use crate::cancel::CancelToken;
use crate::model::{Document, NovelKind, Paragraph, ParagraphKind, TextRun, WritingForm};
use pulldown_cmark::{Event, HeadingLevel, Options, Tag, TagEnd};

/// Text of the scene break paragraph produced for `---`
pub const SCENE_BREAK: &str = "* * *";

/// Imports Markdown as a novel
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownImporter;

impl Importer for MarkdownImporter {
    fn format(&self) -> ImportFormat {
        ImportFormat::Markdown
    }

    fn parse_with(&self, bytes: &[u8], cancel: &CancelToken) -> Result<Document, ImportError> {
        let content = super::decode_text(bytes);
        let mut parser = MarkdownParser::new(Sink::new(
            WritingForm::Novel,
            ImportFormat::Markdown,
            cancel,
        ));
        let options = Options::ENABLE_STRIKETHROUGH;
        for event in pulldown_cmark::Parser::new_ext(&content, options) {
            parser.process_event(event)?;
        }
        parser.finish()
    }
}

/// Novel kind for a Markdown heading level
pub fn kind_for_heading(level: HeadingLevel) -> NovelKind {
    match level {
        HeadingLevel::H1 => NovelKind::PartHeading,
        HeadingLevel::H2 => NovelKind::ChapterHeading,
        HeadingLevel::H3 => NovelKind::SceneHeading,
        _ => NovelKind::BeatHeading,
    }
}

/// Parser state for converting Markdown events to paragraphs
struct MarkdownParser<'a> {
    sink: Sink<'a>,
    /// Nesting depth of each inline style
    italic: usize,
    bold: usize,
    strike: usize,
    /// Runs of the block being built
    runs: Vec<TextRun>,
    heading: Option<HeadingLevel>,
    quote_depth: usize,
    /// Raw content of a code block or HTML block
    verbatim: Option<String>,
    /// Whether any block was emitted yet
    started: bool,
}

impl<'a> MarkdownParser<'a> {
    fn new(sink: Sink<'a>) -> Self {
        Self {
            sink,
            italic: 0,
            bold: 0,
            strike: 0,
            runs: Vec::new(),
            heading: None,
            quote_depth: 0,
            verbatim: None,
            started: false,
        }
    }

    fn process_event(&mut self, event: Event<'_>) -> Result<(), ImportError> {
        match event {
            Event::Start(tag) => self.handle_start_tag(tag)?,
            Event::End(tag_end) => self.handle_end_tag(tag_end)?,
            Event::Text(text) => self.handle_text(&text),
            Event::Code(code) => self.push_text(&code),
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.push_text("\n"),
            Event::Html(html) | Event::InlineHtml(html) => match self.verbatim.as_mut() {
                Some(buffer) => buffer.push_str(&html),
                None => {
                    self.started = true;
                    self.sink
                        .push_unformatted(html.trim(), "inline HTML is not supported")?;
                }
            },
            Event::Rule => {
                self.flush(NovelKind::Text)?;
                self.started = true;
                self.sink.push(novel(NovelKind::SceneHeading, SCENE_BREAK))?;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_start_tag(&mut self, tag: Tag<'_>) -> Result<(), ImportError> {
        match tag {
            Tag::Heading { level, .. } => self.heading = Some(level),
            Tag::BlockQuote(_) => self.quote_depth += 1,
            Tag::CodeBlock(_) | Tag::HtmlBlock => self.verbatim = Some(String::new()),
            Tag::Emphasis => self.italic += 1,
            Tag::Strong => self.bold += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::Item => self.flush(NovelKind::Text)?,
            _ => {}
        }
        Ok(())
    }

    fn handle_end_tag(&mut self, tag_end: TagEnd) -> Result<(), ImportError> {
        match tag_end {
            TagEnd::Heading(level) => {
                self.heading = None;
                self.flush(kind_for_heading(level))?;
            }
            TagEnd::Paragraph | TagEnd::Item => {
                let kind = if self.quote_depth > 0 {
                    NovelKind::Synopsis
                } else {
                    NovelKind::Text
                };
                self.flush(kind)?;
            }
            TagEnd::BlockQuote(_) => self.quote_depth = self.quote_depth.saturating_sub(1),
            TagEnd::CodeBlock | TagEnd::HtmlBlock => {
                if let Some(content) = self.verbatim.take() {
                    let content = content.trim_end();
                    if !self.started {
                        if let Some(entries) = title_comment(content) {
                            let page = self.sink.title_page_mut();
                            for (key, value) in entries {
                                page.set(key, value);
                            }
                            self.started = true;
                            return Ok(());
                        }
                    }
                    self.started = true;
                    if !content.is_empty() {
                        self.sink
                            .push_unformatted(content, "code and HTML blocks have no novel kind")?;
                    }
                }
            }
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Strikethrough => self.strike = self.strike.saturating_sub(1),
            _ => {}
        }
        Ok(())
    }

    fn handle_text(&mut self, text: &str) {
        match self.verbatim.as_mut() {
            Some(buffer) => buffer.push_str(text),
            None => self.push_text(text),
        }
    }

    fn push_text(&mut self, text: &str) {
        let run = TextRun {
            text: text.to_string(),
            italic: self.italic > 0,
            bold: self.bold > 0,
            strikethrough: self.strike > 0,
            ..TextRun::default()
        };
        match self.runs.last_mut() {
            Some(last) if last.same_formatting(&run) => last.text.push_str(text),
            _ => self.runs.push(run),
        }
    }

    /// Emit the collected runs as one paragraph
    fn flush(&mut self, kind: NovelKind) -> Result<(), ImportError> {
        if self.runs.iter().all(|r| r.text.trim().is_empty()) {
            self.runs.clear();
            return Ok(());
        }
        let runs = std::mem::take(&mut self.runs);
        self.started = true;
        self.sink
            .push(Paragraph::with_runs(ParagraphKind::Novel(kind), runs))
    }

    fn finish(mut self) -> Result<Document, ImportError> {
        let kind = match self.heading {
            Some(level) => kind_for_heading(level),
            None => NovelKind::Text,
        };
        self.flush(kind)?;
        Ok(self.sink.finish())
    }
}

/// `Key: value` lines of an HTML comment
fn title_comment(content: &str) -> Option<Vec<(&str, &str)>> {
    let inner = content
        .trim()
        .strip_prefix("<!--")?
        .strip_suffix("-->")?;
    let entries: Option<Vec<_>> = inner
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.split_once(':').map(|(k, v)| (k.trim(), v.trim())))
        .collect();
    entries.filter(|e| !e.is_empty() && e.iter().all(|(k, _)| !k.is_empty()))
}

fn novel(kind: NovelKind, text: &str) -> Paragraph {
    Paragraph::new(ParagraphKind::Novel(kind), text)
}
