//! Fountain importer
//!
//! Follows the Fountain grammar: an optional `Key: value` title page, then
//! blank-line separated elements recognised by their shape (scene
//! headings, cues, transitions) or forced by a leading sigil (`.`, `@`,
//! `>`, `!`, `~`, `=`, `#`). Boneyard spans are kept as notes.

use super::classify::{is_character_cue, is_scene_heading, is_transition};
use super::{decode_text, ImportError, ImportFormat, Importer, Sink};
use crate::cancel::CancelToken;
use crate::model::{
    Document, GroupKind, Paragraph, ParagraphKind, SceneNumber, ScreenplayKind, TextRun,
    WritingForm,
};
use regex::Regex;
use std::sync::LazyLock;

static TITLE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9 _-]*):[ \t]*(.*)$").expect("Invalid title key regex")
});

static SCENE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*#([^#\s]+)#\s*$").expect("Invalid scene number regex"));

static INLINE_NOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.*?)\]\]").expect("Invalid note regex"));

/// Imports Fountain screenplays
#[derive(Debug, Clone, Copy, Default)]
pub struct FountainImporter;

impl Importer for FountainImporter {
    fn format(&self) -> ImportFormat {
        ImportFormat::Fountain
    }

    fn parse_with(&self, bytes: &[u8], cancel: &CancelToken) -> Result<Document, ImportError> {
        let text = decode_text(bytes);
        let text = boneyard_to_notes(&text);
        let mut sink = Sink::new(WritingForm::Screenplay, ImportFormat::Fountain, cancel);

        let lines: Vec<&str> = text.split('\n').collect();
        let body_start = read_title_page(&lines, &mut sink);

        let mut parser = Parser {
            sink: &mut sink,
            pending: None,
            notes: Vec::new(),
            page_break: false,
            speech: false,
            sections: Vec::new(),
        };
        parser.run(&lines[body_start..])?;
        Ok(sink.finish())
    }
}

fn sp(kind: ScreenplayKind) -> ParagraphKind {
    ParagraphKind::Screenplay(kind)
}

/// Parse the title page; returns the index of the first body line
fn read_title_page(lines: &[&str], sink: &mut Sink<'_>) -> usize {
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return lines.len();
    };
    let candidate = lines[first].trim_end();
    if !TITLE_KEY.is_match(candidate) || is_scene_heading(candidate) || is_transition(candidate) {
        return 0;
    }

    let mut key: Option<String> = None;
    let mut value = String::new();
    let mut index = first;
    while index < lines.len() {
        let line = lines[index];
        if line.trim().is_empty() {
            break;
        }
        let indented = line.starts_with("   ") || line.starts_with('\t');
        match TITLE_KEY.captures(line.trim_end()) {
            Some(caps) if !indented => {
                if let Some(k) = key.take() {
                    sink.title_page_mut().set(&k, value.trim());
                }
                key = Some(caps[1].trim().to_string());
                value = caps[2].trim().to_string();
            }
            _ => {
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(line.trim());
            }
        }
        index += 1;
    }
    if let Some(k) = key {
        sink.title_page_mut().set(&k, value.trim());
    }
    index
}

/// Rewrite `/* ... */` spans as standalone `[[ ]]` note lines
fn boneyard_to_notes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        let Some(len) = rest[start + 2..].find("*/") else {
            log::warn!("fountain: unterminated boneyard kept as text");
            break;
        };
        out.push_str(&rest[..start]);
        let content = rest[start + 2..start + 2 + len]
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !content.is_empty() {
            out.push_str("\n\n[[");
            out.push_str(&content);
            out.push_str("]]\n\n");
        }
        rest = &rest[start + 2 + len + 2..];
    }
    out.push_str(rest);
    out
}

struct Parser<'s, 'a> {
    sink: &'s mut Sink<'a>,
    /// Paragraph still open for continuation lines
    pending: Option<Paragraph>,
    /// Inline notes lifted out of the pending paragraph
    notes: Vec<String>,
    page_break: bool,
    speech: bool,
    /// Depths of open sections
    sections: Vec<usize>,
}

impl Parser<'_, '_> {
    fn run(&mut self, lines: &[&str]) -> Result<(), ImportError> {
        for (i, raw) in lines.iter().enumerate() {
            let line = raw.trim_end();
            let trimmed = line.trim();
            let prev_blank = i == 0 || lines[i - 1].trim().is_empty();
            let next_blank = lines.get(i + 1).map_or(true, |l| l.trim().is_empty());

            if trimmed.is_empty() {
                self.flush()?;
                self.speech = false;
                continue;
            }
            if trimmed.contains("[[") && !trimmed.contains("]]") {
                self.flush()?;
                self.speech = false;
                self.sink.push_unformatted(trimmed, "unclosed note")?;
                continue;
            }
            if self.speech {
                self.speech_line(trimmed)?;
                continue;
            }
            self.element(trimmed, prev_blank, next_blank)?;
        }
        self.flush()?;
        while self.sections.pop().is_some() {
            self.sink.close_group();
        }
        Ok(())
    }

    fn speech_line(&mut self, text: &str) -> Result<(), ImportError> {
        if text.starts_with('(') && text.ends_with(')') {
            self.emit(sp(ScreenplayKind::Parenthetical), text)
        } else if let Some(lyric) = text.strip_prefix('~') {
            self.emit(sp(ScreenplayKind::Lyrics), lyric.trim_start())
        } else if self.pending_is(ScreenplayKind::Dialogue) {
            self.append(text);
            Ok(())
        } else {
            self.emit(sp(ScreenplayKind::Dialogue), text)
        }
    }

    fn element(&mut self, text: &str, prev_blank: bool, next_blank: bool) -> Result<(), ImportError> {
        if text.len() >= 3 && text.chars().all(|c| c == '=') {
            self.flush()?;
            self.page_break = true;
            return Ok(());
        }
        if text.starts_with('#') {
            return self.section(text);
        }
        if let Some(synopsis) = text.strip_prefix('=') {
            return self.emit(sp(ScreenplayKind::Synopsis), synopsis.trim());
        }
        let whole_note = INLINE_NOTE.find(text).is_some_and(|m| m.len() == text.len());
        if text.starts_with("[[") && whole_note {
            return self.emit_plain(sp(ScreenplayKind::InlineNote), &text[2..text.len() - 2]);
        }
        if let Some(lyric) = text.strip_prefix('~') {
            return self.emit(sp(ScreenplayKind::Lyrics), lyric.trim_start());
        }
        if let Some(inner) = text.strip_prefix('>') {
            if let Some(centered) = inner.strip_suffix('<') {
                self.emit(sp(ScreenplayKind::Action), centered.trim())?;
                if let Some(p) = self.pending.as_mut() {
                    p.attributes.centered = true;
                }
                return Ok(());
            }
            return self.emit(sp(ScreenplayKind::Transition), inner.trim());
        }
        if let Some(forced) = text.strip_prefix('!') {
            return self.emit(sp(ScreenplayKind::Action), forced);
        }
        let forced_heading = text.starts_with('.') && !text.starts_with("..");
        if forced_heading || (prev_blank && is_scene_heading(text)) {
            let heading = if forced_heading { &text[1..] } else { text };
            return self.scene_heading(heading.trim());
        }
        if prev_blank && next_blank && is_transition(text) {
            return self.emit(sp(ScreenplayKind::Transition), text);
        }
        let forced_cue = text.starts_with('@');
        if prev_blank && !next_blank && (forced_cue || is_character_cue(text)) {
            return self.character(text.trim_start_matches('@'));
        }

        if !prev_blank && self.pending_is(ScreenplayKind::Action) {
            self.append(text);
            Ok(())
        } else {
            self.emit(sp(ScreenplayKind::Action), text)
        }
    }

    fn section(&mut self, text: &str) -> Result<(), ImportError> {
        self.flush()?;
        let depth = text.chars().take_while(|c| *c == '#').count();
        let title = text[depth..].trim();
        while self.sections.last().is_some_and(|d| *d >= depth) {
            self.sections.pop();
            self.sink.close_group();
        }
        let kind = match depth {
            1 => GroupKind::Act,
            2 => GroupKind::Sequence,
            _ => GroupKind::Folder,
        };
        self.sink.open_group(kind, title);
        self.sections.push(depth);
        Ok(())
    }

    fn scene_heading(&mut self, text: &str) -> Result<(), ImportError> {
        let (heading, number) = match SCENE_NUMBER.captures(text) {
            Some(caps) => {
                let start = caps.get(0).map_or(text.len(), |m| m.start());
                (&text[..start], SceneNumber::parse(&caps[1]))
            }
            None => (text, None),
        };
        self.emit(sp(ScreenplayKind::SceneHeading), heading.trim())?;
        if let Some(p) = self.pending.as_mut() {
            p.attributes.number_lock = number;
        }
        self.flush()
    }

    fn character(&mut self, text: &str) -> Result<(), ImportError> {
        let (name, dual) = match text.trim_end().strip_suffix('^') {
            Some(name) => (name.trim_end(), true),
            None => (text.trim(), false),
        };
        self.emit_plain(sp(ScreenplayKind::Character), name)?;
        if let Some(p) = self.pending.as_mut() {
            p.attributes.dual_dialogue = dual;
        }
        self.flush()?;
        self.speech = true;
        Ok(())
    }

    fn pending_is(&self, kind: ScreenplayKind) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| p.kind() == sp(kind))
    }

    /// Start a paragraph with emphasis markup resolved
    fn emit(&mut self, kind: ParagraphKind, text: &str) -> Result<(), ImportError> {
        self.flush()?;
        let text = self.lift_notes(text);
        let mut paragraph = Paragraph::with_runs(kind, parse_emphasis(&text));
        paragraph.attributes.page_break_before = std::mem::take(&mut self.page_break);
        self.pending = Some(paragraph);
        Ok(())
    }

    /// Start a paragraph whose text is taken literally
    fn emit_plain(&mut self, kind: ParagraphKind, text: &str) -> Result<(), ImportError> {
        self.flush()?;
        let mut paragraph = Paragraph::new(kind, text.trim());
        paragraph.attributes.page_break_before = std::mem::take(&mut self.page_break);
        self.pending = Some(paragraph);
        Ok(())
    }

    fn append(&mut self, text: &str) {
        let text = self.lift_notes(text);
        if let Some(p) = self.pending.as_mut() {
            let mut runs = p.runs().to_vec();
            runs.push(TextRun::new("\n"));
            runs.extend(parse_emphasis(&text));
            p.set_runs(runs);
        }
    }

    fn lift_notes(&mut self, text: &str) -> String {
        if !text.contains("[[") {
            return text.to_string();
        }
        for caps in INLINE_NOTE.captures_iter(text) {
            self.notes.push(caps[1].trim().to_string());
        }
        INLINE_NOTE.replace_all(text, "").trim().to_string()
    }

    fn flush(&mut self) -> Result<(), ImportError> {
        if let Some(paragraph) = self.pending.take() {
            self.sink.push(paragraph)?;
        }
        for note in std::mem::take(&mut self.notes) {
            self.sink
                .push(Paragraph::new(sp(ScreenplayKind::InlineNote), note))?;
        }
        Ok(())
    }
}

/// Resolve `*italic*`, `**bold**`, `***bold italic***` and `_underline_`
///
/// A marker only opens when a matching marker follows later in the text;
/// `\` escapes the next character.
pub fn parse_emphasis(text: &str) -> Vec<TextRun> {
    let chars: Vec<char> = text.chars().collect();
    let mut runs = Vec::new();
    let mut current = TextRun::default();
    let (mut bold, mut italic, mut underline) = (false, false, false);
    let mut i = 0;

    let mut flush = |current: &mut TextRun, bold: bool, italic: bool, underline: bool| {
        if !current.text.is_empty() {
            runs.push(TextRun {
                bold,
                italic,
                underline,
                ..std::mem::take(current)
            });
        }
    };

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            current.text.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if c == '*' {
            let count = chars[i..].iter().take_while(|c| **c == '*').count().min(3);
            let open = match count {
                3 => bold && italic,
                2 => bold,
                _ => italic,
            };
            let opens = !open
                && chars.get(i + count).is_some_and(|c| !c.is_whitespace())
                && closes_later(&chars[i + count..], '*', count);
            if open || opens {
                flush(&mut current, bold, italic, underline);
                match count {
                    3 => {
                        bold = !open;
                        italic = !open;
                    }
                    2 => bold = !bold,
                    _ => italic = !italic,
                }
            } else {
                current.text.extend(std::iter::repeat('*').take(count));
            }
            i += count;
            continue;
        }
        if c == '_' {
            let opens = !underline
                && chars.get(i + 1).is_some_and(|c| !c.is_whitespace())
                && closes_later(&chars[i + 1..], '_', 1);
            if underline || opens {
                flush(&mut current, bold, italic, underline);
                underline = !underline;
            } else {
                current.text.push('_');
            }
            i += 1;
            continue;
        }
        current.text.push(c);
        i += 1;
    }
    flush(&mut current, bold, italic, underline);
    runs
}

fn closes_later(rest: &[char], marker: char, count: usize) -> bool {
    rest.windows(count)
        .enumerate()
        .any(|(j, w)| w.iter().all(|c| *c == marker) && (j == 0 || rest[j - 1] != '\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Title: The Heist
Credit: Written by
Author: Sam Doe
Draft date: 1/1/2026

# ACT ONE

INT. BANK VAULT - NIGHT #12A#

Alarms blare. *Red* light **floods** the room.

MAYA
(breathless)
We have ninety seconds.
Maybe less.

JONES ^
Then move.

CUT TO:

.FLASHBACK

~Happy birthday to you

= They get away.

[[Check the timing]]

/* Old version
of the scene */

===

>THE END<
";

    fn parse(text: &str) -> Document {
        FountainImporter.parse(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_title_page() {
        let doc = parse(SAMPLE);
        assert_eq!(doc.title_page.title(), Some("The Heist"));
        assert_eq!(doc.title_page.get("author"), Some("Sam Doe"));
    }

    #[test]
    fn test_elements() {
        let doc = parse(SAMPLE);
        let kinds: Vec<&str> = doc.paragraphs().map(|p| p.kind().slug()).collect();
        assert_eq!(
            kinds,
            [
                "scene_heading",
                "action",
                "character",
                "parenthetical",
                "dialogue",
                "character",
                "dialogue",
                "transition",
                "scene_heading",
                "lyrics",
                "synopsis",
                "inline_note",
                "inline_note",
                "action",
            ]
        );
        let heading = doc.paragraph(0).unwrap();
        assert_eq!(heading.text(), "INT. BANK VAULT - NIGHT");
        assert_eq!(heading.attributes.number_lock, SceneNumber::parse("12A"));
        assert_eq!(doc.paragraph(4).unwrap().text(), "We have ninety seconds.\nMaybe less.");
        assert!(doc.paragraph(5).unwrap().attributes.dual_dialogue);
        assert_eq!(doc.paragraph(5).unwrap().text(), "JONES");
        assert_eq!(doc.paragraph(12).unwrap().text(), "Old version of the scene");

        let end = doc.paragraph(13).unwrap();
        assert!(end.attributes.centered);
        assert!(end.attributes.page_break_before);
    }

    #[test]
    fn test_sections_become_groups() {
        let doc = parse(SAMPLE);
        assert_eq!(doc.nodes().len(), 1);
        assert!(matches!(&doc.nodes()[0], crate::model::Node::Group(g) if g.title == "ACT ONE"));
    }

    #[test]
    fn test_emphasis() {
        let runs = parse_emphasis("a *b* **c** ***d*** _e_ 2 * 3");
        let bold: Vec<&str> = runs.iter().filter(|r| r.bold).map(|r| r.text.as_str()).collect();
        let italic: Vec<&str> = runs.iter().filter(|r| r.italic).map(|r| r.text.as_str()).collect();
        assert_eq!(bold, ["c", "d"]);
        assert_eq!(italic, ["b", "d"]);
        assert!(runs.iter().any(|r| r.underline && r.text == "e"));
        assert!(crate::model::runs_text(&runs).ends_with("2 * 3"));
    }

    #[test]
    fn test_unclosed_note_is_unformatted() {
        let doc = parse("INT. ROOM - DAY\n\n[[ broken note\n");
        assert!(doc.paragraph(1).unwrap().kind().is_unformatted());
    }
}
