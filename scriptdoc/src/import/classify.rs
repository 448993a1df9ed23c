//! Paragraph kind inference for untyped text
//!
//! A small state machine: the kind of the previous line plus features of
//! the current and next line decide the next kind. Plain text and
//! unstyled word-processor paragraphs share it; each writing form has its
//! own conventions for headings and speech.

use crate::model::{
    AudioplayKind, ComicKind, KindRole, NovelKind, ParagraphKind, ScreenplayKind,
    StageplayKind, WritingForm,
};
use regex::Regex;
use std::sync::LazyLock;

static SCENE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\d+[A-Z]?\s+)?(?:INT\.?/EXT|EXT\.?/INT|INT|EXT|EST|I/E)[.\s]")
        .expect("Invalid scene heading regex")
});

static TRANSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Z][A-Z ]*TO:|FADE (?:IN|OUT)[.:]|FADE TO BLACK\.|CUT TO BLACK\.)$")
        .expect("Invalid transition regex")
});

static COMIC_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^PAGES?\s+\d+").expect("Invalid comic page regex"));

static COMIC_PANEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^PANEL\s+\d+").expect("Invalid comic panel regex"));

static NOVEL_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^PART\s+(?:\d+|[IVXLC]+|[A-Z]+)\b").expect("Invalid part regex"));

static NOVEL_CHAPTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^CHAPTER\s+(?:\d+|[IVXLC]+|[A-Z]+)\b").expect("Invalid chapter regex")
});

static STAGE_SCENE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:ACT|SCENE)\s+\w+").expect("Invalid stage scene regex"));

/// `NAME: line` on one line
static INLINE_SPEECH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][A-Z0-9 .'\-]{0,30}?)(?:\s*\(([^)]*)\))?\s*:\s+(.+)$")
        .expect("Invalid inline speech regex")
});

/// Longest line still taken for a character cue
const MAX_CUE_CHARS: usize = 40;

/// Whether a line is written in capitals
pub fn is_all_caps(text: &str) -> bool {
    let mut letters = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_alphabetic() {
            letters = true;
        }
    }
    letters
}

/// Whether a line looks like a scene heading (`INT.`, `EXT.`, `EST.`, `I/E`)
pub fn is_scene_heading(text: &str) -> bool {
    SCENE_HEADING.is_match(text.trim())
}

/// Whether a line looks like a screenplay transition
pub fn is_transition(text: &str) -> bool {
    TRANSITION.is_match(text.trim())
}

/// Whether a line looks like a character cue
pub fn is_character_cue(text: &str) -> bool {
    let text = text.trim();
    let name = text.split('(').next().unwrap_or(text).trim();
    !name.is_empty()
        && text.chars().count() <= MAX_CUE_CHARS
        && is_all_caps(name)
        && !name.ends_with(':')
        && !is_scene_heading(text)
        && !is_transition(text)
}

fn is_parenthetical(text: &str) -> bool {
    let text = text.trim();
    text.starts_with('(') && text.ends_with(')')
}

/// One inferred paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: ParagraphKind,
    pub text: String,
}

impl Classified {
    fn new(kind: ParagraphKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Line classifier for one writing form
#[derive(Debug, Clone)]
pub struct Classifier {
    form: WritingForm,
    previous: Option<ParagraphKind>,
}

impl Classifier {
    pub fn new(form: WritingForm) -> Self {
        Self {
            form,
            previous: None,
        }
    }

    pub fn form(&self) -> WritingForm {
        self.form
    }

    /// Forget the dialogue context (a blank line ends a speech)
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Classify one line
    ///
    /// `next` is the following line of the same block, if any. A line may
    /// yield two paragraphs when it holds `NAME: speech`.
    pub fn classify(&mut self, line: &str, next: Option<&str>) -> Vec<Classified> {
        let text = line.trim();
        let result = match self.form {
            WritingForm::Screenplay => self.screenplay(text, next),
            WritingForm::Stageplay => self.stageplay(text, next),
            WritingForm::Audioplay => self.audioplay(text, next),
            WritingForm::Comicbook => self.comicbook(text, next),
            WritingForm::Novel => vec![self.novel(text)],
        };
        self.previous = result.last().map(|c| c.kind);
        result
    }

    fn in_speech(&self) -> bool {
        self.previous.is_some_and(|kind| {
            matches!(
                kind.role(),
                KindRole::Character | KindRole::Parenthetical | KindRole::Dialogue
            )
        })
    }

    fn screenplay(&self, text: &str, next: Option<&str>) -> Vec<Classified> {
        use ScreenplayKind as K;
        let kind = |k| ParagraphKind::Screenplay(k);
        let k = if is_scene_heading(text) {
            K::SceneHeading
        } else if is_transition(text) {
            K::Transition
        } else if self.in_speech() && is_parenthetical(text) {
            K::Parenthetical
        } else if self.in_speech() {
            K::Dialogue
        } else if next.is_some() && is_character_cue(text) {
            K::Character
        } else {
            K::Action
        };
        vec![Classified::new(kind(k), text)]
    }

    fn stageplay(&self, text: &str, next: Option<&str>) -> Vec<Classified> {
        use StageplayKind as K;
        let kind = |k| ParagraphKind::Stageplay(k);
        if is_scene_heading(text) || STAGE_SCENE.is_match(text) {
            return vec![Classified::new(kind(K::SceneHeading), text)];
        }
        if let Some(split) = self.inline_speech(text, kind(K::Character), kind(K::Dialogue)) {
            return split;
        }
        let k = if self.in_speech() && is_parenthetical(text) {
            K::Parenthetical
        } else if self.in_speech() {
            K::Dialogue
        } else if next.is_some() && is_character_cue(text) {
            K::Character
        } else {
            K::Action
        };
        vec![Classified::new(kind(k), text)]
    }

    fn audioplay(&self, text: &str, next: Option<&str>) -> Vec<Classified> {
        use AudioplayKind as K;
        let kind = |k| ParagraphKind::Audioplay(k);
        if is_scene_heading(text) {
            return vec![Classified::new(kind(K::SceneHeading), text)];
        }
        for (prefix, k) in [("SOUND:", K::Sound), ("SFX:", K::Sound), ("MUSIC:", K::Music), ("CUE:", K::Cue)] {
            if let Some(rest) = strip_prefix_ci(text, prefix) {
                return vec![Classified::new(kind(k), rest.trim())];
            }
        }
        if let Some(split) = self.inline_speech(text, kind(K::Character), kind(K::Dialogue)) {
            return split;
        }
        let k = if self.in_speech() {
            K::Dialogue
        } else if next.is_some() && is_character_cue(text) {
            K::Character
        } else {
            K::Sound
        };
        vec![Classified::new(kind(k), text)]
    }

    fn comicbook(&self, text: &str, next: Option<&str>) -> Vec<Classified> {
        use ComicKind as K;
        let kind = |k| ParagraphKind::Comicbook(k);
        if COMIC_PAGE.is_match(text) {
            return vec![Classified::new(kind(K::PageHeading), text)];
        }
        if COMIC_PANEL.is_match(text) {
            return vec![Classified::new(kind(K::PanelHeading), text)];
        }
        for (prefix, k) in [("CAPTION:", K::Caption), ("NARRATION:", K::Caption), ("SFX:", K::Sfx)] {
            if let Some(rest) = strip_prefix_ci(text, prefix) {
                return vec![Classified::new(kind(k), rest.trim())];
            }
        }
        if let Some(split) = self.inline_speech(text, kind(K::Character), kind(K::Dialogue)) {
            return split;
        }
        let k = if self.in_speech() {
            K::Dialogue
        } else if next.is_some() && is_character_cue(text) {
            K::Character
        } else {
            K::Description
        };
        vec![Classified::new(kind(k), text)]
    }

    fn novel(&self, text: &str) -> Classified {
        use NovelKind as K;
        let kind = |k| ParagraphKind::Novel(k);
        let k = if is_title_line(text) && NOVEL_PART.is_match(text) {
            K::PartHeading
        } else if is_title_line(text) && NOVEL_CHAPTER.is_match(text) {
            K::ChapterHeading
        } else if is_scene_break(text) {
            K::SceneHeading
        } else {
            K::Text
        };
        Classified::new(kind(k), text)
    }

    fn inline_speech(
        &self,
        text: &str,
        cue: ParagraphKind,
        speech: ParagraphKind,
    ) -> Option<Vec<Classified>> {
        let caps = INLINE_SPEECH.captures(text)?;
        let name = caps.get(1)?.as_str().trim();
        if !is_all_caps(name) {
            return None;
        }
        let cue_text = match caps.get(2) {
            Some(ext) => format!("{} ({})", name, ext.as_str()),
            None => name.to_string(),
        };
        Some(vec![
            Classified::new(cue, cue_text),
            Classified::new(speech, caps.get(3)?.as_str().trim()),
        ])
    }
}

/// Short line without sentence punctuation
fn is_title_line(text: &str) -> bool {
    text.split_whitespace().count() <= 8 && !text.ends_with(['.', '?', '!', ','])
}

/// `* * *`, `***`, `#` and similar scene separators
pub fn is_scene_break(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty()
        && text
            .chars()
            .all(|c| matches!(c, '*' | '#' | '~' | '-' | ' ' | '\u{2022}'))
        && text.chars().filter(|c| !c.is_whitespace()).count() <= 5
}

fn strip_prefix_ci<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(form: WritingForm, blocks: &[&[&str]]) -> Vec<String> {
        let mut classifier = Classifier::new(form);
        let mut out = Vec::new();
        for block in blocks {
            classifier.reset();
            for (i, line) in block.iter().enumerate() {
                for c in classifier.classify(line, block.get(i + 1).copied()) {
                    out.push(c.kind.slug().to_string());
                }
            }
        }
        out
    }

    #[test]
    fn test_screenplay_block_structure() {
        let out = kinds(
            WritingForm::Screenplay,
            &[
                &["INT. KITCHEN - NIGHT"],
                &["Anna stirs the soup."],
                &["ANNA", "(tasting)", "Needs salt."],
                &["CUT TO:"],
                &["SHOUTING"],
            ],
        );
        assert_eq!(
            out,
            [
                "scene_heading",
                "action",
                "character",
                "parenthetical",
                "dialogue",
                "transition",
                "action"
            ]
        );
    }

    #[test]
    fn test_inline_speech_splits_cue() {
        let mut classifier = Classifier::new(WritingForm::Comicbook);
        let out = classifier.classify("MAX (OFF): Get down!", None);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "MAX (OFF)");
        assert_eq!(out[1].text, "Get down!");
        assert_eq!(out[1].kind, ParagraphKind::Comicbook(ComicKind::Dialogue));
    }

    #[test]
    fn test_comic_and_novel_headings() {
        assert_eq!(
            kinds(WritingForm::Comicbook, &[&["PAGE 1"], &["PANEL 1"], &["A city."], &["SFX: BOOM"]]),
            ["page_heading", "panel_heading", "description", "sfx"]
        );
        assert_eq!(
            kinds(
                WritingForm::Novel,
                &[&["Part One"], &["Chapter 3"], &["* * *"], &["Part of it rained."]]
            ),
            ["part_heading", "chapter_heading", "scene_heading", "text"]
        );
    }

    #[test]
    fn test_cue_heuristics() {
        assert!(is_character_cue("DR. SMITH (V.O.)"));
        assert!(!is_character_cue("EXT. PARK - DAY"));
        assert!(!is_character_cue("Anna"));
        assert!(is_scene_heading("12 INT. HOUSE - DAY"));
        assert!(is_scene_heading("i/e car - moving"));
        assert!(!is_scene_heading("INTERIOR MONOLOGUE"));
    }
}
