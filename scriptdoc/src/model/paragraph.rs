//! The paragraph: one typed unit of writing-form content

use super::attributes::ParagraphAttributes;
use super::error::ModelError;
use super::kind::{ParagraphKind, WritingForm};
use super::text_run::{normalize_runs, runs_text, split_runs, TextRun};

/// A typed paragraph: kind + styled runs + metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    kind: ParagraphKind,
    runs: Vec<TextRun>,
    /// Kind-specific metadata
    pub attributes: ParagraphAttributes,
}

impl Paragraph {
    /// Create a paragraph holding a single plain run
    pub fn new(kind: ParagraphKind, text: impl Into<String>) -> Self {
        Self::with_runs(kind, vec![TextRun::new(text)])
    }

    /// Create a paragraph from styled runs
    pub fn with_runs(kind: ParagraphKind, runs: Vec<TextRun>) -> Self {
        Self {
            kind,
            runs: normalize_runs(runs),
            attributes: ParagraphAttributes::default(),
        }
    }

    /// Builder-style attribute assignment
    pub fn with_attributes(mut self, attributes: ParagraphAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// The paragraph kind
    pub fn kind(&self) -> ParagraphKind {
        self.kind
    }

    /// The writing form of the paragraph's kind
    pub fn form(&self) -> WritingForm {
        self.kind.form()
    }

    /// Styled runs
    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    /// Replace the styled runs
    pub fn set_runs(&mut self, runs: Vec<TextRun>) {
        self.runs = normalize_runs(runs);
    }

    /// Replace the content with a single plain run
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.set_runs(vec![TextRun::new(text)]);
    }

    /// Plain text of the paragraph
    pub fn text(&self) -> String {
        runs_text(&self.runs)
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.runs.iter().map(TextRun::char_len).sum()
    }

    /// Whether the paragraph holds no text
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of whitespace separated words
    pub fn word_count(&self) -> usize {
        self.text().split_whitespace().count()
    }

    /// Change the kind within the same writing form
    pub fn retype(&mut self, kind: ParagraphKind) -> Result<(), ModelError> {
        if kind.form() != self.kind.form() {
            return Err(ModelError::FormMismatch {
                expected: self.kind.form(),
                found: kind.form(),
            });
        }
        self.kind = kind;
        Ok(())
    }

    /// Apply a text transform to every run, keeping run boundaries
    pub fn map_runs(&self, mut transform: impl FnMut(&str) -> String) -> Paragraph {
        let runs = self
            .runs
            .iter()
            .map(|run| TextRun {
                text: transform(&run.text),
                ..run.clone()
            })
            .collect();
        Paragraph {
            kind: self.kind,
            runs: normalize_runs(runs),
            attributes: self.attributes.clone(),
        }
    }

    /// Split at a character offset
    ///
    /// Both halves keep the kind, except when the offset is the terminal
    /// character of a kind with a type transition (a scene heading split at
    /// its end starts an action paragraph). The first half keeps the
    /// attributes.
    pub fn split_at(&self, offset: usize) -> Result<(Paragraph, Paragraph), ModelError> {
        let len = self.char_len();
        if offset > len {
            return Err(ModelError::OffsetOutOfRange { offset, len });
        }

        let (head, tail) = split_runs(&self.runs, offset);
        let second_kind = if offset == len {
            self.kind.next_kind().unwrap_or(self.kind)
        } else {
            self.kind
        };

        let first = Paragraph {
            kind: self.kind,
            runs: head,
            attributes: self.attributes.clone(),
        };
        let second = Paragraph::with_runs(second_kind, tail);
        Ok((first, second))
    }

    /// Whether `next` may be merged into this paragraph
    pub fn can_merge(&self, next: &Paragraph) -> bool {
        self.kind == next.kind
    }

    /// Merge `next` onto the end of this paragraph
    ///
    /// Fails with [`ModelError::ParagraphKindMismatch`] when the kinds differ;
    /// the model never reclassifies content to make a merge succeed.
    pub fn merge(&self, next: &Paragraph) -> Result<Paragraph, ModelError> {
        if !self.can_merge(next) {
            return Err(ModelError::ParagraphKindMismatch {
                first: self.kind,
                second: next.kind,
            });
        }
        let mut runs = self.runs.clone();
        runs.extend(next.runs.iter().cloned());
        Ok(Paragraph {
            kind: self.kind,
            runs: normalize_runs(runs),
            attributes: self.attributes.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::kind::{NovelKind, ScreenplayKind};

    fn sp(kind: ScreenplayKind) -> ParagraphKind {
        ParagraphKind::Screenplay(kind)
    }

    #[test]
    fn test_split_keeps_kind_in_the_middle() {
        let p = Paragraph::new(sp(ScreenplayKind::Action), "He runs. She follows.");
        let (a, b) = p.split_at(8).unwrap();
        assert_eq!(a.text(), "He runs.");
        assert_eq!(b.text(), " She follows.");
        assert_eq!(a.kind(), b.kind());
    }

    #[test]
    fn test_split_scene_heading_at_end_starts_action() {
        let p = Paragraph::new(sp(ScreenplayKind::SceneHeading), "INT. HOUSE - DAY");
        let (a, b) = p.split_at(p.char_len()).unwrap();
        assert_eq!(a.kind(), sp(ScreenplayKind::SceneHeading));
        assert_eq!(b.kind(), sp(ScreenplayKind::Action));
        assert!(b.is_empty());
    }

    #[test]
    fn test_split_out_of_range() {
        let p = Paragraph::new(sp(ScreenplayKind::Action), "abc");
        assert_eq!(
            p.split_at(4),
            Err(ModelError::OffsetOutOfRange { offset: 4, len: 3 })
        );
    }

    #[test]
    fn test_merge_same_kind() {
        let a = Paragraph::new(sp(ScreenplayKind::Dialogue), "Hello ");
        let b = Paragraph::new(sp(ScreenplayKind::Dialogue), "there.");
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.text(), "Hello there.");
        assert_eq!(merged.runs().len(), 1);
    }

    #[test]
    fn test_merge_kind_mismatch_is_reported() {
        let a = Paragraph::new(sp(ScreenplayKind::Character), "ANNA");
        let b = Paragraph::new(sp(ScreenplayKind::Dialogue), "Hi.");
        let err = a.merge(&b).unwrap_err();
        assert!(matches!(err, ModelError::ParagraphKindMismatch { .. }));
    }

    #[test]
    fn test_retype_rejects_other_form() {
        let mut p = Paragraph::new(sp(ScreenplayKind::Action), "text");
        let err = p.retype(ParagraphKind::Novel(NovelKind::Text)).unwrap_err();
        assert!(matches!(err, ModelError::FormMismatch { .. }));
        assert_eq!(p.kind(), sp(ScreenplayKind::Action));
    }
}
