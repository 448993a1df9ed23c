//! Text corrector: kind-specific normalisation of paragraph text
//!
//! [`Corrector::normalize`] applies the per-paragraph rules in [`rules`];
//! the document passes add the contextual continuation rule from
//! [`continued`], which needs to see the whole scene. Every rule is
//! idempotent, so running the corrector over already corrected text is a
//! no-op.

pub mod continued;
pub mod rules;

pub use rules::character_name;

use crate::model::{Document, EditRange, KindRole, Paragraph, TextRun};
use crate::template::{Template, TemplateError};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Which corrections are enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectorOptions {
    /// Apply the template's case transform
    pub case_transform: bool,
    /// `...` to `…`
    pub ellipsis: bool,
    /// Straight to typographic quotes
    pub smart_quotes: bool,
    /// Collapse repeated spaces and trim paragraph ends
    pub whitespace: bool,
    /// Wrap parentheticals in `(` `)`
    pub parentheses: bool,
    /// Maintain continuation markers on character cues
    pub continued: bool,
}

impl Default for CorrectorOptions {
    fn default() -> Self {
        Self {
            case_transform: true,
            ellipsis: true,
            smart_quotes: true,
            whitespace: true,
            parentheses: true,
            continued: true,
        }
    }
}

/// Normalisation pass run on every mutation and after import
#[derive(Debug, Clone, Default)]
pub struct Corrector {
    options: CorrectorOptions,
}

impl Corrector {
    pub fn new(options: CorrectorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CorrectorOptions {
        &self.options
    }

    /// Normalise one paragraph against its template rule
    pub fn normalize(
        &self,
        paragraph: &Paragraph,
        template: &Template,
    ) -> Result<Paragraph, TemplateError> {
        let rule = template.rule(paragraph.kind())?;
        let mut out = paragraph.clone();
        let role = paragraph.kind().role();

        if role == KindRole::Character {
            let (cue, had_marker) =
                rules::strip_continued_marker(&out.text(), &template.numbering.continued_text);
            if had_marker {
                let keep = cue.chars().count();
                let (runs, _) = crate::model::split_runs(out.runs(), keep);
                out.set_runs(runs);
                out.attributes.continued = true;
            }
        }

        let mut runs: Vec<TextRun> = out.runs().to_vec();
        if self.options.whitespace {
            runs = rules::collapse_whitespace(&runs);
        }
        if self.options.parentheses && role == KindRole::Parenthetical {
            wrap_runs(&mut runs);
        }
        if self.options.ellipsis {
            for run in &mut runs {
                run.text = rules::collapse_ellipsis(&run.text);
            }
        }
        if self.options.smart_quotes {
            let mut previous = None;
            for run in &mut runs {
                run.text = rules::curl_quotes(&run.text, previous);
                previous = run.text.chars().last().or(previous);
            }
        }
        if self.options.case_transform {
            for run in &mut runs {
                run.text = rule.case.apply(&run.text);
            }
        }

        out.set_runs(runs);
        Ok(out)
    }

    /// Normalise every paragraph of the document; returns how many changed
    pub fn normalize_document(
        &self,
        document: &mut Document,
        template: &Template,
    ) -> Result<usize, TemplateError> {
        let len = document.len();
        self.normalize_range(document, 0..len, template)
    }

    /// Normalise the paragraphs an edit produced
    pub fn normalize_edit(
        &self,
        document: &mut Document,
        edit: &EditRange,
        template: &Template,
    ) -> Result<usize, TemplateError> {
        self.normalize_range(document, edit.new_range(), template)
    }

    /// Normalise `range`, then re-run the continuation rule over the scenes
    /// it touches
    ///
    /// An empty range (e.g. after a removal) still refreshes the scene at
    /// its position.
    pub fn normalize_range(
        &self,
        document: &mut Document,
        range: Range<usize>,
        template: &Template,
    ) -> Result<usize, TemplateError> {
        let len = document.len();
        let range = range.start.min(len)..range.end.min(len);

        let mut updates = document
            .paragraphs()
            .skip(range.start)
            .take(range.len())
            .map(|paragraph| {
                let normalized = self.normalize(paragraph, template)?;
                Ok((normalized != *paragraph).then_some(normalized))
            })
            .collect::<Result<Vec<_>, TemplateError>>()?;
        let start = range.start;
        let mut changed = document.update_range(range.clone(), |index, _| {
            updates.get_mut(index - start).and_then(Option::take)
        });

        if self.options.continued && template.numbering.auto_continued {
            changed += self.apply_continued(document, range);
        }
        Ok(changed)
    }

    /// Recompute continuation flags for the scenes overlapping `range`
    pub fn apply_continued(&self, document: &mut Document, range: Range<usize>) -> usize {
        if document.is_empty() {
            return 0;
        }
        let last = document.len() - 1;
        let first_scene = document.enclosing_scene(range.start.min(last));
        let tail = range.end.saturating_sub(1).clamp(range.start.min(last), last);
        let last_scene = document.enclosing_scene(tail);
        let span = first_scene.start..last_scene.end.max(first_scene.end);

        let flags =
            continued::continued_flags(document.paragraphs().skip(span.start).take(span.len()));
        let start = span.start;
        let changed = document.update_range(span, |index, paragraph| {
            match flags.get(index - start) {
                Some(Some(flag)) if paragraph.attributes.continued != *flag => {
                    let mut updated = paragraph.clone();
                    updated.attributes.continued = *flag;
                    Some(updated)
                }
                _ => None,
            }
        });
        if changed > 0 {
            log::debug!("Updated continuation markers on {} cues", changed);
        }
        changed
    }
}

/// Wrap the text of a run sequence in parentheses
fn wrap_runs(runs: &mut [TextRun]) {
    let text: String = runs.iter().map(|run| run.text.as_str()).collect();
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !text.starts_with('(') {
        if let Some(first) = runs.iter_mut().find(|run| !run.text.is_empty()) {
            first.text.insert(0, '(');
        }
    }
    if !text.ends_with(')') {
        if let Some(last) = runs.iter_mut().rev().find(|run| !run.text.is_empty()) {
            last.text.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NovelKind, ParagraphKind, ScreenplayKind, StageplayKind, WritingForm};
    use crate::template::{builtin, PageGeometry};

    fn sp(kind: ScreenplayKind, text: &str) -> Paragraph {
        Paragraph::new(ParagraphKind::Screenplay(kind), text)
    }

    fn screenplay_template() -> std::sync::Arc<Template> {
        builtin::fallback(WritingForm::Screenplay).unwrap()
    }

    #[test]
    fn test_scene_heading_uppercased() {
        let corrector = Corrector::default();
        let out = corrector
            .normalize(
                &sp(ScreenplayKind::SceneHeading, "int.  kitchen - day"),
                &screenplay_template(),
            )
            .unwrap();
        assert_eq!(out.text(), "INT. KITCHEN - DAY");
    }

    #[test]
    fn test_dialogue_punctuation() {
        let corrector = Corrector::default();
        let out = corrector
            .normalize(
                &sp(ScreenplayKind::Dialogue, "I said \"no\"... it's over."),
                &screenplay_template(),
            )
            .unwrap();
        assert_eq!(out.text(), "I said \u{201c}no\u{201d}\u{2026} it\u{2019}s over.");
    }

    #[test]
    fn test_parenthetical_wrapped_across_runs() {
        let corrector = Corrector::default();
        let paragraph = Paragraph::with_runs(
            ParagraphKind::Screenplay(ScreenplayKind::Parenthetical),
            vec![
                TextRun::new("to "),
                TextRun {
                    italic: true,
                    ..TextRun::new("Bob")
                },
            ],
        );
        let out = corrector.normalize(&paragraph, &screenplay_template()).unwrap();
        assert_eq!(out.text(), "(to Bob)");
        assert_eq!(out.runs().len(), 2);
    }

    #[test]
    fn test_literal_marker_moves_to_attribute() {
        let corrector = Corrector::default();
        let out = corrector
            .normalize(&sp(ScreenplayKind::Character, "anna (cont'd)"), &screenplay_template())
            .unwrap();
        assert_eq!(out.text(), "ANNA");
        assert!(out.attributes.continued);
    }

    #[test]
    fn test_normalize_is_idempotent_for_every_builtin() {
        let corrector = Corrector::default();
        let samples = [
            "  int. house -- night ",
            "\"Wait...\" she says, 'don't.'",
            "anna (CONT'D)",
            "(beat",
            "",
            "....  ",
            "\u{2018}already curly\u{2019}",
        ];
        for form in WritingForm::ALL {
            let template = builtin::fallback(form).unwrap();
            for kind in form.kinds() {
                for sample in samples {
                    let p = Paragraph::new(kind, sample);
                    let once = corrector.normalize(&p, &template).unwrap();
                    let twice = corrector.normalize(&once, &template).unwrap();
                    assert_eq!(once, twice, "{kind}: {sample:?}");
                }
            }
        }
    }

    #[test]
    fn test_missing_rule_fails_closed() {
        let template = Template::new("empty", WritingForm::Stageplay, PageGeometry::letter());
        let p = Paragraph::new(ParagraphKind::Stageplay(StageplayKind::Action), "x");
        assert!(matches!(
            Corrector::default().normalize(&p, &template),
            Err(TemplateError::MissingRule { .. })
        ));
    }

    #[test]
    fn test_document_pass_sets_continued() {
        let mut doc = Document::new(WritingForm::Screenplay);
        for p in [
            sp(ScreenplayKind::SceneHeading, "int. office - day"),
            sp(ScreenplayKind::Character, "ANNA"),
            sp(ScreenplayKind::Dialogue, "Hello."),
            sp(ScreenplayKind::Action, "She sits."),
            sp(ScreenplayKind::Character, "ANNA"),
            sp(ScreenplayKind::Dialogue, "Again."),
        ] {
            doc.push(p).unwrap();
        }
        let template = screenplay_template();
        let corrector = Corrector::default();
        corrector.normalize_document(&mut doc, &template).unwrap();

        assert!(!doc.paragraph(1).unwrap().attributes.continued);
        assert!(doc.paragraph(4).unwrap().attributes.continued);
        assert_eq!(doc.paragraph(0).unwrap().text(), "INT. OFFICE - DAY");

        let revision = doc.revision();
        assert_eq!(corrector.normalize_document(&mut doc, &template).unwrap(), 0);
        assert_eq!(doc.revision(), revision);

        doc.remove(3).unwrap();
        let changed = corrector.normalize_range(&mut doc, 3..3, &template).unwrap();
        assert_eq!(changed, 1);
        assert!(!doc.paragraph(3).unwrap().attributes.continued);
    }

    #[test]
    fn test_continued_disabled_by_template() {
        let template = builtin::fallback(WritingForm::Novel).unwrap();
        let mut doc = Document::new(WritingForm::Novel);
        doc.push(Paragraph::new(ParagraphKind::Novel(NovelKind::Text), "a  b"))
            .unwrap();
        let changed = Corrector::default()
            .normalize_document(&mut doc, &template)
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(doc.paragraph(0).unwrap().text(), "a b");
    }
}
