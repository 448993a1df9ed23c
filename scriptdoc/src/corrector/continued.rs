//! Contextual continuation rule
//!
//! A character cue is "continued" when the same character spoke last in the
//! scene and an action-like paragraph interrupted them since. Scene starts
//! reset the speaker; parentheticals, dialogue, notes and synopses do not
//! interrupt.

use super::rules::character_name;
use crate::model::{KindRole, Paragraph};

/// Continuation flag for every paragraph of a scene-aligned sequence
///
/// `None` for paragraphs that are not character cues.
pub fn continued_flags<'a>(
    paragraphs: impl IntoIterator<Item = &'a Paragraph>,
) -> Vec<Option<bool>> {
    let mut last_speaker: Option<String> = None;
    let mut interrupted = false;

    paragraphs
        .into_iter()
        .map(|paragraph| match paragraph.kind().role() {
            KindRole::SceneHeading => {
                last_speaker = None;
                interrupted = false;
                None
            }
            KindRole::Character => {
                let name = character_name(&paragraph.text());
                let continued = !paragraph.attributes.dual_dialogue
                    && interrupted
                    && last_speaker.as_deref() == Some(name.as_str());
                last_speaker = Some(name);
                interrupted = false;
                Some(continued)
            }
            KindRole::Body | KindRole::Heading | KindRole::Transition | KindRole::Unformatted => {
                interrupted = true;
                None
            }
            KindRole::Parenthetical
            | KindRole::Dialogue
            | KindRole::Lyrics
            | KindRole::Note
            | KindRole::Synopsis => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParagraphKind, ScreenplayKind};

    fn p(kind: ScreenplayKind, text: &str) -> Paragraph {
        Paragraph::new(ParagraphKind::Screenplay(kind), text)
    }

    #[test]
    fn test_same_speaker_after_action_is_continued() {
        let paragraphs = vec![
            p(ScreenplayKind::Character, "ANNA"),
            p(ScreenplayKind::Dialogue, "Wait here."),
            p(ScreenplayKind::Action, "She leaves, comes back."),
            p(ScreenplayKind::Character, "Anna (V.O.)"),
            p(ScreenplayKind::Dialogue, "Still here?"),
        ];
        let flags = continued_flags(&paragraphs);
        assert_eq!(flags[0], Some(false));
        assert_eq!(flags[3], Some(true));
        assert_eq!(flags[2], None);
    }

    #[test]
    fn test_other_speaker_or_no_interruption_is_not_continued() {
        let paragraphs = vec![
            p(ScreenplayKind::Character, "ANNA"),
            p(ScreenplayKind::Dialogue, "One."),
            p(ScreenplayKind::Character, "ANNA"),
            p(ScreenplayKind::Dialogue, "Two."),
            p(ScreenplayKind::Action, "Bob enters."),
            p(ScreenplayKind::Character, "BOB"),
        ];
        let flags = continued_flags(&paragraphs);
        assert_eq!(flags[2], Some(false));
        assert_eq!(flags[5], Some(false));
    }

    #[test]
    fn test_scene_heading_resets_speaker() {
        let paragraphs = vec![
            p(ScreenplayKind::Character, "ANNA"),
            p(ScreenplayKind::Dialogue, "Bye."),
            p(ScreenplayKind::SceneHeading, "EXT. STREET - NIGHT"),
            p(ScreenplayKind::Action, "Rain."),
            p(ScreenplayKind::Character, "ANNA"),
        ];
        assert_eq!(continued_flags(&paragraphs)[4], Some(false));
    }
}
