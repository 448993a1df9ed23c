//! Scene, dialogue and comic page/panel numbering

use crate::model::{ComicKind, KindRole, Paragraph, ParagraphKind, SceneNumber};
use std::collections::BTreeMap;

/// Numbering derived for one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Numbering {
    /// Scene heading paragraph index → number
    pub scenes: BTreeMap<usize, SceneNumber>,
    /// Character cue paragraph index → dialogue number
    pub dialogues: BTreeMap<usize, u32>,
    /// Comic page heading index → page number
    pub comic_pages: BTreeMap<usize, u32>,
    /// Comic panel heading index → (page, panel)
    pub panels: BTreeMap<usize, (u32, u32)>,
}

/// Numbering inputs of one scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneSlot {
    pub lock: Option<SceneNumber>,
    pub skip: bool,
}

/// Assign scene numbers in document order
///
/// Locked scenes keep their number. Skipped scenes get none. Any other
/// scene takes the next integer after the previous number, unless that
/// would reach or pass the next locked number, in which case it takes the
/// next letter after the previous number (`4` → `4A` → `4B`), or goes one
/// letter deeper when that letter is locked too (`4A` → `4AA` before `4B`).
/// A scene squeezed between a number and its first lettered successor
/// (`4`, then locked `4A`) has no number left and stays unnumbered.
pub fn assign_scene_numbers(slots: &[SceneSlot]) -> Vec<Option<SceneNumber>> {
    // Next locked number at or after each position
    let mut next_lock = vec![None; slots.len()];
    let mut upcoming = None;
    for (i, slot) in slots.iter().enumerate().rev() {
        if slot.lock.is_some() && !slot.skip {
            upcoming = slot.lock;
        }
        next_lock[i] = upcoming;
    }

    let mut previous = SceneNumber::new(0);
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            if slot.skip {
                return None;
            }
            let number = match slot.lock {
                Some(locked) => locked,
                None => {
                    // Locks out of order no longer bound the count
                    let bound = next_lock
                        .get(i + 1)
                        .copied()
                        .flatten()
                        .filter(|lock| *lock > previous);
                    let candidates = [
                        Some(SceneNumber::new(previous.value + 1)),
                        previous.next_suffix(),
                        previous.deeper(),
                    ];
                    let fits = candidates
                        .into_iter()
                        .flatten()
                        .find(|candidate| bound.map_or(true, |lock| *candidate < lock));
                    match fits {
                        Some(number) => number,
                        None => {
                            log::warn!(
                                "No scene number left between {} and {}; scene {} is unnumbered",
                                previous,
                                bound.map(|b| b.to_string()).unwrap_or_default(),
                                i + 1
                            );
                            return None;
                        }
                    }
                }
            };
            previous = number;
            Some(number)
        })
        .collect()
}

/// Number scenes, dialogue cues and comic pages/panels
pub fn number_document<'a>(
    paragraphs: impl IntoIterator<Item = &'a Paragraph>,
    scene_numbers: bool,
    dialogue_numbers: bool,
) -> Numbering {
    let mut numbering = Numbering::default();
    let mut scene_indices = Vec::new();
    let mut slots = Vec::new();
    let mut dialogue = 0;
    let mut comic_page = 0;
    let mut panel = 0;

    for (index, paragraph) in paragraphs.into_iter().enumerate() {
        let kind = paragraph.kind();
        match kind {
            ParagraphKind::Comicbook(ComicKind::PageHeading) => {
                comic_page += 1;
                panel = 0;
                numbering.comic_pages.insert(index, comic_page);
            }
            ParagraphKind::Comicbook(ComicKind::PanelHeading) => {
                panel += 1;
                numbering.panels.insert(index, (comic_page.max(1), panel));
            }
            _ => {}
        }
        if kind.is_scene_start() {
            scene_indices.push(index);
            slots.push(SceneSlot {
                lock: paragraph.attributes.number_lock,
                skip: paragraph.attributes.skip_numbering,
            });
        }
        if dialogue_numbers && kind.role() == KindRole::Character {
            dialogue += 1;
            numbering.dialogues.insert(index, dialogue);
        }
    }

    if scene_numbers {
        for (index, number) in scene_indices.into_iter().zip(assign_scene_numbers(&slots)) {
            if let Some(number) = number {
                numbering.scenes.insert(index, number);
            }
        }
    }
    numbering
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free() -> SceneSlot {
        SceneSlot {
            lock: None,
            skip: false,
        }
    }

    fn locked(n: &str) -> SceneSlot {
        SceneSlot {
            lock: SceneNumber::parse(n),
            skip: false,
        }
    }

    fn printed(numbers: &[Option<SceneNumber>]) -> Vec<String> {
        numbers
            .iter()
            .map(|n| n.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()))
            .collect()
    }

    #[test]
    fn test_sequential() {
        let numbers = assign_scene_numbers(&[free(), free(), free()]);
        assert_eq!(printed(&numbers), ["1", "2", "3"]);
    }

    #[test]
    fn test_insert_before_locked_scene_letters() {
        // 1 2 [new] 3 4 (5 locked) 6
        let slots = [free(), free(), free(), free(), free(), locked("5"), free()];
        let numbers = assign_scene_numbers(&slots);
        assert_eq!(printed(&numbers), ["1", "2", "3", "4", "4A", "5", "6"]);
    }

    #[test]
    fn test_lock_after_lettered_lock() {
        let slots = [locked("4"), free(), locked("4B"), free(), locked("5")];
        let numbers = assign_scene_numbers(&slots);
        assert_eq!(printed(&numbers), ["4", "4A", "4B", "4C", "5"]);
    }

    #[test]
    fn test_free_scene_between_lettered_locks() {
        let slots = [locked("4A"), free(), locked("4B")];
        assert_eq!(printed(&assign_scene_numbers(&slots)), ["4A", "4AA", "4B"]);

        let slots = [locked("4A"), free(), free(), locked("4B"), free()];
        assert_eq!(
            printed(&assign_scene_numbers(&slots)),
            ["4A", "4AA", "4AB", "4B", "5"]
        );
    }

    #[test]
    fn test_no_room_before_first_letter() {
        let slots = [locked("4"), free(), locked("4A"), free()];
        assert_eq!(printed(&assign_scene_numbers(&slots)), ["4", "-", "4A", "5"]);
    }

    #[test]
    fn test_scene_before_locked_one() {
        let slots = [free(), locked("1"), free()];
        assert_eq!(printed(&assign_scene_numbers(&slots)), ["0A", "1", "2"]);
    }

    #[test]
    fn test_skip_numbering() {
        let slots = [
            free(),
            SceneSlot {
                lock: None,
                skip: true,
            },
            free(),
        ];
        assert_eq!(printed(&assign_scene_numbers(&slots)), ["1", "-", "2"]);
    }

    #[test]
    fn test_monotonic_without_locks_out_of_order() {
        let slots = [free(), locked("3"), free(), free(), locked("10"), free()];
        let numbers: Vec<SceneNumber> = assign_scene_numbers(&slots).into_iter().flatten().collect();
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    }
}
