//! Structure and statistics aggregation
//!
//! A read-only walk over a [`Document`] and its [`Layout`]: text counts,
//! paragraph kind occurrences, a scene table with pages and duration, a
//! character table with cue and word totals, and the conversation test.
//! Every table can be turned into a [`ReportTable`] for CSV/XLSX reports.

use crate::corrector::character_name;
use crate::layout::Layout;
use crate::model::{Document, KindRole, Paragraph, ParagraphKind};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Word and character counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub paragraphs: usize,
    pub words: usize,
    pub characters: usize,
    pub characters_no_spaces: usize,
}

impl Counts {
    pub fn of_text(text: &str) -> Self {
        Self {
            paragraphs: 1,
            words: text.split_whitespace().count(),
            characters: text.chars().count(),
            characters_no_spaces: text.chars().filter(|c| !c.is_whitespace()).count(),
        }
    }

    fn add(&mut self, other: Counts) {
        self.paragraphs += other.paragraphs;
        self.words += other.words;
        self.characters += other.characters;
        self.characters_no_spaces += other.characters_no_spaces;
    }
}

/// One row of the scene table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneRow {
    /// 1-based position of the scene in the document
    pub position: usize,
    /// Index of the scene start paragraph
    pub paragraph: usize,
    pub number: Option<String>,
    pub heading: String,
    pub first_page: Option<usize>,
    pub last_page: Option<usize>,
    /// Estimated duration in seconds
    pub duration: f64,
    /// Speaking characters in order of first cue
    pub characters: Vec<String>,
    pub words: usize,
}

/// One row of the character table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterRow {
    pub name: String,
    pub cues: usize,
    /// Dialogue and lyric paragraphs spoken
    pub speeches: usize,
    pub words: usize,
    /// Number of scenes the character speaks in
    pub scenes: usize,
    /// Position of the first scene the character speaks in
    pub first_scene: Option<usize>,
}

/// Everything the aggregator derives from one document and layout
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub counts: Counts,
    /// Occurrences per kind, in the form's kind order
    pub kinds: Vec<(ParagraphKind, usize)>,
    pub scenes: Vec<SceneRow>,
    pub characters: Vec<CharacterRow>,
    pub pages: usize,
    /// Estimated running time in seconds
    pub duration: f64,
}

/// A speech: the cue's character and the words spoken under it
#[derive(Debug, Clone)]
struct Speech {
    scene: usize,
    name: String,
    text: String,
    paragraphs: usize,
}

/// Speeches in reading order; scene 0 holds speech before the first scene
fn speeches(document: &Document) -> Vec<Speech> {
    let mut out: Vec<Speech> = Vec::new();
    let mut scene = 0;
    let mut current: Option<Speech> = None;
    for paragraph in document.paragraphs() {
        let kind = paragraph.kind();
        if kind.is_scene_start() {
            scene += 1;
        }
        match kind.role() {
            KindRole::Character => {
                out.extend(current.take());
                current = Some(Speech {
                    scene,
                    name: character_name(&paragraph.text()),
                    text: String::new(),
                    paragraphs: 0,
                });
            }
            KindRole::Dialogue | KindRole::Lyrics => {
                if let Some(speech) = current.as_mut() {
                    if !speech.text.is_empty() {
                        speech.text.push(' ');
                    }
                    speech.text.push_str(&paragraph.text());
                    speech.paragraphs += 1;
                }
            }
            KindRole::Parenthetical => {}
            _ => out.extend(current.take()),
        }
    }
    out.extend(current);
    out
}

/// Aggregate statistics for a document and its layout
pub fn collect(document: &Document, layout: &Layout) -> Statistics {
    let mut counts = Counts::default();
    for paragraph in document.paragraphs() {
        counts.add(Counts::of_text(&paragraph.text()));
    }

    let occurrences: HashMap<ParagraphKind, usize> =
        document.paragraphs().map(Paragraph::kind).counts();
    let kinds = document
        .form()
        .kinds()
        .into_iter()
        .map(|kind| (kind, occurrences.get(&kind).copied().unwrap_or(0)))
        .collect();

    let speeches = speeches(document);
    let scenes = scene_rows(document, layout, &speeches);
    let characters = character_rows(&speeches);
    log::debug!(
        "Statistics: {} words, {} scenes, {} speaking characters",
        counts.words,
        scenes.len(),
        characters.len()
    );

    Statistics {
        counts,
        kinds,
        scenes,
        characters,
        pages: layout.page_count(),
        duration: layout.duration,
    }
}

fn scene_rows(document: &Document, layout: &Layout, speeches: &[Speech]) -> Vec<SceneRow> {
    let mut rows: Vec<SceneRow> = Vec::new();
    for (index, paragraph) in document.paragraphs().enumerate() {
        if paragraph.kind().is_scene_start() {
            let info = layout.scenes.iter().find(|s| s.paragraph == index);
            let position = rows.len() + 1;
            rows.push(SceneRow {
                position,
                paragraph: index,
                number: layout.scene_number(index).map(|n| n.to_string()),
                heading: paragraph.text(),
                first_page: info.map(|s| s.first_page),
                last_page: info.map(|s| s.last_page),
                duration: info.map_or(0.0, |s| s.duration),
                characters: speeches
                    .iter()
                    .filter(|s| s.scene == position)
                    .map(|s| s.name.clone())
                    .unique()
                    .collect(),
                words: 0,
            });
        } else if let Some(row) = rows.last_mut() {
            row.words += paragraph.text().split_whitespace().count();
        }
    }
    rows
}

fn character_rows(speeches: &[Speech]) -> Vec<CharacterRow> {
    let mut rows: BTreeMap<&str, CharacterRow> = BTreeMap::new();
    let mut scenes: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
    for speech in speeches {
        let row = rows.entry(speech.name.as_str()).or_insert_with(|| CharacterRow {
            name: speech.name.clone(),
            cues: 0,
            speeches: 0,
            words: 0,
            scenes: 0,
            first_scene: None,
        });
        row.cues += 1;
        row.speeches += speech.paragraphs;
        row.words += speech.text.split_whitespace().count();
        if speech.scene > 0 {
            scenes.entry(speech.name.as_str()).or_default().insert(speech.scene);
        }
    }
    for (name, set) in scenes {
        if let Some(row) = rows.get_mut(name) {
            row.scenes = set.len();
            row.first_scene = set.first().copied();
        }
    }
    rows.into_values()
        .sorted_by(|a, b| b.words.cmp(&a.words).then_with(|| a.name.cmp(&b.name)))
        .collect()
}

/// Parameters of the conversation test
///
/// The test passes when, in a counted scene, two different characters of
/// the group speak one after the other and neither speech mentions an
/// excluded name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationTest {
    /// Characters that count; every speaking character when empty
    pub group: Vec<String>,
    /// Names whose mention disqualifies an exchange
    pub exclude: Vec<String>,
    /// 1-based positions of the scenes that count; all when unset
    pub scenes: Option<Vec<usize>>,
}

/// One qualifying exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    pub scene: usize,
    pub first: String,
    pub second: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationResult {
    pub passed: bool,
    pub exchanges: Vec<Exchange>,
}

impl ConversationTest {
    pub fn run(&self, document: &Document) -> ConversationResult {
        let group: BTreeSet<String> = self.group.iter().map(|n| character_name(n)).collect();
        let excluded: Vec<String> = self
            .exclude
            .iter()
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        let counted = |scene: usize| {
            scene > 0 && self.scenes.as_ref().map_or(true, |s| s.contains(&scene))
        };
        let eligible = |speech: &Speech| {
            counted(speech.scene)
                && (group.is_empty() || group.contains(&speech.name))
                && !mentions_any(&speech.text, &excluded)
        };

        let exchanges: Vec<Exchange> = speeches(document)
            .iter()
            .tuple_windows()
            .filter(|(a, b)| {
                a.scene == b.scene && a.name != b.name && eligible(*a) && eligible(*b)
            })
            .map(|(a, b)| Exchange {
                scene: a.scene,
                first: a.name.clone(),
                second: b.name.clone(),
            })
            .collect();
        log::debug!("Conversation test found {} exchanges", exchanges.len());
        ConversationResult {
            passed: !exchanges.is_empty(),
            exchanges,
        }
    }
}

/// Whether `text` mentions one of `names` as a whole word
fn mentions_any(text: &str, names: &[String]) -> bool {
    if names.is_empty() {
        return false;
    }
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.trim_end_matches("'s").to_lowercase())
        .collect();
    names.iter().any(|name| {
        let parts: Vec<&str> = name.split_whitespace().collect();
        !parts.is_empty()
            && words
                .windows(parts.len())
                .any(|window| window.iter().zip(&parts).all(|(w, p)| w == p))
    })
}

/// A named table of text cells for reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new(name: impl Into<String>, header: &[&str]) -> Self {
        Self {
            name: name.into(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

/// Running time as `m:ss`
pub fn format_duration(duration: f64) -> String {
    let total = duration.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

impl Statistics {
    /// Report tables: summary, kinds, scenes and characters
    pub fn tables(&self) -> Vec<ReportTable> {
        let mut summary = ReportTable::new("Summary", &["Measure", "Value"]);
        for (label, value) in [
            ("Paragraphs", self.counts.paragraphs.to_string()),
            ("Words", self.counts.words.to_string()),
            ("Characters", self.counts.characters.to_string()),
            (
                "Characters without spaces",
                self.counts.characters_no_spaces.to_string(),
            ),
            ("Pages", self.pages.to_string()),
            ("Scenes", self.scenes.len().to_string()),
            ("Duration", format_duration(self.duration)),
        ] {
            summary.push(vec![label.to_string(), value]);
        }

        let mut kinds = ReportTable::new("Kinds", &["Kind", "Count"]);
        for (kind, count) in &self.kinds {
            kinds.push(vec![kind.display_name(), count.to_string()]);
        }

        let mut scenes = ReportTable::new(
            "Scenes",
            &["#", "Number", "Heading", "Pages", "Duration", "Words", "Characters"],
        );
        for row in &self.scenes {
            let pages = match (row.first_page, row.last_page) {
                (Some(first), Some(last)) if first == last => first.to_string(),
                (Some(first), Some(last)) => format!("{}-{}", first, last),
                _ => String::new(),
            };
            scenes.push(vec![
                row.position.to_string(),
                row.number.clone().unwrap_or_default(),
                row.heading.clone(),
                pages,
                format_duration(row.duration),
                row.words.to_string(),
                row.characters.join(", "),
            ]);
        }

        let mut characters = ReportTable::new(
            "Characters",
            &["Name", "Cues", "Speeches", "Words", "Scenes", "First scene"],
        );
        for row in &self.characters {
            characters.push(vec![
                row.name.clone(),
                row.cues.to_string(),
                row.speeches.to_string(),
                row.words.to_string(),
                row.scenes.to_string(),
                row.first_scene.map(|s| s.to_string()).unwrap_or_default(),
            ]);
        }

        vec![summary, kinds, scenes, characters]
    }
}

/// Cast list as a report table, readable by the cast importer
pub fn cast_table(document: &Document) -> ReportTable {
    let mut table = ReportTable::new("Cast", &["name", "description", "age", "gender"]);
    for member in &document.cast {
        table.push(vec![
            member.name.clone(),
            member.description.clone(),
            member.age.clone().unwrap_or_default(),
            member.gender.clone().unwrap_or_default(),
        ]);
    }
    table
}

impl ConversationResult {
    pub fn table(&self) -> ReportTable {
        let mut table = ReportTable::new("Conversation", &["Scene", "First", "Second"]);
        for exchange in &self.exchanges {
            table.push(vec![
                exchange.scene.to_string(),
                exchange.first.clone(),
                exchange.second.clone(),
            ]);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::{fixture, sp};
    use crate::model::{DocumentBuilder, ScreenplayKind, WritingForm};

    #[test]
    fn test_counts_and_kinds() {
        let (document, _, layout) = fixture();
        let stats = collect(&document, &layout);
        assert_eq!(stats.counts.paragraphs, 11);
        assert_eq!(
            stats.counts.words,
            document
                .paragraphs()
                .map(|p| p.text().split_whitespace().count())
                .sum::<usize>()
        );
        assert!(stats.counts.characters > stats.counts.characters_no_spaces);
        let headings = stats
            .kinds
            .iter()
            .find(|(kind, _)| *kind == ParagraphKind::Screenplay(ScreenplayKind::SceneHeading))
            .map(|(_, n)| *n);
        assert_eq!(headings, Some(2));
        assert_eq!(stats.pages, 1);
    }

    #[test]
    fn test_scene_and_character_tables() {
        let (document, _, layout) = fixture();
        let stats = collect(&document, &layout);
        assert_eq!(stats.scenes.len(), 2);
        assert_eq!(stats.scenes[0].number.as_deref(), Some("1"));
        assert_eq!(stats.scenes[0].characters, ["MARTA"]);
        assert_eq!(stats.scenes[1].characters, ["LEO"]);
        assert_eq!(stats.scenes[0].first_page, Some(1));

        let marta = stats.characters.iter().find(|c| c.name == "MARTA").unwrap();
        assert_eq!(marta.cues, 1);
        assert_eq!(marta.words, 3);
        assert_eq!(marta.first_scene, Some(1));
        // Sorted by words spoken
        assert_eq!(stats.characters[0].name, "MARTA");

        let tables = stats.tables();
        assert_eq!(tables.len(), 4);
        assert_eq!(tables[2].rows.len(), 2);
    }

    fn conversation() -> Document {
        let mut builder = DocumentBuilder::new(WritingForm::Screenplay);
        let lines = [
            (ScreenplayKind::SceneHeading, "INT. KITCHEN - DAY"),
            (ScreenplayKind::Character, "ANNA"),
            (ScreenplayKind::Dialogue, "Did you see Tom today?"),
            (ScreenplayKind::Character, "BETH"),
            (ScreenplayKind::Dialogue, "No."),
            (ScreenplayKind::SceneHeading, "EXT. GARDEN - DAY"),
            (ScreenplayKind::Character, "ANNA"),
            (ScreenplayKind::Dialogue, "The roses are out."),
            (ScreenplayKind::Character, "BETH (CONT'D)"),
            (ScreenplayKind::Dialogue, "Finally."),
        ];
        for (kind, text) in lines {
            builder.push(sp(kind, text)).unwrap();
        }
        builder.build()
    }

    #[test]
    fn test_conversation_test() {
        let document = conversation();
        let test = ConversationTest {
            group: vec!["Anna".to_string(), "Beth".to_string()],
            exclude: vec!["Tom".to_string()],
            scenes: None,
        };
        let result = test.run(&document);
        assert!(result.passed);
        assert_eq!(
            result.exchanges,
            [Exchange {
                scene: 2,
                first: "ANNA".to_string(),
                second: "BETH".to_string(),
            }]
        );

        let first_scene_only = ConversationTest {
            scenes: Some(vec![1]),
            ..test.clone()
        };
        assert!(!first_scene_only.run(&document).passed);

        let outside_group = ConversationTest {
            group: vec!["Anna".to_string(), "Carl".to_string()],
            ..test
        };
        assert!(!outside_group.run(&document).passed);
    }

    #[test]
    fn test_mentions_whole_words() {
        let names = vec!["tom".to_string()];
        assert!(mentions_any("Where is Tom's car?", &names));
        assert!(!mentions_any("Tomorrow then.", &names));
        assert!(mentions_any("ask mary jane", &["mary jane".to_string()]));
    }
}
