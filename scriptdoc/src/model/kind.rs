//! Writing forms and their paragraph taxonomies
//!
//! Every writing form owns a closed enumeration of paragraph kinds. A
//! [`ParagraphKind`] is always tagged with its form, so a match over it is
//! exhaustive across every form the crate supports: adding a form or a kind
//! breaks the build of every consumer (templates, corrector, pagination)
//! until it is handled.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level document type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingForm {
    Screenplay,
    Stageplay,
    Audioplay,
    Comicbook,
    Novel,
}

impl WritingForm {
    /// All supported writing forms
    pub const ALL: [WritingForm; 5] = [
        WritingForm::Screenplay,
        WritingForm::Stageplay,
        WritingForm::Audioplay,
        WritingForm::Comicbook,
        WritingForm::Novel,
    ];

    /// Stable identifier used in templates and configuration
    pub fn slug(self) -> &'static str {
        match self {
            WritingForm::Screenplay => "screenplay",
            WritingForm::Stageplay => "stageplay",
            WritingForm::Audioplay => "audioplay",
            WritingForm::Comicbook => "comicbook",
            WritingForm::Novel => "novel",
        }
    }

    /// Parse a form from its slug
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|form| form.slug().eq_ignore_ascii_case(slug.trim()))
    }

    /// Every paragraph kind this form defines
    pub fn kinds(self) -> Vec<ParagraphKind> {
        match self {
            WritingForm::Screenplay => ScreenplayKind::ALL
                .iter()
                .map(|k| ParagraphKind::Screenplay(*k))
                .collect(),
            WritingForm::Stageplay => StageplayKind::ALL
                .iter()
                .map(|k| ParagraphKind::Stageplay(*k))
                .collect(),
            WritingForm::Audioplay => AudioplayKind::ALL
                .iter()
                .map(|k| ParagraphKind::Audioplay(*k))
                .collect(),
            WritingForm::Comicbook => ComicKind::ALL
                .iter()
                .map(|k| ParagraphKind::Comicbook(*k))
                .collect(),
            WritingForm::Novel => NovelKind::ALL
                .iter()
                .map(|k| ParagraphKind::Novel(*k))
                .collect(),
        }
    }

    /// The visible "unformatted text" kind for this form
    pub fn unformatted(self) -> ParagraphKind {
        match self {
            WritingForm::Screenplay => ParagraphKind::Screenplay(ScreenplayKind::Unformatted),
            WritingForm::Stageplay => ParagraphKind::Stageplay(StageplayKind::Unformatted),
            WritingForm::Audioplay => ParagraphKind::Audioplay(AudioplayKind::Unformatted),
            WritingForm::Comicbook => ParagraphKind::Comicbook(ComicKind::Unformatted),
            WritingForm::Novel => ParagraphKind::Novel(NovelKind::Unformatted),
        }
    }

    /// The kind used for ordinary running text
    pub fn body_kind(self) -> ParagraphKind {
        match self {
            WritingForm::Screenplay => ParagraphKind::Screenplay(ScreenplayKind::Action),
            WritingForm::Stageplay => ParagraphKind::Stageplay(StageplayKind::Action),
            WritingForm::Audioplay => ParagraphKind::Audioplay(AudioplayKind::Sound),
            WritingForm::Comicbook => ParagraphKind::Comicbook(ComicKind::Description),
            WritingForm::Novel => ParagraphKind::Novel(NovelKind::Text),
        }
    }

    /// Look up a kind of this form by slug
    pub fn kind_from_slug(self, slug: &str) -> Option<ParagraphKind> {
        self.kinds().into_iter().find(|kind| kind.slug() == slug)
    }
}

impl fmt::Display for WritingForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// Screenplay paragraph kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScreenplayKind {
    SceneHeading,
    SceneCharacters,
    BeatHeading,
    Action,
    Character,
    Parenthetical,
    Dialogue,
    Lyrics,
    Transition,
    Shot,
    InlineNote,
    Synopsis,
    Unformatted,
}

impl ScreenplayKind {
    pub const ALL: [ScreenplayKind; 13] = [
        ScreenplayKind::SceneHeading,
        ScreenplayKind::SceneCharacters,
        ScreenplayKind::BeatHeading,
        ScreenplayKind::Action,
        ScreenplayKind::Character,
        ScreenplayKind::Parenthetical,
        ScreenplayKind::Dialogue,
        ScreenplayKind::Lyrics,
        ScreenplayKind::Transition,
        ScreenplayKind::Shot,
        ScreenplayKind::InlineNote,
        ScreenplayKind::Synopsis,
        ScreenplayKind::Unformatted,
    ];
}

/// Stageplay paragraph kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageplayKind {
    SceneHeading,
    Character,
    Parenthetical,
    Dialogue,
    Action,
    Synopsis,
    Unformatted,
}

impl StageplayKind {
    pub const ALL: [StageplayKind; 7] = [
        StageplayKind::SceneHeading,
        StageplayKind::Character,
        StageplayKind::Parenthetical,
        StageplayKind::Dialogue,
        StageplayKind::Action,
        StageplayKind::Synopsis,
        StageplayKind::Unformatted,
    ];
}

/// Audioplay paragraph kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AudioplayKind {
    SceneHeading,
    Character,
    Dialogue,
    Sound,
    Music,
    Cue,
    Synopsis,
    Unformatted,
}

impl AudioplayKind {
    pub const ALL: [AudioplayKind; 8] = [
        AudioplayKind::SceneHeading,
        AudioplayKind::Character,
        AudioplayKind::Dialogue,
        AudioplayKind::Sound,
        AudioplayKind::Music,
        AudioplayKind::Cue,
        AudioplayKind::Synopsis,
        AudioplayKind::Unformatted,
    ];
}

/// Comic book paragraph kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComicKind {
    PageHeading,
    PanelHeading,
    Description,
    Character,
    Dialogue,
    /// Caption boxes, including narration
    Caption,
    Sfx,
    Synopsis,
    Unformatted,
}

impl ComicKind {
    pub const ALL: [ComicKind; 9] = [
        ComicKind::PageHeading,
        ComicKind::PanelHeading,
        ComicKind::Description,
        ComicKind::Character,
        ComicKind::Dialogue,
        ComicKind::Caption,
        ComicKind::Sfx,
        ComicKind::Synopsis,
        ComicKind::Unformatted,
    ];
}

/// Novel paragraph kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NovelKind {
    PartHeading,
    ChapterHeading,
    SceneHeading,
    BeatHeading,
    Text,
    Synopsis,
    Unformatted,
}

impl NovelKind {
    pub const ALL: [NovelKind; 7] = [
        NovelKind::PartHeading,
        NovelKind::ChapterHeading,
        NovelKind::SceneHeading,
        NovelKind::BeatHeading,
        NovelKind::Text,
        NovelKind::Synopsis,
        NovelKind::Unformatted,
    ];
}

/// The semantic category of a paragraph, tagged with its writing form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParagraphKind {
    Screenplay(ScreenplayKind),
    Stageplay(StageplayKind),
    Audioplay(AudioplayKind),
    Comicbook(ComicKind),
    Novel(NovelKind),
}

/// Coarse role shared by kinds of different forms
///
/// Consumers that treat "a character cue" or "a scene start" alike across
/// forms match on the role instead of every form-specific variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindRole {
    SceneHeading,
    Heading,
    Character,
    Parenthetical,
    Dialogue,
    Lyrics,
    Transition,
    Body,
    Note,
    Synopsis,
    Unformatted,
}

impl ParagraphKind {
    /// The writing form this kind belongs to
    pub fn form(self) -> WritingForm {
        match self {
            ParagraphKind::Screenplay(_) => WritingForm::Screenplay,
            ParagraphKind::Stageplay(_) => WritingForm::Stageplay,
            ParagraphKind::Audioplay(_) => WritingForm::Audioplay,
            ParagraphKind::Comicbook(_) => WritingForm::Comicbook,
            ParagraphKind::Novel(_) => WritingForm::Novel,
        }
    }

    /// Stable slug used by template files and the legacy project format
    pub fn slug(self) -> &'static str {
        match self {
            ParagraphKind::Screenplay(kind) => match kind {
                ScreenplayKind::SceneHeading => "scene_heading",
                ScreenplayKind::SceneCharacters => "scene_characters",
                ScreenplayKind::BeatHeading => "beat_heading",
                ScreenplayKind::Action => "action",
                ScreenplayKind::Character => "character",
                ScreenplayKind::Parenthetical => "parenthetical",
                ScreenplayKind::Dialogue => "dialogue",
                ScreenplayKind::Lyrics => "lyrics",
                ScreenplayKind::Transition => "transition",
                ScreenplayKind::Shot => "shot",
                ScreenplayKind::InlineNote => "inline_note",
                ScreenplayKind::Synopsis => "synopsis",
                ScreenplayKind::Unformatted => "unformatted",
            },
            ParagraphKind::Stageplay(kind) => match kind {
                StageplayKind::SceneHeading => "scene_heading",
                StageplayKind::Character => "character",
                StageplayKind::Parenthetical => "parenthetical",
                StageplayKind::Dialogue => "dialogue",
                StageplayKind::Action => "action",
                StageplayKind::Synopsis => "synopsis",
                StageplayKind::Unformatted => "unformatted",
            },
            ParagraphKind::Audioplay(kind) => match kind {
                AudioplayKind::SceneHeading => "scene_heading",
                AudioplayKind::Character => "character",
                AudioplayKind::Dialogue => "dialogue",
                AudioplayKind::Sound => "sound",
                AudioplayKind::Music => "music",
                AudioplayKind::Cue => "cue",
                AudioplayKind::Synopsis => "synopsis",
                AudioplayKind::Unformatted => "unformatted",
            },
            ParagraphKind::Comicbook(kind) => match kind {
                ComicKind::PageHeading => "page_heading",
                ComicKind::PanelHeading => "panel_heading",
                ComicKind::Description => "description",
                ComicKind::Character => "character",
                ComicKind::Dialogue => "dialogue",
                ComicKind::Caption => "caption",
                ComicKind::Sfx => "sfx",
                ComicKind::Synopsis => "synopsis",
                ComicKind::Unformatted => "unformatted",
            },
            ParagraphKind::Novel(kind) => match kind {
                NovelKind::PartHeading => "part_heading",
                NovelKind::ChapterHeading => "chapter_heading",
                NovelKind::SceneHeading => "scene_heading",
                NovelKind::BeatHeading => "beat_heading",
                NovelKind::Text => "text",
                NovelKind::Synopsis => "synopsis",
                NovelKind::Unformatted => "unformatted",
            },
        }
    }

    /// Human readable name
    pub fn display_name(self) -> String {
        self.slug()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Role of this kind independent of the form
    pub fn role(self) -> KindRole {
        match self {
            ParagraphKind::Screenplay(kind) => match kind {
                ScreenplayKind::SceneHeading => KindRole::SceneHeading,
                ScreenplayKind::BeatHeading | ScreenplayKind::Shot => KindRole::Heading,
                ScreenplayKind::SceneCharacters | ScreenplayKind::Action => KindRole::Body,
                ScreenplayKind::Character => KindRole::Character,
                ScreenplayKind::Parenthetical => KindRole::Parenthetical,
                ScreenplayKind::Dialogue => KindRole::Dialogue,
                ScreenplayKind::Lyrics => KindRole::Lyrics,
                ScreenplayKind::Transition => KindRole::Transition,
                ScreenplayKind::InlineNote => KindRole::Note,
                ScreenplayKind::Synopsis => KindRole::Synopsis,
                ScreenplayKind::Unformatted => KindRole::Unformatted,
            },
            ParagraphKind::Stageplay(kind) => match kind {
                StageplayKind::SceneHeading => KindRole::SceneHeading,
                StageplayKind::Character => KindRole::Character,
                StageplayKind::Parenthetical => KindRole::Parenthetical,
                StageplayKind::Dialogue => KindRole::Dialogue,
                StageplayKind::Action => KindRole::Body,
                StageplayKind::Synopsis => KindRole::Synopsis,
                StageplayKind::Unformatted => KindRole::Unformatted,
            },
            ParagraphKind::Audioplay(kind) => match kind {
                AudioplayKind::SceneHeading => KindRole::SceneHeading,
                AudioplayKind::Character => KindRole::Character,
                AudioplayKind::Dialogue => KindRole::Dialogue,
                AudioplayKind::Sound | AudioplayKind::Music | AudioplayKind::Cue => {
                    KindRole::Body
                }
                AudioplayKind::Synopsis => KindRole::Synopsis,
                AudioplayKind::Unformatted => KindRole::Unformatted,
            },
            ParagraphKind::Comicbook(kind) => match kind {
                ComicKind::PageHeading => KindRole::SceneHeading,
                ComicKind::PanelHeading => KindRole::Heading,
                ComicKind::Description | ComicKind::Sfx => KindRole::Body,
                ComicKind::Character => KindRole::Character,
                ComicKind::Dialogue | ComicKind::Caption => KindRole::Dialogue,
                ComicKind::Synopsis => KindRole::Synopsis,
                ComicKind::Unformatted => KindRole::Unformatted,
            },
            ParagraphKind::Novel(kind) => match kind {
                NovelKind::SceneHeading => KindRole::SceneHeading,
                NovelKind::PartHeading | NovelKind::ChapterHeading | NovelKind::BeatHeading => {
                    KindRole::Heading
                }
                NovelKind::Text => KindRole::Body,
                NovelKind::Synopsis => KindRole::Synopsis,
                NovelKind::Unformatted => KindRole::Unformatted,
            },
        }
    }

    /// Whether this kind opens a new scene (comic pages count as scenes)
    pub fn is_scene_start(self) -> bool {
        self.role() == KindRole::SceneHeading
    }

    /// Whether this kind is any kind of heading
    pub fn is_heading(self) -> bool {
        matches!(self.role(), KindRole::SceneHeading | KindRole::Heading)
    }

    /// Whether this kind is spoken text
    pub fn is_spoken(self) -> bool {
        matches!(self.role(), KindRole::Dialogue | KindRole::Lyrics)
    }

    /// Whether this kind is the visible "unformatted text" fallback
    pub fn is_unformatted(self) -> bool {
        self.role() == KindRole::Unformatted
    }

    /// Kind started by splitting this kind at its terminal character
    ///
    /// `None` means a split keeps the kind.
    pub fn next_kind(self) -> Option<ParagraphKind> {
        let next = match self {
            ParagraphKind::Screenplay(kind) => ParagraphKind::Screenplay(match kind {
                ScreenplayKind::SceneHeading
                | ScreenplayKind::SceneCharacters
                | ScreenplayKind::BeatHeading
                | ScreenplayKind::Shot => ScreenplayKind::Action,
                ScreenplayKind::Character | ScreenplayKind::Parenthetical => {
                    ScreenplayKind::Dialogue
                }
                ScreenplayKind::Dialogue | ScreenplayKind::Lyrics => ScreenplayKind::Action,
                ScreenplayKind::Transition => ScreenplayKind::SceneHeading,
                ScreenplayKind::Action
                | ScreenplayKind::InlineNote
                | ScreenplayKind::Synopsis
                | ScreenplayKind::Unformatted => return None,
            }),
            ParagraphKind::Stageplay(kind) => ParagraphKind::Stageplay(match kind {
                StageplayKind::SceneHeading => StageplayKind::Action,
                StageplayKind::Character | StageplayKind::Parenthetical => {
                    StageplayKind::Dialogue
                }
                StageplayKind::Dialogue => StageplayKind::Character,
                StageplayKind::Action | StageplayKind::Synopsis | StageplayKind::Unformatted => {
                    return None
                }
            }),
            ParagraphKind::Audioplay(kind) => ParagraphKind::Audioplay(match kind {
                AudioplayKind::SceneHeading => AudioplayKind::Sound,
                AudioplayKind::Character => AudioplayKind::Dialogue,
                AudioplayKind::Dialogue => AudioplayKind::Character,
                AudioplayKind::Sound
                | AudioplayKind::Music
                | AudioplayKind::Cue
                | AudioplayKind::Synopsis
                | AudioplayKind::Unformatted => return None,
            }),
            ParagraphKind::Comicbook(kind) => ParagraphKind::Comicbook(match kind {
                ComicKind::PageHeading => ComicKind::PanelHeading,
                ComicKind::PanelHeading => ComicKind::Description,
                ComicKind::Character => ComicKind::Dialogue,
                ComicKind::Dialogue => ComicKind::Character,
                ComicKind::Description
                | ComicKind::Caption
                | ComicKind::Sfx
                | ComicKind::Synopsis
                | ComicKind::Unformatted => return None,
            }),
            ParagraphKind::Novel(kind) => ParagraphKind::Novel(match kind {
                NovelKind::PartHeading => NovelKind::ChapterHeading,
                NovelKind::ChapterHeading | NovelKind::SceneHeading | NovelKind::BeatHeading => {
                    NovelKind::Text
                }
                NovelKind::Text | NovelKind::Synopsis | NovelKind::Unformatted => return None,
            }),
        };
        Some(next)
    }

    /// Kind whose style a newly introduced kind inherits during template migration
    pub fn inherits_from(self) -> Option<ParagraphKind> {
        let parent = match self {
            ParagraphKind::Screenplay(kind) => ParagraphKind::Screenplay(match kind {
                ScreenplayKind::Lyrics => ScreenplayKind::Dialogue,
                ScreenplayKind::Shot | ScreenplayKind::BeatHeading => ScreenplayKind::SceneHeading,
                ScreenplayKind::InlineNote
                | ScreenplayKind::SceneCharacters
                | ScreenplayKind::Synopsis
                | ScreenplayKind::Unformatted => ScreenplayKind::Action,
                _ => return None,
            }),
            ParagraphKind::Stageplay(kind) => ParagraphKind::Stageplay(match kind {
                StageplayKind::Synopsis | StageplayKind::Unformatted => StageplayKind::Action,
                _ => return None,
            }),
            ParagraphKind::Audioplay(kind) => ParagraphKind::Audioplay(match kind {
                AudioplayKind::Music | AudioplayKind::Cue => AudioplayKind::Sound,
                AudioplayKind::Synopsis | AudioplayKind::Unformatted => AudioplayKind::Sound,
                _ => return None,
            }),
            ParagraphKind::Comicbook(kind) => ParagraphKind::Comicbook(match kind {
                ComicKind::Sfx => ComicKind::Caption,
                ComicKind::Caption => ComicKind::Dialogue,
                ComicKind::Synopsis | ComicKind::Unformatted => ComicKind::Description,
                _ => return None,
            }),
            ParagraphKind::Novel(kind) => ParagraphKind::Novel(match kind {
                NovelKind::BeatHeading => NovelKind::SceneHeading,
                NovelKind::Synopsis | NovelKind::Unformatted => NovelKind::Text,
                _ => return None,
            }),
        };
        Some(parent)
    }

    /// Whether a paragraph of this kind may be broken across a page boundary
    pub fn splittable(self) -> bool {
        matches!(
            self.role(),
            KindRole::Body | KindRole::Dialogue | KindRole::Lyrics | KindRole::Unformatted
        )
    }

    /// Whether this kind must stay on the same page as the paragraph after it
    pub fn keeps_with_next(self) -> bool {
        matches!(
            self.role(),
            KindRole::SceneHeading | KindRole::Heading | KindRole::Character | KindRole::Parenthetical
        )
    }

    /// Whether this kind is excluded from printed output unless asked for
    pub fn is_non_printing(self) -> bool {
        matches!(self.role(), KindRole::Note | KindRole::Synopsis)
    }
}

impl fmt::Display for ParagraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.form(), self.slug())
    }
}
