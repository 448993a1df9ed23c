//! Duration estimation
//!
//! Each enabled method (per page, per word, per character) estimates every
//! paragraph independently; [`blend_estimates`] combines the methods.

use super::metrics::Measurement;
use crate::model::KindRole;
use crate::template::{BlendWeights, DurationConfig};

/// Seconds estimated by each enabled method
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Estimates {
    pub page: Option<f64>,
    pub word: Option<f64>,
    pub character: Option<f64>,
}

impl Estimates {
    /// Component-wise sum; a method absent on either side stays absent
    pub fn add(self, other: Estimates) -> Estimates {
        fn sum(a: Option<f64>, b: Option<f64>) -> Option<f64> {
            match (a, b) {
                (Some(a), Some(b)) => Some(a + b),
                (a, None) => a,
                (None, b) => b,
            }
        }
        Estimates {
            page: sum(self.page, other.page),
            word: sum(self.word, other.word),
            character: sum(self.character, other.character),
        }
    }
}

/// Weighted mean of the enabled methods' estimates
///
/// Methods that are disabled (`None`) or weighted at zero or below do not
/// take part. If every enabled method has a non-positive weight the plain
/// mean is used. No enabled method gives zero.
pub fn blend_estimates(estimates: &Estimates, weights: &BlendWeights) -> f64 {
    let parts: Vec<(f64, f64)> = [
        (estimates.page, weights.page),
        (estimates.word, weights.word),
        (estimates.character, weights.character),
    ]
    .into_iter()
    .filter_map(|(estimate, weight)| estimate.map(|e| (e, weight)))
    .collect();

    if parts.is_empty() {
        return 0.0;
    }
    let total_weight: f64 = parts.iter().map(|(_, w)| w.max(0.0)).sum();
    if total_weight <= 0.0 {
        return parts.iter().map(|(e, _)| e).sum::<f64>() / parts.len() as f64;
    }
    parts.iter().map(|(e, w)| e * w.max(0.0)).sum::<f64>() / total_weight
}

/// Per-method estimates for one measured paragraph
///
/// `page_height` is the printable height used by the per-page method.
pub fn paragraph_estimates(
    config: &DurationConfig,
    measurement: &Measurement,
    page_height: f32,
) -> Estimates {
    if !measurement.printable {
        return Estimates {
            page: config.per_page.as_ref().map(|_| 0.0),
            word: config.per_word.as_ref().map(|_| 0.0),
            character: config.per_character.as_ref().map(|_| 0.0),
        };
    }

    let role = measurement.kind.role();
    let weight = match role {
        KindRole::Body => config.weights.action,
        KindRole::Character | KindRole::Parenthetical | KindRole::Dialogue => {
            config.weights.dialogue
        }
        KindRole::Lyrics => config.weights.lyrics,
        _ => config.weights.other,
    };
    let heading = if role == KindRole::SceneHeading {
        config.weights.heading_seconds
    } else {
        0.0
    };

    let page = config.per_page.as_ref().map(|rate| {
        let height = f64::from(measurement.space_before + measurement.text_height());
        let share = if page_height > 0.0 {
            height / f64::from(page_height)
        } else {
            0.0
        };
        share * rate.seconds_per_page * weight + heading
    });
    let word = config.per_word.as_ref().map(|rate| {
        let minutes = if rate.words_per_minute > 0.0 {
            measurement.words as f64 / rate.words_per_minute
        } else {
            0.0
        };
        minutes * 60.0 * weight + heading
    });
    let character = config.per_character.as_ref().map(|rate| {
        let count = if rate.count_spaces {
            measurement.characters
        } else {
            measurement.characters_no_spaces
        };
        let seconds = if rate.characters_per_second > 0.0 {
            count as f64 / rate.characters_per_second
        } else {
            0.0
        };
        seconds * weight + heading
    });

    Estimates {
        page,
        word,
        character,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Paragraph, ParagraphKind, ScreenplayKind, WritingForm};
    use crate::template::{builtin, CharacterRate, WordRate};

    #[test]
    fn test_blend_is_weighted_mean_of_enabled_methods() {
        let estimates = Estimates {
            page: Some(60.0),
            word: Some(30.0),
            character: None,
        };
        let even = BlendWeights::default();
        assert_eq!(blend_estimates(&estimates, &even), 45.0);

        let page_heavy = BlendWeights {
            page: 3.0,
            word: 1.0,
            character: 100.0,
        };
        assert_eq!(blend_estimates(&estimates, &page_heavy), 52.5);
    }

    #[test]
    fn test_blend_edge_cases() {
        assert_eq!(blend_estimates(&Estimates::default(), &BlendWeights::default()), 0.0);
        let zero = BlendWeights {
            page: 0.0,
            word: 0.0,
            character: 0.0,
        };
        let estimates = Estimates {
            page: Some(10.0),
            word: Some(20.0),
            character: None,
        };
        assert_eq!(blend_estimates(&estimates, &zero), 15.0);
    }

    #[test]
    fn test_full_page_of_action_is_a_minute() {
        let template = builtin::fallback(WritingForm::Screenplay).unwrap();
        let text = "word ".repeat(12 * 54);
        let p = Paragraph::new(ParagraphKind::Screenplay(ScreenplayKind::Action), text);
        let mut m = Measurement::measure(0, &p, &template, false).unwrap();
        m.space_before = 0.0;
        m.lines.truncate(54);
        let estimates = paragraph_estimates(&template.duration, &m, template.page.printable_height());
        assert!((estimates.page.unwrap() - 60.0).abs() < 1e-6);
        assert!(estimates.word.is_none());
    }

    #[test]
    fn test_word_and_character_methods() {
        let template = builtin::fallback(WritingForm::Screenplay).unwrap();
        let mut config = template.duration.clone();
        config.per_page = None;
        config.per_word = Some(WordRate {
            words_per_minute: 120.0,
        });
        config.per_character = Some(CharacterRate {
            characters_per_second: 10.0,
            count_spaces: false,
        });
        config.weights.heading_seconds = 3.0;

        let p = Paragraph::new(
            ParagraphKind::Screenplay(ScreenplayKind::SceneHeading),
            "INT. HOUSE - DAY",
        );
        let m = Measurement::measure(0, &p, &template, false).unwrap();
        let estimates = paragraph_estimates(&config, &m, 648.0);
        assert_eq!(estimates.word, Some(4.0 / 120.0 * 60.0 + 3.0));
        assert_eq!(estimates.character, Some(13.0 / 10.0 + 3.0));
    }
}
