//! Pure per-paragraph text rules
//!
//! Every rule maps text to text and is idempotent on its own output.

use crate::model::TextRun;

/// Collapse runs of spaces and tabs, trim both ends of the paragraph
pub fn collapse_whitespace(runs: &[TextRun]) -> Vec<TextRun> {
    let mut out: Vec<TextRun> = Vec::with_capacity(runs.len());
    let mut previous_space = true;
    for run in runs {
        let mut text = String::with_capacity(run.text.len());
        for c in run.text.chars() {
            let c = if c == '\t' || c == '\u{a0}' { ' ' } else { c };
            if c == ' ' {
                if !previous_space {
                    text.push(' ');
                }
                previous_space = true;
            } else {
                text.push(c);
                previous_space = false;
            }
        }
        out.push(TextRun {
            text,
            ..run.clone()
        });
    }

    // Trailing space can only sit at the end of the last non-empty run
    if let Some(last) = out.iter_mut().rev().find(|run| !run.text.is_empty()) {
        let trimmed = last.text.trim_end_matches(' ').len();
        last.text.truncate(trimmed);
    }
    out
}

/// Replace three consecutive periods with an ellipsis character
pub fn collapse_ellipsis(text: &str) -> String {
    text.replace("...", "\u{2026}")
}

/// Replace straight quotes with typographic ones
///
/// `previous` is the character before `text` (from an earlier run), if any.
/// A quote opens after whitespace, an opening bracket or a dash, and closes
/// otherwise; an apostrophe inside a word becomes a right single quote.
pub fn curl_quotes(text: &str, previous: Option<char>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = previous;
    for c in text.chars() {
        let opening = prev.map_or(true, |p| {
            p.is_whitespace()
                || matches!(
                    p,
                    '(' | '[' | '{' | '\u{201c}' | '\u{2018}' | '\u{2014}' | '\u{2013}' | '-'
                )
        });
        let replaced = match c {
            '"' if opening => '\u{201c}',
            '"' => '\u{201d}',
            '\'' if opening => '\u{2018}',
            '\'' => '\u{2019}',
            other => other,
        };
        out.push(replaced);
        prev = Some(replaced);
    }
    out
}

/// Wrap parenthetical text in parentheses
pub fn wrap_parenthetical(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(trimmed.len() + 2);
    if !trimmed.starts_with('(') {
        out.push('(');
    }
    out.push_str(trimmed);
    if !trimmed.ends_with(')') {
        out.push(')');
    }
    out
}

/// Strip a trailing continuation marker from a character cue
///
/// Returns the cue without the marker and whether one was present. Both
/// straight and curly apostrophes are recognised, as is the template's
/// own `continued_text`.
pub fn strip_continued_marker(text: &str, continued_text: &str) -> (String, bool) {
    let trimmed = text.trim_end();
    let upper = trimmed.to_uppercase();
    let custom = format!("({})", continued_text.to_uppercase());
    for marker in ["(CONT'D)", "(CONT\u{2019}D)", "(CONT.)", custom.as_str()] {
        if upper.ends_with(marker) {
            // Uppercasing can change byte lengths; cut by characters
            let keep = upper.chars().count() - marker.chars().count();
            let stripped: String = trimmed.chars().take(keep).collect();
            return (stripped.trim_end().to_string(), true);
        }
    }
    (trimmed.to_string(), false)
}

/// Speaker name of a character cue: extensions, markers and forcing
/// prefixes removed, uppercased
pub fn character_name(cue: &str) -> String {
    let mut name = cue.trim().trim_start_matches('@').trim_end_matches('^').trim();
    while name.ends_with(')') {
        match name.rfind('(') {
            Some(open) => name = name[..open].trim_end(),
            None => break,
        }
    }
    name.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace_across_runs() {
        let runs = vec![
            TextRun::new("  Hello \t "),
            TextRun {
                bold: true,
                ..TextRun::new(" world  ")
            },
        ];
        let out = collapse_whitespace(&runs);
        assert_eq!(out[0].text, "Hello ");
        assert_eq!(out[1].text, "world");
    }

    #[test]
    fn test_curl_quotes() {
        assert_eq!(
            curl_quotes("She said \"don't\" twice.", None),
            "She said \u{201c}don\u{2019}t\u{201d} twice."
        );
        assert_eq!(curl_quotes("'Tis", None), "\u{2018}Tis");
        assert_eq!(curl_quotes("\"", Some('d')), "\u{201d}");
    }

    #[test]
    fn test_rules_are_idempotent() {
        let samples = [
            "Wait... what?",
            "\"Quoted\" and 'single' and it's",
            "....",
            "(beat)",
            "softly",
            "",
        ];
        for sample in samples {
            let once = curl_quotes(&collapse_ellipsis(sample), None);
            let twice = curl_quotes(&collapse_ellipsis(&once), None);
            assert_eq!(once, twice, "{sample}");
            assert_eq!(wrap_parenthetical(&wrap_parenthetical(sample)), wrap_parenthetical(sample));
        }
    }

    #[test]
    fn test_wrap_parenthetical() {
        assert_eq!(wrap_parenthetical("softly"), "(softly)");
        assert_eq!(wrap_parenthetical(" (beat) "), "(beat)");
        assert_eq!(wrap_parenthetical("(to Anna"), "(to Anna)");
    }

    #[test]
    fn test_strip_continued_marker() {
        assert_eq!(
            strip_continued_marker("ANNA (CONT'D)", "CONT'D"),
            ("ANNA".to_string(), true)
        );
        assert_eq!(
            strip_continued_marker("anna (cont\u{2019}d)", "CONT'D"),
            ("anna".to_string(), true)
        );
        assert_eq!(
            strip_continued_marker("ANNA (SUITE)", "SUITE"),
            ("ANNA".to_string(), true)
        );
        assert_eq!(
            strip_continued_marker("ANNA (V.O.)", "CONT'D"),
            ("ANNA (V.O.)".to_string(), false)
        );
    }

    #[test]
    fn test_character_name() {
        assert_eq!(character_name("Anna (V.O.) (CONT'D)"), "ANNA");
        assert_eq!(character_name("@McCLANE"), "MCCLANE");
        assert_eq!(character_name("BOB ^"), "BOB");
    }
}
