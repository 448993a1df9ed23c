//! Scene number representation

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Longest letter suffix a scene number can carry
pub const MAX_SUFFIX_LETTERS: u32 = 6;

/// Place value of the first suffix letter
const FIRST_PLACE: u32 = 27u32.pow(MAX_SUFFIX_LETTERS - 1);

/// Scene number such as `12`, `12A` or `12AB`
///
/// Lettered numbers are produced when a new scene has to be slotted in front
/// of a locked number. Ordering follows the printed order:
/// `4 < 4A < 4AA < 4AB < 4B < 5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SceneNumber {
    /// Numeric part
    pub value: u32,
    /// Suffix letters packed base 27, first letter most significant (0 = none)
    suffix: u32,
}

impl SceneNumber {
    /// Plain scene number without suffix
    pub fn new(value: u32) -> Self {
        Self { value, suffix: 0 }
    }

    /// Scene number with a single letter suffix (1 = A, 26 = Z)
    pub fn with_letter(value: u32, letter: u32) -> Self {
        Self {
            value,
            suffix: letter.clamp(1, 26) * FIRST_PLACE,
        }
    }

    /// Suffix letters as indices, 1 = A
    fn letters(&self) -> Vec<u32> {
        let mut letters = Vec::new();
        let mut place = FIRST_PLACE;
        while place > 0 {
            let letter = (self.suffix / place) % 27;
            if letter == 0 {
                break;
            }
            letters.push(letter);
            place /= 27;
        }
        letters
    }

    fn from_letters(value: u32, letters: &[u32]) -> Option<Self> {
        if letters.len() > MAX_SUFFIX_LETTERS as usize {
            return None;
        }
        let mut suffix = 0;
        let mut place = FIRST_PLACE;
        for &letter in letters {
            suffix += letter * place;
            place /= 27;
        }
        Some(Self { value, suffix })
    }

    /// Whether the number carries letters
    pub fn is_lettered(&self) -> bool {
        self.suffix != 0
    }

    /// The next lettered sibling (`4` → `4A`, `4A` → `4B`, `4Z` → `4ZA`)
    pub fn next_suffix(self) -> Option<Self> {
        let mut letters = self.letters();
        match letters.last_mut() {
            Some(last) if *last < 26 => *last += 1,
            _ => letters.push(1),
        }
        Self::from_letters(self.value, &letters)
    }

    /// The first number one letter deeper (`4A` → `4AA`)
    ///
    /// Sorts after `self` and before every later sibling of `self`.
    pub fn deeper(self) -> Option<Self> {
        let mut letters = self.letters();
        letters.push(1);
        Self::from_letters(self.value, &letters)
    }

    /// Parse a printed scene number
    ///
    /// Examples: "12" -> 12, "4A" -> 4 + A, "7aa" -> 7 + AA
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let digits_end = s
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        if digits_end == 0 {
            return None;
        }
        let value = s[..digits_end].parse::<u32>().ok()?;
        let letters = s[digits_end..]
            .chars()
            .map(|c| {
                c.is_ascii_alphabetic()
                    .then(|| (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1)
            })
            .collect::<Option<Vec<_>>>()?;
        Self::from_letters(value, &letters)
    }
}

impl fmt::Display for SceneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        for letter in self.letters() {
            write!(f, "{}", char::from(b'A' + (letter - 1) as u8))?;
        }
        Ok(())
    }
}

impl Serialize for SceneNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SceneNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SceneNumber::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid scene number '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!(SceneNumber::parse("12"), Some(SceneNumber::new(12)));
        assert_eq!(SceneNumber::parse("4A"), Some(SceneNumber::with_letter(4, 1)));
        assert_eq!(SceneNumber::parse("7aa").unwrap().to_string(), "7AA");
        assert_eq!(SceneNumber::parse("A4"), None);
        assert_eq!(SceneNumber::parse("4A-"), None);
        assert_eq!(SceneNumber::parse(""), None);
        assert_eq!(SceneNumber::parse("1ABCDEFG"), None);
        assert_eq!(SceneNumber::with_letter(3, 26).to_string(), "3Z");
        assert!(!SceneNumber::new(3).is_lettered());
    }

    #[test]
    fn test_ordering_follows_print_order() {
        let printed = ["4", "4A", "4AA", "4AB", "4AZ", "4AZA", "4B", "4Z", "5"];
        let numbers: Vec<SceneNumber> = printed
            .iter()
            .map(|s| SceneNumber::parse(s).unwrap())
            .collect();
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_next_and_deeper() {
        let four = SceneNumber::new(4);
        let four_a = four.next_suffix().unwrap();
        assert_eq!(four_a.to_string(), "4A");
        assert_eq!(four_a.next_suffix().unwrap().to_string(), "4B");
        assert_eq!(four_a.deeper().unwrap().to_string(), "4AA");
        let four_z = SceneNumber::parse("4Z").unwrap();
        assert_eq!(four_z.next_suffix().unwrap().to_string(), "4ZA");
        assert_eq!(SceneNumber::parse("4AAAAAA").unwrap().deeper(), None);
    }
}
