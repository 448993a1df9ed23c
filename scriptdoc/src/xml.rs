//! Minimal XML tokenizer and escaping
//!
//! The interchange formats (FDX, scenario XML, OOXML parts) only need a
//! flat stream of start/end tags and text. Anything that does not look
//! like markup is passed through as text, so a damaged file still yields
//! its words.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--.*?-->|<!\[CDATA\[(?P<cdata>.*?)\]\]>|<\?.*?\?>|<!DOCTYPE[^>]*>|<(?P<close>/?)(?P<name>[A-Za-z_][\w:.-]*)(?P<attrs>(?:\s+[\w:.-]+\s*=\s*(?:"[^"]*"|'[^']*'))*)\s*(?P<empty>/?)>"#,
    )
    .expect("Invalid markup regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("Invalid attribute regex")
});

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|[A-Za-z]+);").expect("Invalid entity regex"));

/// One token of an XML stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    Start {
        name: String,
        attrs: BTreeMap<String, String>,
    },
    /// `<name/>`
    Empty {
        name: String,
        attrs: BTreeMap<String, String>,
    },
    End {
        name: String,
    },
    Text(String),
}

impl XmlEvent {
    /// Local name of a tag without its namespace prefix
    pub fn local_name(&self) -> Option<&str> {
        match self {
            XmlEvent::Start { name, .. } | XmlEvent::Empty { name, .. } | XmlEvent::End { name } => {
                Some(name.rsplit(':').next().unwrap_or(name))
            }
            XmlEvent::Text(_) => None,
        }
    }

    /// Attribute by local name
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            XmlEvent::Start { attrs, .. } | XmlEvent::Empty { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| *k == key || k.rsplit(':').next() == Some(key))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Split a document into tags and text
///
/// Comments, processing instructions and doctype declarations are dropped.
/// Whitespace-only text between tags is kept; callers decide whether it
/// matters.
pub fn tokenize(xml: &str) -> Vec<XmlEvent> {
    let mut events = Vec::new();
    let mut last = 0;
    for caps in MARKUP.captures_iter(xml) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            events.push(XmlEvent::Text(unescape(&xml[last..whole.start()])));
        }
        last = whole.end();

        if let Some(cdata) = caps.name("cdata") {
            events.push(XmlEvent::Text(cdata.as_str().to_string()));
            continue;
        }
        let Some(name) = caps.name("name") else {
            continue;
        };
        let name = name.as_str().to_string();
        let closing = caps.name("close").is_some_and(|m| !m.as_str().is_empty());
        let empty = caps.name("empty").is_some_and(|m| !m.as_str().is_empty());
        if closing {
            events.push(XmlEvent::End { name });
            continue;
        }
        let attrs = caps
            .name("attrs")
            .map(|m| parse_attributes(m.as_str()))
            .unwrap_or_default();
        if empty {
            events.push(XmlEvent::Empty { name, attrs });
        } else {
            events.push(XmlEvent::Start { name, attrs });
        }
    }
    if last < xml.len() {
        events.push(XmlEvent::Text(unescape(&xml[last..])));
    }
    events
}

fn parse_attributes(source: &str) -> BTreeMap<String, String> {
    ATTRIBUTE
        .captures_iter(source)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_string();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
            Some((key, unescape(value)))
        })
        .collect()
}

/// Resolve the predefined and numeric character entities
pub fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let resolved = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse().ok()
                    } else {
                        None
                    };
                    code.and_then(char::from_u32)
                }
            };
            match resolved {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Escape special XML characters
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_and_text() {
        let events = tokenize(
            r#"<?xml version="1.0"?><!-- c --><a x="1" y='two'><b/>Tom &amp; Jerry</a>"#,
        );
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].local_name(), Some("a"));
        assert_eq!(events[0].attr("y"), Some("two"));
        assert!(matches!(&events[1], XmlEvent::Empty { name, .. } if name == "b"));
        assert_eq!(events[2], XmlEvent::Text("Tom & Jerry".to_string()));
        assert_eq!(events[3], XmlEvent::End { name: "a".to_string() });
    }

    #[test]
    fn test_namespaced_attribute_lookup() {
        let events = tokenize(r#"<w:pStyle w:val="Heading1"/>"#);
        assert_eq!(events[0].local_name(), Some("pStyle"));
        assert_eq!(events[0].attr("val"), Some("Heading1"));
    }

    #[test]
    fn test_broken_markup_is_text() {
        let events = tokenize("<p>a < b</p>");
        assert_eq!(events[1], XmlEvent::Text("a < b".to_string()));
    }

    #[test]
    fn test_entities() {
        assert_eq!(unescape("&#65;&#x42;&lt;&bogus;"), "AB<&bogus;");
        assert_eq!(escape("<\"a\" & 'b'>"), "&lt;&quot;a&quot; &amp; &apos;b&apos;&gt;");
    }
}
