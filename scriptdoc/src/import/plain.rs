//! Plain text importer
//!
//! Blank lines separate blocks. Every line of a block is classified with
//! the block's next line as lookahead, so an isolated capitalised line
//! directly above text becomes a character cue.

use super::classify::Classifier;
use super::{decode_text, ImportError, ImportFormat, Importer, Sink};
use crate::cancel::CancelToken;
use crate::model::{Document, Paragraph, WritingForm};

/// Imports untyped text for one writing form
#[derive(Debug, Clone, Copy)]
pub struct PlainTextImporter {
    form: WritingForm,
}

impl PlainTextImporter {
    pub fn new(form: WritingForm) -> Self {
        Self { form }
    }
}

impl Importer for PlainTextImporter {
    fn format(&self) -> ImportFormat {
        ImportFormat::Text
    }

    fn parse_with(&self, bytes: &[u8], cancel: &CancelToken) -> Result<Document, ImportError> {
        let text = decode_text(bytes);
        let mut sink = Sink::new(self.form, ImportFormat::Text, cancel);
        let mut classifier = Classifier::new(self.form);

        for block in blocks(&text) {
            classifier.reset();
            for (i, line) in block.iter().enumerate() {
                if is_garbled(line) {
                    sink.push_unformatted(line.trim(), "undecodable characters")?;
                    classifier.reset();
                    continue;
                }
                for item in classifier.classify(line, block.get(i + 1).copied()) {
                    sink.push(Paragraph::new(item.kind, item.text))?;
                }
            }
        }
        Ok(sink.finish())
    }
}

/// Groups of consecutive non-blank lines; form feeds count as blank
fn blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.split(['\n', '\x0c']) {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Lines that came out of a lossy decode or hold control characters
fn is_garbled(line: &str) -> bool {
    line.chars()
        .any(|c| c == '\u{fffd}' || (c.is_control() && c != '\t'))
}
