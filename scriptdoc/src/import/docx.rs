//! Word-processor (DOCX) importer
//!
//! Paragraph styles named `{form}_{kind}` are mapped straight back to
//! their paragraph kind. Documents without those styles go through the
//! plain text classifier, keeping run formatting where a paragraph is
//! classified as a whole.

use super::classify::Classifier;
use super::fdx::apply_title_page;
use super::{ImportError, ImportFormat, Importer, Sink};
use crate::cancel::CancelToken;
use crate::export::docx::TITLE_PAGE_STYLE;
use crate::model::{runs_text, Document, Paragraph, ParagraphKind, TextRun, WritingForm};
use crate::xml::{tokenize, XmlEvent};
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

/// Main document part of a word-processor archive
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Imports styled or unstyled DOCX documents
#[derive(Debug, Clone, Copy)]
pub struct DocxImporter {
    form: Option<WritingForm>,
}

impl DocxImporter {
    pub fn new(form: Option<WritingForm>) -> Self {
        Self { form }
    }
}

/// Style id used for a paragraph kind in exported documents
pub fn style_id(kind: ParagraphKind) -> String {
    format!("{}_{}", kind.form().slug(), kind.slug())
}

/// Paragraph kind for a style id, if it names one
pub fn kind_for_style(style: &str) -> Option<ParagraphKind> {
    WritingForm::ALL.into_iter().find_map(|form| {
        style
            .strip_prefix(form.slug())
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|slug| form.kind_from_slug(slug))
    })
}

/// Read one archive member as text
pub(crate) fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<String, ImportError> {
    let mut file = archive.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => ImportError::MissingPart {
            part: name.to_string(),
        },
        other => ImportError::from(other),
    })?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|source| ImportError::Io {
            path: name.into(),
            source,
        })?;
    Ok(content)
}

#[derive(Debug, Default)]
struct RawParagraph {
    style: Option<String>,
    runs: Vec<TextRun>,
    centered: bool,
    page_break: bool,
}

impl Importer for DocxImporter {
    fn format(&self) -> ImportFormat {
        ImportFormat::Docx
    }

    fn parse_with(&self, bytes: &[u8], cancel: &CancelToken) -> Result<Document, ImportError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let xml = read_part(&mut archive, DOCUMENT_PART)?;
        let raws = collect_paragraphs(&xml);

        let form = raws
            .iter()
            .filter_map(|r| r.style.as_deref().and_then(kind_for_style))
            .map(|kind| kind.form())
            .next()
            .or(self.form)
            .unwrap_or(WritingForm::Screenplay);
        log::debug!("DOCX with {} paragraphs read as {}", raws.len(), form.slug());

        let mut sink = Sink::new(form, ImportFormat::Docx, cancel);
        let (title, raws): (Vec<_>, Vec<_>) = raws
            .into_iter()
            .partition(|r| r.style.as_deref() == Some(TITLE_PAGE_STYLE));
        let title_lines: Vec<String> = title.iter().map(|r| runs_text(&r.runs)).collect();
        apply_title_page(&title_lines, &mut sink);

        let mut classifier = Classifier::new(form);
        let texts: Vec<String> = raws.iter().map(|r| runs_text(&r.runs)).collect();

        for (i, raw) in raws.into_iter().enumerate() {
            let text = &texts[i];
            match raw.style.as_deref().and_then(kind_for_style) {
                Some(kind) if kind.form() == form => {
                    classifier.reset();
                    sink.push(finish(kind, raw))?;
                }
                Some(kind) => {
                    let reason = format!("style of another form ({})", kind.form().slug());
                    sink.push_unformatted(text.as_str(), &reason)?;
                }
                None if text.trim().is_empty() => classifier.reset(),
                None => {
                    let next = texts
                        .get(i + 1)
                        .map(String::as_str)
                        .filter(|t| !t.trim().is_empty());
                    let mut items = classifier.classify(text, next);
                    if items.len() == 1 && items[0].text == text.trim() {
                        let kind = items[0].kind;
                        let mut runs = raw.runs.clone();
                        trim_runs(&mut runs);
                        sink.push(finish(kind, RawParagraph { runs, ..raw }))?;
                    } else {
                        for item in items.drain(..) {
                            sink.push(Paragraph::new(item.kind, item.text))?;
                        }
                    }
                }
            }
        }
        Ok(sink.finish())
    }
}

fn finish(kind: ParagraphKind, raw: RawParagraph) -> Paragraph {
    let mut paragraph = Paragraph::with_runs(kind, raw.runs);
    paragraph.attributes.centered = raw.centered;
    paragraph.attributes.page_break_before = raw.page_break;
    paragraph
}

/// Strip leading and trailing whitespace across the run list
fn trim_runs(runs: &mut Vec<TextRun>) {
    if let Some(first) = runs.first_mut() {
        first.text = first.text.trim_start().to_string();
    }
    if let Some(last) = runs.last_mut() {
        last.text = last.text.trim_end().to_string();
    }
    runs.retain(|r| !r.text.is_empty());
}

/// Boolean run property: present unless `w:val` turns it off
fn toggled(event: &XmlEvent) -> bool {
    !matches!(event.attr("val"), Some("0") | Some("false") | Some("none"))
}

fn collect_paragraphs(xml: &str) -> Vec<RawParagraph> {
    let mut paragraphs = Vec::new();
    let mut paragraph: Option<RawParagraph> = None;
    let mut run: Option<TextRun> = None;
    let mut in_text = false;

    for event in tokenize(xml) {
        match &event {
            XmlEvent::Start { .. } | XmlEvent::Empty { .. } => {
                let empty = matches!(event, XmlEvent::Empty { .. });
                let name = event.local_name().unwrap_or_default();
                match (name, paragraph.as_mut(), run.as_mut()) {
                    ("p", _, _) => {
                        let raw = RawParagraph::default();
                        if empty {
                            paragraphs.push(raw);
                        } else {
                            paragraph = Some(raw);
                        }
                    }
                    ("pStyle", Some(p), _) => p.style = event.attr("val").map(str::to_string),
                    ("jc", Some(p), _) => p.centered = event.attr("val") == Some("center"),
                    ("pageBreakBefore", Some(p), _) => p.page_break = toggled(&event),
                    ("r", Some(_), _) if !empty => run = Some(TextRun::default()),
                    ("b", _, Some(r)) => r.bold = toggled(&event),
                    ("i", _, Some(r)) => r.italic = toggled(&event),
                    ("u", _, Some(r)) => r.underline = toggled(&event),
                    ("strike", _, Some(r)) => r.strikethrough = toggled(&event),
                    ("color", _, Some(r)) => {
                        r.color = event
                            .attr("val")
                            .filter(|v| *v != "auto")
                            .map(|v| format!("#{}", v.trim_start_matches('#')));
                    }
                    ("t", _, Some(_)) => in_text = !empty,
                    ("tab", _, Some(r)) => r.text.push('\t'),
                    ("br", Some(p), Some(r)) => {
                        if event.attr("type") == Some("page") {
                            p.page_break = true;
                        } else {
                            r.text.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            XmlEvent::Text(text) => {
                if let (true, Some(r)) = (in_text, run.as_mut()) {
                    r.text.push_str(text);
                }
            }
            XmlEvent::End { .. } => match event.local_name().unwrap_or_default() {
                "t" => in_text = false,
                "r" => {
                    if let (Some(r), Some(p)) = (run.take(), paragraph.as_mut()) {
                        if !r.text.is_empty() {
                            p.runs.push(r);
                        }
                    }
                }
                "p" => paragraphs.extend(paragraph.take()),
                _ => {}
            },
        }
    }
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScreenplayKind;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(document: &str) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(DOCUMENT_PART, SimpleFileOptions::default()).unwrap();
        zip.write_all(document.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn body(paragraphs: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            paragraphs
        )
    }

    #[test]
    fn test_styled_paragraphs() {
        let xml = body(
            r#"<w:p><w:pPr><w:pStyle w:val="screenplay_scene_heading"/></w:pPr><w:r><w:t>INT. DOCK - DAY</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="screenplay_action"/></w:pPr><w:r><w:t xml:space="preserve">Gulls </w:t></w:r><w:r><w:rPr><w:i/><w:color w:val="FF0000"/></w:rPr><w:t>scream</w:t></w:r></w:p>"#,
        );
        let doc = DocxImporter::new(None).parse(&archive(&xml)).unwrap();
        assert_eq!(doc.form(), WritingForm::Screenplay);
        assert_eq!(doc.len(), 2);
        let action = doc.paragraph(1).unwrap();
        assert_eq!(action.kind(), ParagraphKind::Screenplay(ScreenplayKind::Action));
        assert_eq!(action.text(), "Gulls scream");
        let styled = &action.runs()[1];
        assert!(styled.italic);
        assert_eq!(styled.color.as_deref(), Some("#FF0000"));
    }

    #[test]
    fn test_unstyled_paragraphs_are_classified() {
        let xml = body(
            r#"<w:p><w:r><w:t>EXT. FIELD - DAY</w:t></w:r></w:p><w:p/>
<w:p><w:r><w:t>ANNA</w:t></w:r></w:p><w:p><w:r><w:t>Run!</w:t></w:r></w:p>"#,
        );
        let doc = DocxImporter::new(Some(WritingForm::Screenplay))
            .parse(&archive(&xml))
            .unwrap();
        let kinds: Vec<&str> = doc.paragraphs().map(|p| p.kind().slug()).collect();
        assert_eq!(kinds, ["scene_heading", "character", "dialogue"]);
    }

    #[test]
    fn test_style_form_wins_over_option() {
        let xml = body(
            r#"<w:p><w:pPr><w:pStyle w:val="novel_chapter_heading"/></w:pPr><w:r><w:t>One</w:t></w:r></w:p>"#,
        );
        let doc = DocxImporter::new(Some(WritingForm::Screenplay))
            .parse(&archive(&xml))
            .unwrap();
        assert_eq!(doc.form(), WritingForm::Novel);
    }

    #[test]
    fn test_broken_archive() {
        let result = DocxImporter::new(None).parse(b"PK\x03\x04 this is not a real archive");
        assert!(matches!(result, Err(ImportError::ArchiveOpen { .. })));
    }

    #[test]
    fn test_missing_document_part() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/styles.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<w:styles/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(matches!(
            DocxImporter::new(None).parse(&bytes),
            Err(ImportError::MissingPart { part }) if part == DOCUMENT_PART
        ));
    }
}
