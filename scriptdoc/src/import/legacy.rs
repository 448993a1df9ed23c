//! Legacy project importer
//!
//! Projects are SQLite databases whose `scenario` table holds the scenario
//! XML of the document; the XML is also accepted on its own. In the XML
//! every paragraph is an element named after its kind slug, with its text
//! in `<v>` and inline formatting as `<format from= length= .../>` ranges.
//! `*_header` / `*_footer` pairs delimit folders, acts and sequences.

use super::{decode_text, ImportError, ImportFormat, Importer, Sink};
use crate::cancel::CancelToken;
use crate::model::{
    CastMember, Document, GroupKind, Paragraph, RevisionMark, SceneNumber, TextRun, WritingForm,
};
use crate::xml::{tokenize, XmlEvent};
use rusqlite::{Connection, OpenFlags};
use std::collections::BTreeMap;
use std::io::Write;

/// Name of the table holding scenario XML
pub const SCENARIO_TABLE: &str = "scenario";

/// Structural group for a `*_header` / `*_footer` element prefix
pub fn group_for_prefix(prefix: &str) -> Option<GroupKind> {
    match prefix {
        "folder" => Some(GroupKind::Folder),
        "act" => Some(GroupKind::Act),
        "sequence" | "scene_group" => Some(GroupKind::Sequence),
        _ => None,
    }
}

/// Imports scenario XML
#[derive(Debug, Clone, Copy)]
pub struct ScenarioImporter {
    form: Option<WritingForm>,
}

impl ScenarioImporter {
    pub fn new(form: Option<WritingForm>) -> Self {
        Self { form }
    }
}

impl Importer for ScenarioImporter {
    fn format(&self) -> ImportFormat {
        ImportFormat::Scenario
    }

    fn parse_with(&self, bytes: &[u8], cancel: &CancelToken) -> Result<Document, ImportError> {
        parse_scenario(&decode_text(bytes), self.form, ImportFormat::Scenario, cancel)
    }
}

/// Imports project databases
#[derive(Debug, Clone, Copy)]
pub struct ProjectImporter {
    form: Option<WritingForm>,
}

impl ProjectImporter {
    pub fn new(form: Option<WritingForm>) -> Self {
        Self { form }
    }
}

impl Importer for ProjectImporter {
    fn format(&self) -> ImportFormat {
        ImportFormat::Project
    }

    fn parse_with(&self, bytes: &[u8], cancel: &CancelToken) -> Result<Document, ImportError> {
        // SQLite needs a file; copy the bytes to a private temporary one
        let mut file = tempfile::NamedTempFile::new().map_err(|source| ImportError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|source| ImportError::Io {
                path: file.path().to_path_buf(),
                source,
            })?;

        let xml = read_scenario(file.path())?;
        parse_scenario(&xml, self.form, ImportFormat::Project, cancel)
    }
}

fn read_scenario(path: &std::path::Path) -> Result<String, ImportError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let query = format!("SELECT text FROM {} ORDER BY id LIMIT 1", SCENARIO_TABLE);
    let mut statement = conn.prepare(&query).map_err(|e| {
        if e.to_string().contains("no such table") {
            ImportError::MissingPart {
                part: SCENARIO_TABLE.to_string(),
            }
        } else {
            ImportError::from(e)
        }
    })?;
    let text: String = statement.query_row([], |row| row.get(0))?;
    Ok(text)
}

#[derive(Debug)]
struct Element {
    name: String,
    attrs: BTreeMap<String, String>,
    text: String,
    formats: Vec<Format>,
}

#[derive(Debug, Clone, PartialEq)]
struct Format {
    from: usize,
    length: usize,
    run: TextRun,
}

fn flag(attrs: &BTreeMap<String, String>, key: &str) -> bool {
    attrs.get(key).is_some_and(|v| v == "true" || v == "1")
}

fn parse_scenario(
    xml: &str,
    form: Option<WritingForm>,
    format: ImportFormat,
    cancel: &CancelToken,
) -> Result<Document, ImportError> {
    let events = tokenize(xml);
    let declared = events.iter().find_map(|e| match e {
        XmlEvent::Start { name, attrs } if name == "scenario" => attrs.get("form").cloned(),
        _ => None,
    });
    let form = declared
        .as_deref()
        .and_then(WritingForm::from_slug)
        .or(form)
        .unwrap_or(WritingForm::Screenplay);
    let mut sink = Sink::new(form, format, cancel);

    let mut current: Option<Element> = None;
    let mut in_value = false;
    let mut section: Option<&str> = None;

    for event in &events {
        match event {
            XmlEvent::Start { name, attrs } | XmlEvent::Empty { name, attrs } => {
                let empty = matches!(event, XmlEvent::Empty { .. });
                if let Some(element) = current.as_mut() {
                    match name.as_str() {
                        "v" if !empty => in_value = true,
                        "format" => element.formats.push(parse_format(attrs)),
                        _ => {}
                    }
                    continue;
                }
                match (name.as_str(), section) {
                    ("scenario", _) | ("formats", _) => {}
                    ("title_page", _) | ("cast", _) => {
                        if !empty {
                            section = Some(if name == "cast" { "cast" } else { "title_page" });
                        }
                    }
                    ("entry", Some("title_page")) => {
                        if let (Some(key), Some(value)) = (attrs.get("key"), attrs.get("value")) {
                            sink.title_page_mut().set(key, value.as_str());
                        }
                    }
                    ("member", Some("cast")) => sink.add_cast_member(CastMember {
                        name: attrs.get("name").cloned().unwrap_or_default(),
                        description: attrs.get("description").cloned().unwrap_or_default(),
                        age: attrs.get("age").cloned(),
                        gender: attrs.get("gender").cloned(),
                    }),
                    _ => {
                        let element = Element {
                            name: name.clone(),
                            attrs: attrs.clone(),
                            text: String::new(),
                            formats: Vec::new(),
                        };
                        if empty {
                            finish(element, &mut sink)?;
                        } else {
                            current = Some(element);
                        }
                    }
                }
            }
            XmlEvent::Text(text) => {
                if let (true, Some(element)) = (in_value, current.as_mut()) {
                    element.text.push_str(text);
                }
            }
            XmlEvent::End { name } => {
                if name == "v" {
                    in_value = false;
                } else if current.as_ref().is_some_and(|e| &e.name == name) {
                    if let Some(element) = current.take() {
                        finish(element, &mut sink)?;
                    }
                } else if (name == "title_page" || name == "cast") && current.is_none() {
                    section = None;
                }
            }
        }
    }
    if let Some(element) = current.take() {
        log::warn!("{}: element <{}> was not closed", format, element.name);
        finish(element, &mut sink)?;
    }
    Ok(sink.finish())
}

fn parse_format(attrs: &BTreeMap<String, String>) -> Format {
    let number = |key: &str| attrs.get(key).and_then(|v| v.parse().ok()).unwrap_or(0);
    Format {
        from: number("from"),
        length: number("length"),
        run: TextRun {
            text: String::new(),
            bold: flag(attrs, "bold"),
            italic: flag(attrs, "italic"),
            underline: flag(attrs, "underline"),
            strikethrough: flag(attrs, "strike"),
            color: attrs.get("color").cloned(),
        },
    }
}

/// Apply format ranges to plain text; later ranges win where they overlap
fn apply_formats(text: &str, formats: &[Format]) -> Vec<TextRun> {
    let mut runs: Vec<TextRun> = Vec::new();
    for (index, c) in text.chars().enumerate() {
        let style = formats
            .iter()
            .rev()
            .find(|f| index >= f.from && index < f.from + f.length)
            .map(|f| f.run.clone())
            .unwrap_or_default();
        match runs.last_mut() {
            Some(last) if last.same_formatting(&style) => last.text.push(c),
            _ => runs.push(TextRun {
                text: c.to_string(),
                ..style
            }),
        }
    }
    runs
}

fn finish(element: Element, sink: &mut Sink<'_>) -> Result<(), ImportError> {
    let name = element.name.as_str();
    if let Some(prefix) = name.strip_suffix("_header") {
        if let Some(kind) = group_for_prefix(prefix) {
            let title = element
                .attrs
                .get("title")
                .cloned()
                .unwrap_or_else(|| element.text.trim().to_string());
            sink.open_group(kind, title);
            return Ok(());
        }
    }
    if let Some(prefix) = name.strip_suffix("_footer") {
        if group_for_prefix(prefix).is_some() {
            if sink.depth() > 0 {
                sink.close_group();
            } else {
                log::warn!("Ignoring unmatched <{}>", name);
            }
            return Ok(());
        }
    }

    let Some(kind) = sink.form().kind_from_slug(name) else {
        return sink.push_unformatted(element.text, &format!("unknown element <{}>", name));
    };
    let mut paragraph = Paragraph::with_runs(kind, apply_formats(&element.text, &element.formats));
    let attrs = &element.attrs;
    let a = &mut paragraph.attributes;
    a.number_lock = attrs.get("number").and_then(|n| SceneNumber::parse(n));
    a.skip_numbering = flag(attrs, "skip_numbering");
    a.story_day = attrs.get("story_day").cloned();
    a.color = attrs.get("color").cloned();
    a.continued = flag(attrs, "continued");
    a.dual_dialogue = flag(attrs, "dual");
    a.page_break_before = flag(attrs, "page_break");
    a.centered = flag(attrs, "centered");
    a.revision = attrs
        .get("revision")
        .and_then(|level| level.parse().ok())
        .map(|level| RevisionMark {
            level,
            color: attrs.get("revision_color").cloned(),
        });
    sink.push(paragraph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<scenario version="1.0" form="screenplay">
  <title_page><entry key="Title" value="Night Shift"/></title_page>
  <cast><member name="NORA" description="A nurse" age="34"/></cast>
  <folder_header title="Act One"/>
  <scene_heading number="3" story_day="Day 1"><v><![CDATA[INT. WARD - NIGHT]]></v></scene_heading>
  <action><v><![CDATA[Nora checks the chart.]]></v><formats><format from="5" length="6" bold="true"/></formats></action>
  <folder_footer/>
  <character continued="true"><v>NORA</v></character>
  <hologram><v>Beep.</v></hologram>
</scenario>"#;

    #[test]
    fn test_scenario_xml() {
        let doc = ScenarioImporter::new(None).parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(doc.form(), WritingForm::Screenplay);
        assert_eq!(doc.title_page.title(), Some("Night Shift"));
        assert_eq!(doc.cast[0].age.as_deref(), Some("34"));
        let kinds: Vec<&str> = doc.paragraphs().map(|p| p.kind().slug()).collect();
        assert_eq!(kinds, ["scene_heading", "action", "character", "unformatted"]);

        let heading = doc.paragraph(0).unwrap();
        assert_eq!(heading.attributes.number_lock, Some(SceneNumber::new(3)));
        assert_eq!(heading.attributes.story_day.as_deref(), Some("Day 1"));
        let action = doc.paragraph(1).unwrap();
        assert!(action.runs().iter().any(|r| r.bold && r.text == "checks"));
        assert!(doc.paragraph(2).unwrap().attributes.continued);
        assert!(matches!(&doc.nodes()[0], Node::Group(g) if g.children.len() == 2));
    }

    #[test]
    fn test_project_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.kitsp");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE scenario (id INTEGER PRIMARY KEY, text TEXT NOT NULL)")
            .unwrap();
        conn.execute("INSERT INTO scenario (text) VALUES (?1)", [SAMPLE]).unwrap();
        drop(conn);

        let bytes = std::fs::read(&path).unwrap();
        let doc = ProjectImporter::new(None).parse(&bytes).unwrap();
        assert_eq!(doc.len(), 4);
    }

    #[test]
    fn test_project_without_scenario_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.kitsp");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE other (id INTEGER)")
            .unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(matches!(
            ProjectImporter::new(None).parse(&bytes),
            Err(ImportError::MissingPart { .. })
        ));
    }

    #[test]
    fn test_not_a_database() {
        let result = ProjectImporter::new(None).parse(b"definitely not sqlite, just some text");
        assert!(matches!(result, Err(ImportError::ContainerOpen { .. })));
    }
}
