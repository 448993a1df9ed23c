//! Legacy project exporters: scenario XML and the SQLite project container

use super::{ExportError, ExportFormat, ExportJob, Exporter, Item};
use crate::cancel::CancelToken;
use crate::import::legacy::SCENARIO_TABLE;
use crate::model::{GroupKind, Paragraph};
use crate::xml::escape;
use rusqlite::Connection;
use std::fmt::Write;

/// Writes scenario XML
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioExporter;

/// Writes a project database holding the scenario XML
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectExporter;

/// Element prefix of a structural group
fn group_prefix(kind: GroupKind) -> &'static str {
    match kind {
        GroupKind::Folder => "folder",
        GroupKind::Act => "act",
        GroupKind::Sequence => "sequence",
    }
}

/// CDATA section, splitting any `]]>` in the text
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

impl Exporter for ScenarioExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Scenario
    }

    fn export_with(&self, job: &ExportJob<'_>, cancel: &CancelToken) -> Result<Vec<u8>, ExportError> {
        Ok(scenario_xml(job, cancel)?.into_bytes())
    }
}

impl Exporter for ProjectExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Project
    }

    fn export_with(&self, job: &ExportJob<'_>, cancel: &CancelToken) -> Result<Vec<u8>, ExportError> {
        let xml = scenario_xml(job, cancel)?;
        let file = tempfile::NamedTempFile::new().map_err(|source| ExportError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        let sqlite = |e: rusqlite::Error| ExportError::Encode {
            format: "project",
            message: e.to_string(),
        };
        {
            let conn = Connection::open(file.path()).map_err(sqlite)?;
            conn.execute_batch(&format!(
                "CREATE TABLE {} (id INTEGER PRIMARY KEY, text TEXT NOT NULL)",
                SCENARIO_TABLE
            ))
            .map_err(sqlite)?;
            conn.execute(
                &format!("INSERT INTO {} (text) VALUES (?1)", SCENARIO_TABLE),
                [xml.as_str()],
            )
            .map_err(sqlite)?;
            conn.close().map_err(|(_, e)| sqlite(e))?;
        }
        std::fs::read(file.path()).map_err(|source| ExportError::Io {
            path: file.path().to_path_buf(),
            source,
        })
    }
}

fn scenario_xml(job: &ExportJob<'_>, cancel: &CancelToken) -> Result<String, ExportError> {
    let document = job.document;
    let mut xml = format!(
        "<?xml version=\"1.0\"?>\n<scenario version=\"1.0\" form=\"{}\">\n",
        document.form().slug()
    );

    if job.title_page() {
        xml.push_str("  <title_page>\n");
        for entry in &document.title_page.entries {
            let _ = writeln!(
                xml,
                "    <entry key=\"{}\" value=\"{}\"/>",
                escape(&entry.key),
                escape(&entry.value)
            );
        }
        xml.push_str("  </title_page>\n");
    }
    if !document.cast.is_empty() {
        xml.push_str("  <cast>\n");
        for member in &document.cast {
            let mut attrs = format!(
                " name=\"{}\" description=\"{}\"",
                escape(&member.name),
                escape(&member.description)
            );
            if let Some(age) = &member.age {
                let _ = write!(attrs, " age=\"{}\"", escape(age));
            }
            if let Some(gender) = &member.gender {
                let _ = write!(attrs, " gender=\"{}\"", escape(gender));
            }
            let _ = writeln!(xml, "    <member{}/>", attrs);
        }
        xml.push_str("  </cast>\n");
    }

    for item in job.items() {
        match item {
            Item::Open { group, depth } => {
                let _ = writeln!(
                    xml,
                    "{}<{}_header title=\"{}\"/>",
                    "  ".repeat(depth + 1),
                    group_prefix(group.kind),
                    escape(&group.title)
                );
            }
            Item::Close { group, depth } => {
                let _ = writeln!(
                    xml,
                    "{}<{}_footer/>",
                    "  ".repeat(depth + 1),
                    group_prefix(group.kind)
                );
            }
            Item::Paragraph { paragraph, .. } => {
                job.check(cancel)?;
                xml.push_str(&paragraph_xml(job, paragraph));
            }
        }
    }
    xml.push_str("</scenario>\n");
    Ok(xml)
}

fn paragraph_xml(job: &ExportJob<'_>, paragraph: &Paragraph) -> String {
    let a = &paragraph.attributes;
    let mut attrs = String::new();
    if let Some(number) = a.number_lock {
        let _ = write!(attrs, " number=\"{}\"", number);
    }
    let flags = [
        (a.skip_numbering, "skip_numbering"),
        (a.continued, "continued"),
        (a.dual_dialogue, "dual"),
        (a.page_break_before, "page_break"),
        (a.centered, "centered"),
    ];
    for (_, name) in flags.iter().filter(|(on, _)| *on) {
        let _ = write!(attrs, " {}=\"true\"", name);
    }
    if let Some(day) = &a.story_day {
        let _ = write!(attrs, " story_day=\"{}\"", escape(day));
    }
    if let Some(color) = &a.color {
        let _ = write!(attrs, " color=\"{}\"", escape(color));
    }
    if let Some(mark) = job.revision(paragraph) {
        let _ = write!(attrs, " revision=\"{}\"", mark.level);
        if let Some(color) = &mark.color {
            let _ = write!(attrs, " revision_color=\"{}\"", escape(color));
        }
    }

    let name = paragraph.kind().slug();
    let mut xml = format!("  <{}{}><v>{}</v>", name, attrs, cdata(&paragraph.text()));
    let mut formats = String::new();
    let mut from = 0;
    for run in paragraph.runs() {
        let length = run.char_len();
        if run.has_formatting() {
            let _ = write!(formats, "<format from=\"{}\" length=\"{}\"", from, length);
            for (on, key) in [
                (run.bold, "bold"),
                (run.italic, "italic"),
                (run.underline, "underline"),
                (run.strikethrough, "strike"),
            ] {
                if on {
                    let _ = write!(formats, " {}=\"true\"", key);
                }
            }
            if let Some(color) = &run.color {
                let _ = write!(formats, " color=\"{}\"", escape(color));
            }
            formats.push_str("/>");
        }
        from += length;
    }
    if !formats.is_empty() {
        let _ = write!(xml, "<formats>{}</formats>", formats);
    }
    let _ = writeln!(xml, "</{}>", name);
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::fixture;
    use crate::export::ExportOptions;
    use crate::import::legacy::{ProjectImporter, ScenarioImporter};
    use crate::import::Importer;
    use crate::model::{CastMember, SceneNumber, TextRun};

    #[test]
    fn test_scenario_round_trip() {
        let (mut document, template, layout) = fixture();
        document.cast.push(CastMember {
            name: "MARTA".to_string(),
            description: "Harbour pilot".to_string(),
            age: Some("41".to_string()),
            gender: None,
        });
        let mut attributes = document.paragraph(7).unwrap().attributes.clone();
        attributes.number_lock = Some(SceneNumber::with_letter(2, 1));
        document.set_attributes(7, attributes).unwrap();
        let mut runs = vec![TextRun::new("Fog rolls over the ")];
        runs.push(TextRun {
            italic: true,
            ..TextRun::new("pier")
        });
        runs.push(TextRun::new(". ]]> stays"));
        let mut action = document.paragraph(2).unwrap().clone();
        action.set_runs(runs);
        document.replace(2, action.clone()).unwrap();

        let options = ExportOptions::default();
        let job = ExportJob::new(&document, &template, &layout, &options);
        let bytes = ScenarioExporter.export(&job).unwrap();
        let back = ScenarioImporter::new(None).parse(&bytes).unwrap();

        assert_eq!(back.nodes(), document.nodes());
        assert_eq!(back.title_page, document.title_page);
        assert_eq!(back.cast, document.cast);
        assert_eq!(back.paragraph(2).unwrap(), &action);
    }

    #[test]
    fn test_project_round_trip() {
        let (document, template, layout) = fixture();
        let options = ExportOptions::default();
        let job = ExportJob::new(&document, &template, &layout, &options);
        let bytes = ProjectExporter.export(&job).unwrap();
        assert!(bytes.starts_with(b"SQLite format 3\0"));
        let back = ProjectImporter::new(None).parse(&bytes).unwrap();
        assert_eq!(back.nodes(), document.nodes());
    }
}
