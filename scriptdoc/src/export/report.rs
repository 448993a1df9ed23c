//! Report spreadsheets: statistics tables as CSV or XLSX
//!
//! CSV puts the tables one after the other, each introduced by its name and
//! followed by a blank row; a single table is written bare. XLSX writes one
//! worksheet per table with inline strings, so no shared string part is
//! needed.

use super::ExportError;
use crate::statistics::ReportTable;
use crate::xml::escape;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Report file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Xlsx,
}

impl ReportFormat {
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(ReportFormat::Csv),
            "xlsx" => Some(ReportFormat::Xlsx),
            _ => None,
        }
    }
}

/// Encode report tables
pub fn write_report(tables: &[ReportTable], format: ReportFormat) -> Result<Vec<u8>, ExportError> {
    log::debug!("Writing {} report tables as {:?}", tables.len(), format);
    match format {
        ReportFormat::Csv => write_csv(tables),
        ReportFormat::Xlsx => write_xlsx(tables),
    }
}

fn write_csv(tables: &[ReportTable]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    let titled = tables.len() > 1;
    for (i, table) in tables.iter().enumerate() {
        if titled {
            if i > 0 {
                writer.write_record([""])?;
            }
            writer.write_record([table.name.as_str()])?;
        }
        writer.write_record(&table.header)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
    }
    writer.into_inner().map_err(|e| ExportError::Encode {
        format: "CSV",
        message: e.to_string(),
    })
}

/// Worksheet names are limited to 31 characters without `[]:*?/\`
fn sheet_name(name: &str, index: usize) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        format!("Sheet{}", index + 1)
    } else {
        cleaned
    }
}

/// Column letters for a 0-based index: A, B, .., Z, AA, ..
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn cell_xml(reference: &str, value: &str) -> String {
    let numeric = !value.is_empty()
        && value.len() < 16
        && value.chars().all(|c| c.is_ascii_digit())
        && !(value.len() > 1 && value.starts_with('0'));
    if numeric {
        format!("<c r=\"{}\"><v>{}</v></c>", reference, value)
    } else {
        format!(
            "<c r=\"{}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
            reference,
            escape(value)
        )
    }
}

fn sheet_xml(table: &ReportTable) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
    );
    for (r, row) in std::iter::once(&table.header).chain(&table.rows).enumerate() {
        let _ = write!(xml, "<row r=\"{}\">", r + 1);
        for (c, value) in row.iter().enumerate() {
            let reference = format!("{}{}", column_name(c), r + 1);
            xml.push_str(&cell_xml(&reference, value));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn write_xlsx(tables: &[ReportTable]) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let count = tables.len().max(1);

    let mut content_types = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>",
    );
    let mut sheets = String::new();
    let mut relationships = String::new();
    for i in 0..count {
        let n = i + 1;
        let _ = write!(
            content_types,
            "<Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
            n
        );
        let name = tables.get(i).map(|t| t.name.as_str()).unwrap_or_default();
        let _ = write!(
            sheets,
            "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            escape(&sheet_name(name, i)),
            n,
            n
        );
        let _ = write!(
            relationships,
            "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.xml\"/>",
            n, n
        );
    }
    content_types.push_str("</Types>");

    let parts = [
        ("[Content_Types].xml".to_string(), content_types),
        (
            "_rels/.rels".to_string(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
             </Relationships>"
                .to_string(),
        ),
        (
            "xl/workbook.xml".to_string(),
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
                 <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
                 xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
                 <sheets>{}</sheets></workbook>",
                sheets
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
                 <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{}</Relationships>",
                relationships
            ),
        ),
    ];
    for (name, content) in parts {
        zip.start_file(name, options)?;
        write_part(&mut zip, &content)?;
    }
    for i in 0..count {
        let xml = match tables.get(i) {
            Some(table) => sheet_xml(table),
            None => sheet_xml(&ReportTable::new("Sheet1", &[])),
        };
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        write_part(&mut zip, &xml)?;
    }
    Ok(zip.finish()?.into_inner())
}

fn write_part<W: Write + std::io::Seek>(zip: &mut ZipWriter<W>, content: &str) -> Result<(), ExportError> {
    zip.write_all(content.as_bytes())
        .map_err(|e| ExportError::Encode {
            format: "XLSX",
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::cast::{import_cast, CastFormat};
    use crate::model::{CastMember, Document, WritingForm};
    use crate::statistics::cast_table;

    fn cast_document() -> Document {
        let mut document = Document::new(WritingForm::Screenplay);
        document.cast = vec![
            CastMember {
                name: "MARTA".to_string(),
                description: "Harbour pilot, \"steady\"".to_string(),
                age: Some("41".to_string()),
                gender: Some("female".to_string()),
            },
            CastMember {
                name: "LEO".to_string(),
                description: "Deckhand & cook".to_string(),
                age: None,
                gender: None,
            },
        ];
        document
    }

    #[test]
    fn test_cast_csv_round_trip() {
        let document = cast_document();
        let bytes = write_report(&[cast_table(&document)], ReportFormat::Csv).unwrap();
        let members = import_cast(&bytes, CastFormat::Csv).unwrap();
        assert_eq!(members, document.cast);
    }

    #[test]
    fn test_cast_xlsx_round_trip() {
        let document = cast_document();
        let bytes = write_report(&[cast_table(&document)], ReportFormat::Xlsx).unwrap();
        assert!(bytes.starts_with(b"PK"));
        let members = import_cast(&bytes, CastFormat::Xlsx).unwrap();
        assert_eq!(members, document.cast);
    }

    #[test]
    fn test_csv_titles_each_table() {
        let mut first = ReportTable::new("Summary", &["Measure", "Value"]);
        first.push(vec!["Words".to_string(), "12".to_string()]);
        let second = ReportTable::new("Kinds", &["Kind", "Count"]);
        let bytes = write_report(&[first, second], ReportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "Summary\nMeasure,Value\nWords,12\n\"\"\nKinds\nKind,Count\n");
    }

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
    }
}
