//! Cast list import from CSV and XLSX spreadsheets
//!
//! A header row naming `name`, `description`, `age` or `gender` columns
//! is honoured in any order. Without one, the first column is the name and
//! the second the description.

use super::docx::read_part;
use super::ImportError;
use crate::model::CastMember;
use crate::xml::{tokenize, XmlEvent};
use std::io::Cursor;
use std::path::Path;
use zip::ZipArchive;

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const SHEET_PART: &str = "xl/worksheets/sheet1.xml";

/// Spreadsheet formats accepted for cast lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastFormat {
    Csv,
    Xlsx,
}

impl CastFormat {
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(CastFormat::Csv),
            "xlsx" => Some(CastFormat::Xlsx),
            _ => None,
        }
    }
}

/// Read cast members from a spreadsheet
pub fn import_cast(bytes: &[u8], format: CastFormat) -> Result<Vec<CastMember>, ImportError> {
    let rows = match format {
        CastFormat::Csv => csv_rows(bytes)?,
        CastFormat::Xlsx => xlsx_rows(bytes)?,
    };
    let members = members_from_rows(rows);
    log::info!("Imported {} cast members", members.len());
    Ok(members)
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    name: usize,
    description: Option<usize>,
    age: Option<usize>,
    gender: Option<usize>,
}

impl Columns {
    const POSITIONAL: Columns = Columns {
        name: 0,
        description: Some(1),
        age: None,
        gender: None,
    };

    /// Column mapping from a header row, if it is one
    fn from_header(row: &[String]) -> Option<Self> {
        let find = |names: &[&str]| {
            row.iter()
                .position(|cell| names.contains(&cell.trim().to_lowercase().as_str()))
        };
        let name = find(&["name", "character", "role"]);
        let description = find(&["description", "desc", "notes", "bio"]);
        let age = find(&["age"]);
        let gender = find(&["gender", "sex"]);
        if name.is_none() && description.is_none() && age.is_none() && gender.is_none() {
            return None;
        }
        Some(Columns {
            name: name.unwrap_or(0),
            description,
            age,
            gender,
        })
    }
}

fn members_from_rows(rows: Vec<Vec<String>>) -> Vec<CastMember> {
    let mut rows = rows.into_iter().peekable();
    let columns = match rows.peek().and_then(|row| Columns::from_header(row)) {
        Some(columns) => {
            rows.next();
            columns
        }
        None => Columns::POSITIONAL,
    };

    let cell = |row: &[String], index: Option<usize>| {
        index
            .and_then(|i| row.get(i))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    rows.filter_map(|row| {
        let name = cell(&row, Some(columns.name))?;
        Some(CastMember {
            name,
            description: cell(&row, columns.description).unwrap_or_default(),
            age: cell(&row, columns.age),
            gender: cell(&row, columns.gender),
        })
    })
    .collect()
}

fn csv_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Zero-based column index of a cell reference such as `C12`
fn column_index(reference: &str) -> Option<usize> {
    let letters: String = reference.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if letters.is_empty() {
        return None;
    }
    let index = letters.to_ascii_uppercase().bytes().fold(0usize, |acc, b| {
        acc * 26 + (b - b'A') as usize + 1
    });
    Some(index - 1)
}

fn shared_strings(xml: &str) -> Vec<String> {
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    for event in tokenize(xml) {
        match (&event, event.local_name().unwrap_or_default()) {
            (XmlEvent::Start { .. }, "si") => current = Some(String::new()),
            (XmlEvent::Empty { .. }, "si") => strings.push(String::new()),
            (XmlEvent::Start { .. }, "t") => in_text = true,
            (XmlEvent::End { .. }, "t") => in_text = false,
            (XmlEvent::End { .. }, "si") => strings.extend(current.take()),
            (XmlEvent::Text(text), _) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(text);
                }
            }
            _ => {}
        }
    }
    strings
}

fn xlsx_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let strings = match read_part(&mut archive, SHARED_STRINGS_PART) {
        Ok(xml) => shared_strings(&xml),
        Err(ImportError::MissingPart { .. }) => Vec::new(),
        Err(e) => return Err(e),
    };
    let sheet = read_part(&mut archive, SHEET_PART)?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Option<Vec<String>> = None;
    // (column, shared string cell) of the cell being read
    let mut cell: Option<(usize, bool)> = None;
    let mut value = String::new();
    let mut in_value = false;

    for event in tokenize(&sheet) {
        let name = event.local_name().unwrap_or_default().to_string();
        match &event {
            XmlEvent::Start { .. } if name == "row" => row = Some(Vec::new()),
            XmlEvent::End { .. } if name == "row" => rows.extend(row.take()),
            XmlEvent::Start { .. } if name == "c" => {
                let column = event
                    .attr("r")
                    .and_then(column_index)
                    .unwrap_or_else(|| row.as_ref().map_or(0, Vec::len));
                cell = Some((column, event.attr("t") == Some("s")));
                value.clear();
            }
            XmlEvent::Start { .. } if name == "v" || name == "t" => in_value = true,
            XmlEvent::End { .. } if name == "v" || name == "t" => in_value = false,
            XmlEvent::Text(text) if in_value => value.push_str(text),
            XmlEvent::End { .. } if name == "c" => {
                if let (Some((column, shared)), Some(r)) = (cell.take(), row.as_mut()) {
                    let text = if shared {
                        value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| strings.get(i).cloned())
                            .unwrap_or_default()
                    } else {
                        value.clone()
                    };
                    if r.len() <= column {
                        r.resize(column + 1, String::new());
                    }
                    r[column] = text;
                }
            }
            _ => {}
        }
    }
    Ok(rows)
}
