//! Paginated plain text
//!
//! Prints the current layout on a character grid: each fragment line lands
//! at the row and column nearest its position. Pages are separated by a
//! form feed and numbered as the template's numbering settings ask.

use super::{ExportError, ExportFormat, ExportJob, Exporter};
use crate::cancel::CancelToken;
use crate::layout::metrics::char_width;
use crate::layout::{Fragment, Page};
use crate::model::KindRole;
use crate::template::{Alignment, NumberPosition};

/// Writes paginated plain text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExporter;

/// Marker printed in the right margin of revised lines
const REVISION_MARK: char = '*';

impl Exporter for TextExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Text
    }

    fn export_with(&self, job: &ExportJob<'_>, cancel: &CancelToken) -> Result<Vec<u8>, ExportError> {
        let body = job.template.rule(job.document.form().body_kind())?;
        let grid = Grid {
            column: char_width(body).max(1.0),
            row: body.line_height().max(1.0),
        };
        let columns = (job.template.page.printable_width() / grid.column).floor() as usize;

        let mut pages = Vec::new();
        if job.title_page() {
            pages.push(title_page(job, columns));
        }
        for page in &job.layout.pages {
            job.check(cancel)?;
            pages.push(render_page(job, page, &grid, columns)?);
        }
        log::debug!("Text export: {} pages at {} columns", pages.len(), columns);
        Ok(pages.join("\x0c").into_bytes())
    }
}

struct Grid {
    column: f32,
    row: f32,
}

#[derive(Default)]
struct Canvas {
    rows: Vec<Vec<char>>,
}

impl Canvas {
    fn put(&mut self, row: usize, col: usize, text: &str) {
        if self.rows.len() <= row {
            self.rows.resize(row + 1, Vec::new());
        }
        let line = &mut self.rows[row];
        for (i, c) in text.chars().enumerate() {
            let at = col + i;
            if line.len() <= at {
                line.resize(at + 1, ' ');
            }
            line[at] = c;
        }
    }

    fn finish(self) -> String {
        let mut out = String::new();
        for row in self.rows {
            let line: String = row.into_iter().collect();
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

fn title_page(job: &ExportJob<'_>, columns: usize) -> String {
    let mut canvas = Canvas::default();
    let mut row = 0;
    for (line, centered) in super::fdx::title_page_lines(&job.document.title_page) {
        let col = if centered {
            columns.saturating_sub(line.chars().count()) / 2
        } else {
            0
        };
        canvas.put(row, col, line);
        row += 2;
    }
    canvas.finish()
}

fn render_page(
    job: &ExportJob<'_>,
    page: &Page,
    grid: &Grid,
    columns: usize,
) -> Result<String, ExportError> {
    let mut canvas = Canvas::default();
    // Row 0 holds the page number, the printable area starts below it
    let numbering = &job.template.numbering;
    if numbering.page_numbers && (page.number > 1 || numbering.first_page_number) {
        let label = format!("{}.", page.number);
        canvas.put(0, columns.saturating_sub(label.len()), &label);
    }
    for fragment in &page.fragments {
        if !job.includes(fragment.paragraph) {
            continue;
        }
        render_fragment(job, fragment, grid, columns, &mut canvas)?;
    }
    Ok(canvas.finish())
}

fn render_fragment(
    job: &ExportJob<'_>,
    fragment: &Fragment,
    grid: &Grid,
    columns: usize,
    canvas: &mut Canvas,
) -> Result<(), ExportError> {
    let rule = job.template.rule(fragment.kind)?;
    let advance = char_width(rule);
    let paragraph = job.document.paragraph(fragment.paragraph);
    let revised = paragraph.is_some_and(|p| job.revision(p).is_some());
    let number = fragment
        .kind
        .is_scene_start()
        .then(|| job.scene_number(fragment.paragraph))
        .flatten()
        .filter(|_| job.template.numbering.scene_numbers && fragment.first_line == 0);

    for (i, line) in fragment.lines.iter().enumerate() {
        let width = line.chars().count() as f32 * advance;
        let x = match fragment.align {
            Alignment::Center => fragment.x + (fragment.width - width) / 2.0,
            Alignment::Right => fragment.x + fragment.width - width,
            Alignment::Left | Alignment::Justify => fragment.x,
        };
        let y = fragment.y + i as f32 * fragment.line_height;
        let row = 1 + (y / grid.row).round() as usize;
        let col = (x.max(0.0) / grid.column).round() as usize;

        match number {
            Some(number) if i == 0 && fragment.kind.role() == KindRole::SceneHeading => {
                let label = number.to_string();
                let line = match job.template.numbering.scene_number_position {
                    NumberPosition::Left => format!("{}  {}", label, line),
                    NumberPosition::Right => format!("{}  {}", line, label),
                    NumberPosition::Both => format!("{}  {}  {}", label, line, label),
                };
                canvas.put(row, col, &line);
            }
            _ => canvas.put(row, col, line),
        }
        if revised {
            canvas.put(row, columns + 1, &REVISION_MARK.to_string());
        }
    }
    Ok(())
}
