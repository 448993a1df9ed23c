//! Page flow: places measured paragraphs onto pages
//!
//! Rules, in the order they are checked:
//! - space before a paragraph is dropped at the top of a page
//! - a forced page break starts a new page unless the page is still empty
//! - a keep-with-next paragraph (headings, cues, parentheticals) moves to
//!   the next page unless it fits together with the rest of its chain and
//!   the first lines of the paragraph ending the chain
//! - a splittable paragraph that does not fit breaks with at least
//!   [`MIN_LINES`] lines on either side; broken dialogue gets a `(MORE)`
//!   marker and a `NAME (CONT'D)` cue on the next page
//! - anything taller than an empty page is placed anyway

use super::metrics::Measurement;
use super::page::{Fragment, FragmentRole, Page, Placement};
use crate::corrector::rules::strip_continued_marker;
use crate::model::KindRole;
use std::sync::Arc;

/// Lines kept together on each side of a page break
pub const MIN_LINES: usize = 2;

/// Page settings and marker texts
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub page_height: f32,
    pub more_text: String,
    pub continued_text: String,
}

/// Where a flow pass starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resume {
    /// 0-based index of the first page produced
    pub page_index: usize,
    /// First paragraph to place
    pub paragraph: usize,
    /// First line of that paragraph still to place
    pub line: usize,
    /// Page the paragraph started on, when `line > 0`
    pub started_on: usize,
}

/// Pages and placements produced by a pass
#[derive(Debug, Clone, PartialEq)]
pub struct FlowOutput {
    pub pages: Vec<Page>,
    /// Placements of paragraphs `resume.paragraph..`
    pub placements: Vec<Placement>,
}

/// Lay out `measures` starting at `resume`
pub fn flow(measures: &[Arc<Measurement>], settings: &FlowSettings, resume: Resume) -> FlowOutput {
    let mut flow = Flow::new(measures, settings, resume);
    flow.run();
    flow.finish()
}

/// Character cue a dialogue paragraph belongs to
pub fn cue_of(measures: &[Arc<Measurement>], index: usize) -> Option<usize> {
    if !matches!(
        measures.get(index)?.kind.role(),
        KindRole::Dialogue | KindRole::Lyrics
    ) {
        return None;
    }
    for j in (0..index).rev() {
        let m = &measures[j];
        if !m.printable {
            continue;
        }
        match m.kind.role() {
            KindRole::Character => return Some(j),
            KindRole::Parenthetical | KindRole::Dialogue | KindRole::Lyrics => continue,
            _ => return None,
        }
    }
    None
}

struct Flow<'a> {
    measures: &'a [Arc<Measurement>],
    settings: &'a FlowSettings,
    resume: Resume,
    pages: Vec<Page>,
    current: Page,
    y: f32,
    placements: Vec<Placement>,
}

impl<'a> Flow<'a> {
    fn new(measures: &'a [Arc<Measurement>], settings: &'a FlowSettings, resume: Resume) -> Self {
        Self {
            measures,
            settings,
            resume,
            pages: Vec::new(),
            current: Page {
                number: resume.page_index + 1,
                fragments: Vec::new(),
                used: 0.0,
            },
            y: 0.0,
            placements: Vec::with_capacity(measures.len().saturating_sub(resume.paragraph)),
        }
    }

    fn page_index(&self) -> usize {
        self.current.number - 1
    }

    fn remaining(&self) -> f32 {
        self.settings.page_height - self.y
    }

    /// No text placed on the current page yet (markers don't count)
    fn at_top(&self) -> bool {
        self.current.text_fragments().next().is_none()
    }

    fn break_page(&mut self) {
        let next = Page {
            number: self.current.number + 1,
            fragments: Vec::new(),
            used: 0.0,
        };
        self.pages.push(std::mem::replace(&mut self.current, next));
        self.y = 0.0;
    }

    fn push(&mut self, fragment: Fragment) {
        self.y = fragment.y + fragment.height();
        self.current.used = self.y;
        self.current.fragments.push(fragment);
    }

    fn place_lines(&mut self, index: usize, first_line: usize, count: usize, space: f32) {
        let m = &self.measures[index];
        let end = (first_line + count).min(m.lines.len());
        let fragment = Fragment {
            paragraph: index,
            kind: m.kind,
            role: FragmentRole::Text,
            first_line,
            lines: m.lines[first_line..end].to_vec(),
            x: m.x,
            y: self.y + space,
            width: m.width,
            line_height: m.line_height,
            align: m.align,
        };
        self.push(fragment);
    }

    fn place_marker(&mut self, index: usize, cue: usize, role: FragmentRole) {
        let cue_m = &self.measures[cue];
        let text = match role {
            FragmentRole::More => self.settings.more_text.clone(),
            _ => {
                let name = cue_m.lines.first().map(String::as_str).unwrap_or_default();
                let (name, _) = strip_continued_marker(name, &self.settings.continued_text);
                format!("{} ({})", name, self.settings.continued_text)
            }
        };
        let fragment = Fragment {
            paragraph: index,
            kind: cue_m.kind,
            role,
            first_line: 0,
            lines: vec![text],
            x: cue_m.x,
            y: self.y,
            width: cue_m.width,
            line_height: cue_m.line_height,
            align: cue_m.align,
        };
        self.push(fragment);
    }

    fn record(&mut self, first_page: usize) {
        let last_page = self.page_index();
        self.placements.push(Placement {
            first_page,
            last_page,
        });
    }

    /// Height the rest of a keep-with-next chain needs after `index`
    fn chain_tail_height(&self, index: usize) -> f32 {
        let mut height = 0.0;
        for m in self.measures.iter().skip(index + 1) {
            if !m.printable {
                continue;
            }
            if m.page_break_before {
                break;
            }
            if m.keeps_with_next() {
                height += m.space_before + m.text_height();
                continue;
            }
            let lines = if m.splittable() {
                m.lines.len().min(MIN_LINES)
            } else {
                m.lines.len()
            };
            height += m.space_before + lines as f32 * m.line_height;
            break;
        }
        height
    }

    fn run(&mut self) {
        let start = self.resume.paragraph;
        for index in start..self.measures.len() {
            let m = Arc::clone(&self.measures[index]);
            if !m.printable {
                self.record(self.page_index());
                continue;
            }

            if index == start && self.resume.line > 0 {
                if let Some(cue) = cue_of(self.measures, index) {
                    self.place_marker(index, cue, FragmentRole::ContinuedCue);
                }
                self.place_flowing(index, self.resume.line, self.resume.started_on);
                continue;
            }

            if m.page_break_before && !self.at_top() {
                self.break_page();
            }

            if m.keeps_with_next() {
                let space = if self.at_top() { 0.0 } else { m.space_before };
                let needed = space + m.text_height() + self.chain_tail_height(index);
                if needed > self.remaining() && !self.at_top() {
                    self.break_page();
                }
                let space = if self.at_top() { 0.0 } else { m.space_before };
                let first_page = self.page_index();
                self.place_lines(index, 0, m.lines.len(), space);
                self.y += m.space_after;
                self.record(first_page);
                continue;
            }

            let first_page = self.page_index();
            self.place_flowing(index, 0, first_page);
        }
    }

    /// Place a paragraph from `start_line`, splitting or moving as needed
    fn place_flowing(&mut self, index: usize, mut start_line: usize, mut first_page: usize) {
        let m = Arc::clone(&self.measures[index]);
        let cue = cue_of(self.measures, index);
        let total = m.lines.len();

        loop {
            let left = total - start_line;
            let top = self.at_top();
            let space = if top || start_line > 0 { 0.0 } else { m.space_before };
            if start_line == 0 {
                first_page = self.page_index();
            }

            if space + left as f32 * m.line_height <= self.remaining() {
                self.place_lines(index, start_line, left, space);
                self.y += m.space_after;
                self.record(first_page);
                return;
            }

            if m.splittable() && left > 1 && m.line_height > 0.0 {
                let marker = cue.map(|c| self.measures[c].line_height).unwrap_or(0.0);
                let available = self.remaining() - space - marker;
                let fit = if available > 0.0 {
                    (available / m.line_height).floor() as usize
                } else {
                    0
                };
                let take = if top {
                    // Taller than a page: fill it regardless of the line minimum
                    fit.max(1).min(left - 1)
                } else {
                    fit.min(left.saturating_sub(MIN_LINES))
                };
                if take >= MIN_LINES || (top && take >= 1) {
                    self.place_lines(index, start_line, take, space);
                    if let Some(cue) = cue {
                        self.place_marker(index, cue, FragmentRole::More);
                    }
                    self.break_page();
                    if let Some(cue) = cue {
                        self.place_marker(index, cue, FragmentRole::ContinuedCue);
                    }
                    start_line += take;
                    continue;
                }
            }

            if !top {
                self.break_page();
                continue;
            }

            // Unsplittable and taller than an empty page
            self.place_lines(index, start_line, left, space);
            self.y += m.space_after;
            self.record(first_page);
            return;
        }
    }

    fn finish(mut self) -> FlowOutput {
        if !self.current.fragments.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        if self.pages.len() == 1 && self.pages[0].fragments.is_empty() && self.placements.is_empty()
        {
            self.pages.clear();
        }
        let last = (self.resume.page_index + self.pages.len()).saturating_sub(1);
        for placement in &mut self.placements {
            placement.first_page = placement.first_page.min(last);
            placement.last_page = placement.last_page.min(last);
        }
        FlowOutput {
            pages: self.pages,
            placements: self.placements,
        }
    }
}
