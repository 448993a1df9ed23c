//! Pagination engine with incremental relayout
//!
//! The engine moves through `Clean → Dirty → Paginating → Clean`. Edits
//! splice its measurement cache and record the earliest dirty paragraph; a
//! pass reflows from the start of the dirty scene, reuses every page that
//! ends before it, and publishes the new [`Layout`] through a
//! [`LayoutCell`] that readers on other threads can load at any time.

use super::duration::{blend_estimates, paragraph_estimates};
use super::error::LayoutError;
use super::flow::{flow, FlowSettings, Resume};
use super::metrics::Measurement;
use super::numbering::number_document;
use super::page::{Layout, Placement, SceneInfo};
use crate::model::{Document, EditRange, Paragraph};
use crate::template::Template;
use std::sync::{Arc, RwLock};

/// Engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// The published layout matches the last laid-out revision
    Clean,
    /// Paragraphs from `from` on need relayout
    Dirty { from: usize },
    /// A pass is running
    Paginating,
}

/// Shared, atomically swapped pointer to the current layout
#[derive(Debug, Clone)]
pub struct LayoutCell {
    inner: Arc<RwLock<Arc<Layout>>>,
}

impl LayoutCell {
    pub fn new(layout: Arc<Layout>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(layout)),
        }
    }

    /// The current layout
    pub fn load(&self) -> Arc<Layout> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Publish a new layout
    pub fn store(&self, layout: Arc<Layout>) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = layout;
    }
}

/// Layout options independent of the template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutSettings {
    /// Lay out synopses and notes as if they printed
    pub include_non_printing: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    paragraph: Paragraph,
    measurement: Arc<Measurement>,
}

/// Turns a document into pages under one template
#[derive(Debug)]
pub struct PaginationEngine {
    template: Arc<Template>,
    settings: LayoutSettings,
    state: EngineState,
    cache: Vec<Option<CacheEntry>>,
    /// Whether pages of the published layout may be reused
    reusable: bool,
    cell: LayoutCell,
}

impl PaginationEngine {
    pub fn new(template: Arc<Template>) -> Self {
        Self::with_settings(template, LayoutSettings::default())
    }

    pub fn with_settings(template: Arc<Template>, settings: LayoutSettings) -> Self {
        Self {
            template,
            settings,
            state: EngineState::Dirty { from: 0 },
            cache: Vec::new(),
            reusable: false,
            cell: LayoutCell::new(Arc::new(Layout::empty())),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_clean(&self) -> bool {
        self.state == EngineState::Clean
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn settings(&self) -> LayoutSettings {
        self.settings
    }

    /// Switch templates; the next pass lays out everything again
    pub fn set_template(&mut self, template: Arc<Template>) {
        self.template = template;
        self.invalidate();
    }

    pub fn set_settings(&mut self, settings: LayoutSettings) {
        if settings != self.settings {
            self.settings = settings;
            self.invalidate();
        }
    }

    /// Drop every cached measurement
    pub fn invalidate(&mut self) {
        self.cache.clear();
        self.reusable = false;
        self.state = EngineState::Dirty { from: 0 };
    }

    /// Record an edit: splice the cache and extend the dirty region
    pub fn mark_dirty(&mut self, edit: &EditRange) {
        let start = edit.start.min(self.cache.len());
        let end = (edit.start + edit.removed).min(self.cache.len());
        self.cache
            .splice(start..end, std::iter::repeat_with(|| None).take(edit.inserted));
        self.extend_dirty(edit.start);
    }

    /// Mark paragraphs from `index` on as needing relayout without
    /// changing the paragraph count
    pub fn touch(&mut self, index: usize) {
        if let Some(entry) = self.cache.get_mut(index) {
            *entry = None;
        }
        self.extend_dirty(index);
    }

    fn extend_dirty(&mut self, index: usize) {
        self.state = match self.state {
            EngineState::Dirty { from } => EngineState::Dirty {
                from: from.min(index),
            },
            _ => EngineState::Dirty { from: index },
        };
    }

    /// The last published layout
    pub fn layout(&self) -> Arc<Layout> {
        self.cell.load()
    }

    /// A handle readers can keep to load the latest layout
    pub fn cell(&self) -> LayoutCell {
        self.cell.clone()
    }

    /// Bring the layout up to date with `document`
    ///
    /// On error the last good layout stays published and the engine stays
    /// dirty.
    pub fn relayout(&mut self, document: &Document) -> Result<Arc<Layout>, LayoutError> {
        let current = self.cell.load();
        let unchanged = current.revision == document.revision()
            && self.cache.len() == document.len()
            && self.reusable;
        let from = match self.state {
            EngineState::Clean if unchanged => return Ok(current),
            EngineState::Dirty { from } => from,
            EngineState::Clean | EngineState::Paginating => document.len(),
        };

        self.state = EngineState::Paginating;
        match self.pass(document, from, &current) {
            Ok((layout, cache)) => {
                let layout = Arc::new(layout);
                self.cache = cache;
                self.reusable = true;
                self.cell.store(Arc::clone(&layout));
                self.state = EngineState::Clean;
                log::debug!(
                    "Laid out revision {} on {} pages",
                    layout.revision,
                    layout.page_count()
                );
                Ok(layout)
            }
            Err(err) => {
                log::warn!("Relayout failed, keeping previous layout: {}", err);
                self.state = EngineState::Dirty { from };
                Err(err)
            }
        }
    }

    /// Lay out from scratch, ignoring cached pages
    pub fn full_layout(&mut self, document: &Document) -> Result<Arc<Layout>, LayoutError> {
        self.invalidate();
        self.relayout(document)
    }

    fn pass(
        &self,
        document: &Document,
        dirty_from: usize,
        previous: &Layout,
    ) -> Result<(Layout, Vec<Option<CacheEntry>>), LayoutError> {
        let template = &self.template;
        let page = &template.page;
        if page.printable_width() <= 0.0 || page.printable_height() <= 0.0 {
            return Err(LayoutError::NoPrintableArea {
                template: template.name().to_string(),
                width: page.printable_width(),
                height: page.printable_height(),
            });
        }

        // Measure, reusing cache entries whose paragraph is unchanged
        let mut cache = self.cache.clone();
        if cache.len() != document.len() {
            log::debug!(
                "Measurement cache out of step ({} vs {} paragraphs), rebuilding",
                cache.len(),
                document.len()
            );
            cache = vec![None; document.len()];
        }
        let mut first_changed = document.len();
        for (index, paragraph) in document.paragraphs().enumerate() {
            let stale = match &cache[index] {
                Some(entry) => entry.paragraph != *paragraph,
                None => true,
            };
            if stale {
                let measurement = Measurement::measure(
                    index,
                    paragraph,
                    template,
                    self.settings.include_non_printing,
                )?;
                cache[index] = Some(CacheEntry {
                    paragraph: paragraph.clone(),
                    measurement: Arc::new(measurement),
                });
                first_changed = first_changed.min(index);
            }
        }
        let measures: Vec<Arc<Measurement>> = cache
            .iter()
            .flatten()
            .map(|entry| Arc::clone(&entry.measurement))
            .collect();

        let dirty = self.reflow_start(document, &measures, dirty_from.min(first_changed));
        let resume = if self.reusable {
            resume_point(previous, dirty)
        } else {
            None
        };
        let resume = resume.unwrap_or_default();
        if resume.paragraph > 0 {
            log::debug!(
                "Reusing {} pages, reflowing from paragraph {}",
                resume.page_index,
                resume.paragraph
            );
        }

        let settings = FlowSettings {
            page_height: page.printable_height(),
            more_text: template.numbering.more_text.clone(),
            continued_text: template.numbering.continued_text.clone(),
        };
        let output = flow(&measures, &settings, resume);

        let mut pages: Vec<_> = previous.pages[..resume.page_index.min(previous.pages.len())].to_vec();
        pages.extend(output.pages.into_iter().map(Arc::new));
        let mut placements: Vec<Placement> = previous.placements[..resume.paragraph].to_vec();
        placements.extend(output.placements);

        let numbering = number_document(
            document.paragraphs(),
            template.numbering.scene_numbers,
            template.numbering.dialogue_numbers,
        );

        let durations: Vec<f64> = measures
            .iter()
            .map(|m| {
                let estimates = paragraph_estimates(&template.duration, m, page.printable_height());
                blend_estimates(&estimates, &template.duration.blend)
            })
            .collect();

        let scenes = scene_table(document, &placements, &numbering, &durations);
        let layout = Layout {
            revision: document.revision(),
            template: template.name().to_string(),
            pages,
            placements,
            numbering,
            scenes,
            duration: durations.iter().sum(),
        };
        Ok((layout, cache))
    }

    /// First paragraph to reflow: the dirty scene's start, moved back over
    /// any keep-with-next chain leading into it
    fn reflow_start(&self, document: &Document, measures: &[Arc<Measurement>], dirty: usize) -> usize {
        if dirty >= document.len() {
            return document.len();
        }
        let mut start = document.enclosing_scene(dirty).start;
        while start > 0 && measures[start - 1].keeps_with_next() {
            start -= 1;
        }
        start
    }
}

/// Where to resume flowing so pages before it can be reused
fn resume_point(previous: &Layout, dirty: usize) -> Option<Resume> {
    if dirty == 0 || dirty > previous.placements.len() {
        return None;
    }
    let page_index = previous.placements[dirty - 1].last_page;
    let page = previous.pages.get(page_index)?;
    let first = page.text_fragments().next()?;
    if first.paragraph >= dirty {
        return None;
    }
    Some(Resume {
        page_index,
        paragraph: first.paragraph,
        line: first.first_line,
        started_on: previous.placements[first.paragraph].first_page,
    })
}

fn scene_table(
    document: &Document,
    placements: &[Placement],
    numbering: &super::numbering::Numbering,
    durations: &[f64],
) -> Vec<SceneInfo> {
    let starts: Vec<usize> = document
        .paragraphs()
        .enumerate()
        .filter(|(_, p)| p.kind().is_scene_start())
        .map(|(i, _)| i)
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(document.len());
            let first_page = placements.get(start).map(|p| p.first_page + 1).unwrap_or(1);
            let last_page = placements
                .get(end.saturating_sub(1))
                .map(|p| p.last_page + 1)
                .unwrap_or(first_page);
            SceneInfo {
                paragraph: start,
                range: start..end,
                heading: document
                    .paragraph(start)
                    .map(Paragraph::text)
                    .unwrap_or_default(),
                number: numbering.scenes.get(&start).copied(),
                first_page,
                last_page,
                duration: durations[start..end].iter().sum(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParagraphKind, ScreenplayKind, SceneNumber, WritingForm};
    use crate::template::{builtin, StyleRule};

    fn sp(kind: ScreenplayKind, text: &str) -> Paragraph {
        Paragraph::new(ParagraphKind::Screenplay(kind), text)
    }

    fn long_script(scenes: usize) -> Document {
        let mut doc = Document::new(WritingForm::Screenplay);
        for n in 0..scenes {
            doc.push(sp(ScreenplayKind::SceneHeading, &format!("INT. ROOM {n} - DAY")))
                .unwrap();
            doc.push(sp(ScreenplayKind::Action, &"Things happen here. ".repeat(12)))
                .unwrap();
            doc.push(sp(ScreenplayKind::Character, "ANNA")).unwrap();
            doc.push(sp(ScreenplayKind::Dialogue, &"I have a lot to say. ".repeat(8)))
                .unwrap();
            doc.push(sp(ScreenplayKind::Character, "BOB")).unwrap();
            doc.push(sp(ScreenplayKind::Parenthetical, "(quietly)")).unwrap();
            doc.push(sp(ScreenplayKind::Dialogue, "Fine.")).unwrap();
        }
        doc
    }

    fn engine() -> PaginationEngine {
        PaginationEngine::new(builtin::fallback(WritingForm::Screenplay).unwrap())
    }

    #[test]
    fn test_pages_start_at_one() {
        let doc = long_script(10);
        let layout = engine().relayout(&doc).unwrap();
        assert!(layout.page_count() > 1);
        assert_eq!(layout.pages[0].number, 1);
        for (i, page) in layout.pages.iter().enumerate() {
            assert_eq!(page.number, i + 1);
        }
        assert_eq!(layout.page_of(0), Some(1));
        assert_eq!(layout.scenes.len(), 10);
        assert_eq!(layout.scenes[0].number, Some(SceneNumber::new(1)));
    }

    #[test]
    fn test_determinism() {
        let doc = long_script(12);
        let a = engine().relayout(&doc).unwrap();
        let b = engine().relayout(&doc).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_incremental_matches_full_and_reuses_pages() {
        let mut doc = long_script(30);
        let mut incremental = engine();
        let before = incremental.relayout(&doc).unwrap();

        let at = doc.len() - 10;
        let edit = doc
            .insert(at, sp(ScreenplayKind::Action, &"New business. ".repeat(20)))
            .unwrap();
        incremental.mark_dirty(&edit);
        assert!(matches!(incremental.state(), EngineState::Dirty { .. }));

        let after = incremental.relayout(&doc).unwrap();
        let full = engine().relayout(&doc).unwrap();
        assert_eq!(*after, *full);
        assert!(incremental.is_clean());
        assert!(Arc::ptr_eq(&before.pages[0], &after.pages[0]));
    }

    #[test]
    fn test_unreported_edit_is_detected() {
        let mut doc = long_script(5);
        let mut engine = engine();
        engine.relayout(&doc).unwrap();
        doc.set_text(1, "Short.").unwrap();

        let layout = engine.relayout(&doc).unwrap();
        let full = super::tests::engine().relayout(&doc).unwrap();
        assert_eq!(*layout, *full);
    }

    #[test]
    fn test_no_scene_heading_orphaned() {
        for scenes in 1..25 {
            let doc = long_script(scenes);
            let layout = engine().relayout(&doc).unwrap();
            for scene in &layout.scenes {
                assert_eq!(
                    layout.page_of(scene.paragraph),
                    layout.page_of(scene.paragraph + 1),
                    "scene {:?} in {scenes}-scene script",
                    scene.number
                );
            }
        }
    }

    #[test]
    fn test_error_keeps_last_good_layout() {
        let doc = long_script(3);
        let mut engine = engine();
        let good = engine.relayout(&doc).unwrap();

        let mut broken = Template::clone(engine.template());
        broken.page.margin_left = 400.0;
        broken.page.margin_right = 400.0;
        engine.set_template(Arc::new(broken));
        let err = engine.relayout(&doc).unwrap_err();
        assert!(matches!(err, LayoutError::NoPrintableArea { .. }));
        assert_eq!(engine.layout(), good);
        assert_eq!(engine.state(), EngineState::Dirty { from: 0 });
    }

    #[test]
    fn test_negative_height_is_reported() {
        let doc = long_script(1);
        let mut template = Template::clone(&builtin::fallback(WritingForm::Screenplay).unwrap());
        template
            .set_rule(
                ParagraphKind::Screenplay(ScreenplayKind::Action),
                StyleRule {
                    line_spacing: -1.0,
                    ..StyleRule::default()
                },
            )
            .unwrap();
        let mut engine = PaginationEngine::new(Arc::new(template));
        assert!(matches!(
            engine.relayout(&doc),
            Err(LayoutError::NegativeHeight { paragraph: 1, .. })
        ));
        assert_eq!(engine.layout().page_count(), 0);
    }

    #[test]
    fn test_locked_number_survives_insert() {
        let mut doc = long_script(6);
        let mut engine = engine();
        let scene_five = doc
            .paragraphs()
            .enumerate()
            .filter(|(_, p)| p.kind().is_scene_start())
            .nth(4)
            .map(|(i, _)| i)
            .unwrap();
        let mut attributes = doc.paragraph(scene_five).unwrap().attributes.clone();
        attributes.number_lock = Some(SceneNumber::new(5));
        doc.set_attributes(scene_five, attributes).unwrap();
        engine.relayout(&doc).unwrap();

        let edit = doc
            .insert(7, sp(ScreenplayKind::SceneHeading, "EXT. NEW PLACE - NIGHT"))
            .unwrap();
        engine.mark_dirty(&edit);
        let layout = engine.relayout(&doc).unwrap();
        let numbers: Vec<String> = layout
            .scenes
            .iter()
            .map(|s| s.number.map(|n| n.to_string()).unwrap_or_default())
            .collect();
        assert_eq!(numbers, ["1", "2", "3", "4", "4A", "5", "6"]);
    }

    #[test]
    fn test_clean_relayout_returns_same_layout() {
        let doc = long_script(2);
        let mut engine = engine();
        let a = engine.relayout(&doc).unwrap();
        let b = engine.relayout(&doc).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
