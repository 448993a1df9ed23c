//! Editing session: a document with its template, corrector and engine
//!
//! Every mutation goes through the model, then the corrector for the
//! touched region, then marks the pagination engine dirty. Relayout is
//! debounced: [`Session::poll`] only runs a pass once edits have been quiet
//! for the debounce window, while [`Session::layout`] always brings the
//! layout up to date before export or statistics read it.
//!
//! Imports and exports run on worker threads over a snapshot and can be
//! cancelled between paragraphs through the [`Job`] handle.

use crate::cancel::CancelToken;
use crate::corrector::Corrector;
use crate::export::{export_file, exporter_for, ExportError, ExportFormat, ExportJob, ExportOptions};
use crate::import::{import_file, ImportError, ImportFormat, ImportOptions};
use crate::layout::{Layout, LayoutCell, LayoutError, PaginationEngine};
use crate::model::{Document, EditRange, ModelError, Paragraph, ParagraphAttributes, ParagraphKind};
use crate::statistics::{self, Statistics};
use crate::template::{Template, TemplateError, TemplateRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default quiet period before a debounced relayout
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Errors surfaced by session operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Template '{template}' is for {found} documents, not {expected}")]
    TemplateForm {
        template: String,
        expected: crate::model::WritingForm,
        found: crate::model::WritingForm,
    },

    #[error("Worker thread panicked")]
    WorkerPanicked,
}

/// Handle to work running on another thread
#[derive(Debug)]
pub struct Job<T> {
    cancel: CancelToken,
    handle: JoinHandle<Result<T, SessionError>>,
}

impl<T: Send + 'static> Job<T> {
    fn spawn<F>(work: F) -> Self
    where
        F: FnOnce(&CancelToken) -> Result<T, SessionError> + Send + 'static,
    {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::spawn(move || work(&token));
        Self { cancel, handle }
    }

    /// Ask the worker to stop at the next paragraph boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the result
    pub fn join(self) -> Result<T, SessionError> {
        self.handle
            .join()
            .map_err(|_| SessionError::WorkerPanicked)?
    }
}

/// Import a file on a worker thread; a cancelled import yields no document
pub fn spawn_import(
    path: PathBuf,
    format: Option<ImportFormat>,
    options: ImportOptions,
) -> Job<Document> {
    Job::spawn(move |cancel| Ok(import_file(&path, format, &options, cancel)?))
}

/// A document being edited
#[derive(Debug)]
pub struct Session {
    document: Document,
    template: Arc<Template>,
    corrector: Corrector,
    engine: PaginationEngine,
    debounce: Duration,
    last_edit: Option<Instant>,
}

impl Session {
    /// Start a session, normalising the whole document once
    pub fn new(mut document: Document, template: Arc<Template>) -> Result<Self, SessionError> {
        check_form(&document, &template)?;
        let corrector = Corrector::default();
        let changed = corrector.normalize_document(&mut document, &template)?;
        log::info!(
            "Session opened: {} paragraphs, template '{}', {} corrected",
            document.len(),
            template.name(),
            changed
        );
        Ok(Self {
            engine: PaginationEngine::new(Arc::clone(&template)),
            document,
            template,
            corrector,
            debounce: DEFAULT_DEBOUNCE,
            last_edit: None,
        })
    }

    /// Start a session with the registry's template for the document's form
    pub fn with_registry(document: Document, registry: &TemplateRegistry) -> Result<Self, SessionError> {
        let template = registry.resolve(document.form())?;
        Self::new(document, template)
    }

    pub fn with_corrector(mut self, corrector: Corrector) -> Self {
        self.corrector = corrector;
        self
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    /// Deep copy for worker threads
    pub fn snapshot(&self) -> Arc<Document> {
        self.document.snapshot()
    }

    /// Handle through which other threads read the latest layout
    pub fn layout_cell(&self) -> LayoutCell {
        self.engine.cell()
    }

    /// Whether the published layout matches the document
    pub fn is_clean(&self) -> bool {
        self.engine.is_clean()
    }

    /// Switch templates, renormalising the document against the new rules
    pub fn set_template(&mut self, template: Arc<Template>) -> Result<(), SessionError> {
        check_form(&self.document, &template)?;
        self.corrector
            .normalize_document(&mut self.document, &template)?;
        self.engine.set_template(Arc::clone(&template));
        self.template = template;
        self.last_edit = Some(Instant::now());
        Ok(())
    }

    /// Apply a model mutation, correct the region it touched and mark the
    /// layout dirty
    ///
    /// Either the whole edit lands, corrected, or the document is left as
    /// it was.
    pub fn edit<F>(&mut self, mutation: F) -> Result<EditRange, SessionError>
    where
        F: FnOnce(&mut Document) -> Result<EditRange, ModelError>,
    {
        let edit = if self.template.ensure_complete().is_ok() {
            // Model operations validate before mutating; correction cannot fail
            let edit = mutation(&mut self.document)?;
            self.corrector
                .normalize_edit(&mut self.document, &edit, &self.template)?;
            edit
        } else {
            // A rule may be missing for the touched kinds: commit once corrected
            let mut working = self.document.clone();
            let edit = mutation(&mut working)?;
            self.corrector
                .normalize_edit(&mut working, &edit, &self.template)?;
            self.document = working;
            edit
        };
        self.engine.mark_dirty(&edit);
        // Continuation markers may change anywhere in the scene
        if !self.document.is_empty() {
            let at = edit.start.min(self.document.len() - 1);
            let scene = self.document.enclosing_scene(at);
            self.engine.touch(scene.start);
        }
        self.last_edit = Some(Instant::now());
        log::debug!(
            "Edit at {}: -{} +{} (revision {})",
            edit.start,
            edit.removed,
            edit.inserted,
            self.document.revision()
        );
        Ok(edit)
    }

    pub fn insert(&mut self, index: usize, paragraph: Paragraph) -> Result<EditRange, SessionError> {
        self.edit(|document| document.insert(index, paragraph))
    }

    pub fn push(&mut self, paragraph: Paragraph) -> Result<EditRange, SessionError> {
        self.edit(|document| document.push(paragraph))
    }

    pub fn remove(&mut self, index: usize) -> Result<Paragraph, SessionError> {
        let mut removed = None;
        self.edit(|document| {
            let (paragraph, edit) = document.remove(index)?;
            removed = Some(paragraph);
            Ok(edit)
        })?;
        removed.ok_or(SessionError::Model(ModelError::IndexOutOfRange {
            index,
            len: self.document.len(),
        }))
    }

    pub fn replace(&mut self, index: usize, paragraph: Paragraph) -> Result<EditRange, SessionError> {
        self.edit(|document| document.replace(index, paragraph))
    }

    pub fn split(&mut self, index: usize, offset: usize) -> Result<EditRange, SessionError> {
        self.edit(|document| document.split(index, offset))
    }

    pub fn merge(&mut self, index: usize) -> Result<EditRange, SessionError> {
        self.edit(|document| document.merge(index))
    }

    pub fn retype(&mut self, index: usize, kind: ParagraphKind) -> Result<EditRange, SessionError> {
        self.edit(|document| document.retype(index, kind))
    }

    pub fn set_text(&mut self, index: usize, text: impl Into<String>) -> Result<EditRange, SessionError> {
        let text = text.into();
        self.edit(|document| document.set_text(index, text))
    }

    pub fn set_attributes(
        &mut self,
        index: usize,
        attributes: ParagraphAttributes,
    ) -> Result<EditRange, SessionError> {
        self.edit(|document| document.set_attributes(index, attributes))
    }

    /// Bring the layout up to date now
    ///
    /// On a failed pass the last good layout stays published and the error
    /// is returned.
    pub fn layout(&mut self) -> Result<Arc<Layout>, LayoutError> {
        let layout = self.engine.relayout(&self.document)?;
        self.last_edit = None;
        Ok(layout)
    }

    /// Debounced relayout: runs a pass only once edits have been quiet for
    /// the debounce window, returning the new layout when it did
    pub fn poll(&mut self) -> Result<Option<Arc<Layout>>, LayoutError> {
        if self.engine.is_clean() {
            return Ok(None);
        }
        if let Some(at) = self.last_edit {
            if at.elapsed() < self.debounce {
                return Ok(None);
            }
        }
        self.layout().map(Some)
    }

    /// Statistics over the current document and an up-to-date layout
    pub fn statistics(&mut self) -> Result<Statistics, SessionError> {
        let layout = self.layout()?;
        Ok(statistics::collect(&self.document, &layout))
    }

    /// Encode the document in memory
    pub fn export(&mut self, format: ExportFormat, options: &ExportOptions) -> Result<Vec<u8>, SessionError> {
        let layout = self.layout()?;
        let job = ExportJob::new(&self.document, &self.template, &layout, options);
        Ok(exporter_for(format).export(&job)?)
    }

    /// Export a snapshot to `path` on a worker thread
    ///
    /// The layout is brought up to date first, so the worker never sees a
    /// stale one.
    pub fn spawn_export(
        &mut self,
        path: PathBuf,
        format: Option<ExportFormat>,
        options: ExportOptions,
    ) -> Result<Job<()>, SessionError> {
        let layout = self.layout()?;
        let snapshot = self.snapshot();
        let template = Arc::clone(&self.template);
        Ok(Job::spawn(move |cancel| {
            let job = ExportJob::new(&snapshot, &template, &layout, &options);
            Ok(export_file(&path, format, &job, cancel)?)
        }))
    }
}

fn check_form(document: &Document, template: &Template) -> Result<(), SessionError> {
    if document.form() != template.form() {
        return Err(SessionError::TemplateForm {
            template: template.name().to_string(),
            expected: document.form(),
            found: template.form(),
        });
    }
    Ok(())
}
