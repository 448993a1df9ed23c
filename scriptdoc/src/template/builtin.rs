//! Built-in templates compiled into the binary
//!
//! Every writing form ships a `<form>-letter` template (the embedded TOML
//! below) and a `<form>-a4` variant with the same rules on A4 paper. The
//! letter template is the form's fallback.

use super::error::TemplateError;
use super::style::PageGeometry;
use super::{file, Template};
use crate::model::WritingForm;
use std::sync::{Arc, OnceLock};

/// Embedded TOML per writing form
const SOURCES: [(WritingForm, &str); 5] = [
    (
        WritingForm::Screenplay,
        include_str!("../templates/screenplay-letter.toml"),
    ),
    (
        WritingForm::Stageplay,
        include_str!("../templates/stageplay-letter.toml"),
    ),
    (
        WritingForm::Audioplay,
        include_str!("../templates/audioplay-letter.toml"),
    ),
    (
        WritingForm::Comicbook,
        include_str!("../templates/comicbook-letter.toml"),
    ),
    (
        WritingForm::Novel,
        include_str!("../templates/novel-letter.toml"),
    ),
];

static BUILTINS: OnceLock<Result<Vec<Arc<Template>>, TemplateError>> = OnceLock::new();

/// Name of the letter-sized built-in for a form
pub fn letter_name(form: WritingForm) -> String {
    format!("{}-letter", form.slug())
}

/// Name of the A4 built-in for a form
pub fn a4_name(form: WritingForm) -> String {
    format!("{}-a4", form.slug())
}

/// All built-in templates, parsed on first use
pub fn all() -> Result<&'static [Arc<Template>], TemplateError> {
    BUILTINS
        .get_or_init(load_all)
        .as_ref()
        .map(Vec::as_slice)
        .map_err(Clone::clone)
}

/// Embedded TOML of the letter template for a form
pub fn source(form: WritingForm) -> &'static str {
    SOURCES
        .iter()
        .find(|(f, _)| *f == form)
        .map(|(_, content)| *content)
        .unwrap_or_default()
}

/// The fallback template for a form
pub fn fallback(form: WritingForm) -> Result<Arc<Template>, TemplateError> {
    find(&letter_name(form))
}

/// A built-in template by name
pub fn find(name: &str) -> Result<Arc<Template>, TemplateError> {
    all()?
        .iter()
        .find(|template| template.name() == name)
        .cloned()
        .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))
}

/// Whether `name` belongs to a built-in template
pub fn is_builtin_name(name: &str) -> bool {
    WritingForm::ALL
        .iter()
        .any(|form| letter_name(*form) == name || a4_name(*form) == name)
}

fn load_all() -> Result<Vec<Arc<Template>>, TemplateError> {
    let mut templates = Vec::with_capacity(SOURCES.len() * 2);
    for (form, content) in SOURCES {
        let name = letter_name(form);
        // Embedded sources are current-schema, so no migration fallback is needed
        let letter = file::parse_template(content, &name, |_| None)?;
        if letter.form() != form {
            return Err(TemplateError::FormMismatch {
                template: name,
                expected: form,
                found: letter.form(),
            });
        }
        let a4 = letter.with_page(a4_name(form), PageGeometry::a4());
        templates.push(Arc::new(letter));
        templates.push(Arc::new(a4));
    }
    log::debug!("Loaded {} built-in templates", templates.len());
    Ok(templates)
}
