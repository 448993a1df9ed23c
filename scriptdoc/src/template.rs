//! Template registry: named, versioned style sheets
//!
//! A [`Template`] pairs page geometry with one [`StyleRule`] per paragraph
//! kind of its writing form. Templates persist as TOML (see [`file`]);
//! every form has two built-in templates compiled into the binary, and the
//! [`TemplateRegistry`] resolves rules from a user template first and the
//! built-in fallback second.

pub mod builtin;
pub mod config;
pub mod error;
pub mod file;
pub mod registry;
pub mod style;

pub use config::{
    BlendWeights, CharacterRate, DurationConfig, DurationWeights, NumberPosition,
    NumberingConfig, PageRate, WordRate,
};
pub use error::TemplateError;
pub use file::CURRENT_VERSION;
pub use registry::{ResolvedRule, RuleSource, TemplateInfo, TemplateRegistry};
pub use style::{Alignment, CaseTransform, PageGeometry, StyleRule, POINTS_PER_INCH};

use crate::model::{ParagraphKind, WritingForm};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// A named style sheet for one writing form
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    form: WritingForm,
    /// Page size and margins
    pub page: PageGeometry,
    /// Numbering conventions
    pub numbering: NumberingConfig,
    /// Duration estimation
    pub duration: DurationConfig,
    rules: BTreeMap<ParagraphKind, StyleRule>,
    migrated_from: Option<u32>,
}

impl Template {
    /// Create a template with no rules
    pub fn new(name: impl Into<String>, form: WritingForm, page: PageGeometry) -> Self {
        Self {
            name: name.into(),
            form,
            page,
            numbering: NumberingConfig::for_form(form),
            duration: DurationConfig::for_form(form),
            rules: BTreeMap::new(),
            migrated_from: None,
        }
    }

    /// Parse a template from TOML, migrating older schema versions
    pub fn from_toml_str(content: &str) -> Result<Self, TemplateError> {
        file::parse_template(content, "<memory>", |form| builtin::fallback(form).ok())
    }

    /// Load a template file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| TemplateError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file::parse_template(&content, &path.display().to_string(), |form| {
            builtin::fallback(form).ok()
        })
    }

    /// Serialize to TOML at the current schema version
    pub fn to_toml_string(&self) -> Result<String, TemplateError> {
        file::render_template(self)
    }

    /// Save to a file at the current schema version
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TemplateError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        fs::write(path, content).map_err(|e| TemplateError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Template name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writing form the template styles
    pub fn form(&self) -> WritingForm {
        self.form
    }

    /// Schema version the template was migrated from, if it was
    pub fn migrated_from(&self) -> Option<u32> {
        self.migrated_from
    }

    /// Style rule for a kind defined by this template
    ///
    /// Fails with [`TemplateError::MissingRule`] if the template does not
    /// define one. Use [`TemplateRegistry::rule`] to fall back to the
    /// built-in template.
    pub fn rule(&self, kind: ParagraphKind) -> Result<&StyleRule, TemplateError> {
        self.rules.get(&kind).ok_or_else(|| TemplateError::MissingRule {
            template: self.name.clone(),
            kind,
        })
    }

    /// Whether the template defines a rule for `kind`
    pub fn has_rule(&self, kind: ParagraphKind) -> bool {
        self.rules.contains_key(&kind)
    }

    /// Define or replace the rule for a kind of this template's form
    pub fn set_rule(&mut self, kind: ParagraphKind, rule: StyleRule) -> Result<(), TemplateError> {
        if kind.form() != self.form {
            return Err(TemplateError::FormMismatch {
                template: self.name.clone(),
                expected: self.form,
                found: kind.form(),
            });
        }
        self.rules.insert(kind, rule);
        Ok(())
    }

    /// Defined rules in kind order
    pub fn rules(&self) -> impl Iterator<Item = (ParagraphKind, &StyleRule)> {
        self.rules.iter().map(|(kind, rule)| (*kind, rule))
    }

    /// Kinds of the form with no rule in this template
    pub fn missing_kinds(&self) -> Vec<ParagraphKind> {
        self.form
            .kinds()
            .into_iter()
            .filter(|kind| !self.rules.contains_key(kind))
            .collect()
    }

    /// Fail with the first missing kind, if any
    pub fn ensure_complete(&self) -> Result<(), TemplateError> {
        match self.missing_kinds().first() {
            Some(kind) => Err(TemplateError::MissingRule {
                template: self.name.clone(),
                kind: *kind,
            }),
            None => Ok(()),
        }
    }

    /// Copy of this template under a new name with different page geometry
    pub fn with_page(&self, name: impl Into<String>, page: PageGeometry) -> Template {
        Template {
            name: name.into(),
            page,
            ..self.clone()
        }
    }

    /// Copy of this template under a new name
    pub fn renamed(&self, name: impl Into<String>) -> Template {
        Template {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Wrap in an `Arc` for sharing between documents
    pub fn shared(self) -> Arc<Template> {
        Arc::new(self)
    }
}
