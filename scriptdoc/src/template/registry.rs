//! Per-process template registry with two-level rule resolution

use super::builtin;
use super::error::TemplateError;
use super::style::StyleRule;
use super::Template;
use crate::model::{ParagraphKind, WritingForm};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

/// Where a resolved rule came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    /// The template asked for
    Template,
    /// The form's built-in fallback template
    Fallback,
}

/// A style rule together with its origin
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRule<'a> {
    pub rule: &'a StyleRule,
    pub source: RuleSource,
}

/// Listing entry for `templates list`
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateInfo {
    pub name: String,
    pub form: WritingForm,
    pub builtin: bool,
    pub migrated_from: Option<u32>,
}

/// User templates, per-form overrides, and the built-in fallbacks
#[derive(Debug, Default, Clone)]
pub struct TemplateRegistry {
    user: BTreeMap<String, Arc<Template>>,
    overrides: HashMap<WritingForm, Arc<Template>>,
}

impl TemplateRegistry {
    /// Registry holding only the built-in templates
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user template
    pub fn register(&mut self, template: Template) -> Result<Arc<Template>, TemplateError> {
        if builtin::is_builtin_name(template.name()) {
            return Err(TemplateError::ReservedName(template.name().to_string()));
        }
        let template = Arc::new(template);
        self.user
            .insert(template.name().to_string(), Arc::clone(&template));
        Ok(template)
    }

    /// Load and register a template file
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<Template>, TemplateError> {
        let template = Template::load(path.as_ref())?;
        log::info!(
            "Loaded template '{}' from {}",
            template.name(),
            path.as_ref().display()
        );
        self.register(template)
    }

    /// Load every `*.toml` file directly inside `dir`
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<Vec<Arc<Template>>, TemplateError> {
        let dir = dir.as_ref();
        let mut loaded = Vec::new();
        let mut paths: Vec<_> = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();
        for path in paths {
            loaded.push(self.load_file(&path)?);
        }
        Ok(loaded)
    }

    /// Look up a template by name, user templates first
    pub fn get(&self, name: &str) -> Result<Arc<Template>, TemplateError> {
        match self.user.get(name) {
            Some(template) => Ok(Arc::clone(template)),
            None => builtin::find(name),
        }
    }

    /// Use the named template for every document of `form`
    pub fn set_override(&mut self, form: WritingForm, name: &str) -> Result<(), TemplateError> {
        let template = self.get(name)?;
        if template.form() != form {
            return Err(TemplateError::FormMismatch {
                template: name.to_string(),
                expected: form,
                found: template.form(),
            });
        }
        self.overrides.insert(form, template);
        Ok(())
    }

    /// Drop the override for `form`
    pub fn clear_override(&mut self, form: WritingForm) {
        self.overrides.remove(&form);
    }

    /// The template documents of `form` use: the override, else the fallback
    pub fn resolve(&self, form: WritingForm) -> Result<Arc<Template>, TemplateError> {
        match self.overrides.get(&form) {
            Some(template) => Ok(Arc::clone(template)),
            None => builtin::fallback(form),
        }
    }

    /// Resolve the rule for `kind`: `template` first, then the built-in fallback
    pub fn rule<'a>(
        &self,
        template: &'a Template,
        kind: ParagraphKind,
    ) -> Result<ResolvedRule<'a>, TemplateError> {
        if kind.form() != template.form() {
            return Err(TemplateError::FormMismatch {
                template: template.name().to_string(),
                expected: template.form(),
                found: kind.form(),
            });
        }
        if let Ok(rule) = template.rule(kind) {
            return Ok(ResolvedRule {
                rule,
                source: RuleSource::Template,
            });
        }

        let fallback: &'static [Arc<Template>] = builtin::all()?;
        let letter = builtin::letter_name(template.form());
        let rule = fallback
            .iter()
            .find(|t| t.name() == letter)
            .and_then(|t| t.rule(kind).ok())
            .ok_or_else(|| TemplateError::MissingRule {
                template: template.name().to_string(),
                kind,
            })?;
        log::debug!(
            "Template '{}' has no rule for {}, using {}",
            template.name(),
            kind,
            letter
        );
        Ok(ResolvedRule {
            rule,
            source: RuleSource::Fallback,
        })
    }

    /// A complete copy of `template` with every missing rule filled from
    /// the fallback; returns the template itself when nothing is missing
    pub fn effective(&self, template: &Arc<Template>) -> Result<Arc<Template>, TemplateError> {
        let missing = template.missing_kinds();
        if missing.is_empty() {
            return Ok(Arc::clone(template));
        }
        let mut complete = Template::clone(template);
        for kind in missing {
            let resolved = self.rule(template, kind)?;
            complete.set_rule(kind, resolved.rule.clone())?;
        }
        Ok(Arc::new(complete))
    }

    /// Effective template for `form`
    pub fn resolve_effective(&self, form: WritingForm) -> Result<Arc<Template>, TemplateError> {
        let template = self.resolve(form)?;
        self.effective(&template)
    }

    /// All templates, built-ins first
    pub fn list(&self) -> Result<Vec<TemplateInfo>, TemplateError> {
        let builtins = builtin::all()?.iter().map(|t| (t, true));
        let user = self.user.values().map(|t| (t, false));
        Ok(builtins
            .chain(user)
            .map(|(template, builtin)| TemplateInfo {
                name: template.name().to_string(),
                form: template.form(),
                builtin,
                migrated_from: template.migrated_from(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComicKind, ScreenplayKind};
    use crate::template::PageGeometry;

    fn partial_screenplay() -> Template {
        let mut template = Template::new("wide", WritingForm::Screenplay, PageGeometry::letter());
        template
            .set_rule(
                ParagraphKind::Screenplay(ScreenplayKind::Action),
                StyleRule {
                    font_size: 11.0,
                    ..StyleRule::default()
                },
            )
            .unwrap();
        template
    }

    #[test]
    fn test_resolve_defaults_to_letter_fallback() {
        let registry = TemplateRegistry::new();
        for form in WritingForm::ALL {
            let template = registry.resolve(form).unwrap();
            assert_eq!(template.name(), builtin::letter_name(form));
        }
    }

    #[test]
    fn test_override_and_clear() {
        let mut registry = TemplateRegistry::new();
        registry.register(partial_screenplay()).unwrap();
        registry.set_override(WritingForm::Screenplay, "wide").unwrap();
        assert_eq!(registry.resolve(WritingForm::Screenplay).unwrap().name(), "wide");

        registry.clear_override(WritingForm::Screenplay);
        assert_eq!(
            registry.resolve(WritingForm::Screenplay).unwrap().name(),
            "screenplay-letter"
        );
    }

    #[test]
    fn test_override_rejects_other_form() {
        let mut registry = TemplateRegistry::new();
        let err = registry
            .set_override(WritingForm::Novel, "screenplay-a4")
            .unwrap_err();
        assert!(matches!(err, TemplateError::FormMismatch { .. }));
    }

    #[test]
    fn test_rule_two_level_resolution() {
        let registry = TemplateRegistry::new();
        let template = partial_screenplay();

        let own = registry
            .rule(&template, ParagraphKind::Screenplay(ScreenplayKind::Action))
            .unwrap();
        assert_eq!(own.source, RuleSource::Template);
        assert_eq!(own.rule.font_size, 11.0);

        let fallback = registry
            .rule(&template, ParagraphKind::Screenplay(ScreenplayKind::Dialogue))
            .unwrap();
        assert_eq!(fallback.source, RuleSource::Fallback);

        let err = registry
            .rule(&template, ParagraphKind::Comicbook(ComicKind::Caption))
            .unwrap_err();
        assert!(matches!(err, TemplateError::FormMismatch { .. }));
    }

    #[test]
    fn test_effective_template_is_complete() {
        let registry = TemplateRegistry::new();
        let template = Arc::new(partial_screenplay());
        let effective = registry.effective(&template).unwrap();
        assert!(effective.ensure_complete().is_ok());
        assert_eq!(
            effective
                .rule(ParagraphKind::Screenplay(ScreenplayKind::Action))
                .unwrap()
                .font_size,
            11.0
        );
    }

    #[test]
    fn test_builtin_names_are_reserved() {
        let mut registry = TemplateRegistry::new();
        let template = partial_screenplay().renamed("screenplay-letter");
        assert_eq!(
            registry.register(template).unwrap_err(),
            TemplateError::ReservedName("screenplay-letter".to_string())
        );
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        partial_screenplay().save(dir.path().join("wide.toml")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a template").unwrap();

        let mut registry = TemplateRegistry::new();
        let loaded = registry.load_dir(dir.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(registry.get("wide").is_ok());
        assert_eq!(registry.list().unwrap().len(), 11);
    }
}
