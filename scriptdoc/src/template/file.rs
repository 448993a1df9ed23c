//! On-disk template schema and version migration

use super::config::{DurationConfig, NumberingConfig};
use super::error::TemplateError;
use super::style::{PageGeometry, StyleRule};
use super::Template;
use crate::model::{ParagraphKind, WritingForm};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version written by this build
pub const CURRENT_VERSION: u32 = 3;

/// Kind slugs introduced by schema version 2
const KINDS_ADDED_IN_V2: [&str; 6] = ["lyrics", "shot", "beat_heading", "inline_note", "sfx", "cue"];

/// Only the fields needed to route a file to the right parser
#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    name: Option<String>,
    version: u32,
}

/// Template file layout
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateFile {
    name: String,
    version: u32,
    form: WritingForm,
    page: PageGeometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    numbering: Option<NumberingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<DurationConfig>,
    #[serde(default)]
    rules: BTreeMap<String, StyleRule>,
}

/// Parse a template file, migrating older schema versions
///
/// `source` names the file in error messages. `fallback` supplies rules for
/// kinds an old schema did not know about and whose parent kind is missing
/// as well; it is only consulted for files older than [`CURRENT_VERSION`].
pub fn parse_template(
    content: &str,
    source: &str,
    fallback: impl FnOnce(WritingForm) -> Option<std::sync::Arc<Template>>,
) -> Result<Template, TemplateError> {
    let probe: VersionProbe = toml::from_str(content).map_err(|e| TemplateError::Parse {
        name: source.to_string(),
        message: e.to_string(),
    })?;
    let name = probe.name.unwrap_or_else(|| source.to_string());
    if probe.version == 0 || probe.version > CURRENT_VERSION {
        return Err(TemplateError::UnsupportedVersion {
            name,
            version: probe.version,
            supported: CURRENT_VERSION,
        });
    }

    let file: TemplateFile = toml::from_str(content).map_err(|e| TemplateError::Parse {
        name: name.clone(),
        message: e.to_string(),
    })?;

    let mut rules = BTreeMap::new();
    for (slug, rule) in file.rules {
        let kind = file
            .form
            .kind_from_slug(&slug)
            .ok_or_else(|| TemplateError::UnknownKind {
                template: file.name.clone(),
                form: file.form,
                slug: slug.clone(),
            })?;
        rules.insert(kind, rule);
    }

    let mut template = Template {
        name: file.name,
        form: file.form,
        page: file.page,
        numbering: file
            .numbering
            .unwrap_or_else(|| NumberingConfig::for_form(file.form)),
        duration: file
            .duration
            .unwrap_or_else(|| DurationConfig::for_form(file.form)),
        rules,
        migrated_from: None,
    };

    if file.version < CURRENT_VERSION {
        let fallback = fallback(template.form);
        migrate(&mut template, file.version, fallback.as_deref());
    }
    Ok(template)
}

/// Bring a template loaded from an older schema up to date
///
/// Version 1 lacked the kinds in [`KINDS_ADDED_IN_V2`]; each missing one is
/// filled from the rule of the kind it inherits from, or else from the
/// fallback template. Version 2 lacked `[duration]`, which the parser has
/// already defaulted. No existing rule is touched.
fn migrate(template: &mut Template, from_version: u32, fallback: Option<&Template>) {
    if from_version < 2 {
        for kind in template.form.kinds() {
            if !KINDS_ADDED_IN_V2.contains(&kind.slug()) || template.rules.contains_key(&kind) {
                continue;
            }
            if let Some(rule) = inherited_rule(template, fallback, kind) {
                log::debug!(
                    "Template '{}': filled {} during migration",
                    template.name,
                    kind
                );
                template.rules.insert(kind, rule);
            } else {
                log::warn!(
                    "Template '{}': no rule available for {} during migration",
                    template.name,
                    kind
                );
            }
        }
    }
    log::info!(
        "Migrated template '{}' from schema version {} to {}",
        template.name,
        from_version,
        CURRENT_VERSION
    );
    template.migrated_from = Some(from_version);
}

fn inherited_rule(
    template: &Template,
    fallback: Option<&Template>,
    kind: ParagraphKind,
) -> Option<StyleRule> {
    kind.inherits_from()
        .and_then(|parent| template.rules.get(&parent))
        .or_else(|| fallback.and_then(|f| f.rules.get(&kind)))
        .cloned()
}

/// Serialize a template at the current schema version
pub fn render_template(template: &Template) -> Result<String, TemplateError> {
    let file = TemplateFile {
        name: template.name.clone(),
        version: CURRENT_VERSION,
        form: template.form,
        page: template.page.clone(),
        numbering: Some(template.numbering.clone()),
        duration: Some(template.duration.clone()),
        rules: template
            .rules
            .iter()
            .map(|(kind, rule)| (kind.slug().to_string(), rule.clone()))
            .collect(),
    };
    toml::to_string(&file).map_err(|e| TemplateError::Serialize {
        name: template.name.clone(),
        message: e.to_string(),
    })
}
