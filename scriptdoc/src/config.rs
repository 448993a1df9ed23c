//! Application configuration from scriptdoc.toml

use crate::export::ExportOptions;
use crate::model::WritingForm;
use crate::template::{TemplateError, TemplateRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default file name looked up in the working directory
pub const CONFIG_FILE: &str = "scriptdoc.toml";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Writing form for new documents and ambiguous imports
    pub default_form: WritingForm,

    /// Quiet period before a relayout runs, in milliseconds
    pub debounce_ms: u64,

    /// Extra directories searched for template TOML files
    pub template_dirs: Vec<PathBuf>,

    /// Template name or TOML path to use per form, keyed by form slug
    pub templates: BTreeMap<String, String>,

    /// Export options used when the command line gives none
    pub export: ExportOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_form: WritingForm::Screenplay,
            debounce_ms: 300,
            template_dirs: Vec::new(),
            templates: BTreeMap::new(),
            export: ExportOptions::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a scriptdoc.toml file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration, falling back to defaults when the file is missing
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save configuration to a scriptdoc.toml file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Registry with the configured directories loaded and overrides set
    ///
    /// An override may name a registered template or a TOML file.
    pub fn registry(&self) -> Result<TemplateRegistry, ConfigError> {
        let mut registry = TemplateRegistry::new();
        for dir in &self.template_dirs {
            let loaded = registry.load_dir(dir)?;
            log::info!("Loaded {} templates from {}", loaded.len(), dir.display());
        }
        for (slug, name) in &self.templates {
            let form =
                WritingForm::from_slug(slug).ok_or_else(|| ConfigError::UnknownForm(slug.clone()))?;
            let path = Path::new(name);
            let name = if path.extension().is_some_and(|e| e == "toml") && path.exists() {
                registry.load_file(path)?.name().to_string()
            } else {
                name.clone()
            };
            registry.set_override(form, &name)?;
        }
        Ok(registry)
    }
}

/// Errors that can occur when loading or saving the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error for {path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error in {path}: {source}", path = .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown writing form '{0}' in [templates]")]
    UnknownForm(String),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let mut config = AppConfig {
            default_form: WritingForm::Novel,
            template_dirs: vec![PathBuf::from("templates")],
            debounce_ms: 150,
            ..AppConfig::default()
        };
        config
            .templates
            .insert("screenplay".to_string(), "screenplay-a4".to_string());
        config.export.notes = false;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_content = r#"
default_form = "stageplay"

[templates]
screenplay = "screenplay-a4"

[export]
synopsis = false
highlight = ["MARTA"]
"#;
        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.default_form, WritingForm::Stageplay);
        assert_eq!(config.debounce_ms, 300);
        assert!(!config.export.synopsis);
        assert!(config.export.title_page);
        assert_eq!(config.export.highlight, ["MARTA"]);

        let registry = config.registry().unwrap();
        assert_eq!(
            registry.resolve(WritingForm::Screenplay).unwrap().name(),
            "screenplay-a4"
        );
    }

    #[test]
    fn test_unknown_form_in_templates() {
        let config: AppConfig = toml::from_str("[templates]\nsonnet = \"x\"").unwrap();
        assert!(matches!(
            config.registry(),
            Err(ConfigError::UnknownForm(slug)) if slug == "sonnet"
        ));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "debounce_ms = \"soon\"").unwrap();
        assert!(matches!(
            AppConfig::load_or_default(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = AppConfig::default();
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }
}
