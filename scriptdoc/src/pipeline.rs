//! Conversion pipeline: import, correct and paginate, export
//!
//! Stage 1: Import - read the source file into a [`Document`]
//! Stage 2: Session - resolve the template, normalise, lay out
//! Stage 3: Export - encode into the destination format
//!
//! Batch conversion discovers every importable file under a directory and
//! converts them independently, in parallel when the `parallel` feature is
//! enabled.

use crate::cancel::CancelToken;
use crate::config::{AppConfig, ConfigError};
use crate::export::{ExportFormat, ExportOptions};
use crate::import::{import_file, ImportError, ImportFormat, ImportOptions};
use crate::model::{Document, WritingForm};
use crate::session::{Session, SessionError};
use crate::template::{Template, TemplateError, TemplateRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Errors that can occur while converting a file
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Cannot tell the output format of {}; pass --to", .0.display())]
    UnknownOutputFormat(PathBuf),
}

/// What a conversion reads and writes
#[derive(Debug, Clone, Default)]
pub struct Conversion {
    /// Source format; detected from content and extension when unset
    pub from: Option<ImportFormat>,
    /// Target format; taken from the output extension when unset
    pub to: Option<ExportFormat>,
    /// Writing form for sources that do not declare one
    pub form: Option<WritingForm>,
    /// Template name or TOML path; the registry's choice for the form when unset
    pub template: Option<String>,
    pub export: ExportOptions,
}

/// Result of one conversion
#[derive(Debug, Clone)]
pub struct Converted {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: ExportFormat,
    pub template: String,
    pub paragraphs: usize,
    pub pages: usize,
}

/// Resolve the template for a document form
///
/// `choice` may name a registered or built-in template, or point at a TOML
/// file. Partial templates are completed from the form's fallback.
pub fn resolve_template(
    registry: &mut TemplateRegistry,
    form: WritingForm,
    choice: Option<&str>,
) -> Result<Arc<Template>, TemplateError> {
    let template = match choice {
        Some(choice) => {
            let path = Path::new(choice);
            if path.extension().is_some_and(|e| e == "toml") && path.is_file() {
                registry.load_file(path)?
            } else {
                registry.get(choice)?
            }
        }
        None => registry.resolve(form)?,
    };
    registry.effective(&template)
}

/// Stage 1: import a source file
pub fn import(
    input: &Path,
    conversion: &Conversion,
    config: &AppConfig,
) -> Result<Document, PipelineError> {
    let options = ImportOptions::with_form(conversion.form.unwrap_or(config.default_form));
    Ok(import_file(input, conversion.from, &options, &CancelToken::new())?)
}

/// Stage 2: open a session on an imported document
pub fn open_session(
    document: Document,
    conversion: &Conversion,
    registry: &mut TemplateRegistry,
    config: &AppConfig,
) -> Result<Session, PipelineError> {
    let template = resolve_template(registry, document.form(), conversion.template.as_deref())?;
    let mut session = Session::new(document, template)?;
    session.set_debounce(config.debounce());
    Ok(session)
}

/// Convert one file
///
/// # Arguments
/// * `input` - Source file
/// * `output` - Destination file; its parent directory must exist
/// * `conversion` - Formats, template and export options
/// * `config` - Application configuration supplying defaults and templates
///
/// # Returns
/// * `Ok(Converted)` - What was written
/// * `Err(PipelineError)` - The failing stage's error; nothing is written on error
pub fn convert_file(
    input: &Path,
    output: &Path,
    conversion: &Conversion,
    config: &AppConfig,
) -> Result<Converted, PipelineError> {
    let format = conversion
        .to
        .or_else(|| ExportFormat::from_extension(output))
        .ok_or_else(|| PipelineError::UnknownOutputFormat(output.to_path_buf()))?;

    let document = import(input, conversion, config)?;
    let mut registry = config.registry()?;
    let mut session = open_session(document, conversion, &mut registry, config)?;
    let pages = session.layout().map_err(SessionError::from)?.page_count();

    session
        .spawn_export(output.to_path_buf(), Some(format), conversion.export.clone())?
        .join()?;

    Ok(Converted {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        format,
        template: session.template().name().to_string(),
        paragraphs: session.document().len(),
        pages,
    })
}

/// Files under `root` an importer recognises by extension, in name order
pub fn discover(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| {
            // Office lock files share the extension of the document they lock
            let name = e.file_name().to_string_lossy();
            !name.starts_with("~$") && !name.starts_with(".~lock.")
        })
        .filter(|e| ImportFormat::from_extension(e.path()).is_some())
        .map(|e| e.path().to_path_buf())
        .collect()
}

/// Destination for `input` under `out_dir`, keeping its path relative to `root`
pub fn output_path(root: &Path, input: &Path, out_dir: &Path, format: ExportFormat) -> PathBuf {
    let relative = input.strip_prefix(root).unwrap_or(input);
    let mut output = out_dir.join(relative);
    output.set_extension(format.extension());
    output
}

/// Convert every recognised file under `root` into `out_dir`
///
/// Each file succeeds or fails on its own; results come back in discovery
/// order. Directories under `out_dir` mirroring `root` must already exist.
pub fn convert_dir(
    root: &Path,
    out_dir: &Path,
    format: ExportFormat,
    conversion: &Conversion,
    config: &AppConfig,
) -> Vec<(PathBuf, Result<Converted, PipelineError>)> {
    let inputs: Vec<PathBuf> = discover(root)
        .into_iter()
        // Skip earlier outputs when converting in place
        .filter(|path| !(root == out_dir && ExportFormat::from_extension(path) == Some(format)))
        .collect();
    log::info!("Converting {} files from {}", inputs.len(), root.display());

    let conversion = Conversion {
        to: Some(format),
        ..conversion.clone()
    };
    let convert = |input: &PathBuf| {
        let output = output_path(root, input, out_dir, format);
        let result = convert_file(input, &output, &conversion, config);
        if let Err(e) = &result {
            log::warn!("Failed to convert {}: {}", input.display(), e);
        }
        (input.clone(), result)
    };

    #[cfg(feature = "parallel")]
    let results = inputs.par_iter().map(convert).collect();

    #[cfg(not(feature = "parallel"))]
    let results = inputs.iter().map(convert).collect();

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SCENE: &str = "EXT. PIER - DAY\n\nWaves break.\n\nMARTA\nLate again.\n";

    #[test]
    fn test_convert_file_detects_formats() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pier.fountain");
        let output = dir.path().join("pier.fdx");
        fs::write(&input, SCENE).unwrap();

        let converted =
            convert_file(&input, &output, &Conversion::default(), &AppConfig::default()).unwrap();
        assert_eq!(converted.format, ExportFormat::Fdx);
        assert_eq!(converted.template, "screenplay-letter");
        assert_eq!(converted.paragraphs, 4);
        assert_eq!(converted.pages, 1);
        let xml = fs::read_to_string(&output).unwrap();
        assert!(xml.contains("<FinalDraft"));
    }

    #[test]
    fn test_unknown_output_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pier.fountain");
        fs::write(&input, SCENE).unwrap();
        let result = convert_file(
            &input,
            &dir.path().join("pier.odt"),
            &Conversion::default(),
            &AppConfig::default(),
        );
        assert!(matches!(result, Err(PipelineError::UnknownOutputFormat(_))));
    }

    #[test]
    fn test_template_of_other_form_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pier.fountain");
        fs::write(&input, SCENE).unwrap();
        let conversion = Conversion {
            template: Some("novel-letter".to_string()),
            ..Conversion::default()
        };
        let result = convert_file(
            &input,
            &dir.path().join("pier.txt"),
            &conversion,
            &AppConfig::default(),
        );
        assert!(matches!(
            result,
            Err(PipelineError::Session(SessionError::TemplateForm { .. }))
        ));
    }

    #[test]
    fn test_discover_skips_lock_files_and_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("act2")).unwrap();
        fs::write(dir.path().join("a.fountain"), SCENE).unwrap();
        fs::write(dir.path().join("act2/b.fdx"), "<FinalDraft/>").unwrap();
        fs::write(dir.path().join("~$draft.docx"), "").unwrap();
        fs::write(dir.path().join("notes.odt"), "").unwrap();

        let found: Vec<PathBuf> = discover(dir.path())
            .into_iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(found, [PathBuf::from("a.fountain"), PathBuf::from("act2/b.fdx")]);
    }

    #[test]
    fn test_convert_dir_in_place() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.fountain"), SCENE).unwrap();
        fs::write(dir.path().join("two.fountain"), SCENE).unwrap();

        let results = convert_dir(
            dir.path(),
            dir.path(),
            ExportFormat::Text,
            &Conversion::default(),
            &AppConfig::default(),
        );
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert!(dir.path().join("one.txt").exists());
        assert!(dir.path().join("two.txt").exists());
    }
}
