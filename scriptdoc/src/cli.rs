//! Command-line interface definitions for scriptdoc

use clap::{Args, Parser, Subcommand};
use scriptdoc::export::ExportFormat;
use scriptdoc::import::ImportFormat;
use scriptdoc::model::WritingForm;
use std::path::PathBuf;

fn parse_import_format(value: &str) -> Result<ImportFormat, String> {
    ImportFormat::from_slug(value).ok_or_else(|| {
        let known: Vec<&str> = ImportFormat::ALL.iter().map(|f| f.slug()).collect();
        format!("unknown source format '{}' (expected one of: {})", value, known.join(", "))
    })
}

fn parse_export_format(value: &str) -> Result<ExportFormat, String> {
    ExportFormat::from_slug(value).ok_or_else(|| {
        let known: Vec<&str> = ExportFormat::ALL.iter().map(|f| f.slug()).collect();
        format!("unknown target format '{}' (expected one of: {})", value, known.join(", "))
    })
}

fn parse_form(value: &str) -> Result<WritingForm, String> {
    WritingForm::from_slug(value).ok_or_else(|| {
        let known: Vec<&str> = WritingForm::ALL.iter().map(|f| f.slug()).collect();
        format!("unknown writing form '{}' (expected one of: {})", value, known.join(", "))
    })
}

/// CLI structure for the scriptdoc application
#[derive(Parser)]
#[command(name = "scriptdoc")]
#[command(version)]
#[command(about = "Screenplay, stage play and manuscript converter", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./scriptdoc.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by commands that read a document
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Source format (detected from content and extension by default)
    #[arg(long, value_parser = parse_import_format)]
    pub from: Option<ImportFormat>,

    /// Writing form for sources that do not declare one
    #[arg(long, value_parser = parse_form)]
    pub form: Option<WritingForm>,

    /// Template name or path to a template TOML file
    #[arg(short, long)]
    pub template: Option<String>,
}

/// What goes into an export
#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Force the title page on
    #[arg(long, conflicts_with = "no_title_page")]
    pub title_page: bool,

    /// Leave the title page out
    #[arg(long)]
    pub no_title_page: bool,

    /// Leave synopses out
    #[arg(long)]
    pub no_synopsis: bool,

    /// Leave inline notes out
    #[arg(long)]
    pub no_notes: bool,

    /// Export only these scenes (1-based positions)
    #[arg(long, value_delimiter = ',')]
    pub scenes: Option<Vec<usize>>,

    /// Highlight the cues and speech of these characters
    #[arg(long, value_delimiter = ',')]
    pub highlight: Vec<String>,

    /// Carry revision marks into the output
    #[arg(long)]
    pub revisions: bool,
}

/// Available subcommands for scriptdoc
#[derive(Subcommand)]
pub enum Commands {
    /// Convert a document between formats
    Convert {
        /// Source file
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Target format (taken from the output extension by default)
        #[arg(long, value_parser = parse_export_format)]
        to: Option<ExportFormat>,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Convert every recognised file under a directory
    Batch {
        /// Directory to walk
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Target format
        #[arg(long, value_parser = parse_export_format)]
        to: ExportFormat,

        /// Output directory (defaults to converting in place)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Paginate a document and list its scenes
    Paginate {
        /// Source file
        input: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print document statistics
    Stats {
        /// Source file
        input: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        /// Write the report tables (.csv or .xlsx)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Run the conversation test over these characters (all when empty)
        #[arg(long, value_delimiter = ',')]
        group: Option<Vec<String>>,

        /// Names whose mention fails an exchange in the conversation test
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },

    /// Inspect templates
    Templates {
        #[command(subcommand)]
        command: TemplateCommands,
    },
}

/// Template subcommands
#[derive(Subcommand)]
pub enum TemplateCommands {
    /// List built-in and configured templates
    List,

    /// Print a template as TOML
    Show {
        /// Template name
        name: String,
    },

    /// Write a template to a TOML file for editing
    Export {
        /// Template name
        name: String,

        /// Destination file
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
