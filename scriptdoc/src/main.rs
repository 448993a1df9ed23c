//! scriptdoc - screenplay and manuscript converter
//!
//! A CLI tool for converting, paginating and analysing screenplays, stage
//! plays, audio dramas, comic scripts and novels.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ExportArgs, SourceArgs, TemplateCommands};
use scriptdoc::config::{AppConfig, CONFIG_FILE};
use scriptdoc::export::{
    check_destination, write_destination, write_report, ExportFormat, ExportOptions, ReportFormat,
};
use scriptdoc::pipeline::{self, Conversion};
use scriptdoc::statistics::{format_duration, ConversationTest};
use std::path::{Path, PathBuf};

/// Main entry point for the scriptdoc CLI application
fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

/// Run the CLI application
fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::init();
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Convert {
            input,
            output,
            to,
            source,
            export,
        } => {
            handle_convert_command(&input, &output, to, &source, &export, &config)?;
        }

        Commands::Batch {
            input,
            to,
            output,
            source,
            export,
        } => {
            handle_batch_command(&input, to, output, &source, &export, &config)?;
        }

        Commands::Paginate { input, source } => {
            handle_paginate_command(&input, &source, &config)?;
        }

        Commands::Stats {
            input,
            source,
            report,
            group,
            exclude,
        } => {
            handle_stats_command(&input, &source, report, group, exclude, &config)?;
        }

        Commands::Templates { command } => {
            handle_templates_command(command, &config)?;
        }
    }

    Ok(())
}

/// Load the configuration named on the command line, else ./scriptdoc.toml
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => AppConfig::load_or_default(CONFIG_FILE)
            .with_context(|| format!("Failed to load configuration {}", CONFIG_FILE)),
    }
}

/// Configured export options with the command line applied on top
fn export_options(args: &ExportArgs, config: &AppConfig) -> ExportOptions {
    let mut options = config.export.clone();
    if args.title_page {
        options.title_page = true;
    }
    if args.no_title_page {
        options.title_page = false;
    }
    if args.no_synopsis {
        options.synopsis = false;
    }
    if args.no_notes {
        options.notes = false;
    }
    if let Some(scenes) = &args.scenes {
        options.scenes = Some(scenes.clone());
    }
    if !args.highlight.is_empty() {
        options.highlight = args.highlight.clone();
    }
    if args.revisions {
        options.revision_marks = true;
    }
    options
}

fn conversion(source: &SourceArgs, export: ExportOptions) -> Conversion {
    Conversion {
        from: source.from,
        to: None,
        form: source.form,
        template: source.template.clone(),
        export,
    }
}

/// Import a file and open a laid-out session on it
fn open(input: &Path, source: &SourceArgs, config: &AppConfig) -> Result<scriptdoc::Session> {
    let conversion = conversion(source, ExportOptions::default());
    let document = pipeline::import(input, &conversion, config)
        .with_context(|| format!("Failed to import {}", input.display()))?;
    let mut registry = config
        .registry()
        .with_context(|| "Failed to load configured templates")?;
    pipeline::open_session(document, &conversion, &mut registry, config)
        .with_context(|| format!("Failed to prepare {}", input.display()))
}

/// Handle the convert command
fn handle_convert_command(
    input: &Path,
    output: &Path,
    to: Option<ExportFormat>,
    source: &SourceArgs,
    export: &ExportArgs,
    config: &AppConfig,
) -> Result<()> {
    let conversion = Conversion {
        to,
        ..conversion(source, export_options(export, config))
    };

    println!("Converting {}", input.display());
    let converted = pipeline::convert_file(input, output, &conversion, config).with_context(|| {
        format!(
            "Failed to convert {} to {}",
            input.display(),
            output.display()
        )
    })?;

    println!(
        "✓ Wrote {} ({}, template {}, {} paragraphs, {} pages)",
        converted.output.display(),
        converted.format,
        converted.template,
        converted.paragraphs,
        converted.pages
    );
    Ok(())
}

/// Handle the batch command
fn handle_batch_command(
    input: &Path,
    to: ExportFormat,
    output: Option<PathBuf>,
    source: &SourceArgs,
    export: &ExportArgs,
    config: &AppConfig,
) -> Result<()> {
    let out_dir = output.unwrap_or_else(|| input.to_path_buf());

    // The output tree is created up front so every conversion finds its directory
    for file in pipeline::discover(input) {
        let target = pipeline::output_path(input, &file, &out_dir, to);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let conversion = conversion(source, export_options(export, config));
    let results = pipeline::convert_dir(input, &out_dir, to, &conversion, config);

    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(converted) => println!(
                "✓ {} → {} ({} pages)",
                path.display(),
                converted.output.display(),
                converted.pages
            ),
            Err(e) => {
                failed += 1;
                println!("✗ {}: {}", path.display(), e);
            }
        }
    }

    println!(
        "\nConverted {} of {} files",
        results.len() - failed,
        results.len()
    );
    if failed > 0 {
        anyhow::bail!("{} files failed to convert", failed);
    }
    Ok(())
}

/// Handle the paginate command
fn handle_paginate_command(input: &Path, source: &SourceArgs, config: &AppConfig) -> Result<()> {
    let mut session = open(input, source, config)?;
    let layout = session
        .layout()
        .with_context(|| format!("Failed to paginate {}", input.display()))?;

    println!(
        "{}: {} pages with template {}",
        input.display(),
        layout.page_count(),
        session.template().name()
    );
    println!("Estimated running time: {}", format_duration(layout.duration));

    if !layout.scenes.is_empty() {
        println!();
        for scene in &layout.scenes {
            let number = scene.number.map(|n| n.to_string()).unwrap_or_default();
            let pages = if scene.first_page == scene.last_page {
                format!("p. {}", scene.first_page)
            } else {
                format!("pp. {}-{}", scene.first_page, scene.last_page)
            };
            println!(
                "  {:>5}  {:<40}  {:<10}  {}",
                number,
                scene.heading,
                pages,
                format_duration(scene.duration)
            );
        }
    }
    Ok(())
}

/// Handle the stats command
fn handle_stats_command(
    input: &Path,
    source: &SourceArgs,
    report: Option<PathBuf>,
    group: Option<Vec<String>>,
    exclude: Vec<String>,
    config: &AppConfig,
) -> Result<()> {
    let mut session = open(input, source, config)?;
    let statistics = session
        .statistics()
        .with_context(|| format!("Failed to collect statistics for {}", input.display()))?;

    let counts = &statistics.counts;
    println!("{}", input.display());
    println!("  Paragraphs: {}", counts.paragraphs);
    println!("  Words:      {}", counts.words);
    println!(
        "  Characters: {} ({} without spaces)",
        counts.characters, counts.characters_no_spaces
    );
    println!("  Pages:      {}", statistics.pages);
    println!("  Scenes:     {}", statistics.scenes.len());
    println!("  Duration:   {}", format_duration(statistics.duration));

    if !statistics.characters.is_empty() {
        println!("\nCharacters:");
        for row in &statistics.characters {
            println!(
                "  {:<24} {:>4} cues {:>6} words {:>4} scenes",
                row.name, row.cues, row.words, row.scenes
            );
        }
    }

    let mut tables = statistics.tables();

    if group.is_some() || !exclude.is_empty() {
        let test = ConversationTest {
            group: group.unwrap_or_default(),
            exclude,
            scenes: None,
        };
        let result = test.run(session.document());
        println!(
            "\nConversation test: {} ({} exchanges)",
            if result.passed { "passed" } else { "failed" },
            result.exchanges.len()
        );
        for exchange in &result.exchanges {
            println!(
                "  scene {}: {} → {}",
                exchange.scene, exchange.first, exchange.second
            );
        }
        tables.push(result.table());
    }

    if let Some(path) = report {
        let format = ReportFormat::from_extension(&path).with_context(|| {
            format!(
                "Unknown report format for {}. Supported: .csv, .xlsx",
                path.display()
            )
        })?;
        check_destination(&path)
            .with_context(|| format!("Cannot write report to {}", path.display()))?;
        let bytes = write_report(&tables, format).with_context(|| "Failed to encode report")?;
        write_destination(&path, &bytes)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("\n✓ Successfully wrote: {}", path.display());
    }
    Ok(())
}

/// Handle the templates command
fn handle_templates_command(command: TemplateCommands, config: &AppConfig) -> Result<()> {
    let registry = config
        .registry()
        .with_context(|| "Failed to load configured templates")?;

    match command {
        TemplateCommands::List => {
            println!("Available templates:\n");
            for info in registry.list().with_context(|| "Failed to list templates")? {
                let origin = if info.builtin { "built-in" } else { "user" };
                print!("  {:<24} {:<12} {}", info.name, info.form.slug(), origin);
                if let Some(version) = info.migrated_from {
                    print!(" (migrated from version {})", version);
                }
                println!();
            }
        }

        TemplateCommands::Show { name } => {
            let template = registry
                .get(&name)
                .with_context(|| format!("Template '{}' not found", name))?;
            let toml = template
                .to_toml_string()
                .with_context(|| format!("Failed to serialise template '{}'", name))?;
            println!("{}", toml);
        }

        TemplateCommands::Export { name, path, force } => {
            let template = registry
                .get(&name)
                .with_context(|| format!("Template '{}' not found", name))?;
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists. Use --force to overwrite it",
                    path.display()
                );
            }
            check_destination(&path)
                .with_context(|| format!("Cannot write template to {}", path.display()))?;
            template
                .save(&path)
                .with_context(|| format!("Failed to write template to {}", path.display()))?;
            println!("✓ Successfully wrote: {}", path.display());
        }
    }
    Ok(())
}
