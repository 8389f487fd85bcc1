//! The goldgen Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::archive::{ArchiveChecker, ArchiveSink, ArchiveWriter};
use crate::cli::args::{Command, GoldgenArgs, OutputFormat};
use crate::config::ExtractorConfig;
use crate::eval::CueCommand;
use crate::generate::Generator;
use crate::syntax::{LoadedPackage, PackageLoader};
use crate::{err_ctx, GoldenError};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = GoldgenArgs::parse();
    init_tracing(args.verbose);

    // Dispatch to the appropriate subcommand handler.
    let result = match args.command {
        Command::Generate {
            package_dir,
            out,
            config,
            check,
            cue,
            format,
        } => handle_generate(&package_dir, out, config.as_deref(), check, cue, format),
        Command::List {
            package_dir,
            config,
            format,
        } => handle_list(&package_dir, config.as_deref(), format),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            output::print_error(e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ExtractorConfig, GoldenError> {
    match path {
        Some(path) => ExtractorConfig::load(path),
        None => Ok(ExtractorConfig::default()),
    }
}

fn load_packages(
    dir: &Path,
    config: &ExtractorConfig,
) -> Result<Vec<LoadedPackage>, GoldenError> {
    PackageLoader::new(config.package_path.clone()).load_dir(dir)
}

/// Handles the `generate` subcommand. Returns `false` when check mode found differences.
fn handle_generate(
    package_dir: &Path,
    out: Option<PathBuf>,
    config: Option<&Path>,
    check: bool,
    cue: Option<String>,
    format: OutputFormat,
) -> Result<bool, GoldenError> {
    let mut config = load_config(config)?;
    if let Some(cue) = cue {
        config.engine.program = cue;
    }
    let out = out.unwrap_or_else(|| package_dir.join("testdata"));
    let packages = load_packages(package_dir, &config)?;

    let engine = CueCommand::new(&config.engine);
    let version = engine.version().map_err(|e| {
        err_ctx!(
            Eval,
            format!("Cannot run '{}': {}", config.engine.program, e),
            help = "install cue, or point --cue or `engine.program` at it"
        )
        .with_source(e)
    })?;
    tracing::info!("Using {}", version);

    let mut sink: Box<dyn ArchiveSink> = if check {
        Box::new(ArchiveChecker::new(&out))
    } else {
        Box::new(ArchiveWriter::new(&out))
    };
    let summary = Generator::new(&config, &engine).run(&packages, sink.as_mut())?;

    match format {
        OutputFormat::Human => output::print_summary(&summary, check),
        OutputFormat::Json => output::print_json(&summary)?,
    }
    Ok(!check || summary.is_up_to_date())
}

/// Handles the `list` subcommand.
fn handle_list(
    package_dir: &Path,
    config: Option<&Path>,
    format: OutputFormat,
) -> Result<bool, GoldenError> {
    let config = load_config(config)?;
    let packages = load_packages(package_dir, &config)?;
    let engine = CueCommand::new(&config.engine);
    let groups = Generator::new(&config, &engine).list(&packages)?;
    match format {
        OutputFormat::Human => output::print_listing(&groups),
        OutputFormat::Json => output::print_json(&groups)?,
    }
    Ok(true)
}
