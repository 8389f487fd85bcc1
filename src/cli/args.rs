//! Defines the command-line arguments and subcommands for the goldgen CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "goldgen",
    version,
    about = "Extracts table-driven test cases from Go test sources into txtar golden fixtures."
)]
pub struct GoldgenArgs {
    /// Log more: `-v` for progress, `-vv` for details. `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate every extracted case and write (or check) its archive.
    Generate {
        /// Directory holding the Go package to scan.
        #[arg(default_value = ".")]
        package_dir: PathBuf,
        /// Root of the group directories; defaults to `<PACKAGE_DIR>/testdata`.
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// YAML file overriding the extraction conventions.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Compare with the archives on disk instead of writing; fail if any differ.
        #[arg(long)]
        check: bool,
        /// The `cue` executable to run.
        #[arg(long)]
        cue: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,
    },
    /// Show the groups and cases that would be generated, without evaluating them.
    List {
        /// Directory holding the Go package to scan.
        #[arg(default_value = ".")]
        package_dir: PathBuf,
        /// YAML file overriding the extraction conventions.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,
    },
}

/// How results are printed on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}
