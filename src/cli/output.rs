//! Handles all user-facing output for the CLI.
//!
//! This module is responsible for pretty-printing, colorizing output,
//! formatting errors, and generating JSON. Logs go to stderr through `tracing`;
//! everything here goes to stdout, except error reports.

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::archive::PersistOutcome;
use crate::generate::{ListedGroup, RunSummary};
use crate::{err_msg, GoldenError};

// ============================================================================
// CORE OUTPUT FUNCTIONS: User-facing CLI output utilities
// ============================================================================

/// Prints one line per archive, diffs of stale archives, orphans and a closing tally.
pub fn print_summary(summary: &RunSummary, check: bool) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    for group in &summary.groups {
        let _ = stdout.set_color(ColorSpec::new().set_bold(true));
        println!("{} ({})", group.group, group.function);
        let _ = stdout.reset();

        for case in &group.cases {
            let (label, color) = outcome_style(&case.outcome);
            let _ = stdout.set_color(ColorSpec::new().set_fg(color));
            print!("  {:<10}", label);
            let _ = stdout.reset();
            let mut markers = String::new();
            if case.skipped {
                markers.push_str(" [skip]");
            }
            if case.bugs > 0 {
                markers.push_str(&format!(" [bug x{}]", case.bugs));
            }
            println!(" {}/{}{}", group.group, case.file, markers);

            if let PersistOutcome::Stale { diff } = &case.outcome {
                print_diff(&mut stdout, diff);
            }
        }
    }

    if !summary.orphans.is_empty() {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        println!("Not produced by this run:");
        let _ = stdout.reset();
        for orphan in &summary.orphans {
            println!("  {}", orphan.display());
        }
    }

    let failed = summary
        .cases()
        .filter(|(_, c)| !c.outcome.is_clean())
        .count();
    let color = if check && !summary.is_up_to_date() {
        Color::Red
    } else {
        Color::Green
    };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    if check {
        println!(
            "{} archives checked in {} groups, {} out of date, {} orphaned",
            summary.case_count(),
            summary.groups.len(),
            failed,
            summary.orphans.len()
        );
    } else {
        println!(
            "{} archives in {} groups",
            summary.case_count(),
            summary.groups.len()
        );
    }
    let _ = stdout.reset();
    println!("fingerprint {}", summary.fingerprint);
}

/// Prints the groups and archive names `generate` would produce.
pub fn print_listing(groups: &[ListedGroup]) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for group in groups {
        let _ = stdout.set_color(ColorSpec::new().set_bold(true));
        print!("{}", group.group);
        let _ = stdout.reset();
        let tags: String = group.tags.iter().map(|t| format!(" #{}", t)).collect();
        println!(" ({}){}", group.function, tags);
        for case in &group.cases {
            println!("  {}/{}", group.group, case.file);
        }
    }
}

/// Pretty-prints any serializable result as JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), GoldenError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| err_msg!(Internal, "Failed to serialize output").with_source(e))?;
    println!("{}", json);
    Ok(())
}

/// Renders a fatal error as a `miette` report on stderr.
pub fn print_error(error: GoldenError) {
    eprintln!("{:?}", miette::Report::new(error));
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn outcome_style(outcome: &PersistOutcome) -> (&'static str, Option<Color>) {
    match outcome {
        PersistOutcome::Created => ("created", Some(Color::Green)),
        PersistOutcome::Updated => ("updated", Some(Color::Yellow)),
        PersistOutcome::Unchanged => ("unchanged", None),
        PersistOutcome::UpToDate => ("ok", Some(Color::Green)),
        PersistOutcome::Stale { .. } => ("stale", Some(Color::Red)),
        PersistOutcome::Missing => ("missing", Some(Color::Red)),
    }
}

fn print_diff(stdout: &mut StandardStream, diff: &str) {
    for line in diff.lines() {
        match line.chars().next() {
            Some('+') => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
            }
            Some('-') => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
            }
            _ => {
                let _ = stdout.reset();
            }
        }
        println!("    {}", line);
    }
    let _ = stdout.reset();
}
