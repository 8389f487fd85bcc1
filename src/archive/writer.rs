//! Persisting archives: writing them, or checking them against what is on disk.
//!
//! Archives live at `<root>/<group>/<NNN>[_<name>].txtar`. Both sinks remember which
//! files a run produced so that archives nobody generates any more can be reported.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use difference::{Changeset, Difference};
use serde::Serialize;
use walkdir::WalkDir;

use crate::{err_msg, GoldenError};

/// `000`, `003_name`, with spaces and colons replaced by underscores, plus `.txtar`.
pub fn archive_file_name(index: usize, name: Option<&str>) -> String {
    let mut stem = format!("{:03}", index);
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        stem.push('_');
        stem.push_str(name);
    }
    format!("{}.txtar", stem.replace([' ', ':'], "_"))
}

/// What persisting one archive did, or would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistOutcome {
    Created,
    Updated,
    Unchanged,
    UpToDate,
    /// The file on disk differs; `diff` has one `-`, `+` or ` ` prefixed line per line.
    Stale { diff: String },
    Missing,
}

impl PersistOutcome {
    /// `false` when check mode found the file out of date.
    pub fn is_clean(&self) -> bool {
        !matches!(self, PersistOutcome::Stale { .. } | PersistOutcome::Missing)
    }
}

/// Destination for formatted archives.
pub trait ArchiveSink {
    fn persist(
        &mut self,
        group: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<PersistOutcome, GoldenError>;

    /// Archives present in the touched group directories that this run did not produce.
    fn orphans(&self) -> Result<Vec<PathBuf>, GoldenError>;
}

/// Files produced so far, per group directory.
#[derive(Debug, Default)]
struct Produced {
    root: PathBuf,
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl Produced {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            groups: BTreeMap::new(),
        }
    }

    fn record(&mut self, group: &str, file_name: &str) -> PathBuf {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(file_name.to_string());
        self.root.join(group).join(file_name)
    }

    fn orphans(&self) -> Result<Vec<PathBuf>, GoldenError> {
        let mut orphans = Vec::new();
        for (group, produced) in &self.groups {
            let dir = self.root.join(group);
            if !dir.is_dir() {
                continue;
            }
            for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    err_msg!(Write, "Failed to list '{}'", dir.display()).with_source(e)
                })?;
                let name = entry.file_name().to_string_lossy();
                if name.ends_with(".txtar") && !produced.contains(&*name) {
                    orphans.push(entry.into_path());
                }
            }
        }
        Ok(orphans)
    }
}

fn read_existing(path: &Path) -> Result<Option<Vec<u8>>, GoldenError> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(err_msg!(Write, "Could not read file '{}'", path.display()).with_source(e)),
    }
}

// ============================================================================
// WRITE MODE
// ============================================================================

/// Writes archives, creating group directories as needed.
#[derive(Debug)]
pub struct ArchiveWriter {
    produced: Produced,
}

impl ArchiveWriter {
    pub fn new(root: &Path) -> Self {
        Self {
            produced: Produced::new(root),
        }
    }
}

impl ArchiveSink for ArchiveWriter {
    fn persist(
        &mut self,
        group: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<PersistOutcome, GoldenError> {
        let path = self.produced.record(group, file_name);
        let outcome = match read_existing(&path)? {
            Some(existing) if existing == data => return Ok(PersistOutcome::Unchanged),
            Some(_) => PersistOutcome::Updated,
            None => PersistOutcome::Created,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                err_msg!(Write, "Could not create directory '{}'", dir.display()).with_source(e)
            })?;
        }
        fs::write(&path, data).map_err(|e| {
            err_msg!(Write, "Could not write file '{}'", path.display()).with_source(e)
        })?;
        tracing::debug!("{}: {:?}", path.display(), outcome);
        Ok(outcome)
    }

    fn orphans(&self) -> Result<Vec<PathBuf>, GoldenError> {
        self.produced.orphans()
    }
}

// ============================================================================
// CHECK MODE
// ============================================================================

/// Compares archives with the files on disk without writing anything.
#[derive(Debug)]
pub struct ArchiveChecker {
    produced: Produced,
}

impl ArchiveChecker {
    pub fn new(root: &Path) -> Self {
        Self {
            produced: Produced::new(root),
        }
    }
}

impl ArchiveSink for ArchiveChecker {
    fn persist(
        &mut self,
        group: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<PersistOutcome, GoldenError> {
        let path = self.produced.record(group, file_name);
        let outcome = match read_existing(&path)? {
            None => PersistOutcome::Missing,
            Some(existing) if existing == data => PersistOutcome::UpToDate,
            Some(existing) => PersistOutcome::Stale {
                diff: line_diff(
                    &String::from_utf8_lossy(&existing),
                    &String::from_utf8_lossy(data),
                ),
            },
        };
        Ok(outcome)
    }

    fn orphans(&self) -> Result<Vec<PathBuf>, GoldenError> {
        self.produced.orphans()
    }
}

fn line_diff(old: &str, new: &str) -> String {
    let changeset = Changeset::new(old, new, "\n");
    let mut out = String::new();
    for diff in &changeset.diffs {
        let (prefix, text) = match diff {
            Difference::Same(x) => (' ', x),
            Difference::Add(x) => ('+', x),
            Difference::Rem(x) => ('-', x),
        };
        for line in text.lines() {
            out.push(prefix);
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
