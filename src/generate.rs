//! Orchestration of a generation run.
//!
//! For every loaded package the generator scans the test functions, collects each
//! group's tags, extracts its cases, evaluates their inputs and hands the formatted
//! archives to an [`ArchiveSink`]. Groups are processed one at a time behind a fault
//! barrier: the first fatal error is logged with the failing group and aborts the run.
//!
//! Header lines follow the case's fields in literal order, so the header of
//!
//! ```go
//! {name: "a", in: `x: 1`, skip: true}
//! ```
//!
//! reads banner, `#name: a`, any `#skip` / `#bug: true` markers produced by the input,
//! `skip: true`, then one `#<tag>` line per group tag.

use std::path::PathBuf;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::archive::{archive_file_name, Archive, ArchiveSink, PersistOutcome};
use crate::config::ExtractorConfig;
use crate::eval::{Evaluation, EvaluationBridge, EvaluationEngine, LEGACY_FILE};
use crate::extract::{
    CaseField, Candidate, MetadataCollector, TestCaseExtractor, TestCaseRecord,
    TestFunctionScanner, TestGroup,
};
use crate::syntax::LoadedPackage;
use crate::types::TypeInfo;
use crate::GoldenError;

// ============================================================================
// REPORTS
// ============================================================================

/// One persisted archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    pub index: usize,
    pub name: Option<String>,
    /// Archive file name inside the group directory.
    pub file: String,
    /// Entry names, in archive order.
    pub entries: Vec<String>,
    pub skipped: bool,
    /// Number of `#bug: true` markers.
    pub bugs: usize,
    pub outcome: PersistOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    pub group: String,
    pub function: String,
    pub tags: Vec<String>,
    pub cases: Vec<CaseReport>,
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub groups: Vec<GroupReport>,
    /// Archives in touched group directories that the run did not produce.
    pub orphans: Vec<PathBuf>,
    /// SHA-256 over every archive's path and bytes, in production order.
    pub fingerprint: String,
}

impl RunSummary {
    pub fn case_count(&self) -> usize {
        self.groups.iter().map(|g| g.cases.len()).sum()
    }

    pub fn cases(&self) -> impl Iterator<Item = (&GroupReport, &CaseReport)> {
        self.groups
            .iter()
            .flat_map(|g| g.cases.iter().map(move |c| (g, c)))
    }

    /// Every archive is current and nothing is orphaned.
    pub fn is_up_to_date(&self) -> bool {
        self.orphans.is_empty() && self.cases().all(|(_, c)| c.outcome.is_clean())
    }
}

/// A group whose processing hit a fatal error.
#[derive(Debug)]
pub struct GroupFailure {
    pub group: String,
    pub error: GoldenError,
}

/// A group as `list` shows it: extracted but not evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedGroup {
    pub group: String,
    pub function: String,
    pub tags: Vec<String>,
    pub cases: Vec<ListedCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedCase {
    pub index: usize,
    pub name: Option<String>,
    pub file: String,
    pub fields: Vec<CaseField>,
}

// ============================================================================
// GENERATOR
// ============================================================================

/// An assembled archive and what went into its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledCase {
    pub archive: Archive,
    pub skipped: bool,
    pub bugs: usize,
}

pub struct Generator<'a, E> {
    config: &'a ExtractorConfig,
    engine: &'a E,
}

impl<'a, E: EvaluationEngine> Generator<'a, E> {
    pub fn new(config: &'a ExtractorConfig, engine: &'a E) -> Self {
        Self { config, engine }
    }

    /// Generates the archives of every package into `sink`.
    pub fn run(
        &self,
        packages: &[LoadedPackage],
        sink: &mut dyn ArchiveSink,
    ) -> Result<RunSummary, GoldenError> {
        let mut hasher = Sha256::new();
        let mut groups = Vec::new();
        for loaded in packages {
            let candidates =
                TestFunctionScanner::new(self.config).scan(&loaded.package, &loaded.types);
            tracing::info!(
                "{}: {} test functions",
                loaded.package.path,
                candidates.len()
            );
            for candidate in candidates {
                match self.process_group(candidate, &loaded.types, sink, &mut hasher) {
                    Ok(report) => groups.push(report),
                    Err(failure) => {
                        tracing::error!(group = %failure.group, "{}", failure.error);
                        return Err(failure.error);
                    }
                }
            }
        }
        let orphans = sink.orphans()?;
        for orphan in &orphans {
            tracing::warn!("{}: not produced by this run", orphan.display());
        }
        Ok(RunSummary {
            groups,
            orphans,
            fingerprint: format!("{:x}", hasher.finalize()),
        })
    }

    /// Scans and extracts without evaluating anything.
    pub fn list(&self, packages: &[LoadedPackage]) -> Result<Vec<ListedGroup>, GoldenError> {
        let mut listed = Vec::new();
        for loaded in packages {
            let scanner = TestFunctionScanner::new(self.config);
            for candidate in scanner.scan(&loaded.package, &loaded.types) {
                let (group, records) = self.extract_group(candidate, &loaded.types)?;
                listed.push(ListedGroup {
                    cases: records
                        .into_iter()
                        .map(|r| ListedCase {
                            index: r.index,
                            file: archive_file_name(r.index, r.name.as_deref()),
                            name: r.name,
                            fields: r.fields,
                        })
                        .collect(),
                    group: group.name,
                    function: group.function,
                    tags: group.tags,
                });
            }
        }
        Ok(listed)
    }

    /// The fault barrier around one group.
    pub fn process_group(
        &self,
        candidate: Candidate<'_>,
        info: &dyn TypeInfo,
        sink: &mut dyn ArchiveSink,
        hasher: &mut Sha256,
    ) -> Result<GroupReport, GroupFailure> {
        let group = candidate.group.name.clone();
        self.generate_group(candidate, info, sink, hasher)
            .map_err(|error| GroupFailure { group, error })
    }

    fn extract_group(
        &self,
        candidate: Candidate<'_>,
        info: &dyn TypeInfo,
    ) -> Result<(TestGroup, Vec<TestCaseRecord>), GoldenError> {
        let Candidate {
            mut group,
            func,
            file,
        } = candidate;
        MetadataCollector::new(self.config).collect(func, file, info, &mut group)?;
        let records = TestCaseExtractor::new(self.config).extract(func, file, info, &mut group)?;
        Ok((group, records))
    }

    fn generate_group(
        &self,
        candidate: Candidate<'_>,
        info: &dyn TypeInfo,
        sink: &mut dyn ArchiveSink,
        hasher: &mut Sha256,
    ) -> Result<GroupReport, GoldenError> {
        let (group, records) = self.extract_group(candidate, info)?;
        tracing::info!("{}: {} cases", group.name, records.len());

        let bridge = EvaluationBridge::new(self.engine);
        let mut cases = Vec::with_capacity(records.len());
        for record in &records {
            let label = record.label(&group);
            let assembled = self.assemble(&group, record, &bridge)?;
            let file = archive_file_name(record.index, record.name.as_deref());
            let data = assembled.archive.format();
            let outcome = sink
                .persist(&group.name, &file, &data)
                .map_err(|e| e.prefixed(&label))?;

            hasher.update(group.name.as_bytes());
            hasher.update(b"/");
            hasher.update(file.as_bytes());
            hasher.update(b"\n");
            hasher.update(&data);

            cases.push(CaseReport {
                index: record.index,
                name: record.name.clone(),
                file,
                entries: assembled
                    .archive
                    .file_names()
                    .into_iter()
                    .map(String::from)
                    .collect(),
                skipped: assembled.skipped,
                bugs: assembled.bugs,
                outcome,
            });
        }

        Ok(GroupReport {
            group: group.name,
            function: group.function,
            tags: group.tags,
            cases,
        })
    }

    /// Builds the archive of one case: header lines in field order, then the entries.
    pub fn assemble(
        &self,
        group: &TestGroup,
        record: &TestCaseRecord,
        bridge: &EvaluationBridge<'_, E>,
    ) -> Result<AssembledCase, GoldenError> {
        let label = record.label(group);
        let mut header = self.config.banner.clone();
        let mut evaluation = None;
        let mut skipped = false;
        let mut bugs = 0;

        for field in &record.fields {
            match field {
                CaseField::Name { value } => header.push_str(&format!("#name: {}\n", value)),
                CaseField::Input { source } => match bridge.evaluate(source, &label)? {
                    Evaluation::Skipped { .. } => {
                        header.push_str("#skip\n");
                        skipped = true;
                    }
                    Evaluation::Completed(result) => {
                        for _ in &result.failures {
                            header.push_str("#bug: true\n");
                        }
                        bugs += result.failures.len();
                        evaluation = Some(result);
                    }
                },
                CaseField::Expected { .. } => {}
                CaseField::Metadata { key, text } => {
                    header.push_str(&format!("{}: {}\n", key, text))
                }
            }
        }
        for tag in &group.tags {
            header.push_str(&format!("#{}\n", tag));
        }

        let mut archive = Archive::new(header);
        if let Some(result) = &evaluation {
            for (name, data) in result.files() {
                archive
                    .push_file(name, data)
                    .map_err(|e| e.prefixed(&label))?;
            }
        }
        if let (false, Some(expected)) = (skipped, record.expected()) {
            archive
                .push_file(LEGACY_FILE, expected)
                .map_err(|e| e.prefixed(&label))?;
        }

        Ok(AssembledCase {
            archive,
            skipped,
            bugs,
        })
    }
}
