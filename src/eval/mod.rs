//! The bridge between extracted input sources and the evaluation engine.
//!
//! The engine itself is a collaborator behind [`EvaluationEngine`]; [`cue::CueCommand`]
//! drives the `cue` tool, tests use an in-memory fake. [`EvaluationBridge::evaluate`]
//! applies the severity rules:
//!
//! | step                         | on failure                                  |
//! |------------------------------|---------------------------------------------|
//! | format                       | case skipped (`#skip`), warning             |
//! | parse + fix + re-format      | formatted source kept, debug log            |
//! | compile                      | fatal                                       |
//! | structural rendering         | fatal                                       |
//! | concreteness check           | concrete outputs omitted, silent            |
//! | export / YAML / JSON         | output omitted, `#bug: true`, warning       |
//!
//! Only a verdict of the engine on the input counts as such a failure. An engine that
//! cannot be started, times out or hits an I/O error aborts the run, so the archives
//! never depend on machine load.

use std::io;

use thiserror::Error;

use crate::extract::CaseLabel;
use crate::{err_msg, GoldenError};

pub mod cue;

pub use cue::CueCommand;

pub const INPUT_FILE: &str = "in.cue";
pub const DEFINITIONS_FILE: &str = "out/def";
pub const EXPORT_FILE: &str = "out/export";
pub const YAML_FILE: &str = "out/yaml";
pub const JSON_FILE: &str = "out/json";
pub const LEGACY_FILE: &str = "out/legacy-debug";

// ============================================================================
// ENGINE SEAM
// ============================================================================

/// Failures reported by an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("'{command}' timed out after {secs}s")]
    Timeout { command: String, secs: u64 },
    #[error("'{command}' exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl EngineError {
    /// Whether the engine ran and refused the input, as opposed to failing to run.
    pub fn is_rejection(&self) -> bool {
        matches!(self, EngineError::Failed { .. } | EngineError::Rejected(_))
    }
}

/// Formatter, fixer and evaluator for the constraint language.
pub trait EvaluationEngine {
    type Value: EvaluatedValue;

    /// Canonical formatting of `source`. Fails when `source` does not parse.
    fn format_source(&self, source: &str) -> Result<String, EngineError>;

    /// Parses `source`, applies the fixer and formats the result.
    fn parse_and_fix(&self, source: &str) -> Result<String, EngineError>;

    /// Compiles canonical source into a value.
    fn compile(&self, source: &str) -> Result<Self::Value, EngineError>;
}

/// A compiled value and its renderings.
pub trait EvaluatedValue {
    /// Full structural form: docs, attributes, optional fields and definitions.
    fn render_definitions(&self) -> Result<String, EngineError>;

    /// Succeeds when the value is fully concrete and valid.
    fn validate_concrete(&self) -> Result<(), EngineError>;

    /// Concrete-only structural form with finalization applied.
    fn render_concrete(&self) -> Result<String, EngineError>;

    fn to_yaml(&self) -> Result<String, EngineError>;

    fn to_json(&self) -> Result<String, EngineError>;
}

// ============================================================================
// RESULTS
// ============================================================================

/// One derived output that could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFailure {
    pub file: &'static str,
    pub message: String,
}

/// Everything produced from one input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    /// Canonical source, persisted as `in.cue`.
    pub source: String,
    pub definitions: String,
    pub concrete: Option<String>,
    pub yaml: Option<String>,
    pub json: Option<String>,
    pub failures: Vec<OutputFailure>,
}

impl EvaluationResult {
    /// Archive entries in their fixed order.
    pub fn files(&self) -> Vec<(&'static str, &str)> {
        let mut files = vec![
            (INPUT_FILE, self.source.as_str()),
            (DEFINITIONS_FILE, self.definitions.as_str()),
        ];
        let optional = [
            (EXPORT_FILE, &self.concrete),
            (YAML_FILE, &self.yaml),
            (JSON_FILE, &self.json),
        ];
        for (name, data) in optional {
            if let Some(data) = data {
                files.push((name, data.as_str()));
            }
        }
        files
    }
}

/// Outcome of evaluating one case input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// The input did not format; the case is marked `#skip`.
    Skipped { reason: String },
    Completed(EvaluationResult),
}

// ============================================================================
// BRIDGE
// ============================================================================

pub struct EvaluationBridge<'e, E> {
    engine: &'e E,
}

impl<'e, E: EvaluationEngine> EvaluationBridge<'e, E> {
    pub fn new(engine: &'e E) -> Self {
        Self { engine }
    }

    pub fn evaluate(&self, input: &str, label: &CaseLabel) -> Result<Evaluation, GoldenError> {
        let formatted = match self.engine.format_source(input) {
            Ok(formatted) => formatted,
            Err(e) if !e.is_rejection() => return Err(engine_failure(e, label)),
            Err(e) => {
                tracing::warn!("{}: Skipped: {}", label, e);
                return Ok(Evaluation::Skipped {
                    reason: e.to_string(),
                });
            }
        };
        let source = match self.engine.parse_and_fix(&formatted) {
            Ok(fixed) => fixed,
            Err(e) if !e.is_rejection() => return Err(engine_failure(e, label)),
            Err(e) => {
                tracing::debug!("{}: fixer not applied: {}", label, e);
                formatted
            }
        };

        let value = self.engine.compile(&source).map_err(|e| {
            err_msg!(Eval, "Failed to parse: {}", e)
                .with_source(e)
                .prefixed(label)
        })?;
        let definitions = value.render_definitions().map_err(|e| {
            err_msg!(Eval, "Failed to format {}: {}", DEFINITIONS_FILE, e)
                .with_source(e)
                .prefixed(label)
        })?;

        let mut result = EvaluationResult {
            source,
            definitions,
            concrete: None,
            yaml: None,
            json: None,
            failures: Vec::new(),
        };

        match value.validate_concrete() {
            Ok(()) => {}
            Err(e) if !e.is_rejection() => return Err(engine_failure(e, label)),
            Err(e) => {
                tracing::debug!("{}: not concrete: {}", label, e);
                return Ok(Evaluation::Completed(result));
            }
        }
        result.concrete = self.optional(&mut result.failures, EXPORT_FILE, label, || {
            value.render_concrete()
        })?;
        result.yaml = self.optional(&mut result.failures, YAML_FILE, label, || value.to_yaml())?;
        result.json = self.optional(&mut result.failures, JSON_FILE, label, || value.to_json())?;
        Ok(Evaluation::Completed(result))
    }

    fn optional(
        &self,
        failures: &mut Vec<OutputFailure>,
        file: &'static str,
        label: &CaseLabel,
        render: impl FnOnce() -> Result<String, EngineError>,
    ) -> Result<Option<String>, GoldenError> {
        match render() {
            Ok(data) => Ok(Some(data)),
            Err(e) if !e.is_rejection() => Err(engine_failure(e, label)),
            Err(e) => {
                tracing::warn!("{}: Could not encode {}: {}", label, file, e);
                failures.push(OutputFailure {
                    file,
                    message: e.to_string(),
                });
                Ok(None)
            }
        }
    }
}

fn engine_failure(e: EngineError, label: &CaseLabel) -> GoldenError {
    err_msg!(Eval, "Engine failed: {}", e)
        .with_source(e)
        .prefixed(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Formats by trimming; `!` marks unparsable input, `?` non-concrete values and
    /// `~` values that cannot be encoded as YAML.
    struct Fake;

    struct FakeValue(String);

    impl EvaluationEngine for Fake {
        type Value = FakeValue;

        fn format_source(&self, source: &str) -> Result<String, EngineError> {
            if source.contains('!') {
                return Err(EngineError::Rejected("expected operand".into()));
            }
            Ok(format!("{}\n", source.trim()))
        }

        fn parse_and_fix(&self, source: &str) -> Result<String, EngineError> {
            Ok(source.to_string())
        }

        fn compile(&self, source: &str) -> Result<FakeValue, EngineError> {
            Ok(FakeValue(source.to_string()))
        }
    }

    impl EvaluatedValue for FakeValue {
        fn render_definitions(&self) -> Result<String, EngineError> {
            Ok(format!("def {}", self.0))
        }

        fn validate_concrete(&self) -> Result<(), EngineError> {
            if self.0.contains('?') {
                return Err(EngineError::Rejected("incomplete value".into()));
            }
            Ok(())
        }

        fn render_concrete(&self) -> Result<String, EngineError> {
            Ok(format!("export {}", self.0))
        }

        fn to_yaml(&self) -> Result<String, EngineError> {
            if self.0.contains('~') {
                return Err(EngineError::Rejected("unsupported".into()));
            }
            Ok(format!("yaml {}", self.0))
        }

        fn to_json(&self) -> Result<String, EngineError> {
            Ok(format!("json {}", self.0))
        }
    }

    /// Fails every call without ever judging the input.
    struct Broken(fn() -> EngineError);

    impl EvaluationEngine for Broken {
        type Value = FakeValue;

        fn format_source(&self, _: &str) -> Result<String, EngineError> {
            Err((self.0)())
        }

        fn parse_and_fix(&self, _: &str) -> Result<String, EngineError> {
            Err((self.0)())
        }

        fn compile(&self, _: &str) -> Result<FakeValue, EngineError> {
            Err((self.0)())
        }
    }

    fn timeout() -> EngineError {
        EngineError::Timeout {
            command: "cue fmt in.cue".into(),
            secs: 30,
        }
    }

    fn missing() -> EngineError {
        EngineError::Spawn {
            program: "cue".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        }
    }

    fn label() -> CaseLabel {
        CaseLabel::new("eval", 0, Some("t"))
    }

    fn names(evaluation: &Evaluation) -> Vec<&'static str> {
        match evaluation {
            Evaluation::Completed(r) => r.files().into_iter().map(|(n, _)| n).collect(),
            Evaluation::Skipped { .. } => Vec::new(),
        }
    }

    #[test]
    fn concrete_input_gets_every_output() {
        let e = EvaluationBridge::new(&Fake).evaluate("  a: 1 ", &label()).unwrap();
        assert_eq!(
            names(&e),
            vec![INPUT_FILE, DEFINITIONS_FILE, EXPORT_FILE, YAML_FILE, JSON_FILE]
        );
        let Evaluation::Completed(r) = e else {
            unreachable!()
        };
        assert_eq!(r.source, "a: 1\n");
        assert!(r.failures.is_empty());
    }

    #[test]
    fn non_concrete_input_gets_definitions_only() {
        let e = EvaluationBridge::new(&Fake).evaluate("a?: int", &label()).unwrap();
        assert_eq!(names(&e), vec![INPUT_FILE, DEFINITIONS_FILE]);
    }

    #[test]
    fn encoding_failure_is_recorded() {
        let e = EvaluationBridge::new(&Fake).evaluate("a: ~", &label()).unwrap();
        assert_eq!(
            names(&e),
            vec![INPUT_FILE, DEFINITIONS_FILE, EXPORT_FILE, JSON_FILE]
        );
        let Evaluation::Completed(r) = e else {
            unreachable!()
        };
        assert_eq!(r.failures.len(), 1);
        assert_eq!(r.failures[0].file, YAML_FILE);
    }

    #[test]
    fn unformattable_input_is_skipped() {
        let e = EvaluationBridge::new(&Fake).evaluate("a: !", &label()).unwrap();
        assert!(matches!(e, Evaluation::Skipped { .. }));
    }

    #[test]
    fn tool_reported_failures_are_rejections() {
        let failed = EngineError::Failed {
            command: "cue fmt in.cue".into(),
            status: "exit status: 1".into(),
            stderr: "expected operand".into(),
        };
        assert!(failed.is_rejection());
        assert!(EngineError::Rejected("incomplete".into()).is_rejection());
        assert!(!timeout().is_rejection());
        assert!(!missing().is_rejection());
    }

    #[test]
    fn engine_that_cannot_run_is_fatal() {
        for make in [timeout as fn() -> EngineError, missing] {
            let err = EvaluationBridge::new(&Broken(make))
                .evaluate("a: 1", &label())
                .unwrap_err();
            assert_eq!(err.error_type(), crate::ErrorType::Eval);
            assert!(err.message().starts_with("eval/000[t]: Engine failed"), "{}", err.message());
        }
    }
}
