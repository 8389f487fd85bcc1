//! # goldgen test support
//!
//! An in-memory evaluation engine and a Go fixture package shared by the integration
//! tests. The fake engine is deterministic and driven by markers in the input source:
//!
//! - `!` does not format (the case is skipped),
//! - `#fail` does not compile,
//! - `int` or `?` is not concrete,
//! - `yaml-bug` cannot be encoded as YAML.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use goldgen::archive::{Archive, ArchiveWriter};
use goldgen::config::ExtractorConfig;
use goldgen::eval::{EngineError, EvaluatedValue, EvaluationEngine};
use goldgen::generate::{Generator, RunSummary};
use goldgen::syntax::{load_source, LoadedPackage};
use goldgen::GoldenError;

pub const PACKAGE_PATH: &str = "cuelang.org/go/cue";

/// A test file in the layout of the CUE test suite.
pub const EVAL_TEST: &str = r#"package cue

import "testing"

type testCase struct {
	name string
	desc string
	in   string
	out  string
	skip bool
}

const prefix = "a: "

func TestEval(t *testing.T) {
	testCases := []testCase{{
		name: "basic",
		in:   prefix + `1`,
		out:  "3",
	}, {
		desc: "foo: bar baz",
		in:   "b?: int",
		skip: true,
	}, {
		in:  "c: !",
		out: "7",
	}}
	more := []testCase{{
		name: "yaml",
		in:   "d: yaml-bug",
	}}
	rewriteHelper(t, testCases, alwaysRewrite)
	_, _ = testCases, more
}

func TestX(t *testing.T) {
	_ = []testCase{{in: "x: 1"}}
}
"#;

pub struct FakeEngine;

pub struct FakeValue(String);

impl EvaluationEngine for FakeEngine {
    type Value = FakeValue;

    fn format_source(&self, source: &str) -> Result<String, EngineError> {
        if source.contains('!') {
            return Err(EngineError::Rejected("expected operand, found '!'".into()));
        }
        Ok(format!("{}\n", source.trim()))
    }

    fn parse_and_fix(&self, source: &str) -> Result<String, EngineError> {
        Ok(source.to_string())
    }

    fn compile(&self, source: &str) -> Result<FakeValue, EngineError> {
        if source.contains("#fail") {
            return Err(EngineError::Rejected("reference not found".into()));
        }
        Ok(FakeValue(source.to_string()))
    }
}

impl EvaluatedValue for FakeValue {
    fn render_definitions(&self) -> Result<String, EngineError> {
        Ok(format!("// def\n{}", self.0))
    }

    fn validate_concrete(&self) -> Result<(), EngineError> {
        if self.0.contains("int") || self.0.contains('?') {
            return Err(EngineError::Rejected("incomplete value".into()));
        }
        Ok(())
    }

    fn render_concrete(&self) -> Result<String, EngineError> {
        Ok(self.0.clone())
    }

    fn to_yaml(&self) -> Result<String, EngineError> {
        if self.0.contains("yaml-bug") {
            return Err(EngineError::Rejected("unsupported value".into()));
        }
        Ok(format!("yaml: {}", self.0))
    }

    fn to_json(&self) -> Result<String, EngineError> {
        Ok(format!("{{\"src\": {:?}}}", self.0.trim()))
    }
}

pub fn load(source: &str) -> LoadedPackage {
    load_source("eval_test.go", source, PACKAGE_PATH).expect("fixture parses")
}

/// Runs the generator with the fake engine, writing into `out`.
pub fn generate_into(source: &str, out: &Path) -> Result<RunSummary, GoldenError> {
    let config = ExtractorConfig::default();
    let packages = vec![load(source)];
    let mut sink = ArchiveWriter::new(out);
    Generator::new(&config, &FakeEngine).run(&packages, &mut sink)
}

pub fn read_archive(path: &Path) -> Archive {
    Archive::parse(&fs::read(path).expect("archive exists"))
}

pub fn read_text(path: &Path) -> String {
    fs::read_to_string(path).expect("file exists")
}
