//! Extracting test cases from table literals.
//!
//! A table is a composite literal whose type is one of the configured shapes, e.g.
//!
//! ```go
//! testCases := []testCase{{
//!     name: "basic",
//!     in:   `a: 1`,
//!     out:  `<0>{a: 1}`,
//! }}
//! ```
//!
//! Every element becomes a [`TestCaseRecord`]. Composite literals of any other type end
//! the descent, so literals nested in them are never mistaken for tables.

use crate::ast::{inspect_stmt, Expr, ExprKind, FuncDecl, SourceFile};
use crate::config::ExtractorConfig;
use crate::extract::{CaseField, CaseLabel, TestCaseRecord, TestGroup};
use crate::types::{ConstantResolver, TypeInfo};
use crate::{err_src, GoldenError};

pub struct TestCaseExtractor<'c> {
    config: &'c ExtractorConfig,
}

impl<'c> TestCaseExtractor<'c> {
    pub fn new(config: &'c ExtractorConfig) -> Self {
        Self { config }
    }

    /// Extracts the cases of every table in `func`, numbering them through `group`.
    pub fn extract(
        &self,
        func: &FuncDecl,
        file: &SourceFile,
        info: &dyn TypeInfo,
        group: &mut TestGroup,
    ) -> Result<Vec<TestCaseRecord>, GoldenError> {
        let Some(body) = &func.body else {
            return Ok(Vec::new());
        };
        let resolver = ConstantResolver::new(info);
        let mut records = Vec::new();
        let mut failure: Option<GoldenError> = None;

        for stmt in body {
            inspect_stmt(stmt, &mut |expr| {
                if failure.is_some() {
                    return false;
                }
                let ExprKind::CompositeLit { ty, elts } = &expr.kind else {
                    return true;
                };
                let Some(ty) = ty else {
                    return false;
                };
                match info.type_of(ty) {
                    Some(t) if self.config.is_shape(t) => {}
                    _ => return false,
                }
                tracing::debug!(
                    "{}: table of {} elements at byte {}",
                    group.name,
                    elts.len(),
                    expr.span.start
                );
                for elt in elts {
                    match extract_case(elt, file, resolver, group) {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                false
            });
            if let Some(e) = failure.take() {
                return Err(e);
            }
        }
        Ok(records)
    }
}

fn extract_case(
    elt: &Expr,
    file: &SourceFile,
    resolver: ConstantResolver<'_>,
    group: &mut TestGroup,
) -> Result<TestCaseRecord, GoldenError> {
    let index = group.peek_index();
    let value = elt.as_key_value().map_or(elt, |(_, v)| v);
    let Some((_, items)) = value.as_composite() else {
        return Err(err_src!(
            Convention,
            format!("Invalid slice element: {}", value.pretty()),
            file.source.as_ref(),
            value.span
        )
        .prefixed(CaseLabel::new(&group.name, index, None)));
    };

    let mut record = TestCaseRecord {
        index,
        name: None,
        fields: Vec::new(),
        span: value.span,
    };
    for item in items {
        let label = CaseLabel::new(&group.name, index, record.name.as_deref());
        let Some((key, value)) = item.as_key_value() else {
            return Err(err_src!(
                Convention,
                format!("Invalid slice element: {}", item.pretty()),
                file.source.as_ref(),
                item.span
            )
            .prefixed(label));
        };
        let key = key.pretty();
        match key.as_str() {
            "name" | "desc" | "in" => {
                let Some(text) = resolver.string_const(value) else {
                    return Err(err_src!(
                        Convention,
                        format!("'{}' field must be a constant", key),
                        file.source.as_ref(),
                        value.span
                    )
                    .prefixed(label));
                };
                if key == "in" {
                    record.fields.push(CaseField::Input { source: text });
                } else {
                    record.name = Some(text.clone());
                    record.fields.push(CaseField::Name { value: text });
                }
            }
            "out" if !resolver.is_constant(value) => {
                tracing::warn!("{}: Could not determine value for 'out' field", label);
            }
            "out" => {
                if let Some(text) = resolver.string_const(value) {
                    record.fields.push(CaseField::Expected { value: text });
                }
            }
            _ => record.fields.push(CaseField::Metadata {
                text: value.pretty(),
                key,
            }),
        }
    }

    group.next_index();
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::TestFunctionScanner;
    use crate::syntax::load_source;

    fn extract(source: &str) -> Result<Vec<TestCaseRecord>, GoldenError> {
        let loaded = load_source("a_test.go", source, "cuelang.org/go/cue").unwrap();
        let config = ExtractorConfig::default();
        let mut candidates = TestFunctionScanner::new(&config).scan(&loaded.package, &loaded.types);
        let mut c = candidates.remove(0);
        TestCaseExtractor::new(&config).extract(c.func, c.file, &loaded.types, &mut c.group)
    }

    #[test]
    fn extracts_fields_in_literal_order() {
        let records = extract(
            r#"package cue

import "testing"

type testCase struct {
	name string
	in   string
	out  string
	skip bool
}

const header = "a: "

func TestEval(t *testing.T) {
	testCases := []testCase{{
		name: "first",
		in:   header + `1`,
		out:  "3",
		skip: true,
	}, {
		desc: "second",
		in:   "b: 2",
		out:  fmt.Sprint(3),
	}}
	_ = testCases
}
"#,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, 0);
        assert_eq!(records[0].name.as_deref(), Some("first"));
        assert_eq!(records[0].input(), Some("a: 1"));
        assert_eq!(records[0].expected(), Some("3"));
        assert_eq!(
            records[0].fields[3],
            CaseField::Metadata {
                key: "skip".into(),
                text: "true".into()
            }
        );
        assert_eq!(records[1].index, 1);
        assert_eq!(records[1].name.as_deref(), Some("second"));
        assert_eq!(records[1].expected(), None);
    }

    #[test]
    fn non_utf8_output_is_dropped_not_altered() {
        let records = extract(
            r#"package cue

import "testing"

type testCase struct{ in, out string }

func TestEval(t *testing.T) {
	_ = []testCase{{in: "a: 1", out: "x\xffy"}}
}
"#,
        )
        .unwrap();
        assert_eq!(records[0].input(), Some("a: 1"));
        assert_eq!(records[0].expected(), None);
    }

    #[test]
    fn other_literals_are_ignored() {
        let records = extract(
            r#"package cue

import "testing"

type testCase struct{ in string }
type subsumeTest struct{ in string }

func TestSubsume(t *testing.T) {
	_ = []subsumeTest{{in: "a"}}
	_ = map[string][]testCase{"x": {{in: "b"}}}
}
"#,
        )
        .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn non_literal_element_is_fatal() {
        let err = extract(
            r#"package cue

import "testing"

type testCase struct{ in string }

var shared testCase

func TestEval(t *testing.T) {
	_ = []testCase{{in: "a"}, shared}
}
"#,
        )
        .unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Convention);
        assert!(err.message().starts_with("eval/001[]: Invalid slice element"));
    }
}
