//! Finding the test functions of a package.

use crate::ast::{FuncDecl, Package, SourceFile};
use crate::config::ExtractorConfig;
use crate::extract::TestGroup;
use crate::types::TypeInfo;

/// A recognized test function together with its fresh group.
#[derive(Debug)]
pub struct Candidate<'p> {
    pub group: TestGroup,
    pub func: &'p FuncDecl,
    pub file: &'p SourceFile,
}

/// Yields the functions named `<prefix>Xxx` that take a single parameter of the context
/// type. Everything else is skipped without comment.
pub struct TestFunctionScanner<'c> {
    config: &'c ExtractorConfig,
}

impl<'c> TestFunctionScanner<'c> {
    pub fn new(config: &'c ExtractorConfig) -> Self {
        Self { config }
    }

    /// Candidates in file order, then declaration order.
    pub fn scan<'p>(&self, package: &'p Package, info: &dyn TypeInfo) -> Vec<Candidate<'p>> {
        let mut candidates = Vec::new();
        for file in &package.files {
            for func in file.functions() {
                let Some(name) = self.group_name(&func.name) else {
                    continue;
                };
                if !self.accepts(func, info) {
                    tracing::trace!("{}: not a test function", func.name);
                    continue;
                }
                tracing::debug!("{}: group {}", func.name, name);
                candidates.push(Candidate {
                    group: TestGroup::new(name, func.name.clone()),
                    func,
                    file,
                });
            }
        }
        candidates
    }

    /// The group a function name maps to, or `None` when the name lacks the prefix or
    /// maps to a sentinel group.
    pub fn group_name(&self, func_name: &str) -> Option<String> {
        let rest = func_name.strip_prefix(&self.config.test_prefix)?;
        let name = rest.to_lowercase();
        if self.config.sentinel_groups.iter().any(|s| *s == name) {
            return None;
        }
        Some(name)
    }

    fn accepts(&self, func: &FuncDecl, info: &dyn TypeInfo) -> bool {
        if func.body.is_none() {
            return false;
        }
        let [param] = func.params.as_slice() else {
            return false;
        };
        info.type_of(&param.ty) == Some(self.config.context_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::load_source;

    const SOURCE: &str = r#"package cue

import "testing"

func TestEval(t *testing.T) {}
func TestX(t *testing.T) {}
func TestTwo(t *testing.T, n int) {}
func TestBench(b *testing.B) {}
func helper(t *testing.T) {}
func TestExportAll(t *testing.T) {}
"#;

    #[test]
    fn finds_test_functions_in_order() {
        let loaded = load_source("a_test.go", SOURCE, "cuelang.org/go/cue").unwrap();
        let config = ExtractorConfig::default();
        let scanner = TestFunctionScanner::new(&config);
        let names: Vec<String> = scanner
            .scan(&loaded.package, &loaded.types)
            .into_iter()
            .map(|c| c.group.name)
            .collect();
        assert_eq!(names, vec!["eval", "exportall"]);
    }

    #[test]
    fn group_names() {
        let config = ExtractorConfig::default();
        let scanner = TestFunctionScanner::new(&config);
        assert_eq!(scanner.group_name("TestResolve").as_deref(), Some("resolve"));
        assert_eq!(scanner.group_name("TestX"), None);
        assert_eq!(scanner.group_name("Benchmark"), None);
    }
}
