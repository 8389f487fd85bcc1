//! Group tags from helper calls.
//!
//! A test function may call a helper such as `rewriteHelper(t, cases, alwaysRewrite)`
//! before running its table. The tag argument of each such call becomes a `#<tag>` line in
//! the header of every archive of the group.

use crate::ast::{ExprKind, FuncDecl, SourceFile, Stmt};
use crate::config::ExtractorConfig;
use crate::extract::{CaseLabel, TestGroup};
use crate::types::{Constant, TypeInfo};
use crate::{err_src, GoldenError};

pub struct MetadataCollector<'c> {
    config: &'c ExtractorConfig,
}

impl<'c> MetadataCollector<'c> {
    pub fn new(config: &'c ExtractorConfig) -> Self {
        Self { config }
    }

    /// Appends the tags found in the top-level statements of `func` to `group.tags`.
    pub fn collect(
        &self,
        func: &FuncDecl,
        file: &SourceFile,
        info: &dyn TypeInfo,
        group: &mut TestGroup,
    ) -> Result<(), GoldenError> {
        let Some(body) = &func.body else {
            return Ok(());
        };
        for stmt in body {
            let Stmt::Expr(expr) = stmt else {
                continue;
            };
            let ExprKind::Call { fun, args, .. } = &expr.kind else {
                continue;
            };
            if fun.pretty() != self.config.helper {
                continue;
            }
            let Some(arg) = args.get(self.config.tag_argument) else {
                let message = format!(
                    "'{}' call has {} arguments, the tag is argument {}",
                    self.config.helper,
                    args.len(),
                    self.config.tag_argument + 1
                );
                let label = CaseLabel::new(&group.name, group.peek_index(), None);
                return Err(
                    err_src!(Convention, message, file.source.as_ref(), expr.span).prefixed(label),
                );
            };
            let tag = match info.constant_of(arg) {
                Some(Constant::String(s)) => s.clone(),
                _ => arg.pretty(),
            };
            tracing::debug!("{}: tag #{}", group.name, tag);
            group.tags.push(tag);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::TestFunctionScanner;
    use crate::syntax::load_source;

    fn tags_of(source: &str) -> Result<Vec<String>, GoldenError> {
        let loaded = load_source("a_test.go", source, "cuelang.org/go/cue").unwrap();
        let config = ExtractorConfig::default();
        let mut candidates = TestFunctionScanner::new(&config).scan(&loaded.package, &loaded.types);
        let mut candidate = candidates.remove(0);
        MetadataCollector::new(&config).collect(
            candidate.func,
            candidate.file,
            &loaded.types,
            &mut candidate.group,
        )?;
        Ok(candidate.group.tags)
    }

    #[test]
    fn collects_tags_in_order() {
        let tags = tags_of(
            r#"package cue

import "testing"

func TestEval(t *testing.T) {
	rewriteHelper(t, testCases, alwaysRewrite)
	other(t, testCases, ignored)
	rewriteHelper(t, testCases, "legacy")
	if true {
		rewriteHelper(t, testCases, nested)
	}
}
"#,
        )
        .unwrap();
        assert_eq!(tags, vec!["alwaysRewrite", "legacy"]);
    }

    #[test]
    fn short_helper_call_is_fatal() {
        let err = tags_of(
            "package cue\n\nimport \"testing\"\n\nfunc TestEval(t *testing.T) {\n\trewriteHelper(t)\n}\n",
        )
        .unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Convention);
        assert!(err.message().starts_with("eval/000[]: "));
    }
}
