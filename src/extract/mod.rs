//! Extraction of test groups and cases from a loaded package.
//!
//! - [`scanner`] finds the test functions and creates one [`TestGroup`] per function.
//! - [`metadata`] collects the group's tags from helper calls.
//! - [`cases`] turns every element of an allow-listed table literal into a
//!   [`TestCaseRecord`].
//!
//! Nothing here talks to the evaluation engine or the file system; records are plain data
//! consumed by [`crate::generate`].

use std::fmt;

use serde::Serialize;

use crate::ast::Span;

pub mod cases;
pub mod metadata;
pub mod scanner;

pub use cases::TestCaseExtractor;
pub use metadata::MetadataCollector;
pub use scanner::{Candidate, TestFunctionScanner};

// ============================================================================
// TEST GROUP
// ============================================================================

/// One scanned test function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestGroup {
    /// Function name without the test prefix, lower-cased; names the output directory.
    pub name: String,
    pub function: String,
    pub tags: Vec<String>,
    next_index: usize,
}

impl TestGroup {
    pub fn new(name: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            function: function.into(),
            tags: Vec::new(),
            next_index: 0,
        }
    }

    /// Hands out the next case index. Indexes are shared by every table in the function.
    pub fn next_index(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// The index the next case will get.
    pub fn peek_index(&self) -> usize {
        self.next_index
    }

    pub fn case_count(&self) -> usize {
        self.next_index
    }
}

// ============================================================================
// TEST CASE RECORD
// ============================================================================

/// One recognized field of a case, in literal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaseField {
    /// `name:` or `desc:`
    Name { value: String },
    /// `in:`, the constraint source to evaluate.
    Input { source: String },
    /// `out:`, the legacy expected output.
    Expected { value: String },
    /// Any other field, rendered as Go source.
    Metadata { key: String, text: String },
}

/// One extracted case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseRecord {
    pub index: usize,
    /// The last `name`/`desc` value, if any.
    pub name: Option<String>,
    pub fields: Vec<CaseField>,
    pub span: Span,
}

impl TestCaseRecord {
    pub fn input(&self) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            CaseField::Input { source } => Some(source.as_str()),
            _ => None,
        })
    }

    pub fn expected(&self) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            CaseField::Expected { value } => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn label(&self, group: &TestGroup) -> CaseLabel {
        CaseLabel::new(&group.name, self.index, self.name.as_deref())
    }
}

/// Identifies a case in log lines and errors: `group/index[name]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseLabel {
    pub group: String,
    pub index: usize,
    pub name: String,
}

impl CaseLabel {
    pub fn new(group: &str, index: usize, name: Option<&str>) -> Self {
        Self {
            group: group.to_string(),
            index,
            name: name.unwrap_or_default().to_string(),
        }
    }
}

impl fmt::Display for CaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:03}[{}]", self.group, self.index, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_are_per_group() {
        let mut a = TestGroup::new("eval", "TestEval");
        let mut b = TestGroup::new("export", "TestExport");
        assert_eq!(a.next_index(), 0);
        assert_eq!(a.next_index(), 1);
        assert_eq!(b.next_index(), 0);
        assert_eq!(a.case_count(), 2);
    }

    #[test]
    fn label_display() {
        assert_eq!(CaseLabel::new("eval", 3, Some("foo")).to_string(), "eval/003[foo]");
        assert_eq!(CaseLabel::new("eval", 12, None).to_string(), "eval/012[]");
    }
}
