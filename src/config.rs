//! Extraction and engine settings.
//!
//! Every field has a default that reproduces the conventions of the CUE test suite,
//! so a config file is only needed to point the tool at a different convention.
//! Files are YAML; unknown keys are rejected.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{err_ctx, err_msg, GoldenError};

pub const DEFAULT_BANNER: &str = "# DO NOT EDIT; generated by goldgen\n#\n";

/// Conventions the scanner and extractor look for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    /// Name prefix of test functions.
    pub test_prefix: String,
    /// Group names that are never extracted (`TestX` is reserved for scanner self-tests).
    pub sentinel_groups: Vec<String>,
    /// Rendered type of the single test-function parameter.
    pub context_type: String,
    /// Callee text of the helper whose calls carry group tags.
    pub helper: String,
    /// Zero-based position of the tag argument in helper calls.
    pub tag_argument: usize,
    /// Element types of composite literals holding test cases.
    pub shapes: Vec<String>,
    /// First lines of every archive header.
    pub banner: String,
    /// Import path to report types under; derived from `go.mod` when unset.
    pub package_path: Option<String>,
    pub engine: EngineConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            test_prefix: "Test".to_string(),
            sentinel_groups: vec!["x".to_string()],
            context_type: "*testing.T".to_string(),
            helper: "rewriteHelper".to_string(),
            tag_argument: 2,
            shapes: vec![
                "[]cuelang.org/go/cue.testCase".to_string(),
                "[]cuelang.org/go/cue.exportTest".to_string(),
            ],
            banner: DEFAULT_BANNER.to_string(),
            package_path: None,
            engine: EngineConfig::default(),
        }
    }
}

/// How to run the external `cue` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub program: String,
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "cue".to_string(),
            timeout_secs: 30,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ExtractorConfig {
    /// Parses a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, GoldenError> {
        let config: Self = serde_yaml::from_str(text).map_err(|e| {
            err_ctx!(
                Config,
                format!("Invalid configuration: {}", e),
                help = "see `ExtractorConfig` for the accepted keys"
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML file.
    pub fn load(path: &Path) -> Result<Self, GoldenError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            err_msg!(Config, "Failed to read '{}'", path.display()).with_source(e)
        })?;
        Self::from_yaml(&text)
    }

    /// Returns `true` if `ty` is one of the recognized test-case shapes.
    pub fn is_shape(&self, ty: &str) -> bool {
        self.shapes.iter().any(|s| s == ty)
    }

    fn validate(&self) -> Result<(), GoldenError> {
        if self.test_prefix.is_empty() {
            return Err(err_msg!(Config, "`test_prefix` must not be empty"));
        }
        if self.shapes.is_empty() {
            return Err(err_ctx!(
                Config,
                "`shapes` must name at least one test-case type",
                help = "e.g. `[]example.com/pkg.testCase`"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_cue_conventions() {
        let c = ExtractorConfig::default();
        assert!(c.is_shape("[]cuelang.org/go/cue.testCase"));
        assert!(c.is_shape("[]cuelang.org/go/cue.exportTest"));
        assert!(!c.is_shape("[]cuelang.org/go/cue.subsumeTest"));
        assert_eq!(c.engine.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let c = ExtractorConfig::from_yaml(
            "helper: addTags\nshapes:\n  - \"[]example.com/x.table\"\nengine:\n  program: /opt/cue\n",
        )
        .unwrap();
        assert_eq!(c.helper, "addTags");
        assert_eq!(c.shapes, vec!["[]example.com/x.table".to_string()]);
        assert_eq!(c.engine.program, "/opt/cue");
        assert_eq!(c.engine.timeout_secs, 30);
        assert_eq!(c.test_prefix, "Test");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ExtractorConfig::from_yaml("shape: []").unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Config);
    }

    #[test]
    fn empty_shape_list_is_rejected() {
        assert!(ExtractorConfig::from_yaml("shapes: []").is_err());
    }
}
