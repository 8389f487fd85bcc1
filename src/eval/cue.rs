//! An [`EvaluationEngine`] that shells out to the `cue` command.
//!
//! Every operation writes the source to `in.cue` in a fresh scratch directory and runs
//! one `cue` subcommand there. Output goes to files rather than pipes so that a large
//! rendering cannot stall the child while we wait on it with a timeout.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use tempfile::TempDir;
use wait_timeout::ChildExt;

use crate::config::EngineConfig;
use crate::eval::{EngineError, EvaluatedValue, EvaluationEngine, INPUT_FILE};

/// Runs `cue` subcommands with a timeout.
#[derive(Debug, Clone)]
pub struct CueCommand {
    program: PathBuf,
    timeout: Duration,
}

impl CueCommand {
    pub fn new(config: &EngineConfig) -> Self {
        let program = PathBuf::from(&config.program);
        // A relative path with a directory part must survive the change of working directory.
        let program = if program.components().count() > 1 {
            program.canonicalize().unwrap_or(program)
        } else {
            program
        };
        Self {
            program,
            timeout: config.timeout(),
        }
    }

    /// `cue version`, used to fail early when the tool is missing.
    pub fn version(&self) -> Result<String, EngineError> {
        let scratch = TempDir::new()?;
        let out = self.run(scratch.path(), &["version"])?;
        Ok(out.lines().next().unwrap_or_default().to_string())
    }

    /// Writes `source` to a scratch `in.cue`, runs `args` and returns stdout.
    fn run_on(&self, source: &str, args: &[&str]) -> Result<(TempDir, String), EngineError> {
        let scratch = TempDir::new()?;
        fs::write(scratch.path().join(INPUT_FILE), source)?;
        let out = self.run(scratch.path(), args)?;
        Ok((scratch, out))
    }

    /// Runs `args` in place and returns the rewritten `in.cue`.
    fn rewrite(&self, source: &str, args: &[&str]) -> Result<String, EngineError> {
        let (scratch, _) = self.run_on(source, args)?;
        Ok(fs::read_to_string(scratch.path().join(INPUT_FILE))?)
    }

    fn run(&self, dir: &Path, args: &[&str]) -> Result<String, EngineError> {
        let command = format!("{} {}", self.program.display(), args.join(" "));
        let stdout_path = dir.join(".stdout");
        let stderr_path = dir.join(".stderr");

        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(File::create(&stdout_path)?))
            .stderr(Stdio::from(File::create(&stderr_path)?))
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Timeout {
                    command,
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !status.success() {
            let stderr = fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(EngineError::Failed {
                command,
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        tracing::trace!("{}: ok", command);
        Ok(fs::read_to_string(&stdout_path)?)
    }
}

impl EvaluationEngine for CueCommand {
    type Value = CueValue;

    fn format_source(&self, source: &str) -> Result<String, EngineError> {
        self.rewrite(source, &["fmt", INPUT_FILE])
    }

    fn parse_and_fix(&self, source: &str) -> Result<String, EngineError> {
        let fixed = self.rewrite(source, &["fix", INPUT_FILE])?;
        self.format_source(&fixed)
    }

    fn compile(&self, source: &str) -> Result<CueValue, EngineError> {
        let (_, definitions) = self.run_on(source, &["def", INPUT_FILE])?;
        Ok(CueValue {
            command: self.clone(),
            source: source.to_string(),
            definitions,
        })
    }
}

/// A source that compiled. Renderings are produced on demand, except the
/// structural form, which compiling already yields.
#[derive(Debug, Clone)]
pub struct CueValue {
    command: CueCommand,
    source: String,
    definitions: String,
}

impl CueValue {
    fn export(&self, out: &str) -> Result<String, EngineError> {
        let (_, rendered) = self
            .command
            .run_on(&self.source, &["export", "--out", out, INPUT_FILE])?;
        Ok(rendered)
    }
}

impl EvaluatedValue for CueValue {
    fn render_definitions(&self) -> Result<String, EngineError> {
        Ok(self.definitions.clone())
    }

    fn validate_concrete(&self) -> Result<(), EngineError> {
        self.command
            .run_on(&self.source, &["vet", "-c", INPUT_FILE])
            .map(|_| ())
    }

    fn render_concrete(&self) -> Result<String, EngineError> {
        self.export("cue")
    }

    fn to_yaml(&self) -> Result<String, EngineError> {
        self.export("yaml")
    }

    fn to_json(&self) -> Result<String, EngineError> {
        self.export("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_a_spawn_error() {
        let engine = CueCommand::new(&EngineConfig {
            program: "goldgen-no-such-cue-binary".to_string(),
            timeout_secs: 5,
        });
        let err = engine.format_source("a: 1").unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }), "{err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_reports_stderr() {
        let engine = CueCommand::new(&EngineConfig {
            program: "false".to_string(),
            timeout_secs: 5,
        });
        let err = engine.compile("a: 1").unwrap_err();
        assert!(matches!(err, EngineError::Failed { .. }), "{err:?}");
    }
}
