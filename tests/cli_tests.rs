// CLI behavior: listing, JSON output and miette-rendered failures.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

mod common;

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

use common::EVAL_TEST;

fn package_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("go.mod"), "module cuelang.org/go\n\ngo 1.22\n").unwrap();
    fs::create_dir(dir.path().join("cue")).unwrap();
    fs::write(dir.path().join("cue/eval_test.go"), EVAL_TEST).unwrap();
    dir
}

fn goldgen() -> Command {
    let mut cmd = Command::cargo_bin("goldgen").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn list_shows_the_archives_to_generate() {
    let dir = package_dir();
    goldgen()
        .arg("list")
        .arg(dir.path().join("cue"))
        .assert()
        .success()
        .stdout(
            contains("eval/000_basic.txtar")
                .and(contains("eval/001_foo__bar_baz.txtar"))
                .and(contains("#alwaysRewrite"))
                .and(contains("TestX").not()),
        );
}

#[test]
fn list_json_is_machine_readable() {
    let dir = package_dir();
    let output = goldgen()
        .args(["list", "--format", "json"])
        .arg(dir.path().join("cue"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let groups: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(groups[0]["group"], "eval");
    assert_eq!(groups[0]["cases"].as_array().unwrap().len(), 4);
}

#[test]
fn missing_package_dir_is_a_load_error() {
    goldgen()
        .args(["list", "/nonexistent/goldgen/pkg"])
        .assert()
        .failure()
        .stderr(contains("goldgen::load").and(contains("is not a directory")));
}

#[test]
fn bad_config_is_a_config_error() {
    let dir = package_dir();
    let config = dir.path().join("goldgen.yaml");
    fs::write(&config, "no_such_key: 1\n").unwrap();
    goldgen()
        .arg("list")
        .arg(dir.path().join("cue"))
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("goldgen::config"));
}

#[test]
fn unavailable_engine_fails_before_writing() {
    let dir = package_dir();
    let out = dir.path().join("golden");
    goldgen()
        .arg("generate")
        .arg(dir.path().join("cue"))
        .arg("--out")
        .arg(&out)
        .args(["--cue", "/nonexistent/goldgen/cue"])
        .assert()
        .failure()
        .stderr(contains("goldgen::eval").and(contains("Cannot run")));
    assert!(!Path::new(&out).exists());
}
