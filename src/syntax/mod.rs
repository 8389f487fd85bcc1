//! Go front end: discovery, parsing and checking of one package directory.
//!
//! [`PackageLoader::load_dir`] is the production entry point. Every `*.go` file directly
//! inside the directory is parsed (files starting with `_` or `.` are ignored, as the Go
//! tool does), files are grouped by package clause, and each group is checked into a
//! [`TypeTable`]. A directory holding `package cue` and `package cue_test` therefore
//! yields two packages; the external test package is reported under the import path with
//! a `_test` suffix.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::ast::{Package, SourceFile, TreeBuilder};
use crate::types::TypeTable;
use crate::{err_ctx, err_msg, GoldenError};

pub mod check;
pub mod literal;
pub mod parser;

static MODULE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*module\s+"?([^\s"]+)"?"#).expect("valid module regex"));

/// A parsed package and what the checker recorded about it.
#[derive(Debug)]
pub struct LoadedPackage {
    pub package: Package,
    pub types: TypeTable,
}

/// Loads Go packages from disk.
#[derive(Debug, Default)]
pub struct PackageLoader {
    /// Import path to use instead of the one derived from `go.mod`.
    package_path: Option<String>,
}

impl PackageLoader {
    pub fn new(package_path: Option<String>) -> Self {
        Self { package_path }
    }

    /// Loads every package declared by the Go files in `dir`, ordered by package name.
    pub fn load_dir(&self, dir: &Path) -> Result<Vec<LoadedPackage>, GoldenError> {
        if !dir.is_dir() {
            return Err(err_ctx!(
                Load,
                format!("'{}' is not a directory", dir.display()),
                help = "pass the directory that holds the package's Go files"
            ));
        }
        let files = go_files(dir)?;
        if files.is_empty() {
            return Err(err_msg!(Load, "No Go files in '{}'", dir.display()));
        }
        let base_path = match &self.package_path {
            Some(path) => path.clone(),
            None => import_path(dir)?,
        };
        tracing::info!(
            "Loading {} Go files from {} as {}",
            files.len(),
            dir.display(),
            base_path
        );

        let mut builder = TreeBuilder::new();
        let mut by_package: BTreeMap<String, Vec<SourceFile>> = BTreeMap::new();
        for path in &files {
            let text = std::fs::read_to_string(path).map_err(|e| {
                err_msg!(Load, "Failed to read '{}'", path.display()).with_source(e)
            })?;
            let name = path
                .strip_prefix(dir)
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned();
            let file = parser::parse_file(&name, &text, &mut builder)?;
            if file.package.is_empty() {
                tracing::warn!("{}: no package clause, skipping", name);
                continue;
            }
            by_package.entry(file.package.clone()).or_default().push(file);
        }

        Ok(by_package
            .into_iter()
            .map(|(name, files)| {
                let path = if name.ends_with("_test") {
                    format!("{base_path}_test")
                } else {
                    base_path.clone()
                };
                check_package(Package { path, name, files })
            })
            .collect())
    }
}

/// Parses and checks a single in-memory file as its own package.
pub fn load_source(
    name: &str,
    source: &str,
    package_path: &str,
) -> Result<LoadedPackage, GoldenError> {
    let mut builder = TreeBuilder::new();
    let file = parser::parse_file(name, source, &mut builder)?;
    let package = Package {
        path: package_path.to_string(),
        name: file.package.clone(),
        files: vec![file],
    };
    Ok(check_package(package))
}

fn check_package(package: Package) -> LoadedPackage {
    let types = check::check(&package);
    LoadedPackage { package, types }
}

/// Go files directly inside `dir`, sorted by path.
fn go_files(dir: &Path) -> Result<Vec<PathBuf>, GoldenError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            err_msg!(Load, "Failed to list '{}'", dir.display()).with_source(e)
        })?;
        let name = entry.file_name().to_string_lossy();
        if !entry.file_type().is_file()
            || !name.ends_with(".go")
            || name.starts_with('_')
            || name.starts_with('.')
        {
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

/// Derives the import path of `dir` from the nearest enclosing `go.mod`.
pub fn import_path(dir: &Path) -> Result<String, GoldenError> {
    let dir = dir.canonicalize().map_err(|e| {
        err_msg!(Load, "Failed to resolve '{}'", dir.display()).with_source(e)
    })?;
    for root in dir.ancestors() {
        let go_mod = root.join("go.mod");
        if !go_mod.is_file() {
            continue;
        }
        let text = std::fs::read_to_string(&go_mod).map_err(|e| {
            err_msg!(Load, "Failed to read '{}'", go_mod.display()).with_source(e)
        })?;
        let module = module_path(&text).ok_or_else(|| {
            err_msg!(Load, "'{}' has no module directive", go_mod.display())
        })?;
        let rel = dir.strip_prefix(root).unwrap_or(Path::new(""));
        let mut path = module.to_string();
        for part in rel.components() {
            path.push('/');
            path.push_str(&part.as_os_str().to_string_lossy());
        }
        return Ok(path);
    }
    Err(err_ctx!(
        Load,
        format!("No go.mod found above '{}'", dir.display()),
        help = "set `package_path` in the configuration file"
    ))
}

/// The module path declared by a `go.mod` file.
pub fn module_path(go_mod: &str) -> Option<&str> {
    MODULE_LINE
        .captures(go_mod)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_directive() {
        assert_eq!(
            module_path("// comment\nmodule cuelang.org/go\n\ngo 1.22\n"),
            Some("cuelang.org/go")
        );
        assert_eq!(module_path("module \"example.com/x\"\n"), Some("example.com/x"));
        assert_eq!(module_path("go 1.22\n"), None);
    }

    #[test]
    fn import_path_follows_go_mod() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("go.mod"), "module cuelang.org/go\n").unwrap();
        let pkg = root.path().join("cue").join("load");
        std::fs::create_dir_all(&pkg).unwrap();
        assert_eq!(import_path(&pkg).unwrap(), "cuelang.org/go/cue/load");
    }

    #[test]
    fn external_test_packages_are_separate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.go"), "package cue\n").unwrap();
        std::fs::write(dir.path().join("a_test.go"), "package cue_test\n").unwrap();
        std::fs::write(dir.path().join("_skip.go"), "package other\n").unwrap();
        let loaded = PackageLoader::new(Some("cuelang.org/go/cue".into()))
            .load_dir(dir.path())
            .unwrap();
        let paths: Vec<&str> = loaded.iter().map(|l| l.package.path.as_str()).collect();
        assert_eq!(paths, vec!["cuelang.org/go/cue", "cuelang.org/go/cue_test"]);
    }
}
