//! Assignment and submission fixture loading.
//!
//! Reads `.toml` or `.json` files (chosen by extension) into the engine's
//! model types, and walks directories of them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::model::{Assignment, Submission};

/// Fixture file formats, picked by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    Toml,
    Json,
}

impl FixtureFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "toml" => Some(FixtureFormat::Toml),
            "json" => Some(FixtureFormat::Json),
            _ => None,
        }
    }
}

/// Parse a string in the given format.
pub fn parse_str<T: DeserializeOwned>(
    content: &str,
    format: FixtureFormat,
    source: &Path,
) -> Result<T> {
    match format {
        FixtureFormat::Toml => toml::from_str(content)
            .with_context(|| format!("failed to parse TOML: {}", source.display())),
        FixtureFormat::Json => serde_json::from_str(content)
            .with_context(|| format!("failed to parse JSON: {}", source.display())),
    }
}

fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = FixtureFormat::from_path(path).with_context(|| {
        format!(
            "unsupported fixture extension (expected .toml or .json): {}",
            path.display()
        )
    })?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture: {}", path.display()))?;
    parse_str(&content, format, path)
}

/// Parse a single assignment file.
pub fn parse_assignment(path: &Path) -> Result<Assignment> {
    parse_file(path)
}

/// Parse a single submission file.
pub fn parse_submission(path: &Path) -> Result<Submission> {
    parse_file(path)
}

/// Recursively load every assignment file under `dir`.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_assignment_directory(dir: &Path) -> Result<Vec<Assignment>> {
    load_directory(dir, parse_assignment)
}

/// Recursively load every submission file under `dir`, sorted by path.
pub fn load_submission_directory(dir: &Path) -> Result<Vec<Submission>> {
    load_directory(dir, parse_submission)
}

fn load_directory<T>(dir: &Path, parse: fn(&Path) -> Result<T>) -> Result<Vec<T>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = Vec::new();
    collect_fixture_paths(dir, &mut paths)?;
    paths.sort();

    let mut loaded = Vec::new();
    for path in paths {
        match parse(&path) {
            Ok(item) => loaded.push(item),
            Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
        }
    }
    Ok(loaded)
}

fn collect_fixture_paths(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect_fixture_paths(&path, paths)?;
        } else if FixtureFormat::from_path(&path).is_some() {
            paths.push(path);
        }
    }
    Ok(())
}
