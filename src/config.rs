//! Corpus root configuration and input path resolution.
//!
//! The root ("monorepo path") is taken from, highest priority first: the
//! `--root` flag, the `RST_AUDIT_MONOREPO_PATH` environment variable (both
//! handled by the CLI parser), then `.rst-audit.yaml` in the current
//! directory, then in the home directory.
//!
//! ```yaml
//! monorepo_path: ~/docs-monorepo
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = ".rst-audit.yaml";
pub const MONOREPO_PATH_ENV: &str = "RST_AUDIT_MONOREPO_PATH";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monorepo_path: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        // An empty file deserializes as YAML null
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// First config file found in `dirs`. A present but broken file is an
    /// error; absent files are skipped.
    pub fn discover(dirs: &[PathBuf]) -> Result<Option<Self>> {
        for dir in dirs {
            let path = dir.join(CONFIG_FILE_NAME);
            if path.is_file() {
                debug!(path = %path.display(), "loading config");
                return Self::load(&path).map(Some);
            }
        }
        Ok(None)
    }
}

/// Current directory, then home directory.
pub fn default_search_dirs() -> Vec<PathBuf> {
    std::env::current_dir()
        .ok()
        .into_iter()
        .chain(dirs::home_dir())
        .collect()
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Corpus root: the explicit value if given, else the first config file's
/// `monorepo_path`. `None` means inputs resolve against the current
/// directory only.
pub fn resolve_root(explicit: Option<&Path>, search_dirs: &[PathBuf]) -> Result<Option<PathBuf>> {
    if let Some(root) = explicit {
        return Ok(Some(expand_home(root)));
    }
    let config = Config::discover(search_dirs)?.unwrap_or_default();
    Ok(config.monorepo_path.as_deref().map(expand_home))
}

/// Resolve an input path: absolute as-is, otherwise against the root and
/// then the current directory.
pub fn resolve_input(path: &Path, root: Option<&Path>) -> Result<PathBuf> {
    if path.is_absolute() {
        anyhow::ensure!(path.exists(), "{} does not exist", path.display());
        return Ok(path.to_path_buf());
    }

    let mut tried = Vec::new();
    if let Some(root) = root {
        let candidate = root.join(path);
        if candidate.exists() {
            return Ok(candidate);
        }
        tried.push(candidate);
    }
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    tried.push(path.to_path_buf());

    let tried: Vec<String> = tried.iter().map(|p| p.display().to_string()).collect();
    anyhow::bail!("{} not found (tried: {})", path.display(), tried.join(", "))
}
