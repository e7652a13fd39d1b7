//! Per-project `snooty.toml` manifests.
//!
//! A project may declare its own composables, which override the canonical
//! titles for that project's pages. Manifests are parsed once per path and
//! shared across every page in the project.

use crate::rstspec::Composable;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, RwLock};
use tracing::debug;

pub const MANIFEST_FILE_NAME: &str = "snooty.toml";

/// Upward search stops after checking a directory with this name.
const CORPUS_BOUNDARY: &str = "content";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub composables: Vec<Composable>,
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("failed to parse project manifest")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }
}

/// Walk upward from `source_file` looking for a manifest. Checks each
/// directory up to and including the first one named `content`.
pub fn find_manifest(source_file: &Path) -> Option<PathBuf> {
    let start = if source_file.is_dir() {
        source_file
    } else {
        source_file.parent()?
    };

    for dir in start.ancestors() {
        let candidate = dir.join(MANIFEST_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if dir.file_name().is_some_and(|n| n == CORPUS_BOUNDARY) {
            break;
        }
    }
    None
}

/// Parsed manifests keyed by resolved path. Readers share the lock; only a
/// miss takes the write side.
#[derive(Default)]
pub struct ManifestCache {
    entries: RwLock<HashMap<PathBuf, Arc<Manifest>>>,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached manifest for `path`, parsing it on first use. Parse failures
    /// are returned and not cached.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<Manifest>> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(manifest) = entries.get(&key) {
                debug!(path = %path.display(), "manifest cache hit");
                return Ok(Arc::clone(manifest));
            }
        }

        let manifest = Arc::new(Manifest::load(&key)?);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        // Another thread may have populated it while we were parsing
        let entry = entries
            .entry(key)
            .or_insert_with(|| Arc::clone(&manifest));
        Ok(Arc::clone(entry))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Process-wide cache used by [`crate::mappings::merge_project_mappings`].
pub static MANIFEST_CACHE: LazyLock<ManifestCache> = LazyLock::new(ManifestCache::new);
