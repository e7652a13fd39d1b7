//! Canonical option tables from the documentation build's `rstspec.toml`.
//!
//! Only two parts of the file matter here:
//!
//! ```toml
//! [[composables]]
//! id = "language"
//! title = "Language"
//! default = "nodejs"
//! options = [ { id = "python", title = "Python" } ]
//!
//! [tabs]
//! drivers = [ { id = "java-sync", title = "Java (Sync)" } ]
//! ```
//!
//! The file is fetched over HTTPS and cached on disk as JSON with a TTL.

use crate::mappings::ProductMappings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub const RSTSPEC_URL: &str =
    "https://raw.githubusercontent.com/mongodb/snooty-parser/refs/heads/main/snooty/rstspec.toml";

/// Cached copies older than this are refreshed.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const CACHE_DIR: &str = ".rst-audit";
const CACHE_FILE: &str = "rstspec-cache.json";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Tab set whose IDs map to driver products.
pub const DRIVERS_TABSET: &str = "drivers";
pub const LANGUAGE_COMPOSABLE: &str = "language";
pub const INTERFACE_COMPOSABLE: &str = "interface";

// -- Model --------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposableOption {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composable {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub options: Vec<ComposableOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabOption {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RstSpec {
    #[serde(default)]
    pub composables: Vec<Composable>,
    #[serde(default)]
    pub tabs: HashMap<String, Vec<TabOption>>,
}

/// `option id → title` for every composable with the given id.
pub fn composable_titles(composables: &[Composable], id: &str) -> HashMap<String, String> {
    composables
        .iter()
        .filter(|c| c.id == id)
        .flat_map(|c| c.options.iter())
        .map(|o| (o.id.clone(), o.title.clone()))
        .collect()
}

impl RstSpec {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("failed to parse rstspec.toml")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn tab_titles(&self, tabset: &str) -> HashMap<String, String> {
        self.tabs
            .get(tabset)
            .into_iter()
            .flatten()
            .map(|t| (t.id.clone(), t.title.clone()))
            .collect()
    }
}

// -- Sources ------------------------------------------------------------------

/// Where the canonical spec, and the base product mappings derived from
/// it, come from.
pub trait MappingSource {
    fn spec(&self) -> Result<RstSpec>;

    fn load(&self) -> Result<ProductMappings> {
        Ok(ProductMappings::from_rstspec(&self.spec()?))
    }

    /// Where the rstspec was read from, for reports.
    fn origin(&self) -> String;
}

/// A local `rstspec.toml`.
pub struct LocalSpec(pub PathBuf);

impl MappingSource for LocalSpec {
    fn spec(&self) -> Result<RstSpec> {
        RstSpec::load(&self.0)
    }

    fn origin(&self) -> String {
        self.0.display().to_string()
    }
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    /// Seconds since the Unix epoch.
    fetched_at: u64,
    spec: RstSpec,
}

/// The remote canonical file behind an on-disk cache.
pub struct RemoteSpec {
    pub url: String,
    pub cache_path: Option<PathBuf>,
    pub ttl: Duration,
    /// Never touch the network; use whatever the cache holds.
    pub offline: bool,
}

impl Default for RemoteSpec {
    fn default() -> Self {
        RemoteSpec {
            url: RSTSPEC_URL.to_string(),
            cache_path: default_cache_path(),
            ttl: CACHE_TTL,
            offline: false,
        }
    }
}

/// `~/.rst-audit/rstspec-cache.json`, if a home directory exists.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CACHE_DIR).join(CACHE_FILE))
}

impl MappingSource for RemoteSpec {
    /// Fresh cache > network > stale cache > error. Offline mode skips the
    /// network and accepts a cache of any age, or yields an empty spec.
    fn spec(&self) -> Result<RstSpec> {
        let cached = self.read_cache();

        if let Some(entry) = &cached {
            if self.offline || self.is_fresh(entry) {
                debug!(fetched_at = entry.fetched_at, "using cached rstspec");
                return Ok(entry.spec.clone());
            }
        }
        if self.offline {
            warn!("no cached rstspec available offline; using empty mappings");
            return Ok(RstSpec::default());
        }

        match self.fetch() {
            Ok(spec) => {
                self.write_cache(&spec);
                Ok(spec)
            }
            Err(e) => match cached {
                Some(entry) => {
                    warn!(error = %e, "rstspec fetch failed; using stale cache");
                    Ok(entry.spec)
                }
                None => Err(e),
            },
        }
    }

    fn origin(&self) -> String {
        self.url.clone()
    }
}

impl RemoteSpec {
    fn fetch(&self) -> Result<RstSpec> {
        debug!(url = %self.url, "fetching rstspec");
        let body = ureq::get(&self.url)
            .timeout(FETCH_TIMEOUT)
            .call()
            .with_context(|| format!("failed to fetch {}", self.url))?
            .into_string()
            .with_context(|| format!("failed to read response from {}", self.url))?;
        RstSpec::parse(&body)
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        now_secs().saturating_sub(entry.fetched_at) < self.ttl.as_secs()
    }

    fn read_cache(&self) -> Option<CacheEntry> {
        let path = self.cache_path.as_ref()?;
        let text = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&text) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ignoring corrupt rstspec cache");
                None
            }
        }
    }

    /// Best effort: a failed cache write only costs a refetch next run.
    fn write_cache(&self, spec: &RstSpec) {
        let Some(path) = &self.cache_path else {
            return;
        };
        let entry = CacheEntry {
            fetched_at: now_secs(),
            spec: spec.clone(),
        };
        let result = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| {
                let json = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
                fs::write(path, json)
            });
        if let Err(e) = result {
            debug!(path = %path.display(), error = %e, "failed to write rstspec cache");
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
