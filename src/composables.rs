//! Composable definitions across the corpus and where pages use them.
//!
//! Every `snooty.toml` one or two levels below `content/` is read for
//! `[[composables]]` stanzas (`content/<project>/snooty.toml` or
//! `content/<project>/<version>/snooty.toml`). Definitions are then grouped
//! to surface consolidation candidates:
//!
//! | Group | Rule |
//! |-------|------|
//! | identical | same id, title, default and options in more than one place |
//! | similar | different ids whose option ids overlap by at least 60% (Jaccard) |
//!
//! Usages come from the `:options:` line of each `composable-tutorial`.

use crate::project::{Manifest, MANIFEST_FILE_NAME};
use crate::rst::patterns::{RE_COMPOSABLE_TUTORIAL, RE_OPTIONS_OPTION};
use crate::rstspec::{Composable, RstSpec};
use anyhow::Result;
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Minimum option overlap for two differently named composables to be
/// reported as similar.
pub const SIMILARITY_THRESHOLD: f64 = 0.6;

/// Project name given to definitions from the canonical rstspec.
pub const RSTSPEC_PROJECT: &str = "rstspec";

const CONTENT_DIR: &str = "content";
const CURRENT_VERSION: &str = "current";
const PAGE_EXTENSIONS: &[&str] = &["txt", "rst"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DefinitionSource {
    #[serde(rename = "snooty.toml")]
    Project,
    #[serde(rename = "rstspec.toml")]
    Rstspec,
}

impl DefinitionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DefinitionSource::Project => "snooty.toml",
            DefinitionSource::Rstspec => "rstspec.toml",
        }
    }
}

/// One `[[composables]]` stanza and where it was defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposableLocation {
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub source: DefinitionSource,
    /// Manifest path, or the rstspec URL.
    pub path: String,
    pub composable: Composable,
}

impl ComposableLocation {
    /// `project` or `project/version`.
    pub fn label(&self) -> String {
        match &self.version {
            Some(version) => format!("{}/{}", self.project, version),
            None => self.project.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComposableGroup {
    /// Shared id for identical groups; smallest member id for similar ones.
    pub id: String,
    /// 1.0 for identical groups, else the mean pairwise option overlap.
    pub similarity: f64,
    pub locations: Vec<ComposableLocation>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Analysis {
    pub composables: Vec<ComposableLocation>,
    pub identical: Vec<ComposableGroup>,
    pub similar: Vec<ComposableGroup>,
}

/// Pages in one project version that reference a composable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposableUsage {
    pub composable_id: String,
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// One entry per reference, so a page can appear more than once.
    pub files: Vec<String>,
}

impl ComposableUsage {
    pub fn count(&self) -> usize {
        self.files.len()
    }
}

/// Which project versions to look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct Filter<'a> {
    pub project: Option<&'a str>,
    pub current_only: bool,
}

impl Filter<'_> {
    fn accepts(&self, project: &str, version: Option<&str>) -> bool {
        if self.project.is_some_and(|p| p != project) {
            return false;
        }
        !self.current_only || is_current_version(version)
    }
}

/// Unversioned projects and the `current` version.
pub fn is_current_version(version: Option<&str>) -> bool {
    version.is_none_or(|v| v == CURRENT_VERSION)
}

/// `root` itself if it is the content directory, else `root/content`.
fn content_root(root: &Path) -> Result<PathBuf> {
    if root.file_name().is_some_and(|n| n == CONTENT_DIR) {
        return Ok(root.to_path_buf());
    }
    let content = root.join(CONTENT_DIR);
    anyhow::ensure!(content.is_dir(), "content directory not found in: {}", root.display());
    Ok(content)
}

fn walk(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
        .flatten()
        .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
        .map(|e| e.into_path())
}

fn component_strings(rel: &Path) -> Vec<String> {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// Project and version of a manifest path relative to the content root.
fn manifest_project(rel: &Path) -> Option<(String, Option<String>)> {
    match component_strings(rel).as_slice() {
        [project, file] if file == MANIFEST_FILE_NAME => Some((project.clone(), None)),
        [project, version, file] if file == MANIFEST_FILE_NAME => {
            Some((project.clone(), Some(version.clone())))
        }
        _ => None,
    }
}

/// Project and version of a page path relative to the content root:
/// `<project>/source/...` or `<project>/<version>/source/...`.
fn page_project(rel: &Path) -> Option<(String, Option<String>)> {
    let parts = component_strings(rel);
    match parts.as_slice() {
        [project, version, _, ..] if version != "source" => {
            Some((project.clone(), Some(version.clone())))
        }
        [project, _, ..] => Some((project.clone(), None)),
        _ => None,
    }
}

// -- Discovery ----------------------------------------------------------------

/// Every composable defined in a project manifest under `root`. Manifests
/// that fail to parse are skipped with a warning.
pub fn find_composables(root: &Path, filter: Filter<'_>) -> Result<Vec<ComposableLocation>> {
    let content = content_root(root)?;
    let mut locations = Vec::new();

    for path in walk(&content) {
        if path.file_name().is_none_or(|n| n != MANIFEST_FILE_NAME) {
            continue;
        }
        let rel = path.strip_prefix(&content).unwrap_or(&path);
        let Some((project, version)) = manifest_project(rel) else {
            continue;
        };
        if !filter.accepts(&project, version.as_deref()) {
            continue;
        }
        let manifest = match Manifest::load(&path) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "skipping unparsable manifest");
                continue;
            }
        };
        debug!(path = %path.display(), count = manifest.composables.len(), "read composables");
        locations.extend(manifest.composables.into_iter().map(|composable| ComposableLocation {
            project: project.clone(),
            version: version.clone(),
            source: DefinitionSource::Project,
            path: path.display().to_string(),
            composable,
        }));
    }
    Ok(locations)
}

/// The canonical composables, as locations of the pseudo-project `rstspec`.
pub fn rstspec_composables(spec: &RstSpec, url: &str) -> Vec<ComposableLocation> {
    spec.composables
        .iter()
        .map(|composable| ComposableLocation {
            project: RSTSPEC_PROJECT.to_string(),
            version: None,
            source: DefinitionSource::Rstspec,
            path: url.to_string(),
            composable: composable.clone(),
        })
        .collect()
}

// -- Grouping -----------------------------------------------------------------

pub fn analyze(composables: Vec<ComposableLocation>) -> Analysis {
    let mut by_id: BTreeMap<&str, Vec<&ComposableLocation>> = BTreeMap::new();
    for loc in &composables {
        by_id.entry(loc.composable.id.as_str()).or_default().push(loc);
    }

    let identical = by_id
        .iter()
        .filter(|(_, locs)| {
            let first = &locs[0].composable;
            locs.len() > 1 && locs.iter().all(|l| same_definition(first, &l.composable))
        })
        .map(|(id, locs)| ComposableGroup {
            id: id.to_string(),
            similarity: 1.0,
            locations: locs.iter().map(|&l| l.clone()).collect(),
        })
        .collect();
    let similar = similar_groups(&by_id);

    Analysis {
        composables,
        identical,
        similar,
    }
}

/// Same id, title and default, and the same `id:title` option set.
fn same_definition(a: &Composable, b: &Composable) -> bool {
    let options = |c: &Composable| -> BTreeSet<(String, String)> {
        c.options.iter().map(|o| (o.id.clone(), o.title.clone())).collect()
    };
    a.id == b.id
        && a.title == b.title
        && a.default == b.default
        && a.options.len() == b.options.len()
        && options(a) == options(b)
}

/// Jaccard similarity of the two option id sets; 0.0 if both are empty.
pub fn option_similarity(a: &Composable, b: &Composable) -> f64 {
    let a: HashSet<&str> = a.options.iter().map(|o| o.id.as_str()).collect();
    let b: HashSet<&str> = b.options.iter().map(|o| o.id.as_str()).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

fn mean_pairwise_similarity(locs: &[ComposableLocation]) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0u32;
    for (i, a) in locs.iter().enumerate() {
        for b in &locs[i + 1..] {
            total += option_similarity(&a.composable, &b.composable);
            pairs += 1;
        }
    }
    if pairs == 0 {
        1.0
    } else {
        total / f64::from(pairs)
    }
}

/// Greedy grouping over ids in sorted order. Each id is represented by its
/// definition with the most options, and joins at most one group.
fn similar_groups(by_id: &BTreeMap<&str, Vec<&ComposableLocation>>) -> Vec<ComposableGroup> {
    let representatives: Vec<&ComposableLocation> = by_id
        .values()
        .filter_map(|locs| {
            // First definition wins ties
            locs.iter().copied().reduce(|best, l| {
                if l.composable.options.len() > best.composable.options.len() {
                    l
                } else {
                    best
                }
            })
        })
        .collect();

    let mut grouped = vec![false; representatives.len()];
    let mut groups = Vec::new();
    for i in 0..representatives.len() {
        if grouped[i] {
            continue;
        }
        let mut members = vec![representatives[i].clone()];
        for j in i + 1..representatives.len() {
            if grouped[j] {
                continue;
            }
            let similarity = option_similarity(&representatives[i].composable, &representatives[j].composable);
            if similarity >= SIMILARITY_THRESHOLD {
                members.push(representatives[j].clone());
                grouped[j] = true;
            }
        }
        if members.len() > 1 {
            grouped[i] = true;
            groups.push(ComposableGroup {
                id: representatives[i].composable.id.clone(),
                similarity: mean_pairwise_similarity(&members),
                locations: members,
            });
        }
    }

    groups.sort_by(|a, b| b.similarity.total_cmp(&a.similarity).then_with(|| a.id.cmp(&b.id)));
    groups
}

// -- Usages -------------------------------------------------------------------

/// Composable ids named by each `composable-tutorial` in `text`. Accepts
/// both `:options: language, interface` and `:options: language=python;
/// interface=driver`.
pub fn tutorial_composable_ids(text: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut in_tutorial = false;
    for line in text.lines() {
        if RE_COMPOSABLE_TUTORIAL.is_match(line.trim()) {
            in_tutorial = true;
            continue;
        }
        if !in_tutorial {
            continue;
        }
        if let Some(caps) = RE_OPTIONS_OPTION.captures(line) {
            ids.extend(
                caps[1]
                    .split([',', ';'])
                    .map(|item| item.split('=').next().unwrap_or_default().trim())
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
            );
            in_tutorial = false;
        }
    }
    ids
}

/// Every composable reference in pages under `root`, grouped by project
/// version and composable id. File paths are relative to the monorepo root.
pub fn find_usages(root: &Path, filter: Filter<'_>) -> Result<Vec<ComposableUsage>> {
    let content = content_root(root)?;
    let display_base = content.parent().unwrap_or(&content).to_path_buf();
    let mut usages: BTreeMap<(String, Option<String>, String), ComposableUsage> = BTreeMap::new();

    for path in walk(&content) {
        let is_page = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| PAGE_EXTENSIONS.contains(&ext));
        if !is_page {
            continue;
        }
        let rel = path.strip_prefix(&content).unwrap_or(&path);
        let Some((project, version)) = page_project(rel) else {
            continue;
        };
        if !filter.accepts(&project, version.as_deref()) {
            continue;
        }
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable page");
                continue;
            }
        };

        let shown = path.strip_prefix(&display_base).unwrap_or(&path).display().to_string();
        for id in tutorial_composable_ids(&text) {
            usages
                .entry((project.clone(), version.clone(), id.clone()))
                .or_insert_with(|| ComposableUsage {
                    composable_id: id,
                    project: project.clone(),
                    version: version.clone(),
                    files: Vec::new(),
                })
                .files
                .push(shown.clone());
        }
    }
    Ok(usages.into_values().collect())
}

/// Definitions with no usage in their own project version.
pub fn unused<'a>(composables: &'a [ComposableLocation], usages: &[ComposableUsage]) -> Vec<&'a ComposableLocation> {
    composables
        .iter()
        .filter(|loc| {
            !usages.iter().any(|u| {
                u.composable_id == loc.composable.id && u.project == loc.project && u.version == loc.version
            })
        })
        .collect()
}
