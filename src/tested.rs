//! Counts of tested code examples in the corpus.
//!
//! Tested examples live in a two-level tree under the monorepo root,
//! language first, then product:
//!
//! ```text
//! content/code-examples/tested/
//!   python/pymongo/...
//!   javascript/driver/...
//!   command-line/mongosh/...
//! ```
//!
//! Every file counts. With `exclude_output`, expected-output captures
//! (`.txt`) and wrapper scripts (`.sh`) are skipped.

use anyhow::{anyhow, Result};
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

/// Tested tree, relative to the monorepo root.
pub const TESTED_DIR: &str = "content/code-examples/tested";

const OUTPUT_EXTENSIONS: &[&str] = &["txt", "sh"];

/// A known `<language>/<product>` directory pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestedProduct {
    /// Name accepted by `--for-product`.
    pub key: &'static str,
    pub name: &'static str,
    /// Directory under [`TESTED_DIR`].
    pub dir: &'static str,
}

pub const TESTED_PRODUCTS: &[TestedProduct] = &[
    TestedProduct { key: "csharp", name: "C#", dir: "csharp/driver" },
    TestedProduct { key: "go", name: "Go", dir: "go/driver" },
    TestedProduct { key: "atlas-sdk-go", name: "Atlas Go SDK", dir: "go/atlas-sdk" },
    TestedProduct { key: "java-sync", name: "Java (Sync)", dir: "java/driver-sync" },
    TestedProduct { key: "nodejs", name: "Node.js", dir: "javascript/driver" },
    TestedProduct { key: "mongosh", name: "MongoDB Shell", dir: "command-line/mongosh" },
    TestedProduct { key: "pymongo", name: "PyMongo", dir: "python/pymongo" },
];

pub fn find_product(key: &str) -> Option<&'static TestedProduct> {
    TESTED_PRODUCTS.iter().find(|p| p.key == key)
}

/// Human-readable list of valid `--for-product` values.
pub fn product_list() -> String {
    let mut out = String::from("Valid products:\n");
    for p in TESTED_PRODUCTS {
        let _ = writeln!(out, "  {:<14} {} ({})", p.key, p.name, p.dir);
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestedCounts {
    pub total: usize,
    /// Keyed by product key, or by the raw `<language>/<dir>` path for
    /// directories outside the known table.
    pub by_product: BTreeMap<String, usize>,
}

/// Count tested example files under `root`, optionally for one product.
pub fn count_tested(root: &Path, for_product: Option<&str>, exclude_output: bool) -> Result<TestedCounts> {
    let tested = root.join(TESTED_DIR);
    anyhow::ensure!(
        tested.is_dir(),
        "tested examples directory not found: {}",
        tested.display()
    );

    let start = match for_product {
        Some(key) => {
            let product = find_product(key)
                .ok_or_else(|| anyhow!("invalid product: {key}\n\n{}", product_list()))?;
            tested.join(product.dir)
        }
        None => tested.clone(),
    };

    let mut counts = TestedCounts::default();
    if !start.is_dir() {
        return Ok(counts);
    }

    let walker = WalkBuilder::new(&start)
        .hidden(true)
        .git_ignore(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();
    for entry in walker.flatten() {
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        if exclude_output && is_output_file(path) {
            continue;
        }
        let rel = path.strip_prefix(&tested).unwrap_or(path);
        counts.total += 1;
        *counts.by_product.entry(product_key(rel)).or_default() += 1;
    }
    Ok(counts)
}

fn is_output_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| OUTPUT_EXTENSIONS.contains(&ext))
}

/// Product key for a file path relative to the tested tree.
fn product_key(rel: &Path) -> String {
    let mut dirs = rel
        .parent()
        .into_iter()
        .flat_map(|p| p.components())
        .map(|c| c.as_os_str().to_string_lossy().into_owned());
    match (dirs.next(), dirs.next()) {
        (Some(language), Some(product)) => {
            let dir = format!("{language}/{product}");
            TESTED_PRODUCTS
                .iter()
                .find(|p| p.dir == dir)
                .map_or(dir, |p| p.key.to_string())
        }
        (Some(language), None) => language,
        _ => ".".to_string(),
    }
}

/// Display name for a `by_product` key.
pub fn display_name(key: &str) -> &str {
    find_product(key).map_or(key, |p| p.name)
}

pub fn render_text(counts: &TestedCounts, for_product: Option<&str>, by_product: bool) -> String {
    let mut out = String::new();
    if let Some(key) = for_product {
        let _ = writeln!(out, "Tested code examples for {}: {}", display_name(key), counts.total);
        return out;
    }
    if by_product {
        let width = counts
            .by_product
            .keys()
            .map(|k| display_name(k).chars().count())
            .max()
            .unwrap_or(0);
        out.push_str("Tested code examples by product:\n");
        for (key, count) in &counts.by_product {
            let _ = writeln!(out, "  {:<width$}  {count:>6}", display_name(key));
        }
        out.push('\n');
    }
    let _ = writeln!(out, "Total tested code examples: {}", counts.total);
    out
}
