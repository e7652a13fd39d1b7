//! Selector-to-product tables and per-project merging.

use crate::project::{find_manifest, Manifest, MANIFEST_CACHE};
use crate::rstspec::{composable_titles, RstSpec, DRIVERS_TABSET, INTERFACE_COMPOSABLE, LANGUAGE_COMPOSABLE};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Product display names keyed by tab ID, composable language option, and
/// composable interface option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMappings {
    pub tab_id_to_product: HashMap<String, String>,
    pub language_to_product: HashMap<String, String>,
    pub interface_to_product: HashMap<String, String>,
}

impl ProductMappings {
    pub fn from_rstspec(spec: &RstSpec) -> Self {
        ProductMappings {
            tab_id_to_product: spec.tab_titles(DRIVERS_TABSET),
            language_to_product: composable_titles(&spec.composables, LANGUAGE_COMPOSABLE),
            interface_to_product: composable_titles(&spec.composables, INTERFACE_COMPOSABLE),
        }
    }

    /// A copy with the manifest's language and interface options layered on
    /// top. `None` when the manifest declares neither.
    pub fn with_project(&self, manifest: &Manifest) -> Option<Self> {
        let languages = composable_titles(&manifest.composables, LANGUAGE_COMPOSABLE);
        let interfaces = composable_titles(&manifest.composables, INTERFACE_COMPOSABLE);
        if languages.is_empty() && interfaces.is_empty() {
            return None;
        }

        let mut merged = self.clone();
        merged.language_to_product.extend(languages);
        merged.interface_to_product.extend(interfaces);
        Some(merged)
    }
}

/// Mappings for pages under `source_file`'s project.
///
/// Borrows `base` unchanged when there is no manifest, it fails to parse, or
/// it declares no relevant composables.
pub fn merge_project_mappings<'a>(
    base: &'a ProductMappings,
    source_file: &Path,
) -> Cow<'a, ProductMappings> {
    let Some(manifest_path) = find_manifest(source_file) else {
        return Cow::Borrowed(base);
    };
    let manifest = match MANIFEST_CACHE.get_or_load(&manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            debug!(path = %manifest_path.display(), error = %e, "ignoring project manifest");
            return Cow::Borrowed(base);
        }
    };
    match base.with_project(&manifest) {
        Some(merged) => Cow::Owned(merged),
        None => Cow::Borrowed(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::MANIFEST_FILE_NAME;
    use std::fs;
    use tempfile::TempDir;

    fn base() -> ProductMappings {
        let mut m = ProductMappings::default();
        m.tab_id_to_product.insert("nodejs".into(), "Node.js".into());
        m.language_to_product.insert("go".into(), "Golang".into());
        m.language_to_product.insert("python".into(), "Python".into());
        m
    }

    #[test]
    fn project_overrides_win() {
        let manifest = Manifest::parse(
            r#"
[[composables]]
id = "language"
title = "Language"
default = "go"
options = [{ id = "go", title = "Go" }]
"#,
        )
        .unwrap();

        let base = base();
        let merged = base.with_project(&manifest).unwrap();
        assert_eq!(merged.language_to_product.get("go").map(String::as_str), Some("Go"));
        assert_eq!(merged.language_to_product.get("python").map(String::as_str), Some("Python"));
        assert_eq!(merged.tab_id_to_product, base.tab_id_to_product);
        // Base is never mutated
        assert_eq!(base.language_to_product.get("go").map(String::as_str), Some("Golang"));
    }

    #[test]
    fn irrelevant_composables_do_not_merge() {
        let manifest = Manifest::parse(
            r#"
[[composables]]
id = "deployment-type"
title = "Deployment Type"
default = "atlas"
options = [{ id = "atlas", title = "Atlas" }]
"#,
        )
        .unwrap();
        assert!(base().with_project(&manifest).is_none());
    }

    #[test]
    fn merge_from_disk() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("content/golang");
        fs::create_dir_all(project.join("source")).unwrap();
        fs::write(
            project.join(MANIFEST_FILE_NAME),
            "[[composables]]\nid = \"interface\"\ntitle = \"Interface\"\ndefault = \"driver\"\noptions = [{ id = \"driver\", title = \"Go Driver\" }]\n",
        )
        .unwrap();

        let base = base();
        let merged = merge_project_mappings(&base, &project.join("source/index.txt"));
        assert!(matches!(merged, Cow::Owned(_)));
        assert_eq!(merged.interface_to_product.get("driver").map(String::as_str), Some("Go Driver"));
    }

    #[test]
    fn no_manifest_borrows_base() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("content/other/source");
        fs::create_dir_all(&source).unwrap();

        let base = base();
        let merged = merge_project_mappings(&base, &source.join("index.txt"));
        assert!(matches!(merged, Cow::Borrowed(_)));
    }

    #[test]
    fn broken_manifest_borrows_base() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("content/broken/source");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.parent().unwrap().join(MANIFEST_FILE_NAME), "not = [valid").unwrap();

        let base = base();
        let merged = merge_project_mappings(&base, &source.join("index.txt"));
        assert!(matches!(merged, Cow::Borrowed(_)));
    }
}
