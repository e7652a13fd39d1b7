//! `.. include::` discovery and target resolution.
//!
//! Resolution order for a target:
//!
//! | Step | Target form | Candidate |
//! |------|-------------|-----------|
//! | 1 | `/includes/x.rst` | `<source root>/includes/x.rst` |
//! | 1 | `x.rst` | `<including dir>/x.rst` |
//! | 2 | `/includes/steps/<name>.rst` | `<root>/includes/steps-<name>.yaml` |
//! | 3 | `/includes/extracts/<ref>.rst` | first `<root>/includes/extracts*.yaml` with `ref: <ref>` |
//!
//! The source root is the nearest ancestor directory named `source`.

use super::patterns::RE_INCLUDE;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const SOURCE_DIR_NAME: &str = "source";

/// A resolvable `.. include::` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    /// 1-based line of the marker.
    pub line_num: usize,
    /// Target as written.
    pub target: String,
    /// Path the target resolved to (not canonicalized).
    pub resolved: PathBuf,
}

/// Scan `content` for include markers and resolve each against `file`.
/// Unresolvable targets are dropped.
pub fn find_includes(file: &Path, content: &str) -> Vec<Include> {
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let caps = RE_INCLUDE.captures(line.trim())?;
            let target = caps[1].trim().to_string();
            match resolve_include(file, &target) {
                Some(resolved) => Some(Include {
                    line_num: idx + 1,
                    target,
                    resolved,
                }),
                None => {
                    debug!(file = %file.display(), include = %target, "unresolvable include");
                    None
                }
            }
        })
        .collect()
}

/// Resolve an include target relative to the file that includes it.
///
/// Returns `None` for template targets (`{{ ... }}`) and for targets that
/// match no existing file.
pub fn resolve_include(file: &Path, target: &str) -> Option<PathBuf> {
    // Template variables are substituted at build time; can't resolve statically
    if target.contains("{{") {
        return None;
    }

    let file_dir = file.parent().unwrap_or_else(|| Path::new("."));
    let root = source_root(file);

    let candidate = match target.strip_prefix('/') {
        Some(rooted) => root.join(rooted),
        None => file_dir.join(target),
    };
    if candidate.is_file() {
        return Some(candidate);
    }

    let rooted = target.trim_start_matches('/');
    resolve_steps(&root, rooted).or_else(|| resolve_extract(&root, rooted))
}

/// Nearest ancestor named `source`, else the file's own directory.
pub fn source_root(file: &Path) -> PathBuf {
    let file_dir = file.parent().unwrap_or_else(|| Path::new("."));
    file_dir
        .ancestors()
        .find(|dir| dir.file_name().is_some_and(|n| n == SOURCE_DIR_NAME))
        .unwrap_or(file_dir)
        .to_path_buf()
}

/// Split `a/b/<kind>/<name>.rst` into (`a/b`, `name`) when the parent
/// directory is `kind`.
fn legacy_parts<'a>(target: &'a str, kind: &str) -> Option<(&'a Path, &'a str)> {
    let path = Path::new(target);
    let parent = path.parent()?;
    if parent.file_name()? != kind {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    Some((parent.parent().unwrap_or_else(|| Path::new("")), stem))
}

fn resolve_steps(root: &Path, target: &str) -> Option<PathBuf> {
    let (dir, name) = legacy_parts(target, "steps")?;
    let candidate = root.join(dir).join(format!("steps-{name}.yaml"));
    candidate.is_file().then_some(candidate)
}

fn resolve_extract(root: &Path, target: &str) -> Option<PathBuf> {
    let (dir, reference) = legacy_parts(target, "extracts")?;
    let pattern = root.join(dir).join("extracts*.yaml");
    let pattern = pattern.to_str()?;
    let ref_line = Regex::new(&format!(r"(?m)^ref:\s*{}\s*$", regex::escape(reference))).ok()?;

    let mut candidates: Vec<PathBuf> = glob::glob(pattern).ok()?.filter_map(|p| p.ok()).collect();
    candidates.sort();
    candidates.into_iter().find(|path| {
        fs::read_to_string(path)
            .map(|content| ref_line.is_match(&content))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("source/includes/steps")).unwrap();
        fs::create_dir_all(dir.path().join("source/tutorial")).unwrap();
        dir
    }

    #[test]
    fn rooted_target_resolves_against_source() {
        let dir = source_tree();
        let inc = dir.path().join("source/includes/intro.rst");
        fs::write(&inc, "Intro\n").unwrap();
        let page = dir.path().join("source/tutorial/page.txt");

        assert_eq!(resolve_include(&page, "/includes/intro.rst"), Some(inc));
    }

    #[test]
    fn relative_target_resolves_against_file_dir() {
        let dir = source_tree();
        let sibling = dir.path().join("source/tutorial/shared.rst");
        fs::write(&sibling, "Shared\n").unwrap();
        let page = dir.path().join("source/tutorial/page.txt");

        assert_eq!(resolve_include(&page, "shared.rst"), Some(sibling));
    }

    #[test]
    fn template_and_missing_targets() {
        let dir = source_tree();
        let page = dir.path().join("source/page.txt");
        assert_eq!(resolve_include(&page, "/includes/{{version}}/a.rst"), None);
        assert_eq!(resolve_include(&page, "/includes/missing.rst"), None);
    }

    #[test]
    fn steps_fallback() {
        let dir = source_tree();
        let steps = dir.path().join("source/includes/steps-install.yaml");
        fs::write(&steps, "title: Install\n").unwrap();
        let page = dir.path().join("source/page.txt");

        assert_eq!(resolve_include(&page, "/includes/steps/install.rst"), Some(steps));
    }

    #[test]
    fn extracts_fallback_matches_ref() {
        let dir = source_tree();
        fs::write(
            dir.path().join("source/includes/extracts-a.yaml"),
            "ref: other-thing\ncontent: x\n",
        )
        .unwrap();
        let wanted = dir.path().join("source/includes/extracts-b.yaml");
        fs::write(&wanted, "ref: other\n---\nref: install-note\ncontent: y\n").unwrap();
        let page = dir.path().join("source/page.txt");

        assert_eq!(resolve_include(&page, "/includes/extracts/install-note.rst"), Some(wanted));
        assert_eq!(resolve_include(&page, "/includes/extracts/absent.rst"), None);
    }

    #[test]
    fn find_includes_keeps_line_numbers() {
        let dir = source_tree();
        fs::write(dir.path().join("source/includes/a.rst"), "A\n").unwrap();
        let page = dir.path().join("source/page.txt");
        let content = "Title\n\n.. include:: /includes/a.rst\n\n   .. include:: /includes/nope.rst\n";

        let includes = find_includes(&page, content);
        assert_eq!(includes.len(), 1);
        assert_eq!(includes[0].line_num, 3);
        assert_eq!(includes[0].target, "/includes/a.rst");
    }

    #[test]
    fn source_root_falls_back_to_file_dir() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("docs/page.txt");
        assert_eq!(source_root(&page), dir.path().join("docs"));
    }
}
