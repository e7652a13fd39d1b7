//! Recursive, cycle-safe collection of classified code examples.
//!
//! A page is scanned for directives and context blocks; each directive is
//! classified with the context that applies at its line. Included files are
//! then walked depth-first in marker order, inheriting either the selector of
//! the block around the include or the context the current file inherited.
//!
//! ## Inherited context
//!
//! | Include site | Included file sees |
//! |--------------|--------------------|
//! | inside a tab / selected-content block | that block's selector |
//! | elsewhere, current file inherited a context | the same context |
//! | elsewhere, top-level file | its own blocks and file-level contexts |

use crate::classify;
use crate::context::{self, CodeContext};
use crate::mappings::{merge_project_mappings, ProductMappings};
use crate::rst::{self, include, Directive, DirectiveType, SubDirective};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Maximum inclusion depth to prevent runaway recursion.
const MAX_DEPTH: usize = 64;

/// Directory component that precedes the content directory in a path.
const CONTENT_ROOT: &str = "content";

/// A single classified code example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeExample {
    #[serde(rename = "type")]
    pub kind: DirectiveType,
    pub language: String,
    pub product: String,
    pub is_input: bool,
    pub is_output: bool,
    pub is_tested: bool,
    pub is_testable: bool,
    pub is_maybe_testable: bool,
    /// Referenced code file, for directives that point at one.
    pub file_path: String,
    /// The documentation file the directive appears in.
    pub source_file: PathBuf,
}

/// Everything collected for one entry page.
#[derive(Debug, Clone, Serialize)]
pub struct PageAnalysis {
    pub source_path: PathBuf,
    pub content_dir: String,
    pub examples: Vec<CodeExample>,
}

/// Content directory for a path: the component right after `content`.
pub fn content_dir_from_path(path: &Path) -> Option<String> {
    let mut components = path.components().map(|c| c.as_os_str().to_string_lossy());
    components.find(|c| c == CONTENT_ROOT)?;
    components.next().map(|c| c.into_owned())
}

/// Classify every example reachable from `path`.
///
/// The entry file must be readable; failures further down the include graph
/// only prune that branch.
pub fn classify_file(
    path: &Path,
    content_dir: &str,
    mappings: &ProductMappings,
) -> Result<Vec<CodeExample>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut walker = Walker {
        content_dir,
        mappings,
        visited: HashSet::new(),
    };
    Ok(walker.visit(path, &text, None, 0))
}

/// Merge the page's project mappings and classify it.
pub fn analyze_file(
    path: &Path,
    content_dir: Option<&str>,
    base: &ProductMappings,
) -> Result<PageAnalysis> {
    let content_dir = match content_dir {
        Some(dir) => dir.to_string(),
        None => content_dir_from_path(path).unwrap_or_default(),
    };
    let mappings = merge_project_mappings(base, path);
    let examples = classify_file(path, &content_dir, &mappings)?;
    Ok(PageAnalysis {
        source_path: path.to_path_buf(),
        content_dir,
        examples,
    })
}

struct Walker<'a> {
    content_dir: &'a str,
    mappings: &'a ProductMappings,
    visited: HashSet<PathBuf>,
}

fn visit_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

impl Walker<'_> {
    /// Read and visit an included file. Unreadable files yield nothing.
    fn collect(&mut self, path: &Path, inherited: Option<&CodeContext>, depth: usize) -> Vec<CodeExample> {
        if self.visited.contains(&visit_key(path)) {
            return Vec::new();
        }
        match fs::read_to_string(path) {
            Ok(text) => self.visit(path, &text, inherited, depth),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable include");
                Vec::new()
            }
        }
    }

    fn visit(
        &mut self,
        path: &Path,
        text: &str,
        inherited: Option<&CodeContext>,
        depth: usize,
    ) -> Vec<CodeExample> {
        if !self.visited.insert(visit_key(path)) {
            return Vec::new();
        }

        let directives = rst::parse_text(path, text);
        let includes = include::find_includes(path, text);
        let blocks = context::track_blocks(text);
        let selectors = context::include_selectors(&includes, &blocks);

        // A file entered for a specific selection applies it everywhere
        let file_contexts = match inherited {
            Some(ctx) => vec![ctx.clone()],
            None => context::file_contexts(text),
        };

        let mut examples = Vec::new();
        for directive in &directives {
            let contexts = match inherited {
                Some(_) => file_contexts.clone(),
                None => context::resolve(directive.line_num, &blocks, &file_contexts),
            };
            self.classify_directive(directive, path, &contexts, &mut examples);
        }

        if !includes.is_empty() && depth >= MAX_DEPTH {
            warn!(path = %path.display(), "include depth limit ({MAX_DEPTH}) reached; not descending");
            return examples;
        }

        for inc in &includes {
            let propagated = match selectors.get(&inc.resolved) {
                Some(selector) => Some(CodeContext::for_selector(selector, self.mappings)),
                None => inherited.cloned(),
            };
            examples.extend(self.collect(&inc.resolved, propagated.as_ref(), depth + 1));
        }

        examples
    }

    fn classify_directive(
        &self,
        directive: &Directive,
        source: &Path,
        contexts: &[CodeContext],
        out: &mut Vec<CodeExample>,
    ) {
        match directive.kind {
            DirectiveType::LiteralInclude => {
                out.push(self.example(directive.kind, directive.language(), &directive.argument, source, contexts));
            }
            DirectiveType::CodeBlock | DirectiveType::YamlCodeBlock => {
                out.push(self.example(directive.kind, directive.language(), "", source, contexts));
            }
            DirectiveType::IoCodeBlock => {
                let subs = [(&directive.input, true), (&directive.output, false)];
                for (sub, is_input) in subs {
                    let Some(sub) = sub else { continue };
                    let mut example = self.sub_example(directive, sub, source, contexts);
                    example.is_input = is_input;
                    example.is_output = !is_input;
                    out.push(example);
                }
            }
        }
    }

    fn sub_example(
        &self,
        parent: &Directive,
        sub: &SubDirective,
        source: &Path,
        contexts: &[CodeContext],
    ) -> CodeExample {
        self.example(parent.kind, sub.language(&parent.options), &sub.argument, source, contexts)
    }

    fn example(
        &self,
        kind: DirectiveType,
        language: String,
        file_path: &str,
        source: &Path,
        contexts: &[CodeContext],
    ) -> CodeExample {
        let c = classify::classify(&language, self.content_dir, contexts, self.mappings);
        CodeExample {
            kind,
            language,
            product: c.product,
            is_input: false,
            is_output: false,
            is_tested: classify::is_tested_path(file_path),
            is_testable: c.is_testable,
            is_maybe_testable: c.is_maybe_testable,
            file_path: file_path.to_string(),
            source_file: source.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mappings() -> ProductMappings {
        let mut m = ProductMappings::default();
        m.tab_id_to_product.insert("nodejs".into(), "Node.js".into());
        m.tab_id_to_product.insert("python".into(), "Python".into());
        m.language_to_product.insert("python".into(), "Python".into());
        m.language_to_product.insert("go".into(), "Go".into());
        m
    }

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn cycle_terminates() {
        let dir = TempDir::new().unwrap();
        let a = write(
            dir.path(),
            "source/a.txt",
            ".. include:: /includes/b.rst\n\n.. code-block:: python\n\n   a = 1\n",
        );
        write(
            dir.path(),
            "source/includes/b.rst",
            ".. include:: /a.txt\n\n.. code-block:: go\n\n   b := 1\n",
        );

        let examples = classify_file(&a, "", &mappings()).unwrap();
        let languages: Vec<_> = examples.iter().map(|e| e.language.as_str()).collect();
        assert_eq!(languages, ["python", "go"]);
    }

    #[test]
    fn self_include_visits_once() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "source/a.txt", ".. include:: a.txt\n.. code-block:: go\n");
        assert_eq!(classify_file(&a, "", &mappings()).unwrap().len(), 1);
    }

    #[test]
    fn unreadable_entry_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(classify_file(&dir.path().join("missing.txt"), "", &mappings()).is_err());
    }

    #[test]
    fn selector_propagates_through_two_levels() {
        let dir = TempDir::new().unwrap();
        let page = write(
            dir.path(),
            "source/page.txt",
            ".. selected-content::\n   :selections: go\n\n   .. include:: /includes/first.rst\n",
        );
        write(
            dir.path(),
            "source/includes/first.rst",
            ".. code-block:: javascript\n\n   x\n\n.. include:: /includes/second.rst\n",
        );
        write(dir.path(), "source/includes/second.rst", ".. literalinclude:: /code/tested/main.go\n");

        let examples = classify_file(&page, "", &mappings()).unwrap();
        assert_eq!(examples.len(), 2);
        assert!(examples.iter().all(|e| e.product == "Go"));
        assert!(examples[1].is_tested);
        assert_eq!(examples[1].file_path, "/code/tested/main.go");
        assert!(examples[1].source_file.ends_with("second.rst"));
    }

    #[test]
    fn tab_id_selector_propagates_as_tab() {
        let dir = TempDir::new().unwrap();
        let page = write(
            dir.path(),
            "source/page.txt",
            ".. tab::\n   :tabid: nodejs\n\n   .. include:: /includes/node.rst\n",
        );
        write(dir.path(), "source/includes/node.rst", ".. code-block:: javascript\n");

        let examples = classify_file(&page, "", &mappings()).unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].product, "Node.js");
        assert!(examples[0].is_testable);
    }

    #[test]
    fn io_code_block_yields_input_and_output() {
        let dir = TempDir::new().unwrap();
        let page = write(
            dir.path(),
            "source/page.txt",
            ".. io-code-block::\n   :language: python\n\n   .. input:: /code/tested/find.py\n\n   .. output::\n      :language: json\n\n      {}\n",
        );

        let examples = classify_file(&page, "pymongo-driver", &mappings()).unwrap();
        assert_eq!(examples.len(), 2);
        assert!(examples[0].is_input && !examples[0].is_output);
        assert_eq!(examples[0].language, "python");
        assert_eq!(examples[0].product, "Python");
        assert!(examples[0].is_tested);
        assert!(examples[1].is_output);
        assert_eq!(examples[1].product, "JSON");
        assert_eq!(examples[1].kind, DirectiveType::IoCodeBlock);
    }

    #[test]
    fn literalinclude_language_alias_classifies() {
        let dir = TempDir::new().unwrap();
        let page = write(
            dir.path(),
            "source/page.txt",
            ".. literalinclude:: /code/insert.txt\n   :language: py\n\n.. io-code-block::\n\n   .. input::\n      :language: golang\n\n      x := 1\n",
        );

        let examples = classify_file(&page, "", &mappings()).unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].language, "python");
        assert_eq!(examples[0].product, "Python");
        assert!(examples[0].is_testable);
        assert_eq!(examples[1].language, "go");
        assert_eq!(examples[1].product, "Go");
    }

    #[test]
    fn include_chain_stops_at_depth_limit() {
        let dir = TempDir::new().unwrap();
        // 66 files, each including the next; only depths 0..=MAX_DEPTH are read
        let count = MAX_DEPTH + 2;
        for i in 0..count {
            let mut text = String::new();
            if i + 1 < count {
                text.push_str(&format!(".. include:: /includes/f{}.rst\n\n", i + 1));
            }
            text.push_str(&format!(".. code-block:: go\n   :caption: f{i}\n"));
            write(dir.path(), &format!("source/includes/f{i}.rst"), &text);
        }

        let entry = dir.path().join("source/includes/f0.rst");
        let examples = classify_file(&entry, "", &mappings()).unwrap();
        assert_eq!(examples.len(), MAX_DEPTH + 1);
        let last = format!("f{MAX_DEPTH}.rst");
        assert!(examples.last().unwrap().source_file.ends_with(&last));
    }

    #[test]
    fn local_examples_precede_included() {
        let dir = TempDir::new().unwrap();
        let page = write(
            dir.path(),
            "source/page.txt",
            ".. include:: /includes/x.rst\n\n.. code-block:: python\n",
        );
        write(dir.path(), "source/includes/x.rst", ".. code-block:: go\n");

        let examples = classify_file(&page, "", &mappings()).unwrap();
        let languages: Vec<_> = examples.iter().map(|e| e.language.as_str()).collect();
        assert_eq!(languages, ["python", "go"]);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let dir = TempDir::new().unwrap();
        let page = write(
            dir.path(),
            "source/page.txt",
            ".. tab::\n   :tabid: python\n\n   .. code-block:: python\n\n.. include:: /includes/x.rst\n",
        );
        write(dir.path(), "source/includes/x.rst", ".. code-block:: shell\n");

        let first = classify_file(&page, "", &mappings()).unwrap();
        let second = classify_file(&page, "", &mappings()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn analyze_derives_content_dir() {
        let dir = TempDir::new().unwrap();
        let page = write(
            dir.path(),
            "content/golang/source/index.txt",
            ".. code-block::\n\n   fmt.Println()\n",
        );

        let analysis = analyze_file(&page, None, &mappings()).unwrap();
        assert_eq!(analysis.content_dir, "golang");
        assert_eq!(analysis.examples[0].product, "Go");

        let analysis = analyze_file(&page, Some("node"), &mappings()).unwrap();
        assert_eq!(analysis.examples[0].product, "Node.js");
    }

    #[test]
    fn content_dir_component() {
        assert_eq!(
            content_dir_from_path(Path::new("/repo/content/golang/current/source/index.txt")),
            Some("golang".to_string())
        );
        assert_eq!(content_dir_from_path(Path::new("/repo/docs/index.txt")), None);
        assert_eq!(content_dir_from_path(Path::new("/repo/content")), None);
    }
}
