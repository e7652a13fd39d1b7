//! Context block tracking and per-line context resolution.
//!
//! Tabs and selected-content blocks scope a selector (tab ID or composable
//! selection) to a range of lines. The tracker turns a file into a flat list
//! of closed intervals; the resolver answers "which selector applies at line
//! N" with the innermost interval that has one, falling back to contexts
//! collected from the whole file.
//!
//! ```text
//! .. tab::                  ← Tab opens (indent 0)
//!    :tabid: python         ← selector filled in
//!
//!    .. code-block:: python ← resolves to tab_id = python
//!
//! Back at indent 0.         ← closes the Tab, end_line = previous line
//! ```

use crate::mappings::ProductMappings;
use crate::rst::include::Include;
use crate::rst::patterns::*;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Context resolved for a single directive. Every field is optional; an
/// all-`None` context means "no inherited context".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CodeContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
}

impl CodeContext {
    pub fn tab(id: impl Into<String>) -> Self {
        CodeContext {
            tab_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn selection(language: impl Into<String>) -> Self {
        CodeContext {
            language: Some(language.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tab_id.is_none() && self.language.is_none() && self.interface.is_none()
    }

    /// Context handed to an included file for a propagated selector value.
    /// Values known to the tab table are tab IDs; anything else is treated
    /// as a composable language selection.
    pub fn for_selector(selector: &str, mappings: &ProductMappings) -> Self {
        if mappings.tab_id_to_product.contains_key(selector) {
            CodeContext::tab(selector)
        } else {
            CodeContext::selection(selector)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Tab,
    SelectedContent,
}

impl BlockKind {
    fn selector_pattern(self) -> &'static Regex {
        match self {
            BlockKind::Tab => &*RE_TABID_OPTION,
            BlockKind::SelectedContent => &*RE_SELECTIONS_OPTION,
        }
    }
}

/// A closed line interval scoped to one tab or selected-content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock {
    pub kind: BlockKind,
    /// Tab ID or selection value. Empty if the block never declared one.
    pub selector: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl ContextBlock {
    pub fn contains(&self, line_num: usize) -> bool {
        self.start_line <= line_num && line_num <= self.end_line
    }

    pub fn context(&self) -> CodeContext {
        match self.kind {
            BlockKind::Tab => CodeContext::tab(&self.selector),
            BlockKind::SelectedContent => CodeContext::selection(&self.selector),
        }
    }
}

struct OpenBlock {
    kind: BlockKind,
    indent: usize,
    start_line: usize,
    selector: String,
}

impl OpenBlock {
    fn close(self, end_line: usize) -> ContextBlock {
        ContextBlock {
            kind: self.kind,
            selector: self.selector,
            start_line: self.start_line,
            end_line,
        }
    }
}

// -- Tracker ------------------------------------------------------------------

/// Build the interval list for a file. Blocks appear in the order they close,
/// so inner blocks precede the blocks that enclose them.
pub fn track_blocks(text: &str) -> Vec<ContextBlock> {
    let mut open: Vec<OpenBlock> = Vec::new();
    let mut blocks = Vec::new();
    let mut last_line = 0;

    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        last_line = line_num;
        let trimmed = line.trim();
        let indent = indent_of(line);

        // Option lines belong to the directive above them and never close
        if !trimmed.is_empty() && !trimmed.starts_with(':') {
            while open.last().is_some_and(|top| indent <= top.indent) {
                if let Some(block) = open.pop() {
                    blocks.push(block.close(line_num - 1));
                }
            }
        }

        let opened = if RE_TAB.is_match(trimmed) {
            Some(BlockKind::Tab)
        } else if RE_SELECTED_CONTENT.is_match(trimmed) {
            Some(BlockKind::SelectedContent)
        } else {
            None
        };
        if let Some(kind) = opened {
            open.push(OpenBlock {
                kind,
                indent,
                start_line: line_num,
                selector: String::new(),
            });
            continue;
        }

        if let Some(top) = open.last_mut() {
            if top.selector.is_empty() {
                if let Some(caps) = top.kind.selector_pattern().captures(line) {
                    top.selector = caps[1].trim().to_string();
                }
            }
        }
    }

    while let Some(block) = open.pop() {
        blocks.push(block.close(last_line));
    }
    blocks
}

// -- File-level contexts ------------------------------------------------------

/// Whole-file scan for context declarations, without interval tracking.
///
/// Collects every declared tab ID and every composable-tutorial option
/// string. Used as the fallback for lines outside any block.
pub fn file_contexts(text: &str) -> Vec<CodeContext> {
    let lines: Vec<&str> = text.lines().collect();
    let mut contexts = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        let is_tab = RE_TAB.is_match(trimmed);
        let is_tutorial = RE_COMPOSABLE_TUTORIAL.is_match(trimmed);
        if !is_tab && !is_tutorial {
            continue;
        }

        let header = lines[i + 1..]
            .iter()
            .take_while(|l| l.trim().starts_with(':'));
        for option in header {
            if is_tab {
                if let Some(caps) = RE_TABID_OPTION.captures(option) {
                    contexts.push(CodeContext::tab(caps[1].trim()));
                    break;
                }
            } else if let Some(caps) = RE_OPTIONS_OPTION.captures(option) {
                let ctx = parse_composable_options(&caps[1]);
                if !ctx.is_empty() {
                    contexts.push(ctx);
                }
                break;
            }
        }
    }

    contexts
}

/// Parse a composable-tutorial `:options:` value such as
/// `language=python; interface=driver`.
///
/// Keys containing `lang` set the language; keys containing `interface` set
/// the interface. Everything else is ignored.
pub fn parse_composable_options(options: &str) -> CodeContext {
    let mut ctx = CodeContext::default();
    for pair in options.split(';') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if key.contains("lang") {
            ctx.language = Some(value.to_string());
        } else if key.contains("interface") {
            ctx.interface = Some(value.to_string());
        }
    }
    ctx
}

// -- Resolver -----------------------------------------------------------------

/// Innermost block containing `line_num` with a non-empty selector.
pub fn enclosing_block(line_num: usize, blocks: &[ContextBlock]) -> Option<&ContextBlock> {
    blocks
        .iter()
        .filter(|b| !b.selector.is_empty() && b.contains(line_num))
        .max_by_key(|b| b.start_line)
}

/// Contexts applying at `line_num`: the innermost enclosing block's, or the
/// file-level list. An empty result means no inherited context.
pub fn resolve(
    line_num: usize,
    blocks: &[ContextBlock],
    file_contexts: &[CodeContext],
) -> Vec<CodeContext> {
    match enclosing_block(line_num, blocks) {
        Some(block) => vec![block.context()],
        None => file_contexts.to_vec(),
    }
}

/// Map each include target to the selector of the block it sits in. The
/// first marker for a target wins.
pub fn include_selectors(includes: &[Include], blocks: &[ContextBlock]) -> HashMap<PathBuf, String> {
    let mut selectors = HashMap::new();
    for include in includes {
        if let Some(block) = enclosing_block(include.line_num, blocks) {
            selectors
                .entry(include.resolved.clone())
                .or_insert_with(|| block.selector.clone());
        }
    }
    selectors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(lines: &[(usize, &str)], total: usize) -> String {
        let mut out = vec![String::new(); total];
        for (num, text) in lines {
            out[num - 1] = text.to_string();
        }
        out.join("\n")
    }

    #[test]
    fn selected_content_interval() {
        // Block spans lines 10..=20, then prose at indent 0 on line 21
        let text = padded(
            &[
                (10, ".. selected-content::"),
                (11, "   :selections: python"),
                (15, "   .. code-block:: python"),
                (20, "      x = 1"),
                (21, "Outside."),
                (25, ".. code-block:: go"),
            ],
            26,
        );
        let blocks = track_blocks(&text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_line, 10);
        assert_eq!(blocks[0].end_line, 20);
        assert_eq!(blocks[0].selector, "python");

        let file_ctx = vec![CodeContext::tab("go")];
        let inside = resolve(15, &blocks, &file_ctx);
        assert_eq!(inside, vec![CodeContext::selection("python")]);
        let outside = resolve(25, &blocks, &file_ctx);
        assert_eq!(outside, file_ctx);
    }

    #[test]
    fn dedent_closes_nested_blocks() {
        let text = "\
.. tab::
   :tabid: outer

   .. tab::
      :tabid: inner

      Inner body.

Dedented.
";
        let blocks = track_blocks(text);
        assert_eq!(blocks.len(), 2);
        let inner = blocks.iter().find(|b| b.selector == "inner").unwrap();
        let outer = blocks.iter().find(|b| b.selector == "outer").unwrap();
        assert_eq!((inner.start_line, inner.end_line), (4, 8));
        assert_eq!((outer.start_line, outer.end_line), (1, 8));
        assert_eq!(enclosing_block(7, &blocks).unwrap().selector, "inner");
        assert_eq!(enclosing_block(2, &blocks).unwrap().selector, "outer");
    }

    #[test]
    fn sibling_tabs_close_each_other() {
        let text = "\
.. tabs::

   .. tab::
      :tabid: python

      Python.

   .. tab::
      :tabid: java-sync

      Java.
";
        let blocks = track_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!((blocks[0].start_line, blocks[0].end_line, blocks[0].selector.as_str()), (3, 7, "python"));
        assert_eq!((blocks[1].start_line, blocks[1].end_line, blocks[1].selector.as_str()), (8, 11, "java-sync"));
    }

    #[test]
    fn block_without_selector_is_no_context() {
        let text = ".. tab:: Untitled\n\n   .. code-block:: python\n";
        let blocks = track_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].selector.is_empty());
        assert!(resolve(3, &blocks, &[]).is_empty());
    }

    #[test]
    fn file_level_contexts() {
        let text = "\
.. composable-tutorial::
   :options: language, interface
   :defaults: nodejs, driver

.. tab:: Shell
   :tabid: shell

.. composable-tutorial::
   :options: language=python; interface=driver
";
        let contexts = file_contexts(text);
        assert_eq!(
            contexts,
            vec![
                CodeContext::tab("shell"),
                CodeContext {
                    tab_id: None,
                    language: Some("python".into()),
                    interface: Some("driver".into()),
                },
            ]
        );
    }

    #[test]
    fn composable_option_keys() {
        let ctx = parse_composable_options("lang=go ; deployment-type=atlas; interface = mongosh");
        assert_eq!(ctx.language.as_deref(), Some("go"));
        assert_eq!(ctx.interface.as_deref(), Some("mongosh"));
        assert!(parse_composable_options("language, interface").is_empty());
    }

    #[test]
    fn selector_kind_by_tab_table() {
        let mut mappings = ProductMappings::default();
        mappings
            .tab_id_to_product
            .insert("nodejs".into(), "Node.js".into());
        assert_eq!(CodeContext::for_selector("nodejs", &mappings), CodeContext::tab("nodejs"));
        assert_eq!(CodeContext::for_selector("go", &mappings), CodeContext::selection("go"));
    }

    #[test]
    fn include_selector_map() {
        let text = "\
.. selected-content::
   :selections: python

   .. include:: /includes/py.rst

.. include:: /includes/common.rst
";
        let blocks = track_blocks(text);
        let includes = vec![
            Include {
                line_num: 4,
                target: "/includes/py.rst".into(),
                resolved: PathBuf::from("/src/includes/py.rst"),
            },
            Include {
                line_num: 6,
                target: "/includes/common.rst".into(),
                resolved: PathBuf::from("/src/includes/common.rst"),
            },
        ];
        let selectors = include_selectors(&includes, &blocks);
        assert_eq!(selectors.len(), 1);
        assert_eq!(
            selectors.get(&PathBuf::from("/src/includes/py.rst")).map(String::as_str),
            Some("python")
        );
    }
}
