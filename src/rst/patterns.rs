//! Directive and option regexes. All marker syntax is defined here.
//!
//! All marker patterns are matched against the whitespace-trimmed line, so
//! indentation never affects recognition. Indentation is measured separately
//! by the callers that need block structure.

use regex::Regex;
use std::sync::LazyLock;

// -- Code example markers -----------------------------------------------------

/// `.. literalinclude:: /path/to/file.py`
pub static RE_LITERALINCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+literalinclude::\s+(.+)$").unwrap());

/// `.. io-code-block::`
pub static RE_IO_CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+io-code-block::").unwrap());

/// `.. code-block:: python`, `.. code::`, `.. sourcecode:: js`
pub static RE_CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.\.\s+(?:code-block|code|sourcecode)::(?:\s+(.*))?$").unwrap()
});

/// `.. input:: /path/to/file.js` (inside io-code-block)
pub static RE_INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+input::(?:\s+(.*))?$").unwrap());

/// `.. output:: /path/to/file.json` (inside io-code-block)
pub static RE_OUTPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+output::(?:\s+(.*))?$").unwrap());

// -- Structural markers -------------------------------------------------------

/// `.. include:: /includes/foo.rst`
pub static RE_INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+include::\s+(.+)$").unwrap());

/// `.. tab:: Python`, a single tab. Does not match `.. tabs::`.
pub static RE_TAB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+tab::\s*(.*)$").unwrap());

/// `.. selected-content::`
pub static RE_SELECTED_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+selected-content::").unwrap());

/// `.. composable-tutorial::`
pub static RE_COMPOSABLE_TUTORIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+composable-tutorial::").unwrap());

// -- Options ------------------------------------------------------------------

/// Any `:key: value` option line (trimmed). Value may be absent (`:linenos:`).
pub static RE_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z0-9_-]+):(?:\s+(.*))?$").unwrap());

/// `:tabid: python`
pub static RE_TABID_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:tabid:\s*(.+)$").unwrap());

/// `:selections: python`
pub static RE_SELECTIONS_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:selections:\s*(.+)$").unwrap());

/// `:options: language=python; interface=driver`
pub static RE_OPTIONS_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:options:\s*(.+)$").unwrap());

/// Number of leading spaces. Tabs count as one column, like the trimmed-left
/// measurement used everywhere else.
pub fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_block_variants() {
        let caps = RE_CODE_BLOCK.captures(".. code-block:: python").unwrap();
        assert_eq!(caps.get(1).map(|m| m.as_str()), Some("python"));
        assert!(RE_CODE_BLOCK.is_match(".. code::"));
        assert!(RE_CODE_BLOCK.is_match(".. sourcecode:: js"));
        assert!(!RE_CODE_BLOCK.is_match(".. io-code-block::"));
    }

    #[test]
    fn tab_does_not_match_tabs() {
        assert!(RE_TAB.is_match(".. tab:: Python"));
        assert!(RE_TAB.is_match(".. tab::"));
        assert!(!RE_TAB.is_match(".. tabs::"));
        assert!(!RE_TAB.is_match(".. tabs-drivers::"));
    }

    #[test]
    fn option_lines() {
        let caps = RE_OPTION.captures(":language: python").unwrap();
        assert_eq!(&caps[1], "language");
        assert_eq!(caps.get(2).map(|m| m.as_str()), Some("python"));

        let caps = RE_OPTION.captures(":linenos:").unwrap();
        assert_eq!(&caps[1], "linenos");
        assert!(caps.get(2).is_none());

        assert!(!RE_OPTION.is_match("not: an option"));
    }

    #[test]
    fn selector_options() {
        let caps = RE_TABID_OPTION.captures("      :tabid: java-sync").unwrap();
        assert_eq!(caps[1].trim(), "java-sync");
        let caps = RE_SELECTIONS_OPTION.captures("   :selections: python").unwrap();
        assert_eq!(caps[1].trim(), "python");
    }

    #[test]
    fn indentation() {
        assert_eq!(indent_of("   .. tab::"), 3);
        assert_eq!(indent_of(".. tab::"), 0);
        assert_eq!(indent_of(""), 0);
    }
}
