//! reStructuredText directive scanner. Line-by-line, first match wins.
//!
//! Recognizes the code-example markers (`literalinclude`, `code-block` and
//! its aliases, `io-code-block` with nested `input`/`output`) and turns each
//! into a [`Directive`]. Everything else is skipped without error. Partial or
//! malformed directives are still emitted; the classifier falls back on them.
//!
//! Grammar handled:
//!
//! ```text
//! <indent>.. <name>::[ argument]
//! <deeper>:key: value          ← header, ends at blank or non-option line
//! <blank>
//! <deeper>body …               ← ends at first non-blank line at <= indent
//! ```

pub mod include;
pub mod patterns;
pub mod yaml_steps;

use crate::language;
use patterns::*;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Directive options, keyed by option name.
pub type Options = BTreeMap<String, String>;

/// The code-example directive kinds the scanner emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveType {
    LiteralInclude,
    CodeBlock,
    IoCodeBlock,
    /// Legacy YAML `action:` entry, normalized into directive shape.
    YamlCodeBlock,
}

impl DirectiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            DirectiveType::LiteralInclude => "literalinclude",
            DirectiveType::CodeBlock => "code-block",
            DirectiveType::IoCodeBlock => "io-code-block",
            DirectiveType::YamlCodeBlock => "yaml-code-block",
        }
    }
}

impl fmt::Display for DirectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for DirectiveType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// `input` or `output` nested inside an `io-code-block`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubDirective {
    pub argument: String,
    pub options: Options,
    pub content: String,
}

impl SubDirective {
    /// Own `:language:` > own argument's extension > parent `:language:` >
    /// `undefined`, with aliases folded (`ts` → `typescript`).
    pub fn language(&self, parent_options: &Options) -> String {
        let resolved = option_language(&self.options)
            .or_else(|| language::from_extension(&self.argument).map(str::to_string))
            .or_else(|| option_language(parent_options))
            .unwrap_or_else(|| language::UNDEFINED.to_string());
        language::normalize(&resolved)
    }
}

/// One scanned code-example directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveType,
    pub argument: String,
    pub options: Options,
    /// Verbatim body (dedented). Empty for `literalinclude`.
    pub content: String,
    pub input: Option<SubDirective>,
    pub output: Option<SubDirective>,
    /// 1-based line of the marker.
    pub line_num: usize,
}

impl Directive {
    fn new(kind: DirectiveType, argument: String, line_num: usize) -> Self {
        Directive {
            kind,
            argument,
            options: Options::new(),
            content: String::new(),
            input: None,
            output: None,
            line_num,
        }
    }

    /// Resolve the directive's own language.
    ///
    /// Explicit argument > `:language:` > file extension (for
    /// `literalinclude`, whose argument is a path) > `undefined`.
    ///
    /// Only `literalinclude` folds aliases; code-block languages are kept as
    /// written so `sh` stays distinct from `shell`.
    pub fn language(&self) -> String {
        let from_argument = match self.kind {
            DirectiveType::CodeBlock | DirectiveType::YamlCodeBlock => {
                non_empty(&self.argument).map(|a| a.to_lowercase())
            }
            DirectiveType::LiteralInclude | DirectiveType::IoCodeBlock => None,
        };
        let from_extension = || match self.kind {
            DirectiveType::LiteralInclude => {
                language::from_extension(&self.argument).map(str::to_string)
            }
            _ => None,
        };
        let resolved = from_argument
            .or_else(|| option_language(&self.options))
            .or_else(from_extension)
            .unwrap_or_else(|| language::UNDEFINED.to_string());
        match self.kind {
            DirectiveType::LiteralInclude => language::normalize(&resolved),
            _ => resolved,
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn option_language(options: &Options) -> Option<String> {
    options
        .get("language")
        .and_then(|l| non_empty(l))
        .map(|l| l.to_lowercase())
}

// -- Public API ---------------------------------------------------------------

/// Scan file content. YAML files additionally go through the legacy steps
/// sub-parser; both result sets are merged in line order. `path` only
/// selects the sub-parsers.
pub fn parse_text(path: &Path, content: &str) -> Vec<Directive> {
    let mut directives = scan(content);
    if yaml_steps::is_yaml_path(path) {
        directives.extend(yaml_steps::parse(content));
        // Stable: scanner output stays ahead of YAML actions on the same line
        directives.sort_by_key(|d| d.line_num);
    }
    directives
}

/// Scan markup text into directives, in document order.
pub fn scan(text: &str) -> Vec<Directive> {
    let lines: Vec<&str> = text.lines().collect();
    let mut directives = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let Some(marker) = match_marker(line.trim()) else {
            i += 1;
            continue;
        };

        let indent = indent_of(line);
        let (options, after_header) = read_options(&lines, i + 1, indent);
        let line_num = i + 1;

        let (directive, next) = match marker {
            Marker::LiteralInclude(argument) => {
                let mut d = Directive::new(DirectiveType::LiteralInclude, argument, line_num);
                d.options = options;
                (d, after_header)
            }
            Marker::CodeBlock(argument) => {
                let (body, next) = read_body(&lines, after_header, indent);
                let mut d = Directive::new(DirectiveType::CodeBlock, argument, line_num);
                d.options = options;
                d.content = dedent(body);
                (d, next)
            }
            Marker::IoCodeBlock => {
                let (body, next) = read_body(&lines, after_header, indent);
                let mut d = Directive::new(DirectiveType::IoCodeBlock, String::new(), line_num);
                d.options = options;
                let (input, output) = scan_io_body(body);
                d.input = input;
                d.output = output;
                (d, next)
            }
        };

        directives.push(directive);
        i = next.max(i + 1);
    }

    directives
}

// -- Line processing ----------------------------------------------------------

enum Marker {
    LiteralInclude(String),
    IoCodeBlock,
    CodeBlock(String),
}

/// Ordered registry: the first pattern that matches decides the marker.
fn match_marker(trimmed: &str) -> Option<Marker> {
    if let Some(caps) = RE_LITERALINCLUDE.captures(trimmed) {
        return Some(Marker::LiteralInclude(caps[1].trim().to_string()));
    }
    if RE_IO_CODE_BLOCK.is_match(trimmed) {
        return Some(Marker::IoCodeBlock);
    }
    if let Some(caps) = RE_CODE_BLOCK.captures(trimmed) {
        let argument = caps.get(1).map_or("", |m| m.as_str()).trim();
        return Some(Marker::CodeBlock(argument.to_string()));
    }
    None
}

/// Collect `:key: value` lines indented deeper than the marker. Returns the
/// options and the index of the first line after the header.
fn read_options(lines: &[&str], start: usize, marker_indent: usize) -> (Options, usize) {
    let mut options = Options::new();
    let mut j = start;
    while j < lines.len() {
        let line = lines[j];
        let trimmed = line.trim();
        if trimmed.is_empty() || indent_of(line) <= marker_indent {
            break;
        }
        let Some(caps) = RE_OPTION.captures(trimmed) else {
            break;
        };
        let value = caps.get(2).map_or("", |m| m.as_str()).trim();
        options.insert(caps[1].to_string(), value.to_string());
        j += 1;
    }
    (options, j)
}

/// Body lines: blank or deeper than the marker. Stops at the first non-blank
/// line at or below the marker's indentation.
fn read_body<'a>(lines: &'a [&'a str], start: usize, marker_indent: usize) -> (&'a [&'a str], usize) {
    let mut j = start;
    while j < lines.len() {
        let line = lines[j];
        if !line.trim().is_empty() && indent_of(line) <= marker_indent {
            break;
        }
        j += 1;
    }
    (&lines[start.min(j)..j], j)
}

/// Find the `input`/`output` sub-markers in an io-code-block body. The first
/// of each wins.
fn scan_io_body(body: &[&str]) -> (Option<SubDirective>, Option<SubDirective>) {
    let mut input = None;
    let mut output = None;
    let mut i = 0;

    while i < body.len() {
        let line = body[i];
        let trimmed = line.trim();
        let (slot, caps) = if let Some(caps) = RE_INPUT.captures(trimmed) {
            (&mut input, caps)
        } else if let Some(caps) = RE_OUTPUT.captures(trimmed) {
            (&mut output, caps)
        } else {
            i += 1;
            continue;
        };

        let indent = indent_of(line);
        let (options, after_header) = read_options(body, i + 1, indent);
        let (content, next) = read_body(body, after_header, indent);
        if slot.is_none() {
            *slot = Some(SubDirective {
                argument: caps.get(1).map_or("", |m| m.as_str()).trim().to_string(),
                options,
                content: dedent(content),
            });
        }
        i = next.max(i + 1);
    }

    (input, output)
}

/// Strip the common leading indentation and surrounding blank lines.
fn dedent(lines: &[&str]) -> String {
    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    let stripped: Vec<&str> = lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                ""
            } else {
                l.get(min_indent..).unwrap_or_else(|| l.trim_start())
            }
        })
        .collect();
    stripped.join("\n").trim_matches('\n').to_string()
}
