//! Legacy YAML steps files (`steps-*.yaml`).
//!
//! Each `---`-separated document is one step. Code lives in the `action`
//! field, either a single mapping or a list of them:
//!
//! ```yaml
//! title: Install
//! action:
//!   - pre: "Run:"
//!     language: sh
//!     code: |
//!       brew install mongodb-atlas
//! ```

use super::{Directive, DirectiveType};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

const YAML_EXTENSIONS: &[&str] = &["yaml", "yml"];

#[derive(Debug, Default, Deserialize)]
struct Step {
    #[serde(default)]
    action: Option<serde_yaml::Value>,
}

/// Only the fields that carry code. `pre`, `post` and `copyable` are prose
/// or rendering hints and are ignored.
#[derive(Debug, Default, Deserialize)]
struct Action {
    #[serde(default)]
    language: String,
    #[serde(default)]
    code: String,
}

pub fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| YAML_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Extract code actions from a multi-document steps file.
pub fn parse(content: &str) -> Vec<Directive> {
    let mut directives = Vec::new();
    let mut doc_start = 1;

    for (index, doc) in content.split("\n---").enumerate() {
        // Documents after the first begin with the rest of the `---` line
        let first_line = if index == 0 { doc_start } else { doc_start + 1 };
        let next_start = doc_start + doc.matches('\n').count() + 1;

        let body = doc.trim();
        let body = body.strip_suffix("\n...").unwrap_or(body);
        if body.is_empty() || body == "..." {
            doc_start = next_start;
            continue;
        }

        match serde_yaml::from_str::<Step>(body) {
            Ok(step) => {
                for action in actions(step.action) {
                    if let Some(d) = to_directive(action, first_line) {
                        directives.push(d);
                    }
                }
            }
            Err(e) => debug!(line = first_line, error = %e, "skipping unparsable YAML document"),
        }
        doc_start = next_start;
    }

    directives
}

fn actions(value: Option<serde_yaml::Value>) -> Vec<Action> {
    match value {
        Some(serde_yaml::Value::Sequence(items)) => items
            .into_iter()
            .filter_map(|item| serde_yaml::from_value(item).ok())
            .collect(),
        Some(item @ serde_yaml::Value::Mapping(_)) => {
            serde_yaml::from_value(item).into_iter().collect()
        }
        _ => Vec::new(),
    }
}

fn to_directive(action: Action, line_num: usize) -> Option<Directive> {
    let language = action.language.trim();
    let code = action.code.trim();
    if language.is_empty() || code.is_empty() {
        return None;
    }
    let mut d = Directive::new(DirectiveType::YamlCodeBlock, language.to_string(), line_num);
    d.options.insert("language".to_string(), language.to_string());
    d.content = code.to_string();
    Some(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_list_and_single_mapping() {
        let content = r#"title: Download
stepnum: 1
ref: download
action:
  - pre: "Download the archive:"
    language: sh
    code: |
      curl -O https://example.com/mongodb.tgz
  - pre: "Extract it:"
    language: sh
    code: tar -zxvf mongodb.tgz
---
title: Connect
stepnum: 2
ref: connect
action:
  language: javascript
  code: db.test.find()
...
"#;
        let directives = parse(content);
        assert_eq!(directives.len(), 3);
        assert_eq!(directives[0].argument, "sh");
        assert_eq!(directives[0].content, "curl -O https://example.com/mongodb.tgz");
        assert_eq!(directives[0].line_num, 1);
        assert_eq!(directives[2].argument, "javascript");
        assert_eq!(directives[2].options.get("language").map(String::as_str), Some("javascript"));
        assert_eq!(directives[2].line_num, 13);
    }

    #[test]
    fn actions_without_code_or_language_skipped() {
        let content = "action:\n  - pre: Just prose\n  - language: python\n  - code: print(1)\n";
        assert!(parse(content).is_empty());
    }

    #[test]
    fn unparsable_documents_skipped() {
        let content = "action: [unclosed\n---\naction:\n  language: go\n  code: fmt.Println()\n";
        let directives = parse(content);
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].argument, "go");
        assert_eq!(directives[0].line_num, 3);
    }

    #[test]
    fn yaml_extension_detection() {
        assert!(is_yaml_path(Path::new("includes/steps-install.yaml")));
        assert!(is_yaml_path(Path::new("a.YML")));
        assert!(!is_yaml_path(Path::new("index.rst")));
    }
}
