//! Language identifiers and their product display names.
//!
//! Two small fixed vocabularies drive classification:
//!
//! | Set | Members | Effect |
//! |-----|---------|--------|
//! | non-driver | markup, config, shell-adjacent | never inherit tab/composable context |
//! | shell-ambiguous | `shell`, `javascript`, `js` | may be the shell product, depending on context |

use std::path::Path;

/// Sentinel for a directive whose language could not be determined.
pub const UNDEFINED: &str = "undefined";

/// Languages that commonly appear inside driver sections without being
/// driver code (install commands, config files, query output).
const NON_DRIVER_LANGUAGES: &[&str] = &[
    "bash",
    "sh",
    "console",
    "text",
    "json",
    "yaml",
    "xml",
    "ini",
    "toml",
    "properties",
    "sql",
    "none",
    "http",
];

/// Languages that are the shell product inside a shell context and
/// something more generic outside it.
const SHELL_AMBIGUOUS_LANGUAGES: &[&str] = &["shell", "javascript", "js"];

/// The bare form that becomes the non-testable "Shell" product outside a
/// shell context. `javascript`/`js` fall through to driver resolution.
pub const BARE_SHELL: &str = "shell";

fn fold(language: &str) -> String {
    language.trim().to_lowercase()
}

/// True if `language` must bypass inherited context.
pub fn is_non_driver(language: &str) -> bool {
    NON_DRIVER_LANGUAGES.contains(&fold(language).as_str())
}

/// True if `language` could be shell-product code.
pub fn is_shell_ambiguous(language: &str) -> bool {
    SHELL_AMBIGUOUS_LANGUAGES.contains(&fold(language).as_str())
}

/// Infer a language from a file path's extension. Returns `None` for
/// unknown or missing extensions.
pub fn from_extension(path: &str) -> Option<&'static str> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase();
    let lang = match ext.as_str() {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "go" => "go",
        "java" => "java",
        "cs" => "csharp",
        "cpp" => "cpp",
        "c" => "c",
        "rb" => "ruby",
        "rs" => "rust",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "sh" | "bash" => "shell",
        "ps1" => "powershell",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "xml" => "xml",
        "html" => "html",
        "css" => "css",
        "sql" => "sql",
        "txt" => "text",
        "php" => "php",
        _ => return None,
    };
    Some(lang)
}

/// Fold a language alias to its canonical name (`ts` → `typescript`,
/// `golang` → `go`). Unknown values are returned lowercased.
pub fn normalize(language: &str) -> String {
    let lang = fold(language);
    let canonical = match lang.as_str() {
        "c++" => "cpp",
        "c#" | "cs" => "csharp",
        "golang" => "go",
        "js" => "javascript",
        "kt" => "kotlin",
        "py" => "python",
        "rb" => "ruby",
        "rs" => "rust",
        "sh" => "shell",
        "ts" => "typescript",
        "txt" => "text",
        "ps1" => "powershell",
        "yml" => "yaml",
        "" | "none" => UNDEFINED,
        _ => return lang,
    };
    canonical.to_string()
}

/// Display name for a raw language value, if one is known.
pub fn display_name(language: &str) -> Option<&'static str> {
    let name = match fold(language).as_str() {
        "python" => "Python",
        "javascript" | "js" => "JavaScript",
        "typescript" | "ts" => "TypeScript",
        "go" | "golang" => "Go",
        "java" => "Java",
        "csharp" | "c#" | "cs" => "C#",
        "cpp" | "c++" => "C++",
        "c" => "C",
        "ruby" | "rb" => "Ruby",
        "rust" | "rs" => "Rust",
        "swift" => "Swift",
        "kotlin" | "kt" => "Kotlin",
        "scala" => "Scala",
        "php" => "PHP",
        "mongosh" => "MongoDB Shell",
        "bash" | "sh" | "shell" | "console" => "Shell",
        "powershell" | "ps1" => "PowerShell",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "xml" => "XML",
        "html" => "HTML",
        "css" => "CSS",
        "sql" => "SQL",
        "ini" => "INI",
        "toml" => "TOML",
        "properties" => "Properties",
        "text" | "txt" | "none" => "Text",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_inference() {
        assert_eq!(from_extension("/code/tested/insert.py"), Some("python"));
        assert_eq!(from_extension("Example.JAVA"), Some("java"));
        assert_eq!(from_extension("run.bash"), Some("shell"));
        assert_eq!(from_extension("config.yml"), Some("yaml"));
        assert_eq!(from_extension("file.xyz"), None);
        assert_eq!(from_extension("Makefile"), None);
    }

    #[test]
    fn normalize_aliases() {
        assert_eq!(normalize("ts"), "typescript");
        assert_eq!(normalize(" Golang "), "go");
        assert_eq!(normalize("c++"), "cpp");
        assert_eq!(normalize("none"), UNDEFINED);
        assert_eq!(normalize("haskell"), "haskell");
    }

    #[test]
    fn non_driver_membership() {
        assert!(is_non_driver("json"));
        assert!(is_non_driver("BASH"));
        assert!(!is_non_driver("shell"));
        assert!(!is_non_driver("python"));
    }

    #[test]
    fn shell_ambiguous_membership() {
        assert!(is_shell_ambiguous("shell"));
        assert!(is_shell_ambiguous("JS"));
        assert!(!is_shell_ambiguous("sh"));
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name("py"), None);
        assert_eq!(display_name("python"), Some("Python"));
        assert_eq!(display_name("sh"), Some("Shell"));
        assert_eq!(display_name("none"), Some("Text"));
        assert_eq!(display_name("brainfuck"), None);
    }
}
