//! Product and testability classification.
//!
//! Decision order for a single example:
//!
//! | Step | Condition | Product |
//! |------|-----------|---------|
//! | 1 | non-driver language (`json`, `bash`, ...) | language display name |
//! | 2 | `shell`/`js` in a shell context | MongoDB Shell |
//! | 3 | bare `shell` elsewhere | Shell |
//! | 4 | a context selector with a mapping | mapped title |
//! | 5 | known content directory | directory's product |
//! | 6 | known language | language display name |
//! | 7 | anything else | raw language, or Unknown |

use crate::context::CodeContext;
use crate::language;
use crate::mappings::ProductMappings;
use std::collections::HashMap;

pub const UNKNOWN_PRODUCT: &str = "Unknown";
pub const SHELL_PRODUCT: &str = "MongoDB Shell";
const GENERIC_SHELL_PRODUCT: &str = "Shell";
const SHELL_CONTENT_DIR: &str = "mongodb-shell";
const SHELL_INTERFACE: &str = "mongosh";
const TESTED_PATH_MARKER: &str = "/tested/";

/// Products with automated test suites.
const TESTABLE_PRODUCTS: &[&str] = &[
    "C#",
    "csharp",
    "Go",
    "go",
    "Java",
    "Java (Sync)",
    "java",
    "java-sync",
    "Node.js",
    "nodejs",
    "Python",
    "python",
    "MongoDB Shell",
    "mongosh",
];

/// Products that might be testable once a human resolves the ambiguity.
const MAYBE_TESTABLE_PRODUCTS: &[&str] = &["JavaScript", "Shell"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub product: String,
    pub is_testable: bool,
    pub is_maybe_testable: bool,
}

pub fn is_testable(product: &str) -> bool {
    TESTABLE_PRODUCTS.contains(&product)
}

pub fn is_maybe_testable(product: &str) -> bool {
    MAYBE_TESTABLE_PRODUCTS.contains(&product)
}

/// True if the referenced file lives under a `tested` directory.
pub fn is_tested_path(path: &str) -> bool {
    path.contains(TESTED_PATH_MARKER)
}

/// Product for a documentation content directory.
pub fn product_for_content_dir(content_dir: &str) -> Option<&'static str> {
    let product = match content_dir {
        "c-driver" => "C",
        "cpp-driver" => "C++",
        "csharp" => "C#",
        "golang" => "Go",
        "java" => "Java (Sync)",
        "java-rs" => "Java (Reactive Streams)",
        "kotlin" => "Kotlin (Coroutine)",
        "kotlin-sync" => "Kotlin (Sync)",
        "laravel-mongodb" => "Laravel",
        "mongodb-shell" => "MongoDB Shell",
        "node" => "Node.js",
        "php-library" => "PHP",
        "pymongo-arrow" => "PyMongo Arrow",
        "pymongo-driver" => "Python",
        "ruby-driver" => "Ruby",
        "rust" => "Rust",
        "scala-driver" => "Scala",
        "swift" => "Swift",
        _ => return None,
    };
    Some(product)
}

/// The page is shell documentation, or a context selected the shell
/// interface.
pub fn is_shell_context(content_dir: &str, contexts: &[CodeContext]) -> bool {
    content_dir == SHELL_CONTENT_DIR
        || contexts
            .iter()
            .any(|ctx| ctx.interface.as_deref() == Some(SHELL_INTERFACE))
}

fn product_from_contexts(contexts: &[CodeContext], mappings: &ProductMappings) -> Option<String> {
    contexts.iter().find_map(|ctx| {
        let lookup = |value: &Option<String>, table: &HashMap<String, String>| {
            value.as_ref().and_then(|v| table.get(v)).cloned()
        };
        lookup(&ctx.tab_id, &mappings.tab_id_to_product)
            .or_else(|| lookup(&ctx.language, &mappings.language_to_product))
            .or_else(|| lookup(&ctx.interface, &mappings.interface_to_product))
    })
}

fn is_undefined(language: &str) -> bool {
    let language = language.trim();
    language.is_empty() || language.eq_ignore_ascii_case(language::UNDEFINED)
}

/// Attribute an example to a product.
pub fn determine_product(
    language: &str,
    content_dir: &str,
    contexts: &[CodeContext],
    mappings: &ProductMappings,
) -> String {
    let language = language.trim();

    if !is_undefined(language) && language::is_non_driver(language) {
        return language::display_name(language)
            .map_or_else(|| language.to_string(), str::to_string);
    }

    if language::is_shell_ambiguous(language) {
        if is_shell_context(content_dir, contexts) {
            return SHELL_PRODUCT.to_string();
        }
        if language.eq_ignore_ascii_case(language::BARE_SHELL) {
            return GENERIC_SHELL_PRODUCT.to_string();
        }
    }

    if let Some(product) = product_from_contexts(contexts, mappings) {
        return product;
    }
    if let Some(product) = product_for_content_dir(content_dir) {
        return product.to_string();
    }
    if let Some(product) = language::display_name(language) {
        return product.to_string();
    }
    if is_undefined(language) {
        UNKNOWN_PRODUCT.to_string()
    } else {
        language.to_string()
    }
}

/// Product plus testability flags. Pure; no I/O.
pub fn classify(
    language: &str,
    content_dir: &str,
    contexts: &[CodeContext],
    mappings: &ProductMappings,
) -> Classification {
    let product = determine_product(language, content_dir, contexts, mappings);
    Classification {
        is_testable: is_testable(&product),
        is_maybe_testable: is_maybe_testable(&product),
        product,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings() -> ProductMappings {
        let mut m = ProductMappings::default();
        for (k, v) in [("nodejs", "Node.js"), ("java-sync", "Java (Sync)"), ("shell", "MongoDB Shell")] {
            m.tab_id_to_product.insert(k.into(), v.into());
        }
        for (k, v) in [("python", "Python"), ("go", "Go"), ("nodejs", "Node.js")] {
            m.language_to_product.insert(k.into(), v.into());
        }
        for (k, v) in [("driver", "Driver"), ("mongosh", "MongoDB Shell")] {
            m.interface_to_product.insert(k.into(), v.into());
        }
        m
    }

    #[test]
    fn non_driver_bypasses_context() {
        let ctx = [CodeContext::selection("python")];
        let c = classify("json", "pymongo-driver", &ctx, &mappings());
        assert_eq!(c.product, "JSON");
        assert!(!c.is_testable);
        assert_eq!(classify("bash", "", &ctx, &mappings()).product, "Shell");
    }

    #[test]
    fn shell_outside_shell_context() {
        let c = classify("shell", "golang", &[], &mappings());
        assert_eq!(c.product, "Shell");
        assert!(!c.is_testable);
        assert!(c.is_maybe_testable);
    }

    #[test]
    fn shell_inside_shell_context() {
        let c = classify("shell", SHELL_CONTENT_DIR, &[], &mappings());
        assert_eq!(c.product, SHELL_PRODUCT);
        assert!(c.is_testable);

        let ctx = [CodeContext {
            interface: Some("mongosh".into()),
            ..Default::default()
        }];
        let c = classify("javascript", "atlas", &ctx, &mappings());
        assert_eq!(c.product, SHELL_PRODUCT);
        assert!(c.is_testable);
    }

    #[test]
    fn javascript_falls_through_to_context() {
        let ctx = [CodeContext::tab("nodejs")];
        let c = classify("javascript", "", &ctx, &mappings());
        assert_eq!(c.product, "Node.js");
        assert!(c.is_testable);

        let c = classify("javascript", "", &[], &mappings());
        assert_eq!(c.product, "JavaScript");
        assert!(c.is_maybe_testable);
        assert!(!c.is_testable);
    }

    #[test]
    fn context_lookup_order() {
        let ctx = [CodeContext {
            tab_id: Some("java-sync".into()),
            language: Some("python".into()),
            interface: None,
        }];
        assert_eq!(determine_product("java", "", &ctx, &mappings()), "Java (Sync)");

        // Unmapped first context does not stop the search
        let ctx = [CodeContext::tab("unmapped"), CodeContext::selection("go")];
        assert_eq!(determine_product("undefined", "", &ctx, &mappings()), "Go");
    }

    #[test]
    fn content_dir_then_language_fallback() {
        assert_eq!(determine_product("undefined", "pymongo-driver", &[], &mappings()), "Python");
        assert_eq!(determine_product("kotlin", "", &[], &mappings()), "Kotlin");
        assert_eq!(determine_product("haskell", "", &[], &mappings()), "haskell");
        assert_eq!(determine_product("undefined", "", &[], &mappings()), UNKNOWN_PRODUCT);
        assert_eq!(determine_product("", "unknown-dir", &[], &mappings()), UNKNOWN_PRODUCT);
    }

    #[test]
    fn testable_and_maybe_are_disjoint() {
        for product in TESTABLE_PRODUCTS {
            assert!(!is_maybe_testable(product), "{product} in both lists");
        }
    }

    #[test]
    fn tested_paths() {
        assert!(is_tested_path("/code-examples/tested/python/insert.py"));
        assert!(!is_tested_path("/code-examples/untested/insert.py"));
        assert!(!is_tested_path(""));
    }
}
