//! rst-audit — find and classify code examples in reStructuredText docs.
//!
//! | Module | Role |
//! |--------|------|
//! | [`rst`] | directive scanner, YAML steps, include resolution |
//! | [`context`] | tab / selected-content intervals and per-line context |
//! | [`collect`] | recursive include walk, page analysis |
//! | [`classify`] | product and testability policy |
//! | [`mappings`] | selector tables, per-project overrides |
//! | [`rstspec`] / [`project`] | canonical and per-project option sources |
//! | [`report`] | aggregation and output formats |
//! | [`tested`] | tested-example file counts |
//! | [`composables`] | composable definitions and usages across projects |

pub mod classify;
pub mod collect;
pub mod composables;
pub mod config;
pub mod context;
pub mod language;
pub mod mappings;
pub mod project;
pub mod report;
pub mod rst;
pub mod rstspec;
pub mod tested;

pub use collect::{analyze_file, classify_file, CodeExample, PageAnalysis};
pub use context::CodeContext;
pub use mappings::{merge_project_mappings, ProductMappings};
