//! Page reports and trait-based output format dispatch.

pub mod composables;
pub mod csv;
pub mod json;
pub mod text;

use crate::collect::{CodeExample, PageAnalysis};
use crate::language;
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Counts for one product on one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductStats {
    pub total: usize,
    pub input: usize,
    pub output: usize,
    pub tested: usize,
    pub testable: usize,
    pub maybe_testable: usize,
}

impl ProductStats {
    fn add(&mut self, example: &CodeExample) {
        self.total += 1;
        self.input += usize::from(example.is_input);
        self.output += usize::from(example.is_output);
        self.tested += usize::from(example.is_tested);
        self.testable += usize::from(example.is_testable);
        self.maybe_testable += usize::from(example.is_maybe_testable);
    }
}

/// Aggregated results for one entry page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageReport {
    pub source_path: PathBuf,
    pub content_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub totals: ProductStats,
    pub by_product: BTreeMap<String, ProductStats>,
    /// Example counts keyed by normalized language name.
    pub by_language: BTreeMap<String, usize>,
    /// Per-example rows, kept only for detailed output.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<CodeExample>,
}

impl PageReport {
    pub fn from_analysis(analysis: PageAnalysis, details: bool) -> Self {
        let mut report = PageReport {
            source_path: analysis.source_path,
            content_dir: analysis.content_dir,
            ..Default::default()
        };
        for example in &analysis.examples {
            report.totals.add(example);
            report
                .by_product
                .entry(example.product.clone())
                .or_default()
                .add(example);
            *report
                .by_language
                .entry(language::normalize(&example.language))
                .or_default() += 1;
        }
        if details {
            report.examples = analysis.examples;
        }
        report
    }

    /// Report for a page that could not be analyzed.
    pub fn failed(source_path: PathBuf, content_dir: String, error: String) -> Self {
        PageReport {
            source_path,
            content_dir,
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Trait for rendering page reports into a specific output format.
pub trait Renderer {
    fn render(&self, reports: &[PageReport]) -> Result<String>;
}

/// Create a renderer for the given format name.
pub fn create_renderer(format: &str, details: bool) -> Result<Box<dyn Renderer>> {
    match format {
        "text" | "txt" => Ok(Box::new(text::TextRenderer)),
        "json" => Ok(Box::new(json::JsonRenderer)),
        "csv" => Ok(Box::new(csv::CsvRenderer { details })),
        _ => Err(anyhow!("unknown format: {}. Use text, json, or csv", format)),
    }
}
