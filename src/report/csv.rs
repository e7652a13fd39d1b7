//! CSV renderer — one row per page, or one row per example with details.

use crate::report::{PageReport, Renderer};
use anyhow::Result;

pub struct CsvRenderer {
    pub details: bool,
}

const SUMMARY_HEADER: &[&str] = &[
    "source_path",
    "content_dir",
    "total",
    "input",
    "output",
    "tested",
    "testable",
    "maybe_testable",
    "error",
];

const DETAIL_HEADER: &[&str] = &[
    "source_path",
    "source_file",
    "type",
    "language",
    "product",
    "is_input",
    "is_output",
    "is_tested",
    "is_testable",
    "is_maybe_testable",
    "file_path",
];

impl Renderer for CsvRenderer {
    fn render(&self, reports: &[PageReport]) -> Result<String> {
        let mut out = String::new();
        if self.details {
            push_row(&mut out, DETAIL_HEADER.iter().map(|h| h.to_string()));
            for report in reports {
                for e in &report.examples {
                    push_row(
                        &mut out,
                        [
                            report.source_path.display().to_string(),
                            e.source_file.display().to_string(),
                            e.kind.to_string(),
                            e.language.clone(),
                            e.product.clone(),
                            e.is_input.to_string(),
                            e.is_output.to_string(),
                            e.is_tested.to_string(),
                            e.is_testable.to_string(),
                            e.is_maybe_testable.to_string(),
                            e.file_path.clone(),
                        ],
                    );
                }
            }
        } else {
            push_row(&mut out, SUMMARY_HEADER.iter().map(|h| h.to_string()));
            for report in reports {
                let t = &report.totals;
                push_row(
                    &mut out,
                    [
                        report.source_path.display().to_string(),
                        report.content_dir.clone(),
                        t.total.to_string(),
                        t.input.to_string(),
                        t.output.to_string(),
                        t.tested.to_string(),
                        t.testable.to_string(),
                        t.maybe_testable.to_string(),
                        report.error.clone().unwrap_or_default(),
                    ],
                );
            }
        }
        Ok(out)
    }
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let row: Vec<String> = fields.into_iter().map(|f| escape(&f)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

/// Quote fields containing a comma, quote or line break; double the quotes.
pub fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
