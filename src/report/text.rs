//! Human-readable summary, one section per page.

use crate::report::{PageReport, ProductStats, Renderer};
use anyhow::Result;
use std::fmt::Write;

pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&self, reports: &[PageReport]) -> Result<String> {
        let mut out = String::new();
        for (i, report) in reports.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            render_page(&mut out, report)?;
        }
        Ok(out)
    }
}

fn render_page(out: &mut String, report: &PageReport) -> std::fmt::Result {
    writeln!(out, "Page: {}", report.source_path.display())?;
    if !report.content_dir.is_empty() {
        writeln!(out, "Content directory: {}", report.content_dir)?;
    }
    if let Some(ref error) = report.error {
        writeln!(out, "Error: {error}")?;
        return Ok(());
    }

    let t = &report.totals;
    writeln!(out, "Code examples: {}", t.total)?;
    writeln!(out, "  input: {}  output: {}", t.input, t.output)?;
    writeln!(
        out,
        "  tested: {}  testable: {}  maybe testable: {}",
        t.tested, t.testable, t.maybe_testable
    )?;
    if report.by_product.is_empty() {
        return Ok(());
    }

    let width = report
        .by_product
        .keys()
        .map(|p| p.chars().count())
        .max()
        .unwrap_or(0)
        .max("Product".len());
    writeln!(out)?;
    writeln!(
        out,
        "  {:<width$}  {:>5}  {:>6}  {:>8}  {:>5}",
        "Product", "Total", "Tested", "Testable", "Maybe"
    )?;
    for (product, stats) in &report.by_product {
        write_row(out, product, stats, width)?;
    }
    Ok(())
}

fn write_row(out: &mut String, product: &str, s: &ProductStats, width: usize) -> std::fmt::Result {
    writeln!(
        out,
        "  {:<width$}  {:>5}  {:>6}  {:>8}  {:>5}",
        product, s.total, s.tested, s.testable, s.maybe_testable
    )
}
