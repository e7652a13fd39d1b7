//! JSON renderer — structured output for tooling integration.
//!
//! Serializes the reports directly. Per-example rows appear only when the
//! reports were built with details.

use crate::report::{PageReport, Renderer};
use anyhow::{Context, Result};

pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, reports: &[PageReport]) -> Result<String> {
        let mut out = serde_json::to_string_pretty(reports).context("failed to serialize reports")?;
        out.push('\n');
        Ok(out)
    }
}
