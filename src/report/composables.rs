//! Text output for the composables analysis.

use crate::composables::{unused, Analysis, ComposableGroup, ComposableLocation, ComposableUsage};
use crate::rstspec::{Composable, ComposableOption};
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct TextOptions {
    /// Identical and similar groups.
    pub candidates: bool,
    /// Option titles and usage file paths.
    pub details: bool,
}

pub fn render_text(
    analysis: &Analysis,
    usages: Option<&[ComposableUsage]>,
    options: TextOptions,
) -> Result<String> {
    let mut out = String::new();
    write_report(&mut out, analysis, usages, options)?;
    Ok(out)
}

fn heading(out: &mut String, title: &str, underline: char) -> std::fmt::Result {
    writeln!(out, "{title}")?;
    writeln!(out, "{}", underline.to_string().repeat(title.chars().count()))?;
    writeln!(out)
}

fn write_report(
    out: &mut String,
    analysis: &Analysis,
    usages: Option<&[ComposableUsage]>,
    options: TextOptions,
) -> std::fmt::Result {
    heading(out, "Composables Analysis", '=')?;
    if analysis.composables.is_empty() {
        return writeln!(out, "No composables found.");
    }
    writeln!(out, "Total composable definitions found: {}", analysis.composables.len())?;
    writeln!(out)?;

    let mut by_id: BTreeMap<&str, usize> = BTreeMap::new();
    for loc in &analysis.composables {
        *by_id.entry(loc.composable.id.as_str()).or_default() += 1;
    }
    writeln!(out, "Composables by ID:")?;
    for (id, count) in &by_id {
        let note = if *count > 1 { " (multiple instances)" } else { "" };
        writeln!(out, "  - {id}: {count}{note}")?;
    }

    if options.candidates {
        if !analysis.identical.is_empty() {
            writeln!(out)?;
            heading(out, "Identical Composables (Consolidation Candidates)", '=')?;
            for (i, group) in analysis.identical.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                write_identical(out, group, options.details)?;
            }
        }
        if !analysis.similar.is_empty() {
            writeln!(out)?;
            heading(out, "Similar Composables (Review Recommended)", '=')?;
            for (i, group) in analysis.similar.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                write_similar(out, group, options.details)?;
            }
        }
    }

    if let Some(usages) = usages {
        writeln!(out)?;
        heading(out, "Composable Usages", '=')?;
        write_usages(out, &analysis.composables, usages, options.details)?;
    }

    writeln!(out)?;
    heading(out, "All Composables", '=')?;
    write_table(out, &analysis.composables)
}

fn option_ids(c: &Composable) -> String {
    c.options.iter().map(|o| o.id.as_str()).collect::<Vec<_>>().join(", ")
}

fn write_options(out: &mut String, options: &[ComposableOption], indent: &str) -> std::fmt::Result {
    for o in options {
        writeln!(out, "{indent}- {}: {}", o.id, o.title)?;
    }
    Ok(())
}

fn write_identical(out: &mut String, group: &ComposableGroup, details: bool) -> std::fmt::Result {
    let Some(first) = group.locations.first() else {
        return Ok(());
    };
    let c = &first.composable;
    writeln!(out, "ID: {}", group.id)?;
    writeln!(out, "Occurrences: {}", group.locations.len())?;
    writeln!(out, "Title: {}", c.title)?;
    writeln!(out, "Default: {}", c.default)?;
    if details {
        writeln!(out, "Options:")?;
        write_options(out, &c.options, "  ")?;
    } else {
        writeln!(out, "Options: {}", option_ids(c))?;
    }
    writeln!(out, "Found in:")?;
    for loc in &group.locations {
        writeln!(out, "  - {} ({})", loc.label(), loc.source.as_str())?;
    }
    Ok(())
}

fn write_similar(out: &mut String, group: &ComposableGroup, details: bool) -> std::fmt::Result {
    writeln!(out, "Group: {:.1}% similarity", group.similarity * 100.0)?;
    for (i, loc) in group.locations.iter().enumerate() {
        let c = &loc.composable;
        writeln!(out, "  {}. ID: {}", i + 1, c.id)?;
        writeln!(out, "     Location: {} ({})", loc.label(), loc.source.as_str())?;
        writeln!(out, "     Title: {}", c.title)?;
        if !c.default.is_empty() {
            writeln!(out, "     Default: {}", c.default)?;
        }
        if details {
            writeln!(out, "     Options:")?;
            write_options(out, &c.options, "       ")?;
        } else {
            writeln!(out, "     Options: {}", option_ids(c))?;
        }
    }
    if details {
        let common = common_options(&group.locations);
        if !common.is_empty() {
            writeln!(out, "  Common options:")?;
            write_options(out, &common, "    ")?;
        }
    }
    Ok(())
}

/// Options (by id) present in every member, sorted by id.
fn common_options(locations: &[ComposableLocation]) -> Vec<ComposableOption> {
    let Some((first, rest)) = locations.split_first() else {
        return Vec::new();
    };
    let mut common: BTreeMap<&str, &ComposableOption> =
        first.composable.options.iter().map(|o| (o.id.as_str(), o)).collect();
    for loc in rest {
        let ids: BTreeSet<&str> = loc.composable.options.iter().map(|o| o.id.as_str()).collect();
        common.retain(|id, _| ids.contains(id));
    }
    common.into_values().cloned().collect()
}

fn write_usages(
    out: &mut String,
    composables: &[ComposableLocation],
    usages: &[ComposableUsage],
    details: bool,
) -> std::fmt::Result {
    let pages: BTreeSet<&str> = usages.iter().flat_map(|u| u.files.iter().map(String::as_str)).collect();
    writeln!(out, "Total unique pages using composables: {}", pages.len())?;

    let mut by_id: BTreeMap<&str, Vec<&ComposableUsage>> = BTreeMap::new();
    for usage in usages {
        by_id.entry(usage.composable_id.as_str()).or_default().push(usage);
    }
    for (id, list) in &by_id {
        let total: usize = list.iter().map(|u| u.count()).sum();
        writeln!(out)?;
        writeln!(out, "{id}: {total} usages")?;
        for usage in list {
            let label = match &usage.version {
                Some(v) => format!("{}/{}", usage.project, v),
                None => usage.project.clone(),
            };
            writeln!(out, "  {label}: {}", usage.count())?;
            if details {
                for file in &usage.files {
                    writeln!(out, "    - {file}")?;
                }
            }
        }
    }

    let unused = unused(composables, usages);
    if unused.is_empty() {
        return Ok(());
    }
    let mut by_id: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for loc in unused {
        by_id.entry(loc.composable.id.as_str()).or_default().push(loc.label());
    }
    writeln!(out)?;
    writeln!(out, "Unused composables:")?;
    for (id, labels) in by_id {
        writeln!(out, "  {id}:")?;
        for label in labels {
            writeln!(out, "    - {label}")?;
        }
    }
    Ok(())
}

fn write_table(out: &mut String, composables: &[ComposableLocation]) -> std::fmt::Result {
    let mut rows: Vec<&ComposableLocation> = composables.iter().collect();
    rows.sort_by(|a, b| {
        (&a.project, &a.version, &a.composable.id).cmp(&(&b.project, &b.version, &b.composable.id))
    });

    writeln!(
        out,
        "{:<20} {:<15} {:<13} {:<24} {:<24} Options",
        "Project", "Version", "Source", "ID", "Title"
    )?;
    writeln!(out, "{}", "-".repeat(110))?;
    for loc in rows {
        let c = &loc.composable;
        writeln!(
            out,
            "{:<20} {:<15} {:<13} {:<24} {:<24} {}",
            truncate(&loc.project, 20),
            truncate(loc.version.as_deref().unwrap_or("(none)"), 15),
            loc.source.as_str(),
            truncate(&c.id, 24),
            truncate(&c.title, 24),
            option_ids(c)
        )?;
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
