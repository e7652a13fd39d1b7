//! rst-audit — report which documentation code examples are tested.
//!
//! `rst-audit -r ~/docs content/golang/current/source/**/*.txt -f csv`
//! `rst-audit count-tested ~/docs --count-by-product`
//! `rst-audit composables ~/docs --current-only --find-consolidation-candidates`

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rst_audit::collect::content_dir_from_path;
use rst_audit::composables::{self, rstspec_composables, Filter};
use rst_audit::config::{self, MONOREPO_PATH_ENV};
use rst_audit::report::{self, composables::TextOptions, PageReport};
use rst_audit::rstspec::{LocalSpec, MappingSource, RemoteSpec};
use rst_audit::tested;
use rst_audit::{analyze_file, ProductMappings};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Extensions picked up when a directory is given as input.
const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "rst", "yaml", "yml"];

const LOG_ENV: &str = "RST_AUDIT_LOG";

#[derive(Parser)]
#[command(
    name = "rst-audit",
    about = "Classify code examples in reStructuredText documentation by product and testability",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Documentation source files (glob patterns and directories supported)
    files: Vec<String>,

    /// Documentation monorepo root. Relative inputs are resolved against it
    #[arg(short = 'r', long, env = MONOREPO_PATH_ENV)]
    root: Option<PathBuf>,

    /// Content directory for every input (default: derived from each path)
    #[arg(long)]
    content_dir: Option<String>,

    /// Local rstspec.toml to use instead of the remote canonical copy
    #[arg(long)]
    rstspec: Option<PathBuf>,

    /// Never fetch rstspec.toml; use the cached copy regardless of age
    #[arg(long)]
    no_fetch: bool,

    /// Output format: text (default), json, csv
    #[arg(short = 'f', long, default_value = "text")]
    format: String,

    /// Include one entry per code example (json, csv)
    #[arg(long)]
    details: bool,

    /// Write output to a file instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Debug logging on stderr (overridden by RST_AUDIT_LOG)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Count files in the tested code examples tree
    CountTested(CountTestedArgs),
    /// Analyze composable definitions across project manifests
    Composables(ComposablesArgs),
}

#[derive(Args)]
struct CountTestedArgs {
    /// Documentation monorepo root (default: from config file)
    #[arg(env = MONOREPO_PATH_ENV)]
    root: Option<PathBuf>,

    /// Count only one product (e.g. pymongo, nodejs, mongosh)
    #[arg(long, conflicts_with = "count_by_product")]
    for_product: Option<String>,

    /// Break the total down by product
    #[arg(long)]
    count_by_product: bool,

    /// Skip expected-output (.txt) and script (.sh) files
    #[arg(long)]
    exclude_output: bool,

    /// Output format: text (default), json
    #[arg(short = 'f', long, default_value = "text")]
    format: String,
}

#[derive(Args)]
struct ComposablesArgs {
    /// Documentation monorepo root (default: from config file)
    #[arg(env = MONOREPO_PATH_ENV)]
    root: Option<PathBuf>,

    /// Only this project
    #[arg(long)]
    for_project: Option<String>,

    /// Only unversioned projects and the current version
    #[arg(long)]
    current_only: bool,

    /// Show option titles and usage file paths
    #[arg(long)]
    details: bool,

    /// Report identical and similar composables
    #[arg(long)]
    find_consolidation_candidates: bool,

    /// Report which pages use each composable
    #[arg(long)]
    find_usages: bool,

    /// Include the canonical rstspec.toml composables
    #[arg(long)]
    with_rstspec: bool,

    /// Local rstspec.toml to use instead of the remote canonical copy
    #[arg(long)]
    rstspec: Option<PathBuf>,

    /// Never fetch rstspec.toml; use the cached copy regardless of age
    #[arg(long)]
    no_fetch: bool,

    /// Output format: text (default), json
    #[arg(short = 'f', long, default_value = "text")]
    format: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Some(Command::CountTested(args)) => count_tested(args),
        Some(Command::Composables(args)) => analyze_composables(args),
        None => audit(&cli),
    }
}

fn audit(cli: &Cli) -> Result<()> {
    if cli.files.is_empty() {
        anyhow::bail!("no input files; pass documentation sources or a subcommand (see --help)");
    }
    let renderer = report::create_renderer(&cli.format, cli.details)?;
    let root = config::resolve_root(cli.root.as_deref(), &config::default_search_dirs())?;
    let inputs = expand_inputs(&cli.files, root.as_deref())?;
    if inputs.is_empty() {
        anyhow::bail!("no input files");
    }

    let base = load_mappings(cli).context("failed to load product mappings")?;

    let mut reports = Vec::with_capacity(inputs.len());
    let mut failures = 0;
    for path in &inputs {
        match analyze_file(path, cli.content_dir.as_deref(), &base) {
            Ok(analysis) => reports.push(PageReport::from_analysis(analysis, cli.details)),
            Err(e) => {
                eprintln!("warning: skipping {}: {:#}", path.display(), e);
                failures += 1;
                reports.push(PageReport::failed(
                    path.clone(),
                    cli.content_dir
                        .clone()
                        .or_else(|| content_dir_from_path(path))
                        .unwrap_or_default(),
                    format!("{e:#}"),
                ));
            }
        }
    }

    let rendered = renderer.render(&reports)?;
    match &cli.output {
        Some(out) => fs::write(out, rendered)
            .with_context(|| format!("failed to write {}", out.display()))?,
        None => print!("{rendered}"),
    }

    if failures == inputs.len() {
        anyhow::bail!("all {} input file(s) failed", failures);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn spec_source(rstspec: Option<&Path>, no_fetch: bool) -> Box<dyn MappingSource> {
    match rstspec {
        Some(path) => Box::new(LocalSpec(path.to_path_buf())),
        None => Box::new(RemoteSpec {
            offline: no_fetch,
            ..Default::default()
        }),
    }
}

fn load_mappings(cli: &Cli) -> Result<ProductMappings> {
    spec_source(cli.rstspec.as_deref(), cli.no_fetch).load()
}

/// Subcommand root: the positional (or its env var), else the config file.
fn required_root(explicit: Option<&Path>) -> Result<PathBuf> {
    config::resolve_root(explicit, &config::default_search_dirs())?.ok_or_else(|| {
        anyhow::anyhow!(
            "no monorepo root: pass ROOT, set {MONOREPO_PATH_ENV}, or add monorepo_path to {}",
            config::CONFIG_FILE_NAME
        )
    })
}

fn count_tested(args: &CountTestedArgs) -> Result<()> {
    let root = required_root(args.root.as_deref())?;
    let counts = tested::count_tested(&root, args.for_product.as_deref(), args.exclude_output)?;
    match args.format.as_str() {
        "text" => print!(
            "{}",
            tested::render_text(&counts, args.for_product.as_deref(), args.count_by_product)
        ),
        "json" => println!("{}", serde_json::to_string_pretty(&counts)?),
        other => anyhow::bail!("unknown format: {} (supported: text, json)", other),
    }
    Ok(())
}

fn analyze_composables(args: &ComposablesArgs) -> Result<()> {
    anyhow::ensure!(
        matches!(args.format.as_str(), "text" | "json"),
        "unknown format: {} (supported: text, json)",
        args.format
    );
    let root = required_root(args.root.as_deref())?;
    let filter = Filter {
        project: args.for_project.as_deref(),
        current_only: args.current_only,
    };

    let mut found = composables::find_composables(&root, filter)?;
    if args.with_rstspec {
        let source = spec_source(args.rstspec.as_deref(), args.no_fetch);
        let spec = source.spec().context("failed to load rstspec.toml")?;
        found.extend(rstspec_composables(&spec, &source.origin()));
    }
    let analysis = composables::analyze(found);
    let usages = if args.find_usages {
        Some(composables::find_usages(&root, filter)?)
    } else {
        None
    };

    if args.format == "json" {
        let mut value = serde_json::json!({ "composables": &analysis.composables });
        if args.find_consolidation_candidates {
            value["identical"] = serde_json::to_value(&analysis.identical)?;
            value["similar"] = serde_json::to_value(&analysis.similar)?;
        }
        if let Some(usages) = &usages {
            value["usages"] = serde_json::to_value(usages)?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let options = TextOptions {
        candidates: args.find_consolidation_candidates,
        details: args.details,
    };
    print!(
        "{}",
        report::composables::render_text(&analysis, usages.as_deref(), options)?
    );
    Ok(())
}

/// Expand input arguments to files. Existing paths resolve against the root
/// first; anything else is treated as a glob, rooted first as well.
fn expand_inputs(patterns: &[String], root: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        if let Ok(path) = config::resolve_input(Path::new(pattern), root) {
            if path.is_dir() {
                // Non-recursive; use a glob for deeper trees
                let entries = fs::read_dir(&path)
                    .with_context(|| format!("failed to read directory: {}", path.display()))?;
                for entry in entries.flatten() {
                    let p = entry.path();
                    if p.is_file() && has_supported_extension(&p) {
                        files.push(p);
                    }
                }
            } else {
                files.push(path);
            }
            continue;
        }

        let mut candidates = Vec::new();
        if let Some(root) = root.filter(|_| Path::new(pattern).is_relative()) {
            candidates.push(root.join(pattern).to_string_lossy().into_owned());
        }
        candidates.push(pattern.clone());

        let mut matched = false;
        for candidate in &candidates {
            let matches: Vec<_> = glob::glob(candidate)
                .with_context(|| format!("invalid glob pattern: {}", pattern))?
                .filter_map(|r| r.ok())
                .filter(|p| p.is_file())
                .collect();
            if !matches.is_empty() {
                files.extend(matches);
                matched = true;
                break;
            }
        }
        if !matched {
            eprintln!("warning: no files matched: {}", pattern);
        }
    }
    // Sort for deterministic output
    files.sort();
    files.dedup();
    Ok(files)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
}
