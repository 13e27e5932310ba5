//! Subcommand implementations.
//!
//! Each command returns plain data; printing is left to `main`.

use std::collections::BTreeSet;
use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use chad_core::{BuildOptions, BuildSummary, PipelineConfig, build};
use chad_ingest::{ConsolidatedCategory, available_categories, consolidate};
use tracing::info_span;

use crate::cli::{BuildArgs, CategoriesArgs, ConfigArgs, ConsolidateArgs};

/// One line of the category listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRow {
    pub category: String,
    /// Destination table, or `status` for the status sources.
    pub destination: String,
    pub shape: &'static str,
    /// Whether the category file exists; `None` when no directory was given.
    pub present: Option<bool>,
}

pub fn load_config(args: &ConfigArgs) -> Result<PipelineConfig> {
    let schema = args.schema.map(Into::into);
    let config = PipelineConfig::load(schema, args.config.as_deref());
    match &args.config {
        Some(path) => config.with_context(|| format!("load pipeline config {}", path.display())),
        None => config.context("load built-in pipeline config"),
    }
}

fn configure_threads(threads: Option<usize>) -> Result<()> {
    let Some(threads) = threads else {
        return Ok(());
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("configure worker threads")
}

pub fn run_build(args: &BuildArgs) -> Result<BuildSummary> {
    configure_threads(args.threads)?;
    let config = load_config(&args.config)?;
    let options = BuildOptions {
        overwrite: args.overwrite,
        show_progress: !args.no_progress && io::stderr().is_terminal(),
    };
    build(&config, &args.data_dir, &args.database, options).with_context(|| {
        format!(
            "build {} from {}",
            args.database.display(),
            args.data_dir.display()
        )
    })
}

pub fn run_consolidate(args: &ConsolidateArgs) -> Result<Vec<ConsolidatedCategory>> {
    let _span = info_span!("consolidate", read_dir = %args.read_dir.display()).entered();
    consolidate(&args.read_dir, &args.write_dir)
        .with_context(|| format!("consolidate {}", args.read_dir.display()))
}

pub fn run_categories(args: &CategoriesArgs) -> Result<Vec<CategoryRow>> {
    let config = load_config(&args.config)?;
    let available: Option<BTreeSet<String>> = match &args.data_dir {
        Some(dir) => Some(
            available_categories(dir)
                .with_context(|| format!("list categories in {}", dir.display()))?,
        ),
        None => None,
    };
    Ok(category_rows(&config, available.as_ref()))
}

/// Categories in population order, followed by the status sources not
/// already listed.
pub fn category_rows(
    config: &PipelineConfig,
    available: Option<&BTreeSet<String>>,
) -> Vec<CategoryRow> {
    let present = |category: &str| available.map(|set| set.contains(category));
    let mut tables: Vec<_> = config.tables.iter().collect();
    tables.sort_by_key(|rule| rule.table.population_rank());

    let mut rows = Vec::new();
    let mut seen = BTreeSet::new();
    for rule in tables {
        for category in &rule.categories {
            seen.insert(category.as_str());
            rows.push(CategoryRow {
                category: category.clone(),
                destination: rule.table.to_string(),
                shape: rule.shape.label(),
                present: present(category),
            });
        }
    }
    for category in config.status.categories() {
        if seen.insert(category) {
            rows.push(CategoryRow {
                category: category.to_string(),
                destination: "status".to_string(),
                shape: "-",
                present: present(category),
            });
        }
    }
    rows
}
