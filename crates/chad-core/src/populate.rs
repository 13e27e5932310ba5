//! Database population.
//!
//! [`Populate`] checks that every configured category is present before
//! anything is written, then fills the tables in [`TableKind::POPULATION_ORDER`]
//! one category at a time, and finally builds the secondary indexes. Patient
//! status is derived from its two source categories before the patient table
//! is loaded.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chad_ingest::{IngestError, ensure_categories_present, read_category};
use chad_model::{SchemaVersion, TableKind};
use chad_store::{ChunkedLoader, Connection, create_database, create_indexes};
use chad_transform::{CompiledRule, StatusIndex, TransformContext};
use polars::prelude::DataFrame;
use tracing::{info, info_span};

use crate::config::PipelineConfig;
use crate::error::Result;

/// Options for a full build.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Replace an existing database file.
    pub overwrite: bool,
    /// Draw per-table progress bars.
    pub show_progress: bool,
}

/// Rows written to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub table: TableKind,
    pub categories: usize,
    pub source_rows: usize,
    pub rows: usize,
    pub batches: usize,
}

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub database: PathBuf,
    pub schema: SchemaVersion,
    pub tables: Vec<TableSummary>,
    pub indexes: usize,
    pub patients_with_status: usize,
}

impl BuildSummary {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// A validated plan for populating one database from one input directory.
pub struct Populate<'a> {
    config: &'a PipelineConfig,
    data_dir: PathBuf,
    rules: Vec<CompiledRule>,
    loader: ChunkedLoader,
}

impl<'a> Populate<'a> {
    /// Compile the rules and check every required category is present.
    ///
    /// Nothing is written; a missing category fails here.
    pub fn new(config: &'a PipelineConfig, data_dir: &Path, show_progress: bool) -> Result<Self> {
        if !data_dir.is_dir() {
            return Err(IngestError::DirectoryNotFound {
                path: data_dir.to_path_buf(),
            }
            .into());
        }
        let rules = config.compile_rules()?;
        ensure_categories_present(data_dir, config.required_categories())?;
        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            rules,
            loader: ChunkedLoader::new(show_progress),
        })
    }

    fn context(&self) -> TransformContext<'_> {
        TransformContext {
            death_events: &self.config.death_events,
        }
    }

    fn read(&self, category: &str) -> Result<DataFrame> {
        Ok(read_category(&self.data_dir, category)?)
    }

    /// COVID-19 status and death for every patient in the status sources.
    pub fn status_index(&self) -> Result<StatusIndex> {
        let status = &self.config.status;
        let _span = info_span!("status").entered();
        let covid = self.read(&status.covid.category)?;
        let outcomes = self.read(&status.outcomes.category)?;
        let index = StatusIndex::build(status, &covid, &outcomes, &self.config.death_events)?;
        info!(patients = index.len(), "patient status derived");
        Ok(index)
    }

    /// Populate every configured table in order.
    pub fn populate(&self, conn: &Connection) -> Result<(Vec<TableSummary>, usize)> {
        let mut summaries = Vec::with_capacity(self.rules.len());
        let mut patients_with_status = 0;
        for rule in &self.rules {
            let table = rule.rule().table;
            let status = if table == TableKind::Patients {
                let index = self.status_index()?;
                patients_with_status = index.len();
                Some(index)
            } else {
                None
            };
            summaries.push(self.populate_table(conn, rule, status.as_ref())?);
        }
        Ok((summaries, patients_with_status))
    }

    fn populate_table(
        &self,
        conn: &Connection,
        rule: &CompiledRule,
        status: Option<&StatusIndex>,
    ) -> Result<TableSummary> {
        let table = rule.rule().table;
        let span = info_span!("table", table = %table);
        let _guard = span.enter();
        let start = Instant::now();
        let ctx = self.context();

        let mut summary = TableSummary {
            table,
            categories: 0,
            source_rows: 0,
            rows: 0,
            batches: 0,
        };
        for category in &rule.rule().categories {
            let _category_span = info_span!("category", category = %category).entered();
            let raw = self.read(category)?;
            summary.source_rows += raw.height();
            let mut shaped = rule.apply(category, raw, &ctx)?;
            if let Some(index) = status {
                shaped = index.apply(&self.config.status, shaped)?;
            }
            let report = self.loader.load(conn, table.name(), &shaped)?;
            summary.categories += 1;
            summary.rows += report.rows;
            summary.batches += report.batches.len();
        }
        info!(
            rows = summary.rows,
            source_rows = summary.source_rows,
            elapsed_ms = elapsed_ms(start.elapsed()),
            "table populated"
        );
        Ok(summary)
    }

    /// Create the configured indexes. Run after [`Populate::populate`].
    pub fn create_indexes(&self, conn: &Connection) -> Result<usize> {
        let _span = info_span!("indexes").entered();
        Ok(create_indexes(conn, &self.config.indexes)?)
    }
}

/// Milliseconds for log fields, saturating at `u64::MAX`.
fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Check inputs, create the database, populate it and index it.
pub fn build(
    config: &PipelineConfig,
    data_dir: &Path,
    database: &Path,
    options: BuildOptions,
) -> Result<BuildSummary> {
    let _span = info_span!("build", schema = %config.schema).entered();
    let populate = Populate::new(config, data_dir, options.show_progress)?;
    let conn = create_database(database, config.schema, options.overwrite)?;
    let (tables, patients_with_status) = populate.populate(&conn)?;
    let indexes = populate.create_indexes(&conn)?;
    let summary = BuildSummary {
        database: database.to_path_buf(),
        schema: config.schema,
        tables,
        indexes,
        patients_with_status,
    };
    info!(
        database = %database.display(),
        rows = summary.total_rows(),
        indexes,
        "database built"
    );
    Ok(summary)
}
