//! CLI argument definitions for the CHAD database builder.

use std::path::PathBuf;

use chad_model::SchemaVersion;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "chad",
    version,
    about = "Build the CHAD SQLite database from clinical data extracts",
    long_about = "Build the CHAD SQLite database from per-category clinical data extracts.\n\n\
                  Extracts are read from one directory (one <Category>.csv per category),\n\
                  shaped by the configured table rules and loaded in a fixed order."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create and populate a database from a directory of extracts.
    Build(BuildArgs),

    /// Merge split extracts (LFT-1.csv, LFT-2.csv) into one file per category.
    Consolidate(ConsolidateArgs),

    /// List the categories the pipeline reads.
    Categories(CategoriesArgs),
}

/// Which pipeline configuration to use.
#[derive(Parser)]
pub struct ConfigArgs {
    /// Database layout; selects the built-in rules.
    #[arg(long = "schema", value_enum)]
    pub schema: Option<SchemaArg>,

    /// Pipeline configuration file replacing the built-in rules.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Directory holding one extract file per category.
    #[arg(value_name = "DATA_DIR")]
    pub data_dir: PathBuf,

    /// Path of the database to create.
    #[arg(long = "database", short = 'o', value_name = "PATH")]
    pub database: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Replace the database if it already exists.
    #[arg(long = "overwrite")]
    pub overwrite: bool,

    /// Do not draw progress bars.
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    /// Worker threads for timestamp parsing (default: one per core).
    #[arg(long = "threads", value_name = "N")]
    pub threads: Option<usize>,
}

#[derive(Parser)]
pub struct ConsolidateArgs {
    /// Directory of raw, possibly split, extracts.
    #[arg(value_name = "READ_DIR")]
    pub read_dir: PathBuf,

    /// Directory under which `consolidated/` is written.
    #[arg(value_name = "WRITE_DIR")]
    pub write_dir: PathBuf,
}

#[derive(Parser)]
pub struct CategoriesArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Also report which categories are present in this directory.
    #[arg(long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SchemaArg {
    Chad,
    Bevan,
}

impl From<SchemaArg> for SchemaVersion {
    fn from(value: SchemaArg) -> Self {
        match value {
            SchemaArg::Chad => SchemaVersion::Chad,
            SchemaArg::Bevan => SchemaVersion::Bevan,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
