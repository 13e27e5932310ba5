//! Error types for configuration and orchestration.

use std::path::PathBuf;

use chad_ingest::IngestError;
use chad_model::SchemaVersion;
use chad_store::StoreError;
use chad_transform::TransformError;
use thiserror::Error;

/// Problems with a pipeline configuration, raised before any input is read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("config declares schema {found} but {expected} was requested")]
    SchemaMismatch {
        expected: SchemaVersion,
        found: SchemaVersion,
    },

    #[error("config has no tables")]
    NoTables,

    #[error("table {table} is configured more than once")]
    DuplicateTable { table: String },

    #[error("category {category} feeds both {first} and {second}")]
    SharedCategory {
        category: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Rule(#[from] TransformError),
}

/// Errors that abort a database build.
#[derive(Debug, Error)]
pub enum PopulateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, PopulateError>;
