//! Error types for the relational store.

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The destination exists and overwriting was not requested.
    #[error("database already exists: {}; pass overwrite to replace it", path.display())]
    DatabaseExists { path: PathBuf },

    /// Failed to remove or create the database file.
    #[error("failed to prepare database file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Appends only go to tables created by the schema phase.
    #[error("table {table} does not exist in the store")]
    MissingTable { table: String },

    #[error("failed to insert into {table}: {source}")]
    Insert {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to read rows for {table}: {source}")]
    Frame {
        table: String,
        #[source]
        source: PolarsError,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
