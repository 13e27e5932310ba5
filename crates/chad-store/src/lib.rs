//! SQLite store for the CHAD database.
//!
//! - [`schema`]: empty-database creation for each layout
//! - [`loader`]: chunked, append-only loading of shaped frames
//! - [`indexes`]: the post-population index phase

pub mod error;
pub mod indexes;
pub mod loader;
pub mod schema;

pub use error::{Result, StoreError};
pub use indexes::{IndexDef, create_indexes};
pub use loader::{ChunkedLoader, LoadReport, MAX_BATCHES, batch_plan, to_sql_value};
pub use schema::{count_rows, create_database, create_schema, ddl, table_exists, table_names};

/// Re-exported so callers can hold a connection without depending on rusqlite.
pub use rusqlite::Connection;
