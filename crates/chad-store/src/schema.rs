//! Store creation.
//!
//! The database is always built from empty: [`create_database`] refuses to
//! touch an existing file unless asked to replace it, then runs the DDL for
//! the selected layout.

use std::path::Path;

use chad_model::SchemaVersion;
use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, StoreError};

const CHAD_DDL: &str = include_str!("../sql/chad.sql");
const BEVAN_DDL: &str = include_str!("../sql/bevan.sql");

/// DDL script for a layout.
pub fn ddl(version: SchemaVersion) -> &'static str {
    match version {
        SchemaVersion::Chad => CHAD_DDL,
        SchemaVersion::Bevan => BEVAN_DDL,
    }
}

/// Create every table of `version` on an open connection.
pub fn create_schema(conn: &Connection, version: SchemaVersion) -> Result<()> {
    conn.execute_batch(ddl(version))?;
    Ok(())
}

/// Create an empty database at `path`.
///
/// An existing file is an error unless `overwrite` is set, in which case it
/// is removed first.
pub fn create_database(path: &Path, version: SchemaVersion, overwrite: bool) -> Result<Connection> {
    if path.exists() {
        if !overwrite {
            return Err(StoreError::DatabaseExists {
                path: path.to_path_buf(),
            });
        }
        std::fs::remove_file(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn, version)?;
    info!(path = %path.display(), schema = %version, "database created");
    Ok(conn)
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Names of all user tables, sorted.
pub fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
