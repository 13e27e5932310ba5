//! Post-population secondary indexes.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::schema::quote_ident;

/// One single-column index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexDef {
    pub name: String,
    pub table: String,
    pub column: String,
}

impl IndexDef {
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_ident(&self.name),
            quote_ident(&self.table),
            quote_ident(&self.column)
        )
    }
}

/// Create every index. Assumes population has finished.
pub fn create_indexes(conn: &Connection, indexes: &[IndexDef]) -> Result<usize> {
    for index in indexes {
        conn.execute_batch(&index.create_sql())?;
        debug!(index = %index.name, table = %index.table, column = %index.column, "index created");
    }
    info!(count = indexes.len(), "indexes created");
    Ok(indexes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::create_schema;
    use chad_model::SchemaVersion;

    fn index(name: &str, table: &str, column: &str) -> IndexDef {
        IndexDef {
            name: name.to_string(),
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    #[test]
    fn test_create_indexes_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn, SchemaVersion::Chad).unwrap();
        let defs = vec![
            index("events_pt_id", "Events", "patient_id"),
            index("cat_path", "Pathology", "test_category"),
        ];
        assert_eq!(create_indexes(&conn, &defs).unwrap(), 2);
        assert_eq!(create_indexes(&conn, &defs).unwrap(), 2);

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name IN ('events_pt_id', 'cat_path')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_unknown_column_fails() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn, SchemaVersion::Chad).unwrap();
        assert!(create_indexes(&conn, &[index("bad", "Events", "nope")]).is_err());
    }
}
