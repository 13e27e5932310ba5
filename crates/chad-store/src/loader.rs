//! Chunked, append-only loading of shaped tables.
//!
//! A frame is split into at most [`MAX_BATCHES`] near-equal batches. Each
//! batch is written in its own transaction, so progress is observable and no
//! single insert holds the whole table. There is no rollback across batches:
//! a failure leaves the earlier batches in place and aborts the run.

use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::{AnyValue, DataFrame};
use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::{debug, info_span};

use crate::error::{Result, StoreError};
use crate::schema::{quote_ident, table_exists};

/// Upper bound on the number of batches per table.
pub const MAX_BATCHES: usize = 10;

/// Batch sizes for `total` rows.
///
/// `total` rows are spread over `min(total, MAX_BATCHES)` batches whose sizes
/// differ by at most one, larger batches first.
pub fn batch_plan(total: usize) -> Vec<usize> {
    let count = total.min(MAX_BATCHES);
    if count == 0 {
        return Vec::new();
    }
    let base = total / count;
    let extra = total % count;
    (0..count)
        .map(|idx| base + usize::from(idx < extra))
        .collect()
}

/// What one [`ChunkedLoader::load`] call wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub table: String,
    pub rows: usize,
    pub batches: Vec<usize>,
}

/// Convert a cell to a SQLite value.
///
/// Booleans become 0/1; types SQLite has no storage class for are written as
/// their text rendering.
pub fn to_sql_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Integer(i64::from(b)),
        AnyValue::String(s) => Value::Text(s.to_string()),
        AnyValue::StringOwned(s) => Value::Text(s.to_string()),
        AnyValue::Int32(v) => Value::Integer(i64::from(v)),
        AnyValue::Int64(v) => Value::Integer(v),
        AnyValue::UInt32(v) => Value::Integer(i64::from(v)),
        AnyValue::UInt64(v) => match i64::try_from(v) {
            Ok(v) => Value::Integer(v),
            Err(_) => Value::Text(v.to_string()),
        },
        AnyValue::Float32(v) => Value::Real(f64::from(v)),
        AnyValue::Float64(v) => Value::Real(v),
        other => Value::Text(other.to_string()),
    }
}

/// Appends frames to existing tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkedLoader {
    show_progress: bool,
}

impl ChunkedLoader {
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }

    fn progress_bar(&self, table: &str, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{prefix:>18.bold} [{bar:32.cyan/blue}] {pos}/{len} rows ({percent}%) {msg}",
        ) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(table.to_string());
        bar
    }

    /// Append every row of `df` to `table`, matching columns by name.
    pub fn load(&self, conn: &Connection, table: &str, df: &DataFrame) -> Result<LoadReport> {
        let _span = info_span!("load", table).entered();
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingTable {
                table: table.to_string(),
            });
        }

        let total = df.height();
        let plan = batch_plan(total);
        if plan.is_empty() || df.width() == 0 {
            debug!(table, "nothing to load");
            return Ok(LoadReport {
                table: table.to_string(),
                rows: 0,
                batches: Vec::new(),
            });
        }

        let sql = insert_statement(table, &df.get_column_names_str());
        let insert_err = |source| StoreError::Insert {
            table: table.to_string(),
            source,
        };
        let frame_err = |source| StoreError::Frame {
            table: table.to_string(),
            source,
        };

        let bar = self.progress_bar(table, total);
        let mut offset = 0usize;
        let mut row_values: Vec<Value> = Vec::with_capacity(df.width());
        for &size in &plan {
            let batch = df.slice(offset as i64, size);
            let tx = conn.unchecked_transaction().map_err(insert_err)?;
            {
                let mut stmt = tx.prepare_cached(&sql).map_err(insert_err)?;
                for row in 0..batch.height() {
                    row_values.clear();
                    for column in batch.get_columns() {
                        row_values.push(to_sql_value(column.get(row).map_err(frame_err)?));
                    }
                    stmt.execute(rusqlite::params_from_iter(row_values.iter()))
                        .map_err(insert_err)?;
                }
            }
            tx.commit().map_err(insert_err)?;
            offset += size;
            bar.inc(size as u64);
            debug!(table, batch_rows = size, written = offset, "batch committed");
        }
        bar.finish_and_clear();

        Ok(LoadReport {
            table: table.to_string(),
            rows: offset,
            batches: plan,
        })
    }
}

fn insert_statement(table: &str, columns: &[&str]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let params: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        params.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::Column;

    #[test]
    fn test_batch_plan_sums_to_total() {
        for total in [0usize, 1, 7, 10, 11, 99, 100, 101, 12_345] {
            let plan = batch_plan(total);
            assert_eq!(plan.iter().sum::<usize>(), total, "total {total}");
            assert_eq!(plan.len(), total.min(MAX_BATCHES));
            if let (Some(max), Some(min)) = (plan.iter().max(), plan.iter().min()) {
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn test_batch_count_ignores_divisibility() {
        assert_eq!(batch_plan(100).len(), batch_plan(101).len());
        assert_eq!(batch_plan(23), vec![3, 3, 3, 2, 2, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn test_insert_statement() {
        assert_eq!(
            insert_statement("Units", &["test_name", "reported_units"]),
            "INSERT INTO \"Units\" (\"test_name\", \"reported_units\") VALUES (?1, ?2)"
        );
    }

    #[test]
    fn test_value_conversion() {
        assert_eq!(to_sql_value(AnyValue::Null), Value::Null);
        assert_eq!(to_sql_value(AnyValue::Boolean(true)), Value::Integer(1));
        assert_eq!(to_sql_value(AnyValue::Int32(7)), Value::Integer(7));
        assert_eq!(to_sql_value(AnyValue::Float64(13.5)), Value::Real(13.5));
        assert_eq!(
            to_sql_value(AnyValue::String("P")),
            Value::Text("P".to_string())
        );
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        let df = DataFrame::new(vec![Column::new("a".into(), vec![1i32])]).unwrap();
        let err = ChunkedLoader::default()
            .load(&conn, "Nowhere", &df)
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingTable { .. }));
    }
}
