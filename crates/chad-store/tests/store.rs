//! Loading shaped frames into a freshly created database.

use chad_model::SchemaVersion;
use chad_store::{ChunkedLoader, Connection, StoreError, count_rows, create_database};
use polars::prelude::{Column, DataFrame};
use tempfile::TempDir;

fn pathology_rows(n: usize) -> DataFrame {
    let ids: Vec<Option<String>> = (0..n).map(|i| Some(format!("p{}", i % 7))).collect();
    let names: Vec<Option<String>> = (0..n).map(|i| Some(format!("T{}", i % 3))).collect();
    let results: Vec<Option<String>> = (0..n)
        .map(|i| (i % 5 != 0).then(|| format!("{i}.0")))
        .collect();
    let valid: Vec<i32> = vec![1; n];
    DataFrame::new(vec![
        Column::new("patient_id".into(), ids),
        Column::new("test_name".into(), names),
        Column::new("test_result".into(), results),
        Column::new("valid".into(), valid),
    ])
    .expect("frame")
}

#[test]
fn loads_every_row_in_bounded_batches() {
    let dir = TempDir::new().expect("tempdir");
    let conn = create_database(&dir.path().join("chad.db"), SchemaVersion::Chad, false)
        .expect("create");

    let df = pathology_rows(103);
    let report = ChunkedLoader::new(false)
        .load(&conn, "Pathology", &df)
        .expect("load");

    assert_eq!(report.rows, 103);
    assert_eq!(report.batches.len(), 10);
    assert_eq!(report.batches.iter().sum::<usize>(), 103);
    assert_eq!(count_rows(&conn, "Pathology").expect("count"), 103);

    let nulls: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM Pathology WHERE test_result IS NULL",
            [],
            |row| row.get(0),
        )
        .expect("query");
    assert_eq!(nulls, 21);
}

#[test]
fn loading_appends() {
    let conn = Connection::open_in_memory().expect("open");
    chad_store::create_schema(&conn, SchemaVersion::Chad).expect("schema");
    let loader = ChunkedLoader::default();
    loader.load(&conn, "Pathology", &pathology_rows(4)).expect("first");
    loader.load(&conn, "Pathology", &pathology_rows(3)).expect("second");
    assert_eq!(count_rows(&conn, "Pathology").expect("count"), 7);
}

#[test]
fn empty_frame_writes_nothing() {
    let conn = Connection::open_in_memory().expect("open");
    chad_store::create_schema(&conn, SchemaVersion::Chad).expect("schema");
    let report = ChunkedLoader::default()
        .load(&conn, "Pathology", &pathology_rows(0))
        .expect("load");
    assert_eq!(report.rows, 0);
    assert!(report.batches.is_empty());
}

#[test]
fn legacy_split_time_is_stored_as_real() {
    let conn = Connection::open_in_memory().expect("open");
    chad_store::create_schema(&conn, SchemaVersion::Bevan).expect("schema");
    let df = DataFrame::new(vec![
        Column::new("patient_id".into(), vec![Some("p1".to_string())]),
        Column::new("event_type".into(), vec![Some("Discharge".to_string())]),
        Column::new("event_date".into(), vec![Some("2020-04-01".to_string())]),
        Column::new("event_time".into(), vec![Some(13.5f64)]),
    ])
    .expect("frame");
    ChunkedLoader::default()
        .load(&conn, "Events", &df)
        .expect("load");
    let (date, time): (String, f64) = conn
        .query_row("SELECT event_date, event_time FROM Events", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .expect("query");
    assert_eq!(date, "2020-04-01");
    assert_eq!(time, 13.5);
}

#[test]
fn unknown_column_is_an_insert_error() {
    let conn = Connection::open_in_memory().expect("open");
    chad_store::create_schema(&conn, SchemaVersion::Chad).expect("schema");
    let df = DataFrame::new(vec![Column::new("bogus".into(), vec![1i32])]).expect("frame");
    let err = ChunkedLoader::default()
        .load(&conn, "Units", &df)
        .expect_err("should fail");
    assert!(matches!(err, StoreError::Insert { .. }));
}
