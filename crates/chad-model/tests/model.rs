//! Serde behaviour of the shared model types.

use chad_model::{CovidStatus, SchemaVersion, TableKind};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Sample {
    schema: SchemaVersion,
    status: CovidStatus,
    table: TableKind,
}

#[test]
fn deserializes_from_toml() {
    let sample: Sample = toml::from_str(
        r#"
        schema = "bevan"
        status = "P"
        table = "ComplexHaematology"
        "#,
    )
    .expect("parse sample");
    assert_eq!(sample.schema, SchemaVersion::Bevan);
    assert_eq!(sample.status, CovidStatus::Positive);
    assert_eq!(sample.table, TableKind::ComplexHaematology);
}

#[test]
fn rejects_unknown_table() {
    let parsed: Result<Sample, _> = toml::from_str(
        r#"
        schema = "chad"
        status = "U"
        table = "Vitals"
        "#,
    );
    assert!(parsed.is_err());
}
