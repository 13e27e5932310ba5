//! Small DataFrame helpers shared by the transform steps.

use polars::prelude::{BooleanChunked, Column, DataFrame, DataType, NewChunkedArray, PolarsResult};

/// All values of `name` as nullable strings, whatever the column dtype.
pub fn column_strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

pub fn string_column(name: &str, values: Vec<Option<String>>) -> Column {
    Column::new(name.into(), values)
}

/// A column repeating `value` for `height` rows.
pub fn constant_column(name: &str, value: Option<&str>, height: usize) -> Column {
    let values: Vec<Option<String>> = vec![value.map(str::to_string); height];
    Column::new(name.into(), values)
}

/// 0/1 integer column, the store's boolean representation.
pub fn flag_column(name: &str, flags: impl IntoIterator<Item = bool>) -> Column {
    let values: Vec<i32> = flags.into_iter().map(i32::from).collect();
    Column::new(name.into(), values)
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Keep only rows where `keep` is true.
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> PolarsResult<DataFrame> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    df.filter(&mask)
}
