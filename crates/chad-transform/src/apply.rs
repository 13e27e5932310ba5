//! Rule interpretation.
//!
//! [`CompiledRule`] holds a validated [`TableRule`] with its patterns
//! compiled, and shapes one category DataFrame at a time. Categories never
//! share state; each call owns its frame.

use std::collections::HashMap;

use chad_model::is_valid_result;
use polars::prelude::{Column, DataFrame, DataType};
use tracing::{debug, warn};

use crate::datetime::{format_instant, normalize_values, split_date_time};
use crate::error::{Result, TransformError};
use crate::extract::Extractor;
use crate::frame::{
    column_strings, constant_column, filter_rows, flag_column, has_column, string_column,
};
use crate::rules::{
    DeathMarker, RowFilter, SAMPLE_TYPE, Shape, TEST_NAME, TEST_RESULT, TableRule,
    TimestampRule, VALID,
};

/// Run-wide inputs every rule may consult.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    /// Destination strings that signal a death.
    pub death_events: &'a [String],
}

/// A validated rule with compiled extraction patterns.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: TableRule,
    extractors: HashMap<String, Extractor>,
}

impl CompiledRule {
    pub fn new(rule: TableRule) -> Result<Self> {
        rule.validate()?;
        let mut extractors = HashMap::new();
        if let Shape::FreeText { extractions, .. } = &rule.shape {
            for extraction in extractions {
                extractors.insert(extraction.category.clone(), Extractor::compile(extraction)?);
            }
        }
        Ok(Self { rule, extractors })
    }

    pub fn rule(&self) -> &TableRule {
        &self.rule
    }

    /// Shape one category into rows of the destination table.
    pub fn apply(
        &self,
        category: &str,
        df: DataFrame,
        ctx: &TransformContext<'_>,
    ) -> Result<DataFrame> {
        let rule = &self.rule;
        let source_rows = df.height();

        for column in rule.required_columns() {
            require(&df, category, column)?;
        }

        let mut df = match &rule.keep_where {
            Some(filter) => keep_where(df, category, filter)?,
            None => df,
        };

        for column in &rule.drop {
            if has_column(&df, column) {
                df.drop_in_place(column)
                    .map_err(TransformError::frame(category))?;
            }
        }

        if let Some(marker) = &rule.death_marker {
            mark_deaths(&mut df, category, marker, ctx.death_events)?;
        }

        for timestamp in &rule.timestamps {
            normalize_timestamp(&mut df, category, timestamp)?;
        }

        for (from, to) in &rule.rename {
            if has_column(&df, from) {
                df.rename(from, to.as_str().into())
                    .map_err(TransformError::frame(category))?;
            }
        }

        for (column, value) in &rule.defaults {
            if has_column(&df, column) {
                let filled: Vec<Option<String>> = column_strings(&df, column)
                    .map_err(TransformError::frame(category))?
                    .into_iter()
                    .map(|v| v.or_else(|| Some(value.clone())))
                    .collect();
                df.with_column(string_column(column, filled))
                    .map_err(TransformError::frame(category))?;
            }
        }

        let mut df = match &rule.shape {
            Shape::Passthrough => df,
            Shape::Melt {
                id_columns,
                name_column,
                value_column,
            } => melt(&df, category, id_columns, name_column, value_column)?,
            Shape::FreeText { text_column, .. } => {
                extract_fields(df, category, text_column, self.extractors.get(category))?
            }
        };

        if let Some(column) = &rule.category_column {
            let height = df.height();
            df.with_column(constant_column(column, Some(category), height))
                .map_err(TransformError::frame(category))?;
        }

        if let Some(source) = &rule.valid_from {
            require(&df, category, source)?;
            let flags: Vec<bool> = column_strings(&df, source)
                .map_err(TransformError::frame(category))?
                .iter()
                .map(|value| is_valid_result(value.as_deref()))
                .collect();
            df.with_column(flag_column(VALID, flags))
                .map_err(TransformError::frame(category))?;
        }

        if !rule.require_values.is_empty() {
            df = drop_incomplete(df, category, &rule.require_values)?;
        }

        if !rule.select.is_empty() {
            let present: Vec<&str> = rule
                .select
                .iter()
                .map(String::as_str)
                .filter(|column| has_column(&df, column))
                .collect();
            df = df
                .select(present)
                .map_err(TransformError::frame(category))?;
        }

        debug!(
            category,
            table = %rule.table,
            source_rows,
            output_rows = df.height(),
            "category transformed"
        );
        Ok(df)
    }
}

fn require(df: &DataFrame, category: &str, column: &str) -> Result<()> {
    if has_column(df, column) {
        Ok(())
    } else {
        Err(TransformError::MissingColumn {
            category: category.to_string(),
            column: column.to_string(),
        })
    }
}

fn keep_where(df: DataFrame, category: &str, filter: &RowFilter) -> Result<DataFrame> {
    let keep: Vec<bool> = column_strings(&df, &filter.column)
        .map_err(TransformError::frame(category))?
        .iter()
        .map(|value| value.as_deref() == Some(filter.equals.as_str()))
        .collect();
    let kept = filter_rows(&df, &keep).map_err(TransformError::frame(category))?;
    debug!(
        category,
        column = %filter.column,
        removed = df.height() - kept.height(),
        "row filter applied"
    );
    Ok(kept)
}

/// Per-event marker: 1 when any vocabulary entry occurs in the destination.
fn mark_deaths(
    df: &mut DataFrame,
    category: &str,
    marker: &DeathMarker,
    death_events: &[String],
) -> Result<()> {
    let flags: Vec<bool> = column_strings(df, &marker.source)
        .map_err(TransformError::frame(category))?
        .iter()
        .map(|destination| {
            destination.as_deref().is_some_and(|text| {
                death_events.iter().any(|event| text.contains(event.as_str()))
            })
        })
        .collect();
    df.with_column(flag_column(&marker.target, flags))
        .map_err(TransformError::frame(category))?;
    Ok(())
}

fn normalize_timestamp(df: &mut DataFrame, category: &str, rule: &TimestampRule) -> Result<()> {
    let raw = column_strings(df, &rule.source).map_err(TransformError::frame(category))?;
    let parsed = normalize_values(&raw);
    let unparsed = raw
        .iter()
        .zip(&parsed)
        .filter(|(raw, parsed)| raw.is_some() && parsed.is_none())
        .count();
    if unparsed > 0 {
        debug!(
            category,
            column = %rule.source,
            unparsed,
            "timestamps left null"
        );
    }

    df.drop_in_place(&rule.source)
        .map_err(TransformError::frame(category))?;
    match &rule.time_target {
        None => {
            let instants: Vec<Option<String>> =
                parsed.into_iter().map(|p| p.map(format_instant)).collect();
            df.with_column(string_column(&rule.target, instants))
                .map_err(TransformError::frame(category))?;
        }
        Some(time_target) => {
            let (dates, times): (Vec<Option<String>>, Vec<Option<f64>>) = parsed
                .into_iter()
                .map(|p| match p.map(split_date_time) {
                    Some((date, hours)) => (Some(date), Some(hours)),
                    None => (None, None),
                })
                .unzip();
            df.with_column(string_column(&rule.target, dates))
                .map_err(TransformError::frame(category))?;
            df.with_column(Column::new(time_target.as_str().into(), times))
                .map_err(TransformError::frame(category))?;
        }
    }
    Ok(())
}

/// Wide to long. Output is grouped by value column, source row order kept
/// within each group, so K value columns and N rows give N * K rows.
fn melt(
    df: &DataFrame,
    category: &str,
    id_columns: &[String],
    name_column: &str,
    value_column: &str,
) -> Result<DataFrame> {
    for column in id_columns {
        require(df, category, column)?;
    }
    let ids = df
        .select(id_columns.iter().map(String::as_str))
        .map_err(TransformError::frame(category))?;
    let value_columns: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| !id_columns.contains(name))
        .collect();

    let height = df.height();
    let mut long = ids.clear();
    long.with_column(constant_column(name_column, None, 0))
        .map_err(TransformError::frame(category))?;
    long.with_column(constant_column(value_column, None, 0))
        .map_err(TransformError::frame(category))?;

    for name in &value_columns {
        let values = df
            .column(name)
            .and_then(|c| c.cast(&DataType::String))
            .map_err(TransformError::frame(category))?
            .with_name(value_column.into());
        let mut part = ids.clone();
        part.with_column(constant_column(name_column, Some(name), height))
            .map_err(TransformError::frame(category))?;
        part.with_column(values)
            .map_err(TransformError::frame(category))?;
        long.vstack_mut(&part)
            .map_err(TransformError::frame(category))?;
    }
    Ok(long)
}

fn extract_fields(
    mut df: DataFrame,
    category: &str,
    text_column: &str,
    extractor: Option<&Extractor>,
) -> Result<DataFrame> {
    require(&df, category, text_column)?;
    let height = df.height();
    let (test_names, results, samples) = match extractor {
        Some(extractor) => {
            let texts = column_strings(&df, text_column).map_err(TransformError::frame(category))?;
            let mut results = Vec::with_capacity(height);
            let mut samples = Vec::with_capacity(height);
            for text in &texts {
                let extracted = extractor.extract(text.as_deref());
                results.push(extracted.test_result);
                samples.push(extracted.sample_type);
            }
            let names = constant_column(TEST_NAME, extractor.test_name.as_deref(), height);
            (names, string_column(TEST_RESULT, results), string_column(SAMPLE_TYPE, samples))
        }
        None => (
            constant_column(TEST_NAME, None, height),
            constant_column(TEST_RESULT, None, height),
            constant_column(SAMPLE_TYPE, None, height),
        ),
    };
    for column in [test_names, results, samples] {
        df.with_column(column)
            .map_err(TransformError::frame(category))?;
    }
    Ok(df)
}

fn drop_incomplete(df: DataFrame, category: &str, columns: &[String]) -> Result<DataFrame> {
    let mut keep = vec![true; df.height()];
    for column in columns {
        require(&df, category, column)?;
        let values = df
            .column(column)
            .map_err(TransformError::frame(category))?
            .is_null();
        for (slot, is_null) in keep.iter_mut().zip(&values) {
            if is_null.unwrap_or(true) {
                *slot = false;
            }
        }
    }
    let kept = filter_rows(&df, &keep).map_err(TransformError::frame(category))?;
    let dropped = df.height() - kept.height();
    if dropped > 0 {
        warn!(
            category,
            dropped,
            columns = ?columns,
            "rows without required values skipped"
        );
    }
    Ok(kept)
}
