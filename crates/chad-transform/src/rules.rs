//! Declarative per-table transform rules.
//!
//! A [`TableRule`] describes how every category feeding one destination table
//! is shaped. Rules are data: they are deserialized from the pipeline
//! configuration and interpreted by [`crate::apply::CompiledRule`].
//!
//! Steps run in a fixed order:
//!
//! 1. required source columns are checked
//! 2. `keep_where` filters rows
//! 3. `drop` removes source columns (absent ones are ignored)
//! 4. `death_marker` flags destinations mentioning a death event
//! 5. `timestamps` are normalized and replace their source column
//! 6. `rename` maps source headers to canonical names, then `defaults` fill nulls
//! 7. `shape` reshapes the frame
//! 8. `category_column` records the source category
//! 9. `valid_from` derives the `valid` flag
//! 10. rows with nulls in `require_values` are dropped
//! 11. `select` restricts the output columns

use std::collections::BTreeMap;

use chad_model::TableKind;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};

/// Canonical output column holding the test name.
pub const TEST_NAME: &str = "test_name";
/// Canonical output column holding the test result.
pub const TEST_RESULT: &str = "test_result";
/// Canonical output column holding the extracted specimen type.
pub const SAMPLE_TYPE: &str = "sample_type";
/// Canonical output column holding the validity flag.
pub const VALID: &str = "valid";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RowFilter {
    pub column: String,
    pub equals: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeathMarker {
    pub source: String,
    pub target: String,
}

/// One timestamp column to normalize.
///
/// With `time_target` unset, `target` receives the ISO 8601 instant. With it
/// set, `target` receives the `YYYY-MM-DD` date and `time_target` the time as
/// decimal hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimestampRule {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub time_target: Option<String>,
}

fn default_result_group() -> usize {
    1
}

/// Capture patterns for one free-text category.
///
/// Group indices count capture groups from zero; a pattern with a single
/// capture group ignores its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionRule {
    pub category: String,
    #[serde(default)]
    pub test_name: Option<String>,
    #[serde(default)]
    pub sample_pattern: Option<String>,
    #[serde(default)]
    pub sample_group: usize,
    #[serde(default)]
    pub result_pattern: Option<String>,
    #[serde(default = "default_result_group")]
    pub result_group: usize,
    /// Copy the whole text into the result instead of matching a pattern.
    #[serde(default)]
    pub result_is_text: bool,
}

fn default_name_column() -> String {
    TEST_NAME.to_string()
}

fn default_value_column() -> String {
    TEST_RESULT.to_string()
}

/// How rows of a category map onto rows of the destination table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// One output row per source row.
    #[default]
    Passthrough,
    /// Wide to long: every column outside `id_columns` becomes one row per
    /// source row, its header in `name_column` and its cell in `value_column`.
    Melt {
        id_columns: Vec<String>,
        #[serde(default = "default_name_column")]
        name_column: String,
        #[serde(default = "default_value_column")]
        value_column: String,
    },
    /// Test name, result and sample type are pulled from `text_column`.
    FreeText {
        text_column: String,
        #[serde(default)]
        extractions: Vec<ExtractionRule>,
    },
}

impl Shape {
    pub fn label(&self) -> &'static str {
        match self {
            Shape::Passthrough => "passthrough",
            Shape::Melt { .. } => "melt",
            Shape::FreeText { .. } => "free text",
        }
    }
}

/// Transform rule for every category feeding one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableRule {
    pub table: TableKind,
    pub categories: Vec<String>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub keep_where: Option<RowFilter>,
    #[serde(default)]
    pub drop: Vec<String>,
    #[serde(default)]
    pub death_marker: Option<DeathMarker>,
    #[serde(default)]
    pub timestamps: Vec<TimestampRule>,
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    #[serde(default)]
    pub shape: Shape,
    #[serde(default)]
    pub category_column: Option<String>,
    #[serde(default)]
    pub valid_from: Option<String>,
    #[serde(default)]
    pub require_values: Vec<String>,
    #[serde(default)]
    pub select: Vec<String>,
}

impl TableRule {
    /// Source columns that must be present in every category of this rule.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = self.required.iter().map(String::as_str).collect();
        if let Some(filter) = &self.keep_where {
            columns.push(&filter.column);
        }
        if let Some(marker) = &self.death_marker {
            columns.push(&marker.source);
        }
        columns.extend(self.timestamps.iter().map(|ts| ts.source.as_str()));
        columns.sort_unstable();
        columns.dedup();
        columns
    }

    /// Structural checks that do not need any data.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| TransformError::InvalidRule {
            table: self.table.to_string(),
            message,
        };
        if self.categories.is_empty() {
            return Err(invalid("no categories".to_string()));
        }
        match &self.shape {
            Shape::Passthrough => {}
            Shape::Melt { id_columns, .. } => {
                if id_columns.is_empty() {
                    return Err(invalid("melt needs at least one id column".to_string()));
                }
            }
            Shape::FreeText { extractions, .. } => {
                for extraction in extractions {
                    if !self.categories.contains(&extraction.category) {
                        return Err(invalid(format!(
                            "extraction for {} which is not one of its categories",
                            extraction.category
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
