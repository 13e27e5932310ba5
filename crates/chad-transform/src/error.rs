//! Error types for category transforms.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while shaping a category into its destination table.
///
/// Unparseable timestamps and extraction misses are not errors; they become
/// nulls in the output.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A column the rule needs is absent from the extract.
    #[error("{category}: required column {column} is missing")]
    MissingColumn { category: String, column: String },

    /// A configured pattern failed to compile.
    #[error("{category}: invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        category: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A group index points past the pattern's capture groups.
    #[error("{category}: pattern {pattern:?} has {groups} capture groups, group {group} requested")]
    GroupOutOfRange {
        category: String,
        pattern: String,
        group: usize,
        groups: usize,
    },

    /// A rule is internally inconsistent.
    #[error("invalid rule for {table}: {message}")]
    InvalidRule { table: String, message: String },

    /// DataFrame operation failed.
    #[error("{category}: DataFrame operation failed: {source}")]
    Frame {
        category: String,
        #[source]
        source: PolarsError,
    },
}

impl TransformError {
    pub(crate) fn frame(category: &str) -> impl FnOnce(PolarsError) -> Self + '_ {
        move |source| Self::Frame {
            category: category.to_string(),
            source,
        }
    }
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;
