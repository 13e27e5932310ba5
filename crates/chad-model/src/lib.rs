//! Shared vocabulary for the CHAD clinical extract database.
//!
//! These types are used by every stage of the build: ingestion, the
//! per-category transforms, the status derivation engine, and the store.

pub mod error;
pub mod schema;
pub mod status;
pub mod table;

pub use error::{ModelError, Result};
pub use schema::SchemaVersion;
pub use status::CovidStatus;
pub use table::TableKind;

/// Result literal that marks a laboratory observation as invalid.
pub const INVALID_RESULT_SENTINEL: &str = "Issue with result";

/// Returns `false` only when `value` is exactly the invalid-result sentinel.
///
/// Missing values are valid: the sentinel is the only signal of a failed test.
pub fn is_valid_result(value: Option<&str>) -> bool {
    value != Some(INVALID_RESULT_SENTINEL)
}
