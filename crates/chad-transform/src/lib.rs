//! Category transforms for the CHAD extract database.
//!
//! This crate turns raw category DataFrames into rows of the destination
//! tables:
//!
//! - **datetime**: day-first timestamp normalization, parallel over a column
//! - **extract**: capture of sample type and result from narrative text
//! - **rules**: the declarative per-table rule format
//! - **apply**: rule interpretation (melt, free text, pass-through)
//! - **status**: COVID-19 status and death derivation per patient

pub mod apply;
pub mod datetime;
pub mod error;
pub mod extract;
pub mod frame;
pub mod rules;
pub mod status;

// === Error Types ===
pub use error::{Result, TransformError};

// === Rules ===
pub use apply::{CompiledRule, TransformContext};
pub use rules::{ExtractionRule, Shape, TableRule, TimestampRule};

// === Normalization ===
pub use datetime::{normalize_datetime, normalize_values, parse_instant};

// === Status Derivation ===
pub use status::{
    CovidFinding, CovidObservation, PatientStatus, StatusIndex, StatusRule, derive_covid_status,
    is_deceased,
};
