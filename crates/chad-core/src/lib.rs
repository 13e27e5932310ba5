//! Configuration and orchestration of the CHAD database build.
//!
//! - [`config`]: the immutable [`PipelineConfig`] and its embedded defaults
//! - [`populate`]: the pre-check, population and index phases

pub mod config;
pub mod error;
pub mod populate;

pub use config::PipelineConfig;
pub use error::{ConfigError, PopulateError, Result};
pub use populate::{BuildOptions, BuildSummary, Populate, TableSummary, build};
