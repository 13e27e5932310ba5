//! Clinical extract ingestion.
//!
//! This crate turns the per-category extract files of an input directory
//! into Polars DataFrames.
//!
//! # Features
//!
//! - **Encoding detection**: BOM sniffing, UTF-8 validation, Windows-1252 fallback
//! - **CSV loading**: strict parse first, tolerant parse (backslash escapes,
//!   ragged rows) on failure
//! - **Category discovery**: map `<Category>.<ext>` files to category names and
//!   report which configured categories are missing
//! - **Consolidation**: merge split extracts (`LFT-1.csv`, `LFT-2.csv`) into one
//!   file per category
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use chad_ingest::{ensure_categories_present, read_category};
//!
//! let data_dir = Path::new("data/consolidated");
//! ensure_categories_present(data_dir, ["People", "Outcomes"])?;
//! let people = read_category(data_dir, "People")?;
//! ```

mod consolidate;
mod csv_table;
mod discovery;
mod encoding;
mod error;

// === Error Types ===
pub use error::{IngestError, Result};

// === Encoding ===
pub use encoding::{DecodedText, decode_bytes, read_decoded};

// === CSV Reading ===
pub use csv_table::{CsvTable, ParseMode, read_csv_frame, read_csv_table};

// === Category Discovery ===
pub use discovery::{
    available_categories, category_path, ensure_categories_present, list_extract_files,
    missing_categories, read_category,
};

// === Consolidation ===
pub use consolidate::{
    CONSOLIDATED_DIR, ConsolidatedCategory, consolidate, part_number, split_category,
};
