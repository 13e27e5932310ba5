//! Error types for extract ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while locating, decoding or parsing extracts.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Directory not found or not a directory.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write file.
    #[error("failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Input Contract Errors ===
    /// One or more configured categories have no file in the input directory.
    #[error("missing from {}: {}", path.display(), categories.join(", "))]
    MissingCategories {
        path: PathBuf,
        categories: Vec<String>,
    },

    // === Decoding Errors ===
    /// Bytes could not be decoded under the detected encoding.
    #[error("failed to decode {path} as {encoding}")]
    Decode {
        path: PathBuf,
        encoding: &'static str,
    },

    // === CSV Parsing Errors ===
    /// Both the strict and the tolerant parser rejected the file.
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// CSV file has no header row.
    #[error("CSV file is empty: {path}")]
    EmptyCsv { path: PathBuf },

    // === DataFrame Errors ===
    /// Failed DataFrame operation.
    #[error("DataFrame operation failed for {path}: {message}")]
    DataFrame { path: PathBuf, message: String },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_categories_display() {
        let err = IngestError::MissingCategories {
            path: PathBuf::from("/data"),
            categories: vec!["People".to_string(), "CritCare".to_string()],
        };
        assert_eq!(err.to_string(), "missing from /data: People, CritCare");
    }

    #[test]
    fn test_parse_error_carries_path() {
        let err = IngestError::CsvParse {
            path: PathBuf::from("/data/LFT.csv"),
            message: "found record with 3 fields".to_string(),
        };
        assert!(err.to_string().contains("/data/LFT.csv"));
    }
}
