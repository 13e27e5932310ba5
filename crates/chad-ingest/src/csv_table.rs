//! CSV loading with a strict first pass and a tolerant retry.

use std::collections::HashSet;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use polars::prelude::{Column, DataFrame};

use crate::encoding::read_decoded;
use crate::error::{IngestError, Result};

/// Which parser accepted the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Standard RFC 4180 parsing with equal-length records.
    Strict,
    /// Backslash escapes recognised and ragged records padded or truncated.
    Tolerant,
}

/// Raw string table read from one extract file.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub mode: ParseMode,
}

impl CsvTable {
    /// Convert to a DataFrame of nullable string columns.
    ///
    /// Cells are kept byte for byte; only empty cells become null.
    pub fn into_frame(self, path: &Path) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.headers.len());
        for (idx, header) in self.headers.iter().enumerate() {
            let values: Vec<Option<String>> = self
                .rows
                .iter()
                .map(|row| {
                    row.get(idx)
                        .map(|cell| normalize_cell(cell))
                        .filter(|cell| !cell.is_empty())
                })
                .collect();
            columns.push(Column::new(header.as_str().into(), values));
        }
        DataFrame::new(columns).map_err(|e| IngestError::DataFrame {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let mut parts = trimmed.split_whitespace();
    let mut normalized = String::new();
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    normalized
}

fn normalize_cell(raw: &str) -> String {
    raw.strip_prefix('\u{feff}').unwrap_or(raw).to_string()
}

/// Repeated headers get `.1`, `.2`, ... suffixes in order of appearance,
/// skipping any name already taken.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut renamed = 0usize;
    let mut unique = Vec::with_capacity(headers.len());
    for header in headers {
        let mut name = header.clone();
        let mut suffix = 0usize;
        while taken.contains(&name) {
            suffix += 1;
            name = format!("{header}.{suffix}");
        }
        if suffix > 0 {
            renamed += 1;
        }
        taken.insert(name.clone());
        unique.push(name);
    }
    if renamed > 0 {
        tracing::warn!(columns = renamed, "renamed repeated headers");
    }
    unique
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|value| value.trim().is_empty())
}

type ParsedRows = (Vec<String>, Vec<Vec<String>>);

fn parse(text: &str, mode: ParseMode) -> std::result::Result<ParsedRows, csv::Error> {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true);
    match mode {
        ParseMode::Strict => {
            builder.flexible(false);
        }
        ParseMode::Tolerant => {
            builder.flexible(true).escape(Some(b'\\')).quote(b'"');
        }
    }
    let mut reader = builder.from_reader(text.as_bytes());
    let headers = dedupe_headers(reader.headers()?.iter().map(normalize_header).collect());
    let width = headers.len();
    let mut rows = Vec::new();
    let mut reshaped = 0usize;
    for record in reader.records() {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.len() != width {
            reshaped += 1;
            row.resize(width, String::new());
        }
        rows.push(row);
    }
    if reshaped > 0 {
        tracing::warn!(
            rows = reshaped,
            columns = width,
            "padded or truncated ragged records"
        );
    }
    Ok((headers, rows))
}

/// Read a CSV extract into a raw string table.
///
/// The file is decoded with the detected encoding, then parsed strictly. If
/// the strict parse fails it is retried with the tolerant parser; only a
/// second failure is surfaced.
pub fn read_csv_table(path: &Path) -> Result<CsvTable> {
    let decoded = read_decoded(path)?;
    let (headers, rows, mode) = match parse(&decoded.text, ParseMode::Strict) {
        Ok((headers, rows)) => (headers, rows, ParseMode::Strict),
        Err(strict_error) => {
            tracing::warn!(
                path = %path.display(),
                error = %strict_error,
                "strict CSV parse failed, retrying with tolerant parser"
            );
            let (headers, rows) =
                parse(&decoded.text, ParseMode::Tolerant).map_err(|e| IngestError::CsvParse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            (headers, rows, ParseMode::Tolerant)
        }
    };
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(IngestError::EmptyCsv {
            path: path.to_path_buf(),
        });
    }
    Ok(CsvTable {
        headers,
        rows,
        mode,
    })
}

/// Read a CSV extract straight into a DataFrame of nullable string columns.
pub fn read_csv_frame(path: &Path) -> Result<DataFrame> {
    let table = read_csv_table(path)?;
    tracing::debug!(
        path = %path.display(),
        rows = table.rows.len(),
        columns = table.headers.len(),
        mode = ?table.mode,
        "read extract"
    );
    table.into_frame(path)
}
