//! Merge split extracts into one file per category.
//!
//! Large categories are delivered in parts (`LFT-1.csv`, `LFT-2.csv`, ...).
//! Consolidation concatenates the parts of each category into
//! `<write_dir>/consolidated/<Category>.csv`, which is the layout the
//! build step expects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;

use crate::csv_table::{CsvTable, read_csv_table};
use crate::discovery::list_extract_files;
use crate::error::{IngestError, Result};

/// Name of the directory created under the write directory.
pub const CONSOLIDATED_DIR: &str = "consolidated";

/// Outcome of consolidating one category.
#[derive(Debug, Clone)]
pub struct ConsolidatedCategory {
    pub category: String,
    /// Number of part files merged.
    pub parts: usize,
    /// Data rows written.
    pub rows: usize,
    pub path: PathBuf,
}

/// Category name of a (possibly split) file stem: everything before the first `-`.
pub fn split_category(stem: &str) -> &str {
    stem.split_once('-').map_or(stem, |(category, _)| category)
}

/// Delivery number of a split part: the trailing `-<n>` of the stem.
/// Unnumbered parts sort first.
pub fn part_number(stem: &str) -> Option<u64> {
    let (_, rest) = stem.split_once('-')?;
    rest.rsplit('-').next()?.parse().ok()
}

fn part_key(path: &Path) -> (Option<u64>, String) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    (part_number(stem), stem.to_string())
}

/// Headers of all parts, in first-seen order.
fn union_headers(tables: &[CsvTable]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for table in tables {
        for header in &table.headers {
            if !headers.contains(header) {
                headers.push(header.clone());
            }
        }
    }
    headers
}

fn write_category(path: &Path, tables: &[CsvTable]) -> Result<usize> {
    let headers = union_headers(tables);
    let write_err = |e: csv::Error| IngestError::FileWrite {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    };

    let mut writer = WriterBuilder::new().from_path(path).map_err(write_err)?;
    writer.write_record(&headers).map_err(write_err)?;

    let mut rows = 0usize;
    for table in tables {
        let positions: Vec<Option<usize>> = headers
            .iter()
            .map(|header| table.headers.iter().position(|h| h == header))
            .collect();
        for row in &table.rows {
            let record = positions
                .iter()
                .map(|pos| pos.and_then(|idx| row.get(idx)).map_or("", String::as_str));
            writer.write_record(record).map_err(write_err)?;
            rows += 1;
        }
    }
    writer.flush().map_err(|source| IngestError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(rows)
}

/// Consolidate every extract in `read_dir` into `<write_dir>/consolidated`.
///
/// Parts are merged in delivery order (`LFT-2` before `LFT-10`). A part whose header differs from the
/// others contributes its columns to the union; missing cells are written empty.
pub fn consolidate(read_dir: &Path, write_dir: &Path) -> Result<Vec<ConsolidatedCategory>> {
    let files = list_extract_files(read_dir)?;

    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        groups
            .entry(split_category(stem).to_string())
            .or_default()
            .push(path);
    }

    let out_dir = write_dir.join(CONSOLIDATED_DIR);
    std::fs::create_dir_all(&out_dir).map_err(|source| IngestError::FileWrite {
        path: out_dir.clone(),
        source,
    })?;

    let mut summary = Vec::with_capacity(groups.len());
    for (category, mut parts) in groups {
        parts.sort_by_cached_key(|path| part_key(path));
        let tables = parts
            .iter()
            .map(|path| read_csv_table(path))
            .collect::<Result<Vec<_>>>()?;
        let path = out_dir.join(format!("{category}.csv"));
        let rows = write_category(&path, &tables)?;
        tracing::info!(
            category = %category,
            parts = parts.len(),
            rows,
            "consolidated category"
        );
        summary.push(ConsolidatedCategory {
            category,
            parts: parts.len(),
            rows,
            path,
        });
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_category() {
        assert_eq!(split_category("LFT-1"), "LFT");
        assert_eq!(split_category("Covid19-PCR-2"), "Covid19");
        assert_eq!(split_category("People"), "People");
    }

    #[test]
    fn test_part_number() {
        assert_eq!(part_number("LFT-10"), Some(10));
        assert_eq!(part_number("Covid19-PCR-2"), Some(2));
        assert_eq!(part_number("LFT-extra"), None);
        assert_eq!(part_number("People"), None);
    }

    #[test]
    fn test_parts_merge_in_delivery_order() {
        let read = TempDir::new().unwrap();
        let write = TempDir::new().unwrap();
        for part in [10, 2, 1] {
            std::fs::write(
                read.path().join(format!("LFT-{part}.csv")),
                format!("PATIENT_ID,ALT\n{part},30\n"),
            )
            .unwrap();
        }

        let summary = consolidate(read.path(), write.path()).unwrap();
        assert_eq!(summary[0].parts, 3);
        let written = std::fs::read_to_string(write.path().join("consolidated/LFT.csv")).unwrap();
        assert_eq!(written, "PATIENT_ID,ALT\n1,30\n2,30\n10,30\n");
    }

    #[test]
    fn test_consolidate_merges_parts() {
        let read = TempDir::new().unwrap();
        let write = TempDir::new().unwrap();
        std::fs::write(read.path().join("LFT-1.csv"), "PATIENT_ID,ALT\n1,30\n").unwrap();
        std::fs::write(read.path().join("LFT-2.csv"), "PATIENT_ID,ALT,AST\n2,41,12\n").unwrap();
        std::fs::write(read.path().join("People.csv"), "PATIENT_ID\n1\n2\n").unwrap();

        let summary = consolidate(read.path(), write.path()).unwrap();
        assert_eq!(summary.len(), 2);
        let lft = &summary[0];
        assert_eq!(lft.category, "LFT");
        assert_eq!(lft.parts, 2);
        assert_eq!(lft.rows, 2);

        let written = std::fs::read_to_string(write.path().join("consolidated/LFT.csv")).unwrap();
        assert_eq!(written, "PATIENT_ID,ALT,AST\n1,30,\n2,41,12\n");
    }
}
