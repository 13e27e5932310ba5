//! Input directory discovery.
//!
//! An input directory holds one extract per category, named
//! `<Category>.<ext>`. The file stem is the category name.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;

use crate::csv_table::read_csv_frame;
use crate::error::{IngestError, Result};

/// Extensions accepted as delimited extracts, in order of preference.
const EXTRACT_EXTENSIONS: [&str; 2] = ["csv", "txt"];

fn extension_rank(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?;
    EXTRACT_EXTENSIONS
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(ext))
}

fn category_of(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|stem| stem.to_str())
}

/// Lists all extract files in a directory.
///
/// Returns files sorted by filename.
pub fn list_extract_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && extension_rank(&path).is_some() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Category names present in `dir`.
pub fn available_categories(dir: &Path) -> Result<BTreeSet<String>> {
    Ok(list_extract_files(dir)?
        .iter()
        .filter_map(|path| category_of(path))
        .map(str::to_string)
        .collect())
}

/// Required categories with no file in `dir`, in the order given.
pub fn missing_categories<I, S>(dir: &Path, required: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let present = available_categories(dir)?;
    let mut missing: Vec<String> = Vec::new();
    for category in required {
        let category = category.as_ref();
        if !present.contains(category) && !missing.iter().any(|m| m == category) {
            missing.push(category.to_string());
        }
    }
    Ok(missing)
}

/// Fail with [`IngestError::MissingCategories`] unless every category has a file.
pub fn ensure_categories_present<I, S>(dir: &Path, required: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let missing = missing_categories(dir, required)?;
    if missing.is_empty() {
        return Ok(());
    }
    tracing::error!(
        path = %dir.display(),
        missing = missing.len(),
        "input directory is missing required categories"
    );
    Err(IngestError::MissingCategories {
        path: dir.to_path_buf(),
        categories: missing,
    })
}

/// Path of the extract for `category`. A `.csv` file wins over `.txt`.
pub fn category_path(dir: &Path, category: &str) -> Result<PathBuf> {
    list_extract_files(dir)?
        .into_iter()
        .filter(|path| category_of(path) == Some(category))
        .min_by_key(|path| extension_rank(path))
        .ok_or_else(|| IngestError::MissingCategories {
            path: dir.to_path_buf(),
            categories: vec![category.to_string()],
        })
}

/// Read the extract for `category` into a DataFrame of string columns.
pub fn read_category(dir: &Path, category: &str) -> Result<DataFrame> {
    let path = category_path(dir, category)?;
    read_csv_frame(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str, contents: &str) {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn test_lists_extracts_sorted() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "People.csv", "PATIENT_ID\n1\n");
        touch(&dir, "LFT.CSV", "PATIENT_ID\n1\n");
        touch(&dir, "notes.md", "ignore me");
        std::fs::create_dir(dir.path().join("consolidated")).unwrap();

        let files = list_extract_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["LFT.CSV", "People.csv"]);
    }

    #[test]
    fn test_missing_directory() {
        let result = list_extract_files(Path::new("/nonexistent/extracts"));
        assert!(matches!(result, Err(IngestError::DirectoryNotFound { .. })));
    }

    #[test]
    fn test_missing_categories_preserve_request_order() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "People.csv", "PATIENT_ID\n1\n");
        let missing =
            missing_categories(dir.path(), ["Outcomes", "People", "CRP", "Outcomes"]).unwrap();
        assert_eq!(missing, vec!["Outcomes", "CRP"]);
    }

    #[test]
    fn test_ensure_categories_present() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "People.csv", "PATIENT_ID\n1\n");
        assert!(ensure_categories_present(dir.path(), ["People"]).is_ok());
        let err = ensure_categories_present(dir.path(), ["People", "TestUnits"]).unwrap_err();
        match err {
            IngestError::MissingCategories { categories, .. } => {
                assert_eq!(categories, vec!["TestUnits"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_csv_preferred_over_txt() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "CRP.txt", "PATIENT_ID\n1\n");
        touch(&dir, "CRP.csv", "PATIENT_ID,CRP\n1,4\n");
        let path = category_path(dir.path(), "CRP").unwrap();
        assert_eq!(path.extension().unwrap(), "csv");
        let df = read_category(dir.path(), "CRP").unwrap();
        assert_eq!(df.width(), 2);
    }
}
