//! Output writers.
//!
//! The cleaned table is written as UTF-8 delimited text; reports as UTF-8
//! text or pretty JSON. Parent directories are created as needed and every
//! failure surfaces as [`SinkError::WriteError`] naming the path.

use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::ColumnNames;
use crate::error::{SinkError, SinkResult};
use crate::models::{CleanedTable, Table};

/// Create the parent directory of `path` if it has one.
pub fn ensure_parent(path: &Path) -> SinkResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| SinkError::write(path, e))
        }
        _ => Ok(()),
    }
}

/// Write a raw table as delimited UTF-8 text.
pub fn write_table(table: &Table, path: &Path, delimiter: u8) -> SinkResult<()> {
    ensure_parent(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| SinkError::write(path, e))?;

    wtr.write_record(&table.headers)
        .map_err(|e| SinkError::write(path, e))?;
    for row in &table.rows {
        wtr.write_record(row).map_err(|e| SinkError::write(path, e))?;
    }
    wtr.flush().map_err(|e| SinkError::write(path, e))?;
    Ok(())
}

/// Persist the cleaned table.
pub fn save(table: &CleanedTable, columns: &ColumnNames, path: &Path, delimiter: u8) -> SinkResult<()> {
    write_table(&table.to_table(columns), path, delimiter)
}

pub fn write_text(path: &Path, content: &str) -> SinkResult<()> {
    ensure_parent(path)?;
    let mut file = fs::File::create(path).map_err(|e| SinkError::write(path, e))?;
    file.write_all(content.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| SinkError::write(path, e))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> SinkResult<()> {
    let s = serde_json::to_string_pretty(value).map_err(|e| SinkError::write(path, e))?;
    write_text(path, &s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TextEncoding;
    use crate::models::CleanedRecord;
    use crate::parser;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn cleaned() -> CleanedTable {
        CleanedTable {
            components: vec!["hom_doloso".into(), "latrocinio".into()],
            records: vec![
                CleanedRecord {
                    year: 2024,
                    month: 1,
                    municipality: "Rio de Janeiro".into(),
                    counts: vec![10, 0],
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    lethality_total: 10,
                },
                CleanedRecord {
                    year: 2024,
                    month: 2,
                    municipality: "Rio de Janeiro".into(),
                    counts: vec![4, 1],
                    date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                    lethality_total: 5,
                },
            ],
        }
    }

    #[test]
    fn test_save_creates_parent_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/data/cleaned.csv");
        let columns = ColumnNames::default();
        let table = cleaned();

        save(&table, &columns, &path, b';').unwrap();

        let reloaded = parser::load(&path, TextEncoding::Utf8, TextEncoding::Utf8, b';').unwrap();
        assert_eq!(reloaded.table, table.to_table(&columns));
        assert_eq!(reloaded.table.len(), 2);
    }

    #[test]
    fn test_written_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        save(&cleaned(), &ColumnNames::default(), &path, b';').unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "ano;mes;fmun;hom_doloso;latrocinio;date;letalidade_violenta"
        );
        assert_eq!(lines.next().unwrap(), "2024;1;Rio de Janeiro;10;0;2024-01-01;10");
    }

    #[test]
    fn test_write_error_names_path() {
        let dir = tempdir().unwrap();
        // A directory where the file should be
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();
        let err = write_text(&path, "x").unwrap_err();
        assert!(err.to_string().contains("taken"));
    }

    #[test]
    fn test_write_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_json(&path, &serde_json::json!({ "total": 20 })).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total"], 20);
    }
}
