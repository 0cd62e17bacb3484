//! Domain models for the lethality pipeline.
//!
//! - [`Table`] - raw delimited table, every cell kept as text
//! - [`CleanedRecord`] - one municipality-month with typed counts
//! - [`CleanedTable`] - cleaned records plus the components they carry
//! - [`ComponentSummary`] - one lethality component's share of the total
//! - [`MonthlyTotal`] - lethality total for one month

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::ColumnNames;

// =============================================================================
// Raw Table
// =============================================================================

/// A delimited file held in memory. An empty or missing cell means the
/// value is absent. `lines` holds the 1-based source line of each row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub lines: Vec<usize>,
}

/// Cell `col` of `row`, empty when the row is short.
pub fn row_cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

impl Table {
    /// Rows numbered as if read from a file with one header line.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let lines = (0..rows.len()).map(|i| i + 2).collect();
        Self { headers, rows, lines }
    }

    pub fn with_lines(headers: Vec<String>, rows: Vec<Vec<String>>, lines: Vec<usize>) -> Self {
        Self { headers, rows, lines }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at (`row`, `col`), empty when the row is short.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows.get(row).map(|r| row_cell(r, col)).unwrap_or("")
    }

    /// Source line of `row`.
    pub fn line(&self, row: usize) -> usize {
        self.lines.get(row).copied().unwrap_or(row + 2)
    }

    /// New table with the rows for which `keep` returns true. Source line
    /// numbers travel with their rows.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[String]) -> bool,
    {
        let (rows, lines): (Vec<Vec<String>>, Vec<usize>) = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| keep(r.as_slice()))
            .map(|(i, r)| (r.clone(), self.line(i)))
            .unzip();
        Table {
            headers: self.headers.clone(),
            rows,
            lines,
        }
    }
}

// =============================================================================
// Cleaned Records
// =============================================================================

/// One cleaned municipality-month.
///
/// `counts` is parallel to [`CleanedTable::components`] and
/// `lethality_total` is always their sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanedRecord {
    pub year: i32,
    pub month: u32,
    pub municipality: String,
    pub counts: Vec<i64>,
    /// First day of (year, month).
    pub date: NaiveDate,
    pub lethality_total: i64,
}

/// Output of the aggregation stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CleanedTable {
    /// Lethality components present in the source, in configured order.
    pub components: Vec<String>,
    pub records: Vec<CleanedRecord>,
}

impl CleanedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Year of the cleaned slice, taken from the first record.
    pub fn year(&self) -> Option<i32> {
        self.records.first().map(|r| r.year)
    }

    /// Sum of all record totals, `None` on i64 overflow.
    pub fn grand_total(&self) -> Option<i64> {
        self.records
            .iter()
            .try_fold(0i64, |acc, r| acc.checked_add(r.lethality_total))
    }

    /// Header row of the persisted form.
    pub fn headers(&self, columns: &ColumnNames) -> Vec<String> {
        let mut headers = vec![
            columns.year.clone(),
            columns.month.clone(),
            columns.municipality.clone(),
        ];
        headers.extend(self.components.iter().cloned());
        headers.push(columns.date.clone());
        headers.push(columns.total.clone());
        headers
    }

    /// Render as a raw [`Table`] in persisted column order.
    pub fn to_table(&self, columns: &ColumnNames) -> Table {
        let rows = self
            .records
            .iter()
            .map(|r| {
                let mut row = vec![r.year.to_string(), r.month.to_string(), r.municipality.clone()];
                row.extend(r.counts.iter().map(|c| c.to_string()));
                row.push(r.date.format("%Y-%m-%d").to_string());
                row.push(r.lethality_total.to_string());
                row
            })
            .collect();
        Table::new(self.headers(columns), rows)
    }
}

// =============================================================================
// Summary Models
// =============================================================================

/// One lethality component's contribution to the grand total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSummary {
    pub name: String,
    pub total: i64,
    /// Share of the grand total, rounded to 2 decimals.
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyTotal {
    pub month: u32,
    pub total: i64,
}
