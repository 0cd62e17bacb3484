//! Row selection by municipality and year.
//!
//! Municipality first, then year: each is its own empty-result
//! checkpoint. Municipality matching trims and ignores case on both sides;
//! year matching is exact integer equality (`2024.0` matches 2024,
//! `2024.9` does not).

use std::collections::HashSet;

use crate::error::{FilterError, FilterResult};
use crate::logs::log_success;
use crate::models::{row_cell, Table};

const STAGE: &str = "filter";

fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Cell value when it is a whole number, with or without a `.0` fraction.
fn exact_integer(cell: &str) -> Option<i64> {
    let s = cell.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then(|| f as i64)
}

/// Rows whose `column` equals `municipality`, ignoring case and
/// surrounding whitespace.
pub fn filter_municipality(table: &Table, column: &str, municipality: &str) -> FilterResult<Table> {
    let target = normalize(municipality);
    let filtered = match table.column_index(column) {
        Some(idx) => table.filter_rows(|row| normalize(row_cell(row, idx)) == target),
        None => Table::new(table.headers.clone(), Vec::new()),
    };

    if filtered.is_empty() {
        return Err(FilterError::EmptyMunicipality {
            column: column.to_string(),
            municipality: municipality.to_string(),
        });
    }
    log_success(
        STAGE,
        format!("Municipality '{}': {} of {} rows", municipality, filtered.len(), table.len()),
    );
    Ok(filtered)
}

/// Rows whose `column` parses to `year`. `municipality` only labels the error.
pub fn filter_year(table: &Table, column: &str, year: i32, municipality: &str) -> FilterResult<Table> {
    let target = i64::from(year);
    let filtered = match table.column_index(column) {
        Some(idx) => table.filter_rows(|row| exact_integer(row_cell(row, idx)) == Some(target)),
        None => Table::new(table.headers.clone(), Vec::new()),
    };

    if filtered.is_empty() {
        return Err(FilterError::EmptyYear {
            column: column.to_string(),
            year,
            municipality: municipality.to_string(),
        });
    }
    log_success(STAGE, format!("Year {}: {} rows", year, filtered.len()));
    Ok(filtered)
}

/// Municipality filter followed by year filter.
pub fn filter(
    table: &Table,
    municipality_column: &str,
    municipality: &str,
    year_column: &str,
    year: i32,
) -> FilterResult<Table> {
    let by_place = filter_municipality(table, municipality_column, municipality)?;
    filter_year(&by_place, year_column, year, municipality)
}

/// Latest year whose 12 months are all present, assuming at most the
/// newest year is partial: the max year if complete, else the one before.
/// Only month values 1-12 count toward completeness.
pub fn latest_complete_year(table: &Table, year_column: &str, month_column: &str) -> FilterResult<i32> {
    let no_year = || FilterError::NoCompleteYear { column: year_column.to_string() };
    let year_idx = table.column_index(year_column).ok_or_else(no_year)?;
    let month_idx = table.column_index(month_column);

    let latest = table
        .rows
        .iter()
        .filter_map(|row| exact_integer(row_cell(row, year_idx)))
        .max()
        .ok_or_else(no_year)?;

    let months: HashSet<i64> = match month_idx {
        Some(m) => table
            .rows
            .iter()
            .filter(|row| exact_integer(row_cell(row, year_idx)) == Some(latest))
            .filter_map(|row| exact_integer(row_cell(row, m)))
            .filter(|month| (1..=12).contains(month))
            .collect(),
        None => HashSet::new(),
    };

    let chosen = if months.len() < 12 { latest - 1 } else { latest };
    let chosen = i32::try_from(chosen).map_err(|_| no_year())?;
    if i64::from(chosen) != latest {
        log_success(
            STAGE,
            format!("Latest year {} has {} months; using {}", latest, months.len(), chosen),
        );
    } else {
        log_success(STAGE, format!("Latest year {} is complete", latest));
    }
    Ok(chosen)
}
