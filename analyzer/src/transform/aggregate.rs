//! Lethality aggregation.
//!
//! Per row, in this order:
//!
//! 1. absent component counts become 0
//! 2. component counts are coerced to integers, truncating fractions
//! 3. year and month are coerced the same way
//! 4. `date` is the first day of (year, month)
//! 5. `lethality_total` is the sum of the coerced components

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::error::{AggregateError, AggregateResult};
use crate::logs::log_success;
use crate::models::{row_cell, CleanedRecord, CleanedTable, Table};
use crate::validation::ResolvedSchema;

const STAGE: &str = "aggregate";

/// Cell text that is neither absent nor numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not a number")]
pub struct NotANumber;

/// Parse a numeric cell.
///
/// Blank, `NA`, `NaN` and `null` are absent (`Ok(None)`). Integers parse
/// as-is; decimals are truncated toward zero (`2.9` is 2, `-1.5` is -1).
/// Values outside the i64 range are not numbers.
pub fn parse_number(cell: &str) -> Result<Option<i64>, NotANumber> {
    let s = cell.trim();
    if s.is_empty()
        || s.eq_ignore_ascii_case("na")
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("null")
    {
        return Ok(None);
    }
    if let Ok(v) = s.parse::<i64>() {
        return Ok(Some(v));
    }
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range
    match s.parse::<f64>().map(f64::trunc) {
        Ok(t) if t >= i64::MIN as f64 && t < i64::MAX as f64 => Ok(Some(t as i64)),
        _ => Err(NotANumber),
    }
}

/// First day of (`year`, `month`).
pub fn month_start(year: i64, month: i64) -> Option<NaiveDate> {
    let year = i32::try_from(year).ok()?;
    let month = u32::try_from(month).ok().filter(|m| (1..=12).contains(m))?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Build the cleaned table from filtered rows.
///
/// Only the components in `schema.lethality` are read and summed. Cells
/// missing from short rows are absent. Errors name the source line.
pub fn aggregate(table: &Table, schema: &ResolvedSchema) -> AggregateResult<CleanedTable> {
    let mut records = Vec::with_capacity(table.len());
    let header = |col: usize| table.headers.get(col).map(String::as_str).unwrap_or("");

    for (idx, row) in table.rows.iter().enumerate() {
        let line = table.line(idx);
        let invalid = |column: &str, value: &str| AggregateError::InvalidNumber {
            line,
            column: column.to_string(),
            value: value.to_string(),
        };

        let mut counts = Vec::with_capacity(schema.lethality.len());
        for (name, col) in &schema.lethality {
            let cell = row_cell(row, *col);
            let count = parse_number(cell).map_err(|_| invalid(name.as_str(), cell))?.unwrap_or(0);
            counts.push(count);
        }

        let year_cell = row_cell(row, schema.year);
        let month_cell = row_cell(row, schema.month);
        let year = parse_number(year_cell)
            .ok()
            .flatten()
            .ok_or_else(|| invalid(header(schema.year), year_cell))?;
        let month = parse_number(month_cell)
            .ok()
            .flatten()
            .ok_or_else(|| invalid(header(schema.month), month_cell))?;

        let date = month_start(year, month)
            .ok_or(AggregateError::InvalidCalendarValue { line, year, month })?;

        let lethality_total = counts
            .iter()
            .try_fold(0i64, |acc, c| acc.checked_add(*c))
            .ok_or(AggregateError::TotalOverflow { line })?;
        records.push(CleanedRecord {
            year: date.year(),
            month: date.month(),
            municipality: row_cell(row, schema.municipality).trim().to_string(),
            counts,
            date,
            lethality_total,
        });
    }

    log_success(
        STAGE,
        format!("Aggregated {} rows over {} components", records.len(), schema.lethality.len()),
    );
    Ok(CleanedTable {
        components: schema.lethality_columns(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnNames;
    use crate::validation::resolve_schema;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    const FULL: [&str; 7] = [
        "fmun",
        "ano",
        "mes",
        "hom_doloso",
        "latrocinio",
        "lesao_corp_morte",
        "hom_por_interv_policial",
    ];

    fn run(t: &Table) -> AggregateResult<CleanedTable> {
        let schema = resolve_schema(t, &ColumnNames::default()).unwrap();
        aggregate(t, &schema)
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 12 "), Ok(Some(12)));
        assert_eq!(parse_number("2.9"), Ok(Some(2)));
        assert_eq!(parse_number("-1.5"), Ok(Some(-1)));
        assert_eq!(parse_number(""), Ok(None));
        assert_eq!(parse_number("NaN"), Ok(None));
        assert_eq!(parse_number("NA"), Ok(None));
        assert_eq!(parse_number("abc"), Err(NotANumber));
        assert_eq!(parse_number("inf"), Err(NotANumber));
        assert_eq!(parse_number("99999999999999999999"), Err(NotANumber));
        assert_eq!(parse_number("-9223372036854775808"), Ok(Some(i64::MIN)));
        assert_eq!(parse_number("9.3e18"), Err(NotANumber));
    }

    #[test]
    fn test_huge_count_is_invalid_number() {
        let t = table(&FULL, &[&["Rio", "2024", "1", "99999999999999999999", "5", "0", "0"]]);
        match run(&t).unwrap_err() {
            AggregateError::InvalidNumber { line, column, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, "hom_doloso");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_total_overflow_is_error() {
        let max = i64::MAX.to_string();
        let t = table(&FULL, &[&["Rio", "2024", "1", max.as_str(), "5", "0", "0"]]);
        assert!(matches!(run(&t), Err(AggregateError::TotalOverflow { line: 2 })));
    }

    #[test]
    fn test_short_rows_count_as_absent() {
        let t = table(&FULL, &[&["Rio", "2024", "1", "4"]]);
        let cleaned = run(&t).unwrap();
        assert_eq!(cleaned.records[0].counts, vec![4, 0, 0, 0]);
        assert_eq!(cleaned.records[0].lethality_total, 4);
    }

    #[test]
    fn test_error_names_source_line() {
        let t = Table::with_lines(
            FULL.iter().map(|h| h.to_string()).collect(),
            vec![
                ["Rio", "2024", "1", "1", "1", "1", "1"].iter().map(|c| c.to_string()).collect(),
                ["Rio", "2024", "13", "1", "1", "1", "1"].iter().map(|c| c.to_string()).collect(),
            ],
            vec![40, 812],
        );
        assert!(matches!(
            run(&t),
            Err(AggregateError::InvalidCalendarValue { line: 812, month: 13, .. })
        ));
    }

    #[test]
    fn test_zero_fill_and_total() {
        let t = table(&FULL, &[&[" rio de janeiro ", "2024", "1", "10", "", "2", "3"]]);
        let cleaned = run(&t).unwrap();
        let r = &cleaned.records[0];
        assert_eq!(r.municipality, "rio de janeiro");
        assert_eq!(r.counts, vec![10, 0, 2, 3]);
        assert_eq!(r.lethality_total, 15);
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!((r.year, r.month), (2024, 1));
    }

    #[test]
    fn test_truncation_not_rounding() {
        let t = table(&FULL, &[&["Rio", "2024.0", "3.7", "1.9", "0.5", "2.99", "0"]]);
        let cleaned = run(&t).unwrap();
        let r = &cleaned.records[0];
        assert_eq!(r.counts, vec![1, 0, 2, 0]);
        assert_eq!(r.lethality_total, 3);
        assert_eq!(r.month, 3);
    }

    #[test]
    fn test_total_equals_component_sum() {
        let t = table(
            &FULL,
            &[
                &["Rio", "2024", "1", "5", "1", "0", "4"],
                &["Rio", "2024", "2", "", "", "", ""],
                &["Rio", "2024", "3", "7", "2", "1", "12"],
            ],
        );
        let cleaned = run(&t).unwrap();
        for r in &cleaned.records {
            assert_eq!(r.lethality_total, r.counts.iter().sum::<i64>());
        }
        assert_eq!(cleaned.records[1].lethality_total, 0);
    }

    #[test]
    fn test_pruned_components_only() {
        let t = table(
            &["fmun", "ano", "mes", "hom_doloso", "hom_por_interv_policial"],
            &[&["Rio", "2024", "1", "4", "6"]],
        );
        let cleaned = run(&t).unwrap();
        assert_eq!(cleaned.components, vec!["hom_doloso", "hom_por_interv_policial"]);
        assert_eq!(cleaned.records[0].lethality_total, 10);
    }

    #[test]
    fn test_invalid_month() {
        let t = table(&FULL, &[&["Rio", "2024", "13", "1", "1", "1", "1"]]);
        let err = run(&t).unwrap_err();
        assert!(matches!(err, AggregateError::InvalidCalendarValue { line: 2, month: 13, .. }));

        let t = table(&FULL, &[&["Rio", "2024", "0", "1", "1", "1", "1"]]);
        assert!(matches!(run(&t), Err(AggregateError::InvalidCalendarValue { .. })));
    }

    #[test]
    fn test_non_numeric_count() {
        let t = table(&FULL, &[&["Rio", "2024", "1", "dez", "1", "1", "1"]]);
        match run(&t).unwrap_err() {
            AggregateError::InvalidNumber { column, value, .. } => {
                assert_eq!(column, "hom_doloso");
                assert_eq!(value, "dez");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_blank_month_is_invalid() {
        let t = table(&FULL, &[&["Rio", "2024", "", "1", "1", "1", "1"]]);
        assert!(matches!(run(&t), Err(AggregateError::InvalidNumber { .. })));
    }
}
