//! Column-presence validation.
//!
//! [`validate`] is advisory: it splits the required columns into present
//! and missing. [`resolve_schema`] applies the pipeline's rules on top:
//!
//! - municipality, year and month columns must all exist
//! - at least one lethality component must exist
//! - missing components are dropped, and the pruned list is what every
//!   later stage sums and reports

use crate::config::ColumnNames;
use crate::error::{SchemaError, SchemaResult};
use crate::logs::{log_success, log_warning};
use crate::models::Table;

const STAGE: &str = "schema";

/// Required columns split by presence, each in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReport {
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl SchemaReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Check which of `required` exist in `table`. Never fails.
pub fn validate(table: &Table, required: &[String]) -> SchemaReport {
    let (present, missing): (Vec<String>, Vec<String>) = required
        .iter()
        .cloned()
        .partition(|col| table.has_column(col));
    SchemaReport { present, missing }
}

/// Column positions the filter and aggregation stages work with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub municipality: usize,
    pub year: usize,
    pub month: usize,
    /// Present lethality components and their positions, configured order.
    pub lethality: Vec<(String, usize)>,
    /// Configured components absent from the table
    pub missing_lethality: Vec<String>,
}

impl ResolvedSchema {
    /// The pruned component list.
    pub fn lethality_columns(&self) -> Vec<String> {
        self.lethality.iter().map(|(name, _)| name.clone()).collect()
    }
}

/// Resolve the working columns of `table`, or fail if a key column (or
/// every lethality component) is absent.
pub fn resolve_schema(table: &Table, columns: &ColumnNames) -> SchemaResult<ResolvedSchema> {
    let key_report = validate(table, &columns.key_columns());
    if !key_report.is_complete() {
        return Err(SchemaError::Incompatible {
            missing: key_report.missing,
            available: table.headers.clone(),
        });
    }

    let lethality_report = validate(table, &columns.lethality);
    if !lethality_report.missing.is_empty() {
        log_warning(
            STAGE,
            format!("Lethality columns not found: {:?}", lethality_report.missing),
        );
    }
    if lethality_report.present.is_empty() {
        return Err(SchemaError::Incompatible {
            missing: lethality_report.missing,
            available: table.headers.clone(),
        });
    }

    let position = |name: &str| table.column_index(name).unwrap_or_default();
    let lethality: Vec<(String, usize)> = lethality_report
        .present
        .iter()
        .map(|name| (name.clone(), position(name)))
        .collect();

    log_success(
        STAGE,
        format!("Using lethality columns: {}", lethality_report.present.join(", ")),
    );

    Ok(ResolvedSchema {
        municipality: position(&columns.municipality),
        year: position(&columns.year),
        month: position(&columns.month),
        lethality,
        missing_lethality: lethality_report.missing,
    })
}
