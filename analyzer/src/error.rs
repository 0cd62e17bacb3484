//! Error types for the lethality analysis pipeline.
//!
//! One error enum per stage, each convertible into the top-level
//! [`PipelineError`]:
//!
//! - [`SourceError`] - reading the raw statistics file
//! - [`SchemaError`] - required columns missing
//! - [`FilterError`] - municipality/year selection produced nothing
//! - [`AggregateError`] - count coercion and date derivation
//! - [`SinkError`] - writing output files
//! - [`ReportError`] - summary statistics
//! - [`ChartError`] - chart rendering
//! - [`ConfigError`] - configuration loading
//!
//! Conversion is automatic via `From`, so `?` works across stages.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Source Errors
// =============================================================================

/// Errors while loading a delimited file into a [`crate::models::Table`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// The input path does not exist.
    #[error("Source file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Neither the primary nor the fallback encoding produced a table.
    #[error(
        "Cannot read {}: {primary_encoding} failed ({primary_error}); {fallback_encoding} failed ({fallback_error})",
        path.display()
    )]
    Unreadable {
        path: PathBuf,
        primary_encoding: String,
        primary_error: String,
        fallback_encoding: String,
        fallback_error: String,
    },
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Fatal schema problems. Missing lethality components alone are not fatal.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A column needed to filter or date the rows is absent.
    #[error("Incompatible schema: missing {missing:?} (available columns: {available:?})")]
    Incompatible {
        missing: Vec<String>,
        available: Vec<String>,
    },
}

// =============================================================================
// Filter Errors
// =============================================================================

/// Row selection produced an empty table.
#[derive(Debug, Error)]
pub enum FilterError {
    /// No row matched the target municipality.
    #[error("No rows for municipality '{municipality}' in column '{column}'")]
    EmptyMunicipality { column: String, municipality: String },

    /// Rows exist for the municipality but none for the target year.
    #[error("No rows for year {year} in column '{column}' (municipality '{municipality}')")]
    EmptyYear {
        column: String,
        year: i32,
        municipality: String,
    },

    /// Latest-complete-year detection found no parseable year.
    #[error("Cannot detect a target year: column '{column}' has no numeric values")]
    NoCompleteYear { column: String },
}

// =============================================================================
// Aggregation Errors
// =============================================================================

/// Errors while coercing counts and deriving the date column.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Month outside 1-12 (or a year chrono cannot represent).
    #[error("Line {line}: invalid calendar value year={year}, month={month}")]
    InvalidCalendarValue { line: usize, year: i64, month: i64 },

    /// A cell that is neither absent nor numeric, or outside the i64 range.
    #[error("Line {line}, column '{column}': '{value}' is not a number")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
    },

    /// The lethality total of one row does not fit in an i64.
    #[error("Line {line}: lethality total overflows")]
    TotalOverflow { line: usize },
}

// =============================================================================
// Sink Errors
// =============================================================================

/// Errors while writing output files.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Any I/O or serialization failure while writing `path`.
    #[error("Cannot write {}: {message}", path.display())]
    WriteError { path: PathBuf, message: String },
}

impl SinkError {
    pub fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::WriteError {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Report Errors
// =============================================================================

/// Errors computing the summary.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Nothing to summarize.
    #[error("Cannot summarize an empty dataset")]
    EmptyDataset,

    /// The grand total does not fit in an i64.
    #[error("Grand total overflows")]
    TotalOverflow,
}

// =============================================================================
// Chart Errors
// =============================================================================

/// Errors rendering charts.
#[derive(Debug, Error)]
pub enum ChartError {
    /// Nothing to plot.
    #[error("Cannot plot an empty dataset")]
    EmptyDataset,

    /// The grand total does not fit in an i64.
    #[error("Grand total overflows")]
    TotalOverflow,

    /// The plotting backend rejected a drawing operation.
    #[error("Cannot render {chart}: {message}")]
    Render { chart: String, message: String },

    /// Writing a chart file failed.
    #[error(transparent)]
    Write(#[from] SinkError),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for [`crate::config::ConfigFile`].
    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Config values are inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level error returned by the pipeline entry points.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Aggregation error: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("Write error: {0}")]
    Sink(#[from] SinkError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// True for "the filters matched nothing" outcomes, which the CLI
    /// reports with a distinct exit status.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, PipelineError::Filter(_))
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        if self.is_empty_result() {
            2
        } else {
            1
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type SourceResult<T> = Result<T, SourceError>;
pub type SchemaResult<T> = Result<T, SchemaError>;
pub type FilterResult<T> = Result<T, FilterError>;
pub type AggregateResult<T> = Result<T, AggregateError>;
pub type SinkResult<T> = Result<T, SinkError>;
pub type ReportResult<T> = Result<T, ReportError>;
pub type ChartResult<T> = Result<T, ChartError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type PipelineResult<T> = Result<T, PipelineError>;
