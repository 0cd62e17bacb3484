//! High-level pipeline API.
//!
//! [`clean`] runs source → schema → filter → aggregate → sink and stops at
//! the first failure. [`summarize_cleaned`] and [`plot_cleaned`] are
//! independent consumers of the cleaned file written by [`clean`].
//!
//! # Example
//!
//! ```rust,ignore
//! use lethality::{clean, AnalysisConfig};
//!
//! let config = AnalysisConfig::default().validate()?;
//! let outcome = clean(&config)?;
//! println!("{} months written to {}", outcome.cleaned.len(), outcome.output.display());
//! ```

use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use super::aggregate::aggregate;
use super::filter::{filter_municipality, filter_year, latest_complete_year};
use crate::charts;
use crate::config::{AnalysisConfig, TextEncoding, YearSelection};
use crate::error::{PipelineResult, ReportError};
use crate::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::models::{CleanedTable, Table};
use crate::output;
use crate::parser;
use crate::report::{self, Summary};
use crate::validation::resolve_schema;

/// The cleaned file is always `;`-separated UTF-8.
pub const CLEANED_SEPARATOR: u8 = b';';

/// Log a stage failure under `stage` and pass the result through.
fn stage<T, E: Display>(name: &str, result: Result<T, E>) -> Result<T, E> {
    if let Err(ref e) = result {
        log_error(name, format!("Failed: {}", e));
    }
    result
}

/// What a successful clean run produced.
#[derive(Debug, Clone, Serialize)]
pub struct CleanOutcome {
    /// Encoding that decoded the input
    pub encoding: String,
    pub rows_read: usize,
    pub year: i32,
    /// Lethality components actually summed
    pub components: Vec<String>,
    /// Configured components absent from the input
    pub missing_components: Vec<String>,
    pub cleaned: CleanedTable,
    pub output: PathBuf,
}

/// Target year for a municipality-filtered table.
pub fn resolve_year(config: &AnalysisConfig, by_place: &Table) -> PipelineResult<i32> {
    match config.year {
        YearSelection::Fixed(year) => Ok(year),
        YearSelection::LatestComplete => Ok(latest_complete_year(
            by_place,
            &config.columns.year,
            &config.columns.month,
        )?),
    }
}

/// Clean the raw statistics file into the cleaned table and persist it.
///
/// Nothing is written unless every earlier stage succeeds.
pub fn clean(config: &AnalysisConfig) -> PipelineResult<CleanOutcome> {
    let cols = &config.columns;

    log_info("source", "📖 Step 1/5: reading source file");
    let parsed = stage(
        "source",
        parser::load(&config.input_file, config.encoding, config.fallback_encoding, config.separator),
    )?;
    let raw = parsed.table;

    log_info("schema", "📋 Step 2/5: checking columns");
    let schema = stage("schema", resolve_schema(&raw, cols))?;

    log_info("filter", "🔎 Step 3/5: filtering municipality and year");
    let by_place = stage("filter", filter_municipality(&raw, &cols.municipality, &config.municipality))?;
    let year = stage("filter", resolve_year(config, &by_place))?;
    let selected = stage("filter", filter_year(&by_place, &cols.year, year, &config.municipality))?;

    log_info("aggregate", "⚙️  Step 4/5: aggregating lethality");
    let cleaned = stage("aggregate", aggregate(&selected, &schema))?;
    for r in &cleaned.records {
        log_info_indent(
            "aggregate",
            format!("{} {}: {}", r.date, r.municipality, r.lethality_total),
            1,
        );
    }

    log_info("sink", "💾 Step 5/5: saving cleaned data");
    stage(
        "sink",
        output::save(&cleaned, cols, &config.cleaned_file, CLEANED_SEPARATOR),
    )?;
    log_success("sink", format!("Cleaned data saved to {}", config.cleaned_file.display()));

    Ok(CleanOutcome {
        encoding: parsed.encoding,
        rows_read: raw.len(),
        year,
        components: schema.lethality_columns(),
        missing_components: schema.missing_lethality,
        cleaned,
        output: config.cleaned_file.clone(),
    })
}

/// Reload the cleaned file as a [`CleanedTable`].
///
/// Date and total are derived again from the stored year, month and
/// components, so they always satisfy the cleaned-record invariants.
pub fn reload_cleaned(config: &AnalysisConfig) -> PipelineResult<CleanedTable> {
    let parsed = stage(
        "source",
        parser::load(&config.cleaned_file, TextEncoding::Utf8, TextEncoding::Utf8, CLEANED_SEPARATOR),
    )?;
    let schema = stage("schema", resolve_schema(&parsed.table, &config.columns))?;
    Ok(stage("aggregate", aggregate(&parsed.table, &schema))?)
}

/// Year shown by downstream consumers: the year the cleaned records
/// carry, warning when it differs from a fixed configured year.
fn report_year(config: &AnalysisConfig, table: &CleanedTable) -> PipelineResult<i32> {
    match (table.year(), config.year.fixed()) {
        (Some(found), Some(configured)) if found != configured => {
            log_warning(
                "report",
                format!("Cleaned data holds year {}, not the configured {}", found, configured),
            );
            Ok(found)
        }
        (Some(found), _) => Ok(found),
        (None, _) => Err(ReportError::EmptyDataset.into()),
    }
}

/// Summarize the cleaned file, write the text report (and optional JSON).
pub fn summarize_cleaned(config: &AnalysisConfig, json: Option<&Path>) -> PipelineResult<(Summary, String)> {
    log_info("report", "📊 Summarizing cleaned data");
    let table = reload_cleaned(config)?;
    let year = stage("report", report_year(config, &table))?;
    let summary = stage(
        "report",
        report::summarize(&table, &config.municipality, year, &config.source_name()),
    )?;
    let text = report::format_summary(&summary);

    stage("report", output::write_text(&config.summary_file, &text))?;
    log_success("report", format!("Summary saved to {}", config.summary_file.display()));
    if let Some(path) = json {
        stage("report", output::write_json(path, &summary))?;
        log_success("report", format!("Summary JSON saved to {}", path.display()));
    }
    Ok((summary, text))
}

/// Render the four charts from the cleaned file.
pub fn plot_cleaned(config: &AnalysisConfig) -> PipelineResult<Vec<PathBuf>> {
    log_info("charts", "🎨 Rendering charts");
    let table = reload_cleaned(config)?;
    let year = stage("charts", report_year(config, &table))?;
    Ok(stage(
        "charts",
        charts::render_all(&table, &config.municipality, year, &config.plots_dir),
    )?)
}

/// Latest complete year for the configured municipality.
pub fn detect_year(config: &AnalysisConfig) -> PipelineResult<i32> {
    let cols = &config.columns;
    let parsed = stage(
        "source",
        parser::load(&config.input_file, config.encoding, config.fallback_encoding, config.separator),
    )?;
    stage("schema", resolve_schema(&parsed.table, cols))?;
    let by_place = stage(
        "filter",
        filter_municipality(&parsed.table, &cols.municipality, &config.municipality),
    )?;
    Ok(stage(
        "filter",
        latest_complete_year(&by_place, &cols.year, &cols.month),
    )?)
}
