//! # Lethality - ISP-RJ violent lethality analysis
//!
//! Reads the ISP-RJ municipal monthly crime statistics, keeps one
//! municipality and year, derives the violent lethality total per month,
//! and produces a cleaned file, a Portuguese text summary and SVG charts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │   Source    │──▶│   Schema    │──▶│   Filter    │──▶│  Aggregate  │──▶│    Sink     │
//! │ (latin1/UTF8)│  │ (columns)   │   │ (mun, year) │   │ (date, sum) │   │ (cleaned ;) │
//! └─────────────┘   └─────────────┘   └─────────────┘   └─────────────┘   └──────┬──────┘
//!                                                                                │
//!                                                         ┌──────────────┬───────┘
//!                                                         ▼              ▼
//!                                                   ┌──────────┐   ┌──────────┐
//!                                                   │  Report  │   │  Charts  │
//!                                                   └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lethality::{clean, summarize_cleaned, AnalysisConfig};
//!
//! let config = AnalysisConfig::default().validate()?;
//! clean(&config)?;
//! let (_, text) = summarize_cleaned(&config, None)?;
//! println!("{}", text);
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Run configuration and defaults
//! - [`error`] - Per-stage error types
//! - [`logs`] - Stage-tagged log lines
//! - [`models`] - Raw and cleaned tables
//! - [`parser`] - Delimited file loading with encoding fallback
//! - [`validation`] - Column presence checks
//! - [`transform`] - Filter, aggregation and pipeline
//! - [`output`] - File writers
//! - [`report`] - Summary statistics and text layout
//! - [`charts`] - SVG chart rendering

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Stages
pub mod parser;
pub mod validation;
pub mod transform;
pub mod output;

// Consumers
pub mod report;
pub mod charts;

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::{AnalysisConfig, ColumnNames, ConfigFile, TextEncoding, YearSelection};

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AggregateError,
    ChartError,
    ConfigError,
    FilterError,
    PipelineError,
    PipelineResult,
    ReportError,
    SchemaError,
    SinkError,
    SourceError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CleanedRecord, CleanedTable, ComponentSummary, MonthlyTotal, Table};

// =============================================================================
// Re-exports - Stages
// =============================================================================

pub use parser::{load, ParseResult};
pub use validation::{resolve_schema, validate, ResolvedSchema, SchemaReport};
pub use transform::{aggregate, filter, filter_municipality, filter_year, latest_complete_year};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    clean,
    detect_year,
    plot_cleaned,
    reload_cleaned,
    summarize_cleaned,
    CleanOutcome,
};

// =============================================================================
// Re-exports - Report
// =============================================================================

pub use report::{format_summary, summarize, Summary};
