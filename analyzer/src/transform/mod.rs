//! Transformation module.
//!
//! - Filter: municipality/year row selection
//! - Aggregate: count coercion, date derivation, lethality total
//! - Pipeline: the clean stage and cleaned-file reload

pub mod aggregate;
pub mod filter;
pub mod pipeline;

pub use aggregate::{aggregate, parse_number};
pub use filter::{filter, filter_municipality, filter_year, latest_complete_year};
pub use pipeline::*;
