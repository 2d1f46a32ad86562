#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report record loading and per-entity time-series aggregation.
//!
//! [`loader`] turns a headed CSV into [`ReportRecord`]s keyed by the
//! configured [`Grouping`]; [`aggregate`] collapses those records into one
//! [`EntitySeries`] per entity with its long-run mean computed once.
//!
//! [`ReportRecord`]: report_watch_series_models::ReportRecord
//! [`Grouping`]: report_watch_series_models::Grouping
//! [`EntitySeries`]: report_watch_series_models::EntitySeries

pub mod aggregate;
pub mod loader;

pub use aggregate::aggregate;

use thiserror::Error;

/// Errors that can occur while loading report records.
#[derive(Debug, Error)]
pub enum SeriesError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A configured column is not present in the header row.
    #[error("Missing column '{column}' in CSV header")]
    MissingColumn {
        /// The configured column name.
        column: String,
    },

    /// A field value could not be parsed.
    #[error("Parse error on row {row}: {message}")]
    Parse {
        /// 1-based data row number (header excluded).
        row: u64,
        /// Description of what went wrong.
        message: String,
    },
}
