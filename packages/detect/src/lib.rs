#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ensemble CUSUM change detection.
//!
//! A single CUSUM detector ([`scorer`]) is run for every entity in every
//! cell of a slack × threshold grid ([`grid`], [`runner`]). Each cell that
//! sees an entity enter the alarm state exactly at its most recent period
//! casts one vote for that entity; [`votes`] turns those votes into a
//! ranked list of candidate anomalies.

pub mod grid;
pub mod progress;
pub mod runner;
pub mod scorer;
pub mod votes;

pub use grid::{GridCells, validate_params};
pub use runner::{CancelToken, run_grid, run_grid_with};
pub use scorer::{score, trace};
pub use votes::{elbow, rank, top_k};

use thiserror::Error;

/// Errors that can occur during change detection.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The series is too short to compare the last two periods.
    #[error("Missing history: need at least 2 periods, got {periods}")]
    MissingHistory {
        /// Number of periods the series has.
        periods: usize,
    },

    /// A grid axis or hyperparameter value is unusable.
    #[error("Invalid {axis} hyperparameter: {message}")]
    InvalidHyperparameter {
        /// Which axis was rejected (`"slack"` or `"threshold"`).
        axis: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// The sweep was cancelled before all cells were evaluated.
    #[error("Grid sweep cancelled")]
    Cancelled,
}
