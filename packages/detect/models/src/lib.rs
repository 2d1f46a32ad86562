#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grid, CUSUM state, hit, and ranking types for ensemble change detection.

use report_watch_series_models::{EntityKey, Period};
use serde::{Deserialize, Serialize};

/// One hyperparameter axis: `start, start + step, ...` up to and including
/// `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    /// First value.
    pub start: f64,
    /// Last value (inclusive).
    pub stop: f64,
    /// Increment between consecutive values.
    pub step: f64,
}

impl GridAxis {
    /// An axis holding the single value `value`.
    #[must_use]
    pub const fn single(value: f64) -> Self {
        Self {
            start: value,
            stop: value,
            step: 1.0,
        }
    }
}

/// The full (slack × threshold) search grid.
///
/// Any field left out of a config file falls back to that axis's value in
/// [`GridConfig::default`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "GridConfigFields")]
pub struct GridConfig {
    /// Slack (C) axis.
    pub slack: GridAxis,
    /// Alarm threshold (T) axis.
    pub threshold: GridAxis,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            slack: GridAxis {
                start: 0.0,
                stop: 3.0,
                step: 0.5,
            },
            threshold: GridAxis {
                start: 1.0,
                stop: 10.0,
                step: 1.0,
            },
        }
    }
}

/// An axis as written in a config file, any field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AxisFields {
    start: Option<f64>,
    stop: Option<f64>,
    step: Option<f64>,
}

impl AxisFields {
    fn or(self, base: GridAxis) -> GridAxis {
        GridAxis {
            start: self.start.unwrap_or(base.start),
            stop: self.stop.unwrap_or(base.stop),
            step: self.step.unwrap_or(base.step),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GridConfigFields {
    slack: AxisFields,
    threshold: AxisFields,
}

impl From<GridConfigFields> for GridConfig {
    fn from(fields: GridConfigFields) -> Self {
        let base = Self::default();
        Self {
            slack: fields.slack.or(base.slack),
            threshold: fields.threshold.or(base.threshold),
        }
    }
}

/// One grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CusumParams {
    /// Slack (C) subtracted from every deviation.
    pub slack: f64,
    /// Alarm threshold (T).
    pub threshold: f64,
}

/// Detector state at one period of one entity's series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CusumState {
    /// Reporting month.
    pub period: Period,
    /// Raw count observed in `period`.
    pub count: u64,
    /// Lagged input value: the previous period's count, or this period's
    /// count for the first period.
    pub xt: f64,
    /// Running sum of `xt` through this period.
    pub cum_sum: f64,
    /// CUSUM statistic, never negative.
    pub st: f64,
    /// Whether `st >= threshold`.
    pub chg_ind: bool,
}

/// Alarm flags at the two most recent periods of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFlags {
    /// `chg_ind` at the last period.
    pub last: bool,
    /// `chg_ind` at the second-to-last period.
    pub previous: bool,
}

impl ChangeFlags {
    /// Whether the series entered the alarm state exactly at its last
    /// period.
    #[must_use]
    pub const fn is_new_alarm(self) -> bool {
        self.last && !self.previous
    }
}

/// A new alarm for one entity in one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
    /// Entity that entered the alarm state.
    pub entity: EntityKey,
    /// Slack of the grid cell.
    pub slack: f64,
    /// Threshold of the grid cell.
    pub threshold: f64,
}

/// An entity's position in the vote ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntity {
    /// 1-based rank (1 = most votes).
    pub order: usize,
    /// Ranked entity.
    pub entity: EntityKey,
    /// Number of grid cells that produced a hit for this entity.
    pub votes: u64,
}
