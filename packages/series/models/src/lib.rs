#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entity, period, and time-series types for monthly report counts.
//!
//! These are the shapes that flow from the record loader into the
//! aggregator and from there into the change detector. Everything here is
//! plain data: construction and validation live in the logic crates.

use std::str::FromStr;

use chrono::{Datelike as _, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Sector label assigned when a row has no sector value.
pub const UNKNOWN_SECTOR: &str = "UNKNOWN";

/// How raw rows are grouped into monitored entities.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Grouping {
    /// One entity per neighbourhood code.
    #[default]
    Neighbourhood,
    /// One entity per (neighbourhood, sector) pair.
    NeighbourhoodSector,
}

impl Grouping {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Neighbourhood, Self::NeighbourhoodSector]
    }
}

/// Identity of a monitored entity.
///
/// Ordering is lexicographic on `(neighbourhood, sector)`; an entity
/// without a sector sorts before any sector of the same neighbourhood.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityKey {
    /// Neighbourhood code.
    pub neighbourhood: String,
    /// Sector, when grouping by neighbourhood and sector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

impl EntityKey {
    /// Creates a neighbourhood-only key.
    #[must_use]
    pub fn neighbourhood(code: impl Into<String>) -> Self {
        Self {
            neighbourhood: code.into(),
            sector: None,
        }
    }

    /// Creates a neighbourhood × sector key.
    #[must_use]
    pub fn with_sector(code: impl Into<String>, sector: impl Into<String>) -> Self {
        Self {
            neighbourhood: code.into(),
            sector: Some(sector.into()),
        }
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.sector {
            Some(sector) => write!(f, "{}/{sector}", self.neighbourhood),
            None => write!(f, "{}", self.neighbourhood),
        }
    }
}

/// Error returned when an [`EntityKey`] string has no neighbourhood part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEntityKeyError {
    /// The rejected input.
    pub input: String,
}

impl std::fmt::Display for InvalidEntityKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid entity key '{}': expected NEIGHBOURHOOD or NEIGHBOURHOOD/SECTOR",
            self.input
        )
    }
}

impl std::error::Error for InvalidEntityKeyError {}

impl FromStr for EntityKey {
    type Err = InvalidEntityKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (code, sector) = match s.split_once('/') {
            Some((code, sector)) => (code.trim(), Some(sector.trim())),
            None => (s.trim(), None),
        };

        if code.is_empty() || sector.is_some_and(str::is_empty) {
            return Err(InvalidEntityKeyError {
                input: s.to_string(),
            });
        }

        Ok(Self {
            neighbourhood: code.to_string(),
            sector: sector.map(str::to_string),
        })
    }
}

/// A calendar month.
///
/// Serialized as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Creates a period, returning `None` if `month` is not in 1-12.
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if matches!(month, 1..=12) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The month containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Calendar month, 1-12.
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// The following calendar month.
    #[must_use]
    pub const fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Error returned when a period string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPeriodError {
    /// The rejected input.
    pub input: String,
}

impl std::fmt::Display for InvalidPeriodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid period '{}': expected YYYY-MM or YYYY-MM-DD",
            self.input
        )
    }
}

impl std::error::Error for InvalidPeriodError {}

impl FromStr for Period {
    type Err = InvalidPeriodError;

    /// Accepts `YYYY-MM`, `YYYY-MM-DD`, or a datetime whose first ten
    /// characters are `YYYY-MM-DD`. The day is discarded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || InvalidPeriodError {
            input: s.to_string(),
        };

        let date = if s.len() == 7 {
            NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        } else {
            let day = s.get(..10).ok_or_else(err)?;
            NaiveDate::parse_from_str(day, "%Y-%m-%d")
        }
        .map_err(|_| err())?;

        Ok(Self::from_date(date))
    }
}

impl TryFrom<String> for Period {
    type Error = InvalidPeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}

/// One raw input row after projection onto an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    /// Entity the report is attributed to.
    pub entity: EntityKey,
    /// Month the report was filed.
    pub period: Period,
    /// Number of reports this row stands for.
    pub count: u64,
}

/// Number of reports filed by one entity in one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// Reporting month.
    pub period: Period,
    /// Summed report count.
    pub count: u64,
}

/// The full monthly history of one entity together with its long-run mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySeries {
    /// Entity identity.
    pub entity: EntityKey,
    /// Points in ascending period order.
    pub points: Vec<SeriesPoint>,
    /// Arithmetic mean of `points[..].count`.
    pub mean: f64,
}

impl EntitySeries {
    /// Builds a series from points already sorted by period and computes
    /// the mean once.
    #[must_use]
    pub fn new(entity: EntityKey, points: Vec<SeriesPoint>) -> Self {
        let mean = mean_count(&points);
        Self {
            entity,
            points,
            mean,
        }
    }

    /// Number of observed periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Counts in period order.
    pub fn counts(&self) -> impl ExactSizeIterator<Item = u64> + '_ {
        self.points.iter().map(|p| p.count)
    }

    /// The most recent observed period.
    #[must_use]
    pub fn last_period(&self) -> Option<Period> {
        self.points.last().map(|p| p.period)
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_count(points: &[SeriesPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let total: u64 = points.iter().map(|p| p.count).sum();
    total as f64 / points.len() as f64
}
