//! CSV loader for monthly report records.
//!
//! Reads a headed CSV whose column names are described by a [`CsvLayout`]
//! and projects every row onto an [`EntityKey`] according to the requested
//! [`Grouping`]. When no count column is configured every row stands for a
//! single report, which lets the loader consume raw transaction-level
//! exports as well as pre-counted monthly tables.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use report_watch_series_models::{EntityKey, Grouping, Period, ReportRecord, UNKNOWN_SECTOR};
use serde::{Deserialize, Serialize};

use crate::SeriesError;

/// Column names and delimiter of the input CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvLayout {
    /// Column holding the neighbourhood code.
    pub neighbourhood: String,
    /// Column holding the sector. Required for
    /// [`Grouping::NeighbourhoodSector`].
    pub sector: Option<String>,
    /// Column holding the reporting month (`YYYY-MM` or `YYYY-MM-DD`).
    pub period: String,
    /// Column holding a pre-aggregated count. When absent every row
    /// counts as one report.
    pub count: Option<String>,
    /// Field delimiter (default: comma).
    pub delimiter: Option<String>,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            neighbourhood: "neighbourhood".to_string(),
            sector: Some("sector".to_string()),
            period: "period".to_string(),
            count: None,
            delimiter: None,
        }
    }
}

/// Resolved header positions for one file.
struct ColumnIndices {
    neighbourhood: usize,
    sector: Option<usize>,
    period: usize,
    count: Option<usize>,
}

impl ColumnIndices {
    fn resolve(
        headers: &StringRecord,
        layout: &CsvLayout,
        grouping: Grouping,
    ) -> Result<Self, SeriesError> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| SeriesError::MissingColumn {
                    column: column.to_string(),
                })
        };

        let sector = match grouping {
            Grouping::Neighbourhood => None,
            Grouping::NeighbourhoodSector => {
                let column = layout.sector.as_deref().ok_or_else(|| {
                    SeriesError::MissingColumn {
                        column: "<sector>".to_string(),
                    }
                })?;
                Some(find(column)?)
            }
        };

        Ok(Self {
            neighbourhood: find(&layout.neighbourhood)?,
            sector,
            period: find(&layout.period)?,
            count: layout.count.as_deref().map(find).transpose()?,
        })
    }
}

/// Reads report records from any CSV source.
///
/// Rows with an empty neighbourhood are skipped with a warning. An empty
/// sector value maps to [`UNKNOWN_SECTOR`].
///
/// # Errors
///
/// * [`SeriesError::MissingColumn`] if a configured column is absent from
///   the header row
/// * [`SeriesError::Parse`] if a period or count value is malformed
/// * [`SeriesError::Csv`] if the input is not valid CSV
pub fn load_records<R: Read>(
    reader: R,
    layout: &CsvLayout,
    grouping: Grouping,
) -> Result<Vec<ReportRecord>, SeriesError> {
    let delimiter = layout
        .delimiter
        .as_deref()
        .and_then(|d| d.as_bytes().first().copied())
        .unwrap_or(b',');

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let columns = ColumnIndices::resolve(&headers, layout, grouping)?;

    let mut records = Vec::new();
    let mut skipped: u64 = 0;

    for (i, result) in reader.records().enumerate() {
        let row = i as u64 + 1;
        let record = result?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let neighbourhood = field(columns.neighbourhood);
        if neighbourhood.is_empty() {
            log::warn!("Skipping row {row}: empty neighbourhood");
            skipped += 1;
            continue;
        }

        let entity = match columns.sector {
            None => EntityKey::neighbourhood(neighbourhood),
            Some(idx) => {
                let sector = field(idx);
                let sector = if sector.is_empty() {
                    UNKNOWN_SECTOR
                } else {
                    sector
                };
                EntityKey::with_sector(neighbourhood, sector)
            }
        };

        let period: Period = field(columns.period)
            .parse()
            .map_err(|e| SeriesError::Parse {
                row,
                message: format!("{e}"),
            })?;

        let count = match columns.count {
            None => 1,
            Some(idx) => parse_count(field(idx)).map_err(|message| SeriesError::Parse {
                row,
                message,
            })?,
        };

        records.push(ReportRecord {
            entity,
            period,
            count,
        });
    }

    log::info!(
        "Loaded {} record(s) ({skipped} skipped) grouped by {grouping}",
        records.len()
    );

    Ok(records)
}

/// Reads report records from a CSV file on disk.
///
/// # Errors
///
/// Returns [`SeriesError::Io`] if the file cannot be opened, or any error
/// from [`load_records`].
pub fn load_records_from_path(
    path: &Path,
    layout: &CsvLayout,
    grouping: Grouping,
) -> Result<Vec<ReportRecord>, SeriesError> {
    log::info!("Reading report records from {}", path.display());
    let file = File::open(path)?;
    load_records(file, layout, grouping)
}

/// Parses a non-negative integer count. Whole-number floats such as `"3.0"`
/// are accepted.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn parse_count(value: &str) -> Result<u64, String> {
    if let Ok(n) = value.parse::<u64>() {
        return Ok(n);
    }

    match value.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
        _ => Err(format!(
            "invalid count '{value}': expected a non-negative integer"
        )),
    }
}
