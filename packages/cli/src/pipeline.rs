//! Load → aggregate → sweep → rank, shared by the subcommands and the
//! interactive menu.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use report_watch_detect::progress::ProgressCallback;
use report_watch_detect::{
    CancelToken, GridCells, elbow, rank, run_grid_with, top_k, trace, validate_params,
};
use report_watch_detect_models::{CusumParams, CusumState};
use report_watch_series::loader::load_records_from_path;
use report_watch_series_models::{EntityKey, EntitySeries};

use crate::config::Config;
use crate::report::DetectReport;

/// Reads the input CSV and aggregates it into per-entity series.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_series(
    input: &Path,
    config: &Config,
) -> Result<Vec<EntitySeries>, Box<dyn std::error::Error>> {
    let records = load_records_from_path(input, &config.columns, config.grouping)?;
    Ok(report_watch_series::aggregate(&records))
}

/// Runs the full ensemble over already-aggregated series and ranks the
/// result. `config` supplies the `top_k` cutoff.
///
/// # Errors
///
/// Returns an error if the sweep is cancelled.
pub fn detect_series(
    series: &[EntitySeries],
    grid: &GridCells,
    config: &Config,
    progress: &Arc<dyn ProgressCallback>,
    cancel: &CancelToken,
) -> Result<DetectReport, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let hits = run_grid_with(series, grid, progress, cancel)?;
    let ranked = rank(&hits);
    let suggested = elbow(&ranked);

    match suggested {
        Some(cutoff) => log::info!(
            "Largest vote drop after rank {cutoff} of {} flagged entities",
            ranked.len()
        ),
        None => log::info!("No vote elbow among {} flagged entities", ranked.len()),
    }

    let reported = config
        .top_k
        .map_or(ranked.as_slice(), |k| top_k(&ranked, k))
        .to_vec();

    log::info!(
        "Detection complete in {:.2}s: {} hit(s), {} entities flagged, {} reported",
        start.elapsed().as_secs_f64(),
        hits.len(),
        ranked.len(),
        reported.len()
    );

    Ok(DetectReport {
        entities: series.len(),
        cells: grid.len(),
        hits: hits.len(),
        flagged: ranked.len(),
        elbow: suggested,
        top_k: config.top_k,
        ranked: reported,
    })
}

/// Loads `input` and runs [`detect_series`] on it.
///
/// # Errors
///
/// Returns an error if loading, grid validation, or the sweep fails.
pub fn detect(
    input: &Path,
    config: &Config,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<DetectReport, Box<dyn std::error::Error>> {
    // Validate the grid before touching the input.
    let grid = GridCells::new(&config.grid)?;
    let series = load_series(input, config)?;
    detect_series(&series, &grid, config, progress, &CancelToken::new())
}

/// Returns the per-period detector state for one entity.
///
/// # Errors
///
/// Returns [`report_watch_detect::DetectError::InvalidHyperparameter`] if
/// a hyperparameter is negative or non-finite, or an error if `entity` does
/// not occur in `series`.
pub fn trace_entity(
    series: &[EntitySeries],
    entity: &EntityKey,
    params: CusumParams,
) -> Result<Vec<CusumState>, Box<dyn std::error::Error>> {
    let params = validate_params(params)?;

    let found = series
        .iter()
        .find(|s| &s.entity == entity)
        .ok_or_else(|| format!("Unknown entity: {entity}"))?;

    Ok(trace(found, params))
}
