//! Ensemble sweep over the full slack × threshold grid.
//!
//! Every cell is an independent, pure evaluation over the read-only entity
//! series: nothing computed for one cell is visible to another. Cells are
//! fanned out on the `rayon` pool and their hit lists are concatenated in
//! cell order, so the output does not depend on scheduling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use report_watch_detect_models::{CusumParams, GridConfig, Hit};
use report_watch_series_models::EntitySeries;

use crate::grid::GridCells;
use crate::progress::{ProgressCallback, null_progress};
use crate::scorer::score;
use crate::DetectError;

/// Cooperative cancellation flag shared between the caller and a sweep.
///
/// Checked before each cell starts; a cancelled sweep returns
/// [`DetectError::Cancelled`] and discards all partial results.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every sweep holding a clone of this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs the detector for every entity in every cell of `config`.
///
/// # Errors
///
/// Returns [`DetectError::InvalidHyperparameter`] if the grid is invalid.
/// No scoring happens in that case.
pub fn run_grid(series: &[EntitySeries], config: &GridConfig) -> Result<Vec<Hit>, DetectError> {
    let grid = GridCells::new(config)?;
    run_grid_with(series, &grid, &null_progress(), &CancelToken::new())
}

/// Sweeps an already validated grid, reporting each finished cell to
/// `progress` and honouring `cancel` between cells.
///
/// # Errors
///
/// Returns [`DetectError::Cancelled`] if `cancel` fires before the sweep
/// ends.
pub fn run_grid_with(
    series: &[EntitySeries],
    grid: &GridCells,
    progress: &Arc<dyn ProgressCallback>,
    cancel: &CancelToken,
) -> Result<Vec<Hit>, DetectError> {
    let cells: Vec<CusumParams> = grid.iter().collect();

    let short = series.iter().filter(|s| s.len() < 2).count();
    log::info!(
        "Sweeping {} cell(s) ({} slack x {} threshold) over {} entities ({short} with too little history)",
        cells.len(),
        grid.slacks().len(),
        grid.thresholds().len(),
        series.len(),
    );

    progress.set_total(cells.len() as u64);

    let per_cell = cells
        .par_iter()
        .map(|&cell| {
            if cancel.is_cancelled() {
                return Err(DetectError::Cancelled);
            }
            let hits = evaluate_cell(series, cell);
            log::debug!(
                "Cell slack={} threshold={}: {} hit(s)",
                cell.slack,
                cell.threshold,
                hits.len()
            );
            progress.cell_done(cell, hits.len());
            Ok(hits)
        })
        .collect::<Result<Vec<Vec<Hit>>, DetectError>>();

    let per_cell = match per_cell {
        Ok(per_cell) => per_cell,
        Err(e) => {
            log::warn!("Grid sweep aborted: {e}");
            progress.abort();
            return Err(e);
        }
    };

    let hits: Vec<Hit> = per_cell.into_iter().flatten().collect();

    log::info!("Grid sweep complete: {} hit(s)", hits.len());
    progress.finish(hits.len());

    Ok(hits)
}

/// Scores every entity for one grid cell and returns a hit for each entity
/// that entered the alarm state at its last period.
///
/// Entities with fewer than two periods are skipped.
#[must_use]
pub fn evaluate_cell(series: &[EntitySeries], cell: CusumParams) -> Vec<Hit> {
    series
        .iter()
        .filter_map(|s| match score(s.counts(), s.mean, cell) {
            Ok(flags) if flags.is_new_alarm() => Some(Hit {
                entity: s.entity.clone(),
                slack: cell.slack,
                threshold: cell.threshold,
            }),
            Ok(_) => None,
            Err(e) => {
                log::trace!("Skipping {}: {e}", s.entity);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use report_watch_detect_models::GridAxis;
    use report_watch_series_models::{EntityKey, Period, ReportRecord};

    use super::*;

    fn records(code: &str, counts: &[u64]) -> Vec<ReportRecord> {
        let mut period = Period::new(2022, 1).unwrap();
        counts
            .iter()
            .map(|&count| {
                let record = ReportRecord {
                    entity: EntityKey::neighbourhood(code),
                    period,
                    count,
                };
                period = period.succ();
                record
            })
            .collect()
    }

    fn fixture() -> Vec<EntitySeries> {
        let mut all = Vec::new();
        all.extend(records("RISING", &[2, 2, 2, 2, 2, 2, 16, 16]));
        all.extend(records("FLAT", &[5; 8]));
        all.extend(records("SINGLE", &[40]));
        report_watch_series::aggregate(&all)
    }

    fn grid(slack: GridAxis, threshold: GridAxis) -> GridConfig {
        GridConfig { slack, threshold }
    }

    fn small_grid() -> GridConfig {
        grid(
            GridAxis {
                start: 0.0,
                stop: 2.0,
                step: 1.0,
            },
            GridAxis {
                start: 2.0,
                stop: 12.0,
                step: 2.0,
            },
        )
    }

    #[derive(Default)]
    struct CountingProgress {
        total: AtomicU64,
        done: AtomicU64,
        finished: AtomicBool,
    }

    impl ProgressCallback for CountingProgress {
        fn set_total(&self, cells: u64) {
            self.total.store(cells, Ordering::SeqCst);
        }
        fn cell_done(&self, _cell: CusumParams, _hits: usize) {
            self.done.fetch_add(1, Ordering::SeqCst);
        }
        fn finish(&self, _hits: usize) {
            self.finished.store(true, Ordering::SeqCst);
        }
        fn abort(&self) {}
    }

    /// Cancels the sweep as soon as the first cell completes.
    struct CancelOnFirstCell {
        cancel: CancelToken,
        done: AtomicU64,
        aborted: AtomicBool,
    }

    impl ProgressCallback for CancelOnFirstCell {
        fn set_total(&self, _cells: u64) {}
        fn cell_done(&self, _cell: CusumParams, _hits: usize) {
            self.done.fetch_add(1, Ordering::SeqCst);
            self.cancel.cancel();
        }
        fn finish(&self, _hits: usize) {}
        fn abort(&self) {
            self.aborted.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn counts_hits_for_rising_entity() {
        // RISING ends with st = 8.5 - slack then 24.5 - slack, so a cell
        // hits when 8.5 - slack < threshold <= 24.5 - slack. FLAT ends
        // near 30, above every threshold in the grid.
        let hits = run_grid(&fixture(), &small_grid()).unwrap();

        assert_eq!(hits.len(), 2 + 3 + 3);
        assert!(
            hits.iter()
                .all(|h| h.entity == EntityKey::neighbourhood("RISING"))
        );
    }

    #[test]
    fn single_period_entity_never_hits() {
        let series = report_watch_series::aggregate(&records("SINGLE", &[40]));
        let wide = grid(
            GridAxis {
                start: 0.0,
                stop: 5.0,
                step: 0.5,
            },
            GridAxis {
                start: 0.0,
                stop: 50.0,
                step: 1.0,
            },
        );
        assert!(run_grid(&series, &wide).unwrap().is_empty());
    }

    #[test]
    fn zero_cell_is_evaluated_and_saturates() {
        // Threshold zero puts every period in alarm, so there is never a
        // transition into alarm at the last period.
        let zero = grid(GridAxis::single(0.0), GridAxis::single(0.0));
        let series = fixture();
        let hits = run_grid(&series, &zero).unwrap();
        assert!(hits.is_empty());

        let cell = CusumParams {
            slack: 0.0,
            threshold: 0.0,
        };
        for s in series.iter().filter(|s| s.len() >= 2) {
            let flags = score(s.counts(), s.mean, cell).unwrap();
            assert!(flags.last && flags.previous, "{}", s.entity);
        }
    }

    #[test]
    fn repeated_sweeps_are_identical() {
        let series = fixture();
        let first = run_grid(&series, &GridConfig::default()).unwrap();
        for _ in 0..5 {
            assert_eq!(run_grid(&series, &GridConfig::default()).unwrap(), first);
        }
    }

    #[test]
    fn hits_follow_cell_order() {
        let hits = run_grid(&fixture(), &small_grid()).unwrap();
        let cells: Vec<(f64, f64)> = hits.iter().map(|h| (h.slack, h.threshold)).collect();
        let mut sorted = cells.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(cells, sorted);
    }

    #[test]
    fn invalid_grid_aborts_before_scoring() {
        let bad = grid(
            GridAxis {
                start: -1.0,
                stop: 1.0,
                step: 1.0,
            },
            GridAxis::single(1.0),
        );

        let err = run_grid(&fixture(), &bad).unwrap_err();
        assert!(matches!(
            err,
            DetectError::InvalidHyperparameter { axis: "slack", .. }
        ));
    }

    #[test]
    fn reports_one_progress_unit_per_cell() {
        let progress = Arc::new(CountingProgress::default());
        let as_dyn: Arc<dyn ProgressCallback> = progress.clone();
        let cells = GridCells::new(&small_grid()).unwrap();

        run_grid_with(&fixture(), &cells, &as_dyn, &CancelToken::new()).unwrap();
        assert_eq!(progress.total.load(Ordering::SeqCst), 18);
        assert_eq!(progress.done.load(Ordering::SeqCst), 18);
        assert!(progress.finished.load(Ordering::SeqCst));
    }

    #[test]
    fn cancelled_sweep_returns_no_results() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let cells = GridCells::new(&small_grid()).unwrap();

        let err = run_grid_with(&fixture(), &cells, &null_progress(), &cancel).unwrap_err();
        assert!(matches!(err, DetectError::Cancelled));
    }

    #[test]
    fn cancelling_mid_sweep_discards_finished_cells() {
        let cancel = CancelToken::new();
        let progress = Arc::new(CancelOnFirstCell {
            cancel: cancel.clone(),
            done: AtomicU64::new(0),
            aborted: AtomicBool::new(false),
        });
        let as_dyn: Arc<dyn ProgressCallback> = progress.clone();
        let cells = GridCells::new(&small_grid()).unwrap();
        let series = fixture();

        // A single worker makes "after the first cell" deterministic.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap();
        let result = pool.install(|| run_grid_with(&series, &cells, &as_dyn, &cancel));

        assert!(matches!(result, Err(DetectError::Cancelled)));
        assert!(progress.done.load(Ordering::SeqCst) < 18);
        assert!(progress.aborted.load(Ordering::SeqCst));
    }

    #[test]
    fn empty_input_yields_no_hits() {
        assert!(run_grid(&[], &GridConfig::default()).unwrap().is_empty());
    }
}
