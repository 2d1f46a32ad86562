#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for report-watch.
//!
//! Provides the grid-sweep progress bar behind the [`ProgressCallback`]
//! trait, plus [`init_logger`] which routes `log` output through
//! `indicatif-log-bridge` so log lines never tear a redrawing bar.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use report_watch_detect::progress::ProgressCallback;
use report_watch_detect_models::CusumParams;

pub use indicatif::MultiProgress;

/// Grid-sweep progress bar backed by `indicatif`.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Applied once the cell count is known.
    cells_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Adds a spinner to `multi`. It turns into a cell counter with ETA
    /// when the sweep calls [`ProgressCallback::set_total()`].
    #[must_use]
    pub fn new(multi: &MultiProgress, message: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let cells_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {pos}/{len} cells {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Self { bar, cells_style }
    }

    /// Same as [`Self::new`], boxed for [`report_watch_detect::run_grid_with`].
    #[must_use]
    pub fn sweep_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        Arc::new(Self::new(multi, message))
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, cells: u64) {
        self.bar.set_length(cells);
        self.bar.set_position(0);
        self.bar.set_style(self.cells_style.clone());
    }

    fn cell_done(&self, _cell: CusumParams, _hits: usize) {
        self.bar.inc(1);
    }

    fn finish(&self, hits: usize) {
        self.bar
            .finish_with_message(format!("Grid sweep complete -- {hits} hit(s)"));
    }

    fn abort(&self) {
        self.bar.finish_and_clear();
    }
}

/// Maps a `-v` count to the level used when `RUST_LOG` is unset.
#[must_use]
pub const fn verbosity_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// `RUST_LOG` wins when set; otherwise everything at `default_level` and
/// above is shown.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger(default_level: LevelFilter) -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    } else {
        builder.filter_level(default_level);
    }
    let logger = builder.build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // already set (e.g., in tests)

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use indicatif::ProgressDrawTarget;

    use super::*;

    fn hidden_multi() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }

    const CELL: CusumParams = CusumParams {
        slack: 0.5,
        threshold: 3.0,
    };

    #[test]
    fn counts_cells_after_total_is_set() {
        let progress = IndicatifProgress::new(&hidden_multi(), "Sweeping grid");
        assert_eq!(progress.bar.length(), None);

        progress.set_total(70);
        progress.cell_done(CELL, 0);
        progress.cell_done(CELL, 4);
        assert_eq!(progress.bar.length(), Some(70));
        assert_eq!(progress.bar.position(), 2);
    }

    #[test]
    fn finish_marks_bar_done() {
        let progress = IndicatifProgress::new(&hidden_multi(), "Sweeping grid");
        progress.set_total(1);
        progress.cell_done(CELL, 1);
        progress.finish(1);
        assert!(progress.bar.is_finished());
        assert_eq!(progress.bar.message(), "Grid sweep complete -- 1 hit(s)");
    }

    #[test]
    fn abort_clears_bar() {
        let progress = IndicatifProgress::new(&hidden_multi(), "Sweeping grid");
        progress.set_total(10);
        progress.cell_done(CELL, 0);
        progress.abort();
        assert!(progress.bar.is_finished());
        assert_eq!(progress.bar.position(), 1);
    }

    #[test]
    fn verbosity_raises_default_level() {
        assert_eq!(verbosity_level(0), LevelFilter::Info);
        assert_eq!(verbosity_level(1), LevelFilter::Debug);
        assert_eq!(verbosity_level(5), LevelFilter::Trace);
    }
}
