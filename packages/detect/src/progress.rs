//! Sweep progress hooks.
//!
//! The runner reports through [`ProgressCallback`] and never renders
//! anything itself. The CLI plugs in an `indicatif` bar.

use std::sync::Arc;

use report_watch_detect_models::CusumParams;

/// Receives grid-sweep lifecycle events.
///
/// `cell_done` fires on rayon worker threads in completion order, which is
/// not cell order.
pub trait ProgressCallback: Send + Sync {
    /// Number of cells about to be scored. Called once, after validation.
    fn set_total(&self, cells: u64);

    /// One cell finished with `hits` new alarms.
    fn cell_done(&self, cell: CusumParams, hits: usize);

    /// Every cell finished; `hits` is the sweep total.
    fn finish(&self, hits: usize);

    /// The sweep was abandoned (cancelled). No `finish` follows.
    fn abort(&self);
}

/// Ignores every event.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _cells: u64) {}
    fn cell_done(&self, _cell: CusumParams, _hits: usize) {}
    fn finish(&self, _hits: usize) {}
    fn abort(&self) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
