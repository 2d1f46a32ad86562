//! Grid construction and validation.
//!
//! All validation happens here, before any scoring runs: a sweep never
//! starts on a grid with a negative, non-finite, or empty axis.

use report_watch_detect_models::{CusumParams, GridAxis, GridConfig};

use crate::DetectError;

/// Upper bound on the number of values a single axis may expand to.
pub const MAX_AXIS_VALUES: usize = 10_000;

/// Absorbs float drift when deciding whether `stop` is reached.
const STOP_TOLERANCE: f64 = 1e-9;

/// The expanded, validated (slack × threshold) grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCells {
    slacks: Vec<f64>,
    thresholds: Vec<f64>,
}

impl GridCells {
    /// Expands and validates both axes of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidHyperparameter`] if either axis has a
    /// negative or non-finite bound, a non-positive step, `start > stop`, or
    /// expands to more than [`MAX_AXIS_VALUES`] values.
    pub fn new(config: &GridConfig) -> Result<Self, DetectError> {
        Ok(Self {
            slacks: expand_axis("slack", &config.slack)?,
            thresholds: expand_axis("threshold", &config.threshold)?,
        })
    }

    /// Slack values in ascending order.
    #[must_use]
    pub fn slacks(&self) -> &[f64] {
        &self.slacks
    }

    /// Threshold values in ascending order.
    #[must_use]
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slacks.len() * self.thresholds.len()
    }

    /// Always `false` for a validated grid; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cells in slack-major, threshold-minor order.
    pub fn iter(&self) -> impl Iterator<Item = CusumParams> + '_ {
        self.slacks.iter().flat_map(move |&slack| {
            self.thresholds
                .iter()
                .map(move |&threshold| CusumParams { slack, threshold })
        })
    }
}

/// Checks a single cell given directly rather than through a grid.
///
/// # Errors
///
/// Returns [`DetectError::InvalidHyperparameter`] if slack or threshold is
/// negative or non-finite.
pub fn validate_params(params: CusumParams) -> Result<CusumParams, DetectError> {
    for (axis, value) in [("slack", params.slack), ("threshold", params.threshold)] {
        if !value.is_finite() || value < 0.0 {
            return Err(DetectError::InvalidHyperparameter {
                axis,
                message: format!("must be a non-negative number, got {value}"),
            });
        }
    }
    Ok(params)
}

/// Expands `start, start + step, ...` through `stop` inclusive.
///
/// Values are computed as `start + i * step` rather than by repeated
/// addition so that drift does not accumulate along long axes.
///
/// # Errors
///
/// Returns [`DetectError::InvalidHyperparameter`] naming `name` when the
/// axis is unusable.
#[allow(clippy::cast_precision_loss)]
pub fn expand_axis(name: &'static str, axis: &GridAxis) -> Result<Vec<f64>, DetectError> {
    let invalid = |message: String| DetectError::InvalidHyperparameter {
        axis: name,
        message,
    };

    let GridAxis { start, stop, step } = *axis;

    if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
        return Err(invalid(format!(
            "bounds must be finite (start={start}, stop={stop}, step={step})"
        )));
    }
    if start < 0.0 {
        return Err(invalid(format!("start must be non-negative, got {start}")));
    }
    if step <= 0.0 {
        return Err(invalid(format!("step must be positive, got {step}")));
    }
    if start > stop {
        return Err(invalid(format!(
            "start ({start}) must not exceed stop ({stop})"
        )));
    }

    let span = (stop - start) / step;
    if span >= MAX_AXIS_VALUES as f64 {
        return Err(invalid(format!(
            "axis expands to more than {MAX_AXIS_VALUES} values"
        )));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = (span + STOP_TOLERANCE).floor() as usize;

    let values = (0..=steps).map(|i| start + i as f64 * step).collect();

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(start: f64, stop: f64, step: f64) -> GridAxis {
        GridAxis { start, stop, step }
    }

    fn assert_values(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn expands_inclusive_of_stop() {
        let values = expand_axis("slack", &axis(0.0, 2.0, 0.5)).unwrap();
        assert_values(&values, &[0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn absorbs_float_drift_at_stop() {
        let values = expand_axis("slack", &axis(0.0, 0.3, 0.1)).unwrap();
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn stop_not_on_step_is_excluded() {
        let values = expand_axis("threshold", &axis(1.0, 4.5, 1.0)).unwrap();
        assert_values(&values, &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn single_value_axis() {
        let values = expand_axis("threshold", &GridAxis::single(0.0)).unwrap();
        assert_values(&values, &[0.0]);
    }

    #[test]
    fn rejects_negative_start() {
        let err = expand_axis("slack", &axis(-1.0, 2.0, 0.5)).unwrap_err();
        assert!(matches!(
            err,
            DetectError::InvalidHyperparameter { axis: "slack", .. }
        ));
    }

    #[test]
    fn rejects_reversed_bounds() {
        assert!(expand_axis("threshold", &axis(5.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn rejects_non_positive_step() {
        assert!(expand_axis("threshold", &axis(0.0, 1.0, 0.0)).is_err());
        assert!(expand_axis("threshold", &axis(0.0, 1.0, -0.5)).is_err());
    }

    #[test]
    fn rejects_non_finite_bounds() {
        assert!(expand_axis("slack", &axis(0.0, f64::INFINITY, 1.0)).is_err());
        assert!(expand_axis("slack", &axis(f64::NAN, 1.0, 1.0)).is_err());
    }

    #[test]
    fn rejects_oversized_axis() {
        assert!(expand_axis("slack", &axis(0.0, 1.0, 1e-6)).is_err());
    }

    #[test]
    fn validates_single_cell() {
        let ok = CusumParams {
            slack: 0.0,
            threshold: 0.0,
        };
        assert_eq!(validate_params(ok).unwrap(), ok);

        let err = validate_params(CusumParams {
            slack: 1.0,
            threshold: -2.0,
        })
        .unwrap_err();
        assert!(matches!(
            err,
            DetectError::InvalidHyperparameter {
                axis: "threshold",
                ..
            }
        ));

        assert!(
            validate_params(CusumParams {
                slack: f64::NAN,
                threshold: 1.0,
            })
            .is_err()
        );
    }

    #[test]
    fn cells_are_slack_major() {
        let grid = GridCells::new(&GridConfig {
            slack: axis(0.0, 1.0, 1.0),
            threshold: axis(2.0, 4.0, 2.0),
        })
        .unwrap();

        assert_eq!(grid.len(), 4);
        let cells: Vec<(f64, f64)> = grid.iter().map(|c| (c.slack, c.threshold)).collect();
        assert_eq!(cells, vec![(0.0, 2.0), (0.0, 4.0), (1.0, 2.0), (1.0, 4.0)]);
    }

    #[test]
    fn default_grid_is_valid() {
        let grid = GridCells::new(&GridConfig::default()).unwrap();
        assert_eq!(grid.slacks().len(), 7);
        assert_eq!(grid.thresholds().len(), 10);
        assert!(!grid.is_empty());
    }
}
