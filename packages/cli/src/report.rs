//! Plain-text and JSON rendering of detection results.

use std::fmt::Write as _;

use report_watch_detect::GridCells;
use report_watch_detect_models::{CusumParams, CusumState, RankedEntity};
use report_watch_series_models::EntityKey;
use serde::Serialize;

/// Summary of one detection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectReport {
    /// Number of entities in the input.
    pub entities: usize,
    /// Number of grid cells evaluated.
    pub cells: usize,
    /// Total hits across all cells.
    pub hits: usize,
    /// Number of entities with at least one hit.
    pub flagged: usize,
    /// Suggested cutoff at the largest vote drop.
    pub elbow: Option<usize>,
    /// Cutoff applied to `ranked`, if any.
    pub top_k: Option<usize>,
    /// Reported entities in rank order.
    pub ranked: Vec<RankedEntity>,
}

/// Renders the ranking as an aligned table.
#[must_use]
pub fn render_ranking(report: &DetectReport) -> String {
    let width = report
        .ranked
        .iter()
        .map(|r| r.entity.to_string().len())
        .max()
        .unwrap_or(0)
        .max("ENTITY".len());

    let mut out = String::new();
    let _ = writeln!(out, "{:>5}  {:<width$}  {:>5}", "ORDER", "ENTITY", "VOTES");
    let _ = writeln!(out, "{}", "-".repeat(5 + 2 + width + 2 + 5));
    for r in &report.ranked {
        let _ = writeln!(
            out,
            "{:>5}  {:<width$}  {:>5}",
            r.order,
            r.entity.to_string(),
            r.votes
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} entities, {} cells, {} hits, {} flagged",
        report.entities, report.cells, report.hits, report.flagged
    );
    if let Some(cutoff) = report.elbow {
        let _ = writeln!(out, "Largest vote drop after rank {cutoff}");
    }

    out
}

/// Renders a per-period detector trace as an aligned table.
#[must_use]
pub fn render_trace(entity: &EntityKey, params: CusumParams, states: &[CusumState]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{entity}  slack={}  threshold={}",
        params.slack, params.threshold
    );
    let _ = writeln!(
        out,
        "{:<7}  {:>7}  {:>9}  {:>11}  {:>9}  ALARM",
        "PERIOD", "COUNT", "XT", "CUM_SUM", "ST"
    );
    for s in states {
        let _ = writeln!(
            out,
            "{:<7}  {:>7}  {:>9.2}  {:>11.2}  {:>9.2}  {}",
            s.period.to_string(),
            s.count,
            s.xt,
            s.cum_sum,
            s.st,
            if s.chg_ind { "*" } else { "" }
        );
    }
    out
}

/// Renders the expanded grid axes.
#[must_use]
pub fn render_grid(grid: &GridCells) -> String {
    let join = |values: &[f64]| {
        values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "slack     ({}): {}\nthreshold ({}): {}\n{} cells\n",
        grid.slacks().len(),
        join(grid.slacks()),
        grid.thresholds().len(),
        join(grid.thresholds()),
        grid.len()
    )
}

#[cfg(test)]
mod tests {
    use report_watch_detect_models::{GridAxis, GridConfig};
    use report_watch_series_models::Period;

    use super::*;

    fn report() -> DetectReport {
        DetectReport {
            entities: 4,
            cells: 6,
            hits: 9,
            flagged: 2,
            elbow: Some(1),
            top_k: None,
            ranked: vec![
                RankedEntity {
                    order: 1,
                    entity: EntityKey::with_sector("BU0363", "retail"),
                    votes: 7,
                },
                RankedEntity {
                    order: 2,
                    entity: EntityKey::neighbourhood("BU01"),
                    votes: 2,
                },
            ],
        }
    }

    #[test]
    fn ranking_table_lists_entities_in_order() {
        let table = render_ranking(&report());
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].contains("ORDER"));
        assert!(lines[2].contains("BU0363/retail"));
        assert!(lines[2].trim_end().ends_with('7'));
        assert!(lines[3].contains("BU01"));
        assert!(table.contains("4 entities, 6 cells, 9 hits, 2 flagged"));
        assert!(table.contains("after rank 1"));
    }

    #[test]
    fn report_serializes_camel_case() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["topK"], serde_json::Value::Null);
        assert_eq!(json["ranked"][0]["entity"]["sector"], "retail");
        assert_eq!(json["ranked"][1]["votes"], 2);
    }

    #[test]
    fn trace_marks_alarm_periods() {
        let period = Period::new(2022, 1).unwrap();
        let states = [
            CusumState {
                period,
                count: 3,
                xt: 3.0,
                cum_sum: 0.5,
                st: 0.5,
                chg_ind: false,
            },
            CusumState {
                period: period.succ(),
                count: 9,
                xt: 3.0,
                cum_sum: 1.0,
                st: 6.0,
                chg_ind: true,
            },
        ];
        let params = CusumParams {
            slack: 0.0,
            threshold: 5.0,
        };
        let text = render_trace(&EntityKey::neighbourhood("A"), params, &states);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[2].starts_with("2022-01"));
        assert!(!lines[2].ends_with('*'));
        assert!(lines[3].ends_with('*'));
    }

    #[test]
    fn grid_lists_axis_values() {
        let grid = GridCells::new(&GridConfig {
            slack: GridAxis {
                start: 0.0,
                stop: 1.0,
                step: 0.5,
            },
            threshold: GridAxis::single(3.0),
        })
        .unwrap();
        let text = render_grid(&grid);
        assert!(text.contains("slack     (3): 0, 0.5, 1"));
        assert!(text.contains("threshold (1): 3"));
        assert!(text.contains("3 cells"));
    }
}
