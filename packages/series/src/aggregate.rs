//! Collapses report records into per-entity monthly series.

use std::collections::BTreeMap;

use report_watch_series_models::{EntityKey, EntitySeries, Period, ReportRecord, SeriesPoint};

/// Sums records per `(entity, period)` and returns one series per entity,
/// ordered by entity key, with points in ascending period order.
///
/// Missing months are left missing. An empty input yields an empty vector.
#[must_use]
pub fn aggregate<'a, I>(records: I) -> Vec<EntitySeries>
where
    I: IntoIterator<Item = &'a ReportRecord>,
{
    let mut counts: BTreeMap<&EntityKey, BTreeMap<Period, u64>> = BTreeMap::new();
    let mut total_records: u64 = 0;

    for record in records {
        *counts
            .entry(&record.entity)
            .or_default()
            .entry(record.period)
            .or_default() += record.count;
        total_records += 1;
    }

    let series: Vec<EntitySeries> = counts
        .into_iter()
        .map(|(entity, by_period)| {
            let points = by_period
                .into_iter()
                .map(|(period, count)| SeriesPoint { period, count })
                .collect();
            EntitySeries::new(entity.clone(), points)
        })
        .collect();

    log::debug!(
        "Aggregated {total_records} record(s) into {} entity series",
        series.len()
    );

    series
}
