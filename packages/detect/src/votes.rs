//! Vote tallying and ranking.

use std::collections::BTreeMap;

use report_watch_detect_models::{Hit, RankedEntity};
use report_watch_series_models::EntityKey;

/// Tallies hits per entity and ranks entities by descending vote count.
///
/// Ties are broken by ascending entity key, so the ranking is a total order
/// and identical input always produces an identical ranking. Entities
/// without any hit do not appear.
#[must_use]
pub fn rank(hits: &[Hit]) -> Vec<RankedEntity> {
    let mut tally: BTreeMap<&EntityKey, u64> = BTreeMap::new();
    for hit in hits {
        *tally.entry(&hit.entity).or_default() += 1;
    }

    // The map iterates in key order and the sort is stable, so equal
    // counts keep ascending key order.
    let mut ranked: Vec<(&EntityKey, u64)> = tally.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (entity, votes))| RankedEntity {
            order: i + 1,
            entity: entity.clone(),
            votes,
        })
        .collect()
}

/// Returns the first `k` ranked entities.
#[must_use]
pub fn top_k(ranked: &[RankedEntity], k: usize) -> &[RankedEntity] {
    &ranked[..k.min(ranked.len())]
}

/// Suggests a cutoff at the largest drop in votes between consecutive
/// ranks.
///
/// Returns the number of entities ranked before that drop; the earliest
/// drop wins on ties. Returns `None` when there are fewer than two entities
/// or all vote counts are equal. The suggestion is only advisory: the
/// reported cutoff is whatever `k` the caller passes to [`top_k`].
#[must_use]
pub fn elbow(ranked: &[RankedEntity]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;

    for (i, pair) in ranked.windows(2).enumerate() {
        let drop = pair[0].votes.saturating_sub(pair[1].votes);
        if drop > 0 && best.is_none_or(|(_, d)| drop > d) {
            best = Some((i + 1, drop));
        }
    }

    best.map(|(cutoff, _)| cutoff)
}
