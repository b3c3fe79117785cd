//! Candidate ranking

use crate::models::Scored;

/// Default number of parks to recommend
pub const DEFAULT_PARK_COUNT: usize = 5;

/// Best `k` candidates by ascending score.
///
/// Unscored candidates are dropped, equal scores keep their input order, and
/// fewer than `k` scored candidates are returned as-is.
#[must_use]
pub fn select_top_k<T: Scored>(candidates: impl IntoIterator<Item = T>, k: usize) -> Vec<T> {
    let mut scored: Vec<(f64, T)> = candidates
        .into_iter()
        .filter_map(|c| c.score().map(|s| (s, c)))
        .collect();
    // sort_by is stable
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.into_iter().take(k).map(|(_, c)| c).collect()
}

/// Cleanest candidate, `None` when nothing could be scored
#[must_use]
pub fn select_best<T: Scored>(candidates: impl IntoIterator<Item = T>) -> Option<T> {
    select_top_k(candidates, 1).into_iter().next()
}
