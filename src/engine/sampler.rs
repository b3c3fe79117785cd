//! Spatial sampling of paths and POI sets

use crate::models::Coordinate;

/// Default stride when downsampling a path
pub const DEFAULT_SAMPLE_STRIDE: usize = 10;

/// Keep every `step`-th point of a path, starting with the first.
///
/// Paths no longer than `step` are returned whole, longer ones yield
/// `ceil(len / step)` points. A `step` of 0 behaves like 1.
#[must_use]
pub fn sample_path(path: &[Coordinate], step: usize) -> Vec<Coordinate> {
    let step = step.max(1);
    if path.len() <= step {
        return path.to_vec();
    }
    path.iter().step_by(step).copied().collect()
}

/// POI sets are small, every candidate is queried
#[must_use]
pub fn sample_pois<T: Clone>(pois: &[T]) -> Vec<T> {
    pois.to_vec()
}
