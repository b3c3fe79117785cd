//! Sample points and rankable park/route candidates

use super::{AqiCategory, Coordinate};
use serde::{Deserialize, Serialize};

/// Anything the selector can rank by air quality
pub trait Scored {
    /// Aggregated score, lower is cleaner. `None` excludes the candidate.
    fn score(&self) -> Option<f64>;
}

/// A query point and the category obtained for it, if any
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampledPoint {
    pub coordinate: Coordinate,
    pub category: Option<AqiCategory>,
}

impl SampledPoint {
    #[must_use]
    pub fn unscored(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            category: None,
        }
    }
}

/// A park near the search center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkCandidate {
    pub name: String,
    pub coordinate: Coordinate,
    /// Distance from the search center
    pub distance_km: f64,
    pub category: Option<AqiCategory>,
}

impl Scored for ParkCandidate {
    fn score(&self) -> Option<f64> {
        self.category.map(AqiCategory::score)
    }
}

/// One candidate path between two points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
    /// Mean AQI over the sampled points of the path
    pub aggregated_score: Option<f64>,
}

impl Scored for RouteCandidate {
    fn score(&self) -> Option<f64> {
        self.aggregated_score
    }
}

impl<T: Scored> Scored for &T {
    fn score(&self) -> Option<f64> {
        (**self).score()
    }
}
