//! AQI point estimation
//!
//! The estimator is a black box mapping the nine-element feature vector
//! `[co, no, no2, o3, so2, pm2_5, pm10, nh3, hour]` to an [`AqiCategory`].
//! Two implementations ship with the crate:
//! - [`BreakpointEstimator`]: the provider's published concentration bands
//! - [`ForestEstimator`]: a decision forest exported from an offline model

use crate::models::{AqiCategory, FEATURE_COUNT, FeatureVector, Pollutant};
use crate::{AirError, Result};

pub mod forest;

pub use forest::ForestEstimator;

/// Anything that can turn a feature vector into an AQI category
pub trait AqiEstimator: Send + Sync {
    fn estimate(&self, features: &FeatureVector) -> Result<AqiCategory>;
}

/// Reject vectors no estimator should see
pub(crate) fn check_features(features: &FeatureVector) -> Result<()> {
    if let Some((i, value)) = features
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        return Err(AirError::estimation(format!(
            "feature {i} is not a non-negative finite number: {value}"
        )));
    }
    let hour = features[FEATURE_COUNT - 1];
    if hour > 23.0 || hour.fract() != 0.0 {
        return Err(AirError::estimation(format!(
            "hour feature must be an integer in 0..=23, got: {hour}"
        )));
    }
    Ok(())
}

/// Upper band limits (exclusive) for Good, Fair, Moderate and Poor. Anything
/// at or above the last limit is Very Poor.
const BANDS: [(Pollutant, [f64; 4]); 6] = [
    (Pollutant::So2, [20.0, 80.0, 250.0, 350.0]),
    (Pollutant::No2, [40.0, 70.0, 150.0, 200.0]),
    (Pollutant::Pm10, [20.0, 50.0, 100.0, 200.0]),
    (Pollutant::Pm2_5, [10.0, 25.0, 50.0, 75.0]),
    (Pollutant::O3, [60.0, 100.0, 140.0, 180.0]),
    (Pollutant::Co, [4400.0, 9400.0, 12400.0, 15400.0]),
];

/// Rule-based estimator: the overall category is the worst per-pollutant band.
///
/// NO and NH3 carry no bands and the hour feature is ignored; both are still
/// validated so that a malformed vector fails here like it would in a model.
#[derive(Debug, Clone, Copy, Default)]
pub struct BreakpointEstimator;

impl BreakpointEstimator {
    fn band(concentration: f64, limits: &[f64; 4]) -> AqiCategory {
        let index = limits
            .iter()
            .position(|limit| concentration < *limit)
            .unwrap_or(limits.len());
        AqiCategory::ALL[index]
    }
}

impl AqiEstimator for BreakpointEstimator {
    fn estimate(&self, features: &FeatureVector) -> Result<AqiCategory> {
        check_features(features)?;

        let worst = BANDS
            .iter()
            .map(|(pollutant, limits)| Self::band(features[*pollutant as usize], limits))
            .max()
            .unwrap_or(AqiCategory::Good);
        Ok(worst)
    }
}
