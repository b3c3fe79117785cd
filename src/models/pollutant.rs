//! Pollutant snapshot model and estimator feature vector

use crate::AirError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The fixed set of pollutants reported per coordinate, in feature order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pollutant {
    Co,
    No,
    No2,
    O3,
    So2,
    #[serde(rename = "pm2_5")]
    Pm2_5,
    Pm10,
    Nh3,
}

impl Pollutant {
    /// All pollutants in the order the estimator was fit on
    pub const ALL: [Pollutant; 8] = [
        Pollutant::Co,
        Pollutant::No,
        Pollutant::No2,
        Pollutant::O3,
        Pollutant::So2,
        Pollutant::Pm2_5,
        Pollutant::Pm10,
        Pollutant::Nh3,
    ];

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Pollutant::Co => "co",
            Pollutant::No => "no",
            Pollutant::No2 => "no2",
            Pollutant::O3 => "o3",
            Pollutant::So2 => "so2",
            Pollutant::Pm2_5 => "pm2_5",
            Pollutant::Pm10 => "pm10",
            Pollutant::Nh3 => "nh3",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Number of estimator inputs: eight concentrations plus the hour of day
pub const FEATURE_COUNT: usize = 9;

/// Estimator input `[co, no, no2, o3, so2, pm2_5, pm10, nh3, hour]`
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Concentrations (μg/m³) of all eight pollutants at one coordinate and instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantSnapshot {
    concentrations: [f64; 8],
}

impl PollutantSnapshot {
    /// Build a snapshot from a provider component map.
    ///
    /// All-or-nothing: every pollutant must be present, finite and non-negative.
    /// Extra keys are ignored.
    pub fn from_components(components: &HashMap<String, f64>) -> crate::Result<Self> {
        let mut concentrations = [0.0; 8];
        let mut missing = Vec::new();

        for pollutant in Pollutant::ALL {
            match components.get(pollutant.symbol()) {
                Some(&value) if value.is_finite() && value >= 0.0 => {
                    concentrations[pollutant.index()] = value;
                }
                _ => missing.push(pollutant.symbol().to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(AirError::IncompleteSnapshot { missing });
        }
        Ok(Self { concentrations })
    }

    /// Concentration of a single pollutant
    #[must_use]
    pub fn get(&self, pollutant: Pollutant) -> f64 {
        self.concentrations[pollutant.index()]
    }

    /// Estimator features for the given hour of day
    #[must_use]
    pub fn features(&self, hour: u32) -> FeatureVector {
        let mut features = [0.0; FEATURE_COUNT];
        features[..8].copy_from_slice(&self.concentrations);
        features[8] = f64::from(hour);
        features
    }

    /// Iterate `(pollutant, concentration)` in feature order
    pub fn iter(&self) -> impl Iterator<Item = (Pollutant, f64)> + '_ {
        Pollutant::ALL.iter().map(|p| (*p, self.get(*p)))
    }
}

#[cfg(test)]
pub(crate) fn components(values: [(&str, f64); 8]) -> HashMap<String, f64> {
    values.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
}
