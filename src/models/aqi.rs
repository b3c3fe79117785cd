//! AQI category model

use crate::AirError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal AQI bucket, 1 (best) to 5 (worst).
///
/// An unknown category is represented as `Option<AqiCategory>::None` and is
/// never mapped to a numeric default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AqiCategory {
    Good = 1,
    Fair = 2,
    Moderate = 3,
    Poor = 4,
    VeryPoor = 5,
}

impl AqiCategory {
    pub const ALL: [AqiCategory; 5] = [
        AqiCategory::Good,
        AqiCategory::Fair,
        AqiCategory::Moderate,
        AqiCategory::Poor,
        AqiCategory::VeryPoor,
    ];

    /// Underlying ordinal value
    #[must_use]
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Ordinal as a float, for averaging
    #[must_use]
    pub fn score(self) -> f64 {
        f64::from(self.value())
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Fair => "Fair",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::Poor => "Poor",
            AqiCategory::VeryPoor => "Very Poor",
        }
    }
}

impl TryFrom<u8> for AqiCategory {
    type Error = AirError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AqiCategory::Good),
            2 => Ok(AqiCategory::Fair),
            3 => Ok(AqiCategory::Moderate),
            4 => Ok(AqiCategory::Poor),
            5 => Ok(AqiCategory::VeryPoor),
            other => Err(AirError::validation(format!(
                "AQI category must be between 1 and 5, got: {other}"
            ))),
        }
    }
}

impl From<AqiCategory> for u8 {
    fn from(category: AqiCategory) -> Self {
        category.value()
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value(), self.label())
    }
}
