//! Hourly AQI forecast models

use super::{AqiCategory, Coordinate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One forecast step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Offset from the base hour, 0 meaning the current hour
    pub hour_offset: u32,
    /// Hour of day, `(base_hour + hour_offset) % 24`
    pub hour: u32,
    pub category: AqiCategory,
}

/// Forecast for one coordinate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub coordinate: Coordinate,
    pub base_hour: u32,
    pub points: Vec<ForecastPoint>,
    pub generated_at: DateTime<Utc>,
}

impl HourlyForecast {
    /// Category for the current hour, when it was included
    #[must_use]
    pub fn current(&self) -> Option<AqiCategory> {
        self.points
            .first()
            .filter(|p| p.hour_offset == 0)
            .map(|p| p.category)
    }

    /// Worst category across the forecast window
    #[must_use]
    pub fn worst(&self) -> Option<AqiCategory> {
        self.points.iter().map(|p| p.category).max()
    }
}
