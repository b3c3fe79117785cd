//! Pollutant sources and area AQI lookups
//!
//! - [`PollutantSource`]: raw concentrations for a coordinate
//! - [`AreaAqiLookup`]: one AQI category for a coordinate, used per sample point
//! - [`EstimatingLookup`]: an area lookup built from a pollutant source and an
//!   estimator, evaluated at the current hour

use crate::Result;
use crate::estimator::AqiEstimator;
use crate::models::{AqiCategory, Coordinate, PollutantSnapshot};
use async_trait::async_trait;
use chrono::Timelike;
use std::sync::Arc;
use tracing::{debug, instrument};

pub mod open_weather;

pub use open_weather::OpenWeatherClient;

/// Remote source of pollutant concentrations. All-or-nothing per call.
#[async_trait]
pub trait PollutantSource: Send + Sync {
    async fn fetch_pollutants(&self, coordinate: Coordinate) -> Result<PollutantSnapshot>;
}

/// AQI for the area around a coordinate.
///
/// `Ok(None)` means the service answered but has no data for the point;
/// `Err` means the call itself failed.
#[async_trait]
pub trait AreaAqiLookup: Send + Sync {
    async fn lookup_area_aqi(&self, coordinate: Coordinate) -> Result<Option<AqiCategory>>;
}

/// Source of the current hour of day
pub type HourClock = Arc<dyn Fn() -> u32 + Send + Sync>;

/// Local wall-clock hour
#[must_use]
pub fn local_hour_clock() -> HourClock {
    Arc::new(|| chrono::Local::now().hour())
}

/// Area lookup that fetches a snapshot and runs the estimator on it
pub struct EstimatingLookup {
    source: Arc<dyn PollutantSource>,
    estimator: Arc<dyn AqiEstimator>,
    clock: HourClock,
}

impl EstimatingLookup {
    pub fn new(
        source: Arc<dyn PollutantSource>,
        estimator: Arc<dyn AqiEstimator>,
        clock: HourClock,
    ) -> Self {
        Self {
            source,
            estimator,
            clock,
        }
    }
}

#[async_trait]
impl AreaAqiLookup for EstimatingLookup {
    #[instrument(skip(self))]
    async fn lookup_area_aqi(&self, coordinate: Coordinate) -> Result<Option<AqiCategory>> {
        let snapshot = self.source.fetch_pollutants(coordinate).await?;
        let hour = (self.clock)();
        let category = self.estimator.estimate(&snapshot.features(hour))?;
        debug!(hour, %category, "Estimated area AQI");
        Ok(Some(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::BreakpointEstimator;
    use crate::models::pollutant::components;
    use crate::{AirError, ErrorCode};

    struct FixedSource(Option<PollutantSnapshot>);

    #[async_trait]
    impl PollutantSource for FixedSource {
        async fn fetch_pollutants(&self, _coordinate: Coordinate) -> Result<PollutantSnapshot> {
            self.0
                .clone()
                .ok_or_else(|| AirError::upstream(ErrorCode::HttpStatus(500), "boom"))
        }
    }

    fn snapshot(pm2_5: f64) -> PollutantSnapshot {
        PollutantSnapshot::from_components(&components([
            ("co", 200.0),
            ("no", 1.0),
            ("no2", 5.0),
            ("o3", 10.0),
            ("so2", 2.0),
            ("pm2_5", pm2_5),
            ("pm10", 10.0),
            ("nh3", 3.0),
        ]))
        .unwrap()
    }

    #[tokio::test]
    async fn test_estimating_lookup() {
        let lookup = EstimatingLookup::new(
            Arc::new(FixedSource(Some(snapshot(60.0)))),
            Arc::new(BreakpointEstimator),
            Arc::new(|| 9u32),
        );
        let category = lookup
            .lookup_area_aqi(Coordinate::new(12.9, 77.6).unwrap())
            .await
            .unwrap();
        assert_eq!(category, Some(AqiCategory::Poor));
    }

    #[tokio::test]
    async fn test_estimating_lookup_propagates_source_failure() {
        let lookup = EstimatingLookup::new(
            Arc::new(FixedSource(None)),
            Arc::new(BreakpointEstimator),
            Arc::new(|| 9u32),
        );
        let result = lookup.lookup_area_aqi(Coordinate::new(12.9, 77.6).unwrap()).await;
        assert!(matches!(result, Err(AirError::Upstream { .. })));
    }

    #[test]
    fn test_local_clock_is_an_hour() {
        assert!(local_hour_clock()() < 24);
    }
}
