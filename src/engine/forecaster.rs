//! Hour-of-day AQI forecasting from a single pollutant snapshot.
//!
//! Pollutant levels are held constant over the window; only the hour
//! feature changes between steps.

use crate::estimator::AqiEstimator;
use crate::models::{AqiCategory, ForecastPoint, PollutantSnapshot};
use crate::{AirError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default number of future hours
pub const DEFAULT_FORECAST_HORIZON: u32 = 5;

pub struct HourlyForecaster {
    estimator: Arc<dyn AqiEstimator>,
    horizon: u32,
}

impl HourlyForecaster {
    pub fn new(estimator: Arc<dyn AqiEstimator>, horizon: u32) -> Self {
        Self { estimator, horizon }
    }

    /// Category for a single hour of day
    pub fn estimate_at(&self, snapshot: &PollutantSnapshot, hour: u32) -> Result<AqiCategory> {
        if hour > 23 {
            return Err(AirError::validation(format!(
                "Hour must be between 0 and 23, got: {hour}"
            )));
        }
        self.estimator
            .estimate(&snapshot.features(hour))
            .map_err(|e| match e {
                AirError::EstimationFailure { .. } => e,
                other => AirError::estimation(other.to_string()),
            })
    }

    /// Forecast `horizon` hours after `base_hour`, plus the base hour itself
    /// when `include_current_hour` is set.
    ///
    /// The first estimator failure fails the whole forecast.
    #[instrument(skip(self, snapshot))]
    pub fn forecast(
        &self,
        snapshot: &PollutantSnapshot,
        base_hour: u32,
        include_current_hour: bool,
    ) -> Result<Vec<ForecastPoint>> {
        if base_hour > 23 {
            return Err(AirError::validation(format!(
                "Base hour must be between 0 and 23, got: {base_hour}"
            )));
        }

        let first_offset = u32::from(!include_current_hour);
        (first_offset..=self.horizon)
            .map(|hour_offset| {
                let hour = (base_hour + hour_offset) % 24;
                let category = self.estimate_at(snapshot, hour)?;
                debug!(hour_offset, hour, %category, "Forecast step");
                Ok(ForecastPoint {
                    hour_offset,
                    hour,
                    category,
                })
            })
            .collect()
    }

    /// Like [`forecast`](Self::forecast) for a raw provider component map.
    ///
    /// Fails with `IncompleteSnapshot` before any estimation if a pollutant is
    /// missing.
    pub fn forecast_components(
        &self,
        components: &HashMap<String, f64>,
        base_hour: u32,
        include_current_hour: bool,
    ) -> Result<Vec<ForecastPoint>> {
        let snapshot = PollutantSnapshot::from_components(components)?;
        self.forecast(&snapshot, base_hour, include_current_hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::BreakpointEstimator;
    use crate::models::pollutant::components;
    use crate::models::FeatureVector;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scenario() -> HashMap<String, f64> {
        components([
            ("co", 200.0),
            ("no", 1.0),
            ("no2", 5.0),
            ("o3", 10.0),
            ("so2", 2.0),
            ("pm2_5", 15.0),
            ("pm10", 30.0),
            ("nh3", 3.0),
        ])
    }

    fn forecaster(horizon: u32) -> HourlyForecaster {
        HourlyForecaster::new(Arc::new(BreakpointEstimator), horizon)
    }

    fn hours(points: &[ForecastPoint]) -> Vec<u32> {
        points.iter().map(|p| p.hour).collect()
    }

    #[test]
    fn test_scenario_base_hour_ten() {
        let points = forecaster(5).forecast_components(&scenario(), 10, false).unwrap();
        assert_eq!(hours(&points), vec![11, 12, 13, 14, 15]);
        assert!(points.iter().all(|p| AqiCategory::ALL.contains(&p.category)));
        assert_eq!(
            points.iter().map(|p| p.hour_offset).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[rstest]
    #[case(22, false, vec![23, 0, 1, 2, 3])]
    #[case(22, true, vec![22, 23, 0, 1, 2, 3])]
    #[case(0, true, vec![0, 1, 2, 3, 4, 5])]
    #[case(23, false, vec![0, 1, 2, 3, 4])]
    fn test_hour_wraparound(
        #[case] base_hour: u32,
        #[case] include_current: bool,
        #[case] expected: Vec<u32>,
    ) {
        let points = forecaster(5)
            .forecast_components(&scenario(), base_hour, include_current)
            .unwrap();
        assert_eq!(hours(&points), expected);
    }

    #[test]
    fn test_include_current_starts_at_offset_zero() {
        let points = forecaster(3).forecast_components(&scenario(), 8, true).unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].hour_offset, 0);
        assert!(points.windows(2).all(|w| w[0].hour_offset < w[1].hour_offset));
    }

    #[test]
    fn test_incomplete_snapshot() {
        let mut partial = scenario();
        partial.remove("pm10");
        let result = forecaster(5).forecast_components(&partial, 10, false);
        assert!(matches!(result, Err(AirError::IncompleteSnapshot { .. })));
    }

    #[test]
    fn test_invalid_base_hour() {
        let result = forecaster(5).forecast_components(&scenario(), 24, false);
        assert!(matches!(result, Err(AirError::Validation { .. })));
    }

    /// Fails on one specific hour
    struct FailsAt {
        hour: f64,
        calls: AtomicUsize,
    }

    impl AqiEstimator for FailsAt {
        fn estimate(&self, features: &FeatureVector) -> Result<AqiCategory> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if features[8] == self.hour {
                Err(AirError::estimation("model exploded"))
            } else {
                Ok(AqiCategory::Fair)
            }
        }
    }

    #[test]
    fn test_single_failure_fails_whole_forecast() {
        let estimator = Arc::new(FailsAt {
            hour: 13.0,
            calls: AtomicUsize::new(0),
        });
        let forecaster = HourlyForecaster::new(estimator.clone(), 5);
        let result = forecaster.forecast_components(&scenario(), 10, false);

        assert!(matches!(result, Err(AirError::EstimationFailure { .. })));
        // stops at the failing hour, nothing partial is returned
        assert_eq!(estimator.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_estimate_at_runs_one_hour() {
        let estimator = Arc::new(FailsAt {
            hour: 13.0,
            calls: AtomicUsize::new(0),
        });
        let forecaster = HourlyForecaster::new(estimator.clone(), 5);
        let snapshot = PollutantSnapshot::from_components(&scenario()).unwrap();

        // a later failing hour does not affect the requested one
        assert_eq!(forecaster.estimate_at(&snapshot, 10).unwrap(), AqiCategory::Fair);
        assert_eq!(estimator.calls.load(Ordering::SeqCst), 1);

        assert!(matches!(
            forecaster.estimate_at(&snapshot, 13),
            Err(AirError::EstimationFailure { .. })
        ));
        assert!(matches!(
            forecaster.estimate_at(&snapshot, 24),
            Err(AirError::Validation { .. })
        ));
    }
}
