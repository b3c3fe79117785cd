//! Route/area AQI aggregation with partial-failure tolerance

use super::{CancelToken, RateLimiter};
use crate::Result;
use crate::air_quality::AreaAqiLookup;
use crate::models::{Coordinate, SampledPoint};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Default per-lookup timeout
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-point results plus what happened to the points without a category
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregationReport {
    pub points: Vec<SampledPoint>,
    /// Points that yielded a category
    pub scored: usize,
    /// Lookups that succeeded but had no data for the point
    pub no_data: usize,
    /// Lookups that returned an error
    pub failed: usize,
    /// Lookups abandoned after the timeout
    pub timed_out: usize,
    /// Mean category over the scored points, `None` when nothing was scored
    pub score: Option<f64>,
}

/// Arithmetic mean of the categories present; `None` when there are none
#[must_use]
pub fn mean_score(points: &[SampledPoint]) -> Option<f64> {
    let (sum, count) = points
        .iter()
        .filter_map(|p| p.category)
        .fold((0.0, 0usize), |(sum, count), c| (sum + c.score(), count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Queries an area lookup point by point, throttled, and averages the results
pub struct AqiAggregator {
    lookup: Arc<dyn AreaAqiLookup>,
    limiter: Arc<dyn RateLimiter>,
    lookup_timeout: Duration,
}

impl AqiAggregator {
    pub fn new(
        lookup: Arc<dyn AreaAqiLookup>,
        limiter: Arc<dyn RateLimiter>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            lookup,
            limiter,
            lookup_timeout,
        }
    }

    /// Look up every point once, in order, and report per-point outcomes.
    ///
    /// Lookup errors, timeouts and missing data are absorbed into the report
    /// and never retried. The only error is `Cancelled`, checked before each
    /// point and while waiting on the rate limiter.
    #[instrument(skip(self, points, cancel), fields(points = points.len()))]
    pub async fn score_points(
        &self,
        points: &[Coordinate],
        cancel: &CancelToken,
    ) -> Result<AggregationReport> {
        let start_time = Instant::now();
        let mut report = AggregationReport {
            points: Vec::with_capacity(points.len()),
            ..AggregationReport::default()
        };

        for (i, coordinate) in points.iter().enumerate() {
            cancel.check()?;
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = self.limiter.acquire() => {}
            }
            // a cancel during the throttle wait must not spend a lookup
            cancel.check()?;

            let outcome = tokio::time::timeout(
                self.lookup_timeout,
                self.lookup.lookup_area_aqi(*coordinate),
            )
            .await;

            let category = match outcome {
                Ok(Ok(Some(category))) => {
                    report.scored += 1;
                    debug!(point = i, %category, "Sample point scored");
                    Some(category)
                }
                Ok(Ok(None)) => {
                    report.no_data += 1;
                    debug!(point = i, "No AQI data for sample point");
                    None
                }
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(
                        point = i,
                        lat = coordinate.latitude,
                        lon = coordinate.longitude,
                        "AQI lookup failed: {}",
                        e
                    );
                    None
                }
                Err(_) => {
                    report.timed_out += 1;
                    warn!(
                        point = i,
                        "AQI lookup timed out after {:.1}s",
                        self.lookup_timeout.as_secs_f64()
                    );
                    None
                }
            };

            report.points.push(SampledPoint {
                coordinate: *coordinate,
                category,
            });
        }

        report.score = mean_score(&report.points);

        info!(
            scored = report.scored,
            no_data = report.no_data,
            failed = report.failed,
            timed_out = report.timed_out,
            "Aggregated {} points in {:.3}s",
            points.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(report)
    }

    /// Mean AQI over the points, `None` when no point could be scored
    pub async fn aggregate(
        &self,
        points: &[Coordinate],
        cancel: &CancelToken,
    ) -> Result<Option<f64>> {
        Ok(self.score_points(points, cancel).await?.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FixedDelayLimiter, NoopLimiter, SlidingWindowLimiter};
    use crate::models::AqiCategory;
    use crate::{AirError, ErrorCode};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Category(AqiCategory),
        NoData,
        Fail,
        Hang,
    }

    /// Replies keyed by latitude
    struct ScriptedLookup {
        replies: HashMap<u64, Reply>,
        calls: AtomicUsize,
    }

    impl ScriptedLookup {
        fn new(replies: Vec<(f64, Reply)>) -> Self {
            Self {
                replies: replies.into_iter().map(|(lat, r)| (lat.to_bits(), r)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AreaAqiLookup for ScriptedLookup {
        async fn lookup_area_aqi(&self, coordinate: Coordinate) -> Result<Option<AqiCategory>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.get(&coordinate.latitude.to_bits()) {
                Some(Reply::Category(c)) => Ok(Some(*c)),
                Some(Reply::NoData) | None => Ok(None),
                Some(Reply::Fail) => Err(AirError::upstream(
                    ErrorCode::HttpStatus(502),
                    "bad gateway",
                )),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Some(AqiCategory::Good))
                }
            }
        }
    }

    fn point(lat: f64) -> Coordinate {
        Coordinate::new(lat, 77.0).unwrap()
    }

    fn aggregator(lookup: Arc<ScriptedLookup>) -> AqiAggregator {
        AqiAggregator::new(lookup, Arc::new(NoopLimiter), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_mean_of_successes_only() {
        let lookup = Arc::new(ScriptedLookup::new(vec![
            (1.0, Reply::Category(AqiCategory::Good)),
            (2.0, Reply::Category(AqiCategory::Moderate)),
            (3.0, Reply::Fail),
            (4.0, Reply::NoData),
        ]));
        let report = aggregator(lookup.clone())
            .score_points(&[point(1.0), point(2.0), point(3.0), point(4.0)], &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(report.score, Some(2.0));
        assert_eq!(report.scored, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.no_data, 1);
        assert_eq!(report.points.len(), 4);
        assert_eq!(report.points[2].category, None);
        // single shot per point, no retries
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_all_failing_is_no_score_not_zero() {
        let lookup = Arc::new(ScriptedLookup::new(vec![(1.0, Reply::Fail), (2.0, Reply::Fail)]));
        let score = aggregator(lookup)
            .aggregate(&[point(1.0), point(2.0)], &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(score, None);
    }

    #[tokio::test]
    async fn test_empty_input_is_no_score() {
        let lookup = Arc::new(ScriptedLookup::new(vec![]));
        let score = aggregator(lookup.clone())
            .aggregate(&[], &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(score, None);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_order_independent() {
        let replies = || {
            vec![
                (1.0, Reply::Category(AqiCategory::Poor)),
                (2.0, Reply::Category(AqiCategory::Good)),
                (3.0, Reply::Fail),
                (4.0, Reply::Category(AqiCategory::Fair)),
            ]
        };
        let forward = [point(1.0), point(2.0), point(3.0), point(4.0)];
        let backward = [point(4.0), point(3.0), point(2.0), point(1.0)];

        let a = aggregator(Arc::new(ScriptedLookup::new(replies())))
            .aggregate(&forward, &CancelToken::new())
            .await
            .unwrap()
            .unwrap();
        let b = aggregator(Arc::new(ScriptedLookup::new(replies())))
            .aggregate(&backward, &CancelToken::new())
            .await
            .unwrap()
            .unwrap();
        assert!((a - b).abs() < 1e-12);
        assert!((a - 7.0 / 3.0).abs() < 1e-12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let lookup = Arc::new(ScriptedLookup::new(vec![
            (1.0, Reply::Hang),
            (2.0, Reply::Category(AqiCategory::Fair)),
        ]));
        let report = AqiAggregator::new(lookup, Arc::new(NoopLimiter), Duration::from_secs(2))
            .score_points(&[point(1.0), point(2.0)], &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(report.timed_out, 1);
        assert_eq!(report.score, Some(2.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookups_are_throttled() {
        let lookup = Arc::new(ScriptedLookup::new(vec![]));
        let aggregator = AqiAggregator::new(
            lookup,
            Arc::new(FixedDelayLimiter::new(Duration::from_secs(1))),
            Duration::from_secs(5),
        );
        let start = tokio::time::Instant::now();
        aggregator
            .aggregate(&[point(1.0), point(2.0), point(3.0)], &CancelToken::new())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    /// Cancels the shared token after a fixed number of lookups
    struct CancellingLookup {
        token: CancelToken,
        after: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AreaAqiLookup for CancellingLookup {
        async fn lookup_area_aqi(&self, _coordinate: Coordinate) -> Result<Option<AqiCategory>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
                self.token.cancel();
            }
            Ok(Some(AqiCategory::Good))
        }
    }

    #[tokio::test]
    async fn test_cancellation_between_points() {
        let token = CancelToken::new();
        let lookup = Arc::new(CancellingLookup {
            token: token.clone(),
            after: 2,
            calls: AtomicUsize::new(0),
        });
        let aggregator =
            AqiAggregator::new(lookup.clone(), Arc::new(NoopLimiter), Duration::from_secs(5));

        let points: Vec<Coordinate> = (0..10).map(|i| point(f64::from(i))).collect();
        let result = aggregator.score_points(&points, &token).await;

        assert!(matches!(result, Err(AirError::Cancelled)));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    async fn cancel_during_throttle(limiter: Arc<dyn RateLimiter>) {
        let lookup = Arc::new(ScriptedLookup::new(vec![]));
        let aggregator = AqiAggregator::new(lookup.clone(), limiter, Duration::from_secs(5));
        let token = CancelToken::new();
        let handle = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            handle.cancel();
        });

        let start = tokio::time::Instant::now();
        let points = [point(1.0), point(2.0), point(3.0)];
        let result = aggregator.score_points(&points, &token).await;

        assert!(matches!(result, Err(AirError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(1));
        // only the first, unthrottled point was looked up
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_fixed_delay_wait() {
        cancel_during_throttle(Arc::new(FixedDelayLimiter::new(Duration::from_secs(60)))).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sliding_window_wait() {
        cancel_during_throttle(Arc::new(SlidingWindowLimiter::per_minute(1))).await;
    }

    #[test]
    fn test_mean_score_ignores_unknown() {
        let points = [
            SampledPoint {
                coordinate: point(1.0),
                category: Some(AqiCategory::Poor),
            },
            SampledPoint::unscored(point(2.0)),
        ];
        assert_eq!(mean_score(&points), Some(4.0));
        assert_eq!(mean_score(&[SampledPoint::unscored(point(1.0))]), None);
    }
}
