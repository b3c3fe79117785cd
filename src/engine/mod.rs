//! AQI aggregation engine
//!
//! Sampling, throttled per-point lookup and aggregation, candidate
//! selection, and the hourly forecaster.

pub mod aggregator;
pub mod cancel;
pub mod forecaster;
pub mod rate_limit;
pub mod sampler;
pub mod selector;

pub use aggregator::{AggregationReport, AqiAggregator, DEFAULT_LOOKUP_TIMEOUT, mean_score};
pub use cancel::CancelToken;
pub use forecaster::{DEFAULT_FORECAST_HORIZON, HourlyForecaster};
pub use rate_limit::{FixedDelayLimiter, NoopLimiter, RateLimiter, SlidingWindowLimiter};
pub use sampler::{DEFAULT_SAMPLE_STRIDE, sample_path, sample_pois};
pub use selector::{DEFAULT_PARK_COUNT, select_best, select_top_k};
