//! `AqiRoute` - Air-quality aware park and route recommendations
//!
//! This library samples coordinates along candidate paths or at nearby
//! parks, looks up the AQI at each one under a rate limit, aggregates the
//! results, and ranks the candidates. It also forecasts the hourly AQI at a
//! location from a single pollutant snapshot.

pub mod air_quality;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod location_resolver;
pub mod logging;
pub mod models;
pub mod parks;
pub mod planner;
pub mod routing;

// Re-export core types for public API
pub use air_quality::{AreaAqiLookup, EstimatingLookup, OpenWeatherClient, PollutantSource};
pub use api::{ApiClient, LocationInput, LocationParser};
pub use config::AqiRouteConfig;
pub use engine::{AggregationReport, AqiAggregator, CancelToken, HourlyForecaster};
pub use error::{AirError, ErrorCode};
pub use estimator::{AqiEstimator, BreakpointEstimator, ForestEstimator};
pub use location_resolver::{Geocoder, LocationResolver, OpenMeteoGeocoder};
pub use models::{AqiCategory, Coordinate, HourlyForecast, Location, ParkCandidate, RouteCandidate};
pub use parks::{OverpassPoiSource, PoiSource};
pub use planner::{CleanAirPlanner, ParkReport, PlannerSettings, RouteReport};
pub use routing::{GraphHopperRouter, PathSource, RoutedPath};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AirError>;
