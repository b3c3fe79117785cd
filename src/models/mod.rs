//! Data models for the AqiRoute library
//!
//! This module contains the core domain models organized by concern:
//! - Location: coordinates and named places
//! - Pollutant: raw concentration snapshots and estimator features
//! - Aqi: the ordinal AQI category
//! - Forecast: hourly forecast points
//! - Candidate: sample points and rankable parks/routes

pub mod aqi;
pub mod candidate;
pub mod forecast;
pub mod location;
pub mod pollutant;

// Re-export all public types for convenient access
pub use aqi::AqiCategory;
pub use candidate::{ParkCandidate, RouteCandidate, SampledPoint, Scored};
pub use forecast::{ForecastPoint, HourlyForecast};
pub use location::{Coordinate, Location, path_length_km};
pub use pollutant::{FEATURE_COUNT, FeatureVector, Pollutant, PollutantSnapshot};
