//! Configuration management for `AqiRoute`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::AirError;
use crate::air_quality::open_weather::DEFAULT_OPEN_WEATHER_URL;
use crate::location_resolver::DEFAULT_GEOCODING_URL;
use crate::parks::DEFAULT_OVERPASS_URL;
use crate::routing::DEFAULT_GRAPHHOPPER_URL;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AqiRouteConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External service keys and endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Key for the pollutant source (OpenWeather)
    pub pollutant_source_key: Option<String>,
    /// Key for the area AQI lookup; falls back to the pollutant source key
    pub area_lookup_key: Option<String>,
    /// Key for the path source (GraphHopper)
    pub routing_key: Option<String>,
    #[serde(default = "default_pollutant_source_url")]
    pub pollutant_source_url: String,
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    #[serde(default = "default_poi_url")]
    pub poi_url: String,
    #[serde(default = "default_routing_url")]
    pub routing_url: String,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,
}

/// Path sampling and throttled lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_sample_stride")]
    pub sample_stride: usize,
    /// Minimum delay between two AQI lookups
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,
    /// Per-lookup timeout; a timed out point counts as failed
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    /// Quota-style limit; replaces the fixed delay when set
    pub max_requests_per_minute: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_forecast_horizon")]
    pub forecast_horizon: u32,
    #[serde(default)]
    pub include_current_hour: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Number of parks to recommend
    #[serde(default = "default_park_count")]
    pub park_count: usize,
    /// Park search radius in meters
    #[serde(default = "default_park_radius_m")]
    pub park_radius_m: u32,
    /// Alternative routes requested from the router
    #[serde(default = "default_route_count")]
    pub route_count: usize,
}

/// AQI estimator settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// JSON decision-forest export; the breakpoint table is used when unset
    pub model_path: Option<PathBuf>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty, compact or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_pollutant_source_url() -> String {
    DEFAULT_OPEN_WEATHER_URL.to_string()
}

fn default_geocoding_url() -> String {
    DEFAULT_GEOCODING_URL.to_string()
}

fn default_poi_url() -> String {
    DEFAULT_OVERPASS_URL.to_string()
}

fn default_routing_url() -> String {
    DEFAULT_GRAPHHOPPER_URL.to_string()
}

fn default_timeout_seconds() -> u32 {
    30
}

fn default_sample_stride() -> usize {
    crate::engine::DEFAULT_SAMPLE_STRIDE
}

fn default_rate_limit_delay_ms() -> u64 {
    1000
}

fn default_lookup_timeout_ms() -> u64 {
    10_000
}

fn default_forecast_horizon() -> u32 {
    crate::engine::DEFAULT_FORECAST_HORIZON
}

fn default_park_count() -> usize {
    crate::engine::DEFAULT_PARK_COUNT
}

fn default_park_radius_m() -> u32 {
    5000
}

fn default_route_count() -> usize {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            pollutant_source_key: None,
            area_lookup_key: None,
            routing_key: None,
            pollutant_source_url: default_pollutant_source_url(),
            geocoding_url: default_geocoding_url(),
            poi_url: default_poi_url(),
            routing_url: default_routing_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_stride: default_sample_stride(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
            max_requests_per_minute: None,
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            forecast_horizon: default_forecast_horizon(),
            include_current_hour: false,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            park_count: default_park_count(),
            park_radius_m: default_park_radius_m(),
            route_count: default_route_count(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SamplingConfig {
    #[must_use]
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }

    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl ApiConfig {
    /// Key used for per-point AQI lookups
    #[must_use]
    pub fn effective_area_lookup_key(&self) -> Option<&str> {
        self.area_lookup_key
            .as_deref()
            .or(self.pollutant_source_key.as_deref())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl AqiRouteConfig {
    /// Load configuration from `config_path`, or from the user config
    /// directory when `None`, then from the environment
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // e.g. AQIROUTE_API__ROUTING_KEY, AQIROUTE_SAMPLING__SAMPLE_STRIDE
        builder = builder.add_source(
            Environment::with_prefix("AQIROUTE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: AqiRouteConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("aqiroute").join("config.toml"))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<(), AirError> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Keys are optional, but an empty or implausible key is a mistake
    pub fn validate_api_keys(&self) -> Result<(), AirError> {
        let keys = [
            ("pollutant_source_key", &self.api.pollutant_source_key),
            ("area_lookup_key", &self.api.area_lookup_key),
            ("routing_key", &self.api.routing_key),
        ];
        for (name, key) in keys {
            if let Some(key) = key {
                if key.trim().is_empty() {
                    return Err(AirError::config(format!(
                        "{name} cannot be empty if provided. \
                         Either remove it or provide a valid key."
                    )));
                }
                if key.len() > 100 {
                    return Err(AirError::config(format!(
                        "{name} appears to be invalid (too long). Please check your API key."
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<(), AirError> {
        if self.api.timeout_seconds == 0 || self.api.timeout_seconds > 300 {
            return Err(AirError::config(
                "API timeout must be between 1 and 300 seconds",
            ));
        }

        if self.sampling.sample_stride == 0 {
            return Err(AirError::config("Sample stride must be at least 1"));
        }

        if self.sampling.rate_limit_delay_ms > 60_000 {
            return Err(AirError::config(
                "Rate limit delay cannot exceed 60000 ms",
            ));
        }

        if self.sampling.max_requests_per_minute == Some(0) {
            return Err(AirError::config(
                "Max requests per minute must be greater than 0",
            ));
        }

        if self.sampling.lookup_timeout_ms == 0 {
            return Err(AirError::config("Lookup timeout must be greater than 0"));
        }

        if !(1..=24).contains(&self.forecast.forecast_horizon) {
            return Err(AirError::config(
                "Forecast horizon must be between 1 and 24 hours",
            ));
        }

        if self.selection.park_count == 0 || self.selection.park_count > 50 {
            return Err(AirError::config("Park count must be between 1 and 50"));
        }

        if self.selection.park_radius_m == 0 || self.selection.park_radius_m > 50_000 {
            return Err(AirError::config(
                "Park search radius must be between 1 and 50000 m",
            ));
        }

        if self.selection.route_count == 0 || self.selection.route_count > 5 {
            return Err(AirError::config("Route count must be between 1 and 5"));
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<(), AirError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AirError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_log_formats = ["pretty", "compact", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AirError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            )));
        }

        let urls = [
            &self.api.pollutant_source_url,
            &self.api.geocoding_url,
            &self.api.poi_url,
            &self.api.routing_url,
        ];
        if let Some(url) = urls
            .iter()
            .find(|u| !u.starts_with("http://") && !u.starts_with("https://"))
        {
            return Err(AirError::config(format!(
                "Service URL must be a valid HTTP or HTTPS URL, got: {url}"
            )));
        }

        Ok(())
    }
}
