//! OpenWeather air-pollution API client
//!
//! One endpoint serves both collaborator roles: `list[0].components` is the
//! raw pollutant snapshot and `list[0].main.aqi` is the provider's own 1–5
//! area index.

use super::{AreaAqiLookup, PollutantSource};
use crate::api::ApiClient;
use crate::models::{AqiCategory, Coordinate, PollutantSnapshot};
use crate::{AirError, ErrorCode, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Default API base
pub const DEFAULT_OPEN_WEATHER_URL: &str = "http://api.openweathermap.org/data/2.5";

#[derive(Debug, Deserialize)]
struct AirPollutionResponse {
    #[serde(default)]
    list: Vec<AirPollutionEntry>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionEntry {
    main: Option<MainIndex>,
    #[serde(default)]
    components: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct MainIndex {
    aqi: Option<u8>,
}

/// Client for `/air_pollution`
pub struct OpenWeatherClient {
    api: ApiClient,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(api: ApiClient, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, coordinate: Coordinate) -> String {
        format!(
            "{}/air_pollution?lat={}&lon={}&appid={}",
            self.base_url.trim_end_matches('/'),
            coordinate.latitude,
            coordinate.longitude,
            urlencoding::encode(&self.api_key)
        )
    }

    async fn fetch_entry(&self, coordinate: Coordinate) -> Result<AirPollutionEntry> {
        let response: AirPollutionResponse = self.api.get_json(&self.url(coordinate)).await?;
        first_entry(response, coordinate)
    }

    /// Requests sent by this client
    #[must_use]
    pub fn calls_made(&self) -> u64 {
        self.api.calls_made()
    }
}

fn first_entry(
    response: AirPollutionResponse,
    coordinate: Coordinate,
) -> Result<AirPollutionEntry> {
    response.list.into_iter().next().ok_or_else(|| {
        warn!(
            "Air pollution response for {} has an empty list",
            coordinate.format_coordinates()
        );
        AirError::upstream(
            ErrorCode::MalformedPayload,
            format!(
                "No air pollution entries for {}",
                coordinate.format_coordinates()
            ),
        )
    })
}

/// Provider index to category. A missing index is "no data"; an index outside
/// 1..=5 is a malformed payload.
fn entry_category(entry: &AirPollutionEntry) -> Result<Option<AqiCategory>> {
    match entry.main.as_ref().and_then(|m| m.aqi) {
        None => Ok(None),
        Some(aqi) => AqiCategory::try_from(aqi).map(Some).map_err(|_| {
            AirError::upstream(
                ErrorCode::MalformedPayload,
                format!("Provider AQI index out of range: {aqi}"),
            )
        }),
    }
}

#[async_trait]
impl PollutantSource for OpenWeatherClient {
    #[instrument(skip(self))]
    async fn fetch_pollutants(&self, coordinate: Coordinate) -> Result<PollutantSnapshot> {
        info!(
            "Getting pollutant snapshot for coordinates: {}",
            coordinate.format_coordinates()
        );
        let entry = self.fetch_entry(coordinate).await?;
        let snapshot = PollutantSnapshot::from_components(&entry.components)?;
        debug!("Pollutant snapshot: {:?}", snapshot);
        Ok(snapshot)
    }
}

#[async_trait]
impl AreaAqiLookup for OpenWeatherClient {
    #[instrument(skip(self))]
    async fn lookup_area_aqi(&self, coordinate: Coordinate) -> Result<Option<AqiCategory>> {
        let entry = self.fetch_entry(coordinate).await?;
        entry_category(&entry)
    }
}
