//! Location Resolution Module
//!
//! Resolves free-text location input (coordinates or place names) into a
//! [`Location`], geocoding names through an injected [`Geocoder`].

use crate::api::{ApiClient, LocationInput, LocationParser};
use crate::models::{Coordinate, Location};
use crate::{AirError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default OpenMeteo geocoding endpoint
pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1";

/// Free text to a location. `Ok(None)` when nothing matched.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, text: &str) -> Result<Option<Location>>;
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    admin1: Option<String>,
}

impl GeocodingResult {
    fn into_location(self) -> Result<Location> {
        let coordinate = Coordinate::new(self.latitude, self.longitude)?;
        let name = match self.admin1 {
            Some(state) => format!("{}, {}", self.name, state),
            None => self.name,
        };
        Ok(match self.country {
            Some(country) => Location::with_country(coordinate, name, country),
            None => Location::new(coordinate, name),
        })
    }
}

/// OpenMeteo geocoding API (no API key required)
pub struct OpenMeteoGeocoder {
    api: ApiClient,
    base_url: String,
}

impl OpenMeteoGeocoder {
    pub fn new(api: ApiClient, base_url: impl Into<String>) -> Self {
        Self {
            api,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, text: &str) -> Result<Option<Location>> {
        info!("Geocoding location: '{}'", text);

        let url = format!(
            "{}/search?name={}&count=5&language=en&format=json",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(text)
        );
        let response: GeocodingResponse = self.api.get_json(&url).await?;

        match response.results.unwrap_or_default().into_iter().next() {
            Some(best) => {
                let location = best.into_location()?;
                debug!(
                    "Found location: {} ({})",
                    location.name,
                    location.coordinate.format_coordinates()
                );
                Ok(Some(location))
            }
            None => {
                warn!("No results found for location '{}'", text);
                Ok(None)
            }
        }
    }
}

/// Service for resolving location inputs
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Resolve user input into a structured Location
    pub async fn resolve(&self, input: &str) -> Result<Location> {
        match LocationParser::parse(input)? {
            LocationInput::Coordinates(coordinate) => {
                debug!("Using coordinates as given: {}", coordinate.format_coordinates());
                Ok(Location::new(coordinate, coordinate.format_coordinates()))
            }
            LocationInput::Name(name) => self
                .geocoder
                .geocode(&name)
                .await?
                .ok_or_else(|| AirError::validation(format!("Location not found: {name}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubGeocoder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn geocode(&self, text: &str) -> Result<Option<Location>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text == "Lalbagh" {
                Ok(Some(Location::new(
                    Coordinate::new(12.9507, 77.5848).unwrap(),
                    "Lalbagh".to_string(),
                )))
            } else {
                Ok(None)
            }
        }
    }

    fn resolver() -> (Arc<StubGeocoder>, LocationResolver) {
        let stub = Arc::new(StubGeocoder {
            calls: AtomicUsize::new(0),
        });
        (stub.clone(), LocationResolver::new(stub))
    }

    #[tokio::test]
    async fn test_coordinates_skip_geocoding() {
        let (stub, resolver) = resolver();
        let location = resolver.resolve("12.9169, 77.6247").await.unwrap();
        assert_eq!(location.name, "12.9169, 77.6247");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_names_are_geocoded() {
        let (stub, resolver) = resolver();
        let location = resolver.resolve("Lalbagh").await.unwrap();
        assert_eq!(location.coordinate.latitude, 12.9507);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_name_is_validation_error() {
        let (_, resolver) = resolver();
        let result = resolver.resolve("Atlantis").await;
        assert!(matches!(result, Err(AirError::Validation { .. })));
    }

    #[test]
    fn test_geocoding_result_to_location() {
        let result: GeocodingResponse = serde_json::from_str(
            r#"{"results": [{"name": "Bengaluru", "latitude": 12.97, "longitude": 77.59,
                             "country": "India", "admin1": "Karnataka"}]}"#,
        )
        .unwrap();
        let location = result.results.unwrap().remove(0).into_location().unwrap();
        assert_eq!(location.name, "Bengaluru, Karnataka");
        assert_eq!(location.country, Some("India".to_string()));
    }
}
