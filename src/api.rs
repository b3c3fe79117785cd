//! Shared HTTP client for the external air-quality, geocoding, POI and
//! routing services, plus location input parsing.
//!
//! Requests are single-shot: failures are classified into an [`ErrorCode`]
//! and returned, never retried here.

use crate::models::Coordinate;
use crate::{AirError, ErrorCode, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument, warn};

/// Thin wrapper over `reqwest::Client` that counts calls and maps failures
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    calls: Arc<AtomicU64>,
}

impl ApiClient {
    /// Create a new client with a request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("AqiRoute/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AirError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            calls: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Number of requests sent so far, across clones of this client
    #[must_use]
    pub fn calls_made(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// GET a JSON document
    #[instrument(skip(self, url), fields(url = %redact(url)))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let start_time = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_transport_error)?;

        Self::parse(response, start_time).await
    }

    /// POST a url-encoded form and read a JSON document
    #[instrument(skip(self, url, form), fields(url = %redact(url)))]
    pub async fn post_form_json<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let start_time = Instant::now();

        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(classify_transport_error)?;

        Self::parse(response, start_time).await
    }

    async fn parse<T: DeserializeOwned>(response: Response, start_time: Instant) -> Result<T> {
        let status = response.status();
        debug!(
            "HTTP response received: {} in {:.3}s",
            status,
            start_time.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            let code = match status.as_u16() {
                401 | 403 => ErrorCode::Unauthorized,
                404 => ErrorCode::NotFound,
                429 => ErrorCode::RateLimited,
                other => ErrorCode::HttpStatus(other),
            };
            warn!("API request failed with status {}", status);
            return Err(AirError::upstream(
                code,
                format!(
                    "API request failed with status: {} - {}",
                    status,
                    status.canonical_reason().unwrap_or("Unknown error")
                ),
            ));
        }

        let body = response.json::<T>().await.map_err(|e| {
            error!("Failed to parse response body: {}", e);
            if e.is_timeout() {
                AirError::upstream(ErrorCode::Timeout, e.to_string())
            } else {
                AirError::upstream(ErrorCode::MalformedPayload, e.to_string())
            }
        })?;

        if start_time.elapsed().as_secs() > 5 {
            warn!(
                "Slow API response detected: {:.3}s",
                start_time.elapsed().as_secs_f64()
            );
        }
        Ok(body)
    }
}

fn classify_transport_error(e: reqwest::Error) -> AirError {
    let code = if e.is_timeout() {
        ErrorCode::Timeout
    } else {
        ErrorCode::Network
    };
    warn!("Network error: {}", e);
    AirError::upstream(code, format!("Request failed: {e}"))
}

/// Strip API keys from a URL before it reaches the logs
fn redact(url: &str) -> String {
    match url.find('?') {
        Some(i) => {
            let (base, query) = url.split_at(i + 1);
            let query: Vec<String> = query
                .split('&')
                .map(|pair| match pair.split_once('=') {
                    Some((k, _)) if matches!(k, "appid" | "key" | "api_key") => format!("{k}=***"),
                    _ => pair.to_string(),
                })
                .collect();
            format!("{base}{}", query.join("&"))
        }
        None => url.to_string(),
    }
}

/// Location parsing utilities
pub struct LocationParser;

impl LocationParser {
    /// Parse free-text location input: coordinates or a place name
    pub fn parse(input: &str) -> Result<LocationInput> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AirError::validation("Location cannot be empty"));
        }

        if let Ok(coordinate) = Self::parse_coordinates(input) {
            return Ok(LocationInput::Coordinates(coordinate));
        }

        Ok(LocationInput::Name(input.to_string()))
    }

    /// Parse coordinates from string like "12.9169,77.6247" or "12.9169 77.6247"
    fn parse_coordinates(input: &str) -> Result<Coordinate> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        if parts.len() != 2 {
            return Err(AirError::validation("Coordinates must be in format 'lat,lon'"));
        }

        let lat = parts[0]
            .parse::<f64>()
            .map_err(|_| AirError::validation(format!("Invalid latitude: {}", parts[0])))?;
        let lon = parts[1]
            .parse::<f64>()
            .map_err(|_| AirError::validation(format!("Invalid longitude: {}", parts[1])))?;

        Coordinate::new(lat, lon)
    }
}

/// Types of location input
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    Coordinates(Coordinate),
    /// Place name to be geocoded
    Name(String),
}
