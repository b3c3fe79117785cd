use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::api::ApiClient;
use crate::models::{Coordinate, path_length_km};
use crate::{AirError, ErrorCode, Result};

/// Default GraphHopper API base
pub const DEFAULT_GRAPHHOPPER_URL: &str = "https://graphhopper.com/api/1";

/// A candidate path as returned by a router
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedPath {
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
}

/// Candidate paths between two coordinates
#[async_trait]
pub trait PathSource: Send + Sync {
    async fn route(&self, start: Coordinate, end: Coordinate) -> Result<Vec<RoutedPath>>;
}

pub struct GraphHopperRouter {
    api: ApiClient,
    base_url: String,
    api_key: String,
    max_paths: usize,
}

impl GraphHopperRouter {
    pub fn new(
        api: ApiClient,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        max_paths: usize,
    ) -> Self {
        Self {
            api,
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_paths: max_paths.max(1),
        }
    }

    fn url(&self, start: Coordinate, end: Coordinate) -> String {
        let mut url = format!(
            "{}/route?point={},{}&point={},{}\
             &profile=foot&points_encoded=false&calc_points=true&key={}",
            self.base_url.trim_end_matches('/'),
            start.latitude,
            start.longitude,
            end.latitude,
            end.longitude,
            urlencoding::encode(&self.api_key)
        );
        if self.max_paths > 1 {
            url.push_str(&format!(
                "&algorithm=alternative_route&alternative_route.max_paths={}",
                self.max_paths
            ));
        }
        url
    }
}

#[async_trait]
impl PathSource for GraphHopperRouter {
    #[instrument(skip(self))]
    async fn route(&self, start: Coordinate, end: Coordinate) -> Result<Vec<RoutedPath>> {
        debug!("Calling the routing API");
        let response: ApiResponse = self.api.get_json(&self.url(start, end)).await?;
        response.into_paths()
    }
}

#[derive(Debug, Deserialize)]
struct PointList {
    /// GeoJSON order: `[lon, lat]`
    coordinates: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct PathResponse {
    /// Meters
    distance: Option<f64>,
    points: PointList,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    paths: Vec<PathResponse>,
}

impl ApiResponse {
    fn into_paths(self) -> Result<Vec<RoutedPath>> {
        if self.paths.is_empty() {
            return Err(AirError::upstream(ErrorCode::NotFound, "No paths in response"));
        }

        self.paths
            .into_iter()
            .map(|p| {
                let path = p
                    .points
                    .coordinates
                    .iter()
                    .map(|pair| match pair.as_slice() {
                        [lon, lat, ..] => Coordinate::new(*lat, *lon),
                        _ => Err(AirError::validation("point needs longitude and latitude")),
                    })
                    .collect::<Result<Vec<_>>>()
                    .map_err(|e| AirError::upstream(ErrorCode::MalformedPayload, e.to_string()))?;

                if path.is_empty() {
                    return Err(AirError::upstream(
                        ErrorCode::MalformedPayload,
                        "Routed path has no points",
                    ));
                }

                let distance_km = p
                    .distance
                    .filter(|d| d.is_finite() && *d >= 0.0)
                    .map(|d| d / 1000.0)
                    .unwrap_or_else(|| path_length_km(&path));
                Ok(RoutedPath { path, distance_km })
            })
            .collect()
    }
}
