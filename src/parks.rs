//! Points of interest (parks) near a coordinate

use crate::api::ApiClient;
use crate::models::{Coordinate, Location};
use crate::{AirError, ErrorCode, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Default Overpass interpreter endpoint
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Parks (or other POIs) within a radius of a center
#[async_trait]
pub trait PoiSource: Send + Sync {
    async fn find_nearby(&self, center: Coordinate, radius_m: u32) -> Result<Vec<Location>>;
}

/// OpenStreetMap parks through the Overpass API
pub struct OverpassPoiSource {
    api: ApiClient,
    url: String,
}

impl OverpassPoiSource {
    pub fn new(api: ApiClient, url: impl Into<String>) -> Self {
        Self {
            api,
            url: url.into(),
        }
    }

    fn query(center: Coordinate, radius_m: u32) -> String {
        format!(
            r#"[out:json][timeout:25];
            (
              way["leisure"="park"]["name"](around:{radius_m},{lat},{lon});
              relation["leisure"="park"]["name"](around:{radius_m},{lat},{lon});
              node["leisure"="park"]["name"](around:{radius_m},{lat},{lon});
            );
            out center tags;"#,
            lat = center.latitude,
            lon = center.longitude,
        )
    }
}

/// Elements closer than this with the same name are one park
const SAME_PARK_KM: f64 = 0.2;

/// Named parks from an Overpass response. Elements without a name or a
/// position are skipped. A way and a relation mapping the same park are kept
/// once; equally named parks further apart are kept separately.
fn parse_elements(v: &Value) -> Result<Vec<Location>> {
    let elements = v["elements"].as_array().ok_or_else(|| {
        AirError::upstream(
            ErrorCode::MalformedPayload,
            "Overpass response has no elements",
        )
    })?;

    let mut parks: Vec<Location> = Vec::new();
    for el in elements {
        let Some(name) = el["tags"]["name"].as_str() else {
            continue;
        };

        // nodes carry lat/lon directly, ways and relations carry a center
        let position = el["lat"]
            .as_f64()
            .zip(el["lon"].as_f64())
            .or_else(|| el["center"]["lat"].as_f64().zip(el["center"]["lon"].as_f64()));
        let Some((lat, lon)) = position else {
            continue;
        };
        let Ok(coordinate) = Coordinate::new(lat, lon) else {
            continue;
        };

        let duplicate = parks
            .iter()
            .any(|p| p.name == name && p.coordinate.distance_km(&coordinate) < SAME_PARK_KM);
        if duplicate {
            continue;
        }
        parks.push(Location::new(coordinate, name.to_string()));
    }
    Ok(parks)
}

#[async_trait]
impl PoiSource for OverpassPoiSource {
    #[instrument(skip(self))]
    async fn find_nearby(&self, center: Coordinate, radius_m: u32) -> Result<Vec<Location>> {
        info!(
            "Searching parks within {}m of ({})",
            radius_m,
            center.format_coordinates()
        );
        let query = Self::query(center, radius_m);
        let v: Value = self.api.post_form_json(&self.url, &[("data", query.as_str())]).await?;
        let parks = parse_elements(&v)?;
        debug!("Found {} named parks", parks.len());
        Ok(parks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nodes_and_ways() {
        let v: Value = serde_json::from_str(
            r#"{"elements": [
                {"type": "node", "lat": 12.95, "lon": 77.58, "tags": {"name": "Lalbagh"}},
                {"type": "way", "center": {"lat": 12.97, "lon": 77.59},
                 "tags": {"name": "Cubbon Park"}},
                {"type": "way", "center": {"lat": 12.97, "lon": 77.59},
                 "tags": {"leisure": "park"}},
                {"type": "way", "tags": {"name": "No Geometry"}},
                {"type": "relation", "center": {"lat": 12.971, "lon": 77.591},
                 "tags": {"name": "Cubbon Park"}}
            ]}"#,
        )
        .unwrap();

        let parks = parse_elements(&v).unwrap();
        let names: Vec<&str> = parks.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Lalbagh", "Cubbon Park"]);
        assert_eq!(parks[1].coordinate.latitude, 12.97);
    }

    #[test]
    fn test_same_name_far_apart_kept() {
        let v: Value = serde_json::from_str(
            r#"{"elements": [
                {"type": "way", "center": {"lat": 12.90, "lon": 77.60},
                 "tags": {"name": "Gandhi Park"}},
                {"type": "way", "center": {"lat": 12.95, "lon": 77.62},
                 "tags": {"name": "Gandhi Park"}},
                {"type": "relation", "center": {"lat": 12.9005, "lon": 77.6005},
                 "tags": {"name": "Gandhi Park"}}
            ]}"#,
        )
        .unwrap();

        let parks = parse_elements(&v).unwrap();
        assert_eq!(parks.len(), 2);
        assert_eq!(parks[0].coordinate.latitude, 12.90);
        assert_eq!(parks[1].coordinate.latitude, 12.95);
    }

    #[test]
    fn test_missing_elements_is_malformed() {
        let v: Value = serde_json::from_str(r#"{"remark": "runtime error"}"#).unwrap();
        let err = parse_elements(&v).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::MalformedPayload));
    }

    #[test]
    fn test_query_contains_radius_and_center() {
        let query = OverpassPoiSource::query(Coordinate::new(12.9, 77.6).unwrap(), 2000);
        assert!(query.contains("around:2000,12.9,77.6"));
        assert!(query.contains(r#""leisure"="park""#));
    }
}
