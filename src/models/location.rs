//! Geographic coordinate and named location models

use crate::AirError;
use serde::{Deserialize, Serialize};

/// A point on the globe in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees, -90..=90
    pub latitude: f64,
    /// Longitude in decimal degrees, -180..=180
    pub longitude: f64,
}

impl Coordinate {
    /// Create a validated coordinate
    pub fn new(latitude: f64, longitude: f64) -> crate::Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AirError::validation(format!(
                "Latitude must be between -90 and 90, got: {latitude}"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AirError::validation(format!(
                "Longitude must be between -180 and 180, got: {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance to another coordinate in kilometers
    #[must_use]
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine::distance(
            haversine::Location {
                latitude: self.latitude,
                longitude: self.longitude,
            },
            haversine::Location {
                latitude: other.latitude,
                longitude: other.longitude,
            },
            haversine::Units::Kilometers,
        )
    }

    /// Format as "lat, lon" with four decimals
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Total length of a polyline in kilometers
#[must_use]
pub fn path_length_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| w[0].distance_km(&w[1])).sum()
}

/// A coordinate with a human-readable name
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    pub coordinate: Coordinate,
    /// Location name (city, park, etc.)
    pub name: String,
    /// Country name or code, when the source provides one
    pub country: Option<String>,
}

impl Location {
    #[must_use]
    pub fn new(coordinate: Coordinate, name: String) -> Self {
        Self {
            coordinate,
            name,
            country: None,
        }
    }

    #[must_use]
    pub fn with_country(coordinate: Coordinate, name: String, country: String) -> Self {
        Self {
            coordinate,
            name,
            country: Some(country),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(12.9169, 77.6247).is_ok());
        assert!(Coordinate::new(90.0, -180.0).is_ok());
        assert!(Coordinate::new(90.1, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_distance_and_path_length() {
        let a = Coordinate::new(45.0, 6.0).unwrap();
        let b = Coordinate::new(46.0, 6.0).unwrap();
        let leg = a.distance_km(&b);
        // one degree of latitude is roughly 111 km
        assert!((leg - 111.0).abs() < 1.5);

        assert_eq!(path_length_km(&[a]), 0.0);
        assert!((path_length_km(&[a, b, a]) - 2.0 * leg).abs() < 1e-9);
    }

    #[test]
    fn test_format_coordinates() {
        let coordinate = Coordinate::new(12.9169, 77.6247).unwrap();
        assert_eq!(coordinate.format_coordinates(), "12.9169, 77.6247");
    }
}
