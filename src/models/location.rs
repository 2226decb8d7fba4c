//! Location model for geographic coordinates and catalog records

use serde::{Deserialize, Serialize};

use crate::{ForecastError, Result};

/// Validated latitude/longitude pair
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting values outside the valid ranges
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ForecastError::invalid_input(
                "latitude",
                latitude.to_string(),
                "a value in [-90, 90]",
            ));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ForecastError::invalid_input(
                "longitude",
                longitude.to_string(),
                "a value in [-180, 180]",
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Build a coordinate from catalog columns that may be missing.
    /// Returns `None` when either half is absent or out of range.
    #[must_use]
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).ok(),
            _ => None,
        }
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }

    /// Coordinate part of a cache key, rounded to two decimals (~1 km)
    #[must_use]
    pub fn cache_key_part(&self) -> String {
        let (lat, lon) = self.rounded(2);
        format!("{lat:.2}:{lon:.2}")
    }
}

/// Municipality record as served by the geo catalog
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LocationRecord {
    /// IBGE municipality code
    pub id: String,
    /// Municipality name
    pub name: String,
    /// Federative unit (state) abbreviation, e.g. "SP"
    pub state: Option<String>,
    pub coordinate: Coordinate,
}

impl LocationRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: None,
            coordinate,
        }
    }

    /// Name with the state suffix when known ("Campinas - SP")
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.state {
            Some(state) => format!("{} - {}", self.name, state),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_bounds() {
        assert!(Coordinate::new(-23.55, -46.63).is_ok());
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(90.1, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_coordinate_requires_both_parts() {
        assert!(Coordinate::from_parts(Some(-22.9), Some(-47.06)).is_some());
        assert!(Coordinate::from_parts(Some(-22.9), None).is_none());
        assert!(Coordinate::from_parts(None, Some(-47.06)).is_none());
    }

    #[test]
    fn test_cache_key_part() {
        let coordinate = Coordinate::new(-22.905_56, -47.060_83).unwrap();
        assert_eq!(coordinate.cache_key_part(), "-22.91:-47.06");
    }

    #[test]
    fn test_display_name() {
        let mut record =
            LocationRecord::new("3509502", "Campinas", Coordinate::new(-22.9, -47.06).unwrap());
        assert_eq!(record.display_name(), "Campinas");
        record.state = Some("SP".to_string());
        assert_eq!(record.display_name(), "Campinas - SP");
    }
}
