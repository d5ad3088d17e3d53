//! Geographic coordinates.

use serde::{Deserialize, Serialize};

/// Errors from constructing a [`GeoPoint`].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// Latitude outside [-90, 90] or not finite.
    #[error("latitude must be between -90 and 90 (got {0})")]
    Latitude(f64),
    /// Longitude outside [-180, 180] or not finite.
    #[error("longitude must be between -180 and 180 (got {0})")]
    Longitude(f64),
}

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Create a point, rejecting out-of-range coordinates.
    ///
    /// # Errors
    ///
    /// Returns `GeoError` if either coordinate is out of range or not finite.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::Latitude(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::Longitude(lng));
        }
        Ok(Self { lat, lng })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_point() {
        assert!(GeoPoint::new(31.6295, -7.9811).is_ok());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_invalid_latitude() {
        assert!(matches!(GeoPoint::new(90.5, 0.0), Err(GeoError::Latitude(_))));
        assert!(matches!(
            GeoPoint::new(f64::NAN, 0.0),
            Err(GeoError::Latitude(_))
        ));
    }

    #[test]
    fn test_invalid_longitude() {
        assert!(matches!(
            GeoPoint::new(0.0, -181.0),
            Err(GeoError::Longitude(_))
        ));
    }
}
