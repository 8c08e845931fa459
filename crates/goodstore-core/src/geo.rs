use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Seoul City Hall, the default map center when no fix is available.
    pub const SEOUL_CITY_HALL: Coordinate = Coordinate {
        latitude: 37.5665,
        longitude: 126.9780,
    };

    /// Builds a coordinate, rejecting values outside the valid degree ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LatitudeOutOfRange`] or
    /// [`CoreError::LongitudeOutOfRange`] for out-of-range or non-finite input.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoreError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}
