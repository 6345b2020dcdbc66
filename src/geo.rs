//! Geographic point type and great-circle distance.
//!
//! All coordinates are WGS84 degrees. Validity is checked once, at
//! construction, so distance functions are total over `GeoPoint`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Latitude-independent degree length used to size grid search rings.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Precondition violations for geographic values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Invalid latitude {0}: must be within -90..=90")]
    InvalidLatitude(f64),
    #[error("Invalid longitude {0}: must be within -180..=180")]
    InvalidLongitude(f64),
    #[error("Invalid cell size {0}: must be a positive number of degrees")]
    InvalidCellSize(f64),
}

/// A validated (latitude, longitude) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = GeoError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.latitude, raw.longitude)
    }
}

impl GeoPoint {
    /// Build a point, rejecting NaN and out-of-range values. Nothing is clamped.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        // NaN fails `contains`, so it lands in the error branch too.
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::InvalidLatitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidLongitude(longitude));
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Great-circle distance in kilometers (haversine, spherical Earth).
///
/// Symmetric bit-for-bit and exactly zero for identical points.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    // abs() makes the half-angle terms independent of argument order
    let dlat = (b.latitude - a.latitude).abs().to_radians();
    let dlon = (b.longitude - a.longitude).abs().to_radians();
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points.
    let h = h.min(1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Planar squared distance in degrees: `Δlat² + Δlon²`.
///
/// Cheap proxy used by the region assignment policy. Not a geodesic measure.
pub fn squared_degree_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = a.latitude - b.latitude;
    let dlon = a.longitude - b.longitude;
    dlat * dlat + dlon * dlon
}
