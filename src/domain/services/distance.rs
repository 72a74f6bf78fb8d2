use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AppError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::InvalidArgument(format!(
                "Coordinates out of range: ({}, {})",
                latitude, longitude
            )));
        }
        Ok(Self { latitude, longitude })
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Great-circle distance in kilometers between two coordinates given in degrees.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn within_radius(origin: &GeoPoint, destination: &GeoPoint, max_km: f64) -> Result<bool, AppError> {
    if max_km < 0.0 || max_km.is_nan() {
        return Err(AppError::InvalidArgument(format!("Negative distance limit: {}", max_km)));
    }
    Ok(origin.distance_to(destination) <= max_km)
}
