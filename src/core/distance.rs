use serde::{Deserialize, Serialize};
use crate::models::Coordinate;

/// Sphere radius used for great-circle distances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RadiusUnit {
    /// Earth radius in kilometers
    #[default]
    #[serde(rename = "km", alias = "kilometers")]
    Kilometers,
    /// Earth radius in meters
    #[serde(rename = "m", alias = "meters")]
    Meters,
}

impl RadiusUnit {
    #[inline]
    pub fn radius(&self) -> f64 {
        match self {
            RadiusUnit::Kilometers => 6378.0,
            RadiusUnit::Meters => 6_378_137.0,
        }
    }
}

/// Calculate the Haversine distance between two points
///
/// # Arguments
/// * `p` - First point in degrees
/// * `q` - Second point in degrees
/// * `unit` - Radius the result is expressed in
///
/// # Returns
/// Non-negative distance in the units of `unit`
#[inline]
pub fn haversine_distance(p: Coordinate, q: Coordinate, unit: RadiusUnit) -> f64 {
    let lat1_rad = p.latitude.to_radians();
    let lat2_rad = q.latitude.to_radians();
    let delta_lat = (q.latitude - p.latitude).to_radians();
    let delta_lon = (q.longitude - p.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    unit.radius() * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: Coordinate = Coordinate { latitude: 51.5074, longitude: -0.1278 };
    const PARIS: Coordinate = Coordinate { latitude: 48.8566, longitude: 2.3522 };

    #[test]
    fn test_haversine_distance() {
        // London to Paris is approximately 344 km
        let distance = haversine_distance(LONDON, PARIS, RadiusUnit::Kilometers);
        assert!((distance - 344.0).abs() < 10.0, "Distance should be ~344km, got {}", distance);
    }

    #[test]
    fn test_haversine_meters() {
        let km = haversine_distance(LONDON, PARIS, RadiusUnit::Kilometers);
        let m = haversine_distance(LONDON, PARIS, RadiusUnit::Meters);
        assert!((m / 1000.0 - km).abs() < 0.5);
    }

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(haversine_distance(PARIS, PARIS, RadiusUnit::Kilometers), 0.0);
    }

    #[test]
    fn test_symmetric() {
        let there = haversine_distance(LONDON, PARIS, RadiusUnit::Kilometers);
        let back = haversine_distance(PARIS, LONDON, RadiusUnit::Kilometers);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn test_antipodal_is_finite() {
        let p = Coordinate::new(0.0, 0.0);
        let q = Coordinate::new(0.0, 180.0);
        let distance = haversine_distance(p, q, RadiusUnit::Kilometers);
        assert!(distance.is_finite());
        assert!((distance - std::f64::consts::PI * 6378.0).abs() < 1e-3);
    }
}
