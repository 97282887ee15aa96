//! Geographic primitives shared by every component.
//!
//! Distances are great-circle (haversine) on a spherical earth, which is
//! accurate to well under a meter at walking scale. Bearings are initial
//! bearings in degrees, 0 = geographic north, 90 = east.

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl LatLng {
    /// Create a new coordinate.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to another coordinate in meters.
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        haversine_distance(*self, *other)
    }

    /// Initial bearing from this coordinate towards another, in [0, 360).
    pub fn bearing_to(&self, other: &LatLng) -> f64 {
        initial_bearing(*self, *other)
    }

    /// Move this coordinate by the given meters north and east.
    ///
    /// Uses a local equirectangular approximation; only meant for the short
    /// distances used by simulations and tests.
    pub fn offset_meters(&self, north_m: f64, east_m: f64) -> LatLng {
        let dlat = north_m / EARTH_RADIUS_M;
        let dlng = east_m / (EARTH_RADIUS_M * self.lat.to_radians().cos());
        LatLng::new(self.lat + dlat.to_degrees(), self.lng + dlng.to_degrees())
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

/// Haversine distance between two coordinates in meters.
pub fn haversine_distance(a: LatLng, b: LatLng) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lng - a.lng).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial great-circle bearing from `from` to `to`, in [0, 360).
pub fn initial_bearing(from: LatLng, to: LatLng) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let dlambda = (to.lng - from.lng).to_radians();

    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    normalize_degrees(y.atan2(x).to_degrees())
}

/// Normalize any finite angle into [0, 360).
///
/// Non-finite input maps to 0.
pub fn normalize_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}
