//! Great-circle distance on a spherical Earth

use crate::core::{GeoPoint, MEAN_EARTH_RADIUS_M};
use serde::{Deserialize, Serialize};

/// Spherical Earth model used as the solver's distance metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geodesy {
    /// Sphere radius (meters)
    pub radius_m: f64,
}

impl Default for Geodesy {
    fn default() -> Self {
        Self { radius_m: MEAN_EARTH_RADIUS_M }
    }
}

impl Geodesy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_radius(radius_m: f64) -> Self {
        Self { radius_m }
    }

    /// Haversine distance between two points (meters)
    ///
    /// The haversine term is clamped to [0, 1] so rounding can never push the
    /// square roots out of their domain.
    pub fn distance(&self, a: &GeoPoint, b: &GeoPoint) -> f64 {
        let phi1 = a.latitude().to_radians();
        let phi2 = b.latitude().to_radians();
        let dphi = (b.latitude() - a.latitude()).to_radians();
        let dlambda = (b.longitude() - a.longitude()).to_radians();

        let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
        let h = h.clamp(0.0, 1.0);

        2.0 * self.radius_m * h.sqrt().atan2((1.0 - h).sqrt())
    }
}

/// Haversine distance on the mean-radius sphere
pub fn distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    Geodesy::default().distance(a, b)
}
