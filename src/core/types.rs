//! Core data types for the multilateration solver

use serde::{Deserialize, Serialize};

use crate::validation::data::check_unique_ids;
use crate::validation::error::MlatError;

/// Geographic point in decimal degrees
///
/// Latitude lies in [-90, 90] and longitude in [-180, 180]. Points are only
/// created through [`GeoPoint::new`], so every value in circulation is valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Create a point, rejecting out-of-range or non-finite coordinates
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, MlatError> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        if !lat_ok || !lon_ok {
            return Err(MlatError::InvalidCoordinate { latitude, longitude });
        }
        Ok(Self { latitude, longitude })
    }

    /// Build a point from optimizer coordinates.
    ///
    /// Latitudes past a pole fold back over it onto the opposite meridian
    /// and longitude wraps across the antimeridian, so any finite pair maps
    /// onto the sphere and nearby coordinates stay nearby points.
    pub fn normalized(latitude: f64, longitude: f64) -> Self {
        let (latitude, longitude) = if latitude.is_finite() && longitude.is_finite() {
            let lat = (latitude + 180.0).rem_euclid(360.0) - 180.0;
            if lat > 90.0 {
                (180.0 - lat, longitude + 180.0)
            } else if lat < -90.0 {
                (-180.0 - lat, longitude + 180.0)
            } else {
                (lat, longitude)
            }
        } else {
            (
                if latitude.is_finite() { latitude.clamp(-90.0, 90.0) } else { 0.0 },
                if longitude.is_finite() { longitude } else { 0.0 },
            )
        };

        let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
        // rem_euclid maps +180 onto -180; keep the caller's sign at the seam
        let longitude = if wrapped == -180.0 && longitude > 0.0 { 180.0 } else { wrapped };
        Self { latitude, longitude }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Ground receiver with a fixed, known position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receiver {
    pub id: String,
    pub position: GeoPoint,
}

impl Receiver {
    pub fn new(id: impl Into<String>, position: GeoPoint) -> Self {
        Self { id: id.into(), position }
    }

    /// Create a receiver straight from decimal degrees
    pub fn at(id: impl Into<String>, latitude: f64, longitude: f64) -> Result<Self, MlatError> {
        Ok(Self::new(id, GeoPoint::new(latitude, longitude)?))
    }
}

/// Reception timestamps of one signal event, keyed by receiver id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    times: Vec<(String, f64)>,
}

impl Observation {
    /// Build an observation from `(receiver_id, time_s)` pairs.
    ///
    /// A receiver id may appear only once.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, MlatError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut times: Vec<(String, f64)> = Vec::new();
        for (id, time) in pairs {
            let id = id.into();
            if times.iter().any(|(existing, _)| *existing == id) {
                return Err(MlatError::MismatchedObservations {
                    reason: format!("duplicate timestamp for receiver '{}'", id),
                });
            }
            times.push((id, time));
        }
        Ok(Self { times })
    }

    /// Pair timestamps with receivers by position
    pub fn from_receiver_times(receivers: &[Receiver], times: &[f64]) -> Result<Self, MlatError> {
        if receivers.len() != times.len() {
            return Err(MlatError::MismatchedObservations {
                reason: format!("{} receivers but {} timestamps", receivers.len(), times.len()),
            });
        }
        check_unique_ids(receivers)?;
        Self::from_pairs(receivers.iter().map(|r| r.id.clone()).zip(times.iter().copied()))
    }

    pub fn get(&self, receiver_id: &str) -> Option<f64> {
        self.times.iter().find(|(id, _)| id == receiver_id).map(|(_, t)| *t)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.times.iter().map(|(id, t)| (id.as_str(), *t))
    }
}

/// How the unknown emission time is handled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "seconds", rename_all = "snake_case")]
pub enum EmissionTime {
    /// Emission time is known; timestamps are relative to it
    Fixed(f64),
    /// Emission time is estimated jointly with the position
    Free,
}

impl Default for EmissionTime {
    fn default() -> Self {
        EmissionTime::Fixed(0.0)
    }
}

/// Result of one solve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    /// Estimated transmitter position
    pub position: GeoPoint,
    /// Estimated emission time (seconds), present when it was a free variable
    pub emission_time: Option<f64>,
    /// Whether both tolerances were met within the budget
    pub converged: bool,
    /// Sum of squared timing residuals at the optimum (s²)
    pub cost: f64,
    /// Root-mean-square timing residual (s)
    pub rms_residual_s: f64,
    /// Propagation speed the solve used (m/s)
    pub propagation_speed_mps: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub receiver_count: usize,
    /// Centroid the search started from
    pub initial_guess: GeoPoint,
}

impl Estimate {
    /// RMS residual expressed as a range error in meters
    pub fn range_error_m(&self) -> f64 {
        self.rms_residual_s * self.propagation_speed_mps
    }

    /// Turn a non-converged estimate into [`MlatError::DidNotConverge`]
    pub fn ensure_converged(self) -> Result<Self, MlatError> {
        if self.converged {
            Ok(self)
        } else {
            Err(MlatError::DidNotConverge {
                iterations: self.iterations,
                cost: self.cost,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geopoint_range_validation() {
        assert!(GeoPoint::new(20.26278, 85.80333).is_ok());
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());

        let err = GeoPoint::new(91.0, 0.0).unwrap_err();
        assert!(matches!(err, MlatError::InvalidCoordinate { .. }));
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_normalized_wraps_longitude() {
        let p = GeoPoint::normalized(10.0, 190.0);
        assert_eq!(p.latitude(), 10.0);
        assert!((p.longitude() - (-170.0)).abs() < 1e-9);

        let seam = GeoPoint::normalized(0.0, 180.0);
        assert_eq!(seam.longitude(), 180.0);
        let west = GeoPoint::normalized(0.0, -181.0);
        assert!((west.longitude() - 179.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_folds_latitude_over_poles() {
        let north = GeoPoint::normalized(95.0, 30.0);
        assert!((north.latitude() - 85.0).abs() < 1e-9);
        assert!((north.longitude() - (-150.0)).abs() < 1e-9);

        let south = GeoPoint::normalized(-92.5, -100.0);
        assert!((south.latitude() - (-87.5)).abs() < 1e-9);
        assert!((south.longitude() - 80.0).abs() < 1e-9);

        // A full turn over both poles lands back where it started
        let turned = GeoPoint::normalized(20.0 + 360.0, 40.0);
        assert!((turned.latitude() - 20.0).abs() < 1e-9);
        assert!((turned.longitude() - 40.0).abs() < 1e-9);

        let pole = GeoPoint::normalized(90.0, 0.0);
        assert_eq!(pole.latitude(), 90.0);
    }

    #[test]
    fn test_normalized_is_continuous_across_pole() {
        use crate::algorithms::geodesy::distance;
        let inside = GeoPoint::normalized(89.9999, 30.0);
        let outside = GeoPoint::normalized(90.0001, 30.0);
        // Two points 0.0002 degrees apart along the meridian through the pole
        assert!((distance(&inside, &outside) - 22.239).abs() < 0.01);
    }

    #[test]
    fn test_observation_rejects_duplicates() {
        let err = Observation::from_pairs(vec![("1", 0.1), ("1", 0.2)]).unwrap_err();
        assert!(matches!(err, MlatError::MismatchedObservations { .. }));
    }

    #[test]
    fn test_positional_times_reject_repeated_receiver_ids() {
        let receivers = vec![
            Receiver::at("x", 20.26278, 85.80333).unwrap(),
            Receiver::at("x", 20.26028, 85.81222).unwrap(),
            Receiver::at("y", 20.24861, 85.82361).unwrap(),
        ];
        match Observation::from_receiver_times(&receivers, &[0.1, 0.2, 0.3]) {
            Err(MlatError::MismatchedObservations { reason }) => {
                assert_eq!(reason, "receiver id 'x' appears more than once");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_observation_lookup() {
        let obs = Observation::from_pairs(vec![("a", 1.0), ("b", 2.0)]).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs.get("b"), Some(2.0));
        assert_eq!(obs.get("c"), None);
    }

    #[test]
    fn test_ensure_converged() {
        let p = GeoPoint::new(1.0, 2.0).unwrap();
        let estimate = Estimate {
            position: p,
            emission_time: None,
            converged: false,
            cost: 1e-3,
            rms_residual_s: 1e-6,
            propagation_speed_mps: 299_792_458.0,
            iterations: 42,
            evaluations: 80,
            receiver_count: 3,
            initial_guess: p,
        };
        assert!((estimate.range_error_m() - 299.792458).abs() < 1e-6);

        match estimate.clone().ensure_converged() {
            Err(MlatError::DidNotConverge { iterations, .. }) => assert_eq!(iterations, 42),
            other => panic!("unexpected: {:?}", other),
        }

        let ok = Estimate { converged: true, ..estimate };
        assert!(ok.ensure_converged().is_ok());
    }
}
