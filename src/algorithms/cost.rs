//! Timing residuals and the least-squares objective

use nalgebra::DVector;

use crate::algorithms::geodesy::Geodesy;
use crate::core::{EmissionTime, GeoPoint, Receiver};

/// Scale of the emission-time coordinate inside the optimizer
pub const MICROSECONDS_PER_SECOND: f64 = 1e6;

/// Sum of squared timing residuals for a candidate transmitter position.
///
/// `times` must be aligned with `receivers`. Uses the mean-radius sphere.
pub fn cost(candidate: &GeoPoint, t0: f64, receivers: &[Receiver], times: &[f64], propagation_speed_mps: f64) -> f64 {
    let geodesy = Geodesy::default();
    receivers
        .iter()
        .zip(times)
        .map(|(receiver, observed)| {
            let predicted = t0 + geodesy.distance(candidate, &receiver.position) / propagation_speed_mps;
            (observed - predicted).powi(2)
        })
        .sum()
}

/// One multilateration problem: receivers, their aligned reception times and
/// the propagation model.
///
/// Optimizer coordinates are `[lat, lon]` when the emission time is fixed and
/// `[lat, lon, u]` when it is free, where `u` is the emission time in
/// microseconds relative to the earliest reception.
#[derive(Debug, Clone)]
pub struct TdoaProblem<'a> {
    receivers: &'a [Receiver],
    times: Vec<f64>,
    geodesy: Geodesy,
    propagation_speed_mps: f64,
    emission_time: EmissionTime,
    time_reference: f64,
}

impl<'a> TdoaProblem<'a> {
    pub fn new(
        receivers: &'a [Receiver],
        times: Vec<f64>,
        geodesy: Geodesy,
        propagation_speed_mps: f64,
        emission_time: EmissionTime,
    ) -> Self {
        let time_reference = times.iter().copied().fold(f64::INFINITY, f64::min);
        let time_reference = if time_reference.is_finite() { time_reference } else { 0.0 };
        Self {
            receivers,
            times,
            geodesy,
            propagation_speed_mps,
            emission_time,
            time_reference,
        }
    }

    pub fn receivers(&self) -> &[Receiver] {
        self.receivers
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of optimizer coordinates
    pub fn dimension(&self) -> usize {
        match self.emission_time {
            EmissionTime::Fixed(_) => 2,
            EmissionTime::Free => 3,
        }
    }

    /// Arrival time at receiver `index` predicted for a transmitter at `candidate`
    pub fn predicted_arrival(&self, index: usize, candidate: &GeoPoint, t0: f64) -> f64 {
        t0 + self.geodesy.distance(candidate, &self.receivers[index].position) / self.propagation_speed_mps
    }

    /// Observed minus predicted arrival time, per receiver
    pub fn residuals(&self, candidate: &GeoPoint, t0: f64) -> Vec<f64> {
        (0..self.receivers.len())
            .map(|i| self.times[i] - self.predicted_arrival(i, candidate, t0))
            .collect()
    }

    /// Sum of squared residuals (s²)
    pub fn cost(&self, candidate: &GeoPoint, t0: f64) -> f64 {
        self.residuals(candidate, t0).iter().map(|r| r * r).sum()
    }

    /// Map optimizer coordinates to a point on the sphere and an emission time
    pub fn decode(&self, x: &DVector<f64>) -> (GeoPoint, f64) {
        let point = GeoPoint::normalized(x[0], x[1]);
        let t0 = match self.emission_time {
            EmissionTime::Fixed(t0) => t0,
            EmissionTime::Free => self.time_reference + x[2] / MICROSECONDS_PER_SECOND,
        };
        (point, t0)
    }

    /// Optimizer coordinates for a point and emission time
    pub fn encode(&self, point: &GeoPoint, t0: f64) -> DVector<f64> {
        match self.emission_time {
            EmissionTime::Fixed(_) => DVector::from_vec(vec![point.latitude(), point.longitude()]),
            EmissionTime::Free => DVector::from_vec(vec![
                point.latitude(),
                point.longitude(),
                (t0 - self.time_reference) * MICROSECONDS_PER_SECOND,
            ]),
        }
    }

    /// Emission time that best explains the observations for a fixed position.
    ///
    /// For a fixed position the least-squares emission time is the mean of
    /// `t_i - d_i / v`.
    pub fn best_emission_time(&self, candidate: &GeoPoint) -> f64 {
        match self.emission_time {
            EmissionTime::Fixed(t0) => t0,
            EmissionTime::Free => {
                let n = self.receivers.len().max(1) as f64;
                (0..self.receivers.len())
                    .map(|i| self.times[i] - self.predicted_arrival(i, candidate, 0.0))
                    .sum::<f64>()
                    / n
            }
        }
    }

    /// Objective minimized by the solver
    pub fn objective(&self, x: &DVector<f64>) -> f64 {
        let (point, t0) = self.decode(x);
        self.cost(&point, t0)
    }
}
