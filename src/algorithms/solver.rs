//! TDOA multilateration solver
//!
//! Finds the transmitter position (and optionally the emission time) that
//! minimizes the squared differences between observed and predicted
//! reception times. The search starts at the receivers' centroid and uses a
//! derivative-free [`Minimizer`], Nelder–Mead by default.
//!
//! A solve is a pure function of its inputs, so independent solves may run
//! on separate threads against the same receiver slice.

use nalgebra::DVector;

use crate::algorithms::cost::TdoaProblem;
use crate::algorithms::geodesy::Geodesy;
use crate::algorithms::minimizer::{MinimizeOptions, Minimizer, NelderMead};
use crate::core::{
    EmissionTime, Estimate, GeoPoint, Observation, Receiver, MIN_RECEIVERS_FIXED_EMISSION,
    MIN_RECEIVERS_FREE_EMISSION,
};
use crate::utils::config::SolverConfig;
use crate::validation::data::{align_observations, check_receiver_count};
use crate::validation::error::MlatError;

/// Initial simplex size of the emission-time coordinate (microseconds)
const EMISSION_STEP_US: f64 = 1.0;

/// Multilateration solver
#[derive(Debug, Clone)]
pub struct TdoaSolver<M: Minimizer = NelderMead> {
    config: SolverConfig,
    minimizer: M,
}

impl TdoaSolver<NelderMead> {
    /// Create a Nelder–Mead solver after validating the configuration
    pub fn new(config: SolverConfig) -> Result<Self, MlatError> {
        Self::with_minimizer(config, NelderMead::default())
    }
}

impl Default for TdoaSolver<NelderMead> {
    fn default() -> Self {
        Self {
            config: SolverConfig::default(),
            minimizer: NelderMead::default(),
        }
    }
}

impl<M: Minimizer> TdoaSolver<M> {
    /// Create a solver backed by a custom minimizer
    pub fn with_minimizer(config: SolverConfig, minimizer: M) -> Result<Self, MlatError> {
        config.validate()?;
        Ok(Self { config, minimizer })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Receivers needed for the configured unknowns
    pub fn min_receivers(&self) -> usize {
        match self.config.emission_time {
            EmissionTime::Fixed(_) => MIN_RECEIVERS_FIXED_EMISSION,
            EmissionTime::Free => MIN_RECEIVERS_FREE_EMISSION,
        }
    }

    /// Unweighted mean of the receiver coordinates; the search starts here
    pub fn initial_guess(&self, receivers: &[Receiver]) -> Result<GeoPoint, MlatError> {
        if receivers.is_empty() {
            return Err(MlatError::InsufficientReceivers {
                available: 0,
                required: self.min_receivers(),
            });
        }
        let n = receivers.len() as f64;
        let latitude = receivers.iter().map(|r| r.position.latitude()).sum::<f64>() / n;
        let longitude = receivers.iter().map(|r| r.position.longitude()).sum::<f64>() / n;
        GeoPoint::new(latitude, longitude)
    }

    /// Estimate the transmitter position from an observation keyed by receiver id.
    ///
    /// Input errors are returned before any optimization. Running out of
    /// budget is not an error: the best point is returned with
    /// `converged == false`.
    ///
    /// With a free emission time the search does not start at t0 = 0 but at
    /// the emission time that best fits the centroid, the mean of
    /// `t_i - d_i / v` over all receivers.
    pub fn estimate(&self, receivers: &[Receiver], observation: &Observation) -> Result<Estimate, MlatError> {
        check_receiver_count(receivers, self.min_receivers())?;
        let times = align_observations(receivers, observation)?;
        self.solve(receivers, times)
    }

    /// Estimate from timestamps listed in receiver order
    pub fn estimate_from_times(&self, receivers: &[Receiver], times: &[f64]) -> Result<Estimate, MlatError> {
        check_receiver_count(receivers, self.min_receivers())?;
        let observation = Observation::from_receiver_times(receivers, times)?;
        let times = align_observations(receivers, &observation)?;
        self.solve(receivers, times)
    }

    fn solve(&self, receivers: &[Receiver], times: Vec<f64>) -> Result<Estimate, MlatError> {
        let seed = self.initial_guess(receivers)?;
        let problem = TdoaProblem::new(
            receivers,
            times,
            Geodesy::with_radius(self.config.earth_radius_m),
            self.config.propagation_speed_mps,
            self.config.emission_time,
        );

        let seed_t0 = problem.best_emission_time(&seed);
        let x0 = problem.encode(&seed, seed_t0);
        let objective = |x: &DVector<f64>| problem.objective(x);

        let mut options = self.options(&x0);
        let first = self.minimizer.minimize(&objective, &x0, &options);
        let mut iterations = first.iterations;
        let mut evaluations = first.evaluations;
        let mut best = first;

        // A collapsed simplex can report convergence away from the minimum;
        // one fresh search from the reported point either confirms it or moves on.
        if best.converged() && self.config.restart_on_convergence {
            options.max_iterations = self.config.max_iterations.saturating_sub(iterations);
            options.max_evaluations = self.config.max_evaluations.saturating_sub(evaluations);
            options.initial_step = self.options(&best.x).initial_step;
            if options.max_iterations > 0 && options.max_evaluations > 0 {
                let restart = self.minimizer.minimize(&objective, &best.x, &options);
                iterations += restart.iterations;
                evaluations += restart.evaluations;
                // The restart's first vertex is the previous best, so its value never gets worse
                best = restart;
            }
        }

        let (position, t0) = problem.decode(&best.x);
        let cost = problem.cost(&position, t0);
        let receiver_count = receivers.len();

        Ok(Estimate {
            position,
            emission_time: match self.config.emission_time {
                EmissionTime::Fixed(_) => None,
                EmissionTime::Free => Some(t0),
            },
            converged: best.converged(),
            cost,
            rms_residual_s: (cost / receiver_count as f64).sqrt(),
            propagation_speed_mps: self.config.propagation_speed_mps,
            iterations,
            evaluations,
            receiver_count,
            initial_guess: seed,
        })
    }

    fn options(&self, x0: &DVector<f64>) -> MinimizeOptions {
        let initial_step = match (self.config.initial_step_deg, self.config.emission_time) {
            (None, EmissionTime::Fixed(_)) => None,
            (step, _) => {
                let mut steps = Vec::with_capacity(x0.len());
                for k in 0..2 {
                    steps.push(step.unwrap_or(if x0[k] != 0.0 { 0.05 * x0[k] } else { 0.00025 }));
                }
                if x0.len() == 3 {
                    steps.push(EMISSION_STEP_US);
                }
                Some(DVector::from_vec(steps))
            }
        };

        MinimizeOptions {
            xatol: self.config.xatol,
            fatol: self.config.fatol,
            max_iterations: self.config.max_iterations,
            max_evaluations: self.config.max_evaluations,
            initial_step,
        }
    }
}
