//! Derivative-free minimization of small scalar problems
//!
//! The solver only needs "minimize f(x) from x0 within tolerances", so the
//! search method sits behind the [`Minimizer`] trait. [`NelderMead`] is the
//! default implementation.

use nalgebra::DVector;
use std::cell::Cell;
use serde::{Deserialize, Serialize};

use crate::core::{DEFAULT_FATOL, DEFAULT_MAX_EVALUATIONS, DEFAULT_MAX_ITERATIONS, DEFAULT_XATOL};

/// Stopping rules shared by all minimizers
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizeOptions {
    /// Domain-step tolerance (max coordinate spread across the search state)
    pub xatol: f64,
    /// Function-value tolerance (max value spread across the search state)
    pub fatol: f64,
    /// Hard iteration budget
    pub max_iterations: usize,
    /// Hard function evaluation budget
    pub max_evaluations: usize,
    /// Per-coordinate size of the initial search region; derived from x0 when absent
    pub initial_step: Option<DVector<f64>>,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            xatol: DEFAULT_XATOL,
            fatol: DEFAULT_FATOL,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            initial_step: None,
        }
    }
}

/// Why a minimization stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    Converged,
    MaxIterations,
    MaxEvaluations,
}

/// Outcome of a minimization
#[derive(Debug, Clone, PartialEq)]
pub struct Minimization {
    /// Best point found
    pub x: DVector<f64>,
    /// Function value at `x`
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

impl Minimization {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Capability to minimize a scalar function of a small vector
pub trait Minimizer {
    fn minimize<F>(&self, f: F, x0: &DVector<f64>, options: &MinimizeOptions) -> Minimization
    where
        F: Fn(&DVector<f64>) -> f64;
}

/// Nelder–Mead downhill simplex search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMead {
    /// Reflection coefficient
    pub rho: f64,
    /// Expansion coefficient
    pub chi: f64,
    /// Contraction coefficient
    pub psi: f64,
    /// Shrink coefficient
    pub sigma: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            rho: 1.0,
            chi: 2.0,
            psi: 0.5,
            sigma: 0.5,
        }
    }
}

/// Relative perturbation for nonzero starting coordinates
const NONZERO_DELTA: f64 = 0.05;
/// Absolute perturbation for zero starting coordinates
const ZERO_DELTA: f64 = 0.00025;

impl NelderMead {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial simplex: x0 plus one vertex per coordinate, offset along that axis
    fn initial_simplex(&self, x0: &DVector<f64>, step: Option<&DVector<f64>>) -> Vec<DVector<f64>> {
        let n = x0.len();
        let mut simplex = Vec::with_capacity(n + 1);
        simplex.push(x0.clone());
        for k in 0..n {
            let mut vertex = x0.clone();
            let offset = match step {
                Some(step) if step.len() == n && step[k] != 0.0 => step[k],
                _ if x0[k] != 0.0 => NONZERO_DELTA * x0[k],
                _ => ZERO_DELTA,
            };
            vertex[k] += offset;
            simplex.push(vertex);
        }
        simplex
    }

    fn sort(simplex: &mut Vec<DVector<f64>>, values: &mut Vec<f64>) {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        *values = order.iter().map(|&i| values[i]).collect();
    }

    fn has_converged(simplex: &[DVector<f64>], values: &[f64], options: &MinimizeOptions) -> bool {
        let best = &simplex[0];
        let x_spread = simplex[1..]
            .iter()
            .map(|v| (v - best).amax())
            .fold(0.0_f64, f64::max);
        let f_spread = values[1..]
            .iter()
            .map(|v| (v - values[0]).abs())
            .fold(0.0_f64, f64::max);
        x_spread <= options.xatol && f_spread <= options.fatol
    }
}

impl Minimizer for NelderMead {
    fn minimize<F>(&self, f: F, x0: &DVector<f64>, options: &MinimizeOptions) -> Minimization
    where
        F: Fn(&DVector<f64>) -> f64,
    {
        let evaluations = Cell::new(0usize);
        let eval = |x: &DVector<f64>| {
            evaluations.set(evaluations.get() + 1);
            let value = f(x);
            // Non-finite values rank as worst so the simplex moves away from them
            if value.is_finite() { value } else { f64::INFINITY }
        };

        let n = x0.len();
        let mut simplex = self.initial_simplex(x0, options.initial_step.as_ref());
        let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();
        Self::sort(&mut simplex, &mut values);

        let mut iterations = 0usize;
        let termination = loop {
            if Self::has_converged(&simplex, &values, options) {
                break Termination::Converged;
            }
            if iterations >= options.max_iterations {
                break Termination::MaxIterations;
            }
            if evaluations.get() >= options.max_evaluations {
                break Termination::MaxEvaluations;
            }

            let centroid = simplex[..n]
                .iter()
                .fold(DVector::<f64>::zeros(n), |acc, v| acc + v)
                / n as f64;
            let worst = simplex[n].clone();

            let reflected = &centroid * (1.0 + self.rho) - &worst * self.rho;
            let f_reflected = eval(&reflected);
            let mut shrink = false;

            if f_reflected < values[0] {
                let expanded = &centroid * (1.0 + self.rho * self.chi) - &worst * (self.rho * self.chi);
                let f_expanded = eval(&expanded);
                if f_expanded < f_reflected {
                    simplex[n] = expanded;
                    values[n] = f_expanded;
                } else {
                    simplex[n] = reflected;
                    values[n] = f_reflected;
                }
            } else if f_reflected < values[n - 1] {
                simplex[n] = reflected;
                values[n] = f_reflected;
            } else if f_reflected < values[n] {
                // Outside contraction
                let contracted = &centroid * (1.0 + self.psi * self.rho) - &worst * (self.psi * self.rho);
                let f_contracted = eval(&contracted);
                if f_contracted <= f_reflected {
                    simplex[n] = contracted;
                    values[n] = f_contracted;
                } else {
                    shrink = true;
                }
            } else {
                // Inside contraction
                let contracted = &centroid * (1.0 - self.psi) + &worst * self.psi;
                let f_contracted = eval(&contracted);
                if f_contracted < values[n] {
                    simplex[n] = contracted;
                    values[n] = f_contracted;
                } else {
                    shrink = true;
                }
            }

            if shrink {
                let best = simplex[0].clone();
                for j in 1..=n {
                    simplex[j] = &best + (&simplex[j] - &best) * self.sigma;
                    values[j] = eval(&simplex[j]);
                }
            }

            Self::sort(&mut simplex, &mut values);
            iterations += 1;
        };

        Minimization {
            x: simplex[0].clone(),
            value: values[0],
            iterations,
            evaluations: evaluations.get(),
            termination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rosenbrock(x: &DVector<f64>) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    #[test]
    fn test_quadratic_bowl() {
        let f = |x: &DVector<f64>| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2);
        let result = NelderMead::new().minimize(f, &DVector::from_vec(vec![0.0, 0.0]), &MinimizeOptions::default());
        assert!(result.converged());
        assert!((result.x[0] - 3.0).abs() < 1e-8);
        assert!((result.x[1] + 1.0).abs() < 1e-8);
        assert!(result.value < 1e-15);
    }

    #[test]
    fn test_rosenbrock() {
        let options = MinimizeOptions {
            xatol: 1e-8,
            fatol: 1e-12,
            ..Default::default()
        };
        let result = NelderMead::new().minimize(rosenbrock, &DVector::from_vec(vec![-1.2, 1.0]), &options);
        assert!(result.converged(), "stopped with {:?}", result.termination);
        assert!((result.x[0] - 1.0).abs() < 1e-5);
        assert!((result.x[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_iteration_budget_is_hard_limit() {
        let options = MinimizeOptions {
            max_iterations: 5,
            ..Default::default()
        };
        let result = NelderMead::new().minimize(rosenbrock, &DVector::from_vec(vec![-1.2, 1.0]), &options);
        assert_eq!(result.termination, Termination::MaxIterations);
        assert_eq!(result.iterations, 5);
        assert!(!result.converged());
        assert!(result.value.is_finite());
    }

    #[test]
    fn test_evaluation_budget() {
        let options = MinimizeOptions {
            max_evaluations: 10,
            ..Default::default()
        };
        let result = NelderMead::new().minimize(rosenbrock, &DVector::from_vec(vec![-1.2, 1.0]), &options);
        assert_eq!(result.termination, Termination::MaxEvaluations);
        // One iteration can spend at most n + 2 evaluations past the check
        assert!(result.evaluations <= 10 + 4);
    }

    #[test]
    fn test_initial_simplex_steps() {
        let nm = NelderMead::new();
        let x0 = DVector::from_vec(vec![20.0, 0.0]);
        let simplex = nm.initial_simplex(&x0, None);
        assert_eq!(simplex.len(), 3);
        assert!((simplex[1][0] - 21.0).abs() < 1e-12);
        assert!((simplex[2][1] - ZERO_DELTA).abs() < 1e-12);

        let step = DVector::from_vec(vec![0.01, 2.0]);
        let simplex = nm.initial_simplex(&x0, Some(&step));
        assert!((simplex[1][0] - 20.01).abs() < 1e-12);
        assert!((simplex[2][1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_nan_regions_are_avoided() {
        let f = |x: &DVector<f64>| if x[0] < 0.0 { f64::NAN } else { (x[0] - 1.0).powi(2) };
        let result = NelderMead::new().minimize(f, &DVector::from_vec(vec![0.5]), &MinimizeOptions::default());
        assert!(result.converged());
        assert!((result.x[0] - 1.0).abs() < 1e-8);
    }
}
