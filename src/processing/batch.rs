//! Parallel solving of many independent targets against one receiver layout

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::algorithms::solver::TdoaSolver;
use crate::core::{Estimate, Observation, Receiver};
use crate::utils::config::SolverConfig;
use crate::validation::error::MlatError;

/// One receiver's timestamp for a target's emission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedReception {
    pub receiver_id: String,
    /// Reception time in seconds
    pub time_s: f64,
}

/// All receptions of one emission, keyed by receiver id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetObservations {
    pub target_id: String,
    pub receptions: Vec<TimedReception>,
}

impl TargetObservations {
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            receptions: Vec::new(),
        }
    }

    pub fn with_reception(mut self, receiver_id: impl Into<String>, time_s: f64) -> Self {
        self.receptions.push(TimedReception {
            receiver_id: receiver_id.into(),
            time_s,
        });
        self
    }

    /// Keyed observation; duplicate receiver ids are rejected
    pub fn to_observation(&self) -> Result<Observation, MlatError> {
        Observation::from_pairs(self.receptions.iter().map(|r| (r.receiver_id.as_str(), r.time_s)))
    }
}

/// Outcome for one target
#[derive(Debug, Clone, PartialEq)]
pub struct TargetEstimate {
    pub target_id: String,
    pub result: Result<Estimate, MlatError>,
}

impl TargetEstimate {
    pub fn is_converged(&self) -> bool {
        matches!(&self.result, Ok(estimate) if estimate.converged)
    }
}

/// Tally of a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub converged: usize,
    /// Solved but stopped on a budget
    pub not_converged: usize,
    /// Rejected before optimization
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[TargetEstimate]) -> Self {
        results.iter().fold(Self::default(), |mut summary, target| {
            summary.total += 1;
            match &target.result {
                Ok(estimate) if estimate.converged => summary.converged += 1,
                Ok(_) => summary.not_converged += 1,
                Err(_) => summary.failed += 1,
            }
            summary
        })
    }
}

/// Solves every target of a scenario in parallel with one solver configuration
#[derive(Debug, Clone, Default)]
pub struct BatchSolver {
    solver: TdoaSolver,
}

impl BatchSolver {
    pub fn new(config: SolverConfig) -> Result<Self, MlatError> {
        Ok(Self {
            solver: TdoaSolver::new(config)?,
        })
    }

    pub fn solver(&self) -> &TdoaSolver {
        &self.solver
    }

    /// Solve one target
    pub fn solve_one(&self, receivers: &[Receiver], target: &TargetObservations) -> TargetEstimate {
        let result = target
            .to_observation()
            .and_then(|observation| self.solver.estimate(receivers, &observation));

        match &result {
            Ok(estimate) if estimate.converged => debug!(
                target = %target.target_id,
                latitude = estimate.position.latitude(),
                longitude = estimate.position.longitude(),
                iterations = estimate.iterations,
                "Target solved"
            ),
            Ok(estimate) => warn!(
                target = %target.target_id,
                iterations = estimate.iterations,
                evaluations = estimate.evaluations,
                cost = estimate.cost,
                "Solve stopped before convergence"
            ),
            Err(e) => warn!(target = %target.target_id, error = %e, "Target rejected"),
        }

        TargetEstimate {
            target_id: target.target_id.clone(),
            result,
        }
    }

    /// Solve all targets concurrently; results keep the input order
    pub fn solve_all(&self, receivers: &[Receiver], targets: &[TargetObservations]) -> Vec<TargetEstimate> {
        targets
            .par_iter()
            .map(|target| self.solve_one(receivers, target))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::geodesy::Geodesy;
    use crate::core::{GeoPoint, SPEED_OF_LIGHT_MPS};

    fn towers() -> Vec<Receiver> {
        vec![
            Receiver::at("1", 20.26278, 85.80333).unwrap(),
            Receiver::at("2", 20.26028, 85.81222).unwrap(),
            Receiver::at("3", 20.24861, 85.82361).unwrap(),
            Receiver::at("4", 20.23917, 85.82139).unwrap(),
            Receiver::at("5", 20.24000, 85.81194).unwrap(),
        ]
    }

    fn target(id: &str, receivers: &[Receiver], position: &GeoPoint) -> TargetObservations {
        let geodesy = Geodesy::default();
        receivers.iter().rev().fold(TargetObservations::new(id), |t, r| {
            t.with_reception(r.id.clone(), geodesy.distance(position, &r.position) / SPEED_OF_LIGHT_MPS)
        })
    }

    #[test]
    fn test_solve_all_keeps_order() {
        let receivers = towers();
        let positions = [
            GeoPoint::new(20.2520, 85.8150).unwrap(),
            GeoPoint::new(20.2550, 85.8100).unwrap(),
            GeoPoint::new(20.2450, 85.8180).unwrap(),
        ];
        let targets: Vec<_> = positions
            .iter()
            .enumerate()
            .map(|(i, p)| target(&format!("T{}", i), &receivers, p))
            .collect();

        let results = BatchSolver::default().solve_all(&receivers, &targets);
        assert_eq!(results.len(), 3);
        for (i, (result, expected)) in results.iter().zip(&positions).enumerate() {
            assert_eq!(result.target_id, format!("T{}", i));
            let estimate = result.result.as_ref().unwrap();
            assert!((estimate.position.latitude() - expected.latitude()).abs() < 1e-4);
            assert!((estimate.position.longitude() - expected.longitude()).abs() < 1e-4);
        }
        assert_eq!(BatchSummary::from_results(&results).converged, 3);
    }

    #[test]
    fn test_failures_are_isolated() {
        let receivers = towers();
        let good = target("good", &receivers, &GeoPoint::new(20.2520, 85.8150).unwrap());
        let unknown = TargetObservations::new("unknown")
            .with_reception("1", 1e-6)
            .with_reception("2", 2e-6)
            .with_reception("3", 3e-6)
            .with_reception("4", 4e-6)
            .with_reception("9", 5e-6);
        let duplicate = TargetObservations::new("duplicate")
            .with_reception("1", 1e-6)
            .with_reception("1", 2e-6);

        let results = BatchSolver::default().solve_all(&receivers, &[good, unknown, duplicate]);
        assert!(results[0].is_converged());
        assert!(matches!(results[1].result, Err(MlatError::MismatchedObservations { .. })));
        assert!(matches!(results[2].result, Err(MlatError::MismatchedObservations { .. })));

        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary, BatchSummary { total: 3, converged: 1, not_converged: 0, failed: 2 });
    }

    #[test]
    fn test_budget_exhaustion_counted() {
        let receivers = towers();
        let targets = vec![target("slow", &receivers, &GeoPoint::new(20.2520, 85.8150).unwrap())];
        let batch = BatchSolver::new(SolverConfig::default().with_max_iterations(2)).unwrap();
        let results = batch.solve_all(&receivers, &targets);
        assert!(!results[0].is_converged());
        assert_eq!(BatchSummary::from_results(&results).not_converged, 1);
    }

    #[test]
    fn test_target_json_shape() {
        let json = r#"{ "target_id": "VT-ABC", "receptions": [ { "receiver_id": "1", "time_s": 0.001 } ] }"#;
        let target: TargetObservations = serde_json::from_str(json).unwrap();
        assert_eq!(target.receptions.len(), 1);
        assert_eq!(target.to_observation().unwrap().get("1"), Some(0.001));
    }
}
