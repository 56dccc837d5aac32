use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::{
    EmissionTime, Receiver, DEFAULT_FATOL, DEFAULT_MAX_EVALUATIONS, DEFAULT_MAX_ITERATIONS, DEFAULT_XATOL,
    MEAN_EARTH_RADIUS_M, SPEED_OF_LIGHT_MPS,
};
use crate::processing::batch::TargetObservations;
use crate::validation::error::MlatError;

/// Solver parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Signal propagation speed (m/s)
    pub propagation_speed_mps: f64,
    /// Sphere radius for the distance metric (m)
    pub earth_radius_m: f64,
    /// Fixed or jointly estimated emission time
    pub emission_time: EmissionTime,
    /// Domain-step tolerance (degrees; microseconds for the emission time)
    pub xatol: f64,
    /// Function-value tolerance (s²)
    pub fatol: f64,
    /// Hard iteration budget per solve
    pub max_iterations: usize,
    /// Hard cost evaluation budget per solve
    pub max_evaluations: usize,
    /// Initial simplex size in degrees; 5% of each seed coordinate when unset
    pub initial_step_deg: Option<f64>,
    /// Restart the search once from a converged point to confirm the minimum
    pub restart_on_convergence: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            propagation_speed_mps: SPEED_OF_LIGHT_MPS,
            earth_radius_m: MEAN_EARTH_RADIUS_M,
            emission_time: EmissionTime::default(),
            xatol: DEFAULT_XATOL,
            fatol: DEFAULT_FATOL,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            initial_step_deg: None,
            restart_on_convergence: true,
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_propagation_speed(mut self, propagation_speed_mps: f64) -> Self {
        self.propagation_speed_mps = propagation_speed_mps;
        self
    }

    pub fn with_earth_radius(mut self, earth_radius_m: f64) -> Self {
        self.earth_radius_m = earth_radius_m;
        self
    }

    pub fn with_emission_time(mut self, emission_time: EmissionTime) -> Self {
        self.emission_time = emission_time;
        self
    }

    pub fn with_tolerances(mut self, xatol: f64, fatol: f64) -> Self {
        self.xatol = xatol;
        self.fatol = fatol;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_initial_step(mut self, initial_step_deg: f64) -> Self {
        self.initial_step_deg = Some(initial_step_deg);
        self
    }

    pub fn with_restart(mut self, restart_on_convergence: bool) -> Self {
        self.restart_on_convergence = restart_on_convergence;
        self
    }

    /// Reject parameters the solver cannot work with
    pub fn validate(&self) -> Result<(), MlatError> {
        fn invalid(parameter: &str, value: impl ToString, reason: &str) -> MlatError {
            MlatError::InvalidParameter {
                parameter: parameter.to_string(),
                value: value.to_string(),
                reason: reason.to_string(),
            }
        }

        if !(self.propagation_speed_mps.is_finite() && self.propagation_speed_mps > 0.0) {
            return Err(invalid("propagation_speed_mps", self.propagation_speed_mps, "must be positive and finite"));
        }
        if !(self.earth_radius_m.is_finite() && self.earth_radius_m > 0.0) {
            return Err(invalid("earth_radius_m", self.earth_radius_m, "must be positive and finite"));
        }
        if !(self.xatol.is_finite() && self.xatol > 0.0) {
            return Err(invalid("xatol", self.xatol, "must be positive and finite"));
        }
        if !(self.fatol.is_finite() && self.fatol > 0.0) {
            return Err(invalid("fatol", self.fatol, "must be positive and finite"));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", self.max_iterations, "must be at least 1"));
        }
        if self.max_evaluations == 0 {
            return Err(invalid("max_evaluations", self.max_evaluations, "must be at least 1"));
        }
        if let EmissionTime::Fixed(t0) = self.emission_time {
            if !t0.is_finite() {
                return Err(invalid("emission_time", t0, "fixed emission time must be finite"));
            }
        }
        if let Some(step) = self.initial_step_deg {
            if !(step.is_finite() && step > 0.0) {
                return Err(invalid("initial_step_deg", step, "must be positive and finite"));
            }
        }
        Ok(())
    }
}

/// Receiver entry in a scenario file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    pub id: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

/// Scenario file contents: solver settings, receiver layout and observations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub solver: SolverConfig,
    pub receivers: Vec<ReceiverConfig>,
    #[serde(default)]
    pub targets: Vec<TargetObservations>,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid receiver '{id}': {source}")]
    Receiver {
        id: String,
        #[source]
        source: MlatError,
    },

    #[error("Duplicate receiver id '{0}'")]
    DuplicateReceiver(String),

    #[error("Invalid solver configuration: {0}")]
    Solver(#[source] MlatError),

    #[error("No file path set for saving configuration")]
    NoPath,
}

/// Loads, validates and stores scenario configuration
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    scenario: ScenarioConfig,
    config_file_path: Option<String>,
    is_modified: bool,
}

impl ConfigurationManager {
    /// Create a manager with default solver settings and no receivers
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and wrap an in-memory scenario
    pub fn from_scenario(scenario: ScenarioConfig) -> Result<Self, ConfigError> {
        Self::validate_scenario(&scenario)?;
        Ok(Self {
            scenario,
            config_file_path: None,
            is_modified: true,
        })
    }

    /// Create a manager and load a scenario from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    pub fn solver_config(&self) -> &SolverConfig {
        &self.scenario.solver
    }

    pub fn targets(&self) -> &[TargetObservations] {
        &self.scenario.targets
    }

    /// Validated receivers in file order
    pub fn receivers(&self) -> Result<Vec<Receiver>, ConfigError> {
        self.scenario
            .receivers
            .iter()
            .map(|r| {
                Receiver::at(r.id.clone(), r.latitude, r.longitude).map_err(|source| ConfigError::Receiver {
                    id: r.id.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Replace the solver settings after validation
    pub fn update_solver_config(&mut self, config: SolverConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::Solver)?;
        self.scenario.solver = config;
        self.is_modified = true;
        Ok(())
    }

    /// Change the propagation speed, returning the previous value
    pub fn set_propagation_speed(&mut self, propagation_speed_mps: f64) -> Result<f64, ConfigError> {
        let updated = self.scenario.solver.clone().with_propagation_speed(propagation_speed_mps);
        updated.validate().map_err(ConfigError::Solver)?;
        let old = self.scenario.solver.propagation_speed_mps;
        self.scenario.solver = updated;
        self.is_modified = true;
        Ok(old)
    }

    /// Add a receiver, rejecting duplicate ids and invalid coordinates
    pub fn add_receiver(&mut self, receiver: ReceiverConfig) -> Result<(), ConfigError> {
        if self.scenario.receivers.iter().any(|r| r.id == receiver.id) {
            return Err(ConfigError::DuplicateReceiver(receiver.id));
        }
        Receiver::at(receiver.id.clone(), receiver.latitude, receiver.longitude).map_err(|source| {
            ConfigError::Receiver {
                id: receiver.id.clone(),
                source,
            }
        })?;
        self.scenario.receivers.push(receiver);
        self.is_modified = true;
        Ok(())
    }

    pub fn add_target(&mut self, target: TargetObservations) {
        self.scenario.targets.push(target);
        self.is_modified = true;
    }

    /// Load a scenario from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        let scenario: ScenarioConfig = serde_json::from_str(&content)?;
        Self::validate_scenario(&scenario)?;

        info!(
            path = %path_str,
            receivers = scenario.receivers.len(),
            targets = scenario.targets.len(),
            "Loaded scenario"
        );

        self.scenario = scenario;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save the scenario to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = serde_json::to_string_pretty(&self.scenario)?;
        fs::write(&path, content).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;

        debug!(path = %path_str, "Saved scenario");
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save to the path the scenario was last loaded from or saved to
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::NoPath),
        }
    }

    /// Whether the scenario changed since it was last loaded or saved
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    fn validate_scenario(scenario: &ScenarioConfig) -> Result<(), ConfigError> {
        scenario.solver.validate().map_err(ConfigError::Solver)?;

        let mut seen = HashSet::new();
        for r in &scenario.receivers {
            if !seen.insert(r.id.as_str()) {
                return Err(ConfigError::DuplicateReceiver(r.id.clone()));
            }
            Receiver::at(r.id.clone(), r.latitude, r.longitude).map_err(|source| ConfigError::Receiver {
                id: r.id.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
