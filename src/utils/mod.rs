//! Scenario and solver configuration

pub mod config;

pub use config::{ConfigError, ConfigurationManager, ReceiverConfig, ScenarioConfig, SolverConfig};
