//! Multilateration
//!
//! Locates a radio (or acoustic) transmitter from the times its signal reached
//! a set of receivers at known positions. Distances are great-circle distances
//! on a spherical Earth; the position is the least-squares fit of predicted to
//! observed reception times, found with a derivative-free simplex search.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use core::{EmissionTime, Estimate, GeoPoint, Observation, Receiver, SPEED_OF_LIGHT_MPS};
pub use algorithms::{cost, distance, Geodesy, Minimizer, NelderMead, TdoaProblem, TdoaSolver};
pub use processing::{BatchSolver, BatchSummary, TargetEstimate, TargetObservations, TimedReception};
pub use validation::{MlatError, MlatResult};
pub use utils::{ConfigurationManager, ScenarioConfig, SolverConfig};
pub use api::{decimal_to_dms, dms_to_decimal, format_dms, OutputFormat};
