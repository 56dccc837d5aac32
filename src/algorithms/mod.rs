//! Positioning algorithms

pub mod cost;
pub mod geodesy;
pub mod minimizer;
pub mod solver;

pub use cost::{cost, TdoaProblem};
pub use geodesy::{distance, Geodesy};
pub use minimizer::{MinimizeOptions, Minimization, Minimizer, NelderMead, Termination};
pub use solver::TdoaSolver;
