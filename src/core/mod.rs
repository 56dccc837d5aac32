//! Core types and constants for the multilateration solver

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
