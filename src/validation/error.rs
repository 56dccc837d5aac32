//! Error taxonomy for the multilateration solver

use thiserror::Error;

/// Result type for solver operations
pub type MlatResult<T> = Result<T, MlatError>;

/// Errors raised while building inputs or solving for a position
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MlatError {
    /// Latitude or longitude outside the valid range
    #[error("Invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// Fewer receivers than the unknowns require
    #[error("Insufficient receivers: {available} available, {required} required")]
    InsufficientReceivers { available: usize, required: usize },

    /// Timestamps do not line up 1:1 with the receiver set
    #[error("Observations do not match receivers: {reason}")]
    MismatchedObservations { reason: String },

    /// Search budget exhausted before both tolerances were met
    #[error("Solver did not converge after {iterations} iterations (cost {cost:e})")]
    DidNotConverge { iterations: usize, cost: f64 },

    /// Solver parameter outside its valid range
    #[error("Invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Degrees-minutes-seconds text could not be parsed
    #[error("Invalid DMS coordinate '{input}': expected DD°MM'SS\"N DD°MM'SS\"E")]
    DmsParse { input: String },
}

impl MlatError {
    /// Errors caused by bad input data; retrying the same call cannot succeed
    pub fn is_input_error(&self) -> bool {
        !matches!(self, MlatError::DidNotConverge { .. })
    }

    /// Short stable name, used in logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            MlatError::InvalidCoordinate { .. } => "InvalidCoordinate",
            MlatError::InsufficientReceivers { .. } => "InsufficientReceivers",
            MlatError::MismatchedObservations { .. } => "MismatchedObservations",
            MlatError::DidNotConverge { .. } => "DidNotConverge",
            MlatError::InvalidParameter { .. } => "InvalidParameter",
            MlatError::DmsParse { .. } => "DmsParse",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MlatError::InsufficientReceivers { available: 2, required: 3 };
        assert_eq!(err.to_string(), "Insufficient receivers: 2 available, 3 required");

        let err = MlatError::MismatchedObservations { reason: "5 receivers but 4 timestamps".to_string() };
        assert!(err.to_string().contains("5 receivers but 4 timestamps"));
    }

    #[test]
    fn test_input_error_classification() {
        assert!(MlatError::InvalidCoordinate { latitude: 100.0, longitude: 0.0 }.is_input_error());
        assert!(MlatError::InsufficientReceivers { available: 1, required: 3 }.is_input_error());
        assert!(!MlatError::DidNotConverge { iterations: 10, cost: 1.0 }.is_input_error());
        assert_eq!(MlatError::DidNotConverge { iterations: 10, cost: 1.0 }.kind(), "DidNotConverge");
    }
}
