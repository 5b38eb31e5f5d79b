//! Error types for condition evaluation

use action_primitives::DriverError;
use thiserror::Error;

/// Gate error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Condition is malformed (empty value, zero timing)
    #[error("Invalid success condition: {0}")]
    InvalidCondition(String),

    /// url-matches pattern does not compile
    #[error("Invalid url-matches pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Driver failed while reading state
    #[error("Driver error during evaluation: {0}")]
    Driver(#[from] DriverError),
}

impl GateError {
    /// Transient failures count as "not yet satisfied" for the current poll
    pub fn is_transient(&self) -> bool {
        match self {
            GateError::Driver(err) => err.is_transient(),
            _ => false,
        }
    }
}
