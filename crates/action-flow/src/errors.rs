//! Form execution error types

use action_fields::FieldError;
use action_gate::GateError;
use action_primitives::{DriverError, Interruption, ReadyError, RetryError, RetryPolicyError};
use thiserror::Error;

/// Defects found before the run touches the browser
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("URL cannot be empty")]
    EmptyUrl,

    #[error("Selector cannot be empty (field #{index})")]
    EmptySelector { index: usize },

    #[error("Selector cannot be empty (submit)")]
    EmptySubmitSelector,

    #[error("Invalid field_type {field_type:?} for field {field}")]
    UnknownFieldType { field: String, field_type: String },

    #[error("Invalid value for field {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unresolved placeholder in {location}")]
    UnresolvedPlaceholder { location: String },

    #[error(transparent)]
    InvalidCondition(GateError),

    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(#[from] RetryPolicyError),
}

/// Cause of a failed run, attached to the outcome and the event trail
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("navigation failed: {0}")]
    Navigation(DriverError),

    #[error("page not ready: {0}")]
    PageNotReady(ReadyError),

    #[error("field {field} aborted the run: {source}")]
    FieldAborted {
        field: String,
        #[source]
        source: FieldError,
    },

    #[error("submit failed: {0}")]
    Submit(RetryError),

    #[error("submit click failed: {0}")]
    SubmitClick(DriverError),

    #[error("success condition {condition} not met within {timeout_ms}ms (last observed: {})", .last_observed.as_deref().unwrap_or("nothing"))]
    ConditionTimeout {
        condition: String,
        timeout_ms: u64,
        last_observed: Option<String>,
    },

    #[error("success condition could not be evaluated: {0}")]
    Condition(GateError),

    #[error("run interrupted: {0}")]
    Interrupted(#[from] Interruption),
}

impl EngineError {
    /// Cancellation or deadline expiry anywhere in the run
    pub fn is_interruption(&self) -> bool {
        matches!(
            self,
            EngineError::Interrupted(_)
                | EngineError::Submit(RetryError::Interrupted { .. })
                | EngineError::PageNotReady(ReadyError::Interrupted(_))
                | EngineError::FieldAborted {
                    source: FieldError::Retry(RetryError::Interrupted { .. }),
                    ..
                }
        )
    }
}
