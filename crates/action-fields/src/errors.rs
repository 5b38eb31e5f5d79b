use action_primitives::RetryError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("Invalid field_type: {0}")]
    UnknownFieldType(String),

    #[error("invalid value for {field_type} field: {reason}")]
    InvalidValue { field_type: String, reason: String },

    #[error(transparent)]
    Retry(#[from] RetryError),

    #[error("field {field} holds {actual}, expected {expected}")]
    VerificationFailed {
        field: String,
        expected: String,
        actual: String,
    },
}

impl FieldError {
    /// Whether the failure must end the run regardless of the field's `required` flag
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            FieldError::Retry(RetryError::Fatal { .. }) | FieldError::Retry(RetryError::Interrupted { .. })
        )
    }

    pub fn attempts(&self) -> Option<u32> {
        match self {
            FieldError::Retry(err) => Some(err.attempts()),
            _ => None,
        }
    }
}
