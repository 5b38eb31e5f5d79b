//! Failure handling strategies

use action_fields::{FieldError, FieldSpec};
use tracing::warn;

/// What to do after a field failed for good
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStrategy {
    /// End the run as Failed
    Abort,

    /// Record the failure and move to the next field
    Continue,
}

/// Decides how a field failure affects the run
pub trait FailureHandler: Send + Sync {
    fn on_field_failure(&self, spec: &FieldSpec, error: &FieldError) -> FailureStrategy;
}

/// Required fields abort, optional fields continue
///
/// Non-transient driver failures and interruptions abort regardless of the
/// `required` flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFailureHandler;

impl DefaultFailureHandler {
    pub fn new() -> Self {
        Self
    }
}

impl FailureHandler for DefaultFailureHandler {
    fn on_field_failure(&self, spec: &FieldSpec, error: &FieldError) -> FailureStrategy {
        if error.is_run_fatal() {
            warn!(field = %spec.label(), %error, "field failure is fatal, aborting run");
            return FailureStrategy::Abort;
        }
        if spec.required {
            warn!(field = %spec.label(), %error, "required field failed, aborting run");
            FailureStrategy::Abort
        } else {
            warn!(field = %spec.label(), %error, "optional field failed, continuing");
            FailureStrategy::Continue
        }
    }
}
