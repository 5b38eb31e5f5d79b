//! Error types for driver interactions

use thiserror::Error;

/// Failures reported by a driver implementation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Element is not (yet) present in the DOM
    #[error("Element not found: {0}")]
    NotFound(String),

    /// Element exists but cannot receive input (obscured, disabled, animating)
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// Element reference no longer attached to the document
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    /// Dropdown option was not found (options may still be loading)
    #[error("Option not found in dropdown: {0}")]
    OptionNotFound(String),

    /// Driver-side command timed out
    #[error("Driver timeout: {0}")]
    Timeout(String),

    /// Transport hiccup between engine and browser
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Selector could not be parsed by the browser
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Navigation failed (unreachable host, TLS failure, aborted load)
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Browser session is gone
    #[error("Session lost: {0}")]
    Session(String),

    /// The driver does not support the requested command
    #[error("Unsupported command: {0}")]
    Unsupported(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal driver error: {0}")]
    Internal(String),
}

/// Retry classification of a driver failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Element not there or not ready yet; expected to resolve with retries
    Transient,

    /// Configuration, session or transport failure; retrying cannot help
    /// and may repeat a command that already took effect
    Fatal,
}

impl DriverError {
    /// Classify this error for the retry controller
    pub fn class(&self) -> FailureClass {
        match self {
            DriverError::NotFound(_)
            | DriverError::NotInteractable(_)
            | DriverError::StaleElement(_)
            | DriverError::OptionNotFound(_) => FailureClass::Transient,
            DriverError::Timeout(_)
            | DriverError::Protocol(_)
            | DriverError::InvalidSelector(_)
            | DriverError::Navigation(_)
            | DriverError::Session(_)
            | DriverError::Unsupported(_)
            | DriverError::Internal(_) => FailureClass::Fatal,
        }
    }

    /// Check if this error is retryable
    pub fn is_transient(&self) -> bool {
        self.class() == FailureClass::Transient
    }

    /// Short machine-friendly label used in event trails
    pub fn kind(&self) -> &'static str {
        match self {
            DriverError::NotFound(_) => "not_found",
            DriverError::NotInteractable(_) => "not_interactable",
            DriverError::StaleElement(_) => "stale_element",
            DriverError::OptionNotFound(_) => "option_not_found",
            DriverError::Timeout(_) => "timeout",
            DriverError::Protocol(_) => "protocol",
            DriverError::InvalidSelector(_) => "invalid_selector",
            DriverError::Navigation(_) => "navigation",
            DriverError::Session(_) => "session",
            DriverError::Unsupported(_) => "unsupported",
            DriverError::Internal(_) => "internal",
        }
    }
}

/// Why a wait point stopped early
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// Caller cancelled the run
    #[error("run cancelled")]
    Cancelled,

    /// Caller's overall deadline elapsed
    #[error("run deadline exceeded")]
    DeadlineExceeded,
}
