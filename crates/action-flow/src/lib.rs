//! Form execution engine
//!
//! Sequences navigation, page readiness, per-field value injection,
//! submission and success polling against a [`DriverPort`], with retries
//! around transient failures and screenshots at fixed checkpoints.
//!
//! [`DriverPort`]: action_primitives::DriverPort

pub mod errors;
pub mod events;
pub mod executor;
pub mod preflight;
pub mod screenshots;
pub mod strategies;
pub mod types;

pub use errors::{ConfigurationError, EngineError};
pub use events::{EventKind, EventSink, MemoryEventSink, RunEvent, TracingEventSink};
pub use executor::{FormEngine, FormEngineBuilder};
pub use preflight::ExecutionPlan;
pub use screenshots::{Checkpoint, ScreenshotError, ScreenshotRecorder};
pub use strategies::{DefaultFailureHandler, FailureHandler, FailureStrategy};
pub use types::{
    EngineState, ExecutionOutcome, FieldResult, FieldStatus, FormConfig, RunOptions, RunStatus,
};
