//! Success-condition evaluator
//!
//! Post-submission predicates evaluated against driver state:
//! - URL checks (contains / equals / regex match)
//! - Element presence and absence
//! - Element text (exact / substring)
//!
//! Evaluators answer a single question per call. Polling cadence and the
//! overall timeout belong to the caller.

pub mod conditions;
pub mod errors;
pub mod evaluator;

pub use conditions::*;
pub use errors::*;
pub use evaluator::*;
