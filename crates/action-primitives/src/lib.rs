//! Action primitives for the form execution engine
//!
//! This crate provides the lowest layer the engine talks to:
//! - The driver port: abstract browser commands, independent of any automation technology
//! - Driver failure classification (transient vs fatal)
//! - Run context carrying the caller's deadline and cancellation token
//! - Page-readiness waiting
//! - The retry/backoff controller wrapping any driver interaction

pub mod driver;
pub mod errors;
pub mod retry;
pub mod types;
mod waiting;

pub use driver::*;
pub use errors::*;
pub use retry::*;
pub use types::*;
pub use waiting::*;
