pub mod errors;
pub mod model;
pub mod redact;
pub mod registry;
pub mod strategies;

pub use errors::FieldError;
pub use model::{AppliedValue, FieldSpec};
pub use registry::{FieldStrategy, FieldStrategyRegistry};
pub use strategies::{CheckboxStrategy, RadioStrategy, SelectStrategy, TextStrategy};
