//! Form configuration files
//!
//! YAML or JSON documents are parsed, `${VAR}` placeholders are expanded,
//! and the result is validated into the engine's `FormConfig`.

pub mod loader;
pub mod schema;
pub mod substitute;

pub use loader::{ConfigFormat, ConfigLoader, LoadedConfig};
pub use schema::FileConfig;
pub use substitute::SubstituteError;
