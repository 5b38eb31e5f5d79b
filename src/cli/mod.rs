pub mod app;
pub mod commands;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod runtime;
pub mod show;
pub mod validate;

pub use show::{cmd_show, ShowArgs};
pub use validate::{cmd_validate, ValidateArgs};
