use clap::Subcommand;

use super::show::ShowArgs;
use super::validate::ValidateArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Load a form configuration and run the engine's pre-flight checks
    Validate(ValidateArgs),

    /// Print the resolved configuration with secrets masked
    Show(ShowArgs),
}
