use super::env::CliArgs;
use super::show::cmd_show;
use super::validate::cmd_validate;
use crate::cli::commands::Commands;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs) -> Result<()> {
    match cli.command.clone() {
        Commands::Validate(args) => cmd_validate(args, cli.output.clone()).await,
        Commands::Show(args) => cmd_show(args, cli.output.clone()).await,
    }
}
