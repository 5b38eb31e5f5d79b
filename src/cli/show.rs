use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::cli::output::{render_structured, OutputFormat};
use crate::config::ConfigLoader;

#[derive(Args, Clone, Debug)]
pub struct ShowArgs {
    /// Form configuration file (.yaml, .yml or .json)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

pub async fn cmd_show(args: ShowArgs, output: OutputFormat) -> Result<()> {
    let loaded = ConfigLoader::new().load_from_path(&args.file).await?;
    let resolved = loaded.redacted();

    match render_structured(&output, &resolved)? {
        Some(rendered) => println!("{}", rendered),
        None => {
            println!("# Resolved configuration ({}):", args.file.display());
            println!("{}", serde_yaml::to_string(&resolved)?);
        }
    }
    Ok(())
}
