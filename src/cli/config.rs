use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration after all overrides
    Show,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<bool> {
    match args.action {
        ConfigAction::Show => match ctx.output() {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(ctx.config())?),
            OutputFormat::Human => {
                println!("# source: {}", ctx.config_path().display());
                print!("{}", serde_yaml::to_string(ctx.config())?);
            }
        },
    }
    Ok(true)
}
