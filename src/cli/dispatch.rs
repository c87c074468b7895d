use super::compare::cmd_compare;
use super::config::cmd_config;
use super::env::CliArgs;
use super::paths::cmd_paths;
use super::snapshot::cmd_match;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

/// Runs the selected command; `Ok(false)` means it completed with a failing verdict.
pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<bool> {
    match cli.command.clone() {
        Commands::Paths(args) => cmd_paths(args, ctx).await,
        Commands::Compare(args) => cmd_compare(args, ctx).await,
        Commands::Match(args) => cmd_match(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
