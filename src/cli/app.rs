use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{apply_runtime_overrides, init_logging, load_config, render_metrics};

pub async fn run() -> Result<ExitCode> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!("Starting shotmatch v{}", env!("CARGO_PKG_VERSION"));

    let loaded = load_config(cli.config.as_ref()).await?;
    let mut config = loaded.config;
    apply_runtime_overrides(&mut config, &cli)?;
    let cli_context = CliContext::new(config, loaded.path, cli.output);

    let result = dispatch(&cli, &cli_context).await;
    if cli.print_metrics {
        print!("{}", render_metrics()?);
    }

    match result {
        Ok(true) => {
            info!("Command completed successfully");
            Ok(ExitCode::SUCCESS)
        }
        Ok(false) => {
            info!("Command completed with a failing verdict");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
