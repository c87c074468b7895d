use clap::Parser;
use std::path::PathBuf;

use super::commands::Commands;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

/// Golden-image snapshot testing for browser runs
#[derive(Parser)]
#[command(author, version, about, long_about = None, long_version = LONG_VERSION)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,

    /// Rewrite goldens instead of comparing against them
    #[arg(long)]
    pub snapshot_update: bool,

    /// Root of the golden, screenshots and diff trees
    #[arg(long, value_name = "DIR")]
    pub output_root: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "human")]
    pub output: crate::cli::output::OutputFormat,

    /// Print the Prometheus text exposition after the command finishes
    #[arg(long)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}
