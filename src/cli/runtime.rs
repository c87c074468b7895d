use std::path::PathBuf;

use anyhow::{Context, Result};
use cdp_adapter::metrics as cdp_metrics;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::fs;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visual_snapshot::SnapshotConfig;

use super::env::CliArgs;

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    // stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

pub struct LoadedConfig {
    pub config: SnapshotConfig,
    pub path: PathBuf,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => {
            // Priority: ./config/shotmatch.yaml > ~/.config/shotmatch/config.yaml
            let local_config = PathBuf::from("config/shotmatch.yaml");
            if local_config.exists() {
                local_config
            } else {
                let mut path = dirs::config_dir().context("Failed to get config directory")?;
                path.push("shotmatch");
                path.push("config.yaml");
                path
            }
        }
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        let config: SnapshotConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

        info!("Loaded configuration from: {}", config_path.display());
        Ok(LoadedConfig {
            config,
            path: config_path,
        })
    } else {
        debug!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(LoadedConfig {
            config: SnapshotConfig::default(),
            path: config_path,
        })
    }
}

/// Layer environment and command-line overrides on top of the file configuration.
pub fn apply_runtime_overrides(config: &mut SnapshotConfig, cli: &CliArgs) -> Result<()> {
    config.apply_env_overrides();
    if cli.snapshot_update {
        config.update = true;
    }
    if let Some(root) = &cli.output_root {
        config.output_root = root.clone();
    }
    config
        .absolutize()
        .context("Failed to resolve output root")?;
    config.validate().context("Invalid snapshot configuration")?;

    if config.update {
        warn!("Snapshot update mode: goldens will be overwritten");
    }
    Ok(())
}

pub fn render_metrics() -> Result<String> {
    let registry = Registry::new();
    visual_snapshot::metrics::register_metrics(&registry);
    cdp_metrics::register_metrics(&registry);

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics exposition is not UTF-8")
}
