use std::path::{Path, PathBuf};

use visual_snapshot::{SnapshotConfig, SnapshotLayout};

use super::output::OutputFormat;

pub struct CliContext {
    config: SnapshotConfig,
    config_path: PathBuf,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: SnapshotConfig, config_path: PathBuf, output: OutputFormat) -> Self {
        Self {
            config,
            config_path,
            output,
        }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    pub fn layout(&self) -> SnapshotLayout {
        self.config.layout()
    }
}
