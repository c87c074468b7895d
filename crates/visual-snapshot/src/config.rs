//! Snapshot engine configuration, built once at startup and passed down explicitly.
use std::env;
use std::io;
use std::path::PathBuf;

use cdp_adapter::CdpConfig;
use serde::{Deserialize, Serialize};

use crate::errors::SnapshotError;
use crate::layout::SnapshotLayout;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Shared root of the golden, screenshots and diff trees
    pub output_root: PathBuf,

    /// Rewrite goldens instead of comparing
    pub update: bool,

    /// Frame name element captures are resolved in
    pub context_frame: String,

    pub compare: CompareOptions,

    pub cdp: CdpConfig,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("target"),
            update: false,
            context_frame: "context".to_string(),
            compare: CompareOptions::default(),
            cdp: CdpConfig::default(),
        }
    }
}

impl SnapshotConfig {
    pub fn layout(&self) -> SnapshotLayout {
        SnapshotLayout::new(self.output_root.clone())
    }

    /// Apply `SHOTMATCH_SNAPSHOT_UPDATE` and `SHOTMATCH_OUTPUT_ROOT`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("SHOTMATCH_SNAPSHOT_UPDATE") {
            self.update = is_truthy(&value);
        }
        if let Ok(value) = env::var("SHOTMATCH_OUTPUT_ROOT") {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                self.output_root = PathBuf::from(trimmed);
            }
        }
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.context_frame.trim().is_empty() {
            return Err(SnapshotError::InvalidConfig(
                "context_frame must not be empty".to_string(),
            ));
        }
        self.compare.validate()
    }

    /// Anchor a relative output root at the current directory.
    pub fn absolutize(&mut self) -> io::Result<()> {
        if self.output_root.is_relative() {
            self.output_root = env::current_dir()?.join(&self.output_root);
        }
        Ok(())
    }
}

fn unit_interval(name: &str, value: f64) -> Result<(), SnapshotError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SnapshotError::InvalidConfig(format!(
            "compare.{name} must be between 0.0 and 1.0, got {value}"
        )))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Comparator tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Matching threshold (0.0-1.0); smaller is more sensitive
    pub threshold: f64,

    /// Count anti-aliased pixels as differences
    pub include_anti_aliased: bool,

    /// Opacity of the golden image drawn under the diff (0.0-1.0)
    pub alpha: f64,

    pub diff_color: [u8; 3],

    pub aa_color: [u8; 3],
}

impl CompareOptions {
    /// Out-of-range values would make every comparison pass.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        unit_interval("threshold", self.threshold)?;
        unit_interval("alpha", self.alpha)
    }
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            include_anti_aliased: false,
            alpha: 0.1,
            diff_color: [255, 0, 0],
            aa_color: [255, 255, 0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: SnapshotConfig =
            serde_json::from_str(r#"{ "update": true, "compare": { "threshold": 0.05 } }"#)
                .unwrap();
        assert!(config.update);
        assert_eq!(config.output_root, PathBuf::from("target"));
        assert_eq!(config.compare.threshold, 0.05);
        assert_eq!(config.compare.alpha, 0.1);
        assert_eq!(config.context_frame, "context");
    }

    #[test]
    #[serial]
    fn env_overrides_mode_and_root() {
        env::set_var("SHOTMATCH_SNAPSHOT_UPDATE", "Yes");
        env::set_var("SHOTMATCH_OUTPUT_ROOT", "/tmp/shots");
        let mut config = SnapshotConfig::default();
        config.apply_env_overrides();
        env::remove_var("SHOTMATCH_SNAPSHOT_UPDATE");
        env::remove_var("SHOTMATCH_OUTPUT_ROOT");
        assert!(config.update);
        assert_eq!(config.output_root, PathBuf::from("/tmp/shots"));
    }

    #[test]
    fn validate_rejects_out_of_range_compare_options() {
        assert!(SnapshotConfig::default().validate().is_ok());

        for threshold in [f64::NAN, f64::INFINITY, -0.1, 1.5, 2.0] {
            let mut config = SnapshotConfig::default();
            config.compare.threshold = threshold;
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, SnapshotError::InvalidConfig(ref msg) if msg.contains("threshold")),
                "{threshold}: {err}"
            );
        }

        let mut config = SnapshotConfig::default();
        config.compare.alpha = 1.1;
        assert!(matches!(
            config.validate(),
            Err(SnapshotError::InvalidConfig(_))
        ));

        let mut config = SnapshotConfig::default();
        config.compare.threshold = 0.0;
        config.compare.alpha = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_context_frame() {
        let config = SnapshotConfig {
            context_frame: " ".to_string(),
            ..SnapshotConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn absolutize_anchors_relative_root() {
        let mut config = SnapshotConfig::default();
        config.absolutize().unwrap();
        assert!(config.output_root.is_absolute());
        assert!(config.output_root.ends_with("target"));
    }
}
