//! Error types for snapshot operations
use std::io;
use std::path::{Path, PathBuf};

use cdp_adapter::AdapterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Identifier segments that cannot be mapped onto the namespace trees
    #[error("invalid snapshot identifier: {0}")]
    InvalidIdentifier(String),

    /// Path unreadable or unwritable
    #[error("io failure at {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Image stream is not a valid PNG
    #[error("failed to decode {}: {}", .path.display(), .message)]
    Decode { path: PathBuf, message: String },

    /// Browser-side capture failed
    #[error("capture failed: {0}")]
    Capture(String),

    /// Diff artifact could not be written after a mismatch
    #[error("failed to persist diff {}: {}", .path.display(), .message)]
    DiffPersist { path: PathBuf, message: String },

    /// Configuration value outside its accepted range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed harness call
    #[error("invalid harness request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SnapshotError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<AdapterError> for SnapshotError {
    fn from(err: AdapterError) -> Self {
        Self::Capture(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SnapshotError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("task join error: {err}"))
    }
}
