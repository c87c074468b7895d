//! Chromium DevTools Protocol plumbing for shotmatch.
//!
//! The crate exposes the transport seam (`CdpTransport`) that a hosting harness wires to a
//! live browser session, and `PageCommands`, which speaks the small set of `Page`, `Runtime`
//! and `Emulation` methods needed to capture page and element screenshots.

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
    pub enum AdapterErrorKind {
        #[error("command timed out")]
        Timeout,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("frame not found")]
        FrameNotFound,
        #[error("target element not found")]
        TargetNotFound,
        #[error("script evaluation failed")]
        ScriptFailed,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }
    }
}

pub mod config {
    use serde::{Deserialize, Serialize};
    use std::env;

    /// Tuning knobs for CDP command dispatch.
    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    pub struct CdpConfig {
        pub default_deadline_ms: u64,
        /// Name of the isolated world created for element lookups.
        pub world_name: String,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                default_deadline_ms: resolve_deadline_default(),
                world_name: "shotmatch".to_string(),
            }
        }
    }

    fn resolve_deadline_default() -> u64 {
        env::var("SHOTMATCH_CDP_DEADLINE_MS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(30_000)
    }
}

pub mod metrics;
pub mod page;
pub mod transport;

pub use config::CdpConfig;
pub use error::{AdapterError, AdapterErrorKind};
pub use metrics::AdapterMetricsSnapshot;
pub use page::{ClipRect, DeviceMetrics, PageCommands};
pub use transport::{CdpTransport, CommandTarget, NoopTransport};
