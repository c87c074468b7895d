//! Visual Snapshot - golden-image lifecycle and comparison for browser test runs
//!
//! This crate provides:
//! - Deterministic golden / candidate / diff path layout
//! - Idempotent directory provisioning
//! - Concurrent decoding of golden and candidate PNGs
//! - Pixel comparison with exclusion regions and diff rendering
//! - The update / first-run / verify decision policy
//! - The call surface exposed to in-page test code

pub mod config;
pub mod controller;
pub mod diff;
pub mod errors;
pub mod harness;
pub mod layout;
pub mod loader;
pub mod metrics;
pub mod models;
pub mod probe;
pub mod provision;
pub mod screenshot;
pub mod writer;

// Re-exports
pub use config::{CompareOptions, SnapshotConfig};
pub use controller::{decide_mode, SnapshotController, SnapshotMode};
pub use diff::{compare, Comparison};
pub use errors::SnapshotError;
pub use harness::{HarnessCall, HarnessReply, SnapshotHarness};
pub use layout::SnapshotLayout;
pub use models::*;
pub use screenshot::{CaptureBackend, CdpCapture, FileCapture};
