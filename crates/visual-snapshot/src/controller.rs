//! Snapshot controller: decides between updating, accepting and verifying a golden
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::fs;
use tracing::{debug, info, warn};

use crate::{
    config::SnapshotConfig,
    diff::{compare, persist_diff, Comparison},
    errors::SnapshotError,
    layout::SnapshotLayout,
    loader::load_pair,
    metrics,
    models::{CaptureTarget, Namespace, Region, SnapshotId, SnapshotOutcome, Viewport},
    probe,
    provision::ensure_directory_chain,
    screenshot::CaptureBackend,
    writer::write_atomic,
};

/// Branch taken for one snapshot request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotMode {
    UpdateGolden,
    FirstRunAccept,
    VerifyAgainstGolden,
}

pub fn decide_mode(update: bool, golden_exists: bool) -> SnapshotMode {
    match (update, golden_exists) {
        (true, _) => SnapshotMode::UpdateGolden,
        (false, false) => SnapshotMode::FirstRunAccept,
        (false, true) => SnapshotMode::VerifyAgainstGolden,
    }
}

/// Runs snapshot requests against one output root with one capture backend.
///
/// Requests for different identifiers may run concurrently. Requests for the same
/// identifier must be serialized by the caller.
pub struct SnapshotController {
    config: SnapshotConfig,
    layout: SnapshotLayout,
    backend: Arc<dyn CaptureBackend>,
}

impl SnapshotController {
    pub fn new(config: SnapshotConfig, backend: Arc<dyn CaptureBackend>) -> Self {
        let layout = config.layout();
        Self {
            config,
            layout,
            backend,
        }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    pub fn layout(&self) -> &SnapshotLayout {
        &self.layout
    }

    /// Capture `target` and settle it against the golden for `id`.
    pub async fn match_snapshot(
        &self,
        id: &SnapshotId,
        target: &CaptureTarget,
        excluded: &[Region],
    ) -> Result<SnapshotOutcome, SnapshotError> {
        let golden = self.layout.resolve(id, Namespace::Golden);
        // update mode never consults the golden
        let golden_exists = !self.config.update && probe::exists(&golden).await;
        let mode = decide_mode(self.config.update, golden_exists);
        debug!(%id, ?mode, "snapshot mode decided");

        let outcome = match mode {
            SnapshotMode::UpdateGolden => SnapshotOutcome::Updated {
                golden: self.capture_into(id, Namespace::Golden, target).await?,
            },
            SnapshotMode::FirstRunAccept => {
                let golden = self.capture_into(id, Namespace::Golden, target).await?;
                info!(%id, golden = %golden.display(), "no golden found; accepted capture as baseline");
                SnapshotOutcome::FirstRun { golden }
            }
            SnapshotMode::VerifyAgainstGolden => self.verify(id, target, excluded).await?,
        };

        if !matches!(outcome, SnapshotOutcome::Mismatched { diff: Some(_), .. }) {
            self.remove_stale_diff(id).await;
        }
        metrics::record_outcome(&outcome);
        Ok(outcome)
    }

    /// Plain candidate capture without comparison.
    pub async fn capture(
        &self,
        id: &SnapshotId,
        target: &CaptureTarget,
    ) -> Result<PathBuf, SnapshotError> {
        self.capture_into(id, Namespace::Candidate, target).await
    }

    pub async fn set_viewport(&self, viewport: &Viewport) -> Result<(), SnapshotError> {
        self.backend.set_viewport(viewport).await
    }

    async fn capture_into(
        &self,
        id: &SnapshotId,
        namespace: Namespace,
        target: &CaptureTarget,
    ) -> Result<PathBuf, SnapshotError> {
        ensure_directory_chain(&self.layout.namespace_root(namespace), id).await?;
        let bytes = self.backend.capture(target).await?;
        let path = self.layout.resolve(id, namespace);
        write_atomic(&path, &bytes).await?;
        debug!(%id, path = %path.display(), bytes = bytes.len(), "capture written");
        Ok(path)
    }

    async fn verify(
        &self,
        id: &SnapshotId,
        target: &CaptureTarget,
        excluded: &[Region],
    ) -> Result<SnapshotOutcome, SnapshotError> {
        let candidate = self.capture_into(id, Namespace::Candidate, target).await?;
        let golden = self.layout.resolve(id, Namespace::Golden);
        let (golden_image, candidate_image) = load_pair(&golden, &candidate).await?;

        let excluded = excluded.to_vec();
        let options = self.config.compare.clone();
        let started = Instant::now();
        let comparison = tokio::task::spawn_blocking(move || {
            compare(&golden_image, &candidate_image, &excluded, &options)
        })
        .await?;
        metrics::observe_compare(started.elapsed());

        let outcome = match comparison {
            Comparison::Match => SnapshotOutcome::Matched { golden, candidate },
            Comparison::DimensionMismatch {
                golden: golden_size,
                candidate: candidate_size,
            } => {
                warn!(%id, ?golden_size, ?candidate_size, "snapshot size differs from golden");
                SnapshotOutcome::DimensionMismatch {
                    golden: golden_size,
                    candidate: candidate_size,
                }
            }
            Comparison::Mismatch { diff_pixels, diff } => {
                warn!(%id, diff_pixels, "snapshot differs from golden");
                let diff = match persist_diff(&self.layout, id, diff).await {
                    Ok(path) => Some(path),
                    Err(err) => {
                        metrics::record_diff_persist_failure();
                        warn!(%id, error = %err, "diff artifact not written");
                        None
                    }
                };
                SnapshotOutcome::Mismatched {
                    candidate,
                    diff_pixels,
                    diff,
                }
            }
        };
        Ok(outcome)
    }

    /// A diff only ever describes the latest verdict, so drop one left by an earlier mismatch.
    async fn remove_stale_diff(&self, id: &SnapshotId) {
        let path = self.layout.resolve(id, Namespace::Diff);
        if let Err(err) = fs::remove_file(&path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %path.display(), %err, "could not remove stale diff");
            }
        }
    }
}
