//! Capture backends that render a `CaptureTarget` into PNG bytes
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use cdp_adapter::PageCommands;
use tokio::fs;
use tracing::debug;

use crate::{
    errors::SnapshotError,
    models::{CaptureTarget, Viewport},
};

/// Something that can render the page under test.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Render `target` and return the encoded PNG.
    async fn capture(&self, target: &CaptureTarget) -> Result<Vec<u8>, SnapshotError>;

    async fn set_viewport(&self, viewport: &Viewport) -> Result<(), SnapshotError>;
}

/// Captures through a live DevTools session.
pub struct CdpCapture {
    page: Arc<PageCommands>,
}

impl CdpCapture {
    pub fn new(page: PageCommands) -> Self {
        Self {
            page: Arc::new(page),
        }
    }
}

#[async_trait]
impl CaptureBackend for CdpCapture {
    async fn capture(&self, target: &CaptureTarget) -> Result<Vec<u8>, SnapshotError> {
        debug!(?target, "capturing via cdp");
        let bytes = match target {
            CaptureTarget::Page { clip: Some(clip) } => {
                self.page.capture_screenshot(Some(*clip), true).await?
            }
            CaptureTarget::Page { clip: None } => self.page.capture_full_page().await?,
            CaptureTarget::Element { frame, selector } => {
                self.page.capture_element(frame, selector).await?
            }
        };
        Ok(bytes)
    }

    async fn set_viewport(&self, viewport: &Viewport) -> Result<(), SnapshotError> {
        self.page.set_device_metrics(viewport).await?;
        Ok(())
    }
}

/// Serves an already rendered PNG from disk, for pipelines that render out-of-process.
pub struct FileCapture {
    source: PathBuf,
}

impl FileCapture {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

#[async_trait]
impl CaptureBackend for FileCapture {
    async fn capture(&self, target: &CaptureTarget) -> Result<Vec<u8>, SnapshotError> {
        debug!(source = %self.source.display(), ?target, "serving capture from file");
        fs::read(&self.source)
            .await
            .map_err(|err| SnapshotError::io(&self.source, err))
    }

    async fn set_viewport(&self, viewport: &Viewport) -> Result<(), SnapshotError> {
        debug!(?viewport, "viewport is fixed for file captures");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::{CdpConfig, CommandTarget, NoopTransport};

    #[tokio::test]
    async fn file_capture_reads_source() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("render.png");
        std::fs::write(&source, b"bytes").unwrap();
        let backend = FileCapture::new(&source);
        let bytes = backend
            .capture(&CaptureTarget::Page { clip: None })
            .await
            .unwrap();
        assert_eq!(bytes, b"bytes");
    }

    #[tokio::test]
    async fn file_capture_missing_source_is_io_error() {
        let backend = FileCapture::new("/nonexistent/render.png");
        let err = backend
            .capture(&CaptureTarget::Page { clip: None })
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }

    #[tokio::test]
    async fn cdp_failures_become_capture_errors() {
        let page = PageCommands::new(
            Arc::new(NoopTransport),
            CommandTarget::Browser,
            &CdpConfig::default(),
        );
        let backend = CdpCapture::new(page);
        let err = backend
            .capture(&CaptureTarget::Element {
                frame: "context".into(),
                selector: "#card".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Capture(_)), "{err}");
    }
}
