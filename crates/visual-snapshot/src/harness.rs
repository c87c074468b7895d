//! Call surface exposed to in-page test code
//!
//! Calls arrive as JSON objects tagged by `fn` with their arguments under
//! `args`, e.g. `{"fn":"matchPageSnapshot","args":{"paths":["home","hero"]}}`.
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    controller::SnapshotController,
    errors::SnapshotError,
    models::{CaptureTarget, ClipRect, Region, SnapshotId, Viewport},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fn", content = "args", rename_all = "camelCase")]
pub enum HarnessCall {
    CapturePage {
        name: String,
        #[serde(default)]
        clip: Option<ClipRect>,
    },
    CaptureElement {
        name: String,
        selector: String,
    },
    MatchPageSnapshot {
        paths: Vec<String>,
        #[serde(default)]
        clip: Option<ClipRect>,
        #[serde(default)]
        excluded: Option<Vec<Region>>,
    },
    MatchElementSnapshot {
        paths: Vec<String>,
        selector: String,
        #[serde(default)]
        excluded: Option<Vec<Region>>,
    },
    SetViewport {
        options: Viewport,
    },
    Done {
        code: i32,
    },
}

/// What the harness hands back to page code.
#[derive(Debug, Clone, PartialEq)]
pub enum HarnessReply {
    Value(Value),
    /// Page code asked to end the run with this exit code
    Exit(i32),
}

pub struct SnapshotHarness {
    controller: SnapshotController,
}

impl SnapshotHarness {
    pub fn new(controller: SnapshotController) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &SnapshotController {
        &self.controller
    }

    pub async fn dispatch_json(&self, raw: &str) -> Result<HarnessReply, SnapshotError> {
        let call: HarnessCall = serde_json::from_str(raw)
            .map_err(|err| SnapshotError::InvalidRequest(err.to_string()))?;
        self.dispatch(call).await
    }

    pub async fn dispatch(&self, call: HarnessCall) -> Result<HarnessReply, SnapshotError> {
        debug!(?call, "harness call");
        match call {
            HarnessCall::CapturePage { name, clip } => {
                let id = SnapshotId::parse(&name)?;
                let path = self
                    .controller
                    .capture(&id, &CaptureTarget::Page { clip })
                    .await?;
                Ok(HarnessReply::Value(json!(path)))
            }
            HarnessCall::CaptureElement { name, selector } => {
                let id = SnapshotId::parse(&name)?;
                let path = self
                    .controller
                    .capture(&id, &self.element_target(selector))
                    .await?;
                Ok(HarnessReply::Value(json!(path)))
            }
            HarnessCall::MatchPageSnapshot {
                paths,
                clip,
                excluded,
            } => {
                self.match_snapshot(paths, CaptureTarget::Page { clip }, excluded)
                    .await
            }
            HarnessCall::MatchElementSnapshot {
                paths,
                selector,
                excluded,
            } => {
                let target = self.element_target(selector);
                self.match_snapshot(paths, target, excluded).await
            }
            HarnessCall::SetViewport { options } => {
                self.controller.set_viewport(&options).await?;
                Ok(HarnessReply::Value(Value::Null))
            }
            HarnessCall::Done { code } => {
                info!(code, "harness finished");
                Ok(HarnessReply::Exit(code))
            }
        }
    }

    async fn match_snapshot(
        &self,
        paths: Vec<String>,
        target: CaptureTarget,
        excluded: Option<Vec<Region>>,
    ) -> Result<HarnessReply, SnapshotError> {
        let id = SnapshotId::new(paths)?;
        let excluded = excluded.unwrap_or_default();
        let outcome = self
            .controller
            .match_snapshot(&id, &target, &excluded)
            .await?;
        Ok(HarnessReply::Value(Value::Bool(outcome.passed())))
    }

    fn element_target(&self, selector: String) -> CaptureTarget {
        CaptureTarget::Element {
            frame: self.controller.config().context_frame.clone(),
            selector,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SnapshotConfig, screenshot::CaptureBackend, writer::encode_png};
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};
    use serial_test::serial;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    struct RecordingBackend {
        png: Vec<u8>,
        targets: Mutex<Vec<CaptureTarget>>,
        viewports: Mutex<Vec<Viewport>>,
    }

    impl RecordingBackend {
        fn solid(color: [u8; 4]) -> Arc<Self> {
            let image = RgbaImage::from_pixel(10, 10, Rgba(color));
            Arc::new(Self {
                png: encode_png(&image).unwrap(),
                targets: Mutex::new(Vec::new()),
                viewports: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CaptureBackend for RecordingBackend {
        async fn capture(&self, target: &CaptureTarget) -> Result<Vec<u8>, SnapshotError> {
            self.targets.lock().unwrap().push(target.clone());
            Ok(self.png.clone())
        }

        async fn set_viewport(&self, viewport: &Viewport) -> Result<(), SnapshotError> {
            self.viewports.lock().unwrap().push(*viewport);
            Ok(())
        }
    }

    fn harness(root: &std::path::Path, backend: Arc<RecordingBackend>) -> SnapshotHarness {
        let config = SnapshotConfig {
            output_root: root.to_path_buf(),
            context_frame: "app".to_string(),
            ..SnapshotConfig::default()
        };
        SnapshotHarness::new(SnapshotController::new(config, backend))
    }

    #[test]
    fn parses_tagged_calls() {
        let call: HarnessCall = serde_json::from_str(
            r#"{"fn":"matchPageSnapshot","args":{"paths":["home","hero"],"excluded":[{"x":0,"y":0,"width":5,"height":5}]}}"#,
        )
        .unwrap();
        assert_eq!(
            call,
            HarnessCall::MatchPageSnapshot {
                paths: vec!["home".into(), "hero".into()],
                clip: None,
                excluded: Some(vec![Region::new(0, 0, 5, 5)]),
            }
        );

        let call: HarnessCall =
            serde_json::from_str(r#"{"fn":"done","args":{"code":3}}"#).unwrap();
        assert_eq!(call, HarnessCall::Done { code: 3 });
    }

    #[tokio::test]
    async fn malformed_call_is_invalid_request() {
        let dir = tempdir().unwrap();
        let harness = harness(dir.path(), RecordingBackend::solid([255, 0, 0, 255]));
        let err = harness
            .dispatch_json(r#"{"fn":"teleport","args":{}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidRequest(_)));
    }

    #[tokio::test]
    #[serial]
    async fn match_element_uses_context_frame_and_reports_bool() {
        let dir = tempdir().unwrap();
        let backend = RecordingBackend::solid([0, 0, 255, 255]);
        let harness = harness(dir.path(), backend.clone());

        let reply = harness
            .dispatch_json(
                r##"{"fn":"matchElementSnapshot","args":{"paths":["form","submit"],"selector":"#submit"}}"##,
            )
            .await
            .unwrap();
        assert_eq!(reply, HarnessReply::Value(Value::Bool(true)));
        assert!(dir.path().join("golden/form/submit.png").is_file());
        assert_eq!(
            backend.targets.lock().unwrap().as_slice(),
            &[CaptureTarget::Element {
                frame: "app".into(),
                selector: "#submit".into()
            }]
        );
    }

    #[tokio::test]
    #[serial]
    async fn fractional_exclusions_are_accepted() {
        let dir = tempdir().unwrap();
        let golden = dir.path().join("golden/hero.png");
        std::fs::create_dir_all(golden.parent().unwrap()).unwrap();
        let blue = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 255]));
        std::fs::write(&golden, encode_png(&blue).unwrap()).unwrap();
        let harness = harness(dir.path(), RecordingBackend::solid([255, 0, 0, 255]));

        let reply = harness
            .dispatch_json(
                r#"{"fn":"matchPageSnapshot","args":{"paths":["hero"],"excluded":[{"x":0.5,"y":0,"width":9.6,"height":10}]}}"#,
            )
            .await
            .unwrap();
        assert_eq!(reply, HarnessReply::Value(Value::Bool(true)));
    }

    #[tokio::test]
    async fn capture_page_writes_candidate_and_returns_path() {
        let dir = tempdir().unwrap();
        let harness = harness(dir.path(), RecordingBackend::solid([255, 0, 0, 255]));

        let reply = harness
            .dispatch(HarnessCall::CapturePage {
                name: "landing/full".into(),
                clip: None,
            })
            .await
            .unwrap();
        let expected = dir.path().join("screenshots/landing/full.png");
        assert_eq!(reply, HarnessReply::Value(json!(expected)));
        assert!(expected.is_file());
    }

    #[tokio::test]
    async fn viewport_and_done_pass_through() {
        let dir = tempdir().unwrap();
        let backend = RecordingBackend::solid([255, 0, 0, 255]);
        let harness = harness(dir.path(), backend.clone());

        let reply = harness
            .dispatch_json(r#"{"fn":"setViewport","args":{"options":{"width":800,"height":600}}}"#)
            .await
            .unwrap();
        assert_eq!(reply, HarnessReply::Value(Value::Null));
        assert_eq!(backend.viewports.lock().unwrap()[0].width, 800);

        let reply = harness.dispatch(HarnessCall::Done { code: 2 }).await.unwrap();
        assert_eq!(reply, HarnessReply::Exit(2));
    }

    #[tokio::test]
    async fn bad_segments_are_rejected_before_capture() {
        let dir = tempdir().unwrap();
        let backend = RecordingBackend::solid([255, 0, 0, 255]);
        let harness = harness(dir.path(), backend.clone());

        let err = harness
            .dispatch(HarnessCall::MatchPageSnapshot {
                paths: vec!["..".into(), "escape".into()],
                clip: None,
                excluded: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidIdentifier(_)));
        assert!(backend.targets.lock().unwrap().is_empty());
    }
}
