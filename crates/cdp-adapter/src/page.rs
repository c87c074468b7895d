use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::metrics;
use crate::transport::{CdpTransport, CommandTarget};

/// Rectangle in CSS pixels, page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ClipRect {
    fn to_viewport(self) -> Value {
        json!({
            "x": self.x,
            "y": self.y,
            "width": self.width,
            "height": self.height,
            "scale": 1,
        })
    }
}

/// Arguments of `Emulation.setDeviceMetricsOverride`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMetrics {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_scale_factor")]
    pub device_scale_factor: f64,
    #[serde(default, alias = "isMobile")]
    pub mobile: bool,
}

fn default_scale_factor() -> f64 {
    1.0
}

/// Page-scoped command helper speaking the capture-related subset of CDP.
pub struct PageCommands {
    transport: Arc<dyn CdpTransport>,
    target: CommandTarget,
    deadline: Duration,
    world_name: String,
}

impl PageCommands {
    pub fn new(transport: Arc<dyn CdpTransport>, target: CommandTarget, cfg: &CdpConfig) -> Self {
        Self {
            transport,
            target,
            deadline: Duration::from_millis(cfg.default_deadline_ms),
            world_name: cfg.world_name.clone(),
        }
    }

    async fn send(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
        let start = Instant::now();
        metrics::record_command(method);
        let outcome = tokio::time::timeout(
            self.deadline,
            self.transport
                .send_command(self.target.clone(), method, params),
        )
        .await
        .unwrap_or_else(|_| {
            Err(AdapterError::new(AdapterErrorKind::Timeout)
                .with_hint(format!("{method} exceeded {:?}", self.deadline))
                .retriable(true))
        });
        match outcome {
            Ok(value) => {
                metrics::record_command_success(method, start.elapsed());
                Ok(value)
            }
            Err(err) => {
                metrics::record_command_failure(method);
                Err(err)
            }
        }
    }

    /// Capture a PNG of the page, optionally restricted to `clip`.
    pub async fn capture_screenshot(
        &self,
        clip: Option<ClipRect>,
        beyond_viewport: bool,
    ) -> Result<Vec<u8>, AdapterError> {
        let mut params = json!({
            "format": "png",
            "captureBeyondViewport": beyond_viewport,
        });
        if let Some(clip) = clip {
            params["clip"] = clip.to_viewport();
        }
        let response = self.send("Page.captureScreenshot", params).await?;
        let data = response
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal).with_hint("missing screenshot data")
            })?;
        STANDARD
            .decode(data)
            .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))
    }

    /// Size of the whole scrollable document in CSS pixels.
    pub async fn content_size(&self) -> Result<(f64, f64), AdapterError> {
        let response = self
            .send("Page.getLayoutMetrics", Value::Object(Default::default()))
            .await?;
        let size = response
            .get("cssContentSize")
            .or_else(|| response.get("contentSize"))
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal).with_hint("missing content size")
            })?;
        let width = size.get("width").and_then(Value::as_f64).unwrap_or(0.0);
        let height = size.get("height").and_then(Value::as_f64).unwrap_or(0.0);
        Ok((width, height))
    }

    pub async fn capture_full_page(&self) -> Result<Vec<u8>, AdapterError> {
        let (width, height) = self.content_size().await?;
        debug!(width, height, "capturing full page");
        let clip = ClipRect {
            x: 0.0,
            y: 0.0,
            width: width.ceil(),
            height: height.ceil(),
        };
        self.capture_screenshot(Some(clip), true).await
    }

    /// Resolve the id of the frame whose `name` attribute equals `name`.
    pub async fn frame_id_by_name(&self, name: &str) -> Result<String, AdapterError> {
        let response = self
            .send("Page.getFrameTree", Value::Object(Default::default()))
            .await?;
        response
            .get("frameTree")
            .and_then(|tree| find_frame(tree, name))
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::FrameNotFound)
                    .with_hint(format!("no frame named {name:?}"))
            })
    }

    /// Page-space bounding box of the first element matching `selector` inside the named frame.
    pub async fn element_box(&self, frame: &str, selector: &str) -> Result<ClipRect, AdapterError> {
        let frame_id = self.frame_id_by_name(frame).await?;
        let world = self
            .send(
                "Page.createIsolatedWorld",
                json!({ "frameId": frame_id, "worldName": self.world_name }),
            )
            .await?;
        let context_id = world
            .get("executionContextId")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("isolated world without execution context")
            })?;

        let response = self
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": element_box_script(selector),
                    "contextId": context_id,
                    "returnByValue": true,
                }),
            )
            .await?;
        if let Some(details) = response.get("exceptionDetails") {
            return Err(AdapterError::new(AdapterErrorKind::ScriptFailed)
                .with_hint(details.to_string()));
        }
        let value = response
            .get("result")
            .and_then(|result| result.get("value"))
            .filter(|value| !value.is_null())
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::TargetNotFound)
                    .with_hint(format!("{selector} in frame {frame}"))
            })?;
        let rect: ClipRect = serde_json::from_value(value.clone()).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string())
        })?;
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("{selector} has an empty box")));
        }
        Ok(rect)
    }

    pub async fn capture_element(&self, frame: &str, selector: &str) -> Result<Vec<u8>, AdapterError> {
        let rect = self.element_box(frame, selector).await?;
        self.capture_screenshot(Some(rect), true).await
    }

    pub async fn set_device_metrics(&self, metrics: &DeviceMetrics) -> Result<(), AdapterError> {
        self.send(
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": metrics.width,
                "height": metrics.height,
                "deviceScaleFactor": metrics.device_scale_factor,
                "mobile": metrics.mobile,
            }),
        )
        .await?;
        Ok(())
    }
}

fn find_frame(tree: &Value, name: &str) -> Option<String> {
    let frame = tree.get("frame")?;
    if frame.get("name").and_then(Value::as_str) == Some(name) {
        return frame.get("id").and_then(Value::as_str).map(str::to_string);
    }
    tree.get("childFrames")
        .and_then(Value::as_array)
        .and_then(|children| children.iter().find_map(|child| find_frame(child, name)))
}

/// Script returning the element's box translated through every same-origin ancestor frame.
fn element_box_script(selector: &str) -> String {
    let quoted = Value::String(selector.to_string()).to_string();
    format!(
        r#"(() => {{
  const el = document.querySelector({quoted});
  if (!el) return null;
  const r = el.getBoundingClientRect();
  let x = r.left, y = r.top, w = window;
  while (w.frameElement) {{
    const f = w.frameElement.getBoundingClientRect();
    x += f.left + w.frameElement.clientLeft;
    y += f.top + w.frameElement.clientTop;
    w = w.parent;
  }}
  return {{ x: x + w.scrollX, y: y + w.scrollY, width: r.width, height: r.height }};
}})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_frame_by_name() {
        let tree = json!({
            "frame": { "id": "main", "name": "" },
            "childFrames": [
                { "frame": { "id": "ads", "name": "ads" } },
                {
                    "frame": { "id": "outer", "name": "outer" },
                    "childFrames": [ { "frame": { "id": "ctx-1", "name": "context" } } ]
                }
            ]
        });
        assert_eq!(find_frame(&tree, "context").as_deref(), Some("ctx-1"));
        assert_eq!(find_frame(&tree, "missing"), None);
    }

    #[test]
    fn selector_is_quoted_into_script() {
        let script = element_box_script(r#"div[data-id="a"]"#);
        assert!(script.contains(r#"document.querySelector("div[data-id=\"a\"]")"#));
    }

    #[test]
    fn device_metrics_defaults_scale_factor() {
        let metrics: DeviceMetrics =
            serde_json::from_value(json!({ "width": 800, "height": 600 })).unwrap();
        assert_eq!(metrics.device_scale_factor, 1.0);
        assert!(!metrics.mobile);
    }

    #[test]
    fn device_metrics_accepts_is_mobile() {
        let metrics: DeviceMetrics = serde_json::from_value(
            json!({ "width": 375, "height": 667, "isMobile": true }),
        )
        .unwrap();
        assert!(metrics.mobile);
        assert_eq!(serde_json::to_value(metrics).unwrap()["mobile"], json!(true));
    }
}
