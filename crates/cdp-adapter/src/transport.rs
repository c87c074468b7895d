use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AdapterError, AdapterErrorKind};

/// Addressee of a CDP command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandTarget {
    Browser,
    Session(String),
}

/// Raw command channel to a browser.
///
/// The snapshot engine never launches a browser itself; the hosting harness owns the
/// connection and hands an implementation of this trait to `PageCommands`.
#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError>;
}

#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl CdpTransport for NoopTransport {
    async fn send_command(
        &self,
        _target: CommandTarget,
        method: &str,
        _params: Value,
    ) -> Result<Value, AdapterError> {
        Err(AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(format!("transport not available for method {method}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn noop_transport_rejects_every_command() {
        let err = NoopTransport
            .send_command(CommandTarget::Browser, "Page.captureScreenshot", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::CdpIo);
        assert!(err.hint.unwrap().contains("Page.captureScreenshot"));
    }
}
