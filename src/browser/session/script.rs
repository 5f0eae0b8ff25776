//! Script execution, input actions, timeouts and screenshots.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde_json::{Value, json};
use tracing::debug;

use crate::driver::SessionTimeouts;
use crate::error::{Error, Result};
use crate::protocol::ClassicCommand;

use super::Session;
use super::core::expect_string;

// ============================================================================
// Session - Script Execution
// ============================================================================

impl Session {
    /// Executes a synchronous function body in the page.
    ///
    /// The script should use `return` to produce a value. Arguments are
    /// available as `arguments[i]`; pass [`Element::reference`] to hand in
    /// elements.
    ///
    /// [`Element::reference`]: crate::Element::reference
    ///
    /// # Example
    ///
    /// ```ignore
    /// let title = session.execute_script("return document.title", vec![]).await?;
    /// ```
    pub async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        debug!(session_id = %self.inner.id, script_len = script.len(), "Executing script");

        self.execute(ClassicCommand::ExecuteScript {
            script: script.to_string(),
            args,
        })
        .await
    }

    /// Executes an asynchronous function body in the page.
    ///
    /// The completion callback is passed as the last argument.
    pub async fn execute_async_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        debug!(session_id = %self.inner.id, script_len = script.len(), "Executing async script");

        self.execute(ClassicCommand::ExecuteAsyncScript {
            script: script.to_string(),
            args,
        })
        .await
    }
}

// ============================================================================
// Session - Input & Timeouts
// ============================================================================

impl Session {
    /// Performs W3C input action sequences.
    ///
    /// `actions` is the array of input sources, e.g.
    /// `[{"type": "key", "id": "kb", "actions": [...]}]`.
    pub async fn perform_actions(&self, actions: Value) -> Result<()> {
        if !actions.is_array() {
            return Err(Error::invalid_argument("actions must be an array of input sources"));
        }

        debug!(session_id = %self.inner.id, "Performing actions");
        self.execute(ClassicCommand::PerformActions { actions }).await?;
        Ok(())
    }

    /// Releases all pressed keys and buttons.
    pub async fn release_actions(&self) -> Result<()> {
        self.execute(ClassicCommand::ReleaseActions).await?;
        Ok(())
    }

    /// Sets session timeouts.
    pub async fn set_timeouts(&self, timeouts: SessionTimeouts) -> Result<()> {
        debug!(session_id = %self.inner.id, ?timeouts, "Setting timeouts");
        self.execute(ClassicCommand::SetTimeouts {
            timeouts: json!(timeouts),
        })
        .await?;
        Ok(())
    }
}

// ============================================================================
// Session - Screenshots
// ============================================================================

impl Session {
    /// Captures the viewport as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the remote end sends invalid base64.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let data = expect_string(self.execute(ClassicCommand::TakeScreenshot).await?)?;

        Base64Standard
            .decode(data.as_bytes())
            .map_err(|e| Error::protocol("unknown error", format!("invalid screenshot data: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::protocol::HttpMethod;
    use crate::transport::fake::{MockTransport, mock_session};

    #[tokio::test]
    async fn test_execute_script() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Post, "/session/s1/execute/sync", json!(3));

        let session = mock_session(&mock, json!({}));
        let value = session
            .execute_script("return arguments[0] + 1", vec![json!(2)])
            .await
            .expect("script");

        assert_eq!(value, json!(3));
        let body = mock.calls()[0].body.clone().expect("body");
        assert_eq!(body["args"], json!([2]));
    }

    #[tokio::test]
    async fn test_execute_async_script() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Post, "/session/s1/execute/async", json!("done"));

        let session = mock_session(&mock, json!({}));
        let value = session
            .execute_async_script("arguments[0]('done')", vec![])
            .await
            .expect("script");
        assert_eq!(value, json!("done"));
    }

    #[tokio::test]
    async fn test_screenshot_decodes() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            HttpMethod::Get,
            "/session/s1/screenshot",
            json!(Base64Standard.encode(b"\x89PNG")),
        );

        let session = mock_session(&mock, json!({}));
        assert_eq!(session.screenshot().await.expect("png"), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_screenshot_bad_base64() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Get, "/session/s1/screenshot", json!("***"));

        let session = mock_session(&mock, json!({}));
        assert!(session.screenshot().await.is_err());
    }

    #[tokio::test]
    async fn test_perform_actions_requires_array() {
        let mock = Arc::new(MockTransport::new());
        let session = mock_session(&mock, json!({}));

        let err = session.perform_actions(json!({})).await.expect_err("object");
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_set_timeouts_body() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Post, "/session/s1/timeouts", Value::Null);

        let session = mock_session(&mock, json!({}));
        session
            .set_timeouts(SessionTimeouts {
                implicit: Some(0),
                page_load: Some(30_000),
                script: None,
            })
            .await
            .expect("timeouts");

        let body = mock.calls()[0].body.clone().expect("body");
        assert_eq!(body, json!({"pageLoad": 30_000, "implicit": 0}));
    }
}
