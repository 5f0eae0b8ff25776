//! Core Session struct and accessors.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, trace};

use crate::browser::logs::{LogMonitor, LogMonitorOptions};
use crate::browser::network::Network;
use crate::browser::storage::StateManager;
use crate::browser::wait::WaitOptions;
use crate::driver::Endpoint;
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::ClassicCommand;
use crate::transport::{BidiConnection, BidiOptions, HttpTransport};

// ============================================================================
// Types
// ============================================================================

/// Per-session settings inherited from the driver.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// BiDi connection tuning.
    pub bidi: BidiOptions,
    /// Default wait for auto-waiting actions.
    pub wait: WaitOptions,
    /// Log monitor settings.
    pub logs: LogMonitorOptions,
}

/// Internal shared state for a session.
pub(crate) struct SessionInner {
    /// Server-assigned ID.
    pub id: SessionId,
    /// Endpoint the session was created against.
    pub endpoint: Endpoint,
    /// Classic transport.
    pub transport: Arc<dyn HttpTransport>,
    /// Negotiated capabilities.
    pub capabilities: Value,
    /// Settings.
    pub config: SessionConfig,
    /// Lazily opened BiDi connection.
    pub bidi: OnceCell<BidiConnection>,
    /// Lazily attached interception pipeline.
    pub network: OnceCell<Network>,
    /// Lazily started log monitor.
    pub logs: OnceCell<LogMonitor>,
}

// ============================================================================
// Session
// ============================================================================

/// A handle to a WebDriver session.
///
/// Cheap to clone. Handles stay usable until [`Session::delete`]; after that
/// every call fails with the remote end's `invalid session id` error.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("endpoint", &self.inner.endpoint)
            .field("bidi", &self.inner.bidi.initialized())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a new session handle.
    pub(crate) fn new(
        id: SessionId,
        endpoint: Endpoint,
        transport: Arc<dyn HttpTransport>,
        capabilities: Value,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                endpoint,
                transport,
                capabilities,
                config,
                bidi: OnceCell::new(),
                network: OnceCell::new(),
                logs: OnceCell::new(),
            }),
        }
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl Session {
    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.inner.id
    }

    /// Returns the endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// Returns the capabilities negotiated at creation.
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Value {
        &self.inner.capabilities
    }

    /// Returns the BiDi WebSocket URL, if the remote end provided one.
    #[inline]
    #[must_use]
    pub fn web_socket_url(&self) -> Option<&str> {
        self.inner
            .capabilities
            .get("webSocketUrl")
            .and_then(Value::as_str)
    }

    /// Returns the default wait options for auto-waiting actions.
    #[inline]
    #[must_use]
    pub fn wait_options(&self) -> &WaitOptions {
        &self.inner.config.wait
    }
}

// ============================================================================
// Session - BiDi
// ============================================================================

impl Session {
    /// Returns the BiDi connection, opening it on first use.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the session was created without `webSocketUrl`
    /// - a connection error if the handshake fails
    pub async fn bidi(&self) -> Result<BidiConnection> {
        let url = self
            .web_socket_url()
            .ok_or_else(|| {
                Error::config(
                    "Session has no webSocketUrl. Request one with Capabilities::with_bidi()",
                )
            })?
            .to_string();
        let options = self.inner.config.bidi.clone();

        let connection = self
            .inner
            .bidi
            .get_or_try_init(|| async move {
                debug!(session_id = %self.inner.id, url = %url, "Opening BiDi connection");
                BidiConnection::connect(url, options).await
            })
            .await?;

        Ok(connection.clone())
    }

    /// Returns the BiDi connection if one is open and connected.
    #[must_use]
    pub fn active_bidi(&self) -> Option<BidiConnection> {
        self.inner
            .bidi
            .get()
            .filter(|connection| connection.is_connected())
            .cloned()
    }

    /// Returns the network interception pipeline, attaching it on first use.
    ///
    /// # Errors
    ///
    /// See [`Session::bidi`].
    pub async fn network(&self) -> Result<Network> {
        let network = self
            .inner
            .network
            .get_or_try_init(|| async {
                let bidi = self.bidi().await?;
                Network::attach(bidi).await
            })
            .await?;

        Ok(network.clone())
    }

    /// Returns the log monitor, starting it on first use.
    ///
    /// # Errors
    ///
    /// See [`Session::bidi`].
    pub async fn logs(&self) -> Result<LogMonitor> {
        let logs = self
            .inner
            .logs
            .get_or_try_init(|| async {
                let bidi = self.bidi().await?;
                LogMonitor::start(bidi, self.inner.config.logs.clone()).await
            })
            .await?;

        Ok(logs.clone())
    }

    /// Returns the session state manager.
    #[inline]
    #[must_use]
    pub fn storage(&self) -> StateManager {
        StateManager::new(self.clone())
    }
}

// ============================================================================
// Session - Lifecycle
// ============================================================================

impl Session {
    /// Deletes the session on the remote end.
    ///
    /// Closes the BiDi connection first, if one was opened.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote end rejects the deletion.
    pub async fn delete(&self) -> Result<()> {
        if let Some(bidi) = self.inner.bidi.get() {
            bidi.close().await;
        }

        self.execute(ClassicCommand::DeleteSession).await?;
        info!(session_id = %self.inner.id, "Session deleted");
        Ok(())
    }
}

// ============================================================================
// Session - Internal
// ============================================================================

impl Session {
    /// Routes a Classic command through the transport.
    pub(crate) async fn execute(&self, command: ClassicCommand) -> Result<Value> {
        let route = command.route(&self.inner.id);
        trace!(
            session_id = %self.inner.id,
            method = route.method.as_str(),
            path = %route.path,
            "Classic command"
        );

        self.inner
            .transport
            .execute(route.method, &route.path, route.body)
            .await
    }
}

/// Reads a string result.
pub(crate) fn expect_string(value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(Error::protocol(
            "unknown error",
            format!("expected a string, got {other}"),
        )),
    }
}

/// Reads a boolean result.
pub(crate) fn expect_bool(value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| {
        Error::protocol("unknown error", format!("expected a boolean, got {value}"))
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::protocol::HttpMethod;
    use crate::transport::fake::{MockTransport, mock_session};

    #[tokio::test]
    async fn test_delete() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Delete, "/session/s1", Value::Null);

        let session = mock_session(&mock, json!({}));
        session.delete().await.expect("delete");

        assert_eq!(mock.calls_to(HttpMethod::Delete, "/session/s1").len(), 1);
    }

    #[tokio::test]
    async fn test_bidi_requires_web_socket_url() {
        let mock = Arc::new(MockTransport::new());
        let session = mock_session(&mock, json!({"browserName": "firefox"}));

        assert!(session.web_socket_url().is_none());
        let err = session.bidi().await.expect_err("no url");
        assert!(matches!(err, Error::Config { .. }));
        assert!(session.active_bidi().is_none());
    }

    #[test]
    fn test_expect_helpers() {
        assert_eq!(expect_string(json!("x")).expect("string"), "x");
        assert!(expect_string(json!(1)).is_err());
        assert!(expect_bool(&json!(true)).expect("bool"));
        assert!(expect_bool(&Value::Null).is_err());
    }
}
