//! WebDriver endpoint client and session factory.
//!
//! The [`Driver`] holds the HTTP transport for one endpoint and performs
//! the session-creation handshake.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use webdriver_wire::{Capabilities, Driver};
//!
//! # async fn example() -> webdriver_wire::Result<()> {
//! let driver = Driver::builder()
//!     .endpoint("http://127.0.0.1:4444")
//!     .capabilities(Capabilities::firefox().with_bidi())
//!     .build()?;
//!
//! driver.wait_until_ready(Duration::from_secs(10)).await?;
//! let session = driver.new_session().await?;
//! session.goto("https://example.com").await?;
//! session.delete().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::browser::session::{Session, SessionConfig};
use crate::browser::wait::{Wait, WaitOptions};
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::ClassicCommand;
use crate::transport::HttpTransport;

use super::builder::DriverBuilder;
use super::capabilities::Capabilities;
use super::endpoint::Endpoint;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the driver.
pub(crate) struct DriverInner {
    /// Endpoint every request targets.
    pub endpoint: Endpoint,

    /// Classic transport.
    pub transport: Arc<dyn HttpTransport>,

    /// Default capabilities for [`Driver::new_session`].
    pub capabilities: Capabilities,

    /// Settings handed to each new session.
    pub config: SessionConfig,
}

/// Readiness report from `GET /status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DriverStatus {
    /// Whether the remote end accepts new sessions.
    #[serde(default)]
    pub ready: bool,
    /// Implementation-defined message.
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Driver
// ============================================================================

/// WebDriver endpoint client.
///
/// Cheap to clone; all clones share one transport.
#[derive(Clone)]
pub struct Driver {
    /// Shared inner state.
    pub(crate) inner: Arc<DriverInner>,
}

// ============================================================================
// Driver - Display
// ============================================================================

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("endpoint", &self.inner.endpoint)
            .field("capabilities", &self.inner.capabilities)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Driver - Constructors
// ============================================================================

impl Driver {
    /// Creates a configuration builder for the driver.
    #[inline]
    #[must_use]
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    /// Builds a driver for the endpoint in `WEBDRIVER_URL`.
    ///
    /// # Errors
    ///
    /// See [`DriverBuilder::build`].
    pub fn from_env() -> Result<Self> {
        DriverBuilder::new().build()
    }

    /// Creates a driver over a caller-supplied transport.
    ///
    /// Used to plug in proxies, recorders or in-memory fakes.
    #[must_use]
    pub fn with_transport(endpoint: Endpoint, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(
            endpoint,
            transport,
            Capabilities::default(),
            SessionConfig::default(),
        )
    }

    pub(crate) fn new(
        endpoint: Endpoint,
        transport: Arc<dyn HttpTransport>,
        capabilities: Capabilities,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(DriverInner {
                endpoint,
                transport,
                capabilities,
                config,
            }),
        }
    }
}

// ============================================================================
// Driver - Accessors
// ============================================================================

impl Driver {
    /// Returns the endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// Returns the default capabilities.
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.inner.capabilities
    }
}

// ============================================================================
// Driver - Readiness
// ============================================================================

impl Driver {
    /// Queries `GET /status`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the endpoint is unreachable.
    pub async fn status(&self) -> Result<DriverStatus> {
        let value = self.execute(ClassicCommand::Status).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Polls [`Driver::status`] until the remote end reports ready.
    ///
    /// Refused connections count as "not yet": the driver process may
    /// still be starting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the endpoint is not ready in time.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<DriverStatus> {
        let wait = Wait::new(WaitOptions::with_timeout(timeout).message("driver ready"));

        let status = wait
            .until(self, |driver| async move {
                match driver.status().await {
                    Ok(status) if status.ready => Ok(Some(status)),
                    Ok(_) => Ok(None),
                    Err(e) if e.is_transport_error() => {
                        debug!(error = %e, "Driver not reachable yet");
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;

        info!(endpoint = %self.inner.endpoint, "Driver ready");
        Ok(status)
    }
}

// ============================================================================
// Driver - Sessions
// ============================================================================

impl Driver {
    /// Creates a session with the driver's default capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the remote end refuses the session.
    pub async fn new_session(&self) -> Result<Session> {
        self.new_session_with(&self.inner.capabilities).await
    }

    /// Creates a session with explicit capabilities.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the capabilities are inconsistent
    /// - [`Error::Protocol`] if the remote end refuses the session
    pub async fn new_session_with(&self, capabilities: &Capabilities) -> Result<Session> {
        capabilities.validate()?;

        let value = self
            .execute(ClassicCommand::NewSession {
                capabilities: capabilities.to_request(),
            })
            .await?;

        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .map(SessionId::new)
            .ok_or_else(|| Error::protocol("session not created", "response has no sessionId"))?;
        let negotiated = value.get("capabilities").cloned().unwrap_or(Value::Null);

        info!(session_id = %id, endpoint = %self.inner.endpoint, "Session created");

        Ok(Session::new(
            id,
            self.inner.endpoint.clone(),
            Arc::clone(&self.inner.transport),
            negotiated,
            self.inner.config.clone(),
        ))
    }

    async fn execute(&self, command: ClassicCommand) -> Result<Value> {
        let route = command.route(&SessionId::new(""));
        self.inner
            .transport
            .execute(route.method, &route.path, route.body)
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
