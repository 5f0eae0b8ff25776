//! Builder pattern for driver configuration.
//!
//! Provides a fluent API for configuring and creating [`Driver`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use webdriver_wire::{Capabilities, Driver};
//!
//! # fn example() -> webdriver_wire::Result<()> {
//! let driver = Driver::builder()
//!     .endpoint("http://127.0.0.1:4444")
//!     .capabilities(Capabilities::firefox().with_bidi())
//!     .request_timeout(Duration::from_secs(60))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::browser::logs::LogMonitorOptions;
use crate::browser::session::SessionConfig;
use crate::browser::wait::WaitOptions;
use crate::error::Result;
use crate::transport::{BidiOptions, HttpClient};

use super::capabilities::Capabilities;
use super::core::Driver;
use super::endpoint::Endpoint;

// ============================================================================
// DriverBuilder
// ============================================================================

/// Builder for configuring a [`Driver`] instance.
///
/// Use [`Driver::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct DriverBuilder {
    /// Endpoint URL; [`Endpoint::from_env`] when unset.
    endpoint: Option<String>,
    /// Capabilities requested by [`Driver::new_session`].
    capabilities: Capabilities,
    /// Whole-request timeout for the HTTP client.
    request_timeout: Option<Duration>,
    /// Per-session settings.
    config: SessionConfig,
}

// ============================================================================
// DriverBuilder Implementation
// ============================================================================

impl DriverBuilder {
    /// Creates a new driver builder with default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the driver endpoint URL.
    ///
    /// # Arguments
    ///
    /// * `url` - Base URL such as `http://127.0.0.1:4444` or `http://grid:4444/wd/hub`
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Sets the default session capabilities.
    #[inline]
    #[must_use]
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Bounds each HTTP request. Unbounded by default.
    #[inline]
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets BiDi connection options for sessions created by this driver.
    #[inline]
    #[must_use]
    pub fn bidi_options(mut self, options: BidiOptions) -> Self {
        self.config.bidi = options;
        self
    }

    /// Sets the default wait used by auto-waiting actions.
    #[inline]
    #[must_use]
    pub fn wait_options(mut self, options: WaitOptions) -> Self {
        self.config.wait = options;
        self
    }

    /// Sets log monitor options.
    #[inline]
    #[must_use]
    pub fn log_options(mut self, options: LogMonitorOptions) -> Self {
        self.config.logs = options;
        self
    }

    /// Builds the driver with validation.
    ///
    /// No network traffic happens here; use [`Driver::wait_until_ready`]
    /// to probe the endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEndpoint`](crate::Error::InvalidEndpoint) if the endpoint URL is bad
    /// - [`Error::Config`](crate::Error::Config) if the capabilities are inconsistent
    /// - [`Error::Http`](crate::Error::Http) if the HTTP client cannot be created
    pub fn build(self) -> Result<Driver> {
        let endpoint = match &self.endpoint {
            Some(url) => Endpoint::parse(url)?,
            None => Endpoint::from_env()?,
        };
        self.capabilities.validate()?;

        let client = HttpClient::new(endpoint.base_url(), self.request_timeout)?;

        Ok(Driver::new(
            endpoint,
            Arc::new(client),
            self.capabilities,
            self.config,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::capabilities::BrowserOptions;
    use crate::error::Error;

    #[test]
    fn test_new_creates_default_builder() {
        let builder = DriverBuilder::new();
        assert!(builder.endpoint.is_none());
        assert!(builder.request_timeout.is_none());
        assert_eq!(builder.capabilities, Capabilities::default());
    }

    #[test]
    fn test_setters() {
        let builder = DriverBuilder::new()
            .endpoint("http://localhost:9515")
            .request_timeout(Duration::from_secs(3))
            .wait_options(WaitOptions::with_timeout(Duration::from_secs(1)))
            .log_options(LogMonitorOptions { capacity: 10 });

        assert_eq!(builder.endpoint.as_deref(), Some("http://localhost:9515"));
        assert_eq!(builder.request_timeout, Some(Duration::from_secs(3)));
        assert_eq!(builder.config.wait.timeout, Duration::from_secs(1));
        assert_eq!(builder.config.logs.capacity, 10);
    }

    #[test]
    fn test_build_with_endpoint() {
        let driver = DriverBuilder::new()
            .endpoint("http://127.0.0.1:9515/")
            .build()
            .expect("build");
        assert_eq!(driver.endpoint().base_url(), "http://127.0.0.1:9515");
    }

    #[test]
    fn test_build_fails_with_bad_endpoint() {
        let err = DriverBuilder::new()
            .endpoint("ftp://127.0.0.1")
            .build()
            .expect_err("bad scheme");
        assert!(matches!(err, Error::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_build_fails_with_conflicting_capabilities() {
        let mut caps = Capabilities::new().with_browser_options(BrowserOptions::chrome());
        caps.browser_name = Some("firefox".to_string());

        let err = DriverBuilder::new()
            .endpoint("http://127.0.0.1:4444")
            .capabilities(caps)
            .build()
            .expect_err("conflict");
        assert!(matches!(err, Error::Config { .. }));
    }
}
