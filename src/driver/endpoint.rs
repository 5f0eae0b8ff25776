//! WebDriver endpoint address.
//!
//! An endpoint is the HTTP base URL of a running driver process: scheme,
//! host, port and an optional base path such as `/wd/hub`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Environment variable holding the endpoint URL.
pub const ENDPOINT_ENV: &str = "WEBDRIVER_URL";

/// Endpoint used when [`ENDPOINT_ENV`] is unset.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:4444";

// ============================================================================
// Endpoint
// ============================================================================

/// Immutable WebDriver endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Parses an `http(s)://host:port/base` URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] for unparseable URLs, non-HTTP
    /// schemes, missing hosts, or URLs carrying a query or fragment.
    pub fn parse(input: &str) -> Result<Self> {
        let mut url =
            Url::parse(input.trim()).map_err(|e| Error::invalid_endpoint(input, e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_endpoint(
                input,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if url.host_str().is_none() {
            return Err(Error::invalid_endpoint(input, "missing host"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(Error::invalid_endpoint(input, "query and fragment are not allowed"));
        }

        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);

        Ok(Self { url })
    }

    /// Reads [`ENDPOINT_ENV`], falling back to [`DEFAULT_ENDPOINT`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the variable holds a bad URL.
    pub fn from_env() -> Result<Self> {
        match std::env::var(ENDPOINT_ENV) {
            Ok(value) if !value.trim().is_empty() => Self::parse(&value),
            _ => Self::parse(DEFAULT_ENDPOINT),
        }
    }

    /// Returns the scheme (`http` or `https`).
    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Returns the host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Returns the port, defaulting by scheme.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or(80)
    }

    /// Returns the base path without a trailing slash (empty for root).
    #[inline]
    #[must_use]
    pub fn base_path(&self) -> &str {
        self.url.path().trim_end_matches('/')
    }

    /// Returns the base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.url.as_str().trim_end_matches('/').to_string()
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}

// ============================================================================
// Tests
// ============================================================================
