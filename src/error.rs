//! Error types for the WebDriver client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webdriver_wire::{By, Result};
//!
//! async fn example(session: &Session) -> Result<()> {
//!     let element = session.find_element(&By::id("submit")).await?;
//!     element.click().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidEndpoint`] |
//! | Transport | [`Error::Http`], [`Error::Json`], [`Error::WebSocket`], [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::Bidi`] |
//! | Timeout | [`Error::Timeout`], [`Error::RequestTimeout`] |
//! | Contract | [`Error::UnexpectedTagName`], [`Error::InvalidArgument`] |
//! | Handler | [`Error::Handler`] |
//! | External | [`Error::Io`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CommandId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

/// Boxed error returned by user-supplied handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============================================================================
// Remote Error Codes
// ============================================================================

/// W3C error code for a locator that matched nothing.
pub const NO_SUCH_ELEMENT: &str = "no such element";

/// W3C error code for a detached element reference.
pub const STALE_ELEMENT_REFERENCE: &str = "stale element reference";

/// W3C error code for a syntactically invalid selector.
pub const INVALID_SELECTOR: &str = "invalid selector";

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when driver configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Endpoint URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid endpoint '{url}': {message}")]
    InvalidEndpoint {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// HTTP request failed below the protocol layer.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket connection failed.
    ///
    /// Returned when the BiDi socket cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection handshake did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed while commands were pending.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Classic protocol error envelope from the remote end.
    ///
    /// `code` is the W3C error code, e.g. `no such element`.
    #[error("Protocol error ({code}): {message}")]
    Protocol {
        /// Remote error code.
        code: String,
        /// Remote error message.
        message: String,
    },

    /// BiDi error response.
    #[error("BiDi command {method} failed ({code}): {message}")]
    Bidi {
        /// Method of the failed command.
        method: String,
        /// Remote error code.
        code: String,
        /// Remote error message.
        message: String,
    },

    // ========================================================================
    // Timeout Errors
    // ========================================================================
    /// Wait deadline exceeded.
    ///
    /// `last_error` carries the error raised by the final attempt, if any.
    #[error("Timeout after {timeout_ms}ms: {operation}{}", last_error_suffix(.last_error))]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
        /// Message of the last error observed before the deadline.
        last_error: Option<String>,
    },

    /// BiDi command timed out.
    #[error("Command {command_id} ({method}) timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The command ID that timed out.
        command_id: CommandId,
        /// Method of the command.
        method: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Contract Violations
    // ========================================================================
    /// Operation is not valid for this element's tag.
    #[error("Expected <{expected}> element, found <{actual}>")]
    UnexpectedTagName {
        /// Tag the operation requires.
        expected: String,
        /// Tag the element actually has.
        actual: String,
    },

    /// Invalid argument supplied by the caller.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Handler Errors
    // ========================================================================
    /// Error raised inside a user-supplied handler.
    #[error("Handler error: {0}")]
    Handler(BoxError),

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error or malformed response body.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

/// Formats the optional last-error suffix of [`Error::Timeout`].
fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(message) => format!(" (last error: {message})"),
        None => String::new(),
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid endpoint error.
    #[inline]
    pub fn invalid_endpoint(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a Classic protocol error.
    #[inline]
    pub fn protocol(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a BiDi error.
    #[inline]
    pub fn bidi(
        method: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Bidi {
            method: method.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a wait timeout error.
    #[inline]
    pub fn timeout(
        operation: impl Into<String>,
        timeout_ms: u64,
        last_error: Option<String>,
    ) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
            last_error,
        }
    }

    /// Creates a BiDi command timeout error.
    #[inline]
    pub fn request_timeout(command_id: CommandId, method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            command_id,
            method: method.into(),
            timeout_ms,
        }
    }

    /// Creates an unexpected tag name error.
    #[inline]
    pub fn unexpected_tag_name(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::UnexpectedTagName {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Wraps a user handler error.
    #[inline]
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns the remote error code for protocol errors.
    #[inline]
    #[must_use]
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            Self::Protocol { code, .. } | Self::Bidi { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::Timeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if the remote end reported a missing or stale element.
    #[inline]
    #[must_use]
    pub fn is_element_error(&self) -> bool {
        matches!(
            self.remote_code(),
            Some(NO_SUCH_ELEMENT | STALE_ELEMENT_REFERENCE)
        )
    }

    /// Returns `true` if this is a stale element error.
    #[inline]
    #[must_use]
    pub fn is_stale_element(&self) -> bool {
        self.remote_code() == Some(STALE_ELEMENT_REFERENCE)
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` for transport-level failures.
    ///
    /// These are never retried: the wait engine surfaces them immediately
    /// instead of treating them as an unsatisfied condition.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Json(_) | Self::Io(_)) || self.is_connection_error()
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::Timeout { .. }
                | Self::RequestTimeout { .. }
                | Self::Protocol { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
