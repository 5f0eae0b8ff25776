//! BiDi event message types.
//!
//! Events are unsolicited notifications pushed by the remote end for every
//! method the session subscribed to.
//!
//! # Event Types
//!
//! | Module | Events consumed by this crate |
//! |--------|-------------------------------|
//! | `network` | `beforeRequestSent`, `responseStarted`, `authRequired` |
//! | `log` | `entryAdded` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{BrowsingContextId, InterceptId};

use super::command::Header;

// ============================================================================
// Event Names
// ============================================================================

/// `network.beforeRequestSent`
pub const BEFORE_REQUEST_SENT: &str = "network.beforeRequestSent";

/// `network.responseStarted`
pub const RESPONSE_STARTED: &str = "network.responseStarted";

/// `network.authRequired`
pub const AUTH_REQUIRED: &str = "network.authRequired";

/// `log.entryAdded`
pub const LOG_ENTRY_ADDED: &str = "log.entryAdded";

// ============================================================================
// Event
// ============================================================================

/// An event notification from remote end to local end.
///
/// # Format
///
/// ```json
/// {
///   "type": "event",
///   "method": "module.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event name in `module.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Creates an event.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Returns the module name from the method.
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses network event parameters.
    ///
    /// Returns `None` when this is not a network event or the params are
    /// missing required fields.
    #[must_use]
    pub fn network_params(&self) -> Option<NetworkEventParams> {
        if self.module() != "network" {
            return None;
        }
        serde_json::from_value(self.params.clone()).ok()
    }
}

// ============================================================================
// Network Event Params
// ============================================================================

/// Common parameters of `network.*` events.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEventParams {
    /// Browsing context that issued the request.
    #[serde(default)]
    pub context: Option<BrowsingContextId>,

    /// Whether the request is paused waiting for a client decision.
    #[serde(default)]
    pub is_blocked: bool,

    /// Intercepts that matched, in remote-end order.
    #[serde(default)]
    pub intercepts: Vec<InterceptId>,

    /// Request data.
    pub request: RequestData,

    /// Response data (response phases only).
    #[serde(default)]
    pub response: Option<ResponseData>,
}

/// `network.RequestData`
#[derive(Debug, Clone, Deserialize)]
pub struct RequestData {
    /// Remote request identifier.
    pub request: String,

    /// Request URL.
    pub url: String,

    /// HTTP method.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: Vec<Header>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// `network.ResponseData`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    /// Response URL.
    #[serde(default)]
    pub url: String,

    /// HTTP status.
    #[serde(default)]
    pub status: u16,

    /// HTTP status text.
    #[serde(default)]
    pub status_text: String,

    /// Response headers.
    #[serde(default)]
    pub headers: Vec<Header>,
}

// ============================================================================
// Tests
// ============================================================================
