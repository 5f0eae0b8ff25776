//! BiDi command and response message types.
//!
//! # Format
//!
//! Command (local → remote):
//! ```json
//! { "id": 7, "method": "session.subscribe", "params": { ... } }
//! ```
//!
//! Success response (remote → local):
//! ```json
//! { "id": 7, "type": "success", "result": { ... } }
//! ```
//!
//! Error response (remote → local):
//! ```json
//! { "id": 7, "type": "error", "error": "invalid argument", "message": "..." }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

use super::event::Event;

// ============================================================================
// Request
// ============================================================================

/// A command request from local end to remote end.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Monotonic identifier for request/response correlation.
    pub id: CommandId,

    /// Command name in `module.methodName` format.
    pub method: String,

    /// Command parameters (always an object on the wire).
    pub params: Value,
}

impl Request {
    /// Creates a new request.
    #[inline]
    #[must_use]
    pub fn new(id: CommandId, method: impl Into<String>, params: Value) -> Self {
        let params = if params.is_null() {
            Value::Object(Default::default())
        } else {
            params
        };

        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from remote end to local end.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the command `id`. Absent for errors not tied to a command.
    #[serde(default)]
    pub id: Option<CommandId>,

    /// Response type.
    #[serde(rename = "type")]
    pub response_type: ResponseType,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error code (if error).
    #[serde(default)]
    pub error: Option<String>,

    /// Error message (if error).
    #[serde(default)]
    pub message: Option<String>,

    /// Remote stack trace (if error).
    #[serde(default)]
    pub stacktrace: Option<String>,
}

impl Response {
    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_type == ResponseType::Success
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.response_type == ResponseType::Error
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bidi`] embedding the remote error code and message.
    pub fn into_result(self, method: &str) -> Result<Value> {
        match self.response_type {
            ResponseType::Success => Ok(self.result.unwrap_or(Value::Null)),
            ResponseType::Error => {
                let code = self.error.unwrap_or_else(|| "unknown error".to_string());
                let message = self.message.unwrap_or_else(|| code.clone());
                Err(Error::bidi(method, code, message))
            }
        }
    }
}

// ============================================================================
// ResponseType
// ============================================================================

/// Response type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Successful response.
    Success,
    /// Error response.
    Error,
}

// ============================================================================
// Inbound
// ============================================================================

/// Classified inbound message.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Response to a command.
    Response(Response),
    /// Unsolicited event.
    Event(Event),
}

impl Inbound {
    /// Classifies a raw text frame.
    ///
    /// Messages tagged `"type": "event"` are events; anything carrying an
    /// `id` (or tagged `success`/`error`) is a response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for malformed frames and [`Error::Connection`]
    /// for well-formed JSON that is neither a response nor an event.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let message_type = value.get("type").and_then(Value::as_str);

        match message_type {
            Some("event") => Ok(Self::Event(serde_json::from_value(value)?)),
            Some("success") | Some("error") => Ok(Self::Response(serde_json::from_value(value)?)),
            _ if value.get("id").is_some() => {
                let response_type = if value.get("error").is_some() {
                    ResponseType::Error
                } else {
                    ResponseType::Success
                };
                let id = value.get("id").and_then(Value::as_u64).map(CommandId::from_raw);
                Ok(Self::Response(Response {
                    id,
                    response_type,
                    result: value.get("result").cloned(),
                    error: value.get("error").and_then(Value::as_str).map(str::to_string),
                    message: value.get("message").and_then(Value::as_str).map(str::to_string),
                    stacktrace: None,
                }))
            }
            _ if value.get("method").is_some() => Ok(Self::Event(serde_json::from_value(value)?)),
            _ => Err(Error::connection(format!(
                "Unrecognised BiDi message: {}",
                truncate(text, 200)
            ))),
        }
    }
}

/// Truncates a string for log output on a char boundary.
fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ============================================================================
// Tests
// ============================================================================
