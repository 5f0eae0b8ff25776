//! Classic WebDriver HTTP transport.
//!
//! Performs exactly one request/response cycle per call and decodes the
//! WebDriver JSON envelope. Retry and timeout policy live in the wait engine.
//!
//! # Envelope
//!
//! | Body | Result |
//! |------|--------|
//! | `{"value": {"error": code, "message": m}}` | [`Error::Protocol`] |
//! | `{"value": v}` | `v` |
//! | any other JSON | the whole body |
//! | empty body | `null` |
//! | malformed JSON | [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::HttpMethod;

// ============================================================================
// HttpTransport
// ============================================================================

/// One HTTP call against a WebDriver endpoint.
///
/// Implemented by [`HttpClient`] for real endpoints and by in-memory fakes
/// in tests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Executes `method path` with an optional JSON body and returns the
    /// decoded envelope value.
    ///
    /// # Errors
    ///
    /// - [`Error::Http`] on socket or HTTP-level failure
    /// - [`Error::Json`] if the body is not valid JSON
    /// - [`Error::Protocol`] if the remote end returned an error envelope
    async fn execute(&self, method: HttpMethod, path: &str, body: Option<Value>) -> Result<Value>;
}

// ============================================================================
// HttpClient
// ============================================================================

/// `reqwest`-backed transport bound to an endpoint base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base: String,
}

impl HttpClient {
    /// Creates a client for `base` (scheme, host, port and base path).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the underlying client cannot be built.
    pub fn new(base: impl Into<String>, request_timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = request_timeout {
            builder = builder.timeout(t);
        }

        let base = base.into().trim_end_matches('/').to_string();
        Ok(Self {
            client: builder.build()?,
            base,
        })
    }

    /// Returns the base URL.
    #[inline]
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn execute(&self, method: HttpMethod, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base, path);
        debug!(%method, %url, "WebDriver request");

        let request = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self
                .client
                .post(&url)
                .json(&body.unwrap_or_else(|| Value::Object(Default::default()))),
            HttpMethod::Delete => self.client.delete(&url),
        };

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        trace!(status = status.as_u16(), len = text.len(), "WebDriver response");

        decode_envelope(&text)
    }
}

// ============================================================================
// Envelope Decoding
// ============================================================================

/// Decodes a WebDriver response body.
///
/// # Errors
///
/// - [`Error::Json`] for a malformed body
/// - [`Error::Protocol`] for an error envelope
pub fn decode_envelope(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    let body: Value = serde_json::from_str(text)?;

    let Value::Object(mut map) = body else {
        return Ok(body);
    };

    let Some(value) = map.remove("value") else {
        return Ok(Value::Object(map));
    };

    if let Some(code) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(code)
            .to_string();
        return Err(Error::protocol(code, message));
    }

    Ok(value)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwraps_value() {
        let value = decode_envelope(r#"{"value": {"ready": true}}"#).expect("decode");
        assert_eq!(value, json!({ "ready": true }));
    }

    #[test]
    fn test_null_value() {
        let value = decode_envelope(r#"{"value": null}"#).expect("decode");
        assert!(value.is_null());
    }

    #[test]
    fn test_body_without_wrapper_is_returned_whole() {
        let value = decode_envelope(r#"{"sessionId": "s1", "status": 0}"#).expect("decode");
        assert_eq!(value["sessionId"], "s1");
    }

    #[test]
    fn test_error_envelope() {
        let err = decode_envelope(
            r#"{"value": {"error": "no such element", "message": "Unable to locate", "stacktrace": ""}}"#,
        )
        .expect_err("error envelope");

        assert!(err.is_element_error());
        assert!(err.to_string().contains("Unable to locate"));
        assert!(!err.is_transport_error());
    }

    #[test]
    fn test_malformed_json_is_transport_error() {
        let err = decode_envelope("<html>502</html>").expect_err("malformed");
        assert!(matches!(err, Error::Json(_)));
        assert!(err.is_transport_error());
    }

    #[test]
    fn test_empty_body() {
        assert!(decode_envelope("").expect("decode").is_null());
    }

    #[test]
    fn test_base_trailing_slash_trimmed() {
        let client = HttpClient::new("http://127.0.0.1:4444/wd/hub/", None).expect("client");
        assert_eq!(client.base(), "http://127.0.0.1:4444/wd/hub");
    }
}
