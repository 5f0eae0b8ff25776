//! Typed BiDi command definitions organized by module.
//!
//! Commands follow `module.methodName` format.
//!
//! # Command Modules
//!
//! | Module | Commands |
//! |--------|----------|
//! | `session` | Subscriptions, status |
//! | `browsingContext` | Context tree |
//! | `network` | Intercepts and request resolution |
//! | `storage` | Cookies |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{BrowsingContextId, InterceptId};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All typed protocol commands organized by module.
///
/// This enum wraps module-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Command {
    /// Session module commands.
    Session(SessionCommand),
    /// BrowsingContext module commands.
    BrowsingContext(BrowsingContextCommand),
    /// Network module commands.
    Network(NetworkCommand),
    /// Storage module commands.
    Storage(StorageCommand),
}

impl Command {
    /// Splits the command into its method name and params object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the params fail to serialize.
    pub fn into_parts(self) -> Result<(String, Value)> {
        let mut value = serde_json::to_value(&self)?;
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let params = value
            .get_mut("params")
            .map(Value::take)
            .unwrap_or(Value::Null);
        Ok((method, params))
    }
}

// ============================================================================
// Session Commands
// ============================================================================

/// Session module commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum SessionCommand {
    /// Remote end status.
    #[serde(rename = "session.status")]
    Status {},

    /// Subscribe to events.
    #[serde(rename = "session.subscribe")]
    Subscribe {
        /// Event (or module) names.
        events: Vec<String>,
        /// Restrict delivery to these contexts.
        #[serde(skip_serializing_if = "Option::is_none")]
        contexts: Option<Vec<BrowsingContextId>>,
    },

    /// Unsubscribe from events.
    #[serde(rename = "session.unsubscribe")]
    Unsubscribe {
        /// Event (or module) names.
        events: Vec<String>,
        /// Contexts the subscription was restricted to.
        #[serde(skip_serializing_if = "Option::is_none")]
        contexts: Option<Vec<BrowsingContextId>>,
    },
}

// ============================================================================
// BrowsingContext Commands
// ============================================================================

/// BrowsingContext module commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum BrowsingContextCommand {
    /// Get the tree of browsing contexts.
    #[serde(rename = "browsingContext.getTree")]
    GetTree {
        /// Limit depth (0 = top-level only).
        #[serde(rename = "maxDepth", skip_serializing_if = "Option::is_none")]
        max_depth: Option<u32>,
    },
}

// ============================================================================
// Network Commands
// ============================================================================

/// Network module commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum NetworkCommand {
    /// Register an intercept.
    #[serde(rename = "network.addIntercept")]
    AddIntercept {
        /// Lifecycle phases to block at.
        phases: Vec<InterceptPhase>,
        /// URL patterns; empty matches every request.
        #[serde(rename = "urlPatterns", skip_serializing_if = "Vec::is_empty")]
        url_patterns: Vec<UrlPattern>,
        /// Restrict to these top-level contexts.
        #[serde(skip_serializing_if = "Option::is_none")]
        contexts: Option<Vec<BrowsingContextId>>,
    },

    /// Remove an intercept.
    #[serde(rename = "network.removeIntercept")]
    RemoveIntercept {
        /// Intercept to remove.
        intercept: InterceptId,
    },

    /// Continue a blocked request unmodified.
    #[serde(rename = "network.continueRequest")]
    ContinueRequest {
        /// Remote request ID.
        request: String,
    },

    /// Continue a blocked response unmodified.
    #[serde(rename = "network.continueResponse")]
    ContinueResponse {
        /// Remote request ID.
        request: String,
    },

    /// Resolve a blocked request with a synthetic response.
    #[serde(rename = "network.provideResponse")]
    ProvideResponse {
        /// Remote request ID.
        request: String,
        /// HTTP status code.
        #[serde(rename = "statusCode")]
        status_code: u16,
        /// Reason phrase.
        #[serde(rename = "reasonPhrase", skip_serializing_if = "Option::is_none")]
        reason_phrase: Option<String>,
        /// Response headers.
        headers: Vec<Header>,
        /// Response body.
        body: BytesValue,
    },

    /// Fail a blocked request with a network error.
    #[serde(rename = "network.failRequest")]
    FailRequest {
        /// Remote request ID.
        request: String,
    },

    /// Continue an auth challenge.
    #[serde(rename = "network.continueWithAuth")]
    ContinueWithAuth {
        /// Remote request ID.
        request: String,
        /// `default`, `cancel` or `provideCredentials`.
        action: String,
    },
}

/// Lifecycle phase at which an intercept blocks requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterceptPhase {
    /// Before the request is sent.
    BeforeRequestSent,
    /// After response headers arrive.
    ResponseStarted,
    /// On an HTTP auth challenge.
    AuthRequired,
}

/// `network.UrlPattern`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UrlPattern {
    /// Exact URL match.
    String {
        /// Full URL.
        pattern: String,
    },
    /// Component-wise match; omitted components match anything.
    Pattern {
        /// Scheme without `:`.
        #[serde(skip_serializing_if = "Option::is_none")]
        protocol: Option<String>,
        /// Host name.
        #[serde(skip_serializing_if = "Option::is_none")]
        hostname: Option<String>,
        /// Port.
        #[serde(skip_serializing_if = "Option::is_none")]
        port: Option<String>,
        /// Exact path name.
        #[serde(skip_serializing_if = "Option::is_none")]
        pathname: Option<String>,
        /// Query string without `?`.
        #[serde(skip_serializing_if = "Option::is_none")]
        search: Option<String>,
    },
}

/// `network.Header`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: BytesValue,
}

impl Header {
    /// Creates a header with a UTF-8 value.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: BytesValue::string(value),
        }
    }
}

/// `network.BytesValue`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum BytesValue {
    /// UTF-8 text.
    String(String),
    /// Base64-encoded bytes.
    Base64(String),
}

impl BytesValue {
    /// Creates a UTF-8 value.
    #[inline]
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Returns the text for UTF-8 values.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Base64(_) => None,
        }
    }
}

// ============================================================================
// Storage Commands
// ============================================================================

/// Storage module commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum StorageCommand {
    /// Read cookies.
    #[serde(rename = "storage.getCookies")]
    GetCookies {
        /// Optional filter.
        #[serde(skip_serializing_if = "Option::is_none")]
        filter: Option<CookieFilter>,
        /// Partition to read from.
        #[serde(skip_serializing_if = "Option::is_none")]
        partition: Option<PartitionDescriptor>,
    },

    /// Write one cookie.
    #[serde(rename = "storage.setCookie")]
    SetCookie {
        /// Cookie to write.
        cookie: PartialCookie,
        /// Partition to write into.
        #[serde(skip_serializing_if = "Option::is_none")]
        partition: Option<PartitionDescriptor>,
    },

    /// Delete cookies matching a filter.
    #[serde(rename = "storage.deleteCookies")]
    DeleteCookies {
        /// Optional filter; absent deletes all.
        #[serde(skip_serializing_if = "Option::is_none")]
        filter: Option<CookieFilter>,
        /// Partition to delete from.
        #[serde(skip_serializing_if = "Option::is_none")]
        partition: Option<PartitionDescriptor>,
    },
}

/// `storage.PartitionDescriptor`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PartitionDescriptor {
    /// Partition of a browsing context.
    Context {
        /// Context ID.
        context: BrowsingContextId,
    },
}

/// `storage.CookieFilter` (name-only subset).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieFilter {
    /// Cookie name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `network.Cookie` as returned by `storage.getCookies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCookie {
    /// Name.
    pub name: String,
    /// Value.
    pub value: BytesValue,
    /// Domain.
    pub domain: String,
    /// Path.
    #[serde(default = "default_path")]
    pub path: String,
    /// HttpOnly flag.
    #[serde(default)]
    pub http_only: bool,
    /// Secure flag.
    #[serde(default)]
    pub secure: bool,
    /// SameSite policy (`strict`, `lax`, `none`, `default`).
    #[serde(default)]
    pub same_site: Option<String>,
    /// Expiry, seconds since epoch.
    #[serde(default)]
    pub expiry: Option<u64>,
}

/// `storage.PartialCookie` for `storage.setCookie`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialCookie {
    /// Name.
    pub name: String,
    /// Value.
    pub value: BytesValue,
    /// Domain.
    pub domain: String,
    /// Path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// HttpOnly flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    /// Secure flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    /// SameSite policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    /// Expiry, seconds since epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

fn default_path() -> String {
    "/".to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_into_parts() {
        let command = Command::Session(SessionCommand::Subscribe {
            events: vec!["log.entryAdded".into()],
            contexts: None,
        });

        let (method, params) = command.into_parts().expect("parts");
        assert_eq!(method, "session.subscribe");
        assert_eq!(params, json!({ "events": ["log.entryAdded"] }));
    }

    #[test]
    fn test_status_params_are_empty_object() {
        let (method, params) = Command::Session(SessionCommand::Status {})
            .into_parts()
            .expect("parts");
        assert_eq!(method, "session.status");
        assert_eq!(params, json!({}));
    }

    #[test]
    fn test_add_intercept_serialization() {
        let command = Command::Network(NetworkCommand::AddIntercept {
            phases: vec![InterceptPhase::BeforeRequestSent],
            url_patterns: vec![UrlPattern::Pattern {
                protocol: None,
                hostname: None,
                port: None,
                pathname: Some("/api/users".into()),
                search: None,
            }],
            contexts: None,
        });

        let (_, params) = command.into_parts().expect("parts");
        assert_eq!(
            params,
            json!({
                "phases": ["beforeRequestSent"],
                "urlPatterns": [{ "type": "pattern", "pathname": "/api/users" }]
            })
        );
    }

    #[test]
    fn test_provide_response_serialization() {
        let command = Command::Network(NetworkCommand::ProvideResponse {
            request: "r1".into(),
            status_code: 200,
            reason_phrase: None,
            headers: vec![Header::new("content-type", "text/plain")],
            body: BytesValue::Base64("aGk=".into()),
        });

        let (method, params) = command.into_parts().expect("parts");
        assert_eq!(method, "network.provideResponse");
        assert_eq!(params["statusCode"], 200);
        assert_eq!(params["body"], json!({ "type": "base64", "value": "aGk=" }));
        assert_eq!(
            params["headers"][0],
            json!({ "name": "content-type", "value": { "type": "string", "value": "text/plain" } })
        );
    }

    #[test]
    fn test_wire_cookie_deserialize_defaults() {
        let cookie: WireCookie = serde_json::from_value(json!({
            "name": "sid",
            "value": { "type": "string", "value": "abc" },
            "domain": "example.com",
            "size": 6
        }))
        .expect("cookie");

        assert_eq!(cookie.path, "/");
        assert!(!cookie.secure);
        assert_eq!(cookie.value.as_text(), Some("abc"));
    }

    #[test]
    fn test_partition_descriptor() {
        let partition = PartitionDescriptor::Context {
            context: BrowsingContextId::new("ctx"),
        };
        assert_eq!(
            serde_json::to_value(partition).expect("serialize"),
            json!({ "type": "context", "context": "ctx" })
        );
    }
}
