//! Classic cookie endpoints and the shared cookie record.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::Result;
use crate::protocol::ClassicCommand;

use super::Session;

// ============================================================================
// Types
// ============================================================================

/// Cookie `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// `Strict`
    #[serde(alias = "strict")]
    Strict,
    /// `Lax`
    #[serde(alias = "lax")]
    Lax,
    /// `None`
    #[serde(alias = "none")]
    None,
}

impl SameSite {
    /// Lowercase form used by BiDi storage commands.
    #[inline]
    #[must_use]
    pub fn bidi_name(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lax => "lax",
            Self::None => "none",
        }
    }

    /// Parses either the Classic or the BiDi spelling.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// A browser cookie.
///
/// Serialized in the Classic wire shape, which is also the snapshot file
/// shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Name.
    pub name: String,
    /// Value.
    pub value: String,
    /// Domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Sent over HTTPS only.
    #[serde(default)]
    pub secure: bool,
    /// Hidden from scripts.
    #[serde(default)]
    pub http_only: bool,
    /// Expiry in seconds since the epoch; session cookie when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    /// `SameSite` policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

impl Cookie {
    /// Creates a session cookie for the current document's domain.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            expiry: None,
            same_site: None,
        }
    }

    /// Sets the domain.
    #[inline]
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Marks the cookie secure.
    #[inline]
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Marks the cookie HTTP-only.
    #[inline]
    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Sets the expiry.
    #[inline]
    #[must_use]
    pub fn with_expiry(mut self, expiry: u64) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Sets the `SameSite` policy.
    #[inline]
    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Returns `(name, value, domain, path)` for identity comparisons.
    #[must_use]
    pub fn key(&self) -> (&str, &str, Option<&str>, &str) {
        (
            &self.name,
            &self.value,
            self.domain.as_deref(),
            self.path.as_deref().unwrap_or("/"),
        )
    }
}

// ============================================================================
// Session - Cookies
// ============================================================================

impl Session {
    /// Returns all cookies visible to the current document.
    pub async fn get_cookies(&self) -> Result<Vec<Cookie>> {
        let value = self.execute(ClassicCommand::GetAllCookies).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Adds a cookie to the current document's domain.
    pub async fn add_cookie(&self, cookie: &Cookie) -> Result<()> {
        debug!(session_id = %self.inner.id, name = %cookie.name, "Adding cookie");
        self.execute(ClassicCommand::AddCookie {
            cookie: json!(cookie),
        })
        .await?;
        Ok(())
    }

    /// Deletes one cookie by name, or all cookies when `name` is `None`.
    pub async fn delete_cookies(&self, name: Option<&str>) -> Result<()> {
        debug!(session_id = %self.inner.id, name = ?name, "Deleting cookies");
        let command = match name {
            Some(name) => ClassicCommand::DeleteCookie {
                name: name.to_string(),
            },
            None => ClassicCommand::DeleteAllCookies,
        };
        self.execute(command).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;

    use super::*;
    use crate::protocol::HttpMethod;
    use crate::transport::fake::{MockTransport, mock_session};

    #[test]
    fn test_same_site_spellings() {
        assert_eq!(SameSite::parse("Lax"), Some(SameSite::Lax));
        assert_eq!(SameSite::parse("none"), Some(SameSite::None));
        assert_eq!(SameSite::parse("bogus"), None);
        assert_eq!(SameSite::Strict.bidi_name(), "strict");

        let parsed: SameSite = serde_json::from_value(json!("strict")).expect("alias");
        assert_eq!(parsed, SameSite::Strict);
        assert_eq!(json!(SameSite::Lax), json!("Lax"));
    }

    #[test]
    fn test_cookie_wire_shape() {
        let cookie = Cookie::new("sid", "42")
            .with_path("/")
            .with_http_only(true)
            .with_same_site(SameSite::Strict);

        assert_eq!(
            json!(cookie),
            json!({
                "name": "sid",
                "value": "42",
                "path": "/",
                "secure": false,
                "httpOnly": true,
                "sameSite": "Strict"
            })
        );
    }

    #[test]
    fn test_key_defaults_path() {
        let cookie = Cookie::new("a", "b").with_domain("x.test");
        assert_eq!(cookie.key(), ("a", "b", Some("x.test"), "/"));
    }

    #[tokio::test]
    async fn test_get_and_add_cookies() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            HttpMethod::Get,
            "/session/s1/cookie",
            json!([{"name": "a", "value": "1", "domain": ".a.test", "path": "/", "secure": true, "httpOnly": false}]),
        )
        .on(HttpMethod::Post, "/session/s1/cookie", Value::Null);

        let session = mock_session(&mock, json!({}));
        let cookies = session.get_cookies().await.expect("cookies");
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].secure);

        session
            .add_cookie(&Cookie::new("b", "2"))
            .await
            .expect("add");
        let body = mock.calls_to(HttpMethod::Post, "/session/s1/cookie")[0]
            .body
            .clone()
            .expect("body");
        assert_eq!(body["cookie"]["name"], json!("b"));
    }

    #[tokio::test]
    async fn test_delete_cookies_routes() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Delete, "/session/s1/cookie/a%20b", Value::Null)
            .on(HttpMethod::Delete, "/session/s1/cookie", Value::Null);

        let session = mock_session(&mock, json!({}));
        session.delete_cookies(Some("a b")).await.expect("one");
        session.delete_cookies(None).await.expect("all");

        assert_eq!(mock.calls().len(), 2);
    }
}
