//! Classic WebDriver route table.
//!
//! Maps typed commands to an HTTP method, a path relative to the endpoint
//! base and an optional JSON body.
//!
//! # Element References
//!
//! Elements round-trip as `{"element-6066-11e4-a52e-4f735466cecf": "<id>"}`.
//! Older remote ends use the legacy `ELEMENT` key, which is accepted on read
//! and emitted alongside the W3C key on write.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::{Map, Value, json};

use crate::browser::selector::Locator;
use crate::identifiers::{ElementId, SessionId};

// ============================================================================
// Constants
// ============================================================================

/// W3C web element identifier key.
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Legacy (JSON Wire Protocol) element identifier key.
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

// ============================================================================
// HttpMethod
// ============================================================================

/// HTTP verbs used by the Classic protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Returns the verb as an uppercase string.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Route
// ============================================================================

/// A resolved HTTP call: verb, endpoint-relative path, optional body.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Path relative to the endpoint base, starting with `/`.
    pub path: String,
    /// JSON body for `POST` requests.
    pub body: Option<Value>,
}

impl Route {
    fn get(path: String) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            body: None,
        }
    }

    fn post(path: String, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            body: Some(body),
        }
    }

    fn delete(path: String) -> Self {
        Self {
            method: HttpMethod::Delete,
            path,
            body: None,
        }
    }
}

// ============================================================================
// ClassicCommand
// ============================================================================

/// Classic WebDriver commands.
///
/// Session-scoped variants resolve against a [`SessionId`] via [`ClassicCommand::route`].
#[derive(Debug, Clone)]
pub enum ClassicCommand {
    /// `GET /status` readiness probe.
    Status,
    /// `POST /session` with capabilities.
    NewSession {
        /// Capabilities request body.
        capabilities: Value,
    },
    /// `DELETE /session/{id}`.
    DeleteSession,
    /// `POST /session/{id}/timeouts`.
    SetTimeouts {
        /// `{script, pageLoad, implicit}` in milliseconds.
        timeouts: Value,
    },
    /// `POST /session/{id}/url`.
    NavigateTo {
        /// Target URL.
        url: String,
    },
    /// `GET /session/{id}/url`.
    GetCurrentUrl,
    /// `POST /session/{id}/back`.
    Back,
    /// `POST /session/{id}/forward`.
    Forward,
    /// `POST /session/{id}/refresh`.
    Refresh,
    /// `GET /session/{id}/title`.
    GetTitle,
    /// `GET /session/{id}/window`.
    GetWindowHandle,
    /// `GET /session/{id}/source`.
    GetPageSource,
    /// `POST /session/{id}/element`.
    FindElement {
        /// Compiled locator.
        locator: Locator,
    },
    /// `POST /session/{id}/elements`.
    FindElements {
        /// Compiled locator.
        locator: Locator,
    },
    /// `POST /session/{id}/element/{eid}/element`.
    FindElementFromElement {
        /// Parent element.
        element_id: ElementId,
        /// Compiled locator (relative form).
        locator: Locator,
    },
    /// `POST /session/{id}/element/{eid}/elements`.
    FindElementsFromElement {
        /// Parent element.
        element_id: ElementId,
        /// Compiled locator (relative form).
        locator: Locator,
    },
    /// `POST /session/{id}/element/{eid}/click`.
    ElementClick {
        /// Target element.
        element_id: ElementId,
    },
    /// `POST /session/{id}/element/{eid}/clear`.
    ElementClear {
        /// Target element.
        element_id: ElementId,
    },
    /// `POST /session/{id}/element/{eid}/value`.
    ElementSendKeys {
        /// Target element.
        element_id: ElementId,
        /// Text to type.
        text: String,
    },
    /// `GET /session/{id}/element/{eid}/text`.
    GetElementText {
        /// Target element.
        element_id: ElementId,
    },
    /// `GET /session/{id}/element/{eid}/name`.
    GetElementTagName {
        /// Target element.
        element_id: ElementId,
    },
    /// `GET /session/{id}/element/{eid}/attribute/{name}`.
    GetElementAttribute {
        /// Target element.
        element_id: ElementId,
        /// Attribute name.
        name: String,
    },
    /// `GET /session/{id}/element/{eid}/property/{name}`.
    GetElementProperty {
        /// Target element.
        element_id: ElementId,
        /// Property name.
        name: String,
    },
    /// `GET /session/{id}/element/{eid}/rect`.
    GetElementRect {
        /// Target element.
        element_id: ElementId,
    },
    /// `GET /session/{id}/element/{eid}/displayed`.
    IsElementDisplayed {
        /// Target element.
        element_id: ElementId,
    },
    /// `GET /session/{id}/element/{eid}/enabled`.
    IsElementEnabled {
        /// Target element.
        element_id: ElementId,
    },
    /// `GET /session/{id}/element/{eid}/selected`.
    IsElementSelected {
        /// Target element.
        element_id: ElementId,
    },
    /// `POST /session/{id}/execute/sync`.
    ExecuteScript {
        /// Function body.
        script: String,
        /// Arguments (element references already encoded).
        args: Vec<Value>,
    },
    /// `POST /session/{id}/execute/async`.
    ExecuteAsyncScript {
        /// Function body; the last argument is the completion callback.
        script: String,
        /// Arguments (element references already encoded).
        args: Vec<Value>,
    },
    /// `POST /session/{id}/actions`.
    PerformActions {
        /// Input source action sequences.
        actions: Value,
    },
    /// `DELETE /session/{id}/actions`.
    ReleaseActions,
    /// `GET /session/{id}/cookie`.
    GetAllCookies,
    /// `POST /session/{id}/cookie`.
    AddCookie {
        /// Cookie object.
        cookie: Value,
    },
    /// `DELETE /session/{id}/cookie/{name}`.
    DeleteCookie {
        /// Cookie name.
        name: String,
    },
    /// `DELETE /session/{id}/cookie`.
    DeleteAllCookies,
    /// `GET /session/{id}/screenshot`.
    TakeScreenshot,
}

impl ClassicCommand {
    /// Resolves the command to an HTTP route.
    ///
    /// `session` is ignored by [`ClassicCommand::Status`] and
    /// [`ClassicCommand::NewSession`].
    #[must_use]
    pub fn route(&self, session: &SessionId) -> Route {
        let s = format!("/session/{}", encode(session.as_str()));
        let el = |id: &ElementId| format!("{s}/element/{}", encode(id.as_str()));

        match self {
            Self::Status => Route::get("/status".to_string()),
            Self::NewSession { capabilities } => {
                Route::post("/session".to_string(), capabilities.clone())
            }
            Self::DeleteSession => Route::delete(s),
            Self::SetTimeouts { timeouts } => Route::post(format!("{s}/timeouts"), timeouts.clone()),
            Self::NavigateTo { url } => Route::post(format!("{s}/url"), json!({ "url": url })),
            Self::GetCurrentUrl => Route::get(format!("{s}/url")),
            Self::Back => Route::post(format!("{s}/back"), json!({})),
            Self::Forward => Route::post(format!("{s}/forward"), json!({})),
            Self::Refresh => Route::post(format!("{s}/refresh"), json!({})),
            Self::GetTitle => Route::get(format!("{s}/title")),
            Self::GetWindowHandle => Route::get(format!("{s}/window")),
            Self::GetPageSource => Route::get(format!("{s}/source")),
            Self::FindElement { locator } => Route::post(format!("{s}/element"), locator.to_json()),
            Self::FindElements { locator } => {
                Route::post(format!("{s}/elements"), locator.to_json())
            }
            Self::FindElementFromElement {
                element_id,
                locator,
            } => Route::post(format!("{}/element", el(element_id)), locator.to_json()),
            Self::FindElementsFromElement {
                element_id,
                locator,
            } => Route::post(format!("{}/elements", el(element_id)), locator.to_json()),
            Self::ElementClick { element_id } => {
                Route::post(format!("{}/click", el(element_id)), json!({}))
            }
            Self::ElementClear { element_id } => {
                Route::post(format!("{}/clear", el(element_id)), json!({}))
            }
            Self::ElementSendKeys { element_id, text } => {
                Route::post(format!("{}/value", el(element_id)), json!({ "text": text }))
            }
            Self::GetElementText { element_id } => Route::get(format!("{}/text", el(element_id))),
            Self::GetElementTagName { element_id } => {
                Route::get(format!("{}/name", el(element_id)))
            }
            Self::GetElementAttribute { element_id, name } => Route::get(format!(
                "{}/attribute/{}",
                el(element_id),
                encode(name)
            )),
            Self::GetElementProperty { element_id, name } => Route::get(format!(
                "{}/property/{}",
                el(element_id),
                encode(name)
            )),
            Self::GetElementRect { element_id } => Route::get(format!("{}/rect", el(element_id))),
            Self::IsElementDisplayed { element_id } => {
                Route::get(format!("{}/displayed", el(element_id)))
            }
            Self::IsElementEnabled { element_id } => {
                Route::get(format!("{}/enabled", el(element_id)))
            }
            Self::IsElementSelected { element_id } => {
                Route::get(format!("{}/selected", el(element_id)))
            }
            Self::ExecuteScript { script, args } => Route::post(
                format!("{s}/execute/sync"),
                json!({ "script": script, "args": args }),
            ),
            Self::ExecuteAsyncScript { script, args } => Route::post(
                format!("{s}/execute/async"),
                json!({ "script": script, "args": args }),
            ),
            Self::PerformActions { actions } => {
                Route::post(format!("{s}/actions"), json!({ "actions": actions }))
            }
            Self::ReleaseActions => Route::delete(format!("{s}/actions")),
            Self::GetAllCookies => Route::get(format!("{s}/cookie")),
            Self::AddCookie { cookie } => {
                Route::post(format!("{s}/cookie"), json!({ "cookie": cookie }))
            }
            Self::DeleteCookie { name } => Route::delete(format!("{s}/cookie/{}", encode(name))),
            Self::DeleteAllCookies => Route::delete(format!("{s}/cookie")),
            Self::TakeScreenshot => Route::get(format!("{s}/screenshot")),
        }
    }
}

/// Percent-encodes a path segment.
fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

// ============================================================================
// Element Reference Codec
// ============================================================================

/// Extracts an element ID from a web element reference.
///
/// Accepts the W3C key first, then the legacy `ELEMENT` key.
#[must_use]
pub fn element_id_from_value(value: &Value) -> Option<ElementId> {
    let obj = value.as_object()?;
    obj.get(W3C_ELEMENT_KEY)
        .or_else(|| obj.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(ElementId::new)
}

/// Encodes an element ID as a web element reference.
#[must_use]
pub fn element_reference(id: &ElementId) -> Value {
    let mut obj = Map::new();
    obj.insert(W3C_ELEMENT_KEY.to_string(), Value::String(id.to_string()));
    obj.insert(LEGACY_ELEMENT_KEY.to_string(), Value::String(id.to_string()));
    Value::Object(obj)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::selector::By;

    fn sid() -> SessionId {
        SessionId::new("s1")
    }

    #[test]
    fn test_navigate_route() {
        let route = ClassicCommand::NavigateTo {
            url: "https://example.com".into(),
        }
        .route(&sid());

        assert_eq!(route.method, HttpMethod::Post);
        assert_eq!(route.path, "/session/s1/url");
        assert_eq!(route.body, Some(json!({ "url": "https://example.com" })));
    }

    #[test]
    fn test_find_element_route_uses_compiled_locator() {
        let route = ClassicCommand::FindElement {
            locator: By::id("submit").compile(),
        }
        .route(&sid());

        assert_eq!(route.path, "/session/s1/element");
        let body = route.body.expect("body");
        assert_eq!(body["using"], "css selector");
        assert_eq!(body["value"], "[id=\"submit\"]");
    }

    #[test]
    fn test_element_paths_are_encoded() {
        let route = ClassicCommand::GetElementAttribute {
            element_id: ElementId::new("a/b"),
            name: "data-x".into(),
        }
        .route(&sid());

        assert_eq!(route.method, HttpMethod::Get);
        assert_eq!(route.path, "/session/s1/element/a%2Fb/attribute/data-x");
    }

    #[test]
    fn test_status_ignores_session() {
        let route = ClassicCommand::Status.route(&sid());
        assert_eq!(route.path, "/status");
        assert!(route.body.is_none());
    }

    #[test]
    fn test_element_id_from_w3c_key() {
        let value = json!({ W3C_ELEMENT_KEY: "abc" });
        assert_eq!(element_id_from_value(&value), Some(ElementId::new("abc")));
    }

    #[test]
    fn test_element_id_from_legacy_key() {
        let value = json!({ "ELEMENT": "legacy" });
        assert_eq!(element_id_from_value(&value), Some(ElementId::new("legacy")));
    }

    #[test]
    fn test_element_id_prefers_w3c_key() {
        let value = json!({ W3C_ELEMENT_KEY: "w3c", "ELEMENT": "legacy" });
        assert_eq!(element_id_from_value(&value), Some(ElementId::new("w3c")));
        assert_eq!(element_id_from_value(&json!("plain")), None);
    }

    #[test]
    fn test_element_reference_carries_both_keys() {
        let value = element_reference(&ElementId::new("e9"));
        assert_eq!(value[W3C_ELEMENT_KEY], "e9");
        assert_eq!(value[LEGACY_ELEMENT_KEY], "e9");
    }
}
