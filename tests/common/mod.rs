//! Shared helpers for integration tests.
//!
//! [`FakeBrowser`] is an in-memory Classic endpoint serving one page with a
//! `#submit` button that sets `#result` to `clicked`, plus a cookie jar.

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use webdriver_wire::protocol::HttpMethod;
use webdriver_wire::transport::HttpTransport;
use webdriver_wire::{Driver, Endpoint, Error, Result};

// ============================================================================
// Constants
// ============================================================================

pub const SESSION_ID: &str = "fake-session";

pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Number of `displayed` checks answering `false` before the button shows.
pub const HIDDEN_POLLS: usize = 2;

// ============================================================================
// FakeBrowser
// ============================================================================

#[derive(Debug, Default)]
struct PageState {
    url: String,
    clicked: bool,
    displayed_checks: usize,
    cookies: Vec<Value>,
    log: Vec<String>,
}

/// In-memory Classic WebDriver endpoint.
#[derive(Default)]
pub struct FakeBrowser {
    state: Mutex<PageState>,
}

impl FakeBrowser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Request log as `METHOD path`.
    pub fn log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    pub fn driver(self: &Arc<Self>) -> Driver {
        let endpoint = Endpoint::parse("http://127.0.0.1:4444").expect("endpoint");
        Driver::with_transport(endpoint, Arc::clone(self) as Arc<dyn HttpTransport>)
    }

    fn element(id: &str) -> Value {
        json!({ W3C_ELEMENT_KEY: id })
    }

    fn no_such_element(query: &str) -> Error {
        Error::protocol("no such element", format!("Unable to locate {query}"))
    }

    fn handle(&self, method: HttpMethod, path: &str, body: Option<Value>) -> Result<Value> {
        let mut state = self.state.lock();
        state.log.push(format!("{} {path}", method.as_str()));

        if path == "/status" {
            return Ok(json!({ "ready": true, "message": "fake ready" }));
        }
        if path == "/session" {
            return Ok(json!({
                "sessionId": SESSION_ID,
                "capabilities": { "browserName": "fake", "browserVersion": "1.0" }
            }));
        }

        let prefix = format!("/session/{SESSION_ID}");
        let Some(rest) = path.strip_prefix(&prefix) else {
            return Err(Error::protocol("invalid session id", path.to_string()));
        };
        let body = body.unwrap_or(Value::Null);

        match (method, rest) {
            (HttpMethod::Delete, "") => Ok(Value::Null),
            (HttpMethod::Post, "/url") => {
                state.url = body["url"].as_str().unwrap_or_default().to_string();
                state.clicked = false;
                state.displayed_checks = 0;
                Ok(Value::Null)
            }
            (HttpMethod::Get, "/url") => Ok(json!(state.url)),
            (HttpMethod::Get, "/title") => Ok(json!("Fixture")),
            (HttpMethod::Post, "/element") => {
                let query = body["value"].as_str().unwrap_or_default();
                if query.contains("Submit") {
                    Ok(Self::element("submit"))
                } else if query.contains("result") {
                    Ok(Self::element("result"))
                } else {
                    Err(Self::no_such_element(query))
                }
            }
            (HttpMethod::Post, "/elements") => {
                let query = body["value"].as_str().unwrap_or_default();
                if query.contains("button") {
                    Ok(json!([Self::element("submit")]))
                } else {
                    Ok(json!([]))
                }
            }
            (HttpMethod::Get, "/element/submit/displayed") => {
                state.displayed_checks += 1;
                Ok(json!(state.displayed_checks > HIDDEN_POLLS))
            }
            (HttpMethod::Get, "/element/result/displayed") => Ok(json!(true)),
            (HttpMethod::Post, "/element/submit/click") => {
                state.clicked = true;
                Ok(Value::Null)
            }
            (HttpMethod::Get, "/element/result/text") => {
                Ok(json!(if state.clicked { "clicked" } else { "" }))
            }
            (HttpMethod::Get, "/element/submit/name") => Ok(json!("BUTTON")),
            (HttpMethod::Get, "/cookie") => Ok(json!(state.cookies)),
            (HttpMethod::Post, "/cookie") => {
                let cookie = body["cookie"].clone();
                let name = cookie["name"].clone();
                state.cookies.retain(|c| c["name"] != name);
                state.cookies.push(cookie);
                Ok(Value::Null)
            }
            (HttpMethod::Delete, "/cookie") => {
                state.cookies.clear();
                Ok(Value::Null)
            }
            (HttpMethod::Delete, other) if other.starts_with("/cookie/") => {
                let name = other.trim_start_matches("/cookie/");
                state.cookies.retain(|c| c["name"] != name);
                Ok(Value::Null)
            }
            _ => Err(Error::protocol(
                "unknown command",
                format!("{} {path}", method.as_str()),
            )),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeBrowser {
    async fn execute(&self, method: HttpMethod, path: &str, body: Option<Value>) -> Result<Value> {
        self.handle(method, path, body)
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Installs a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("webdriver_wire=debug")),
        )
        .with_test_writer()
        .try_init();
}
