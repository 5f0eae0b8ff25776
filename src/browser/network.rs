//! Network interception over BiDi.
//!
//! Registers server-side intercepts and resolves every request they block.
//!
//! # Pipeline
//!
//! For each `network.beforeRequestSent` (or `network.responseStarted`)
//! event flagged `isBlocked`:
//!
//! | Step | Outcome |
//! |------|---------|
//! | No local handler among the event's intercepts | continue unmodified |
//! | First registered handler returns [`InterceptAction::Continue`] | continue unmodified |
//! | Handler returns [`InterceptAction::Fulfill`] | `network.provideResponse` (status 0 fails the request) |
//! | Handler returns [`InterceptAction::Fail`] | `network.failRequest` |
//! | Handler returns an error or panics | logged, continue unmodified |
//!
//! `network.authRequired` is always continued with the browser default.
//!
//! A rule matches an event when the event lists its intercept, the phase is
//! one the rule was registered for and, if the rule carries a method filter,
//! the request method is one of them. Events that arrive while an
//! `addIntercept` is still awaiting its reply and name an intercept this
//! pipeline does not know yet are held back until the reply lands.
//!
//! # URL Patterns
//!
//! Glob strings are translated to BiDi URL patterns. Leading and trailing
//! wildcard segments are stripped and what remains is matched exactly, so
//! `**/api/users` matches the path `/api/users` on any host. A wildcard in
//! the middle of a pattern (`/a/*/b`) is rejected.
//!
//! A route may start with an HTTP method (`GET **/api/users`). Requests with
//! another method are not handled by that rule.
//!
//! # Example
//!
//! ```ignore
//! use webdriver_wire::{InterceptAction, MockResponse};
//!
//! let network = session.network().await?;
//!
//! network.mock("**/api/users", MockResponse::json(json!({ "users": [] }))).await?;
//! network.block("**/ads.js").await?;
//!
//! network.intercept(&["**/api/orders"], &[InterceptPhase::BeforeRequestSent], |req| {
//!     if req.method == "DELETE" {
//!         Ok(InterceptAction::Fail)
//!     } else {
//!         Ok(InterceptAction::Continue)
//!     }
//! }).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{BoxError, Error, Result};
use crate::identifiers::{BrowsingContextId, InterceptId, ListenerId};
use crate::protocol::event::{AUTH_REQUIRED, BEFORE_REQUEST_SENT, RESPONSE_STARTED};
use crate::protocol::{
    BytesValue, Command, Event, Header, InterceptPhase, NetworkCommand, NetworkEventParams,
    UrlPattern,
};
use crate::transport::BidiConnection;

// ============================================================================
// Types
// ============================================================================

/// Result returned by an intercept handler.
pub type HandlerResult = std::result::Result<InterceptAction, BoxError>;

/// Intercept handler.
pub type InterceptHandler = Arc<dyn Fn(&InterceptedRequest) -> HandlerResult + Send + Sync>;

/// Events the pipeline consumes.
const NETWORK_EVENTS: [&str; 3] = [BEFORE_REQUEST_SENT, RESPONSE_STARTED, AUTH_REQUIRED];

// ============================================================================
// InterceptedRequest
// ============================================================================

/// Normalized view of a blocked request.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    /// Remote request ID.
    pub request_id: String,

    /// Request URL.
    pub url: String,

    /// HTTP method.
    pub method: String,

    /// Request headers as `(name, value)`; binary values are omitted.
    pub headers: Vec<(String, String)>,

    /// Whether the request is waiting for a decision.
    pub is_blocked: bool,

    /// Browsing context that issued the request.
    pub context: Option<BrowsingContextId>,

    /// Phase the request is blocked at.
    pub phase: InterceptPhase,

    /// Response status, for the response phase.
    pub status: Option<u16>,
}

impl InterceptedRequest {
    fn from_params(params: &NetworkEventParams, phase: InterceptPhase) -> Self {
        Self {
            request_id: params.request.request.clone(),
            url: params.request.url.clone(),
            method: params.request.method.clone(),
            headers: text_headers(&params.request.headers),
            is_blocked: params.is_blocked,
            context: params.context.clone(),
            phase,
            status: params.response.as_ref().map(|r| r.status),
        }
    }

    /// Returns the first header with `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn text_headers(headers: &[Header]) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|h| h.value.as_text().map(|v| (h.name.clone(), v.to_string())))
        .collect()
}

// ============================================================================
// MockResponse
// ============================================================================

/// Synthetic response body.
#[derive(Debug, Clone, PartialEq)]
pub enum MockBody {
    /// No body.
    Empty,
    /// UTF-8 text, sent as a string value.
    Text(String),
    /// Raw bytes, sent base64-encoded.
    Bytes(Vec<u8>),
    /// JSON value, serialized and sent as text.
    Json(Value),
}

/// Synthetic response description.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    /// HTTP status. `0` fails the request instead.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Body.
    pub body: MockBody,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: MockBody::Empty,
        }
    }
}

impl MockResponse {
    /// Empty response with the given status.
    #[inline]
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// `200` with a text body.
    #[inline]
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: MockBody::Text(body.into()),
            ..Self::default()
        }
    }

    /// `200` with a JSON body.
    #[inline]
    #[must_use]
    pub fn json(body: Value) -> Self {
        Self {
            body: MockBody::Json(body),
            ..Self::default()
        }
    }

    /// `200` with a binary body.
    #[inline]
    #[must_use]
    pub fn bytes(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: MockBody::Bytes(body.into()),
            ..Self::default()
        }
    }

    /// Sets the status.
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Adds a header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Translates to `network.provideResponse` for `request`.
    ///
    /// JSON bodies get `content-type: application/json` unless a content
    /// type was set explicitly.
    fn to_command(&self, request: &str) -> Result<NetworkCommand> {
        let mut headers: Vec<Header> = self
            .headers
            .iter()
            .map(|(n, v)| Header::new(n.clone(), v.clone()))
            .collect();

        let body = match &self.body {
            MockBody::Empty => BytesValue::string(""),
            MockBody::Text(text) => BytesValue::string(text.clone()),
            MockBody::Bytes(bytes) => BytesValue::Base64(Base64Standard.encode(bytes)),
            MockBody::Json(value) => {
                if !self
                    .headers
                    .iter()
                    .any(|(n, _)| n.eq_ignore_ascii_case("content-type"))
                {
                    headers.push(Header::new("content-type", "application/json"));
                }
                BytesValue::string(serde_json::to_string(value)?)
            }
        };

        Ok(NetworkCommand::ProvideResponse {
            request: request.to_string(),
            status_code: self.status,
            reason_phrase: None,
            headers,
            body,
        })
    }
}

// ============================================================================
// InterceptAction
// ============================================================================

/// Decision for a blocked request.
#[derive(Debug, Clone, PartialEq)]
pub enum InterceptAction {
    /// Let the request proceed unmodified.
    Continue,
    /// Answer with a synthetic response.
    Fulfill(MockResponse),
    /// Fail with a network error.
    Fail,
}

// ============================================================================
// Network
// ============================================================================

struct Rule {
    id: InterceptId,
    phases: Vec<InterceptPhase>,
    /// Accepted HTTP methods; empty accepts any.
    methods: Vec<String>,
    handler: InterceptHandler,
}

impl Rule {
    fn accepts(&self, phase: InterceptPhase, request: &InterceptedRequest, intercepts: &[InterceptId]) -> bool {
        intercepts.contains(&self.id)
            && self.phases.contains(&phase)
            && (self.methods.is_empty()
                || self.methods.iter().any(|m| m.eq_ignore_ascii_case(&request.method)))
    }
}

/// Blocked event held back while an intercept registration is in flight.
struct Deferred {
    phase: InterceptPhase,
    params: NetworkEventParams,
}

#[derive(Default)]
struct Rules {
    active: Vec<Rule>,
    /// `network.addIntercept` commands awaiting a reply.
    adding: usize,
    deferred: Vec<Deferred>,
}

struct NetworkInner {
    bidi: BidiConnection,
    rules: Mutex<Rules>,
    listeners: Mutex<Vec<ListenerId>>,
}

/// Marks one in-flight `network.addIntercept`.
///
/// Dropping it, on success, failure or cancellation, replays the events
/// deferred in the meantime.
struct PendingAdd<'a> {
    inner: &'a NetworkInner,
}

impl<'a> PendingAdd<'a> {
    fn new(inner: &'a NetworkInner) -> Self {
        inner.rules.lock().adding += 1;
        Self { inner }
    }
}

impl Drop for PendingAdd<'_> {
    fn drop(&mut self) {
        let deferred = {
            let mut rules = self.inner.rules.lock();
            rules.adding = rules.adding.saturating_sub(1);
            std::mem::take(&mut rules.deferred)
        };
        for Deferred { phase, params } in deferred {
            dispatch(self.inner, phase, params);
        }
    }
}

/// Interception pipeline bound to one BiDi connection.
///
/// Cheap to clone. Obtain it with [`Session::network`](crate::Session::network).
#[derive(Clone)]
pub struct Network {
    inner: Arc<NetworkInner>,
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("intercepts", &self.intercept_count())
            .finish_non_exhaustive()
    }
}

impl Network {
    /// Subscribes to network events and installs the dispatch listeners.
    ///
    /// # Errors
    ///
    /// Returns the `session.subscribe` failure.
    pub async fn attach(bidi: BidiConnection) -> Result<Self> {
        bidi.subscribe(&NETWORK_EVENTS, None).await?;

        let network = Self {
            inner: Arc::new(NetworkInner {
                bidi: bidi.clone(),
                rules: Mutex::new(Rules::default()),
                listeners: Mutex::new(Vec::new()),
            }),
        };

        let ids: Vec<ListenerId> = NETWORK_EVENTS
            .iter()
            .map(|method| {
                let weak = Arc::downgrade(&network.inner);
                bidi.on(method, move |event| on_network_event(&weak, event))
            })
            .collect();
        *network.inner.listeners.lock() = ids;

        debug!("Network interception attached");
        Ok(network)
    }

    /// Returns the number of registered intercepts.
    #[inline]
    #[must_use]
    pub fn intercept_count(&self) -> usize {
        self.inner.rules.lock().active.len()
    }

    /// Registers an intercept for `patterns` at `phases`.
    ///
    /// An empty pattern list, or a pattern made only of wildcards, matches
    /// every request. `phases` defaults to `beforeRequestSent` when empty.
    ///
    /// Patterns may carry a leading method (`POST /api/orders`). The rule
    /// then only handles those methods; if any pattern has no method, every
    /// method is handled. The filter applies to the rule as a whole.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for patterns with an inner wildcard
    /// - the `network.addIntercept` failure
    pub async fn intercept<F>(
        &self,
        patterns: &[&str],
        phases: &[InterceptPhase],
        handler: F,
    ) -> Result<InterceptId>
    where
        F: Fn(&InterceptedRequest) -> HandlerResult + Send + Sync + 'static,
    {
        let mut url_patterns = Vec::with_capacity(patterns.len());
        let mut methods: Vec<String> = Vec::new();
        let mut match_all = patterns.is_empty();
        let mut any_method = patterns.is_empty();
        for pattern in patterns {
            let (method, glob) = split_method(pattern);
            match method {
                Some(m) if !methods.iter().any(|known| known == m) => methods.push(m.to_string()),
                Some(_) => {}
                None => any_method = true,
            }
            match url_pattern(glob)? {
                Some(p) => url_patterns.push(p),
                None => match_all = true,
            }
        }
        if match_all {
            url_patterns.clear();
        }
        if any_method {
            methods.clear();
        }

        let phases = if phases.is_empty() {
            vec![InterceptPhase::BeforeRequestSent]
        } else {
            phases.to_vec()
        };

        let pending = PendingAdd::new(&self.inner);

        let result = self
            .inner
            .bidi
            .send_command(Command::Network(NetworkCommand::AddIntercept {
                phases: phases.clone(),
                url_patterns,
                contexts: None,
            }))
            .await?;

        let id = result
            .get("intercept")
            .and_then(Value::as_str)
            .map(InterceptId::new)
            .ok_or_else(|| Error::bidi("network.addIntercept", "unknown error", "missing intercept id"))?;

        debug!(intercept_id = %id, ?patterns, ?phases, ?methods, "Intercept added");

        self.inner.rules.lock().active.push(Rule {
            id: id.clone(),
            phases,
            methods,
            handler: Arc::new(handler),
        });
        drop(pending);
        Ok(id)
    }

    /// Answers matching requests with a fixed response.
    ///
    /// `pattern` may start with a method: `GET **/api/users`.
    pub async fn mock(&self, pattern: &str, response: MockResponse) -> Result<InterceptId> {
        self.intercept(&[pattern], &[InterceptPhase::BeforeRequestSent], move |_| {
            Ok(InterceptAction::Fulfill(response.clone()))
        })
        .await
    }

    /// Answers matching requests with a computed response.
    pub async fn mock_with<F>(&self, pattern: &str, respond: F) -> Result<InterceptId>
    where
        F: Fn(&InterceptedRequest) -> MockResponse + Send + Sync + 'static,
    {
        self.intercept(&[pattern], &[InterceptPhase::BeforeRequestSent], move |req| {
            Ok(InterceptAction::Fulfill(respond(req)))
        })
        .await
    }

    /// Fails matching requests.
    pub async fn block(&self, pattern: &str) -> Result<InterceptId> {
        self.mock(pattern, MockResponse::new(0)).await
    }

    /// Removes one intercept.
    ///
    /// The local handler is dropped even if the remote end no longer knows
    /// the intercept.
    pub async fn remove_intercept(&self, id: &InterceptId) -> Result<()> {
        self.inner.rules.lock().active.retain(|rule| &rule.id != id);

        self.inner
            .bidi
            .send_command(Command::Network(NetworkCommand::RemoveIntercept {
                intercept: id.clone(),
            }))
            .await?;

        debug!(intercept_id = %id, "Intercept removed");
        Ok(())
    }

    /// Removes every intercept registered through this pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first removal failure after attempting all of them.
    pub async fn clear_intercepts(&self) -> Result<()> {
        let ids: Vec<InterceptId> = self
            .inner
            .rules
            .lock()
            .active
            .drain(..)
            .map(|rule| rule.id)
            .collect();

        let mut first_error = None;
        for id in ids {
            let result = self
                .inner
                .bidi
                .send_command(Command::Network(NetworkCommand::RemoveIntercept {
                    intercept: id.clone(),
                }))
                .await;
            if let Err(e) = result {
                warn!(intercept_id = %id, error = %e, "Failed to remove intercept");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for NetworkInner {
    fn drop(&mut self) {
        for id in self.listeners.get_mut().drain(..) {
            self.bidi.off(id);
        }
    }
}

// ============================================================================
// Event Dispatch
// ============================================================================

/// Listener body. Runs on the connection's event loop, so resolution is
/// spawned.
fn on_network_event(weak: &Weak<NetworkInner>, event: &Event) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let Some(params) = event.network_params() else {
        warn!(method = %event.method, "Unparseable network event");
        return;
    };
    if !params.is_blocked {
        return;
    }

    let phase = match event.method.as_str() {
        BEFORE_REQUEST_SENT => InterceptPhase::BeforeRequestSent,
        RESPONSE_STARTED => InterceptPhase::ResponseStarted,
        _ => InterceptPhase::AuthRequired,
    };

    dispatch(&inner, phase, params);
}

/// Picks the first matching rule and spawns the resolution.
fn dispatch(inner: &NetworkInner, phase: InterceptPhase, params: NetworkEventParams) {
    let request = InterceptedRequest::from_params(&params, phase);

    let handler = {
        let mut rules = inner.rules.lock();
        let handler = rules
            .active
            .iter()
            .find(|rule| rule.accepts(phase, &request, &params.intercepts))
            .map(|rule| Arc::clone(&rule.handler));

        let unknown = params
            .intercepts
            .iter()
            .any(|id| rules.active.iter().all(|rule| &rule.id != id));
        if handler.is_none() && unknown && rules.adding > 0 {
            trace!(request_id = %request.request_id, "Deferring request until intercept is registered");
            rules.deferred.push(Deferred { phase, params });
            return;
        }
        handler
    };

    let bidi = inner.bidi.clone();
    tokio::spawn(async move {
        let request_id = request.request_id.clone();
        let action = match handler {
            Some(handler) if phase != InterceptPhase::AuthRequired => run_handler(&handler, &request),
            _ => InterceptAction::Continue,
        };

        if let Err(e) = resolve(&bidi, phase, &request_id, action).await {
            warn!(request_id = %request_id, error = %e, "Failed to resolve intercepted request");
        }
    });
}

/// Calls the handler, mapping errors and panics to [`InterceptAction::Continue`].
fn run_handler(handler: &InterceptHandler, request: &InterceptedRequest) -> InterceptAction {
    match catch_unwind(AssertUnwindSafe(|| handler(request))) {
        Ok(Ok(action)) => action,
        Ok(Err(e)) => {
            error!(url = %request.url, error = %Error::handler(e), "Intercept handler failed");
            InterceptAction::Continue
        }
        Err(_) => {
            error!(url = %request.url, "Intercept handler panicked");
            InterceptAction::Continue
        }
    }
}

async fn resolve(
    bidi: &BidiConnection,
    phase: InterceptPhase,
    request_id: &str,
    action: InterceptAction,
) -> Result<()> {
    let request = request_id.to_string();

    let command = match (phase, action) {
        (InterceptPhase::AuthRequired, _) => NetworkCommand::ContinueWithAuth {
            request,
            action: "default".to_string(),
        },
        (_, InterceptAction::Fail) => NetworkCommand::FailRequest { request },
        (_, InterceptAction::Fulfill(response)) if response.status == 0 => {
            NetworkCommand::FailRequest { request }
        }
        (_, InterceptAction::Fulfill(response)) => response.to_command(request_id)?,
        (InterceptPhase::ResponseStarted, InterceptAction::Continue) => {
            NetworkCommand::ContinueResponse { request }
        }
        (_, InterceptAction::Continue) => NetworkCommand::ContinueRequest { request },
    };

    bidi.send_command(Command::Network(command)).await?;
    Ok(())
}

// ============================================================================
// URL Patterns
// ============================================================================

/// Splits a leading HTTP method off a route such as `GET **/api/users`.
fn split_method(route: &str) -> (Option<&str>, &str) {
    let route = route.trim();
    if let Some((head, rest)) = route.split_once(char::is_whitespace)
        && !head.is_empty()
        && head.bytes().all(|b| b.is_ascii_uppercase())
    {
        return (Some(head), rest.trim_start());
    }
    (None, route)
}

/// Translates a glob into a BiDi URL pattern.
///
/// Returns `None` for patterns that match everything (`*`, `**`).
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if a wildcard remains after the
/// leading and trailing wildcard segments are stripped.
pub fn url_pattern(glob: &str) -> Result<Option<UrlPattern>> {
    let trimmed = glob.trim();

    if !trimmed.contains('*') {
        if Url::parse(trimmed).is_ok() {
            return Ok(Some(UrlPattern::String {
                pattern: trimmed.to_string(),
            }));
        }
        return Ok(Some(path_pattern(trimmed)));
    }

    let core = trimmed
        .trim_start_matches(['*', '/'])
        .trim_end_matches(['*', '/']);
    let had_leading_slash = trimmed.trim_start_matches('*').starts_with('/');

    if core.contains('*') {
        return Err(Error::invalid_argument(format!(
            "URL pattern '{glob}' has a wildcard in the middle; only leading and trailing wildcards are supported"
        )));
    }
    if core.is_empty() {
        return Ok(None);
    }

    warn!(pattern = %glob, exact = %core, "Glob degraded to an exact URL pattern");

    if let Ok(url) = Url::parse(core)
        && url.has_host()
    {
        let path = url.path();
        return Ok(Some(UrlPattern::Pattern {
            protocol: Some(url.scheme().to_string()),
            hostname: url.host_str().map(str::to_string),
            port: url.port().map(|p| p.to_string()),
            pathname: (path != "/").then(|| path.to_string()),
            search: None,
        }));
    }

    let path = if had_leading_slash || !core.starts_with('/') {
        format!("/{}", core.trim_start_matches('/'))
    } else {
        core.to_string()
    };
    Ok(Some(path_pattern(&path)))
}

fn path_pattern(path: &str) -> UrlPattern {
    let (pathname, search) = match path.split_once('?') {
        Some((p, q)) => (p, Some(q.to_string())),
        None => (path, None),
    };
    let pathname = if pathname.starts_with('/') {
        pathname.to_string()
    } else {
        format!("/{pathname}")
    };

    UrlPattern::Pattern {
        protocol: None,
        hostname: None,
        port: None,
        pathname: Some(pathname),
        search,
    }
}

// ============================================================================
// Tests
// ============================================================================
