//! Browser console and JavaScript error monitor.
//!
//! Subscribes once to `log.entryAdded` and keeps the most recent entries
//! in a bounded buffer, oldest evicted first. Every entry is also pushed
//! synchronously to subscribers.
//!
//! # Subscribers
//!
//! | Method | Receives |
//! |--------|----------|
//! | [`LogMonitor::on_entry`] | every entry |
//! | [`LogMonitor::on_level`] | entries of one level |
//! | [`LogMonitor::on_console`] | console messages |
//! | [`LogMonitor::on_error`] | uncaught JavaScript errors |
//!
//! Delivery order for one entry is: all-entry subscribers, then level
//! subscribers, then kind subscribers. A panicking subscriber is logged and
//! skipped.
//!
//! # Example
//!
//! ```ignore
//! let logs = session.logs().await?;
//!
//! let ready = logs.wait_for_message(|e| e.text() == "app ready", Duration::from_secs(5));
//! session.goto("https://example.com").await?;
//! ready.await?;
//!
//! assert!(logs.errors().is_empty());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{BrowsingContextId, IdSequence, ListenerId, SubscriptionId};
use crate::protocol::Event;
use crate::protocol::event::LOG_ENTRY_ADDED;
use crate::transport::BidiConnection;

// ============================================================================
// Constants
// ============================================================================

/// Default number of retained entries.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

// ============================================================================
// Options
// ============================================================================

/// Log monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMonitorOptions {
    /// Maximum number of retained entries.
    pub capacity: usize,
}

impl Default for LogMonitorOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

// ============================================================================
// LogEntry
// ============================================================================

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// `debug`
    Debug,
    /// `info`
    Info,
    /// `warn`
    Warn,
    /// `error`
    Error,
}

impl LogLevel {
    /// Parses a BiDi level name. Unknown names map to `Info`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "debug" | "trace" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// Entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// `console.*` call.
    Console,
    /// Uncaught JavaScript error.
    JavaScript,
}

/// One frame of a JavaScript stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// Script URL.
    #[serde(default)]
    pub url: String,
    /// Function name; empty for top-level code.
    #[serde(default)]
    pub function_name: String,
    /// Zero-based line.
    #[serde(default)]
    pub line_number: u32,
    /// Zero-based column.
    #[serde(default)]
    pub column_number: u32,
}

/// A `console.*` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleMessage {
    /// Level.
    pub level: LogLevel,
    /// Rendered message text.
    pub text: String,
    /// Milliseconds since the epoch.
    pub timestamp: u64,
    /// Console method (`log`, `warn`, `table`, ...).
    pub method: String,
    /// Arguments, deserialized from remote values.
    pub args: Vec<Value>,
    /// Stack frames, innermost first.
    pub stack: Vec<StackFrame>,
    /// Originating browsing context.
    pub context: Option<BrowsingContextId>,
}

/// An uncaught JavaScript error.
#[derive(Debug, Clone, PartialEq)]
pub struct JavaScriptError {
    /// Level, normally `Error`.
    pub level: LogLevel,
    /// Error message.
    pub text: String,
    /// Milliseconds since the epoch.
    pub timestamp: u64,
    /// Stack frames, innermost first.
    pub stack: Vec<StackFrame>,
    /// Originating browsing context.
    pub context: Option<BrowsingContextId>,
}

/// A browser log entry.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    /// Console message.
    Console(ConsoleMessage),
    /// JavaScript error.
    JavaScriptError(JavaScriptError),
}

impl LogEntry {
    /// Returns the kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> LogKind {
        match self {
            Self::Console(_) => LogKind::Console,
            Self::JavaScriptError(_) => LogKind::JavaScript,
        }
    }

    /// Returns the level.
    #[inline]
    #[must_use]
    pub fn level(&self) -> LogLevel {
        match self {
            Self::Console(m) => m.level,
            Self::JavaScriptError(e) => e.level,
        }
    }

    /// Returns the text.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Console(m) => &m.text,
            Self::JavaScriptError(e) => &e.text,
        }
    }

    /// Returns the timestamp in milliseconds since the epoch.
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Console(m) => m.timestamp,
            Self::JavaScriptError(e) => e.timestamp,
        }
    }

    /// Returns the stack frames.
    #[inline]
    #[must_use]
    pub fn stack(&self) -> &[StackFrame] {
        match self {
            Self::Console(m) => &m.stack,
            Self::JavaScriptError(e) => &e.stack,
        }
    }

    /// Parses `log.entryAdded` params.
    ///
    /// Returns `None` for entry types other than `console` and `javascript`.
    #[must_use]
    pub fn from_params(params: &Value) -> Option<Self> {
        let raw: RawEntry = serde_json::from_value(params.clone()).ok()?;
        let level = LogLevel::parse(&raw.level);
        let stack = raw.stack_trace.map(|s| s.call_frames).unwrap_or_default();
        let context = raw.source.and_then(|s| s.context);

        match raw.kind.as_str() {
            "console" => {
                let args: Vec<Value> = raw.args.iter().map(remote_value).collect();
                let text = raw.text.unwrap_or_else(|| render_args(&args));
                Some(Self::Console(ConsoleMessage {
                    level,
                    text,
                    timestamp: raw.timestamp,
                    method: raw.method.unwrap_or_else(|| "log".to_string()),
                    args,
                    stack,
                    context,
                }))
            }
            "javascript" => Some(Self::JavaScriptError(JavaScriptError {
                level,
                text: raw.text.unwrap_or_default(),
                timestamp: raw.timestamp,
                stack,
                context,
            })),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    level: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    timestamp: u64,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    args: Vec<Value>,
    #[serde(default)]
    stack_trace: Option<RawStackTrace>,
    #[serde(default)]
    source: Option<RawSource>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStackTrace {
    #[serde(default)]
    call_frames: Vec<StackFrame>,
}

#[derive(Deserialize)]
struct RawSource {
    #[serde(default)]
    context: Option<BrowsingContextId>,
}

fn render_args(args: &[Value]) -> String {
    args.iter()
        .map(|a| match a {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Remote Values
// ============================================================================

/// Converts a BiDi `script.RemoteValue` into plain JSON.
///
/// | Remote type | Result |
/// |-------------|--------|
/// | `undefined`, `null` | `null` |
/// | `string`, `boolean`, `number` | the value (`NaN` and infinities as strings) |
/// | `bigint` | decimal string |
/// | `array`, `set` | array, recursively |
/// | `object`, `map` | object, recursively; non-string keys are stringified |
/// | `regexp` | `/pattern/flags` |
/// | `date` | the ISO string |
/// | `node`, `window` | `[node]`, `[window]` |
/// | anything else | `[type]` |
#[must_use]
pub fn remote_value(value: &Value) -> Value {
    let kind = value.get("type").and_then(Value::as_str).unwrap_or("undefined");
    let inner = value.get("value");

    match kind {
        "undefined" | "null" => Value::Null,
        "string" | "boolean" => inner.cloned().unwrap_or(Value::Null),
        "number" => match inner {
            Some(Value::String(special)) if special == "-0" => Number::from_f64(-0.0)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Some(v) => v.clone(),
            None => Value::Null,
        },
        "bigint" => inner.cloned().unwrap_or(Value::Null),
        "array" | "set" => Value::Array(
            inner
                .and_then(Value::as_array)
                .map(|items| items.iter().map(remote_value).collect())
                .unwrap_or_default(),
        ),
        "object" | "map" => {
            let mut map = Map::new();
            for pair in inner.and_then(Value::as_array).into_iter().flatten() {
                let Some((key, val)) = pair
                    .as_array()
                    .and_then(|p| Some((p.first()?, p.get(1)?)))
                else {
                    continue;
                };
                let key = match key {
                    Value::String(s) => s.clone(),
                    other => match remote_value(other) {
                        Value::String(s) => s,
                        rendered => rendered.to_string(),
                    },
                };
                map.insert(key, remote_value(val));
            }
            Value::Object(map)
        }
        "regexp" => {
            let pattern = inner
                .and_then(|v| v.get("pattern"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let flags = inner
                .and_then(|v| v.get("flags"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            Value::String(format!("/{pattern}/{flags}"))
        }
        "date" => inner.cloned().unwrap_or(Value::Null),
        other => Value::String(format!("[{other}]")),
    }
}

// ============================================================================
// LogBuffer
// ============================================================================

/// Bounded FIFO of log entries.
#[derive(Debug)]
struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
        }
    }

    /// Appends an entry, evicting the oldest when full.
    fn push(&mut self, entry: LogEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    fn filtered(&self, kind: Option<LogKind>) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|e| kind.is_none_or(|k| e.kind() == k))
            .cloned()
            .collect()
    }
}

// ============================================================================
// Subscribers
// ============================================================================

type Callback = Arc<dyn Fn(&LogEntry) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    All,
    Level(LogLevel),
    Kind(LogKind),
}

impl Filter {
    /// Delivery rank: all-entry subscribers first, then level, then kind.
    fn rank(self) -> u8 {
        match self {
            Self::All => 0,
            Self::Level(_) => 1,
            Self::Kind(_) => 2,
        }
    }

    fn accepts(self, entry: &LogEntry) -> bool {
        match self {
            Self::All => true,
            Self::Level(level) => entry.level() == level,
            Self::Kind(kind) => entry.kind() == kind,
        }
    }
}

struct Subscriber {
    id: SubscriptionId,
    filter: Filter,
    callback: Callback,
}

/// Unsubscribes a waiter when its future completes or is dropped.
struct WaiterGuard {
    monitor: LogMonitor,
    id: SubscriptionId,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.monitor.unsubscribe(self.id);
    }
}

// ============================================================================
// LogMonitor
// ============================================================================

struct MonitorInner {
    bidi: BidiConnection,
    buffer: Mutex<LogBuffer>,
    subscribers: Mutex<Vec<Subscriber>>,
    ids: IdSequence,
    listener: Mutex<Option<ListenerId>>,
}

impl MonitorInner {
    fn ingest(&self, entry: LogEntry) {
        trace!(kind = ?entry.kind(), level = %entry.level(), "Log entry");
        self.buffer.lock().push(entry.clone());

        let mut targets: Vec<(Filter, Callback)> = self
            .subscribers
            .lock()
            .iter()
            .filter(|s| s.filter.accepts(&entry))
            .map(|s| (s.filter, Arc::clone(&s.callback)))
            .collect();
        targets.sort_by_key(|(filter, _)| filter.rank());

        for (_, callback) in &targets {
            if catch_unwind(AssertUnwindSafe(|| callback(&entry))).is_err() {
                error!(level = %entry.level(), "Log subscriber panicked");
            }
        }
    }
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        if let Some(id) = self.listener.get_mut().take() {
            self.bidi.off(id);
        }
    }
}

/// Console and error log collector for one BiDi connection.
///
/// Cheap to clone. Obtain it with [`Session::logs`](crate::Session::logs).
#[derive(Clone)]
pub struct LogMonitor {
    inner: Arc<MonitorInner>,
}

impl fmt::Debug for LogMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buffer = self.inner.buffer.lock();
        f.debug_struct("LogMonitor")
            .field("entries", &buffer.entries.len())
            .field("capacity", &buffer.capacity)
            .finish_non_exhaustive()
    }
}

impl LogMonitor {
    /// Subscribes to `log.entryAdded` and starts collecting.
    ///
    /// # Errors
    ///
    /// Returns the `session.subscribe` failure.
    pub async fn start(bidi: BidiConnection, options: LogMonitorOptions) -> Result<Self> {
        bidi.subscribe(&[LOG_ENTRY_ADDED], None).await?;

        let monitor = Self {
            inner: Arc::new(MonitorInner {
                bidi: bidi.clone(),
                buffer: Mutex::new(LogBuffer::new(options.capacity)),
                subscribers: Mutex::new(Vec::new()),
                ids: IdSequence::new(),
                listener: Mutex::new(None),
            }),
        };

        let weak: Weak<MonitorInner> = Arc::downgrade(&monitor.inner);
        let id = bidi.on(LOG_ENTRY_ADDED, move |event: &Event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match LogEntry::from_params(&event.params) {
                Some(entry) => inner.ingest(entry),
                None => warn!(params = %event.params, "Unrecognized log entry"),
            }
        });
        *monitor.inner.listener.lock() = Some(id);

        debug!(capacity = options.capacity, "Log monitor started");
        Ok(monitor)
    }

    // ========================================================================
    // Buffer
    // ========================================================================

    /// Returns all retained entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.inner.buffer.lock().filtered(None)
    }

    /// Returns retained console messages.
    #[must_use]
    pub fn console_messages(&self) -> Vec<LogEntry> {
        self.inner.buffer.lock().filtered(Some(LogKind::Console))
    }

    /// Returns retained JavaScript errors.
    #[must_use]
    pub fn errors(&self) -> Vec<LogEntry> {
        self.inner.buffer.lock().filtered(Some(LogKind::JavaScript))
    }

    /// Drops all retained entries. Subscribers are kept.
    pub fn clear(&self) {
        self.inner.buffer.lock().entries.clear();
    }

    /// Returns the number of retained entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.buffer.lock().entries.len()
    }

    /// Returns `true` if nothing is retained.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Calls `callback` for every entry.
    pub fn on_entry<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        self.subscribe(Filter::All, Arc::new(callback))
    }

    /// Calls `callback` for entries of `level`.
    pub fn on_level<F>(&self, level: LogLevel, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        self.subscribe(Filter::Level(level), Arc::new(callback))
    }

    /// Calls `callback` for console messages.
    pub fn on_console<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        self.subscribe(Filter::Kind(LogKind::Console), Arc::new(callback))
    }

    /// Calls `callback` for JavaScript errors.
    pub fn on_error<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        self.subscribe(Filter::Kind(LogKind::JavaScript), Arc::new(callback))
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        before != subscribers.len()
    }

    fn subscribe(&self, filter: Filter, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId::from_raw(self.inner.ids.next_raw());
        self.inner.subscribers.lock().push(Subscriber {
            id,
            filter,
            callback,
        });
        id
    }

    // ========================================================================
    // Waiting
    // ========================================================================

    /// Resolves with the first console message after this call that
    /// satisfies `predicate`.
    ///
    /// The subscription is registered immediately, so the returned future
    /// can be created before triggering the message. The deadline also
    /// starts at the call. Dropping the future removes the subscription.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if no message matches within `timeout`.
    pub fn wait_for_message<P>(
        &self,
        predicate: P,
        timeout: Duration,
    ) -> impl Future<Output = Result<LogEntry>> + Send + use<P>
    where
        P: Fn(&LogEntry) -> bool + Send + Sync + 'static,
    {
        self.wait_for(Filter::Kind(LogKind::Console), "console message".to_string(), predicate, timeout)
    }

    /// Resolves with the first JavaScript error after this call that
    /// satisfies `predicate`.
    pub fn wait_for_error<P>(
        &self,
        predicate: P,
        timeout: Duration,
    ) -> impl Future<Output = Result<LogEntry>> + Send + use<P>
    where
        P: Fn(&LogEntry) -> bool + Send + Sync + 'static,
    {
        self.wait_for(Filter::Kind(LogKind::JavaScript), "javascript error".to_string(), predicate, timeout)
    }

    /// [`LogMonitor::wait_for_message`] matching the text against `pattern`.
    pub fn wait_for_message_matching(
        &self,
        pattern: &Regex,
        timeout: Duration,
    ) -> impl Future<Output = Result<LogEntry>> + Send + use<> {
        let re = pattern.clone();
        self.wait_for(
            Filter::Kind(LogKind::Console),
            format!("console message matching /{pattern}/"),
            move |e| re.is_match(e.text()),
            timeout,
        )
    }

    /// [`LogMonitor::wait_for_error`] matching the text against `pattern`.
    pub fn wait_for_error_matching(
        &self,
        pattern: &Regex,
        timeout: Duration,
    ) -> impl Future<Output = Result<LogEntry>> + Send + use<> {
        let re = pattern.clone();
        self.wait_for(
            Filter::Kind(LogKind::JavaScript),
            format!("javascript error matching /{pattern}/"),
            move |e| re.is_match(e.text()),
            timeout,
        )
    }

    fn wait_for<P>(
        &self,
        filter: Filter,
        operation: String,
        predicate: P,
        timeout: Duration,
    ) -> impl Future<Output = Result<LogEntry>> + Send + use<P>
    where
        P: Fn(&LogEntry) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));

        let id = self.subscribe(
            filter,
            Arc::new(move |entry: &LogEntry| {
                if predicate(entry)
                    && let Some(tx) = tx.lock().take()
                {
                    let _ = tx.send(entry.clone());
                }
            }),
        );

        let guard = WaiterGuard {
            monitor: self.clone(),
            id,
        };
        let deadline = Instant::now() + timeout;
        async move {
            let result = tokio::time::timeout_at(deadline, rx).await;
            drop(guard);

            match result {
                Ok(Ok(entry)) => Ok(entry),
                Ok(Err(e)) => Err(Error::from(e)),
                Err(_) => Err(Error::timeout(operation, timeout.as_millis() as u64, None)),
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
