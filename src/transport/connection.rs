//! BiDi WebSocket connection and event loop.
//!
//! One [`BidiConnection`] owns one socket to the remote end and multiplexes
//! every BiDi consumer (network interception, log monitor, storage) over it.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming messages (responses, events)
//! - Outgoing commands from the Rust API
//! - Request/response correlation by monotonic [`CommandId`]
//! - Synchronous event fan-out to registered listeners
//!
//! # State Machine
//!
//! ```text
//! Disconnected ──open──► Connecting ──handshake──► Connected
//!      ▲                     │                         │
//!      │◄──── failure ───────┘                     close / socket loss
//!      │                                               ▼
//!      └───────────────────────────────────────── Closing
//!      (auto-reconnect: Disconnected ──backoff──► Connecting)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, to_string};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{BrowsingContextId, CommandId, IdSequence, ListenerId};
use crate::protocol::{Command, Event, Inbound, Request, Response, SessionCommand};

use super::listeners::{EventListener, ListenerRegistry, WILDCARD};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for the WebSocket handshake.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for command execution.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay before a reconnect attempt.
const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Default maximum pending commands before rejecting new ones.
const DEFAULT_MAX_PENDING: usize = 1000;

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Map of command IDs to response channels.
type CorrelationMap = FxHashMap<CommandId, oneshot::Sender<Result<Response>>>;

// ============================================================================
// BidiOptions
// ============================================================================

/// Tuning for a [`BidiConnection`].
#[derive(Debug, Clone)]
pub struct BidiOptions {
    /// WebSocket handshake timeout.
    pub connect_timeout: Duration,
    /// Per-command response timeout.
    pub command_timeout: Duration,
    /// Reconnect after an unexpected socket loss.
    pub auto_reconnect: bool,
    /// Delay before each reconnect attempt.
    pub reconnect_backoff: Duration,
    /// Maximum in-flight commands.
    pub max_pending: usize,
}

impl Default for BidiOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            auto_reconnect: false,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a [`BidiConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Socket open; commands accepted.
    Connected,
    /// Close requested; waiting for the event loop to finish.
    Closing,
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a request and wait for response.
    Send {
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(CommandId),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// Inner
// ============================================================================

/// Subscription remembered for replay after a reconnect.
#[derive(Debug, Clone, PartialEq)]
struct Subscription {
    events: Vec<String>,
    contexts: Option<Vec<BrowsingContextId>>,
}

struct Inner {
    url: String,
    options: BidiOptions,
    ids: IdSequence,
    state: watch::Sender<ConnectionState>,
    command_tx: Mutex<Option<mpsc::UnboundedSender<ConnectionCommand>>>,
    correlation: Arc<Mutex<CorrelationMap>>,
    listeners: Arc<ListenerRegistry>,
    subscriptions: Mutex<Vec<Subscription>>,
    closed: AtomicBool,
}

impl Inner {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(url = %self.url, ?previous, ?state, "BiDi state change");
        }
    }
}

// ============================================================================
// BidiConnection
// ============================================================================

/// WebSocket connection to a BiDi remote end.
///
/// Cloning is cheap; all clones share one socket, one pending map and one
/// listener registry.
#[derive(Clone)]
pub struct BidiConnection {
    inner: Arc<Inner>,
}

/// Non-owning handle to a [`BidiConnection`].
///
/// Event listeners hold this instead of a full connection so that the
/// listener registry does not keep its own connection alive.
#[derive(Clone)]
pub struct WeakBidiConnection {
    inner: Weak<Inner>,
}

impl fmt::Debug for BidiConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BidiConnection")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for WeakBidiConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakBidiConnection")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl WeakBidiConnection {
    /// Returns the connection if it is still alive.
    #[inline]
    #[must_use]
    pub fn upgrade(&self) -> Option<BidiConnection> {
        self.inner.upgrade().map(|inner| BidiConnection { inner })
    }
}

impl BidiConnection {
    /// Opens a connection to `url`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the handshake exceeds `connect_timeout`
    /// - [`Error::WebSocket`] if the handshake fails
    pub async fn connect(url: impl Into<String>, options: BidiOptions) -> Result<Self> {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let inner = Arc::new(Inner {
            url: url.into(),
            options,
            ids: IdSequence::new(),
            state,
            command_tx: Mutex::new(None),
            correlation: Arc::new(Mutex::new(CorrelationMap::default())),
            listeners: Arc::new(ListenerRegistry::new()),
            subscriptions: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });

        open(Arc::clone(&inner)).await?;
        Ok(Self { inner })
    }

    /// Returns the WebSocket URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Returns `true` if commands can be sent.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns a receiver observing state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Returns a non-owning handle.
    #[inline]
    #[must_use]
    pub fn downgrade(&self) -> WeakBidiConnection {
        WeakBidiConnection {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Returns the number of pending commands.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.correlation.lock().len()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Sends a command and waits for its result with the default timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Bidi`] if the remote end answered with an error
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        self.send_with_timeout(method, params, self.inner.options.command_timeout)
            .await
    }

    /// Sends a typed command.
    ///
    /// # Errors
    ///
    /// See [`BidiConnection::send`].
    pub async fn send_command(&self, command: Command) -> Result<Value> {
        let (method, params) = command.into_parts()?;
        self.send(&method, params).await
    }

    /// Sends a command and waits for its result with a custom timeout.
    ///
    /// On timeout the pending entry is evicted; a late response is then
    /// logged and dropped.
    ///
    /// # Errors
    ///
    /// See [`BidiConnection::send`].
    pub async fn send_with_timeout(
        &self,
        method: &str,
        params: Value,
        request_timeout: Duration,
    ) -> Result<Value> {
        let command_tx = self
            .inner
            .command_tx
            .lock()
            .clone()
            .ok_or(Error::ConnectionClosed)?;

        {
            let pending = self.inner.correlation.lock().len();
            let max = self.inner.options.max_pending;
            if pending >= max {
                warn!(pending, max, "Too many pending commands");
                return Err(Error::connection(format!(
                    "Too many pending commands: {pending}/{max}"
                )));
            }
        }

        let id = CommandId::from_raw(self.inner.ids.next_raw());
        let request = Request::new(id, method, params);
        let (response_tx, response_rx) = oneshot::channel();

        command_tx
            .send(ConnectionCommand::Send {
                request,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result?.into_result(method),
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = command_tx.send(ConnectionCommand::RemoveCorrelation(id));
                Err(Error::request_timeout(
                    id,
                    method,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Subscribes to events, optionally restricted to browsing contexts.
    ///
    /// # Errors
    ///
    /// Returns the `session.subscribe` failure.
    pub async fn subscribe(
        &self,
        events: &[&str],
        contexts: Option<Vec<BrowsingContextId>>,
    ) -> Result<()> {
        let events: Vec<String> = events.iter().map(|e| e.to_string()).collect();
        debug!(?events, "Subscribing");

        self.send_command(Command::Session(SessionCommand::Subscribe {
            events: events.clone(),
            contexts: contexts.clone(),
        }))
        .await?;

        self.inner
            .subscriptions
            .lock()
            .push(Subscription { events, contexts });
        Ok(())
    }

    /// Removes a subscription previously made with the same arguments.
    ///
    /// # Errors
    ///
    /// Returns the `session.unsubscribe` failure.
    pub async fn unsubscribe(
        &self,
        events: &[&str],
        contexts: Option<Vec<BrowsingContextId>>,
    ) -> Result<()> {
        let events: Vec<String> = events.iter().map(|e| e.to_string()).collect();
        debug!(?events, "Unsubscribing");

        self.send_command(Command::Session(SessionCommand::Unsubscribe {
            events: events.clone(),
            contexts: contexts.clone(),
        }))
        .await?;

        let removed = Subscription { events, contexts };
        self.inner.subscriptions.lock().retain(|s| *s != removed);
        Ok(())
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Registers a listener for one event method.
    pub fn on<F>(&self, method: &str, listener: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.listeners.add(method, Arc::new(listener))
    }

    /// Registers a listener for every event.
    pub fn on_any<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let listener: EventListener = Arc::new(listener);
        self.inner.listeners.add(WILDCARD, listener)
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Closes the socket and waits for the event loop to finish.
    ///
    /// Pending commands fail with [`Error::ConnectionClosed`]. Auto-reconnect
    /// is disabled permanently.
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);

        let command_tx = self.inner.command_tx.lock().take();
        let Some(command_tx) = command_tx else {
            return;
        };

        self.inner.set_state(ConnectionState::Closing);
        let _ = command_tx.send(ConnectionCommand::Shutdown);

        let mut state_rx = self.inner.state.subscribe();
        let _ = state_rx
            .wait_for(|s| *s == ConnectionState::Disconnected)
            .await;
    }
}

// ============================================================================
// Open / Reconnect
// ============================================================================

/// Performs the handshake and starts the event loop.
///
/// Boxed because the event loop may schedule a reconnect that calls back
/// into this function.
fn open(inner: Arc<Inner>) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        inner.set_state(ConnectionState::Connecting);
        let connect_timeout = inner.options.connect_timeout;

        let ws_stream = match timeout(connect_timeout, connect_async(inner.url.as_str())).await {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(e)) => {
                inner.set_state(ConnectionState::Disconnected);
                return Err(e.into());
            }
            Err(_) => {
                inner.set_state(ConnectionState::Disconnected);
                return Err(Error::connection_timeout(connect_timeout.as_millis() as u64));
            }
        };

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        *inner.command_tx.lock() = Some(command_tx);
        inner.set_state(ConnectionState::Connected);
        info!(url = %inner.url, "BiDi connected");

        tokio::spawn(run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&inner.correlation),
            Arc::clone(&inner.listeners),
            Arc::downgrade(&inner),
        ));

        Ok(())
    })
}

/// Transitions to `Disconnected` and schedules a reconnect if enabled.
fn on_socket_closed(inner: &Arc<Inner>) {
    inner.command_tx.lock().take();
    inner.set_state(ConnectionState::Disconnected);

    if inner.options.auto_reconnect && !inner.closed.load(Ordering::SeqCst) {
        schedule_reconnect(inner);
    }
}

fn schedule_reconnect(inner: &Arc<Inner>) {
    let weak = Arc::downgrade(inner);
    let backoff = inner.options.reconnect_backoff;
    debug!(backoff_ms = backoff.as_millis() as u64, "Reconnect scheduled");

    tokio::spawn(async move {
        tokio::time::sleep(backoff).await;

        let Some(inner) = weak.upgrade() else {
            return;
        };
        if inner.closed.load(Ordering::SeqCst) || *inner.state.borrow() != ConnectionState::Disconnected {
            return;
        }

        match open(Arc::clone(&inner)).await {
            Ok(()) => resubscribe(&inner).await,
            Err(e) => {
                warn!(error = %e, "Reconnect failed");
                schedule_reconnect(&inner);
            }
        }
    });
}

/// Replays remembered subscriptions on a fresh socket.
async fn resubscribe(inner: &Arc<Inner>) {
    let subscriptions = inner.subscriptions.lock().clone();
    let connection = BidiConnection {
        inner: Arc::clone(inner),
    };

    for sub in subscriptions {
        let command = Command::Session(SessionCommand::Subscribe {
            events: sub.events.clone(),
            contexts: sub.contexts.clone(),
        });
        if let Err(e) = connection.send_command(command).await {
            warn!(events = ?sub.events, error = %e, "Resubscribe failed");
        }
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Event loop that handles WebSocket I/O.
async fn run_event_loop(
    ws_stream: WsStream,
    mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    correlation: Arc<Mutex<CorrelationMap>>,
    listeners: Arc<ListenerRegistry>,
    owner: Weak<Inner>,
) {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        handle_incoming_message(&text, &correlation, &listeners);
                    }

                    Some(Ok(Message::Close(_))) => {
                        debug!("WebSocket closed by remote");
                        break;
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            command = command_rx.recv() => {
                match command {
                    Some(ConnectionCommand::Send { request, response_tx }) => {
                        handle_send_command(request, response_tx, &mut ws_write, &correlation).await;
                    }

                    Some(ConnectionCommand::RemoveCorrelation(command_id)) => {
                        correlation.lock().remove(&command_id);
                        debug!(%command_id, "Removed timed-out correlation");
                    }

                    Some(ConnectionCommand::Shutdown) => {
                        debug!("Shutdown command received");
                        let _ = ws_write.close().await;
                        break;
                    }

                    None => {
                        debug!("Command channel closed");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }

    fail_pending_requests(&correlation);

    if let Some(inner) = owner.upgrade() {
        on_socket_closed(&inner);
    }

    debug!("Event loop terminated");
}

/// Routes one inbound text frame.
fn handle_incoming_message(
    text: &str,
    correlation: &Arc<Mutex<CorrelationMap>>,
    listeners: &ListenerRegistry,
) {
    trace!(len = text.len(), "Inbound frame");

    match Inbound::parse(text) {
        Ok(Inbound::Response(response)) => {
            let Some(command_id) = response.id else {
                warn!(
                    error = response.error.as_deref().unwrap_or_default(),
                    message = response.message.as_deref().unwrap_or_default(),
                    "Error response without command id"
                );
                return;
            };

            let tx = correlation.lock().remove(&command_id);
            match tx {
                Some(tx) => {
                    let _ = tx.send(Ok(response));
                }
                None => warn!(%command_id, "Response for unknown command"),
            }
        }

        Ok(Inbound::Event(event)) => {
            let delivered = listeners.dispatch(&event);
            trace!(method = %event.method, delivered, "Event dispatched");
        }

        Err(e) => warn!(error = %e, "Failed to parse inbound message"),
    }
}

/// Serializes and writes one request, registering its correlation first.
async fn handle_send_command(
    request: Request,
    response_tx: oneshot::Sender<Result<Response>>,
    ws_write: &mut SplitSink<WsStream, Message>,
    correlation: &Arc<Mutex<CorrelationMap>>,
) {
    let command_id = request.id;

    let json = match to_string(&request) {
        Ok(j) => j,
        Err(e) => {
            let _ = response_tx.send(Err(Error::Json(e)));
            return;
        }
    };

    correlation.lock().insert(command_id, response_tx);

    if let Err(e) = ws_write.send(Message::Text(json.into())).await
        && let Some(tx) = correlation.lock().remove(&command_id)
    {
        let _ = tx.send(Err(Error::connection(e.to_string())));
    }

    trace!(%command_id, method = %request.method, "Request sent");
}

/// Fails all pending requests with ConnectionClosed error.
fn fail_pending_requests(correlation: &Arc<Mutex<CorrelationMap>>) {
    let pending: Vec<_> = correlation.lock().drain().collect();
    let count = pending.len();

    for (_, tx) in pending {
        let _ = tx.send(Err(Error::ConnectionClosed));
    }

    if count > 0 {
        debug!(count, "Failed pending requests on close");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::FakeRemote;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn quick_options() -> BidiOptions {
        BidiOptions {
            command_timeout: Duration::from_secs(5),
            ..BidiOptions::default()
        }
    }

    #[test]
    fn test_default_options() {
        let options = BidiOptions::default();
        assert_eq!(options.connect_timeout.as_secs(), 10);
        assert_eq!(options.command_timeout.as_secs(), 30);
        assert!(!options.auto_reconnect);
        assert_eq!(options.reconnect_backoff.as_secs(), 1);
        assert_eq!(options.max_pending, 1000);
    }

    #[tokio::test]
    async fn test_send_resolves_result() {
        let mut remote = FakeRemote::start().await;
        let conn = BidiConnection::connect(remote.url(), quick_options())
            .await
            .expect("connect");
        assert!(conn.is_connected());

        let call = tokio::spawn({
            let conn = conn.clone();
            async move { conn.send("session.status", Value::Null).await }
        });

        let command = remote.expect_command("session.status").await;
        assert_eq!(command["params"], json!({}));
        remote.reply(&command, json!({ "ready": true }));

        let result = call.await.expect("join").expect("send");
        assert_eq!(result["ready"], true);
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let mut remote = FakeRemote::start().await;
        let conn = BidiConnection::connect(remote.url(), quick_options())
            .await
            .expect("connect");

        for _ in 0..3 {
            let c = conn.clone();
            tokio::spawn(async move { c.send("session.status", Value::Null).await });
        }

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(remote.next_command().await["id"].as_u64().expect("id"));
        }
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_out_of_order_responses_are_correlated() {
        let mut remote = FakeRemote::start().await;
        let conn = BidiConnection::connect(remote.url(), quick_options())
            .await
            .expect("connect");

        let mut calls = Vec::new();
        for n in 0..5 {
            let c = conn.clone();
            calls.push(tokio::spawn(async move {
                c.send("test.echo", json!({ "n": n })).await
            }));
        }

        let mut commands = Vec::new();
        for _ in 0..5 {
            commands.push(remote.next_command().await);
        }
        for command in commands.iter().rev() {
            remote.reply(command, json!({ "n": command["params"]["n"] }));
        }

        for (n, call) in calls.into_iter().enumerate() {
            let result = call.await.expect("join").expect("send");
            assert_eq!(result["n"], n);
        }
    }

    #[tokio::test]
    async fn test_error_response_carries_remote_code() {
        let mut remote = FakeRemote::start().await;
        let conn = BidiConnection::connect(remote.url(), quick_options())
            .await
            .expect("connect");

        let call = tokio::spawn({
            let conn = conn.clone();
            async move { conn.send("network.removeIntercept", json!({ "intercept": "x" })).await }
        });

        let command = remote.next_command().await;
        remote.reply_error(&command, "no such intercept", "unknown intercept x");

        let err = call.await.expect("join").expect_err("remote error");
        assert_eq!(err.remote_code(), Some("no such intercept"));
        assert!(err.to_string().contains("unknown intercept x"));
    }

    #[tokio::test]
    async fn test_command_timeout_evicts_pending_entry() {
        let mut remote = FakeRemote::start().await;
        let conn = BidiConnection::connect(remote.url(), quick_options())
            .await
            .expect("connect");

        let err = conn
            .send_with_timeout("session.status", Value::Null, Duration::from_millis(50))
            .await
            .expect_err("timeout");

        assert!(matches!(err, Error::RequestTimeout { .. }));
        let command = remote.next_command().await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(conn.pending_count(), 0);

        // Late reply is dropped without disturbing the connection.
        remote.reply(&command, json!({}));
        assert!(conn.is_connected());
    }

    #[tokio::test]
    async fn test_socket_close_fails_pending_commands() {
        let mut remote = FakeRemote::start().await;
        let conn = BidiConnection::connect(remote.url(), quick_options())
            .await
            .expect("connect");

        let call = tokio::spawn({
            let conn = conn.clone();
            async move { conn.send("session.status", Value::Null).await }
        });

        remote.next_command().await;
        remote.disconnect();

        let err = call.await.expect("join").expect_err("closed");
        assert!(matches!(err, Error::ConnectionClosed));

        let mut state = conn.watch_state();
        let _ = timeout(
            Duration::from_secs(2),
            state.wait_for(|s| *s == ConnectionState::Disconnected),
        )
        .await
        .expect("disconnected");
        assert!(matches!(
            conn.send("session.status", Value::Null).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_event_fan_out_with_panicking_listener() {
        let remote = FakeRemote::start().await;
        let conn = BidiConnection::connect(remote.url(), quick_options())
            .await
            .expect("connect");

        let hits = Arc::new(AtomicUsize::new(0));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        let h = Arc::clone(&hits);
        conn.on("log.entryAdded", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        conn.on("log.entryAdded", |_| panic!("listener failure"));
        let h = Arc::clone(&hits);
        conn.on_any(move |event| {
            h.fetch_add(1, Ordering::SeqCst);
            let _ = done_tx.send(event.method.clone());
        });

        remote.emit("log.entryAdded", json!({ "text": "hello" }));

        let method = timeout(Duration::from_secs(2), done_rx.recv())
            .await
            .expect("event")
            .expect("method");
        assert_eq!(method, "log.entryAdded");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_subscribe_sends_session_command() {
        let mut remote = FakeRemote::start().await;
        let conn = BidiConnection::connect(remote.url(), quick_options())
            .await
            .expect("connect");

        let call = tokio::spawn({
            let conn = conn.clone();
            async move { conn.subscribe(&["log.entryAdded"], None).await }
        });

        let command = remote.answer("session.subscribe", json!({})).await;
        assert_eq!(command["params"]["events"], json!(["log.entryAdded"]));
        call.await.expect("join").expect("subscribe");
    }

    #[tokio::test]
    async fn test_close_transitions_to_disconnected() {
        let remote = FakeRemote::start().await;
        let conn = BidiConnection::connect(remote.url(), quick_options())
            .await
            .expect("connect");

        conn.close().await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_auto_reconnect_replays_subscriptions() {
        let mut remote = FakeRemote::start().await;
        let options = BidiOptions {
            auto_reconnect: true,
            reconnect_backoff: Duration::from_millis(20),
            ..quick_options()
        };
        let conn = BidiConnection::connect(remote.url(), options)
            .await
            .expect("connect");

        let call = tokio::spawn({
            let conn = conn.clone();
            async move { conn.subscribe(&["log.entryAdded"], None).await }
        });
        remote.answer("session.subscribe", json!({})).await;
        call.await.expect("join").expect("subscribe");

        remote.disconnect();

        let replay = remote.expect_command("session.subscribe").await;
        assert_eq!(replay["params"]["events"], json!(["log.entryAdded"]));
        remote.reply(&replay, json!({}));
        assert!(conn.is_connected());
        conn.close().await;
    }

    #[tokio::test]
    async fn test_debug_shows_state() {
        let remote = FakeRemote::start().await;
        let conn = BidiConnection::connect(remote.url(), quick_options())
            .await
            .expect("connect");

        let text = format!("{conn:?}");
        assert!(text.contains("Connected"));
        assert!(text.contains("pending: 0"));

        let weak = conn.downgrade();
        assert!(format!("{weak:?}").contains("alive: true"));
        drop(conn);
        assert!(format!("{weak:?}").contains("alive: false"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let err = BidiConnection::connect(format!("ws://{addr}"), quick_options())
            .await
            .err()
            .expect("refused");
        assert!(err.is_connection_error());
    }
}
