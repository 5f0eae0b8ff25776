//! In-process fakes for the two transports, used by unit tests.
//!
//! - [`FakeRemote`] is a BiDi remote end on `127.0.0.1:0` that forwards every
//!   command to the test and lets it script replies and events.
//! - [`MockTransport`] is an [`HttpTransport`] answering from a route table
//!   and recording every call.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{Error, Result};
use crate::protocol::HttpMethod;

use super::http::HttpTransport;

// ============================================================================
// FakeRemote
// ============================================================================

enum Outbound {
    Text(String),
    Close,
}

/// Scriptable BiDi remote end. Accepts connections one after another so
/// reconnects land on the same fake.
pub(crate) struct FakeRemote {
    url: String,
    inbound: mpsc::UnboundedReceiver<Value>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl FakeRemote {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        tokio::spawn(serve(listener, in_tx, out_rx));

        Self {
            url: format!("ws://{addr}"),
            inbound: in_rx,
            outbound: out_tx,
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    /// Next command sent by the client.
    pub(crate) async fn next_command(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(5), self.inbound.recv())
            .await
            .expect("command within 5s")
            .expect("fake remote alive")
    }

    /// Next command, asserting its method.
    pub(crate) async fn expect_command(&mut self, method: &str) -> Value {
        let command = self.next_command().await;
        assert_eq!(command["method"], method, "unexpected command: {command}");
        command
    }

    /// Expects `method` and answers it with `result`.
    pub(crate) async fn answer(&mut self, method: &str, result: Value) -> Value {
        let command = self.expect_command(method).await;
        self.reply(&command, result);
        command
    }

    pub(crate) fn reply(&self, command: &Value, result: Value) {
        self.send_json(json!({ "id": command["id"], "type": "success", "result": result }));
    }

    pub(crate) fn reply_error(&self, command: &Value, code: &str, message: &str) {
        self.send_json(json!({
            "id": command["id"],
            "type": "error",
            "error": code,
            "message": message
        }));
    }

    pub(crate) fn emit(&self, method: &str, params: Value) {
        self.send_json(json!({ "type": "event", "method": method, "params": params }));
    }

    pub(crate) fn send_raw(&self, text: &str) {
        let _ = self.outbound.send(Outbound::Text(text.to_string()));
    }

    /// Closes the current socket from the remote side.
    pub(crate) fn disconnect(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }

    fn send_json(&self, value: Value) {
        self.send_raw(&value.to_string());
    }
}

async fn serve(
    listener: TcpListener,
    in_tx: mpsc::UnboundedSender<Value>,
    mut out_rx: mpsc::UnboundedReceiver<Outbound>,
) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(ws) = accept_async(stream).await else {
            continue;
        };
        let (mut write, mut read) = ws.split();

        loop {
            tokio::select! {
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(value) = serde_json::from_str::<Value>(&text) {
                            let _ = in_tx.send(value);
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                },
                outbound = out_rx.recv() => match outbound {
                    Some(Outbound::Text(text)) => {
                        if write.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Close) => {
                        let _ = write.close().await;
                        break;
                    }
                    None => return,
                },
            }
        }
    }
}

// ============================================================================
// MockTransport
// ============================================================================

/// Scripted reply for [`MockTransport`].
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Value(Value),
    Error(&'static str, &'static str),
}

struct RouteEntry {
    method: HttpMethod,
    path: String,
    replies: VecDeque<Reply>,
}

/// Recorded call.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
}

/// Route-table HTTP fake. Queued replies for one route are consumed in
/// order; the last one repeats.
#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<Vec<RouteEntry>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(&self, method: HttpMethod, path: &str, value: Value) -> &Self {
        self.push(method, path, Reply::Value(value))
    }

    pub(crate) fn on_error(
        &self,
        method: HttpMethod,
        path: &str,
        code: &'static str,
        message: &'static str,
    ) -> &Self {
        self.push(method, path, Reply::Error(code, message))
    }

    fn push(&self, method: HttpMethod, path: &str, reply: Reply) -> &Self {
        let mut routes = self.routes.lock();
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(RouteEntry {
                method,
                path: path.to_string(),
                replies: VecDeque::from([reply]),
            }),
        }
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub(crate) fn calls_to(&self, method: HttpMethod, path: &str) -> Vec<Call> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, method: HttpMethod, path: &str, body: Option<Value>) -> Result<Value> {
        self.calls.lock().push(Call {
            method,
            path: path.to_string(),
            body,
        });

        let reply = {
            let mut routes = self.routes.lock();
            let route = routes
                .iter_mut()
                .find(|r| r.method == method && r.path == path);
            match route {
                Some(route) if route.replies.len() > 1 => route.replies.pop_front(),
                Some(route) => route.replies.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Value(value)) => Ok(value),
            Some(Reply::Error(code, message)) => Err(Error::protocol(code, message)),
            None => Err(Error::protocol("unknown command", format!("{method} {path}"))),
        }
    }
}

/// Builds session `s1` at `http://127.0.0.1:4444` over `mock`, with a
/// 300ms default wait.
pub(crate) fn mock_session(
    mock: &std::sync::Arc<MockTransport>,
    capabilities: Value,
) -> crate::browser::session::Session {
    let endpoint = crate::driver::Endpoint::parse("http://127.0.0.1:4444").expect("endpoint");
    let transport: std::sync::Arc<dyn HttpTransport> = mock.clone();
    crate::browser::session::Session::new(
        crate::identifiers::SessionId::new("s1"),
        endpoint,
        transport,
        capabilities,
        crate::browser::session::SessionConfig {
            wait: crate::browser::wait::WaitOptions::with_timeout(Duration::from_millis(300))
                .interval(Duration::from_millis(10)),
            ..Default::default()
        },
    )
}
