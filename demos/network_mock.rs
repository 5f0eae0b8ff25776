//! Network interception demonstration.
//!
//! Demonstrates:
//! - Mocking a JSON API with a fixed response
//! - Computed responses from the intercepted request
//! - Blocking requests
//! - Observing requests without changing them
//! - Console capture while the page runs
//!
//! Usage:
//!   WEBDRIVER_URL=http://127.0.0.1:4444 cargo run --example network_mock
//!   cargo run --example network_mock -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};

use common::Args;
use webdriver_wire::{
    By, InterceptAction, InterceptPhase, MockResponse, Result, Session,
};

// ============================================================================
// Constants
// ============================================================================

const TEST_URL: &str = "https://example.com";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Network Interception ===\n");

    let (_driver, session) = common::start_session(&args).await?;
    session.goto(TEST_URL).await?;

    let network = session.network().await?;
    let logs = session.logs().await?;

    // ========================================================================
    // Fixed mock
    // ========================================================================

    println!("[Mock] GET **/api/users");
    network
        .mock("GET **/api/users", MockResponse::json(json!({ "users": [] })))
        .await?;
    let body = fetch_text(&session, "/api/users").await?;
    println!("        ✓ Body: {body}\n");

    // ========================================================================
    // Computed mock
    // ========================================================================

    println!("[Mock] **/api/echo echoes the method");
    network
        .mock_with("**/api/echo", |req| {
            MockResponse::json(json!({ "method": req.method, "url": req.url }))
                .with_header("x-mocked", "1")
        })
        .await?;
    let body = fetch_text(&session, "/api/echo").await?;
    println!("        ✓ Body: {body}\n");

    // ========================================================================
    // Block
    // ========================================================================

    println!("[Block] **/tracker.js");
    network.block("**/tracker.js").await?;
    let blocked = session
        .execute_async_script(
            "const done = arguments[0];
             fetch('/tracker.js').then(() => done(false), () => done(true));",
            vec![],
        )
        .await?;
    println!("        ✓ Request failed: {blocked}\n");

    // ========================================================================
    // Observe
    // ========================================================================

    println!("[Observe] Count every request");
    network.clear_intercepts().await?;
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    network
        .intercept(&[], &[InterceptPhase::BeforeRequestSent], move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(InterceptAction::Continue)
        })
        .await?;

    let hello = logs.wait_for_message(|e| e.text() == "reloaded", Duration::from_secs(10));
    session.refresh().await?;
    session
        .execute_script("console.log('reloaded')", vec![])
        .await?;
    hello.await?;
    session.wait_for(&By::tag("h1")).await?;
    println!("        ✓ {} request(s) seen\n", seen.load(Ordering::SeqCst));

    // ========================================================================
    // Done
    // ========================================================================

    network.clear_intercepts().await?;
    println!("[Cleanup] Deleting session...");
    session.delete().await?;
    println!("          ✓ Done");

    Ok(())
}

// ============================================================================
// Helper: fetch from the page
// ============================================================================

async fn fetch_text(session: &Session, path: &str) -> Result<String> {
    let value = session
        .execute_async_script(
            "const [path, done] = arguments;
             fetch(path).then((r) => r.text()).then(done, (e) => done('error: ' + e));",
            vec![Value::String(path.to_string())],
        )
        .await?;
    Ok(value.as_str().unwrap_or_default().to_string())
}
