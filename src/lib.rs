//! WebDriver Classic and WebDriver BiDi client.
//!
//! Drives any W3C WebDriver endpoint (geckodriver, chromedriver, a Selenium
//! grid) over HTTP, and opens the session's BiDi WebSocket on demand for
//! request interception, console logs and cookie storage.
//!
//! # Architecture
//!
//! - **Classic (HTTP)**: every [`Session`] and [`Element`] call is one
//!   request/response through the [`HttpTransport`](transport::HttpTransport).
//!   Nothing about the page is cached client-side.
//! - **BiDi (WebSocket)**: one multiplexed connection per session. Commands
//!   are correlated by ID; events fan out to listeners in arrival order.
//! - **Auto-waiting**: locator-based actions poll through [`Wait`] until the
//!   element is ready or the deadline passes.
//!
//! # Quick Start
//!
//! ```no_run
//! use webdriver_wire::{By, Capabilities, Driver, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Endpoint from WEBDRIVER_URL, or http://127.0.0.1:4444
//!     let driver = Driver::builder()
//!         .capabilities(Capabilities::firefox().with_bidi())
//!         .build()?;
//!
//!     let session = driver.new_session().await?;
//!     session.goto("https://example.com").await?;
//!
//!     session.click(&By::role_named("link", "More information...")).await?;
//!     println!("Now at {}", session.current_url().await?);
//!
//!     session.delete().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | [`Session`], [`Element`], locators, waits, network, logs, storage |
//! | [`driver`] | [`Driver`], endpoint and capabilities |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Classic routes and BiDi message types |
//! | [`transport`] | HTTP transport and BiDi connection |

// ============================================================================
// Modules
// ============================================================================

/// Browser-facing API: sessions, elements, locators and BiDi features.
pub mod browser;

/// Driver endpoint and session creation.
///
/// Use [`Driver::builder()`] to create a configured driver instance.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Wire message types for Classic and BiDi.
pub mod protocol;

/// HTTP transport and BiDi connection multiplexer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{
    By, ConsoleMessage, Cookie, Element, ElementRect, InterceptAction, InterceptedRequest,
    JavaScriptError, Locator, LogEntry, LogKind, LogLevel, LogMonitor, LogMonitorOptions,
    MockBody, MockResponse, Network, RoleOptions, SameSite, Session, SessionConfig, StackFrame,
    StateManager, StateOptions, StateSnapshot, Strategy, TextOptions, Wait, WaitOptions, until,
};

// Driver types
pub use driver::{
    BrowserOptions, Capabilities, Driver, DriverBuilder, DriverStatus, Endpoint,
    PageLoadStrategy, SessionTimeouts,
};

// Error types
pub use error::{BoxError, Error, Result};

// Identifier types
pub use identifiers::{
    BrowsingContextId, CommandId, ElementId, InterceptId, ListenerId, SessionId, SubscriptionId,
};

// Protocol types used in public signatures
pub use protocol::{Event, InterceptPhase};

// Transport types
pub use transport::{BidiConnection, BidiOptions, ConnectionState};
