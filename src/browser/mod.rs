//! Browser-facing API.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Session`] | Classic session proxy with auto-waiting actions |
//! | [`Element`] | Element proxy; every property is fetched on demand |
//! | [`By`] | Locator helpers compiling to CSS or XPath |
//! | [`Wait`] | Polling engine behind every auto-waiting call |
//! | [`Network`] | Request interception over BiDi |
//! | [`LogMonitor`] | Console and JavaScript error collection over BiDi |
//! | [`StateManager`] | Cookie and web storage snapshots |
//!
//! # Example
//!
//! ```no_run
//! use webdriver_wire::{By, Capabilities, Driver, Result};
//!
//! # async fn example() -> Result<()> {
//! let driver = Driver::builder()
//!     .capabilities(Capabilities::firefox().with_bidi())
//!     .build()?;
//! let session = driver.new_session().await?;
//!
//! session.goto("https://example.com").await?;
//! let heading = session.wait_for(&By::role("heading")).await?;
//! println!("{}", heading.text().await?);
//!
//! session.delete().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Element proxy.
pub mod element;

/// Console and error log monitor.
pub mod logs;

/// Network interception.
pub mod network;

/// Locator compiler.
pub mod selector;

/// Session proxy.
pub mod session;

/// Cookie and storage state.
pub mod storage;

/// Condition/wait engine.
pub mod wait;

// ============================================================================
// Re-exports
// ============================================================================

pub use element::{Element, ElementRect};
pub use logs::{
    ConsoleMessage, JavaScriptError, LogEntry, LogKind, LogLevel, LogMonitor, LogMonitorOptions,
    StackFrame,
};
pub use network::{
    InterceptAction, InterceptedRequest, MockBody, MockResponse, Network, url_pattern,
};
pub use selector::{By, Locator, RoleOptions, Strategy, TextOptions};
pub use session::{Cookie, SameSite, Session, SessionConfig};
pub use storage::{StateManager, StateOptions, StateSnapshot};
pub use wait::{Wait, WaitOptions, until};
