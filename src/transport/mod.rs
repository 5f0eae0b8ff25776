//! Transport layer for both WebDriver protocols.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐        HTTP (Classic)         ┌─────────────────┐
//! │  Session (Rust) │──────────────────────────────►│  Driver         │
//! │                 │                               │  (geckodriver,  │
//! │  HttpTransport  │        WebSocket (BiDi)       │   chromedriver, │
//! │  BidiConnection │◄─────────────────────────────►│   grid node)    │
//! └─────────────────┘                               └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `http` | One-shot Classic request/response with envelope decoding |
//! | `connection` | BiDi socket, correlation map and event loop |
//! | `listeners` | Exact-name and wildcard event fan-out |

// ============================================================================
// Submodules
// ============================================================================

/// BiDi WebSocket connection and event loop.
pub mod connection;

/// Classic HTTP transport.
pub mod http;

/// BiDi event listener registry.
pub mod listeners;

#[cfg(test)]
pub(crate) mod fake;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{BidiConnection, BidiOptions, ConnectionState, WeakBidiConnection};
pub use http::{HttpClient, HttpTransport, decode_envelope};
pub use listeners::{EventListener, ListenerRegistry};
