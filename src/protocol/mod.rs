//! Wire message types for both WebDriver protocols.
//!
//! # Protocol Overview
//!
//! | Message Type | Protocol | Direction | Purpose |
//! |--------------|----------|-----------|---------|
//! | `ClassicCommand` | Classic (HTTP) | Local → Remote | Endpoint + JSON body |
//! | `Request` | BiDi (WebSocket) | Local → Remote | Command request |
//! | `Response` | BiDi | Remote → Local | Command response |
//! | `Event` | BiDi | Remote → Local | Subscribed notification |
//!
//! # Command Naming
//!
//! BiDi commands follow `module.methodName` format:
//!
//! - `session.subscribe`
//! - `network.addIntercept`
//! - `storage.getCookies`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `classic` | Classic commands and their routes |
//! | `command` | BiDi command definitions by domain |
//! | `event` | Event types |
//! | `request` | Request, Response and inbound classification |

// ============================================================================
// Submodules
// ============================================================================

/// Classic WebDriver commands and routes.
pub mod classic;

/// BiDi command definitions organized by module.
pub mod command;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use classic::{ClassicCommand, HttpMethod, Route};
pub use command::{
    BrowsingContextCommand, BytesValue, Command, CookieFilter, Header, InterceptPhase,
    NetworkCommand, PartialCookie, PartitionDescriptor, SessionCommand, StorageCommand,
    UrlPattern, WireCookie,
};
pub use event::{Event, NetworkEventParams, RequestData, ResponseData};
pub use request::{Inbound, Request, Response, ResponseType};
