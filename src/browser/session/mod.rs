//! WebDriver session proxy.
//!
//! A [`Session`] is a server-assigned identifier plus the endpoint it was
//! created against. It caches nothing about the page: every call is one
//! or more Classic requests.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Session struct, accessors, BiDi attachment, deletion |
//! | `navigation` | URL navigation, history, title, source |
//! | `elements` | Element lookup |
//! | `script` | Script execution, input actions, timeouts, screenshots |
//! | `cookies` | Classic cookie endpoints |
//! | `actions` | Auto-waiting actions and assertions |
//!
//! # Example
//!
//! ```ignore
//! session.goto("https://example.com/login").await?;
//!
//! session.fill(&By::label("Email"), "user@example.com").await?;
//! session.click(&By::role_named("button", "Sign in")).await?;
//! session.expect_text(&By::id("greeting"), "Welcome").await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod actions;
mod cookies;
mod core;
mod elements;
mod navigation;
mod script;

// ============================================================================
// Re-exports
// ============================================================================

pub use cookies::{Cookie, SameSite};
pub use core::{Session, SessionConfig};

pub(crate) use core::{expect_bool, expect_string};
