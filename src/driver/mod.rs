//! Driver endpoint and session creation.
//!
//! This module provides the main entry point for browser automation.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Driver`] | Endpoint client and session factory |
//! | [`DriverBuilder`] | Fluent configuration builder |
//! | [`Endpoint`] | Parsed driver base URL |
//! | [`Capabilities`] | Typed session-creation capabilities |
//! | [`BrowserOptions`] | Vendor options (`moz:firefoxOptions`, `goog:chromeOptions`) |
//!
//! # Example
//!
//! ```no_run
//! use webdriver_wire::{Capabilities, Driver, Result};
//!
//! # async fn example() -> Result<()> {
//! let driver = Driver::builder()
//!     .capabilities(Capabilities::firefox())
//!     .build()?;
//!
//! let session = driver.new_session().await?;
//! session.goto("https://example.com").await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for driver configuration.
pub mod builder;

/// Session capabilities and vendor options.
pub mod capabilities;

/// Core driver implementation.
pub mod core;

/// Driver endpoint URL.
pub mod endpoint;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::DriverBuilder;
pub use capabilities::{BrowserOptions, Capabilities, PageLoadStrategy, SessionTimeouts};
pub use core::{Driver, DriverStatus};
pub use endpoint::{DEFAULT_ENDPOINT, ENDPOINT_ENV, Endpoint};
