//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Driver and session setup

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use webdriver_wire::{BrowserOptions, Capabilities, Driver, Result, Session};

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub headed: bool,
    pub chrome: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            headed: args.iter().any(|a| a == "--headed"),
            chrome: args.iter().any(|a| a == "--chrome"),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "webdriver_wire=debug"
    } else {
        "webdriver_wire=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Connects to `WEBDRIVER_URL` and opens a BiDi-enabled session.
pub async fn start_session(args: &Args) -> Result<(Driver, Session)> {
    let mut options = if args.chrome {
        BrowserOptions::chrome()
    } else {
        BrowserOptions::firefox()
    };
    if !args.headed {
        options = options.with_headless();
    }

    let driver = Driver::builder()
        .capabilities(Capabilities::new().with_browser_options(options).with_bidi())
        .build()?;

    println!("[Setup] Waiting for {}...", driver.endpoint());
    driver.wait_until_ready(Duration::from_secs(10)).await?;

    let session = driver.new_session().await?;
    println!("        ✓ Session {}\n", session.id());
    Ok((driver, session))
}
