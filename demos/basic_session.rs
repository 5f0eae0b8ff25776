//! Basic session walkthrough.
//!
//! Demonstrates:
//! - Driver readiness probe and session creation
//! - Navigation, title and URL
//! - Auto-waiting locators (`By::role_named`, `By::text`)
//! - Element properties and scoped lookups
//! - Screenshot capture
//!
//! Usage:
//!   WEBDRIVER_URL=http://127.0.0.1:4444 cargo run --example basic_session
//!   cargo run --example basic_session -- --headed --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use webdriver_wire::{By, Result};

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
    println!("=== Basic Session ===\n");

    let (_driver, session) = common::start_session(&args).await?;

    // ========================================================================
    // Navigation
    // ========================================================================

    println!("[Navigate] {TEST_URL}");
    session.goto(TEST_URL).await?;
    println!("        ✓ Title: {}", session.title().await?);
    println!("        ✓ URL:   {}\n", session.current_url().await?);

    // ========================================================================
    // Locators
    // ========================================================================

    println!("[Locate] Heading by role");
    let heading = session.wait_until_visible(&By::role("heading")).await?;
    println!("        ✓ <{}> {}", heading.tag_name().await?, heading.text().await?);

    println!("[Locate] Paragraphs inside <body>");
    let body = session.find_element(&By::tag("body")).await?;
    let paragraphs = body.find_elements(&By::xpath("//p")).await?;
    println!("        ✓ {} paragraph(s)", paragraphs.len());

    let link = By::role_named("link", "More information...");
    if let Some(first) = session.find_elements(&link).await?.first() {
        println!(
            "        ✓ Link href: {}\n",
            first.attribute("href").await?.unwrap_or_default()
        );
    }

    // ========================================================================
    // Screenshot
    // ========================================================================

    println!("[Screenshot]");
    let png = session.screenshot().await?;
    println!("        ✓ {} bytes\n", png.len());

    // ========================================================================
    // Done
    // ========================================================================

    println!("[Cleanup] Deleting session...");
    session.delete().await?;
    println!("          ✓ Done");

    Ok(())
}
