//! Session state save and restore.
//!
//! Demonstrates:
//! - Writing cookies and localStorage
//! - Saving a state snapshot to disk
//! - Clearing and restoring from the snapshot
//!
//! Usage:
//!   WEBDRIVER_URL=http://127.0.0.1:4444 cargo run --example session_state
//!   cargo run --example session_state -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use webdriver_wire::{Cookie, Result, SameSite, StateOptions};

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
    println!("=== Session State ===\n");

    let (_driver, session) = common::start_session(&args).await?;
    session.goto(TEST_URL).await?;

    let storage = session.storage();
    let options = StateOptions::default();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.json");

    // ========================================================================
    // Populate
    // ========================================================================

    println!("[Populate] Cookies and localStorage");
    storage
        .set_cookies(&[
            Cookie::new("sid", "42").with_secure(true),
            // Written as Lax: None requires secure
            Cookie::new("theme", "dark").with_same_site(SameSite::None),
        ])
        .await?;
    session
        .execute_script("localStorage.setItem('cart', '[1,2,3]');", vec![])
        .await?;
    println!("        ✓ {} cookie(s)\n", storage.get_cookies().await?.len());

    // ========================================================================
    // Save, clear, load
    // ========================================================================

    println!("[Save] {}", path.display());
    let saved = storage.save_state(&path, &options).await?;
    println!(
        "        ✓ {} cookie(s), {} origin(s)\n",
        saved.cookies.len(),
        saved.local_storage.len()
    );

    println!("[Clear]");
    storage.clear_cookies().await?;
    session
        .execute_script("localStorage.clear();", vec![])
        .await?;
    println!("        ✓ {} cookie(s) left\n", storage.get_cookies().await?.len());

    println!("[Load]");
    storage.load_state(&path, &options).await?;
    let cart = session
        .execute_script("return localStorage.getItem('cart');", vec![])
        .await?;
    println!("        ✓ {} cookie(s), cart = {cart}\n", storage.get_cookies().await?.len());

    // ========================================================================
    // Done
    // ========================================================================

    println!("[Cleanup] Deleting session...");
    session.delete().await?;
    println!("          ✓ Done");

    Ok(())
}
