//! End-to-end scenarios against a real driver.
//!
//! Ignored by default. Start geckodriver (or chromedriver) and run:
//!
//! ```text
//! WEBDRIVER_URL=http://127.0.0.1:4444 cargo test --test e2e -- --ignored
//! ```

mod common;

use std::time::Duration;

use serde_json::json;
use webdriver_wire::{BrowserOptions, By, Capabilities, Driver, MockResponse, Session};

const FORM_FIXTURE: &str = r#"<!doctype html>
<button id="submit" style="display:none"
        onclick="document.getElementById('result').textContent = 'clicked'">Submit</button>
<div id="result"></div>
<script>
  setTimeout(() => { document.getElementById('submit').style.display = ''; }, 300);
</script>"#;

const NESTED_FIXTURE: &str = r##"<!doctype html>
<a id="top" href="#top">Top</a>
<div id="outer"><section id="panel">
  <p id="leaf">Order total: <b>42</b> EUR</p>
  <a id="inner" href="#inner">Inner</a>
</section></div>"##;

const RENDER_USERS_SCRIPT: &str = r"
fetch('/api/users')
  .then((r) => r.json())
  .then((data) => {
    const p = document.createElement('p');
    p.id = 'count';
    p.textContent = data.users.length + ' users';
    document.body.appendChild(p);
  });
";

async fn start_session() -> anyhow::Result<(Driver, Session)> {
    common::init_logging();

    let driver = Driver::builder()
        .capabilities(
            Capabilities::new()
                .with_browser_options(BrowserOptions::firefox().with_headless())
                .with_bidi(),
        )
        .build()?;
    driver.wait_until_ready(Duration::from_secs(10)).await?;
    let session = driver.new_session().await?;
    Ok((driver, session))
}

#[tokio::test]
#[ignore = "needs a running WebDriver endpoint (WEBDRIVER_URL)"]
async fn test_click_reveals_result() -> anyhow::Result<()> {
    let (_driver, session) = start_session().await?;

    let url = format!("data:text/html,{}", urlencoding::encode(FORM_FIXTURE));
    session.goto(&url).await?;

    let submit = session
        .wait_until_visible_for(&By::text("Submit"), Duration::from_millis(5000))
        .await?;
    submit.click().await?;
    session.expect_text(&By::id("result"), "clicked").await?;

    session.delete().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "needs a running WebDriver endpoint (WEBDRIVER_URL)"]
async fn test_locators_resolve_innermost_and_scoped() -> anyhow::Result<()> {
    let (_driver, session) = start_session().await?;

    let url = format!("data:text/html,{}", urlencoding::encode(NESTED_FIXTURE));
    session.goto(&url).await?;

    let leaf = session.find_element(&By::partial_text("Order total")).await?;
    assert_eq!(leaf.attribute("id").await?.as_deref(), Some("leaf"));

    let panel = session.find_element(&By::id("panel")).await?;
    let first_link = panel.find_element(&By::xpath("(//a)[1]")).await?;
    assert_eq!(first_link.attribute("id").await?.as_deref(), Some("inner"));

    session.delete().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "needs a running WebDriver endpoint with BiDi (WEBDRIVER_URL)"]
async fn test_mocked_api_renders() -> anyhow::Result<()> {
    let (_driver, session) = start_session().await?;

    session.goto("https://example.com/").await?;

    let network = session.network().await?;
    network
        .mock("GET **/api/users", MockResponse::json(json!({ "users": [] })))
        .await?;

    session.execute_script(RENDER_USERS_SCRIPT, vec![]).await?;
    session.expect_text(&By::id("count"), "0 users").await?;

    network.clear_intercepts().await?;
    session.delete().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "needs a running WebDriver endpoint with BiDi (WEBDRIVER_URL)"]
async fn test_console_message_captured() -> anyhow::Result<()> {
    let (_driver, session) = start_session().await?;
    session.goto("https://example.com/").await?;

    let logs = session.logs().await?;
    let hello = logs.wait_for_message(|e| e.text() == "hello from page", Duration::from_secs(5));
    session
        .execute_script("console.log('hello from page');", vec![])
        .await?;
    hello.await?;

    assert_eq!(logs.console_messages().len(), 1);
    session.delete().await?;
    Ok(())
}
