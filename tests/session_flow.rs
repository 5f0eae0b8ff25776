//! Session lifecycle against an in-memory endpoint.

mod common;

use std::time::Duration;

use common::{FakeBrowser, HIDDEN_POLLS, SESSION_ID};
use webdriver_wire::{By, Cookie, Error, SameSite, WaitOptions};

#[tokio::test]
async fn test_status_and_session_creation() -> anyhow::Result<()> {
    common::init_logging();
    let browser = FakeBrowser::new();
    let driver = browser.driver();

    let status = driver.status().await?;
    assert!(status.ready);
    driver.wait_until_ready(Duration::from_secs(1)).await?;

    let session = driver.new_session().await?;
    assert_eq!(session.id().as_str(), SESSION_ID);
    assert_eq!(session.capabilities()["browserName"], "fake");
    assert!(session.web_socket_url().is_none());

    session.delete().await?;
    assert_eq!(
        browser.log().last().map(String::as_str),
        Some("DELETE /session/fake-session")
    );
    Ok(())
}

#[tokio::test]
async fn test_click_then_expect_text() -> anyhow::Result<()> {
    common::init_logging();
    let browser = FakeBrowser::new();
    let session = browser.driver().new_session().await?;

    session.goto("https://fixture.test/form").await?;
    assert_eq!(session.current_url().await?, "https://fixture.test/form");

    let submit = session
        .wait_until_visible_for(&By::text("Submit"), Duration::from_secs(5))
        .await?;
    assert_eq!(submit.tag_name().await?, "button");

    session.click(&By::text("Submit")).await?;
    session.expect_text(&By::id("result"), "clicked").await?;

    let displayed_checks = browser
        .log()
        .iter()
        .filter(|line| line.ends_with("/element/submit/displayed"))
        .count();
    assert!(displayed_checks > HIDDEN_POLLS);
    Ok(())
}

#[tokio::test]
async fn test_missing_element_times_out_with_locator() -> anyhow::Result<()> {
    let browser = FakeBrowser::new();
    let session = browser.driver().new_session().await?;

    let err = session
        .wait_until_with(
            WaitOptions::with_timeout(Duration::from_millis(200))
                .interval(Duration::from_millis(20))
                .message("element #nope"),
            |s| async move {
                match s.find_element(&By::id("nope")).await {
                    Ok(element) => Ok(Some(element)),
                    Err(e) if e.is_element_error() => Ok(None),
                    Err(e) => Err(e),
                }
            },
        )
        .await
        .expect_err("missing element");

    let Error::Timeout { operation, .. } = err else {
        panic!("expected timeout, got {err:?}");
    };
    assert_eq!(operation, "element #nope");
    Ok(())
}

#[tokio::test]
async fn test_find_elements_empty_is_not_an_error() -> anyhow::Result<()> {
    let browser = FakeBrowser::new();
    let session = browser.driver().new_session().await?;

    assert_eq!(session.find_elements(&By::role("button")).await?.len(), 1);
    assert!(session.find_elements(&By::css("table")).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_classic_cookie_jar() -> anyhow::Result<()> {
    let browser = FakeBrowser::new();
    let session = browser.driver().new_session().await?;

    session
        .add_cookie(&Cookie::new("sid", "42").with_same_site(SameSite::Lax))
        .await?;
    session.add_cookie(&Cookie::new("theme", "dark")).await?;
    session.add_cookie(&Cookie::new("sid", "43")).await?;

    let cookies = session.get_cookies().await?;
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.name == "sid" && c.value == "43"));

    session.delete_cookies(Some("theme")).await?;
    assert_eq!(session.get_cookies().await?.len(), 1);

    session.delete_cookies(None).await?;
    assert!(session.get_cookies().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_bidi_requires_web_socket_url() -> anyhow::Result<()> {
    let browser = FakeBrowser::new();
    let session = browser.driver().new_session().await?;

    let err = session.network().await.expect_err("no bidi");
    assert!(matches!(err, Error::Config { .. }));
    assert!(session.active_bidi().is_none());
    Ok(())
}
