//! Auto-waiting actions and assertions.
//!
//! Every action is "wait for a condition, then act on the produced
//! element", using the session's default [`WaitOptions`].

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::browser::element::Element;
use crate::browser::selector::By;
use crate::browser::wait::{Wait, WaitOptions, until};
use crate::error::Result;

use super::Session;

// ============================================================================
// Session - Waiting
// ============================================================================

impl Session {
    /// Polls `condition` with the session's default wait options.
    ///
    /// # Errors
    ///
    /// See [`Wait::until`].
    pub async fn wait_until<T, F, Fut>(&self, condition: F) -> Result<T>
    where
        F: Fn(Session) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        self.wait_until_with(self.inner.config.wait.clone(), condition)
            .await
    }

    /// Polls `condition` with explicit wait options.
    pub async fn wait_until_with<T, F, Fut>(&self, options: WaitOptions, condition: F) -> Result<T>
    where
        F: Fn(Session) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        Wait::new(options).until(self, condition).await
    }

    /// Waits until the locator matches an element.
    pub async fn wait_for(&self, by: &By) -> Result<Element> {
        self.wait_labelled(format!("element {by} to exist"), None, until::element_exists(by))
            .await
    }

    /// Waits until the locator matches a displayed element.
    pub async fn wait_until_visible(&self, by: &By) -> Result<Element> {
        self.wait_labelled(format!("element {by} to be visible"), None, until::element_visible(by))
            .await
    }

    /// [`Session::wait_until_visible`] with an explicit timeout.
    pub async fn wait_until_visible_for(&self, by: &By, timeout: Duration) -> Result<Element> {
        self.wait_labelled(
            format!("element {by} to be visible"),
            Some(timeout),
            until::element_visible(by),
        )
        .await
    }

    /// Waits until the locator matches nothing or a hidden element.
    pub async fn wait_until_hidden(&self, by: &By) -> Result<()> {
        self.wait_labelled(
            format!("element {by} to be hidden"),
            None,
            until::element_not_visible(by),
        )
        .await
    }

    /// Runs a canonical condition under the default options, with `label`
    /// as the timeout message.
    async fn wait_labelled<T>(
        &self,
        label: String,
        timeout: Option<Duration>,
        condition: until::Condition<T>,
    ) -> Result<T> {
        let mut options = self.inner.config.wait.clone().message(label);
        if let Some(timeout) = timeout {
            options.timeout = timeout;
        }

        Wait::new(options).until(self, condition).await
    }
}

// ============================================================================
// Session - Actions
// ============================================================================

impl Session {
    /// Waits for a visible element, then clicks it.
    pub async fn click(&self, by: &By) -> Result<()> {
        let element = self.wait_until_visible(by).await?;
        debug!(session_id = %self.inner.id, locator = %by, "Clicking");
        element.click().await
    }

    /// Waits for a visible element, clears it, then types `text`.
    pub async fn fill(&self, by: &By, text: &str) -> Result<()> {
        let element = self.wait_until_visible(by).await?;
        debug!(session_id = %self.inner.id, locator = %by, text_len = text.len(), "Filling");
        element.clear().await?;
        element.send_keys(text).await
    }
}

// ============================================================================
// Session - Assertions
// ============================================================================

impl Session {
    /// Waits until the element's trimmed text equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`](crate::Error::Timeout) carrying the last
    /// observed failure if the text never matches.
    pub async fn expect_text(&self, by: &By, expected: &str) -> Result<()> {
        self.wait_labelled(
            format!("element {by} to have text {expected:?}"),
            None,
            until::element_text_is(by, expected),
        )
        .await?;
        Ok(())
    }

    /// Waits until the element is visible.
    pub async fn expect_visible(&self, by: &By) -> Result<()> {
        self.wait_until_visible(by).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
