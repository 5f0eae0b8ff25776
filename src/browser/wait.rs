//! Condition/wait engine.
//!
//! Polls a condition against a context (usually a [`Session`]) until it
//! produces a final value or a deadline passes.
//!
//! # Condition Contract
//!
//! | Condition result | Engine action |
//! |------------------|---------------|
//! | `Ok(Some(v))` | resolve with `v` (including `false` / `0`) |
//! | `Ok(None)` | keep polling |
//! | `Err(e)` with `e.is_transport_error()` | fail immediately with `e` |
//! | any other `Err(e)` | keep polling, remember `e` |
//!
//! The deadline is checked after each attempt, never during one. A timeout
//! error embeds the error of the final attempt, if it failed.
//!
//! # Example
//!
//! ```ignore
//! use webdriver_wire::{By, Wait, WaitOptions, until};
//!
//! let wait = Wait::new(WaitOptions::default());
//! let button = wait.until(&session, until::element_visible(&By::id("save"))).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default wait timeout.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// WaitOptions
// ============================================================================

/// Timing and labelling for one wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Total time budget.
    pub timeout: Duration,
    /// Delay between attempts.
    pub interval: Duration,
    /// Operation label used in the timeout error.
    pub message: Option<String>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
            message: None,
        }
    }
}

impl WaitOptions {
    /// Default interval with the given timeout.
    #[inline]
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Sets the polling interval.
    #[inline]
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the operation label.
    #[inline]
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ============================================================================
// Wait
// ============================================================================

/// Polling loop with a fixed interval and a deadline.
#[derive(Debug, Clone, Default)]
pub struct Wait {
    options: WaitOptions,
}

impl Wait {
    /// Creates a wait with the given options.
    #[inline]
    #[must_use]
    pub fn new(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Returns the options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Polls `condition(ctx.clone())` until it yields `Some`.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] once the deadline passes without a final value
    /// - any transport error raised by the condition, unchanged
    pub async fn until<C, T, F, Fut>(&self, ctx: &C, condition: F) -> Result<T>
    where
        C: Clone,
        F: Fn(C) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let timeout = self.options.timeout;
        let interval = self.options.interval;
        let deadline = Instant::now() + timeout;
        let mut last_error: Option<String> = None;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match condition(ctx.clone()).await {
                Ok(Some(value)) => {
                    trace!(attempt, "Condition satisfied");
                    return Ok(value);
                }
                Ok(None) => last_error = None,
                Err(e) if e.is_transport_error() => return Err(e),
                Err(e) => {
                    trace!(attempt, error = %e, "Condition raised");
                    last_error = Some(e.to_string());
                }
            }

            let now = Instant::now();
            if now >= deadline {
                let operation = self
                    .options
                    .message
                    .clone()
                    .unwrap_or_else(|| "condition".to_string());
                return Err(Error::timeout(
                    operation,
                    timeout.as_millis() as u64,
                    last_error,
                ));
            }

            sleep(interval.min(deadline - now)).await;
        }
    }
}

// ============================================================================
// Canonical Conditions
// ============================================================================

/// Canonical conditions over a [`Session`].
///
/// Each function returns a closure suitable for [`Wait::until`].
pub mod until {
    use futures_util::future::BoxFuture;

    use crate::browser::element::Element;
    use crate::browser::selector::By;
    use crate::browser::session::Session;
    use crate::error::Result;

    /// Condition closure type.
    pub type Condition<T> = Box<dyn Fn(Session) -> BoxFuture<'static, Result<Option<T>>> + Send + Sync>;

    /// Resolves once the locator matches an element.
    #[must_use]
    pub fn element_exists(by: &By) -> Condition<Element> {
        let by = by.clone();
        Box::new(move |session| {
            let by = by.clone();
            Box::pin(async move { session.find_element(&by).await.map(Some) })
        })
    }

    /// Resolves with the element once it exists and is displayed.
    #[must_use]
    pub fn element_visible(by: &By) -> Condition<Element> {
        let by = by.clone();
        Box::new(move |session| {
            let by = by.clone();
            Box::pin(async move {
                let element = session.find_element(&by).await?;
                Ok(element.is_displayed().await?.then_some(element))
            })
        })
    }

    /// Resolves once the locator matches nothing, or a non-displayed element.
    #[must_use]
    pub fn element_not_visible(by: &By) -> Condition<()> {
        let by = by.clone();
        Box::new(move |session| {
            let by = by.clone();
            Box::pin(async move {
                let element = match session.find_element(&by).await {
                    Ok(element) => element,
                    Err(e) if e.is_element_error() => return Ok(Some(())),
                    Err(e) => return Err(e),
                };
                match element.is_displayed().await {
                    Ok(true) => Ok(None),
                    Ok(false) => Ok(Some(())),
                    Err(e) if e.is_element_error() => Ok(Some(())),
                    Err(e) => Err(e),
                }
            })
        })
    }

    /// Resolves once the element's text equals `expected`.
    #[must_use]
    pub fn element_text_is(by: &By, expected: impl Into<String>) -> Condition<Element> {
        let by = by.clone();
        let expected = expected.into();
        Box::new(move |session| {
            let by = by.clone();
            let expected = expected.clone();
            Box::pin(async move {
                let element = session.find_element(&by).await?;
                let text = element.text().await?;
                Ok((text.trim() == expected.trim()).then_some(element))
            })
        })
    }

    /// Resolves once the element is enabled.
    #[must_use]
    pub fn element_enabled(by: &By) -> Condition<Element> {
        let by = by.clone();
        Box::new(move |session| {
            let by = by.clone();
            Box::pin(async move {
                let element = session.find_element(&by).await?;
                Ok(element.is_enabled().await?.then_some(element))
            })
        })
    }

    /// Resolves once the document title equals `expected`.
    #[must_use]
    pub fn title_is(expected: impl Into<String>) -> Condition<String> {
        let expected = expected.into();
        Box::new(move |session| {
            let expected = expected.clone();
            Box::pin(async move {
                let title = session.title().await?;
                Ok((title == expected).then_some(title))
            })
        })
    }

    /// Resolves with the URL once it contains `fragment`.
    #[must_use]
    pub fn url_contains(fragment: impl Into<String>) -> Condition<String> {
        let fragment = fragment.into();
        Box::new(move |session| {
            let fragment = fragment.clone();
            Box::pin(async move {
                let url = session.current_url().await?;
                Ok(url.contains(&fragment).then_some(url))
            })
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
