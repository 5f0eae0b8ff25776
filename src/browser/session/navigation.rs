//! Session navigation methods.

use tracing::debug;

use crate::error::Result;
use crate::protocol::ClassicCommand;

use super::Session;
use super::core::expect_string;

// ============================================================================
// Session - Navigation
// ============================================================================

impl Session {
    /// Navigates to a URL and waits for the page load strategy to settle.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to navigate to
    ///
    /// # Errors
    ///
    /// Returns an error if navigation fails.
    pub async fn goto(&self, url: &str) -> Result<()> {
        debug!(url = %url, session_id = %self.inner.id, "Navigating");

        self.execute(ClassicCommand::NavigateTo {
            url: url.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Returns the current document URL.
    pub async fn current_url(&self) -> Result<String> {
        expect_string(self.execute(ClassicCommand::GetCurrentUrl).await?)
    }

    /// Returns the document title.
    pub async fn title(&self) -> Result<String> {
        expect_string(self.execute(ClassicCommand::GetTitle).await?)
    }

    /// Navigates back in history.
    pub async fn back(&self) -> Result<()> {
        debug!(session_id = %self.inner.id, "Navigating back");
        self.execute(ClassicCommand::Back).await?;
        Ok(())
    }

    /// Navigates forward in history.
    pub async fn forward(&self) -> Result<()> {
        debug!(session_id = %self.inner.id, "Navigating forward");
        self.execute(ClassicCommand::Forward).await?;
        Ok(())
    }

    /// Reloads the page.
    pub async fn refresh(&self) -> Result<()> {
        debug!(session_id = %self.inner.id, "Refreshing page");
        self.execute(ClassicCommand::Refresh).await?;
        Ok(())
    }

    /// Returns the serialized DOM.
    pub async fn page_source(&self) -> Result<String> {
        expect_string(self.execute(ClassicCommand::GetPageSource).await?)
    }

    /// Returns the current window handle.
    ///
    /// With BiDi this is also the top-level browsing context ID.
    pub async fn window_handle(&self) -> Result<String> {
        expect_string(self.execute(ClassicCommand::GetWindowHandle).await?)
    }
}

// ============================================================================
// Tests
// ============================================================================
