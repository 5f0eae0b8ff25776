//! Element lookup methods.

use serde_json::Value;
use tracing::debug;

use crate::browser::element::Element;
use crate::browser::selector::By;
use crate::error::{Error, Result};
use crate::protocol::ClassicCommand;
use crate::protocol::classic::element_id_from_value;

use super::Session;

// ============================================================================
// Session - Elements
// ============================================================================

impl Session {
    /// Finds the first element matching the locator.
    ///
    /// Does not wait; see [`Session::wait_for`] for the auto-waiting form.
    ///
    /// # Errors
    ///
    /// Returns the remote `no such element` error if nothing matches.
    pub async fn find_element(&self, by: &By) -> Result<Element> {
        let locator = by.compile();
        debug!(session_id = %self.inner.id, locator = %locator, "Finding element");

        let value = self.execute(ClassicCommand::FindElement { locator }).await?;
        self.element_from_value(&value)
    }

    /// Finds all elements matching the locator, in document order.
    pub async fn find_elements(&self, by: &By) -> Result<Vec<Element>> {
        let locator = by.compile();
        debug!(session_id = %self.inner.id, locator = %locator, "Finding elements");

        let value = self
            .execute(ClassicCommand::FindElements { locator })
            .await?;
        self.elements_from_value(&value)
    }

    /// Wraps a web element reference.
    pub(crate) fn element_from_value(&self, value: &Value) -> Result<Element> {
        element_id_from_value(value)
            .map(|id| Element::new(id, self.clone()))
            .ok_or_else(|| {
                Error::protocol("unknown error", format!("invalid element reference: {value}"))
            })
    }

    /// Wraps an array of web element references.
    pub(crate) fn elements_from_value(&self, value: &Value) -> Result<Vec<Element>> {
        value
            .as_array()
            .ok_or_else(|| {
                Error::protocol("unknown error", format!("expected an array, got {value}"))
            })?
            .iter()
            .map(|item| self.element_from_value(item))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
