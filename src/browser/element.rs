//! DOM element proxy.
//!
//! An [`Element`] is a server-assigned identifier scoped to a [`Session`].
//! Nothing about the node is cached: every property is fetched on demand,
//! and a removed node surfaces as a `stale element reference` error at the
//! next call.
//!
//! # Example
//!
//! ```ignore
//! let element = session.find_element(&By::css("#email")).await?;
//!
//! element.clear().await?;
//! element.send_keys("user@example.com").await?;
//!
//! let value = element.property("value").await?;
//! let shown = element.is_displayed().await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::ElementId;
use crate::protocol::ClassicCommand;
use crate::protocol::classic::element_reference;

use super::selector::{By, css_escape, xpath_literal};
use super::session::{Session, expect_bool, expect_string};

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for an element.
pub(crate) struct ElementInner {
    /// This element's server-assigned ID.
    pub id: ElementId,

    /// Owning session.
    pub session: Session,
}

/// Element position and size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ElementRect {
    /// Left edge, relative to the document.
    pub x: f64,
    /// Top edge, relative to the document.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

// ============================================================================
// Element
// ============================================================================

/// A handle to a DOM element in a session.
#[derive(Clone)]
pub struct Element {
    /// Shared inner state.
    pub(crate) inner: Arc<ElementInner>,
}

// ============================================================================
// Element - Display
// ============================================================================

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.inner.id)
            .field("session_id", self.inner.session.id())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id && self.inner.session.id() == other.inner.session.id()
    }
}

// ============================================================================
// Element - Constructor
// ============================================================================

impl Element {
    /// Creates a new element handle.
    pub(crate) fn new(id: ElementId, session: Session) -> Self {
        Self {
            inner: Arc::new(ElementInner { id, session }),
        }
    }
}

// ============================================================================
// Element - Accessors
// ============================================================================

impl Element {
    /// Returns this element's ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ElementId {
        &self.inner.id
    }

    /// Returns the owning session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Returns the web element reference for script arguments.
    #[inline]
    #[must_use]
    pub fn reference(&self) -> Value {
        element_reference(&self.inner.id)
    }
}

// ============================================================================
// Element - Actions
// ============================================================================

impl Element {
    /// Clicks the element's in-view center point.
    pub async fn click(&self) -> Result<()> {
        debug!(element_id = %self.inner.id, "Clicking element");
        self.execute(ClassicCommand::ElementClick {
            element_id: self.inner.id.clone(),
        })
        .await?;
        Ok(())
    }

    /// Clears an editable element.
    pub async fn clear(&self) -> Result<()> {
        debug!(element_id = %self.inner.id, "Clearing element");
        self.execute(ClassicCommand::ElementClear {
            element_id: self.inner.id.clone(),
        })
        .await?;
        Ok(())
    }

    /// Types `text` into the element.
    pub async fn send_keys(&self, text: &str) -> Result<()> {
        debug!(element_id = %self.inner.id, text_len = text.len(), "Sending keys");
        self.execute(ClassicCommand::ElementSendKeys {
            element_id: self.inner.id.clone(),
            text: text.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Scrolls the element to the center of the viewport.
    pub async fn scroll_into_view(&self) -> Result<()> {
        debug!(element_id = %self.inner.id, "Scrolling element into view");
        self.inner
            .session
            .execute_script(
                "arguments[0].scrollIntoView({block: 'center', inline: 'nearest'});",
                vec![self.reference()],
            )
            .await?;
        Ok(())
    }
}

// ============================================================================
// Element - Properties
// ============================================================================

impl Element {
    /// Returns the rendered text.
    pub async fn text(&self) -> Result<String> {
        expect_string(
            self.execute(ClassicCommand::GetElementText {
                element_id: self.inner.id.clone(),
            })
            .await?,
        )
    }

    /// Returns the lowercase tag name.
    pub async fn tag_name(&self) -> Result<String> {
        let name = expect_string(
            self.execute(ClassicCommand::GetElementTagName {
                element_id: self.inner.id.clone(),
            })
            .await?,
        )?;
        Ok(name.to_ascii_lowercase())
    }

    /// Returns an attribute value, or `None` if absent.
    pub async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let value = self
            .execute(ClassicCommand::GetElementAttribute {
                element_id: self.inner.id.clone(),
                name: name.to_string(),
            })
            .await?;

        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    /// Returns a DOM property value.
    pub async fn property(&self, name: &str) -> Result<Value> {
        self.execute(ClassicCommand::GetElementProperty {
            element_id: self.inner.id.clone(),
            name: name.to_string(),
        })
        .await
    }

    /// Returns the element's bounding rectangle.
    pub async fn rect(&self) -> Result<ElementRect> {
        let value = self
            .execute(ClassicCommand::GetElementRect {
                element_id: self.inner.id.clone(),
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Checks whether the element is rendered.
    pub async fn is_displayed(&self) -> Result<bool> {
        let value = self
            .execute(ClassicCommand::IsElementDisplayed {
                element_id: self.inner.id.clone(),
            })
            .await?;
        expect_bool(&value)
    }

    /// Checks whether the element is enabled.
    pub async fn is_enabled(&self) -> Result<bool> {
        let value = self
            .execute(ClassicCommand::IsElementEnabled {
                element_id: self.inner.id.clone(),
            })
            .await?;
        expect_bool(&value)
    }

    /// Checks whether a checkbox, radio or option is selected.
    pub async fn is_selected(&self) -> Result<bool> {
        let value = self
            .execute(ClassicCommand::IsElementSelected {
                element_id: self.inner.id.clone(),
            })
            .await?;
        expect_bool(&value)
    }
}

// ============================================================================
// Element - Select
// ============================================================================

impl Element {
    /// Selects the `<option>` with the given `value` attribute.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedTagName`] if this is not a `<select>`
    /// - `no such element` if no option has that value
    pub async fn select_by_value(&self, value: &str) -> Result<()> {
        self.ensure_select().await?;
        let option = self
            .find_element(&By::css(format!("option[value=\"{}\"]", css_escape(value))))
            .await?;
        option.select_option().await
    }

    /// Selects the `<option>` whose normalized text equals `text`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedTagName`] if this is not a `<select>`
    /// - `no such element` if no option has that text
    pub async fn select_by_text(&self, text: &str) -> Result<()> {
        self.ensure_select().await?;
        let option = self
            .find_element(&By::xpath(format!(
                ".//option[normalize-space(.) = normalize-space({})]",
                xpath_literal(text)
            )))
            .await?;
        option.select_option().await
    }

    async fn ensure_select(&self) -> Result<()> {
        let tag = self.tag_name().await?;
        if tag != "select" {
            return Err(Error::unexpected_tag_name("select", tag));
        }
        Ok(())
    }

    async fn select_option(&self) -> Result<()> {
        if !self.is_selected().await? {
            self.click().await?;
        }
        Ok(())
    }
}

// ============================================================================
// Element - Nested Search
// ============================================================================

impl Element {
    /// Finds the first descendant matching the locator.
    ///
    /// XPath locators are rewritten to the relative `.//` form so they
    /// search below this element instead of the whole document.
    pub async fn find_element(&self, by: &By) -> Result<Element> {
        let locator = by.compile().relative();
        debug!(element_id = %self.inner.id, locator = %locator, "Finding child element");

        let value = self
            .execute(ClassicCommand::FindElementFromElement {
                element_id: self.inner.id.clone(),
                locator,
            })
            .await?;
        self.inner.session.element_from_value(&value)
    }

    /// Finds all descendants matching the locator.
    pub async fn find_elements(&self, by: &By) -> Result<Vec<Element>> {
        let locator = by.compile().relative();
        debug!(element_id = %self.inner.id, locator = %locator, "Finding child elements");

        let value = self
            .execute(ClassicCommand::FindElementsFromElement {
                element_id: self.inner.id.clone(),
                locator,
            })
            .await?;
        self.inner.session.elements_from_value(&value)
    }
}

// ============================================================================
// Element - Internal
// ============================================================================

impl Element {
    async fn execute(&self, command: ClassicCommand) -> Result<Value> {
        self.inner.session.execute(command).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::error::{NO_SUCH_ELEMENT, STALE_ELEMENT_REFERENCE};
    use crate::protocol::HttpMethod;
    use crate::protocol::classic::W3C_ELEMENT_KEY;
    use crate::transport::fake::{MockTransport, mock_session};

    const E1: &str = "/session/s1/element/e1";

    fn element(mock: &Arc<MockTransport>) -> Element {
        let session = mock_session(mock, json!({}));
        Element::new(ElementId::new("e1"), session)
    }

    fn path(suffix: &str) -> String {
        format!("{E1}{suffix}")
    }

    #[tokio::test]
    async fn test_properties() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Get, &path("/text"), json!("Hello"))
            .on(HttpMethod::Get, &path("/name"), json!("INPUT"))
            .on(HttpMethod::Get, &path("/attribute/type"), json!("email"))
            .on(HttpMethod::Get, &path("/attribute/missing"), Value::Null)
            .on(HttpMethod::Get, &path("/property/value"), json!("a@b.c"))
            .on(HttpMethod::Get, &path("/enabled"), json!(true))
            .on(HttpMethod::Get, &path("/selected"), json!(false))
            .on(
                HttpMethod::Get,
                &path("/rect"),
                json!({"x": 1.0, "y": 2.0, "width": 30.0, "height": 40.5}),
            );

        let el = element(&mock);
        assert_eq!(el.text().await.expect("text"), "Hello");
        assert_eq!(el.tag_name().await.expect("tag"), "input");
        assert_eq!(
            el.attribute("type").await.expect("attr").as_deref(),
            Some("email")
        );
        assert_eq!(el.attribute("missing").await.expect("attr"), None);
        assert_eq!(el.property("value").await.expect("prop"), json!("a@b.c"));
        assert!(el.is_enabled().await.expect("enabled"));
        assert!(!el.is_selected().await.expect("selected"));
        assert_eq!(el.rect().await.expect("rect").height, 40.5);
    }

    #[tokio::test]
    async fn test_stale_surfaces_at_call_time() {
        let mock = Arc::new(MockTransport::new());
        mock.on_error(
            HttpMethod::Get,
            &path("/displayed"),
            STALE_ELEMENT_REFERENCE,
            "node detached",
        );

        let err = element(&mock).is_displayed().await.expect_err("stale");
        assert!(err.is_stale_element());
    }

    #[tokio::test]
    async fn test_nested_find_uses_relative_xpath() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            HttpMethod::Post,
            &path("/element"),
            json!({ W3C_ELEMENT_KEY: "child" }),
        );

        let child = element(&mock)
            .find_element(&By::xpath("//li"))
            .await
            .expect("child");

        assert_eq!(child.id().as_str(), "child");
        let body = mock.calls()[0].body.clone().expect("body");
        assert_eq!(body, json!({"using": "xpath", "value": ".//li"}));
    }

    #[tokio::test]
    async fn test_select_on_non_select_is_contract_violation() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Get, &path("/name"), json!("div"));

        let err = element(&mock)
            .select_by_value("x")
            .await
            .expect_err("not a select");

        assert!(matches!(err, Error::UnexpectedTagName { .. }));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_select_by_value_clicks_option() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Get, &path("/name"), json!("select"))
            .on(
                HttpMethod::Post,
                &path("/element"),
                json!({ W3C_ELEMENT_KEY: "opt" }),
            )
            .on(
                HttpMethod::Get,
                "/session/s1/element/opt/selected",
                json!(false),
            )
            .on(
                HttpMethod::Post,
                "/session/s1/element/opt/click",
                Value::Null,
            );

        element(&mock).select_by_value("de").await.expect("select");

        let find = mock.calls_to(HttpMethod::Post, &path("/element"));
        let body = find[0].body.clone().expect("body");
        assert_eq!(body["value"], json!("option[value=\"de\"]"));
        assert_eq!(
            mock.calls_to(HttpMethod::Post, "/session/s1/element/opt/click")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_select_by_text_missing_option() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Get, &path("/name"), json!("SELECT"))
            .on_error(HttpMethod::Post, &path("/element"), NO_SUCH_ELEMENT, "none");

        let err = element(&mock)
            .select_by_text("Germany")
            .await
            .expect_err("missing");
        assert!(err.is_element_error());
    }

    #[tokio::test]
    async fn test_scroll_into_view_passes_reference() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Post, "/session/s1/execute/sync", Value::Null);

        element(&mock).scroll_into_view().await.expect("scroll");

        let body = mock.calls()[0].body.clone().expect("body");
        assert_eq!(body["args"][0][W3C_ELEMENT_KEY], json!("e1"));
    }
}
