//! Session capabilities and browser options.
//!
//! Provides a typed, closed record for the capabilities sent in the
//! session-creation handshake.
//!
//! # Example
//!
//! ```ignore
//! use webdriver_wire::{BrowserOptions, Capabilities};
//!
//! let caps = Capabilities::firefox()
//!     .with_bidi()
//!     .with_browser_options(BrowserOptions::firefox().with_headless().with_window_size(1280, 800));
//!
//! let body = caps.to_request();
//! // {"capabilities": {"alwaysMatch": {"browserName": "firefox", "webSocketUrl": true, ...}}}
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

// ============================================================================
// PageLoadStrategy
// ============================================================================

/// When navigation commands return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageLoadStrategy {
    /// Wait for the `load` event.
    Normal,
    /// Wait for `DOMContentLoaded`.
    Eager,
    /// Return immediately.
    None,
}

// ============================================================================
// SessionTimeouts
// ============================================================================

/// Session timeouts in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimeouts {
    /// Script timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<u64>,
    /// Page load timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_load: Option<u64>,
    /// Implicit element-finding wait.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<u64>,
}

// ============================================================================
// BrowserOptions
// ============================================================================

/// Vendor-specific browser options.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserOptions {
    /// `moz:firefoxOptions`
    Firefox {
        /// Command-line arguments.
        args: Vec<String>,
        /// `about:config` preferences.
        prefs: BTreeMap<String, Value>,
    },
    /// `goog:chromeOptions`
    Chrome {
        /// Command-line arguments.
        args: Vec<String>,
    },
}

impl BrowserOptions {
    /// Empty Firefox options.
    #[inline]
    #[must_use]
    pub fn firefox() -> Self {
        Self::Firefox {
            args: Vec::new(),
            prefs: BTreeMap::new(),
        }
    }

    /// Empty Chrome options.
    #[inline]
    #[must_use]
    pub fn chrome() -> Self {
        Self::Chrome { args: Vec::new() }
    }

    /// Enables headless mode.
    #[inline]
    #[must_use]
    pub fn with_headless(self) -> Self {
        match self {
            Self::Firefox { .. } => self.with_arg("--headless"),
            Self::Chrome { .. } => self.with_arg("--headless=new"),
        }
    }

    /// Sets window size in pixels.
    #[must_use]
    pub fn with_window_size(self, width: u32, height: u32) -> Self {
        match self {
            Self::Firefox { .. } => self
                .with_arg(format!("--width={width}"))
                .with_arg(format!("--height={height}")),
            Self::Chrome { .. } => self.with_arg(format!("--window-size={width},{height}")),
        }
    }

    /// Enables private / incognito browsing.
    #[inline]
    #[must_use]
    pub fn with_private(self) -> Self {
        match self {
            Self::Firefox { .. } => self.with_arg("-private"),
            Self::Chrome { .. } => self.with_arg("--incognito"),
        }
    }

    /// Adds a custom command-line argument.
    #[inline]
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        match &mut self {
            Self::Firefox { args, .. } | Self::Chrome { args } => args.push(arg.into()),
        }
        self
    }

    /// Adds multiple custom command-line arguments.
    #[inline]
    #[must_use]
    pub fn with_args(self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        args.into_iter().fold(self, |opts, arg| opts.with_arg(arg))
    }

    /// Sets a Firefox preference. Ignored for Chrome.
    #[inline]
    #[must_use]
    pub fn with_pref(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Self::Firefox { prefs, .. } = &mut self {
            prefs.insert(name.into(), value.into());
        }
        self
    }

    /// Returns the command-line arguments.
    #[inline]
    #[must_use]
    pub fn args(&self) -> &[String] {
        match self {
            Self::Firefox { args, .. } | Self::Chrome { args } => args,
        }
    }

    /// Returns the browser name this option block belongs to.
    #[inline]
    #[must_use]
    pub fn browser_name(&self) -> &'static str {
        match self {
            Self::Firefox { .. } => "firefox",
            Self::Chrome { .. } => "chrome",
        }
    }

    /// Returns `(capability key, value)`.
    #[must_use]
    pub fn to_capability(&self) -> (&'static str, Value) {
        match self {
            Self::Firefox { args, prefs } => {
                let mut value = json!({ "args": args });
                if !prefs.is_empty() {
                    value["prefs"] = json!(prefs);
                }
                ("moz:firefoxOptions", value)
            }
            Self::Chrome { args } => ("goog:chromeOptions", json!({ "args": args })),
        }
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Requested session capabilities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    /// `browserName`
    pub browser_name: Option<String>,
    /// `acceptInsecureCerts`
    pub accept_insecure_certs: bool,
    /// `pageLoadStrategy`
    pub page_load_strategy: Option<PageLoadStrategy>,
    /// Request a BiDi WebSocket URL.
    pub web_socket_url: bool,
    /// `timeouts`
    pub timeouts: Option<SessionTimeouts>,
    /// `unhandledPromptBehavior`
    pub unhandled_prompt_behavior: Option<String>,
    /// Vendor options.
    pub browser_options: Option<BrowserOptions>,
}

impl Capabilities {
    /// Creates empty capabilities.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Firefox with default options.
    #[inline]
    #[must_use]
    pub fn firefox() -> Self {
        Self::new().with_browser_options(BrowserOptions::firefox())
    }

    /// Chrome with default options.
    #[inline]
    #[must_use]
    pub fn chrome() -> Self {
        Self::new().with_browser_options(BrowserOptions::chrome())
    }

    /// Requests a BiDi WebSocket URL.
    #[inline]
    #[must_use]
    pub fn with_bidi(mut self) -> Self {
        self.web_socket_url = true;
        self
    }

    /// Accepts self-signed certificates.
    #[inline]
    #[must_use]
    pub fn with_insecure_certs(mut self) -> Self {
        self.accept_insecure_certs = true;
        self
    }

    /// Sets the page load strategy.
    #[inline]
    #[must_use]
    pub fn with_page_load_strategy(mut self, strategy: PageLoadStrategy) -> Self {
        self.page_load_strategy = Some(strategy);
        self
    }

    /// Sets session timeouts.
    #[inline]
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: SessionTimeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the unhandled prompt behavior (`dismiss`, `accept`, `ignore`, ...).
    #[inline]
    #[must_use]
    pub fn with_unhandled_prompt_behavior(mut self, behavior: impl Into<String>) -> Self {
        self.unhandled_prompt_behavior = Some(behavior.into());
        self
    }

    /// Sets vendor options; also sets `browserName` if unset.
    #[inline]
    #[must_use]
    pub fn with_browser_options(mut self, options: BrowserOptions) -> Self {
        if self.browser_name.is_none() {
            self.browser_name = Some(options.browser_name().to_string());
        }
        self.browser_options = Some(options);
        self
    }

    /// Validates the record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `browserName` conflicts with the vendor
    /// options.
    pub fn validate(&self) -> Result<()> {
        if let (Some(name), Some(options)) = (&self.browser_name, &self.browser_options)
            && name != options.browser_name()
        {
            return Err(Error::config(format!(
                "browserName '{name}' does not match {} options",
                options.browser_name()
            )));
        }
        Ok(())
    }

    /// Returns the `alwaysMatch` object.
    #[must_use]
    pub fn to_always_match(&self) -> Value {
        let mut map = Map::new();

        if let Some(name) = &self.browser_name {
            map.insert("browserName".into(), json!(name));
        }
        if self.accept_insecure_certs {
            map.insert("acceptInsecureCerts".into(), json!(true));
        }
        if let Some(strategy) = self.page_load_strategy {
            map.insert("pageLoadStrategy".into(), json!(strategy));
        }
        if self.web_socket_url {
            map.insert("webSocketUrl".into(), json!(true));
        }
        if let Some(timeouts) = self.timeouts {
            map.insert("timeouts".into(), json!(timeouts));
        }
        if let Some(behavior) = &self.unhandled_prompt_behavior {
            map.insert("unhandledPromptBehavior".into(), json!(behavior));
        }
        if let Some(options) = &self.browser_options {
            let (key, value) = options.to_capability();
            map.insert(key.into(), value);
        }

        Value::Object(map)
    }

    /// Returns the session-creation request body.
    #[must_use]
    pub fn to_request(&self) -> Value {
        json!({ "capabilities": { "alwaysMatch": self.to_always_match() } })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firefox_request_shape() {
        let caps = Capabilities::firefox()
            .with_bidi()
            .with_browser_options(BrowserOptions::firefox().with_headless().with_pref("dom.webdriver.enabled", false));

        let body = caps.to_request();
        let always = &body["capabilities"]["alwaysMatch"];
        assert_eq!(always["browserName"], "firefox");
        assert_eq!(always["webSocketUrl"], true);
        assert_eq!(always["moz:firefoxOptions"]["args"], json!(["--headless"]));
        assert_eq!(always["moz:firefoxOptions"]["prefs"]["dom.webdriver.enabled"], false);
    }

    #[test]
    fn test_chrome_args() {
        let options = BrowserOptions::chrome()
            .with_headless()
            .with_window_size(800, 600)
            .with_private();
        assert_eq!(
            options.args(),
            ["--headless=new", "--window-size=800,600", "--incognito"]
        );

        let (key, _) = options.to_capability();
        assert_eq!(key, "goog:chromeOptions");
    }

    #[test]
    fn test_firefox_window_size() {
        let options = BrowserOptions::firefox().with_window_size(1024, 768);
        assert_eq!(options.args(), ["--width=1024", "--height=768"]);
    }

    #[test]
    fn test_empty_capabilities() {
        let body = Capabilities::new().to_request();
        assert_eq!(body, json!({ "capabilities": { "alwaysMatch": {} } }));
    }

    #[test]
    fn test_timeouts_and_strategy() {
        let caps = Capabilities::new()
            .with_page_load_strategy(PageLoadStrategy::Eager)
            .with_timeouts(SessionTimeouts {
                page_load: Some(30_000),
                ..SessionTimeouts::default()
            });
        let always = caps.to_always_match();
        assert_eq!(always["pageLoadStrategy"], "eager");
        assert_eq!(always["timeouts"], json!({ "pageLoad": 30000 }));
    }

    #[test]
    fn test_validate_mismatch() {
        let mut caps = Capabilities::chrome();
        caps.browser_name = Some("firefox".into());
        assert!(caps.validate().is_err());
        assert!(Capabilities::firefox().validate().is_ok());
    }

    #[test]
    fn test_with_args_multiple() {
        let options = BrowserOptions::firefox().with_args(["--arg1", "--arg2"]);
        assert_eq!(options.args().len(), 2);
    }
}
