//! Element locator strategies and the locator compiler.
//!
//! Every [`By`] compiles to a [`Locator`] with one of exactly two wire
//! strategies: CSS selector or XPath.
//!
//! | Helper | Strategy | Query shape |
//! |--------|----------|-------------|
//! | `id`, `class`, `name`, `test_id`, `data`, `attribute` | CSS | `[attr="value"]` |
//! | `tag`, `css` | CSS | passthrough |
//! | `text`, `partial_text` | XPath | innermost element whose text matches |
//! | `role` | XPath | explicit or implicit ARIA role, optional name, hidden guard |
//! | `label` | XPath | `label[for]` target union nested form controls |
//! | `placeholder`, `alt_text`, `title` | XPath | attribute predicate on tag set |
//! | `link_text`, `partial_link_text` | XPath | `<a>` text predicate |
//!
//! # Example
//!
//! ```ignore
//! use webdriver_wire::By;
//!
//! let submit = session.find_element(&By::text("Submit")).await?;
//! let email = session.find_element(&By::label("Email")).await?;
//! let save = session.find_element(&By::role_named("button", "Save")).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::{Value, json};

// ============================================================================
// Constants
// ============================================================================

/// Uppercase alphabet folded by case-insensitive matching (ASCII + Latin-1).
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZÀÁÂÃÄÅÆÇÈÉÊËÌÍÎÏÐÑÒÓÔÕÖØÙÚÛÜÝÞ";

/// Lowercase counterpart of [`UPPER`], position for position.
const LOWER: &str = "abcdefghijklmnopqrstuvwxyzàáâãäåæçèéêëìíîïðñòóôõöøùúûüýþ";

/// Ancestors that hide an element from the accessibility tree.
const HIDDEN_GUARD: &str = "not(ancestor-or-self::*[@hidden or @aria-hidden='true' or \
     contains(translate(@style,' ',''),'display:none')])";

// ============================================================================
// Strategy / Locator
// ============================================================================

/// Wire-level locator strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// `css selector`
    Css,
    /// `xpath`
    XPath,
}

impl Strategy {
    /// Returns the W3C strategy name.
    #[inline]
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Css => "css selector",
            Self::XPath => "xpath",
        }
    }
}

/// Compiled locator: a strategy and a query string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    strategy: Strategy,
    query: String,
}

impl Locator {
    /// Creates a locator.
    #[inline]
    #[must_use]
    pub fn new(strategy: Strategy, query: impl Into<String>) -> Self {
        Self {
            strategy,
            query: query.into(),
        }
    }

    /// Returns the strategy.
    #[inline]
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Returns the query string.
    #[inline]
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the `{using, value}` body of a find-element request.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({ "using": self.strategy.wire_name(), "value": self.query })
    }

    /// Returns the form used for searches scoped to an element.
    ///
    /// CSS is already relative. Top-level `//` steps in XPath (including
    /// each branch of a union) become `.//`.
    #[must_use]
    pub fn relative(&self) -> Self {
        match self.strategy {
            Strategy::Css => self.clone(),
            Strategy::XPath => Self::new(Strategy::XPath, relative_xpath(&self.query)),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.strategy.wire_name(), self.query)
    }
}

// ============================================================================
// Options
// ============================================================================

/// Text matching options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOptions {
    /// Whole-string equality instead of substring.
    pub exact: bool,
    /// Compare case-sensitively.
    pub case_sensitive: bool,
    /// Normalize whitespace on both sides.
    pub trim: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            exact: true,
            case_sensitive: true,
            trim: true,
        }
    }
}

impl TextOptions {
    /// Substring match, otherwise default.
    #[inline]
    #[must_use]
    pub fn partial() -> Self {
        Self {
            exact: false,
            ..Self::default()
        }
    }

    /// Sets case sensitivity.
    #[inline]
    #[must_use]
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    /// Sets whitespace normalization.
    #[inline]
    #[must_use]
    pub fn trim(mut self, yes: bool) -> Self {
        self.trim = yes;
        self
    }
}

/// Role matching options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleOptions {
    /// Accessible name (`aria-label` or own text).
    pub name: Option<String>,
    /// How `name` is compared.
    pub name_match: TextOptions,
    /// Also match elements inside hidden subtrees.
    pub include_hidden: bool,
}

// ============================================================================
// By Enum
// ============================================================================

/// Declarative element locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum By {
    /// Raw CSS selector.
    Css(String),
    /// Raw XPath expression.
    XPath(String),
    /// `id` attribute.
    Id(String),
    /// One class in the `class` list.
    Class(String),
    /// `name` attribute.
    Name(String),
    /// Tag name.
    Tag(String),
    /// `data-testid` attribute.
    TestId(String),
    /// `data-{name}` attribute.
    Data {
        /// Suffix after `data-`.
        name: String,
        /// Attribute value.
        value: String,
    },
    /// Arbitrary attribute, optionally with a value.
    Attribute {
        /// Attribute name.
        name: String,
        /// Required value; `None` matches presence.
        value: Option<String>,
    },
    /// Text content.
    Text {
        /// Needle.
        text: String,
        /// Matching options.
        options: TextOptions,
    },
    /// ARIA role.
    Role {
        /// Role name.
        role: String,
        /// Matching options.
        options: RoleOptions,
    },
    /// Form control by its label text.
    Label {
        /// Label text.
        text: String,
        /// Matching options.
        options: TextOptions,
    },
    /// `placeholder` attribute of `input`/`textarea`.
    Placeholder {
        /// Placeholder text.
        text: String,
        /// Matching options.
        options: TextOptions,
    },
    /// `alt` attribute of images.
    AltText {
        /// Alternative text.
        text: String,
        /// Matching options.
        options: TextOptions,
    },
    /// `title` attribute.
    Title {
        /// Title text.
        text: String,
        /// Matching options.
        options: TextOptions,
    },
    /// `<a>` with exactly this text.
    LinkText(String),
    /// `<a>` containing this text.
    PartialLinkText(String),
}

impl By {
    /// Creates a CSS selector.
    #[inline]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Creates an XPath selector.
    #[inline]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Creates an ID selector.
    #[inline]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Creates a class name selector.
    #[inline]
    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    /// Creates a name attribute selector.
    #[inline]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Creates a tag name selector.
    #[inline]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    /// Creates a `data-testid` selector.
    #[inline]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Creates a `data-{name}` selector.
    #[inline]
    pub fn data(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Data {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Matches elements carrying attribute `name`.
    #[inline]
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            value: None,
        }
    }

    /// Matches elements whose attribute `name` equals `value`.
    #[inline]
    pub fn attribute_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Exact, trimmed, case-sensitive text match.
    #[inline]
    pub fn text(text: impl Into<String>) -> Self {
        Self::text_with(text, TextOptions::default())
    }

    /// Substring text match.
    #[inline]
    pub fn partial_text(text: impl Into<String>) -> Self {
        Self::text_with(text, TextOptions::partial())
    }

    /// Text match with explicit options.
    #[inline]
    pub fn text_with(text: impl Into<String>, options: TextOptions) -> Self {
        Self::Text {
            text: text.into(),
            options,
        }
    }

    /// Matches an ARIA role, excluding hidden elements.
    #[inline]
    pub fn role(role: impl Into<String>) -> Self {
        Self::role_with(role, RoleOptions::default())
    }

    /// Matches an ARIA role with an accessible name.
    #[inline]
    pub fn role_named(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::role_with(
            role,
            RoleOptions {
                name: Some(name.into()),
                ..RoleOptions::default()
            },
        )
    }

    /// Role match with explicit options.
    #[inline]
    pub fn role_with(role: impl Into<String>, options: RoleOptions) -> Self {
        Self::Role {
            role: role.into(),
            options,
        }
    }

    /// Form control labelled `text`.
    #[inline]
    pub fn label(text: impl Into<String>) -> Self {
        Self::label_with(text, TextOptions::default())
    }

    /// Label match with explicit options.
    #[inline]
    pub fn label_with(text: impl Into<String>, options: TextOptions) -> Self {
        Self::Label {
            text: text.into(),
            options,
        }
    }

    /// `input`/`textarea` with this placeholder.
    #[inline]
    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::Placeholder {
            text: text.into(),
            options: TextOptions::default(),
        }
    }

    /// Image with this alternative text.
    #[inline]
    pub fn alt_text(text: impl Into<String>) -> Self {
        Self::AltText {
            text: text.into(),
            options: TextOptions::default(),
        }
    }

    /// Element with this `title`.
    #[inline]
    pub fn title(text: impl Into<String>) -> Self {
        Self::Title {
            text: text.into(),
            options: TextOptions::default(),
        }
    }

    /// Creates a link text selector.
    #[inline]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    /// Creates a partial link text selector.
    #[inline]
    pub fn partial_link_text(text: impl Into<String>) -> Self {
        Self::PartialLinkText(text.into())
    }

    /// Compiles to a wire locator.
    #[must_use]
    pub fn compile(&self) -> Locator {
        match self {
            Self::Css(s) => Locator::new(Strategy::Css, s.clone()),
            Self::XPath(s) => Locator::new(Strategy::XPath, s.clone()),
            Self::Tag(tag) => Locator::new(Strategy::Css, tag.clone()),
            Self::Id(v) => css_attr("id", "=", v),
            Self::Class(v) => css_attr("class", "~=", v),
            Self::Name(v) => css_attr("name", "=", v),
            Self::TestId(v) => css_attr("data-testid", "=", v),
            Self::Data { name, value } => css_attr(&format!("data-{name}"), "=", value),
            Self::Attribute { name, value: None } => {
                Locator::new(Strategy::Css, format!("[{name}]"))
            }
            Self::Attribute {
                name,
                value: Some(value),
            } => css_attr(name, "=", value),
            Self::Text { text, options } => {
                let p = text_predicate(".", text, *options);
                xpath(format!("//*[{p}][not(.//*[{p}])]"))
            }
            Self::Role { role, options } => xpath(role_xpath(role, options)),
            Self::Label { text, options } => {
                let p = text_predicate(".", text, *options);
                xpath(format!(
                    "//*[@id=//label[{p}]/@for] | //label[{p}]//*[self::input or self::textarea or self::select]"
                ))
            }
            Self::Placeholder { text, options } => xpath(format!(
                "//*[self::input or self::textarea][{}]",
                text_predicate("@placeholder", text, *options)
            )),
            Self::AltText { text, options } => xpath(format!(
                "//*[self::img or self::area or (self::input and @type='image')][{}]",
                text_predicate("@alt", text, *options)
            )),
            Self::Title { text, options } => xpath(format!(
                "//*[@title][{}]",
                text_predicate("@title", text, *options)
            )),
            Self::LinkText(text) => xpath(format!(
                "//a[{}]",
                text_predicate(".", text, TextOptions::default())
            )),
            Self::PartialLinkText(text) => xpath(format!(
                "//a[{}]",
                text_predicate(".", text, TextOptions::partial())
            )),
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.compile().fmt(f)
    }
}

// ============================================================================
// From implementations for ergonomics
// ============================================================================

impl From<&str> for By {
    /// Converts a string to CSS selector (default).
    fn from(s: &str) -> Self {
        Self::Css(s.to_string())
    }
}

impl From<String> for By {
    /// Converts a string to CSS selector (default).
    fn from(s: String) -> Self {
        Self::Css(s)
    }
}

// ============================================================================
// CSS Synthesis
// ============================================================================

fn css_attr(name: &str, op: &str, value: &str) -> Locator {
    Locator::new(
        Strategy::Css,
        format!("[{name}{op}\"{}\"]", css_escape(value)),
    )
}

/// Escapes a value for a double-quoted CSS string.
#[must_use]
pub fn css_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ============================================================================
// XPath Synthesis
// ============================================================================

fn xpath(query: String) -> Locator {
    Locator::new(Strategy::XPath, query)
}

/// Quotes `value` as an XPath 1.0 string literal.
///
/// Values containing both quote kinds become a `concat()` of
/// alternating-quote pieces.
#[must_use]
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }

    let segments: Vec<&str> = value.split('\'').collect();
    let mut parts = Vec::with_capacity(segments.len() * 2);
    for (i, segment) in segments.iter().enumerate() {
        if !segment.is_empty() {
            parts.push(format!("'{segment}'"));
        }
        if i + 1 < segments.len() {
            parts.push("\"'\"".to_string());
        }
    }
    format!("concat({})", parts.join(", "))
}

/// Builds a predicate comparing `subject` (`.` or `@attr`) with `needle`.
fn text_predicate(subject: &str, needle: &str, options: TextOptions) -> String {
    let mut value = if options.trim {
        format!("normalize-space({subject})")
    } else {
        format!("string({subject})")
    };

    let mut needle = if options.trim {
        needle.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        needle.to_string()
    };

    if !options.case_sensitive {
        value = format!("translate({value}, '{UPPER}', '{LOWER}')");
        needle = fold_case(&needle);
    }

    let literal = xpath_literal(&needle);
    if options.exact {
        format!("{value}={literal}")
    } else {
        format!("contains({value}, {literal})")
    }
}

/// Lowercases `value` with the same table the generated `translate()` uses.
///
/// Characters outside [`UPPER`] are left as they are on both sides.
fn fold_case(value: &str) -> String {
    value
        .chars()
        .map(|c| match UPPER.chars().position(|u| u == c) {
            Some(i) => LOWER.chars().nth(i).unwrap_or(c),
            None => c,
        })
        .collect()
}

/// Tag conditions for roles a tag carries without an explicit `role`.
fn implicit_role(role: &str) -> Option<&'static str> {
    let cond = match role {
        "button" => {
            "self::button or (self::input and (@type='button' or @type='submit' or @type='reset'))"
        }
        "link" => "(self::a or self::area) and @href",
        "heading" => {
            "self::h1 or self::h2 or self::h3 or self::h4 or self::h5 or self::h6"
        }
        "textbox" => {
            "self::textarea or (self::input and (not(@type) or @type='text' or @type='email' \
             or @type='tel' or @type='url' or @type='search'))"
        }
        "checkbox" => "self::input and @type='checkbox'",
        "img" => "self::img",
        "list" => "self::ul or self::ol",
        "listitem" => "self::li",
        _ => return None,
    };
    Some(cond)
}

fn role_xpath(role: &str, options: &RoleOptions) -> String {
    let explicit = format!("@role={}", xpath_literal(role));
    let mut query = match implicit_role(role) {
        Some(cond) => format!("//*[{explicit} or (not(@role) and ({cond}))]"),
        None => format!("//*[{explicit}]"),
    };

    if let Some(name) = &options.name {
        let by_label = text_predicate("@aria-label", name, options.name_match);
        let by_text = text_predicate(".", name, options.name_match);
        query.push_str(&format!("[{by_label} or {by_text}]"));
    }

    if !options.include_hidden {
        query.push_str(&format!("[{HIDDEN_GUARD}]"));
    }

    query
}

/// Rewrites top-level `//` steps to `.//`.
///
/// Steps inside predicates and string literals are left alone. An opening
/// parenthesis outside a predicate starts a new branch.
fn relative_xpath(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 4);
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut at_branch_start = true;
    let mut chars = query.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                at_branch_start = false;
            }
            '[' => {
                depth += 1;
                at_branch_start = false;
            }
            ']' => {
                depth = depth.saturating_sub(1);
            }
            '(' => {
                out.push(c);
                at_branch_start = depth == 0;
                continue;
            }
            '|' if depth == 0 => {
                out.push(c);
                at_branch_start = true;
                continue;
            }
            '/' if depth == 0 && at_branch_start && chars.peek() == Some(&'/') => {
                out.push('.');
            }
            c if c.is_whitespace() => {
                out.push(c);
                continue;
            }
            _ => {}
        }

        if c != '/' || chars.peek() != Some(&'/') {
            at_branch_start = false;
        }
        out.push(c);
    }

    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use super::Strategy;
    use proptest::prelude::*;

    #[test]
    fn test_css_helpers() {
        assert_eq!(By::id("submit").compile().query(), "[id=\"submit\"]");
        assert_eq!(By::class("btn").compile().query(), "[class~=\"btn\"]");
        assert_eq!(By::name("email").compile().query(), "[name=\"email\"]");
        assert_eq!(By::test_id("save").compile().query(), "[data-testid=\"save\"]");
        assert_eq!(By::data("role", "x").compile().query(), "[data-role=\"x\"]");
        assert_eq!(By::attribute("disabled").compile().query(), "[disabled]");
        assert_eq!(By::tag("input").compile().query(), "input");
        assert_eq!(By::tag("input").compile().strategy(), Strategy::Css);
    }

    #[test]
    fn test_css_escaping() {
        let locator = By::attribute_value("title", r#"say "hi" \ bye"#).compile();
        assert_eq!(locator.query(), r#"[title="say \"hi\" \\ bye"]"#);
    }

    #[test]
    fn test_to_json() {
        let json = By::css("#a").compile().to_json();
        assert_eq!(json, json!({ "using": "css selector", "value": "#a" }));

        let json = By::xpath("//a").compile().to_json();
        assert_eq!(json["using"], "xpath");
    }

    #[test]
    fn test_xpath_literal_forms() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal(r#"it's "quoted""#),
            r#"concat('it', "'", 's "quoted"')"#
        );
        assert_eq!(xpath_literal(r#"'""#), r#"concat("'", '"')"#);
    }

    #[test]
    fn test_exact_text() {
        let locator = By::text("Exact Match").compile();
        assert_eq!(locator.strategy(), Strategy::XPath);
        assert_eq!(
            locator.query(),
            "//*[normalize-space(.)='Exact Match'][not(.//*[normalize-space(.)='Exact Match'])]"
        );
    }

    #[test]
    fn test_partial_text_is_innermost() {
        let query = By::partial_text("needle").compile().query().to_string();
        assert_eq!(
            query,
            "//*[contains(normalize-space(.), 'needle')][not(.//*[contains(normalize-space(.), 'needle')])]"
        );
    }

    #[test]
    fn test_text_untrimmed_uses_string() {
        let options = TextOptions::default().trim(false);
        let query = By::text_with("  a  b ", options).compile().query().to_string();
        assert!(query.starts_with("//*[string(.)='  a  b ']"));
    }

    #[test]
    fn test_text_trim_normalizes_needle() {
        let query = By::text("  Sign \n in ").compile().query().to_string();
        assert!(query.contains("normalize-space(.)='Sign in'"));
    }

    #[test]
    fn test_case_insensitive_text() {
        let options = TextOptions::partial().case_sensitive(false);
        let query = By::text_with("SUBMIT", options).compile().query().to_string();
        assert!(query.contains(&format!(
            "contains(translate(normalize-space(.), '{UPPER}', '{LOWER}'), 'submit')"
        )));
    }

    #[test]
    fn test_case_fold_matches_translate_table() {
        let options = TextOptions::default().case_sensitive(false);
        let query = By::text_with("ŁÓDŹ Zürich", options).compile().query().to_string();
        // Ł and Ź are outside the table, so they stay uppercase on both sides.
        assert!(query.contains("='ŁódŹ zürich'"));

        assert_eq!(fold_case("ÀÉÎ Straße ΑΒΓ"), "àéî straße ΑΒΓ");
    }

    #[test]
    fn test_role_with_implicit_tags_and_guard() {
        let query = By::role("button").compile().query().to_string();
        assert!(query.starts_with("//*[@role='button' or (not(@role) and (self::button"));
        assert!(query.ends_with(&format!("[{HIDDEN_GUARD}]")));
    }

    #[test]
    fn test_role_named() {
        let query = By::role_named("button", "Save").compile().query().to_string();
        assert!(query.contains("[normalize-space(@aria-label)='Save' or normalize-space(.)='Save']"));
    }

    #[test]
    fn test_role_include_hidden() {
        let options = RoleOptions {
            include_hidden: true,
            ..RoleOptions::default()
        };
        let query = By::role_with("dialog", options).compile().query().to_string();
        assert_eq!(query, "//*[@role='dialog']");
    }

    #[test]
    fn test_label_union() {
        let query = By::label("Email").compile().query().to_string();
        assert_eq!(
            query,
            "//*[@id=//label[normalize-space(.)='Email']/@for] | \
             //label[normalize-space(.)='Email']//*[self::input or self::textarea or self::select]"
        );
    }

    #[test]
    fn test_attribute_helpers() {
        assert_eq!(
            By::placeholder("Search").compile().query(),
            "//*[self::input or self::textarea][normalize-space(@placeholder)='Search']"
        );
        assert!(By::alt_text("Logo").compile().query().contains("@type='image'"));
        assert_eq!(
            By::title("Close").compile().query(),
            "//*[@title][normalize-space(@title)='Close']"
        );
    }

    #[test]
    fn test_link_text() {
        assert_eq!(
            By::link_text("Home").compile().query(),
            "//a[normalize-space(.)='Home']"
        );
        assert_eq!(
            By::partial_link_text("Read").compile().query(),
            "//a[contains(normalize-space(.), 'Read')]"
        );
    }

    #[test]
    fn test_relative_rewrites_top_level_only() {
        let rel = By::label("Email").compile().relative();
        assert!(rel.query().starts_with(".//*[@id=//label["));
        assert!(rel.query().contains("| .//label["));

        let rel = Locator::new(Strategy::XPath, "//a[contains(., '//')]").relative();
        assert_eq!(rel.query(), ".//a[contains(., '//')]");

        let rel = Locator::new(Strategy::XPath, ".//a").relative();
        assert_eq!(rel.query(), ".//a");

        let rel = Locator::new(Strategy::XPath, "(//a)[1]").relative();
        assert_eq!(rel.query(), "(.//a)[1]");

        let rel = Locator::new(Strategy::XPath, "(//a | //b)[last()]").relative();
        assert_eq!(rel.query(), "(.//a | .//b)[last()]");

        let rel = Locator::new(Strategy::XPath, "//a[count(//b) > 1]").relative();
        assert_eq!(rel.query(), ".//a[count(//b) > 1]");

        let css = By::css("#a").compile();
        assert_eq!(css.relative(), css);
    }

    #[test]
    fn test_display() {
        assert_eq!(By::css("#a").to_string(), "css selector:#a");
    }

    #[test]
    fn test_from_str() {
        let by: By = "#login".into();
        assert!(matches!(by, By::Css(_)));
    }

    /// Decodes a literal produced by [`xpath_literal`].
    fn decode_literal(lit: &str) -> String {
        if let Some(inner) = lit.strip_prefix("concat(").and_then(|s| s.strip_suffix(')')) {
            inner.split(", ").map(decode_literal).collect()
        } else {
            lit[1..lit.len() - 1].to_string()
        }
    }

    proptest! {
        #[test]
        fn prop_xpath_literal_round_trips(s in "[a-z '\",]{0,24}") {
            prop_assume!(!s.contains(", "));
            prop_assert_eq!(decode_literal(&xpath_literal(&s)), s);
        }

        #[test]
        fn prop_css_escape_round_trips(s in ".{0,32}") {
            let escaped = css_escape(&s);
            let mut out = String::new();
            let mut chars = escaped.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    out.extend(chars.next());
                } else {
                    prop_assert_ne!(c, '"');
                    out.push(c);
                }
            }
            prop_assert_eq!(out, s);
        }

        #[test]
        fn prop_text_compiles_to_xpath(
            s in ".{0,32}",
            exact in any::<bool>(),
            cs in any::<bool>(),
            trim in any::<bool>(),
        ) {
            let options = TextOptions { exact, case_sensitive: cs, trim };
            let locator = By::text_with(s, options).compile();
            prop_assert_eq!(locator.strategy(), Strategy::XPath);
            prop_assert!(locator.query().starts_with("//*["));
        }
    }
}
