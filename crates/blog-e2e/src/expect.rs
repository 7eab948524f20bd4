//! Auto-waiting expectations.
//!
//! Locator and page assertions poll until they hold or the expectation
//! timeout elapses. On timeout the failure is a [`E2eError::Timeout`] when
//! the locator never resolved to an element, otherwise an
//! [`E2eError::Assertion`] carrying the expected value and the last value
//! observed. Value assertions ([`expect_that`]) check once.

use std::fmt::Debug;
use std::time::Duration;

use regex::Regex;

use crate::driver::ElementState;
use crate::locator::Locator;
use crate::network::url_path;
use crate::page::Page;
use crate::result::{E2eError, E2eResult};
use crate::selector::normalize_whitespace;

// ============================================================================
// Matchers
// ============================================================================

/// String matcher
#[derive(Debug, Clone)]
pub enum TextMatcher {
    /// Equal to the literal
    Exact(String),
    /// Contains the literal
    Contains(String),
    /// Regular expression finds a match
    Pattern(Regex),
}

impl TextMatcher {
    /// Regex matcher
    pub fn pattern(pattern: &str) -> E2eResult<Self> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|e| E2eError::config(format!("invalid pattern `{pattern}`: {e}")))
    }

    /// Check a value
    #[must_use]
    pub fn matches(&self, actual: &str) -> bool {
        match self {
            Self::Exact(expected) => actual == expected,
            Self::Contains(needle) => actual.contains(needle.as_str()),
            Self::Pattern(re) => re.is_match(actual),
        }
    }
}

impl std::fmt::Display for TextMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "{s:?}"),
            Self::Contains(s) => write!(f, "containing {s:?}"),
            Self::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl From<&str> for TextMatcher {
    fn from(value: &str) -> Self {
        Self::Exact(value.to_string())
    }
}

impl From<String> for TextMatcher {
    fn from(value: String) -> Self {
        Self::Exact(value)
    }
}

impl From<Regex> for TextMatcher {
    fn from(value: Regex) -> Self {
        Self::Pattern(value)
    }
}

// ============================================================================
// Polling core
// ============================================================================

enum Observation {
    /// Nothing to inspect yet
    Unresolved,
    /// No element, which satisfies only a negated visibility check
    Detached,
    /// Inspected; whether the positive form holds and what was seen
    Resolved { pass: bool, actual: String },
}

fn first_or_unresolved(states: &[ElementState], f: impl FnOnce(&ElementState) -> (bool, String)) -> Observation {
    match states.first() {
        None => Observation::Unresolved,
        Some(state) => {
            let (pass, actual) = f(state);
            Observation::Resolved { pass, actual }
        }
    }
}

struct Poller {
    timeout: Duration,
    interval: Duration,
    negated: bool,
}

impl Poller {
    async fn run<S, Fut>(&self, subject: &str, expected: &str, mut sample: S) -> E2eResult<()>
    where
        S: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = E2eResult<Observation>> + Send,
    {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut last_actual: Option<String> = None;
        loop {
            match sample().await? {
                Observation::Unresolved => {}
                Observation::Detached => {
                    if self.negated {
                        return Ok(());
                    }
                }
                Observation::Resolved { pass, actual } => {
                    if pass != self.negated {
                        return Ok(());
                    }
                    last_actual = Some(actual);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                let expected = if self.negated {
                    format!("not {expected}")
                } else {
                    expected.to_string()
                };
                return Err(match last_actual {
                    None => E2eError::timeout(
                        self.timeout.as_millis() as u64,
                        format!("{subject} to be {expected}"),
                    ),
                    Some(actual) => E2eError::assertion(subject, expected, actual),
                });
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

// ============================================================================
// Locator assertions
// ============================================================================

/// Start a locator assertion
#[must_use]
pub fn expect(locator: &Locator) -> LocatorAssertions {
    LocatorAssertions {
        locator: locator.clone(),
        negated: false,
        timeout: None,
    }
}

/// Start a page assertion
#[must_use]
pub fn expect_page(page: &Page) -> PageAssertions {
    PageAssertions {
        page: page.clone(),
        negated: false,
        timeout: None,
    }
}

/// Auto-waiting assertions over a locator
#[derive(Debug, Clone)]
pub struct LocatorAssertions {
    locator: Locator,
    negated: bool,
    timeout: Option<Duration>,
}

impl LocatorAssertions {
    /// Negate the next assertion
    #[must_use]
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Override the expectation timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn poller(&self) -> Poller {
        let settings = self.locator.page().settings();
        Poller {
            timeout: self.timeout.unwrap_or(settings.expect_timeout),
            interval: settings.poll_interval,
            negated: self.negated,
        }
    }

    async fn check<F>(&self, what: &str, expected: String, observe: F) -> E2eResult<()>
    where
        F: Fn(&[ElementState]) -> Observation + Send + Sync,
    {
        let subject = format!("`{}` {what}", self.locator.describe());
        let locator = &self.locator;
        let observe = &observe;
        self.poller()
            .run(&subject, &expected, move || async move {
                let states = locator.inspect_all().await?;
                Ok::<_, E2eError>(observe(&states))
            })
            .await
    }

    /// First match is visible
    pub async fn to_be_visible(&self) -> E2eResult<()> {
        self.check("visibility", "visible".into(), |states| match states.first() {
            None => Observation::Detached,
            Some(s) => Observation::Resolved {
                pass: s.visible,
                actual: visibility(s),
            },
        })
        .await
    }

    /// No match, or first match not visible
    pub async fn to_be_hidden(&self) -> E2eResult<()> {
        self.check("visibility", "hidden".into(), |states| match states.first() {
            None => Observation::Resolved {
                pass: true,
                actual: "detached".into(),
            },
            Some(s) => Observation::Resolved {
                pass: !s.visible,
                actual: visibility(s),
            },
        })
        .await
    }

    /// Whitespace-normalised text of the first match satisfies `matcher`
    pub async fn to_have_text(&self, matcher: impl Into<TextMatcher>) -> E2eResult<()> {
        let matcher = matcher.into();
        self.check("text", matcher.to_string(), |states| {
            first_or_unresolved(states, |s| {
                let text = normalize_whitespace(&s.text);
                (matcher.matches(&text), format!("{text:?}"))
            })
        })
        .await
    }

    /// Text of the first match contains `needle`
    pub async fn to_contain_text(&self, needle: &str) -> E2eResult<()> {
        self.to_have_text(TextMatcher::Contains(needle.to_string()))
            .await
    }

    /// Attribute of the first match satisfies `matcher`
    pub async fn to_have_attribute(
        &self,
        name: &str,
        matcher: impl Into<TextMatcher>,
    ) -> E2eResult<()> {
        let matcher = matcher.into();
        self.check(
            &format!("attribute `{name}`"),
            matcher.to_string(),
            |states| {
                first_or_unresolved(states, |s| match s.attribute(name) {
                    Some(value) => (matcher.matches(value), format!("{value:?}")),
                    None => (false, "<absent>".to_string()),
                })
            },
        )
        .await
    }

    /// First match has the attribute, any value
    pub async fn to_have_attribute_present(&self, name: &str) -> E2eResult<()> {
        self.check(&format!("attribute `{name}`"), "present".into(), |states| {
            first_or_unresolved(states, |s| match s.attribute(name) {
                Some(value) => (true, format!("{value:?}")),
                None => (false, "<absent>".to_string()),
            })
        })
        .await
    }

    /// `class` attribute of the first match satisfies `matcher`
    pub async fn to_have_class(&self, matcher: impl Into<TextMatcher>) -> E2eResult<()> {
        let matcher = matcher.into();
        self.check("class", matcher.to_string(), |states| {
            first_or_unresolved(states, |s| {
                let class = s.attribute("class").unwrap_or_default();
                (matcher.matches(class), format!("{class:?}"))
            })
        })
        .await
    }

    /// Exactly `n` matches
    pub async fn to_have_count(&self, n: usize) -> E2eResult<()> {
        self.check("count", n.to_string(), |states| Observation::Resolved {
            pass: states.len() == n,
            actual: states.len().to_string(),
        })
        .await
    }

    /// More than `n` matches
    pub async fn to_have_count_greater_than(&self, n: usize) -> E2eResult<()> {
        self.check("count", format!("> {n}"), |states| Observation::Resolved {
            pass: states.len() > n,
            actual: states.len().to_string(),
        })
        .await
    }

    /// First match has keyboard focus
    pub async fn to_be_focused(&self) -> E2eResult<()> {
        self.check("focus", "focused".into(), |states| {
            first_or_unresolved(states, |s| {
                let actual = if s.focused { "focused" } else { "not focused" };
                (s.focused, actual.to_string())
            })
        })
        .await
    }

    /// First match is disabled
    pub async fn to_be_disabled(&self) -> E2eResult<()> {
        self.check("state", "disabled".into(), |states| {
            first_or_unresolved(states, |s| (s.disabled, enabled_state(s)))
        })
        .await
    }

    /// First match is enabled
    pub async fn to_be_enabled(&self) -> E2eResult<()> {
        self.check("state", "enabled".into(), |states| {
            first_or_unresolved(states, |s| (!s.disabled, enabled_state(s)))
        })
        .await
    }

    /// Value of the first (form control) match satisfies `matcher`
    pub async fn to_have_value(&self, matcher: impl Into<TextMatcher>) -> E2eResult<()> {
        let matcher = matcher.into();
        self.check("value", matcher.to_string(), |states| {
            first_or_unresolved(states, |s| match &s.value {
                Some(value) => (matcher.matches(value), format!("{value:?}")),
                None => (false, "<not a form control>".to_string()),
            })
        })
        .await
    }
}

fn visibility(state: &ElementState) -> String {
    let label = if state.visible { "visible" } else { "hidden" };
    label.to_string()
}

fn enabled_state(state: &ElementState) -> String {
    let label = if state.disabled { "disabled" } else { "enabled" };
    label.to_string()
}

// ============================================================================
// Page assertions
// ============================================================================

/// Auto-waiting assertions over a page
#[derive(Debug, Clone)]
pub struct PageAssertions {
    page: Page,
    negated: bool,
    timeout: Option<Duration>,
}

impl PageAssertions {
    /// Negate the next assertion
    #[must_use]
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Override the expectation timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn poller(&self) -> Poller {
        let settings = self.page.settings();
        Poller {
            timeout: self.timeout.unwrap_or(settings.expect_timeout),
            interval: settings.poll_interval,
            negated: self.negated,
        }
    }

    /// Document title satisfies `matcher`
    pub async fn to_have_title(&self, matcher: impl Into<TextMatcher>) -> E2eResult<()> {
        let matcher = matcher.into();
        let page = &self.page;
        let matcher = &matcher;
        self.poller()
            .run("page title", &matcher.to_string(), move || async move {
                let title = page.title().await?;
                Ok::<_, E2eError>(Observation::Resolved {
                    pass: matcher.matches(&title),
                    actual: format!("{title:?}"),
                })
            })
            .await
    }

    /// URL satisfies `matcher`; an exact value starting with `/` is compared
    /// with the URL's path
    pub async fn to_have_url(&self, matcher: impl Into<TextMatcher>) -> E2eResult<()> {
        let matcher = matcher.into();
        let page = &self.page;
        let matcher = &matcher;
        self.poller()
            .run("page url", &matcher.to_string(), move || async move {
                let url = page.url().await?;
                let pass = match matcher {
                    TextMatcher::Exact(expected) if expected.starts_with('/') => {
                        url_path(&url) == expected.as_str()
                    }
                    other => other.matches(&url),
                };
                Ok::<_, E2eError>(Observation::Resolved {
                    pass,
                    actual: format!("{url:?}"),
                })
            })
            .await
    }
}

// ============================================================================
// Value assertions
// ============================================================================

/// Values that have a truthiness
pub trait Truthy {
    /// Whether the value counts as "present"
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for &str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for usize {
    fn is_truthy(&self) -> bool {
        *self != 0
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::is_truthy)
    }
}

/// Immediate assertion over a value
#[must_use]
pub fn expect_that<T>(value: T) -> ValueAssertion<T> {
    ValueAssertion {
        value,
        description: "value".to_string(),
    }
}

/// Immediate (non-polled) assertions
#[derive(Debug, Clone)]
pub struct ValueAssertion<T> {
    value: T,
    description: String,
}

impl<T: Debug> ValueAssertion<T> {
    /// Name the value in failure messages
    #[must_use]
    pub fn described_as(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn verdict(&self, pass: bool, expected: String) -> E2eResult<()> {
        if pass {
            Ok(())
        } else {
            Err(E2eError::assertion(
                self.description.clone(),
                expected,
                format!("{:?}", self.value),
            ))
        }
    }

    /// Equal to `expected`
    pub fn to_equal<U>(&self, expected: U) -> E2eResult<()>
    where
        T: PartialEq<U>,
        U: Debug,
    {
        self.verdict(self.value == expected, format!("{expected:?}"))
    }

    /// Not equal to `unexpected`
    pub fn not_to_equal<U>(&self, unexpected: U) -> E2eResult<()>
    where
        T: PartialEq<U>,
        U: Debug,
    {
        self.verdict(self.value != unexpected, format!("not {unexpected:?}"))
    }

    /// Strictly less than `limit`
    pub fn to_be_less_than<U>(&self, limit: U) -> E2eResult<()>
    where
        T: PartialOrd<U>,
        U: Debug,
    {
        self.verdict(self.value < limit, format!("< {limit:?}"))
    }

    /// Less than or equal to `limit`
    pub fn to_be_less_than_or_equal<U>(&self, limit: U) -> E2eResult<()>
    where
        T: PartialOrd<U>,
        U: Debug,
    {
        self.verdict(self.value <= limit, format!("<= {limit:?}"))
    }

    /// Strictly greater than `limit`
    pub fn to_be_greater_than<U>(&self, limit: U) -> E2eResult<()>
    where
        T: PartialOrd<U>,
        U: Debug,
    {
        self.verdict(self.value > limit, format!("> {limit:?}"))
    }

    /// Greater than or equal to `limit`
    pub fn to_be_greater_than_or_equal<U>(&self, limit: U) -> E2eResult<()>
    where
        T: PartialOrd<U>,
        U: Debug,
    {
        self.verdict(self.value >= limit, format!(">= {limit:?}"))
    }

    /// Truthy (non-empty, non-zero, `Some`, `true`)
    pub fn to_be_truthy(&self) -> E2eResult<()>
    where
        T: Truthy,
    {
        self.verdict(self.value.is_truthy(), "truthy".to_string())
    }

    /// Matches a regular expression
    pub fn to_match(&self, pattern: &str) -> E2eResult<()>
    where
        T: AsRef<str>,
    {
        let matcher = TextMatcher::pattern(pattern)?;
        self.verdict(matcher.matches(self.value.as_ref()), matcher.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod matcher_tests {
        use super::*;

        #[test]
        fn test_text_matchers() {
            assert!(TextMatcher::from("Willian Nguyen").matches("Willian Nguyen"));
            assert!(!TextMatcher::from("Willian").matches("Willian Nguyen"));
            assert!(TextMatcher::Contains("Willian".into()).matches("Willian Nguyen"));
            assert!(TextMatcher::pattern(r"\d{2}-\w{3}-\d{4}").unwrap().matches("15-Sep-2025"));
            assert!(TextMatcher::pattern("(").is_err());
        }

        #[test]
        fn test_matcher_display() {
            assert_eq!(TextMatcher::from("a").to_string(), "\"a\"");
            assert_eq!(TextMatcher::pattern("^/posts/").unwrap().to_string(), "/^/posts//");
        }
    }

    mod negation_tests {
        use super::*;
        use crate::config::RunConfig;
        use crate::driver::{Browser, Viewport};
        use crate::fixture::FixtureBrowser;

        async fn home() -> Page {
            let config = RunConfig::default().with_expect_timeout_ms(150);
            let driver = FixtureBrowser::default()
                .new_page(Viewport::DESKTOP)
                .await
                .unwrap();
            let page = Page::new(driver, config.page_settings(), Viewport::DESKTOP);
            page.goto("/").await.unwrap();
            page
        }

        #[tokio::test]
        async fn test_missing_element_is_not_visible() {
            let page = home().await;
            assert!(expect(&page.locator(".no-such-input"))
                .not()
                .to_be_visible()
                .await
                .is_ok());
        }

        #[tokio::test]
        async fn test_missing_element_fails_other_negations() {
            let page = home().await;
            let missing = page.locator(".no-such-input");
            let results = [
                expect(&missing).not().to_be_disabled().await,
                expect(&missing).not().to_have_text("Subscribe").await,
                expect(&missing).not().to_be_focused().await,
            ];
            for result in results {
                assert!(matches!(result, Err(E2eError::Timeout { .. })), "{result:?}");
            }
        }

        #[tokio::test]
        async fn test_negation_on_present_element() {
            let page = home().await;
            let h1 = page.locator("h1");
            assert!(expect(&h1).not().to_have_text("Goodbye").await.is_ok());
            assert!(matches!(
                expect(&h1).not().to_be_visible().await,
                Err(E2eError::Assertion { .. })
            ));
        }
    }

    mod value_tests {
        use super::*;

        #[test]
        fn test_comparisons() {
            assert!(expect_that(3).to_equal(3).is_ok());
            assert!(expect_that(3).not_to_equal(4).is_ok());
            assert!(expect_that(120.0).to_be_less_than(2500.0).is_ok());
            assert!(expect_that(375.0).to_be_less_than_or_equal(375.0).is_ok());
            assert!(expect_that(44.0).to_be_greater_than_or_equal(44.0).is_ok());
            assert!(expect_that(5_usize).to_be_greater_than(3_usize).is_ok());
        }

        #[test]
        fn test_failure_carries_expected_and_actual() {
            let err = expect_that(3000_u64)
                .described_as("load time ms")
                .to_be_less_than(3000_u64)
                .unwrap_err();
            match err {
                E2eError::Assertion {
                    description,
                    expected,
                    actual,
                } => {
                    assert_eq!(description, "load time ms");
                    assert_eq!(expected, "< 3000");
                    assert_eq!(actual, "3000");
                }
                other => panic!("unexpected error {other:?}"),
            }
        }

        #[test]
        fn test_truthy_and_match() {
            assert!(expect_that(Some("website".to_string())).to_be_truthy().is_ok());
            assert!(expect_that(None::<String>).to_be_truthy().is_err());
            assert!(expect_that("").to_be_truthy().is_err());
            assert!(expect_that("https://x.dev").to_match(r"^https?://").is_ok());
            assert!(expect_that("/x").to_match(r"^https?://").is_err());
        }
    }
}
