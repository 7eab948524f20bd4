//! Page handle: navigation, keyboard, routes and locators over a driver.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::PageSettings;
use crate::driver::{Key, LoadState, NavigationResponse, PageDriver, Viewport};
use crate::locator::{Locator, LocatorChain};
use crate::network::{self, AbortReason, MockResponse, NetworkEntry, Route, UrlPattern};
use crate::performance::PerformanceSnapshot;
use crate::result::{E2eError, E2eResult};

#[derive(Debug)]
struct PageInner {
    driver: Arc<dyn PageDriver>,
    settings: PageSettings,
    viewport: Mutex<Viewport>,
}

/// Cheaply clonable handle to one open page
#[derive(Debug, Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

impl Page {
    /// Wrap a driver page
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, settings: PageSettings, viewport: Viewport) -> Self {
        Self {
            inner: Arc::new(PageInner {
                driver,
                settings,
                viewport: Mutex::new(viewport),
            }),
        }
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &dyn PageDriver {
        self.inner.driver.as_ref()
    }

    /// Timing settings
    #[must_use]
    pub fn settings(&self) -> &PageSettings {
        &self.inner.settings
    }

    /// Resolve a path or URL against the base URL
    #[must_use]
    pub fn resolve(&self, target: &str) -> String {
        network::resolve_url(&self.inner.settings.base_url, target)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Navigate to a path (resolved against the base URL) or absolute URL
    pub async fn goto(&self, target: &str) -> E2eResult<NavigationResponse> {
        let url = self.resolve(target);
        tracing::debug!(%url, "goto");
        let response = self.driver().goto(&url).await?;
        tracing::debug!(url = %response.url, status = response.status, "navigated");
        Ok(response)
    }

    /// Reload the current document
    pub async fn reload(&self) -> E2eResult<NavigationResponse> {
        tracing::debug!("reload");
        self.driver().reload().await
    }

    /// History back
    pub async fn go_back(&self) -> E2eResult<Option<NavigationResponse>> {
        self.driver().go_back().await
    }

    /// History forward
    pub async fn go_forward(&self) -> E2eResult<Option<NavigationResponse>> {
        self.driver().go_forward().await
    }

    /// Current URL
    pub async fn url(&self) -> E2eResult<String> {
        self.driver().url().await
    }

    /// Path of the current URL
    pub async fn path(&self) -> E2eResult<String> {
        Ok(network::url_path(&self.url().await?).to_string())
    }

    /// Document title
    pub async fn title(&self) -> E2eResult<String> {
        self.driver().title().await
    }

    // ========================================================================
    // Viewport
    // ========================================================================

    /// Resize the viewport
    pub async fn set_viewport_size(&self, width: u32, height: u32) -> E2eResult<()> {
        let viewport = Viewport::new(width, height);
        self.driver().set_viewport(viewport).await?;
        *self
            .inner
            .viewport
            .lock()
            .map_err(|_| E2eError::page("viewport lock poisoned"))? = viewport;
        Ok(())
    }

    /// Current viewport
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.inner
            .viewport
            .lock()
            .map_or_else(|poisoned| *poisoned.into_inner(), |v| *v)
    }

    // ========================================================================
    // Locators and keyboard
    // ========================================================================

    /// Locator over the whole document
    #[must_use]
    pub fn locator(&self, selector: &str) -> Locator {
        Locator::new(self.clone(), LocatorChain::new(selector))
    }

    /// Press a key on whatever has focus (`Tab`, `Shift+Tab`, `Enter`, ...)
    pub async fn keyboard_press(&self, key: &str) -> E2eResult<()> {
        let key = Key::parse(key)?;
        tracing::trace!(?key, "keyboard press");
        self.driver().press_key(key).await
    }

    // ========================================================================
    // Network
    // ========================================================================

    /// Fulfil requests matching `pattern` with `response`
    pub async fn route(
        &self,
        pattern: impl Into<UrlPattern>,
        response: MockResponse,
    ) -> E2eResult<()> {
        self.driver().route(Route::fulfill(pattern, response)).await
    }

    /// Fail requests matching `pattern`
    pub async fn route_abort(
        &self,
        pattern: impl Into<UrlPattern>,
        reason: AbortReason,
    ) -> E2eResult<()> {
        self.driver().route(Route::abort(pattern, reason)).await
    }

    /// Remove all routes of this page
    pub async fn unroute_all(&self) -> E2eResult<()> {
        self.driver().unroute_all().await
    }

    /// Requests made by this page so far
    pub async fn network_log(&self) -> E2eResult<Vec<NetworkEntry>> {
        self.driver().network_log().await
    }

    // ========================================================================
    // Waiting
    // ========================================================================

    /// Wait for a load milestone (bounded by the expectation timeout)
    pub async fn wait_for_load_state(&self, state: LoadState) -> E2eResult<()> {
        self.driver()
            .wait_for_load_state(state, self.settings().expect_timeout)
            .await
    }

    /// Wait until `selector` has a visible match
    pub async fn wait_for_selector(&self, selector: &str) -> E2eResult<Locator> {
        let locator = self.locator(selector).first();
        let timeout = self.settings().expect_timeout;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if locator.is_visible().await? {
                return Ok(locator);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(E2eError::timeout(
                    timeout.as_millis() as u64,
                    format!("selector `{selector}` to be visible"),
                ));
            }
            tokio::time::sleep(self.settings().poll_interval).await;
        }
    }

    /// Sleep
    pub async fn wait_for_timeout(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    // ========================================================================
    // Scripts and metrics
    // ========================================================================

    /// Evaluate a script expression
    pub async fn evaluate(&self, expression: &str) -> E2eResult<serde_json::Value> {
        self.driver().evaluate(expression).await
    }

    /// Web-vitals snapshot
    pub async fn performance(&self) -> E2eResult<PerformanceSnapshot> {
        self.driver().performance().await
    }

    /// Close the page, discarding its routes
    pub async fn close(&self) -> E2eResult<()> {
        self.driver().close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::driver::Browser;
    use crate::fixture::FixtureBrowser;

    async fn open(config: &RunConfig) -> Page {
        let browser = FixtureBrowser::default();
        let driver = browser.new_page(Viewport::DESKTOP).await.unwrap();
        Page::new(driver, config.page_settings(), Viewport::DESKTOP)
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test]
        async fn test_paths_resolve_against_base_url() {
            let page = open(&RunConfig::default().with_base_url("http://blog.test")).await;
            assert_eq!(page.resolve("/posts/1"), "http://blog.test/posts/1");
            assert_eq!(
                page.resolve("https://github.com/hnlearndev"),
                "https://github.com/hnlearndev"
            );
        }

        #[tokio::test]
        async fn test_goto_and_history() {
            let page = open(&RunConfig::default()).await;
            let response = page.goto("/").await.unwrap();
            assert_eq!(response.status, 200);
            page.goto("/posts/1").await.unwrap();
            assert_eq!(page.path().await.unwrap(), "/posts/1");

            assert!(page.go_back().await.unwrap().is_some());
            assert_eq!(page.path().await.unwrap(), "/");
            assert!(page.go_forward().await.unwrap().is_some());
            assert_eq!(page.path().await.unwrap(), "/posts/1");
        }
    }

    mod viewport_tests {
        use super::*;

        #[tokio::test]
        async fn test_set_viewport_size_updates_handle() {
            let page = open(&RunConfig::default()).await;
            page.set_viewport_size(375, 667).await.unwrap();
            assert_eq!(page.viewport(), Viewport::MOBILE);
        }
    }

    mod waiting_tests {
        use super::*;

        #[tokio::test]
        async fn test_wait_for_selector_times_out() {
            let page = open(&RunConfig::default().with_expect_timeout_ms(100)).await;
            page.goto("/").await.unwrap();
            let err = page.wait_for_selector(".comments").await.unwrap_err();
            assert!(matches!(err, E2eError::Timeout { .. }));
        }

        #[tokio::test]
        async fn test_wait_for_selector_finds_nav() {
            let page = open(&RunConfig::default()).await;
            page.goto("/").await.unwrap();
            let nav = page.wait_for_selector("nav").await.unwrap();
            assert_eq!(nav.count().await.unwrap(), 1);
        }

        #[tokio::test]
        async fn test_evaluate_is_unsupported_on_fixture() {
            let page = open(&RunConfig::default()).await;
            let err = page.evaluate("document.title").await.unwrap_err();
            assert!(matches!(err, E2eError::Unsupported { .. }));
        }
    }
}
