//! Scenarios: the unit the runner schedules.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::driver::Viewport;
use crate::page::Page;
use crate::result::E2eResult;

/// Boxed scenario future
pub type ScenarioFuture = Pin<Box<dyn Future<Output = E2eResult<()>> + Send + 'static>>;

/// Scenario body: receives a fresh page, returns when every assertion held
pub type ScenarioBody = Arc<dyn Fn(Page) -> ScenarioFuture + Send + Sync>;

/// One independent browser-driven test case
#[derive(Clone)]
pub struct Scenario {
    /// Suite (feature area), e.g. `Homepage`
    pub suite: &'static str,
    /// Group within the suite, e.g. `Page Structure`
    pub group: &'static str,
    /// Scenario name
    pub name: &'static str,
    /// Viewport the page is opened with
    pub viewport: Viewport,
    /// Path navigated to before the body runs
    pub start_path: Option<&'static str>,
    /// Overrides the run's scenario timeout
    pub timeout: Option<Duration>,
    body: ScenarioBody,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("id", &self.id())
            .field("viewport", &self.viewport)
            .field("start_path", &self.start_path)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Scenario {
    /// Create a scenario from an async function taking the page
    pub fn new<F, Fut>(
        suite: &'static str,
        group: &'static str,
        name: &'static str,
        body: F,
    ) -> Self
    where
        F: Fn(Page) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<()>> + Send + 'static,
    {
        Self {
            suite,
            group,
            name,
            viewport: Viewport::default(),
            start_path: None,
            timeout: None,
            body: Arc::new(move |page| Box::pin(body(page))),
        }
    }

    /// Open the page with `viewport`
    #[must_use]
    pub const fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Navigate to `path` before the body runs
    #[must_use]
    pub const fn with_start_path(mut self, path: &'static str) -> Self {
        self.start_path = Some(path);
        self
    }

    /// Override the scenario timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `Suite › Group › name` (group omitted when empty)
    #[must_use]
    pub fn id(&self) -> String {
        if self.group.is_empty() {
            format!("{} › {}", self.suite, self.name)
        } else {
            format!("{} › {} › {}", self.suite, self.group, self.name)
        }
    }

    /// Start the body on `page`
    #[must_use]
    pub fn run(&self, page: Page) -> ScenarioFuture {
        (self.body)(page)
    }
}

/// Builder for a suite's scenarios sharing a group, viewport and start path
#[derive(Debug)]
pub struct SuiteBuilder {
    suite: &'static str,
    group: &'static str,
    viewport: Viewport,
    start_path: Option<&'static str>,
    scenarios: Vec<Scenario>,
}

impl SuiteBuilder {
    /// Start a suite
    #[must_use]
    pub fn new(suite: &'static str) -> Self {
        Self {
            suite,
            group: "",
            viewport: Viewport::default(),
            start_path: None,
            scenarios: Vec::new(),
        }
    }

    /// Navigate to `path` before every following scenario
    #[must_use]
    pub const fn start_at(mut self, path: &'static str) -> Self {
        self.start_path = Some(path);
        self
    }

    /// Stop navigating before following scenarios
    #[must_use]
    pub const fn no_start(mut self) -> Self {
        self.start_path = None;
        self
    }

    /// Group for following scenarios
    #[must_use]
    pub const fn group(mut self, group: &'static str) -> Self {
        self.group = group;
        self
    }

    /// Viewport for following scenarios
    #[must_use]
    pub const fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Add a scenario
    #[must_use]
    pub fn scenario<F, Fut>(mut self, name: &'static str, body: F) -> Self
    where
        F: Fn(Page) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<()>> + Send + 'static,
    {
        let mut scenario =
            Scenario::new(self.suite, self.group, name, body).with_viewport(self.viewport);
        scenario.start_path = self.start_path;
        self.scenarios.push(scenario);
        self
    }

    /// Finished scenario list
    #[must_use]
    pub fn build(self) -> Vec<Scenario> {
        self.scenarios
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids() {
        let with_group = Scenario::new("Homepage", "Page Structure", "has one h1", |_| async { Ok(()) });
        assert_eq!(with_group.id(), "Homepage › Page Structure › has one h1");
        let without = Scenario::new("Smoke", "", "has title", |_| async { Ok(()) });
        assert_eq!(without.id(), "Smoke › has title");
    }

    #[test]
    fn test_builder_applies_group_viewport_and_start() {
        let scenarios = SuiteBuilder::new("Responsive Design")
            .start_at("/")
            .group("Mobile")
            .viewport(Viewport::MOBILE)
            .scenario("a", |_| async { Ok(()) })
            .group("Desktop")
            .viewport(Viewport::DESKTOP)
            .no_start()
            .scenario("b", |_| async { Ok(()) })
            .build();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].viewport, Viewport::MOBILE);
        assert_eq!(scenarios[0].start_path, Some("/"));
        assert_eq!(scenarios[0].group, "Mobile");
        assert_eq!(scenarios[1].viewport, Viewport::DESKTOP);
        assert_eq!(scenarios[1].start_path, None);
    }

    #[test]
    fn test_debug_shows_id() {
        let scenario = Scenario::new("Smoke", "", "x", |_| async { Ok(()) })
            .with_timeout(Duration::from_secs(1));
        let debug = format!("{scenario:?}");
        assert!(debug.contains("Smoke › x"));
    }
}
