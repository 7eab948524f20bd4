//! Parallel scenario runner.
//!
//! Every scenario gets a fresh page from the [`Browser`] (its own context),
//! runs under the scenario timeout, and its page is closed afterwards whether
//! it passed, failed or timed out. Concurrency is bounded by a semaphore.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use regex::Regex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::config::RunConfig;
use crate::driver::Browser;
use crate::page::Page;
use crate::reporter::{ScenarioOutcome, RunReport};
use crate::result::{E2eError, E2eResult};
use crate::scenario::Scenario;

/// Callback invoked as each scenario finishes
pub type ProgressFn = Arc<dyn Fn(&ScenarioOutcome) + Send + Sync>;

// ============================================================================
// Filter
// ============================================================================

/// Scenario selection by suite name and id pattern
#[derive(Debug, Clone, Default)]
pub struct ScenarioFilter {
    suites: Vec<String>,
    grep: Option<Regex>,
}

impl ScenarioFilter {
    /// Select everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to suites (case-insensitive; `-`/`_` equal space)
    #[must_use]
    pub fn with_suites<I, S>(mut self, suites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.suites = suites.into_iter().map(|s| suite_key(s.as_ref())).collect();
        self
    }

    /// Restrict to ids matching `pattern`
    pub fn with_grep(mut self, pattern: &str) -> E2eResult<Self> {
        let re = Regex::new(pattern)
            .map_err(|e| E2eError::config(format!("invalid --grep pattern `{pattern}`: {e}")))?;
        self.grep = Some(re);
        Ok(self)
    }

    /// Check one scenario
    #[must_use]
    pub fn matches(&self, scenario: &Scenario) -> bool {
        let suite_ok = self.suites.is_empty() || self.suites.contains(&suite_key(scenario.suite));
        let grep_ok = self
            .grep
            .as_ref()
            .map_or(true, |re| re.is_match(&scenario.id()));
        suite_ok && grep_ok
    }

    /// Keep matching scenarios, preserving order
    #[must_use]
    pub fn apply(&self, scenarios: Vec<Scenario>) -> Vec<Scenario> {
        scenarios.into_iter().filter(|s| self.matches(s)).collect()
    }
}

/// Normalised suite key: `Blog Posts`, `blog-posts` and `blog_posts` agree
#[must_use]
pub fn suite_key(name: &str) -> String {
    name.to_ascii_lowercase().replace(['-', '_'], " ")
}

// ============================================================================
// Runner
// ============================================================================

/// Executes scenarios against a browser
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    browser: Arc<dyn Browser>,
    config: RunConfig,
    driver_name: String,
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub fn new(browser: Arc<dyn Browser>, config: RunConfig) -> Self {
        Self {
            browser,
            config,
            driver_name: "browser".to_string(),
        }
    }

    /// Driver name recorded in reports
    #[must_use]
    pub fn with_driver_name(mut self, name: impl Into<String>) -> Self {
        self.driver_name = name.into();
        self
    }

    /// Run configuration
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run scenarios and collect a report
    pub async fn run(&self, scenarios: Vec<Scenario>) -> RunReport {
        self.run_with_progress(scenarios, None).await
    }

    /// Run scenarios, reporting each outcome as it completes
    pub async fn run_with_progress(
        &self,
        scenarios: Vec<Scenario>,
        progress: Option<ProgressFn>,
    ) -> RunReport {
        let mut report = RunReport::start(&self.config.base_url, &self.driver_name);
        let workers = self.config.effective_workers();
        let total = scenarios.len();
        tracing::info!(run_id = %report.run_id, scenarios = total, workers, "starting run");

        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();
        let identities: Vec<(String, &'static str)> =
            scenarios.iter().map(|s| (s.id(), s.suite)).collect();

        for (index, scenario) in scenarios.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let cancelled = Arc::clone(&cancelled);
            let browser = Arc::clone(&self.browser);
            let config = self.config.clone();
            let progress = progress.clone();
            let span = tracing::info_span!("scenario", id = %scenario.id());

            tasks.spawn(
                async move {
                    let outcome = match semaphore.acquire_owned().await {
                        Ok(_permit) if !cancelled.load(Ordering::SeqCst) => {
                            let outcome = execute(browser.as_ref(), &config, &scenario).await;
                            if outcome.failure.is_some() && config.fail_fast {
                                cancelled.store(true, Ordering::SeqCst);
                            }
                            outcome
                        }
                        _ => ScenarioOutcome::skipped(scenario.id(), scenario.suite),
                    };
                    if let Some(progress) = &progress {
                        progress(&outcome);
                    }
                    (index, outcome)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<ScenarioOutcome>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(err) => tracing::error!(error = %err, "scenario task died"),
            }
        }
        report.outcomes = slots
            .into_iter()
            .zip(identities)
            .map(|(slot, (id, suite))| {
                slot.unwrap_or_else(|| {
                    let err = E2eError::page(format!("scenario `{id}` task died before reporting"));
                    ScenarioOutcome::failed(id, suite, &err, 0)
                })
            })
            .collect();
        report.finish();

        tracing::info!(
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            duration_ms = report.duration_ms(),
            "run finished"
        );
        report
    }
}

/// Run one scenario in a fresh page and always close the page
async fn execute(browser: &dyn Browser, config: &RunConfig, scenario: &Scenario) -> ScenarioOutcome {
    let started = Instant::now();
    let id = scenario.id();
    let elapsed = |started: Instant| started.elapsed().as_millis() as u64;

    let driver = match browser.new_page(scenario.viewport).await {
        Ok(driver) => driver,
        Err(err) => {
            tracing::error!(error = %err, "could not open page");
            return ScenarioOutcome::failed(id, scenario.suite, &err, elapsed(started));
        }
    };
    let page = Page::new(driver, config.page_settings(), scenario.viewport);

    let limit = scenario
        .timeout
        .unwrap_or_else(|| Duration::from_millis(config.scenario_timeout_ms));
    let body = AssertUnwindSafe(async {
        if let Some(path) = scenario.start_path {
            page.goto(path).await?;
        }
        scenario.run(page.clone()).await
    })
    .catch_unwind();
    let result = match tokio::time::timeout(limit, body).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(E2eError::page(format!(
            "scenario `{id}` panicked: {}",
            panic_message(panic.as_ref())
        ))),
        Err(_) => Err(E2eError::timeout(
            limit.as_millis() as u64,
            format!("scenario `{id}` to finish"),
        )),
    };

    if let Err(err) = page.close().await {
        tracing::warn!(error = %err, "closing page failed");
    }

    let duration_ms = elapsed(started);
    match result {
        Ok(()) => {
            tracing::debug!(duration_ms, "passed");
            ScenarioOutcome::passed(id, scenario.suite, duration_ms)
        }
        Err(err) => {
            tracing::warn!(kind = %err.kind(), error = %err, duration_ms, "failed");
            ScenarioOutcome::failed(id, scenario.suite, &err, duration_ms)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(suite: &'static str, name: &'static str) -> Scenario {
        Scenario::new(suite, "", name, |_| async { Ok(()) })
    }

    mod filter_tests {
        use super::*;

        #[test]
        fn test_empty_filter_matches_all() {
            assert!(ScenarioFilter::new().matches(&scenario("Homepage", "x")));
        }

        #[test]
        fn test_suite_names_are_normalised() {
            let filter = ScenarioFilter::new().with_suites(["blog-posts"]);
            assert!(filter.matches(&scenario("Blog Posts", "x")));
            assert!(!filter.matches(&scenario("Homepage", "x")));
        }

        #[test]
        fn test_grep_matches_id() {
            let filter = ScenarioFilter::new().with_grep("(?i)mobile menu").unwrap();
            assert!(filter.matches(&scenario("Navigation", "toggles Mobile Menu")));
            assert!(!filter.matches(&scenario("Navigation", "brand link")));
            assert!(ScenarioFilter::new().with_grep("(").is_err());
        }

        #[test]
        fn test_apply_preserves_order() {
            let filter = ScenarioFilter::new().with_suites(["smoke"]);
            let kept = filter.apply(vec![
                scenario("Smoke", "b"),
                scenario("Homepage", "a"),
                scenario("Smoke", "a"),
            ]);
            let names: Vec<_> = kept.iter().map(|s| s.name).collect();
            assert_eq!(names, ["b", "a"]);
        }
    }
}
