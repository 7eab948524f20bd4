//! Run configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! environment variables. The CLI applies its flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::result::{E2eError, E2eResult};

/// Default base URL of the blog under test
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "blog-e2e.yaml";

/// Default scenario timeout (30 seconds)
pub const DEFAULT_SCENARIO_TIMEOUT_MS: u64 = 30_000;

/// Default expectation timeout (5 seconds)
pub const DEFAULT_EXPECT_TIMEOUT_MS: u64 = 5_000;

/// Default action timeout (5 seconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval for auto-waiting (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Environment variable overriding the base URL
pub const ENV_BASE_URL: &str = "BLOG_E2E_BASE_URL";
/// Environment variable overriding the worker count
pub const ENV_WORKERS: &str = "BLOG_E2E_WORKERS";
/// Environment variable overriding headless mode
pub const ENV_HEADLESS: &str = "BLOG_E2E_HEADLESS";
/// Environment variable naming the Chromium executable
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";

/// Configuration for one suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Base URL navigation paths are resolved against
    pub base_url: String,
    /// Number of scenarios run concurrently (0 = available parallelism)
    pub workers: usize,
    /// Run the browser headless
    pub headless: bool,
    /// Explicit Chromium executable
    pub chromium_path: Option<PathBuf>,
    /// Per-scenario timeout in milliseconds
    pub scenario_timeout_ms: u64,
    /// Default expectation timeout in milliseconds
    pub expect_timeout_ms: u64,
    /// Default action timeout in milliseconds
    pub action_timeout_ms: u64,
    /// Polling interval for auto-waiting in milliseconds
    pub poll_interval_ms: u64,
    /// Stop scheduling scenarios after the first failure
    pub fail_fast: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            workers: 0,
            headless: true,
            chromium_path: None,
            scenario_timeout_ms: DEFAULT_SCENARIO_TIMEOUT_MS,
            expect_timeout_ms: DEFAULT_EXPECT_TIMEOUT_MS,
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            fail_fast: false,
        }
    }
}

impl RunConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            E2eError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&text)
    }

    /// Defaults, then `path` (or `blog-e2e.yaml` if present), then the
    /// process environment
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`
    pub fn with_env<F>(mut self, lookup: F) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(workers) = lookup(ENV_WORKERS) {
            self.workers = workers.trim().parse().map_err(|_| {
                E2eError::config(format!("{ENV_WORKERS} must be a number, got `{workers}`"))
            })?;
        }
        if let Some(headless) = lookup(ENV_HEADLESS) {
            self.headless = parse_bool(&headless).ok_or_else(|| {
                E2eError::config(format!("{ENV_HEADLESS} must be true or false, got `{headless}`"))
            })?;
        }
        if let Some(path) = lookup(ENV_CHROMIUM_PATH) {
            self.chromium_path = Some(PathBuf::from(path));
        }
        self.validate()?;
        Ok(self)
    }

    /// Check invariants
    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(E2eError::config(format!(
                "base_url must start with http:// or https://, got `{}`",
                self.base_url
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(E2eError::config("poll_interval_ms must be positive"));
        }
        if self.scenario_timeout_ms == 0 {
            return Err(E2eError::config("scenario_timeout_ms must be positive"));
        }
        Ok(())
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the worker count
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the scenario timeout
    #[must_use]
    pub const fn with_scenario_timeout_ms(mut self, ms: u64) -> Self {
        self.scenario_timeout_ms = ms;
        self
    }

    /// Set the expectation timeout
    #[must_use]
    pub const fn with_expect_timeout_ms(mut self, ms: u64) -> Self {
        self.expect_timeout_ms = ms;
        self
    }

    /// Set the action timeout
    #[must_use]
    pub const fn with_action_timeout_ms(mut self, ms: u64) -> Self {
        self.action_timeout_ms = ms;
        self
    }

    /// Set fail-fast
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Effective number of workers
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        } else {
            self.workers
        }
    }

    /// Settings handed to each page
    #[must_use]
    pub fn page_settings(&self) -> PageSettings {
        PageSettings {
            base_url: self.base_url.clone(),
            expect_timeout: Duration::from_millis(self.expect_timeout_ms),
            action_timeout: Duration::from_millis(self.action_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> E2eResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

/// Per-page timing settings derived from [`RunConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    /// Base URL
    pub base_url: String,
    /// Expectation timeout
    pub expect_timeout: Duration,
    /// Action timeout
    pub action_timeout: Duration,
    /// Polling interval
    pub poll_interval: Duration,
}

impl Default for PageSettings {
    fn default() -> Self {
        RunConfig::default().page_settings()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
