//! blog-e2e: end-to-end browser scenarios for Willian Nguyen's blog
//!
//! A Playwright-style harness (pages, lazy locators, auto-waiting
//! expectations, network routes) over an abstract page driver, plus the
//! scenario catalog that exercises the blog's navigation, accessibility,
//! performance, responsive layout and newsletter form.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    BLOG-E2E Architecture                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────────────┐    │
//! │   │ Scenario   │    │ Page /     │    │ PageDriver         │    │
//! │   │ catalog    │───►│ Locator /  │───►│  ├ Chromium (CDP)  │    │
//! │   │ (suites)   │    │ expect     │    │  └ Fixture (model) │    │
//! │   └────────────┘    └────────────┘    └────────────────────┘    │
//! │         ▲                                                        │
//! │   ┌────────────┐                                                 │
//! │   │ Runner     │  isolated page per scenario, bounded workers    │
//! │   └────────────┘                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use blog_e2e::prelude::*;
//!
//! # async fn demo() -> E2eResult<()> {
//! let browser = Arc::new(FixtureBrowser::default());
//! let runner = ScenarioRunner::new(browser, RunConfig::default());
//! let report = runner.run(blog_e2e::suites::catalog()).await;
//! assert!(report.success());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
#[allow(clippy::missing_errors_doc)]
pub mod driver;
#[allow(clippy::missing_errors_doc)]
pub mod expect;
#[allow(
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]
pub mod fixture;
#[allow(clippy::missing_errors_doc)]
pub mod locator;
pub mod network;
#[allow(clippy::missing_errors_doc)]
pub mod page;
#[allow(clippy::cast_precision_loss)]
pub mod performance;
pub mod reporter;
pub mod result;
#[allow(clippy::missing_errors_doc)]
pub mod runner;
pub mod scenario;
pub mod selector;
#[allow(clippy::missing_errors_doc, clippy::cast_precision_loss)]
pub mod suites;

pub use config::{PageSettings, RunConfig};
pub use driver::{
    BoundingBox, Browser, ElementState, Key, LoadState, NavigationResponse, PageDriver, Viewport,
};
#[cfg(feature = "browser")]
pub use driver::{ChromiumBrowser, ChromiumPage};
pub use expect::{expect, expect_page, expect_that, TextMatcher};
pub use fixture::{BlogSite, FixtureBrowser, FixturePage};
pub use locator::{Locator, LocatorChain, Pick};
pub use network::{AbortReason, MockResponse, NetworkEntry, ResourceType, UrlPattern};
pub use page::Page;
pub use performance::{BudgetViolation, PerformanceBudget, PerformanceSnapshot};
pub use reporter::{Failure, OutcomeStatus, ReportFormat, RunReport, ScenarioOutcome};
pub use result::{E2eError, E2eResult, FailureKind};
pub use runner::{ScenarioFilter, ScenarioRunner};
pub use scenario::{Scenario, SuiteBuilder};
pub use selector::SelectorList;

/// Everything a scenario or a runner front-end usually needs
pub mod prelude {
    pub use super::config::*;
    pub use super::driver::{
        BoundingBox, Browser, ElementState, Key, LoadState, NavigationResponse, PageDriver,
        Viewport,
    };
    pub use super::expect::*;
    pub use super::fixture::{BlogSite, FixtureBrowser};
    pub use super::locator::{Locator, Pick};
    pub use super::network::{AbortReason, MockResponse, NetworkEntry, UrlPattern};
    pub use super::page::Page;
    pub use super::performance::{PerformanceBudget, PerformanceSnapshot};
    pub use super::reporter::*;
    pub use super::result::*;
    pub use super::runner::*;
    pub use super::scenario::*;
}
