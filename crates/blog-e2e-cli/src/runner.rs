//! Run, list and config command handlers

use crate::commands::{ConfigArgs, ListArgs, RunArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use blog_e2e::fixture::FIXTURE_DRIVER;
use blog_e2e::runner::suite_key;
use blog_e2e::suites::{catalog, suite_names};
use blog_e2e::{
    Browser, FixtureBrowser, RunConfig, RunReport, Scenario, ScenarioFilter, ScenarioRunner,
};
use std::sync::Arc;

/// Build a filter, rejecting suite names the catalog does not know
pub fn build_filter(suites: &[String], grep: Option<&str>) -> CliResult<ScenarioFilter> {
    let known = suite_names();
    for suite in suites {
        let key = suite_key(suite);
        if !known.iter().any(|name| suite_key(name) == key) {
            return Err(CliError::invalid_argument(format!(
                "unknown suite `{suite}` (known: {})",
                known.join(", ")
            )));
        }
    }
    let filter = ScenarioFilter::new().with_suites(suites);
    match grep {
        Some(pattern) => Ok(filter.with_grep(pattern)?),
        None => Ok(filter),
    }
}

/// Scenario ids selected by `list`
pub fn list_ids(args: &ListArgs) -> CliResult<Vec<String>> {
    let filter = build_filter(&args.suites, None)?;
    Ok(filter.apply(catalog()).iter().map(Scenario::id).collect())
}

/// YAML of the configuration `run` would use without flags
pub fn effective_config(args: &ConfigArgs) -> CliResult<String> {
    let config = RunConfig::load(args.config.as_deref())?;
    Ok(config.to_yaml()?)
}

/// Effective run configuration: file and environment, then flags
pub fn run_config(args: &RunArgs) -> CliResult<RunConfig> {
    let config = args.overlay(RunConfig::load(args.config.as_deref())?);
    config.validate()?;
    Ok(config)
}

/// Execute the selected scenarios and return the report
pub async fn execute_run(cli: &CliConfig, args: &RunArgs) -> CliResult<RunReport> {
    let config = run_config(args)?;
    let scenarios = build_filter(&args.suites, args.grep.as_deref())?.apply(catalog());
    if scenarios.is_empty() {
        return Err(CliError::invalid_argument(
            "no scenario matches the --suite/--grep selection",
        ));
    }

    let (browser, driver) = open_browser(args.fixture, &config).await?;
    tracing::info!(driver, base_url = %config.base_url, "browser ready");

    let mut reporter = ProgressReporter::new(cli.color.should_color(), cli.verbosity.is_quiet())
        .with_verbose(cli.verbosity.is_verbose());
    reporter.start_progress(scenarios.len() as u64, "running scenarios");

    let runner = ScenarioRunner::new(Arc::clone(&browser), config).with_driver_name(driver);
    let report = runner
        .run_with_progress(scenarios, Some(reporter.progress_callback()))
        .await;
    reporter.finish();

    if let Err(e) = browser.close().await {
        reporter.warning(&format!("browser did not shut down cleanly: {e}"));
    }
    Ok(report)
}

async fn open_browser(
    fixture: bool,
    config: &RunConfig,
) -> CliResult<(Arc<dyn Browser>, &'static str)> {
    if fixture {
        return Ok((Arc::new(FixtureBrowser::default()), FIXTURE_DRIVER));
    }
    launch_chromium(config).await
}

#[cfg(feature = "browser")]
async fn launch_chromium(config: &RunConfig) -> CliResult<(Arc<dyn Browser>, &'static str)> {
    use blog_e2e::driver::chromium::CHROMIUM_DRIVER;
    use blog_e2e::ChromiumBrowser;

    let browser = ChromiumBrowser::launch(config).await?;
    Ok((Arc::new(browser), CHROMIUM_DRIVER))
}

#[cfg(not(feature = "browser"))]
async fn launch_chromium(_config: &RunConfig) -> CliResult<(Arc<dyn Browser>, &'static str)> {
    Err(CliError::config(
        "built without the `browser` feature; pass --fixture or rebuild with --features browser",
    ))
}
