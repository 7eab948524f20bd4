//! Runner behaviour: isolation, timeouts, fail-fast and page cleanup.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use blog_e2e::prelude::*;
use blog_e2e::suites::SUBSCRIBE_PATH;

fn runner(browser: Arc<FixtureBrowser>, workers: usize) -> ScenarioRunner {
    let config = RunConfig::default()
        .with_workers(workers)
        .with_expect_timeout_ms(1_000)
        .with_action_timeout_ms(1_000);
    ScenarioRunner::new(browser, config)
}

async fn mock_rejection(page: Page) -> E2eResult<()> {
    page.route(
        SUBSCRIBE_PATH,
        MockResponse::json(400, &serde_json::json!({ "message": "rejected by mock" })),
    )
    .await?;
    let form = page.locator(".subscribe-form");
    form.locator("input").fill("mocked@example.com").await?;
    form.locator("button").click().await?;
    expect(&form.locator(".error p")).to_contain_text("rejected by mock").await
}

async fn built_in_backend(page: Page) -> E2eResult<()> {
    let form = page.locator(".subscribe-form");
    form.locator("input").fill("fresh@example.com").await?;
    form.locator("button").click().await?;
    expect(&form.locator(".success p"))
        .to_contain_text("Successfully subscribed")
        .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn routes_do_not_leak_between_scenarios() {
    let mut scenarios = Vec::new();
    for _ in 0..4 {
        scenarios.extend(
            SuiteBuilder::new("Isolation")
                .start_at("/")
                .scenario("mocked", mock_rejection)
                .scenario("unmocked", built_in_backend)
                .build(),
        );
    }
    let report = runner(Arc::new(FixtureBrowser::default()), 4).run(scenarios).await;
    assert!(report.success(), "{}", report.render_text());
    assert_eq!(report.passed(), 8);
}

#[tokio::test]
async fn slow_scenario_times_out_and_page_is_closed() {
    let browser = Arc::new(FixtureBrowser::default());
    let scenario = Scenario::new("Runner", "", "sleeps", |page: Page| async move {
        page.goto("/").await?;
        page.wait_for_timeout(Duration::from_secs(5)).await;
        Ok(())
    })
    .with_timeout(Duration::from_millis(200));

    let report = runner(browser.clone(), 1).run(vec![scenario]).await;
    let failure = report.outcomes[0].failure.as_ref().unwrap();
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert!(failure.message.contains("Runner › sleeps"));
    assert_eq!(browser.open_pages(), 0);
}

#[tokio::test]
async fn fail_fast_skips_the_rest() {
    let ran = Arc::new(AtomicUsize::new(0));
    let mut scenarios = vec![Scenario::new("Runner", "", "fails", |_page: Page| async {
        Err(E2eError::assertion("always", "pass", "fail"))
    })];
    for name in ["a", "b", "c"] {
        let ran = Arc::clone(&ran);
        scenarios.push(Scenario::new("Runner", "", name, move |_page: Page| {
            let ran = Arc::clone(&ran);
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));
    }

    let config = RunConfig::default().with_workers(1).with_fail_fast(true);
    let report = ScenarioRunner::new(Arc::new(FixtureBrowser::default()), config)
        .run(scenarios)
        .await;
    assert_eq!(report.failed(), 1);
    assert_eq!(report.skipped(), 3);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failures_keep_catalog_order_and_progress_sees_all() {
    let seen = Arc::new(AtomicUsize::new(0));
    let progress: blog_e2e::runner::ProgressFn = {
        let seen = Arc::clone(&seen);
        Arc::new(move |_outcome: &ScenarioOutcome| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    };
    let scenarios = SuiteBuilder::new("Order")
        .scenario("first", |_page: Page| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        })
        .scenario("second", |_page: Page| async {
            Err(E2eError::timeout(10, "nothing"))
        })
        .scenario("third", |_page: Page| async { Ok(()) })
        .build();

    let report = runner(Arc::new(FixtureBrowser::default()), 3)
        .run_with_progress(scenarios, Some(progress))
        .await;
    let ids: Vec<_> = report.outcomes.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, ["Order › first", "Order › second", "Order › third"]);
    assert_eq!(report.outcomes[1].status, OutcomeStatus::Failed);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn closed_browser_fails_every_scenario() {
    let browser = Arc::new(FixtureBrowser::default());
    browser.close().await.unwrap();
    let scenarios = vec![Scenario::new("Runner", "", "x", |_page: Page| async { Ok(()) })];

    let report = runner(browser, 1).run(scenarios).await;
    assert_eq!(report.failed(), 1);
    assert_eq!(report.outcomes[0].failure.as_ref().unwrap().kind, FailureKind::Harness);
}

#[tokio::test]
async fn panicking_scenario_is_reported_as_failure() {
    let browser = Arc::new(FixtureBrowser::default());
    let scenarios = SuiteBuilder::new("Runner")
        .scenario("ok", |_page: Page| async { Ok(()) })
        .scenario("boom", |page: Page| async move {
            page.goto("/").await?;
            let rows: Vec<usize> = Vec::new();
            assert_eq!(rows[3], 0);
            Ok(())
        })
        .build();

    let report = runner(browser.clone(), 2).run(scenarios).await;
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.passed(), 1);
    assert_eq!(report.failed(), 1);
    assert!(!report.success());

    let failure = report.outcomes[1].failure.as_ref().unwrap();
    assert_eq!(failure.kind, FailureKind::Harness);
    assert!(failure.message.contains("Runner › boom"));
    assert!(failure.message.contains("panicked"));
    assert_eq!(browser.open_pages(), 0);
}
