//! Scenarios must fail, with the right failure kind, when the site breaks
//! its DOM contract.

use std::sync::Arc;

use blog_e2e::fixture::{el, FormFault, Post};
use blog_e2e::prelude::*;
use blog_e2e::suites;
use chrono::NaiveDate;

fn config() -> RunConfig {
    RunConfig::default()
        .with_workers(4)
        .with_expect_timeout_ms(300)
        .with_action_timeout_ms(300)
}

async fn run_against(site: BlogSite, filter: &ScenarioFilter) -> RunReport {
    let runner = ScenarioRunner::new(Arc::new(FixtureBrowser::new(site)), config());
    runner.run(filter.apply(suites::catalog())).await
}

fn failure_kind(report: &RunReport, name: &str) -> Option<FailureKind> {
    report
        .outcomes
        .iter()
        .find(|o| o.id.ends_with(name))
        .and_then(|o| o.failure.as_ref())
        .map(|f| f.kind)
}

#[tokio::test]
async fn third_post_fails_table_count() {
    let date = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
    let site = BlogSite::default().with_post(Post::new(
        3,
        "A third post",
        date,
        vec![el("p").text("Surprise.")],
    ));
    let filter = ScenarioFilter::new().with_grep("should display blog posts table").unwrap();

    let report = run_against(site, &filter).await;
    assert_eq!(report.failed(), 1);
    assert_eq!(
        failure_kind(&report, "should display blog posts table"),
        Some(FailureKind::Assertion)
    );
    let message = &report.failures().next().unwrap().failure.as_ref().unwrap().message;
    assert!(message.contains("expected: 2"), "{message}");
    assert!(message.contains("actual:   3"), "{message}");
}

#[tokio::test]
async fn changed_title_fails_smoke() {
    let site = BlogSite::default().with_home_title("Under construction");
    let filter = ScenarioFilter::new().with_suites(["smoke"]);

    let report = run_against(site, &filter).await;
    assert!(!report.success());
    assert_eq!(
        failure_kind(&report, "blog is accessible and functional"),
        Some(FailureKind::Assertion)
    );
}

#[tokio::test]
async fn missing_brand_link_times_out() {
    let site = BlogSite::default().without_class("brand-link");
    let filter = ScenarioFilter::new()
        .with_grep("should display brand/logo correctly")
        .unwrap();

    let report = run_against(site, &filter).await;
    assert_eq!(
        failure_kind(&report, "should display brand/logo correctly"),
        Some(FailureKind::Timeout)
    );
}

#[tokio::test]
async fn slow_paint_breaks_budget() {
    let site = BlogSite::default().with_largest_contentful_paint(3_200.0);
    let filter = ScenarioFilter::new().with_grep(r"\(LCP\)").unwrap();

    let report = run_against(site, &filter).await;
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(
        failure_kind(&report, "should achieve good Largest Contentful Paint (LCP)"),
        Some(FailureKind::Assertion)
    );
}

#[tokio::test]
async fn frozen_button_label_fails_loading_state() {
    let site = BlogSite::default().with_form_fault(FormFault::StaticButtonLabel);
    let filter = ScenarioFilter::new()
        .with_grep("should show loading state during submission")
        .unwrap();

    let report = run_against(site, &filter).await;
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(
        failure_kind(&report, "should show loading state during submission"),
        Some(FailureKind::Assertion)
    );
    let message = &report.failures().next().unwrap().failure.as_ref().unwrap().message;
    assert!(message.contains("Subscribing..."), "{message}");
}

#[tokio::test]
async fn missing_result_message_fails_subscription_outcomes() {
    let site = BlogSite::default().with_form_fault(FormFault::NoResultMessage);
    let filter = ScenarioFilter::new()
        .with_grep("should handle (subscription errors|successful subscription)")
        .unwrap();

    let report = run_against(site, &filter).await;
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.failed(), 2);
    assert_eq!(
        failure_kind(&report, "should handle subscription errors"),
        Some(FailureKind::Timeout)
    );
    assert_eq!(
        failure_kind(&report, "should handle successful subscription"),
        Some(FailureKind::Timeout)
    );
}

#[tokio::test]
async fn form_faults_leave_unrelated_scenarios_passing() {
    let site = BlogSite::default().with_form_fault(FormFault::NoResultMessage);
    let filter = ScenarioFilter::new()
        .with_grep("should (display subscription form elements|validate email format)")
        .unwrap();

    let report = run_against(site, &filter).await;
    assert_eq!(report.outcomes.len(), 2);
    assert!(report.success());
}
