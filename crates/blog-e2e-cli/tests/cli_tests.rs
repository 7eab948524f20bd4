//! End-to-end tests for the blog-e2e binary
//!
//! Runs use `--fixture`, so no Chromium is needed.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn blog_e2e() -> Command {
    let mut cmd = Command::cargo_bin("blog-e2e").expect("blog-e2e binary should exist");
    for var in [
        "BLOG_E2E_BASE_URL",
        "BLOG_E2E_WORKERS",
        "BLOG_E2E_HEADLESS",
        "CHROMIUM_PATH",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    blog_e2e()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.3.0"));
}

#[test]
fn test_help_lists_subcommands() {
    blog_e2e()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_fails() {
    blog_e2e().assert().failure();
}

// ============================================================================
// list / config
// ============================================================================

#[test]
fn test_list_prints_ids() {
    blog_e2e()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Smoke › blog is accessible and functional",
        ))
        .stdout(predicate::str::contains("Newsletter Subscription Form › "));
}

#[test]
fn test_list_filters_by_suite() {
    let output = blog_e2e()
        .args(["list", "--suite", "smoke"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.lines().count(), 1);
}

#[test]
fn test_list_unknown_suite_fails() {
    blog_e2e()
        .args(["list", "--suite", "comments"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown suite `comments`"));
}

#[test]
fn test_config_prints_yaml() {
    let dir = TempDir::new().unwrap();
    blog_e2e()
        .current_dir(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url:"))
        .stdout(predicate::str::contains("localhost:3000"))
        .stdout(predicate::str::contains("headless: true"));
}

#[test]
fn test_config_reads_default_file_and_env() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("blog-e2e.yaml"), "workers: 3\n").unwrap();
    blog_e2e()
        .current_dir(dir.path())
        .env("BLOG_E2E_BASE_URL", "https://staging.example")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("workers: 3"))
        .stdout(predicate::str::contains("https://staging.example"));
}

// ============================================================================
// run
// ============================================================================

#[test]
fn test_run_smoke_on_fixture() {
    blog_e2e()
        .args(["run", "--fixture", "--suite", "smoke", "--color", "never"])
        .assert()
        .success()
        .stderr(predicate::str::contains("=== Results ==="))
        .stderr(predicate::str::contains("PASSED 1 scenarios"));
}

#[test]
fn test_log_targets_only_at_debug_verbosity() {
    blog_e2e()
        .args(["run", "--fixture", "--suite", "smoke", "--color", "never"])
        .assert()
        .success()
        .stderr(predicate::str::contains("browser ready"))
        .stderr(predicate::str::contains("blog_e2e_cli::runner").not());

    blog_e2e()
        .args(["run", "--fixture", "--suite", "smoke", "--color", "never", "-vv"])
        .assert()
        .success()
        .stderr(predicate::str::contains("blog_e2e_cli::runner"));
}

#[test]
fn test_run_writes_json_report() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.json");
    blog_e2e()
        .args(["run", "--fixture", "--suite", "blog-posts", "-q"])
        .args(["--format", "json", "--output"])
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("Report written").not());

    let text = fs::read_to_string(&path).unwrap();
    let report: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(report["driver"], "fixture");
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 11);
    assert!(outcomes.iter().all(|o| o["status"] == "passed"));
}

#[test]
fn test_run_json_to_stdout() {
    blog_e2e()
        .args(["run", "--fixture", "--suite", "smoke", "-q", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"run_id\""));
}

#[test]
fn test_run_invalid_grep_fails() {
    blog_e2e()
        .args(["run", "--fixture", "--grep", "("])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --grep pattern"));
}

#[test]
fn test_run_zero_match_fails() {
    blog_e2e()
        .args(["run", "--fixture", "--grep", "^nothing here$"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no scenario matches"));
}

#[test]
fn test_run_announces_report_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.txt");
    blog_e2e()
        .args(["run", "--fixture", "--suite", "smoke", "--color", "never", "--output"])
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("PASS Report written to"))
        .stderr(predicate::str::contains("=== Results ===").not());
    assert!(fs::read_to_string(&path).unwrap().contains("1 passed"));
}
