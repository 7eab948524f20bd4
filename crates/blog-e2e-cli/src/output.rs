//! Output formatting and progress reporting

use blog_e2e::runner::ProgressFn;
use blog_e2e::{OutcomeStatus, RunReport, ScenarioOutcome};
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

/// Progress reporter for a scenario run
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Print every outcome, not only failures
    pub verbose: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
            verbose: false,
        }
    }

    /// Print passing and skipped outcomes as they complete
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Start a progress bar for `total` scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Callback advancing the bar from the runner's worker tasks
    #[must_use]
    pub fn progress_callback(&self) -> ProgressFn {
        let bar = self.progress_bar.clone();
        let use_color = self.use_color;
        let verbose = self.verbose;
        let quiet = self.quiet;
        Arc::new(move |outcome: &ScenarioOutcome| {
            let show = outcome.status == OutcomeStatus::Failed || (verbose && !quiet);
            if show {
                let line = outcome_line(outcome, use_color);
                match &bar {
                    Some(pb) => pb.println(line),
                    None => eprintln!("{line}"),
                }
            }
            if let Some(pb) = &bar {
                pb.inc(1);
                pb.set_message(outcome.id.clone());
            }
        })
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        self.emit(Level::Pass, message);
    }

    /// Print a failure message, even in quiet mode
    pub fn failure(&self, message: &str) {
        self.emit(Level::Fail, message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        self.emit(Level::Warn, message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn emit(&self, level: Level, message: &str) {
        if self.quiet && level != Level::Fail {
            return;
        }
        let _ = self.term.write_line(&status_line(level, message, self.use_color));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Failure details followed by the summary line
    pub fn report(&self, report: &RunReport) {
        let failures: Vec<&ScenarioOutcome> = report.failures().collect();
        if !failures.is_empty() {
            let _ = self.term.write_line("");
            let _ = self.term.write_line("Failures:");
            for outcome in failures {
                self.failure(&outcome.id);
                if let Some(failure) = &outcome.failure {
                    for line in failure.message.lines() {
                        let _ = self.term.write_line(&format!("    [{}] {line}", failure.kind));
                    }
                }
            }
        }
        let duration = Duration::from_millis(u64::try_from(report.duration_ms()).unwrap_or(0));
        self.summary(report.passed(), report.failed(), report.skipped(), duration);
    }

    /// Print run summary
    pub fn summary(&self, passed: usize, failed: usize, skipped: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        let _ = self.term.write_line("");

        let total = passed + failed + skipped;
        let duration_secs = duration.as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };

            let _ = self.term.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed, {} skipped)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                skipped_style.apply_to(skipped)
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)"
            ));
        }
    }
}

/// Severity of a reporter message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Something finished well
    Pass,
    /// Something failed
    Fail,
    /// Worth a look, the run continues
    Warn,
    /// Plain information
    Info,
}

/// A reporter message with its level prefix
#[must_use]
pub fn status_line(level: Level, message: &str, use_color: bool) -> String {
    let prefix = match (level, use_color) {
        (Level::Pass, true) => style("✓").green().bold().to_string(),
        (Level::Fail, true) => style("✗").red().bold().to_string(),
        (Level::Warn, true) => style("⚠").yellow().bold().to_string(),
        (Level::Info, true) => style("ℹ").blue().bold().to_string(),
        (Level::Pass, false) => "PASS".to_string(),
        (Level::Fail, false) => "FAIL".to_string(),
        (Level::Warn, false) => "WARN".to_string(),
        (Level::Info, false) => "INFO".to_string(),
    };
    format!("{prefix} {message}")
}

/// One status line for a completed scenario
#[must_use]
pub fn outcome_line(outcome: &ScenarioOutcome, use_color: bool) -> String {
    let mark = match (outcome.status, use_color) {
        (OutcomeStatus::Passed, true) => style("✓").green().bold().to_string(),
        (OutcomeStatus::Failed, true) => style("✗").red().bold().to_string(),
        (OutcomeStatus::Skipped, true) => style("-").yellow().to_string(),
        (OutcomeStatus::Passed, false) => "PASS".to_string(),
        (OutcomeStatus::Failed, false) => "FAIL".to_string(),
        (OutcomeStatus::Skipped, false) => "SKIP".to_string(),
    };
    format!("{mark} {} ({}ms)", outcome.id, outcome.duration_ms)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use blog_e2e::E2eError;

    fn report() -> RunReport {
        let mut report = RunReport::start("http://localhost:3000", "fixture");
        report
            .outcomes
            .push(ScenarioOutcome::passed("Smoke › loads".into(), "Smoke", 12));
        report.outcomes.push(ScenarioOutcome::failed(
            "Homepage › shows posts".into(),
            "Homepage",
            &E2eError::assertion("`tbody tr` count", "2", "3"),
            40,
        ));
        report.outcomes.push(ScenarioOutcome::skipped(
            "Homepage › shows footer".into(),
            "Homepage",
        ));
        report.finish();
        report
    }

    mod reporter_tests {
        use super::*;

        #[test]
        fn test_new_reporter() {
            let reporter = ProgressReporter::new(false, false);
            assert!(!reporter.use_color);
            assert!(!reporter.quiet);
            assert!(!reporter.verbose);
        }

        #[test]
        fn test_default_reporter() {
            let reporter = ProgressReporter::default();
            assert!(reporter.use_color);
        }

        #[test]
        fn test_messages_do_not_panic() {
            let reporter = ProgressReporter::new(false, false);
            reporter.success("ok");
            reporter.failure("bad");
            reporter.warning("hmm");
            reporter.info("fyi");
            reporter.header("Run");
        }

        #[test]
        fn test_report_with_failures() {
            let reporter = ProgressReporter::new(false, true);
            reporter.report(&report());
        }

        #[test]
        fn test_quiet_mode_has_no_bar() {
            let mut reporter = ProgressReporter::new(false, true);
            reporter.start_progress(3, "running");
            assert!(reporter.progress_bar.is_none());
        }
    }

    mod progress_tests {
        use super::*;

        #[test]
        fn test_callback_advances_bar() {
            let mut reporter = ProgressReporter::new(false, false);
            reporter.start_progress(3, "running");
            let callback = reporter.progress_callback();
            for outcome in &report().outcomes {
                callback(outcome);
            }
            assert_eq!(reporter.progress_bar.as_ref().unwrap().position(), 3);
            reporter.finish();
        }

        #[test]
        fn test_callback_without_bar() {
            let reporter = ProgressReporter::new(false, true);
            let callback = reporter.progress_callback();
            callback(&report().outcomes[0]);
        }
    }

    mod line_tests {
        use super::*;

        #[test]
        fn test_plain_outcome_lines() {
            let outcomes = report().outcomes;
            assert_eq!(outcome_line(&outcomes[0], false), "PASS Smoke › loads (12ms)");
            assert!(outcome_line(&outcomes[1], false).starts_with("FAIL Homepage"));
            assert!(outcome_line(&outcomes[2], false).starts_with("SKIP"));
        }

        #[test]
        fn test_plain_status_lines() {
            assert_eq!(
                status_line(Level::Warn, "browser did not shut down cleanly", false),
                "WARN browser did not shut down cleanly"
            );
            assert_eq!(
                status_line(Level::Pass, "Report written to out.json", false),
                "PASS Report written to out.json"
            );
            assert!(status_line(Level::Fail, "x", true).ends_with(" x"));
        }
    }
}
