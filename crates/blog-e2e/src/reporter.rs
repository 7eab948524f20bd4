//! Run reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::{E2eError, E2eResult, FailureKind};

/// Scenario result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Every assertion held
    Passed,
    /// Aborted by a failure
    Failed,
    /// Not run (fail-fast)
    Skipped,
}

/// Why a scenario failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Classification
    pub kind: FailureKind,
    /// Rendered error
    pub message: String,
}

impl From<&E2eError> for Failure {
    fn from(err: &E2eError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// `Suite › Group › name`
    pub id: String,
    /// Suite name
    pub suite: String,
    /// Status
    pub status: OutcomeStatus,
    /// Failure details for failed scenarios
    pub failure: Option<Failure>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl ScenarioOutcome {
    /// Passed outcome
    #[must_use]
    pub fn passed(id: String, suite: &str, duration_ms: u64) -> Self {
        Self {
            id,
            suite: suite.to_string(),
            status: OutcomeStatus::Passed,
            failure: None,
            duration_ms,
        }
    }

    /// Failed outcome
    #[must_use]
    pub fn failed(id: String, suite: &str, err: &E2eError, duration_ms: u64) -> Self {
        Self {
            id,
            suite: suite.to_string(),
            status: OutcomeStatus::Failed,
            failure: Some(Failure::from(err)),
            duration_ms,
        }
    }

    /// Skipped outcome
    #[must_use]
    pub fn skipped(id: String, suite: &str) -> Self {
        Self {
            id,
            suite: suite.to_string(),
            status: OutcomeStatus::Skipped,
            failure: None,
            duration_ms: 0,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// Pretty JSON
    Json,
}

/// Report of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run id
    pub run_id: Uuid,
    /// Base URL the run targeted
    pub base_url: String,
    /// Driver name
    pub driver: String,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub finished_at: DateTime<Utc>,
    /// Outcomes in catalog order
    pub outcomes: Vec<ScenarioOutcome>,
}

impl RunReport {
    /// Empty report starting now
    #[must_use]
    pub fn start(base_url: impl Into<String>, driver: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            base_url: base_url.into(),
            driver: driver.into(),
            started_at: now,
            finished_at: now,
            outcomes: Vec::new(),
        }
    }

    /// Stamp the end time
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Passed count
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(OutcomeStatus::Passed)
    }

    /// Failed count
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    /// Skipped count
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(OutcomeStatus::Skipped)
    }

    /// True when nothing failed
    #[must_use]
    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    /// Failed outcomes
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failed)
    }

    /// Total wall time in milliseconds
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Plain-text rendering
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            let mark = match outcome.status {
                OutcomeStatus::Passed => "✓",
                OutcomeStatus::Failed => "✗",
                OutcomeStatus::Skipped => "-",
            };
            out.push_str(&format!("{mark} {} ({}ms)\n", outcome.id, outcome.duration_ms));
            if let Some(failure) = &outcome.failure {
                for line in failure.message.lines() {
                    out.push_str(&format!("    [{}] {line}\n", failure.kind));
                }
            }
        }
        out.push_str(&format!(
            "\n{} passed, {} failed, {} skipped in {}ms (run {})\n",
            self.passed(),
            self.failed(),
            self.skipped(),
            self.duration_ms(),
            self.run_id
        ));
        out
    }

    /// Render in `format`
    pub fn render(&self, format: ReportFormat) -> E2eResult<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        let mut report = RunReport::start("http://localhost:3000", "fixture");
        report
            .outcomes
            .push(ScenarioOutcome::passed("Smoke › has title".into(), "Smoke", 12));
        report.outcomes.push(ScenarioOutcome::failed(
            "Homepage › shows posts".into(),
            "Homepage",
            &E2eError::assertion("`tbody tr` count", "2", "3"),
            40,
        ));
        report
            .outcomes
            .push(ScenarioOutcome::skipped("Homepage › other".into(), "Homepage"));
        report.finish();
        report
    }

    #[test]
    fn test_counts() {
        let report = report();
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(!report.success());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_text_rendering() {
        let text = report().render(ReportFormat::Text).unwrap();
        assert!(text.contains("✓ Smoke › has title (12ms)"));
        assert!(text.contains("✗ Homepage › shows posts (40ms)"));
        assert!(text.contains("[assertion] Assertion failed: `tbody tr` count"));
        assert!(text.contains("1 passed, 1 failed, 1 skipped"));
    }

    #[test]
    fn test_json_rendering() {
        let json = report().render(ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["driver"], "fixture");
        assert_eq!(value["outcomes"][1]["status"], "failed");
        assert_eq!(value["outcomes"][1]["failure"]["kind"], "assertion");
    }
}
