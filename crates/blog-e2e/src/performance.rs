//! Web-vitals snapshot and the blog's performance budget.

use serde::{Deserialize, Serialize};

use crate::network::{NetworkEntry, ResourceType};
use crate::result::{E2eError, E2eResult};

/// Script evaluated in the page to collect a [`PerformanceSnapshot`].
///
/// Buffered observers pick up entries recorded before the probe runs; the
/// short settle delay lets the observers flush.
pub const PERFORMANCE_PROBE_JS: &str = r"
new Promise((resolve) => {
  const snapshot = {
    navigation: null,
    first_contentful_paint_ms: null,
    largest_contentful_paint_ms: null,
    cumulative_layout_shift: 0,
    resources: [],
  };
  const nav = performance.getEntriesByType('navigation')[0];
  if (nav) {
    snapshot.navigation = {
      response_end_ms: nav.responseEnd,
      dom_content_loaded_ms: nav.domContentLoadedEventEnd,
      load_ms: nav.loadEventEnd,
    };
  }
  const fcp = performance.getEntriesByName('first-contentful-paint')[0];
  if (fcp) snapshot.first_contentful_paint_ms = fcp.startTime;
  try {
    new PerformanceObserver((list) => {
      const entries = list.getEntries();
      const last = entries[entries.length - 1];
      if (last) snapshot.largest_contentful_paint_ms = last.startTime;
    }).observe({ type: 'largest-contentful-paint', buffered: true });
    new PerformanceObserver((list) => {
      for (const entry of list.getEntries()) {
        if (!entry.hadRecentInput) snapshot.cumulative_layout_shift += entry.value;
      }
    }).observe({ type: 'layout-shift', buffered: true });
  } catch (_) {}
  for (const r of performance.getEntriesByType('resource')) {
    snapshot.resources.push({
      name: r.name,
      initiator_type: r.initiatorType,
      duration_ms: r.duration,
      transfer_size: r.transferSize || 0,
    });
  }
  setTimeout(() => resolve(snapshot), 250);
})
";

/// Navigation timing milestones, relative to navigation start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationTiming {
    /// Response end
    pub response_end_ms: f64,
    /// DOMContentLoaded handler end
    pub dom_content_loaded_ms: f64,
    /// Load handler end
    pub load_ms: f64,
}

/// Timing of one sub-resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTiming {
    /// Resource URL
    pub name: String,
    /// Initiator (`script`, `link`, `fetch`, ...)
    pub initiator_type: String,
    /// Fetch duration
    pub duration_ms: f64,
    /// Bytes transferred
    pub transfer_size: u64,
}

/// Performance metrics of the current document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    /// Navigation timing, if the page was navigated
    pub navigation: Option<NavigationTiming>,
    /// First Contentful Paint
    pub first_contentful_paint_ms: Option<f64>,
    /// Largest Contentful Paint
    pub largest_contentful_paint_ms: Option<f64>,
    /// Cumulative Layout Shift (inputs excluded)
    pub cumulative_layout_shift: f64,
    /// Sub-resource timings
    pub resources: Vec<ResourceTiming>,
}

/// One exceeded budget line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetViolation {
    /// Metric name
    pub metric: String,
    /// Limit (exclusive)
    pub limit: f64,
    /// Observed value
    pub actual: f64,
}

impl std::fmt::Display for BudgetViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {} (limit < {})", self.metric, self.actual, self.limit)
    }
}

/// Thresholds a page must stay under. All limits are exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceBudget {
    /// Largest Contentful Paint
    pub lcp_ms: f64,
    /// First Contentful Paint
    pub fcp_ms: f64,
    /// Cumulative Layout Shift
    pub cls: f64,
    /// Response time of each CSS/JS/WASM resource
    pub critical_resource_ms: f64,
    /// Request count
    pub max_requests: usize,
    /// Total JS + WASM bytes
    pub total_script_bytes: u64,
    /// Bytes of each JS/WASM file
    pub single_script_bytes: u64,
    /// Total CSS bytes
    pub total_css_bytes: u64,
}

impl Default for PerformanceBudget {
    fn default() -> Self {
        Self {
            lcp_ms: 2500.0,
            fcp_ms: 1800.0,
            cls: 0.1,
            critical_resource_ms: 1000.0,
            max_requests: 50,
            total_script_bytes: 1024 * 1024,
            single_script_bytes: 512 * 1024,
            total_css_bytes: 256 * 1024,
        }
    }
}

fn is_script(entry: &NetworkEntry) -> bool {
    matches!(entry.resource_type, ResourceType::Script | ResourceType::Wasm)
}

impl PerformanceBudget {
    /// Create the default budget
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Web-vitals violations
    #[must_use]
    pub fn check_vitals(&self, snapshot: &PerformanceSnapshot) -> Vec<BudgetViolation> {
        let mut violations = Vec::new();
        let mut over = |metric: &str, limit: f64, actual: f64| {
            if actual >= limit {
                violations.push(BudgetViolation {
                    metric: metric.to_string(),
                    limit,
                    actual,
                });
            }
        };
        if let Some(lcp) = snapshot.largest_contentful_paint_ms {
            over("largest-contentful-paint", self.lcp_ms, lcp);
        }
        if let Some(fcp) = snapshot.first_contentful_paint_ms {
            over("first-contentful-paint", self.fcp_ms, fcp);
        }
        over("cumulative-layout-shift", self.cls, snapshot.cumulative_layout_shift);
        violations
    }

    /// Request count, bundle size and resource timing violations
    #[must_use]
    pub fn check_network(&self, entries: &[NetworkEntry]) -> Vec<BudgetViolation> {
        let mut violations = Vec::new();

        if entries.len() >= self.max_requests {
            violations.push(BudgetViolation {
                metric: "requests".to_string(),
                limit: self.max_requests as f64,
                actual: entries.len() as f64,
            });
        }

        for entry in entries {
            let critical = matches!(
                entry.resource_type,
                ResourceType::Stylesheet | ResourceType::Script | ResourceType::Wasm
            );
            if critical && entry.duration_ms >= self.critical_resource_ms {
                violations.push(BudgetViolation {
                    metric: format!("response time of {}", entry.url),
                    limit: self.critical_resource_ms,
                    actual: entry.duration_ms,
                });
            }
            if is_script(entry) && entry.content_length() >= self.single_script_bytes {
                violations.push(BudgetViolation {
                    metric: format!("size of {}", entry.url),
                    limit: self.single_script_bytes as f64,
                    actual: entry.content_length() as f64,
                });
            }
        }

        let total_script = script_bytes(entries);
        if total_script >= self.total_script_bytes {
            violations.push(BudgetViolation {
                metric: "total script bytes".to_string(),
                limit: self.total_script_bytes as f64,
                actual: total_script as f64,
            });
        }
        let total_css = css_bytes(entries);
        if total_css >= self.total_css_bytes {
            violations.push(BudgetViolation {
                metric: "total css bytes".to_string(),
                limit: self.total_css_bytes as f64,
                actual: total_css as f64,
            });
        }
        violations
    }

    /// All violations
    #[must_use]
    pub fn check(
        &self,
        snapshot: &PerformanceSnapshot,
        entries: &[NetworkEntry],
    ) -> Vec<BudgetViolation> {
        let mut violations = self.check_vitals(snapshot);
        violations.extend(self.check_network(entries));
        violations
    }

    /// Fail with an assertion error listing every violation
    pub fn assert_within(
        &self,
        snapshot: &PerformanceSnapshot,
        entries: &[NetworkEntry],
    ) -> E2eResult<()> {
        let violations = self.check(snapshot, entries);
        if violations.is_empty() {
            return Ok(());
        }
        let actual = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(E2eError::assertion(
            "performance budget",
            "all metrics under budget",
            actual,
        ))
    }
}

/// Total JS + WASM bytes in a network log
#[must_use]
pub fn script_bytes(entries: &[NetworkEntry]) -> u64 {
    entries
        .iter()
        .filter(|e| is_script(e))
        .map(NetworkEntry::content_length)
        .sum()
}

/// Total CSS bytes in a network log
#[must_use]
pub fn css_bytes(entries: &[NetworkEntry]) -> u64 {
    entries
        .iter()
        .filter(|e| e.resource_type == ResourceType::Stylesheet)
        .map(NetworkEntry::content_length)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn entry(url: &str, size: u64, duration_ms: f64) -> NetworkEntry {
        let mut headers = BTreeMap::new();
        headers.insert("content-length".to_string(), size.to_string());
        NetworkEntry {
            url: url.to_string(),
            method: "GET".to_string(),
            resource_type: ResourceType::from_url(url),
            status: Some(200),
            headers,
            encoded_size: size,
            duration_ms,
            failure: None,
        }
    }

    fn good_snapshot() -> PerformanceSnapshot {
        PerformanceSnapshot {
            first_contentful_paint_ms: Some(180.0),
            largest_contentful_paint_ms: Some(320.0),
            ..PerformanceSnapshot::default()
        }
    }

    #[test]
    fn test_good_page_passes() {
        let entries = vec![
            entry("http://x/", 4_000, 12.0),
            entry("http://x/pkg/blog.css", 20_000, 5.0),
            entry("http://x/pkg/blog.js", 40_000, 5.0),
            entry("http://x/pkg/blog.wasm", 400_000, 30.0),
        ];
        let budget = PerformanceBudget::default();
        assert!(budget.check(&good_snapshot(), &entries).is_empty());
        assert!(budget.assert_within(&good_snapshot(), &entries).is_ok());
    }

    #[test]
    fn test_vitals_limits_are_exclusive() {
        let snapshot = PerformanceSnapshot {
            largest_contentful_paint_ms: Some(2500.0),
            cumulative_layout_shift: 0.1,
            ..PerformanceSnapshot::default()
        };
        let violations = PerformanceBudget::default().check_vitals(&snapshot);
        let metrics: Vec<_> = violations.iter().map(|v| v.metric.as_str()).collect();
        assert_eq!(metrics, ["largest-contentful-paint", "cumulative-layout-shift"]);
    }

    #[test]
    fn test_bundle_limits() {
        let entries = vec![
            entry("http://x/a.wasm", 600 * 1024, 10.0),
            entry("http://x/b.js", 500 * 1024, 10.0),
            entry("http://x/c.css", 300 * 1024, 1200.0),
        ];
        let violations = PerformanceBudget::default().check_network(&entries);
        let metrics: Vec<_> = violations.iter().map(|v| v.metric.clone()).collect();
        assert!(metrics.contains(&"size of http://x/a.wasm".to_string()));
        assert!(!metrics.contains(&"size of http://x/b.js".to_string()));
        assert!(metrics.contains(&"total script bytes".to_string()));
        assert!(metrics.contains(&"total css bytes".to_string()));
        assert!(metrics.contains(&"response time of http://x/c.css".to_string()));
    }

    #[test]
    fn test_request_count_limit() {
        let entries: Vec<_> = (0..50).map(|i| entry(&format!("http://x/{i}.png"), 1, 1.0)).collect();
        let err = PerformanceBudget::default()
            .assert_within(&good_snapshot(), &entries)
            .unwrap_err();
        assert!(err.to_string().contains("requests = 50"));
    }

    #[test]
    fn test_snapshot_deserializes_probe_shape() {
        let json = serde_json::json!({
            "navigation": {"response_end_ms": 10.0, "dom_content_loaded_ms": 40.0, "load_ms": 60.0},
            "first_contentful_paint_ms": 120.5,
            "largest_contentful_paint_ms": null,
            "cumulative_layout_shift": 0.0,
            "resources": [{"name": "http://x/a.js", "initiator_type": "script", "duration_ms": 3.0, "transfer_size": 300}]
        });
        let snapshot: PerformanceSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(snapshot.first_contentful_paint_ms, Some(120.5));
        assert!(snapshot.largest_contentful_paint_ms.is_none());
        assert_eq!(snapshot.resources.len(), 1);
    }
}
