//! Scenario catalog, one module per feature area.
//!
//! Scenarios only talk to [`Page`](crate::Page), so the same catalog runs
//! against Chromium and against the fixture driver.

pub mod accessibility;
pub mod blog_posts;
pub mod homepage;
pub mod navigation;
pub mod performance;
pub mod responsive;
pub mod smoke;
pub mod subscription;

use crate::scenario::Scenario;

pub use crate::fixture::form::SUBSCRIBE_PATH;
pub use crate::fixture::site::{DESCRIPTION, HOME_TITLE, VIEWPORT_META};

/// Social profile links in the navigation bar
pub const SOCIAL_HREFS: [&str; 3] = [
    "https://github.com/hnlearndev",
    "https://www.linkedin.com/in/hieunthello/",
    "mailto:hieunt.hello@gmail.com",
];

type SuiteFn = fn() -> Vec<Scenario>;

const SUITES: &[(&str, SuiteFn)] = &[
    (accessibility::SUITE, accessibility::scenarios),
    (blog_posts::SUITE, blog_posts::scenarios),
    (homepage::SUITE, homepage::scenarios),
    (navigation::SUITE, navigation::scenarios),
    (performance::SUITE, performance::scenarios),
    (responsive::SUITE, responsive::scenarios),
    (subscription::SUITE, subscription::scenarios),
    (smoke::SUITE, smoke::scenarios),
];

/// Every scenario, suite by suite
#[must_use]
pub fn catalog() -> Vec<Scenario> {
    SUITES.iter().flat_map(|(_, scenarios)| scenarios()).collect()
}

/// Suite names in catalog order
#[must_use]
pub fn suite_names() -> Vec<&'static str> {
    SUITES.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let scenarios = catalog();
        let ids: HashSet<String> = scenarios.iter().map(Scenario::id).collect();
        assert_eq!(ids.len(), scenarios.len());
    }

    #[test]
    fn test_every_suite_contributes() {
        let scenarios = catalog();
        for name in suite_names() {
            assert!(
                scenarios.iter().any(|s| s.suite == name),
                "suite {name} has no scenarios"
            );
        }
    }

    #[test]
    fn test_suite_sizes() {
        let count = |suite: &str| catalog().iter().filter(|s| s.suite == suite).count();
        assert_eq!(count(homepage::SUITE), 8);
        assert_eq!(count(blog_posts::SUITE), 11);
        assert_eq!(count(subscription::SUITE), 10);
        assert_eq!(count(smoke::SUITE), 1);
    }

    #[test]
    fn test_mobile_groups_use_mobile_viewport() {
        for scenario in catalog().iter().filter(|s| s.group.starts_with("Mobile")) {
            assert!(scenario.viewport.is_mobile(), "{}", scenario.id());
        }
    }
}
