//! Page driver abstraction.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  PageDriver (async trait)                                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐      ┌──────────────────────────┐  │
//! │  │  ChromiumPage        │      │  FixturePage             │  │
//! │  │  (feature `browser`) │      │  (in-process DOM model)  │  │
//! │  │  CDP via             │      │  unit tests and          │  │
//! │  │  chromiumoxide       │      │  catalog self-test       │  │
//! │  └──────────────────────┘      └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Locators never hold element handles: every call receives the full
//! [`LocatorChain`] and the driver resolves it against the current document.

#[cfg(feature = "browser")]
pub mod chromium;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::locator::LocatorChain;
use crate::network::{NetworkEntry, Route};
use crate::performance::PerformanceSnapshot;
use crate::result::{E2eError, E2eResult};

#[cfg(feature = "browser")]
pub use chromium::{ChromiumBrowser, ChromiumPage};

// ============================================================================
// Viewport
// ============================================================================

/// Viewport size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Viewport {
    /// Desktop layout
    pub const DESKTOP: Self = Self::new(1200, 800);
    /// Tablet portrait
    pub const TABLET: Self = Self::new(768, 1024);
    /// Phone portrait
    pub const MOBILE: Self = Self::new(375, 667);
    /// Small phone portrait
    pub const MOBILE_SMALL: Self = Self::new(320, 568);
    /// Phone landscape
    pub const MOBILE_LANDSCAPE: Self = Self::new(667, 375);

    /// Width at and above which the desktop navigation is shown
    pub const MOBILE_BREAKPOINT: u32 = 768;

    /// Create a viewport
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether the mobile layout applies
    #[must_use]
    pub const fn is_mobile(&self) -> bool {
        self.width < Self::MOBILE_BREAKPOINT
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ============================================================================
// Element snapshots and navigation results
// ============================================================================

/// Bounding box in CSS pixels, relative to the document
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left
    pub x: f64,
    /// Top
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Snapshot of one resolved element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    /// Lowercase tag name
    pub tag_name: String,
    /// Lowercase tag name of the parent element
    pub parent_tag_name: Option<String>,
    /// Text content
    pub text: String,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Rendered and not hidden
    pub visible: bool,
    /// Has keyboard focus
    pub focused: bool,
    /// Disabled form control
    pub disabled: bool,
    /// Current value of form controls
    pub value: Option<String>,
    /// Constraint validation message, empty when valid
    pub validation_message: String,
    /// Layout box, `None` when not rendered
    pub bounding_box: Option<BoundingBox>,
}

impl ElementState {
    /// Attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Classes from the `class` attribute
    #[must_use]
    pub fn classes(&self) -> Vec<&str> {
        self.attribute("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Main-document response of a navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationResponse {
    /// Final URL
    pub url: String,
    /// HTTP status
    pub status: u16,
    /// Response headers, lowercase names
    pub headers: BTreeMap<String, String>,
}

impl NavigationResponse {
    /// Whether the status is 2xx
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Keyboard keys the scenarios press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    /// Tab
    Tab,
    /// Shift+Tab
    ShiftTab,
    /// Enter
    Enter,
    /// Space
    Space,
    /// Escape
    Escape,
}

impl Key {
    /// Parse a Playwright-style key name (`Tab`, `Shift+Tab`, `Enter`, ...)
    pub fn parse(name: &str) -> E2eResult<Self> {
        match name {
            "Tab" => Ok(Self::Tab),
            "Shift+Tab" => Ok(Self::ShiftTab),
            "Enter" => Ok(Self::Enter),
            " " | "Space" => Ok(Self::Space),
            "Escape" => Ok(Self::Escape),
            other => Err(E2eError::page(format!("unsupported key `{other}`"))),
        }
    }

    /// DOM `key` value
    #[must_use]
    pub const fn dom_key(&self) -> &'static str {
        match self {
            Self::Tab | Self::ShiftTab => "Tab",
            Self::Enter => "Enter",
            Self::Space => " ",
            Self::Escape => "Escape",
        }
    }
}

/// Page load milestones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadState {
    /// `load` event fired
    #[default]
    Load,
    /// `DOMContentLoaded` fired
    DomContentLoaded,
    /// No requests in flight for 500ms
    NetworkIdle,
}

// ============================================================================
// Traits
// ============================================================================

/// One browser page (tab) in its own isolated context.
///
/// Locator methods resolve the chain at call time; a chain that matches
/// nothing yields `Ok(None)` / `Ok(0)` rather than an error so that callers
/// can poll.
#[async_trait]
pub trait PageDriver: Send + Sync + Debug {
    /// Driver name for diagnostics
    fn name(&self) -> &'static str;

    /// Navigate to an absolute URL
    async fn goto(&self, url: &str) -> E2eResult<NavigationResponse>;
    /// Reload the current document
    async fn reload(&self) -> E2eResult<NavigationResponse>;
    /// History back; `None` when there is no previous entry
    async fn go_back(&self) -> E2eResult<Option<NavigationResponse>>;
    /// History forward; `None` when there is no next entry
    async fn go_forward(&self) -> E2eResult<Option<NavigationResponse>>;
    /// Current URL
    async fn url(&self) -> E2eResult<String>;
    /// Document title
    async fn title(&self) -> E2eResult<String>;
    /// Resize the viewport
    async fn set_viewport(&self, viewport: Viewport) -> E2eResult<()>;

    /// Number of elements the chain resolves to
    async fn count(&self, chain: &LocatorChain) -> E2eResult<usize>;
    /// Snapshot of the first element the chain resolves to
    async fn inspect(&self, chain: &LocatorChain) -> E2eResult<Option<ElementState>>;
    /// Snapshots of every element the chain resolves to
    async fn inspect_all(&self, chain: &LocatorChain) -> E2eResult<Vec<ElementState>>;
    /// Click the first element
    async fn click(&self, chain: &LocatorChain) -> E2eResult<()>;
    /// Replace the value of the first element
    async fn fill(&self, chain: &LocatorChain, value: &str) -> E2eResult<()>;
    /// Focus the first element
    async fn focus(&self, chain: &LocatorChain) -> E2eResult<()>;
    /// Press a key on the focused element
    async fn press_key(&self, key: Key) -> E2eResult<()>;

    /// Evaluate a script expression, awaiting promises
    async fn evaluate(&self, expression: &str) -> E2eResult<serde_json::Value>;
    /// Web-vitals snapshot of the current document
    async fn performance(&self) -> E2eResult<PerformanceSnapshot>;

    /// Register a page-scoped route
    async fn route(&self, route: Route) -> E2eResult<()>;
    /// Remove all routes
    async fn unroute_all(&self) -> E2eResult<()>;
    /// Requests made since the page was opened
    async fn network_log(&self) -> E2eResult<Vec<NetworkEntry>>;
    /// Wait for a load milestone
    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> E2eResult<()>;

    /// Close the page and dispose of its context
    async fn close(&self) -> E2eResult<()>;
}

/// Source of isolated pages
#[async_trait]
pub trait Browser: Send + Sync + Debug {
    /// Open a page in a fresh context
    async fn new_page(&self, viewport: Viewport) -> E2eResult<Arc<dyn PageDriver>>;
    /// Shut the browser down
    async fn close(&self) -> E2eResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    mod viewport_tests {
        use super::*;

        #[test]
        fn test_presets() {
            assert_eq!(Viewport::DESKTOP, Viewport::new(1200, 800));
            assert_eq!(Viewport::TABLET, Viewport::new(768, 1024));
            assert_eq!(Viewport::MOBILE, Viewport::new(375, 667));
            assert_eq!(Viewport::MOBILE_SMALL, Viewport::new(320, 568));
            assert_eq!(Viewport::MOBILE_LANDSCAPE, Viewport::new(667, 375));
            assert_eq!(Viewport::default(), Viewport::new(1280, 720));
        }

        #[test]
        fn test_breakpoint() {
            assert!(Viewport::MOBILE.is_mobile());
            assert!(Viewport::MOBILE_LANDSCAPE.is_mobile());
            assert!(!Viewport::TABLET.is_mobile());
            assert_eq!(Viewport::TABLET.to_string(), "768x1024");
        }
    }

    mod element_tests {
        use super::*;

        #[test]
        fn test_classes() {
            let mut state = ElementState::default();
            state
                .attributes
                .insert("class".into(), "mobile-menu  mobile-menu-open".into());
            assert_eq!(state.classes(), ["mobile-menu", "mobile-menu-open"]);
            assert_eq!(state.attribute("id"), None);
        }
    }

    mod key_tests {
        use super::*;

        #[test]
        fn test_parse_keys() {
            assert_eq!(Key::parse("Tab").unwrap(), Key::Tab);
            assert_eq!(Key::parse("Shift+Tab").unwrap(), Key::ShiftTab);
            assert_eq!(Key::parse("Enter").unwrap().dom_key(), "Enter");
            assert_eq!(Key::parse("Space").unwrap().dom_key(), " ");
            assert!(Key::parse("F13").is_err());
        }
    }
}
