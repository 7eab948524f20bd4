//! Lazily-resolved element locators.
//!
//! A [`Locator`] is a chain of `(selector, pick)` steps bound to a page.
//! Nothing is resolved until an operation runs, and every operation resolves
//! the chain afresh against the current document. Actions auto-wait for the
//! first matched element to be attached, visible and enabled.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::{BoundingBox, ElementState, Key};
use crate::page::Page;
use crate::result::{E2eError, E2eResult};
use crate::selector::{SelectorList, SelectorTarget};

// ============================================================================
// Chain
// ============================================================================

/// Which matches of a step survive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum Pick {
    /// Every match
    All,
    /// First match in document order
    First,
    /// Last match in document order
    Last,
    /// Zero-based match index
    Nth(usize),
}

impl Pick {
    /// Apply the pick to matches in document order
    #[must_use]
    pub fn apply<N: Copy>(self, matches: Vec<N>) -> Vec<N> {
        match self {
            Self::All => matches,
            Self::First => matches.first().copied().into_iter().collect(),
            Self::Last => matches.last().copied().into_iter().collect(),
            Self::Nth(n) => matches.get(n).copied().into_iter().collect(),
        }
    }
}

/// One step of a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorStep {
    /// Selector source
    pub selector: String,
    /// Pick applied after matching
    pub pick: Pick,
}

/// A step with its selector parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledStep {
    /// Parsed selector
    pub selector: SelectorList,
    /// Pick applied after matching
    pub pick: Pick,
}

/// Sequence of steps, outermost first
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocatorChain {
    steps: Vec<LocatorStep>,
}

impl LocatorChain {
    /// Chain with a single selector step
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            steps: vec![LocatorStep {
                selector: selector.into(),
                pick: Pick::All,
            }],
        }
    }

    /// Append a descendant step
    #[must_use]
    pub fn child(&self, selector: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.steps.push(LocatorStep {
            selector: selector.into(),
            pick: Pick::All,
        });
        next
    }

    /// Replace the pick of the last step
    #[must_use]
    pub fn pick(&self, pick: Pick) -> Self {
        let mut next = self.clone();
        if let Some(last) = next.steps.last_mut() {
            last.pick = pick;
        }
        next
    }

    /// Steps
    #[must_use]
    pub fn steps(&self) -> &[LocatorStep] {
        &self.steps
    }

    /// Parse every step's selector
    pub fn compile(&self) -> E2eResult<Vec<CompiledStep>> {
        self.steps
            .iter()
            .map(|step| {
                Ok(CompiledStep {
                    selector: SelectorList::parse(&step.selector)?,
                    pick: step.pick,
                })
            })
            .collect()
    }

    /// Resolve against a document.
    ///
    /// `nodes` lists every element in document order. The first step selects
    /// over the whole document; each later step keeps matches that descend
    /// from some element of the previous step.
    pub fn resolve<T: SelectorTarget>(&self, target: &T, nodes: &[T::Node]) -> E2eResult<Vec<T::Node>> {
        let mut current: Option<Vec<T::Node>> = None;
        for step in self.compile()? {
            let matched: Vec<T::Node> = nodes
                .iter()
                .copied()
                .filter(|&node| step.selector.matches(target, node))
                .filter(|&node| match &current {
                    None => true,
                    Some(scope) => has_ancestor_in(target, node, scope),
                })
                .collect();
            current = Some(step.pick.apply(matched));
        }
        Ok(current.unwrap_or_default())
    }

    /// Description used in error messages, e.g. `nav >> a >> nth=1`
    #[must_use]
    pub fn describe(&self) -> String {
        self.steps
            .iter()
            .map(|step| match step.pick {
                Pick::All => step.selector.clone(),
                Pick::First => format!("{} >> first", step.selector),
                Pick::Last => format!("{} >> last", step.selector),
                Pick::Nth(n) => format!("{} >> nth={n}", step.selector),
            })
            .collect::<Vec<_>>()
            .join(" >> ")
    }
}

fn has_ancestor_in<T: SelectorTarget>(target: &T, node: T::Node, scope: &[T::Node]) -> bool {
    let mut cursor = target.parent(node);
    while let Some(current) = cursor {
        if scope.contains(&current) {
            return true;
        }
        cursor = target.parent(current);
    }
    false
}

// ============================================================================
// Locator
// ============================================================================

/// A chain bound to a page
#[derive(Debug, Clone)]
pub struct Locator {
    page: Page,
    chain: LocatorChain,
}

impl Locator {
    pub(crate) fn new(page: Page, chain: LocatorChain) -> Self {
        Self { page, chain }
    }

    /// The chain
    #[must_use]
    pub fn chain(&self) -> &LocatorChain {
        &self.chain
    }

    /// The page this locator belongs to
    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Description for messages
    #[must_use]
    pub fn describe(&self) -> String {
        self.chain.describe()
    }

    /// Descendants matching `selector`
    #[must_use]
    pub fn locator(&self, selector: &str) -> Self {
        Self::new(self.page.clone(), self.chain.child(selector))
    }

    /// First match
    #[must_use]
    pub fn first(&self) -> Self {
        Self::new(self.page.clone(), self.chain.pick(Pick::First))
    }

    /// Last match
    #[must_use]
    pub fn last(&self) -> Self {
        Self::new(self.page.clone(), self.chain.pick(Pick::Last))
    }

    /// Match at `index`
    #[must_use]
    pub fn nth(&self, index: usize) -> Self {
        Self::new(self.page.clone(), self.chain.pick(Pick::Nth(index)))
    }

    /// One locator per current match
    pub async fn all(&self) -> E2eResult<Vec<Self>> {
        let count = self.count().await?;
        Ok((0..count).map(|i| self.nth(i)).collect())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Number of matches right now
    pub async fn count(&self) -> E2eResult<usize> {
        self.page.driver().count(&self.chain).await
    }

    /// Snapshot of the first match, if any
    pub async fn inspect(&self) -> E2eResult<Option<ElementState>> {
        self.page.driver().inspect(&self.chain).await
    }

    /// Snapshots of every match
    pub async fn inspect_all(&self) -> E2eResult<Vec<ElementState>> {
        self.page.driver().inspect_all(&self.chain).await
    }

    /// Snapshot of the first match, waiting for it to be attached
    async fn attached(&self) -> E2eResult<ElementState> {
        let settings = self.page.settings();
        self.poll_until(settings.action_timeout, "to be attached", |state| {
            state.is_some()
        })
        .await
    }

    async fn poll_until<F>(
        &self,
        timeout: Duration,
        what: &str,
        ready: F,
    ) -> E2eResult<ElementState>
    where
        F: Fn(Option<&ElementState>) -> bool + Send,
    {
        let poll = self.page.settings().poll_interval;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let state = self.inspect().await?;
            if ready(state.as_ref()) {
                if let Some(state) = state {
                    return Ok(state);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(E2eError::timeout(
                    timeout.as_millis() as u64,
                    format!("`{}` {what}", self.describe()),
                ));
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Text content of the first match
    pub async fn text_content(&self) -> E2eResult<String> {
        Ok(self.attached().await?.text)
    }

    /// Text content of every match
    pub async fn all_text_contents(&self) -> E2eResult<Vec<String>> {
        Ok(self
            .inspect_all()
            .await?
            .into_iter()
            .map(|state| state.text)
            .collect())
    }

    /// Attribute of the first match
    pub async fn get_attribute(&self, name: &str) -> E2eResult<Option<String>> {
        Ok(self.attached().await?.attributes.get(name).cloned())
    }

    /// Whether the first match is visible; `false` when nothing matches
    pub async fn is_visible(&self) -> E2eResult<bool> {
        Ok(self.inspect().await?.is_some_and(|s| s.visible))
    }

    /// Whether the first match is enabled
    pub async fn is_enabled(&self) -> E2eResult<bool> {
        Ok(!self.attached().await?.disabled)
    }

    /// Value of the first (form control) match
    pub async fn input_value(&self) -> E2eResult<String> {
        let state = self.attached().await?;
        state.value.ok_or_else(|| {
            E2eError::action("input_value", self.describe(), "element is not a form control")
        })
    }

    /// Constraint validation message of the first match
    pub async fn validation_message(&self) -> E2eResult<String> {
        Ok(self.attached().await?.validation_message)
    }

    /// Layout box of the first match, `None` when not rendered
    pub async fn bounding_box(&self) -> E2eResult<Option<BoundingBox>> {
        Ok(self.attached().await?.bounding_box)
    }

    /// Tag name of the first match's parent element
    pub async fn parent_tag_name(&self) -> E2eResult<Option<String>> {
        Ok(self.attached().await?.parent_tag_name)
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    async fn actionable(&self, action: &str) -> E2eResult<ElementState> {
        let timeout = self.page.settings().action_timeout;
        tracing::trace!(locator = %self.describe(), action, "waiting for actionable element");
        self.poll_until(timeout, "to be visible and enabled", |state| {
            state.is_some_and(|s| s.visible && !s.disabled)
        })
        .await
    }

    /// Click the first match once it is actionable
    pub async fn click(&self) -> E2eResult<()> {
        self.actionable("click").await?;
        tracing::debug!(locator = %self.describe(), "click");
        self.page.driver().click(&self.chain).await
    }

    /// Tap the first match (a click on pointer-less drivers)
    pub async fn tap(&self) -> E2eResult<()> {
        self.actionable("tap").await?;
        tracing::debug!(locator = %self.describe(), "tap");
        self.page.driver().click(&self.chain).await
    }

    /// Replace the value of the first match
    pub async fn fill(&self, value: &str) -> E2eResult<()> {
        self.actionable("fill").await?;
        tracing::debug!(locator = %self.describe(), value, "fill");
        self.page.driver().fill(&self.chain, value).await
    }

    /// Focus the first match
    pub async fn focus(&self) -> E2eResult<()> {
        self.actionable("focus").await?;
        self.page.driver().focus(&self.chain).await
    }

    /// Focus the first match and press `key`
    pub async fn press(&self, key: &str) -> E2eResult<()> {
        let key = Key::parse(key)?;
        self.focus().await?;
        self.page.driver().press_key(key).await
    }
}
