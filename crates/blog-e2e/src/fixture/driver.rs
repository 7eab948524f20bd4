//! In-process browser serving a [`BlogSite`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::driver::{
    Browser, ElementState, Key, LoadState, NavigationResponse, PageDriver, Viewport,
};
use crate::locator::LocatorChain;
use crate::network::{
    resolve_url, url_origin, AbortReason, MockResponse, NetworkEntry, ResourceType, Route,
    RouteResponse, RouteTable,
};
use crate::performance::PerformanceSnapshot;
use crate::result::{E2eError, E2eResult};
use crate::selector::normalize_whitespace;

use super::dom::{el, Document, NodeId};
use super::form::{
    self, FormNodes, FormState, ALREADY_SUBSCRIBED, CONFIRMATION, INVALID_EMAIL, NETWORK_ERROR,
    SUBSCRIBE_PATH,
};
use super::layout::{is_displayed, Layout};
use super::site::BlogSite;

/// Driver name reported in diagnostics and run reports
pub const FIXTURE_DRIVER: &str = "fixture";

/// Default simulated round trip
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(20);

const ABOUT_BLANK: &str = "about:blank";

// ============================================================================
// Browser
// ============================================================================

/// Browser double: every page is an isolated view of the same site
#[derive(Debug)]
pub struct FixtureBrowser {
    site: Arc<BlogSite>,
    latency: Duration,
    open_pages: Arc<AtomicUsize>,
    opened: AtomicUsize,
    closed: AtomicBool,
}

impl FixtureBrowser {
    /// Serve `site`
    #[must_use]
    pub fn new(site: BlogSite) -> Self {
        Self {
            site: Arc::new(site),
            latency: DEFAULT_LATENCY,
            open_pages: Arc::new(AtomicUsize::new(0)),
            opened: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Simulated round trip for navigations and requests
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Pages currently open
    #[must_use]
    pub fn open_pages(&self) -> usize {
        self.open_pages.load(Ordering::SeqCst)
    }

    /// Pages opened since launch
    #[must_use]
    pub fn pages_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Default for FixtureBrowser {
    fn default() -> Self {
        Self::new(BlogSite::default())
    }
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn new_page(&self, viewport: Viewport) -> E2eResult<Arc<dyn PageDriver>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(E2eError::page("browser is closed"));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.open_pages.fetch_add(1, Ordering::SeqCst);
        let page = FixturePage::new(
            Arc::clone(&self.site),
            viewport,
            self.latency,
            Arc::clone(&self.open_pages),
        );
        tracing::debug!(page = %page.id, %viewport, "fixture page opened");
        Ok(Arc::new(page))
    }

    async fn close(&self) -> E2eResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Page state
// ============================================================================

#[derive(Debug)]
struct PageState {
    viewport: Viewport,
    url: String,
    status: u16,
    headers: BTreeMap<String, String>,
    document: Document,
    loads_assets: bool,
    history: Vec<String>,
    history_index: usize,
    routes: RouteTable,
    network: Vec<NetworkEntry>,
    form: FormState,
    subscribers: BTreeSet<String>,
    /// Bumped on every navigation; stale form submissions compare against it
    epoch: u64,
    tasks: Vec<JoinHandle<()>>,
    closed: bool,
}

impl PageState {
    fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            url: ABOUT_BLANK.to_string(),
            status: 200,
            headers: BTreeMap::new(),
            document: blank_document(),
            loads_assets: false,
            history: Vec::new(),
            history_index: 0,
            routes: RouteTable::new(),
            network: Vec::new(),
            form: FormState::Idle,
            subscribers: BTreeSet::new(),
            epoch: 0,
            tasks: Vec::new(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> E2eResult<()> {
        if self.closed {
            Err(E2eError::page("page is closed"))
        } else {
            Ok(())
        }
    }

    fn cancel_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    fn response(&self) -> NavigationResponse {
        NavigationResponse {
            url: self.url.clone(),
            status: self.status,
            headers: self.headers.clone(),
        }
    }

    fn resolve(&self, chain: &LocatorChain) -> E2eResult<Vec<NodeId>> {
        chain.resolve(&self.document, &self.document.elements())
    }

    fn first(&self, chain: &LocatorChain, action: &str) -> E2eResult<NodeId> {
        self.resolve(chain)?.first().copied().ok_or_else(|| {
            E2eError::action(action, chain.describe(), "no element matches the locator")
        })
    }

    fn layout(&self) -> Layout {
        Layout::compute(&self.document, self.viewport)
    }
}

fn blank_document() -> Document {
    Document::from_tree(el("html").child(el("head")).child(el("body")))
}

fn is_focusable(doc: &Document, node: NodeId) -> bool {
    match doc.tag(node) {
        "a" => doc.attr(node, "href").is_some(),
        "button" | "input" | "select" | "textarea" => !doc.is_disabled(node),
        _ => doc.attr(node, "tabindex").is_some(),
    }
}

/// Tab order: focusable, rendered elements in document order
fn tab_order(state: &PageState) -> Vec<NodeId> {
    let doc = &state.document;
    let layout = state.layout();
    doc.elements()
        .into_iter()
        .filter(|&n| is_focusable(doc, n) && layout.is_visible(n))
        .filter(|&n| doc.attr(n, "tabindex") != Some("-1"))
        .collect()
}

fn snapshot(state: &PageState, layout: &Layout, node: NodeId) -> ElementState {
    let doc = &state.document;
    let value = doc.value(node);
    let validation_message = match (doc.tag(node), doc.attr(node, "type"), &value) {
        ("input", Some("email"), Some(value))
            if !value.is_empty() || doc.attr(node, "required").is_some() =>
        {
            form::validation_message(value)
        }
        _ => String::new(),
    };
    ElementState {
        tag_name: doc.tag(node).to_string(),
        parent_tag_name: doc
            .parent(node)
            .filter(|&p| doc.is_element(p))
            .map(|p| doc.tag(p).to_string()),
        text: doc.text_content(node),
        attributes: doc.attributes(node),
        visible: layout.is_visible(node),
        focused: doc.focused() == Some(node),
        disabled: doc.is_disabled(node),
        value,
        validation_message,
        bounding_box: layout.bounding_box(node),
    }
}

// ============================================================================
// Page
// ============================================================================

/// One fixture page with its own document, history, routes and network log
#[derive(Debug)]
pub struct FixturePage {
    id: Uuid,
    site: Arc<BlogSite>,
    latency: Duration,
    state: Arc<Mutex<PageState>>,
    open_pages: Arc<AtomicUsize>,
}

/// Outcome of activating an element
enum Activation {
    None,
    Navigate(String),
}

impl FixturePage {
    fn new(
        site: Arc<BlogSite>,
        viewport: Viewport,
        latency: Duration,
        open_pages: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            site,
            latency,
            state: Arc::new(Mutex::new(PageState::new(viewport))),
            open_pages,
        }
    }

    /// Replace the document with the site's rendering of `url`
    fn load(&self, state: &mut PageState, url: &str) {
        let rendered = self.site.render(url);
        state.cancel_tasks();
        state.epoch += 1;
        state.form = FormState::Idle;
        state.url = url.to_string();
        state.status = rendered.status;
        state.document = rendered.document;
        state.loads_assets = rendered.loads_assets;
        state.headers = BTreeMap::from([
            ("content-type".to_string(), rendered.content_type.to_string()),
            ("content-encoding".to_string(), "br".to_string()),
            ("cache-control".to_string(), "no-cache".to_string()),
        ]);

        let encoded_size = state.document.text_content(state.document.root()).len() as u64 + 2048;
        state.network.push(NetworkEntry {
            url: url.to_string(),
            method: "GET".to_string(),
            resource_type: ResourceType::Document,
            status: Some(rendered.status),
            headers: state.headers.clone(),
            encoded_size,
            duration_ms: self.latency.as_secs_f64() * 1000.0,
            failure: None,
        });

        if rendered.loads_assets {
            let origin = url_origin(url).to_string();
            for asset in &self.site.assets {
                let asset_url = format!("{origin}{}", asset.path);
                let entry = match state.routes.find(&asset_url).map(|r| r.response.clone()) {
                    Some(RouteResponse::Fulfill(response)) => {
                        fulfilled_entry(&asset_url, "GET", &response, asset.duration_ms)
                    }
                    Some(RouteResponse::Abort(reason)) => aborted_entry(&asset_url, "GET", reason),
                    None => {
                        let mut headers = BTreeMap::from([
                            ("content-type".to_string(), asset.content_type.clone()),
                            ("content-length".to_string(), asset.size.to_string()),
                            (
                                "cache-control".to_string(),
                                "public, max-age=31536000".to_string(),
                            ),
                        ]);
                        if asset.compressed {
                            headers.insert("content-encoding".to_string(), "br".to_string());
                        }
                        NetworkEntry {
                            url: asset_url,
                            method: "GET".to_string(),
                            resource_type: asset.resource_type(),
                            status: Some(200),
                            headers,
                            encoded_size: asset.size,
                            duration_ms: asset.duration_ms,
                            failure: None,
                        }
                    }
                };
                state.network.push(entry);
            }
        }
        tracing::debug!(page = %self.id, url, status = rendered.status, "fixture navigation");
    }

    /// Navigate and record a new history entry
    fn navigate(&self, state: &mut PageState, url: &str) -> NavigationResponse {
        if !state.history.is_empty() {
            state.history.truncate(state.history_index + 1);
        }
        state.history.push(url.to_string());
        state.history_index = state.history.len() - 1;
        self.load(state, url);
        state.response()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Default action of `node` (a click target or a keyboard activation)
    fn activate(&self, state: &mut PageState, node: NodeId) -> Activation {
        let doc = &state.document;
        let Some(target) = ancestor_or_self(doc, node, |doc, n| matches!(doc.tag(n), "a" | "button")) else {
            return Activation::None;
        };

        if doc.tag(target) == "a" {
            let Some(href) = doc.attr(target, "href") else {
                return Activation::None;
            };
            if doc.attr(target, "target") == Some("_blank") || href.starts_with("mailto:") {
                tracing::trace!(href, "link opens outside this page");
                return Activation::None;
            }
            let url = resolve_url(&state.url, href);
            if url_origin(&url) != url_origin(&state.url) {
                tracing::trace!(%url, "external link not followed");
                return Activation::None;
            }
            return Activation::Navigate(url);
        }

        if doc.is_disabled(target) {
            return Activation::None;
        }
        if doc.has_class(target, "mobile-menu-button") {
            if let Some(menu) = state.document.find_by_class("mobile-menu") {
                let open = !state.document.has_class(menu, "mobile-menu-open");
                state.document.set_class(menu, "mobile-menu-open", open);
                state
                    .document
                    .set_attr(target, "aria-expanded", if open { "true" } else { "false" });
            }
            return Activation::None;
        }
        if let Some(nodes) = FormNodes::find(&state.document) {
            if target == nodes.button {
                self.submit(state, nodes);
            } else if nodes.is_reset_button(&state.document, target) {
                state.form = FormState::Idle;
                nodes.apply(&mut state.document, &state.form, self.site.form_fault);
            }
        }
        Activation::None
    }

    fn finish_activation(&self, state: &mut PageState, activation: Activation) {
        if let Activation::Navigate(url) = activation {
            self.navigate(state, &url);
        }
    }

    /// Start a subscription; the outcome is applied by a background task
    fn submit(&self, state: &mut PageState, nodes: FormNodes) {
        let email = state
            .document
            .value(nodes.input)
            .unwrap_or_default()
            .trim()
            .to_string();
        if email.is_empty() || state.form == FormState::Loading {
            return;
        }
        state.form = FormState::Loading;
        nodes.apply(&mut state.document, &state.form, self.site.form_fault);

        let endpoint = format!("{}{SUBSCRIBE_PATH}", url_origin(&state.url));
        let plan = if form::is_valid_email(&email) {
            match state.routes.find(&endpoint).map(|r| r.response.clone()) {
                Some(RouteResponse::Fulfill(response)) => Submission::Mocked(response),
                Some(RouteResponse::Abort(reason)) => Submission::Aborted(reason),
                None => Submission::Backend,
            }
        } else {
            Submission::Invalid
        };
        let delay = match &plan {
            Submission::Mocked(response) => response.delay.unwrap_or(self.latency),
            _ => self.latency,
        };
        tracing::debug!(page = %self.id, email, ?delay, "subscribe submitted");

        let shared = Arc::clone(&self.state);
        let epoch = state.epoch;
        let fault = self.site.form_fault;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = shared.lock().await;
            if state.closed || state.epoch != epoch {
                return;
            }
            let duration_ms = delay.as_secs_f64() * 1000.0;
            let next = match plan {
                Submission::Invalid => FormState::Error(INVALID_EMAIL.to_string()),
                Submission::Mocked(response) => {
                    state
                        .network
                        .push(fulfilled_entry(&endpoint, "POST", &response, duration_ms));
                    form::outcome(&response)
                }
                Submission::Aborted(reason) => {
                    state.network.push(aborted_entry(&endpoint, "POST", reason));
                    FormState::Error(NETWORK_ERROR.to_string())
                }
                Submission::Backend => {
                    let fresh = state.subscribers.insert(email.to_ascii_lowercase());
                    let message = if fresh { CONFIRMATION } else { ALREADY_SUBSCRIBED };
                    let response = MockResponse::json(
                        200,
                        &serde_json::json!({
                            "status": if fresh { "success" } else { "warning" },
                            "message": message,
                        }),
                    );
                    state
                        .network
                        .push(fulfilled_entry(&endpoint, "POST", &response, duration_ms));
                    form::outcome(&response)
                }
            };
            if let Some(nodes) = FormNodes::find(&state.document) {
                if matches!(next, FormState::Success(_)) {
                    state.document.set_value(nodes.input, "");
                }
                nodes.apply(&mut state.document, &next, fault);
            }
            tracing::debug!(state = ?next, "subscribe settled");
            state.form = next;
        });
        state.tasks.retain(|t| !t.is_finished());
        state.tasks.push(task);
    }
}

/// How a pending subscription resolves
enum Submission {
    Invalid,
    Mocked(MockResponse),
    Aborted(AbortReason),
    Backend,
}

fn ancestor_or_self(
    doc: &Document,
    node: NodeId,
    pred: impl Fn(&Document, NodeId) -> bool,
) -> Option<NodeId> {
    let mut cursor = Some(node);
    while let Some(current) = cursor {
        if pred(doc, current) {
            return Some(current);
        }
        cursor = doc.parent(current);
    }
    None
}

fn fulfilled_entry(url: &str, method: &str, response: &MockResponse, duration_ms: f64) -> NetworkEntry {
    let mut headers = response.headers.clone();
    headers.insert("content-type".to_string(), response.content_type.clone());
    headers
        .entry("content-length".to_string())
        .or_insert_with(|| response.body.len().to_string());
    NetworkEntry {
        url: url.to_string(),
        method: method.to_string(),
        resource_type: if method == "GET" {
            ResourceType::from_url(url)
        } else {
            ResourceType::Fetch
        },
        status: Some(response.status),
        headers,
        encoded_size: response.body.len() as u64,
        duration_ms,
        failure: None,
    }
}

fn aborted_entry(url: &str, method: &str, reason: AbortReason) -> NetworkEntry {
    NetworkEntry {
        url: url.to_string(),
        method: method.to_string(),
        resource_type: if method == "GET" {
            ResourceType::from_url(url)
        } else {
            ResourceType::Fetch
        },
        status: None,
        headers: BTreeMap::new(),
        encoded_size: 0,
        duration_ms: 0.0,
        failure: Some(reason.message().to_string()),
    }
}

#[async_trait]
impl PageDriver for FixturePage {
    fn name(&self) -> &'static str {
        FIXTURE_DRIVER
    }

    async fn goto(&self, url: &str) -> E2eResult<NavigationResponse> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        Ok(self.navigate(&mut state, url))
    }

    async fn reload(&self) -> E2eResult<NavigationResponse> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        let url = state.url.clone();
        self.load(&mut state, &url);
        Ok(state.response())
    }

    async fn go_back(&self) -> E2eResult<Option<NavigationResponse>> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        if state.history_index == 0 || state.history.is_empty() {
            return Ok(None);
        }
        state.history_index -= 1;
        let url = state.history[state.history_index].clone();
        self.load(&mut state, &url);
        Ok(Some(state.response()))
    }

    async fn go_forward(&self) -> E2eResult<Option<NavigationResponse>> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        if state.history_index + 1 >= state.history.len() {
            return Ok(None);
        }
        state.history_index += 1;
        let url = state.history[state.history_index].clone();
        self.load(&mut state, &url);
        Ok(Some(state.response()))
    }

    async fn url(&self) -> E2eResult<String> {
        let state = self.state.lock().await;
        state.ensure_open()?;
        Ok(state.url.clone())
    }

    async fn title(&self) -> E2eResult<String> {
        let state = self.state.lock().await;
        state.ensure_open()?;
        let doc = &state.document;
        Ok(doc
            .find_by_tag("title")
            .map(|t| normalize_whitespace(&doc.text_content(t)))
            .unwrap_or_default())
    }

    async fn set_viewport(&self, viewport: Viewport) -> E2eResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        state.viewport = viewport;
        if let Some(focused) = state.document.focused() {
            if !is_displayed(&state.document, focused, viewport) {
                state.document.set_focus(None);
            }
        }
        Ok(())
    }

    async fn count(&self, chain: &LocatorChain) -> E2eResult<usize> {
        let state = self.state.lock().await;
        state.ensure_open()?;
        Ok(state.resolve(chain)?.len())
    }

    async fn inspect(&self, chain: &LocatorChain) -> E2eResult<Option<ElementState>> {
        let state = self.state.lock().await;
        state.ensure_open()?;
        let Some(&node) = state.resolve(chain)?.first() else {
            return Ok(None);
        };
        let layout = state.layout();
        Ok(Some(snapshot(&state, &layout, node)))
    }

    async fn inspect_all(&self, chain: &LocatorChain) -> E2eResult<Vec<ElementState>> {
        let state = self.state.lock().await;
        state.ensure_open()?;
        let layout = state.layout();
        Ok(state
            .resolve(chain)?
            .into_iter()
            .map(|node| snapshot(&state, &layout, node))
            .collect())
    }

    async fn click(&self, chain: &LocatorChain) -> E2eResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        let node = state.first(chain, "click")?;
        let focus_target = ancestor_or_self(&state.document, node, is_focusable);
        state.document.set_focus(focus_target);
        let activation = self.activate(&mut state, node);
        self.finish_activation(&mut state, activation);
        Ok(())
    }

    async fn fill(&self, chain: &LocatorChain, value: &str) -> E2eResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        let node = state.first(chain, "fill")?;
        let doc = &mut state.document;
        if !matches!(doc.tag(node), "input" | "textarea") {
            return Err(E2eError::action(
                "fill",
                chain.describe(),
                format!("<{}> is not an <input> or <textarea>", doc.tag(node)),
            ));
        }
        if doc.is_disabled(node) {
            return Err(E2eError::action("fill", chain.describe(), "element is disabled"));
        }
        doc.set_value(node, value);
        doc.set_focus(Some(node));
        Ok(())
    }

    async fn focus(&self, chain: &LocatorChain) -> E2eResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        let node = state.first(chain, "focus")?;
        if is_focusable(&state.document, node) {
            state.document.set_focus(Some(node));
        }
        Ok(())
    }

    async fn press_key(&self, key: Key) -> E2eResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        match key {
            Key::Tab | Key::ShiftTab => {
                let order = tab_order(&state);
                let current = state
                    .document
                    .focused()
                    .and_then(|f| order.iter().position(|&n| n == f));
                let next = match (key, current) {
                    (Key::Tab, None) => order.first().copied(),
                    (Key::Tab, Some(i)) => order.get(i + 1).copied(),
                    (_, None) => order.last().copied(),
                    (_, Some(i)) => i.checked_sub(1).and_then(|j| order.get(j).copied()),
                };
                state.document.set_focus(next);
            }
            Key::Enter | Key::Space => {
                let Some(focused) = state.document.focused() else {
                    return Ok(());
                };
                let tag = state.document.tag(focused);
                let activates = match key {
                    Key::Enter => matches!(tag, "a" | "button"),
                    _ => tag == "button",
                };
                if activates {
                    let activation = self.activate(&mut state, focused);
                    self.finish_activation(&mut state, activation);
                }
            }
            Key::Escape => {
                if let Some(menu) = state.document.find_by_class("mobile-menu") {
                    state.document.set_class(menu, "mobile-menu-open", false);
                }
            }
        }
        Ok(())
    }

    async fn evaluate(&self, _expression: &str) -> E2eResult<serde_json::Value> {
        Err(E2eError::unsupported(FIXTURE_DRIVER, "evaluate"))
    }

    async fn performance(&self) -> E2eResult<PerformanceSnapshot> {
        let state = self.state.lock().await;
        state.ensure_open()?;
        if state.loads_assets {
            Ok(self.site.performance(url_origin(&state.url)))
        } else {
            Ok(PerformanceSnapshot::default())
        }
    }

    async fn route(&self, route: Route) -> E2eResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        state.routes.add(route);
        Ok(())
    }

    async fn unroute_all(&self) -> E2eResult<()> {
        let mut state = self.state.lock().await;
        state.routes.clear();
        Ok(())
    }

    async fn network_log(&self) -> E2eResult<Vec<NetworkEntry>> {
        let state = self.state.lock().await;
        Ok(state.network.clone())
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> E2eResult<()> {
        if state != LoadState::NetworkIdle {
            return self.state.lock().await.ensure_open();
        }
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut page = self.state.lock().await;
                page.ensure_open()?;
                page.tasks.retain(|t| !t.is_finished());
                if page.tasks.is_empty() {
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(E2eError::timeout(
                    timeout.as_millis() as u64,
                    "network to become idle",
                ));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn close(&self) -> E2eResult<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        state.cancel_tasks();
        state.routes.clear();
        self.open_pages.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!(page = %self.id, "fixture page closed");
        Ok(())
    }
}
