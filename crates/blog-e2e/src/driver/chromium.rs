//! Chromium driver over the Chrome DevTools Protocol.
//!
//! Each page lives in its own browser context. Locators are resolved by an
//! injected script that receives the compiled selector AST, so matching
//! follows the same rules as the fixture driver. Routes use the `Fetch`
//! domain and the network log is fed by `Network` events.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, FailRequestParams, FulfillRequestParams,
    HeaderEntry, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::network::{
    self as cdp_network, ErrorReason, EventLoadingFailed, EventRequestWillBeSent,
    EventResponseReceived, RequestId,
};
use chromiumoxide::cdp::browser_protocol::page::{
    GetNavigationHistoryParams, NavigateToHistoryEntryParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{Browser, ElementState, Key, LoadState, NavigationResponse, PageDriver, Viewport};
use crate::config::RunConfig;
use crate::locator::LocatorChain;
use crate::network::{
    AbortReason, MockResponse, NetworkEntry, ResourceType, Route, RouteResponse, RouteTable,
};
use crate::performance::{PerformanceSnapshot, PERFORMANCE_PROBE_JS};
use crate::result::{E2eError, E2eResult};

/// Driver name reported in diagnostics and run reports
pub const CHROMIUM_DRIVER: &str = "chromium";

const RESOLVER_JS: &str = include_str!("resolver.js");
const TARGET_ATTR: &str = "data-e2e-target";
const NETWORK_IDLE_QUIET: Duration = Duration::from_millis(500);
const LOAD_POLL: Duration = Duration::from_millis(50);

fn cdp_err(e: impl std::fmt::Display) -> E2eError {
    E2eError::page(e.to_string())
}

// ============================================================================
// Browser
// ============================================================================

/// Chromium launched through chromiumoxide
#[derive(Debug)]
pub struct ChromiumBrowser {
    inner: Arc<Mutex<CdpBrowser>>,
    handle: JoinHandle<()>,
}

impl ChromiumBrowser {
    /// Launch Chromium using the run's headless flag and executable path
    pub async fn launch(config: &RunConfig) -> E2eResult<Self> {
        let mut builder = CdpConfig::builder().no_sandbox().window_size(1280, 720);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(|message| {
            if message.contains("executable") {
                E2eError::BrowserNotFound
            } else {
                E2eError::BrowserLaunch { message }
            }
        })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| E2eError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::debug!(error = %err, "cdp handler stopped");
                    break;
                }
            }
        });
        tracing::info!(headless = config.headless, "chromium launched");

        Ok(Self {
            inner: Arc::new(Mutex::new(browser)),
            handle,
        })
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn new_page(&self, viewport: Viewport) -> E2eResult<Arc<dyn PageDriver>> {
        let (context, cdp_page) = {
            let browser = self.inner.lock().await;
            let context = browser
                .execute(CreateBrowserContextParams::default())
                .await
                .map_err(cdp_err)?
                .result
                .browser_context_id;
            let target = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(context.clone())
                .build()
                .map_err(E2eError::page)?;
            let page = browser.new_page(target).await.map_err(cdp_err)?;
            (context, page)
        };
        let page = ChromiumPage::attach(cdp_page, context, Arc::clone(&self.inner), viewport).await?;
        Ok(Arc::new(page))
    }

    async fn close(&self) -> E2eResult<()> {
        let mut browser = self.inner.lock().await;
        let closed = browser.close().await.map(|_| ()).map_err(|e| E2eError::BrowserLaunch {
            message: e.to_string(),
        });
        self.handle.abort();
        tracing::info!("chromium closed");
        closed
    }
}

// ============================================================================
// Page
// ============================================================================

/// Shared state the event listeners write into
///
/// A redirect re-emits `requestWillBeSent` under the same request id, so
/// in-flight requests are a set keyed by id rather than a counter.
#[derive(Debug, Default)]
struct Recorder {
    requests: Mutex<HashMap<RequestId, (String, String)>>,
    entries: Mutex<Vec<NetworkEntry>>,
    pending: Mutex<HashSet<RequestId>>,
}

impl Recorder {
    async fn sent(&self, id: &RequestId, url: &str, method: &str) {
        self.pending.lock().await.insert(id.clone());
        self.requests
            .lock()
            .await
            .insert(id.clone(), (url.to_string(), method.to_string()));
    }

    async fn settled(&self, id: &RequestId) {
        self.pending.lock().await.remove(id);
    }

    async fn in_flight(&self) -> usize {
        self.pending.lock().await.len()
    }
}

/// One Chromium tab in a dedicated browser context
#[derive(Debug)]
pub struct ChromiumPage {
    id: Uuid,
    page: CdpPage,
    context: BrowserContextId,
    browser: Arc<Mutex<CdpBrowser>>,
    routes: Arc<Mutex<RouteTable>>,
    recorder: Arc<Recorder>,
    intercepting: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ChromiumPage {
    async fn attach(
        page: CdpPage,
        context: BrowserContextId,
        browser: Arc<Mutex<CdpBrowser>>,
        viewport: Viewport,
    ) -> E2eResult<Self> {
        let this = Self {
            id: Uuid::new_v4(),
            page,
            context,
            browser,
            routes: Arc::new(Mutex::new(RouteTable::new())),
            recorder: Arc::new(Recorder::default()),
            intercepting: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        };
        this.apply_viewport(viewport).await?;
        this.page
            .execute(cdp_network::EnableParams::default())
            .await
            .map_err(cdp_err)?;
        this.spawn_network_listeners().await?;
        tracing::debug!(page = %this.id, %viewport, "chromium page opened");
        Ok(this)
    }

    async fn apply_viewport(&self, viewport: Viewport) -> E2eResult<()> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(viewport.width))
            .height(i64::from(viewport.height))
            .device_scale_factor(1.0)
            .mobile(viewport.is_mobile())
            .build()
            .map_err(E2eError::page)?;
        self.page.execute(params).await.map_err(cdp_err)?;
        Ok(())
    }

    async fn spawn_network_listeners(&self) -> E2eResult<()> {
        let mut sent = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(cdp_err)?;
        let mut received = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(cdp_err)?;
        let mut failed = self
            .page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(cdp_err)?;

        let recorder = Arc::clone(&self.recorder);
        let on_sent = tokio::spawn(async move {
            while let Some(event) = sent.next().await {
                recorder
                    .sent(&event.request_id, &event.request.url, &event.request.method)
                    .await;
            }
        });

        let recorder = Arc::clone(&self.recorder);
        let on_received = tokio::spawn(async move {
            while let Some(event) = received.next().await {
                let method = recorder
                    .requests
                    .lock()
                    .await
                    .get(&event.request_id)
                    .map_or_else(|| "GET".to_string(), |(_, m)| m.clone());
                let url = event.response.url.clone();
                let entry = NetworkEntry {
                    resource_type: resource_type(&event.r#type, &url),
                    url,
                    method,
                    status: u16::try_from(event.response.status).ok(),
                    headers: header_map(&event.response.headers),
                    encoded_size: event.response.encoded_data_length.max(0.0) as u64,
                    duration_ms: event
                        .response
                        .timing
                        .as_ref()
                        .map_or(0.0, |t| t.receive_headers_end),
                    failure: None,
                };
                recorder.entries.lock().await.push(entry);
                recorder.settled(&event.request_id).await;
            }
        });

        let recorder = Arc::clone(&self.recorder);
        let on_failed = tokio::spawn(async move {
            while let Some(event) = failed.next().await {
                let (url, method) = recorder
                    .requests
                    .lock()
                    .await
                    .get(&event.request_id)
                    .cloned()
                    .unwrap_or_default();
                recorder.entries.lock().await.push(NetworkEntry {
                    resource_type: resource_type(&event.r#type, &url),
                    url,
                    method,
                    status: None,
                    headers: BTreeMap::new(),
                    encoded_size: 0,
                    duration_ms: 0.0,
                    failure: Some(event.error_text.clone()),
                });
                recorder.settled(&event.request_id).await;
            }
        });

        self.tasks
            .lock()
            .await
            .extend([on_sent, on_received, on_failed]);
        Ok(())
    }

    /// Enable the `Fetch` domain the first time a route is registered
    async fn ensure_interception(&self) -> E2eResult<()> {
        if self.intercepting.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(cdp_err)?;
        let enable = fetch::EnableParams::builder()
            .pattern(
                RequestPattern::builder()
                    .url_pattern("*")
                    .request_stage(RequestStage::Request)
                    .build(),
            )
            .build();
        self.page.execute(enable).await.map_err(cdp_err)?;

        let page = self.page.clone();
        let routes = Arc::clone(&self.routes);
        let task = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let decision = routes
                    .lock()
                    .await
                    .find(&event.request.url)
                    .map(|route| route.response.clone());
                // A delayed mock only delays its own request.
                tokio::spawn(answer_paused(page.clone(), event, decision));
            }
        });
        self.tasks.lock().await.push(task);
        Ok(())
    }

    async fn eval_json<T: DeserializeOwned>(&self, expression: String) -> E2eResult<T> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|message| E2eError::Script { message })?;
        let text: String = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| E2eError::Script {
                message: e.to_string(),
            })?
            .into_value()
            .map_err(|e| E2eError::Script {
                message: e.to_string(),
            })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Run the injected resolver for `chain`
    async fn resolver<T: DeserializeOwned>(
        &self,
        chain: &LocatorChain,
        op: &str,
        arg: serde_json::Value,
    ) -> E2eResult<T> {
        let steps = serde_json::to_string(&chain.compile()?)?;
        let op = serde_json::to_string(op)?;
        let arg = serde_json::to_string(&arg)?;
        self.eval_json(format!("JSON.stringify(({RESOLVER_JS})({steps}, {op}, {arg}))"))
            .await
    }

    async fn navigation_response(&self) -> E2eResult<NavigationResponse> {
        let url = self.page.url().await.map_err(cdp_err)?.unwrap_or_default();
        let status: u16 = self
            .eval_json(
                "JSON.stringify((performance.getEntriesByType('navigation')[0] || {}).responseStatus || 200)"
                    .to_string(),
            )
            .await?;
        let headers = self
            .recorder
            .entries
            .lock()
            .await
            .iter()
            .rev()
            .find(|e| e.resource_type == ResourceType::Document && e.url == url)
            .map(|e| e.headers.clone())
            .unwrap_or_default();
        Ok(NavigationResponse {
            url,
            status,
            headers,
        })
    }

    async fn history_step(&self, delta: i64) -> E2eResult<Option<NavigationResponse>> {
        let history = self
            .page
            .execute(GetNavigationHistoryParams::default())
            .await
            .map_err(cdp_err)?;
        let target = history.result.current_index + delta;
        let Some(entry) = usize::try_from(target)
            .ok()
            .and_then(|i| history.result.entries.get(i))
        else {
            return Ok(None);
        };
        self.page
            .execute(NavigateToHistoryEntryParams::new(entry.id))
            .await
            .map_err(cdp_err)?;
        self.page.wait_for_navigation().await.map_err(cdp_err)?;
        Ok(Some(self.navigation_response().await?))
    }

    async fn dispatch_key(&self, kind: DispatchKeyEventType, key: Key) -> E2eResult<()> {
        let (code, vk, text) = match key {
            Key::Tab | Key::ShiftTab => ("Tab", 9, None),
            Key::Enter => ("Enter", 13, Some("\r")),
            Key::Space => ("Space", 32, Some(" ")),
            Key::Escape => ("Escape", 27, None),
        };
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind.clone())
            .key(key.dom_key())
            .code(code)
            .windows_virtual_key_code(vk)
            .native_virtual_key_code(vk);
        if key == Key::ShiftTab {
            builder = builder.modifiers(8);
        }
        if let (DispatchKeyEventType::KeyDown, Some(text)) = (kind, text) {
            builder = builder.text(text);
        }
        let params = builder.build().map_err(E2eError::page)?;
        self.page.execute(params).await.map_err(cdp_err)?;
        Ok(())
    }
}

fn resource_type(kind: &cdp_network::ResourceType, url: &str) -> ResourceType {
    match kind {
        cdp_network::ResourceType::Document => ResourceType::Document,
        cdp_network::ResourceType::Stylesheet => ResourceType::Stylesheet,
        cdp_network::ResourceType::Script => ResourceType::Script,
        cdp_network::ResourceType::Image => ResourceType::Image,
        cdp_network::ResourceType::Font => ResourceType::Font,
        cdp_network::ResourceType::Fetch | cdp_network::ResourceType::Xhr => {
            match ResourceType::from_url(url) {
                ResourceType::Wasm => ResourceType::Wasm,
                _ => ResourceType::Fetch,
            }
        }
        _ => ResourceType::from_url(url),
    }
}

fn header_map(headers: &cdp_network::Headers) -> BTreeMap<String, String> {
    let Ok(serde_json::Value::Object(map)) = serde_json::to_value(headers) else {
        return BTreeMap::new();
    };
    map.into_iter()
        .map(|(name, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (name.to_ascii_lowercase(), value)
        })
        .collect()
}

const fn error_reason(reason: AbortReason) -> ErrorReason {
    match reason {
        AbortReason::Failed => ErrorReason::Failed,
        AbortReason::Aborted => ErrorReason::Aborted,
        AbortReason::TimedOut => ErrorReason::TimedOut,
        AbortReason::ConnectionRefused => ErrorReason::ConnectionRefused,
        AbortReason::ConnectionReset => ErrorReason::ConnectionReset,
        AbortReason::InternetDisconnected => ErrorReason::InternetDisconnected,
        AbortReason::NameNotResolved => ErrorReason::NameNotResolved,
    }
}

/// `Fetch.fulfillRequest` for a mocked response
fn fulfil_params(
    request_id: fetch::RequestId,
    response: &MockResponse,
) -> Result<FulfillRequestParams, String> {
    let mut headers: Vec<HeaderEntry> = response
        .headers
        .iter()
        .map(|(name, value)| HeaderEntry::new(name.clone(), value.clone()))
        .collect();
    headers.push(HeaderEntry::new("content-type", response.content_type.clone()));
    FulfillRequestParams::builder()
        .request_id(request_id)
        .response_code(i64::from(response.status))
        .response_headers(headers)
        .body(base64::engine::general_purpose::STANDARD.encode(&response.body))
        .build()
}

/// Resolve one paused request; every path releases it
async fn answer_paused(
    page: CdpPage,
    event: Arc<EventRequestPaused>,
    decision: Option<RouteResponse>,
) {
    let id = event.request_id.clone();
    let outcome = match decision {
        Some(RouteResponse::Fulfill(response)) => {
            if let Some(delay) = response.delay {
                tokio::time::sleep(delay).await;
            }
            match fulfil_params(id.clone(), &response) {
                Ok(params) => page.execute(params).await.map(|_| ()),
                Err(message) => {
                    tracing::warn!(url = %event.request.url, %message, "mock not deliverable, failing request");
                    page.execute(FailRequestParams::new(id, ErrorReason::Failed))
                        .await
                        .map(|_| ())
                }
            }
        }
        Some(RouteResponse::Abort(reason)) => page
            .execute(FailRequestParams::new(id, error_reason(reason)))
            .await
            .map(|_| ()),
        None => page
            .execute(ContinueRequestParams::new(id))
            .await
            .map(|_| ()),
    };
    if let Err(err) = outcome {
        tracing::debug!(url = %event.request.url, error = %err, "intercepted request not resolved");
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    fn name(&self) -> &'static str {
        CHROMIUM_DRIVER
    }

    async fn goto(&self, url: &str) -> E2eResult<NavigationResponse> {
        self.page.goto(url).await.map_err(|e| {
            let message = e.to_string();
            if message.contains("net::ERR_") {
                E2eError::Network {
                    url: url.to_string(),
                    reason: message,
                }
            } else {
                E2eError::Navigation {
                    url: url.to_string(),
                    message,
                }
            }
        })?;
        self.navigation_response().await
    }

    async fn reload(&self) -> E2eResult<NavigationResponse> {
        self.page.reload().await.map_err(cdp_err)?;
        self.navigation_response().await
    }

    async fn go_back(&self) -> E2eResult<Option<NavigationResponse>> {
        self.history_step(-1).await
    }

    async fn go_forward(&self) -> E2eResult<Option<NavigationResponse>> {
        self.history_step(1).await
    }

    async fn url(&self) -> E2eResult<String> {
        Ok(self.page.url().await.map_err(cdp_err)?.unwrap_or_default())
    }

    async fn title(&self) -> E2eResult<String> {
        Ok(self.page.get_title().await.map_err(cdp_err)?.unwrap_or_default())
    }

    async fn set_viewport(&self, viewport: Viewport) -> E2eResult<()> {
        self.apply_viewport(viewport).await
    }

    async fn count(&self, chain: &LocatorChain) -> E2eResult<usize> {
        self.resolver(chain, "count", serde_json::Value::Null).await
    }

    async fn inspect(&self, chain: &LocatorChain) -> E2eResult<Option<ElementState>> {
        self.resolver(chain, "inspect", serde_json::Value::Null).await
    }

    async fn inspect_all(&self, chain: &LocatorChain) -> E2eResult<Vec<ElementState>> {
        self.resolver(chain, "inspect_all", serde_json::Value::Null)
            .await
    }

    async fn click(&self, chain: &LocatorChain) -> E2eResult<()> {
        let tag = Uuid::new_v4().to_string();
        let found: bool = self
            .resolver(chain, "tag", serde_json::Value::String(tag.clone()))
            .await?;
        if !found {
            return Err(E2eError::action(
                "click",
                chain.describe(),
                "no element matches the locator",
            ));
        }
        let element = self
            .page
            .find_element(format!("[{TARGET_ATTR}=\"{tag}\"]"))
            .await
            .map_err(|e| E2eError::action("click", chain.describe(), e.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| E2eError::action("click", chain.describe(), e.to_string()))?;
        Ok(())
    }

    async fn fill(&self, chain: &LocatorChain, value: &str) -> E2eResult<()> {
        let problem: Option<String> = self
            .resolver(chain, "fill", serde_json::Value::String(value.to_string()))
            .await?;
        match problem {
            Some(message) => Err(E2eError::action("fill", chain.describe(), message)),
            None => Ok(()),
        }
    }

    async fn focus(&self, chain: &LocatorChain) -> E2eResult<()> {
        let found: bool = self.resolver(chain, "focus", serde_json::Value::Null).await?;
        if found {
            Ok(())
        } else {
            Err(E2eError::action(
                "focus",
                chain.describe(),
                "no element matches the locator",
            ))
        }
    }

    async fn press_key(&self, key: Key) -> E2eResult<()> {
        self.dispatch_key(DispatchKeyEventType::KeyDown, key).await?;
        self.dispatch_key(DispatchKeyEventType::KeyUp, key).await
    }

    async fn evaluate(&self, expression: &str) -> E2eResult<serde_json::Value> {
        self.eval_json(format!(
            "Promise.resolve({expression}).then((v) => JSON.stringify(v === undefined ? null : v))"
        ))
        .await
    }

    async fn performance(&self) -> E2eResult<PerformanceSnapshot> {
        self.eval_json(format!(
            "({PERFORMANCE_PROBE_JS}).then((s) => JSON.stringify(s))"
        ))
        .await
    }

    async fn route(&self, route: Route) -> E2eResult<()> {
        self.routes.lock().await.add(route);
        self.ensure_interception().await
    }

    async fn unroute_all(&self) -> E2eResult<()> {
        self.routes.lock().await.clear();
        Ok(())
    }

    async fn network_log(&self) -> E2eResult<Vec<NetworkEntry>> {
        Ok(self.recorder.entries.lock().await.clone())
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> E2eResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut quiet_since: Option<tokio::time::Instant> = None;
        loop {
            let reached = match state {
                LoadState::Load => {
                    self.eval_json::<bool>(
                        "JSON.stringify(document.readyState === 'complete')".to_string(),
                    )
                    .await?
                }
                LoadState::DomContentLoaded => {
                    self.eval_json::<bool>(
                        "JSON.stringify(document.readyState !== 'loading')".to_string(),
                    )
                    .await?
                }
                LoadState::NetworkIdle => {
                    let now = tokio::time::Instant::now();
                    if self.recorder.in_flight().await == 0 {
                        let since = *quiet_since.get_or_insert(now);
                        now.duration_since(since) >= NETWORK_IDLE_QUIET
                    } else {
                        quiet_since = None;
                        false
                    }
                }
            };
            if reached {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(E2eError::timeout(
                    timeout.as_millis() as u64,
                    format!("load state {state:?}"),
                ));
            }
            tokio::time::sleep(LOAD_POLL).await;
        }
    }

    async fn close(&self) -> E2eResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        self.routes.lock().await.clear();
        self.page.clone().close().await.map_err(cdp_err)?;
        self.browser
            .lock()
            .await
            .execute(DisposeBrowserContextParams::new(self.context.clone()))
            .await
            .map_err(cdp_err)?;
        tracing::debug!(page = %self.id, "chromium page closed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod recorder_tests {
        use super::*;

        #[tokio::test]
        async fn test_redirect_hop_counts_once() {
            let recorder = Recorder::default();
            let id = RequestId::new("1000.7");
            recorder.sent(&id, "http://localhost:3000/old", "GET").await;
            recorder.sent(&id, "http://localhost:3000/new", "GET").await;
            assert_eq!(recorder.in_flight().await, 1);

            recorder.settled(&id).await;
            assert_eq!(recorder.in_flight().await, 0);
            let requests = recorder.requests.lock().await;
            assert_eq!(requests[&id].0, "http://localhost:3000/new");
        }

        #[tokio::test]
        async fn test_unknown_completion_is_ignored() {
            let recorder = Recorder::default();
            recorder.sent(&RequestId::new("1"), "http://localhost:3000/", "GET").await;
            recorder.settled(&RequestId::new("2")).await;
            assert_eq!(recorder.in_flight().await, 1);
        }
    }

    mod fulfil_tests {
        use super::*;

        #[test]
        fn test_mock_becomes_fulfil_params() {
            let response = MockResponse::json(429, &serde_json::json!({"message": "slow down"}))
                .with_header("Retry-After", "5");
            let params = fulfil_params(fetch::RequestId::new("interception-1"), &response).unwrap();
            assert_eq!(params.response_code, 429);
            let headers = params.response_headers.unwrap();
            assert!(headers
                .iter()
                .any(|h| h.name == "content-type" && h.value == "application/json"));
            assert!(headers.iter().any(|h| h.name == "retry-after" && h.value == "5"));
        }

        #[test]
        fn test_abort_reasons_map_to_cdp() {
            assert_eq!(
                error_reason(AbortReason::InternetDisconnected),
                ErrorReason::InternetDisconnected
            );
            assert_eq!(error_reason(AbortReason::Failed), ErrorReason::Failed);
        }
    }
}
