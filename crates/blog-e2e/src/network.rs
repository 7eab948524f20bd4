//! Network routes, mock responses and the per-page network log.
//!
//! A route is page-scoped: it is registered on one page, consulted for every
//! request that page makes, and discarded with the page. When several routes
//! match a URL the most recently registered one wins.

use std::collections::BTreeMap;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// URL helpers
// ============================================================================

/// `scheme://host[:port]` part of an absolute URL
#[must_use]
pub fn url_origin(url: &str) -> &str {
    let Some(scheme_end) = url.find("://") else {
        return "";
    };
    let rest = &url[scheme_end + 3..];
    let host_len = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    &url[..scheme_end + 3 + host_len]
}

/// Path component of a URL (no query or fragment); `/` when empty
#[must_use]
pub fn url_path(url: &str) -> &str {
    let after_origin = if url.contains("://") {
        &url[url_origin(url).len()..]
    } else {
        url
    };
    let end = after_origin.find(['?', '#']).unwrap_or(after_origin.len());
    let path = &after_origin[..end];
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// Resolve a navigation target against the base URL.
///
/// Absolute URLs (with a scheme) pass through, `/path` replaces the base
/// path, anything else is appended to the base.
#[must_use]
pub fn resolve_url(base: &str, target: &str) -> String {
    if target.contains("://") || target.starts_with("mailto:") || target.starts_with("about:") {
        return target.to_string();
    }
    if target.starts_with('/') {
        let origin = url_origin(base);
        let origin = if origin.is_empty() {
            base.trim_end_matches('/')
        } else {
            origin
        };
        return format!("{origin}{target}");
    }
    format!("{}/{}", base.trim_end_matches('/'), target)
}

// ============================================================================
// Patterns and responses
// ============================================================================

/// URL pattern for route matching
#[derive(Debug, Clone)]
pub enum UrlPattern {
    /// Exact full URL
    Exact(String),
    /// Path of the URL equals this value, query ignored
    Path(String),
    /// Glob over the full URL; `*` matches any run of characters
    Glob(String),
    /// Regular expression over the full URL
    Regex(Regex),
}

impl UrlPattern {
    /// Create a regex pattern
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Regex)
    }

    /// Check if a URL matches
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(expected) => url == expected,
            Self::Path(path) => url_path(url) == path,
            Self::Glob(pattern) => glob_matches(pattern, url),
            Self::Regex(re) => re.is_match(url),
        }
    }

    /// Human-readable form for logs
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Exact(s) | Self::Path(s) | Self::Glob(s) => s.clone(),
            Self::Regex(re) => format!("/{}/", re.as_str()),
        }
    }
}

impl From<&str> for UrlPattern {
    /// `*` anywhere makes a glob, a leading `/` a path, otherwise exact.
    fn from(value: &str) -> Self {
        if value.contains('*') {
            Self::Glob(value.to_string())
        } else if value.starts_with('/') {
            Self::Path(value.to_string())
        } else {
            Self::Exact(value.to_string())
        }
    }
}

fn glob_matches(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return text.is_empty(),
    };
    if !text.starts_with(first) {
        return false;
    }
    if rest.is_empty() {
        return text == *first;
    }
    let mut pos = first.len();
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return true,
    };
    for part in middle {
        match text[pos..].find(part) {
            Some(found) => pos += found + part.len(),
            None => return false,
        }
    }
    text.len() >= pos + last.len() && text.ends_with(last)
}

/// Reason passed when aborting a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbortReason {
    /// Request failed
    Failed,
    /// Request was aborted
    Aborted,
    /// Request timed out
    TimedOut,
    /// Connection was refused
    ConnectionRefused,
    /// Connection was reset
    ConnectionReset,
    /// Internet is disconnected
    InternetDisconnected,
    /// DNS name could not be resolved
    NameNotResolved,
}

impl AbortReason {
    /// Browser-style error text for this reason
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Failed => "net::ERR_FAILED",
            Self::Aborted => "net::ERR_ABORTED",
            Self::TimedOut => "net::ERR_TIMED_OUT",
            Self::ConnectionRefused => "net::ERR_CONNECTION_REFUSED",
            Self::ConnectionReset => "net::ERR_CONNECTION_RESET",
            Self::InternetDisconnected => "net::ERR_INTERNET_DISCONNECTED",
            Self::NameNotResolved => "net::ERR_NAME_NOT_RESOLVED",
        }
    }
}

/// A mocked HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Content type
    pub content_type: String,
    /// Extra response headers
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
    /// Artificial delay before the response is delivered
    pub delay: Option<Duration>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: "text/plain".to_string(),
            headers: BTreeMap::new(),
            body: Vec::new(),
            delay: None,
        }
    }
}

impl MockResponse {
    /// Create a 200 response with an empty body
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON response
    #[must_use]
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: value.to_string().into_bytes(),
            ..Self::default()
        }
    }

    /// Create a text response
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into().into_bytes(),
            ..Self::default()
        }
    }

    /// Set the status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Delay delivery of the response
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Whether the status is in the 2xx range
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body parsed as JSON, if it is JSON
    #[must_use]
    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// What a matching route does with the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResponse {
    /// Fulfil with a mock response
    Fulfill(MockResponse),
    /// Fail the request
    Abort(AbortReason),
}

/// A page-scoped network mock
#[derive(Debug, Clone)]
pub struct Route {
    /// URL pattern
    pub pattern: UrlPattern,
    /// Response for matching requests
    pub response: RouteResponse,
}

impl Route {
    /// Fulfil matching requests with `response`
    #[must_use]
    pub fn fulfill(pattern: impl Into<UrlPattern>, response: MockResponse) -> Self {
        Self {
            pattern: pattern.into(),
            response: RouteResponse::Fulfill(response),
        }
    }

    /// Abort matching requests with `reason`
    #[must_use]
    pub fn abort(pattern: impl Into<UrlPattern>, reason: AbortReason) -> Self {
        Self {
            pattern: pattern.into(),
            response: RouteResponse::Abort(reason),
        }
    }
}

/// Routes registered on one page
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route
    pub fn add(&mut self, route: Route) {
        tracing::debug!(pattern = %route.pattern.describe(), "route registered");
        self.routes.push(route);
    }

    /// Most recently registered route matching `url`
    #[must_use]
    pub fn find(&self, url: &str) -> Option<&Route> {
        self.routes.iter().rev().find(|r| r.pattern.matches(url))
    }

    /// Remove all routes
    pub fn clear(&mut self) {
        self.routes.clear();
    }

    /// Number of routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

// ============================================================================
// Network log
// ============================================================================

/// Resource classification for logged requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// HTML document
    Document,
    /// CSS
    Stylesheet,
    /// JavaScript
    Script,
    /// WebAssembly module
    Wasm,
    /// Image
    Image,
    /// Font
    Font,
    /// fetch/XHR
    Fetch,
    /// Anything else
    Other,
}

impl ResourceType {
    /// Guess a type from a URL extension
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let path = url_path(url);
        let ext = path.rsplit_once('.').map_or("", |(_, ext)| ext);
        match ext {
            "css" => Self::Stylesheet,
            "js" | "mjs" => Self::Script,
            "wasm" => Self::Wasm,
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "ico" | "webp" => Self::Image,
            "woff" | "woff2" | "ttf" | "otf" => Self::Font,
            "" | "html" => Self::Document,
            _ => Self::Other,
        }
    }
}

/// One completed (or failed) request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEntry {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Resource type
    pub resource_type: ResourceType,
    /// Response status, `None` when the request failed
    pub status: Option<u16>,
    /// Response headers, lowercase names
    pub headers: BTreeMap<String, String>,
    /// Transferred size in bytes
    pub encoded_size: u64,
    /// Request start to response end
    pub duration_ms: f64,
    /// Failure text when the request did not complete
    pub failure: Option<String>,
}

impl NetworkEntry {
    /// Header value by (case-insensitive) name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Size from `content-length`, falling back to the transferred size
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.encoded_size)
    }

    /// Whether the response is compressed with gzip or brotli
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        matches!(self.header("content-encoding"), Some("gzip" | "br"))
    }

    /// Whether the response carries any caching header
    #[must_use]
    pub fn has_cache_headers(&self) -> bool {
        ["cache-control", "expires", "etag"]
            .iter()
            .any(|h| self.header(h).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod url_tests {
        use super::*;

        #[test]
        fn test_origin_and_path() {
            assert_eq!(url_origin("http://localhost:3000/posts/1?x=1"), "http://localhost:3000");
            assert_eq!(url_path("http://localhost:3000/posts/1?x=1"), "/posts/1");
            assert_eq!(url_path("http://localhost:3000"), "/");
            assert_eq!(url_path("/robots.txt#top"), "/robots.txt");
        }

        #[test]
        fn test_resolve_url() {
            let base = "http://localhost:3000";
            assert_eq!(resolve_url(base, "/"), "http://localhost:3000/");
            assert_eq!(resolve_url(base, "/posts/2"), "http://localhost:3000/posts/2");
            assert_eq!(
                resolve_url("http://localhost:3000/blog/", "/posts/2"),
                "http://localhost:3000/posts/2"
            );
            assert_eq!(
                resolve_url("http://localhost:3000/blog/", "posts/2"),
                "http://localhost:3000/blog/posts/2"
            );
            assert_eq!(
                resolve_url(base, "https://github.com/hnlearndev"),
                "https://github.com/hnlearndev"
            );
        }
    }

    mod pattern_tests {
        use super::*;

        #[test]
        fn test_path_pattern_ignores_origin_and_query() {
            let pattern = UrlPattern::from("/api/subscribe");
            assert!(pattern.matches("http://localhost:3000/api/subscribe"));
            assert!(pattern.matches("http://localhost:3000/api/subscribe?x=1"));
            assert!(!pattern.matches("http://localhost:3000/api/subscribe/extra"));
        }

        #[test]
        fn test_glob_pattern() {
            let pattern = UrlPattern::from("**/*.wasm");
            assert!(pattern.matches("http://localhost:3000/pkg/blog.wasm"));
            assert!(!pattern.matches("http://localhost:3000/pkg/blog.wasm.map"));
            assert!(UrlPattern::from("http://*/api/*").matches("http://a/api/subscribe"));
            assert!(!UrlPattern::from("http://*/api/*").matches("https://a/api/subscribe"));
        }

        #[test]
        fn test_regex_pattern() {
            let pattern = UrlPattern::regex(r"/posts/\d+$").unwrap();
            assert!(pattern.matches("http://localhost:3000/posts/12"));
            assert!(!pattern.matches("http://localhost:3000/posts/new"));
        }
    }

    mod route_table_tests {
        use super::*;

        #[test]
        fn test_latest_matching_route_wins() {
            let mut table = RouteTable::new();
            table.add(Route::fulfill("/api/subscribe", MockResponse::text(200, "first")));
            table.add(Route::abort("**/api/*", AbortReason::InternetDisconnected));
            let found = table.find("http://localhost:3000/api/subscribe").unwrap();
            assert_eq!(
                found.response,
                RouteResponse::Abort(AbortReason::InternetDisconnected)
            );
            assert!(table.find("http://localhost:3000/").is_none());
            table.clear();
            assert!(table.is_empty());
        }
    }

    mod response_tests {
        use super::*;

        #[test]
        fn test_json_response() {
            let body = serde_json::json!({"status": "success", "message": "ok"});
            let response = MockResponse::json(200, &body).with_header("Cache-Control", "no-store");
            assert!(response.is_ok());
            assert_eq!(response.content_type, "application/json");
            assert_eq!(response.body_json().unwrap()["message"], "ok");
            assert_eq!(response.headers["cache-control"], "no-store");
            assert!(!MockResponse::text(500, "boom").is_ok());
        }

        #[test]
        fn test_abort_messages() {
            assert_eq!(
                AbortReason::InternetDisconnected.message(),
                "net::ERR_INTERNET_DISCONNECTED"
            );
        }
    }

    mod entry_tests {
        use super::*;

        #[test]
        fn test_entry_helpers() {
            let mut headers = BTreeMap::new();
            headers.insert("content-length".to_string(), "2048".to_string());
            headers.insert("content-encoding".to_string(), "br".to_string());
            let entry = NetworkEntry {
                url: "http://localhost:3000/pkg/blog.js".into(),
                method: "GET".into(),
                resource_type: ResourceType::from_url("http://localhost:3000/pkg/blog.js"),
                status: Some(200),
                headers,
                encoded_size: 10,
                duration_ms: 3.0,
                failure: None,
            };
            assert_eq!(entry.resource_type, ResourceType::Script);
            assert_eq!(entry.content_length(), 2048);
            assert!(entry.is_compressed());
            assert!(!entry.has_cache_headers());
            assert_eq!(entry.header("Content-Encoding"), Some("br"));
        }
    }
}
