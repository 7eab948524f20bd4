//! The blog as the fixture driver serves it.
//!
//! [`BlogSite::default`] reproduces the live site's DOM contract. The
//! builder methods derive broken variants so the catalog can be checked to
//! fail for the right reason.

use chrono::NaiveDate;

use crate::network::{url_path, ResourceType};
use crate::performance::{NavigationTiming, PerformanceSnapshot, ResourceTiming};

use super::dom::{el, Document, El};
use super::form::FormFault;

/// Homepage `<title>`
pub const HOME_TITLE: &str = "Willian Nguyen - Home";
/// Title of pages the router has no route for
pub const FALLBACK_TITLE: &str = "Welcome to Willian's tech blog";
/// Body text of the not-found page
pub const NOT_FOUND_TEXT: &str = "Page not found.";
/// `<meta name="description">`
pub const DESCRIPTION: &str = "Willian's personal website";
/// `<meta name="viewport">`
pub const VIEWPORT_META: &str = "width=device-width, initial-scale=1";
/// Date format of the post table
pub const DATE_FORMAT: &str = "%d-%b-%Y";

/// A social profile link shown in both navigations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialLink {
    /// Visible label and `title`
    pub label: String,
    /// Target URL
    pub href: String,
    /// Opens in a new tab
    pub new_tab: bool,
}

impl SocialLink {
    /// Create a link
    #[must_use]
    pub fn new(label: &str, href: &str, new_tab: bool) -> Self {
        Self {
            label: label.to_string(),
            href: href.to_string(),
            new_tab,
        }
    }
}

/// One blog post
#[derive(Debug, Clone)]
pub struct Post {
    /// Route id, `/posts/{id}`
    pub id: u32,
    /// Title, also the page title
    pub title: String,
    /// Publication date
    pub date: NaiveDate,
    /// Rendered markdown body
    pub content: Vec<El>,
}

impl Post {
    /// Create a post
    #[must_use]
    pub fn new(id: u32, title: &str, date: NaiveDate, content: Vec<El>) -> Self {
        Self {
            id,
            title: title.to_string(),
            date,
            content,
        }
    }

    /// Route path
    #[must_use]
    pub fn path(&self) -> String {
        format!("/posts/{}", self.id)
    }

    /// Date as shown in the post table
    #[must_use]
    pub fn display_date(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    fn structured_data(&self) -> String {
        serde_json::json!({
            "@context": "https://schema.org",
            "@type": "BlogPosting",
            "headline": self.title,
            "datePublished": self.date.to_string(),
            "author": { "@type": "Person", "name": "Willian Nguyen" },
        })
        .to_string()
    }
}

/// A static asset every HTML page loads
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    /// Absolute path
    pub path: String,
    /// `content-type`
    pub content_type: String,
    /// Encoded size in bytes
    pub size: u64,
    /// Served with `content-encoding: br`
    pub compressed: bool,
    /// Simulated response time
    pub duration_ms: f64,
}

impl Asset {
    /// Create an asset
    #[must_use]
    pub fn new(path: &str, content_type: &str, size: u64, compressed: bool, duration_ms: f64) -> Self {
        Self {
            path: path.to_string(),
            content_type: content_type.to_string(),
            size,
            compressed,
            duration_ms,
        }
    }

    /// Resource type derived from the path
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        ResourceType::from_url(&self.path)
    }
}

/// Result of rendering a path
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// HTTP status
    pub status: u16,
    /// `content-type`
    pub content_type: &'static str,
    /// Whether the page loads the site's assets
    pub loads_assets: bool,
    /// The document
    pub document: Document,
}

/// Description of the served blog
#[derive(Debug, Clone)]
pub struct BlogSite {
    /// Homepage title
    pub home_title: String,
    /// Homepage heading
    pub heading: String,
    /// Homepage introduction paragraphs
    pub intro: Vec<String>,
    /// Brand text next to the logo
    pub brand: String,
    /// Posts, in table order
    pub posts: Vec<Post>,
    /// Social links, in navigation order
    pub social: Vec<SocialLink>,
    /// Assets every HTML page loads
    pub assets: Vec<Asset>,
    /// Render the newsletter form in the footer
    pub subscribe_form: bool,
    /// Rendering defect of the newsletter form
    pub form_fault: Option<FormFault>,
    /// Classes whose elements are removed from every page
    pub removed_classes: Vec<String>,
    /// Web vitals reported for every page
    pub first_contentful_paint_ms: f64,
    /// Largest contentful paint
    pub largest_contentful_paint_ms: f64,
    /// Cumulative layout shift
    pub cumulative_layout_shift: f64,
}

impl Default for BlogSite {
    fn default() -> Self {
        Self {
            home_title: HOME_TITLE.to_string(),
            heading: "Hi there, I'm Willian 👋".to_string(),
            intro: vec![
                "I am a curious learner with a genuine love for new technologies.".to_string(),
                "Anything that I learn and find interesting, I will write about it on my blog."
                    .to_string(),
            ],
            brand: "Willian Nguyen".to_string(),
            posts: default_posts(),
            social: vec![
                SocialLink::new("GitHub", "https://github.com/hnlearndev", true),
                SocialLink::new("LinkedIn", "https://www.linkedin.com/in/hieunthello/", true),
                SocialLink::new("Email", "mailto:hieunt.hello@gmail.com", false),
            ],
            assets: vec![
                Asset::new("/pico.min.css", "text/css", 18_432, true, 24.0),
                Asset::new("/pkg/blog.js", "application/javascript", 41_984, true, 31.0),
                Asset::new("/pkg/blog_bg.wasm", "application/wasm", 389_120, true, 86.0),
                Asset::new("/favicon.ico", "image/x-icon", 4_286, false, 12.0),
            ],
            subscribe_form: true,
            form_fault: None,
            removed_classes: Vec::new(),
            first_contentful_paint_ms: 180.0,
            largest_contentful_paint_ms: 320.0,
            cumulative_layout_shift: 0.0,
        }
    }
}

impl BlogSite {
    /// The live site
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the homepage title
    #[must_use]
    pub fn with_home_title(mut self, title: &str) -> Self {
        self.home_title = title.to_string();
        self
    }

    /// Append a post
    #[must_use]
    pub fn with_post(mut self, post: Post) -> Self {
        self.posts.push(post);
        self
    }

    /// Add an asset
    #[must_use]
    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.assets.push(asset);
        self
    }

    /// Drop the newsletter form
    #[must_use]
    pub fn without_subscribe_form(mut self) -> Self {
        self.subscribe_form = false;
        self
    }

    /// Render the newsletter form with `fault`
    #[must_use]
    pub fn with_form_fault(mut self, fault: FormFault) -> Self {
        self.form_fault = Some(fault);
        self
    }

    /// Remove every element carrying `class`
    #[must_use]
    pub fn without_class(mut self, class: &str) -> Self {
        self.removed_classes.push(class.to_string());
        self
    }

    /// Override the largest contentful paint
    #[must_use]
    pub fn with_largest_contentful_paint(mut self, ms: f64) -> Self {
        self.largest_contentful_paint_ms = ms;
        self
    }

    /// Post by route id
    #[must_use]
    pub fn post(&self, id: u32) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// Render the document served at `url`
    #[must_use]
    pub fn render(&self, url: &str) -> RenderedPage {
        let path = url_path(url);
        if path == "/robots.txt" {
            return RenderedPage {
                status: 200,
                content_type: "text/plain",
                loads_assets: false,
                document: Document::from_tree(
                    el("html").child(el("head")).child(
                        el("body").child(el("pre").text("User-agent: *\nAllow: /\n")),
                    ),
                ),
            };
        }

        let (status, title, head_extra, main) = match path {
            "/" => (200, self.home_title.clone(), Vec::new(), self.home_main()),
            _ => match path
                .strip_prefix("/posts/")
                .and_then(|id| id.parse::<u32>().ok())
                .and_then(|id| self.post(id))
            {
                Some(post) => (
                    200,
                    post.title.clone(),
                    vec![el("script")
                        .attr("type", "application/ld+json")
                        .text(post.structured_data())],
                    post_main(post),
                ),
                None => (
                    404,
                    FALLBACK_TITLE.to_string(),
                    Vec::new(),
                    el("main").class("container").text(NOT_FOUND_TEXT),
                ),
            },
        };

        let mut body = el("body")
            .child(el("header").class("container").child(self.nav()))
            .child(main);
        if self.subscribe_form {
            body = body.child(footer());
        }
        let tree = el("html")
            .attr("lang", "en")
            .child(self.head(&title, head_extra))
            .child(body);

        let mut document = Document::from_tree(tree);
        for class in &self.removed_classes {
            while let Some(node) = document.find_by_class(class) {
                document.detach(node);
            }
        }
        RenderedPage {
            status,
            content_type: "text/html; charset=utf-8",
            loads_assets: true,
            document,
        }
    }

    /// Vitals and resource timings for a page that loaded the assets
    #[must_use]
    pub fn performance(&self, origin: &str) -> PerformanceSnapshot {
        PerformanceSnapshot {
            navigation: Some(NavigationTiming {
                response_end_ms: 42.0,
                dom_content_loaded_ms: 128.0,
                load_ms: 214.0,
            }),
            first_contentful_paint_ms: Some(self.first_contentful_paint_ms),
            largest_contentful_paint_ms: Some(self.largest_contentful_paint_ms),
            cumulative_layout_shift: self.cumulative_layout_shift,
            resources: self
                .assets
                .iter()
                .map(|asset| ResourceTiming {
                    name: format!("{origin}{}", asset.path),
                    initiator_type: match asset.resource_type() {
                        ResourceType::Stylesheet => "link",
                        ResourceType::Image => "img",
                        ResourceType::Wasm => "fetch",
                        _ => "script",
                    }
                    .to_string(),
                    duration_ms: asset.duration_ms,
                    transfer_size: asset.size,
                })
                .collect(),
        }
    }

    fn head(&self, title: &str, extra: Vec<El>) -> El {
        el("head")
            .child(el("meta").attr("charset", "utf-8"))
            .child(el("meta").attr("name", "viewport").attr("content", VIEWPORT_META))
            .child(el("meta").attr("name", "description").attr("content", DESCRIPTION))
            .child(el("meta").attr("name", "color-scheme").attr("content", "light dark"))
            .child(el("meta").attr("property", "og:title").attr("content", title))
            .child(el("meta").attr("property", "og:type").attr("content", "website"))
            .child(el("link").attr("rel", "stylesheet").attr("href", "/pico.min.css"))
            .child(el("title").text(title))
            .children(extra)
    }

    fn nav(&self) -> El {
        let desktop_links = self.social.iter().map(|link| {
            social_anchor(link, "social-link").child(el("span").class("social-icon").attr("aria-hidden", "true"))
        });
        let mobile_links = self.social.iter().map(|link| {
            social_anchor(link, "mobile-social-link").child(el("span").text(link.label.clone()))
        });

        el("nav")
            .class("nav-enhanced")
            .child(
                el("div").class("nav-brand").child(
                    el("a")
                        .class("brand-link")
                        .attr("href", "/")
                        .child(
                            el("img")
                                .attr("src", "/favicon.ico")
                                .attr("alt", "Brand Logo")
                                .attr("width", "32")
                                .attr("height", "32"),
                        )
                        .child(el("strong").text(self.brand.clone())),
                ),
            )
            .child(
                el("div")
                    .class("nav-desktop")
                    .child(el("div").class("nav-social").children(desktop_links)),
            )
            .child(
                el("button")
                    .class("mobile-menu-button")
                    .attr("aria-label", "Toggle mobile menu")
                    .child(el("span").class("menu-icon").text("☰")),
            )
            .child(
                el("div").class("mobile-menu").child(
                    el("div")
                        .class("mobile-menu-content")
                        .child(el("div").class("mobile-nav-social").children(mobile_links)),
                ),
            )
    }

    fn home_main(&self) -> El {
        let rows = self.posts.iter().map(|post| {
            el("tr")
                .child(
                    el("th").attr("scope", "row").child(
                        el("a")
                            .class("contrast")
                            .attr("href", post.path())
                            .text(post.title.clone()),
                    ),
                )
                .child(el("th").attr("scope", "row").text(post.display_date()))
        });
        el("main")
            .class("container")
            .child(el("h1").text(self.heading.clone()))
            .children(self.intro.iter().map(|p| el("p").text(p.clone())))
            .child(
                el("table")
                    .child(
                        el("thead").child(
                            el("tr")
                                .child(el("th").attr("scope", "col").text("Title"))
                                .child(el("th").attr("scope", "col").text("Date")),
                        ),
                    )
                    .child(el("tbody").children(rows)),
            )
    }
}

fn social_anchor(link: &SocialLink, class: &str) -> El {
    let anchor = el("a")
        .class(class)
        .attr("href", link.href.clone())
        .attr("title", link.label.clone());
    if link.new_tab {
        anchor
            .attr("target", "_blank")
            .attr("rel", "noopener noreferrer")
    } else {
        anchor
    }
}

fn post_main(post: &Post) -> El {
    el("main").class("container").child(
        el("article")
            .child(el("h1").text(post.title.clone()))
            .children(post.content.iter().cloned()),
    )
}

fn footer() -> El {
    el("footer").class("footer-enhanced").child(
        el("div").class("container").child(
            el("div")
                .class("newsletter-container")
                .child(
                    el("label")
                        .attr("for", "newsletter-email")
                        .class("newsletter-label")
                        .text("NEWSLETTER SUBSCRIBE"),
                )
                .child(
                    el("div").class("newsletter-form-row").child(
                        el("div")
                            .class("subscribe-form")
                            .child(
                                el("div")
                                    .class("subscribe-row")
                                    .child(
                                        el("input")
                                            .attr("type", "email")
                                            .attr("placeholder", "Enter your email")
                                            .attr("required", ""),
                                    )
                                    .child(el("button").attr("type", "button").text("Subscribe")),
                            )
                            .child(el("div")),
                    ),
                ),
        ),
    )
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn default_posts() -> Vec<Post> {
    vec![
        Post::new(
            1,
            "Deploy my own tech blog finally",
            date(2025, 9, 15),
            vec![
                el("p").text(
                    "For years I kept notes scattered across gists and notebooks. This blog is \
                     where they finally get a proper home.",
                ),
                el("h2").text("Love at first sight"),
                el("p").text(
                    "The first time I wrote a web server in Rust I was hooked: the compiler \
                     caught mistakes I did not know I was making.",
                ),
                el("p")
                    .text("A book that helped a lot along the way is ")
                    .child(
                        el("a")
                            .attr("href", "https://www.amazon.com/dp/1718503105")
                            .attr("target", "_blank")
                            .attr("title", "The Rust Programming Language")
                            .text("The Rust Programming Language"),
                    )
                    .text("."),
                el("h2").text("The stack"),
                el("p").text(
                    "The site is rendered on the server, hydrated with WebAssembly and served \
                     as compressed static assets.",
                ),
                el("pre").child(el("code").text("cargo leptos build --release\n./target/release/blog")),
                el("p").text("Posts are plain markdown files compiled into the binary at build time."),
            ],
        ),
        Post::new(
            2,
            "dummy blog",
            date(2025, 9, 25),
            vec![el("p").text("A placeholder post so the list has more than one entry.")],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::SelectorList;

    fn count(doc: &Document, selector: &str) -> usize {
        let selector = SelectorList::parse(selector).unwrap();
        doc.elements()
            .into_iter()
            .filter(|&n| selector.matches(doc, n))
            .count()
    }

    fn text(doc: &Document, selector: &str) -> String {
        let selector = SelectorList::parse(selector).unwrap();
        doc.elements()
            .into_iter()
            .find(|&n| selector.matches(doc, n))
            .map(|n| doc.text_content(n))
            .unwrap_or_default()
    }

    #[test]
    fn test_homepage_contract() {
        let page = BlogSite::default().render("http://localhost:3000/");
        let doc = &page.document;
        assert_eq!(page.status, 200);
        assert_eq!(text(doc, "title"), HOME_TITLE);
        assert_eq!(count(doc, "h1"), 1);
        assert_eq!(count(doc, "tbody tr"), 2);
        assert_eq!(text(doc, "p"), "I am a curious learner with a genuine love for new technologies.");
        assert_eq!(count(doc, "th[scope=col]"), 2);
        assert_eq!(count(doc, ".nav-social a"), 3);
        assert_eq!(count(doc, ".mobile-nav-social a span"), 3);
    }

    #[test]
    fn test_post_dates_use_table_format() {
        let site = BlogSite::default();
        assert_eq!(site.post(1).unwrap().display_date(), "15-Sep-2025");
        assert_eq!(site.post(2).unwrap().display_date(), "25-Sep-2025");
    }

    #[test]
    fn test_post_page() {
        let page = BlogSite::default().render("http://localhost:3000/posts/1");
        let doc = &page.document;
        assert_eq!(text(doc, "title"), "Deploy my own tech blog finally");
        assert_eq!(text(doc, "h2"), "Love at first sight");
        assert!(count(doc, "p") > 3);
        assert_eq!(count(doc, "pre code"), 1);
        let json: serde_json::Value =
            serde_json::from_str(&text(doc, "script[type=\"application/ld+json\"]")).unwrap();
        assert_eq!(json["@type"], "BlogPosting");
    }

    #[test]
    fn test_unknown_post_is_not_found() {
        let page = BlogSite::default().render("http://localhost:3000/posts/999");
        assert_eq!(page.status, 404);
        assert!(page.document.text_content(page.document.root()).contains(NOT_FOUND_TEXT));
        assert_eq!(BlogSite::default().render("/nope").status, 404);
    }

    #[test]
    fn test_robots() {
        let page = BlogSite::default().render("http://localhost:3000/robots.txt");
        assert_eq!(page.status, 200);
        assert!(!page.loads_assets);
    }

    #[test]
    fn test_broken_variants() {
        let site = BlogSite::default()
            .with_home_title("Home")
            .with_post(Post::new(3, "third", date(2025, 10, 1), Vec::new()))
            .without_class("brand-link")
            .without_subscribe_form();
        let doc = site.render("/").document;
        assert_eq!(text(&doc, "title"), "Home");
        assert_eq!(count(&doc, "tbody tr"), 3);
        assert_eq!(count(&doc, ".brand-link"), 0);
        assert_eq!(count(&doc, ".subscribe-form"), 0);
    }
}
