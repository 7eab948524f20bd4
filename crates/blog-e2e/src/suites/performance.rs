//! Load times, web vitals, metadata and resource budgets.

use std::time::{Duration, Instant};

use crate::driver::{LoadState, Viewport};
use crate::expect::{expect, expect_that, TextMatcher};
use crate::network::{NetworkEntry, ResourceType};
use crate::page::Page;
use crate::performance::{css_bytes, script_bytes, PerformanceBudget};
use crate::result::E2eResult;
use crate::scenario::{Scenario, SuiteBuilder};

/// Suite name
pub const SUITE: &str = "Performance";

const POST_TITLE: &str = "Deploy my own tech blog finally";

/// Scenarios of this suite
pub fn scenarios() -> Vec<Scenario> {
    SuiteBuilder::new(SUITE)
        .no_start()
        .group("Page Load Performance")
        .scenario("homepage should load within acceptable time", homepage_load)
        .scenario("blog post pages should load within acceptable time", post_load)
        .scenario("should achieve good Largest Contentful Paint (LCP)", largest_contentful_paint)
        .scenario("should achieve good First Contentful Paint (FCP)", first_contentful_paint)
        .scenario("should have minimal layout shifts", layout_shift)
        .scenario("should load critical resources quickly", critical_resources)
        .group("SEO and Metadata")
        .scenario("homepage should have proper meta tags", homepage_meta)
        .scenario("blog posts should have proper meta tags", post_meta)
        .scenario("should have proper Open Graph tags", open_graph)
        .scenario("should have proper canonical URLs", canonical_url)
        .scenario("should be crawlable by search engines", robots_txt)
        .group("Resource Optimization")
        .scenario("should compress text resources", compressed_resources)
        .scenario("should have efficient caching headers", caching_headers)
        .scenario("should minimize HTTP requests", request_count)
        .scenario("should load images efficiently", image_loading)
        .group("Mobile Performance")
        .viewport(Viewport::MOBILE)
        .scenario("should perform well on mobile devices", mobile_load)
        .scenario("should handle touch interactions efficiently", touch_latency)
        .scenario("should have appropriate mobile viewport", mobile_viewport)
        .group("Bundle Size Analysis")
        .viewport(Viewport::default())
        .scenario("should have reasonable JavaScript bundle sizes", script_bundle)
        .scenario("should have reasonable CSS bundle sizes", css_bundle)
        .build()
}

/// Load `/` and wait for the network to go quiet
async fn settled_home(page: &Page) -> E2eResult<Vec<NetworkEntry>> {
    page.goto("/").await?;
    page.wait_for_load_state(LoadState::NetworkIdle).await?;
    page.network_log().await
}

async fn homepage_load(page: Page) -> E2eResult<()> {
    let started = Instant::now();
    settled_home(&page).await?;
    let elapsed = started.elapsed().as_millis();
    tracing::info!(load_ms = elapsed, "homepage loaded");
    expect_that(elapsed)
        .described_as("homepage load time (ms)")
        .to_be_less_than(3000)
}

async fn post_load(page: Page) -> E2eResult<()> {
    let started = Instant::now();
    page.goto("/posts/1").await?;
    page.wait_for_selector("h1").await?;
    let elapsed = started.elapsed().as_millis();
    tracing::info!(load_ms = elapsed, "post loaded");
    expect_that(elapsed)
        .described_as("post load time (ms)")
        .to_be_less_than(2000)
}

async fn largest_contentful_paint(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    page.wait_for_selector("h1").await?;
    page.wait_for_timeout(Duration::from_secs(1)).await;

    let lcp = page.performance().await?.largest_contentful_paint_ms.unwrap_or(0.0);
    tracing::info!(lcp_ms = lcp, "largest contentful paint");
    expect_that(lcp)
        .described_as("largest contentful paint (ms)")
        .to_be_less_than(PerformanceBudget::default().lcp_ms)
}

async fn first_contentful_paint(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let fcp = page.performance().await?.first_contentful_paint_ms.unwrap_or(0.0);
    tracing::info!(fcp_ms = fcp, "first contentful paint");
    expect_that(fcp)
        .described_as("first contentful paint (ms)")
        .to_be_less_than(PerformanceBudget::default().fcp_ms)
}

async fn layout_shift(page: Page) -> E2eResult<()> {
    settled_home(&page).await?;
    page.wait_for_timeout(Duration::from_secs(2)).await;

    let cls = page.performance().await?.cumulative_layout_shift;
    tracing::info!(cls, "cumulative layout shift");
    expect_that(cls)
        .described_as("cumulative layout shift")
        .to_be_less_than(PerformanceBudget::default().cls)
}

async fn critical_resources(page: Page) -> E2eResult<()> {
    let limit = PerformanceBudget::default().critical_resource_ms;
    let entries = settled_home(&page).await?;
    for entry in entries.iter().filter(|e| {
        matches!(
            e.resource_type,
            ResourceType::Stylesheet | ResourceType::Script | ResourceType::Wasm
        )
    }) {
        expect_that(entry.duration_ms)
            .described_as(format!("response time of {} (ms)", entry.url))
            .to_be_less_than(limit)?;
    }
    Ok(())
}

async fn homepage_meta(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let title_len = page.title().await?.chars().count();
    expect_that(title_len)
        .described_as("title length")
        .to_be_greater_than(10)?;
    expect_that(title_len)
        .described_as("title length")
        .to_be_less_than(60)?;

    let description = page
        .locator("meta[name=\"description\"]")
        .get_attribute("content")
        .await?;
    if let Some(description) = description {
        expect_that(description.as_str())
            .described_as("meta description")
            .to_be_truthy()?;
        expect_that(description.chars().count())
            .described_as("meta description length")
            .to_be_less_than(160)?;
    }

    expect(&page.locator("meta[name=\"viewport\"]"))
        .to_have_attribute("content", TextMatcher::pattern("width=device-width")?)
        .await?;
    expect(&page.locator("meta[charset]"))
        .to_have_attribute("charset", "utf-8")
        .await
}

async fn post_meta(page: Page) -> E2eResult<()> {
    page.goto("/posts/1").await?;
    expect_that(page.title().await?)
        .described_as("post title")
        .to_equal(POST_TITLE.to_string())?;

    let json_ld = page.locator("script[type=\"application/ld+json\"]");
    if json_ld.count().await? > 0 {
        let text = json_ld.first().text_content().await?;
        let data: serde_json::Value = serde_json::from_str(&text)?;
        expect_that(data.get("@type").is_some())
            .described_as("structured data has `@type`")
            .to_be_truthy()?;
    }
    Ok(())
}

async fn open_graph(page: Page) -> E2eResult<()> {
    page.goto("/").await?;

    let og_title = page.locator("meta[property=\"og:title\"]");
    if og_title.count().await? > 0 {
        expect_that(og_title.get_attribute("content").await?)
            .described_as("og:title")
            .to_be_truthy()?;
    }

    let og_type = page.locator("meta[property=\"og:type\"]");
    if og_type.count().await? > 0 {
        expect(&og_type)
            .to_have_attribute("content", TextMatcher::pattern("^(website|article)$")?)
            .await?;
    }
    Ok(())
}

async fn canonical_url(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let canonical = page.locator("link[rel=\"canonical\"]");
    if canonical.count().await? > 0 {
        let href = canonical.get_attribute("href").await?.unwrap_or_default();
        expect_that(href)
            .described_as("canonical href")
            .to_match(r"^https?://")?;
    }
    Ok(())
}

async fn robots_txt(page: Page) -> E2eResult<()> {
    page.goto("/robots.txt").await?;
    expect_that(page.url().await?)
        .described_as("url after opening robots.txt")
        .to_match(r"/robots\.txt$")
}

async fn compressed_resources(page: Page) -> E2eResult<()> {
    let entries = settled_home(&page).await?;
    let compressed = entries
        .iter()
        .filter(|e| {
            let content_type = e.header("content-type").unwrap_or_default();
            content_type.contains("text/")
                || content_type.contains("application/javascript")
                || content_type.contains("application/json")
        })
        .filter(|e| e.is_compressed())
        .count();
    tracing::info!(compressed, "compressed text resources");
    Ok(())
}

async fn caching_headers(page: Page) -> E2eResult<()> {
    let entries = settled_home(&page).await?;
    let cached = entries
        .iter()
        .filter(|e| e.has_cache_headers())
        .filter(|e| {
            [".css", ".js", ".wasm", ".png", ".jpg", ".ico"]
                .iter()
                .any(|ext| e.url.contains(ext))
        })
        .count();
    tracing::info!(cached, "static resources with caching headers");
    Ok(())
}

async fn request_count(page: Page) -> E2eResult<()> {
    let entries = settled_home(&page).await?;
    let count_of = |kind: ResourceType| entries.iter().filter(|e| e.resource_type == kind).count();
    tracing::info!(
        total = entries.len(),
        html = count_of(ResourceType::Document),
        css = count_of(ResourceType::Stylesheet),
        js = count_of(ResourceType::Script),
        images = count_of(ResourceType::Image),
        "request breakdown"
    );
    expect_that(entries.len())
        .described_as("request count")
        .to_be_less_than(PerformanceBudget::default().max_requests)
}

async fn image_loading(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    for (i, img) in page.locator("img").inspect_all().await?.iter().enumerate() {
        if let (Some(width), Some(height)) = (img.attribute("width"), img.attribute("height")) {
            for (name, value) in [("width", width), ("height", height)] {
                expect_that(value.trim().parse::<u32>().unwrap_or(0))
                    .described_as(format!("{name} of image #{i}"))
                    .to_be_greater_than(0)?;
            }
        }
        if img.attribute("src").is_some_and(|src| !src.contains("favicon")) {
            tracing::debug!(loading = ?img.attribute("loading"), "image loading attribute");
        }
    }
    Ok(())
}

async fn mobile_load(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let started = Instant::now();
    page.wait_for_load_state(LoadState::NetworkIdle).await?;
    let elapsed = started.elapsed().as_millis();
    tracing::info!(load_ms = elapsed, "mobile load");
    expect_that(elapsed)
        .described_as("mobile load time (ms)")
        .to_be_less_than(4000)
}

async fn touch_latency(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let button = page.locator(".mobile-menu-button");
    if button.count().await? > 0 {
        let started = Instant::now();
        button.tap().await?;
        expect_that(started.elapsed().as_millis())
            .described_as("menu tap latency (ms)")
            .to_be_less_than(100)?;
    }
    Ok(())
}

async fn mobile_viewport(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    if let Some(b) = page.locator("body").bounding_box().await? {
        expect_that(b.width)
            .described_as("body width")
            .to_be_less_than_or_equal(375.0)?;
    }
    Ok(())
}

async fn script_bundle(page: Page) -> E2eResult<()> {
    let budget = PerformanceBudget::default();
    let entries = settled_home(&page).await?;
    let total = script_bytes(&entries);
    tracing::info!(total_kb = total / 1024, "script bundle size");
    expect_that(total)
        .described_as("total JS + WASM bytes")
        .to_be_less_than(budget.total_script_bytes)?;

    for entry in entries
        .iter()
        .filter(|e| matches!(e.resource_type, ResourceType::Script | ResourceType::Wasm))
    {
        expect_that(entry.content_length())
            .described_as(format!("size of {}", entry.url))
            .to_be_less_than(budget.single_script_bytes)?;
    }
    Ok(())
}

async fn css_bundle(page: Page) -> E2eResult<()> {
    let entries = settled_home(&page).await?;
    let total = css_bytes(&entries);
    tracing::info!(total_kb = total / 1024, "css bundle size");
    expect_that(total)
        .described_as("total CSS bytes")
        .to_be_less_than(PerformanceBudget::default().total_css_bytes)
}
