//! Post pages: rendering, structure, navigation and history.

use std::time::Instant;

use crate::expect::{expect, expect_page, expect_that, TextMatcher};
use crate::page::Page;
use crate::result::E2eResult;
use crate::scenario::{Scenario, SuiteBuilder};

use super::{HOME_TITLE, VIEWPORT_META};

/// Suite name
pub const SUITE: &str = "Blog Posts";

const FIRST_POST: &str = "Deploy my own tech blog finally";

/// Scenarios of this suite
pub fn scenarios() -> Vec<Scenario> {
    SuiteBuilder::new(SUITE)
        .scenario("should display first blog post correctly", first_post)
        .scenario("should display second blog post correctly", second_post)
        .scenario("should handle invalid post IDs gracefully", invalid_post_id)
        .scenario("should render markdown content properly", markdown_rendering)
        .scenario("should handle code blocks with syntax highlighting", code_blocks)
        .scenario("should maintain proper document structure", document_structure)
        .scenario("should be navigable from homepage", navigable_from_home)
        .scenario("should allow navigation back to homepage", back_to_home)
        .scenario("should load post content within acceptable time", loads_quickly)
        .scenario("should have proper meta tags for SEO", seo_meta)
        .scenario("should handle browser navigation correctly", browser_history)
        .build()
}

async fn first_post(page: Page) -> E2eResult<()> {
    page.goto("/posts/1").await?;
    expect_page(&page).to_have_title(FIRST_POST).await?;
    expect(&page.locator("h1").first()).to_have_text(FIRST_POST).await?;
    expect(&page.locator("h2").first())
        .to_have_text("Love at first sight")
        .await
}

async fn second_post(page: Page) -> E2eResult<()> {
    page.goto("/posts/2").await?;
    expect(&page.locator("h1").first()).to_be_visible().await?;
    expect_that(page.title().await?)
        .described_as("second post title")
        .not_to_equal(FIRST_POST.to_string())
}

async fn invalid_post_id(page: Page) -> E2eResult<()> {
    let response = page.goto("/posts/999").await?;
    if response.status == 404 {
        expect(&page.locator("body"))
            .to_have_text(TextMatcher::pattern("(?i)not found|404")?)
            .await
    } else {
        expect_that(page.locator("body").text_content().await?)
            .described_as("body text of an unknown post")
            .to_be_truthy()
    }
}

async fn markdown_rendering(page: Page) -> E2eResult<()> {
    page.goto("/posts/1").await?;
    expect(&page.locator("h1")).to_have_count(1).await?;
    expect(&page.locator("h2").first()).to_be_visible().await?;
    expect(&page.locator("p")).to_have_count_greater_than(3).await?;

    let links = page.locator("a[href*=\"amazon.com\"]");
    if links.count().await? > 0 {
        expect(&links.first())
            .to_have_attribute("href", TextMatcher::pattern(r"amazon\.com")?)
            .await?;
    }
    Ok(())
}

async fn code_blocks(page: Page) -> E2eResult<()> {
    page.goto("/posts/1").await?;
    let code = page.locator("code");
    if code.count().await? > 0 {
        let first = code.first();
        expect(&first).to_be_visible().await?;
        expect_that(first.parent_tag_name().await?)
            .described_as("parent of the first code element")
            .to_equal(Some("pre".to_string()))?;
    }
    Ok(())
}

async fn document_structure(page: Page) -> E2eResult<()> {
    page.goto("/posts/1").await?;
    let main = page.locator("main");
    expect(&main).to_be_visible().await?;
    expect(&page.locator("header")).to_be_visible().await?;
    expect(&page.locator("footer")).to_be_visible().await?;
    expect(&main.locator("h1")).to_be_visible().await
}

async fn navigable_from_home(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    page.locator("tbody tr").first().locator("a").click().await?;
    expect_page(&page).to_have_url("/posts/1").await?;
    expect(&page.locator("h1")).to_have_text(FIRST_POST).await
}

async fn back_to_home(page: Page) -> E2eResult<()> {
    page.goto("/posts/1").await?;
    let brand = page.locator(".brand-link");
    expect(&brand).to_be_visible().await?;
    brand.click().await?;
    expect_page(&page).to_have_url("/").await?;
    expect_page(&page).to_have_title(HOME_TITLE).await
}

async fn loads_quickly(page: Page) -> E2eResult<()> {
    let started = Instant::now();
    page.goto("/posts/1").await?;
    page.wait_for_selector("h1").await?;
    expect_that(started.elapsed().as_millis())
        .described_as("post load time (ms)")
        .to_be_less_than(2000)
}

async fn seo_meta(page: Page) -> E2eResult<()> {
    page.goto("/posts/1").await?;
    expect_page(&page).to_have_title(FIRST_POST).await?;

    let description = page.locator("meta[name=\"description\"]");
    if description.count().await? > 0 {
        let content = description.get_attribute("content").await?.unwrap_or_default();
        expect_that(content.as_str())
            .described_as("meta description")
            .to_be_truthy()?;
        expect_that(content.chars().count())
            .described_as("meta description length")
            .to_be_less_than(160)?;
    }

    expect(&page.locator("meta[name=\"viewport\"]"))
        .to_have_attribute("content", VIEWPORT_META)
        .await
}

async fn browser_history(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    page.locator("tbody tr").first().locator("a").click().await?;
    expect_page(&page).to_have_url("/posts/1").await?;

    page.goto("/posts/2").await?;
    expect_page(&page).not().to_have_url("/posts/1").await?;

    page.go_back().await?;
    expect_page(&page).to_have_url("/posts/1").await?;

    page.go_forward().await?;
    expect_page(&page).to_have_url("/posts/2").await
}
