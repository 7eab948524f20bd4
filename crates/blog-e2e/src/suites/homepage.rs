//! Homepage: title and meta, introduction, the post table and landmarks.

use std::time::Instant;

use crate::driver::LoadState;
use crate::expect::{expect, expect_page, expect_that, TextMatcher};
use crate::page::Page;
use crate::result::{E2eError, E2eResult};
use crate::scenario::{Scenario, SuiteBuilder};

use super::{DESCRIPTION, HOME_TITLE, VIEWPORT_META};

/// Suite name
pub const SUITE: &str = "Homepage";

/// Scenarios of this suite
pub fn scenarios() -> Vec<Scenario> {
    SuiteBuilder::new(SUITE)
        .start_at("/")
        .scenario("should have correct title and meta tags", title_and_meta)
        .scenario("should display main heading and introduction", heading_and_intro)
        .scenario("should display blog posts table", posts_table)
        .scenario("should have clickable blog post links", clickable_post_links)
        .scenario("should display post titles and dates correctly", titles_and_dates)
        .scenario("should load page within acceptable time", loads_quickly)
        .scenario("should have proper semantic structure", semantic_structure)
        .scenario("should handle empty state gracefully", table_structure_present)
        .build()
}

async fn title_and_meta(page: Page) -> E2eResult<()> {
    expect_page(&page).to_have_title(HOME_TITLE).await?;
    expect(&page.locator("meta[name=\"description\"]"))
        .to_have_attribute("content", DESCRIPTION)
        .await?;
    expect(&page.locator("meta[name=\"viewport\"]"))
        .to_have_attribute("content", VIEWPORT_META)
        .await
}

async fn heading_and_intro(page: Page) -> E2eResult<()> {
    let heading = page.locator("h1");
    expect(&heading).to_be_visible().await?;
    expect(&heading).to_have_text("Hi there, I'm Willian 👋").await?;

    expect(&page.locator("p").first())
        .to_have_text("I am a curious learner with a genuine love for new technologies.")
        .await?;
    expect(&page.locator("p").nth(1))
        .to_have_text("Anything that I learn and find interesting, I will write about it on my blog.")
        .await
}

async fn posts_table(page: Page) -> E2eResult<()> {
    expect(&page.locator("table")).to_be_visible().await?;
    expect(&page.locator("th:has-text(\"Title\")")).to_be_visible().await?;
    expect(&page.locator("th:has-text(\"Date\")")).to_be_visible().await?;
    expect(&page.locator("tbody tr")).to_have_count(2).await
}

async fn clickable_post_links(page: Page) -> E2eResult<()> {
    let link = page.locator("tbody tr").first().locator("a");
    expect(&link).to_be_visible().await?;
    expect(&link).to_have_class(TextMatcher::pattern("contrast")?).await?;

    let href = link
        .get_attribute("href")
        .await?
        .ok_or_else(|| E2eError::assertion("first post link href", "present", "missing"))?;
    expect_that(href.as_str())
        .described_as("first post link href")
        .to_match(r"^/posts/\d+$")?;

    link.click().await?;
    expect_page(&page).to_have_url(href).await
}

async fn titles_and_dates(page: Page) -> E2eResult<()> {
    let first = page.locator("tbody tr").first();
    expect(&first.locator("th").first())
        .to_contain_text("Deploy my own tech blog finally")
        .await?;
    expect(&first.locator("th").nth(1)).to_have_text("15-Sep-2025").await?;

    let second = page.locator("tbody tr").nth(1);
    expect(&second.locator("th").first())
        .to_contain_text("dummy blog")
        .await?;
    expect(&second.locator("th").nth(1)).to_have_text("25-Sep-2025").await
}

async fn loads_quickly(page: Page) -> E2eResult<()> {
    let started = Instant::now();
    page.goto("/").await?;
    page.wait_for_load_state(LoadState::NetworkIdle).await?;
    expect_that(started.elapsed().as_millis())
        .described_as("homepage load time (ms)")
        .to_be_less_than(3000)
}

async fn semantic_structure(page: Page) -> E2eResult<()> {
    for landmark in ["main", "header", "footer"] {
        expect(&page.locator(landmark)).to_be_visible().await?;
    }
    let table = page.locator("table");
    expect(&table.locator("thead")).to_be_visible().await?;
    expect(&table.locator("tbody")).to_be_visible().await
}

async fn table_structure_present(page: Page) -> E2eResult<()> {
    let table = page.locator("table");
    expect(&table).to_be_visible().await?;
    expect(&table.locator("tbody")).to_be_visible().await
}
