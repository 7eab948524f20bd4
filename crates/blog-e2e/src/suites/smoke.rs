//! Smoke check: the blog is up and renders its skeleton.

use crate::expect::{expect, expect_page};
use crate::page::Page;
use crate::result::E2eResult;
use crate::scenario::{Scenario, SuiteBuilder};

use super::HOME_TITLE;

/// Suite name
pub const SUITE: &str = "Smoke";

/// Scenarios of this suite
pub fn scenarios() -> Vec<Scenario> {
    SuiteBuilder::new(SUITE)
        .scenario("blog is accessible and functional", blog_is_accessible)
        .build()
}

async fn blog_is_accessible(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    expect_page(&page).to_have_title(HOME_TITLE).await?;
    expect(&page.locator("h1"))
        .to_have_text("Hi there, I'm Willian 👋")
        .await?;
    expect(&page.locator("nav")).to_be_visible().await?;
    expect(&page.locator("table")).to_be_visible().await
}
