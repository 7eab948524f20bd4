//! Navigation bar: brand, social links, the mobile menu and keyboard access.

use crate::driver::Viewport;
use crate::expect::{expect, expect_page, expect_that, TextMatcher};
use crate::page::Page;
use crate::result::E2eResult;
use crate::scenario::{Scenario, SuiteBuilder};

use super::{HOME_TITLE, SOCIAL_HREFS};

/// Suite name
pub const SUITE: &str = "Navigation";

/// Scenarios of this suite
pub fn scenarios() -> Vec<Scenario> {
    SuiteBuilder::new(SUITE)
        .start_at("/")
        .group("Desktop Navigation")
        .scenario("should display brand/logo correctly", brand_and_logo)
        .scenario("should have functional social media links", social_links)
        .scenario("should navigate to homepage when clicking brand", brand_navigates_home)
        .scenario("should hide mobile menu button on desktop", menu_button_hidden)
        .group("Mobile Navigation")
        .viewport(Viewport::MOBILE)
        .scenario("should display mobile menu button", menu_button_shown)
        .scenario("should toggle mobile menu when clicking button", menu_toggles)
        .scenario("should display mobile social links", mobile_social_links)
        .scenario("should show correct menu icons", menu_icon)
        .scenario("should maintain brand link functionality on mobile", brand_navigates_home)
        .group("Navigation Consistency")
        .viewport(Viewport::default())
        .scenario("should maintain navigation across all pages", nav_on_every_page)
        .scenario("should have consistent social links across pages", social_links_everywhere)
        .scenario("should handle keyboard navigation", keyboard_navigation)
        .group("Responsive Behavior")
        .no_start()
        .scenario("should adapt to different screen sizes", adapts_to_sizes)
        .scenario("should handle orientation changes on mobile", orientation_change)
        .group("External Links")
        .start_at("/")
        .scenario("should open social links in new tabs", new_tab_links)
        .scenario(
            "should have proper accessibility attributes for external links",
            external_links_titled,
        )
        .build()
}

async fn brand_and_logo(page: Page) -> E2eResult<()> {
    let brand = page.locator(".brand-link");
    expect(&brand).to_be_visible().await?;
    expect(&brand).to_have_attribute("href", "/").await?;

    let logo = brand.locator("img");
    expect(&logo).to_be_visible().await?;
    expect(&logo).to_have_attribute("src", "/favicon.ico").await?;
    expect(&logo).to_have_attribute("alt", "Brand Logo").await?;

    expect(&brand.locator("strong")).to_have_text("Willian Nguyen").await
}

async fn social_links(page: Page) -> E2eResult<()> {
    expect(&page.locator(".nav-social")).to_be_visible().await?;

    let github = page.locator("a[href*=\"github.com/hnlearndev\"]");
    expect(&github).to_be_visible().await?;
    expect(&github).to_have_attribute("target", "_blank").await?;
    expect(&github).to_have_attribute("title", "GitHub").await?;

    let linkedin = page.locator("a[href*=\"linkedin.com/in/hieunthello\"]");
    expect(&linkedin).to_be_visible().await?;
    expect(&linkedin).to_have_attribute("target", "_blank").await?;
    expect(&linkedin).to_have_attribute("title", "LinkedIn").await?;

    let email = page.locator("a[href=\"mailto:hieunt.hello@gmail.com\"]");
    expect(&email).to_be_visible().await?;
    expect(&email).to_have_attribute("title", "Email").await
}

async fn brand_navigates_home(page: Page) -> E2eResult<()> {
    page.goto("/posts/1").await?;
    let brand = page.locator(".brand-link");
    expect(&brand).to_be_visible().await?;
    brand.click().await?;
    expect_page(&page).to_have_url("/").await?;
    expect_page(&page).to_have_title(HOME_TITLE).await
}

async fn menu_button_hidden(page: Page) -> E2eResult<()> {
    let button = page.locator(".mobile-menu-button");
    if button.count().await? > 0 {
        expect(&button).not().to_be_visible().await?;
    }
    Ok(())
}

async fn menu_button_shown(page: Page) -> E2eResult<()> {
    let button = page.locator(".mobile-menu-button");
    expect(&button).to_be_visible().await?;
    expect(&button)
        .to_have_attribute("aria-label", "Toggle mobile menu")
        .await
}

async fn menu_toggles(page: Page) -> E2eResult<()> {
    let button = page.locator(".mobile-menu-button");
    let menu = page.locator(".mobile-menu");
    let open = || TextMatcher::pattern("mobile-menu-open");

    expect(&menu).not().to_have_class(open()?).await?;
    button.click().await?;
    expect(&menu).to_have_class(open()?).await?;
    button.click().await?;
    expect(&menu).not().to_have_class(open()?).await
}

async fn mobile_social_links(page: Page) -> E2eResult<()> {
    page.locator(".mobile-menu-button").click().await?;

    let container = page.locator(".mobile-nav-social");
    expect(&container).to_be_visible().await?;

    for (href, label) in [
        ("github.com", "GitHub"),
        ("linkedin.com", "LinkedIn"),
        ("mailto:", "Email"),
    ] {
        let link = container.locator(&format!("a[href*=\"{href}\"]"));
        expect(&link).to_be_visible().await?;
        expect(&link.locator("span")).to_have_text(label).await?;
    }
    Ok(())
}

async fn menu_icon(page: Page) -> E2eResult<()> {
    let button = page.locator(".mobile-menu-button");
    expect(&button).to_be_visible().await?;
    button.click().await?;
    expect(&button).to_be_visible().await
}

async fn nav_on_every_page(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    expect(&page.locator("header nav")).to_be_visible().await?;
    page.goto("/posts/1").await?;
    expect(&page.locator("header nav")).to_be_visible().await?;
    expect(&page.locator(".brand-link strong"))
        .to_have_text("Willian Nguyen")
        .await
}

async fn social_links_everywhere(page: Page) -> E2eResult<()> {
    for path in ["/"] {
        page.goto(path).await?;
        for href in SOCIAL_HREFS {
            expect(&page.locator(&format!("a[href=\"{href}\"]")))
                .to_be_visible()
                .await?;
        }
    }
    Ok(())
}

async fn keyboard_navigation(page: Page) -> E2eResult<()> {
    let brand = page.locator(".brand-link");
    brand.focus().await?;
    expect(&brand).to_be_focused().await?;

    page.keyboard_press("Tab").await?;
    let github = page.locator("a[href*=\"github.com\"]").first();
    expect(&github).to_be_focused().await?;

    expect_that(github.get_attribute("href").await?)
        .described_as("focused GitHub link href")
        .to_be_truthy()
}

async fn adapts_to_sizes(page: Page) -> E2eResult<()> {
    page.set_viewport_size(1200, 800).await?;
    page.goto("/").await?;
    expect(&page.locator(".nav-desktop")).to_be_visible().await?;

    page.set_viewport_size(768, 1024).await?;
    page.reload().await?;

    page.set_viewport_size(320, 568).await?;
    page.reload().await?;
    expect(&page.locator(".mobile-menu-button")).to_be_visible().await
}

async fn orientation_change(page: Page) -> E2eResult<()> {
    page.set_viewport_size(375, 667).await?;
    page.goto("/").await?;
    expect(&page.locator(".brand-link")).to_be_visible().await?;

    page.set_viewport_size(667, 375).await?;
    page.reload().await?;
    expect(&page.locator(".brand-link")).to_be_visible().await
}

async fn new_tab_links(page: Page) -> E2eResult<()> {
    expect(&page.locator("a[href*=\"github.com\"]").first())
        .to_have_attribute("target", "_blank")
        .await?;
    expect(&page.locator("a[href*=\"linkedin.com\"]").first())
        .to_have_attribute("target", "_blank")
        .await?;

    let target = page
        .locator("a[href*=\"mailto:\"]")
        .first()
        .get_attribute("target")
        .await?;
    expect_that(target)
        .described_as("email link target")
        .to_equal(None::<String>)
}

async fn external_links_titled(page: Page) -> E2eResult<()> {
    let external = page.locator("a[target=\"_blank\"]");
    let count = external.count().await?;
    for i in 0..count {
        let title = external.nth(i).get_attribute("title").await?;
        expect_that(title)
            .described_as(format!("title of external link #{i}"))
            .to_be_truthy()?;
    }
    Ok(())
}
