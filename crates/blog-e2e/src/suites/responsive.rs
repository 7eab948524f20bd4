//! Layout across desktop, tablet and mobile viewports.

use std::time::Instant;

use crate::driver::{LoadState, Viewport};
use crate::expect::{expect, expect_page, expect_that, TextMatcher};
use crate::page::Page;
use crate::result::E2eResult;
use crate::scenario::{Scenario, SuiteBuilder};

/// Suite name
pub const SUITE: &str = "Responsive Design";

/// Smallest acceptable touch target, relaxed from the 44px guideline
const MIN_TOUCH_TARGET: f64 = 30.0;

/// Scenarios of this suite
pub fn scenarios() -> Vec<Scenario> {
    SuiteBuilder::new(SUITE)
        .no_start()
        .group("Desktop Layout")
        .viewport(Viewport::DESKTOP)
        .scenario("should display desktop navigation correctly", desktop_navigation)
        .scenario("should layout content properly on desktop", desktop_content)
        .scenario("should handle wide content gracefully", wide_content)
        .group("Mobile Layout")
        .viewport(Viewport::MOBILE)
        .scenario("should display mobile navigation correctly", mobile_navigation)
        .scenario("should handle mobile menu interactions", mobile_menu)
        .scenario("should layout content properly on mobile", mobile_content)
        .scenario("should handle touch interactions", touch_interactions)
        .scenario("should adapt typography for mobile", mobile_typography)
        .group("Tablet Layout")
        .viewport(Viewport::TABLET)
        .scenario("should adapt to tablet dimensions", tablet_dimensions)
        .scenario("should maintain readability on tablet", tablet_readability)
        .group("Breakpoint Transitions")
        .viewport(Viewport::default())
        .scenario("should transition smoothly between breakpoints", breakpoint_transitions)
        .scenario("should handle rapid viewport changes", rapid_viewport_changes)
        .group("Orientation Changes")
        .viewport(Viewport::MOBILE)
        .scenario("should handle portrait to landscape transition", portrait_to_landscape)
        .scenario(
            "should maintain functionality across orientations",
            functional_across_orientations,
        )
        .group("Content Reflow")
        .viewport(Viewport::default())
        .scenario("should reflow text content appropriately", text_reflow)
        .scenario("should handle tables responsively", table_reflow)
        .scenario("should handle images responsively", image_reflow)
        .group("Interactive Elements")
        .viewport(Viewport::MOBILE)
        .scenario("should maintain touch target sizes on mobile", touch_target_sizes)
        .scenario(
            "should provide adequate spacing between interactive elements",
            touch_target_spacing,
        )
        .group("Performance on Different Viewports")
        .viewport(Viewport::default())
        .scenario("should maintain performance across viewport sizes", load_time_per_viewport)
        .build()
}

async fn width_at_most(page: &Page, selector: &str, limit: u32) -> E2eResult<()> {
    if let Some(b) = page.locator(selector).first().bounding_box().await? {
        expect_that(b.width)
            .described_as(format!("width of `{selector}`"))
            .to_be_less_than_or_equal(f64::from(limit))?;
    }
    Ok(())
}

async fn desktop_navigation(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    expect(&page.locator(".nav-desktop")).to_be_visible().await?;

    let button = page.locator(".mobile-menu-button");
    if button.count().await? > 0 {
        expect(&button).not().to_be_visible().await?;
    }
    expect(&page.locator(".nav-social")).to_be_visible().await
}

async fn desktop_content(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    expect(&page.locator(".container")).to_be_visible().await?;
    expect(&page.locator("table")).to_be_visible().await?;
    width_at_most(&page, "body", 1200).await
}

async fn wide_content(page: Page) -> E2eResult<()> {
    page.goto("/posts/1").await?;
    width_at_most(&page, "main", 1200).await?;

    for (i, code) in page.locator("pre, code").inspect_all().await?.iter().enumerate() {
        if let Some(b) = code.bounding_box {
            expect_that(b.width)
                .described_as(format!("width of code block #{i}"))
                .to_be_less_than(1200.0)?;
        }
    }
    Ok(())
}

async fn mobile_navigation(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    expect(&page.locator(".mobile-menu-button")).to_be_visible().await?;

    let desktop = page.locator(".nav-desktop");
    if desktop.count().await? > 0 && desktop.is_visible().await? {
        width_at_most(&page, ".nav-desktop", 375).await?;
    }
    Ok(())
}

async fn mobile_menu(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let button = page.locator(".mobile-menu-button");
    let menu = page.locator(".mobile-menu");
    let open = || TextMatcher::pattern("mobile-menu-open");

    expect(&menu).not().to_have_class(open()?).await?;
    button.click().await?;
    expect(&menu).to_have_class(open()?).await?;
    expect(&page.locator(".mobile-menu-content")).to_be_visible().await?;

    button.click().await?;
    expect(&menu).not().to_have_class(open()?).await
}

async fn mobile_content(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    width_at_most(&page, "main", 375).await?;
    if page.locator("table").count().await? > 0 {
        width_at_most(&page, "table", 375).await?;
    }

    let headings = page.locator("h1, h2, h3");
    for i in 0..headings.count().await? {
        expect(&headings.nth(i)).to_be_visible().await?;
    }
    Ok(())
}

async fn touch_interactions(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let link = page.locator("tbody tr").first().locator("a");
    if link.count().await? > 0 {
        link.tap().await?;
        expect_page(&page)
            .to_have_url(TextMatcher::pattern(r"/posts/\d+")?)
            .await?;
    }
    Ok(())
}

async fn mobile_typography(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    expect(&page.locator("h1")).to_be_visible().await?;

    for (i, p) in page.locator("p").inspect_all().await?.iter().enumerate() {
        if let Some(b) = p.bounding_box {
            expect_that(b.width)
                .described_as(format!("width of paragraph #{i}"))
                .to_be_less_than_or_equal(375.0)?;
        }
    }
    Ok(())
}

async fn tablet_dimensions(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    width_at_most(&page, "main", 768).await?;
    expect(&page.locator("nav")).to_be_visible().await?;

    let mobile_button = page.locator(".mobile-menu-button").is_visible().await?;
    let desktop_nav = page.locator(".nav-desktop").is_visible().await?;
    expect_that(mobile_button || desktop_nav)
        .described_as("either navigation mode active at tablet width")
        .to_be_truthy()
}

async fn tablet_readability(page: Page) -> E2eResult<()> {
    page.goto("/posts/1").await?;
    expect(&page.locator("main")).to_be_visible().await?;

    if let Some(b) = page.locator("p").first().bounding_box().await? {
        expect_that(b.width)
            .described_as("width of the first paragraph")
            .to_be_less_than(768.0)?;
    }
    Ok(())
}

async fn breakpoint_transitions(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    for viewport in [Viewport::DESKTOP, Viewport::TABLET, Viewport::MOBILE] {
        page.set_viewport_size(viewport.width, viewport.height).await?;
        expect(&page.locator("nav")).to_be_visible().await?;
    }
    expect(&page.locator("h1")).to_be_visible().await
}

async fn rapid_viewport_changes(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    for viewport in [
        Viewport::DESKTOP,
        Viewport::MOBILE,
        Viewport::TABLET,
        Viewport::MOBILE_SMALL,
        Viewport::new(1440, 900),
    ] {
        page.set_viewport_size(viewport.width, viewport.height).await?;
        expect(&page.locator("h1")).to_be_visible().await?;
        expect(&page.locator("nav")).to_be_visible().await?;
        width_at_most(&page, "body", viewport.width).await?;
    }
    Ok(())
}

async fn portrait_to_landscape(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let button = page.locator(".mobile-menu-button");
    if button.count().await? > 0 {
        expect(&button).to_be_visible().await?;
    }

    let landscape = Viewport::MOBILE_LANDSCAPE;
    page.set_viewport_size(landscape.width, landscape.height).await?;
    expect(&page.locator("h1")).to_be_visible().await?;
    expect(&page.locator("nav")).to_be_visible().await
}

async fn functional_across_orientations(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let link = page.locator("tbody tr").first().locator("a");
    let Some(href) = link.get_attribute("href").await? else {
        return Ok(());
    };

    let landscape = Viewport::MOBILE_LANDSCAPE;
    page.set_viewport_size(landscape.width, landscape.height).await?;
    link.click().await?;
    expect_page(&page).to_have_url(href).await
}

async fn text_reflow(page: Page) -> E2eResult<()> {
    page.goto("/posts/1").await?;
    for viewport in [
        Viewport::MOBILE_SMALL,
        Viewport::MOBILE,
        Viewport::TABLET,
        Viewport::DESKTOP,
    ] {
        page.set_viewport_size(viewport.width, viewport.height).await?;
        let paragraphs = page.locator("p").inspect_all().await?;
        for (i, p) in paragraphs.iter().take(3).enumerate() {
            if let Some(b) = p.bounding_box {
                expect_that(b.width)
                    .described_as(format!("width of paragraph #{i} at {viewport}"))
                    .to_be_less_than_or_equal(f64::from(viewport.width))?;
            }
        }
    }
    Ok(())
}

async fn table_reflow(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let table = page.locator("table");
    if table.count().await? == 0 {
        return Ok(());
    }
    for width in [320, 375, 768, 1200] {
        page.set_viewport_size(width, 600).await?;
        width_at_most(&page, "table", width).await?;

        let first_row = table.locator("tbody tr").first();
        if first_row.count().await? > 0 {
            expect(&first_row).to_be_visible().await?;
        }
    }
    Ok(())
}

async fn image_reflow(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let images = page.locator("img");
    if images.count().await? == 0 {
        return Ok(());
    }
    for width in [320, 375, 768, 1200] {
        page.set_viewport_size(width, 600).await?;
        for (i, img) in images.inspect_all().await?.iter().enumerate() {
            if let Some(b) = img.bounding_box {
                expect_that(b.width)
                    .described_as(format!("width of image #{i} at {width}px"))
                    .to_be_less_than_or_equal(f64::from(width))?;
            }
        }
    }
    Ok(())
}

async fn touch_target_sizes(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let targets = page.locator("button, a, input").inspect_all().await?;
    for target in targets.iter().filter(|t| t.visible) {
        let Some(b) = target.bounding_box else {
            continue;
        };
        let name = format!("<{}> {:?}", target.tag_name, target.text.trim());
        expect_that(b.height)
            .described_as(format!("touch target height of {name}"))
            .to_be_greater_than_or_equal(MIN_TOUCH_TARGET)?;
        expect_that(b.width)
            .described_as(format!("touch target width of {name}"))
            .to_be_greater_than_or_equal(MIN_TOUCH_TARGET)?;
    }
    Ok(())
}

async fn touch_target_spacing(page: Page) -> E2eResult<()> {
    page.goto("/").await?;
    let links = page.locator(".nav-social a, .mobile-nav-social a");
    if links.count().await? < 2 {
        return Ok(());
    }
    let (first, second) = (links.first(), links.nth(1));
    if !(first.is_visible().await? && second.is_visible().await?) {
        return Ok(());
    }
    if let (Some(a), Some(b)) = (first.bounding_box().await?, second.bounding_box().await?) {
        expect_that((b.x - a.right()).abs())
            .described_as("gap between adjacent social links")
            .to_be_greater_than_or_equal(0.0)?;
    }
    Ok(())
}

async fn load_time_per_viewport(page: Page) -> E2eResult<()> {
    for (name, viewport) in [
        ("mobile", Viewport::MOBILE),
        ("tablet", Viewport::TABLET),
        ("desktop", Viewport::DESKTOP),
    ] {
        page.set_viewport_size(viewport.width, viewport.height).await?;
        let started = Instant::now();
        page.goto("/").await?;
        page.wait_for_load_state(LoadState::NetworkIdle).await?;
        let elapsed = started.elapsed().as_millis();
        tracing::info!(viewport = name, load_ms = elapsed, "page loaded");
        expect_that(elapsed)
            .described_as(format!("{name} load time (ms)"))
            .to_be_less_than(5000)?;
    }
    Ok(())
}
