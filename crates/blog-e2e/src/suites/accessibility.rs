//! Keyboard access, landmarks, ARIA attributes and form accessibility.

use crate::driver::Viewport;
use crate::expect::{expect, expect_page, expect_that, TextMatcher};
use crate::network::MockResponse;
use crate::page::Page;
use crate::result::E2eResult;
use crate::scenario::{Scenario, SuiteBuilder};

use super::{HOME_TITLE, SUBSCRIBE_PATH};

/// Suite name
pub const SUITE: &str = "Accessibility";

/// Scenarios of this suite
pub fn scenarios() -> Vec<Scenario> {
    SuiteBuilder::new(SUITE)
        .start_at("/")
        .group("Keyboard Navigation")
        .scenario("should allow tabbing through navigation elements", tab_through_nav)
        .scenario("should allow keyboard navigation to blog posts", keyboard_to_post)
        .scenario("should have proper focus indicators", focus_indicator)
        .group("Keyboard Navigation")
        .viewport(Viewport::MOBILE)
        .scenario("should allow keyboard navigation on mobile menu", keyboard_mobile_menu)
        .group("ARIA and Semantic HTML")
        .viewport(Viewport::default())
        .scenario("should have proper heading hierarchy", heading_hierarchy)
        .scenario("should have proper ARIA labels on interactive elements", aria_labels)
        .scenario("should have proper landmarks", landmarks)
        .scenario("should have descriptive page titles", descriptive_titles)
        .scenario("should have proper table structure", table_structure)
        .group("Images and Media")
        .scenario("should have alt text for images", image_alt_text)
        .scenario("should have proper image dimensions", image_dimensions)
        .group("Color and Contrast")
        .scenario("should not rely solely on color for information", links_identifiable)
        .scenario("should be readable in high contrast mode", readable_text)
        .group("Form Accessibility")
        .scenario("should have proper form labels and structure", form_structure)
        .scenario("should handle form errors accessibly", form_errors)
        .group("Responsive Accessibility")
        .viewport(Viewport::MOBILE)
        .scenario("should maintain accessibility on mobile", mobile_accessibility)
        .scenario("should maintain focus management on mobile", mobile_focus)
        .group("Screen Reader Support")
        .viewport(Viewport::default())
        .scenario(
            "should have proper document structure for screen readers",
            document_structure,
        )
        .scenario("should provide context for dynamic content", table_context)
        .build()
}

async fn tab_through_nav(page: Page) -> E2eResult<()> {
    let order = [
        ".brand-link",
        "a[href*=\"github.com\"]",
        "a[href*=\"linkedin.com\"]",
        "a[href*=\"mailto:\"]",
    ];
    for selector in order {
        page.keyboard_press("Tab").await?;
        expect(&page.locator(selector).first()).to_be_focused().await?;
    }
    Ok(())
}

async fn keyboard_to_post(page: Page) -> E2eResult<()> {
    let link = page.locator("tbody tr").first().locator("a");
    link.focus().await?;
    expect(&link).to_be_focused().await?;

    page.keyboard_press("Enter").await?;
    expect_page(&page)
        .to_have_url(TextMatcher::pattern(r"/posts/\d+")?)
        .await
}

async fn keyboard_mobile_menu(page: Page) -> E2eResult<()> {
    let button = page.locator(".mobile-menu-button");
    if button.count().await? == 0 {
        return Ok(());
    }
    button.focus().await?;
    expect(&button).to_be_focused().await?;

    page.keyboard_press("Enter").await?;
    expect(&page.locator(".mobile-menu"))
        .to_have_class(TextMatcher::pattern("mobile-menu-open")?)
        .await
}

async fn focus_indicator(page: Page) -> E2eResult<()> {
    page.locator(".brand-link").focus().await?;
    expect(&page.locator(":focus")).to_be_focused().await
}

async fn heading_hierarchy(page: Page) -> E2eResult<()> {
    let headings = page.locator("h1");
    expect(&headings).to_have_count(1).await?;

    let text = headings.first().text_content().await?;
    expect_that(text.chars().count())
        .described_as("main heading length")
        .to_be_greater_than(5)
}

async fn aria_labels(page: Page) -> E2eResult<()> {
    let button = page.locator(".mobile-menu-button");
    if button.count().await? > 0 {
        expect(&button)
            .to_have_attribute("aria-label", "Toggle mobile menu")
            .await?;
    }

    for (i, link) in page
        .locator("a[target=\"_blank\"]")
        .inspect_all()
        .await?
        .iter()
        .enumerate()
    {
        let label = link
            .attribute("title")
            .filter(|t| !t.is_empty())
            .map_or_else(|| link.text.trim().to_string(), str::to_string);
        expect_that(label)
            .described_as(format!("title or text of external link #{i}"))
            .to_be_truthy()?;
    }
    Ok(())
}

async fn landmarks(page: Page) -> E2eResult<()> {
    expect(&page.locator("main")).to_be_visible().await?;
    expect(&page.locator("nav")).to_be_visible().await?;
    expect(&page.locator("header")).to_be_visible().await?;

    let footer = page.locator("footer");
    if footer.count().await? > 0 {
        expect(&footer).to_be_visible().await?;
    }
    Ok(())
}

async fn descriptive_titles(page: Page) -> E2eResult<()> {
    expect_page(&page)
        .to_have_title(TextMatcher::pattern("Willian")?)
        .await?;

    page.goto("/posts/1").await?;
    let title = page.title().await?;
    expect_that(title.chars().count())
        .described_as("post title length")
        .to_be_greater_than(10)?;
    expect_that(title)
        .described_as("post title")
        .not_to_equal(HOME_TITLE.to_string())
}

async fn table_structure(page: Page) -> E2eResult<()> {
    let table = page.locator("table");
    if table.count().await? == 0 {
        return Ok(());
    }
    let thead = table.locator("thead");
    expect(&thead).to_be_visible().await?;
    expect(&thead.locator("th")).to_have_count_greater_than(0).await?;

    let title_header = page.locator("th:has-text(\"Title\")");
    if title_header.count().await? > 0 {
        expect(&title_header).to_have_attribute("scope", "col").await?;
    }
    Ok(())
}

async fn image_alt_text(page: Page) -> E2eResult<()> {
    for (i, img) in page.locator("img").inspect_all().await?.iter().enumerate() {
        expect_that(img.attribute("alt"))
            .described_as(format!("alt text of image #{i}"))
            .to_be_truthy()?;
    }
    Ok(())
}

async fn image_dimensions(page: Page) -> E2eResult<()> {
    for (i, img) in page.locator("img").inspect_all().await?.iter().enumerate() {
        let (Some(width), Some(height)) = (img.attribute("width"), img.attribute("height")) else {
            continue;
        };
        for (name, value) in [("width", width), ("height", height)] {
            expect_that(value.trim().parse::<u32>().unwrap_or(0))
                .described_as(format!("{name} of image #{i}"))
                .to_be_greater_than(0)?;
        }
    }
    Ok(())
}

async fn links_identifiable(page: Page) -> E2eResult<()> {
    expect(&page.locator("a")).to_have_count_greater_than(0).await
}

async fn readable_text(page: Page) -> E2eResult<()> {
    let text = page.locator("body").text_content().await?;
    expect_that(text.chars().count())
        .described_as("body text length")
        .to_be_greater_than(50)
}

async fn form_structure(page: Page) -> E2eResult<()> {
    let form = page.locator(".subscribe-form");
    if form.count().await? == 0 {
        return Ok(());
    }
    let input = form.locator("input[type=\"email\"]");
    expect(&input).to_have_attribute("type", "email").await?;
    expect(&input).to_have_attribute_present("required").await?;
    expect_that(input.get_attribute("placeholder").await?)
        .described_as("email placeholder")
        .to_be_truthy()
}

async fn form_errors(page: Page) -> E2eResult<()> {
    let form = page.locator(".subscribe-form");
    if form.count().await? == 0 {
        return Ok(());
    }
    page.route(
        SUBSCRIBE_PATH,
        MockResponse::json(400, &serde_json::json!({ "message": "Invalid email address" })),
    )
    .await?;

    form.locator("input[type=\"email\"]").fill("invalid@").await?;
    form.locator("button[type=\"button\"]").click().await?;

    let error = form.locator(".error");
    if error.count().await? > 0 {
        expect(&error).to_be_visible().await?;
        expect_that(error.text_content().await?)
            .described_as("error text")
            .to_be_truthy()?;
    }
    Ok(())
}

async fn mobile_accessibility(page: Page) -> E2eResult<()> {
    expect(&page.locator("nav")).to_be_visible().await?;

    let button = page.locator(".mobile-menu-button");
    if button.count().await? > 0 {
        expect(&button).to_be_visible().await?;
        expect(&button).to_have_attribute_present("aria-label").await?;
    }
    expect(&page.locator("h1")).to_be_visible().await
}

async fn mobile_focus(page: Page) -> E2eResult<()> {
    let button = page.locator(".mobile-menu-button");
    if button.count().await? == 0 {
        return Ok(());
    }
    button.focus().await?;
    expect(&button).to_be_focused().await?;

    page.keyboard_press("Enter").await?;
    expect(&page.locator(":focus")).to_have_count_greater_than(0).await
}

async fn document_structure(page: Page) -> E2eResult<()> {
    expect(&page.locator("html")).to_have_attribute("lang", "en").await?;
    expect(&page.locator("title")).to_have_count(1).await?;
    expect(&page.locator("meta[name=\"viewport\"]"))
        .to_have_attribute("content", TextMatcher::pattern("width=device-width")?)
        .await
}

async fn table_context(page: Page) -> E2eResult<()> {
    let table = page.locator("table");
    if table.count().await? == 0 {
        return Ok(());
    }
    let captions = table.locator("caption").count().await?;
    let headers = table.locator("th").count().await?;
    expect_that(captions + headers)
        .described_as("table captions and headers")
        .to_be_greater_than(0)
}
