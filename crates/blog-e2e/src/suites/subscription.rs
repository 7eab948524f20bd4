//! Newsletter subscribe form in the footer.
//!
//! Every scenario is conditional on the form being rendered, so a build
//! without the newsletter still passes.

use std::time::Duration;

use crate::expect::{expect, expect_that, TextMatcher};
use crate::locator::Locator;
use crate::network::{AbortReason, MockResponse};
use crate::page::Page;
use crate::result::E2eResult;
use crate::scenario::{Scenario, SuiteBuilder};

use super::SUBSCRIBE_PATH;

/// Suite name
pub const SUITE: &str = "Newsletter Subscription Form";

/// Scenarios of this suite
pub fn scenarios() -> Vec<Scenario> {
    SuiteBuilder::new(SUITE)
        .start_at("/")
        .scenario("should display subscription form elements if present", form_elements)
        .scenario("should handle empty email submission", empty_submission)
        .scenario("should validate email format", email_format)
        .scenario("should show loading state during submission", loading_state)
        .scenario("should handle successful subscription", successful_subscription)
        .scenario("should handle subscription errors", subscription_error)
        .scenario("should reset form after error", reset_after_error)
        .scenario("should reset form after success", reset_after_success)
        .scenario("should handle network errors", network_error)
        .scenario("should be accessible via keyboard", keyboard_access)
        .build()
}

/// The form and its email input and submit button, if rendered
struct Form {
    root: Locator,
    input: Locator,
    submit: Locator,
}

impl Form {
    async fn find(page: &Page) -> E2eResult<Option<Self>> {
        let root = page.locator(".subscribe-form");
        if root.count().await? == 0 {
            return Ok(None);
        }
        Ok(Some(Self {
            input: root.locator("input[type=\"email\"]"),
            submit: root.locator("button[type=\"button\"]"),
            root,
        }))
    }

    async fn submit_with(&self, email: &str) -> E2eResult<()> {
        self.input.fill(email).await?;
        self.submit.click().await
    }
}

fn reply(status: u16, message: &str) -> MockResponse {
    MockResponse::json(status, &serde_json::json!({ "message": message }))
}

async fn form_elements(page: Page) -> E2eResult<()> {
    let Some(form) = Form::find(&page).await? else {
        return Ok(());
    };
    expect(&form.root).to_be_visible().await?;

    expect(&form.input).to_be_visible().await?;
    expect(&form.input)
        .to_have_attribute("placeholder", "Enter your email")
        .await?;
    expect(&form.input).to_have_attribute_present("required").await?;

    expect(&form.submit).to_be_visible().await?;
    expect(&form.submit).to_have_text("Subscribe").await
}

async fn empty_submission(page: Page) -> E2eResult<()> {
    let Some(form) = Form::find(&page).await? else {
        return Ok(());
    };
    form.submit_with("").await?;
    expect(&form.submit).to_have_text("Subscribe").await
}

async fn email_format(page: Page) -> E2eResult<()> {
    let Some(form) = Form::find(&page).await? else {
        return Ok(());
    };
    form.submit_with("invalid-email").await?;
    expect_that(form.input.validation_message().await?)
        .described_as("validation message of an address without '@'")
        .to_be_truthy()
}

async fn loading_state(page: Page) -> E2eResult<()> {
    let Some(form) = Form::find(&page).await? else {
        return Ok(());
    };
    form.input.fill("test@example.com").await?;
    page.route(
        SUBSCRIBE_PATH,
        reply(200, "Successfully subscribed!").with_delay(Duration::from_secs(1)),
    )
    .await?;
    form.submit.click().await?;

    expect(&form.submit).to_have_text("Subscribing...").await?;
    expect(&form.input).to_be_disabled().await?;
    expect(&form.submit)
        .with_timeout(Duration::from_secs(5))
        .to_have_text("Subscribe")
        .await
}

async fn successful_subscription(page: Page) -> E2eResult<()> {
    let Some(form) = Form::find(&page).await? else {
        return Ok(());
    };
    page.route(
        SUBSCRIBE_PATH,
        reply(200, "Successfully subscribed! Check your email for confirmation."),
    )
    .await?;
    form.submit_with("success@example.com").await?;

    let success = form.root.locator(".success");
    expect(&success).to_be_visible().await?;
    expect(&success.locator("p"))
        .to_contain_text("Successfully subscribed")
        .await?;
    expect(&success.locator("button"))
        .to_have_text("Subscribe another")
        .await?;
    expect(&form.input).to_have_value("").await
}

async fn subscription_error(page: Page) -> E2eResult<()> {
    let Some(form) = Form::find(&page).await? else {
        return Ok(());
    };
    page.route(SUBSCRIBE_PATH, reply(400, "Email already subscribed"))
        .await?;
    form.submit_with("existing@example.com").await?;

    let error = form.root.locator(".error");
    expect(&error).to_be_visible().await?;
    expect(&error.locator("p"))
        .to_contain_text("Email already subscribed")
        .await?;
    expect(&error.locator("button")).to_have_text("Try again").await
}

async fn reset_after_error(page: Page) -> E2eResult<()> {
    let Some(form) = Form::find(&page).await? else {
        return Ok(());
    };
    page.route(SUBSCRIBE_PATH, reply(400, "Validation error")).await?;
    form.submit_with("error@example.com").await?;

    let error = form.root.locator(".error");
    expect(&error).to_be_visible().await?;
    error.locator("button").click().await?;

    expect(&error).not().to_be_visible().await?;
    expect(&form.submit).to_have_text("Subscribe").await
}

async fn reset_after_success(page: Page) -> E2eResult<()> {
    let Some(form) = Form::find(&page).await? else {
        return Ok(());
    };
    page.route(SUBSCRIBE_PATH, reply(200, "Successfully subscribed!"))
        .await?;
    form.submit_with("success@example.com").await?;

    let success = form.root.locator(".success");
    expect(&success).to_be_visible().await?;
    success.locator("button").click().await?;

    expect(&success).not().to_be_visible().await?;
    expect(&form.submit).to_have_text("Subscribe").await?;
    expect(&form.input).not().to_be_disabled().await
}

async fn network_error(page: Page) -> E2eResult<()> {
    let Some(form) = Form::find(&page).await? else {
        return Ok(());
    };
    page.route_abort(SUBSCRIBE_PATH, AbortReason::InternetDisconnected)
        .await?;
    form.submit_with("network@example.com").await?;

    let error = form.root.locator(".error");
    expect(&error)
        .with_timeout(Duration::from_secs(10))
        .to_be_visible()
        .await?;
    expect(&error.locator("p"))
        .to_have_text(TextMatcher::pattern("(?i)network error|error")?)
        .await
}

async fn keyboard_access(page: Page) -> E2eResult<()> {
    let Some(form) = Form::find(&page).await? else {
        return Ok(());
    };
    form.input.focus().await?;
    expect(&form.input).to_be_focused().await?;
    form.input.fill("keyboard@example.com").await?;

    page.keyboard_press("Tab").await?;
    expect(&form.submit).to_be_focused().await?;
    expect_that(form.submit.text_content().await?)
        .described_as("submit button text")
        .to_equal("Subscribe".to_string())
}
