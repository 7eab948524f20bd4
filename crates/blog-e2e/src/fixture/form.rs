//! Newsletter subscribe form behaviour.
//!
//! The form cycles `Idle → Loading → Success | Error → Idle`. While loading,
//! the email input and the submit button are disabled and the button reads
//! `Subscribing...`. The outcome is shown in a result slot below the row
//! as `div.success` or `div.error` with a message paragraph and a reset
//! button.

use std::sync::OnceLock;

use regex::Regex;

use crate::network::MockResponse;

use super::dom::{el, Document, NodeId};

/// Subscribe endpoint path
pub const SUBSCRIBE_PATH: &str = "/api/subscribe";
/// Message when the backend confirms without a readable body
pub const DEFAULT_SUCCESS: &str = "Successfully subscribed!";
/// Built-in backend confirmation
pub const CONFIRMATION: &str = "Successfully subscribed! Check your email for confirmation.";
/// Built-in backend reply for a repeated address
pub const ALREADY_SUBSCRIBED: &str = "You're already subscribed with this email address.";
/// Error shown for a rejected address
pub const INVALID_EMAIL: &str = "Validation error: email: not a valid email address";
/// Error shown when the request never completed
pub const NETWORK_ERROR: &str = "Network error: Failed to fetch";

/// Form state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormState {
    /// Waiting for input
    #[default]
    Idle,
    /// Request in flight
    Loading,
    /// Confirmed, with the server's message
    Success(String),
    /// Rejected or failed, with the reason
    Error(String),
}

/// Turn a subscribe response into the next form state
#[must_use]
pub fn outcome(response: &MockResponse) -> FormState {
    let message = response
        .body_json()
        .and_then(|reply| reply.get("message")?.as_str().map(str::to_string));
    if response.is_ok() {
        FormState::Success(message.unwrap_or_else(|| DEFAULT_SUCCESS.to_string()))
    } else {
        FormState::Error(message.unwrap_or_else(|| format!("HTTP error: {}", response.status)))
    }
}

fn email_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .ok()
    })
    .as_ref()
}

/// Whether `email` is a syntactically valid address
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(email))
}

/// Constraint validation message of a required `type=email` input
#[must_use]
pub fn validation_message(value: &str) -> String {
    if value.is_empty() {
        return "Please fill out this field.".to_string();
    }
    match value.split_once('@') {
        None => format!("Please include an '@' in the email address. '{value}' is missing an '@'."),
        Some(("", _)) => format!("Please enter a part followed by '@'. '{value}' is incomplete."),
        Some((_, "")) => format!("Please enter a part following '@'. '{value}' is incomplete."),
        Some(_) if !is_valid_email(value) => "Please enter an email address.".to_string(),
        Some(_) => String::new(),
    }
}

/// A deliberate defect in how the form renders its states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFault {
    /// The submit button keeps reading `Subscribe` while loading
    StaticButtonLabel,
    /// The result slot is rendered without its message paragraph
    NoResultMessage,
}

/// The form's nodes in a document
#[derive(Debug, Clone, Copy)]
pub struct FormNodes {
    /// `.subscribe-form`
    pub form: NodeId,
    /// Email input
    pub input: NodeId,
    /// Submit button
    pub button: NodeId,
    /// Result slot
    pub slot: NodeId,
}

impl FormNodes {
    /// Locate the form, if the page has one
    #[must_use]
    pub fn find(doc: &Document) -> Option<Self> {
        let form = doc.find_by_class("subscribe-form")?;
        let row = doc
            .children(form)
            .iter()
            .copied()
            .find(|&c| doc.is_element(c))?;
        let slot = doc
            .children(form)
            .iter()
            .rev()
            .copied()
            .find(|&c| doc.is_element(c))?;
        let input = doc
            .children(row)
            .iter()
            .copied()
            .find(|&c| doc.tag(c) == "input")?;
        let button = doc
            .children(row)
            .iter()
            .copied()
            .find(|&c| doc.tag(c) == "button")?;
        Some(Self {
            form,
            input,
            button,
            slot,
        })
    }

    /// Whether `node` is the reset button inside the result slot
    #[must_use]
    pub fn is_reset_button(&self, doc: &Document, node: NodeId) -> bool {
        doc.tag(node) == "button" && doc.parent(node) == Some(self.slot)
    }

    /// Reflect `state` in the document, with `fault` if the site has one
    pub fn apply(&self, doc: &mut Document, state: &FormState, fault: Option<FormFault>) {
        let loading = matches!(state, FormState::Loading);
        let relabel = loading && fault != Some(FormFault::StaticButtonLabel);
        doc.toggle_attr(self.input, "disabled", loading);
        doc.toggle_attr(self.button, "disabled", loading);
        doc.set_text(
            self.button,
            if relabel { "Subscribing..." } else { "Subscribe" },
        );
        if loading && doc.focused().is_some_and(|f| f == self.input || f == self.button) {
            doc.set_focus(None);
        }

        doc.clear_children(self.slot);
        match state {
            FormState::Idle | FormState::Loading => doc.remove_attr(self.slot, "class"),
            FormState::Success(message) | FormState::Error(message) => {
                let (class, reset) = if matches!(state, FormState::Success(_)) {
                    ("success", "Subscribe another")
                } else {
                    ("error", "Try again")
                };
                doc.set_attr(self.slot, "class", class);
                if fault != Some(FormFault::NoResultMessage) {
                    doc.append(self.slot, el("p").text(message.clone()));
                }
                doc.append(self.slot, el("button").text(reset));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod validation_tests {
        use super::*;

        #[test]
        fn test_valid_addresses() {
            assert!(is_valid_email("test@example.com"));
            assert!(is_valid_email("a.b+c@sub.example.co"));
            assert!(!is_valid_email("invalid-email"));
            assert!(!is_valid_email("invalid@"));
            assert!(!is_valid_email("@example.com"));
            assert!(!is_valid_email("a@-example.com"));
        }

        #[test]
        fn test_browser_messages() {
            assert_eq!(validation_message(""), "Please fill out this field.");
            assert_eq!(
                validation_message("invalid-email"),
                "Please include an '@' in the email address. 'invalid-email' is missing an '@'."
            );
            assert_eq!(
                validation_message("invalid@"),
                "Please enter a part following '@'. 'invalid@' is incomplete."
            );
            assert!(validation_message("ok@example.com").is_empty());
        }
    }

    mod outcome_tests {
        use super::*;

        #[test]
        fn test_success_uses_message() {
            let response = MockResponse::json(200, &serde_json::json!({"message": "Welcome!"}));
            assert_eq!(outcome(&response), FormState::Success("Welcome!".into()));
        }

        #[test]
        fn test_fallback_messages() {
            assert_eq!(
                outcome(&MockResponse::text(200, "ok")),
                FormState::Success(DEFAULT_SUCCESS.into())
            );
            assert_eq!(
                outcome(&MockResponse::text(502, "bad gateway")),
                FormState::Error("HTTP error: 502".into())
            );
        }

        #[test]
        fn test_error_uses_message() {
            let response =
                MockResponse::json(400, &serde_json::json!({"message": "Email already subscribed"}));
            assert_eq!(outcome(&response), FormState::Error("Email already subscribed".into()));
        }

        #[test]
        fn test_non_string_message_falls_back() {
            let response = MockResponse::json(200, &serde_json::json!({"message": 42}));
            assert_eq!(outcome(&response), FormState::Success(DEFAULT_SUCCESS.into()));
            let response = MockResponse::json(503, &serde_json::json!(["busy"]));
            assert_eq!(outcome(&response), FormState::Error("HTTP error: 503".into()));
        }
    }

    mod render_tests {
        use super::*;
        use crate::fixture::BlogSite;

        fn form_doc() -> (Document, FormNodes) {
            let doc = BlogSite::default().render("/").document;
            let nodes = FormNodes::find(&doc).unwrap();
            (doc, nodes)
        }

        #[test]
        fn test_loading_disables_controls() {
            let (mut doc, nodes) = form_doc();
            nodes.apply(&mut doc, &FormState::Loading, None);
            assert!(doc.is_disabled(nodes.input));
            assert!(doc.is_disabled(nodes.button));
            assert_eq!(doc.text_content(nodes.button), "Subscribing...");
        }

        #[test]
        fn test_error_then_idle() {
            let (mut doc, nodes) = form_doc();
            nodes.apply(&mut doc, &FormState::Error("nope".into()), None);
            assert!(doc.has_class(nodes.slot, "error"));
            assert_eq!(doc.text_content(nodes.slot), "nopeTry again");
            let reset = doc.children(nodes.slot)[1];
            assert!(nodes.is_reset_button(&doc, reset));
            assert!(!nodes.is_reset_button(&doc, nodes.button));

            nodes.apply(&mut doc, &FormState::Idle, None);
            assert_eq!(doc.attr(nodes.slot, "class"), None);
            assert!(doc.children(nodes.slot).is_empty());
            assert!(!doc.is_disabled(nodes.input));
            assert_eq!(doc.text_content(nodes.button), "Subscribe");
        }

        #[test]
        fn test_static_label_fault() {
            let (mut doc, nodes) = form_doc();
            nodes.apply(&mut doc, &FormState::Loading, Some(FormFault::StaticButtonLabel));
            assert!(doc.is_disabled(nodes.button));
            assert_eq!(doc.text_content(nodes.button), "Subscribe");
        }

        #[test]
        fn test_missing_message_fault() {
            let (mut doc, nodes) = form_doc();
            let fault = Some(FormFault::NoResultMessage);
            nodes.apply(&mut doc, &FormState::Success("Welcome!".into()), fault);
            assert!(doc.has_class(nodes.slot, "success"));
            assert_eq!(doc.children(nodes.slot).len(), 1);
            assert_eq!(doc.text_content(nodes.slot), "Subscribe another");
        }
    }
}
