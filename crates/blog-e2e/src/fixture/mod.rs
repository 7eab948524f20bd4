//! In-process double of the blog's DOM contract.
//!
//! [`FixtureBrowser`] serves a [`BlogSite`]: a declarative description of the
//! posts, navigation links and assets the real site renders. Pages are built
//! as a small element tree ([`dom`]), laid out with a block/inline box model
//! ([`layout`]) and driven through the same [`PageDriver`](crate::PageDriver)
//! trait as Chromium. No HTTP is served and no script runs.

pub mod dom;
pub mod driver;
pub mod form;
pub mod layout;
pub mod site;

pub use dom::{el, Document, El, NodeId};
pub use driver::{FixtureBrowser, FixturePage, DEFAULT_LATENCY, FIXTURE_DRIVER};
pub use form::{FormFault, FormState};
pub use layout::Layout;
pub use site::{Asset, BlogSite, Post, RenderedPage, SocialLink};
