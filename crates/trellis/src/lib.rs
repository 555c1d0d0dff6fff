//! Trellis: Page-Object Testing for Browser UIs
//!
//! Components are typed Rust values bound to a DOM location. Every operation
//! resolves the location again and waits for the element to be usable.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   compile   ┌──────────┐  find_elements  ┌──────────┐
//! │ Locator  │────────────►│ CSS or   │────────────────►│  Driver  │
//! │  tree    │             │  XPath   │                 │          │
//! └──────────┘             └──────────┘                 └────┬─────┘
//!                                                            │ facts
//! ┌──────────┐   waits     ┌──────────┐   validate      ┌────▼─────┐
//! │  Ready   │◄────────────│Component │◄────────────────│   Rule   │
//! └──────────┘             └──────────┘                 └──────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use trellis::prelude::*;
//! use trellis::locator::predicate::{id, text};
//! use trellis::mock::{ElementSpec, FixtureDom};
//!
//! let dom = FixtureDom::new();
//! dom.append(
//!     &dom.document(),
//!     ElementSpec::new("form")
//!         .id("login")
//!         .child(ElementSpec::new("input").attr("type", "text").attr("name", "user"))
//!         .child(ElementSpec::new("button").text("Sign in")),
//! )
//! .unwrap();
//!
//! let page = Page::new(Session::new(dom.clone(), TrellisConfig::default()));
//! let form = Locator::descendant("form", [id("login")]);
//! let user: Textbox = page.component(form.then_child("input", [])).unwrap();
//! let submit: Button = page
//!     .component(form.then_child("button", [text().is("Sign in")]))
//!     .unwrap();
//!
//! user.enter_text("ada").unwrap();
//! submit.click().unwrap();
//! assert_eq!(user.value().unwrap(), "ada");
//! ```

#![warn(missing_docs)]

#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod collection;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod component;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod config;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod driver;
/// Locator algebra: immutable locator trees compiled to CSS or XPath
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod locator;
/// Tracing subscriber setup
#[allow(clippy::missing_errors_doc)]
pub mod logging;
/// In-memory DOM driver for tests
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown,
    clippy::indexing_slicing
)]
pub mod mock;
mod result;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
mod rule;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod scope;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod wait;

pub use collection::{ComponentCollection, Items};
pub use component::{
    AnimationSettleable, Button, Checkbox, Component, ComponentType, Displayable, Enableable,
    GenericComponent, LifecycleState, Link, Locatable, RuleValidated, Scoped, Textbox,
};
pub use config::{
    Browser, LogConfig, TrellisConfig, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};
pub use driver::{BoundingBox, Driver, ElementFacts, ElementHandle, Interaction, Session};
pub use locator::{Anchor, Combinator, CompiledLocator, Dialect, Locator, LocatorNode, Predicate};
pub use result::{Cause, EntryKey, TrellisError, TrellisResult};
pub use rule::{ClassRule, ComponentRule, Facet, FacetRule, RuleBuilder, RuleViolation};
pub use scope::{Dialog, DialogScope, Frame, Page, PageType};
pub use wait::{sleep, Wait, WaitFor, WaitOutcome};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::collection::*;
    pub use super::component::*;
    pub use super::config::*;
    pub use super::driver::*;
    pub use super::locator::{CompiledLocator, Dialect, Locator, Predicate};
    pub use super::result::*;
    pub use super::rule::*;
    pub use super::scope::*;
    pub use super::wait::{Wait, WaitFor, WaitOutcome};
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::predicate::{attr, id};
    use crate::mock::{ElementSpec, FixtureDom};

    mod prelude_tests {
        use super::*;

        #[test]
        fn test_reexports_cover_a_page_flow() {
            let dom = FixtureDom::new();
            dom.append(
                &dom.document(),
                ElementSpec::new("nav")
                    .id("main")
                    .child(ElementSpec::new("a").attr("href", "/docs").text("Docs"))
                    .child(ElementSpec::new("a").attr("href", "/blog").text("Blog")),
            )
            .unwrap();
            let page = Page::new(Session::new(dom, TrellisConfig::default()));
            let links: ComponentCollection<Link> = page
                .collection(Locator::descendant("nav", [id("main")]).then_child("a", [attr("href").is_present()]))
                .unwrap();
            assert_eq!(links.texts().unwrap(), vec!["Docs", "Blog"]);
            assert_eq!(
                links.by_key("Blog").unwrap().href().unwrap().as_deref(),
                Some("/blog")
            );
        }
    }
}
