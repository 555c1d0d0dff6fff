//! Scope Containers (Feature 6)
//!
//! - [`Page`]: root scope bound to a session; components created from it
//!   resolve against the current document
//! - [`Dialog`]: same-document scope whose children wait for it to be displayed
//! - [`Frame`]: `frame`/`iframe` element whose content is a separate document,
//!   entered for the duration of a closure
//!
//! ## Example
//!
//! ```
//! use trellis::prelude::*;
//! use trellis::locator::predicate::id;
//! use trellis::mock::{ElementSpec, FixtureDom};
//!
//! let dom = FixtureDom::new();
//! dom.append(
//!     &dom.document(),
//!     ElementSpec::new("div")
//!         .id("confirm")
//!         .child(ElementSpec::new("button").id("ok").text("OK")),
//! )
//! .unwrap();
//!
//! let page = Page::new(Session::new(dom.clone(), TrellisConfig::default()));
//! let dialog: Dialog = page.component(Locator::descendant("div", [id("confirm")])).unwrap();
//! let ok: Button = dialog.child(Locator::child("button", [id("ok")])).unwrap();
//! assert_eq!(ok.label().unwrap(), "OK");
//! ```

use std::any::type_name;

use tracing::{debug, warn};

use crate::collection::ComponentCollection;
use crate::component::{Component, ComponentType, Displayable, Locatable, Scoped};
use crate::driver::Session;
use crate::locator::Locator;
use crate::result::{TrellisError, TrellisResult};
use crate::rule::RuleBuilder;

// =============================================================================
// PAGE
// =============================================================================

/// Root scope of a session
#[derive(Debug, Clone)]
pub struct Page {
    session: Session,
}

impl Page {
    /// Create a page over a session
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Open a page type, running its readiness hook
    ///
    /// A failure in [`PageType::wrap`] is wrapped in `PageCreation`; a
    /// failure in the readiness hook is wrapped in `UnexpectedPage`.
    pub fn open<P: PageType>(session: &Session) -> TrellisResult<P> {
        let page = P::wrap(Self::new(session.clone())).map_err(|err| TrellisError::PageCreation {
            type_name: type_name::<P>().to_string(),
            source: Box::new(err),
        })?;
        match page.additional_wait() {
            Ok(()) => {
                debug!(page = type_name::<P>(), "page ready");
                Ok(page)
            }
            Err(err) => Err(TrellisError::UnexpectedPage {
                type_name: type_name::<P>().to_string(),
                source: Box::new(err),
            }),
        }
    }

    /// Session of the page
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Component resolved against the document
    pub fn component<T: ComponentType>(&self, locator: Locator) -> TrellisResult<T> {
        Component::create(self.session.clone(), locator, None)
    }

    /// Collection resolved against the document
    pub fn collection<T: ComponentType>(&self, locator: Locator) -> TrellisResult<ComponentCollection<T>> {
        ComponentCollection::new(self.session.clone(), locator, None)
    }
}

/// A typed page
pub trait PageType: Sized {
    /// Wrap the root scope, building any components the page holds
    fn wrap(page: Page) -> TrellisResult<Self>;

    /// The root scope
    fn page(&self) -> &Page;

    /// Readiness hook run by [`Page::open`]
    fn additional_wait(&self) -> TrellisResult<()> {
        Ok(())
    }
}

impl PageType for Page {
    fn wrap(page: Page) -> TrellisResult<Self> {
        Ok(page)
    }

    fn page(&self) -> &Page {
        self
    }
}

// =============================================================================
// DIALOG
// =============================================================================

/// Scope whose children only resolve while it is displayed
pub trait DialogScope: Scoped {
    /// Wait until displayed and ready, run `body`, then wait until hidden
    fn within<R, F>(&self, body: F) -> TrellisResult<R>
    where
        F: FnOnce(&Self) -> TrellisResult<R>,
    {
        self.wait_for_displayed()?;
        self.additional_wait()?;
        let result = body(self)?;
        self.wait_for_hidden()?;
        Ok(result)
    }
}

/// Generic dialog accepting any element
#[derive(Debug, Clone)]
pub struct Dialog(Component);

impl Locatable for Dialog {
    fn component(&self) -> &Component {
        &self.0
    }
}

impl ComponentType for Dialog {
    fn wrap(component: Component) -> Self {
        Self(component)
    }
}

impl Scoped for Dialog {
    fn gates_children(&self) -> bool {
        true
    }
}

impl DialogScope for Dialog {}

// =============================================================================
// FRAME
// =============================================================================

/// `frame` or `iframe` element hosting another document
#[derive(Debug, Clone)]
pub struct Frame(Component);

impl Locatable for Frame {
    fn component(&self) -> &Component {
        &self.0
    }
}

impl ComponentType for Frame {
    fn rules(rules: &mut RuleBuilder) {
        rules.tag().is_one_of(["frame", "iframe"]);
    }

    fn wrap(component: Component) -> Self {
        Self(component)
    }
}

/// Leaves the frame when dropped
struct FrameGuard<'a> {
    session: &'a Session,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.session.driver().exit_frame() {
            warn!(error = %err, "failed to leave frame");
        }
    }
}

impl Frame {
    /// Enter the frame, open its content page `C`, and run `body`
    ///
    /// The frame is left on every exit path, including errors and panics.
    pub fn within<C, R, F>(&self, body: F) -> TrellisResult<R>
    where
        C: PageType,
        F: FnOnce(&C) -> TrellisResult<R>,
    {
        self.wait_for_displayed()?;
        let handle = self.0.find()?;
        let session = self.0.session();
        session.driver().enter_frame(&handle)?;
        let _guard = FrameGuard { session };
        debug!(frame = %handle, "entered frame");
        let content = Page::open::<C>(session)?;
        body(&content)
    }
}
