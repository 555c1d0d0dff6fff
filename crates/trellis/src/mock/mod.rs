//! In-Memory DOM Fixture
//!
//! A [`Driver`] backed by an in-memory document, for testing page objects
//! without a browser. It evaluates exactly the CSS and XPath forms the
//! locator compiler emits.
//!
//! - Elements are built from [`ElementSpec`] trees
//! - The DOM can be mutated from any thread while a wait is polling
//! - Frame elements own nested content documents
//! - Every element gets a fresh handle; replaced or removed elements go stale
//!
//! ```
//! use trellis::mock::{ElementSpec, FixtureDom};
//!
//! let dom = FixtureDom::new();
//! let list = dom
//!     .append(
//!         &dom.document(),
//!         ElementSpec::new("ul")
//!             .id("todo")
//!             .child(ElementSpec::new("li").text("write tests"))
//!             .child(ElementSpec::new("li").text("ship")),
//!     )
//!     .unwrap();
//! assert_eq!(dom.text(&list).unwrap(), "write tests ship");
//! ```

mod css;
mod dom;
mod xpath;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::driver::{BoundingBox, Driver, ElementFacts, ElementHandle, Interaction};
use crate::locator::{CompiledLocator, Dialect};
use crate::result::{TrellisError, TrellisResult};
use dom::DomState;

/// Default geometry of fixture elements
pub const DEFAULT_BOUNDING_BOX: BoundingBox = BoundingBox::new(0.0, 0.0, 100.0, 20.0);

// =============================================================================
// ELEMENT SPEC
// =============================================================================

/// Declarative description of an element subtree
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSpec {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    displayed: bool,
    enabled: bool,
    selected: bool,
    bounding_box: Option<BoundingBox>,
    children: Vec<ElementSpec>,
}

impl ElementSpec {
    /// Visible, enabled element with the default geometry
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            displayed: true,
            enabled: true,
            selected: false,
            bounding_box: Some(DEFAULT_BOUNDING_BOX),
            children: Vec::new(),
        }
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Add a class
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        let classes = self.attributes.entry("class".to_string()).or_default();
        if !classes.is_empty() {
            classes.push(' ');
        }
        classes.push_str(class);
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the element's own text
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Start hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Start disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Start selected
    #[must_use]
    pub const fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Set the geometry
    #[must_use]
    pub const fn bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Append children
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }
}

// =============================================================================
// FIXTURE DOM
// =============================================================================

/// Shared in-memory document implementing [`Driver`]
#[derive(Clone, Default)]
pub struct FixtureDom {
    state: Arc<Mutex<DomState>>,
}

impl fmt::Debug for FixtureDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FixtureDom")
            .field("frame_depth", &state.frame_depth())
            .field("interactions", &state.interactions().len())
            .finish_non_exhaustive()
    }
}

impl FixtureDom {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the top-level document node
    #[must_use]
    pub fn document(&self) -> ElementHandle {
        dom::handle(0)
    }

    /// Append a subtree under `parent`
    pub fn append(&self, parent: &ElementHandle, spec: ElementSpec) -> TrellisResult<ElementHandle> {
        self.state.lock().append(parent, &spec)
    }

    /// Replace an element with a new subtree; the old handle goes stale
    pub fn replace(&self, old: &ElementHandle, spec: ElementSpec) -> TrellisResult<ElementHandle> {
        self.state.lock().replace(old, &spec)
    }

    /// Detach an element
    pub fn remove(&self, element: &ElementHandle) -> TrellisResult<()> {
        self.state.lock().remove(element)
    }

    /// Show or hide an element
    pub fn set_displayed(&self, element: &ElementHandle, displayed: bool) -> TrellisResult<()> {
        self.state.lock().update(element, |n| n.displayed = displayed)
    }

    /// Enable or disable an element
    pub fn set_enabled(&self, element: &ElementHandle, enabled: bool) -> TrellisResult<()> {
        self.state.lock().update(element, |n| n.enabled = enabled)
    }

    /// Set an attribute
    pub fn set_attribute(&self, element: &ElementHandle, name: &str, value: &str) -> TrellisResult<()> {
        self.state.lock().update(element, |n| {
            n.attributes.insert(name.to_string(), value.to_string());
        })
    }

    /// Remove an attribute
    pub fn remove_attribute(&self, element: &ElementHandle, name: &str) -> TrellisResult<()> {
        self.state.lock().update(element, |n| {
            n.attributes.remove(name);
        })
    }

    /// Replace the element's own text
    pub fn set_text(&self, element: &ElementHandle, text: &str) -> TrellisResult<()> {
        self.state.lock().update(element, |n| n.text = text.to_string())
    }

    /// Move or resize an element
    pub fn set_bounding_box(&self, element: &ElementHandle, bounding_box: BoundingBox) -> TrellisResult<()> {
        self.state
            .lock()
            .update(element, |n| n.bounding_box = Some(bounding_box))
    }

    /// Content document of a frame element
    pub fn frame_document(&self, frame: &ElementHandle) -> TrellisResult<ElementHandle> {
        self.state.lock().frame_document(frame).map(dom::handle)
    }

    /// Normalized text of an element
    pub fn text(&self, element: &ElementHandle) -> TrellisResult<String> {
        let state = self.state.lock();
        let id = state.resolve(element)?;
        Ok(state.facts(id).text)
    }

    /// Attribute of an element
    pub fn attribute(&self, element: &ElementHandle, name: &str) -> TrellisResult<Option<String>> {
        let state = self.state.lock();
        let id = state.resolve(element)?;
        Ok(state.node(id).attribute(name).map(str::to_string))
    }

    /// Interactions performed so far
    #[must_use]
    pub fn interactions(&self) -> Vec<(ElementHandle, Interaction)> {
        self.state.lock().interactions().to_vec()
    }

    /// Number of frames currently entered
    #[must_use]
    pub fn frame_depth(&self) -> usize {
        self.state.lock().frame_depth()
    }
}

impl Driver for FixtureDom {
    fn find_elements(
        &self,
        scope: Option<&ElementHandle>,
        locator: &CompiledLocator,
    ) -> TrellisResult<Vec<ElementHandle>> {
        let state = self.state.lock();
        let document = state.current_document();
        let scope = scope.map(|s| state.resolve(s)).transpose()?;
        let unsupported = |reason: String| {
            TrellisError::driver(format!("unsupported {locator}: {reason}"))
        };
        let found = match locator.dialect {
            Dialect::Css => css::parse(&locator.expression)
                .map_err(unsupported)?
                .select(&state, scope.unwrap_or(document), scope),
            Dialect::XPath => xpath::parse(&locator.expression)
                .map_err(unsupported)?
                .select(&state, document, scope)
                .map_err(unsupported)?,
        };
        debug!(locator = %locator, matches = found.len(), "fixture query");
        Ok(found.into_iter().map(dom::handle).collect())
    }

    fn element_facts(&self, element: &ElementHandle) -> TrellisResult<ElementFacts> {
        let state = self.state.lock();
        let id = state.resolve(element)?;
        Ok(state.facts(id))
    }

    fn enter_frame(&self, frame: &ElementHandle) -> TrellisResult<()> {
        self.state.lock().enter_frame(frame)
    }

    fn exit_frame(&self) -> TrellisResult<()> {
        self.state.lock().exit_frame()
    }

    fn perform(&self, element: &ElementHandle, interaction: &Interaction) -> TrellisResult<()> {
        self.state.lock().perform(element, interaction)
    }
}
