//! Driver Boundary
//!
//! The browser automation backend is an external collaborator. Trellis only
//! needs it to run compiled queries, report element facts, switch frames and
//! perform interactions.
//!
//! ```text
//! ┌────────────┐   CompiledLocator    ┌──────────────┐
//! │ Component  │ ───────────────────► │ dyn Driver   │ ──► WebDriver, CDP,
//! │ resolution │ ◄─────────────────── │              │     FixtureDom, ...
//! └────────────┘ ElementHandle/Facts  └──────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::TrellisConfig;
use crate::locator::CompiledLocator;
use crate::result::TrellisResult;
use crate::wait::Wait;

/// Opaque reference to a live element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    id: String,
}

impl ElementHandle {
    /// Create a handle from a driver-assigned identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Driver-assigned identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Element geometry in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the center point
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Snapshot of what the driver reports about an element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementFacts {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes, including `id` and `class`
    pub attributes: BTreeMap<String, String>,
    /// Rendered text
    pub text: String,
    /// Visible to the user
    pub displayed: bool,
    /// Accepts interaction
    pub enabled: bool,
    /// Checked or selected
    pub selected: bool,
    /// Geometry, when rendered
    pub bounding_box: Option<BoundingBox>,
}

impl ElementFacts {
    /// Attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// `id` attribute
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// Classes listed in the `class` attribute
    #[must_use]
    pub fn classes(&self) -> Vec<&str> {
        self.attribute("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Interaction performed on an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interaction {
    /// Single click
    Click,
    /// Double click
    DoubleClick,
    /// Clear an editable value
    Clear,
    /// Type text into an editable element
    TypeText(String),
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click => write!(f, "click"),
            Self::DoubleClick => write!(f, "double-click"),
            Self::Clear => write!(f, "clear"),
            Self::TypeText(text) => write!(f, "type {text:?}"),
        }
    }
}

/// Browser automation backend
///
/// Implementations report detached elements as `StaleElement` and
/// recoverable hiccups as transient `Driver` errors.
pub trait Driver: Send + Sync {
    /// Run a query from `scope`, or from the current document when `None`,
    /// returning matches in document order
    fn find_elements(
        &self,
        scope: Option<&ElementHandle>,
        locator: &CompiledLocator,
    ) -> TrellisResult<Vec<ElementHandle>>;

    /// Read the current facts of an element
    fn element_facts(&self, element: &ElementHandle) -> TrellisResult<ElementFacts>;

    /// Make the frame element's document current
    fn enter_frame(&self, frame: &ElementHandle) -> TrellisResult<()>;

    /// Return to the parent document
    fn exit_frame(&self) -> TrellisResult<()>;

    /// Perform an interaction
    fn perform(&self, element: &ElementHandle, interaction: &Interaction) -> TrellisResult<()>;
}

/// A driver plus the configuration it runs under
#[derive(Clone)]
pub struct Session {
    driver: Arc<dyn Driver>,
    config: Arc<TrellisConfig>,
}

impl Session {
    /// Create a session
    #[must_use]
    pub fn new(driver: impl Driver + 'static, config: TrellisConfig) -> Self {
        Self {
            driver: Arc::new(driver),
            config: Arc::new(config),
        }
    }

    /// Create a session from already shared parts
    #[must_use]
    pub fn from_shared(driver: Arc<dyn Driver>, config: Arc<TrellisConfig>) -> Self {
        Self { driver, config }
    }

    /// The driver
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// The configuration
    #[must_use]
    pub fn config(&self) -> &TrellisConfig {
        &self.config
    }

    /// Wait policy from the configuration
    #[must_use]
    pub fn wait(&self) -> Wait {
        Wait::from_config(&self.config)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod facts_tests {
        use super::*;

        #[test]
        fn test_id_and_classes_come_from_attributes() {
            let mut facts = ElementFacts {
                tag: "div".into(),
                ..ElementFacts::default()
            };
            facts.attributes.insert("id".into(), "main".into());
            facts.attributes.insert("class".into(), "  a   b ".into());
            assert_eq!(facts.id(), Some("main"));
            assert_eq!(facts.classes(), vec!["a", "b"]);
            assert_eq!(facts.attribute("title"), None);
        }

        #[test]
        fn test_bounding_box_center() {
            let bbox = BoundingBox::new(10.0, 20.0, 100.0, 40.0);
            assert_eq!(bbox.center(), (60.0, 40.0));
        }
    }

    mod display_tests {
        use super::*;

        #[test]
        fn test_interaction_display() {
            assert_eq!(Interaction::Click.to_string(), "click");
            assert_eq!(
                Interaction::TypeText("hi".into()).to_string(),
                "type \"hi\""
            );
        }
    }
}
