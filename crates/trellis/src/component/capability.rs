//! Capability traits composed by component kinds.
//!
//! Kinds implement [`Locatable`] and [`ComponentType`]; `RuleValidated` and
//! `Displayable` come for free, `Enableable`, `AnimationSettleable` and
//! `Scoped` are opted into per kind.

use std::sync::Arc;

use super::{Component, Gate, LifecycleState, ScopeLink};
use crate::collection::ComponentCollection;
use crate::driver::{ElementFacts, ElementHandle};
use crate::locator::Locator;
use crate::result::TrellisResult;
use crate::rule::{ComponentRule, RuleBuilder, RuleViolation};

/// Anything backed by a [`Component`]
pub trait Locatable {
    /// The underlying component
    fn component(&self) -> &Component;

    /// Wait until present
    fn find(&self) -> TrellisResult<ElementHandle> {
        self.component().find()
    }

    /// Whether the component currently resolves
    fn exists(&self) -> TrellisResult<bool> {
        self.component().exists()
    }

    /// Current lifecycle state
    fn state(&self) -> TrellisResult<LifecycleState> {
        self.component().state()
    }

    /// Visible text
    fn text(&self) -> TrellisResult<String> {
        self.component().text()
    }

    /// Any attribute
    fn attr(&self, name: &str) -> TrellisResult<Option<String>> {
        self.component().attr(name)
    }

    /// Wait until the component no longer resolves
    fn wait_for_absent(&self) -> TrellisResult<()> {
        self.component().wait_for_absent()
    }
}

/// A typed component with a declared rule
///
/// ```
/// use trellis::prelude::*;
///
/// #[derive(Debug, Clone)]
/// struct Badge(Component);
///
/// impl Locatable for Badge {
///     fn component(&self) -> &Component {
///         &self.0
///     }
/// }
///
/// impl ComponentType for Badge {
///     fn rules(rules: &mut RuleBuilder) {
///         rules.tag().is("span");
///         rules.css_classes().has("badge");
///     }
///
///     fn wrap(component: Component) -> Self {
///         Self(component)
///     }
/// }
/// ```
pub trait ComponentType: Locatable + Clone + Send + Sync + 'static {
    /// Declare the structural rule; defaults to accepting any element
    fn rules(rules: &mut RuleBuilder) {
        rules.any();
    }

    /// Wrap a resolved-on-demand component
    fn wrap(component: Component) -> Self;

    /// Key used by [`ComponentCollection::by_key`]; defaults to the text
    fn key(&self) -> TrellisResult<String> {
        self.text()
    }
}

/// Components checked against a structural rule
pub trait RuleValidated: Locatable {
    /// The rule
    fn rule(&self) -> &ComponentRule {
        self.component().rule()
    }

    /// Check facts against the rule
    fn validate(&self, facts: &ElementFacts) -> Result<(), Vec<RuleViolation>> {
        self.rule().validate(facts)
    }
}

impl<T: Locatable> RuleValidated for T {}

/// Components that can be shown and hidden
pub trait Displayable: Locatable {
    /// Wait until visible
    fn wait_for_displayed(&self) -> TrellisResult<()> {
        self.component().wait_for_displayed()
    }

    /// Wait until invisible or gone
    fn wait_for_hidden(&self) -> TrellisResult<()> {
        self.component().wait_for_hidden()
    }

    /// Whether currently visible
    fn is_displayed(&self) -> TrellisResult<bool> {
        self.component().is_displayed()
    }
}

impl<T: Locatable> Displayable for T {}

/// Components that can be enabled, disabled and clicked
pub trait Enableable: Locatable {
    /// Wait until interactable
    fn wait_for_enabled(&self) -> TrellisResult<()> {
        self.component().wait_for_enabled()
    }

    /// Wait until present and not interactable
    fn wait_for_disabled(&self) -> TrellisResult<()> {
        self.component().wait_for_disabled()
    }

    /// Whether currently interactable
    fn is_enabled(&self) -> TrellisResult<bool> {
        self.component().is_enabled()
    }

    /// Click once displayed, settled and enabled
    fn click(&self) -> TrellisResult<()> {
        self.component().click()
    }

    /// Double-click once displayed, settled and enabled
    fn double_click(&self) -> TrellisResult<()> {
        self.component().double_click()
    }
}

/// Components whose geometry may move
pub trait AnimationSettleable: Locatable {
    /// Wait until the geometry settles
    fn wait_for_animation(&self) -> TrellisResult<()> {
        self.component().wait_for_animation()
    }
}

/// Components that contain other components
pub trait Scoped: ComponentType {
    /// Whether children wait for this scope to be displayed
    fn gates_children(&self) -> bool {
        false
    }

    /// Extra readiness check run by the gate after displayed
    ///
    /// Runs inside the gate of this scope's children, so it must not wait on
    /// those children when `gates_children` is set.
    fn additional_wait(&self) -> TrellisResult<()> {
        Ok(())
    }

    /// Component located inside this scope
    fn child<T: ComponentType>(&self, locator: Locator) -> TrellisResult<T> {
        Component::create(self.component().session().clone(), locator, Some(scope_link(self)))
    }

    /// Collection located inside this scope
    fn children<T: ComponentType>(&self, locator: Locator) -> TrellisResult<ComponentCollection<T>> {
        ComponentCollection::new(self.component().session().clone(), locator, Some(scope_link(self)))
    }
}

/// Link from children to `scope`, with its gate when it gates children
pub(crate) fn scope_link<S: Scoped>(scope: &S) -> Arc<ScopeLink> {
    let gate: Option<Gate> = scope.gates_children().then(|| {
        let scope = scope.clone();
        Arc::new(move || {
            scope.wait_for_displayed()?;
            scope.additional_wait()
        }) as Gate
    });
    Arc::new(ScopeLink {
        component: scope.component().clone(),
        gate,
    })
}
