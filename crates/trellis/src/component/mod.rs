//! Component Resolution & Lifecycle (Feature 4)
//!
//! A [`Component`] is a locator plus a structural rule, bound to a session and
//! optionally to a parent scope. It holds no element: every operation resolves
//! the locator again, so a re-rendered element is picked up transparently.
//!
//! ## Lifecycle
//!
//! ```text
//! Unresolved -> Found -> Displayed -> (Animating) -> Ready
//! ```
//!
//! - `find` waits for `Found`
//! - `wait_for_displayed`, `wait_for_animation`, `wait_for_enabled` wait for
//!   the later states, each with its own timeout error
//! - interactions wait for displayed, then stopped animating, then enabled
//! - before any wait, gated ancestor scopes (dialogs) must be ready

mod capability;
mod kinds;

pub use capability::{
    AnimationSettleable, ComponentType, Displayable, Enableable, Locatable, RuleValidated, Scoped,
};
pub use kinds::{Button, Checkbox, GenericComponent, Link, Textbox};

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::driver::{BoundingBox, ElementFacts, ElementHandle, Interaction, Session};
use crate::locator::{CompiledLocator, Locator};
use crate::rule::{ComponentRule, RuleBuilder};
use crate::result::{TrellisError, TrellisResult};
use crate::wait::{sleep, WaitFor};

/// Readiness gate run before anything inside a scope resolves
pub(crate) type Gate = Arc<dyn Fn() -> TrellisResult<()> + Send + Sync>;

/// Parent scope of a component
pub(crate) struct ScopeLink {
    pub component: Component,
    pub gate: Option<Gate>,
}

/// Which accepted candidate a component binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding {
    First,
    Item(usize),
}

impl Binding {
    const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Item(index) => index,
        }
    }
}

/// Lifecycle state observed by [`Component::state`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No element passes the locator and rules
    Unresolved,
    /// Resolved but not visible
    Found,
    /// Visible but not interactable
    Displayed,
    /// Visible with moving geometry
    Animating,
    /// Visible, settled and enabled
    Ready,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unresolved => "unresolved",
            Self::Found => "found",
            Self::Displayed => "displayed",
            Self::Animating => "animating",
            Self::Ready => "ready",
        };
        write!(f, "{name}")
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Element missing or detached, as opposed to a driver failure
fn is_gone(err: &TrellisError) -> bool {
    matches!(
        err,
        TrellisError::ElementNotFound { .. } | TrellisError::StaleElement { .. }
    )
}

// =============================================================================
// COMPONENT
// =============================================================================

/// Located, rule-validated UI element
#[derive(Clone)]
pub struct Component {
    session: Session,
    locator: Locator,
    rule: Arc<ComponentRule>,
    scope: Option<Arc<ScopeLink>>,
    binding: Binding,
    type_name: &'static str,
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("type_name", &self.type_name)
            .field("locator", &self.locator)
            .field("binding", &self.binding)
            .field("scoped", &self.scope.is_some())
            .finish_non_exhaustive()
    }
}

impl Component {
    /// Build a component of type `T`; invalid rules fail with `ComponentCreation`
    pub(crate) fn create<T: ComponentType>(
        session: Session,
        locator: Locator,
        scope: Option<Arc<ScopeLink>>,
    ) -> TrellisResult<T> {
        let type_name = short_type_name::<T>();
        let rule = ComponentRule::build(type_name, |rules: &mut RuleBuilder| T::rules(rules))?;
        Ok(T::wrap(Self {
            session,
            locator,
            rule: Arc::new(rule),
            scope,
            binding: Binding::First,
            type_name,
        }))
    }

    /// Same component bound to the `index`-th accepted candidate
    pub(crate) fn item(&self, index: usize) -> Self {
        Self {
            binding: Binding::Item(index),
            ..self.clone()
        }
    }

    pub(crate) fn scope_component(&self) -> Option<&Self> {
        self.scope.as_ref().map(|link| &link.component)
    }

    /// Session the component belongs to
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Locator of the component
    #[must_use]
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Structural rule of the component type
    #[must_use]
    pub fn rule(&self) -> &ComponentRule {
        &self.rule
    }

    /// Short type name used in errors and logs
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the locator resolves inside a parent scope
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.scope.is_some() && !self.locator.is_page_anchored()
    }

    /// Compiled query the component resolves with
    pub fn compiled(&self) -> TrellisResult<CompiledLocator> {
        self.locator.compile(self.is_scoped())
    }

    fn describe(&self) -> String {
        self.compiled()
            .map_or_else(|_| self.locator.to_string(), |c| c.to_string())
    }

    // -------------------------------------------------------------------------
    // resolution
    // -------------------------------------------------------------------------

    fn scope_element(&self) -> TrellisResult<Option<ElementHandle>> {
        match self.scope_component() {
            Some(parent) if !self.locator.is_page_anchored() => parent.try_resolve().map(Some),
            _ => Ok(None),
        }
    }

    /// Every candidate passing the rule, in document order
    pub(crate) fn accepted(&self) -> TrellisResult<Vec<ElementHandle>> {
        let (_, accepted, _) = self.candidates(usize::MAX)?;
        Ok(accepted)
    }

    /// Accepted candidates up to `limit`, plus the first rejection
    fn candidates(
        &self,
        limit: usize,
    ) -> TrellisResult<(CompiledLocator, Vec<ElementHandle>, Option<String>)> {
        let scope = self.scope_element()?;
        let compiled = self.locator.compile(scope.is_some())?;
        let driver = self.session.driver();
        let found = driver.find_elements(scope.as_ref(), &compiled)?;
        trace!(component = self.type_name, locator = %compiled, candidates = found.len(), "resolving");

        let mut accepted = Vec::new();
        let mut rejection = None;
        for handle in found {
            if accepted.len() >= limit {
                break;
            }
            let facts = driver.element_facts(&handle)?;
            match self.rule.validate(&facts) {
                Ok(()) => accepted.push(handle),
                Err(violations) => {
                    rejection.get_or_insert_with(|| {
                        violations
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join("; ")
                    });
                }
            }
        }
        Ok((compiled, accepted, rejection))
    }

    /// Resolve once, without waiting
    pub fn try_resolve(&self) -> TrellisResult<ElementHandle> {
        let index = self.binding.index();
        let (compiled, mut accepted, rejection) = self.candidates(index.saturating_add(1))?;
        if index < accepted.len() {
            return Ok(accepted.swap_remove(index));
        }
        let reason = match (rejection, self.binding) {
            (Some(violations), _) if accepted.is_empty() => format!(
                "no candidate passed the rules of {}; first candidate: {violations}",
                self.type_name
            ),
            (_, Binding::Item(index)) if !accepted.is_empty() => format!(
                "only {} {} candidates, no entry at index {index}",
                accepted.len(),
                self.type_name
            ),
            _ => "no element matched".to_string(),
        };
        Err(TrellisError::ElementNotFound {
            expression: compiled.to_string(),
            timeout_ms: None,
            reason,
            source: None,
        })
    }

    fn current_facts(&self) -> TrellisResult<ElementFacts> {
        let handle = self.try_resolve()?;
        self.session.driver().element_facts(&handle)
    }

    /// Run the readiness gates of the enclosing scopes
    pub(crate) fn pass_scope_gates(&self) -> TrellisResult<()> {
        match &self.scope {
            Some(link) => match &link.gate {
                Some(gate) => gate(),
                None => link.component.pass_scope_gates(),
            },
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // waits
    // -------------------------------------------------------------------------

    fn await_condition<F>(&self, condition: WaitFor, attempt: F) -> TrellisResult<()>
    where
        F: FnMut() -> TrellisResult<bool>,
    {
        let wait = self.session.wait();
        match wait.until(attempt) {
            Ok(outcome) => {
                debug!(
                    component = self.type_name,
                    %condition,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "component ready"
                );
                Ok(())
            }
            Err(err) => Err(condition.timeout_error(self.type_name, &self.describe(), err)),
        }
    }

    /// Wait until the component resolves
    pub fn find(&self) -> TrellisResult<ElementHandle> {
        self.pass_scope_gates()?;
        let wait = self.session.wait();
        wait.until_some(|| self.try_resolve().map(Some))
            .map_err(|err| WaitFor::Present.timeout_error(self.type_name, &self.describe(), err))
    }

    fn await_displayed(&self) -> TrellisResult<()> {
        self.await_condition(WaitFor::Displayed, || Ok(self.current_facts()?.displayed))
    }

    fn await_enabled(&self) -> TrellisResult<()> {
        self.await_condition(WaitFor::Enabled, || Ok(self.current_facts()?.enabled))
    }

    fn await_animation(&self) -> TrellisResult<()> {
        let mut previous: Option<Option<BoundingBox>> = None;
        self.await_condition(WaitFor::StoppedAnimating, || {
            let current = match self.current_facts() {
                Ok(facts) => facts.bounding_box,
                Err(err) => {
                    previous = None;
                    return Err(err);
                }
            };
            let settled = previous == Some(current);
            previous = Some(current);
            Ok(settled)
        })
    }

    /// Wait until the component is visible
    pub fn wait_for_displayed(&self) -> TrellisResult<()> {
        self.pass_scope_gates()?;
        self.await_displayed()
    }

    /// Wait until the component is interactable
    pub fn wait_for_enabled(&self) -> TrellisResult<()> {
        self.pass_scope_gates()?;
        self.await_enabled()
    }

    /// Wait until two geometry snapshots one poll interval apart agree
    pub fn wait_for_animation(&self) -> TrellisResult<()> {
        self.pass_scope_gates()?;
        self.await_animation()
    }

    /// Wait until the component is invisible or gone
    pub fn wait_for_hidden(&self) -> TrellisResult<()> {
        self.await_condition(WaitFor::Hidden, || match self.current_facts() {
            Ok(facts) => Ok(!facts.displayed),
            Err(err) if is_gone(&err) => Ok(true),
            Err(err) => Err(err),
        })
    }

    /// Wait until the component no longer resolves
    pub fn wait_for_absent(&self) -> TrellisResult<()> {
        self.await_condition(WaitFor::Absent, || match self.try_resolve() {
            Ok(_) => Ok(false),
            Err(err) if is_gone(&err) => Ok(true),
            Err(err) => Err(err),
        })
    }

    /// Wait until the component is present and not interactable
    pub fn wait_for_disabled(&self) -> TrellisResult<()> {
        self.pass_scope_gates()?;
        self.await_condition(WaitFor::Disabled, || Ok(!self.current_facts()?.enabled))
    }

    /// Wait until the component can be interacted with
    pub fn wait_until_ready(&self) -> TrellisResult<ElementHandle> {
        self.pass_scope_gates()?;
        self.await_displayed()?;
        self.await_animation()?;
        self.await_enabled()?;
        self.try_resolve()
    }

    /// Sample the current lifecycle state
    ///
    /// Does not run scope gates. Geometry is sampled twice, one poll
    /// interval apart, to tell `Animating` from settled.
    pub fn state(&self) -> TrellisResult<LifecycleState> {
        let facts = match self.current_facts() {
            Ok(facts) => facts,
            Err(err) if is_gone(&err) => return Ok(LifecycleState::Unresolved),
            Err(err) => return Err(err),
        };
        if !facts.displayed {
            return Ok(LifecycleState::Found);
        }
        sleep(self.session.config().poll_interval());
        let settled = match self.current_facts() {
            Ok(later) => later.bounding_box == facts.bounding_box,
            Err(err) if is_gone(&err) => return Ok(LifecycleState::Unresolved),
            Err(err) => return Err(err),
        };
        Ok(match (settled, facts.enabled) {
            (false, _) => LifecycleState::Animating,
            (true, true) => LifecycleState::Ready,
            (true, false) => LifecycleState::Displayed,
        })
    }

    // -------------------------------------------------------------------------
    // interactions
    // -------------------------------------------------------------------------

    fn interact(&self, interaction: Interaction) -> TrellisResult<()> {
        let handle = self.wait_until_ready()?;
        debug!(component = self.type_name, %interaction, element = %handle, "interacting");
        self.session.driver().perform(&handle, &interaction)
    }

    /// Click once the component is ready
    pub fn click(&self) -> TrellisResult<()> {
        self.interact(Interaction::Click)
    }

    /// Double-click once the component is ready
    pub fn double_click(&self) -> TrellisResult<()> {
        self.interact(Interaction::DoubleClick)
    }

    /// Clear the value once the component is ready
    pub fn clear(&self) -> TrellisResult<()> {
        self.interact(Interaction::Clear)
    }

    /// Type text once the component is ready
    pub fn type_text(&self, text: &str) -> TrellisResult<()> {
        self.interact(Interaction::TypeText(text.to_string()))
    }

    // -------------------------------------------------------------------------
    // queries
    // -------------------------------------------------------------------------

    /// Facts of the resolved element, waiting until present
    pub fn facts(&self) -> TrellisResult<ElementFacts> {
        let handle = self.find()?;
        self.session.driver().element_facts(&handle)
    }

    /// Visible text
    pub fn text(&self) -> TrellisResult<String> {
        Ok(self.facts()?.text)
    }

    /// `value` attribute
    pub fn value(&self) -> TrellisResult<Option<String>> {
        self.attr("value")
    }

    /// Any attribute
    pub fn attr(&self, name: &str) -> TrellisResult<Option<String>> {
        Ok(self.facts()?.attribute(name).map(str::to_string))
    }

    /// Tag name
    pub fn tag(&self) -> TrellisResult<String> {
        Ok(self.facts()?.tag)
    }

    /// `id` attribute
    pub fn id(&self) -> TrellisResult<Option<String>> {
        self.attr("id")
    }

    /// CSS classes
    pub fn css_classes(&self) -> TrellisResult<Vec<String>> {
        let facts = self.facts()?;
        Ok(facts.classes().into_iter().map(str::to_string).collect())
    }

    /// Geometry, `None` when not rendered
    pub fn bounding_box(&self) -> TrellisResult<Option<BoundingBox>> {
        Ok(self.facts()?.bounding_box)
    }

    /// Whether the element is selected or checked
    pub fn is_selected(&self) -> TrellisResult<bool> {
        Ok(self.facts()?.selected)
    }

    /// Whether the component currently resolves and is visible
    pub fn is_displayed(&self) -> TrellisResult<bool> {
        match self.current_facts() {
            Ok(facts) => Ok(facts.displayed),
            Err(err) if is_gone(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Whether the component currently resolves and is interactable
    pub fn is_enabled(&self) -> TrellisResult<bool> {
        match self.current_facts() {
            Ok(facts) => Ok(facts.enabled),
            Err(err) if is_gone(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Whether the component currently resolves
    pub fn exists(&self) -> TrellisResult<bool> {
        match self.try_resolve() {
            Ok(_) => Ok(true),
            Err(err) if is_gone(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
