//! Built-in component kinds.

use super::{AnimationSettleable, Component, ComponentType, Enableable, Locatable, Scoped};
use crate::result::TrellisResult;
use crate::rule::RuleBuilder;

macro_rules! component_kind {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(Component);

        impl Locatable for $name {
            fn component(&self) -> &Component {
                &self.0
            }
        }
    };
}

component_kind!(
    /// Any element; also usable as a plain scope
    GenericComponent
);

impl ComponentType for GenericComponent {
    fn wrap(component: Component) -> Self {
        Self(component)
    }
}

impl Enableable for GenericComponent {}
impl AnimationSettleable for GenericComponent {}
impl Scoped for GenericComponent {}

component_kind!(
    /// `<button>` or a button-typed `<input>`
    Button
);

impl ComponentType for Button {
    fn rules(rules: &mut RuleBuilder) {
        rules.tag().is_one_of(["input", "button"]);
        rules.when_tag("input", |rules| {
            rules.input_type().is_one_of(["button", "submit", "reset"]);
        });
    }

    fn wrap(component: Component) -> Self {
        Self(component)
    }

    fn key(&self) -> TrellisResult<String> {
        self.label()
    }
}

impl Button {
    /// Caption: the `value` of an input, the text otherwise
    pub fn label(&self) -> TrellisResult<String> {
        let facts = self.0.facts()?;
        match facts.attribute("value") {
            Some(value) if facts.tag == "input" => Ok(value.to_string()),
            _ => Ok(facts.text),
        }
    }
}

impl Enableable for Button {}
impl AnimationSettleable for Button {}

component_kind!(
    /// `<a>` element
    Link
);

impl ComponentType for Link {
    fn rules(rules: &mut RuleBuilder) {
        rules.tag().is("a");
    }

    fn wrap(component: Component) -> Self {
        Self(component)
    }
}

impl Link {
    /// Link target
    pub fn href(&self) -> TrellisResult<Option<String>> {
        self.0.attr("href")
    }
}

impl Enableable for Link {}
impl AnimationSettleable for Link {}

component_kind!(
    /// Text-entry `<input>` or `<textarea>`
    Textbox
);

impl ComponentType for Textbox {
    fn rules(rules: &mut RuleBuilder) {
        rules.tag().is_one_of(["input", "textarea"]);
        rules.when_tag("input", |rules| {
            rules.input_type().is_one_of([
                "text", "password", "email", "tel", "search", "number", "hidden", "url",
            ]);
        });
    }

    fn wrap(component: Component) -> Self {
        Self(component)
    }

    fn key(&self) -> TrellisResult<String> {
        self.value()
    }
}

impl Textbox {
    /// Current value, empty when unset
    pub fn value(&self) -> TrellisResult<String> {
        Ok(self.0.value()?.unwrap_or_default())
    }

    /// Append text at the caret
    pub fn type_text(&self, text: &str) -> TrellisResult<()> {
        self.0.type_text(text)
    }

    /// Clear the value
    pub fn clear(&self) -> TrellisResult<()> {
        self.0.clear()
    }

    /// Replace the value: clear, focus, then type
    pub fn enter_text(&self, text: &str) -> TrellisResult<()> {
        self.0.clear()?;
        self.0.click()?;
        self.0.type_text(text)
    }
}

impl Enableable for Textbox {}

component_kind!(
    /// Checkbox `<input>`
    Checkbox
);

impl ComponentType for Checkbox {
    fn rules(rules: &mut RuleBuilder) {
        rules.tag().is("input");
        rules.input_type().is("checkbox");
    }

    fn wrap(component: Component) -> Self {
        Self(component)
    }
}

impl Checkbox {
    /// Whether checked
    pub fn is_checked(&self) -> TrellisResult<bool> {
        self.0.is_selected()
    }

    /// Check, clicking only when unchecked
    pub fn check(&self) -> TrellisResult<()> {
        if self.is_checked()? {
            Ok(())
        } else {
            self.0.click()
        }
    }

    /// Uncheck, clicking only when checked
    pub fn uncheck(&self) -> TrellisResult<()> {
        if self.is_checked()? {
            self.0.click()
        } else {
            Ok(())
        }
    }
}

impl Enableable for Checkbox {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::TrellisConfig;
    use crate::driver::{Interaction, Session};
    use crate::locator::predicate::{name_is, type_is};
    use crate::locator::Locator;
    use crate::mock::{ElementSpec, FixtureDom};
    use crate::result::TrellisError;
    use crate::scope::Page;

    fn page(dom: &FixtureDom) -> Page {
        Page::new(Session::new(
            dom.clone(),
            TrellisConfig::default()
                .with_wait_timeout(150)
                .with_poll_interval(10),
        ))
    }

    mod button_tests {
        use super::*;

        #[test]
        fn test_input_buttons_need_a_button_type() {
            let dom = FixtureDom::new();
            dom.append(&dom.document(), ElementSpec::new("input").attr("type", "text"))
                .unwrap();
            dom.append(
                &dom.document(),
                ElementSpec::new("input").attr("type", "submit").attr("value", "Send"),
            )
            .unwrap();
            let send: Button = page(&dom).component(Locator::descendant("input", [])).unwrap();
            assert_eq!(send.label().unwrap(), "Send");
            assert_eq!(send.key().unwrap(), "Send");
        }

        #[test]
        fn test_click_is_recorded() {
            let dom = FixtureDom::new();
            let handle = dom
                .append(&dom.document(), ElementSpec::new("button").text("Go"))
                .unwrap();
            let go: Button = page(&dom).component(Locator::descendant("button", [])).unwrap();
            go.click().unwrap();
            go.double_click().unwrap();
            assert_eq!(
                dom.interactions(),
                vec![(handle.clone(), Interaction::Click), (handle, Interaction::DoubleClick)]
            );
        }

        #[test]
        fn test_hidden_button_times_out_not_displayed() {
            let dom = FixtureDom::new();
            dom.append(&dom.document(), ElementSpec::new("button").hidden())
                .unwrap();
            let go: Button = page(&dom).component(Locator::descendant("button", [])).unwrap();
            assert!(matches!(
                go.click().unwrap_err(),
                TrellisError::ComponentNotDisplayed { .. }
            ));
        }
    }

    mod form_tests {
        use super::*;

        #[test]
        fn test_enter_text_replaces_value() {
            let dom = FixtureDom::new();
            dom.append(
                &dom.document(),
                ElementSpec::new("input")
                    .attr("type", "email")
                    .attr("name", "email")
                    .attr("value", "old@example.com"),
            )
            .unwrap();
            let email: Textbox = page(&dom)
                .component(Locator::descendant("input", [name_is("email")]))
                .unwrap();
            email.enter_text("new@example.com").unwrap();
            assert_eq!(email.value().unwrap(), "new@example.com");
            email.type_text("!").unwrap();
            assert_eq!(email.key().unwrap(), "new@example.com!");
            email.clear().unwrap();
            assert_eq!(email.value().unwrap(), "");
        }

        #[test]
        fn test_check_and_uncheck_are_idempotent() {
            let dom = FixtureDom::new();
            dom.append(&dom.document(), ElementSpec::new("input").attr("type", "checkbox"))
                .unwrap();
            let agree: Checkbox = page(&dom)
                .component(Locator::descendant("input", [type_is("checkbox")]))
                .unwrap();
            agree.check().unwrap();
            agree.check().unwrap();
            assert!(agree.is_checked().unwrap());
            agree.uncheck().unwrap();
            agree.uncheck().unwrap();
            assert!(!agree.is_checked().unwrap());
            assert_eq!(dom.interactions().len(), 2);
        }

        #[test]
        fn test_link_href() {
            let dom = FixtureDom::new();
            dom.append(&dom.document(), ElementSpec::new("a").attr("href", "/help").text("Help"))
                .unwrap();
            let help: Link = page(&dom).component(Locator::descendant("a", [])).unwrap();
            assert_eq!(help.href().unwrap().as_deref(), Some("/help"));
            assert_eq!(help.text().unwrap(), "Help");
        }
    }
}
