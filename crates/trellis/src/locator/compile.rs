//! Compilation of locator trees to CSS or XPath.

use tracing::trace;

use super::predicate::{AttributeOp, Position, PredicateKind, SiblingPosition, TextOp};
use super::{Combinator, CompiledLocator, Dialect, Locator, LocatorNode, Predicate};
use crate::result::{TrellisError, TrellisResult};

// =============================================================================
// ENTRY POINT
// =============================================================================

pub(super) fn compile(locator: &Locator, scoped: bool) -> TrellisResult<CompiledLocator> {
    let nodes = locator.nodes();
    for node in &nodes {
        validate_node(node)?;
    }

    let expressible = nodes
        .iter()
        .enumerate()
        .all(|(index, node)| css_expressible(node, index == 0, scoped));
    let raw_css = nodes
        .first()
        .is_some_and(|root| root.raw().is_some() && !root.forces_xpath());
    if raw_css && !expressible {
        return Err(TrellisError::invalid_locator(
            "a raw CSS selector cannot be followed by XPath-only steps",
        ));
    }
    let css = if expressible {
        emit_css(&nodes, scoped)
    } else {
        None
    };

    let compiled = match css {
        Some(expression) => CompiledLocator {
            dialect: Dialect::Css,
            expression,
        },
        None => CompiledLocator {
            dialect: Dialect::XPath,
            expression: emit_xpath(&nodes, scoped),
        },
    };
    trace!(locator = %compiled, scoped, "compiled locator");
    Ok(compiled)
}

// =============================================================================
// VALIDATION
// =============================================================================

fn is_name(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn has_whitespace(value: &str) -> bool {
    value.chars().any(char::is_whitespace)
}

fn validate_node(node: &LocatorNode) -> TrellisResult<()> {
    if let Some(raw) = node.raw() {
        if raw.is_empty() {
            return Err(TrellisError::invalid_locator("raw expression is empty"));
        }
        return Ok(());
    }
    if let Some(tag) = node.tag() {
        if !is_name(tag) {
            return Err(TrellisError::invalid_locator(format!(
                "tag '{tag}' is not a valid element name"
            )));
        }
    }
    if node.tag().is_none() && node.predicates().is_empty() && node.combinator() != Combinator::Parent
    {
        return Err(TrellisError::invalid_locator(
            "no properties were provided: a step needs a tag or a predicate",
        ));
    }
    node.predicates()
        .iter()
        .try_for_each(|predicate| validate_predicate(node, predicate))
}

fn validate_predicate(node: &LocatorNode, predicate: &Predicate) -> TrellisResult<()> {
    match predicate.kind() {
        PredicateKind::Attribute { name, op } => {
            if !is_name(name) {
                return Err(TrellisError::invalid_locator(format!(
                    "attribute name '{name}' is not valid"
                )));
            }
            match op {
                AttributeOp::Equals(value) if name == "id" && has_whitespace(value) => Err(
                    TrellisError::invalid_locator(format!("id '{value}' contains whitespace")),
                ),
                AttributeOp::Contains(value)
                | AttributeOp::StartsWith(value)
                | AttributeOp::EndsWith(value)
                    if value.is_empty() =>
                {
                    Err(TrellisError::invalid_locator(format!(
                        "partial match on '{name}' needs a non-empty value"
                    )))
                }
                AttributeOp::WholeWord(value) if value.is_empty() || has_whitespace(value) => {
                    Err(TrellisError::invalid_locator(format!(
                        "word match on '{name}' needs a single non-empty word"
                    )))
                }
                _ => Ok(()),
            }
        }
        PredicateKind::Classes(classes) => {
            if classes.is_empty() {
                return Err(TrellisError::invalid_locator("empty class set"));
            }
            match classes.iter().find(|c| c.is_empty() || has_whitespace(c)) {
                Some(class) => Err(TrellisError::invalid_locator(format!(
                    "class '{class}' must be a single non-empty word"
                ))),
                None => Ok(()),
            }
        }
        PredicateKind::Text(_) => Ok(()),
        PredicateKind::Position(Position::At(0)) => Err(TrellisError::invalid_locator(
            "positions start at 1",
        )),
        PredicateKind::Position(_) => Ok(()),
        PredicateKind::Sibling(SiblingPosition { n: 0, .. }) => Err(
            TrellisError::invalid_locator("sibling positions start at 1"),
        ),
        PredicateKind::Sibling(SiblingPosition { of_type: true, .. }) if node.tag().is_none() => {
            Err(TrellisError::invalid_locator(
                "of-type positions need a tag on the step",
            ))
        }
        PredicateKind::Sibling(_) => Ok(()),
    }
}

fn css_expressible(node: &LocatorNode, root: bool, scoped: bool) -> bool {
    if node.forces_xpath() || node.predicates().iter().any(Predicate::requires_xpath) {
        return false;
    }
    if node.raw().is_some() {
        return true;
    }
    match node.combinator() {
        combinator if combinator.is_xpath_only() => false,
        // the document has no CSS handle for its own children
        Combinator::Child => !(root && !scoped),
        _ => true,
    }
}

// =============================================================================
// CSS
// =============================================================================

fn css_combinator(combinator: Combinator) -> Option<&'static str> {
    match combinator {
        Combinator::Descendant => Some(" "),
        Combinator::Child => Some(" > "),
        Combinator::NextSibling => Some(" + "),
        Combinator::FollowingSibling => Some(" ~ "),
        Combinator::Following
        | Combinator::PrecedingSibling
        | Combinator::Preceding
        | Combinator::Parent => None,
    }
}

/// Quote a CSS string value
pub(crate) fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => out.push_str(&format!("\\{:x} ", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn css_attribute(name: &str, op: &AttributeOp) -> String {
    match op {
        AttributeOp::Equals(value) if name == "id" && is_name(value) => format!("#{value}"),
        AttributeOp::Equals(value) => format!("[{name}={}]", css_string(value)),
        AttributeOp::Present => format!("[{name}]"),
        AttributeOp::Contains(value) => format!("[{name}*={}]", css_string(value)),
        AttributeOp::StartsWith(value) => format!("[{name}^={}]", css_string(value)),
        AttributeOp::EndsWith(value) => format!("[{name}$={}]", css_string(value)),
        AttributeOp::WholeWord(value) => format!("[{name}~={}]", css_string(value)),
    }
}

fn css_classes(classes: &[String]) -> String {
    classes
        .iter()
        .map(|class| {
            if is_name(class) {
                format!(".{class}")
            } else {
                format!("[class~={}]", css_string(class))
            }
        })
        .collect()
}

fn css_sibling(position: SiblingPosition) -> String {
    let SiblingPosition {
        n,
        from_end,
        of_type,
    } = position;
    let unit = if of_type { "of-type" } else { "child" };
    match (n, from_end) {
        (1, false) => format!(":first-{unit}"),
        (1, true) => format!(":last-{unit}"),
        (n, false) => format!(":nth-{unit}({n})"),
        (n, true) => format!(":nth-last-{unit}({n})"),
    }
}

fn css_predicate(predicate: &Predicate) -> Option<String> {
    let simple = match predicate.kind() {
        PredicateKind::Attribute { name, op } => css_attribute(name, op),
        PredicateKind::Classes(classes) => css_classes(classes),
        PredicateKind::Sibling(position) => css_sibling(*position),
        PredicateKind::Text(_) | PredicateKind::Position(_) => return None,
    };
    if predicate.is_negated() {
        Some(format!(":not({simple})"))
    } else {
        Some(simple)
    }
}

fn emit_css(nodes: &[&LocatorNode], scoped: bool) -> Option<String> {
    let mut out = String::new();
    for (index, node) in nodes.iter().enumerate() {
        if index > 0 || scoped {
            if index == 0 {
                out.push_str(":scope");
            }
            out.push_str(css_combinator(node.combinator())?);
        }
        if let Some(raw) = node.raw() {
            out.push_str(raw);
            continue;
        }
        if let Some(tag) = node.tag() {
            out.push_str(tag);
        }
        for predicate in node.predicates() {
            out.push_str(&css_predicate(predicate)?);
        }
    }
    Some(out)
}

// =============================================================================
// XPATH
// =============================================================================

/// Quote an XPath string literal
pub(crate) fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts: Vec<String> = value
            .split('\'')
            .map(|part| format!("'{part}'"))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

fn xpath_word(subject: &str, word: &str) -> String {
    format!(
        "contains(concat(' ', normalize-space({subject}), ' '), {})",
        xpath_literal(&format!(" {word} "))
    )
}

fn xpath_attribute(name: &str, op: &AttributeOp) -> String {
    let subject = format!("@{name}");
    match op {
        AttributeOp::Equals(value) => format!("{subject} = {}", xpath_literal(value)),
        AttributeOp::Present => subject,
        AttributeOp::Contains(value) => format!("contains({subject}, {})", xpath_literal(value)),
        AttributeOp::StartsWith(value) => {
            format!("starts-with({subject}, {})", xpath_literal(value))
        }
        AttributeOp::EndsWith(value) => {
            let literal = xpath_literal(value);
            format!(
                "substring({subject}, string-length({subject}) - string-length({literal}) + 1) = {literal}"
            )
        }
        AttributeOp::WholeWord(value) => xpath_word(&subject, value),
    }
}

fn xpath_sibling(tag: Option<&str>, position: SiblingPosition) -> String {
    let axis = if position.from_end {
        "following-sibling"
    } else {
        "preceding-sibling"
    };
    let test = if position.of_type { tag.unwrap_or("*") } else { "*" };
    format!("count({axis}::{test}) = {}", position.n - 1)
}

fn xpath_predicate(tag: Option<&str>, predicate: &Predicate) -> String {
    let negated = predicate.is_negated();
    let test = match predicate.kind() {
        PredicateKind::Attribute { name, op } => xpath_attribute(name, op),
        PredicateKind::Classes(classes) => classes
            .iter()
            .map(|class| xpath_word("@class", class))
            .collect::<Vec<_>>()
            .join(" and "),
        PredicateKind::Text(TextOp::Is(value)) => {
            format!("normalize-space(.) = {}", xpath_literal(value))
        }
        PredicateKind::Text(TextOp::Contains(value)) => {
            format!("contains(normalize-space(.), {})", xpath_literal(value))
        }
        PredicateKind::Position(Position::At(n)) if negated => format!("position() = {n}"),
        PredicateKind::Position(Position::At(n)) => n.to_string(),
        PredicateKind::Position(Position::Last) if negated => "position() = last()".to_string(),
        PredicateKind::Position(Position::Last) => "last()".to_string(),
        PredicateKind::Sibling(position) => xpath_sibling(tag, *position),
    };
    if negated {
        format!("[not({test})]")
    } else {
        format!("[{test}]")
    }
}

fn emit_xpath(nodes: &[&LocatorNode], scoped: bool) -> String {
    let mut out = String::from(if scoped { "." } else { "" });
    for node in nodes {
        if let Some(raw) = node.raw() {
            out.push_str(raw);
            continue;
        }
        let tag = node.tag().unwrap_or("*");
        match node.combinator() {
            Combinator::Descendant => out.push_str(&format!("/descendant::{tag}")),
            Combinator::Child => out.push_str(&format!("/child::{tag}")),
            Combinator::FollowingSibling => out.push_str(&format!("/following-sibling::{tag}")),
            Combinator::Following => out.push_str(&format!("/following::{tag}")),
            Combinator::PrecedingSibling => out.push_str(&format!("/preceding-sibling::{tag}")),
            Combinator::Preceding => out.push_str(&format!("/preceding::{tag}")),
            Combinator::Parent => out.push_str(&format!("/parent::{tag}")),
            Combinator::NextSibling => {
                out.push_str("/following-sibling::*[1]");
                if let Some(tag) = node.tag() {
                    out.push_str(&format!("[self::{tag}]"));
                }
            }
        }
        for predicate in node.predicates() {
            out.push_str(&xpath_predicate(node.tag(), predicate));
        }
    }
    out
}
