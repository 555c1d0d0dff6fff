//! Locator Algebra (Feature 1)
//!
//! Immutable locator trees built from reusable fragments and compiled to CSS
//! or XPath.
//!
//! # Design
//!
//! - **Immutable**: every builder call returns a new locator whose parent is
//!   the receiver; nodes are shared through `Arc` and never mutated
//! - **Pure compilation**: the compiled expression depends only on the tree
//!   and whether it resolves under a scope element
//! - **Dialect choice**: CSS when every node is CSS-expressible, XPath otherwise
//! - **Reverse axes**: `preceding_sibling`, `preceding` and `parent` only
//!   exist in XPath; positions on the sibling and preceding axes count from
//!   the nearest element outward
//! - **Raw roots**: [`Locator::raw_css`] and [`Locator::raw_xpath`] start a
//!   tree from hand-written query text
//!
//! ```
//! use trellis::locator::predicate::{css_classes, id};
//! use trellis::{Dialect, Locator};
//!
//! let rows = Locator::descendant("table", [id("orders")])
//!     .then_child("tbody", [])
//!     .then_child("tr", [css_classes(["row"])]);
//!
//! let compiled = rows.compile(false).unwrap();
//! assert_eq!(compiled.dialect, Dialect::Css);
//! assert_eq!(compiled.expression, "table#orders > tbody > tr.row");
//! ```

pub mod predicate;

mod compile;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::result::TrellisResult;
pub use predicate::Predicate;

/// Relation between a node and its parent (or the scope element)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// Anywhere below
    Descendant,
    /// Directly below
    Child,
    /// The immediately following sibling
    NextSibling,
    /// Any later sibling
    FollowingSibling,
    /// Anywhere later in document order, outside the subtree
    Following,
    /// Any earlier sibling
    PrecedingSibling,
    /// Anywhere earlier in document order, excluding ancestors
    Preceding,
    /// The parent element
    Parent,
}

impl Combinator {
    /// Axis with no CSS form
    #[must_use]
    pub const fn is_xpath_only(self) -> bool {
        matches!(
            self,
            Self::Following | Self::PrecedingSibling | Self::Preceding | Self::Parent
        )
    }
}

/// Query language of a compiled locator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// CSS selector
    #[default]
    Css,
    /// XPath 1.0 expression
    XPath,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css => write!(f, "css"),
            Self::XPath => write!(f, "xpath"),
        }
    }
}

/// Where the root of a locator tree resolves from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// The scope component's element, or the document when unscoped
    Scope,
    /// Always the document, ignoring any scope
    Document,
}

/// Compiled query handed to the driver
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompiledLocator {
    /// Query language
    pub dialect: Dialect,
    /// Query text
    pub expression: String,
}

impl fmt::Display for CompiledLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.dialect, self.expression)
    }
}

/// One step of a locator tree
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct LocatorNode {
    combinator: Combinator,
    tag: Option<String>,
    predicates: Vec<Predicate>,
    force_xpath: bool,
    raw: Option<String>,
    anchor: Anchor,
    parent: Option<Locator>,
}

impl LocatorNode {
    /// Relation to the parent step
    #[must_use]
    pub const fn combinator(&self) -> Combinator {
        self.combinator
    }

    /// Tag name, `None` for any tag
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Predicates of this step
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether this step was forced to XPath
    #[must_use]
    pub const fn forces_xpath(&self) -> bool {
        self.force_xpath
    }

    /// Hand-written query text of a raw root
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Parent step
    #[must_use]
    pub const fn parent(&self) -> Option<&Locator> {
        self.parent.as_ref()
    }
}

/// Immutable, shareable locator tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(Arc<LocatorNode>);

fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim();
    if tag.is_empty() || tag == "*" {
        None
    } else {
        Some(tag.to_ascii_lowercase())
    }
}

impl Locator {
    fn node(
        combinator: Combinator,
        tag: &str,
        predicates: impl IntoIterator<Item = Predicate>,
        anchor: Anchor,
        parent: Option<Self>,
    ) -> Self {
        Self(Arc::new(LocatorNode {
            combinator,
            tag: normalize_tag(tag),
            predicates: predicates.into_iter().collect(),
            force_xpath: false,
            raw: None,
            anchor,
            parent,
        }))
    }

    fn raw_root(dialect: Dialect, expression: &str) -> Self {
        Self(Arc::new(LocatorNode {
            combinator: Combinator::Descendant,
            tag: None,
            predicates: Vec::new(),
            force_xpath: dialect == Dialect::XPath,
            raw: Some(expression.trim().to_string()),
            anchor: Anchor::Scope,
            parent: None,
        }))
    }

    /// Hand-written CSS selector; under a scope it is prefixed with `:scope `
    #[must_use]
    pub fn raw_css(selector: &str) -> Self {
        Self::raw_root(Dialect::Css, selector)
    }

    /// Hand-written XPath; under a scope it is prefixed with `.`
    #[must_use]
    pub fn raw_xpath(expression: &str) -> Self {
        Self::raw_root(Dialect::XPath, expression)
    }

    /// Elements anywhere below the scope
    #[must_use]
    pub fn descendant(tag: &str, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::node(Combinator::Descendant, tag, predicates, Anchor::Scope, None)
    }

    /// Elements directly below the scope
    #[must_use]
    pub fn child(tag: &str, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::node(Combinator::Child, tag, predicates, Anchor::Scope, None)
    }

    /// Elements anywhere in the document, regardless of scope
    #[must_use]
    pub fn page(tag: &str, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::node(
            Combinator::Descendant,
            tag,
            predicates,
            Anchor::Document,
            None,
        )
    }

    /// Elements anywhere below this locator's matches
    #[must_use]
    pub fn then_descendant(&self, tag: &str, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.extend(Combinator::Descendant, tag, predicates)
    }

    /// Elements directly below this locator's matches
    #[must_use]
    pub fn then_child(&self, tag: &str, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.extend(Combinator::Child, tag, predicates)
    }

    /// The sibling immediately after each match
    #[must_use]
    pub fn next_sibling(&self, tag: &str, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.extend(Combinator::NextSibling, tag, predicates)
    }

    /// Any later sibling of each match
    #[must_use]
    pub fn following_sibling(
        &self,
        tag: &str,
        predicates: impl IntoIterator<Item = Predicate>,
    ) -> Self {
        self.extend(Combinator::FollowingSibling, tag, predicates)
    }

    /// Elements after each match in document order, outside its subtree
    #[must_use]
    pub fn following(&self, tag: &str, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.extend(Combinator::Following, tag, predicates)
    }

    /// Any earlier sibling of each match
    #[must_use]
    pub fn preceding_sibling(
        &self,
        tag: &str,
        predicates: impl IntoIterator<Item = Predicate>,
    ) -> Self {
        self.extend(Combinator::PrecedingSibling, tag, predicates)
    }

    /// Elements before each match in document order, excluding its ancestors
    #[must_use]
    pub fn preceding(&self, tag: &str, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.extend(Combinator::Preceding, tag, predicates)
    }

    /// The parent element of each match
    #[must_use]
    pub fn parent(&self) -> Self {
        self.extend(Combinator::Parent, "*", [])
    }

    fn extend(
        &self,
        combinator: Combinator,
        tag: &str,
        predicates: impl IntoIterator<Item = Predicate>,
    ) -> Self {
        Self::node(combinator, tag, predicates, Anchor::Scope, Some(self.clone()))
    }

    /// Set the dialect hint of this step; `XPath` forces XPath for the tree
    ///
    /// Raw roots keep the dialect they were written in.
    #[must_use]
    pub fn with_dialect(&self, dialect: Dialect) -> Self {
        let node = &self.0;
        Self(Arc::new(LocatorNode {
            combinator: node.combinator,
            tag: node.tag.clone(),
            predicates: node.predicates.clone(),
            force_xpath: if node.raw.is_some() {
                node.force_xpath
            } else {
                dialect == Dialect::XPath
            },
            raw: node.raw.clone(),
            anchor: node.anchor,
            parent: node.parent.clone(),
        }))
    }

    /// The last step of the tree
    #[must_use]
    pub fn last_node(&self) -> &LocatorNode {
        &self.0
    }

    /// Steps from root to leaf
    #[must_use]
    pub fn nodes(&self) -> Vec<&LocatorNode> {
        let mut nodes = Vec::new();
        let mut current = Some(self);
        while let Some(locator) = current {
            nodes.push(locator.0.as_ref());
            current = locator.0.parent.as_ref();
        }
        nodes.reverse();
        nodes
    }

    /// Number of steps
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.0.parent.as_ref();
        while let Some(parent) = current {
            depth += 1;
            current = parent.0.parent.as_ref();
        }
        depth
    }

    /// Root always resolves from the document
    #[must_use]
    pub fn is_page_anchored(&self) -> bool {
        let mut current = self;
        while let Some(parent) = current.0.parent.as_ref() {
            current = parent;
        }
        current.0.anchor == Anchor::Document
    }

    /// Compile to a query; `scoped` means resolution starts at a scope element
    pub fn compile(&self, scoped: bool) -> TrellisResult<CompiledLocator> {
        compile::compile(self, scoped && !self.is_page_anchored())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.compile(true) {
            Ok(compiled) => write!(f, "{compiled}"),
            Err(err) => write!(f, "<{err}>"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::predicate::{css_classes, id};
    use super::*;

    mod structure_tests {
        use super::*;

        #[test]
        fn test_nodes_root_first() {
            let loc = Locator::descendant("form", [id("login")])
                .then_child("div", [])
                .then_descendant("input", []);
            let tags: Vec<_> = loc.nodes().iter().map(|n| n.tag()).collect();
            assert_eq!(tags, vec![Some("form"), Some("div"), Some("input")]);
            assert_eq!(loc.depth(), 3);
        }

        #[test]
        fn test_builders_do_not_mutate_receiver() {
            let base = Locator::descendant("ul", []);
            let a = base.then_child("li", [css_classes(["a"])]);
            let b = base.then_child("li", [css_classes(["b"])]);
            assert_eq!(base.depth(), 1);
            assert_ne!(a, b);
            assert_eq!(a.last_node().parent(), Some(&base));
        }

        #[test]
        fn test_any_tag_spellings_are_equal() {
            assert_eq!(
                Locator::descendant("*", [id("x")]),
                Locator::descendant("", [id("x")])
            );
            assert_eq!(
                Locator::descendant("DIV", []),
                Locator::descendant("div", [])
            );
        }

        #[test]
        fn test_page_anchor_is_inherited_from_root() {
            let loc = Locator::page("main", []).then_child("section", []);
            assert!(loc.is_page_anchored());
            assert!(!Locator::child("main", []).is_page_anchored());
        }

        #[test]
        fn test_with_dialect_keeps_structure() {
            let loc = Locator::descendant("a", [id("home")]);
            let forced = loc.with_dialect(Dialect::XPath);
            assert!(forced.last_node().forces_xpath());
            assert_eq!(forced.last_node().predicates(), loc.last_node().predicates());
            assert_ne!(forced, loc);
        }

        #[test]
        fn test_reverse_axes_are_xpath_only() {
            let loc = Locator::descendant("td", [id("total")]).parent().preceding_sibling("tr", []);
            let combinators: Vec<_> = loc.nodes().iter().map(|n| n.combinator()).collect();
            assert_eq!(
                combinators,
                vec![Combinator::Descendant, Combinator::Parent, Combinator::PrecedingSibling]
            );
            assert!(Combinator::Preceding.is_xpath_only());
            assert!(!Combinator::NextSibling.is_xpath_only());
        }

        #[test]
        fn test_raw_root_keeps_text() {
            let loc = Locator::raw_xpath(" //ul/li ").then_child("a", []);
            assert_eq!(loc.nodes()[0].raw(), Some("//ul/li"));
            assert!(loc.nodes()[0].forces_xpath());
            assert!(!Locator::raw_css("ul > li").last_node().forces_xpath());
        }
    }
}
