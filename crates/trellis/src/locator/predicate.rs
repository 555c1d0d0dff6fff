//! Locator predicates.
//!
//! Predicates narrow the elements a locator node matches. Several predicates
//! on one node combine with AND.
//!
//! ```
//! use trellis::locator::predicate::{attr, css_classes, id, not, text};
//!
//! let preds = [
//!     id("submit"),
//!     css_classes(["btn", "primary"]),
//!     attr("data-role").starts_with("action"),
//!     not(text().contains("Cancel")),
//! ];
//! assert_eq!(preds.len(), 4);
//! ```

/// Comparison applied to an attribute value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeOp {
    /// Value equals exactly
    Equals(String),
    /// Attribute is present, any value
    Present,
    /// Value contains the substring
    Contains(String),
    /// Value starts with the prefix
    StartsWith(String),
    /// Value ends with the suffix
    EndsWith(String),
    /// Value holds the word in its whitespace-separated list
    WholeWord(String),
}

/// Comparison applied to the normalized text content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextOp {
    /// Text equals exactly
    Is(String),
    /// Text contains the substring
    Contains(String),
}

/// Position among the matches of one step (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// The n-th match
    At(usize),
    /// The last match
    Last,
}

/// Position among the element's siblings, as the CSS structural
/// pseudo-classes count it (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SiblingPosition {
    /// Position, counted from the first or last sibling
    pub n: usize,
    /// Count from the last sibling
    pub from_end: bool,
    /// Count only siblings with the same tag
    pub of_type: bool,
}

/// What a predicate tests
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    /// Attribute test
    Attribute {
        /// Attribute name
        name: String,
        /// Comparison
        op: AttributeOp,
    },
    /// Element carries every class
    Classes(Vec<String>),
    /// Text content test
    Text(TextOp),
    /// Positional test among the step's matches
    Position(Position),
    /// Positional test among the element's siblings
    Sibling(SiblingPosition),
}

/// A single, optionally negated, element test
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Predicate {
    kind: PredicateKind,
    negated: bool,
}

impl Predicate {
    /// Create a predicate from its kind
    #[must_use]
    pub const fn new(kind: PredicateKind) -> Self {
        Self {
            kind,
            negated: false,
        }
    }

    /// What this predicate tests
    #[must_use]
    pub const fn kind(&self) -> &PredicateKind {
        &self.kind
    }

    /// Whether the test is inverted
    #[must_use]
    pub const fn is_negated(&self) -> bool {
        self.negated
    }

    /// Invert the test
    #[must_use]
    pub const fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Text and position tests have no CSS form
    #[must_use]
    pub const fn requires_xpath(&self) -> bool {
        matches!(
            self.kind,
            PredicateKind::Text(_) | PredicateKind::Position(_)
        )
    }
}

/// Builder for attribute predicates
#[derive(Debug, Clone)]
pub struct AttributeBuilder {
    name: String,
}

impl AttributeBuilder {
    fn build(self, op: AttributeOp) -> Predicate {
        Predicate::new(PredicateKind::Attribute {
            name: self.name,
            op,
        })
    }

    /// Attribute equals the value
    #[must_use]
    pub fn is(self, value: impl Into<String>) -> Predicate {
        self.build(AttributeOp::Equals(value.into()))
    }

    /// Attribute is present
    #[must_use]
    pub fn is_present(self) -> Predicate {
        self.build(AttributeOp::Present)
    }

    /// Attribute contains the value
    #[must_use]
    pub fn contains(self, value: impl Into<String>) -> Predicate {
        self.build(AttributeOp::Contains(value.into()))
    }

    /// Attribute starts with the value
    #[must_use]
    pub fn starts_with(self, value: impl Into<String>) -> Predicate {
        self.build(AttributeOp::StartsWith(value.into()))
    }

    /// Attribute ends with the value
    #[must_use]
    pub fn ends_with(self, value: impl Into<String>) -> Predicate {
        self.build(AttributeOp::EndsWith(value.into()))
    }

    /// Attribute holds the value as a whitespace-separated word
    #[must_use]
    pub fn whole_word(self, value: impl Into<String>) -> Predicate {
        self.build(AttributeOp::WholeWord(value.into()))
    }
}

/// Builder for text predicates
#[derive(Debug, Clone, Copy)]
pub struct TextBuilder;

impl TextBuilder {
    /// Normalized text equals the value
    #[must_use]
    pub fn is(self, value: impl Into<String>) -> Predicate {
        Predicate::new(PredicateKind::Text(TextOp::Is(value.into())))
    }

    /// Normalized text contains the value
    #[must_use]
    pub fn contains(self, value: impl Into<String>) -> Predicate {
        Predicate::new(PredicateKind::Text(TextOp::Contains(value.into())))
    }
}

/// Attribute predicate on `name`
#[must_use]
pub fn attr(name: impl Into<String>) -> AttributeBuilder {
    AttributeBuilder { name: name.into() }
}

/// `id` equals the value
#[must_use]
pub fn id(value: impl Into<String>) -> Predicate {
    attr("id").is(value)
}

/// `type` equals the value
#[must_use]
pub fn type_is(value: impl Into<String>) -> Predicate {
    attr("type").is(value)
}

/// `name` equals the value
#[must_use]
pub fn name_is(value: impl Into<String>) -> Predicate {
    attr("name").is(value)
}

/// Element carries every listed class
#[must_use]
pub fn css_classes<I, S>(classes: I) -> Predicate
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Predicate::new(PredicateKind::Classes(
        classes.into_iter().map(Into::into).collect(),
    ))
}

/// Text predicate
#[must_use]
pub const fn text() -> TextBuilder {
    TextBuilder
}

/// The n-th match of the step (1-based)
#[must_use]
pub const fn at(n: usize) -> Predicate {
    Predicate::new(PredicateKind::Position(Position::At(n)))
}

/// The first match of the step
#[must_use]
pub const fn first() -> Predicate {
    at(1)
}

/// The last match of the step
#[must_use]
pub const fn last() -> Predicate {
    Predicate::new(PredicateKind::Position(Position::Last))
}

const fn sibling(n: usize, from_end: bool, of_type: bool) -> Predicate {
    Predicate::new(PredicateKind::Sibling(SiblingPosition {
        n,
        from_end,
        of_type,
    }))
}

/// The n-th child of its parent (`:nth-child(n)`)
#[must_use]
pub const fn nth_child(n: usize) -> Predicate {
    sibling(n, false, false)
}

/// The n-th child counting from the last (`:nth-last-child(n)`)
#[must_use]
pub const fn nth_last_child(n: usize) -> Predicate {
    sibling(n, true, false)
}

/// The first child of its parent
#[must_use]
pub const fn first_child() -> Predicate {
    nth_child(1)
}

/// The last child of its parent
#[must_use]
pub const fn last_child() -> Predicate {
    nth_last_child(1)
}

/// The n-th sibling with the step's tag (`:nth-of-type(n)`); needs a tag
#[must_use]
pub const fn nth_of_type(n: usize) -> Predicate {
    sibling(n, false, true)
}

/// The n-th sibling with the step's tag, counting from the last
#[must_use]
pub const fn nth_last_of_type(n: usize) -> Predicate {
    sibling(n, true, true)
}

/// The first sibling with the step's tag
#[must_use]
pub const fn first_of_type() -> Predicate {
    nth_of_type(1)
}

/// The last sibling with the step's tag
#[must_use]
pub const fn last_of_type() -> Predicate {
    nth_last_of_type(1)
}

/// Invert a predicate
#[must_use]
pub const fn not(predicate: Predicate) -> Predicate {
    predicate.negate()
}
