//! Component Rules (Feature 2)
//!
//! Structural checks a candidate element must pass before it is accepted as
//! a component of a given kind. Checks are conjunctive; facets a rule does not
//! mention are unconstrained, so an empty rule accepts any element.
//!
//! ```
//! use trellis::ComponentRule;
//!
//! let rule = ComponentRule::build("SaveButton", |r| {
//!     r.tag().is_one_of(["button", "input"]);
//!     r.when_tag("input", |r| r.input_type().is_one_of(["submit", "button"]));
//!     r.css_classes().has("primary");
//! })
//! .unwrap();
//! assert!(!rule.is_empty());
//! ```

use std::fmt;

use regex::Regex;

use crate::driver::ElementFacts;
use crate::result::{TrellisError, TrellisResult};

// =============================================================================
// CONDITIONS
// =============================================================================

/// Element property a condition reads
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Facet {
    /// Lowercase tag name
    Tag,
    /// Named attribute
    Attribute(String),
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag => write!(f, "tag"),
            Self::Attribute(name) if name == "id" => write!(f, "id"),
            Self::Attribute(name) => write!(f, "attribute '{name}'"),
        }
    }
}

#[derive(Debug, Clone)]
enum ValueCondition {
    Is(String),
    IsNot(String),
    IsOneOf(Vec<String>),
    IsPresent,
    IsAbsent,
    Contains(String),
    DoesNotContain(String),
    StartsWith(String),
    EndsWith(String),
    Matches(Regex),
}

impl ValueCondition {
    fn holds(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Self::Is(expected), Some(v)) => v == expected,
            (Self::IsNot(expected), v) => v != Some(expected.as_str()),
            (Self::IsOneOf(options), Some(v)) => options.iter().any(|o| o == v),
            (Self::IsPresent, v) => v.is_some(),
            (Self::IsAbsent, v) => v.is_none(),
            (Self::Contains(part), Some(v)) => v.contains(part.as_str()),
            (Self::DoesNotContain(part), v) => !v.is_some_and(|v| v.contains(part.as_str())),
            (Self::StartsWith(prefix), Some(v)) => v.starts_with(prefix.as_str()),
            (Self::EndsWith(suffix), Some(v)) => v.ends_with(suffix.as_str()),
            (Self::Matches(re), Some(v)) => re.is_match(v),
            (_, None) => false,
        }
    }
}

impl fmt::Display for ValueCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Is(v) => write!(f, "is '{v}'"),
            Self::IsNot(v) => write!(f, "is not '{v}'"),
            Self::IsOneOf(vs) => write!(f, "is one of {vs:?}"),
            Self::IsPresent => write!(f, "is present"),
            Self::IsAbsent => write!(f, "is absent"),
            Self::Contains(v) => write!(f, "contains '{v}'"),
            Self::DoesNotContain(v) => write!(f, "does not contain '{v}'"),
            Self::StartsWith(v) => write!(f, "starts with '{v}'"),
            Self::EndsWith(v) => write!(f, "ends with '{v}'"),
            Self::Matches(re) => write!(f, "matches /{}/", re.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
enum ClassCondition {
    Has(String),
    DoesNotHave(String),
    HasAllOf(Vec<String>),
    HasAnyOf(Vec<String>),
    HasNoneOf(Vec<String>),
    IsPresent,
    IsAbsent,
}

impl ClassCondition {
    fn holds(&self, classes: &[&str]) -> bool {
        let has = |c: &String| classes.contains(&c.as_str());
        match self {
            Self::Has(c) => has(c),
            Self::DoesNotHave(c) => !has(c),
            Self::HasAllOf(cs) => cs.iter().all(has),
            Self::HasAnyOf(cs) => cs.iter().any(has),
            Self::HasNoneOf(cs) => !cs.iter().any(has),
            Self::IsPresent => !classes.is_empty(),
            Self::IsAbsent => classes.is_empty(),
        }
    }
}

impl fmt::Display for ClassCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Has(c) => write!(f, "has '{c}'"),
            Self::DoesNotHave(c) => write!(f, "does not have '{c}'"),
            Self::HasAllOf(cs) => write!(f, "has all of {cs:?}"),
            Self::HasAnyOf(cs) => write!(f, "has any of {cs:?}"),
            Self::HasNoneOf(cs) => write!(f, "has none of {cs:?}"),
            Self::IsPresent => write!(f, "are present"),
            Self::IsAbsent => write!(f, "are absent"),
        }
    }
}

#[derive(Debug, Clone)]
enum Check {
    Value {
        facet: Facet,
        condition: ValueCondition,
    },
    Classes(ClassCondition),
    WhenTag {
        tag: String,
        checks: Vec<Check>,
    },
}

impl Check {
    fn collect_violations(&self, facts: &ElementFacts, violations: &mut Vec<RuleViolation>) {
        match self {
            Self::Value { facet, condition } => {
                let actual = match facet {
                    Facet::Tag => Some(facts.tag.as_str()),
                    Facet::Attribute(name) => facts.attribute(name),
                };
                if !condition.holds(actual) {
                    violations.push(RuleViolation {
                        facet: facet.to_string(),
                        message: format!(
                            "Expected that {facet} {condition}, but it is not. (actual: {})",
                            actual.map_or_else(|| "absent".to_string(), |v| format!("'{v}'"))
                        ),
                    });
                }
            }
            Self::Classes(condition) => {
                let classes = facts.classes();
                if !condition.holds(&classes) {
                    violations.push(RuleViolation {
                        facet: "css classes".to_string(),
                        message: format!(
                            "Expected that css classes {condition}. (actual: '{}')",
                            classes.join(" ")
                        ),
                    });
                }
            }
            Self::WhenTag { tag, checks } => {
                if facts.tag == *tag {
                    for check in checks {
                        check.collect_violations(facts, violations);
                    }
                }
            }
        }
    }
}

// =============================================================================
// RULE
// =============================================================================

/// A failed check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    /// Facet the check read
    pub facet: String,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Conjunction of structural checks
#[derive(Debug, Clone, Default)]
pub struct ComponentRule {
    checks: Vec<Check>,
}

impl ComponentRule {
    /// Rule accepting any element
    #[must_use]
    pub const fn any() -> Self {
        Self { checks: Vec::new() }
    }

    /// Declare a rule; invalid declarations fail with `ComponentCreation`
    pub fn build(type_name: &str, declare: impl FnOnce(&mut RuleBuilder)) -> TrellisResult<Self> {
        let mut builder = RuleBuilder::default();
        declare(&mut builder);
        if builder.errors.is_empty() {
            Ok(Self {
                checks: builder.checks,
            })
        } else {
            Err(TrellisError::ComponentCreation {
                type_name: type_name.to_string(),
                reason: builder.errors.join("; "),
            })
        }
    }

    /// Whether the rule has no checks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Check every facet, reporting all violations
    pub fn validate(&self, facts: &ElementFacts) -> Result<(), Vec<RuleViolation>> {
        let mut violations = Vec::new();
        for check in &self.checks {
            check.collect_violations(facts, &mut violations);
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Whether the element passes every check
    #[must_use]
    pub fn accepts(&self, facts: &ElementFacts) -> bool {
        self.validate(facts).is_ok()
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

/// Collects checks declared by a component type
#[derive(Debug, Default)]
pub struct RuleBuilder {
    checks: Vec<Check>,
    errors: Vec<String>,
}

impl RuleBuilder {
    /// Declare that any element is acceptable
    pub fn any(&mut self) {}

    /// Conditions on the tag name
    pub fn tag(&mut self) -> FacetRule<'_> {
        FacetRule {
            builder: self,
            facet: Facet::Tag,
        }
    }

    /// Conditions on the `id` attribute
    pub fn id(&mut self) -> FacetRule<'_> {
        self.attr("id")
    }

    /// Conditions on the `type` attribute
    pub fn input_type(&mut self) -> FacetRule<'_> {
        self.attr("type")
    }

    /// Conditions on the `name` attribute
    pub fn name(&mut self) -> FacetRule<'_> {
        self.attr("name")
    }

    /// Conditions on any attribute
    pub fn attr(&mut self, name: &str) -> FacetRule<'_> {
        FacetRule {
            builder: self,
            facet: Facet::Attribute(name.to_string()),
        }
    }

    /// Conditions on the class list
    pub fn css_classes(&mut self) -> ClassRule<'_> {
        ClassRule { builder: self }
    }

    /// Checks that apply only when the tag is `tag`
    pub fn when_tag(&mut self, tag: &str, declare: impl FnOnce(&mut RuleBuilder)) {
        let mut nested = RuleBuilder::default();
        declare(&mut nested);
        self.errors.extend(nested.errors);
        self.checks.push(Check::WhenTag {
            tag: tag.to_ascii_lowercase(),
            checks: nested.checks,
        });
    }
}

/// Conditions on one facet
#[derive(Debug)]
pub struct FacetRule<'a> {
    builder: &'a mut RuleBuilder,
    facet: Facet,
}

impl FacetRule<'_> {
    fn push(self, condition: ValueCondition) {
        self.builder.checks.push(Check::Value {
            facet: self.facet,
            condition,
        });
    }

    fn value(&self, value: impl Into<String>) -> String {
        let value = value.into();
        if self.facet == Facet::Tag {
            value.to_ascii_lowercase()
        } else {
            value
        }
    }

    /// Equals the value
    pub fn is(self, value: impl Into<String>) {
        let value = self.value(value);
        self.push(ValueCondition::Is(value));
    }

    /// Absent or different from the value
    pub fn is_not(self, value: impl Into<String>) {
        let value = self.value(value);
        self.push(ValueCondition::IsNot(value));
    }

    /// Equals one of the values
    pub fn is_one_of<I, S>(self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(|v| self.value(v)).collect();
        self.push(ValueCondition::IsOneOf(values));
    }

    /// Present with any value
    pub fn is_present(self) {
        self.push(ValueCondition::IsPresent);
    }

    /// Not present
    pub fn is_absent(self) {
        self.push(ValueCondition::IsAbsent);
    }

    /// Contains the substring
    pub fn contains(self, part: impl Into<String>) {
        let part = self.value(part);
        self.push(ValueCondition::Contains(part));
    }

    /// Absent or not containing the substring
    pub fn does_not_contain(self, part: impl Into<String>) {
        let part = self.value(part);
        self.push(ValueCondition::DoesNotContain(part));
    }

    /// Starts with the prefix
    pub fn starts_with(self, prefix: impl Into<String>) {
        let prefix = self.value(prefix);
        self.push(ValueCondition::StartsWith(prefix));
    }

    /// Ends with the suffix
    pub fn ends_with(self, suffix: impl Into<String>) {
        let suffix = self.value(suffix);
        self.push(ValueCondition::EndsWith(suffix));
    }

    /// Matches the regular expression
    pub fn matches(self, pattern: &str) {
        match Regex::new(pattern) {
            Ok(re) => self.push(ValueCondition::Matches(re)),
            Err(err) => self
                .builder
                .errors
                .push(format!("invalid pattern for {}: {err}", self.facet)),
        }
    }
}

/// Conditions on the class list
#[derive(Debug)]
pub struct ClassRule<'a> {
    builder: &'a mut RuleBuilder,
}

fn strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl ClassRule<'_> {
    fn push(self, condition: ClassCondition) {
        self.builder.checks.push(Check::Classes(condition));
    }

    /// Carries the class
    pub fn has(self, class: impl Into<String>) {
        self.push(ClassCondition::Has(class.into()));
    }

    /// Does not carry the class
    pub fn does_not_have(self, class: impl Into<String>) {
        self.push(ClassCondition::DoesNotHave(class.into()));
    }

    /// Carries every class
    pub fn has_all_of<I: IntoIterator<Item = S>, S: Into<String>>(self, classes: I) {
        self.push(ClassCondition::HasAllOf(strings(classes)));
    }

    /// Carries at least one class
    pub fn has_any_of<I: IntoIterator<Item = S>, S: Into<String>>(self, classes: I) {
        self.push(ClassCondition::HasAnyOf(strings(classes)));
    }

    /// Carries none of the classes
    pub fn has_none_of<I: IntoIterator<Item = S>, S: Into<String>>(self, classes: I) {
        self.push(ClassCondition::HasNoneOf(strings(classes)));
    }

    /// Has at least one class
    pub fn is_present(self) {
        self.push(ClassCondition::IsPresent);
    }

    /// Has no class
    pub fn is_absent(self) {
        self.push(ClassCondition::IsAbsent);
    }
}
