//! CSS selector evaluation for the fixture DOM.
//!
//! Supports compound selectors (`tag`, `*`, `#id`, `.class`, `[attr]`,
//! `[attr=v]`, `*=`, `^=`, `$=`, `~=`, `:not(..)`, `:scope`, and the
//! `first-`/`last-`/`nth-`/`nth-last-` forms of `:*-child` and `:*-of-type`
//! with integer arguments) joined by the descendant, child, next-sibling and
//! following-sibling combinators.

use std::iter::Peekable;
use std::str::Chars;

use super::dom::{DomState, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Descendant,
    Child,
    NextSibling,
    FollowingSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    Includes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Id(String),
    Class(String),
    Attr {
        name: String,
        test: Option<(AttrOp, String)>,
    },
    Not(Compound),
    Scope,
    Sibling {
        n: usize,
        from_end: bool,
        of_type: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    tests: Vec<Simple>,
}

/// Parsed selector: compounds joined by the relation to the previous one
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Selector {
    steps: Vec<(Relation, Compound)>,
}

// =============================================================================
// PARSER
// =============================================================================

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
            skipped = true;
        }
        skipped
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!("expected '{expected}'"))
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        let mut out = String::new();
        while let Some(c) = self.chars.peek().copied().filter(|c| is_ident_char(*c)) {
            out.push(c);
            self.chars.next();
        }
        if out.is_empty() {
            Err("expected an identifier".to_string())
        } else {
            Ok(out)
        }
    }

    fn escape(&mut self) -> Result<char, String> {
        let mut hex = String::new();
        while hex.len() < 6 && self.chars.peek().is_some_and(char::is_ascii_hexdigit) {
            hex.extend(self.chars.next());
        }
        if hex.is_empty() {
            return self.chars.next().ok_or_else(|| "dangling escape".to_string());
        }
        self.eat(' ');
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| format!("bad escape \\{hex}"))
    }

    fn string(&mut self) -> Result<String, String> {
        let quote = match self.chars.next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err("expected a quoted string".to_string()),
        };
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some('\\') => out.push(self.escape()?),
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err("unterminated string".to_string()),
            }
        }
    }

    fn integer_argument(&mut self) -> Result<usize, String> {
        self.expect('(')?;
        self.skip_whitespace();
        let mut digits = String::new();
        while let Some(c) = self.chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(c);
            self.chars.next();
        }
        self.skip_whitespace();
        self.expect(')')?;
        digits
            .parse()
            .map_err(|_| format!("expected an integer argument, found '{digits}'"))
    }

    fn pseudo_class(&mut self, name: &str) -> Result<Simple, String> {
        let (rest, from_end) = if let Some(rest) = name.strip_prefix("nth-last-") {
            (rest, true)
        } else if let Some(rest) = name.strip_prefix("nth-") {
            (rest, false)
        } else if let Some(rest) = name.strip_prefix("first-") {
            return Self::sibling(rest, 1, false);
        } else if let Some(rest) = name.strip_prefix("last-") {
            return Self::sibling(rest, 1, true);
        } else {
            return Err(format!("unsupported pseudo-class :{name}"));
        };
        if !matches!(rest, "child" | "of-type") {
            return Err(format!("unsupported pseudo-class :{name}"));
        }
        let n = self.integer_argument()?;
        Self::sibling(rest, n, from_end)
    }

    fn sibling(unit: &str, n: usize, from_end: bool) -> Result<Simple, String> {
        let of_type = match unit {
            "child" => false,
            "of-type" => true,
            other => return Err(format!("unsupported structural pseudo-class {other}")),
        };
        Ok(Simple::Sibling {
            n,
            from_end,
            of_type,
        })
    }

    fn attribute(&mut self) -> Result<Simple, String> {
        self.skip_whitespace();
        let name = self.ident()?;
        self.skip_whitespace();
        if self.eat(']') {
            return Ok(Simple::Attr { name, test: None });
        }
        let op = match self.chars.next() {
            Some('=') => AttrOp::Equals,
            Some(c @ ('*' | '^' | '$' | '~')) => {
                self.expect('=')?;
                match c {
                    '*' => AttrOp::Contains,
                    '^' => AttrOp::StartsWith,
                    '$' => AttrOp::EndsWith,
                    _ => AttrOp::Includes,
                }
            }
            other => return Err(format!("unsupported attribute operator {other:?}")),
        };
        self.skip_whitespace();
        let value = if matches!(self.chars.peek(), Some('"' | '\'')) {
            self.string()?
        } else {
            self.ident()?
        };
        self.skip_whitespace();
        self.expect(']')?;
        Ok(Simple::Attr {
            name,
            test: Some((op, value)),
        })
    }

    fn compound(&mut self) -> Result<Compound, String> {
        let mut compound = Compound::default();
        let universal = self.eat('*');
        if !universal && self.chars.peek().is_some_and(char::is_ascii_alphabetic) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
        }
        loop {
            match self.chars.peek() {
                Some('#') => {
                    self.chars.next();
                    compound.tests.push(Simple::Id(self.ident()?));
                }
                Some('.') => {
                    self.chars.next();
                    compound.tests.push(Simple::Class(self.ident()?));
                }
                Some('[') => {
                    self.chars.next();
                    compound.tests.push(self.attribute()?);
                }
                Some(':') => {
                    self.chars.next();
                    match self.ident()?.as_str() {
                        "scope" => compound.tests.push(Simple::Scope),
                        "not" => {
                            self.expect('(')?;
                            let inner = self.compound()?;
                            self.expect(')')?;
                            compound.tests.push(Simple::Not(inner));
                        }
                        other => {
                            let simple = self.pseudo_class(other)?;
                            compound.tests.push(simple);
                        }
                    }
                }
                _ => break,
            }
        }
        if !universal && compound.tag.is_none() && compound.tests.is_empty() {
            return Err("empty compound selector".to_string());
        }
        Ok(compound)
    }
}

/// Parse a selector
pub(crate) fn parse(selector: &str) -> Result<Selector, String> {
    let mut parser = Parser {
        chars: selector.trim().chars().peekable(),
    };
    let mut steps = vec![(Relation::Descendant, parser.compound()?)];
    loop {
        let spaced = parser.skip_whitespace();
        let relation = match parser.chars.peek() {
            None => break,
            Some('>') => Relation::Child,
            Some('+') => Relation::NextSibling,
            Some('~') => Relation::FollowingSibling,
            Some(_) if spaced => Relation::Descendant,
            Some(c) => return Err(format!("unexpected '{c}'")),
        };
        if relation != Relation::Descendant {
            parser.chars.next();
            parser.skip_whitespace();
        }
        steps.push((relation, parser.compound()?));
    }
    Ok(Selector { steps })
}

// =============================================================================
// MATCHING
// =============================================================================

fn matches_compound(dom: &DomState, id: NodeId, compound: &Compound, scope: Option<NodeId>) -> bool {
    let node = dom.node(id);
    if !node.is_element() {
        return false;
    }
    if compound.tag.as_ref().is_some_and(|tag| *tag != node.tag) {
        return false;
    }
    compound.tests.iter().all(|test| match test {
        Simple::Id(id) => node.attribute("id") == Some(id.as_str()),
        Simple::Class(class) => node.has_class(class),
        Simple::Attr { name, test } => match (node.attribute(name), test) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(actual), Some((op, expected))) => match op {
                AttrOp::Equals => actual == expected,
                AttrOp::Contains => !expected.is_empty() && actual.contains(expected.as_str()),
                AttrOp::StartsWith => !expected.is_empty() && actual.starts_with(expected.as_str()),
                AttrOp::EndsWith => !expected.is_empty() && actual.ends_with(expected.as_str()),
                AttrOp::Includes => actual.split_whitespace().any(|w| w == expected),
            },
        },
        Simple::Not(inner) => !matches_compound(dom, id, inner, scope),
        Simple::Scope => scope == Some(id),
        Simple::Sibling {
            n,
            from_end,
            of_type,
        } => sibling_position(dom, id, *from_end, *of_type) == Some(*n),
    })
}

/// 1-based position of `id` among its element siblings
fn sibling_position(dom: &DomState, id: NodeId, from_end: bool, of_type: bool) -> Option<usize> {
    let parent = dom.parent_element(id)?;
    let tag = &dom.node(id).tag;
    let siblings: Vec<NodeId> = dom
        .children(parent)
        .iter()
        .copied()
        .filter(|s| {
            let sibling = dom.node(*s);
            sibling.is_element() && (!of_type || sibling.tag == *tag)
        })
        .collect();
    let index = siblings.iter().position(|s| *s == id)?;
    Some(if from_end {
        siblings.len() - index
    } else {
        index + 1
    })
}

fn matches_from(dom: &DomState, id: NodeId, steps: &[(Relation, Compound)], scope: Option<NodeId>) -> bool {
    let Some(((relation, compound), earlier)) = steps.split_last() else {
        return true;
    };
    if !matches_compound(dom, id, compound, scope) {
        return false;
    }
    if earlier.is_empty() {
        return true;
    }
    match relation {
        Relation::Child => dom
            .parent_element(id)
            .is_some_and(|parent| matches_from(dom, parent, earlier, scope)),
        Relation::Descendant => {
            let mut current = dom.parent_element(id);
            while let Some(ancestor) = current {
                if matches_from(dom, ancestor, earlier, scope) {
                    return true;
                }
                current = dom.parent_element(ancestor);
            }
            false
        }
        Relation::NextSibling => dom
            .preceding_siblings(id)
            .first()
            .is_some_and(|sibling| matches_from(dom, *sibling, earlier, scope)),
        Relation::FollowingSibling => dom
            .preceding_siblings(id)
            .iter()
            .any(|sibling| matches_from(dom, *sibling, earlier, scope)),
    }
}

impl Selector {
    /// Elements below `root` matching the selector, in document order
    pub fn select(&self, dom: &DomState, root: NodeId, scope: Option<NodeId>) -> Vec<NodeId> {
        dom.descendants(root)
            .into_iter()
            .filter(|id| matches_from(dom, *id, &self.steps, scope))
            .collect()
    }
}
