//! XPath evaluation for the fixture DOM.
//!
//! Location paths of `/axis::test[predicate]*` steps over the `descendant`,
//! `child`, `parent`, `following-sibling`, `following`, `preceding-sibling`
//! and `preceding` axes, optionally starting at the context node (`.`). The
//! abbreviations `//`, `..` and a bare name test (child axis) are accepted.
//! Predicates support `and`/`or`, `=`/`!=`, `+`/`-`, attributes, `.`,
//! `self::tag`, relative paths and the functions `not`, `count`, `contains`,
//! `starts-with`, `substring`, `string-length`, `concat`, `normalize-space`,
//! `position` and `last`. Positions on reverse axes count nearest first.

use super::dom::{DomState, NodeId};

// =============================================================================
// TOKENS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    Axis(String),
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    At,
    Dot,
    Star,
    Eq,
    Neq,
    Plus,
    Minus,
    Number(f64),
    Literal(String),
    Name(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '[' | ']' | '(' | ')' | ',' | '@' | '*' | '=' | '+' | '-' => {
                tokens.push(match c {
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    '@' => Token::At,
                    '*' => Token::Star,
                    '=' => Token::Eq,
                    '+' => Token::Plus,
                    _ => Token::Minus,
                });
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Neq);
                i += 2;
            }
            '.' if !chars.get(i + 1).is_some_and(char::is_ascii_digit) => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|q| *q == c)
                    .ok_or("unterminated literal")?;
                tokens.push(Token::Literal(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Number(
                    text.parse().map_err(|_| format!("bad number {text}"))?,
                ));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '-' || chars[i] == '_')
                {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                if chars.get(i) == Some(&':') && chars.get(i + 1) == Some(&':') {
                    tokens.push(Token::Axis(name));
                    i += 2;
                } else {
                    tokens.push(Token::Name(name));
                }
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

// =============================================================================
// AST
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Descendant,
    Child,
    Parent,
    FollowingSibling,
    Following,
    PrecedingSibling,
    Preceding,
}

impl Axis {
    fn named(name: &str) -> Result<Self, String> {
        Ok(match name {
            "descendant" => Self::Descendant,
            "child" => Self::Child,
            "parent" => Self::Parent,
            "following-sibling" => Self::FollowingSibling,
            "following" => Self::Following,
            "preceding-sibling" => Self::PrecedingSibling,
            "preceding" => Self::Preceding,
            other => return Err(format!("unsupported axis {other}")),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Literal(String),
    Attribute(String),
    Context,
    SelfTest(Option<String>),
    Nodes(Vec<Step>),
    Call(String, Vec<Expr>),
    Not(Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Or,
    And,
    Eq,
    Neq,
    Add,
    Sub,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    /// Preceded by `//`: the axis applies to every descendant-or-self node
    any_depth: bool,
    axis: Axis,
    tag: Option<String>,
    predicates: Vec<Expr>,
}

/// Parsed location path
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Path {
    relative: bool,
    steps: Vec<Step>,
}

struct Parser {
    tokens: Vec<Token>,
    at: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.at)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.at).cloned();
        self.at += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.at += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), String> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(format!("expected {token:?}, found {:?}", self.peek()))
        }
    }

    fn name_test(&mut self) -> Result<Option<String>, String> {
        match self.next() {
            Some(Token::Star) => Ok(None),
            Some(Token::Name(name)) => Ok(Some(name.to_ascii_lowercase())),
            other => Err(format!("expected a name test, found {other:?}")),
        }
    }

    fn step(&mut self, any_depth: bool, axis: Option<Axis>) -> Result<Step, String> {
        let axis = match axis {
            Some(axis) => axis,
            None => match self.peek().cloned() {
                Some(Token::Axis(name)) => {
                    self.at += 1;
                    Axis::named(&name)?
                }
                Some(Token::Dot) => {
                    self.at += 1;
                    self.expect(&Token::Dot)?;
                    return Ok(Step {
                        any_depth,
                        axis: Axis::Parent,
                        tag: None,
                        predicates: Vec::new(),
                    });
                }
                _ => Axis::Child,
            },
        };
        let tag = self.name_test()?;
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.or_expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(Step {
            any_depth,
            axis,
            tag,
            predicates,
        })
    }

    fn path(&mut self) -> Result<Path, String> {
        let relative = self.eat(&Token::Dot);
        let mut steps = Vec::new();
        while self.eat(&Token::Slash) {
            let any_depth = self.eat(&Token::Slash);
            steps.push(self.step(any_depth, None)?);
        }
        if steps.is_empty() {
            return Err("expected at least one step".to_string());
        }
        if let Some(token) = self.peek() {
            return Err(format!("unexpected trailing {token:?}"));
        }
        Ok(Path { relative, steps })
    }

    /// Relative path inside a predicate, starting with an explicit axis
    fn relative_path(&mut self, axis: Axis) -> Result<Expr, String> {
        let mut steps = vec![self.step(false, Some(axis))?];
        while self.eat(&Token::Slash) {
            let any_depth = self.eat(&Token::Slash);
            steps.push(self.step(any_depth, None)?);
        }
        Ok(Expr::Nodes(steps))
    }

    fn binary(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, String>,
        op_for: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, String> {
        let mut left = operand(self)?;
        while let Some(op) = self.peek().and_then(op_for) {
            self.at += 1;
            let right = operand(self)?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn or_expr(&mut self) -> Result<Expr, String> {
        self.binary(Self::and_expr, |t| {
            matches!(t, Token::Name(n) if n == "or").then_some(BinaryOp::Or)
        })
    }

    fn and_expr(&mut self) -> Result<Expr, String> {
        self.binary(Self::eq_expr, |t| {
            matches!(t, Token::Name(n) if n == "and").then_some(BinaryOp::And)
        })
    }

    fn eq_expr(&mut self) -> Result<Expr, String> {
        self.binary(Self::add_expr, |t| match t {
            Token::Eq => Some(BinaryOp::Eq),
            Token::Neq => Some(BinaryOp::Neq),
            _ => None,
        })
    }

    fn add_expr(&mut self) -> Result<Expr, String> {
        self.binary(Self::primary, |t| match t {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Literal(s)) => Ok(Expr::Literal(s)),
            Some(Token::Dot) => Ok(Expr::Context),
            Some(Token::At) => match self.next() {
                Some(Token::Name(name)) => Ok(Expr::Attribute(name)),
                other => Err(format!("expected an attribute name, found {other:?}")),
            },
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Axis(axis)) if axis == "self" => Ok(Expr::SelfTest(self.name_test()?)),
            Some(Token::Axis(axis)) => self.relative_path(Axis::named(&axis)?),
            Some(Token::Name(name)) => {
                self.expect(&Token::LParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.or_expr()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                if name == "not" {
                    let [arg] = <[Expr; 1]>::try_from(args)
                        .map_err(|_| "not() takes one argument".to_string())?;
                    Ok(Expr::Not(Box::new(arg)))
                } else {
                    Ok(Expr::Call(name, args))
                }
            }
            other => Err(format!("unexpected {other:?} in predicate")),
        }
    }
}

/// Parse a location path
pub(crate) fn parse(expression: &str) -> Result<Path, String> {
    let mut parser = Parser {
        tokens: tokenize(expression)?,
        at: 0,
    };
    parser.path()
}

// =============================================================================
// EVALUATION
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    /// Attribute node-set with at most one member
    Attr(Option<String>),
    /// Size of an element node-set
    Nodes(usize),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::Bool(b) => *b,
            Self::Attr(a) => a.is_some(),
            Self::Nodes(n) => *n > 0,
        }
    }

    fn text(&self) -> String {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Str(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Attr(a) => a.clone().unwrap_or_default(),
            Self::Nodes(_) => String::new(),
        }
    }

    fn number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Bool(b) => f64::from(u8::from(*b)),
            other => other.text().trim().parse().unwrap_or(f64::NAN),
        }
    }
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Attr(None), _) | (_, Value::Attr(None)) => false,
        (Value::Bool(_), _) | (_, Value::Bool(_)) => left.truthy() == right.truthy(),
        (Value::Number(_), _) | (_, Value::Number(_)) => left.number() == right.number(),
        _ => left.text() == right.text(),
    }
}

struct Context<'a> {
    dom: &'a DomState,
    node: NodeId,
    position: usize,
    size: usize,
}

impl Context<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value, String> {
        Ok(match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::Literal(s) => Value::Str(s.clone()),
            Expr::Attribute(name) => {
                Value::Attr(self.dom.node(self.node).attribute(name).map(str::to_string))
            }
            Expr::Context => Value::Str(self.dom.text_content(self.node)),
            Expr::SelfTest(tag) => Value::Bool(
                tag.as_ref()
                    .map_or(true, |tag| self.dom.node(self.node).tag == *tag),
            ),
            Expr::Nodes(steps) => {
                let mut current = vec![self.node];
                for step in steps {
                    current = step.apply(self.dom, &current)?;
                }
                Value::Nodes(current.len())
            }
            Expr::Not(inner) => Value::Bool(!self.eval(inner)?.truthy()),
            Expr::Binary(left, op, right) => {
                let left = self.eval(left)?;
                match op {
                    BinaryOp::Or => Value::Bool(left.truthy() || self.eval(right)?.truthy()),
                    BinaryOp::And => Value::Bool(left.truthy() && self.eval(right)?.truthy()),
                    BinaryOp::Eq => Value::Bool(equals(&left, &self.eval(right)?)),
                    BinaryOp::Neq => {
                        let right = self.eval(right)?;
                        Value::Bool(
                            !matches!(left, Value::Attr(None))
                                && !matches!(right, Value::Attr(None))
                                && !equals(&left, &right),
                        )
                    }
                    BinaryOp::Add => Value::Number(left.number() + self.eval(right)?.number()),
                    BinaryOp::Sub => Value::Number(left.number() - self.eval(right)?.number()),
                }
            }
            Expr::Call(name, args) => self.call(name, args)?,
        })
    }

    fn call(&self, name: &str, args: &[Expr]) -> Result<Value, String> {
        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let text = |i: usize| values.get(i).map(Value::text).unwrap_or_default();
        Ok(match (name, values.len()) {
            ("position", 0) => Value::Number(self.position as f64),
            ("last", 0) => Value::Number(self.size as f64),
            ("count", 1) => match values[0] {
                Value::Nodes(n) => Value::Number(n as f64),
                _ => return Err("count() takes a node-set".to_string()),
            },
            ("contains", 2) => Value::Bool(text(0).contains(&text(1))),
            ("starts-with", 2) => Value::Bool(text(0).starts_with(&text(1))),
            ("string-length", 1) => Value::Number(text(0).chars().count() as f64),
            ("concat", n) if n >= 2 => Value::Str((0..n).map(text).collect()),
            ("normalize-space", 0 | 1) => {
                let subject = if values.is_empty() {
                    self.dom.text_content(self.node)
                } else {
                    text(0)
                };
                Value::Str(subject.split_whitespace().collect::<Vec<_>>().join(" "))
            }
            ("substring", 2 | 3) => {
                let start = values[1].number().round();
                let end = values.get(2).map(|len| start + len.number().round());
                Value::Str(
                    text(0)
                        .chars()
                        .enumerate()
                        .filter(|(i, _)| {
                            let position = (*i + 1) as f64;
                            position >= start && end.map_or(true, |end| position < end)
                        })
                        .map(|(_, c)| c)
                        .collect(),
                )
            }
            (name, n) => return Err(format!("unsupported function {name}/{n}")),
        })
    }
}

impl Step {
    fn axis_nodes(&self, dom: &DomState, node: NodeId) -> Vec<NodeId> {
        match self.axis {
            Axis::Descendant => dom.descendants(node),
            Axis::Child => dom.children(node).to_vec(),
            Axis::Parent => dom.parent_element(node).into_iter().collect(),
            Axis::FollowingSibling => dom.following_siblings(node),
            Axis::Following => dom.following(node),
            Axis::PrecedingSibling => dom.preceding_siblings(node),
            Axis::Preceding => dom.preceding(node),
        }
    }

    /// Apply the step to every context node; positions are per context node
    fn apply(&self, dom: &DomState, context: &[NodeId]) -> Result<Vec<NodeId>, String> {
        let bases: Vec<NodeId> = if self.any_depth {
            context
                .iter()
                .flat_map(|node| std::iter::once(*node).chain(dom.descendants(*node)))
                .collect()
        } else {
            context.to_vec()
        };
        let mut next = Vec::new();
        for node in bases {
            let mut candidates: Vec<NodeId> = self
                .axis_nodes(dom, node)
                .into_iter()
                .filter(|n| {
                    let candidate = dom.node(*n);
                    candidate.is_element()
                        && self.tag.as_ref().map_or(true, |tag| candidate.tag == *tag)
                })
                .collect();
            for predicate in &self.predicates {
                let size = candidates.len();
                let mut kept = Vec::with_capacity(size);
                for (index, candidate) in candidates.iter().enumerate() {
                    let ctx = Context {
                        dom,
                        node: *candidate,
                        position: index + 1,
                        size,
                    };
                    let keep = match ctx.eval(predicate)? {
                        Value::Number(n) => n == (index + 1) as f64,
                        other => other.truthy(),
                    };
                    if keep {
                        kept.push(*candidate);
                    }
                }
                candidates = kept;
            }
            next.extend(candidates);
        }
        Ok(dom.document_order(next))
    }
}

impl Path {
    /// Evaluate from `context` (for relative paths) or `document`
    pub fn select(&self, dom: &DomState, document: NodeId, context: Option<NodeId>) -> Result<Vec<NodeId>, String> {
        let start = if self.relative {
            context.unwrap_or(document)
        } else {
            document
        };
        let mut current = vec![start];
        for step in &self.steps {
            current = step.apply(dom, &current)?;
        }
        Ok(current)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parses_emitted_forms() {
            for expression in [
                "/descendant::button[normalize-space(.) = 'Save']",
                "./descendant::form[@id = 'f']/child::input",
                "/descendant::dt[normalize-space(.) = 'Name']/following-sibling::*[1][self::dd]",
                "./child::x/following::p/child::b",
                "/descendant::li[not(position() = last())][not(position() = 2)]",
                "/descendant::a[contains(concat(' ', normalize-space(@class), ' '), ' btn ')]\
                 [substring(@href, string-length(@href) - string-length('.pdf') + 1) = '.pdf']",
                "/descendant::p[@title = concat('it', \"'\", 's \"x\"')]",
                "/descendant::td[normalize-space(.) = 'Total']/parent::*/preceding-sibling::tr[1]/preceding::h2",
                "/descendant::li[count(preceding-sibling::*) = 1]/following-sibling::li[count(following-sibling::li) = 0]",
                ".//ul[@id = 'menu']/li[last()]/..",
            ] {
                assert!(parse(expression).is_ok(), "{expression}");
            }
        }

        #[test]
        fn test_rejects_unsupported() {
            assert!(parse("//").is_err());
            assert!(parse("/ancestor::div").is_err());
            assert!(parse("/descendant::li[ancestor::ul]").is_err());
            assert!(parse("/descendant::div[").is_err());
            assert!(parse(".").is_err());
        }
    }

    mod value_tests {
        use super::*;

        #[test]
        fn test_missing_attribute_never_equals() {
            assert!(!equals(&Value::Attr(None), &Value::Str(String::new())));
            assert!(equals(&Value::Attr(Some("a".into())), &Value::Str("a".into())));
        }

        #[test]
        fn test_number_rendering() {
            assert_eq!(Value::Number(3.0).text(), "3");
            assert_eq!(Value::Number(2.5).text(), "2.5");
        }
    }
}
