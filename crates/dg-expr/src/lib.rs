#![forbid(unsafe_code)]

//! Formula mini-language.
//!
//! Formulas are small expressions over the cells of one row. Columns are
//! referenced with `{name}` placeholders (the name is everything between the
//! braces, spaces included):
//!
//! ```text
//! {price} * {quantity}
//! {region} == 'West' and {sales} >= 1000
//! ```
//!
//! Text is parsed once into an [`Expr`] tree and evaluated by walking it; the
//! grammar only knows arithmetic, comparison and boolean operators, literals
//! and placeholders.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use dg_types::{Scalar, TypeError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Gt,
    Lt,
    Eq,
    Ne,
    Ge,
    Le,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column {
        name: String,
    },
    Literal {
        value: Scalar,
    },
    Add {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Sub {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Mul {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Div {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Rem {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Neg {
        expr: Box<Expr>,
    },
    And {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Or {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not {
        expr: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        right: Box<Expr>,
        op: ComparisonOp,
    },
}

impl Expr {
    /// Names of every column referenced by a placeholder.
    #[must_use]
    pub fn references(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Column { name } => {
                out.insert(name.clone());
            }
            Self::Literal { .. } => {}
            Self::Add { left, right }
            | Self::Sub { left, right }
            | Self::Mul { left, right }
            | Self::Div { left, right }
            | Self::Rem { left, right }
            | Self::And { left, right }
            | Self::Or { left, right }
            | Self::Compare { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            Self::Neg { expr } | Self::Not { expr } => expr.collect_references(out),
        }
    }
}

/// How placeholder values enter an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// Every placeholder is coerced to a float; text that does not parse as a
    /// number is an invalid value.
    Numeric,
    /// Placeholders keep the cell's own value.
    Raw,
}

/// Read access to the cells of one row by column name.
pub trait Bindings {
    fn lookup(&self, name: &str) -> Option<&Scalar>;

    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

impl Bindings for BTreeMap<String, Scalar> {
    fn lookup(&self, name: &str) -> Option<&Scalar> {
        self.get(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("parse error: {0}")]
    ParseError(String),
}

/// Failure while evaluating a formula against one row.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("unknown column reference: {0}")]
    MissingColumn(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error("division by zero")]
    DivisionByZero,
}

impl EvalError {
    /// Bad input data, as opposed to a missing dependency.
    #[must_use]
    pub fn is_value_error(&self) -> bool {
        matches!(self, Self::InvalidValue(_) | Self::Type(_))
    }
}

pub fn evaluate<B: Bindings + ?Sized>(
    expr: &Expr,
    bindings: &B,
    mode: EvalMode,
) -> Result<Scalar, EvalError> {
    match expr {
        Expr::Column { name } => {
            let value = bindings
                .lookup(name)
                .ok_or_else(|| EvalError::MissingColumn(name.clone()))?;
            match mode {
                EvalMode::Numeric => Ok(Scalar::Float64(value.to_f64()?)),
                EvalMode::Raw => Ok(value.clone()),
            }
        }
        Expr::Literal { value } => Ok(value.clone()),
        Expr::Add { left, right } => {
            let lhs = evaluate(left, bindings, mode)?;
            let rhs = evaluate(right, bindings, mode)?;
            if let (Scalar::Utf8(a), Scalar::Utf8(b)) = (&lhs, &rhs) {
                return Ok(Scalar::Utf8(format!("{a}{b}")));
            }
            arithmetic(&lhs, &rhs, ArithmeticOp::Add)
        }
        Expr::Sub { left, right } => {
            binary_arithmetic(left, right, bindings, mode, ArithmeticOp::Sub)
        }
        Expr::Mul { left, right } => {
            binary_arithmetic(left, right, bindings, mode, ArithmeticOp::Mul)
        }
        Expr::Div { left, right } => {
            binary_arithmetic(left, right, bindings, mode, ArithmeticOp::Div)
        }
        Expr::Rem { left, right } => {
            binary_arithmetic(left, right, bindings, mode, ArithmeticOp::Rem)
        }
        Expr::Neg { expr } => match evaluate(expr, bindings, mode)? {
            Scalar::Int64(v) => v
                .checked_neg()
                .map(Scalar::Int64)
                .ok_or_else(|| EvalError::InvalidValue(format!("cannot negate {v}"))),
            Scalar::Bool(v) => Ok(Scalar::Int64(-i64::from(v))),
            Scalar::Float64(v) => Ok(Scalar::Float64(-v)),
            other => Err(EvalError::InvalidValue(format!(
                "cannot negate non-numeric value {other:?}"
            ))),
        },
        Expr::And { left, right } => {
            if !evaluate(left, bindings, mode)?.is_truthy() {
                return Ok(Scalar::Bool(false));
            }
            Ok(Scalar::Bool(evaluate(right, bindings, mode)?.is_truthy()))
        }
        Expr::Or { left, right } => {
            if evaluate(left, bindings, mode)?.is_truthy() {
                return Ok(Scalar::Bool(true));
            }
            Ok(Scalar::Bool(evaluate(right, bindings, mode)?.is_truthy()))
        }
        Expr::Not { expr } => Ok(Scalar::Bool(!evaluate(expr, bindings, mode)?.is_truthy())),
        Expr::Compare { left, right, op } => {
            let lhs = evaluate(left, bindings, mode)?;
            let rhs = evaluate(right, bindings, mode)?;
            compare(&lhs, &rhs, *op).map(Scalar::Bool)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        })
    }
}

fn binary_arithmetic<B: Bindings + ?Sized>(
    left: &Expr,
    right: &Expr,
    bindings: &B,
    mode: EvalMode,
    op: ArithmeticOp,
) -> Result<Scalar, EvalError> {
    let lhs = evaluate(left, bindings, mode)?;
    let rhs = evaluate(right, bindings, mode)?;
    arithmetic(&lhs, &rhs, op)
}

fn as_int(value: &Scalar) -> Option<i64> {
    match value {
        Scalar::Int64(v) => Some(*v),
        Scalar::Bool(v) => Some(i64::from(*v)),
        _ => None,
    }
}

fn arithmetic(lhs: &Scalar, rhs: &Scalar, op: ArithmeticOp) -> Result<Scalar, EvalError> {
    let numeric = |value: &Scalar| {
        matches!(value, Scalar::Int64(_) | Scalar::Float64(_) | Scalar::Bool(_))
    };
    if !numeric(lhs) || !numeric(rhs) {
        return Err(EvalError::InvalidValue(format!(
            "unsupported operands for {op}: {lhs:?} and {rhs:?}"
        )));
    }

    // Integer arithmetic stays integral except for true division.
    if let (Some(a), Some(b)) = (as_int(lhs), as_int(rhs)) {
        let overflow = || EvalError::InvalidValue(format!("integer overflow in {a} {op} {b}"));
        return match op {
            ArithmeticOp::Add => a.checked_add(b).map(Scalar::Int64).ok_or_else(overflow),
            ArithmeticOp::Sub => a.checked_sub(b).map(Scalar::Int64).ok_or_else(overflow),
            ArithmeticOp::Mul => a.checked_mul(b).map(Scalar::Int64).ok_or_else(overflow),
            ArithmeticOp::Div if b == 0 => Err(EvalError::DivisionByZero),
            ArithmeticOp::Div => Ok(Scalar::Float64(a as f64 / b as f64)),
            ArithmeticOp::Rem if b == 0 => Err(EvalError::DivisionByZero),
            ArithmeticOp::Rem => Ok(Scalar::Int64(floored_rem_i64(a, b))),
        };
    }

    let a = lhs.to_f64()?;
    let b = rhs.to_f64()?;
    let out = match op {
        ArithmeticOp::Add => a + b,
        ArithmeticOp::Sub => a - b,
        ArithmeticOp::Mul => a * b,
        ArithmeticOp::Div | ArithmeticOp::Rem if b == 0.0 => {
            return Err(EvalError::DivisionByZero);
        }
        ArithmeticOp::Div => a / b,
        ArithmeticOp::Rem => {
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }
        }
    };
    Ok(Scalar::Float64(out))
}

/// Remainder taking the sign of the divisor.
fn floored_rem_i64(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && (r < 0) != (b < 0) { r + b } else { r }
}

fn compare(lhs: &Scalar, rhs: &Scalar, op: ComparisonOp) -> Result<bool, EvalError> {
    use std::cmp::Ordering;

    let ordering = match (lhs, rhs) {
        (Scalar::Utf8(a), Scalar::Utf8(b)) => a.cmp(b),
        (Scalar::Null(a), Scalar::Null(b)) => a.cmp(b),
        (a, b) if a.dtype() != dg_types::DType::Utf8
            && b.dtype() != dg_types::DType::Utf8
            && !a.is_missing()
            && !b.is_missing() =>
        {
            let x = a.to_f64()?;
            let y = b.to_f64()?;
            x.partial_cmp(&y).ok_or_else(|| {
                EvalError::InvalidValue(format!("cannot order {x} and {y}"))
            })?
        }
        // Values of unrelated kinds are never equal and have no order.
        _ => {
            return match op {
                ComparisonOp::Eq => Ok(false),
                ComparisonOp::Ne => Ok(true),
                _ => Err(EvalError::InvalidValue(format!(
                    "cannot order {lhs:?} and {rhs:?}"
                ))),
            };
        }
    };

    Ok(match op {
        ComparisonOp::Gt => ordering == Ordering::Greater,
        ComparisonOp::Lt => ordering == Ordering::Less,
        ComparisonOp::Eq => ordering == Ordering::Equal,
        ComparisonOp::Ne => ordering != Ordering::Equal,
        ComparisonOp::Ge => ordering != Ordering::Less,
        ComparisonOp::Le => ordering != Ordering::Greater,
    })
}

/// A parsed formula together with the way its placeholders are bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
    mode: EvalMode,
    references: BTreeSet<String>,
}

impl Formula {
    pub fn compile(source: impl Into<String>, mode: EvalMode) -> Result<Self, ExprError> {
        let source = source.into();
        let expr = parse_formula(&source)?;
        let references = expr.references();
        Ok(Self {
            source,
            expr,
            mode,
            references,
        })
    }

    /// Arithmetic formula for calculated columns; placeholders become floats.
    pub fn numeric(source: impl Into<String>) -> Result<Self, ExprError> {
        Self::compile(source, EvalMode::Numeric)
    }

    /// Boolean formula for filters and style rules; placeholders keep raw values.
    pub fn predicate(source: impl Into<String>) -> Result<Self, ExprError> {
        Self::compile(source, EvalMode::Raw)
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    #[must_use]
    pub fn mode(&self) -> EvalMode {
        self.mode
    }

    #[must_use]
    pub fn references(&self) -> &BTreeSet<String> {
        &self.references
    }

    /// True once every referenced column is bound.
    pub fn is_ready<B: Bindings + ?Sized>(&self, bindings: &B) -> bool {
        self.references.iter().all(|name| bindings.contains(name))
    }

    pub fn evaluate<B: Bindings + ?Sized>(&self, bindings: &B) -> Result<Scalar, EvalError> {
        evaluate(&self.expr, bindings, self.mode)
    }

    pub fn matches<B: Bindings + ?Sized>(&self, bindings: &B) -> Result<bool, EvalError> {
        self.evaluate(bindings).map(|value| value.is_truthy())
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse a formula into an expression tree.
///
/// Grammar:
///   or_expr    → and_expr ( ("or" | "||") and_expr )*
///   and_expr   → not_expr ( ("and" | "&&") not_expr )*
///   not_expr   → ("not" | "!") not_expr | comparison
///   comparison → add_expr ( ("==" | "!=" | ">" | ">=" | "<" | "<=") add_expr )?
///   add_expr   → mul_expr ( ("+" | "-") mul_expr )*
///   mul_expr   → unary ( ("*" | "/" | "%") unary )*
///   unary      → "-" unary | atom
///   atom       → NUMBER | STRING | BOOL | "{" NAME "}" | "(" or_expr ")"
///
/// Parentheses, `-` and `not` may nest at most [`MAX_NESTING`] deep.
pub fn parse_formula(input: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::ParseError("empty formula".into()));
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let result = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(ExprError::ParseError(format!(
            "unexpected token at position {}: {token:?}",
            parser.pos
        )));
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Placeholder(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    // Comparison
    EqEq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    // Grouping
    LParen,
    RParen,
    // Logical
    And,
    Or,
    Not,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let next = chars.get(i + 1).copied();
        match c {
            '{' => {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != '}' {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(ExprError::ParseError("unterminated placeholder".into()));
                }
                let name: String = chars[start..i].iter().collect();
                if name.is_empty() {
                    return Err(ExprError::ParseError("empty placeholder '{}'".into()));
                }
                tokens.push(Token::Placeholder(name));
                i += 1; // skip closing brace
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '=' => {
                if next == Some('=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    return Err(ExprError::ParseError(
                        "expected '==' but found single '='".into(),
                    ));
                }
            }
            '!' => {
                if next == Some('=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    tokens.push(Token::Not);
                    i += 1;
                }
            }
            '&' | '|' => {
                if next == Some(c) {
                    tokens.push(if c == '&' { Token::And } else { Token::Or });
                    i += 2;
                } else {
                    return Err(ExprError::ParseError(format!(
                        "expected '{c}{c}' but found single '{c}'"
                    )));
                }
            }
            '>' => {
                if next == Some('=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '<' => {
                if next == Some('=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != quote {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(ExprError::ParseError("unterminated string literal".into()));
                }
                let s: String = chars[start..i].iter().collect();
                tokens.push(Token::Str(s));
                i += 1; // skip closing quote
            }
            _ if c.is_ascii_digit() || (c == '.' && next.is_some_and(|d| d.is_ascii_digit())) => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                if num_str.contains('.') {
                    tokens.push(Token::Float(num_str.parse::<f64>().map_err(|_| {
                        ExprError::ParseError(format!("invalid float: {num_str}"))
                    })?));
                } else {
                    tokens.push(Token::Int(num_str.parse::<i64>().map_err(|_| {
                        ExprError::ParseError(format!("invalid integer: {num_str}"))
                    })?));
                }
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "not" => tokens.push(Token::Not),
                    "true" | "True" => tokens.push(Token::Bool(true)),
                    "false" | "False" => tokens.push(Token::Bool(false)),
                    _ => {
                        return Err(ExprError::ParseError(format!(
                            "bare name '{word}'; reference columns as {{{word}}}"
                        )));
                    }
                }
            }
            _ => {
                return Err(ExprError::ParseError(format!(
                    "unexpected character: '{c}'"
                )));
            }
        }
    }
    Ok(tokens)
}

/// Deepest nesting of parentheses and prefix operators a formula may use.
pub const MAX_NESTING: usize = 256;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        if self.depth >= MAX_NESTING {
            return Err(ExprError::ParseError("formula nests too deeply".into()));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Or {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Expr::And {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Not) {
            let inner = self.nested(Self::parse_not)?;
            return Ok(Expr::Not {
                expr: Box::new(inner),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.parse_add()?;
        let op = match self.peek() {
            Some(Token::EqEq) => ComparisonOp::Eq,
            Some(Token::NotEq) => ComparisonOp::Ne,
            Some(Token::Gt) => ComparisonOp::Gt,
            Some(Token::Ge) => ComparisonOp::Ge,
            Some(Token::Lt) => ComparisonOp::Lt,
            Some(Token::Le) => ComparisonOp::Le,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_add()?;
        Ok(Expr::Compare {
            left: Box::new(left),
            right: Box::new(right),
            op,
        })
    }

    fn parse_add(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_mul()?;
        loop {
            let build: fn(Box<Expr>, Box<Expr>) -> Expr = match self.peek() {
                Some(Token::Plus) => |left, right| Expr::Add { left, right },
                Some(Token::Minus) => |left, right| Expr::Sub { left, right },
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_mul()?;
            left = build(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;
        loop {
            let build: fn(Box<Expr>, Box<Expr>) -> Expr = match self.peek() {
                Some(Token::Star) => |left, right| Expr::Mul { left, right },
                Some(Token::Slash) => |left, right| Expr::Div { left, right },
                Some(Token::Percent) => |left, right| Expr::Rem { left, right },
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = build(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if !self.eat(&Token::Minus) {
            return self.parse_atom();
        }
        let inner = self.nested(Self::parse_unary)?;
        // Fold negative literals so `-5` parses as a literal.
        Ok(match inner {
            Expr::Literal {
                value: Scalar::Int64(v),
            } => Expr::Literal {
                value: Scalar::Int64(-v),
            },
            Expr::Literal {
                value: Scalar::Float64(v),
            } => Expr::Literal {
                value: Scalar::Float64(-v),
            },
            other => Expr::Neg {
                expr: Box::new(other),
            },
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, ExprError> {
        let Some(token) = self.peek() else {
            return Err(ExprError::ParseError("unexpected end of expression".into()));
        };
        self.pos += 1;
        let literal = |value: Scalar| Expr::Literal { value };
        match token {
            Token::Int(n) => Ok(literal(Scalar::Int64(*n))),
            Token::Float(f) => Ok(literal(Scalar::Float64(*f))),
            Token::Str(s) => Ok(literal(Scalar::Utf8(s.clone()))),
            Token::Bool(b) => Ok(literal(Scalar::Bool(*b))),
            Token::Placeholder(name) => Ok(Expr::Column { name: name.clone() }),
            Token::LParen => {
                let inner = self.nested(Self::parse_or)?;
                if !self.eat(&Token::RParen) {
                    return Err(ExprError::ParseError("expected closing ')'".into()));
                }
                Ok(inner)
            }
            other => Err(ExprError::ParseError(format!("unexpected token: {other:?}"))),
        }
    }
}
