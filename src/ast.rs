//! Core Abstract Syntax Tree types for the L3/L32 language family.
//!
//! Two models live here. [`Expr`] is the expression tree produced by the
//! parser: literals, variable references, conditionals, procedures,
//! applications, primitive operators, quoted literals, and the L32-only
//! `dict` form. [`SExpr`] is the quoted-data model: the symbols, pairs and
//! atoms that a `quote` form embeds into a program without evaluating them.
//! The dict-elimination rewrite bridges the two by converting dict entries
//! into an [`SExpr`] association list.
//!
//! Ergonomic helper functions such as [`num`], [`var`], [`app`], [`sym`] and
//! [`nil`] are provided for convenient tree construction in both code and
//! tests. `Display` implementations render concrete syntax; the output of
//! `Display` parses back to an equal tree.

use std::fmt;

/// Type alias for number values in the interpreter
pub type NumberType = i64;

/// Allowed non-alphanumeric characters in symbol names
/// Most represent mathematical symbols or predicates ("?")
pub const SYMBOL_SPECIAL_CHARS: &str = "+-*/<>=!?_";

/// Check if a string is a valid symbol name
/// Valid: non-empty, no leading digit, no "-digit" prefix, alphanumeric + SYMBOL_SPECIAL_CHARS
pub fn is_valid_symbol(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        None => false, // name is empty
        Some(first_char) => {
            if first_char.is_ascii_digit() {
                return false;
            }

            if first_char == '-'
                && let Some(second_char) = chars.next()
                && second_char.is_ascii_digit()
            {
                return false;
            }

            name.chars()
                .all(|c| c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c))
        }
    }
}

/// A single `(key value)` entry of a `dict` form.
///
/// The key is a bare symbol in the concrete syntax; the value is an
/// arbitrary expression. Keys are not checked for uniqueness here: duplicate
/// detection is the evaluator's construction-time concern.
#[derive(Debug, Clone, PartialEq)]
pub struct DictEntry {
    pub key: String,
    pub value: Expr,
}

/// An expression in the L32 language (L3 plus the `dict` form).
///
/// The enum is closed on purpose: every consumer matches exhaustively, so
/// adding a node kind forces a compile-time review of the parser, the
/// rewrite and the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number literal (integers only)
    Num(NumberType),
    /// Boolean literal (`#t` / `#f`)
    Bool(bool),
    /// String literal
    Str(String),
    /// Variable reference
    Var(String),
    /// Primitive operator drawn from the fixed built-in set (`+`, `eq?`, `car`, ...)
    Prim(String),
    /// Quoted literal embedding pre-built data, not evaluated
    Lit(SExpr),
    /// Conditional `(if test then alt)`
    If {
        test: Box<Expr>,
        then: Box<Expr>,
        alt: Box<Expr>,
    },
    /// Procedure `(lambda (params...) body...)` with a non-empty body
    Lambda { params: Vec<String>, body: Vec<Expr> },
    /// Application `(rator rands...)`
    App { rator: Box<Expr>, rands: Vec<Expr> },
    /// Dictionary literal `(dict (key value) ...)` - L32 only, eliminated by
    /// the rewrite and never present in lowered output
    Dict(Vec<DictEntry>),
}

/// A top-level form: a definition or a bare expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TopForm {
    Define { name: String, value: Expr },
    Expr(Expr),
}

/// An ordered sequence of top-level forms.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub forms: Vec<TopForm>,
}

/// Quoted S-expression values: the data model behind `quote`.
///
/// A converted dict becomes a proper list of `(symbol . value)` pairs
/// terminated by [`SExpr::Empty`], in declaration order. The `Prim` variant
/// exists because the value-quoting conversion embeds primitive operators
/// as data; the parser never produces it.
#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    Number(NumberType),
    Bool(bool),
    Str(String),
    Symbol(String),
    Prim(String),
    Empty,
    Pair(Box<SExpr>, Box<SExpr>),
}

impl Expr {
    /// True if any `dict` form occurs anywhere in this tree.
    pub fn contains_dict(&self) -> bool {
        match self {
            Expr::Num(_)
            | Expr::Bool(_)
            | Expr::Str(_)
            | Expr::Var(_)
            | Expr::Prim(_)
            | Expr::Lit(_) => false,
            Expr::If { test, then, alt } => {
                test.contains_dict() || then.contains_dict() || alt.contains_dict()
            }
            Expr::Lambda { body, .. } => body.iter().any(Expr::contains_dict),
            Expr::App { rator, rands } => {
                rator.contains_dict() || rands.iter().any(Expr::contains_dict)
            }
            Expr::Dict(_) => true,
        }
    }
}

impl Program {
    pub fn new(forms: Vec<TopForm>) -> Self {
        Program { forms }
    }

    /// True if any `dict` form occurs anywhere in the program.
    pub fn contains_dict(&self) -> bool {
        self.forms.iter().any(|form| match form {
            TopForm::Define { value, .. } => value.contains_dict(),
            TopForm::Expr(e) => e.contains_dict(),
        })
    }
}

//
// Helper constructors - work great in nested tree literals
//

/// Number literal expression
pub fn num(n: NumberType) -> Expr {
    Expr::Num(n)
}

/// String literal expression
pub fn string(s: impl Into<String>) -> Expr {
    Expr::Str(s.into())
}

/// Variable reference
pub fn var(name: impl Into<String>) -> Expr {
    Expr::Var(name.into())
}

/// Primitive operator reference
pub fn prim(op: impl Into<String>) -> Expr {
    Expr::Prim(op.into())
}

/// Quoted literal
pub fn lit(value: SExpr) -> Expr {
    Expr::Lit(value)
}

/// Conditional expression
pub fn if_exp(test: Expr, then: Expr, alt: Expr) -> Expr {
    Expr::If {
        test: Box::new(test),
        then: Box::new(then),
        alt: Box::new(alt),
    }
}

/// Procedure expression
pub fn lambda(params: &[&str], body: Vec<Expr>) -> Expr {
    Expr::Lambda {
        params: params.iter().map(|p| (*p).to_owned()).collect(),
        body,
    }
}

/// Application expression
pub fn app(rator: Expr, rands: Vec<Expr>) -> Expr {
    Expr::App {
        rator: Box::new(rator),
        rands,
    }
}

/// Dictionary literal from `(key, value)` pairs
pub fn dict(entries: Vec<(&str, Expr)>) -> Expr {
    Expr::Dict(
        entries
            .into_iter()
            .map(|(key, value)| DictEntry {
                key: key.to_owned(),
                value,
            })
            .collect(),
    )
}

/// Quoted symbol
pub fn sym(name: impl Into<String>) -> SExpr {
    SExpr::Symbol(name.into())
}

/// Cons cell
pub fn pair(head: SExpr, tail: SExpr) -> SExpr {
    SExpr::Pair(Box::new(head), Box::new(tail))
}

/// The empty list
pub fn nil() -> SExpr {
    SExpr::Empty
}

impl From<NumberType> for Expr {
    fn from(n: NumberType) -> Self {
        Expr::Num(n)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Bool(b)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Str(s.to_owned())
    }
}

impl From<NumberType> for SExpr {
    fn from(n: NumberType) -> Self {
        SExpr::Number(n)
    }
}

impl From<bool> for SExpr {
    fn from(b: bool) -> Self {
        SExpr::Bool(b)
    }
}

impl From<&str> for SExpr {
    fn from(s: &str) -> Self {
        SExpr::Str(s.to_owned())
    }
}

/// Write a string literal with escapes, shared by both Display impls
fn write_escaped_string(f: &mut fmt::Formatter, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in s.chars() {
        match ch {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SExpr::Number(n) => write!(f, "{n}"),
            SExpr::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            SExpr::Str(s) => write_escaped_string(f, s),
            SExpr::Symbol(s) => write!(f, "{s}"),
            SExpr::Prim(op) => write!(f, "{op}"),
            SExpr::Empty => write!(f, "()"),
            SExpr::Pair(head, tail) => {
                // Render proper lists as (a b c) and improper tails as (a . b)
                write!(f, "({head}")?;
                let mut rest = tail.as_ref();
                loop {
                    match rest {
                        SExpr::Pair(h, t) => {
                            write!(f, " {h}")?;
                            rest = t.as_ref();
                        }
                        SExpr::Empty => break,
                        other => {
                            write!(f, " . {other}")?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{n}"),
            Expr::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Expr::Str(s) => write_escaped_string(f, s),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Prim(op) => write!(f, "{op}"),
            Expr::Lit(value) => write!(f, "'{value}"),
            Expr::If { test, then, alt } => write!(f, "(if {test} {then} {alt})"),
            Expr::Lambda { params, body } => {
                write!(f, "(lambda (")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")?;
                for b in body {
                    write!(f, " {b}")?;
                }
                write!(f, ")")
            }
            Expr::App { rator, rands } => {
                write!(f, "({rator}")?;
                for rand in rands {
                    write!(f, " {rand}")?;
                }
                write!(f, ")")
            }
            Expr::Dict(entries) => {
                write!(f, "(dict")?;
                for entry in entries {
                    write!(f, " ({} {})", entry.key, entry.value)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for TopForm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TopForm::Define { name, value } => write!(f, "(define {name} {value})"),
            TopForm::Expr(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Programs still containing dict forms are L32; lowered ones are L3
        let dialect = if self.contains_dict() { "L32" } else { "L3" };
        write!(f, "({dialect}")?;
        for form in &self.forms {
            write!(f, " {form}")?;
        }
        write!(f, ")")
    }
}
