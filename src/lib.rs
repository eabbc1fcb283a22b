//! dictless - A teaching interpreter for a Scheme subset with dictionary sugar
//!
//! This crate implements a small Scheme-like language family used for
//! interpreter exercises. The base language (L3) has numbers, booleans,
//! strings, variables, `if`, `lambda`, applications, quoted data and a fixed
//! set of primitive operators. The extended language (L32) adds a `dict`
//! special form:
//!
//! ```scheme
//! ((dict (a 1) (b 2)) 'a)   ; => 1
//! ```
//!
//! The centerpiece is a desugaring pass that eliminates every `dict` form by
//! rewriting it into an ordinary application over a quoted association list,
//! plus a lowering step that prepends a synthesized recursive lookup helper
//! so the result is a plain L3 program:
//!
//! ```scheme
//! ;; (dict (a 1) (b 2))  becomes  (dict '((a . 1) (b . 2)))
//! ;; where `dict` is a curried linear alist search defined by the lowering.
//! ```
//!
//! ## Modules
//!
//! - `ast`: expression trees and the quoted S-expression value model
//! - `rewrite`: the `dict`-elimination rewrite and program lowering
//! - `parser`: concrete-syntax parsing from text (feature `parser`)
//! - `primops`: the fixed primitive-operator table
//! - `evaluator`: environment-passing tree evaluator for both dialects
//!
//! The rewrite itself is total and pure: it performs no I/O, never fails on
//! well-formed trees, and never mutates its input. Errors in this crate come
//! from the parser (malformed syntax, including malformed `dict` entries) and
//! from the evaluator (unbound variables, arity and type violations, and the
//! dictionary lookup contract).

use std::fmt;

/// Maximum parsing depth to prevent stack overflow on deeply nested input
pub const MAX_PARSE_DEPTH: usize = 32;

/// Maximum evaluation depth to prevent stack overflow in recursive evaluation
/// Set higher than parse depth to allow for nested function applications
pub const MAX_EVAL_DEPTH: usize = 256;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad tokens, malformed expressions)
    InvalidSyntax,
    /// Input ended before the expression was complete
    Incomplete,
    /// Expression nesting exceeded the maximum parse depth
    TooDeeplyNested,
    /// Extra input found after a complete, valid expression
    TrailingContent,
}

/// A structured error describing a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
        }
    }
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Parse(ParseError),
    /// Evaluation failures, including the dictionary lookup contract
    /// ("Key <k> not found in dictionary", "Bad procedure <value>", ...)
    Eval(String),
    Type(String),
    UnboundVariable(String),
    Arity {
        expected: usize,
        got: usize,
    },
}

impl Error {
    pub fn arity(expected: usize, got: usize) -> Self {
        Error::Arity { expected, got }
    }

    pub fn parse(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Error::Parse(ParseError::new(kind, message))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "ParseError: {}", e.message),
            Error::Eval(msg) => write!(f, "{msg}"),
            Error::Type(msg) => write!(f, "Type error: {msg}"),
            Error::UnboundVariable(var) => write!(f, "Unbound variable: {var}"),
            Error::Arity { expected, got } => write!(
                f,
                "ArityError: procedure expected {expected} arguments but got {got}"
            ),
        }
    }
}

pub mod ast;
pub mod evaluator;
pub mod primops;
pub mod rewrite;

#[cfg(feature = "parser")]
pub mod parser;
