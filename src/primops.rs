//! The fixed table of primitive operators.
//!
//! Primitive operators are part of the language: the parser turns an
//! identifier naming one of them into [`Expr::Prim`](crate::ast::Expr) and
//! the evaluator applies them to already-evaluated arguments. The set is
//! closed; there is no dynamic registration.
//!
//! Strictness rules:
//! - Arity is validated for every application.
//! - Arithmetic detects and reports overflow instead of wrapping.
//! - `car`/`cdr` require a pair; applying them to the empty list is an
//!   error (which is how a dictionary lookup with an absent key surfaces
//!   after lowering).

use crate::Error;
use crate::ast::NumberType;
use crate::evaluator::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Expected number of arguments for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    /// Check if the given number of arguments is valid
    pub fn validate(&self, got: usize) -> Result<(), Error> {
        match *self {
            Arity::Exact(expected) if got != expected => Err(Error::arity(expected, got)),
            Arity::AtLeast(expected) if got < expected => Err(Error::arity(expected, got)),
            _ => Ok(()),
        }
    }
}

/// Definition of a primitive operator
#[derive(Debug)]
pub struct PrimOp {
    /// The identifier for this operation in source programs
    pub name: &'static str,
    /// Expected number of arguments
    pub arity: Arity,
    func: fn(&[Value]) -> Result<Value, Error>,
}

impl PrimOp {
    /// Validate arity and apply the operator to evaluated arguments
    pub fn apply(&self, args: &[Value]) -> Result<Value, Error> {
        self.arity.validate(args.len())?;
        (self.func)(args)
    }
}

/// Look up a primitive operator by name
pub fn find_prim(name: &str) -> Option<&'static PrimOp> {
    PRIM_INDEX.get(name).copied()
}

/// Check if an identifier names a primitive operator
pub fn is_primitive(name: &str) -> bool {
    PRIM_INDEX.contains_key(name)
}

//
// Implementations
//

fn expect_number(value: &Value) -> Result<NumberType, Error> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(Error::Type(format!("expected a number, got {other}"))),
    }
}

/// Only `#f` is false; every other value counts as true
fn is_true(value: &Value) -> bool {
    !matches!(value, Value::Bool(false))
}

fn prim_add(args: &[Value]) -> Result<Value, Error> {
    let mut acc: NumberType = 0;
    for arg in args {
        acc = acc
            .checked_add(expect_number(arg)?)
            .ok_or_else(|| Error::Eval("Arithmetic overflow in \"+\"".to_owned()))?;
    }
    Ok(Value::Number(acc))
}

fn prim_sub(args: &[Value]) -> Result<Value, Error> {
    let first = expect_number(&args[0])?;
    if args.len() == 1 {
        // Unary minus
        return first
            .checked_neg()
            .map(Value::Number)
            .ok_or_else(|| Error::Eval("Arithmetic overflow in \"-\"".to_owned()));
    }
    let mut acc = first;
    for arg in &args[1..] {
        acc = acc
            .checked_sub(expect_number(arg)?)
            .ok_or_else(|| Error::Eval("Arithmetic overflow in \"-\"".to_owned()))?;
    }
    Ok(Value::Number(acc))
}

fn prim_mul(args: &[Value]) -> Result<Value, Error> {
    let mut acc: NumberType = 1;
    for arg in args {
        acc = acc
            .checked_mul(expect_number(arg)?)
            .ok_or_else(|| Error::Eval("Arithmetic overflow in \"*\"".to_owned()))?;
    }
    Ok(Value::Number(acc))
}

fn prim_div(args: &[Value]) -> Result<Value, Error> {
    let mut acc = expect_number(&args[0])?;
    for arg in &args[1..] {
        let divisor = expect_number(arg)?;
        if divisor == 0 {
            return Err(Error::Eval("Division by zero".to_owned()));
        }
        acc = acc
            .checked_div(divisor)
            .ok_or_else(|| Error::Eval("Arithmetic overflow in \"/\"".to_owned()))?;
    }
    Ok(Value::Number(acc))
}

// Chained numeric comparisons: all adjacent pairs must satisfy the operator
macro_rules! numeric_comparison {
    ($name:ident, $op:tt) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let mut prev = expect_number(&args[0])?;
            for arg in &args[1..] {
                let current = expect_number(arg)?;
                if !(prev $op current) {
                    return Ok(Value::Bool(false));
                }
                prev = current;
            }
            Ok(Value::Bool(true))
        }
    };
}

numeric_comparison!(prim_lt, <);
numeric_comparison!(prim_gt, >);
numeric_comparison!(prim_num_eq, ==);

/// Structural equality on atoms; pairs and procedures are never `eq?`
fn eqv(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::Prim(x), Value::Prim(y)) => x == y,
        (Value::Empty, Value::Empty) => true,
        _ => false,
    }
}

fn prim_eq(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(eqv(&args[0], &args[1])))
}

fn prim_not(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(!is_true(&args[0])))
}

fn prim_and(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args.iter().all(is_true)))
}

fn prim_or(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args.iter().any(is_true)))
}

fn prim_cons(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::pair(args[0].clone(), args[1].clone()))
}

fn prim_car(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Pair(head, _) => Ok(head.as_ref().clone()),
        other => Err(Error::Eval(format!("car expects a pair, got {other}"))),
    }
}

fn prim_cdr(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Pair(_, tail) => Ok(tail.as_ref().clone()),
        other => Err(Error::Eval(format!("cdr expects a pair, got {other}"))),
    }
}

fn prim_list(args: &[Value]) -> Result<Value, Error> {
    Ok(args
        .iter()
        .rev()
        .fold(Value::Empty, |acc, v| Value::pair(v.clone(), acc)))
}

fn prim_is_pair(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(&args[0], Value::Pair(_, _))))
}

fn prim_is_number(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(&args[0], Value::Number(_))))
}

fn prim_is_boolean(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(&args[0], Value::Bool(_))))
}

fn prim_is_symbol(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(&args[0], Value::Symbol(_))))
}

fn prim_is_string(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(&args[0], Value::Str(_))))
}

fn prim_string_eq(args: &[Value]) -> Result<Value, Error> {
    match (&args[0], &args[1]) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a == b)),
        _ => Err(Error::Type("string=? expects string arguments".to_owned())),
    }
}

static PRIM_OPS: &[PrimOp] = &[
    PrimOp {
        name: "+",
        arity: Arity::AtLeast(1),
        func: prim_add,
    },
    PrimOp {
        name: "-",
        arity: Arity::AtLeast(1),
        func: prim_sub,
    },
    PrimOp {
        name: "*",
        arity: Arity::AtLeast(1),
        func: prim_mul,
    },
    PrimOp {
        name: "/",
        arity: Arity::AtLeast(2),
        func: prim_div,
    },
    PrimOp {
        name: "<",
        arity: Arity::AtLeast(2),
        func: prim_lt,
    },
    PrimOp {
        name: ">",
        arity: Arity::AtLeast(2),
        func: prim_gt,
    },
    PrimOp {
        name: "=",
        arity: Arity::AtLeast(2),
        func: prim_num_eq,
    },
    PrimOp {
        name: "eq?",
        arity: Arity::Exact(2),
        func: prim_eq,
    },
    PrimOp {
        name: "not",
        arity: Arity::Exact(1),
        func: prim_not,
    },
    PrimOp {
        name: "and",
        arity: Arity::AtLeast(2),
        func: prim_and,
    },
    PrimOp {
        name: "or",
        arity: Arity::AtLeast(2),
        func: prim_or,
    },
    PrimOp {
        name: "cons",
        arity: Arity::Exact(2),
        func: prim_cons,
    },
    PrimOp {
        name: "car",
        arity: Arity::Exact(1),
        func: prim_car,
    },
    PrimOp {
        name: "cdr",
        arity: Arity::Exact(1),
        func: prim_cdr,
    },
    PrimOp {
        name: "list",
        arity: Arity::AtLeast(0),
        func: prim_list,
    },
    PrimOp {
        name: "pair?",
        arity: Arity::Exact(1),
        func: prim_is_pair,
    },
    PrimOp {
        name: "number?",
        arity: Arity::Exact(1),
        func: prim_is_number,
    },
    PrimOp {
        name: "boolean?",
        arity: Arity::Exact(1),
        func: prim_is_boolean,
    },
    PrimOp {
        name: "symbol?",
        arity: Arity::Exact(1),
        func: prim_is_symbol,
    },
    PrimOp {
        name: "string?",
        arity: Arity::Exact(1),
        func: prim_is_string,
    },
    PrimOp {
        name: "string=?",
        arity: Arity::Exact(2),
        func: prim_string_eq,
    },
];

static PRIM_INDEX: LazyLock<HashMap<&'static str, &'static PrimOp>> =
    LazyLock::new(|| PRIM_OPS.iter().map(|op| (op.name, op)).collect());
