//! Environment-passing tree evaluator for L3 and L32 programs.
//!
//! Top-level `define`s live in a [`GlobalEnv`]; procedure application
//! extends a persistent chain of local [`Frame`]s. Variable lookup walks the
//! local chain first and falls back to the globals, so a closure created by
//! a top-level definition can call itself through its global binding. The
//! synthesized `dict` lookup helper produced by
//! [`lower_program`](crate::rewrite::lower_program) depends on exactly that.
//!
//! The evaluator also gives the L32 `dict` form its native semantics:
//! evaluating a dict builds a dictionary value (rejecting duplicate keys),
//! and applying a dictionary value to a quoted symbol performs the lookup
//! with strict validation. Note the asymmetry with the rewrite: native
//! evaluation evaluates entry values, while the rewrite quotes them as
//! syntax. Both behaviors are pinned by tests.
//!
//! Evaluation is depth-limited (`MAX_EVAL_DEPTH`) to turn runaway recursion
//! into an error instead of a stack overflow.

use crate::Error;
use crate::MAX_EVAL_DEPTH;
use crate::ast::{DictEntry, Expr, NumberType, Program, SExpr, TopForm};
use crate::primops::find_prim;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(NumberType),
    Bool(bool),
    Str(String),
    /// A quoted symbol
    Symbol(String),
    /// The empty list
    Empty,
    /// A cons cell; shared structure is fine because values are immutable
    Pair(Rc<Value>, Rc<Value>),
    /// A user procedure with its captured local frame chain
    Closure {
        params: Vec<String>,
        body: Vec<Expr>,
        env: Option<Rc<Frame>>,
    },
    /// A primitive operator, by name
    Prim(String),
    /// A native L32 dictionary: ordered key/value pairs
    Dict(Vec<(String, Value)>),
}

impl Value {
    /// Quoted symbol value
    pub fn symbol(name: impl Into<String>) -> Value {
        Value::Symbol(name.into())
    }

    /// Cons cell value
    pub fn pair(head: Value, tail: Value) -> Value {
        Value::Pair(Rc::new(head), Rc::new(tail))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Str(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Empty => write!(f, "()"),
            Value::Pair(head, tail) => {
                write!(f, "({head}")?;
                let mut rest = tail.as_ref();
                loop {
                    match rest {
                        Value::Pair(h, t) => {
                            write!(f, " {h}")?;
                            rest = t.as_ref();
                        }
                        Value::Empty => break,
                        other => {
                            write!(f, " . {other}")?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Value::Closure { .. } => write!(f, "#<procedure>"),
            Value::Prim(name) => write!(f, "#<primitive:{name}>"),
            Value::Dict(pairs) => {
                write!(f, "(dict")?;
                for (key, value) in pairs {
                    write!(f, " ({key} {value})")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// One local binding frame, chained to the frame of the enclosing call.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Rc<Frame>>,
}

impl Frame {
    fn extend(
        params: &[String],
        args: Vec<Value>,
        parent: Option<Rc<Frame>>,
    ) -> Rc<Frame> {
        let bindings = params.iter().cloned().zip(args).collect();
        Rc::new(Frame { bindings, parent })
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.bindings
            .get(name)
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.get(name)))
    }
}

/// Top-level definitions.
#[derive(Debug, Clone, Default)]
pub struct GlobalEnv {
    bindings: HashMap<String, Value>,
}

impl GlobalEnv {
    pub fn new() -> Self {
        GlobalEnv {
            bindings: HashMap::new(),
        }
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// All current bindings, for interactive inspection
    pub fn bindings(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.bindings.iter()
    }
}

/// Only `#f` is false; every other value counts as true
fn is_true(value: &Value) -> bool {
    !matches!(value, Value::Bool(false))
}

/// Convert quoted data into a runtime value
fn sexpr_to_value(sexpr: &SExpr) -> Value {
    match sexpr {
        SExpr::Number(n) => Value::Number(*n),
        SExpr::Bool(b) => Value::Bool(*b),
        SExpr::Str(s) => Value::Str(s.clone()),
        SExpr::Symbol(s) => Value::Symbol(s.clone()),
        SExpr::Prim(op) => Value::Prim(op.clone()),
        SExpr::Empty => Value::Empty,
        SExpr::Pair(head, tail) => Value::pair(sexpr_to_value(head), sexpr_to_value(tail)),
    }
}

/// Evaluate a whole program in a fresh global environment.
///
/// Definitions extend the globals in order; the result is the value of the
/// last bare expression.
pub fn eval_program(program: &Program) -> Result<Value, Error> {
    let mut globals = GlobalEnv::new();
    let mut result = None;
    for form in &program.forms {
        if let Some(value) = eval_top_form(form, &mut globals)? {
            result = Some(value);
        }
    }
    result.ok_or_else(|| Error::Eval("Program contains no expression to evaluate".to_owned()))
}

/// Evaluate one top-level form against an existing global environment.
///
/// Returns `None` for a definition (which only extends the globals) and the
/// resulting value for a bare expression.
pub fn eval_top_form(form: &TopForm, globals: &mut GlobalEnv) -> Result<Option<Value>, Error> {
    match form {
        TopForm::Define { name, value } => {
            let value = eval_in(value, &None, globals, 0)?;
            globals.define(name.clone(), value);
            Ok(None)
        }
        TopForm::Expr(e) => eval_in(e, &None, globals, 0).map(Some),
    }
}

/// Evaluate a single expression with no local bindings.
pub fn eval_expr(exp: &Expr, globals: &GlobalEnv) -> Result<Value, Error> {
    eval_in(exp, &None, globals, 0)
}

fn eval_in(
    exp: &Expr,
    frame: &Option<Rc<Frame>>,
    globals: &GlobalEnv,
    depth: usize,
) -> Result<Value, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::Eval(format!(
            "Evaluation too deeply nested (max depth: {MAX_EVAL_DEPTH})"
        )));
    }
    match exp {
        Expr::Num(n) => Ok(Value::Number(*n)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Var(name) => frame
            .as_ref()
            .and_then(|frame| frame.get(name))
            .or_else(|| globals.get(name))
            .cloned()
            .ok_or_else(|| Error::UnboundVariable(name.clone())),
        Expr::Prim(op) => Ok(Value::Prim(op.clone())),
        Expr::Lit(value) => Ok(sexpr_to_value(value)),
        Expr::If { test, then, alt } => {
            if is_true(&eval_in(test, frame, globals, depth + 1)?) {
                eval_in(then, frame, globals, depth + 1)
            } else {
                eval_in(alt, frame, globals, depth + 1)
            }
        }
        Expr::Lambda { params, body } => Ok(Value::Closure {
            params: params.clone(),
            body: body.clone(),
            env: frame.clone(),
        }),
        Expr::App { rator, rands } => {
            let func = eval_in(rator, frame, globals, depth + 1)?;
            let args = rands
                .iter()
                .map(|rand| eval_in(rand, frame, globals, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            apply(func, args, globals, depth)
        }
        Expr::Dict(entries) => eval_dict(entries, frame, globals, depth),
    }
}

/// Native L32 dict construction: reject duplicate keys, evaluate values.
fn eval_dict(
    entries: &[DictEntry],
    frame: &Option<Rc<Frame>>,
    globals: &GlobalEnv,
    depth: usize,
) -> Result<Value, Error> {
    let mut pairs: Vec<(String, Value)> = Vec::with_capacity(entries.len());
    for entry in entries {
        if pairs.iter().any(|(key, _)| key == &entry.key) {
            return Err(Error::Eval(format!(
                "Duplicate key in dictionary: {}",
                entry.key
            )));
        }
        let value = eval_in(&entry.value, frame, globals, depth + 1)?;
        pairs.push((entry.key.clone(), value));
    }
    Ok(Value::Dict(pairs))
}

/// Apply a procedure value to evaluated arguments.
fn apply(func: Value, args: Vec<Value>, globals: &GlobalEnv, depth: usize) -> Result<Value, Error> {
    match func {
        Value::Prim(name) => match find_prim(&name) {
            Some(op) => op.apply(&args),
            None => Err(Error::Eval(format!("Unknown primitive operator: {name}"))),
        },
        Value::Closure { params, body, env } => {
            if params.len() != args.len() {
                return Err(Error::arity(params.len(), args.len()));
            }
            let call_frame = Frame::extend(&params, args, env);
            let frame = Some(call_frame);
            let mut result = None;
            for exp in &body {
                result = Some(eval_in(exp, &frame, globals, depth + 1)?);
            }
            // The parser guarantees a non-empty body
            result.ok_or_else(|| Error::Eval("Procedure has an empty body".to_owned()))
        }
        Value::Dict(pairs) => apply_dict(&pairs, &args),
        other => Err(Error::Eval(format!("Bad procedure {other}"))),
    }
}

/// The dictionary lookup contract: exactly one argument, which must be a
/// symbol; the first matching key wins; an absent key is an error.
fn apply_dict(pairs: &[(String, Value)], args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(Error::Eval(format!(
            "Dictionary lookup expects exactly one argument, got {}",
            args.len()
        )));
    }
    match &args[0] {
        Value::Symbol(k) => pairs
            .iter()
            .find(|(key, _)| key == k)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| Error::Eval(format!("Key {k} not found in dictionary"))),
        other => Err(Error::Eval(format!(
            "Dictionary key must be a symbol, got {other}"
        ))),
    }
}

#[cfg(all(test, feature = "parser"))]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::rewrite::lower_program;

    fn eval_str(input: &str) -> Result<Value, Error> {
        eval_program(&parse_program(input)?)
    }

    /// Parse an L32 program, lower it to L3, and evaluate the result
    fn eval_lowered(input: &str) -> Result<Value, Error> {
        let program = parse_program(input)?;
        let lowered = lower_program(&program);
        assert!(!lowered.contains_dict(), "lowering left a dict behind");
        eval_program(&lowered)
    }

    #[test]
    fn test_basic_evaluation() {
        let cases: Vec<(&str, Value)> = vec![
            ("(L3 42)", Value::Number(42)),
            ("(L3 (+ 1 2 3))", Value::Number(6)),
            ("(L3 (if (< 1 2) \"yes\" \"no\"))", Value::Str("yes".to_owned())),
            ("(L3 (if #f 1 2))", Value::Number(2)),
            // Non-boolean test values count as true
            ("(L3 (if 0 1 2))", Value::Number(1)),
            ("(L3 ((lambda (x y) (* x y)) 3 4))", Value::Number(12)),
            ("(L3 (define x 5) (+ x 1))", Value::Number(6)),
            ("(L3 'a)", Value::symbol("a")),
            (
                "(L3 '(1 2))",
                Value::pair(Value::Number(1), Value::pair(Value::Number(2), Value::Empty)),
            ),
            ("(L3 (car '(a b)))", Value::symbol("a")),
            ("(L3 (eq? 'a 'a))", Value::Bool(true)),
        ];
        for (input, expected) in cases {
            assert_eq!(eval_str(input), Ok(expected), "program: {input}");
        }
    }

    #[test]
    fn test_top_level_recursion_through_globals() {
        // The lowered dict helper relies on exactly this: a closure defined
        // at top level calling itself by its global name.
        let result = eval_str(
            "(L3
               (define fact (lambda (n) (if (= n 0) 1 (* n (fact (- n 1))))))
               (fact 5))",
        );
        assert_eq!(result, Ok(Value::Number(120)));
    }

    #[test]
    fn test_unbound_variable_and_bad_procedure() {
        assert_eq!(
            eval_str("(L3 (+ x 1))"),
            Err(Error::UnboundVariable("x".to_owned())),
        );
        assert_eq!(
            eval_str("(L32 (1 'a))"),
            Err(Error::Eval("Bad procedure 1".to_owned())),
        );
    }

    #[test]
    fn test_closure_arity() {
        assert_eq!(
            eval_str("(L3 ((lambda (x) x) 1 2))"),
            Err(Error::arity(1, 2)),
        );
    }

    #[test]
    fn test_runaway_recursion_is_depth_limited() {
        let result = eval_str("(L3 (define loop (lambda () (loop))) (loop))");
        assert!(matches!(
            result,
            Err(Error::Eval(msg)) if msg.contains("too deeply nested")
        ));
    }

    #[test]
    fn test_native_dict_lookup() {
        assert_eq!(
            eval_str("(L32 ((dict (a 1) (b 2)) 'a))"),
            Ok(Value::Number(1)),
        );
        assert_eq!(
            eval_str("(L32 ((dict (a 1) (b 2)) 'b))"),
            Ok(Value::Number(2)),
        );
    }

    #[test]
    fn test_native_dict_evaluates_entry_values() {
        // Entry values are evaluated by the native semantics (the rewrite
        // quotes them instead; see test_lowered_dict_quotes_entry_values)
        let result = eval_str(
            "(L32
               (define x \"a\")
               (define y \"b\")
               ((dict (a x) (b y)) 'b))",
        );
        assert_eq!(result, Ok(Value::Str("b".to_owned())));
    }

    #[test]
    fn test_native_dict_in_conditional_branches() {
        let result = eval_str(
            "(L32
               (define x 1)
               ((if (< x 0)
                    (dict (a 1) (b 2))
                    (dict (a 2) (b 1)))
                'a))",
        );
        assert_eq!(result, Ok(Value::Number(2)));
    }

    #[test]
    fn test_native_dict_failures() {
        let cases = vec![
            (
                "(L32 ((dict (a 1) (b 2))))",
                "Dictionary lookup expects exactly one argument, got 0",
            ),
            (
                "(L32 ((dict (a 1) (b 2)) 'a 'b))",
                "Dictionary lookup expects exactly one argument, got 2",
            ),
            (
                "(L32 ((dict (a 1) (b 2)) 1))",
                "Dictionary key must be a symbol, got 1",
            ),
            (
                "(L32 ((dict (a 1) (b 2)) 'c))",
                "Key c not found in dictionary",
            ),
            (
                "(L32 (dict (a 1) (a 2)))",
                "Duplicate key in dictionary: a",
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(
                eval_str(input),
                Err(Error::Eval(expected.to_owned())),
                "program: {input}"
            );
        }
    }

    #[test]
    fn test_lowered_lookup_end_to_end() {
        assert_eq!(
            eval_lowered("(L32 ((dict (a 1) (b 2)) 'a))"),
            Ok(Value::Number(1)),
        );
        assert_eq!(
            eval_lowered("(L32 ((dict (a 1) (b 2)) 'b))"),
            Ok(Value::Number(2)),
        );
    }

    #[test]
    fn test_lowered_lookup_in_conditional_branches() {
        let result = eval_lowered(
            "(L32
               (define x 1)
               ((if (< x 0)
                    (dict (a 1) (b 2))
                    (dict (a 2) (b 1)))
                'a))",
        );
        assert_eq!(result, Ok(Value::Number(2)));
    }

    #[test]
    fn test_lowered_absent_key_reaches_lookup_miss() {
        // The synthesized helper has no exhausted-list clause: searching for
        // an absent key recurses to the empty list and fails inside car
        let result = eval_lowered("(L32 ((dict (a 1) (b 2)) 'c))");
        assert!(matches!(
            result,
            Err(Error::Eval(msg)) if msg.contains("car expects a pair")
        ));
    }

    #[test]
    fn test_lowered_dict_quotes_entry_values() {
        // After lowering, an identifier in entry-value position is data, not
        // a variable lookup: the same program that natively yields "b"
        // yields the symbol y
        let result = eval_lowered(
            "(L32
               (define x \"a\")
               (define y \"b\")
               ((dict (a x) (b y)) 'b))",
        );
        assert_eq!(result, Ok(Value::symbol("y")));
    }

    #[test]
    fn test_dict_value_can_be_bound_and_reused() {
        assert_eq!(
            eval_str("(L32 (define d (dict (k 7))) (d 'k))"),
            Ok(Value::Number(7)),
        );
        assert_eq!(
            eval_lowered("(L32 (define d (dict (k 7))) (d 'k))"),
            Ok(Value::Number(7)),
        );
    }
}
