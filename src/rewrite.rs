//! Elimination of the `dict` special form.
//!
//! The rewrite turns every L32 `dict` literal into an ordinary application of
//! a `dict` procedure to a quoted association list:
//!
//! ```scheme
//! (dict (a 1) (b 2))        ; becomes  (dict '((a . 1) (b . 2)))
//! ((dict (a 1) (b 2)) 'a)   ; becomes  ((dict '((a . 1) (b . 2))) 'a)
//! ```
//!
//! [`rewrite_program`] performs the rewrite alone; [`lower_program`]
//! additionally prepends a synthesized definition of the `dict` lookup
//! procedure, producing a complete L3 program with no `dict` construct.
//!
//! Entry values are quoted as *syntax*, not evaluated: a bare identifier in
//! value position becomes a symbol in the association list. The native L32
//! evaluator disagrees here (it evaluates entry values); the discrepancy is
//! deliberate and pinned by tests on both sides.
//!
//! Every function takes its input by reference and returns a fresh tree;
//! nothing is mutated in place.

use crate::ast::{
    DictEntry, Expr, Program, SExpr, TopForm, app, if_exp, lambda, lit, nil, pair, prim, sym, var,
};

/// The identifier the rewrite targets and the lowering defines.
pub const DICT_PROC_NAME: &str = "dict";

/// Convert a dict entry's value expression into quoted data.
///
/// Atoms map to themselves, a variable reference becomes a symbol carrying
/// its name, a quoted literal passes its payload through, and a primitive
/// operator is embedded as data. The compound kinds cannot be represented as
/// plain data, so they quote to a symbol of their concrete-syntax rendering,
/// matching the original exercise's observable output. The match is
/// exhaustive: there is no silent fallback for an "unknown" node.
fn quote_entry_value(value: &Expr) -> SExpr {
    match value {
        Expr::Num(n) => SExpr::Number(*n),
        Expr::Bool(b) => SExpr::Bool(*b),
        Expr::Str(s) => SExpr::Str(s.clone()),
        Expr::Var(name) => SExpr::Symbol(name.clone()),
        Expr::Lit(value) => value.clone(),
        Expr::Prim(op) => SExpr::Prim(op.clone()),
        compound @ (Expr::If { .. } | Expr::Lambda { .. } | Expr::App { .. } | Expr::Dict(_)) => {
            SExpr::Symbol(compound.to_string())
        }
    }
}

/// Convert a dict literal into its association-list application form.
///
/// Entries are folded right to left so the resulting proper list preserves
/// left-to-right declaration order: the first entry becomes the list head.
/// A left-to-right fold without reversal would invert the order.
pub fn convert_dict(entries: &[DictEntry]) -> Expr {
    let pairs = entries.iter().rev().fold(nil(), |acc, entry| {
        pair(
            pair(sym(entry.key.clone()), quote_entry_value(&entry.value)),
            acc,
        )
    });
    app(var(DICT_PROC_NAME), vec![lit(pairs)])
}

/// Rewrite an expression, replacing every `dict` form.
///
/// Structure-preserving for every node except a bare `Dict` and an
/// application whose operator is a `Dict` (the lookup syntax
/// `((dict ...) key)`); those are the only substitution sites.
pub fn rewrite_expr(exp: &Expr) -> Expr {
    match exp {
        Expr::Num(_)
        | Expr::Bool(_)
        | Expr::Str(_)
        | Expr::Var(_)
        | Expr::Prim(_)
        | Expr::Lit(_) => exp.clone(),
        Expr::If { test, then, alt } => {
            if_exp(rewrite_expr(test), rewrite_expr(then), rewrite_expr(alt))
        }
        Expr::Lambda { params, body } => Expr::Lambda {
            params: params.clone(),
            body: body.iter().map(rewrite_expr).collect(),
        },
        Expr::App { rator, rands } => {
            let rands = rands.iter().map(rewrite_expr).collect();
            match rator.as_ref() {
                Expr::Dict(entries) => Expr::App {
                    rator: Box::new(convert_dict(entries)),
                    rands,
                },
                other => Expr::App {
                    rator: Box::new(rewrite_expr(other)),
                    rands,
                },
            }
        }
        Expr::Dict(entries) => convert_dict(entries),
    }
}

/// Rewrite a top-level form, keeping definition targets intact.
pub fn rewrite_top_form(form: &TopForm) -> TopForm {
    match form {
        TopForm::Define { name, value } => TopForm::Define {
            name: name.clone(),
            value: rewrite_expr(value),
        },
        TopForm::Expr(e) => TopForm::Expr(rewrite_expr(e)),
    }
}

/// Rewrite every top-level form of a program, in original order.
pub fn rewrite_program(program: &Program) -> Program {
    Program::new(program.forms.iter().map(rewrite_top_form).collect())
}

/// The synthesized definition of the `dict` lookup procedure:
///
/// ```scheme
/// (define dict
///   (lambda (pairs)
///     (lambda (k)
///       (if (eq? (car (car pairs)) k)
///           (cdr (car pairs))
///           ((dict (cdr pairs)) k)))))
/// ```
///
/// A linear scan where the first matching key wins. There is deliberately no
/// termination clause for an exhausted list: with an absent key the recursion
/// reaches the empty list and `car` fails, which the evaluator surfaces as
/// the lookup error.
pub fn dict_helper_definition() -> TopForm {
    let first_pair = app(prim("car"), vec![var("pairs")]);
    let lookup = if_exp(
        app(
            prim("eq?"),
            vec![app(prim("car"), vec![first_pair.clone()]), var("k")],
        ),
        app(prim("cdr"), vec![first_pair]),
        app(
            app(
                var(DICT_PROC_NAME),
                vec![app(prim("cdr"), vec![var("pairs")])],
            ),
            vec![var("k")],
        ),
    );
    TopForm::Define {
        name: DICT_PROC_NAME.to_owned(),
        value: lambda(&["pairs"], vec![lambda(&["k"], vec![lookup])]),
    }
}

/// Lower an L32 program to L3: prepend the synthesized `dict` definition and
/// rewrite every form of the input, preserving order.
pub fn lower_program(program: &Program) -> Program {
    let mut forms = Vec::with_capacity(program.forms.len() + 1);
    forms.push(dict_helper_definition());
    forms.extend(rewrite_program(program).forms);
    Program::new(forms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{dict, num, string};

    fn lookup_program() -> Program {
        // ((dict (a 1) (b 2)) 'a)
        Program::new(vec![TopForm::Expr(app(
            dict(vec![("a", num(1)), ("b", num(2))]),
            vec![lit(sym("a"))],
        ))])
    }

    #[test]
    fn test_rewrite_is_identity_on_dict_free_trees() {
        let cases = vec![
            num(42),
            Expr::Bool(false),
            string("s"),
            var("x"),
            prim("car"),
            lit(pair(sym("a"), nil())),
            if_exp(app(prim("<"), vec![var("x"), num(0)]), num(1), num(2)),
            lambda(&["x"], vec![app(prim("+"), vec![var("x"), num(1)])]),
            app(
                lambda(&["f"], vec![app(var("f"), vec![num(3)])]),
                vec![prim("not")],
            ),
        ];
        for exp in cases {
            assert_eq!(rewrite_expr(&exp), exp);
        }
    }

    #[test]
    fn test_bare_dict_becomes_alist_application() {
        let rewritten = rewrite_expr(&dict(vec![("a", num(1)), ("b", num(2))]));
        assert_eq!(
            rewritten,
            app(
                var("dict"),
                vec![lit(pair(
                    pair(sym("a"), SExpr::Number(1)),
                    pair(pair(sym("b"), SExpr::Number(2)), nil()),
                ))],
            )
        );
        assert_eq!(format!("{rewritten}"), "(dict '((a . 1) (b . 2)))");
    }

    #[test]
    fn test_dict_in_operator_position() {
        let exp = app(dict(vec![("a", num(1))]), vec![lit(sym("a"))]);
        let rewritten = rewrite_expr(&exp);
        assert_eq!(format!("{rewritten}"), "((dict '((a . 1))) 'a)");
        assert!(!rewritten.contains_dict());
    }

    #[test]
    fn test_entry_order_is_preserved() {
        // Head-to-tail order of the quoted list must match declaration order
        let converted = convert_dict(&[
            DictEntry {
                key: "a".to_owned(),
                value: num(1),
            },
            DictEntry {
                key: "b".to_owned(),
                value: num(2),
            },
            DictEntry {
                key: "c".to_owned(),
                value: num(3),
            },
        ]);
        let Expr::App { rands, .. } = &converted else {
            panic!("expected application, got {converted:?}");
        };
        let [Expr::Lit(alist)] = rands.as_slice() else {
            panic!("expected a single quoted operand, got {rands:?}");
        };

        let mut keys = Vec::new();
        let mut rest = alist;
        while let SExpr::Pair(head, tail) = rest {
            let SExpr::Pair(key, _) = head.as_ref() else {
                panic!("expected (key . value) pair, got {head:?}");
            };
            keys.push(format!("{key}"));
            rest = tail;
        }
        assert_eq!(rest, &SExpr::Empty, "alist must be a proper list");
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn test_entry_values_are_quoted_not_evaluated() {
        // A variable reference in value position is captured as a symbol
        let converted = convert_dict(&[DictEntry {
            key: "a".to_owned(),
            value: var("x"),
        }]);
        assert_eq!(format!("{converted}"), "(dict '((a . x)))");

        // Atoms map to themselves, literal payloads pass through,
        // primitives are embedded as data
        let cases: Vec<(Expr, SExpr)> = vec![
            (num(7), SExpr::Number(7)),
            (Expr::Bool(true), SExpr::Bool(true)),
            (string("v"), SExpr::Str("v".to_owned())),
            (lit(pair(sym("p"), nil())), pair(sym("p"), nil())),
            (prim("car"), SExpr::Prim("car".to_owned())),
            // Compound values quote to a symbol of their rendering
            (
                app(prim("+"), vec![num(1), num(2)]),
                sym("(+ 1 2)"),
            ),
        ];
        for (value, expected) in cases {
            let converted = convert_dict(&[DictEntry {
                key: "k".to_owned(),
                value,
            }]);
            let expected_alist = pair(pair(sym("k"), expected), nil());
            assert_eq!(converted, app(var("dict"), vec![lit(expected_alist)]));
        }
    }

    #[test]
    fn test_dicts_in_both_branches_rewritten_independently() {
        let exp = if_exp(
            app(prim("<"), vec![var("x"), num(0)]),
            dict(vec![("a", num(1)), ("b", num(2))]),
            dict(vec![("a", num(2)), ("b", num(1))]),
        );
        let rewritten = rewrite_expr(&exp);
        assert!(!rewritten.contains_dict());
        assert_eq!(
            format!("{rewritten}"),
            "(if (< x 0) (dict '((a . 1) (b . 2))) (dict '((a . 2) (b . 1))))"
        );
    }

    #[test]
    fn test_lowering_eliminates_every_dict() {
        let programs = vec![
            lookup_program(),
            Program::new(vec![
                TopForm::Define {
                    name: "d".to_owned(),
                    value: dict(vec![("k", dict(vec![("inner", num(1))]))]),
                },
                TopForm::Expr(lambda(&["x"], vec![dict(vec![("a", var("x"))])])),
            ]),
            Program::new(vec![TopForm::Expr(num(1))]),
        ];
        for program in programs {
            assert!(!lower_program(&program).contains_dict());
        }
    }

    #[test]
    fn test_lowering_prefix_invariant() {
        let program = lookup_program();
        let lowered = lower_program(&program);
        let rewritten = rewrite_program(&program);

        assert_eq!(lowered.forms.len(), rewritten.forms.len() + 1);
        assert_eq!(lowered.forms[0], dict_helper_definition());
        assert_eq!(&lowered.forms[1..], rewritten.forms.as_slice());
    }

    #[test]
    fn test_synthesized_helper_shape() {
        assert_eq!(
            format!("{}", dict_helper_definition()),
            "(define dict (lambda (pairs) (lambda (k) \
             (if (eq? (car (car pairs)) k) \
             (cdr (car pairs)) \
             ((dict (cdr pairs)) k)))))"
        );
    }

    #[test]
    fn test_rewrite_preserves_definition_targets_and_order() {
        let program = Program::new(vec![
            TopForm::Define {
                name: "x".to_owned(),
                value: num(1),
            },
            TopForm::Define {
                name: "d".to_owned(),
                value: dict(vec![("a", var("x"))]),
            },
            TopForm::Expr(app(var("d"), vec![lit(sym("a"))])),
        ]);
        let rewritten = rewrite_program(&program);
        assert_eq!(rewritten.forms.len(), 3);
        assert_eq!(rewritten.forms[0], program.forms[0]);
        match &rewritten.forms[1] {
            TopForm::Define { name, value } => {
                assert_eq!(name, "d");
                assert_eq!(format!("{value}"), "(dict '((a . x)))");
            }
            other => panic!("expected define, got {other:?}"),
        }
        assert_eq!(rewritten.forms[2], program.forms[2]);
    }
}
