//! Concrete-syntax parsing for L3 and L32 programs.
//!
//! Parsing runs in two stages, mirroring how the course interpreter works:
//! a nom-based reader first turns text into plain S-expression data
//! ([`SExpr`]), then a conversion pass shapes that data into the expression
//! tree, reporting structural problems (a malformed `dict` entry, an `if`
//! with the wrong number of parts, a dotted pair in expression position)
//! with descriptive messages.
//!
//! The `dict` keyword is dialect-sensitive: it introduces a dictionary
//! literal in L32, while in L3 it is an ordinary identifier. That is what
//! makes a lowered program re-readable: `(dict '((a . 1)))` printed from L3
//! output parses back as an application of the variable `dict`.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{cut, opt, recognize, value},
    error::ErrorKind,
    multi::separated_list0,
    sequence::{pair as nom_pair, preceded, terminated},
};

use crate::ast::{
    DictEntry, Expr, NumberType, Program, SExpr, SYMBOL_SPECIAL_CHARS, TopForm, is_valid_symbol,
    pair,
};
use crate::primops::is_primitive;
use crate::{Error, MAX_PARSE_DEPTH, ParseErrorKind};

/// Which language a form is read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// The base language: no `dict` form
    L3,
    /// L3 extended with the `dict` special form
    L32,
}

/// Convert nom parsing errors to user-friendly messages
fn convert_nom_error(input: &str, error: nom::Err<nom::error::Error<&str>>) -> Error {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            match e.code {
                ErrorKind::TooLarge => Error::parse(
                    ParseErrorKind::TooDeeplyNested,
                    format!("Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                ),
                _ => {
                    if position < input.len() {
                        let remaining: String = input.chars().skip(position).take(10).collect();
                        Error::parse(
                            ParseErrorKind::InvalidSyntax,
                            format!("Invalid syntax near '{remaining}'"),
                        )
                    } else {
                        Error::parse(ParseErrorKind::Incomplete, "Unexpected end of input")
                    }
                }
            }
        }
        nom::Err::Incomplete(_) => Error::parse(ParseErrorKind::Incomplete, "Incomplete input"),
    }
}

/// Parse a decimal number
fn parse_number(input: &str) -> IResult<&str, SExpr> {
    let (input, number_str) = recognize(nom_pair(
        opt(char('-')),
        take_while1(|c: char| c.is_ascii_digit()),
    ))
    .parse(input)?;

    match number_str.parse::<NumberType>() {
        Ok(n) => Ok((input, SExpr::Number(n))),
        // Overflowing literals are rejected; symbol parsing will not accept
        // a digit-led token either
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

/// Parse a boolean (#t or #f)
fn parse_bool(input: &str) -> IResult<&str, SExpr> {
    alt((
        value(SExpr::Bool(true), tag("#t")),
        value(SExpr::Bool(false), tag("#f")),
    ))
    .parse(input)
}

/// Parse a symbol (identifier)
fn parse_symbol(input: &str) -> IResult<&str, SExpr> {
    let mut symbol_chars =
        take_while1(|c: char| c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c));

    let (remaining, candidate) = symbol_chars.parse(input)?;

    if is_valid_symbol(candidate) {
        Ok((remaining, SExpr::Symbol(candidate.into())))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Alpha,
        )))
    }
}

/// Parse a string literal
fn parse_string(input: &str) -> IResult<&str, SExpr> {
    let (mut remaining, _) = char('"').parse(input)?;
    let mut chars = Vec::new();

    loop {
        let mut char_iter = remaining.chars();
        match char_iter.next() {
            Some('"') => {
                return Ok((char_iter.as_str(), SExpr::Str(chars.into_iter().collect())));
            }
            Some('\\') => {
                match char_iter.next() {
                    Some('n') => chars.push('\n'),
                    Some('t') => chars.push('\t'),
                    Some('r') => chars.push('\r'),
                    Some('\\') => chars.push('\\'),
                    Some('"') => chars.push('"'),
                    _ => {
                        // Unknown or incomplete escape sequence
                        return Err(nom::Err::Error(nom::error::Error::new(
                            remaining,
                            nom::error::ErrorKind::Char,
                        )));
                    }
                }
                remaining = char_iter.as_str();
            }
            Some(ch) => {
                chars.push(ch);
                remaining = char_iter.as_str();
            }
            None => {
                // End of input without a closing quote
                return Err(nom::Err::Error(nom::error::Error::new(
                    remaining,
                    nom::error::ErrorKind::Char,
                )));
            }
        }
    }
}

/// Parse a parenthesized list, including dotted tails: (a b), (a . b), ()
fn parse_list(input: &str, depth: usize) -> IResult<&str, SExpr> {
    let (input, _) = char('(').parse(input)?;
    let (input, _) = multispace0.parse(input)?;

    let (input, elements) =
        separated_list0(multispace1, |input| parse_datum(input, depth + 1)).parse(input)?;

    // Optional dotted tail after at least one element
    let (input, tail) = opt(preceded(
        (multispace1, char('.'), multispace1),
        |input| parse_datum(input, depth + 1),
    ))
    .parse(input)?;

    if elements.is_empty() && tail.is_some() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }

    let (input, _) = multispace0.parse(input)?;
    // cut: once '(' is consumed a closing paren is mandatory, so a missing
    // one is reported as incomplete input instead of being backtracked away
    let (input, _) = cut(char(')')).parse(input)?;

    let list = elements
        .into_iter()
        .rev()
        .fold(tail.unwrap_or(SExpr::Empty), |acc, elem| pair(elem, acc));
    Ok((input, list))
}

/// Parse quote shorthand: 'datum -> (quote datum)
fn parse_quoted(input: &str, depth: usize) -> IResult<&str, SExpr> {
    let (input, _) = char('\'').parse(input)?;
    let (input, datum) = parse_datum(input, depth + 1)?;
    Ok((
        input,
        pair(SExpr::Symbol("quote".to_owned()), pair(datum, SExpr::Empty)),
    ))
}

/// Parse one S-expression datum
fn parse_datum(input: &str, depth: usize) -> IResult<&str, SExpr> {
    // Failure, not Error: alt and separated_list0 must not backtrack past
    // the depth limit and report an unrelated syntax error instead
    if depth >= MAX_PARSE_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }
    preceded(
        multispace0,
        alt((
            |input| parse_quoted(input, depth),
            |input| parse_list(input, depth),
            parse_number,
            parse_bool,
            parse_string,
            parse_symbol,
        )),
    )
    .parse(input)
}

/// Parse a complete, single datum from input
fn parse_single_datum(input: &str) -> Result<SExpr, Error> {
    match terminated(|input| parse_datum(input, 0), multispace0).parse(input) {
        Ok(("", datum)) => Ok(datum),
        Ok((remaining, _)) => Err(Error::parse(
            ParseErrorKind::TrailingContent,
            format!("Unexpected remaining input: '{remaining}'"),
        )),
        Err(e) => Err(convert_nom_error(input, e)),
    }
}

/// View a datum as a proper list; None for dotted tails
fn datum_as_list(datum: &SExpr) -> Option<Vec<&SExpr>> {
    let mut elements = Vec::new();
    let mut rest = datum;
    loop {
        match rest {
            SExpr::Empty => return Some(elements),
            SExpr::Pair(head, tail) => {
                elements.push(head.as_ref());
                rest = tail.as_ref();
            }
            _ => return None,
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::parse(ParseErrorKind::InvalidSyntax, message)
}

/// Shape one dict entry: a two-element list headed by a symbol
fn datum_to_dict_entry(datum: &SExpr, dialect: Dialect) -> Result<DictEntry, Error> {
    let malformed = || invalid("Malformed entry in \"dict\" expression");
    let elements = datum_as_list(datum).ok_or_else(malformed)?;
    match elements.as_slice() {
        [SExpr::Symbol(key), value] => Ok(DictEntry {
            key: key.clone(),
            value: datum_to_expr(value, dialect)?,
        }),
        _ => Err(malformed()),
    }
}

/// Shape a datum into an expression
fn datum_to_expr(datum: &SExpr, dialect: Dialect) -> Result<Expr, Error> {
    match datum {
        SExpr::Number(n) => Ok(Expr::Num(*n)),
        SExpr::Bool(b) => Ok(Expr::Bool(*b)),
        SExpr::Str(s) => Ok(Expr::Str(s.clone())),
        SExpr::Symbol(name) => {
            if is_primitive(name) {
                Ok(Expr::Prim(name.clone()))
            } else {
                Ok(Expr::Var(name.clone()))
            }
        }
        // The reader never produces Prim; accept it for programmatic input
        SExpr::Prim(op) => Ok(Expr::Prim(op.clone())),
        SExpr::Empty => Err(invalid("Unexpected () in expression position")),
        SExpr::Pair(_, _) => {
            let Some(elements) = datum_as_list(datum) else {
                return Err(invalid(format!(
                    "Dotted pair in expression position: {datum}"
                )));
            };
            // A Pair datum always yields at least one element
            let (head, rest) = elements
                .split_first()
                .map(|(head, rest)| (*head, rest))
                .ok_or_else(|| invalid("Unexpected () in expression position"))?;

            if let SExpr::Symbol(name) = head {
                match name.as_str() {
                    "quote" => {
                        return match rest {
                            [datum] => Ok(Expr::Lit((*datum).clone())),
                            _ => Err(invalid("\"quote\" expects a single datum")),
                        };
                    }
                    "if" => {
                        return match rest {
                            [test, then, alt] => Ok(Expr::If {
                                test: Box::new(datum_to_expr(test, dialect)?),
                                then: Box::new(datum_to_expr(then, dialect)?),
                                alt: Box::new(datum_to_expr(alt, dialect)?),
                            }),
                            _ => Err(invalid(format!(
                                "\"if\" expects a test, a then and an alt, got {} parts",
                                rest.len()
                            ))),
                        };
                    }
                    "lambda" => {
                        let [params_datum, body @ ..] = rest else {
                            return Err(invalid("\"lambda\" expects a parameter list and a body"));
                        };
                        let params = datum_as_list(params_datum)
                            .ok_or_else(|| invalid("Lambda parameters must be a list"))?
                            .into_iter()
                            .map(|param| match param {
                                SExpr::Symbol(name) => Ok(name.clone()),
                                other => Err(invalid(format!(
                                    "Lambda parameters must be symbols, got {other}"
                                ))),
                            })
                            .collect::<Result<Vec<_>, _>>()?;
                        if body.is_empty() {
                            return Err(invalid("\"lambda\" expects a non-empty body"));
                        }
                        let body = body
                            .iter()
                            .map(|exp| datum_to_expr(exp, dialect))
                            .collect::<Result<Vec<_>, _>>()?;
                        return Ok(Expr::Lambda { params, body });
                    }
                    "define" => {
                        return Err(invalid("\"define\" is only allowed at the top level"));
                    }
                    "dict" if dialect == Dialect::L32 => {
                        let entries = rest
                            .iter()
                            .map(|entry| datum_to_dict_entry(entry, dialect))
                            .collect::<Result<Vec<_>, _>>()?;
                        return Ok(Expr::Dict(entries));
                    }
                    _ => {}
                }
            }

            // Ordinary application
            let rator = datum_to_expr(head, dialect)?;
            let rands = rest
                .iter()
                .map(|rand| datum_to_expr(rand, dialect))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::App {
                rator: Box::new(rator),
                rands,
            })
        }
    }
}

/// Shape a datum into a top-level form (where `define` is allowed)
fn datum_to_top_form(datum: &SExpr, dialect: Dialect) -> Result<TopForm, Error> {
    if let Some(elements) = datum_as_list(datum)
        && let [SExpr::Symbol(head), rest @ ..] = elements.as_slice()
        && head == "define"
    {
        return match rest {
            [SExpr::Symbol(name), value] => Ok(TopForm::Define {
                name: name.clone(),
                value: datum_to_expr(value, dialect)?,
            }),
            _ => Err(invalid("\"define\" expects a name and a single value")),
        };
    }
    Ok(TopForm::Expr(datum_to_expr(datum, dialect)?))
}

/// Parse a single expression in the given dialect.
pub fn parse_expr_in(input: &str, dialect: Dialect) -> Result<Expr, Error> {
    let datum = parse_single_datum(input)?;
    datum_to_expr(&datum, dialect)
}

/// Parse a single L32 expression.
pub fn parse_expr(input: &str) -> Result<Expr, Error> {
    parse_expr_in(input, Dialect::L32)
}

/// Parse a single L32 top-level form (expression or `define`), as entered
/// at an interactive prompt.
pub fn parse_top_form(input: &str) -> Result<TopForm, Error> {
    let datum = parse_single_datum(input)?;
    datum_to_top_form(&datum, Dialect::L32)
}

/// Parse a complete program: `(L3 form ...)` or `(L32 form ...)`.
pub fn parse_program(input: &str) -> Result<Program, Error> {
    let datum = parse_single_datum(input)?;
    let elements = datum_as_list(&datum)
        .ok_or_else(|| invalid("A program must be a parenthesized sequence of forms"))?;
    match elements.split_first() {
        Some((SExpr::Symbol(header), forms)) if header == "L3" || header == "L32" => {
            let dialect = if header == "L32" {
                Dialect::L32
            } else {
                Dialect::L3
            };
            if forms.is_empty() {
                return Err(invalid("A program must contain at least one form"));
            }
            let forms = forms
                .iter()
                .map(|form| datum_to_top_form(form, dialect))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Program::new(forms))
        }
        _ => Err(invalid(
            "A program must start with the L3 or L32 dialect marker",
        )),
    }
}
