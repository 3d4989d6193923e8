//! Textual S-expression front-end.
//!
//! Parses a Scheme-flavored surface syntax into core terms. The core
//! identifies variables by opaque integer tags, so this module also
//! owns [`Symbols`], the name-to-tag interner that gives textual
//! programs stable variable identities.
//!
//! Parsing is two-stage: nom combinators read the text into a small
//! surface datum tree, and a compile step turns data into terms,
//! resolving operator names through the builtin registry and expanding
//! the `let`/`cond` syntax through [`crate::forms`]. Syntactic forms:
//!
//! ```scheme
//! (lambda (a b) body)          ; fixed-arity abstraction
//! (if c t e)                   ; conditional
//! (let ((x e) ...) body)       ; binding group (supports recursion)
//! (cond (g r) ... (else d))    ; multi-way conditional, else optional
//! (quote (1 2 3))  '(1 2 3)    ; literal list data
//! ```

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{opt, recognize, value},
    error::ErrorKind,
    multi::many0,
    sequence::{pair, preceded, terminated},
};
use std::collections::HashMap;

use crate::ast::{self, NumberType, Term, VarId};
use crate::builtinops::find_op;
use crate::evaluator::Env;
use crate::forms;
use crate::{Error, MAX_PARSE_DEPTH};

/// Allowed non-alphanumeric characters in symbol names
const SYMBOL_SPECIAL_CHARS: &str = "+-*/<>=!?_";

/// Names claimed by the syntactic forms; not usable as variables
const SYNTAX_KEYWORDS: [&str; 6] = ["lambda", "if", "let", "cond", "quote", "else"];

/// Check if a string is a valid symbol name
/// Valid: non-empty, no leading digit, no "-digit" prefix, alphanumeric + SYMBOL_SPECIAL_CHARS
fn is_valid_symbol(name: &str) -> bool {
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

/// Interner mapping source identifiers to the integer tags the core
/// uses as variable identities. Interning the same name twice yields
/// the same tag.
#[derive(Debug, Clone, Default)]
pub struct Symbols {
    names: Vec<String>,
    ids: HashMap<String, VarId>,
}

impl Symbols {
    pub fn new() -> Self {
        Symbols::default()
    }

    /// Return the tag for `name`, allocating a fresh one on first use.
    pub fn intern(&mut self, name: &str) -> VarId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.names.len() as VarId;
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        id
    }

    /// The tag previously allocated for `name`, if any.
    pub fn resolve(&self, name: &str) -> Option<VarId> {
        self.ids.get(name).copied()
    }

    /// The name behind a tag allocated by this interner.
    pub fn name(&self, id: VarId) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Surface datum tree produced by the reader, before compilation
#[derive(Debug, Clone, PartialEq, Eq)]
enum Datum {
    Int(NumberType),
    Bool(bool),
    Sym(String),
    List(Vec<Datum>),
}

/// Parse a decimal integer (with optional leading minus)
fn parse_int(input: &str) -> IResult<&str, Datum> {
    let (input, number_str) = recognize(pair(
        opt(char('-')),
        take_while1(|c: char| c.is_ascii_digit()),
    ))
    .parse(input)?;

    match number_str.parse::<NumberType>() {
        Ok(n) => Ok((input, Datum::Int(n))),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::Digit,
        ))),
    }
}

/// Parse a boolean (#t or #f)
fn parse_bool(input: &str) -> IResult<&str, Datum> {
    alt((
        value(Datum::Bool(true), tag("#t")),
        value(Datum::Bool(false), tag("#f")),
    ))
    .parse(input)
}

/// Parse a symbol (identifier or operator name)
fn parse_symbol(input: &str) -> IResult<&str, Datum> {
    let (remaining, candidate) =
        take_while1(|c: char| c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c))
            .parse(input)?;

    if is_valid_symbol(candidate) {
        Ok((remaining, Datum::Sym(candidate.into())))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::Alpha,
        )))
    }
}

/// Parse a parenthesised list of data
fn parse_list(input: &str, depth: usize) -> IResult<&str, Datum> {
    let (input, _) = char('(').parse(input)?;
    let (input, elements) = many0(|i| parse_datum(i, depth + 1)).parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char(')').parse(input)?;
    Ok((input, Datum::List(elements)))
}

/// Parse quote shorthand ('datum -> (quote datum))
fn parse_quoted(input: &str, depth: usize) -> IResult<&str, Datum> {
    let (input, _) = char('\'').parse(input)?;
    let (input, datum) = parse_datum(input, depth + 1)?;
    Ok((
        input,
        Datum::List(vec![Datum::Sym("quote".into()), datum]),
    ))
}

/// Parse a single datum, consuming leading whitespace
fn parse_datum(input: &str, depth: usize) -> IResult<&str, Datum> {
    // Failure (not Error) so enclosing combinators propagate instead
    // of backtracking past the limit
    if depth >= MAX_PARSE_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }
    preceded(
        multispace0,
        alt((
            |i| parse_quoted(i, depth),
            |i| parse_list(i, depth),
            parse_int,
            parse_bool,
            parse_symbol,
        )),
    )
    .parse(input)
}

/// Convert nom parsing errors to user-friendly messages
fn parse_error_message(input: &str, error: nom::Err<nom::error::Error<&str>>) -> String {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            match e.code {
                ErrorKind::TooLarge => {
                    format!("expression too deeply nested (max depth: {MAX_PARSE_DEPTH})")
                }
                _ => {
                    if position < input.len() {
                        let nearby: String = input.chars().skip(position).take(10).collect();
                        format!("invalid syntax near '{nearby}'")
                    } else {
                        "unexpected end of input".into()
                    }
                }
            }
        }
        nom::Err::Incomplete(_) => "incomplete input".into(),
    }
}

/// Parse a complete expression from text into a core term.
///
/// Identifiers are interned into `symbols`, so terms parsed with the
/// same interner share variable tags and can be evaluated against a
/// common environment.
pub fn parse_term(input: &str, symbols: &mut Symbols) -> Result<Term, Error> {
    match terminated(|i| parse_datum(i, 0), multispace0).parse(input) {
        Ok(("", datum)) => compile(&datum, symbols),
        Ok((remaining, _)) => Err(Error::ParseError(format!(
            "unexpected remaining input: '{remaining}'"
        ))),
        Err(e) => Err(Error::ParseError(parse_error_message(input, e))),
    }
}

/// Reject names that the term language reserves
fn check_bindable(name: &str) -> Result<(), Error> {
    if find_op(name).is_some() {
        return Err(Error::ParseError(format!(
            "cannot bind operator name '{name}'"
        )));
    }
    if SYNTAX_KEYWORDS.contains(&name) {
        return Err(Error::ParseError(format!(
            "cannot bind syntactic keyword '{name}'"
        )));
    }
    Ok(())
}

fn compile(datum: &Datum, symbols: &mut Symbols) -> Result<Term, Error> {
    match datum {
        Datum::Int(n) => Ok(Term::Int(*n)),
        Datum::Bool(b) => Ok(Term::Bool(*b)),
        Datum::Sym(name) => compile_symbol(name, symbols),
        Datum::List(items) => compile_list(items, symbols),
    }
}

fn compile_symbol(name: &str, symbols: &mut Symbols) -> Result<Term, Error> {
    if let Some(def) = find_op(name) {
        // Operator names denote first-class operator values
        return Ok(Term::Op(def.code));
    }
    if SYNTAX_KEYWORDS.contains(&name) {
        return Err(Error::ParseError(format!(
            "syntactic keyword '{name}' cannot be used as an expression"
        )));
    }
    Ok(Term::Var(symbols.intern(name)))
}

fn compile_list(items: &[Datum], symbols: &mut Symbols) -> Result<Term, Error> {
    match items {
        // () is the empty-list literal
        [] => Ok(Term::Nil),
        [Datum::Sym(head), rest @ ..] if head == "quote" => compile_quote(rest),
        [Datum::Sym(head), rest @ ..] if head == "lambda" => compile_lambda(rest, symbols),
        [Datum::Sym(head), rest @ ..] if head == "if" => compile_if(rest, symbols),
        [Datum::Sym(head), rest @ ..] if head == "let" => compile_let(rest, symbols),
        [Datum::Sym(head), rest @ ..] if head == "cond" => compile_cond(rest, symbols),
        [operator, operands @ ..] => {
            let op = compile(operator, symbols)?;
            let args = operands
                .iter()
                .map(|d| compile(d, symbols))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ast::sexp(op, args))
        }
    }
}

fn compile_quote(rest: &[Datum]) -> Result<Term, Error> {
    match rest {
        [datum] => quote_datum(datum),
        _ => Err(Error::ParseError(format!(
            "quote takes exactly one datum, got {}",
            rest.len()
        ))),
    }
}

/// Quoted data: integers, booleans, and proper lists of those.
/// The core has no symbol values, so symbols are rejected here.
fn quote_datum(datum: &Datum) -> Result<Term, Error> {
    match datum {
        Datum::Int(n) => Ok(Term::Int(*n)),
        Datum::Bool(b) => Ok(Term::Bool(*b)),
        Datum::Sym(name) => Err(Error::ParseError(format!(
            "symbols cannot appear in quoted data: '{name}'"
        ))),
        Datum::List(items) => {
            let mut term = Term::Nil;
            for item in items.iter().rev() {
                term = ast::cons(quote_datum(item)?, term);
            }
            Ok(term)
        }
    }
}

fn compile_lambda(rest: &[Datum], symbols: &mut Symbols) -> Result<Term, Error> {
    match rest {
        [Datum::List(param_list), body] => {
            let mut names: Vec<&str> = Vec::with_capacity(param_list.len());
            let mut params = Vec::with_capacity(param_list.len());
            for param in param_list {
                match param {
                    Datum::Sym(name) => {
                        check_bindable(name)?;
                        if names.contains(&name.as_str()) {
                            return Err(Error::ParseError(format!(
                                "duplicate parameter name: {name}"
                            )));
                        }
                        names.push(name);
                        params.push(symbols.intern(name));
                    }
                    other => {
                        return Err(Error::ParseError(format!(
                            "lambda parameters must be symbols, got {other:?}"
                        )));
                    }
                }
            }
            Ok(ast::lambda(params, compile(body, symbols)?))
        }
        [_, _] => Err(Error::ParseError(
            "lambda parameters must be a list".to_owned(),
        )),
        _ => Err(Error::ParseError(
            "lambda takes a parameter list and a body".to_owned(),
        )),
    }
}

fn compile_if(rest: &[Datum], symbols: &mut Symbols) -> Result<Term, Error> {
    match rest {
        [cond, then, alt] => Ok(ast::if_(
            compile(cond, symbols)?,
            compile(then, symbols)?,
            compile(alt, symbols)?,
        )),
        _ => Err(Error::ParseError(format!(
            "if takes exactly three expressions, got {}",
            rest.len()
        ))),
    }
}

fn compile_let(rest: &[Datum], symbols: &mut Symbols) -> Result<Term, Error> {
    match rest {
        [Datum::List(binding_forms), body] => {
            let mut group = Env::empty();
            for form in binding_forms {
                let bad_shape = || {
                    Error::ParseError("let bindings must be (name expression) pairs".to_owned())
                };
                let Datum::List(parts) = form else {
                    return Err(bad_shape());
                };
                let [Datum::Sym(name), init] = parts.as_slice() else {
                    return Err(bad_shape());
                };
                check_bindable(name)?;
                let tag = symbols.intern(name);
                group = group.bind(tag, compile(init, symbols)?);
            }
            Ok(forms::let_in(group, compile(body, symbols)?))
        }
        [_, _] => Err(Error::ParseError(
            "let bindings must be a list".to_owned(),
        )),
        _ => Err(Error::ParseError(
            "let takes a binding list and a body".to_owned(),
        )),
    }
}

fn compile_cond(rest: &[Datum], symbols: &mut Symbols) -> Result<Term, Error> {
    let mut clauses = Vec::with_capacity(rest.len());
    let mut default = None;
    for (i, clause) in rest.iter().enumerate() {
        let Datum::List(parts) = clause else {
            return Err(Error::ParseError(
                "cond clauses must be (guard result) lists".to_owned(),
            ));
        };
        match parts.as_slice() {
            [Datum::Sym(kw), result] if kw == "else" => {
                if i + 1 != rest.len() {
                    return Err(Error::ParseError(
                        "'else' must be the last cond clause".to_owned(),
                    ));
                }
                default = Some(compile(result, symbols)?);
            }
            [guard, result] => {
                clauses.push((compile(guard, symbols)?, compile(result, symbols)?));
            }
            _ => {
                return Err(Error::ParseError(
                    "cond clauses must be (guard result) lists".to_owned(),
                ));
            }
        }
    }
    Ok(forms::cond(default, clauses))
}
