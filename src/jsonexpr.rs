//! JSON term front-end.
//!
//! Builds core terms from a JSON encoding, for callers that construct
//! programs mechanically rather than through text. Variables appear
//! under their integer tags directly; there is no interner here.
//!
//! The encoding is strict: integers and booleans are the literals,
//! arrays are proper lists (componentwise terms), and every other form
//! is a single-key object:
//!
//! ```json
//! {"var": 0}
//! {"op": "+"}
//! {"if": [{"<=": [{"var": 0}, 0]}, 1, 2]}
//! {"lambda": {"params": [0], "body": {"var": 0}}}
//! {"let": {"bindings": [[0, 1]], "body": {"var": 0}}}
//! {"cond": {"clauses": [[true, 1]], "default": 0}}
//! {"apply": [{"var": 0}, 1, 2]}
//! {"+": [1, 2, 3]}
//! ```
//!
//! `null`, non-integer numbers, strings, and unknown operator keys are
//! rejected.

use crate::ast::{self, Term, VarId};
use crate::builtinops::find_op;
use crate::evaluator::Env;
use crate::forms;
use crate::{Error, MAX_PARSE_DEPTH};

use serde_json::Value as Json;

/// Parse a JSON-encoded expression into a core term.
pub fn parse_json_term(input: &str) -> Result<Term, Error> {
    let json: Json =
        serde_json::from_str(input).map_err(|e| Error::ParseError(format!("invalid JSON: {e}")))?;
    term_from_json(&json, 0)
}

fn term_from_json(json: &Json, depth: usize) -> Result<Term, Error> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(Error::ParseError(format!(
            "term too deeply nested (max depth: {MAX_PARSE_DEPTH})"
        )));
    }
    match json {
        Json::Null => Err(Error::ParseError("null is not a term".to_owned())),
        Json::Bool(b) => Ok(Term::Bool(*b)),
        Json::Number(n) => n
            .as_i64()
            .map(Term::Int)
            .ok_or_else(|| Error::ParseError(format!("numbers must be 64-bit integers: {n}"))),
        Json::String(s) => Err(Error::ParseError(format!(
            "strings are not part of the term language: \"{s}\""
        ))),
        // Arrays are proper lists, built component-wise
        Json::Array(items) => {
            let mut term = Term::Nil;
            for item in items.iter().rev() {
                term = ast::cons(term_from_json(item, depth + 1)?, term);
            }
            Ok(term)
        }
        Json::Object(map) => {
            let mut entries = map.iter();
            let (Some((key, value)), None) = (entries.next(), entries.next()) else {
                return Err(Error::ParseError(
                    "term objects must have exactly one key".to_owned(),
                ));
            };
            term_from_object(key, value, depth)
        }
    }
}

fn term_from_object(key: &str, value: &Json, depth: usize) -> Result<Term, Error> {
    match key {
        "var" => Ok(Term::Var(expect_var_id(value)?)),
        "op" => match value.as_str().and_then(find_op) {
            Some(def) => Ok(Term::Op(def.code)),
            None => Err(Error::ParseError(format!(
                "\"op\" requires an operator name, got {value}"
            ))),
        },
        "if" => {
            let items = expect_array(value, "\"if\"")?;
            let [cond, then, alt] = items.as_slice() else {
                return Err(Error::ParseError(format!(
                    "\"if\" takes exactly three terms, got {}",
                    items.len()
                )));
            };
            Ok(ast::if_(
                term_from_json(cond, depth + 1)?,
                term_from_json(then, depth + 1)?,
                term_from_json(alt, depth + 1)?,
            ))
        }
        "lambda" => lambda_from_json(value, depth),
        "let" => let_from_json(value, depth),
        "cond" => cond_from_json(value, depth),
        "apply" => {
            let items = expect_array(value, "\"apply\"")?;
            let [operator, operands @ ..] = items.as_slice() else {
                return Err(Error::ParseError(
                    "\"apply\" requires an operator term".to_owned(),
                ));
            };
            Ok(ast::sexp(
                term_from_json(operator, depth + 1)?,
                terms_from_slice(operands, depth)?,
            ))
        }
        name => match find_op(name) {
            Some(def) => {
                let items = expect_array(value, name)?;
                Ok(ast::sexp(Term::Op(def.code), terms_from_slice(items, depth)?))
            }
            None => Err(Error::ParseError(format!("unknown term key: \"{name}\""))),
        },
    }
}

fn lambda_from_json(value: &Json, depth: usize) -> Result<Term, Error> {
    let obj = value.as_object().ok_or_else(|| {
        Error::ParseError("\"lambda\" requires an object with \"params\" and \"body\"".to_owned())
    })?;
    let (Some(params), Some(body), 2) = (obj.get("params"), obj.get("body"), obj.len()) else {
        return Err(Error::ParseError(
            "\"lambda\" requires exactly the keys \"params\" and \"body\"".to_owned(),
        ));
    };
    let params = expect_array(params, "\"params\"")?
        .iter()
        .map(expect_var_id)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ast::lambda(params, term_from_json(body, depth + 1)?))
}

fn let_from_json(value: &Json, depth: usize) -> Result<Term, Error> {
    let obj = value.as_object().ok_or_else(|| {
        Error::ParseError("\"let\" requires an object with \"bindings\" and \"body\"".to_owned())
    })?;
    let (Some(bindings), Some(body), 2) = (obj.get("bindings"), obj.get("body"), obj.len()) else {
        return Err(Error::ParseError(
            "\"let\" requires exactly the keys \"bindings\" and \"body\"".to_owned(),
        ));
    };

    let mut group = Env::empty();
    for binding in expect_array(bindings, "\"bindings\"")? {
        let pair = expect_array(binding, "\"bindings\"")?;
        let [tag, init] = pair.as_slice() else {
            return Err(Error::ParseError(
                "\"bindings\" entries must be [tag, term] pairs".to_owned(),
            ));
        };
        group = group.bind(expect_var_id(tag)?, term_from_json(init, depth + 1)?);
    }
    Ok(forms::let_in(group, term_from_json(body, depth + 1)?))
}

fn cond_from_json(value: &Json, depth: usize) -> Result<Term, Error> {
    let obj = value.as_object().ok_or_else(|| {
        Error::ParseError("\"cond\" requires an object with \"clauses\"".to_owned())
    })?;
    let clauses_json = obj.get("clauses").ok_or_else(|| {
        Error::ParseError("\"cond\" requires the key \"clauses\"".to_owned())
    })?;
    let default = obj
        .get("default")
        .map(|d| term_from_json(d, depth + 1))
        .transpose()?;
    let expected_keys = if default.is_some() { 2 } else { 1 };
    if obj.len() != expected_keys {
        return Err(Error::ParseError(
            "\"cond\" accepts only the keys \"clauses\" and \"default\"".to_owned(),
        ));
    }

    let mut clauses = Vec::new();
    for clause in expect_array(clauses_json, "\"clauses\"")? {
        let pair = expect_array(clause, "\"clauses\"")?;
        let [guard, result] = pair.as_slice() else {
            return Err(Error::ParseError(
                "\"clauses\" entries must be [guard, result] pairs".to_owned(),
            ));
        };
        clauses.push((
            term_from_json(guard, depth + 1)?,
            term_from_json(result, depth + 1)?,
        ));
    }
    Ok(forms::cond(default, clauses))
}

fn expect_var_id(value: &Json) -> Result<VarId, Error> {
    value
        .as_u64()
        .and_then(|n| VarId::try_from(n).ok())
        .ok_or_else(|| {
            Error::ParseError(format!(
                "variable tags must be non-negative 32-bit integers, got {value}"
            ))
        })
}

fn expect_array<'a>(value: &'a Json, what: &str) -> Result<&'a Vec<Json>, Error> {
    value
        .as_array()
        .ok_or_else(|| Error::ParseError(format!("{what} requires an array, got {value}")))
}

fn terms_from_slice(items: &[Json], depth: usize) -> Result<Vec<Term>, Error> {
    items
        .iter()
        .map(|item| term_from_json(item, depth + 1))
        .collect()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{OpCode, cons, if_, int, lambda, list, nil, op, sexp, val, var};
    use crate::evaluator::eval;

    #[test]
    fn test_parse_terms_data_driven() {
        let test_cases = vec![
            ("42", int(42)),
            ("-17", int(-17)),
            ("true", val(true)),
            ("false", val(false)),
            ("[]", nil()),
            ("[1, 2, 3]", list(vec![int(1), int(2), int(3)])),
            (
                "[1, [true]]",
                cons(int(1), cons(cons(val(true), nil()), nil())),
            ),
            (r#"{"var": 7}"#, var(7)),
            (r#"{"op": "+"}"#, op(OpCode::Add)),
            (r#"{"op": "null?"}"#, op(OpCode::IsNull)),
            (
                r#"{"+": [1, 2]}"#,
                sexp(op(OpCode::Add), vec![int(1), int(2)]),
            ),
            (r#"{"+": []}"#, sexp(op(OpCode::Add), vec![])),
            (
                r#"{"if": [true, 1, 2]}"#,
                if_(val(true), int(1), int(2)),
            ),
            (
                r#"{"lambda": {"params": [0], "body": {"var": 0}}}"#,
                lambda(vec![0], var(0)),
            ),
            (
                r#"{"apply": [{"var": 0}, 1]}"#,
                sexp(var(0), vec![int(1)]),
            ),
            (
                r#"{"cond": {"clauses": [[true, 1]], "default": 0}}"#,
                if_(val(true), int(1), int(0)),
            ),
            (
                r#"{"cond": {"clauses": [[true, 1]]}}"#,
                if_(val(true), int(1), Term::NoMatch),
            ),
        ];
        for (input, expected) in test_cases {
            assert_eq!(
                parse_json_term(input),
                Ok(expected),
                "for input: {input}"
            );
        }
    }

    #[test]
    fn test_parse_let_expansion() {
        let term = parse_json_term(r#"{"let": {"bindings": [[0, 41]], "body": {"var": 0}}}"#)
            .unwrap();
        assert_eq!(
            term,
            crate::forms::let_in(Env::empty().bind(0, int(41)), var(0))
        );
        assert_eq!(eval(&term, &Env::empty()), Ok(int(41)));
    }

    #[test]
    fn test_parse_errors_data_driven() {
        let error_cases = vec![
            "",                                          // not JSON
            "null",                                      // null is not a term
            "1.5",                                       // floats rejected
            r#""hello""#,                                // strings rejected
            r#"{"var": 0, "op": "+"}"#,                  // two keys
            "{}",                                        // no key
            r#"{"frob": [1]}"#,                          // unknown operator
            r#"{"op": "frob"}"#,                         // unknown operator name
            r#"{"op": 3}"#,                              // op name must be a string
            r#"{"var": -1}"#,                            // negative tag
            r#"{"var": 4294967296}"#,                    // tag out of range
            r#"{"if": [true, 1]}"#,                      // if arity
            r#"{"+": 1}"#,                               // args must be an array
            r#"{"lambda": {"params": [0]}}"#,            // missing body
            r#"{"lambda": {"params": ["x"], "body": 1}}"#, // param tags must be integers
            r#"{"let": {"bindings": [[0]], "body": 1}}"#, // malformed binding pair
            r#"{"cond": {"clauses": [[true]]}}"#,        // malformed clause
            r#"{"cond": {"default": 1}}"#,               // missing clauses
        ];
        for input in error_cases {
            match parse_json_term(input) {
                Err(Error::ParseError(_)) => {}
                other => panic!("expected ParseError for '{input}', got {other:?}"),
            }
        }
    }

    #[test]
    fn test_deeply_nested_input_is_rejected() {
        let input = format!("{}1{}", r#"{"+": ["#.repeat(40), "]}".repeat(40));
        match parse_json_term(&input) {
            Err(Error::ParseError(msg)) => assert!(msg.contains("nested"), "got: {msg}"),
            other => panic!("expected depth error, got {other:?}"),
        }
    }

    #[test]
    fn test_eval_recursive_factorial_program() {
        // (let ((fact (lambda (n) (if (<= n 0) 1 (* n (fact (- n 1))))))) (fact 6))
        // with fact tagged 0 and n tagged 1
        let program = r#"
        {"let": {
            "bindings": [[0,
                {"lambda": {"params": [1],
                            "body": {"if": [{"<=": [{"var": 1}, 0]},
                                            1,
                                            {"*": [{"var": 1},
                                                   {"apply": [{"var": 0},
                                                              {"-": [{"var": 1}, 1]}]}]}]}}}]],
            "body": {"apply": [{"var": 0}, 6]}}}
        "#;
        let term = parse_json_term(program).unwrap();
        assert_eq!(eval(&term, &Env::empty()), Ok(int(720)));
    }

    #[test]
    fn test_eval_variadic_operators_program() {
        let test_cases = vec![
            (r#"{"+": [1, 2, 3]}"#, int(6)),
            (r#"{"*": [1, 2, 3]}"#, int(6)),
            (r#"{"and": [true, true, false]}"#, val(false)),
            (r#"{"or": [true, true, false, false, false]}"#, val(true)),
            (r#"{"=": [1, []]}"#, val(false)),
            (r#"{"!=": [1, []]}"#, val(true)),
            (r#"{"car": [[1, 2, 3]]}"#, int(1)),
            (r#"{"null?": [[]]}"#, val(true)),
        ];
        for (input, expected) in test_cases {
            let term = parse_json_term(input).unwrap();
            assert_eq!(
                eval(&term, &Env::empty()),
                Ok(expected),
                "for input: {input}"
            );
        }
    }
}
