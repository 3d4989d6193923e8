//! lispxp - a strict evaluator for a small Scheme-like expression language
//!
//! This crate implements a pure, eagerly-evaluated interpreter over a
//! closed set of syntactic forms: literals, variables, conditionals,
//! lambda abstraction, function application, list constructors, and a
//! fixed palette of primitive operators. Programs are `Term` trees,
//! built either directly through the constructors in [`ast`] or via
//! the optional front-ends, and reduce to values in a lexically scoped
//! environment:
//!
//! ```
//! use lispxp::ast::{Term, OpCode, int, op, sexp};
//! use lispxp::evaluator::{Env, eval};
//!
//! let expr = sexp(op(OpCode::Add), vec![int(1), int(2), int(3)]);
//! assert_eq!(eval(&expr, &Env::empty()), Ok(Term::Int(6)));
//! ```
//!
//! ## Semantics
//!
//! Evaluation is strict, left-to-right, call-by-value. Environments
//! are immutable, ordered binding sequences searched first-match, so
//! later frames shadow earlier ones. Lambdas capture their environment
//! at evaluation time; a closure retrieved from the environment has its
//! captured environment extended with the environment current at the
//! point of lookup, which is what makes self- and mutually recursive
//! binding groups work without an assignment form.
//!
//! There is no mutation, no I/O, and no short-circuiting outside `If`:
//! `And`/`Or` are ordinary operators whose arguments are fully
//! evaluated before application.
//!
//! ## Modules
//!
//! - `ast`: the `Term` algebra shared by expressions and values
//! - `evaluator`: environments, `eval`, and `apply`
//! - `builtinops`: the primitive operator registry
//! - `forms`: derived forms (`let` binding groups, `cond`) defined by
//!   expansion into the primitive syntax
//! - `scheme`: textual S-expression front-end (feature `scheme`)
//! - `jsonexpr`: JSON term front-end (feature `json`)

use std::fmt;

use crate::ast::VarId;

/// Maximum parsing depth to prevent stack overflow on deeply nested input.
/// Applies to both the S-expression and JSON front-ends.
pub const MAX_PARSE_DEPTH: usize = 32;

/// Maximum evaluation depth to prevent stack overflow in recursive
/// evaluation. Set well above the parse depth so that recursive
/// programs (deep self-application, list folds) have room to run.
pub const MAX_EVAL_DEPTH: usize = 512;

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Front-end failure: malformed text or JSON input
    ParseError(String),
    /// Resource-limit failure: evaluation depth exceeded, arithmetic overflow
    EvalError(String),
    /// A primitive was applied to arguments of the wrong shape
    TypeError(String),
    /// A variable was evaluated with no binding in scope
    UnboundVariable(VarId),
    /// A closure or fixed-arity primitive was applied with the wrong
    /// number of arguments
    ArityError { expected: usize, got: usize },
    /// A guard-exhausted `cond` reached its no-default marker
    NoMatch,
}

impl Error {
    /// Create an ArityError
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError { expected, got }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(msg) => write!(f, "ParseError: {msg}"),
            Error::EvalError(msg) => write!(f, "EvaluationError: {msg}"),
            Error::TypeError(msg) => write!(f, "Type error: {msg}"),
            Error::UnboundVariable(var) => write!(f, "Unbound variable: v{var}"),
            Error::ArityError { expected, got } => {
                write!(f, "ArityError: expected {expected} arguments, got {got}")
            }
            Error::NoMatch => write!(f, "NoMatch: no matching guard and no default"),
        }
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod forms;

#[cfg(feature = "json")]
pub mod jsonexpr;

#[cfg(feature = "scheme")]
pub mod scheme;
