//! Primitive operator registry and reduction rules.
//!
//! Every member of the closed [`OpCode`] set is described by an
//! [`OpDef`] carrying its surface name, its arity contract, and its
//! implementation behind the canonical erased signature
//! `fn(&[Term]) -> Result<Term, Error>`. The registry is a single
//! contiguous table for ease of auditing, with lazily built lookup
//! maps keyed by opcode (for the evaluator) and by name (for the
//! front-ends and for rendering).
//!
//! Operators reduce fully-evaluated arguments only; no evaluation
//! happens here. Type mismatches report `TypeError`, argument-count
//! violations report `ArityError`, and `i64` overflow in the
//! arithmetic operators reports `EvalError` rather than wrapping.

use crate::Error;
use crate::ast::{NumberType, OpCode, Term};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Expected number of arguments for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments
    Exact(usize),
    /// At least this many arguments
    AtLeast(usize),
    /// Any number of arguments
    Any,
}

impl Arity {
    /// Check if the given number of arguments is valid
    pub fn validate(&self, got: usize) -> Result<(), Error> {
        match *self {
            Arity::Exact(expected) if got != expected => Err(Error::arity_error(expected, got)),
            Arity::AtLeast(min) if got < min => Err(Error::arity_error(min, got)),
            _ => Ok(()),
        }
    }
}

/// Definition of a primitive operator
#[derive(Debug, Clone, Copy)]
pub struct OpDef {
    /// The opcode this definition implements
    pub code: OpCode,
    /// The surface identifier used by the front-ends and for rendering
    pub name: &'static str,
    /// Expected number of arguments
    pub arity: Arity,
    /// The reduction rule, in the canonical erased builtin signature
    func: fn(&[Term]) -> Result<Term, Error>,
}

impl PartialEq for OpDef {
    fn eq(&self, other: &Self) -> bool {
        // Opcodes uniquely identify operations
        self.code == other.code
    }
}

//
// Operator implementations
//

fn expect_int(term: &Term, op: &str) -> Result<NumberType, Error> {
    match term {
        Term::Int(n) => Ok(*n),
        other => Err(Error::TypeError(format!(
            "'{op}' requires integer arguments, got {other}"
        ))),
    }
}

fn expect_bool(term: &Term, op: &str) -> Result<bool, Error> {
    match term {
        Term::Bool(b) => Ok(*b),
        other => Err(Error::TypeError(format!(
            "'{op}' requires boolean arguments, got {other}"
        ))),
    }
}

fn overflow(op: &str) -> Error {
    Error::EvalError(format!("integer overflow in '{op}'"))
}

/// Left fold of `+`; the empty application reduces to `0`.
fn op_add(args: &[Term]) -> Result<Term, Error> {
    let mut sum: NumberType = 0;
    for arg in args {
        let n = expect_int(arg, "+")?;
        sum = sum.checked_add(n).ok_or_else(|| overflow("+"))?;
    }
    Ok(Term::Int(sum))
}

/// Left fold of `*`; the empty application reduces to `1`.
fn op_mul(args: &[Term]) -> Result<Term, Error> {
    let mut product: NumberType = 1;
    for arg in args {
        let n = expect_int(arg, "*")?;
        product = product.checked_mul(n).ok_or_else(|| overflow("*"))?;
    }
    Ok(Term::Int(product))
}

/// Unary negation with one argument, otherwise the first argument
/// minus the sum of the rest.
fn op_sub(args: &[Term]) -> Result<Term, Error> {
    let first = expect_int(&args[0], "-")?;
    if args.len() == 1 {
        return first
            .checked_neg()
            .map(Term::Int)
            .ok_or_else(|| overflow("-"));
    }
    let mut result = first;
    for arg in &args[1..] {
        let n = expect_int(arg, "-")?;
        result = result.checked_sub(n).ok_or_else(|| overflow("-"))?;
    }
    Ok(Term::Int(result))
}

fn op_neg(args: &[Term]) -> Result<Term, Error> {
    expect_int(&args[0], "neg")?
        .checked_neg()
        .map(Term::Int)
        .ok_or_else(|| overflow("neg"))
}

/// `#t` iff all arguments are integers and equal, or all are booleans
/// and equal. Empty and singleton applications are vacuously `#t`;
/// mixed or non-scalar arguments reduce to `#f`.
fn op_eq(args: &[Term]) -> Result<Term, Error> {
    let all_ints = args.iter().all(|a| matches!(a, Term::Int(_)));
    let all_bools = args.iter().all(|a| matches!(a, Term::Bool(_)));
    let equal = (all_ints || all_bools) && args.windows(2).all(|pair| pair[0] == pair[1]);
    Ok(Term::Bool(equal))
}

/// Inequality on exactly two integers or exactly two booleans; every
/// other argument vector reduces to `#t`.
fn op_neq(args: &[Term]) -> Result<Term, Error> {
    let distinct = match args {
        [Term::Int(a), Term::Int(b)] => a != b,
        [Term::Bool(a), Term::Bool(b)] => a != b,
        _ => true,
    };
    Ok(Term::Bool(distinct))
}

fn op_leq(args: &[Term]) -> Result<Term, Error> {
    let a = expect_int(&args[0], "<=")?;
    let b = expect_int(&args[1], "<=")?;
    Ok(Term::Bool(a <= b))
}

/// Disjunction; the empty application reduces to `#f`. All arguments
/// are type-checked, there is no short-circuit at this level.
fn op_or(args: &[Term]) -> Result<Term, Error> {
    let mut acc = false;
    for arg in args {
        acc |= expect_bool(arg, "or")?;
    }
    Ok(Term::Bool(acc))
}

/// Conjunction; the empty application reduces to `#t`.
fn op_and(args: &[Term]) -> Result<Term, Error> {
    let mut acc = true;
    for arg in args {
        acc &= expect_bool(arg, "and")?;
    }
    Ok(Term::Bool(acc))
}

fn op_not(args: &[Term]) -> Result<Term, Error> {
    Ok(Term::Bool(!expect_bool(&args[0], "not")?))
}

fn op_cons(args: &[Term]) -> Result<Term, Error> {
    Ok(Term::Cons(
        Box::new(args[0].clone()),
        Box::new(args[1].clone()),
    ))
}

fn op_car(args: &[Term]) -> Result<Term, Error> {
    match &args[0] {
        Term::Cons(car, _) => Ok((**car).clone()),
        other => Err(Error::TypeError(format!("'car' requires a pair, got {other}"))),
    }
}

fn op_cdr(args: &[Term]) -> Result<Term, Error> {
    match &args[0] {
        Term::Cons(_, cdr) => Ok((**cdr).clone()),
        other => Err(Error::TypeError(format!("'cdr' requires a pair, got {other}"))),
    }
}

fn op_is_null(args: &[Term]) -> Result<Term, Error> {
    Ok(Term::Bool(matches!(&args[0], Term::Nil)))
}

/// Registry of all primitive operators, one entry per opcode.
static OPS: [OpDef; 14] = [
    OpDef {
        code: OpCode::Add,
        name: "+",
        arity: Arity::Any,
        func: op_add,
    },
    OpDef {
        code: OpCode::Sub,
        name: "-",
        arity: Arity::AtLeast(1),
        func: op_sub,
    },
    OpDef {
        code: OpCode::Mul,
        name: "*",
        arity: Arity::Any,
        func: op_mul,
    },
    OpDef {
        code: OpCode::Eq,
        name: "=",
        arity: Arity::Any,
        func: op_eq,
    },
    OpDef {
        code: OpCode::Neq,
        name: "!=",
        arity: Arity::Any,
        func: op_neq,
    },
    OpDef {
        code: OpCode::Leq,
        name: "<=",
        arity: Arity::Exact(2),
        func: op_leq,
    },
    OpDef {
        code: OpCode::Neg,
        name: "neg",
        arity: Arity::Exact(1),
        func: op_neg,
    },
    OpDef {
        code: OpCode::Or,
        name: "or",
        arity: Arity::Any,
        func: op_or,
    },
    OpDef {
        code: OpCode::And,
        name: "and",
        arity: Arity::Any,
        func: op_and,
    },
    OpDef {
        code: OpCode::Not,
        name: "not",
        arity: Arity::Exact(1),
        func: op_not,
    },
    OpDef {
        code: OpCode::Cons,
        name: "cons",
        arity: Arity::Exact(2),
        func: op_cons,
    },
    OpDef {
        code: OpCode::Car,
        name: "car",
        arity: Arity::Exact(1),
        func: op_car,
    },
    OpDef {
        code: OpCode::Cdr,
        name: "cdr",
        arity: Arity::Exact(1),
        func: op_cdr,
    },
    OpDef {
        code: OpCode::IsNull,
        name: "null?",
        arity: Arity::Exact(1),
        func: op_is_null,
    },
];

/// Lazy map from opcode to definition (private - use op_def)
static OPS_BY_CODE: LazyLock<HashMap<OpCode, &'static OpDef>> =
    LazyLock::new(|| OPS.iter().map(|def| (def.code, def)).collect());

/// Lazy map from surface name to definition (private - use find_op)
static OPS_BY_NAME: LazyLock<HashMap<&'static str, &'static OpDef>> =
    LazyLock::new(|| OPS.iter().map(|def| (def.name, def)).collect());

/// Get all operator definitions
pub fn ops() -> &'static [OpDef] {
    &OPS
}

/// Look up an operator definition by its surface name
pub fn find_op(name: &str) -> Option<&'static OpDef> {
    OPS_BY_NAME.get(name).copied()
}

/// Look up the definition for an opcode - guaranteed to exist
pub fn op_def(code: OpCode) -> &'static OpDef {
    OPS_BY_CODE
        .get(&code)
        .copied()
        .expect("every opcode is registered")
}

/// The surface name of an opcode
pub fn op_name(code: OpCode) -> &'static str {
    op_def(code).name
}

/// Reduce a primitive operator applied to fully-evaluated arguments.
pub fn apply_op(code: OpCode, args: &[Term]) -> Result<Term, Error> {
    let def = op_def(code);
    def.arity.validate(args.len())?;
    (def.func)(args)
}
