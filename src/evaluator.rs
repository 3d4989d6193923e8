//! Environments and the evaluation/application relations.
//!
//! [`Env`] is an ordered, immutable sequence of bindings from variable
//! tags to terms, searched first-match. [`eval`] reduces a term to a
//! value in an environment; [`apply`] reduces a fully-evaluated
//! operator applied to fully-evaluated arguments.

use crate::ast::{Term, VarId};
use crate::builtinops::apply_op;
use crate::{Error, MAX_EVAL_DEPTH};

/// Ordered environment of variable bindings.
///
/// Bindings are not unique by variable: lookup scans the sequence in
/// construction order and returns the first match, so earlier bindings
/// shadow later ones within a single environment, and [`Env::extend`]
/// places the extending bindings in front. Environments are immutable;
/// every combinator produces a new environment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Env {
    bindings: Vec<(VarId, Term)>,
}

impl Env {
    /// The distinguished empty environment.
    pub fn empty() -> Self {
        Env::default()
    }

    /// Append a binding, returning the extended environment.
    ///
    /// The new binding lands at the end of the lookup order, so it
    /// does not shadow existing bindings of the same variable.
    #[must_use]
    pub fn bind(mut self, var: VarId, value: Term) -> Self {
        self.bindings.push((var, value));
        self
    }

    /// Return the value bound to `var`, scanning bindings in order and
    /// returning the first match.
    pub fn lookup(&self, var: VarId) -> Result<&Term, Error> {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == var)
            .map(|(_, value)| value)
            .ok_or(Error::UnboundVariable(var))
    }

    /// Produce a new environment whose bindings-in-scope are those of
    /// `inner` preceding those of `self`, so bindings from `inner`
    /// shadow colliding bindings from `self`.
    #[must_use]
    pub fn extend(&self, inner: &Env) -> Env {
        let mut bindings = Vec::with_capacity(inner.bindings.len() + self.bindings.len());
        bindings.extend_from_slice(&inner.bindings);
        bindings.extend_from_slice(&self.bindings);
        Env { bindings }
    }

    /// Build an environment from parallel parameter/argument sequences.
    pub fn make(params: &[VarId], args: Vec<Term>) -> Result<Env, Error> {
        if params.len() != args.len() {
            return Err(Error::arity_error(params.len(), args.len()));
        }
        Ok(Env {
            bindings: params.iter().copied().zip(args).collect(),
        })
    }

    /// Number of bindings, including shadowed ones.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl FromIterator<(VarId, Term)> for Env {
    fn from_iter<I: IntoIterator<Item = (VarId, Term)>>(iter: I) -> Self {
        Env {
            bindings: iter.into_iter().collect(),
        }
    }
}

/// Evaluate a term to a value (public API)
pub fn eval(expr: &Term, env: &Env) -> Result<Term, Error> {
    eval_with_depth(expr, env, 0)
}

/// Apply a fully-evaluated operator to fully-evaluated arguments
/// (public API). Operators dispatch to the primitive registry;
/// closures are applied by extending their captured environment with a
/// fresh parameter frame and evaluating the body.
pub fn apply(func: Term, args: Vec<Term>) -> Result<Term, Error> {
    apply_with_depth(func, args, 0)
}

/// Evaluate a term with depth tracking to prevent stack overflow
fn eval_with_depth(expr: &Term, env: &Env, depth: usize) -> Result<Term, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::EvalError(format!(
            "evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
        )));
    }
    match expr {
        // Self-evaluating forms: literals and first-class operators
        Term::Int(_) | Term::Bool(_) | Term::Nil | Term::Op(_) => Ok(expr.clone()),

        Term::NoMatch => Err(Error::NoMatch),

        // Variable lookup, with environment promotion for retrieved
        // lambdas/closures so the binding group they came from stays
        // in scope (the recursion mechanism)
        Term::Var(var) => Ok(recapture(env.lookup(*var)?, env)),

        // Pairs evaluate component-wise
        Term::Cons(car, cdr) => Ok(Term::Cons(
            Box::new(eval_with_depth(car, env, depth + 1)?),
            Box::new(eval_with_depth(cdr, env, depth + 1)?),
        )),

        // The non-chosen branch is never evaluated
        Term::If { cond, then, alt } => {
            let guard = eval_with_depth(cond, env, depth + 1)?;
            if is_truthy(&guard) {
                eval_with_depth(then, env, depth + 1)
            } else {
                eval_with_depth(alt, env, depth + 1)
            }
        }

        // Closure formation: capture the environment current at the
        // point the lambda is evaluated
        Term::Lambda { params, body } => Ok(Term::Closure {
            params: params.clone(),
            body: body.clone(),
            env: env.clone(),
        }),

        // A closure encountered as an expression re-captures the
        // surrounding environment
        Term::Closure {
            params,
            body,
            env: captured,
        } => Ok(Term::Closure {
            params: params.clone(),
            body: body.clone(),
            env: captured.extend(env),
        }),

        Term::SExp { op, args } => {
            eval_sexp(op, args, env, depth).map_err(|err| add_context(err, expr))
        }
    }
}

/// Falsity is `#f` and `0`; every other value is truthy.
fn is_truthy(value: &Term) -> bool {
    !matches!(value, Term::Bool(false) | Term::Int(0))
}

/// Environment promotion for terms retrieved by variable lookup.
///
/// A lambda picked out of the environment closes over the environment
/// current at the point of lookup; a closure has its captured
/// environment extended with it. Other terms are returned unchanged.
fn recapture(bound: &Term, env: &Env) -> Term {
    match bound {
        Term::Lambda { params, body } => Term::Closure {
            params: params.clone(),
            body: body.clone(),
            env: env.clone(),
        },
        Term::Closure {
            params,
            body,
            env: captured,
        } => Term::Closure {
            params: params.clone(),
            body: body.clone(),
            env: captured.extend(env),
        },
        other => other.clone(),
    }
}

/// Helper function to add expression context to errors
fn add_context(error: Error, expr: &Term) -> Error {
    let context = format!("while evaluating: {expr}");
    match error {
        Error::EvalError(msg) => Error::EvalError(format!("{msg}\n  Context: {context}")),
        Error::TypeError(msg) => Error::TypeError(format!("{msg}\n  Context: {context}")),
        // Unbound variables, arity errors, and guard exhaustion carry
        // their own context
        other => other,
    }
}

/// Evaluate an application: operator first, then each operand
/// left-to-right, then apply.
fn eval_sexp(op: &Term, args: &[Term], env: &Env, depth: usize) -> Result<Term, Error> {
    let func = eval_with_depth(op, env, depth + 1)?;
    let arg_values = eval_args(args, env, depth)?;
    apply_with_depth(func, arg_values, depth)
}

/// Helper function to evaluate a list of argument expressions with depth tracking
fn eval_args(args: &[Term], env: &Env, depth: usize) -> Result<Vec<Term>, Error> {
    args.iter()
        .map(|arg| eval_with_depth(arg, env, depth + 1))
        .collect()
}

fn apply_with_depth(func: Term, args: Vec<Term>, depth: usize) -> Result<Term, Error> {
    debug_assert!(
        args.iter().all(Term::is_value),
        "apply requires fully evaluated arguments"
    );
    match func {
        Term::Op(code) => apply_op(code, &args),
        Term::Closure {
            params,
            body,
            env: captured,
        } => {
            let frame = Env::make(&params, args)?;
            let call_env = captured.extend(&frame);
            eval_with_depth(&body, &call_env, depth + 1)
        }
        other => Err(Error::TypeError(format!(
            "cannot apply non-function: {other}"
        ))),
    }
}
