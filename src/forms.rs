//! Derived forms, defined by expansion into the primitive syntax.
//!
//! These are term builders, not evaluator forms: the evaluator only
//! ever sees the `SExp`/`Closure`/`If` trees they produce. Further
//! derived forms can be added by analogous expansion as long as they
//! introduce no new values and no new evaluation rules.

use crate::ast::Term;
use crate::evaluator::Env;

/// Introduce a binding group around a body.
///
/// Expands to a nullary closure carrying `bindings`, applied
/// immediately. Evaluating the expansion first re-captures the
/// closure, extending `bindings` with the evaluation environment, and
/// then evaluates `body` in the extended environment.
///
/// Bindings are terms, not values: a lambda placed in the group is
/// closed over the group when looked up from the body, which is how
/// self- and mutually recursive definitions work without an
/// assignment form.
pub fn let_in(bindings: Env, body: Term) -> Term {
    Term::SExp {
        op: Box::new(Term::Closure {
            params: Vec::new(),
            body: Box::new(body),
            env: bindings,
        }),
        args: Vec::new(),
    }
}

/// Multi-way conditional: `(guard, result)` clauses tried in order,
/// with an optional default when every guard is falsy.
///
/// Expands right-to-left into nested `If` expressions. Without a
/// default the chain terminates in the guard-exhaustion marker, whose
/// evaluation fails with `Error::NoMatch`.
pub fn cond(default: Option<Term>, clauses: Vec<(Term, Term)>) -> Term {
    let mut chain = default.unwrap_or(Term::NoMatch);
    for (guard, result) in clauses.into_iter().rev() {
        chain = Term::If {
            cond: Box::new(guard),
            then: Box::new(result),
            alt: Box::new(chain),
        };
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::ast::{OpCode, if_, int, lambda, op, sexp, var};
    use crate::evaluator::eval;

    #[test]
    fn test_cond_expansion_shape() {
        // Two clauses expand to two nested ifs around the default
        let expanded = cond(
            Some(int(0)),
            vec![(var(1), int(10)), (var(2), int(20))],
        );
        assert_eq!(
            expanded,
            if_(var(1), int(10), if_(var(2), int(20), int(0)))
        );

        // No clauses: the default alone
        assert_eq!(cond(Some(int(5)), vec![]), int(5));
        assert_eq!(cond(None, vec![]), Term::NoMatch);
    }

    #[test]
    fn test_cond_selects_matching_clause() {
        // (cond ((= 1 x) 100) ((= 2 x) 200) ((= 3 x) 300)) with x = v0
        let guarded = |x: i64| {
            let expr = cond(
                None,
                vec![
                    (sexp(op(OpCode::Eq), vec![int(1), var(0)]), int(100)),
                    (sexp(op(OpCode::Eq), vec![int(2), var(0)]), int(200)),
                    (sexp(op(OpCode::Eq), vec![int(3), var(0)]), int(300)),
                ],
            );
            eval(&expr, &Env::empty().bind(0, int(x)))
        };
        assert_eq!(guarded(1), Ok(int(100)));
        assert_eq!(guarded(2), Ok(int(200)));
        assert_eq!(guarded(3), Ok(int(300)));
        assert_eq!(guarded(42), Err(Error::NoMatch));
    }

    #[test]
    fn test_cond_with_explicit_default() {
        let expr = cond(
            Some(int(-1)),
            vec![(sexp(op(OpCode::Eq), vec![int(1), var(0)]), int(100))],
        );
        assert_eq!(
            eval(&expr, &Env::empty().bind(0, int(9))),
            Ok(int(-1))
        );
    }

    #[test]
    fn test_cond_guards_after_match_not_evaluated() {
        // The marker default and later (failing) guards are dead once
        // the first guard matches
        let expr = cond(
            None,
            vec![
                (int(1), int(7)),
                (var(999), int(8)), // unbound, must never run
            ],
        );
        assert_eq!(eval(&expr, &Env::empty()), Ok(int(7)));
    }

    #[test]
    fn test_let_introduces_bindings() {
        let expr = let_in(
            Env::empty().bind(0, int(2)).bind(1, int(3)),
            sexp(op(OpCode::Add), vec![var(0), var(1)]),
        );
        assert_eq!(eval(&expr, &Env::empty()), Ok(int(5)));
    }

    #[test]
    fn test_let_body_sees_enclosing_environment() {
        let expr = let_in(
            Env::empty().bind(0, int(2)),
            sexp(op(OpCode::Mul), vec![var(0), var(1)]),
        );
        assert_eq!(eval(&expr, &Env::empty().bind(1, int(21))), Ok(int(42)));
    }

    #[test]
    fn test_let_recursive_binding_group() {
        // (let ((fact (lambda (n) (if (<= n 0) 1 (* n (fact (- n 1))))))) (fact 10))
        let fact = lambda(
            vec![1],
            if_(
                sexp(op(OpCode::Leq), vec![var(1), int(0)]),
                int(1),
                sexp(
                    op(OpCode::Mul),
                    vec![
                        var(1),
                        sexp(var(0), vec![sexp(op(OpCode::Sub), vec![var(1), int(1)])]),
                    ],
                ),
            ),
        );
        let expr = let_in(Env::empty().bind(0, fact), sexp(var(0), vec![int(10)]));
        assert_eq!(eval(&expr, &Env::empty()), Ok(int(3_628_800)));
    }

    #[test]
    fn test_let_mutually_recursive_binding_group() {
        // even? = (lambda (n) (if (<= n 0) #t (odd? (- n 1))))
        // odd?  = (lambda (n) (if (<= n 0) #f (even? (- n 1))))
        let even = lambda(
            vec![2],
            if_(
                sexp(op(OpCode::Leq), vec![var(2), int(0)]),
                Term::Bool(true),
                sexp(var(1), vec![sexp(op(OpCode::Sub), vec![var(2), int(1)])]),
            ),
        );
        let odd = lambda(
            vec![3],
            if_(
                sexp(op(OpCode::Leq), vec![var(3), int(0)]),
                Term::Bool(false),
                sexp(var(0), vec![sexp(op(OpCode::Sub), vec![var(3), int(1)])]),
            ),
        );
        let group = Env::empty().bind(0, even).bind(1, odd);

        let is_odd = |n: i64| {
            eval(
                &let_in(group.clone(), sexp(var(1), vec![int(n)])),
                &Env::empty(),
            )
        };
        assert_eq!(is_odd(41), Ok(Term::Bool(true)));
        assert_eq!(is_odd(12), Ok(Term::Bool(false)));
    }
}
