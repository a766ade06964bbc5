//! Prolog exceptions
//!
//! An exception is an error represented by a Prolog term, almost always of
//! the ISO shape `error(Kind, Context)`. Exceptions are carried by the
//! scheduler's fault path until a `catch/3` guard whose catcher unifies with
//! the ball, or out to the embedder. The ball is snapshotted with a renamed
//! copy at construction time so backtracking cannot unbind parts of it.

use std::collections::HashMap;
use std::fmt;

use super::env::Env;
use super::term::{renamed_copy, Term};

/// An error represented by a Prolog term.
#[derive(Clone, Debug)]
pub struct Exception {
    term: Term,
}

impl Exception {
    /// Create an exception from a copy of the given term.
    pub fn new(term: Term, env: &Env) -> Self {
        let mut map = HashMap::new();
        Exception { term: renamed_copy(&term, env, &mut map) }
    }

    /// The underlying ball.
    pub fn term(&self) -> &Term {
        &self.term
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.term)
    }
}

impl std::error::Error for Exception {}

fn error_term(kind: Term) -> Term {
    Term::compound("error", vec![kind, Term::fresh_var()])
}

/// `instantiation_error`: an argument required to be instantiated was unbound.
pub fn instantiation_error() -> Exception {
    Exception { term: error_term(Term::atom("instantiation_error")) }
}

/// `type_error(Type, Culprit)`: the culprit is not of the required type.
pub fn type_error(valid_type: &str, culprit: Term, env: &Env) -> Exception {
    Exception::new(
        error_term(Term::compound("type_error", vec![Term::atom(valid_type), culprit])),
        env,
    )
}

/// `domain_error(Domain, Culprit)`: right type, value outside the domain.
pub fn domain_error(valid_domain: &str, culprit: Term, env: &Env) -> Exception {
    Exception::new(
        error_term(Term::compound("domain_error", vec![Term::atom(valid_domain), culprit])),
        env,
    )
}

/// `existence_error(ObjectType, Culprit)`: a named object does not exist.
pub fn existence_error(object_type: &str, culprit: Term, env: &Env) -> Exception {
    Exception::new(
        error_term(Term::compound("existence_error", vec![Term::atom(object_type), culprit])),
        env,
    )
}

/// `permission_error(Operation, PermissionType, Culprit)`.
pub fn permission_error(operation: &str, permission_type: &str, culprit: Term, env: &Env) -> Exception {
    Exception::new(
        error_term(Term::compound(
            "permission_error",
            vec![Term::atom(operation), Term::atom(permission_type), culprit],
        )),
        env,
    )
}

/// `representation_error(Flag)`: an implementation-defined limit was breached.
pub fn representation_error(flag: &str) -> Exception {
    Exception {
        term: error_term(Term::compound("representation_error", vec![Term::atom(flag)])),
    }
}

/// `resource_error(Resource)`: the engine ran out of a resource, including
/// the case of external cancellation.
pub fn resource_error(resource: &str) -> Exception {
    Exception {
        term: error_term(Term::compound("resource_error", vec![Term::atom(resource)])),
    }
}

/// `syntax_error(Message)`: from the reader.
pub fn syntax_error(message: &str) -> Exception {
    Exception {
        term: error_term(Term::compound("syntax_error", vec![Term::atom(message)])),
    }
}

/// `system_error(Detail)`: an unexpected host or engine failure.
pub fn system_error(detail: impl fmt::Display) -> Exception {
    Exception {
        term: Term::compound(
            "error",
            vec![Term::atom("system_error"), Term::atom(&detail.to_string())],
        ),
    }
}

/// `evaluation_error(Error)`: arithmetic gone wrong (`zero_divisor`,
/// `int_overflow`, `undefined`, ...).
pub fn evaluation_error(what: &str) -> Exception {
    Exception {
        term: error_term(Term::compound("evaluation_error", vec![Term::atom(what)])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_shape() {
        let env = Env::new();
        let e = type_error("integer", Term::atom("foo"), &env);
        let c = e.term().as_functor("error", 2).unwrap();
        let k = c.args[0].as_functor("type_error", 2).unwrap();
        assert_eq!(k.args[0], Term::atom("integer"));
        assert_eq!(k.args[1], Term::atom("foo"));
        assert!(matches!(c.args[1], Term::Variable(_)));
    }

    #[test]
    fn test_ball_is_snapshotted() {
        let mut env = Env::new();
        let x = Term::fresh_var();
        let ball = Term::compound("oops", vec![x.clone()]);
        let mark = env.mark();
        if let Term::Variable(id) = x {
            env.bind(id, Term::Integer(1));
        }
        let e = Exception::new(ball, &env);
        env.undo_to(mark);
        let c = e.term().as_functor("oops", 1).unwrap();
        assert_eq!(c.args[0], Term::Integer(1));
    }
}
