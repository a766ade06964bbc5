//! Native predicate library
//!
//! Every builtin is a function from (machine, resolved arguments, success
//! continuation) to a promise: `Delay`-style deferral on success, a settled
//! `false` on failure, a fault carrying an ISO error term otherwise. The
//! modules group predicates by concern; `register_all` wires them into a
//! fresh machine's procedure table.
//!
//! Control constructs the engine can express in itself live in
//! [`BOOTSTRAP`], consulted as static procedures at machine construction.

mod arith;
mod atoms;
mod collect;
mod control;
mod database;
mod flags;
mod io;
mod terms;

use super::env::Env;
use super::exception::{instantiation_error, type_error, Exception};
use super::promise::{Cont, Promise};
use super::term::Term;
use super::Machine;

/// Control constructs defined in Prolog itself. Loaded as static procedures;
/// user programs cannot retract them.
pub const BOOTSTRAP: &str = r#"
';'((If -> Then), _) :- call(If), !, call(Then).
';'((_ -> _), Else) :- !, call(Else).
';'(P, _) :- call(P).
';'(_, Q) :- call(Q).

If -> Then :- call(If), !, call(Then).

\+ Goal :- call(Goal), !, fail.
\+ _.

not(Goal) :- \+ call(Goal).

once(Goal) :- call(Goal), !.

ignore(Goal) :- call(Goal), !.
ignore(_).

repeat.
repeat :- repeat.

_ ^ Goal :- call(Goal).

forall(Cond, Action) :- \+ (call(Cond), \+ call(Action)).
"#;

/// Register the full native library on a machine.
pub fn register_all(m: &mut Machine) {
    control::register(m);
    terms::register(m);
    arith::register(m);
    atoms::register(m);
    database::register(m);
    collect::register(m);
    io::register(m);
    flags::register(m);
}

/// Deterministic success: hand over to the continuation at the next thunk
/// boundary.
#[inline]
pub(crate) fn det(k: Cont) -> Promise {
    Promise::defer(k)
}

/// Unify and continue; the scheduler's trail mark undoes the binding if the
/// continuation ultimately fails.
pub(crate) fn unify_cont(m: &mut Machine, a: &Term, b: &Term, k: Cont) -> Promise {
    if m.env.unify(a, b, false) {
        Promise::defer(k)
    } else {
        Promise::bool(false)
    }
}

/// The elements of a proper list, with ISO errors: `instantiation_error` for
/// a partial list, `type_error(list, _)` for anything else.
pub(crate) fn proper_list(t: &Term, env: &Env) -> Result<Vec<Term>, Exception> {
    let whole = env.resolve(t);
    let mut out = Vec::new();
    let mut rest = whole.clone();
    loop {
        match rest {
            Term::Atom(a) if a == "[]" => return Ok(out),
            Term::Variable(_) => return Err(instantiation_error()),
            Term::Compound(ref c) if c.functor == "." && c.args.len() == 2 => {
                out.push(c.args[0].clone());
                rest = env.resolve(&c.args[1]);
            }
            _ => return Err(type_error("list", whole, env)),
        }
    }
}
