//! Control predicates: metacall, exceptions, and the trivial goals
//!
//! `call/2..7` extend a closure with extra arguments before dispatch. Cut is
//! made local to every metacall by the synthetic-clause barrier `solve`
//! allocates; `catch/3` is a guard frame in the scheduler.

use super::super::exception::{instantiation_error, type_error, Exception};
use super::super::promise::Promise;
use super::super::term::Term;
use super::super::Machine;
use super::det;

pub(super) fn register(m: &mut Machine) {
    m.register("true", 0, |_, _, k| det(k));
    m.register("fail", 0, |_, _, _| Promise::bool(false));
    m.register("false", 0, |_, _, _| Promise::bool(false));

    m.register("call", 1, |m, args, k| match m.env.resolve(&args[0]) {
        Term::Variable(_) => Promise::error(instantiation_error()),
        goal => m.solve(&goal, k),
    });
    for arity in 2..=7usize {
        m.register("call", arity, |m, args, k| match extend_goal(m, args) {
            Ok(goal) => m.solve(&goal, k),
            Err(e) => Promise::error(e),
        });
    }

    m.register("catch", 3, |m, mut args, k| {
        let recovery = args.pop().unwrap_or_else(Term::nil);
        let catcher = args.pop().unwrap_or_else(Term::nil);
        let goal = args.pop().unwrap_or_else(Term::nil);
        let goal_k = k.clone();
        Promise::Guard {
            catcher,
            recovery,
            cont: k,
            inner: Box::new(move |m| m.solve(&goal, goal_k)),
        }
    });

    m.register("throw", 1, |m, args, _k| {
        let ball = m.env.resolve(&args[0]);
        if matches!(ball, Term::Variable(_)) {
            return Promise::error(instantiation_error());
        }
        Promise::error(Exception::new(ball, &m.env))
    });

    m.register("halt", 0, |_, _, _| std::process::exit(0));
    m.register("halt", 1, |m, args, _| match m.env.resolve(&args[0]) {
        Term::Variable(_) => Promise::error(instantiation_error()),
        Term::Integer(n) => std::process::exit(n as i32),
        other => Promise::error(type_error("integer", other, &m.env)),
    });
}

/// `call(G, E1, ..., En)`: append the extra arguments to the goal.
fn extend_goal(m: &Machine, mut args: Vec<Term>) -> Result<Term, Exception> {
    let extra = args.split_off(1);
    match m.env.resolve(&args[0]) {
        Term::Variable(_) => Err(instantiation_error()),
        Term::Atom(name) => Ok(Term::compound(name, extra)),
        Term::Compound(c) => {
            let mut all = c.args.clone();
            all.extend(extra);
            Ok(Term::compound(c.functor, all))
        }
        other => Err(type_error("callable", other, &m.env)),
    }
}
