//! Database mutation and inspection
//!
//! Clause lists mutate in place: `assertz` appends, `asserta` prepends, and
//! `abolish` drops the whole entry. `retract` runs the continuation before
//! committing: a matching clause is removed when the continuation succeeds
//! or faults, kept when it fails, and backtracking resumes scanning after
//! it. Static procedures and builtins refuse modification with the ISO
//! permission error. Committed side effects are not undone on backtracking.

use std::collections::HashMap;
use std::rc::Rc;

use super::super::clause::Clause;
use super::super::exception::{
    domain_error, instantiation_error, permission_error, type_error,
};
use super::super::promise::{Cont, Promise, Search, Thunk};
use super::super::term::{renamed_copy, ProcedureIndicator, Term};
use super::super::{Machine, Procedure};
use super::{det, unify_cont};

pub(super) fn register(m: &mut Machine) {
    m.register("assertz", 1, |m, args, k| assert_clause(m, &args[0], false, k));
    m.register("asserta", 1, |m, args, k| assert_clause(m, &args[0], true, k));
    m.register("assert", 1, |m, args, k| assert_clause(m, &args[0], false, k));

    m.register("retract", 1, |m, args, k| {
        let target = rulify(&m.env.resolve(&args[0]), m);
        let head = match target.as_functor(":-", 2) {
            Some(r) => r.args[0].clone(),
            None => return Promise::error(type_error("callable", target, &m.env)),
        };
        let pi = match super::super::vm::pi_args(&head, m) {
            Ok((pi, _)) => pi,
            Err(e) => return Promise::error(e),
        };
        let clauses = match m.procedures.get(&pi) {
            None => return Promise::bool(false),
            Some(Procedure::Dynamic(cs)) => cs.clone(),
            Some(_) => {
                return Promise::error(permission_error(
                    "modify",
                    "static_procedure",
                    pi.term(),
                    &m.env,
                ))
            }
        };
        // one alternative per clause; the removal commits only once the
        // continuation has succeeded, so a failed downstream goal leaves
        // the clause in place and scanning moves on
        let alts: Vec<Thunk> = clauses
            .into_iter()
            .map(|c| {
                let target = target.clone();
                let k = k.clone();
                Box::new(move |m: &mut Machine| {
                    let mark = m.env.mark();
                    let fresh = rulify(&renamed_copy(&c.raw, &m.env, &mut HashMap::new()), m);
                    if !m.env.unify(&target, &fresh, false) {
                        return Promise::bool(false);
                    }
                    let mut search = Search::new(Promise::defer(k.clone()));
                    match search.force(m) {
                        Ok(true) => {
                            remove_clause(m, pi, &c);
                            Promise::bool(true)
                        }
                        Ok(false) => {
                            m.env.undo_to(mark);
                            Promise::bool(false)
                        }
                        Err(e) => {
                            remove_clause(m, pi, &c);
                            m.env.undo_to(mark);
                            Promise::error(e)
                        }
                    }
                }) as Thunk
            })
            .collect();
        Promise::delay_all(alts)
    });

    m.register("abolish", 1, |m, args, k| {
        let pi = match indicator(m, &args[0]) {
            Ok(pi) => pi,
            Err(e) => return Promise::error(e),
        };
        let removable = matches!(m.procedures.get(&pi), None | Some(Procedure::Dynamic(_)));
        if !removable {
            return Promise::error(permission_error(
                "modify",
                "static_procedure",
                pi.term(),
                &m.env,
            ));
        }
        m.procedures.remove(&pi);
        det(k)
    });

    m.register("clause", 2, |m, args, k| {
        let head = m.env.resolve(&args[0]);
        let pi = match super::super::vm::pi_args(&head, m) {
            Ok((pi, _)) => pi,
            Err(e) => return Promise::error(e),
        };
        match m.env.resolve(&args[1]) {
            Term::Variable(_) | Term::Atom(_) | Term::Compound(_) => {}
            other => return Promise::error(type_error("callable", other, &m.env)),
        }
        let clauses = match m.procedures.get(&pi) {
            None => return Promise::bool(false),
            Some(Procedure::Dynamic(cs)) => cs.clone(),
            Some(_) => {
                return Promise::error(permission_error(
                    "access",
                    "private_procedure",
                    pi.term(),
                    &m.env,
                ))
            }
        };
        let alts: Vec<Thunk> = clauses
            .into_iter()
            .map(|c| {
                let head = args[0].clone();
                let body = args[1].clone();
                let k = k.clone();
                Box::new(move |m: &mut Machine| {
                    let fresh = rulify(&renamed_copy(&c.raw, &m.env, &mut HashMap::new()), m);
                    let want = Term::compound(":-", vec![head.clone(), body.clone()]);
                    unify_cont(m, &want, &fresh, k.clone())
                }) as Thunk
            })
            .collect();
        Promise::delay_all(alts)
    });

    m.register("current_predicate", 1, |m, args, k| {
        match m.env.resolve(&args[0]) {
            Term::Variable(_) => {}
            t => {
                let ok = t
                    .as_functor("/", 2)
                    .map(|c| {
                        matches!(m.env.resolve(&c.args[0]), Term::Variable(_) | Term::Atom(_))
                            && matches!(
                                m.env.resolve(&c.args[1]),
                                Term::Variable(_) | Term::Integer(_)
                            )
                    })
                    .unwrap_or(false);
                if !ok {
                    return Promise::error(type_error("predicate_indicator", t, &m.env));
                }
            }
        }
        let mut pis: Vec<ProcedureIndicator> = m
            .procedures
            .iter()
            .filter(|(_, p)| matches!(p, Procedure::Dynamic(_)))
            .map(|(pi, _)| *pi)
            .collect();
        pis.sort_by(|a, b| {
            a.name.as_str().cmp(b.name.as_str()).then(a.arity.cmp(&b.arity))
        });
        let alts: Vec<Thunk> = pis
            .into_iter()
            .map(|pi| {
                let want = args[0].clone();
                let k = k.clone();
                Box::new(move |m: &mut Machine| unify_cont(m, &want, &pi.term(), k.clone()))
                    as Thunk
            })
            .collect();
        Promise::delay_all(alts)
    });

    m.register("dynamic", 1, |m, args, k| {
        let pi = match indicator(m, &args[0]) {
            Ok(pi) => pi,
            Err(e) => return Promise::error(e),
        };
        match m.procedures.get(&pi) {
            None => {}
            Some(Procedure::Dynamic(_)) => return det(k),
            Some(_) => {
                return Promise::error(permission_error(
                    "modify",
                    "static_procedure",
                    pi.term(),
                    &m.env,
                ))
            }
        }
        m.procedures.insert(pi, Procedure::Dynamic(Vec::new()));
        det(k)
    });
}

fn assert_clause(m: &mut Machine, t: &Term, front: bool, k: Cont) -> Promise {
    let t = m.env.resolve(t);
    if matches!(t, Term::Variable(_)) {
        return Promise::error(instantiation_error());
    }
    // a directive handed to assert runs instead of being stored
    if let Some(d) = t.as_functor(":-", 1) {
        let goal = d.args[0].clone();
        return m.solve(&goal, k);
    }
    match m.assert_clauses(&t, front, false) {
        Ok(()) => det(k),
        Err(e) => Promise::error(e),
    }
}

/// `H` as `H :- true`; rules pass through.
fn rulify(t: &Term, m: &Machine) -> Term {
    let t = m.env.resolve(t);
    if t.as_functor(":-", 2).is_some() {
        t
    } else {
        Term::compound(":-", vec![t, Term::atom("true")])
    }
}

/// Parse and validate a `Name/Arity` term.
fn indicator(m: &Machine, t: &Term) -> Result<ProcedureIndicator, super::super::exception::Exception> {
    let t = m.env.resolve(t);
    if matches!(t, Term::Variable(_)) {
        return Err(instantiation_error());
    }
    let c = t
        .as_functor("/", 2)
        .ok_or_else(|| type_error("predicate_indicator", t.clone(), &m.env))?;
    let name = match m.env.resolve(&c.args[0]) {
        Term::Variable(_) => return Err(instantiation_error()),
        Term::Atom(a) => a,
        other => return Err(type_error("atom", other, &m.env)),
    };
    match m.env.resolve(&c.args[1]) {
        Term::Variable(_) => Err(instantiation_error()),
        Term::Integer(n) if n < 0 => {
            Err(domain_error("not_less_than_zero", Term::Integer(n), &m.env))
        }
        Term::Integer(n) => Ok(ProcedureIndicator { name, arity: n as usize }),
        other => Err(type_error("integer", other, &m.env)),
    }
}

/// Remove one clause, identified by its shared bytecode, from a dynamic
/// procedure.
fn remove_clause(m: &mut Machine, pi: ProcedureIndicator, c: &Clause) {
    if let Some(Procedure::Dynamic(cs)) = m.procedures.get_mut(&pi) {
        if let Some(i) = cs.iter().position(|x| Rc::ptr_eq(&x.code, &c.code)) {
            cs.remove(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::Machine;
    use crate::engine::term::Term;

    fn solutions(m: &mut Machine, q: &str) -> Vec<crate::engine::Bindings> {
        m.query(q).unwrap().collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn test_assertz_appends_asserta_prepends() {
        let mut m = Machine::new();
        m.consult("p(2).").unwrap();
        assert_eq!(solutions(&mut m, "assertz(p(3)), asserta(p(1)).").len(), 1);
        let got: Vec<Term> = solutions(&mut m, "p(X).")
            .iter()
            .map(|s| s.get("X").unwrap().clone())
            .collect();
        assert_eq!(got, vec![Term::Integer(1), Term::Integer(2), Term::Integer(3)]);
    }

    #[test]
    fn test_assert_rule_and_call() {
        let mut m = Machine::new();
        assert_eq!(solutions(&mut m, "assertz((q(X) :- p(X))), assertz(p(7)).").len(), 1);
        let got = solutions(&mut m, "q(X).");
        assert_eq!(got[0].get("X").unwrap(), &Term::Integer(7));
    }

    #[test]
    fn test_retract_removes_first_match() {
        let mut m = Machine::new();
        m.consult("p(1). p(2). p(3).").unwrap();
        assert_eq!(solutions(&mut m, "retract(p(2)).").len(), 1);
        let got: Vec<Term> = solutions(&mut m, "p(X).")
            .iter()
            .map(|s| s.get("X").unwrap().clone())
            .collect();
        assert_eq!(got, vec![Term::Integer(1), Term::Integer(3)]);
    }

    #[test]
    fn test_retract_backtracks_over_matches() {
        let mut m = Machine::new();
        m.consult("p(1). p(2). p(3).").unwrap();
        let got: Vec<Term> = solutions(&mut m, "retract(p(X)).")
            .iter()
            .map(|s| s.get("X").unwrap().clone())
            .collect();
        assert_eq!(got, vec![Term::Integer(1), Term::Integer(2), Term::Integer(3)]);
        assert!(solutions(&mut m, "p(_).").is_empty());
    }

    #[test]
    fn test_retract_keeps_clause_when_continuation_fails() {
        let mut m = Machine::new();
        m.consult("p(1). p(6).").unwrap();
        let sols = solutions(&mut m, "retract(p(X)), X > 5.");
        assert_eq!(sols.len(), 1);
        assert_eq!(sols[0].get("X").unwrap(), &Term::Integer(6));
        // the X = 1 attempt failed downstream, so p(1) was never removed
        let left: Vec<Term> = solutions(&mut m, "p(Y).")
            .iter()
            .map(|s| s.get("Y").unwrap().clone())
            .collect();
        assert_eq!(left, vec![Term::Integer(1)]);
    }

    #[test]
    fn test_retract_rule() {
        let mut m = Machine::new();
        m.consult("q(X) :- p(X). p(1).").unwrap();
        assert_eq!(solutions(&mut m, "retract((q(X) :- p(X))).").len(), 1);
        let mut sols = m.query("q(1).").unwrap();
        // q/1 still exists but has no clauses
        assert!(sols.next().is_none());
    }

    #[test]
    fn test_static_procedures_are_protected() {
        let mut m = Machine::new();
        let mut sols = m.query("assertz((';'(a, b))).").unwrap();
        let err = sols.next().unwrap().unwrap_err();
        assert!(err.term().to_string().contains("permission_error"));
        let mut sols = m.query("abolish(once/1).").unwrap();
        assert!(sols.next().unwrap().is_err());
    }

    #[test]
    fn test_clause_inspection() {
        let mut m = Machine::new();
        m.consult("f(1). g(X) :- f(X).").unwrap();
        let sols = solutions(&mut m, "clause(f(1), B).");
        assert_eq!(sols[0].get("B").unwrap(), &Term::atom("true"));
        let sols = solutions(&mut m, "clause(g(Z), B).");
        assert!(sols[0].get("B").unwrap().as_functor("f", 1).is_some());
    }

    #[test]
    fn test_current_predicate() {
        let mut m = Machine::new();
        m.consult("zzz(1).").unwrap();
        assert_eq!(solutions(&mut m, "current_predicate(zzz/1).").len(), 1);
        assert!(solutions(&mut m, "current_predicate(zzz/2).").is_empty());
    }

    #[test]
    fn test_abolish_removes_procedure() {
        let mut m = Machine::new();
        m.consult("p(1).").unwrap();
        assert_eq!(solutions(&mut m, "abolish(p/1).").len(), 1);
        let mut sols = m.query("p(1).").unwrap();
        // gone entirely: unknown procedure under the default policy
        assert!(sols.next().unwrap().is_err());
    }
}
