//! Bytecode virtual machine
//!
//! Executes one clause activation: a register set over the clause's bytecode,
//! xr table, and variable slots. The `args` register holds the remaining
//! argument list being matched (head) or built (body); `astack` suspends
//! outer argument lists while a nested structure is traversed. Every
//! suspension point hands a [`Promise`] back to the scheduler: `Call`
//! defers dispatch, `Cut` wraps the continuation in a pruning node, `Exit`
//! invokes the success continuation, and any match failure settles to
//! failure so the scheduler tries the next clause.

use std::rc::Rc;

use tracing::trace;

use super::clause::XrRef;
use super::exception::system_error;
use super::opcodes::{Instruction, Opcode};
use super::promise::{BarrierId, Cont, Promise};
use super::term::{ProcedureIndicator, Term};
use super::Machine;

/// The register file of one clause activation.
#[derive(Clone)]
pub(crate) struct Registers {
    pub pc: usize,
    pub code: Rc<[Instruction]>,
    pub xr: Rc<Vec<XrRef>>,
    /// One term per variable slot, allocated by the activation.
    pub vars: Rc<Vec<Term>>,
    /// The argument list being consumed or extended.
    pub args: Term,
    /// Suspended argument lists for nested structures; also carries the
    /// completed argument list of the goal being built between `Enter` and
    /// `Call`.
    pub astack: Term,
    pub cont: Cont,
    pub cut_barrier: BarrierId,
}

/// Run the activation until it fails, faults, or reaches a suspension point.
pub(crate) fn exec(m: &mut Machine, mut r: Registers) -> Promise {
    loop {
        let Some(&inst) = r.code.get(r.pc) else {
            return Promise::error(system_error("non-exit end of bytecode"));
        };
        trace!(target: "horn::vm", pc = r.pc, op = %inst, "exec");
        match inst.op {
            Opcode::GetConst | Opcode::PutConst => {
                let Some(XrRef::Const(x)) = r.xr.get(inst.operand as usize).cloned() else {
                    return Promise::error(system_error(format!("bad const operand: {}", inst)));
                };
                if !take_arg(m, &mut r, &x) {
                    return Promise::bool(false);
                }
            }
            Opcode::GetVar | Opcode::PutVar => {
                let Some(v) = r.vars.get(inst.operand as usize).cloned() else {
                    return Promise::error(system_error(format!("bad var operand: {}", inst)));
                };
                if !take_arg(m, &mut r, &v) {
                    return Promise::bool(false);
                }
            }
            Opcode::GetFunctor | Opcode::PutFunctor => {
                let Some(XrRef::Pi(pi)) = r.xr.get(inst.operand as usize).cloned() else {
                    return Promise::error(system_error(format!("bad functor operand: {}", inst)));
                };
                let Some(slot) = next_arg(m, &mut r) else {
                    return Promise::bool(false);
                };
                let args: Vec<Term> = (0..pi.arity).map(|_| Term::fresh_var()).collect();
                let shape = Term::compound(pi.name, args.clone());
                if !m.env.unify(&slot, &shape, false) {
                    return Promise::bool(false);
                }
                r.astack = Term::cons(std::mem::replace(&mut r.args, Term::list(args)), r.astack);
            }
            Opcode::GetList | Opcode::PutList => {
                let Some(XrRef::Len(n)) = r.xr.get(inst.operand as usize).cloned() else {
                    return Promise::error(system_error(format!("bad list operand: {}", inst)));
                };
                let Some(slot) = next_arg(m, &mut r) else {
                    return Promise::bool(false);
                };
                let elems: Vec<Term> = (0..n).map(|_| Term::fresh_var()).collect();
                let shape = Term::list(elems);
                if !m.env.unify(&slot, &shape, false) {
                    return Promise::bool(false);
                }
                r.astack = Term::cons(std::mem::replace(&mut r.args, shape), r.astack);
            }
            Opcode::GetPartial | Opcode::PutPartial => {
                let Some(XrRef::Len(n)) = r.xr.get(inst.operand as usize).cloned() else {
                    return Promise::error(system_error(format!("bad list operand: {}", inst)));
                };
                let Some(slot) = next_arg(m, &mut r) else {
                    return Promise::bool(false);
                };
                let tail = Term::fresh_var();
                let elems: Vec<Term> = (0..n).map(|_| Term::fresh_var()).collect();
                let shape = Term::partial_list(tail.clone(), elems.clone());
                if !m.env.unify(&slot, &shape, false) {
                    return Promise::bool(false);
                }
                // the match stream visits the compiled tail first, then the prefix
                let stream = Term::cons(tail, Term::list(elems));
                r.astack = Term::cons(std::mem::replace(&mut r.args, stream), r.astack);
            }
            Opcode::Pop => {
                if !m.env.unify(&r.args, &Term::nil(), false) {
                    return Promise::bool(false);
                }
                let outer = Term::fresh_var();
                let rest = Term::fresh_var();
                let cell = Term::cons(outer.clone(), rest.clone());
                if !m.env.unify(&r.astack, &cell, false) {
                    return Promise::bool(false);
                }
                r.pc += 1;
                r.args = outer;
                r.astack = rest;
            }
            Opcode::Enter => {
                if !m.env.unify(&r.args, &Term::nil(), false)
                    || !m.env.unify(&r.astack, &Term::nil(), false)
                {
                    return Promise::bool(false);
                }
                r.pc += 1;
                // a fresh open tail: args extends it, astack remembers its head
                let v = Term::fresh_var();
                r.args = v.clone();
                r.astack = v;
            }
            Opcode::Call => {
                let Some(XrRef::Pi(pi)) = r.xr.get(inst.operand as usize).cloned() else {
                    return Promise::error(system_error(format!("bad call operand: {}", inst)));
                };
                // close the open argument list
                if !m.env.unify(&r.args, &Term::nil(), false) {
                    return Promise::bool(false);
                }
                r.pc += 1;
                let goal_args = r.astack.clone();
                let resume = r.clone();
                let cont: Cont = Rc::new(move |m: &mut Machine| {
                    let mut r = resume.clone();
                    let v = Term::fresh_var();
                    r.args = v.clone();
                    r.astack = v;
                    exec(m, r)
                });
                return Promise::delay(move |m| m.arrive(pi, goal_args, cont));
            }
            Opcode::Cut => {
                r.pc += 1;
                let barrier = r.cut_barrier;
                return Promise::Cut { barrier, inner: Box::new(move |m| exec(m, r)) };
            }
            // deferred so deterministic call chains unwind through the
            // scheduler instead of nesting the native stack
            Opcode::Exit => return Promise::defer(r.cont),
        }
        if !matches!(inst.op, Opcode::Pop | Opcode::Enter) {
            // opcodes above advance pc themselves when they must
            r.pc += 1;
        }
    }
}

/// Destructure `args` as `[Head | Rest]`, unify `Head` against `want`, and
/// advance to `Rest`. In head position this matches a caller value; in body
/// position `args` is an open tail, so the same unification appends.
fn take_arg(m: &mut Machine, r: &mut Registers, want: &Term) -> bool {
    let rest = Term::fresh_var();
    let cell = Term::cons(want.clone(), rest.clone());
    if !m.env.unify(&r.args, &cell, false) {
        return false;
    }
    r.args = rest;
    true
}

/// Destructure `args` as `[Slot | Rest]`, advance to `Rest`, and hand back
/// the slot for structural matching.
fn next_arg(m: &mut Machine, r: &mut Registers) -> Option<Term> {
    let slot = Term::fresh_var();
    let rest = Term::fresh_var();
    let cell = Term::cons(slot.clone(), rest.clone());
    if !m.env.unify(&r.args, &cell, false) {
        return None;
    }
    r.args = rest;
    Some(slot)
}

/// The goal argument list and procedure indicator of a callable term, as
/// dispatch wants them.
pub(crate) fn pi_args(t: &Term, m: &Machine) -> Result<(ProcedureIndicator, Term), super::exception::Exception> {
    match m.env.resolve(t) {
        Term::Variable(_) => Err(super::exception::instantiation_error()),
        Term::Atom(a) => Ok((ProcedureIndicator::new(a, 0), Term::nil())),
        Term::Compound(c) => Ok((
            ProcedureIndicator { name: c.functor, arity: c.args.len() },
            Term::list(c.args.clone()),
        )),
        other => Err(super::exception::type_error("callable", other, &m.env)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clause::compile;
    use crate::engine::env::Env;
    use crate::engine::promise::Search;

    /// Activate a single compiled clause against the given argument list and
    /// force its first solution.
    fn run_clause(m: &mut Machine, source: Term, args: Vec<Term>) -> bool {
        let cs = compile(&source, &Env::new()).unwrap();
        let c = cs[0].clone();
        let barrier = m.next_barrier();
        let vars: Vec<Term> = (0..c.vars.len()).map(|_| Term::fresh_var()).collect();
        let r = Registers {
            pc: 0,
            code: c.code.clone(),
            xr: c.xr.clone(),
            vars: Rc::new(vars),
            args: Term::list(args),
            astack: Term::nil(),
            cont: Rc::new(|_| Promise::bool(true)),
            cut_barrier: barrier,
        };
        let p = Promise::delay(move |m| exec(m, r));
        Search::new(p).force(m).unwrap()
    }

    #[test]
    fn test_head_const_match() {
        let mut m = Machine::new();
        let fact = Term::compound("p", vec![Term::atom("a")]);
        assert!(run_clause(&mut m, fact.clone(), vec![Term::atom("a")]));
        assert!(!run_clause(&mut m, fact, vec![Term::atom("b")]));
    }

    #[test]
    fn test_head_var_slots_share() {
        let mut m = Machine::new();
        // p(X, X): both head positions go through one slot
        let x = Term::fresh_var();
        let fact = Term::compound("p", vec![x.clone(), x]);
        let y = Term::fresh_var();
        assert!(run_clause(&mut m, fact.clone(), vec![Term::atom("a"), y.clone()]));
        assert_eq!(m.env.resolve(&y), Term::atom("a"));
        assert!(!run_clause(&mut m, fact, vec![Term::atom("a"), Term::atom("b")]));
    }

    #[test]
    fn test_head_structure_match() {
        let mut m = Machine::new();
        // p(f(a, X))
        let fact = Term::compound(
            "p",
            vec![Term::compound("f", vec![Term::atom("a"), Term::fresh_var()])],
        );
        let y = Term::fresh_var();
        let ok = run_clause(
            &mut m,
            fact.clone(),
            vec![Term::compound("f", vec![Term::atom("a"), y.clone()])],
        );
        assert!(ok);
        let bad = run_clause(&mut m, fact, vec![Term::compound("g", vec![Term::atom("a")])]);
        assert!(!bad);
    }

    #[test]
    fn test_head_structure_builds_into_variable() {
        let mut m = Machine::new();
        // p(f(a)) called with an unbound argument constructs f(a)
        let fact = Term::compound("p", vec![Term::compound("f", vec![Term::atom("a")])]);
        let x = Term::fresh_var();
        assert!(run_clause(&mut m, fact, vec![x.clone()]));
        let got = m.env.resolve(&x);
        let c = got.as_functor("f", 1).unwrap();
        assert_eq!(m.env.resolve(&c.args[0]), Term::atom("a"));
    }

    #[test]
    fn test_list_head_match() {
        let mut m = Machine::new();
        // p([a, b])
        let fact =
            Term::compound("p", vec![Term::list(vec![Term::atom("a"), Term::atom("b")])]);
        assert!(run_clause(
            &mut m,
            fact.clone(),
            vec![Term::list(vec![Term::atom("a"), Term::atom("b")])]
        ));
        assert!(!run_clause(&mut m, fact, vec![Term::list(vec![Term::atom("a")])]));
    }

    #[test]
    fn test_partial_list_head_match() {
        let mut m = Machine::new();
        // p([H|T])
        let fact = Term::compound("p", vec![Term::cons(Term::fresh_var(), Term::fresh_var())]);
        assert!(run_clause(
            &mut m,
            fact.clone(),
            vec![Term::list(vec![Term::Integer(1), Term::Integer(2)])]
        ));
        assert!(!run_clause(&mut m, fact, vec![Term::nil()]));
    }
}
