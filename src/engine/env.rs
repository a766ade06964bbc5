//! Binding environment and unification
//!
//! The environment is the single source of truth for variable bindings: a
//! mutable map from variable id to term plus a trail of bind records. The
//! scheduler takes a trail mark when it creates a choice point and rolls
//! back to it before trying the next alternative, so rollback is O(bindings
//! since the mark) and bindings themselves are single-assignment.

use std::collections::HashMap;
use std::rc::Rc;

use smallvec::SmallVec;

use super::term::{Compound, Term, VarId};

/// A trail position. Everything bound after a mark can be undone by it.
pub type Mark = usize;

/// The substitution: variable bindings plus the undo trail.
#[derive(Debug, Default)]
pub struct Env {
    bindings: HashMap<VarId, Term>,
    trail: Vec<VarId>,
}

impl Env {
    pub fn new() -> Self {
        Env::default()
    }

    /// Current trail position, for later rollback.
    #[inline]
    pub fn mark(&self) -> Mark {
        self.trail.len()
    }

    /// Undo every binding made since `mark`.
    pub fn undo_to(&mut self, mark: Mark) {
        while self.trail.len() > mark {
            let v = self.trail.pop().unwrap();
            self.bindings.remove(&v);
        }
    }

    /// Bind an unbound variable and record it on the trail.
    #[inline]
    pub fn bind(&mut self, v: VarId, t: Term) {
        debug_assert!(!self.bindings.contains_key(&v), "rebinding variable _G{}", v);
        self.bindings.insert(v, t);
        self.trail.push(v);
    }

    #[inline]
    pub fn is_bound(&self, v: VarId) -> bool {
        self.bindings.contains_key(&v)
    }

    /// Walk the binding chain of `t` until a non-variable or an unbound
    /// variable. Arguments of compounds are left unresolved (triangular
    /// substitution); callers resolve as they descend.
    pub fn resolve(&self, t: &Term) -> Term {
        let mut cur = t;
        loop {
            match cur {
                Term::Variable(v) => match self.bindings.get(v) {
                    Some(next) => cur = next,
                    None => return cur.clone(),
                },
                _ => return cur.clone(),
            }
        }
    }

    /// Robinson unification over the current environment.
    ///
    /// On success the bindings make `resolve(a)` and `resolve(b)`
    /// structurally equal. On failure every binding made by this call has
    /// been rolled back.
    pub fn unify(&mut self, a: &Term, b: &Term, occurs_check: bool) -> bool {
        let mark = self.mark();
        let mut work: SmallVec<[(Term, Term); 16]> = SmallVec::new();
        work.push((a.clone(), b.clone()));
        while let Some((x, y)) = work.pop() {
            let x = self.resolve(&x);
            let y = self.resolve(&y);
            match (x, y) {
                (Term::Variable(v), Term::Variable(w)) if v == w => {}
                (Term::Variable(v), t) | (t, Term::Variable(v)) => {
                    if occurs_check && self.occurs(v, &t) {
                        self.undo_to(mark);
                        return false;
                    }
                    self.bind(v, t);
                }
                (Term::Atom(p), Term::Atom(q)) => {
                    if p != q {
                        self.undo_to(mark);
                        return false;
                    }
                }
                (Term::Integer(p), Term::Integer(q)) => {
                    if p != q {
                        self.undo_to(mark);
                        return false;
                    }
                }
                (Term::Float(p), Term::Float(q)) => {
                    if p != q {
                        self.undo_to(mark);
                        return false;
                    }
                }
                (Term::Compound(p), Term::Compound(q)) => {
                    if p.functor != q.functor || p.args.len() != q.args.len() {
                        self.undo_to(mark);
                        return false;
                    }
                    for (pa, qa) in p.args.iter().zip(q.args.iter()) {
                        work.push((pa.clone(), qa.clone()));
                    }
                }
                _ => {
                    self.undo_to(mark);
                    return false;
                }
            }
        }
        true
    }

    /// Does `v` occur in the resolved structure of `t`?
    fn occurs(&self, v: VarId, t: &Term) -> bool {
        let mut visiting: Vec<*const Compound> = Vec::new();
        self.occurs_rec(v, t, &mut visiting)
    }

    fn occurs_rec(&self, v: VarId, t: &Term, visiting: &mut Vec<*const Compound>) -> bool {
        match self.resolve(t) {
            Term::Variable(w) => v == w,
            Term::Compound(c) => {
                let ptr = Rc::as_ptr(&c);
                if visiting.contains(&ptr) {
                    return false;
                }
                visiting.push(ptr);
                let hit = c.args.iter().any(|a| self.occurs_rec(v, a, visiting));
                visiting.pop();
                hit
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var() -> (Term, VarId) {
        match Term::fresh_var() {
            Term::Variable(id) => (Term::Variable(id), id),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_bind_and_resolve_chain() {
        let mut env = Env::new();
        let (x, xi) = var();
        let (y, yi) = var();
        env.bind(xi, y.clone());
        env.bind(yi, Term::Integer(7));
        assert_eq!(env.resolve(&x), Term::Integer(7));
    }

    #[test]
    fn test_rollback_restores_mark_state() {
        let mut env = Env::new();
        let (x, xi) = var();
        let (y, yi) = var();
        env.bind(xi, Term::atom("kept"));
        let mark = env.mark();
        env.bind(yi, Term::atom("dropped"));
        env.undo_to(mark);
        assert_eq!(env.resolve(&x), Term::atom("kept"));
        assert_eq!(env.resolve(&y), y);
    }

    #[test]
    fn test_unify_binds_both_directions() {
        let mut env = Env::new();
        let (x, _) = var();
        assert!(env.unify(&x, &Term::Integer(3), false));
        assert_eq!(env.resolve(&x), Term::Integer(3));
        let (y, _) = var();
        assert!(env.unify(&Term::atom("a"), &y, false));
        assert_eq!(env.resolve(&y), Term::atom("a"));
    }

    #[test]
    fn test_unify_compound_failure_rolls_back() {
        let mut env = Env::new();
        let (x, _) = var();
        let (y, _) = var();
        let a = Term::compound("f", vec![x.clone(), Term::atom("b")]);
        let b = Term::compound("f", vec![Term::Integer(1), Term::atom("c")]);
        let mark = env.mark();
        assert!(!env.unify(&a, &b, false));
        assert_eq!(env.mark(), mark);
        assert_eq!(env.resolve(&x), x);
        assert_eq!(env.resolve(&y), y);
    }

    #[test]
    fn test_integers_and_floats_do_not_unify() {
        let mut env = Env::new();
        assert!(!env.unify(&Term::Integer(1), &Term::Float(1.0), false));
    }

    #[test]
    fn test_occurs_check() {
        let mut env = Env::new();
        let (x, _) = var();
        let fx = Term::compound("f", vec![x.clone()]);
        assert!(!env.unify(&x, &fx, true));
        // without the check the rational binding is permitted
        assert!(env.unify(&x, &fx, false));
    }

    #[test]
    fn test_unify_shared_structure() {
        let mut env = Env::new();
        let (x, _) = var();
        let (y, _) = var();
        let a = Term::compound("p", vec![x.clone(), x.clone()]);
        let b = Term::compound("p", vec![y.clone(), Term::Integer(9)]);
        assert!(env.unify(&a, &b, false));
        assert_eq!(env.resolve(&x), Term::Integer(9));
        assert_eq!(env.resolve(&y), Term::Integer(9));
    }
}
