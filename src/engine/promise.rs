//! The nondeterminism core
//!
//! A [`Promise`] is a not-yet-forced piece of the search tree. Forcing is a
//! trampoline over an explicit stack of choice frames, never native
//! recursion, so search depth is bounded by the heap. Each choice frame
//! records a trail mark; taking the next alternative first rolls the
//! environment back to it, which is the whole of backtracking.
//!
//! Cut is pruning by identity: every frame carries a monotonically
//! increasing id, a clause activation pins its disjunction's id as the cut
//! barrier, and executing a cut discards every frame at least as young as
//! the barrier. Errors unwind through choice frames to the nearest guard
//! (`catch/3`) whose catcher unifies with the ball.
//!
//! A successful force returns with the frame stack intact; forcing again
//! behaves as if the delivered solution had failed, which is exactly how the
//! solutions iterator asks for more.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tracing::trace;

use super::env::Mark;
use super::exception::{resource_error, Exception};
use super::term::{renamed_copy, Term};
use super::Machine;

/// A deferred alternative: runs once, against the machine, at force time.
pub type Thunk = Box<dyn FnOnce(&mut Machine) -> Promise>;

/// A success continuation. Invoked on every solution of the goal it
/// follows, so it must be re-runnable.
pub type Cont = Rc<dyn Fn(&mut Machine) -> Promise>;

/// Identity of a choice point, used as a cut barrier.
pub type BarrierId = u64;

/// A node of the lazy search tree.
pub enum Promise {
    /// A settled outcome: success or failure.
    Done(bool),
    /// An exceptional outcome, short-circuiting to the nearest guard.
    Fault(Exception),
    /// Ordered alternatives, explored left to right. `id` is fixed when the
    /// choice point doubles as a cut barrier; otherwise assigned at push.
    Choice { id: Option<BarrierId>, alts: VecDeque<Thunk> },
    /// Prune every frame with id >= `barrier`, then continue with `inner`.
    Cut { barrier: BarrierId, inner: Thunk },
    /// Establish a `catch/3` guard around `inner`.
    Guard { catcher: Term, recovery: Term, cont: Cont, inner: Thunk },
}

impl Promise {
    /// An already-settled result.
    #[inline]
    pub fn bool(v: bool) -> Promise {
        Promise::Done(v)
    }

    /// An exceptional result.
    #[inline]
    pub fn error(e: Exception) -> Promise {
        Promise::Fault(e)
    }

    /// A single deferred alternative.
    pub fn delay(f: impl FnOnce(&mut Machine) -> Promise + 'static) -> Promise {
        Promise::Choice { id: None, alts: VecDeque::from([Box::new(f) as Thunk]) }
    }

    /// Ordered deferred alternatives.
    pub fn delay_all(thunks: Vec<Thunk>) -> Promise {
        Promise::Choice { id: None, alts: thunks.into() }
    }

    /// The builtin success path: hand over to the continuation at the next
    /// thunk boundary.
    pub fn defer(k: Cont) -> Promise {
        Promise::delay(move |m| k(m))
    }
}

enum Frame {
    Choice { id: BarrierId, mark: Mark, alts: VecDeque<Thunk> },
    Guard { id: BarrierId, mark: Mark, catcher: Term, recovery: Term, cont: Cont },
}

impl Frame {
    fn id(&self) -> BarrierId {
        match self {
            Frame::Choice { id, .. } | Frame::Guard { id, .. } => *id,
        }
    }
}

/// A resumable depth-first search over a promise tree.
pub struct Search {
    frames: Vec<Frame>,
    pending: Option<Promise>,
}

impl Search {
    pub fn new(root: Promise) -> Self {
        Search { frames: Vec::new(), pending: Some(root) }
    }

    /// Drive the search to its next success. `Ok(true)` leaves the frame
    /// stack in place so a later call continues behind the delivered
    /// solution; `Ok(false)` means the tree is exhausted.
    pub fn force(&mut self, m: &mut Machine) -> Result<bool, Exception> {
        let mut current = self.pending.take();
        loop {
            if m.interrupted() {
                return Err(resource_error("interrupt"));
            }
            let p = match current.take() {
                Some(p) => p,
                None => match self.backtrack(m) {
                    Some(p) => p,
                    None => return Ok(false),
                },
            };
            match p {
                Promise::Done(true) => return Ok(true),
                Promise::Done(false) => {}
                Promise::Fault(e) => current = Some(self.unwind(m, e)?),
                Promise::Choice { id, alts } => {
                    let id = id.unwrap_or_else(|| m.next_barrier());
                    self.frames.push(Frame::Choice { id, mark: m.env.mark(), alts });
                }
                Promise::Cut { barrier, inner } => {
                    let before = self.frames.len();
                    while self.frames.last().is_some_and(|f| f.id() >= barrier) {
                        self.frames.pop();
                    }
                    trace!(target: "horn::solve", pruned = before - self.frames.len(), "cut");
                    current = Some(inner(m));
                }
                Promise::Guard { catcher, recovery, cont, inner } => {
                    let id = m.next_barrier();
                    self.frames.push(Frame::Guard { id, mark: m.env.mark(), catcher, recovery, cont });
                    current = Some(inner(m));
                }
            }
        }
    }

    /// Roll back to the youngest frame that still has an alternative and
    /// run it. Exhausted frames and crossed guards are discarded.
    fn backtrack(&mut self, m: &mut Machine) -> Option<Promise> {
        loop {
            let next = match self.frames.last_mut()? {
                Frame::Choice { mark, alts, .. } => {
                    let mark = *mark;
                    alts.pop_front().map(|t| (mark, t))
                }
                Frame::Guard { .. } => None,
            };
            match next {
                Some((mark, t)) => {
                    m.env.undo_to(mark);
                    return Some(t(m));
                }
                None => {
                    self.frames.pop();
                }
            }
        }
    }

    /// Propagate a fault outward until a guard catches it. Bindings made by
    /// the guarded goal are undone before the catcher is tried; a guard
    /// whose catcher does not unify stays popped and the fault keeps going.
    fn unwind(&mut self, m: &mut Machine, e: Exception) -> Result<Promise, Exception> {
        while let Some(f) = self.frames.pop() {
            if let Frame::Guard { mark, catcher, recovery, cont, .. } = f {
                m.env.undo_to(mark);
                let ball = renamed_copy(e.term(), &m.env, &mut HashMap::new());
                if m.env.unify(&catcher, &ball, false) {
                    trace!(target: "horn::solve", ball = %ball, "caught");
                    return Ok(m.solve(&recovery, cont));
                }
            }
        }
        Err(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Machine;

    fn search(p: Promise) -> (Machine, Search) {
        (Machine::new(), Search::new(p))
    }

    #[test]
    fn test_settled_results() {
        let (mut m, mut s) = search(Promise::bool(true));
        assert_eq!(s.force(&mut m).unwrap(), true);
        let (mut m, mut s) = search(Promise::bool(false));
        assert_eq!(s.force(&mut m).unwrap(), false);
    }

    #[test]
    fn test_alternatives_left_to_right_and_resume() {
        let alts: Vec<Thunk> = vec![
            Box::new(|_: &mut Machine| Promise::bool(false)),
            Box::new(|_: &mut Machine| Promise::bool(true)),
            Box::new(|_: &mut Machine| Promise::bool(true)),
        ];
        let (mut m, mut s) = search(Promise::delay_all(alts));
        assert_eq!(s.force(&mut m).unwrap(), true);
        // resuming skips the delivered solution and finds the next
        assert_eq!(s.force(&mut m).unwrap(), true);
        assert_eq!(s.force(&mut m).unwrap(), false);
    }

    #[test]
    fn test_nested_choices_depth_first() {
        let inner = || {
            Promise::delay_all(vec![
                Box::new(|_: &mut Machine| Promise::bool(false)) as Thunk,
                Box::new(|_: &mut Machine| Promise::bool(true)),
            ])
        };
        let alts: Vec<Thunk> = vec![
            Box::new(move |_: &mut Machine| inner()),
            Box::new(|_: &mut Machine| Promise::bool(true)),
        ];
        let (mut m, mut s) = search(Promise::delay_all(alts));
        assert_eq!(s.force(&mut m).unwrap(), true);
        assert_eq!(s.force(&mut m).unwrap(), true);
        assert_eq!(s.force(&mut m).unwrap(), false);
    }

    #[test]
    fn test_cut_prunes_to_barrier() {
        // two sibling alternatives under a barrier; the first succeeds once
        // and cuts, so the second is never tried
        let mut m = Machine::new();
        let barrier = m.next_barrier();
        let alts: Vec<Thunk> = vec![
            Box::new(move |_: &mut Machine| Promise::Cut {
                barrier,
                inner: Box::new(|_| Promise::bool(true)),
            }),
            Box::new(|_: &mut Machine| Promise::bool(true)),
        ];
        let mut s = Search::new(Promise::Choice { id: Some(barrier), alts: alts.into() });
        assert_eq!(s.force(&mut m).unwrap(), true);
        assert_eq!(s.force(&mut m).unwrap(), false);
    }

    #[test]
    fn test_fault_propagates_without_alternatives() {
        let env = crate::engine::env::Env::new();
        let e = crate::engine::exception::type_error("integer", Term::atom("a"), &env);
        let alts: Vec<Thunk> = vec![
            Box::new(move |_: &mut Machine| Promise::error(e)),
            Box::new(|_: &mut Machine| Promise::bool(true)),
        ];
        let (mut m, mut s) = search(Promise::delay_all(alts));
        assert!(s.force(&mut m).is_err());
    }

    #[test]
    fn test_backtrack_restores_trail() {
        let x = Term::fresh_var();
        let x2 = x.clone();
        let alts: Vec<Thunk> = vec![
            Box::new(move |m: &mut Machine| {
                assert!(m.env.unify(&x2, &Term::Integer(1), false));
                Promise::bool(false)
            }),
            Box::new({
                let x = x.clone();
                move |m: &mut Machine| {
                    // first alternative's binding has been rolled back
                    assert_eq!(m.env.resolve(&x), x);
                    Promise::bool(true)
                }
            }),
        ];
        let (mut m, mut s) = search(Promise::delay_all(alts));
        assert_eq!(s.force(&mut m).unwrap(), true);
    }

    #[test]
    fn test_cancellation_between_thunks() {
        let (mut m, mut s) = search(Promise::delay(|_| Promise::bool(true)));
        m.interrupt_handle().store(true, std::sync::atomic::Ordering::Relaxed);
        let err = s.force(&mut m).unwrap_err();
        let c = err.term().as_functor("error", 2).unwrap();
        assert!(c.args[0].as_functor("resource_error", 1).is_some());
    }
}
