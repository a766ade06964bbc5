//! Term representation
//!
//! Prolog terms form a tagged universe: variables, interned atoms, integers,
//! floats, and compound terms. Atoms are interned through lasso's
//! `ThreadedRodeo` so equality is an O(1) key comparison and every occurrence
//! of the same name shares one allocation. Variables carry nothing but a
//! globally unique id; their bindings live in the environment
//! ([`Env`](super::env::Env)), never in the term itself.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering as MemOrdering};
use std::sync::OnceLock;

use lasso::{Spur, ThreadedRodeo};

use super::env::Env;

/// Global interner for atom names - lazily initialized, thread-safe
static INTERNER: OnceLock<ThreadedRodeo> = OnceLock::new();

#[inline]
fn interner() -> &'static ThreadedRodeo {
    INTERNER.get_or_init(ThreadedRodeo::new)
}

/// Monotonic source of fresh variable identifiers
static VAR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A variable identifier. Equality is by id; ids are never reused.
pub type VarId = u64;

/// An interned atom - 4 bytes, O(1) comparison
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Atom(Spur);

impl Atom {
    /// Intern a name and return its atom (idempotent).
    #[inline]
    pub fn new(name: &str) -> Self {
        Atom(interner().get_or_intern(name))
    }

    /// The name this atom was interned from.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        interner().resolve(&self.0)
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({:?})", self.as_str())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Atom {
    #[inline]
    fn from(name: &str) -> Self {
        Atom::new(name)
    }
}

impl From<String> for Atom {
    #[inline]
    fn from(name: String) -> Self {
        Atom::new(&name)
    }
}

impl PartialEq<str> for Atom {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Atom {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// A compound term: a functor name applied to one or more arguments.
///
/// Shared behind `Rc` so that clause activation and term copying never
/// duplicate argument vectors they do not rewrite.
#[derive(Clone, Debug, PartialEq)]
pub struct Compound {
    pub functor: Atom,
    pub args: Vec<Term>,
}

/// A Prolog term.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Variable(VarId),
    Atom(Atom),
    Integer(i64),
    Float(f64),
    Compound(Rc<Compound>),
}

impl Term {
    /// Allocate a fresh, never-before-seen variable.
    #[inline]
    pub fn fresh_var() -> Term {
        Term::Variable(VAR_COUNTER.fetch_add(1, MemOrdering::Relaxed) + 1)
    }

    #[inline]
    pub fn atom(name: &str) -> Term {
        Term::Atom(Atom::new(name))
    }

    /// Build a compound term. An empty argument list degenerates to an atom.
    pub fn compound(functor: impl Into<Atom>, args: Vec<Term>) -> Term {
        let functor = functor.into();
        if args.is_empty() {
            Term::Atom(functor)
        } else {
            Term::Compound(Rc::new(Compound { functor, args }))
        }
    }

    /// The empty list atom `[]`.
    #[inline]
    pub fn nil() -> Term {
        Term::atom("[]")
    }

    /// The list cell `'.'(head, tail)`.
    #[inline]
    pub fn cons(head: Term, tail: Term) -> Term {
        Term::compound(".", vec![head, tail])
    }

    /// A proper list of the given elements.
    pub fn list(items: Vec<Term>) -> Term {
        Term::partial_list(Term::nil(), items)
    }

    /// A list of the given elements ending in `tail` instead of `[]`.
    pub fn partial_list(tail: Term, items: Vec<Term>) -> Term {
        let mut t = tail;
        for item in items.into_iter().rev() {
            t = Term::cons(item, t);
        }
        t
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Term::Atom(a) if *a == "[]")
    }

    pub fn as_atom(&self) -> Option<Atom> {
        match self {
            Term::Atom(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Term::Compound(c) => Some(c),
            _ => None,
        }
    }

    /// The compound view of `functor/arity`, if this term matches it.
    pub fn as_functor(&self, functor: &str, arity: usize) -> Option<&Compound> {
        match self {
            Term::Compound(c) if c.functor == *functor && c.args.len() == arity => Some(c),
            _ => None,
        }
    }
}

/// The pair `Name/Arity` identifying a predicate.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ProcedureIndicator {
    pub name: Atom,
    pub arity: usize,
}

impl ProcedureIndicator {
    pub fn new(name: impl Into<Atom>, arity: usize) -> Self {
        ProcedureIndicator { name: name.into(), arity }
    }

    /// The term `Name/Arity` used in error contexts and `current_predicate/1`.
    pub fn term(&self) -> Term {
        Term::compound("/", vec![Term::Atom(self.name), Term::Integer(self.arity as i64)])
    }
}

impl fmt::Display for ProcedureIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Structural shape of a `'.'/2` chain, as the clause compiler sees it.
pub enum ListShape {
    /// Ends in `[]`.
    Proper(Vec<Term>),
    /// Ends in an unbound variable: prefix plus the tail.
    Partial(Vec<Term>, Term),
    /// Not a list chain at all (including improper tails).
    Other,
}

/// Classify a term as a proper list, a partial list, or neither.
pub fn survey_list(t: &Term, env: &Env) -> ListShape {
    let mut items = Vec::new();
    let mut rest = env.resolve(t);
    loop {
        match rest {
            Term::Atom(a) if a == "[]" => {
                return if items.is_empty() { ListShape::Other } else { ListShape::Proper(items) }
            }
            Term::Variable(_) => {
                return if items.is_empty() { ListShape::Other } else { ListShape::Partial(items, rest) }
            }
            Term::Compound(ref c) if c.functor == "." && c.args.len() == 2 => {
                items.push(c.args[0].clone());
                rest = env.resolve(&c.args[1]);
            }
            _ => return ListShape::Other,
        }
    }
}

fn type_rank(t: &Term) -> u8 {
    match t {
        Term::Variable(_) => 0,
        Term::Integer(_) | Term::Float(_) => 1,
        Term::Atom(_) => 2,
        Term::Compound(_) => 3,
    }
}

/// Standard order of terms: `Var < Number < Atom < Compound`.
///
/// Variables order by identity; integers and floats mix by value with ties
/// broken integer-first; atoms order by name; compounds by arity, then
/// functor name, then argument-wise. Cyclic structures are bounded by
/// tracking visited compound pairs.
pub fn compare_terms(a: &Term, b: &Term, env: &Env) -> Ordering {
    let mut seen: Vec<(*const Compound, *const Compound)> = Vec::new();
    compare_rec(a, b, env, &mut seen)
}

fn compare_rec(
    a: &Term,
    b: &Term,
    env: &Env,
    seen: &mut Vec<(*const Compound, *const Compound)>,
) -> Ordering {
    let a = env.resolve(a);
    let b = env.resolve(b);
    let ranks = (type_rank(&a), type_rank(&b));
    if ranks.0 != ranks.1 {
        return ranks.0.cmp(&ranks.1);
    }
    match (&a, &b) {
        (Term::Variable(x), Term::Variable(y)) => x.cmp(y),
        (Term::Integer(x), Term::Integer(y)) => x.cmp(y),
        (Term::Float(x), Term::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Term::Integer(x), Term::Float(y)) => {
            match (*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal) {
                Ordering::Equal => Ordering::Less,
                ord => ord,
            }
        }
        (Term::Float(x), Term::Integer(y)) => {
            match x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal) {
                Ordering::Equal => Ordering::Greater,
                ord => ord,
            }
        }
        (Term::Atom(x), Term::Atom(y)) => x.as_str().cmp(y.as_str()),
        (Term::Compound(x), Term::Compound(y)) => {
            let pair = (Rc::as_ptr(x), Rc::as_ptr(y));
            if pair.0 == pair.1 || seen.contains(&pair) {
                return Ordering::Equal;
            }
            seen.push(pair);
            match x.args.len().cmp(&y.args.len()) {
                Ordering::Equal => {}
                ord => return ord,
            }
            match x.functor.as_str().cmp(y.functor.as_str()) {
                Ordering::Equal => {}
                ord => return ord,
            }
            for (xa, ya) in x.args.iter().zip(y.args.iter()) {
                match compare_rec(xa, ya, env, seen) {
                    Ordering::Equal => {}
                    ord => return ord,
                }
            }
            Ordering::Equal
        }
        _ => unreachable!("rank mismatch already handled"),
    }
}

/// A copy of `t` in which every unbound variable is renamed to a fresh one.
///
/// The renaming map is shared across calls so related terms (say, an error
/// ball and its context) keep their variable sharing. Revisiting a compound
/// already on the walk (a cyclic binding) yields a fresh variable so the
/// copy stays finite.
pub fn renamed_copy(t: &Term, env: &Env, map: &mut HashMap<VarId, Term>) -> Term {
    let mut visiting: Vec<*const Compound> = Vec::new();
    copy_rec(t, env, map, &mut visiting)
}

fn copy_rec(
    t: &Term,
    env: &Env,
    map: &mut HashMap<VarId, Term>,
    visiting: &mut Vec<*const Compound>,
) -> Term {
    match env.resolve(t) {
        Term::Variable(id) => map.entry(id).or_insert_with(Term::fresh_var).clone(),
        Term::Compound(c) => {
            let ptr = Rc::as_ptr(&c);
            if visiting.contains(&ptr) {
                return Term::fresh_var();
            }
            visiting.push(ptr);
            let args = c.args.iter().map(|a| copy_rec(a, env, map, visiting)).collect();
            visiting.pop();
            Term::Compound(Rc::new(Compound { functor: c.functor, args }))
        }
        other => other,
    }
}

/// The unbound variables of `t`, in first-encounter order, deduplicated.
pub fn term_variables(t: &Term, env: &Env) -> Vec<VarId> {
    let mut out = Vec::new();
    let mut visiting = Vec::new();
    collect_vars(t, env, &mut out, &mut visiting);
    out
}

fn collect_vars(t: &Term, env: &Env, out: &mut Vec<VarId>, visiting: &mut Vec<*const Compound>) {
    match env.resolve(t) {
        Term::Variable(id) => {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Term::Compound(c) => {
            let ptr = Rc::as_ptr(&c);
            if visiting.contains(&ptr) {
                return;
            }
            visiting.push(ptr);
            for a in &c.args {
                collect_vars(a, env, out, visiting);
            }
            visiting.pop();
        }
        _ => {}
    }
}

/// Whether `a` and `b` are structurally equal up to a bijective renaming of
/// their variables. Used to group aggregate solutions by witness value.
pub fn variant(a: &Term, b: &Term, env: &Env) -> bool {
    let mut fwd: HashMap<VarId, VarId> = HashMap::new();
    let mut bwd: HashMap<VarId, VarId> = HashMap::new();
    let mut seen: Vec<(*const Compound, *const Compound)> = Vec::new();
    variant_rec(a, b, env, &mut fwd, &mut bwd, &mut seen)
}

fn variant_rec(
    a: &Term,
    b: &Term,
    env: &Env,
    fwd: &mut HashMap<VarId, VarId>,
    bwd: &mut HashMap<VarId, VarId>,
    seen: &mut Vec<(*const Compound, *const Compound)>,
) -> bool {
    match (env.resolve(a), env.resolve(b)) {
        (Term::Variable(x), Term::Variable(y)) => {
            let f = *fwd.entry(x).or_insert(y);
            let g = *bwd.entry(y).or_insert(x);
            f == y && g == x
        }
        (Term::Atom(x), Term::Atom(y)) => x == y,
        (Term::Integer(x), Term::Integer(y)) => x == y,
        (Term::Float(x), Term::Float(y)) => x == y,
        (Term::Compound(x), Term::Compound(y)) => {
            let pair = (Rc::as_ptr(&x), Rc::as_ptr(&y));
            if seen.contains(&pair) {
                return true;
            }
            seen.push(pair);
            x.functor == y.functor
                && x.args.len() == y.args.len()
                && x.args.iter().zip(y.args.iter()).all(|(p, q)| variant_rec(p, q, env, fwd, bwd, seen))
        }
        _ => false,
    }
}

impl fmt::Display for Term {
    /// Canonical, operator-unaware rendering with list sugar. The writer
    /// module handles operator notation and quoting.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(id) => write!(f, "_G{}", id),
            Term::Atom(a) => write!(f, "{}", a),
            Term::Integer(i) => write!(f, "{}", i),
            Term::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Term::Compound(c) if c.functor == "." && c.args.len() == 2 => {
                write!(f, "[{}", c.args[0])?;
                let mut tail = &c.args[1];
                loop {
                    match tail {
                        Term::Atom(a) if *a == "[]" => break,
                        Term::Compound(n) if n.functor == "." && n.args.len() == 2 => {
                            write!(f, ",{}", n.args[0])?;
                            tail = &n.args[1];
                        }
                        other => {
                            write!(f, "|{}", other)?;
                            break;
                        }
                    }
                }
                write!(f, "]")
            }
            Term::Compound(c) => {
                write!(f, "{}(", c.functor)?;
                for (i, a) in c.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
        }
    }
}
