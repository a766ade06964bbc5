//! The resolution engine
//!
//! [`Machine`] owns everything a running Prolog program touches: the
//! procedure table, the binding environment, flags, operators, character
//! conversions, and the stream registry. Dispatch (`arrive`) turns a
//! procedure indicator plus argument list into a promise; the scheduler in
//! [`promise`] forces promises depth-first; the VM in [`vm`] executes
//! compiled clauses. The embedding surface is `new`/`register`/`consult`/
//! `query`.

pub mod builtins;
pub mod clause;
pub mod env;
pub mod exception;
pub mod opcodes;
pub mod ops;
pub mod promise;
pub mod streams;
pub mod term;
pub mod vm;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering as MemOrdering};
use std::sync::Arc;

use tracing::{debug, warn};

use self::clause::{compile, compile_goal, Clause};
use self::env::Env;
use self::exception::{existence_error, permission_error, system_error, Exception};
use self::ops::OperatorTable;
use self::promise::{BarrierId, Cont, Promise, Search, Thunk};
use self::streams::StreamRegistry;
use self::term::{renamed_copy, ProcedureIndicator, Term};
use self::vm::{exec, Registers};
use crate::reader::{self, ReadContext};

/// Policy for calls to undefined procedures (the `unknown` flag).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Unknown {
    Error,
    Warning,
    Fail,
}

impl Unknown {
    pub fn name(self) -> &'static str {
        match self {
            Unknown::Error => "error",
            Unknown::Warning => "warning",
            Unknown::Fail => "fail",
        }
    }
}

/// Interpretation of double-quoted strings (the `double_quotes` flag).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DoubleQuotes {
    Codes,
    Chars,
    Atom,
}

impl DoubleQuotes {
    pub fn name(self) -> &'static str {
        match self {
            DoubleQuotes::Codes => "codes",
            DoubleQuotes::Chars => "chars",
            DoubleQuotes::Atom => "atom",
        }
    }
}

/// The writable Prolog flags.
#[derive(Copy, Clone, Debug)]
pub struct Flags {
    pub unknown: Unknown,
    pub double_quotes: DoubleQuotes,
    pub char_conversion: bool,
    pub debug: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Flags {
            unknown: Unknown::Error,
            double_quotes: DoubleQuotes::Codes,
            char_conversion: false,
            debug: false,
        }
    }
}

/// A native predicate: resolved arguments plus a success continuation,
/// returning a promise.
pub type NativeFn = Rc<dyn Fn(&mut Machine, Vec<Term>, Cont) -> Promise>;

/// An entry in the procedure table.
#[derive(Clone)]
pub enum Procedure {
    /// User-defined, mutable via assert/retract.
    Dynamic(Vec<Clause>),
    /// Library clauses, compiled at load time; mutation is a permission
    /// error.
    Static(Vec<Clause>),
    /// A native predicate.
    Builtin(NativeFn),
}

/// One engine instance. Not `Sync`; a machine is a single-threaded
/// cooperative interpreter whose only externally touchable part is the
/// cancellation flag.
pub struct Machine {
    /// The binding environment. Public so native predicates can resolve and
    /// unify their arguments.
    pub env: Env,
    pub(crate) procedures: HashMap<ProcedureIndicator, Procedure>,
    pub(crate) operators: OperatorTable,
    pub(crate) flags: Flags,
    pub(crate) char_conversions: HashMap<char, char>,
    pub(crate) streams: StreamRegistry,
    interrupt: Arc<AtomicBool>,
    barrier_counter: u64,
}

impl Machine {
    /// A machine with the builtin predicates and the bootstrap library
    /// registered, and no user-defined procedures.
    pub fn new() -> Self {
        let mut m = Machine {
            env: Env::new(),
            procedures: HashMap::new(),
            operators: OperatorTable::core(),
            flags: Flags::default(),
            char_conversions: HashMap::new(),
            streams: StreamRegistry::new(),
            interrupt: Arc::new(AtomicBool::new(false)),
            barrier_counter: 0,
        };
        builtins::register_all(&mut m);
        m.load(builtins::BOOTSTRAP, true).expect("bootstrap library must load");
        m
    }

    /// Attach a native predicate under `name/arity`.
    pub fn register(
        &mut self,
        name: &str,
        arity: usize,
        native: impl Fn(&mut Machine, Vec<Term>, Cont) -> Promise + 'static,
    ) {
        self.procedures
            .insert(ProcedureIndicator::new(name, arity), Procedure::Builtin(Rc::new(native)));
    }

    /// The cancellation flag. Setting it makes the scheduler abort the
    /// current force with `resource_error(interrupt)` at the next thunk
    /// boundary; the embedder owns any clock behind it.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    pub(crate) fn interrupted(&self) -> bool {
        self.interrupt.load(MemOrdering::Relaxed)
    }

    /// A fresh choice-point identity. Monotone within the machine.
    pub(crate) fn next_barrier(&mut self) -> BarrierId {
        self.barrier_counter += 1;
        self.barrier_counter
    }

    /// Parse and load a program. Directives `:- G` run immediately; an
    /// uncaught directive error aborts consultation.
    pub fn consult(&mut self, source: &str) -> Result<(), Exception> {
        self.load(source, false)
    }

    fn load(&mut self, source: &str, static_mode: bool) -> Result<(), Exception> {
        let mut offset = 0;
        loop {
            let ctx = ReadContext {
                ops: &self.operators,
                double_quotes: self.flags.double_quotes,
                char_conversion: if self.flags.char_conversion {
                    Some(&self.char_conversions)
                } else {
                    None
                },
            };
            let read = match reader::read_term(source, offset, &ctx)? {
                Some(r) => r,
                None => return Ok(()),
            };
            offset = read.end;
            if let Some(d) = read.term.as_functor(":-", 1) {
                let goal = d.args[0].clone();
                self.run_directive(&goal)?;
                continue;
            }
            self.assert_clauses(&read.term, false, static_mode)?;
        }
    }

    fn run_directive(&mut self, goal: &Term) -> Result<(), Exception> {
        debug!(target: "horn::engine", goal = %goal, "directive");
        let k: Cont = Rc::new(|_| Promise::bool(true));
        let p = self.solve(goal, k);
        let mut search = Search::new(p);
        if !search.force(self)? {
            warn!(target: "horn::engine", goal = %goal, "directive failed");
        }
        Ok(())
    }

    /// Compile a program term and add its clauses to the database.
    /// `front` prepends (asserta); otherwise appends (assertz).
    pub(crate) fn assert_clauses(
        &mut self,
        t: &Term,
        front: bool,
        static_mode: bool,
    ) -> Result<(), Exception> {
        let cs = compile(t, &self.env)?;
        for (i, c) in cs.into_iter().enumerate() {
            let pi = c.pi;
            match self.procedures.entry(pi) {
                Entry::Vacant(e) => {
                    let p = if static_mode {
                        Procedure::Static(vec![c])
                    } else {
                        Procedure::Dynamic(vec![c])
                    };
                    e.insert(p);
                }
                Entry::Occupied(mut e) => match e.get_mut() {
                    Procedure::Dynamic(list) => {
                        if front {
                            // alternatives of one assertion keep their order
                            list.insert(i, c);
                        } else {
                            list.push(c);
                        }
                    }
                    Procedure::Static(list) if static_mode => list.push(c),
                    _ => {
                        return Err(permission_error(
                            "modify",
                            "static_procedure",
                            pi.term(),
                            &self.env,
                        ))
                    }
                },
            }
        }
        Ok(())
    }

    /// Procedure dispatch: look up `pi` and hand its alternatives to the
    /// scheduler. `args` is the already-built argument list term.
    pub(crate) fn arrive(&mut self, pi: ProcedureIndicator, args: Term, k: Cont) -> Promise {
        debug!(target: "horn::engine", pi = %pi, "call");
        let Some(proc) = self.procedures.get(&pi).cloned() else {
            return match self.flags.unknown {
                Unknown::Error => Promise::error(existence_error("procedure", pi.term(), &self.env)),
                Unknown::Warning => {
                    warn!(target: "horn::engine", pi = %pi, "unknown procedure");
                    Promise::bool(false)
                }
                Unknown::Fail => Promise::bool(false),
            };
        };
        match proc {
            Procedure::Dynamic(cs) | Procedure::Static(cs) => self.call_clauses(&cs, args, k),
            Procedure::Builtin(f) => match split_args(&args, pi.arity, &self.env) {
                Ok(list) => f(self, list, k),
                Err(e) => Promise::error(e),
            },
        }
    }

    /// Build one alternative per clause, in database order. Every thunk
    /// allocates fresh variables for its slots; the disjunction's identity
    /// is the cut barrier for all of them, so a cut inside one clause prunes
    /// exactly the sibling clauses of this call.
    pub(crate) fn call_clauses(&mut self, clauses: &[Clause], args: Term, k: Cont) -> Promise {
        let barrier = self.next_barrier();
        let mut alts: VecDeque<Thunk> = VecDeque::with_capacity(clauses.len());
        for (i, c) in clauses.iter().enumerate() {
            let c = c.clone();
            let args = args.clone();
            let k = k.clone();
            alts.push_back(Box::new(move |m: &mut Machine| {
                if i > 0 {
                    debug!(target: "horn::engine", pi = %c.pi, "redo");
                }
                let vars: Vec<Term> = (0..c.vars.len()).map(|_| Term::fresh_var()).collect();
                let pi = c.pi;
                let exit_k: Cont = Rc::new(move |m: &mut Machine| {
                    debug!(target: "horn::engine", pi = %pi, "exit");
                    k(m)
                });
                exec(
                    m,
                    Registers {
                        pc: 0,
                        code: c.code.clone(),
                        xr: c.xr.clone(),
                        vars: Rc::new(vars),
                        args: args.clone(),
                        astack: Term::nil(),
                        cont: exit_k,
                        cut_barrier: barrier,
                    },
                )
            }));
        }
        Promise::Choice { id: Some(barrier), alts }
    }

    /// Run an arbitrary goal term: compile it as a synthetic clause whose
    /// slots are the goal's own variables, under a fresh cut barrier (cut is
    /// local to the goal, as in `call/1`).
    pub(crate) fn solve(&mut self, goal: &Term, k: Cont) -> Promise {
        let c = match compile_goal(goal, &self.env) {
            Ok(c) => c,
            Err(e) => return Promise::error(e),
        };
        let barrier = self.next_barrier();
        let vars: Vec<Term> = c.vars.iter().map(|id| Term::Variable(*id)).collect();
        let thunk: Thunk = Box::new(move |m: &mut Machine| {
            exec(
                m,
                Registers {
                    pc: 0,
                    code: c.code.clone(),
                    xr: c.xr.clone(),
                    vars: Rc::new(vars),
                    args: Term::nil(),
                    astack: Term::nil(),
                    cont: k,
                    cut_barrier: barrier,
                },
            )
        });
        Promise::Choice { id: Some(barrier), alts: VecDeque::from([thunk]) }
    }

    /// Parse a goal and return its solutions iterator.
    pub fn query(&mut self, goal_text: &str) -> Result<Solutions<'_>, Exception> {
        let ctx = ReadContext {
            ops: &self.operators,
            double_quotes: self.flags.double_quotes,
            char_conversion: if self.flags.char_conversion {
                Some(&self.char_conversions)
            } else {
                None
            },
        };
        let read = reader::read_goal(goal_text, &ctx)?;
        let goal = read.term;
        let k: Cont = Rc::new(|_| Promise::bool(true));
        let p = self.solve(&goal, k);
        Ok(Solutions { machine: self, search: Search::new(p), vars: read.vars, done: false })
    }

    /// Render a term through the writer with this machine's operator table.
    pub fn format(&self, t: &Term) -> String {
        crate::writer::to_string(t, &self.env, crate::writer::WriteOptions::quoted(), Some(&self.operators))
    }
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

/// Split a built argument list into exactly `arity` terms.
fn split_args(args: &Term, arity: usize, env: &Env) -> Result<Vec<Term>, Exception> {
    let mut out = Vec::with_capacity(arity);
    let mut rest = env.resolve(args);
    for _ in 0..arity {
        let Some(c) = rest.as_functor(".", 2) else {
            return Err(system_error("wrong number of arguments"));
        };
        out.push(c.args[0].clone());
        rest = env.resolve(&c.args[1]);
    }
    if !rest.is_nil() {
        return Err(system_error("wrong number of arguments"));
    }
    Ok(out)
}

/// One solution's answer substitution, snapshotted from the environment.
#[derive(Clone, Debug)]
pub struct Bindings {
    pairs: Vec<(String, Term)>,
}

impl Bindings {
    /// The value of a named query variable.
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.pairs.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.pairs.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Lazy solutions of a query. Each `next` forces the search to its next
/// success; dropping the iterator abandons the remaining search.
pub struct Solutions<'m> {
    machine: &'m mut Machine,
    search: Search,
    vars: Vec<(String, Term)>,
    done: bool,
}

impl Iterator for Solutions<'_> {
    type Item = Result<Bindings, Exception>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.search.force(self.machine) {
            Ok(true) => {
                let mut map = HashMap::new();
                let pairs = self
                    .vars
                    .iter()
                    .map(|(name, var)| {
                        (name.clone(), renamed_copy(var, &self.machine.env, &mut map))
                    })
                    .collect();
                Some(Ok(Bindings { pairs }))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Resolve a stream-or-alias term to a stream id.
pub(crate) fn resolve_stream(m: &Machine, t: &Term) -> Result<u64, Exception> {
    match m.env.resolve(t) {
        Term::Variable(_) => Err(exception::instantiation_error()),
        Term::Atom(a) => match m.streams.by_alias(a) {
            Some(id) => Ok(id),
            None => Err(existence_error("stream", Term::Atom(a), &m.env)),
        },
        t => match streams::term_stream_id(&t) {
            Some(id) if m.streams.get(id).is_some() => Ok(id),
            Some(_) => Err(existence_error("stream", t, &m.env)),
            None => Err(exception::domain_error("stream_or_alias", t, &m.env)),
        },
    }
}
