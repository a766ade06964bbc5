//! Clause compilation
//!
//! A clause `Head :- Body` compiles to a straight-line bytecode program: get
//! instructions that consume the caller's argument list while matching the
//! head, then `Enter`, then put instructions and `Call`s that build each body
//! goal's argument list and dispatch it, ending in `Exit`. A top-level `;` in
//! the body yields one compiled clause per alternative, so the procedure's
//! clause list is the only source of disjunction the scheduler ever sees.
//!
//! External references (atoms, numbers, procedure indicators, list-length
//! markers) live in the per-clause xr table, deduplicated structurally and
//! addressed by dense operand indices.

use std::collections::HashMap;
use std::rc::Rc;

use super::env::Env;
use super::exception::{instantiation_error, type_error, Exception};
use super::opcodes::{Instruction, Opcode};
use super::term::{renamed_copy, survey_list, ListShape, ProcedureIndicator, Term, VarId};

/// An entry in the xr table.
#[derive(Clone, Debug, PartialEq)]
pub enum XrRef {
    /// An atomic constant: atom, integer, or float.
    Const(Term),
    /// A procedure indicator, for `GetFunctor`/`PutFunctor`/`Call`.
    Pi(ProcedureIndicator),
    /// A list length, for `GetList`/`GetPartial` and their put twins.
    Len(usize),
}

/// An immutable compiled clause. Cheap to clone; activations share the
/// bytecode and tables and allocate only fresh variables.
#[derive(Clone, Debug)]
pub struct Clause {
    pub pi: ProcedureIndicator,
    /// The source term, deep-copied at compile time (for `clause/2` and
    /// `retract/1`).
    pub raw: Term,
    pub xr: Rc<Vec<XrRef>>,
    /// Logical variable slots, in first-occurrence order. Procedure calls
    /// allocate a fresh variable per slot; query activation reuses these ids
    /// so the caller can read answer bindings.
    pub vars: Rc<Vec<VarId>>,
    pub code: Rc<[Instruction]>,
}

/// Compile a program term: a fact `H`, a rule `H :- B`, or a rule whose body
/// is a disjunction (one clause per alternative).
pub fn compile(t: &Term, env: &Env) -> Result<Vec<Clause>, Exception> {
    let t = env.resolve(t);
    let raw = renamed_copy(&t, env, &mut HashMap::new());
    if let Some(rule) = t.as_functor(":-", 2) {
        let head = &rule.args[0];
        let mut out = Vec::new();
        for branch in alternatives(&rule.args[1], env) {
            let mut c = compile_clause(head, Some(&branch), env)?;
            c.raw = raw.clone();
            out.push(c);
        }
        return Ok(out);
    }
    let mut c = compile_clause(&t, None, env)?;
    c.raw = raw;
    Ok(vec![c])
}

/// Compile a goal as a synthetic zero-arity clause. Used by `call/1`, the
/// top-level query loop, and directives; the goal's own variables become the
/// slot table so activating with them preserves caller bindings.
pub fn compile_goal(goal: &Term, env: &Env) -> Result<Clause, Exception> {
    let mut c = Compiler::default();
    c.body(goal, env)?;
    c.emit(Instruction::plain(Opcode::Exit));
    Ok(c.finish(ProcedureIndicator::new("$query", 0), env.resolve(goal)))
}

fn compile_clause(head: &Term, body: Option<&Term>, env: &Env) -> Result<Clause, Exception> {
    let mut c = Compiler::default();
    let pi = match env.resolve(head) {
        Term::Variable(_) => return Err(instantiation_error()),
        Term::Atom(name) => ProcedureIndicator::new(name, 0),
        Term::Compound(f) => {
            for arg in &f.args {
                c.arg(arg, env, Family::Get)?;
            }
            ProcedureIndicator { name: f.functor, arity: f.args.len() }
        }
        other => return Err(type_error("callable", other, env)),
    };
    if let Some(b) = body {
        c.body(b, env)?;
    }
    c.emit(Instruction::plain(Opcode::Exit));
    Ok(c.finish(pi, env.resolve(head)))
}

/// Split a body on top-level `;`, leaving if-then-else intact so `->/2`
/// keeps its committed-choice reading.
fn alternatives(t: &Term, env: &Env) -> Vec<Term> {
    let mut out = Vec::new();
    split_alt(&env.resolve(t), env, &mut out);
    out
}

fn split_alt(t: &Term, env: &Env, out: &mut Vec<Term>) {
    if let Some(d) = t.as_functor(";", 2) {
        let left = env.resolve(&d.args[0]);
        if left.as_functor("->", 2).is_none() {
            split_alt(&left, env, out);
            split_alt(&env.resolve(&d.args[1]), env, out);
            return;
        }
    }
    out.push(t.clone());
}

/// Flatten a conjunctive body into its goal sequence.
fn conjuncts(t: &Term, env: &Env, out: &mut Vec<Term>) {
    let t = env.resolve(t);
    if let Some(c) = t.as_functor(",", 2) {
        conjuncts(&c.args[0], env, out);
        conjuncts(&c.args[1], env, out);
        return;
    }
    out.push(t);
}

/// Which instruction family an argument compiles to.
#[derive(Clone, Copy, PartialEq)]
enum Family {
    Get,
    Put,
}

#[derive(Default)]
struct Compiler {
    code: Vec<Instruction>,
    xr: Vec<XrRef>,
    vars: Vec<VarId>,
}

impl Compiler {
    fn emit(&mut self, i: Instruction) {
        self.code.push(i);
    }

    fn xr_offset(&mut self, r: XrRef) -> u16 {
        if let Some(i) = self.xr.iter().position(|x| *x == r) {
            return i as u16;
        }
        self.xr.push(r);
        (self.xr.len() - 1) as u16
    }

    fn var_offset(&mut self, v: VarId) -> u16 {
        if let Some(i) = self.vars.iter().position(|x| *x == v) {
            return i as u16;
        }
        self.vars.push(v);
        (self.vars.len() - 1) as u16
    }

    fn arg(&mut self, a: &Term, env: &Env, fam: Family) -> Result<(), Exception> {
        let (o_const, o_var, o_functor, o_list, o_partial) = match fam {
            Family::Get => {
                (Opcode::GetConst, Opcode::GetVar, Opcode::GetFunctor, Opcode::GetList, Opcode::GetPartial)
            }
            Family::Put => {
                (Opcode::PutConst, Opcode::PutVar, Opcode::PutFunctor, Opcode::PutList, Opcode::PutPartial)
            }
        };
        match env.resolve(a) {
            Term::Variable(v) => {
                let slot = self.var_offset(v);
                self.emit(Instruction::new(o_var, slot));
            }
            t @ (Term::Atom(_) | Term::Integer(_) | Term::Float(_)) => {
                let x = self.xr_offset(XrRef::Const(t));
                self.emit(Instruction::new(o_const, x));
            }
            Term::Compound(f) => match survey_list(&Term::Compound(f.clone()), env) {
                ListShape::Proper(items) => {
                    let x = self.xr_offset(XrRef::Len(items.len()));
                    self.emit(Instruction::new(o_list, x));
                    for item in &items {
                        self.arg(item, env, fam)?;
                    }
                    self.emit(Instruction::plain(Opcode::Pop));
                }
                ListShape::Partial(items, tail) => {
                    let x = self.xr_offset(XrRef::Len(items.len()));
                    self.emit(Instruction::new(o_partial, x));
                    self.arg(&tail, env, fam)?;
                    for item in &items {
                        self.arg(item, env, fam)?;
                    }
                    self.emit(Instruction::plain(Opcode::Pop));
                }
                ListShape::Other => {
                    let pi = ProcedureIndicator { name: f.functor, arity: f.args.len() };
                    let x = self.xr_offset(XrRef::Pi(pi));
                    self.emit(Instruction::new(o_functor, x));
                    for arg in &f.args {
                        self.arg(arg, env, fam)?;
                    }
                    self.emit(Instruction::plain(Opcode::Pop));
                }
            },
        }
        Ok(())
    }

    fn body(&mut self, b: &Term, env: &Env) -> Result<(), Exception> {
        self.emit(Instruction::plain(Opcode::Enter));
        let mut goals = Vec::new();
        conjuncts(b, env, &mut goals);
        for goal in &goals {
            self.pred(goal, env)?;
        }
        Ok(())
    }

    fn pred(&mut self, goal: &Term, env: &Env) -> Result<(), Exception> {
        match env.resolve(goal) {
            // a bare variable goal is a metacall
            Term::Variable(_) => self.pred(&Term::compound("call", vec![goal.clone()]), env),
            Term::Atom(a) if a == "!" => {
                self.emit(Instruction::plain(Opcode::Cut));
                Ok(())
            }
            Term::Atom(a) => {
                let x = self.xr_offset(XrRef::Pi(ProcedureIndicator::new(a, 0)));
                self.emit(Instruction::new(Opcode::Call, x));
                Ok(())
            }
            Term::Compound(f) => {
                for arg in &f.args {
                    self.arg(arg, env, Family::Put)?;
                }
                let pi = ProcedureIndicator { name: f.functor, arity: f.args.len() };
                let x = self.xr_offset(XrRef::Pi(pi));
                self.emit(Instruction::new(Opcode::Call, x));
                Ok(())
            }
            other => Err(type_error("callable", other, env)),
        }
    }

    fn finish(self, pi: ProcedureIndicator, raw: Term) -> Clause {
        Clause {
            pi,
            raw,
            xr: Rc::new(self.xr),
            vars: Rc::new(self.vars),
            code: Rc::from(self.code),
        }
    }
}
