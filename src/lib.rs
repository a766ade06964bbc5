pub mod engine;
pub mod reader;
pub mod writer;
/// Horn - An embeddable Prolog engine
///
/// This library provides an ISO-flavoured Prolog interpreter built around
/// four pieces of machinery:
///
/// 1. **Terms and unification** (`engine::term`, `engine::env`)
///    - Interned atoms, fresh-by-id variables, structural compounds
///    - Robinson unification with a trail and optional occurs check
///
/// 2. **Clause compilation** (`engine::clause`, `engine::opcodes`)
///    - `Head :- Body` compiles to bytecode over a per-clause xr table
///    - get instructions match the caller's arguments; put instructions
///      build the argument lists of body goals
///
/// 3. **Execution** (`engine::vm`, `engine::promise`)
///    - A register VM runs one clause activation at a time
///    - Nondeterminism is a lazy promise tree forced by an explicit-stack
///      trampoline: depth-first, cut prunes by choice-point identity,
///      exceptions unwind to `catch/3` guards
///
/// 4. **The machine** (`engine::Machine`)
///    - Procedure table, flags, operators, streams, builtin library
///    - `consult` loads programs, `query` iterates solutions lazily
///
/// # Example
///
/// ```rust
/// use horn::Machine;
///
/// let mut m = Machine::new();
/// m.consult("app([], L, L). app([H|T], L, [H|R]) :- app(T, L, R).").unwrap();
///
/// let mut count = 0;
/// for sol in m.query("app(X, Y, [1, 2, 3]).").unwrap() {
///     let sol = sol.unwrap();
///     println!("X = {}, Y = {}", sol.get("X").unwrap(), sol.get("Y").unwrap());
///     count += 1;
/// }
/// assert_eq!(count, 4);
/// ```
///
/// # Embedding native predicates
///
/// A native predicate receives the machine, its resolved arguments, and a
/// success continuation, and returns a promise:
///
/// ```rust
/// use horn::{Machine, Promise, Term};
///
/// let mut m = Machine::new();
/// m.register("host_pid", 1, |m, args, k| {
///     let pid = Term::Integer(std::process::id() as i64);
///     if m.env.unify(&args[0], &pid, false) {
///         Promise::defer(k)
///     } else {
///         Promise::bool(false)
///     }
/// });
/// assert!(m.query("host_pid(P), P > 0.").unwrap().next().unwrap().is_ok());
/// ```
pub use engine::exception::Exception;
pub use engine::promise::{Cont, Promise};
pub use engine::term::{Atom, Compound, ProcedureIndicator, Term};
pub use engine::{Bindings, DoubleQuotes, Flags, Machine, Procedure, Solutions, Unknown};
pub use writer::WriteOptions;
