//! Term output
//!
//! Operator-aware term writing with the ISO option set that matters to the
//! engine: `quoted`, `ignore_ops`, and `numbervars`. Arguments are written
//! under the maximum priority their position allows, inserting parentheses
//! exactly when an operator's priority exceeds it. Cyclic structures (legal
//! under unification without occurs check) are bounded by tracking the
//! compounds on the current path.

use std::rc::Rc;

use crate::engine::env::Env;
use crate::engine::ops::OperatorTable;
use crate::engine::term::{Atom, Compound, Term};

/// Options for one write.
#[derive(Copy, Clone, Debug, Default)]
pub struct WriteOptions {
    pub quoted: bool,
    pub ignore_ops: bool,
    pub numbervars: bool,
}

impl WriteOptions {
    /// The `writeq/1` option set.
    pub fn quoted() -> Self {
        WriteOptions { quoted: true, ignore_ops: false, numbervars: true }
    }

    /// The `write_canonical/1` option set.
    pub fn canonical() -> Self {
        WriteOptions { quoted: true, ignore_ops: true, numbervars: false }
    }
}

/// Render a term to a string.
pub fn to_string(t: &Term, env: &Env, opts: WriteOptions, ops: Option<&OperatorTable>) -> String {
    let mut out = String::new();
    let mut visiting = Vec::new();
    write_term(&mut out, t, env, opts, ops, 1200, &mut visiting);
    out
}

fn write_term(
    out: &mut String,
    t: &Term,
    env: &Env,
    opts: WriteOptions,
    ops: Option<&OperatorTable>,
    max_priority: u16,
    visiting: &mut Vec<*const Compound>,
) {
    match env.resolve(t) {
        Term::Variable(id) => {
            out.push_str("_G");
            out.push_str(&id.to_string());
        }
        Term::Atom(a) => write_atom(out, a, opts),
        Term::Integer(i) => out.push_str(&i.to_string()),
        Term::Float(f) => write_float(out, f),
        Term::Compound(c) => {
            let ptr = Rc::as_ptr(&c);
            if visiting.contains(&ptr) {
                out.push_str("...");
                return;
            }
            visiting.push(ptr);
            write_compound(out, &c, env, opts, ops, max_priority, visiting);
            visiting.pop();
        }
    }
}

fn write_compound(
    out: &mut String,
    c: &Compound,
    env: &Env,
    opts: WriteOptions,
    ops: Option<&OperatorTable>,
    max_priority: u16,
    visiting: &mut Vec<*const Compound>,
) {
    // '$VAR'(N) as a variable name under numbervars
    if opts.numbervars && c.functor == "$VAR" && c.args.len() == 1 {
        if let Term::Integer(n) = env.resolve(&c.args[0]) {
            if n >= 0 {
                let letter = (b'A' + (n % 26) as u8) as char;
                out.push(letter);
                if n >= 26 {
                    out.push_str(&(n / 26).to_string());
                }
                return;
            }
        }
    }

    // list notation
    if c.functor == "." && c.args.len() == 2 {
        out.push('[');
        write_term(out, &c.args[0], env, opts, ops, 999, visiting);
        let mut tail = env.resolve(&c.args[1]);
        loop {
            match tail {
                Term::Atom(a) if a == "[]" => break,
                Term::Compound(ref next) if next.functor == "." && next.args.len() == 2 => {
                    let ptr = Rc::as_ptr(next);
                    if visiting.contains(&ptr) {
                        out.push('|');
                        out.push_str("...");
                        break;
                    }
                    visiting.push(ptr);
                    out.push(',');
                    write_term(out, &next.args[0], env, opts, ops, 999, visiting);
                    let t = env.resolve(&next.args[1]);
                    visiting.pop();
                    tail = t;
                }
                other => {
                    out.push('|');
                    write_term(out, &other, env, opts, ops, 999, visiting);
                    break;
                }
            }
        }
        out.push(']');
        return;
    }

    // curly notation
    if c.functor == "{}" && c.args.len() == 1 && !opts.ignore_ops {
        out.push('{');
        write_term(out, &c.args[0], env, opts, ops, 1200, visiting);
        out.push('}');
        return;
    }

    // operator notation
    if !opts.ignore_ops {
        if let Some(table) = ops {
            if c.args.len() == 2 {
                if let Some(def) = table.infix(c.functor) {
                    let parens = def.priority > max_priority;
                    if parens {
                        out.push('(');
                    }
                    write_term(out, &c.args[0], env, opts, ops, def.left_max(), visiting);
                    write_infix_name(out, c.functor, opts);
                    write_term(out, &c.args[1], env, opts, ops, def.right_max(), visiting);
                    if parens {
                        out.push(')');
                    }
                    return;
                }
            }
            if c.args.len() == 1 {
                if let Some(def) = table.prefix(c.functor) {
                    let parens = def.priority > max_priority;
                    if parens {
                        out.push('(');
                    }
                    write_atom(out, c.functor, opts);
                    if needs_space_after(c.functor, &env.resolve(&c.args[0])) {
                        out.push(' ');
                    }
                    write_term(out, &c.args[0], env, opts, ops, def.right_max(), visiting);
                    if parens {
                        out.push(')');
                    }
                    return;
                }
                if let Some(def) = table.postfix(c.functor) {
                    let parens = def.priority > max_priority;
                    if parens {
                        out.push('(');
                    }
                    write_term(out, &c.args[0], env, opts, ops, def.left_max(), visiting);
                    write_atom(out, c.functor, opts);
                    if parens {
                        out.push(')');
                    }
                    return;
                }
            }
        }
    }

    // canonical notation
    write_atom(out, c.functor, opts);
    out.push('(');
    for (i, a) in c.args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_term(out, a, env, opts, ops, 999, visiting);
    }
    out.push(')');
}

fn write_infix_name(out: &mut String, name: Atom, opts: WriteOptions) {
    let s = name.as_str();
    if s == "," {
        out.push(',');
        return;
    }
    // alphabetic operators need separating layout; symbolic ones do not
    if s.chars().next().is_some_and(|c| c.is_alphabetic()) {
        out.push(' ');
        write_atom(out, name, opts);
        out.push(' ');
    } else {
        write_atom(out, name, opts);
    }
}

/// A prefix operator needs a space when gluing it to its argument would
/// produce one token (`- 1` vs `-1`, `\+ a` vs `\+a`).
fn needs_space_after(name: Atom, arg: &Term) -> bool {
    let s = name.as_str();
    if s.chars().next().is_some_and(|c| c.is_alphabetic()) {
        return true;
    }
    matches!(arg, Term::Integer(_) | Term::Float(_))
        || matches!(arg, Term::Atom(a) if starts_symbolic(a.as_str()))
        || matches!(arg, Term::Compound(c) if starts_symbolic(c.functor.as_str()))
}

fn starts_symbolic(s: &str) -> bool {
    s.chars().next().is_some_and(is_symbol_char)
}

fn write_float(out: &mut String, f: f64) {
    if f.fract() == 0.0 && f.is_finite() && f.abs() < 1e15 {
        out.push_str(&format!("{:.1}", f));
    } else {
        out.push_str(&f.to_string());
    }
}

fn write_atom(out: &mut String, a: Atom, opts: WriteOptions) {
    let s = a.as_str();
    if !opts.quoted || !needs_quotes(s) {
        out.push_str(s);
        return;
    }
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

pub(crate) fn is_symbol_char(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '\\' | '^' | '<' | '>' | '=' | '~' | ':' | '.' | '?' | '@' | '#' | '&' | '$'
    )
}

fn needs_quotes(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    // solo atoms that read back as themselves
    if matches!(s, "[]" | "{}" | "!" | ";") {
        return false;
    }
    let mut chars = s.chars();
    let first = chars.next().unwrap();
    if first.is_lowercase() && first.is_alphabetic() {
        return !s.chars().all(|c| c.is_alphanumeric() || c == '_');
    }
    if s.chars().all(is_symbol_char) {
        return false;
    }
    true
}
