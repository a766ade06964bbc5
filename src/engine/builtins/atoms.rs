//! Atom and number text predicates
//!
//! `atom_concat/3` and `sub_atom/5` enumerate their splits as scheduler
//! alternatives, so backtracking walks every decomposition in left-to-right
//! order. Character and code list conversions check element shape eagerly
//! and raise the ISO errors for holes and bad characters.

use super::super::exception::{
    domain_error, instantiation_error, representation_error, syntax_error, type_error,
};
use super::super::promise::{Promise, Thunk};
use super::super::term::Term;
use super::super::Machine;
use super::{proper_list, unify_cont};

pub(super) fn register(m: &mut Machine) {
    m.register("atom_length", 2, |m, args, k| {
        let a = match m.env.resolve(&args[0]) {
            Term::Variable(_) => return Promise::error(instantiation_error()),
            Term::Atom(a) => a,
            other => return Promise::error(type_error("atom", other, &m.env)),
        };
        match m.env.resolve(&args[1]) {
            Term::Variable(_) => {}
            Term::Integer(n) if n < 0 => {
                return Promise::error(domain_error("not_less_than_zero", Term::Integer(n), &m.env))
            }
            Term::Integer(_) => {}
            other => return Promise::error(type_error("integer", other, &m.env)),
        }
        let len = a.as_str().chars().count() as i64;
        unify_cont(m, &args[1], &Term::Integer(len), k)
    });

    m.register("atom_concat", 3, |m, args, k| {
        let whole = m.env.resolve(&args[2]);
        match whole {
            Term::Atom(a3) => {
                for t in [&args[0], &args[1]] {
                    match m.env.resolve(t) {
                        Term::Variable(_) | Term::Atom(_) => {}
                        other => return Promise::error(type_error("atom", other, &m.env)),
                    }
                }
                let s: Vec<char> = a3.as_str().chars().collect();
                let mut alts: Vec<Thunk> = Vec::with_capacity(s.len() + 1);
                for i in 0..=s.len() {
                    let left: String = s[..i].iter().collect();
                    let right: String = s[i..].iter().collect();
                    let a = args[0].clone();
                    let b = args[1].clone();
                    let k = k.clone();
                    alts.push(Box::new(move |m: &mut Machine| {
                        let pair = Term::compound("-", vec![a.clone(), b.clone()]);
                        let split = Term::compound(
                            "-",
                            vec![Term::atom(&left), Term::atom(&right)],
                        );
                        unify_cont(m, &pair, &split, k.clone())
                    }));
                }
                Promise::delay_all(alts)
            }
            Term::Variable(_) => {
                let a1 = match m.env.resolve(&args[0]) {
                    Term::Variable(_) => return Promise::error(instantiation_error()),
                    Term::Atom(a) => a,
                    other => return Promise::error(type_error("atom", other, &m.env)),
                };
                let a2 = match m.env.resolve(&args[1]) {
                    Term::Variable(_) => return Promise::error(instantiation_error()),
                    Term::Atom(a) => a,
                    other => return Promise::error(type_error("atom", other, &m.env)),
                };
                let joined = format!("{}{}", a1, a2);
                unify_cont(m, &args[2], &Term::atom(&joined), k)
            }
            other => Promise::error(type_error("atom", other, &m.env)),
        }
    });

    m.register("sub_atom", 5, |m, args, k| {
        let whole = match m.env.resolve(&args[0]) {
            Term::Variable(_) => return Promise::error(instantiation_error()),
            Term::Atom(a) => a,
            other => return Promise::error(type_error("atom", other, &m.env)),
        };
        for t in &args[1..4] {
            match m.env.resolve(t) {
                Term::Variable(_) => {}
                Term::Integer(n) if n < 0 => {
                    return Promise::error(domain_error(
                        "not_less_than_zero",
                        Term::Integer(n),
                        &m.env,
                    ))
                }
                Term::Integer(_) => {}
                other => return Promise::error(type_error("integer", other, &m.env)),
            }
        }
        match m.env.resolve(&args[4]) {
            Term::Variable(_) | Term::Atom(_) => {}
            other => return Promise::error(type_error("atom", other, &m.env)),
        }
        let chars: Vec<char> = whole.as_str().chars().collect();
        let n = chars.len();
        let mut alts: Vec<Thunk> = Vec::new();
        for i in 0..=n {
            for j in i..=n {
                let sub: String = chars[i..j].iter().collect();
                let shape = Term::list(vec![
                    Term::Integer(i as i64),
                    Term::Integer((j - i) as i64),
                    Term::Integer((n - j) as i64),
                    Term::atom(&sub),
                ]);
                let want = Term::list(vec![
                    args[1].clone(),
                    args[2].clone(),
                    args[3].clone(),
                    args[4].clone(),
                ]);
                let k = k.clone();
                alts.push(Box::new(move |m: &mut Machine| {
                    unify_cont(m, &want, &shape, k.clone())
                }));
            }
        }
        Promise::delay_all(alts)
    });

    m.register("atom_chars", 2, |m, args, k| {
        match m.env.resolve(&args[0]) {
            Term::Variable(_) => {
                let items = match proper_list(&args[1], &m.env) {
                    Ok(v) => v,
                    Err(e) => return Promise::error(e),
                };
                let mut s = String::new();
                for item in &items {
                    match m.env.resolve(item) {
                        Term::Variable(_) => return Promise::error(instantiation_error()),
                        Term::Atom(a) if a.as_str().chars().count() == 1 => {
                            s.push(a.as_str().chars().next().unwrap())
                        }
                        other => {
                            return Promise::error(type_error("character", other, &m.env))
                        }
                    }
                }
                unify_cont(m, &args[0], &Term::atom(&s), k)
            }
            a => {
                let text = atomic_text(&a, m);
                let text = match text {
                    Ok(t) => t,
                    Err(e) => return Promise::error(e),
                };
                let lst = Term::list(
                    text.chars().map(|c| Term::atom(&c.to_string())).collect(),
                );
                unify_cont(m, &args[1], &lst, k)
            }
        }
    });

    m.register("atom_codes", 2, |m, args, k| {
        match m.env.resolve(&args[0]) {
            Term::Variable(_) => {
                let items = match proper_list(&args[1], &m.env) {
                    Ok(v) => v,
                    Err(e) => return Promise::error(e),
                };
                let mut s = String::new();
                for item in &items {
                    match m.env.resolve(item) {
                        Term::Variable(_) => return Promise::error(instantiation_error()),
                        Term::Integer(c) => match u32::try_from(c).ok().and_then(char::from_u32) {
                            Some(ch) => s.push(ch),
                            None => return Promise::error(representation_error("character_code")),
                        },
                        other => return Promise::error(type_error("integer", other, &m.env)),
                    }
                }
                unify_cont(m, &args[0], &Term::atom(&s), k)
            }
            a => {
                let text = match atomic_text(&a, m) {
                    Ok(t) => t,
                    Err(e) => return Promise::error(e),
                };
                let lst =
                    Term::list(text.chars().map(|c| Term::Integer(c as i64)).collect());
                unify_cont(m, &args[1], &lst, k)
            }
        }
    });

    m.register("char_code", 2, |m, args, k| {
        match m.env.resolve(&args[0]) {
            Term::Atom(a) if a.as_str().chars().count() == 1 => {
                let code = a.as_str().chars().next().unwrap() as i64;
                unify_cont(m, &args[1], &Term::Integer(code), k)
            }
            Term::Variable(_) => match m.env.resolve(&args[1]) {
                Term::Variable(_) => Promise::error(instantiation_error()),
                Term::Integer(c) => match u32::try_from(c).ok().and_then(char::from_u32) {
                    Some(ch) => unify_cont(m, &args[0], &Term::atom(&ch.to_string()), k),
                    None => Promise::error(representation_error("character_code")),
                },
                other => Promise::error(type_error("integer", other, &m.env)),
            },
            other => Promise::error(type_error("character", other, &m.env)),
        }
    });

    m.register("number_chars", 2, |m, args, k| {
        match m.env.resolve(&args[0]) {
            Term::Variable(_) => {
                let items = match proper_list(&args[1], &m.env) {
                    Ok(v) => v,
                    Err(e) => return Promise::error(e),
                };
                let mut s = String::new();
                for item in &items {
                    match m.env.resolve(item) {
                        Term::Variable(_) => return Promise::error(instantiation_error()),
                        Term::Atom(a) if a.as_str().chars().count() == 1 => {
                            s.push(a.as_str().chars().next().unwrap())
                        }
                        other => {
                            return Promise::error(type_error("character", other, &m.env))
                        }
                    }
                }
                match crate::reader::parse_number_text(&s) {
                    Some(n) => unify_cont(m, &args[0], &n, k),
                    None => Promise::error(syntax_error("illegal_number")),
                }
            }
            n @ (Term::Integer(_) | Term::Float(_)) => {
                let text = n.to_string();
                let lst = Term::list(
                    text.chars().map(|c| Term::atom(&c.to_string())).collect(),
                );
                unify_cont(m, &args[1], &lst, k)
            }
            other => Promise::error(type_error("number", other, &m.env)),
        }
    });

    m.register("number_codes", 2, |m, args, k| {
        match m.env.resolve(&args[0]) {
            Term::Variable(_) => {
                let items = match proper_list(&args[1], &m.env) {
                    Ok(v) => v,
                    Err(e) => return Promise::error(e),
                };
                let mut s = String::new();
                for item in &items {
                    match m.env.resolve(item) {
                        Term::Variable(_) => return Promise::error(instantiation_error()),
                        Term::Integer(c) => match u32::try_from(c).ok().and_then(char::from_u32) {
                            Some(ch) => s.push(ch),
                            None => return Promise::error(representation_error("character_code")),
                        },
                        other => return Promise::error(type_error("integer", other, &m.env)),
                    }
                }
                match crate::reader::parse_number_text(&s) {
                    Some(n) => unify_cont(m, &args[0], &n, k),
                    None => Promise::error(syntax_error("illegal_number")),
                }
            }
            n @ (Term::Integer(_) | Term::Float(_)) => {
                let text = n.to_string();
                let lst =
                    Term::list(text.chars().map(|c| Term::Integer(c as i64)).collect());
                unify_cont(m, &args[1], &lst, k)
            }
            other => Promise::error(type_error("number", other, &m.env)),
        }
    });

    m.register("atom_number", 2, |m, args, k| {
        match m.env.resolve(&args[0]) {
            Term::Atom(a) => match crate::reader::parse_number_text(a.as_str()) {
                Some(n) => unify_cont(m, &args[1], &n, k),
                None => Promise::bool(false),
            },
            Term::Variable(_) => match m.env.resolve(&args[1]) {
                n @ (Term::Integer(_) | Term::Float(_)) => {
                    unify_cont(m, &args[0], &Term::atom(&n.to_string()), k)
                }
                Term::Variable(_) => Promise::error(instantiation_error()),
                other => Promise::error(type_error("number", other, &m.env)),
            },
            other => Promise::error(type_error("atom", other, &m.env)),
        }
    });
}

/// The text of an atomic term, for `atom_chars`/`atom_codes` decomposition.
fn atomic_text(t: &Term, m: &Machine) -> Result<String, super::super::exception::Exception> {
    match t {
        Term::Atom(a) => Ok(a.as_str().to_string()),
        Term::Integer(_) | Term::Float(_) => Ok(t.to_string()),
        other => Err(type_error("atom", other.clone(), &m.env)),
    }
}
