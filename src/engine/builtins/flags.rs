//! Flags, operator declarations, and character conversion
//!
//! The writable flags are `unknown`, `double_quotes`, `char_conversion`,
//! and `debug`; the read-only ones describe the fixed-width integer model.
//! `op/3` applies remove-then-insert semantics, with priority 0 removing;
//! redefining `,` is forbidden.

use super::super::exception::{
    domain_error, instantiation_error, permission_error, representation_error, type_error,
    Exception,
};
use super::super::ops::OpType;
use super::super::promise::{Promise, Thunk};
use super::super::term::{Atom, Term};
use super::super::{DoubleQuotes, Machine, Unknown};
use super::{det, proper_list, unify_cont};

pub(super) fn register(m: &mut Machine) {
    m.register("set_prolog_flag", 2, |m, args, k| {
        let flag = match m.env.resolve(&args[0]) {
            Term::Variable(_) => return Promise::error(instantiation_error()),
            Term::Atom(a) => a,
            other => return Promise::error(type_error("atom", other, &m.env)),
        };
        let value = match m.env.resolve(&args[1]) {
            Term::Variable(_) => return Promise::error(instantiation_error()),
            v => v,
        };
        match flag.as_str() {
            "unknown" => match value.as_atom().map(|a| a.as_str()) {
                Some("error") => m.flags.unknown = Unknown::Error,
                Some("warning") => m.flags.unknown = Unknown::Warning,
                Some("fail") => m.flags.unknown = Unknown::Fail,
                _ => return Promise::error(bad_flag_value(m, flag, &value)),
            },
            "double_quotes" => match value.as_atom().map(|a| a.as_str()) {
                Some("codes") => m.flags.double_quotes = DoubleQuotes::Codes,
                Some("chars") => m.flags.double_quotes = DoubleQuotes::Chars,
                Some("atom") => m.flags.double_quotes = DoubleQuotes::Atom,
                _ => return Promise::error(bad_flag_value(m, flag, &value)),
            },
            "char_conversion" => match value.as_atom().map(|a| a.as_str()) {
                Some("on") => m.flags.char_conversion = true,
                Some("off") => m.flags.char_conversion = false,
                _ => return Promise::error(bad_flag_value(m, flag, &value)),
            },
            "debug" => match value.as_atom().map(|a| a.as_str()) {
                Some("on") => m.flags.debug = true,
                Some("off") => m.flags.debug = false,
                _ => return Promise::error(bad_flag_value(m, flag, &value)),
            },
            "bounded" | "max_integer" | "min_integer" | "integer_rounding_function"
            | "max_arity" => {
                return Promise::error(permission_error(
                    "modify",
                    "flag",
                    Term::Atom(flag),
                    &m.env,
                ))
            }
            _ => {
                return Promise::error(domain_error("prolog_flag", Term::Atom(flag), &m.env))
            }
        }
        det(k)
    });

    m.register("current_prolog_flag", 2, |m, args, k| {
        match m.env.resolve(&args[0]) {
            Term::Variable(_) | Term::Atom(_) => {}
            other => return Promise::error(type_error("atom", other, &m.env)),
        }
        if let Term::Atom(a) = m.env.resolve(&args[0]) {
            if flag_value(m, a.as_str()).is_none() {
                return Promise::error(domain_error("prolog_flag", Term::Atom(a), &m.env));
            }
        }
        let names = [
            "unknown",
            "double_quotes",
            "char_conversion",
            "debug",
            "bounded",
            "max_integer",
            "min_integer",
            "integer_rounding_function",
            "max_arity",
        ];
        let alts: Vec<Thunk> = names
            .iter()
            .map(|name| {
                let flag = args[0].clone();
                let value = args[1].clone();
                let name = *name;
                let k = k.clone();
                Box::new(move |m: &mut Machine| {
                    let v = flag_value(m, name).unwrap_or_else(Term::nil);
                    let want = Term::compound("-", vec![flag.clone(), value.clone()]);
                    let have = Term::compound("-", vec![Term::atom(name), v]);
                    unify_cont(m, &want, &have, k.clone())
                }) as Thunk
            })
            .collect();
        Promise::delay_all(alts)
    });

    m.register("op", 3, |m, args, k| match op_define(m, &args) {
        Ok(()) => det(k),
        Err(e) => Promise::error(e),
    });

    m.register("current_op", 3, |m, args, k| {
        let defs: Vec<(u16, OpType, Atom)> =
            m.operators.iter().map(|d| (d.priority, d.typ, d.name)).collect();
        let alts: Vec<Thunk> = defs
            .into_iter()
            .map(|(priority, typ, name)| {
                let want = Term::list(vec![args[0].clone(), args[1].clone(), args[2].clone()]);
                let k = k.clone();
                Box::new(move |m: &mut Machine| {
                    let have = Term::list(vec![
                        Term::Integer(priority as i64),
                        Term::atom(typ.name()),
                        Term::Atom(name),
                    ]);
                    unify_cont(m, &want, &have, k.clone())
                }) as Thunk
            })
            .collect();
        Promise::delay_all(alts)
    });

    m.register("char_conversion", 2, |m, args, k| {
        let from = match one_char(m, &args[0]) {
            Ok(c) => c,
            Err(e) => return Promise::error(e),
        };
        let to = match one_char(m, &args[1]) {
            Ok(c) => c,
            Err(e) => return Promise::error(e),
        };
        if from == to {
            m.char_conversions.remove(&from);
        } else {
            m.char_conversions.insert(from, to);
        }
        det(k)
    });

    m.register("current_char_conversion", 2, |m, args, k| {
        let mut pairs: Vec<(char, char)> =
            m.char_conversions.iter().map(|(a, b)| (*a, *b)).collect();
        pairs.sort_unstable();
        let alts: Vec<Thunk> = pairs
            .into_iter()
            .map(|(from, to)| {
                let want = Term::compound("-", vec![args[0].clone(), args[1].clone()]);
                let k = k.clone();
                Box::new(move |m: &mut Machine| {
                    let have = Term::compound(
                        "-",
                        vec![Term::atom(&from.to_string()), Term::atom(&to.to_string())],
                    );
                    unify_cont(m, &want, &have, k.clone())
                }) as Thunk
            })
            .collect();
        Promise::delay_all(alts)
    });
}

fn bad_flag_value(m: &Machine, flag: Atom, value: &Term) -> Exception {
    domain_error(
        "flag_value",
        Term::compound("+", vec![Term::Atom(flag), value.clone()]),
        &m.env,
    )
}

fn flag_value(m: &Machine, name: &str) -> Option<Term> {
    match name {
        "unknown" => Some(Term::atom(m.flags.unknown.name())),
        "double_quotes" => Some(Term::atom(m.flags.double_quotes.name())),
        "char_conversion" => Some(Term::atom(if m.flags.char_conversion { "on" } else { "off" })),
        "debug" => Some(Term::atom(if m.flags.debug { "on" } else { "off" })),
        "bounded" => Some(Term::atom("true")),
        "max_integer" => Some(Term::Integer(i64::MAX)),
        "min_integer" => Some(Term::Integer(i64::MIN)),
        "integer_rounding_function" => Some(Term::atom("toward_zero")),
        "max_arity" => Some(Term::atom("unbounded")),
        _ => None,
    }
}

fn op_define(m: &mut Machine, args: &[Term]) -> Result<(), Exception> {
    let priority = match m.env.resolve(&args[0]) {
        Term::Variable(_) => return Err(instantiation_error()),
        Term::Integer(p) if (0..=1200).contains(&p) => p as u16,
        Term::Integer(p) => {
            return Err(domain_error("operator_priority", Term::Integer(p), &m.env))
        }
        other => return Err(type_error("integer", other, &m.env)),
    };
    let typ = match m.env.resolve(&args[1]) {
        Term::Variable(_) => return Err(instantiation_error()),
        Term::Atom(a) => OpType::from_name(a.as_str())
            .ok_or_else(|| domain_error("operator_specifier", Term::Atom(a), &m.env))?,
        other => return Err(type_error("atom", other, &m.env)),
    };
    let names = match m.env.resolve(&args[2]) {
        Term::Variable(_) => return Err(instantiation_error()),
        Term::Atom(a) => vec![a],
        t @ Term::Compound(_) => {
            let mut names = Vec::new();
            for item in proper_list(&t, &m.env)? {
                match m.env.resolve(&item) {
                    Term::Variable(_) => return Err(instantiation_error()),
                    Term::Atom(a) => names.push(a),
                    other => return Err(type_error("atom", other, &m.env)),
                }
            }
            names
        }
        other => return Err(type_error("list", other, &m.env)),
    };
    for name in names {
        if name == "," {
            return Err(permission_error("modify", "operator", Term::Atom(name), &m.env));
        }
        m.operators.define(priority, typ, name);
    }
    Ok(())
}

fn one_char(m: &Machine, t: &Term) -> Result<char, Exception> {
    match m.env.resolve(t) {
        Term::Variable(_) => Err(instantiation_error()),
        Term::Atom(a) if a.as_str().chars().count() == 1 => {
            Ok(a.as_str().chars().next().unwrap())
        }
        _ => Err(representation_error("character")),
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
    fn test_flag_read_back() {
        let mut m = Machine::new();
        let sols = solutions(&mut m, "current_prolog_flag(unknown, V).");
        assert_eq!(sols[0].get("V").unwrap(), &Term::atom("error"));
        assert_eq!(
            solutions(&mut m, "set_prolog_flag(unknown, fail), current_prolog_flag(unknown, fail).")
                .len(),
            1
        );
    }

    #[test]
    fn test_read_only_flag_protected() {
        let mut m = Machine::new();
        let mut sols = m.query("set_prolog_flag(bounded, false).").unwrap();
        let err = sols.next().unwrap().unwrap_err();
        assert!(err.term().to_string().contains("permission_error"));
    }

    #[test]
    fn test_bad_flag_value() {
        let mut m = Machine::new();
        let mut sols = m.query("set_prolog_flag(unknown, maybe).").unwrap();
        assert!(sols.next().unwrap().is_err());
    }

    #[test]
    fn test_op_declaration_changes_parsing() {
        let mut m = Machine::new();
        m.consult(":- op(700, xfx, ===).").unwrap();
        m.consult("check(X === Y) :- X = Y.").unwrap();
        assert_eq!(solutions(&mut m, "check(a === a).").len(), 1);
    }

    #[test]
    fn test_op_priority_zero_removes() {
        let mut m = Machine::new();
        m.consult(":- op(700, xfx, ===). :- op(0, xfx, ===).").unwrap();
        assert!(solutions(&mut m, "current_op(_, _, ===).").is_empty());
    }

    #[test]
    fn test_comma_operator_protected() {
        let mut m = Machine::new();
        let mut sols = m.query("op(100, xfx, ',').").unwrap();
        assert!(sols.next().unwrap().is_err());
    }

    #[test]
    fn test_current_op_enumerates() {
        let mut m = Machine::new();
        let sols = solutions(&mut m, "current_op(P, xfx, =).");
        assert_eq!(sols[0].get("P").unwrap(), &Term::Integer(700));
    }

    #[test]
    fn test_char_conversion_table() {
        let mut m = Machine::new();
        assert_eq!(solutions(&mut m, "char_conversion(a, b).").len(), 1);
        let sols = solutions(&mut m, "current_char_conversion(a, X).");
        assert_eq!(sols[0].get("X").unwrap(), &Term::atom("b"));
        // mapping a character to itself removes the entry
        assert_eq!(solutions(&mut m, "char_conversion(a, a).").len(), 1);
        assert!(solutions(&mut m, "current_char_conversion(a, _).").is_empty());
    }
}
