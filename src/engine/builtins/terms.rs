//! Term predicates: type tests, unification, construction and inspection,
//! and the standard order of terms.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::super::exception::{domain_error, instantiation_error, type_error};
use super::super::promise::{Promise, Thunk};
use super::super::term::{compare_terms, renamed_copy, survey_list, ListShape, Term};
use super::super::Machine;
use super::{det, proper_list, unify_cont};

pub(super) fn register(m: &mut Machine) {
    type_test(m, "var", |t, _| matches!(t, Term::Variable(_)));
    type_test(m, "nonvar", |t, _| !matches!(t, Term::Variable(_)));
    type_test(m, "atom", |t, _| matches!(t, Term::Atom(_)));
    type_test(m, "number", |t, _| matches!(t, Term::Integer(_) | Term::Float(_)));
    type_test(m, "integer", |t, _| matches!(t, Term::Integer(_)));
    type_test(m, "float", |t, _| matches!(t, Term::Float(_)));
    type_test(m, "atomic", |t, _| {
        matches!(t, Term::Atom(_) | Term::Integer(_) | Term::Float(_))
    });
    type_test(m, "compound", |t, _| matches!(t, Term::Compound(_)));
    type_test(m, "callable", |t, _| matches!(t, Term::Atom(_) | Term::Compound(_)));
    type_test(m, "is_list", |t, m| matches!(survey_list(t, &m.env), ListShape::Proper(_)) || t.is_nil());
    type_test(m, "ground", |t, m| super::super::term::term_variables(t, &m.env).is_empty());

    m.register("=", 2, |m, args, k| {
        if m.env.unify(&args[0], &args[1], false) {
            det(k)
        } else {
            Promise::bool(false)
        }
    });

    m.register("unify_with_occurs_check", 2, |m, args, k| {
        if m.env.unify(&args[0], &args[1], true) {
            det(k)
        } else {
            Promise::bool(false)
        }
    });

    m.register("\\=", 2, |m, args, k| {
        let mark = m.env.mark();
        if m.env.unify(&args[0], &args[1], false) {
            m.env.undo_to(mark);
            Promise::bool(false)
        } else {
            det(k)
        }
    });

    order_test(m, "==", |o| o == Ordering::Equal);
    order_test(m, "\\==", |o| o != Ordering::Equal);
    order_test(m, "@<", |o| o == Ordering::Less);
    order_test(m, "@>", |o| o == Ordering::Greater);
    order_test(m, "@=<", |o| o != Ordering::Greater);
    order_test(m, "@>=", |o| o != Ordering::Less);

    m.register("compare", 3, |m, args, k| {
        match m.env.resolve(&args[0]) {
            Term::Variable(_) => {}
            Term::Atom(a) if a == "<" || a == "=" || a == ">" => {}
            Term::Atom(_) => {
                return Promise::error(domain_error("order", m.env.resolve(&args[0]), &m.env))
            }
            other => return Promise::error(type_error("atom", other, &m.env)),
        }
        let sym = match compare_terms(&args[1], &args[2], &m.env) {
            Ordering::Less => "<",
            Ordering::Equal => "=",
            Ordering::Greater => ">",
        };
        unify_cont(m, &args[0], &Term::atom(sym), k)
    });

    m.register("functor", 3, |m, args, k| {
        let t = m.env.resolve(&args[0]);
        match t {
            Term::Compound(c) => {
                let shape = Term::compound(
                    "/",
                    vec![Term::Atom(c.functor), Term::Integer(c.args.len() as i64)],
                );
                let want = Term::compound("/", vec![args[1].clone(), args[2].clone()]);
                unify_cont(m, &want, &shape, k)
            }
            Term::Variable(_) => {
                let arity = match m.env.resolve(&args[2]) {
                    Term::Variable(_) => return Promise::error(instantiation_error()),
                    Term::Integer(n) if n < 0 => {
                        return Promise::error(domain_error(
                            "not_less_than_zero",
                            Term::Integer(n),
                            &m.env,
                        ))
                    }
                    Term::Integer(n) => n as usize,
                    other => return Promise::error(type_error("integer", other, &m.env)),
                };
                let name = m.env.resolve(&args[1]);
                if arity == 0 {
                    return match name {
                        Term::Variable(_) => Promise::error(instantiation_error()),
                        n @ (Term::Atom(_) | Term::Integer(_) | Term::Float(_)) => {
                            unify_cont(m, &args[0], &n, k)
                        }
                        other => Promise::error(type_error("atomic", other, &m.env)),
                    };
                }
                match name {
                    Term::Variable(_) => Promise::error(instantiation_error()),
                    Term::Atom(f) => {
                        let fresh: Vec<Term> = (0..arity).map(|_| Term::fresh_var()).collect();
                        let built = Term::compound(f, fresh);
                        unify_cont(m, &args[0], &built, k)
                    }
                    other => Promise::error(type_error("atom", other, &m.env)),
                }
            }
            atomic => {
                let want = Term::compound("/", vec![args[1].clone(), args[2].clone()]);
                let shape = Term::compound("/", vec![atomic, Term::Integer(0)]);
                unify_cont(m, &want, &shape, k)
            }
        }
    });

    m.register("arg", 3, |m, args, k| {
        let t = m.env.resolve(&args[1]);
        let c = match t {
            Term::Variable(_) => return Promise::error(instantiation_error()),
            Term::Compound(c) => c,
            other => return Promise::error(type_error("compound", other, &m.env)),
        };
        match m.env.resolve(&args[0]) {
            Term::Integer(n) => {
                if n < 1 || n as usize > c.args.len() {
                    return Promise::bool(false);
                }
                let nth = c.args[n as usize - 1].clone();
                unify_cont(m, &args[2], &nth, k)
            }
            Term::Variable(_) => {
                // enumerate argument positions
                let alts: Vec<Thunk> = (0..c.args.len())
                    .map(|i| {
                        let nth = c.args[i].clone();
                        let pos = args[0].clone();
                        let arg = args[2].clone();
                        let k = k.clone();
                        Box::new(move |m: &mut Machine| {
                            let pair = Term::compound("-", vec![pos.clone(), arg.clone()]);
                            let want =
                                Term::compound("-", vec![Term::Integer(i as i64 + 1), nth.clone()]);
                            unify_cont(m, &pair, &want, k.clone())
                        }) as Thunk
                    })
                    .collect();
                Promise::delay_all(alts)
            }
            other => Promise::error(type_error("integer", other, &m.env)),
        }
    });

    m.register("=..", 2, |m, args, k| {
        let t = m.env.resolve(&args[0]);
        match t {
            Term::Compound(c) => {
                let mut items = vec![Term::Atom(c.functor)];
                items.extend(c.args.iter().cloned());
                let lst = Term::list(items);
                unify_cont(m, &args[1], &lst, k)
            }
            Term::Variable(_) => {
                let items = match proper_list(&args[1], &m.env) {
                    Ok(v) => v,
                    Err(e) => return Promise::error(e),
                };
                if items.is_empty() {
                    return Promise::error(domain_error(
                        "non_empty_list",
                        m.env.resolve(&args[1]),
                        &m.env,
                    ));
                }
                let head = m.env.resolve(&items[0]);
                let rest: Vec<Term> = items[1..].to_vec();
                match head {
                    Term::Variable(_) => Promise::error(instantiation_error()),
                    Term::Atom(f) => {
                        let built = Term::compound(f, rest);
                        unify_cont(m, &args[0], &built, k)
                    }
                    atomic if rest.is_empty() => unify_cont(m, &args[0], &atomic, k),
                    other => Promise::error(type_error("atomic", other, &m.env)),
                }
            }
            atomic => {
                let lst = Term::list(vec![atomic]);
                unify_cont(m, &args[1], &lst, k)
            }
        }
    });

    m.register("copy_term", 2, |m, args, k| {
        let copy = renamed_copy(&args[0], &m.env, &mut HashMap::new());
        unify_cont(m, &args[1], &copy, k)
    });
}

fn type_test(m: &mut Machine, name: &str, pred: impl Fn(&Term, &Machine) -> bool + 'static) {
    m.register(name, 1, move |m, args, k| {
        let t = m.env.resolve(&args[0]);
        if pred(&t, m) {
            det(k)
        } else {
            Promise::bool(false)
        }
    });
}

fn order_test(m: &mut Machine, name: &str, pred: impl Fn(Ordering) -> bool + 'static) {
    m.register(name, 2, move |m, args, k| {
        if pred(compare_terms(&args[0], &args[1], &m.env)) {
            det(k)
        } else {
            Promise::bool(false)
        }
    });
}

#[cfg(test)]
mod tests {
    use super::super::super::Machine;
    use crate::engine::term::Term;

    fn solutions(m: &mut Machine, q: &str) -> Vec<crate::engine::Bindings> {
        m.query(q).unwrap().collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn test_type_tests() {
        let mut m = Machine::new();
        assert_eq!(solutions(&mut m, "atom(foo).").len(), 1);
        assert!(solutions(&mut m, "atom(f(x)).").is_empty());
        assert_eq!(solutions(&mut m, "var(_).").len(), 1);
        assert_eq!(solutions(&mut m, "X = 1, nonvar(X).").len(), 1);
        assert_eq!(solutions(&mut m, "is_list([a, b]).").len(), 1);
        assert!(solutions(&mut m, "is_list([a | _]).").is_empty());
        assert_eq!(solutions(&mut m, "ground(f(1, a)).").len(), 1);
        assert!(solutions(&mut m, "ground(f(1, _)).").is_empty());
    }

    #[test]
    fn test_not_unifiable() {
        let mut m = Machine::new();
        assert_eq!(solutions(&mut m, "a \\= b.").len(), 1);
        assert!(solutions(&mut m, "X \\= f(a), X = f(a).").is_empty());
    }

    #[test]
    fn test_occurs_check_builtin() {
        let mut m = Machine::new();
        assert!(solutions(&mut m, "unify_with_occurs_check(X, f(X)).").is_empty());
        assert_eq!(solutions(&mut m, "X = f(X).").len(), 1);
    }

    #[test]
    fn test_functor_decompose_and_build() {
        let mut m = Machine::new();
        let sols = solutions(&mut m, "functor(f(a, b), N, A).");
        assert_eq!(sols[0].get("N").unwrap(), &Term::atom("f"));
        assert_eq!(sols[0].get("A").unwrap(), &Term::Integer(2));

        let sols = solutions(&mut m, "functor(T, g, 2), arg(1, T, one).");
        let t = sols[0].get("T").unwrap();
        let c = t.as_functor("g", 2).unwrap();
        assert_eq!(c.args[0], Term::atom("one"));

        let sols = solutions(&mut m, "functor(T, 7, 0).");
        assert_eq!(sols[0].get("T").unwrap(), &Term::Integer(7));
    }

    #[test]
    fn test_univ_round_trip() {
        let mut m = Machine::new();
        let sols = solutions(&mut m, "f(a, 1) =.. L.");
        assert_eq!(sols[0].get("L").unwrap().to_string(), "[f,a,1]");
        let sols = solutions(&mut m, "T =.. [point, 1, 2].");
        assert!(sols[0].get("T").unwrap().as_functor("point", 2).is_some());
    }

    #[test]
    fn test_arg_enumerates() {
        let mut m = Machine::new();
        let sols = solutions(&mut m, "arg(N, f(a, b), X).");
        assert_eq!(sols.len(), 2);
        assert_eq!(sols[0].get("N").unwrap(), &Term::Integer(1));
        assert_eq!(sols[1].get("X").unwrap(), &Term::atom("b"));
    }

    #[test]
    fn test_compare_and_order() {
        let mut m = Machine::new();
        let sols = solutions(&mut m, "compare(O, 1, a).");
        assert_eq!(sols[0].get("O").unwrap(), &Term::atom("<"));
        assert_eq!(solutions(&mut m, "f(b) @< f(c).").len(), 1);
        assert_eq!(solutions(&mut m, "foo == foo.").len(), 1);
        assert!(solutions(&mut m, "X == Y.").is_empty());
    }

    #[test]
    fn test_copy_term_freshens() {
        let mut m = Machine::new();
        // the copy's variable is fresh, so binding it does not bind X
        let sols = solutions(&mut m, "copy_term(f(X, X), f(1, Y)), var(X), Y == 1.");
        assert_eq!(sols.len(), 1);
    }
}
