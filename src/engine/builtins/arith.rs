//! Arithmetic evaluation: `is/2` and the numeric comparison operators
//!
//! Expressions are evaluated over `i64` and `f64` with ISO exceptional
//! values: integer overflow, zero divisors, and undefined results raise
//! `evaluation_error/1`; unknown functors raise `type_error(evaluable, _)`.

use std::cmp::Ordering;

use super::super::exception::{domain_error, evaluation_error, instantiation_error, type_error, Exception};
use super::super::promise::Promise;
use super::super::term::{Term, ProcedureIndicator};
use super::super::Machine;
use super::{det, unify_cont};

/// A computed number.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn term(self) -> Term {
        match self {
            Num::Int(i) => Term::Integer(i),
            Num::Float(f) => Term::Float(f),
        }
    }

    fn as_float(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

pub(super) fn register(m: &mut Machine) {
    m.register("is", 2, |m, args, k| match eval(m, &args[1]) {
        Ok(n) => unify_cont(m, &args[0], &n.term(), k),
        Err(e) => Promise::error(e),
    });

    compare_op(m, "=:=", |o| o == Ordering::Equal);
    compare_op(m, "=\\=", |o| o != Ordering::Equal);
    compare_op(m, "<", |o| o == Ordering::Less);
    compare_op(m, ">", |o| o == Ordering::Greater);
    compare_op(m, "=<", |o| o != Ordering::Greater);
    compare_op(m, ">=", |o| o != Ordering::Less);

    m.register("succ", 2, |m, args, k| {
        match (m.env.resolve(&args[0]), m.env.resolve(&args[1])) {
            (Term::Integer(a), _) if a >= 0 => match a.checked_add(1) {
                Some(b) => unify_cont(m, &args[1], &Term::Integer(b), k),
                None => Promise::error(evaluation_error("int_overflow")),
            },
            (Term::Variable(_), Term::Integer(b)) if b > 0 => {
                unify_cont(m, &args[0], &Term::Integer(b - 1), k)
            }
            (Term::Variable(_), Term::Integer(_)) => Promise::bool(false),
            (Term::Variable(_), Term::Variable(_)) => Promise::error(instantiation_error()),
            (Term::Integer(a), _) => {
                Promise::error(domain_error("not_less_than_zero", Term::Integer(a), &m.env))
            }
            (other, _) => Promise::error(type_error("integer", other, &m.env)),
        }
    });
}

fn compare_op(m: &mut Machine, name: &str, pred: impl Fn(Ordering) -> bool + 'static) {
    m.register(name, 2, move |m, args, k| {
        let lhs = match eval(m, &args[0]) {
            Ok(n) => n,
            Err(e) => return Promise::error(e),
        };
        let rhs = match eval(m, &args[1]) {
            Ok(n) => n,
            Err(e) => return Promise::error(e),
        };
        let ord = match (lhs, rhs) {
            (Num::Int(a), Num::Int(b)) => a.cmp(&b),
            (a, b) => a
                .as_float()
                .partial_cmp(&b.as_float())
                .unwrap_or(Ordering::Equal),
        };
        if pred(ord) {
            det(k)
        } else {
            Promise::bool(false)
        }
    });
}

/// Evaluate an arithmetic expression term.
pub(crate) fn eval(m: &Machine, t: &Term) -> Result<Num, Exception> {
    match m.env.resolve(t) {
        Term::Variable(_) => Err(instantiation_error()),
        Term::Integer(i) => Ok(Num::Int(i)),
        Term::Float(f) => Ok(Num::Float(f)),
        Term::Atom(a) => match a.as_str() {
            "pi" => Ok(Num::Float(std::f64::consts::PI)),
            "e" => Ok(Num::Float(std::f64::consts::E)),
            "max_integer" => Ok(Num::Int(i64::MAX)),
            "min_integer" => Ok(Num::Int(i64::MIN)),
            _ => Err(type_error(
                "evaluable",
                ProcedureIndicator::new(a, 0).term(),
                &m.env,
            )),
        },
        Term::Compound(c) => {
            let pi = ProcedureIndicator { name: c.functor, arity: c.args.len() };
            match (c.functor.as_str(), c.args.len()) {
                ("+", 2) => int_or_float(
                    eval(m, &c.args[0])?,
                    eval(m, &c.args[1])?,
                    |a, b| a.checked_add(b),
                    |a, b| a + b,
                ),
                ("-", 2) => int_or_float(
                    eval(m, &c.args[0])?,
                    eval(m, &c.args[1])?,
                    |a, b| a.checked_sub(b),
                    |a, b| a - b,
                ),
                ("*", 2) => int_or_float(
                    eval(m, &c.args[0])?,
                    eval(m, &c.args[1])?,
                    |a, b| a.checked_mul(b),
                    |a, b| a * b,
                ),
                ("/", 2) => {
                    let a = eval(m, &c.args[0])?;
                    let b = eval(m, &c.args[1])?;
                    match (a, b) {
                        (_, Num::Int(0)) => Err(evaluation_error("zero_divisor")),
                        (_, Num::Float(z)) if z == 0.0 => Err(evaluation_error("zero_divisor")),
                        (Num::Int(x), Num::Int(y)) => {
                            x.checked_div(y).map(Num::Int).ok_or_else(|| evaluation_error("int_overflow"))
                        }
                        (x, y) => Ok(Num::Float(x.as_float() / y.as_float())),
                    }
                }
                ("//", 2) => {
                    let (x, y) = both_ints(m, &c.args[0], &c.args[1])?;
                    if y == 0 {
                        return Err(evaluation_error("zero_divisor"));
                    }
                    x.checked_div(y).map(Num::Int).ok_or_else(|| evaluation_error("int_overflow"))
                }
                ("div", 2) => {
                    let (x, y) = both_ints(m, &c.args[0], &c.args[1])?;
                    if y == 0 {
                        return Err(evaluation_error("zero_divisor"));
                    }
                    x.checked_div_euclid(y)
                        .map(Num::Int)
                        .ok_or_else(|| evaluation_error("int_overflow"))
                }
                ("mod", 2) => {
                    let (x, y) = both_ints(m, &c.args[0], &c.args[1])?;
                    if y == 0 {
                        return Err(evaluation_error("zero_divisor"));
                    }
                    // sign follows the divisor
                    let r = x.wrapping_rem(y);
                    Ok(Num::Int(if r != 0 && (r ^ y) < 0 { r + y } else { r }))
                }
                ("rem", 2) => {
                    let (x, y) = both_ints(m, &c.args[0], &c.args[1])?;
                    if y == 0 {
                        return Err(evaluation_error("zero_divisor"));
                    }
                    Ok(Num::Int(x.wrapping_rem(y)))
                }
                ("min", 2) => {
                    let a = eval(m, &c.args[0])?;
                    let b = eval(m, &c.args[1])?;
                    Ok(if num_le(a, b) { a } else { b })
                }
                ("max", 2) => {
                    let a = eval(m, &c.args[0])?;
                    let b = eval(m, &c.args[1])?;
                    Ok(if num_le(a, b) { b } else { a })
                }
                ("-", 1) => match eval(m, &c.args[0])? {
                    Num::Int(i) => {
                        i.checked_neg().map(Num::Int).ok_or_else(|| evaluation_error("int_overflow"))
                    }
                    Num::Float(f) => Ok(Num::Float(-f)),
                },
                ("+", 1) => eval(m, &c.args[0]),
                ("abs", 1) => match eval(m, &c.args[0])? {
                    Num::Int(i) => {
                        i.checked_abs().map(Num::Int).ok_or_else(|| evaluation_error("int_overflow"))
                    }
                    Num::Float(f) => Ok(Num::Float(f.abs())),
                },
                ("sign", 1) => match eval(m, &c.args[0])? {
                    Num::Int(i) => Ok(Num::Int(i.signum())),
                    Num::Float(f) => Ok(Num::Float(if f == 0.0 { 0.0 } else { f.signum() })),
                },
                ("**", 2) => {
                    let a = eval(m, &c.args[0])?.as_float();
                    let b = eval(m, &c.args[1])?.as_float();
                    Ok(Num::Float(a.powf(b)))
                }
                ("^", 2) => {
                    let a = eval(m, &c.args[0])?;
                    let b = eval(m, &c.args[1])?;
                    match (a, b) {
                        (Num::Int(x), Num::Int(y)) if y >= 0 => {
                            let mut acc: i64 = 1;
                            for _ in 0..y {
                                acc = acc
                                    .checked_mul(x)
                                    .ok_or_else(|| evaluation_error("int_overflow"))?;
                            }
                            Ok(Num::Int(acc))
                        }
                        (x, y) => Ok(Num::Float(x.as_float().powf(y.as_float()))),
                    }
                }
                ("sqrt", 1) => float_fn(m, &c.args[0], f64::sqrt),
                ("sin", 1) => float_fn(m, &c.args[0], f64::sin),
                ("cos", 1) => float_fn(m, &c.args[0], f64::cos),
                ("tan", 1) => float_fn(m, &c.args[0], f64::tan),
                ("asin", 1) => float_fn(m, &c.args[0], f64::asin),
                ("acos", 1) => float_fn(m, &c.args[0], f64::acos),
                ("atan", 1) => float_fn(m, &c.args[0], f64::atan),
                ("atan", 2) | ("atan2", 2) => {
                    let a = eval(m, &c.args[0])?.as_float();
                    let b = eval(m, &c.args[1])?.as_float();
                    Ok(Num::Float(a.atan2(b)))
                }
                ("exp", 1) => float_fn(m, &c.args[0], f64::exp),
                ("log", 1) => {
                    let x = eval(m, &c.args[0])?.as_float();
                    if x <= 0.0 {
                        return Err(evaluation_error("undefined"));
                    }
                    Ok(Num::Float(x.ln()))
                }
                ("float", 1) => Ok(Num::Float(eval(m, &c.args[0])?.as_float())),
                ("float_integer_part", 1) => float_fn(m, &c.args[0], f64::trunc),
                ("float_fractional_part", 1) => float_fn(m, &c.args[0], f64::fract),
                ("truncate", 1) => to_int(eval(m, &c.args[0])?.as_float().trunc()),
                ("round", 1) => to_int(eval(m, &c.args[0])?.as_float().round()),
                ("ceiling", 1) => to_int(eval(m, &c.args[0])?.as_float().ceil()),
                ("floor", 1) => to_int(eval(m, &c.args[0])?.as_float().floor()),
                ("integer", 1) => match eval(m, &c.args[0])? {
                    Num::Int(i) => Ok(Num::Int(i)),
                    Num::Float(f) => to_int(f.round()),
                },
                (">>", 2) => {
                    let (x, y) = both_ints(m, &c.args[0], &c.args[1])?;
                    Ok(Num::Int(x >> (y & 63)))
                }
                ("<<", 2) => {
                    let (x, y) = both_ints(m, &c.args[0], &c.args[1])?;
                    x.checked_shl((y & 63) as u32)
                        .map(Num::Int)
                        .ok_or_else(|| evaluation_error("int_overflow"))
                }
                ("/\\", 2) => {
                    let (x, y) = both_ints(m, &c.args[0], &c.args[1])?;
                    Ok(Num::Int(x & y))
                }
                ("\\/", 2) => {
                    let (x, y) = both_ints(m, &c.args[0], &c.args[1])?;
                    Ok(Num::Int(x | y))
                }
                ("xor", 2) => {
                    let (x, y) = both_ints(m, &c.args[0], &c.args[1])?;
                    Ok(Num::Int(x ^ y))
                }
                ("\\", 1) => {
                    let x = one_int(m, &c.args[0])?;
                    Ok(Num::Int(!x))
                }
                ("gcd", 2) => {
                    let (x, y) = both_ints(m, &c.args[0], &c.args[1])?;
                    Ok(Num::Int(gcd(x.unsigned_abs(), y.unsigned_abs()) as i64))
                }
                _ => Err(type_error("evaluable", pi.term(), &m.env)),
            }
        }
    }
}

fn int_or_float(
    a: Num,
    b: Num,
    fi: impl Fn(i64, i64) -> Option<i64>,
    ff: impl Fn(f64, f64) -> f64,
) -> Result<Num, Exception> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => {
            fi(x, y).map(Num::Int).ok_or_else(|| evaluation_error("int_overflow"))
        }
        (x, y) => Ok(Num::Float(ff(x.as_float(), y.as_float()))),
    }
}

fn float_fn(m: &Machine, t: &Term, f: impl Fn(f64) -> f64) -> Result<Num, Exception> {
    Ok(Num::Float(f(eval(m, t)?.as_float())))
}

fn to_int(f: f64) -> Result<Num, Exception> {
    if f.is_finite() && (i64::MIN as f64..=i64::MAX as f64).contains(&f) {
        Ok(Num::Int(f as i64))
    } else {
        Err(evaluation_error("int_overflow"))
    }
}

fn both_ints(m: &Machine, a: &Term, b: &Term) -> Result<(i64, i64), Exception> {
    Ok((one_int(m, a)?, one_int(m, b)?))
}

fn one_int(m: &Machine, t: &Term) -> Result<i64, Exception> {
    match eval(m, t)? {
        Num::Int(i) => Ok(i),
        Num::Float(f) => Err(type_error("integer", Term::Float(f), &m.env)),
    }
}

fn num_le(a: Num, b: Num) -> bool {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => x <= y,
        (x, y) => x.as_float() <= y.as_float(),
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::super::super::Machine;
    use crate::engine::term::Term;

    fn solutions(m: &mut Machine, q: &str) -> Vec<crate::engine::Bindings> {
        m.query(q).unwrap().collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn test_precedence_and_evaluation() {
        let mut m = Machine::new();
        let sols = solutions(&mut m, "X is 3 + 4 * 2.");
        assert_eq!(sols[0].get("X").unwrap(), &Term::Integer(11));
    }

    #[test]
    fn test_zero_divisor() {
        let mut m = Machine::new();
        let mut sols = m.query("X is 1 / 0.").unwrap();
        let err = sols.next().unwrap().unwrap_err();
        assert!(err.term().to_string().contains("zero_divisor"));
    }

    #[test]
    fn test_mixed_number_arithmetic() {
        let mut m = Machine::new();
        let sols = solutions(&mut m, "X is 1 + 0.5.");
        assert_eq!(sols[0].get("X").unwrap(), &Term::Float(1.5));
        let sols = solutions(&mut m, "X is 7 // 2.");
        assert_eq!(sols[0].get("X").unwrap(), &Term::Integer(3));
        let sols = solutions(&mut m, "X is -7 mod 3.");
        assert_eq!(sols[0].get("X").unwrap(), &Term::Integer(2));
        let sols = solutions(&mut m, "X is -7 rem 3.");
        assert_eq!(sols[0].get("X").unwrap(), &Term::Integer(-1));
    }

    #[test]
    fn test_comparisons() {
        let mut m = Machine::new();
        assert_eq!(solutions(&mut m, "1 + 1 =:= 2.").len(), 1);
        assert_eq!(solutions(&mut m, "1 =:= 1.0.").len(), 1);
        assert!(solutions(&mut m, "2 < 1 + 1.").is_empty());
        assert_eq!(solutions(&mut m, "2 =< 1 + 1.").len(), 1);
    }

    #[test]
    fn test_unknown_evaluable() {
        let mut m = Machine::new();
        let mut sols = m.query("X is foo(1).").unwrap();
        let err = sols.next().unwrap().unwrap_err();
        assert!(err.term().to_string().contains("evaluable"));
    }

    #[test]
    fn test_integer_power_and_overflow() {
        let mut m = Machine::new();
        let sols = solutions(&mut m, "X is 2 ^ 10.");
        assert_eq!(sols[0].get("X").unwrap(), &Term::Integer(1024));
        let mut sols = m.query("X is 2 ^ 99.").unwrap();
        assert!(sols.next().unwrap().is_err());
    }

    #[test]
    fn test_instantiation_error() {
        let mut m = Machine::new();
        let mut sols = m.query("X is Y + 1.").unwrap();
        let err = sols.next().unwrap().unwrap_err();
        assert!(err.term().to_string().contains("instantiation_error"));
    }
}
