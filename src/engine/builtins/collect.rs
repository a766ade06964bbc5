//! Solution aggregation: `findall/3`, `bagof/3`, `setof/3`
//!
//! All three run their goal to exhaustion on a nested search, copying the
//! template out at each solution; the trail is rolled back afterwards so
//! collection leaves no bindings behind. `bagof`/`setof` first strip `^`
//! qualifiers, then group solutions by the values of the goal's free
//! variables that are neither templated nor qualified (the witnesses); each
//! group becomes one scheduler alternative that reinstates its witness
//! snapshot.

use std::collections::HashMap;
use std::rc::Rc;

use super::super::exception::instantiation_error;
use super::super::promise::{Cont, Promise, Search, Thunk};
use super::super::term::{
    compare_terms, renamed_copy, term_variables, variant, Term, VarId,
};
use super::super::Machine;
use super::unify_cont;

pub(super) fn register(m: &mut Machine) {
    m.register("findall", 3, |m, args, k| {
        let template = args[0].clone();
        let goal = args[1].clone();
        let mark = m.env.mark();
        let mut bag = Vec::new();
        let inner: Cont = Rc::new(|_| Promise::bool(true));
        let mut search = Search::new(m.solve(&goal, inner));
        loop {
            match search.force(m) {
                Ok(true) => bag.push(renamed_copy(&template, &m.env, &mut HashMap::new())),
                Ok(false) => break,
                Err(e) => {
                    m.env.undo_to(mark);
                    return Promise::error(e);
                }
            }
        }
        m.env.undo_to(mark);
        let lst = Term::list(bag);
        unify_cont(m, &args[2], &lst, k)
    });

    m.register("bagof", 3, |m, args, k| collection_of(m, args, k, false));
    m.register("setof", 3, |m, args, k| collection_of(m, args, k, true));
}

fn collection_of(m: &mut Machine, args: Vec<Term>, k: Cont, set: bool) -> Promise {
    let template = args[0].clone();
    let instances = args[2].clone();

    // strip explicit existential qualifiers: Template^...^Goal
    let mut qualified: Vec<Term> = Vec::new();
    let mut goal = m.env.resolve(&args[1]);
    if matches!(goal, Term::Variable(_)) {
        return Promise::error(instantiation_error());
    }
    while let Some(c) = goal.as_functor("^", 2) {
        qualified.push(c.args[0].clone());
        let next = m.env.resolve(&c.args[1]);
        goal = next;
        if matches!(goal, Term::Variable(_)) {
            return Promise::error(instantiation_error());
        }
    }

    // witnesses: free variables of the goal that are neither in the
    // template nor existentially qualified
    let mut bound: Vec<VarId> = term_variables(&template, &m.env);
    for q in &qualified {
        bound.extend(term_variables(q, &m.env));
    }
    let witnesses: Vec<Term> = term_variables(&goal, &m.env)
        .into_iter()
        .filter(|v| !bound.contains(v))
        .map(Term::Variable)
        .collect();
    let witness_tuple = Term::list(witnesses);

    // collect solutions, grouping by witness value
    let mark = m.env.mark();
    let mut groups: Vec<(Term, Vec<Term>)> = Vec::new();
    let inner: Cont = Rc::new(|_| Promise::bool(true));
    let mut search = Search::new(m.solve(&goal, inner));
    loop {
        match search.force(m) {
            Ok(true) => {
                // one renaming map keeps sharing between witness and template
                let mut map = HashMap::new();
                let w = renamed_copy(&witness_tuple, &m.env, &mut map);
                let t = renamed_copy(&template, &m.env, &mut map);
                match groups.iter_mut().find(|(gw, _)| variant(gw, &w, &m.env)) {
                    Some((_, bag)) => bag.push(t),
                    None => groups.push((w, vec![t])),
                }
            }
            Ok(false) => break,
            Err(e) => {
                m.env.undo_to(mark);
                return Promise::error(e);
            }
        }
    }
    m.env.undo_to(mark);

    if groups.is_empty() {
        return Promise::bool(false);
    }

    // one alternative per witness group, reinstating its snapshot
    let alts: Vec<Thunk> = groups
        .into_iter()
        .map(|(w, bag)| {
            let witness_tuple = witness_tuple.clone();
            let instances = instances.clone();
            let k = k.clone();
            Box::new(move |m: &mut Machine| {
                if !m.env.unify(&witness_tuple, &w, false) {
                    return Promise::bool(false);
                }
                let bag = if set { sort_dedup(bag, m) } else { bag };
                let lst = Term::list(bag);
                unify_cont(m, &instances, &lst, k)
            }) as Thunk
        })
        .collect();
    Promise::delay_all(alts)
}

/// Sort by the standard order of terms and drop duplicates, for `setof`.
fn sort_dedup(mut bag: Vec<Term>, m: &Machine) -> Vec<Term> {
    bag.sort_by(|a, b| compare_terms(a, b, &m.env));
    bag.dedup_by(|a, b| compare_terms(a, b, &m.env) == std::cmp::Ordering::Equal);
    bag
}

#[cfg(test)]
mod tests {
    use super::super::super::Machine;
    use crate::engine::term::Term;

    fn solutions(m: &mut Machine, q: &str) -> Vec<crate::engine::Bindings> {
        m.query(q).unwrap().collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn test_findall_collects_in_order() {
        let mut m = Machine::new();
        m.consult("p(3). p(1). p(2).").unwrap();
        let sols = solutions(&mut m, "findall(X, p(X), L).");
        assert_eq!(sols[0].get("L").unwrap().to_string(), "[3,1,2]");
    }

    #[test]
    fn test_findall_empty_on_no_solutions() {
        let mut m = Machine::new();
        m.consult("p(1).").unwrap();
        let sols = solutions(&mut m, "findall(X, p(2), L).");
        assert_eq!(sols.len(), 1);
        assert!(sols[0].get("L").unwrap().is_nil());
    }

    #[test]
    fn test_bagof_groups_by_witness() {
        let mut m = Machine::new();
        m.consult("age(peter, 7). age(ann, 11). age(pat, 8). age(tom, 5).").unwrap();
        m.consult("class(peter, a). class(ann, b). class(pat, a). class(tom, b).").unwrap();
        let sols = solutions(&mut m, "bagof(N, class(N, C), L).");
        assert_eq!(sols.len(), 2);
        assert_eq!(sols[0].get("C").unwrap(), &Term::atom("a"));
        assert_eq!(sols[0].get("L").unwrap().to_string(), "[peter,pat]");
        assert_eq!(sols[1].get("L").unwrap().to_string(), "[ann,tom]");
    }

    #[test]
    fn test_bagof_existential_qualifier() {
        let mut m = Machine::new();
        m.consult("taste(red, sweet). taste(green, sour).").unwrap();
        m.consult("color(red). color(green). color(blue).").unwrap();
        let sols = solutions(&mut m, "bagof(C, T^taste(C, T), L).");
        assert_eq!(sols.len(), 1);
        assert_eq!(sols[0].get("L").unwrap().to_string(), "[red,green]");
    }

    #[test]
    fn test_bagof_fails_on_no_solutions() {
        let mut m = Machine::new();
        m.consult("p(1).").unwrap();
        assert!(solutions(&mut m, "bagof(X, p(2), _L).").is_empty());
    }

    #[test]
    fn test_setof_sorts_and_dedups() {
        let mut m = Machine::new();
        m.consult("n(3). n(1). n(3). n(2).").unwrap();
        let sols = solutions(&mut m, "setof(X, n(X), L).");
        assert_eq!(sols[0].get("L").unwrap().to_string(), "[1,2,3]");
    }
}
