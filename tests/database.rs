//! Database mutation ordering: assert/retract effects take place in
//! execution order and survive backtracking.

mod common;

use common::{error_of, machine_with, solutions, values};
use horn::Machine;

#[test]
fn test_assertz_orders_after_asserta() {
    let mut m = Machine::new();
    assert_eq!(
        solutions(&mut m, "assertz(x(middle)), assertz(x(last)), asserta(x(first)).").len(),
        1
    );
    assert_eq!(values(&mut m, "x(V).", "V"), vec!["first", "middle", "last"]);
}

#[test]
fn test_asserted_clauses_visible_to_later_calls() {
    let mut m = machine_with("boot :- assertz(flag(on)).");
    assert_eq!(solutions(&mut m, "boot, flag(F).").len(), 1);
}

#[test]
fn test_retract_is_not_undone_on_backtracking() {
    let mut m = machine_with("p(1). p(2).");
    // each delivered solution commits a removal; backtracking into retract
    // for the next solution does not restore it
    {
        let mut sols = m.query("retract(p(X)).").unwrap();
        assert!(sols.next().unwrap().is_ok());
        assert!(sols.next().unwrap().is_ok());
        assert!(sols.next().is_none());
    }
    assert!(solutions(&mut m, "p(_).").is_empty());
}

#[test]
fn test_retract_scans_forward_on_redo() {
    let mut m = machine_with("q(1). q(2). q(3).");
    let got = values(&mut m, "retract(q(X)), X > 1.", "X");
    assert_eq!(got, vec!["2", "3"]);
    // q(1) failed the downstream check and stays; 2 and 3 were committed
    assert_eq!(values(&mut m, "q(Y).", "Y"), vec!["1"]);
}

#[test]
fn test_abolish_then_unknown() {
    let mut m = machine_with("r(1).");
    assert_eq!(solutions(&mut m, "abolish(r/1).").len(), 1);
    let err = error_of(&mut m, "r(1).");
    assert!(err.contains("existence_error"), "got {}", err);
}

#[test]
fn test_dynamic_declaration_makes_empty_procedure() {
    let mut m = Machine::new();
    m.consult(":- dynamic(opt/1).").unwrap();
    // an empty dynamic procedure fails instead of raising existence_error
    assert!(solutions(&mut m, "opt(_).").is_empty());
}

#[test]
fn test_clause_enumerates_database_order() {
    let mut m = machine_with("c(1). c(2) :- true. c(3).");
    let got = values(&mut m, "clause(c(X), true).", "X");
    assert_eq!(got, vec!["1", "2", "3"]);
}

#[test]
fn test_assert_directive_runs() {
    let mut m = Machine::new();
    // a directive handed to assertz executes instead of being stored
    assert_eq!(solutions(&mut m, "assertz((:- assertz(side(effect)))), side(E).").len(), 1);
}

#[test]
fn test_current_predicate_reflects_mutation() {
    let mut m = Machine::new();
    assert!(solutions(&mut m, "current_predicate(tmp/0).").is_empty());
    assert_eq!(solutions(&mut m, "assertz(tmp).").len(), 1);
    assert_eq!(solutions(&mut m, "current_predicate(tmp/0).").len(), 1);
}

#[test]
fn test_retract_matches_rules() {
    let mut m = machine_with("s(X) :- X > 1. s(0).");
    assert_eq!(solutions(&mut m, "retract((s(X) :- X > 1)).").len(), 1);
    assert_eq!(values(&mut m, "s(V).", "V"), vec!["0"]);
}
