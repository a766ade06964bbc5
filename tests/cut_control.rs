//! Cut scope and control constructs: the cut prunes clause alternatives of
//! its own predicate call and earlier goals of the same body, nothing more.

mod common;

use common::{machine_with, solutions, values};

#[test]
fn test_cut_prunes_earlier_goal_not_later() {
    let mut m = machine_with("p(1). p(2). p(3).");
    // the cut commits X to the first solution; Y still enumerates
    let sols = solutions(&mut m, "p(X), !, p(Y).");
    let got: Vec<(String, String)> = sols
        .iter()
        .map(|s| (s.get("X").unwrap().to_string(), s.get("Y").unwrap().to_string()))
        .collect();
    assert_eq!(
        got,
        vec![
            ("1".to_string(), "1".to_string()),
            ("1".to_string(), "2".to_string()),
            ("1".to_string(), "3".to_string()),
        ]
    );
}

#[test]
fn test_cut_inside_clause_prunes_siblings() {
    let mut m = machine_with(
        "max(X, Y, X) :- X >= Y, !.
         max(_, Y, Y).",
    );
    assert_eq!(values(&mut m, "max(3, 2, M).", "M"), vec!["3"]);
    assert_eq!(values(&mut m, "max(2, 3, M).", "M"), vec!["3"]);
}

#[test]
fn test_cut_does_not_escape_predicate() {
    let mut m = machine_with(
        "q(X) :- p(X), !.
         q(99).
         p(1). p(2).",
    );
    // the cut in q/1 removes q's siblings and p's alternatives, but the
    // caller's own choices survive
    let mut all = machine_with("r(a). r(b).");
    all.consult("q(X) :- p(X), !. p(1). p(2).").unwrap();
    let sols = solutions(&mut all, "r(R), q(X).");
    assert_eq!(sols.len(), 2);
    assert_eq!(values(&mut m, "q(X).", "X"), vec!["1"]);
}

#[test]
fn test_cut_in_first_goal_position() {
    let mut m = machine_with("s(1) :- !. s(2).");
    assert_eq!(values(&mut m, "s(X).", "X"), vec!["1"]);
}

#[test]
fn test_call_makes_cut_local() {
    let mut m = machine_with("p(1). p(2).");
    // a cut inside call/1 does not prune the outer goal's alternatives
    let sols = solutions(&mut m, "p(X), call((!, true)).");
    assert_eq!(sols.len(), 2);
}

#[test]
fn test_disjunction_order() {
    let mut m = machine_with("d(X) :- (X = left ; X = right).");
    assert_eq!(values(&mut m, "d(X).", "X"), vec!["left", "right"]);
}

#[test]
fn test_if_then_else_commits_to_condition() {
    let mut m = machine_with("c(1). c(2).");
    // the condition is committed: only its first solution is used
    let sols = solutions(&mut m, "(c(X) -> Y = hit ; Y = miss).");
    assert_eq!(sols.len(), 1);
    assert_eq!(sols[0].get("X").unwrap().to_string(), "1");
    assert_eq!(sols[0].get("Y").unwrap().to_string(), "hit");
}

#[test]
fn test_if_then_without_else_fails_when_condition_fails() {
    let mut m = machine_with("c(1).");
    assert!(solutions(&mut m, "(c(2) -> true).").is_empty());
}

#[test]
fn test_negation_scopes() {
    let mut m = machine_with("p(1).");
    assert_eq!(solutions(&mut m, "\\+ fail.").len(), 1);
    assert!(solutions(&mut m, "\\+ p(1).").is_empty());
    // no bindings escape a failed negation
    let sols = solutions(&mut m, "\\+ (p(X), X = 2).");
    assert_eq!(sols.len(), 1);
}

#[test]
fn test_repeat_with_cut_terminates() {
    let mut m = machine_with("counter(3).");
    let sols = solutions(&mut m, "repeat, counter(N), !.");
    assert_eq!(sols.len(), 1);
    assert_eq!(sols[0].get("N").unwrap().to_string(), "3");
}

#[test]
fn test_forall() {
    let mut m = machine_with("n(1). n(2). n(3).");
    assert_eq!(solutions(&mut m, "forall(n(X), X > 0).").len(), 1);
    assert!(solutions(&mut m, "forall(n(X), X > 1).").is_empty());
}

#[test]
fn test_deep_backtracking_restores_bindings() {
    let mut m = machine_with(
        "pick(X, Y) :- a(X), b(Y), X \\= Y.
         a(1). a(2). b(1). b(2).",
    );
    let sols = solutions(&mut m, "pick(X, Y).");
    let got: Vec<(String, String)> = sols
        .iter()
        .map(|s| (s.get("X").unwrap().to_string(), s.get("Y").unwrap().to_string()))
        .collect();
    assert_eq!(
        got,
        vec![("1".to_string(), "2".to_string()), ("2".to_string(), "1".to_string())]
    );
}
