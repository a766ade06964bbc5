//! List resolution end to end: append over the standard two-clause program,
//! head matching of proper and partial lists, and solution order.

mod common;

use common::{machine_with, solutions, values};

const APP: &str = "app([], L, L). app([H|T], L, [H|R]) :- app(T, L, R).";

#[test]
fn test_append_enumerates_all_splits() {
    let mut m = machine_with(APP);
    let sols = solutions(&mut m, "app(X, Y, [1, 2, 3]).");
    let got: Vec<(String, String)> = sols
        .iter()
        .map(|s| (s.get("X").unwrap().to_string(), s.get("Y").unwrap().to_string()))
        .collect();
    assert_eq!(
        got,
        vec![
            ("[]".to_string(), "[1,2,3]".to_string()),
            ("[1]".to_string(), "[2,3]".to_string()),
            ("[1,2]".to_string(), "[3]".to_string()),
            ("[1,2,3]".to_string(), "[]".to_string()),
        ]
    );
}

#[test]
fn test_append_forward() {
    let mut m = machine_with(APP);
    assert_eq!(values(&mut m, "app([a], [b, c], Z).", "Z"), vec!["[a,b,c]"]);
}

#[test]
fn test_append_checks() {
    let mut m = machine_with(APP);
    assert_eq!(solutions(&mut m, "app([1], [2], [1, 2]).").len(), 1);
    assert!(solutions(&mut m, "app([1], [2], [2, 1]).").is_empty());
}

#[test]
fn test_member_via_clauses() {
    let mut m = machine_with("mem(X, [X|_]). mem(X, [_|T]) :- mem(X, T).");
    assert_eq!(values(&mut m, "mem(X, [a, b, c]).", "X"), vec!["a", "b", "c"]);
    assert_eq!(solutions(&mut m, "mem(b, [a, b, c]).").len(), 1);
    assert!(solutions(&mut m, "mem(z, [a, b, c]).").is_empty());
}

#[test]
fn test_reverse_with_accumulator() {
    let mut m = machine_with(
        "rev(L, R) :- rev_(L, [], R).
         rev_([], A, A).
         rev_([H|T], A, R) :- rev_(T, [H|A], R).",
    );
    assert_eq!(values(&mut m, "rev([1, 2, 3], R).", "R"), vec!["[3,2,1]"]);
}

#[test]
fn test_nested_list_heads() {
    let mut m = machine_with("first_of_pairs([[X, _]|_], X).");
    assert_eq!(values(&mut m, "first_of_pairs([[a, 1], [b, 2]], F).", "F"), vec!["a"]);
}

#[test]
fn test_partial_list_argument() {
    let mut m = machine_with(APP);
    // the third argument stays open; solutions instantiate it
    let sols = solutions(&mut m, "app([1, 2], Y, Z), Y = [3].");
    assert_eq!(sols.len(), 1);
    assert_eq!(sols[0].get("Z").unwrap().to_string(), "[1,2,3]");
}
