//! Atom and number text builtins, round trips included.

mod common;

use common::{error_of, solutions, values};
use horn::Machine;

#[test]
fn test_atom_length() {
    let mut m = Machine::new();
    assert_eq!(values(&mut m, "atom_length(hello, N).", "N"), vec!["5"]);
    assert_eq!(values(&mut m, "atom_length('', N).", "N"), vec!["0"]);
}

#[test]
fn test_atom_concat_modes() {
    let mut m = Machine::new();
    assert_eq!(values(&mut m, "atom_concat(foo, bar, X).", "X"), vec!["foobar"]);
    let sols = solutions(&mut m, "atom_concat(X, Y, ab).");
    let got: Vec<(String, String)> = sols
        .iter()
        .map(|s| (s.get("X").unwrap().to_string(), s.get("Y").unwrap().to_string()))
        .collect();
    assert_eq!(
        got,
        vec![
            ("".to_string(), "ab".to_string()),
            ("a".to_string(), "b".to_string()),
            ("ab".to_string(), "".to_string()),
        ]
    );
}

#[test]
fn test_sub_atom_modes() {
    let mut m = Machine::new();
    assert_eq!(values(&mut m, "sub_atom(abcde, 1, 3, _, S).", "S"), vec!["bcd"]);
    // enumerate all substrings of length 2
    assert_eq!(
        values(&mut m, "sub_atom(abc, _, 2, _, S).", "S"),
        vec!["ab", "bc"]
    );
}

#[test]
fn test_atom_chars_round_trip() {
    let mut m = Machine::new();
    let sols = solutions(&mut m, "atom_chars(prolog, L), atom_chars(A, L).");
    assert_eq!(sols[0].get("A").unwrap().to_string(), "prolog");
    assert_eq!(sols[0].get("L").unwrap().to_string(), "[p,r,o,l,o,g]");
}

#[test]
fn test_atom_codes_round_trip() {
    let mut m = Machine::new();
    let sols = solutions(&mut m, "atom_codes(ab, L), atom_codes(A, L).");
    assert_eq!(sols[0].get("A").unwrap().to_string(), "ab");
}

#[test]
fn test_number_round_trips() {
    let mut m = Machine::new();
    let sols = solutions(&mut m, "number_chars(42, L), number_chars(N, L).");
    assert_eq!(sols[0].get("N").unwrap().to_string(), "42");
    let sols = solutions(&mut m, "number_codes(2.5, L), number_codes(N, L).");
    assert_eq!(sols[0].get("N").unwrap().to_string(), "2.5");
    assert_eq!(values(&mut m, "number_chars(N, ['4', '2']).", "N"), vec!["42"]);
}

#[test]
fn test_char_code() {
    let mut m = Machine::new();
    assert_eq!(values(&mut m, "char_code(a, C).", "C"), vec!["97"]);
    assert_eq!(values(&mut m, "char_code(Ch, 0'z).", "Ch"), vec!["z"]);
}

#[test]
fn test_number_syntax_errors() {
    let mut m = Machine::new();
    let err = error_of(&mut m, "number_chars(N, [a, b]).");
    assert!(err.contains("syntax_error"), "got {}", err);
}

#[test]
fn test_type_errors() {
    let mut m = Machine::new();
    let err = error_of(&mut m, "atom_length(f(x), _).");
    assert!(err.contains("type_error"), "got {}", err);
    let err = error_of(&mut m, "atom_concat(f(x), a, _).");
    assert!(err.contains("type_error"), "got {}", err);
}

#[test]
fn test_double_quotes_flag_round_trip() {
    let mut m = Machine::new();
    // default: codes
    assert_eq!(solutions(&mut m, "\"ab\" = [0'a, 0'b].").len(), 1);
    m.consult(":- set_prolog_flag(double_quotes, chars).").unwrap();
    assert_eq!(solutions(&mut m, "\"ab\" = [a, b].").len(), 1);
    m.consult(":- set_prolog_flag(double_quotes, atom).").unwrap();
    assert_eq!(solutions(&mut m, "\"ab\" = ab.").len(), 1);
}
