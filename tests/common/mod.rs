//! Shared helpers for the integration suites.
#![allow(dead_code)]

use horn::{Bindings, Machine};

/// A machine with `program` consulted.
pub fn machine_with(program: &str) -> Machine {
    let mut m = Machine::new();
    m.consult(program).expect("test program must consult");
    m
}

/// All solutions of `query`, panicking on errors.
pub fn solutions(m: &mut Machine, query: &str) -> Vec<Bindings> {
    m.query(query)
        .expect("test query must parse")
        .collect::<Result<Vec<_>, _>>()
        .expect("test query must not throw")
}

/// The rendered values a variable takes across all solutions, in order.
pub fn values(m: &mut Machine, query: &str, var: &str) -> Vec<String> {
    solutions(m, query)
        .iter()
        .map(|s| s.get(var).expect("variable must be bound").to_string())
        .collect()
}

/// The error term of a query expected to throw.
pub fn error_of(m: &mut Machine, query: &str) -> String {
    let mut sols = m.query(query).expect("test query must parse");
    match sols.next() {
        Some(Err(e)) => e.term().to_string(),
        other => panic!("expected an error, got {:?}", other.map(|r| r.is_ok())),
    }
}
