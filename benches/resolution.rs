//! Benchmarks for the resolution core: unification, clause matching over
//! growing databases, and deep deterministic recursion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use horn::engine::env::Env;
use horn::{Machine, Term};

fn bench_unification(c: &mut Criterion) {
    let mut group = c.benchmark_group("unification");

    group.bench_function("flat_compound", |b| {
        let lhs = Term::compound("f", (0..16).map(Term::Integer).collect());
        b.iter(|| {
            let mut env = Env::new();
            let args: Vec<Term> = (0..16).map(|_| Term::fresh_var()).collect();
            let rhs = Term::compound("f", args);
            assert!(env.unify(black_box(&lhs), black_box(&rhs), false));
        });
    });

    group.bench_function("deep_nesting", |b| {
        let mut lhs = Term::atom("leaf");
        for _ in 0..64 {
            lhs = Term::compound("n", vec![lhs]);
        }
        let lhs = lhs;
        b.iter(|| {
            let mut env = Env::new();
            // the same spine with a variable at the bottom
            let mut rhs = Term::fresh_var();
            for _ in 0..64 {
                rhs = Term::compound("n", vec![rhs]);
            }
            assert!(env.unify(black_box(&lhs), black_box(&rhs), false));
        });
    });

    group.finish();
}

fn bench_clause_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for &n in &[10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("fact_scan", n), &n, |b, &n| {
            let mut m = Machine::new();
            let mut program = String::new();
            for i in 0..n {
                program.push_str(&format!("f({}). ", i));
            }
            m.consult(&program).unwrap();
            let query = format!("f({}).", n - 1);
            b.iter(|| {
                let count = m.query(black_box(&query)).unwrap().count();
                assert_eq!(count, 1);
            });
        });
    }

    group.bench_function("append_split", |b| {
        let mut m = Machine::new();
        m.consult("app([], L, L). app([H|T], L, [H|R]) :- app(T, L, R).").unwrap();
        let items: Vec<String> = (0..32).map(|i| i.to_string()).collect();
        let query = format!("app(X, Y, [{}]).", items.join(","));
        b.iter(|| {
            let count = m.query(black_box(&query)).unwrap().count();
            assert_eq!(count, 33);
        });
    });

    group.bench_function("deep_recursion", |b| {
        let mut m = Machine::new();
        m.consult("count(0). count(N) :- N > 0, M is N - 1, count(M).").unwrap();
        b.iter(|| {
            let count = m.query(black_box("count(2000).")).unwrap().count();
            assert_eq!(count, 1);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_unification, bench_clause_resolution);
criterion_main!(benches);
