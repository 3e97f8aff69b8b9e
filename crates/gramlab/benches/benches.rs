use std::{env, hint::black_box, path::PathBuf};

use criterion::{criterion_group, criterion_main, Criterion};
use gramlab::{
    first_sets::{FirstSets, FollowSets},
    grammar::Grammar,
    lalr, ll1::LL1Table, lr0, lr1, normalize::Normalization,
};

criterion_main!(benches);
criterion_group!(benches, bench_arithmetic, bench_lr_families, bench_normalize);

fn bench_arithmetic(c: &mut Criterion) {
    bench_tables(c, "arithmetic");
    bench_tables(c, "expression");
}

fn bench_lr_families(c: &mut Criterion) {
    bench_tables(c, "assignment");
    bench_tables(c, "lr1_not_lalr");
    bench_tables(c, "ambiguous");
}

fn bench_normalize(c: &mut Criterion) {
    let grammar = load("expression");
    c.bench_function("normalize", |b| {
        b.iter(|| black_box(Normalization::run(&grammar)));
    });
}

fn load(grammar_name: &str) -> Grammar {
    let project_root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .expect("missing environment variable: `CARGO_MANIFEST_DIR'");
    Grammar::from_file(project_root.join(format!("tests/{}.grammar", grammar_name))).unwrap()
}

fn bench_tables(c: &mut Criterion, grammar_name: &str) {
    let grammar = load(grammar_name);

    let mut group = c.benchmark_group(grammar_name);
    group.bench_function("LL(1)", |b| {
        b.iter(|| {
            let first = FirstSets::compute(&grammar);
            let follow = FollowSets::compute(&grammar, &first);
            black_box(LL1Table::generate(&grammar, &first, &follow))
        });
    });
    group.bench_function("SLR(1)", |b| {
        b.iter(|| black_box(lr0::slr1(&grammar)));
    });
    group.bench_function("LR(1)", |b| {
        b.iter(|| black_box(lr1::lr1(&grammar)));
    });
    group.bench_function("LALR(1)", |b| {
        b.iter(|| black_box(lalr::lalr1(&grammar)));
    });
    group.finish();
}
