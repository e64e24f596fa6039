//! Lexer throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fralgo_lex::tokenize;

fn sample_program(repeats: usize) -> String {
    let unit = "\
Variable total en Entier
Variable moyenne en Numérique
Tableau notes[9] en Entier
Début
  total ← 0
  Pour i ← 0 à 9
    notes[i] ← i * 2
    total ← total + notes[i]
  i Suivant
  moyenne ← Numérique(total) / 10.0
  Si moyenne >= 10.0 Alors
    Ecrire \"admis :\", moyenne
  Sinon
    Ecrire \"ajourné\"
  FinSi
Fin
";
    unit.repeat(repeats)
}

fn bench_lexer(c: &mut Criterion) {
    let small = sample_program(1);
    let large = sample_program(100);

    c.bench_function("lex_small_program", |b| {
        b.iter(|| tokenize(black_box(&small)).unwrap())
    });

    c.bench_function("lex_large_program", |b| {
        b.iter(|| tokenize(black_box(&large)).unwrap())
    });
}

criterion_group!(benches, bench_lexer);
criterion_main!(benches);
