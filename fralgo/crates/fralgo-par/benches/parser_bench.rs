//! Parser throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fralgo_par::parse;

fn sample_program(inner_repeats: usize) -> String {
    let mut src = String::from(
        "Variable total en Entier\n\
         Tableau notes[9] en Entier\n\
         Variable i en Entier\n\
         Structure Eleve\n\
           nom en Chaîne\n\
           note en Entier\n\
         FinStructure\n\
         Fonction double(n en Entier) en Entier\n\
           Retourne n * 2\n\
         FinFonction\n\
         Début\n",
    );
    for _ in 0..inner_repeats {
        src.push_str(
            "  total ← 0\n\
             \x20 Pour i ← 0 à 9\n\
             \x20   notes[i] ← double(i) + 1\n\
             \x20   total ← total + notes[i]\n\
             \x20 i Suivant\n\
             \x20 Si total > 50 Alors\n\
             \x20   Ecrire \"beaucoup :\", total\n\
             \x20 Sinon\n\
             \x20   Ecrire total\n\
             \x20 FinSi\n",
        );
    }
    src.push_str("Fin\n");
    src
}

fn bench_parser(c: &mut Criterion) {
    let small = sample_program(1);
    let large = sample_program(100);

    c.bench_function("parse_small_program", |b| {
        b.iter(|| parse(black_box(&small)).unwrap())
    });

    c.bench_function("parse_large_program", |b| {
        b.iter(|| parse(black_box(&large)).unwrap())
    });
}

criterion_group!(benches, bench_parser);
criterion_main!(benches);
