//! Whole-pipeline tests: source text through lexer, parser and
//! evaluator, asserting on the resulting environment and exit codes.

use std::fs;

use tempfile::tempdir;

use fralgo_eval::{Interp, Value};
use fralgo_util::{EXIT_FATAL, EXIT_OK, EXIT_USAGE};

fn run(source: &str) -> Interp {
    let mut interp = Interp::new();
    let program = fralgo_par::parse(source).expect("parse failed");
    interp.run_program(&program).expect("run failed");
    interp
}

fn global(interp: &Interp, name: &str) -> Value {
    let loc = interp.env.resolve_var("main", name).expect("unresolved");
    interp.env.slot(&loc).value.clone()
}

#[test]
fn test_full_program_with_functions_and_arrays() {
    let source = "\
Tableau notes[4] en Entier
Variables i, total en Entier
Variable moyenne en Numérique

Fonction somme(t[] en Entier) en Entier
 Variables j, s en Entier
 s ← 0
 Pour j ← 0 à Taille(t) - 1
  s ← s + t[j]
 j Suivant
 Retourne s
FinFonction

Début
 Pour i ← 0 à 4
  notes[i] ← (i + 1) * 2
 i Suivant
 total ← somme(notes)
 moyenne ← Numérique(total) / 5.0
Fin
";
    let interp = run(source);
    assert_eq!(global(&interp, "total"), Value::int(2 + 4 + 6 + 8 + 10));
    assert_eq!(global(&interp, "moyenne"), Value::float(6.0));
}

#[test]
fn test_array_of_records() {
    let source = "\
Structure Personne
 nom en Chaîne
 age en Entier
FinStructure
Tableau annuaire[1] en Personne
annuaire[0].nom ← \"Ada\"
annuaire[0].age ← 36
annuaire[1] ← \"Alan\", 41
";
    let interp = run(source);
    match global(&interp, "annuaire") {
        Value::Array(array) => {
            match &array.data[0] {
                Value::Record(r) => {
                    assert_eq!(r.fields["nom"], Value::string("Ada"));
                    assert_eq!(r.fields["age"], Value::int(36));
                }
                other => panic!("unexpected: {other:?}"),
            }
            match &array.data[1] {
                Value::Record(r) => assert_eq!(r.fields["nom"], Value::string("Alan")),
                other => panic!("unexpected: {other:?}"),
            }
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_nested_record_paths() {
    let source = "\
Structure Adresse
 ville en Chaîne
FinStructure
Structure Personne
 nom en Chaîne
 adresse en Adresse
FinStructure
Variable p en Personne
p.nom ← \"Blaise\"
p.adresse.ville ← \"Clermont\"
";
    let interp = run(source);
    match global(&interp, "p") {
        Value::Record(r) => match &r.fields["adresse"] {
            Value::Record(a) => assert_eq!(a.fields["ville"], Value::string("Clermont")),
            other => panic!("unexpected: {other:?}"),
        },
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_string_processing_pipeline() {
    let source = "\
Variable phrase en Chaîne
Variable mot en Chaîne
phrase ← \"bonjour\" & \" \" & \"monde\"
mot ← Extraire(phrase, Trouve(phrase, \"monde\"), 5)
";
    let interp = run(source);
    assert_eq!(global(&interp, "mot"), Value::string("monde"));
}

#[test]
fn test_run_file_exit_codes() {
    let dir = tempdir().unwrap();

    let ok = dir.path().join("ok.algo");
    fs::write(&ok, "Variable x en Entier\nDébut\n x ← 1\nFin\n").unwrap();
    assert_eq!(fralgo_drv::run_file(&ok, &[]), EXIT_OK);

    let fatal = dir.path().join("fatal.algo");
    fs::write(&fatal, "Début\n Ecrire 1 / 0\nFin\n").unwrap();
    assert_eq!(fralgo_drv::run_file(&fatal, &[]), EXIT_FATAL);

    let syntax = dir.path().join("syntaxe.algo");
    fs::write(&syntax, "Variable x en\n").unwrap();
    assert_eq!(fralgo_drv::run_file(&syntax, &[]), EXIT_FATAL);

    let missing = dir.path().join("absent.algo");
    assert_eq!(fralgo_drv::run_file(&missing, &[]), EXIT_USAGE);
}

#[test]
fn test_run_file_without_trailing_newline() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("brut.algo");
    fs::write(&path, "Variable x en Entier\nDébut\n x ← 1\nFin").unwrap();
    assert_eq!(fralgo_drv::run_file(&path, &[]), EXIT_OK);
}
