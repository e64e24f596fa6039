//! Binary-level edge cases: output channels, imports, error surfaces.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const FATAL: i32 = 666 % 256;

fn fralgo() -> Command {
    Command::cargo_bin("fralgo").expect("binary built")
}

#[test]
fn test_print_without_newline_joins_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prog.algo");
    fs::write(&path, "Début\n Ecrire \"a\" \\\n Ecrire \"b\"\nFin\n").unwrap();

    fralgo()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::eq("ab\n"));
}

#[test]
fn test_print_err_goes_to_stderr() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prog.algo");
    fs::write(&path, "Début\n EcrireErr \"attention\"\n Ecrire \"ok\"\nFin\n").unwrap();

    fralgo()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::eq("ok\n"))
        .stderr(predicate::eq("attention\n"));
}

#[test]
fn test_boolean_prints_french() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prog.algo");
    fs::write(&path, "Début\n Ecrire 1 < 2, 2 < 1\nFin\n").unwrap();

    fralgo()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::eq("VRAI FAUX\n"));
}

#[test]
fn test_running_a_library_file_directly() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lib.algo");
    fs::write(
        &path,
        "Librairie\nVariable v en Entier\nInitialise\nv ← 3\nEcrire v\n",
    )
    .unwrap();

    fralgo()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::eq("3\n"));
}

#[test]
fn test_nested_imports() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("bas.algo"),
        "Librairie\nFonction g() en Entier\n Retourne 2\nFinFonction\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("haut.algo"),
        "Librairie\nImporter \"bas\"\nFonction f() en Entier\n Retourne bas:g() * 10\nFinFonction\n",
    )
    .unwrap();
    let main = dir.path().join("prog.algo");
    fs::write(&main, "Importer \"haut\"\nDébut\n Ecrire haut:f()\nFin\n").unwrap();

    fralgo()
        .arg(&main)
        .assert()
        .success()
        .stdout(predicate::eq("20\n"));
}

#[test]
fn test_missing_import_is_fatal() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("prog.algo");
    fs::write(&main, "Importer \"fantôme\"\nDébut\nFin\n").unwrap();

    fralgo()
        .arg(&main)
        .assert()
        .failure()
        .code(FATAL)
        .stderr(predicate::str::contains("fichier `fantôme.algo` non trouvé"));
}

#[test]
fn test_recursion_limit_is_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prog.algo");
    fs::write(
        &path,
        "Fonction f(n en Entier) en Entier\n Retourne f(n)\nFinFonction\nDébut\n Ecrire f(1)\nFin\n",
    )
    .unwrap();

    fralgo()
        .arg(&path)
        .assert()
        .failure()
        .code(FATAL)
        .stderr(predicate::str::contains("excès de récursivité"));
}

#[test]
fn test_undeclared_variable_is_fatal_with_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prog.algo");
    fs::write(&path, "Début\n Ecrire inconnue\nFin\n").unwrap();

    fralgo()
        .arg(&path)
        .assert()
        .failure()
        .code(FATAL)
        .stderr(predicate::str::contains("Variable >inconnue< non déclarée"))
        .stderr(predicate::str::contains("Ligne 2"));
}

#[test]
fn test_unclosed_channel_does_not_block_exit() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("restes.txt");
    let path = dir.path().join("prog.algo");
    fs::write(
        &path,
        format!(
            "Début\n Ouvrir \"{}\" sur 1 en Ecriture\n EcrireFichier 1, \"x\"\nFin\n",
            data.display()
        ),
    )
    .unwrap();

    fralgo().arg(&path).assert().success();
}

#[test]
fn test_invalid_character_is_fatal_outside_the_shell() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prog.algo");
    fs::write(&path, "Début\n Ecrire 1 $ 2\nFin\n").unwrap();

    fralgo()
        .arg(&path)
        .assert()
        .failure()
        .code(FATAL)
        .stderr(predicate::str::contains("caractère invalide"))
        .stderr(predicate::str::contains("ligne 2"));
}

#[test]
fn test_rep_points_at_source_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prog.algo");
    fs::write(&path, "Début\n Ecrire _REP\nFin\n").unwrap();

    let canonical = dir.path().canonicalize().unwrap();
    fralgo()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::eq(format!("{}\n", canonical.display())));
}

#[test]
fn test_sleep_accepts_zero() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prog.algo");
    fs::write(&path, "Début\n Dormir(0)\n Ecrire \"fini\"\nFin\n").unwrap();

    fralgo()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::eq("fini\n"));
}
