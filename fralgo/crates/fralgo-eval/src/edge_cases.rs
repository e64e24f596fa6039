//! End-to-end evaluator tests: parse then run, inspect the environment.

#![cfg(test)]

use fralgo_util::AlgoError;

use crate::eval::Interp;
use crate::values::Value;

fn interp_for(source: &str) -> Interp {
    let mut interp = Interp::new();
    let program = fralgo_par::parse(source).expect("parse failed");
    interp.run_program(&program).expect("run failed");
    interp
}

fn run_err(source: &str) -> AlgoError {
    let mut interp = Interp::new();
    let program = fralgo_par::parse(source).expect("parse failed");
    interp.run_program(&program).expect_err("run should fail")
}

/// Runs statements and returns the echo of the final expression.
fn echo(source: &str) -> Value {
    let mut interp = Interp::new();
    let program = fralgo_par::parse(source).expect("parse failed");
    interp
        .run_program(&program)
        .expect("run failed")
        .expect("no value to echo")
}

fn global(interp: &Interp, name: &str) -> Value {
    let loc = interp.env.resolve_var("main", name).expect("unresolved");
    interp.env.slot(&loc).value.clone()
}

#[test]
fn test_scalar_assignment() {
    let interp = interp_for("Variable x en Entier\nx ← 5\n");
    assert_eq!(global(&interp, "x"), Value::int(5));
}

#[test]
fn test_main_block_program() {
    let interp = interp_for("Variable x en Entier\nDébut\n x ← 5\nFin");
    assert_eq!(global(&interp, "x"), Value::int(5));
}

#[test]
fn test_type_is_stable_before_and_after_assignment() {
    assert_eq!(echo("Variable x en Entier\nType(x)\n"), Value::string("Entier"));
    assert_eq!(
        echo("Variable x en Entier\nx ← 3\nType(x)\n"),
        Value::string("Entier")
    );
    assert_eq!(
        echo("Variable c en Caractère*8\nType(c)\n"),
        Value::string("Caractère*8")
    );
}

#[test]
fn test_integer_promotes_into_float_slot() {
    let interp = interp_for("Variable n en Numérique\nn ← 2\n");
    assert_eq!(global(&interp, "n"), Value::float(2.0));
}

#[test]
fn test_integer_slot_rejects_string() {
    let err = run_err("Variable x en Entier\nx ← \"a\"\n");
    assert!(matches!(err, AlgoError::BadType(_)));
}

#[test]
fn test_undefined_read() {
    let err = run_err("Variable x en Entier\nEcrire x\n");
    assert!(matches!(err, AlgoError::Undefined(_)));
}

#[test]
fn test_redeclaration() {
    let err = run_err("Variable x en Entier\nVariable x en Chaîne\n");
    assert!(matches!(err, AlgoError::Redeclared(_)));
}

#[test]
fn test_constant_is_read_only() {
    let err = run_err("Constante PI ← 3.14\nPI ← 1.0\n");
    match err {
        AlgoError::ReadOnly(name) => assert_eq!(name, "PI"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_sized_char_pads_on_write() {
    assert_eq!(
        echo("Variable c en Caractère*4\nc ← \"ab\"\nLongueur(c)\n"),
        Value::int(4)
    );
    assert_eq!(
        echo("Variable c en Caractère*2\nc ← \"abcdef\"\nc\n"),
        Value::string("ab")
    );
}

#[test]
fn test_array_fill_with_for_loop() {
    let interp = interp_for(
        "Tableau T[2] en Entier\nVariable i en Entier\nPour i ← 0 à 2\n T[i] ← i + 1\ni Suivant\n",
    );
    match global(&interp, "T") {
        Value::Array(array) => {
            assert_eq!(array.data, vec![Value::int(1), Value::int(2), Value::int(3)]);
        }
        other => panic!("unexpected: {other:?}"),
    }
    // The loop variable ends one step past the bound.
    assert_eq!(global(&interp, "i"), Value::int(3));
}

#[test]
fn test_array_display_format() {
    assert_eq!(
        echo("Tableau T[2] en Entier\nVariable i en Entier\nPour i ← 0 à 2\n T[i] ← i + 1\ni Suivant\nChaîne(T)\n"),
        Value::string("[1,2,3]")
    );
}

#[test]
fn test_index_out_of_range() {
    let err = run_err("Tableau T[2] en Entier\nT[3] ← 1\n");
    assert!(matches!(err, AlgoError::IndexOutOfRange(3)));
}

#[test]
fn test_taille_and_longueur() {
    assert_eq!(echo("Tableau T[4] en Entier\nTaille(T)\n"), Value::int(5));
    assert_eq!(
        echo("Tableau T[4] en Entier\nT[0] ← 1\nLongueur(T)\n"),
        Value::int(1)
    );
}

#[test]
fn test_redim_on_undimensioned_array() {
    assert_eq!(
        echo("Tableau T[] en Chaîne\nRedim T[0]\nT[0] ← \"X\"\nLongueur(T)\n"),
        Value::int(1)
    );
}

#[test]
fn test_redim_negative_fails() {
    let err = run_err("Tableau T[2] en Entier\nRedim T[0 - 2]\n");
    assert!(matches!(err, AlgoError::ResizeFailed));
}

#[test]
fn test_multidimensional_array() {
    assert_eq!(
        echo("Tableau G[1,1] en Entier\nG[0,1] ← 5\nG[0,1]\n"),
        Value::int(5)
    );
}

#[test]
fn test_array_literal_assignment() {
    let interp = interp_for("Tableau T[2] en Entier\nT ← [1, 2, 3]\n");
    match global(&interp, "T") {
        Value::Array(array) => {
            assert_eq!(array.data, vec![Value::int(1), Value::int(2), Value::int(3)]);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_array_literal_mixed_types_fail() {
    let err = run_err("Tableau T[2] en Entier\nT ← [1, \"a\", 3]\n");
    assert!(matches!(err, AlgoError::BadType(_)));
}

#[test]
fn test_array_literal_must_be_rectangular() {
    let err = run_err("Tableau T[1,1] en Entier\nT ← [[1, 2], [3]]\n");
    assert!(matches!(err, AlgoError::BadType(_)));
}

#[test]
fn test_recursive_structure_field() {
    let source = "Structure N\n v en Entier\n suiv en N\nFinStructure\nVariable a en N\na.v ← 1\n";
    let interp = interp_for(source);
    match global(&interp, "a") {
        Value::Record(record) => {
            assert_eq!(record.fields["v"], Value::int(1));
            assert_eq!(record.fields["suiv"], Value::Nothing);
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(
        echo(&format!("{source}Type(a.suiv)\n")),
        Value::string("N")
    );
}

#[test]
fn test_record_tuple_fill_and_field_access() {
    let source = "Structure Point\n x en Entier\n y en Entier\nFinStructure\nVariable p en Point\np ← 3, 4\n";
    assert_eq!(echo(&format!("{source}p.x + p.y\n")), Value::int(7));
}

#[test]
fn test_record_tuple_arity_mismatch() {
    let err = run_err(
        "Structure Point\n x en Entier\n y en Entier\nFinStructure\nVariable p en Point\np ← 3, 4, 5\n",
    );
    assert!(matches!(err, AlgoError::InvalidValueCount(_)));
}

#[test]
fn test_unknown_structure_field() {
    let err = run_err(
        "Structure Point\n x en Entier\n y en Entier\nFinStructure\nVariable p en Point\np.z ← 1\n",
    );
    assert!(matches!(err, AlgoError::UnknownField(_)));
}

#[test]
fn test_function_call_and_recursion() {
    let source = "\
Fonction fact(n en Entier) en Entier
 Si n <= 1 Alors
  Retourne 1
 FinSi
 Retourne n * fact(n - 1)
FinFonction
fact(10)
";
    assert_eq!(echo(source), Value::int(3_628_800));
}

#[test]
fn test_recursion_limit() {
    let source = "Fonction f(n en Entier) en Entier\n Retourne f(n)\nFinFonction\nf(1)\n";
    let err = run_err(source);
    assert!(matches!(err, AlgoError::RecursionLimit));
}

#[test]
fn test_function_must_return_a_value() {
    let source = "Fonction f() en Entier\n Variable x en Entier\n x ← 1\nFinFonction\nf()\n";
    let err = run_err(source);
    assert!(err.to_string().contains("aucune valeur retournée"));
}

#[test]
fn test_procedure_must_not_return_a_value() {
    let source = "Procédure p()\n Retourne 1\nFinProcédure\np()\n";
    let err = run_err(source);
    assert!(err.to_string().contains("Retourne non autorisé"));
}

#[test]
fn test_call_arity_mismatch() {
    let source = "Fonction f(n en Entier) en Entier\n Retourne n\nFinFonction\nf(1, 2)\n";
    let err = run_err(source);
    assert!(matches!(
        err,
        AlgoError::InvalidParameterCount {
            actual: 2,
            expected: 1
        }
    ));
}

#[test]
fn test_parameter_type_checked() {
    let source = "Fonction f(n en Entier) en Entier\n Retourne n\nFinFonction\nf(\"a\")\n";
    let err = run_err(source);
    assert!(err.to_string().contains("Type invalide"));
}

#[test]
fn test_quelconque_accepts_anything() {
    let source = "Fonction id(x en Quelconque) en Quelconque\n Retourne x\nFinFonction\nid(5) + 1\n";
    assert_eq!(echo(source), Value::int(6));
    assert_eq!(
        echo("Variable q en Quelconque\nq ← 5\nType(q)\n"),
        Value::string("Entier")
    );
}

#[test]
fn test_reference_parameter_mutates_caller_array() {
    let source = "\
Tableau T[] en Chaîne
Procédure remplir(&t[] en Chaîne)
 Redim t[0]
 t[0] ← \"X\"
FinProcédure
remplir(&T)
";
    let interp = interp_for(source);
    match global(&interp, "T") {
        Value::Array(array) => {
            assert_eq!(array.data, vec![Value::string("X")]);
            assert_eq!(array.assigned_count(), 1);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_by_value_parameter_copies() {
    let source = "\
Variable x en Entier
x ← 1
Procédure p(x en Entier)
 x ← 99
FinProcédure
p(x)
";
    let interp = interp_for(source);
    assert_eq!(global(&interp, "x"), Value::int(1));
}

#[test]
fn test_while_with_false_condition_runs_zero_times() {
    let interp =
        interp_for("Variable i en Entier\ni ← 0\nTantQue FAUX\n i ← 9\nFinTantQue\n");
    assert_eq!(global(&interp, "i"), Value::int(0));
}

#[test]
fn test_for_descending_bound_runs_zero_times() {
    let source = "\
Variables i, c en Entier
c ← 0
Pour i ← 0 à -10
 c ← c + 1
i Suivant
";
    let interp = interp_for(source);
    assert_eq!(global(&interp, "c"), Value::int(0));
    assert_eq!(global(&interp, "i"), Value::int(0));
}

#[test]
fn test_for_with_negative_step() {
    let source = "\
Variables i, s en Entier
s ← 0
Pour i ← 5 à 1 Pas -2
 s ← s + i
i Suivant
";
    let interp = interp_for(source);
    assert_eq!(global(&interp, "s"), Value::int(5 + 3 + 1));
}

#[test]
fn test_continue_and_exit() {
    let source = "\
Variables i, s en Entier
s ← 0
Pour i ← 1 à 10
 Si i = 3 Alors
  Continuer
 FinSi
 Si i = 6 Alors
  Sortir
 FinSi
 s ← s + i
i Suivant
";
    let interp = interp_for(source);
    assert_eq!(global(&interp, "s"), Value::int(1 + 2 + 4 + 5));
}

#[test]
fn test_for_loop_variable_names_must_match() {
    let err = run_err("Variables i, j en Entier\nPour i ← 0 à 2\nj Suivant\n");
    assert!(err.to_string().contains("Suivant"));
}

#[test]
fn test_division_rules() {
    assert_eq!(echo("7 / 2\n"), Value::int(3));
    assert_eq!(echo("-7 / 2\n"), Value::int(-4));
    assert_eq!(echo("7 / 2.0\n"), Value::float(3.5));
    assert!(matches!(run_err("1 / 0\n"), AlgoError::ZeroDivide));
    assert_eq!(echo("10 DP 5\n"), Value::boolean(true));
}

#[test]
fn test_concat_and_comparisons() {
    assert_eq!(echo("\"a\" & \"b\"\n"), Value::string("ab"));
    assert_eq!(echo("1 + 2 = 3\n"), Value::boolean(true));
    assert_eq!(echo("NON(1 > 2)\n"), Value::boolean(true));
    assert_eq!(echo("VRAI ET FAUX\n"), Value::boolean(false));
    assert_eq!(echo("VRAI OUX VRAI\n"), Value::boolean(false));
}

#[test]
fn test_string_builtins() {
    assert_eq!(echo("Extraire(\"bonjour\", 4, 4)\n"), Value::string("jour"));
    assert_eq!(echo("Gauche(\"bonjour\", 3)\n"), Value::string("bon"));
    assert_eq!(echo("Droite(\"bonjour\", 4)\n"), Value::string("jour"));
    assert_eq!(echo("Trouve(\"bonjour\", \"jour\")\n"), Value::int(4));
    assert_eq!(echo("Trouve(\"bonjour\", \"z\")\n"), Value::int(0));
    assert_eq!(echo("Car(65)\n"), Value::string("A"));
    assert_eq!(echo("CodeCar(\"é\")\n"), Value::int(0xE9));
    assert_eq!(echo("Longueur(\"été\")\n"), Value::int(3));
}

#[test]
fn test_conversions() {
    assert_eq!(echo("Entier(\"42\")\n"), Value::int(42));
    assert_eq!(echo("Entier(3.9)\n"), Value::int(3));
    assert_eq!(echo("Numérique(\"2.5\")\n"), Value::float(2.5));
    assert_eq!(echo("Chaîne(5)\n"), Value::string("5"));
    assert_eq!(echo("Chaîne(VRAI)\n"), Value::string("VRAI"));
    assert_eq!(echo("Booléen(\"VRAI\")\n"), Value::boolean(true));
    assert!(matches!(run_err("Entier(\"abc\")\n"), AlgoError::BadType(_)));
}

#[test]
fn test_tables() {
    let decl = "Table t en Chaîne, Entier\nt[\"a\"] ← 1\nt[\"b\"] ← 2\n";
    assert_eq!(echo(&format!("{decl}t[\"a\"] + t[\"b\"]\n")), Value::int(3));
    assert_eq!(
        echo(&format!("{decl}Valeur(t, \"b\")\n")),
        Value::int(2)
    );
    assert_eq!(
        echo(&format!("{decl}Existe(t, \"a\")\n")),
        Value::boolean(true)
    );
    assert_eq!(
        echo(&format!("{decl}Existe(t, \"z\")\n")),
        Value::boolean(false)
    );
    assert_eq!(echo(&format!("{decl}Taille(t)\n")), Value::int(2));
    assert_eq!(
        echo(&format!("{decl}Clef(t, 0)\n")),
        Value::string("a")
    );
    match echo(&format!("{decl}Clefs(t)\n")) {
        Value::Array(array) => {
            assert_eq!(array.data, vec![Value::string("a"), Value::string("b")]);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_table_literal() {
    let source = "Table t en Chaîne, Entier\nt ← Table\n \"a\", 1\n \"b\", 2\nFinTable\nt[\"b\"]\n";
    assert_eq!(echo(source), Value::int(2));
}

#[test]
fn test_missing_table_key() {
    let err = run_err("Table t en Chaîne, Entier\nEcrire t[\"absente\"]\n");
    assert!(err.to_string().contains("Clef inexistante"));
}

#[test]
fn test_panic_propagates() {
    let err = run_err("Panique \"boom\"\n");
    match err {
        AlgoError::Panic(message) => assert_eq!(message, "boom"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_nested_function_declaration_is_local() {
    let source = "\
Fonction ext() en Entier
 Fonction aide() en Entier
  Retourne 21
 FinFonction
 Retourne aide() * 2
FinFonction
ext()
";
    assert_eq!(echo(source), Value::int(42));
    // The helper is not visible once the frame is gone.
    let err = run_err(&format!("{source}aide()\n"));
    assert!(matches!(err, AlgoError::Undeclared(_)));
}

mod imports {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn interp_in(dir: &std::path::Path) -> Interp {
        let mut interp = Interp::new();
        interp.set_main_file(&dir.join("principal.algo"));
        interp
    }

    fn run_in(interp: &mut Interp, source: &str) -> fralgo_util::Result<Option<Value>> {
        let program = fralgo_par::parse(source).expect("parse failed");
        interp.run_program(&program)
    }

    #[test]
    fn test_import_binds_namespace() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("util.algo"),
            "Librairie\nFonction f() en Entier\n Retourne 42\nFinFonction\n",
        )
        .unwrap();
        let mut interp = interp_in(dir.path());
        let result = run_in(&mut interp, "Importer \"util\"\nutil:f()\n").unwrap();
        assert_eq!(result, Some(Value::int(42)));
        // The current namespace came back to main.
        assert_eq!(interp.env.current_name(), "main");
    }

    #[test]
    fn test_import_with_alias_and_initialise() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("util.algo"),
            "Librairie\nVariable v en Entier\nInitialise\nv ← 5\n",
        )
        .unwrap();
        let mut interp = interp_in(dir.path());
        let result = run_in(&mut interp, "Importer \"util\" Alias u\nu:v\n").unwrap();
        assert_eq!(result, Some(Value::int(5)));
    }

    #[test]
    fn test_import_failure_rolls_namespace_back() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("cassée.algo"),
            "Librairie\nVariable v en TypeInconnu\n",
        )
        .unwrap();
        let mut interp = interp_in(dir.path());
        assert!(run_in(&mut interp, "Importer \"cassée\"\n").is_err());
        assert!(interp.env.namespace("cassée").is_none());
        assert_eq!(interp.env.current_name(), "main");
    }

    #[test]
    fn test_import_requires_library_header() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("brute.algo"), "Variable x en Entier\n").unwrap();
        let mut interp = interp_in(dir.path());
        let err = run_in(&mut interp, "Importer \"brute\"\n").unwrap_err();
        assert!(err.to_string().contains("n'est pas une librairie"));
    }

    #[test]
    fn test_private_symbols_are_namespace_bound() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("util.algo"),
            "Librairie\nFonction @interne() en Entier\n Retourne 1\nFinFonction\n",
        )
        .unwrap();
        let mut interp = interp_in(dir.path());
        let err = run_in(&mut interp, "Importer \"util\"\nutil:@interne()\n").unwrap_err();
        assert!(err.to_string().contains("privé"));
    }
}
