//! Parser edge cases: recovery-relevant errors, nesting, odd but legal
//! shapes.

#![cfg(test)]

use crate::ast::{Accessor, Expr, Program, StmtKind};
use crate::parse;
use crate::types::TypeSpec;
use fralgo_util::AlgoError;

fn statements(source: &str) -> Vec<StmtKind> {
    match parse(source).expect("parse failed") {
        Program::Statements(block) | Program::Declarations(block) => {
            block.stmts.into_iter().map(|s| s.kind).collect()
        }
        other => panic!("unexpected program form: {other:?}"),
    }
}

fn parse_err(source: &str) -> AlgoError {
    parse(source).expect_err("parse should fail")
}

#[test]
fn test_empty_source_is_an_empty_declaration_list() {
    assert!(statements("").is_empty());
    assert!(statements("\n\n# commentaire\n").is_empty());
}

#[test]
fn test_statement_without_trailing_newline() {
    let stmts = statements("Ecrire 1");
    assert!(matches!(stmts[0], StmtKind::Print { .. }));
}

#[test]
fn test_print_backslash_suppresses_newline() {
    let stmts = statements("Ecrire \"a\", \"b\" \\\n");
    assert!(matches!(
        stmts[0],
        StmtKind::Print {
            newline: false,
            err: false,
            ..
        }
    ));
}

#[test]
fn test_print_err_statement() {
    let stmts = statements("EcrireErr \"attention\"\n");
    assert!(matches!(stmts[0], StmtKind::Print { err: true, .. }));
}

#[test]
fn test_read_into_array_element() {
    let stmts = statements("Lire t[i + 1]\n");
    match &stmts[0] {
        StmtKind::Read { target } => {
            assert_eq!(target.base, "t");
            assert!(matches!(target.accessors[0], Accessor::Index(_)));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_if_without_else() {
    let stmts = statements("Si x > 0 Alors\n Ecrire x\nFinSi\n");
    match &stmts[0] {
        StmtKind::If { arms, otherwise } => {
            assert_eq!(arms.len(), 1);
            assert!(otherwise.is_none());
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_deeply_nested_blocks() {
    let source = "\
TantQue a
 Si b Alors
  Pour i ← 0 à 9
   Si c Alors
    Ecrire i
   FinSi
  i Suivant
 SinonSi d Alors
  Continuer
 Sinon
  Sortir
 FinSi
FinTantQue
";
    let stmts = statements(source);
    assert!(matches!(stmts[0], StmtKind::While { .. }));
}

#[test]
fn test_function_with_multiple_parameter_groups() {
    let source = "\
Fonction g(a, b en Entier, c en Chaîne, &t[] en Numérique) en Booléen
 Retourne VRAI
FinFonction
";
    let stmts = statements(source);
    match &stmts[0] {
        StmtKind::Function(def) => {
            assert_eq!(def.params.len(), 4);
            assert_eq!(def.params[0].ty, TypeSpec::Integer);
            assert_eq!(def.params[1].ty, TypeSpec::Integer);
            assert_eq!(def.params[2].ty, TypeSpec::Str);
            assert!(def.params[3].by_ref);
            assert!(matches!(def.params[3].ty, TypeSpec::Array { .. }));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_local_declarations_inside_function_body() {
    let source = "\
Fonction f() en Entier
 Variable n en Entier
 Tableau t[3] en Entier
 n ← 4
 Retourne n
FinFonction
";
    let stmts = statements(source);
    match &stmts[0] {
        StmtKind::Function(def) => {
            assert!(matches!(def.body.stmts[0].kind, StmtKind::Declare { .. }));
            assert!(matches!(
                def.body.stmts[1].kind,
                StmtKind::DeclareArray { .. }
            ));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_namespace_qualified_path_with_accessors() {
    let stmts = statements("Ecrire outils:annuaire[0].nom\n");
    match &stmts[0] {
        StmtKind::Print { args, .. } => match &args[0] {
            Expr::Path(path) => {
                assert_eq!(path.namespace.as_deref(), Some("outils"));
                assert_eq!(path.base, "annuaire");
                assert_eq!(path.accessors.len(), 2);
            }
            other => panic!("unexpected: {other:?}"),
        },
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_redim_with_expression_dimensions() {
    let stmts = statements("Redim t[n * 2, m - 1]\n");
    match &stmts[0] {
        StmtKind::Resize { dims, .. } => assert_eq!(dims.len(), 2),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_constant_from_expression() {
    let stmts = statements("Constante DOUBLE_PI ← 2 * 3.14159\n");
    assert!(matches!(stmts[0], StmtKind::DeclareConst { .. }));
}

#[test]
fn test_logical_operators_bind_loosest() {
    let stmts = statements("Ecrire a = 1 ET b = 2\n");
    match &stmts[0] {
        StmtKind::Print { args, .. } => match &args[0] {
            Expr::Binary { op, .. } => {
                assert_eq!(*op, crate::ast::BinOp::And);
            }
            other => panic!("unexpected: {other:?}"),
        },
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_missing_alors() {
    let err = parse_err("Si x > 0\n Ecrire x\nFinSi\n");
    assert!(matches!(err, AlgoError::Syntax { .. }));
}

#[test]
fn test_unclosed_while_hits_end_of_file() {
    assert!(matches!(
        parse_err("TantQue VRAI\n Ecrire 1\n"),
        AlgoError::UnexpectedEof
    ));
}

#[test]
fn test_unclosed_for_hits_end_of_file() {
    assert!(matches!(
        parse_err("Pour i ← 0 à 3\n Ecrire i\n"),
        AlgoError::UnexpectedEof
    ));
}

#[test]
fn test_dangling_operator() {
    let err = parse_err("Ecrire 1 +\n");
    match err {
        AlgoError::Syntax { token, .. } => assert_eq!(token, "↵"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_array_dimensions_must_be_literals() {
    let err = parse_err("Tableau t[n] en Entier\n");
    match err {
        AlgoError::Syntax { token, .. } => assert_eq!(token, "n"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_call_is_not_assignable() {
    assert!(matches!(
        parse_err("f(1) ← 2\n"),
        AlgoError::Syntax { .. }
    ));
}

#[test]
fn test_else_without_if() {
    assert!(matches!(parse_err("Sinon\n"), AlgoError::Syntax { .. }));
}

#[test]
fn test_content_after_main_block_end() {
    let err = parse_err("Début\nFin\nEcrire 1\n");
    match err {
        AlgoError::Syntax { token, .. } => assert_eq!(token, "Ecrire"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_library_rejects_main_block() {
    assert!(parse("Librairie\nDébut\nFin\n").is_err());
}

#[test]
fn test_table_literal_requires_terminator() {
    assert!(matches!(
        parse_err("t ← Table\n \"a\", 1\n"),
        AlgoError::UnexpectedEof
    ));
}
