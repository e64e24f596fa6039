//! Lexer edge cases: operator adjacency, line endings, odd inputs.

#![cfg(test)]

use crate::lexer::tokenize;
use crate::token::Token;
use fralgo_util::AlgoError;

fn tokens(source: &str) -> Vec<Token> {
    tokenize(source)
        .expect("lexing failed")
        .into_iter()
        .map(|l| l.token)
        .collect()
}

#[test]
fn test_empty_source() {
    assert_eq!(tokens(""), vec![Token::Eof]);
}

#[test]
fn test_whitespace_only() {
    assert_eq!(tokens("   \t  "), vec![Token::Eof]);
    assert_eq!(tokens("\n\n\n"), vec![Token::Newline, Token::Eof]);
}

#[test]
fn test_comment_only() {
    assert_eq!(tokens("# rien du tout"), vec![Token::Eof]);
}

#[test]
fn test_comment_at_end_of_file_without_newline() {
    assert_eq!(
        tokens("x ← 1 # fin"),
        vec![
            Token::Ident("x".into()),
            Token::Arrow,
            Token::Integer(1),
            Token::Eof
        ]
    );
}

#[test]
fn test_crlf_line_endings() {
    assert_eq!(
        tokens("x ← 1\r\ny ← 2\r\n"),
        vec![
            Token::Ident("x".into()),
            Token::Arrow,
            Token::Integer(1),
            Token::Newline,
            Token::Ident("y".into()),
            Token::Arrow,
            Token::Integer(2),
            Token::Newline,
            Token::Eof,
        ]
    );
}

#[test]
fn test_arrow_alias_binds_greedily() {
    // `<-` always reads as the assignment arrow, never as `<` then `-`.
    assert_eq!(
        tokens("a<-1"),
        vec![Token::Ident("a".into()), Token::Arrow, Token::Integer(1), Token::Eof]
    );
    // A space keeps the comparison.
    assert_eq!(
        tokens("a < -1"),
        vec![
            Token::Ident("a".into()),
            Token::Lt,
            Token::Minus,
            Token::Integer(1),
            Token::Eof
        ]
    );
}

#[test]
fn test_comparison_pairs_split_by_space() {
    assert_eq!(tokens("< >"), vec![Token::Lt, Token::Gt, Token::Eof]);
    assert_eq!(tokens("<>"), vec![Token::Ne, Token::Eof]);
    assert_eq!(tokens("> ="), vec![Token::Gt, Token::Eq, Token::Eof]);
    assert_eq!(tokens(">="), vec![Token::Ge, Token::Eof]);
}

#[test]
fn test_number_dot_chains() {
    assert_eq!(
        tokens("1.2.3"),
        vec![
            Token::Float(1.2),
            Token::Dot,
            Token::Integer(3),
            Token::Eof
        ]
    );
}

#[test]
fn test_keywords_embedded_in_identifiers_stay_identifiers() {
    assert_eq!(
        tokens("Sinon2 FinSiX _Pour"),
        vec![
            Token::Ident("Sinon2".into()),
            Token::Ident("FinSiX".into()),
            Token::Ident("_Pour".into()),
            Token::Eof
        ]
    );
}

#[test]
fn test_underscore_identifier() {
    assert_eq!(
        tokens("_ARGS _REP"),
        vec![
            Token::Ident("_ARGS".into()),
            Token::Ident("_REP".into()),
            Token::Eof
        ]
    );
}

#[test]
fn test_mixed_quotes() {
    assert_eq!(
        tokens(r#"'a "b"' "c 'd'""#),
        vec![
            Token::Str("a \"b\"".into()),
            Token::Str("c 'd'".into()),
            Token::Eof
        ]
    );
}

#[test]
fn test_unknown_escape_is_kept_verbatim() {
    assert_eq!(tokens(r#""a\qb""#), vec![Token::Str("a\\qb".into()), Token::Eof]);
}

#[test]
fn test_invalid_character_reports_later_line() {
    let err = tokenize("x ← 1\ny ← €\n").unwrap_err();
    match err {
        AlgoError::InvalidCharacter { ch, line } => {
            assert_eq!(ch, '€');
            assert_eq!(line, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_sized_char_tokens() {
    assert_eq!(
        tokens("Caractère*12"),
        vec![
            Token::TypeCaractere,
            Token::Star,
            Token::Integer(12),
            Token::Eof
        ]
    );
}

#[test]
fn test_backslash_print_suppression() {
    assert_eq!(
        tokens("Ecrire x \\\n"),
        vec![
            Token::Ecrire,
            Token::Ident("x".into()),
            Token::Backslash,
            Token::Newline,
            Token::Eof
        ]
    );
}

#[test]
fn test_string_spanning_line_is_an_error() {
    let err = tokenize("\"ouvert\nfermé\"").unwrap_err();
    assert!(matches!(err, AlgoError::UnterminatedString { line: 1 }));
}
