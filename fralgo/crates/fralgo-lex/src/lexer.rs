//! Hand-written lexer for Algo sources.
//!
//! Produces the full token stream in one pass. Runs of newlines collapse
//! into a single [`Token::Newline`]; `#` comments run to the end of the
//! line; `<-` is the ASCII alias of `←`. Strings accept single or double
//! quotes with C-style escapes and may not span lines.

use crate::cursor::Cursor;
use crate::token::{Lexeme, Token};
use fralgo_util::{AlgoError, Result};

/// Tokenizes a whole source text.
///
/// The returned stream always ends with [`Token::Eof`]. An invalid
/// character or an unterminated string aborts lexing with the offending
/// line; the driver decides whether that is fatal (file mode) or
/// recoverable (shell mode).
pub fn tokenize(source: &str) -> Result<Vec<Lexeme>> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    cursor: Cursor<'a>,
    tokens: Vec<Lexeme>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Lexeme>> {
        while !self.cursor.is_at_end() {
            let c = self.cursor.current();
            match c {
                ' ' | '\t' | '\r' => self.cursor.advance(),
                '\n' => self.newline(),
                '#' => self.comment(),
                '"' | '\'' => self.string(c)?,
                '0'..='9' => self.number(),
                '←' => {
                    self.cursor.advance();
                    self.push(Token::Arrow);
                }
                _ if is_ident_start(c) || c == '@' => self.identifier(),
                _ => self.operator(c)?,
            }
        }
        let line = self.cursor.line();
        self.tokens.push(Lexeme::new(Token::Eof, line));
        Ok(self.tokens)
    }

    fn push(&mut self, token: Token) {
        // The cursor already sits after the lexeme; a newline lexeme must
        // keep the line it started on, handled separately in newline().
        let line = self.cursor.line();
        self.tokens.push(Lexeme::new(token, line));
    }

    fn newline(&mut self) {
        let line = self.cursor.line();
        while self.cursor.current() == '\n'
            || self.cursor.current() == '\r'
            || (self.cursor.current() == ' ' && self.blank_line_ahead())
            || (self.cursor.current() == '\t' && self.blank_line_ahead())
        {
            self.cursor.advance();
        }
        self.tokens.push(Lexeme::new(Token::Newline, line));
    }

    /// True when the rest of the current line holds only whitespace, so a
    /// run of blank lines collapses into one Newline token.
    fn blank_line_ahead(&self) -> bool {
        let mut offset = 0;
        loop {
            match self.cursor.peek(offset) {
                ' ' | '\t' | '\r' => offset += 1,
                '\n' => return true,
                _ => return false,
            }
        }
    }

    fn comment(&mut self) {
        while !self.cursor.is_at_end() && self.cursor.current() != '\n' {
            self.cursor.advance();
        }
    }

    fn string(&mut self, quote: char) -> Result<()> {
        let line = self.cursor.line();
        self.cursor.advance();
        let mut text = String::new();
        loop {
            let c = self.cursor.current();
            if c == quote {
                self.cursor.advance();
                break;
            }
            if c == '\n' || self.cursor.is_at_end() {
                return Err(AlgoError::UnterminatedString { line });
            }
            if c == '\\' {
                self.cursor.advance();
                let escaped = self.cursor.current();
                self.cursor.advance();
                match escaped {
                    'n' => text.push('\n'),
                    't' => text.push('\t'),
                    'r' => text.push('\r'),
                    '0' => text.push('\0'),
                    '\\' => text.push('\\'),
                    '\'' => text.push('\''),
                    '"' => text.push('"'),
                    other => {
                        // Unknown escapes keep the backslash verbatim.
                        text.push('\\');
                        text.push(other);
                    }
                }
            } else {
                text.push(c);
                self.cursor.advance();
            }
        }
        self.tokens.push(Lexeme::new(Token::Str(text), line));
        Ok(())
    }

    fn number(&mut self) {
        let line = self.cursor.line();
        let start = self.cursor.position();
        while self.cursor.current().is_ascii_digit() {
            self.cursor.advance();
        }
        // A float needs digits on both sides of the dot (`d+.d+`);
        // otherwise the dot is a field accessor.
        if self.cursor.current() == '.' && self.cursor.peek(1).is_ascii_digit() {
            self.cursor.advance();
            while self.cursor.current().is_ascii_digit() {
                self.cursor.advance();
            }
            let text = self.cursor.slice_from(start);
            let value: f64 = text.parse().unwrap_or(0.0);
            self.tokens.push(Lexeme::new(Token::Float(value), line));
        } else {
            let text = self.cursor.slice_from(start);
            let value: i64 = text.parse().unwrap_or(0);
            self.tokens.push(Lexeme::new(Token::Integer(value), line));
        }
    }

    fn identifier(&mut self) {
        let line = self.cursor.line();
        let start = self.cursor.position();
        if self.cursor.current() == '@' {
            self.cursor.advance();
        }
        while is_ident_continue(self.cursor.current()) {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(start);
        let token = Token::keyword(text).unwrap_or_else(|| Token::Ident(text.to_string()));
        self.tokens.push(Lexeme::new(token, line));
    }

    fn operator(&mut self, c: char) -> Result<()> {
        let line = self.cursor.line();
        self.cursor.advance();
        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '^' => Token::Caret,
            '&' => Token::Ampersand,
            '=' => Token::Eq,
            '>' => {
                if self.cursor.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '<' => {
                if self.cursor.eat('=') {
                    Token::Le
                } else if self.cursor.eat('>') {
                    Token::Ne
                } else if self.cursor.eat('-') {
                    Token::Arrow
                } else {
                    Token::Lt
                }
            }
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            '.' => Token::Dot,
            ':' => Token::Colon,
            '\\' => Token::Backslash,
            other => return Err(AlgoError::InvalidCharacter { ch: other, line }),
        };
        self.tokens.push(Lexeme::new(token, line));
        Ok(())
    }
}

/// Letters, underscore and the accented characters of French keywords
/// and identifiers.
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || matches!(c, 'à' | 'é' | 'è' | 'î')
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("lexing failed")
            .into_iter()
            .map(|l| l.token)
            .collect()
    }

    #[test]
    fn test_declaration() {
        assert_eq!(
            tokens("Variable x en Entier\n"),
            vec![
                Token::Variable,
                Token::Ident("x".into()),
                Token::En,
                Token::TypeEntier,
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_arrow_and_ascii_alias() {
        assert_eq!(
            tokens("x ← 5"),
            vec![
                Token::Ident("x".into()),
                Token::Arrow,
                Token::Integer(5),
                Token::Eof
            ]
        );
        assert_eq!(
            tokens("x <- 5"),
            vec![
                Token::Ident("x".into()),
                Token::Arrow,
                Token::Integer(5),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("a <= b <> c >= d"),
            vec![
                Token::Ident("a".into()),
                Token::Le,
                Token::Ident("b".into()),
                Token::Ne,
                Token::Ident("c".into()),
                Token::Ge,
                Token::Ident("d".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(
            tokens("12 3.25"),
            vec![Token::Integer(12), Token::Float(3.25), Token::Eof]
        );
        // `12.` is an integer followed by a dot, not a float.
        assert_eq!(
            tokens("12.champ"),
            vec![
                Token::Integer(12),
                Token::Dot,
                Token::Ident("champ".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#""a\tb\n" 'c''"#),
            vec![
                Token::Str("a\tb\n".into()),
                Token::Str("c".into()),
                Token::Str("".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("\"abc\n").unwrap_err();
        assert!(matches!(err, AlgoError::UnterminatedString { line: 1 }));
    }

    #[test]
    fn test_booleans() {
        assert_eq!(
            tokens("VRAI FAUX VRAIMENT"),
            vec![
                Token::True,
                Token::False,
                Token::Ident("VRAIMENT".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_accented_identifiers() {
        assert_eq!(
            tokens("élève_1 à île"),
            vec![
                Token::Ident("élève_1".into()),
                Token::A,
                Token::Ident("île".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_private_identifier() {
        assert_eq!(
            tokens("@interne"),
            vec![Token::Ident("@interne".into()), Token::Eof]
        );
    }

    #[test]
    fn test_comments_and_blank_lines_collapse() {
        let src = "x ← 1  # un commentaire\n\n   \n# ligne entière\ny ← 2\n";
        assert_eq!(
            tokens(src),
            vec![
                Token::Ident("x".into()),
                Token::Arrow,
                Token::Integer(1),
                Token::Newline,
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
    fn test_newline_keeps_starting_line() {
        let lexed = tokenize("a\n\n\nb").unwrap();
        assert_eq!(lexed[1].token, Token::Newline);
        assert_eq!(lexed[1].line, 1);
        assert_eq!(lexed[2].line, 4);
    }

    #[test]
    fn test_invalid_character() {
        let err = tokenize("Ecrire 1 $ 2").unwrap_err();
        match err {
            AlgoError::InvalidCharacter { ch, line } => {
                assert_eq!(ch, '$');
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_namespace_colon() {
        assert_eq!(
            tokens("util:carré(4)"),
            vec![
                Token::Ident("util".into()),
                Token::Colon,
                Token::Ident("carré".into()),
                Token::LParen,
                Token::Integer(4),
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    mod property {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn integers_lex_to_their_value(n in 0i64..=i64::MAX) {
                let toks = tokens(&n.to_string());
                prop_assert_eq!(&toks[0], &Token::Integer(n));
            }

            #[test]
            fn plain_strings_round_trip(s in "[a-zA-Z0-9 àéèî_,;.!?-]*") {
                let source = format!("\"{s}\"");
                let toks = tokens(&source);
                prop_assert_eq!(&toks[0], &Token::Str(s));
            }

            #[test]
            fn identifiers_never_panic(s in "[A-Za-zàéèî_][A-Za-zàéèî0-9_]{0,12}") {
                let _ = tokenize(&s);
            }
        }
    }

    #[test]
    fn test_file_statement() {
        assert_eq!(
            tokens("Ouvrir \"data.txt\" sur 1 en Lecture\n"),
            vec![
                Token::Ouvrir,
                Token::Str("data.txt".into()),
                Token::Sur,
                Token::Integer(1),
                Token::En,
                Token::Lecture,
                Token::Newline,
                Token::Eof,
            ]
        );
    }
}
