//! fralgo-lex - Lexical analysis for the Algo language.
//!
//! First phase of the interpreter pipeline: turns a UTF-8 source text
//! into a stream of [`Token`]s. The token set is French through and
//! through: keywords are case-sensitive accented words (`Début`,
//! `Procédure`, `FinTantQue`…), booleans are `VRAI`/`FAUX`, and the
//! assignment operator is `←` with `<-` accepted as an ASCII alias.
//!
//! Unlike free-form languages, Algo statements end at the end of the
//! line, so the newline is a token in its own right. Comments start at
//! `#` and run to the end of the line.
//!
//! ```
//! use fralgo_lex::{tokenize, Token};
//!
//! let lexed = tokenize("Ecrire 5\n").unwrap();
//! assert_eq!(lexed[0].token, Token::Ecrire);
//! assert_eq!(lexed[1].token, Token::Integer(5));
//! assert_eq!(lexed[2].token, Token::Newline);
//! ```

pub mod cursor;
mod edge_cases;
pub mod lexer;
pub mod token;

pub use lexer::tokenize;
pub use token::{Lexeme, Token};
