//! Error types shared by every interpreter crate.
//!
//! One enum covers the whole pipeline: lexical errors, syntax errors and
//! the runtime error kinds of the evaluator. Messages are the French
//! messages shown to the user, built at the raising site.

use thiserror::Error;

/// Any error the interpreter can raise.
///
/// Variants that carry a `line` locate the error in the source; runtime
/// variants do not, the evaluator tracks the line of the statement being
/// executed and the driver renders it (`-v- Ligne n`).
#[derive(Debug, Error)]
pub enum AlgoError {
    /// Invalid character met by the lexer.
    #[error("caractère invalide {ch:?}")]
    InvalidCharacter { ch: char, line: u32 },

    /// Unterminated string literal.
    #[error("chaîne non terminée")]
    UnterminatedString { line: u32 },

    /// Syntax error on a token. Newlines in the token text are rendered
    /// as `↵` by the parser before raising.
    #[error("Erreur de syntaxe >{token}<")]
    Syntax { token: String, line: u32 },

    /// Input ended in the middle of a construct.
    #[error("Fin de fichier prématurée.")]
    UnexpectedEof,

    /// Operation on incompatible value variants.
    #[error("{0}")]
    BadType(String),

    /// Read of a declared variable that was never assigned.
    #[error("{0}")]
    Undefined(String),

    /// Reference to an unknown name.
    #[error("{0}")]
    Undeclared(String),

    /// Second declaration of a name in the same scope.
    #[error("{0}")]
    Redeclared(String),

    /// Array access outside `[0, max]`.
    #[error("Index hors limite : {0}")]
    IndexOutOfRange(i64),

    /// Array resize to a negative dimension, or a rank mismatch.
    #[error("Redimensionnement impossible")]
    ResizeFailed,

    /// Sized-character length outside 1..=255.
    #[error("Taille invalide : {0}")]
    InvalidCharSize(i64),

    /// Field access on a name that is not a field of the structure.
    #[error("{0}")]
    UnknownField(String),

    /// Tuple assignment arity does not match the structure.
    #[error("{0} : nombre de valeurs invalide")]
    InvalidValueCount(String),

    /// Call arity mismatch.
    #[error("Nombre de paramètres invalide : {actual}, attendu {expected}")]
    InvalidParameterCount { actual: usize, expected: usize },

    /// Division by zero, integer or float.
    #[error("Division par zéro")]
    ZeroDivide,

    /// Assignment to a constant.
    #[error("{0} est en lecture seule")]
    ReadOnly(String),

    /// Explicit `Panique` statement. Not caught by any construct.
    #[error("{0}")]
    Panic(String),

    /// Keyboard interrupt during a loop or a read.
    #[error("Interrompu par l'utilisateur")]
    Interrupted,

    /// Unrecoverable error (missing file, channel misuse, bad library).
    #[error("{0}")]
    Fatal(String),

    /// Call depth exceeded the recursion limit.
    #[error("excès de récursivité")]
    RecursionLimit,
}

impl AlgoError {
    /// Line number attached to a lexical or syntactic error, if any.
    pub fn line(&self) -> Option<u32> {
        match self {
            AlgoError::InvalidCharacter { line, .. }
            | AlgoError::UnterminatedString { line }
            | AlgoError::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// True for errors raised by the front end rather than at run time.
    pub fn is_syntactic(&self) -> bool {
        matches!(
            self,
            AlgoError::InvalidCharacter { .. }
                | AlgoError::UnterminatedString { .. }
                | AlgoError::Syntax { .. }
                | AlgoError::UnexpectedEof
        )
    }
}

/// Result type alias used across the interpreter.
pub type Result<T> = std::result::Result<T, AlgoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_divide_display() {
        assert_eq!(AlgoError::ZeroDivide.to_string(), "Division par zéro");
    }

    #[test]
    fn test_syntax_display() {
        let err = AlgoError::Syntax {
            token: "↵".to_string(),
            line: 3,
        };
        assert_eq!(err.to_string(), "Erreur de syntaxe >↵<");
        assert_eq!(err.line(), Some(3));
        assert!(err.is_syntactic());
    }

    #[test]
    fn test_parameter_count_display() {
        let err = AlgoError::InvalidParameterCount {
            actual: 1,
            expected: 2,
        };
        assert_eq!(
            err.to_string(),
            "Nombre de paramètres invalide : 1, attendu 2"
        );
    }

    #[test]
    fn test_runtime_errors_have_no_line() {
        assert_eq!(AlgoError::ZeroDivide.line(), None);
        assert!(!AlgoError::ZeroDivide.is_syntactic());
    }
}
