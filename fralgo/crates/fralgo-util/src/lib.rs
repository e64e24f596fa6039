//! fralgo-util - Foundation Types
//!
//! Shared foundation for every crate of the interpreter: the error type
//! carrying all runtime, lexical and syntactic error kinds with their
//! French messages, the `Result` alias used throughout, and the process
//! exit codes of the command-line interpreter.
//!
//! Every phase of the pipeline (lexer, parser, evaluator, file manager,
//! library loader) reports failures through [`AlgoError`]. The driver is
//! the only place that turns an error into process termination; library
//! code only ever propagates.

mod error;

pub use error::{AlgoError, Result};

// Re-export commonly used hashed collections so every crate agrees on the
// hasher for symbol tables.
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;

/// Exit code for a normal termination.
pub const EXIT_OK: i32 = 0;

/// Exit code for a missing source file or bad usage.
pub const EXIT_USAGE: i32 = 1;

/// Exit code for an unrecoverable interpreter or runtime error.
pub const EXIT_FATAL: i32 = 666;

/// Environment variable switching error behaviour from fatal-exit to
/// raise-and-recover. Set by the interactive shell.
pub const REPL_ENV_VAR: &str = "FRALGOREPL";

/// Returns true when the process runs under the interactive shell.
pub fn repl_mode() -> bool {
    std::env::var_os(REPL_ENV_VAR).is_some()
}
