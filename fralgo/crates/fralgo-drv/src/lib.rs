//! fralgo-drv - Interpreter driver.
//!
//! Orchestrates the pipeline for the `fralgo` binary: read the source,
//! install the superglobal constants (`_ARGS`, `_REP`), parse, evaluate,
//! and map errors to the process exit codes:
//!
//! - 0   normal termination
//! - 1   missing file or bad usage
//! - 666 unrecoverable interpreter or runtime error
//!
//! Errors print as `*** message` on standard error, followed by the
//! source line (`-v- Ligne n` at run time, `-v- ligne n` for lexical and
//! syntax errors) and `*** Erreur fatale` in file mode.

pub mod repl;

use std::path::Path;

use tracing::debug;

use fralgo_eval::values::ArrayValue;
use fralgo_eval::{Interp, Value};
use fralgo_par::types::TypeSpec;
use fralgo_util::{repl_mode, AlgoError, EXIT_FATAL, EXIT_OK, EXIT_USAGE};

/// Runs a source file, returning the process exit code.
pub fn run_file(path: &Path, argv: &[String]) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(_) => {
            eprintln!("*** {} : fichier non trouvé", path.display());
            return EXIT_USAGE;
        }
    };
    // The trailing newline of the file is not part of the program.
    let source = source.strip_suffix('\n').unwrap_or(&source).to_string();

    let mut interp = Interp::new();
    interp.set_main_file(path);
    if let Err(err) = install_superglobals(&mut interp, path, argv) {
        report_error(&err, None);
        return EXIT_FATAL;
    }

    debug!(fichier = %path.display(), "exécution");
    let program = match fralgo_par::parse(&source) {
        Ok(program) => program,
        Err(err) => {
            report_error(&err, None);
            return EXIT_FATAL;
        }
    };
    match interp.run_program(&program) {
        Ok(_) => EXIT_OK,
        Err(err) => {
            report_error(&err, Some(interp.current_line()));
            EXIT_FATAL
        }
    }
}

/// `_ARGS` (typed command-line arguments, the source path first) and
/// `_REP` (absolute directory of the running source).
fn install_superglobals(
    interp: &mut Interp,
    path: &Path,
    argv: &[String],
) -> fralgo_util::Result<()> {
    let mut data = vec![Value::string(path.display().to_string())];
    data.extend(argv.iter().map(|arg| typed_argument(arg)));
    let args = ArrayValue {
        elem: TypeSpec::Any,
        maxes: vec![data.len() as i64 - 1],
        data,
    };
    interp.declare_superglobal_const("_ARGS", Value::Array(args))?;

    let directory = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .parent()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();
    interp.declare_superglobal_const("_REP", Value::string(directory))
}

/// Command-line arguments arrive as text but bind as typed values.
fn typed_argument(text: &str) -> Value {
    if let Ok(n) = text.parse::<i64>() {
        return Value::int(n);
    }
    if let Ok(x) = text.parse::<f64>() {
        return Value::float(x);
    }
    match text {
        "VRAI" => Value::boolean(true),
        "FAUX" => Value::boolean(false),
        _ => Value::string(text),
    }
}

/// Renders an error the way the file interpreter does. Under
/// `FRALGOREPL` the message stands alone: no line information and no
/// fatal trailer, the shell recovers and prompts again.
pub fn report_error(err: &AlgoError, runtime_line: Option<u32>) {
    eprintln!("*** {err}");
    if repl_mode() {
        return;
    }
    if let Some(line) = err.line() {
        eprintln!("-v- ligne {line}");
    } else if let Some(line) = runtime_line {
        eprintln!("-v- Ligne {line}");
    }
    eprintln!("*** Erreur fatale");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_arguments() {
        assert_eq!(typed_argument("42"), Value::int(42));
        assert_eq!(typed_argument("2.5"), Value::float(2.5));
        assert_eq!(typed_argument("VRAI"), Value::boolean(true));
        assert_eq!(typed_argument("FAUX"), Value::boolean(false));
        assert_eq!(typed_argument("fichier.txt"), Value::string("fichier.txt"));
    }

    #[test]
    fn test_run_file_missing() {
        let code = run_file(Path::new("/nonexistent/programme.algo"), &[]);
        assert_eq!(code, EXIT_USAGE);
    }
}
