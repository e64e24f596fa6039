//! The `fralgo` binary: file interpreter and interactive shell.
//!
//! With a source file, runs it and exits 0, 1 (missing file) or 666
//! (fatal interpreter or runtime error). Without arguments, starts the
//! line-oriented shell.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Interprète du pseudo-code pédagogique ALGO
#[derive(Parser, Debug)]
#[command(name = "fralgo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interprète du pseudo-code pédagogique ALGO", long_about = None)]
struct Cli {
    /// Fichier source (.algo) à exécuter; sans fichier, mode interactif
    file: Option<PathBuf>,

    /// Arguments transmis au programme dans _ARGS
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,

    /// Journalisation détaillée
    #[arg(short, long, env = "FRALGO_VERBOSE")]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match &cli.file {
        Some(file) => fralgo_drv::run_file(file, &cli.args),
        None => fralgo_drv::repl::run(),
    };
    std::process::exit(code);
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_file() {
        let cli = Cli::parse_from(["fralgo", "programme.algo"]);
        assert_eq!(cli.file, Some(PathBuf::from("programme.algo")));
        assert!(cli.args.is_empty());
    }

    #[test]
    fn test_cli_parse_program_arguments() {
        let cli = Cli::parse_from(["fralgo", "programme.algo", "42", "VRAI", "texte"]);
        assert_eq!(cli.args, vec!["42", "VRAI", "texte"]);
    }

    #[test]
    fn test_cli_parse_no_file_means_shell() {
        let cli = Cli::parse_from(["fralgo"]);
        assert!(cli.file.is_none());
    }

    #[test]
    fn test_cli_parse_verbose() {
        let cli = Cli::parse_from(["fralgo", "--verbose", "programme.algo"]);
        assert!(cli.verbose);
    }
}
