//! The interactive shell.
//!
//! Line-oriented, with multi-line buffering: a line opening a block
//! (`Si`, `TantQue`, `Pour`, `Structure`, `Fonction`, `Procédure`, a
//! table literal) switches to the continuation prompt until the matching
//! closer, then the whole block parses and runs at once.
//!
//! Prompts: `::: ` fresh, `... ` inside a block, `:x: ` after a
//! cancelled block. Meta-commands: `.trace`, `.réinit`, `.espaces`,
//! `.symboles [espace]`. `Début`, `Fin`, `Librairie` and `Initialise`
//! are not allowed at the prompt.
//!
//! History persists in `$HOME/.fralgohistory`, created mode 0600.

use std::path::PathBuf;

use anyhow::Context;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use fralgo_eval::Interp;
use fralgo_util::{EXIT_OK, REPL_ENV_VAR};

const FORBIDDEN: [&str; 4] = ["Début", "Fin", "Librairie", "Initialise"];
const OPENERS: [&str; 6] = ["Si", "TantQue", "Pour", "Structure", "Fonction", "Procédure"];
const CLOSERS: [&str; 6] = [
    "FinSi",
    "FinTantQue",
    "FinStructure",
    "FinFonction",
    "FinProcédure",
    "FinTable",
];

/// Runs the shell until end of input. Returns the process exit code.
pub fn run() -> i32 {
    // Lexer, parser and evaluator errors become recoverable.
    std::env::set_var(REPL_ENV_VAR, "1");

    println!("FR-ALGO {}", env!("CARGO_PKG_VERSION"));
    println!("En attente de vos instructions.");
    println!();

    let (mut editor, history) = match setup_editor() {
        Ok(setup) => setup,
        Err(err) => {
            eprintln!("*** {err:#}");
            return EXIT_OK;
        }
    };

    let mut interp = Interp::new();
    install_interrupt_handler(&interp);

    let mut shell = Shell::default();
    loop {
        match editor.readline(shell.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                shell.handle_line(&mut interp, &line);
            }
            Err(ReadlineError::Interrupted) => {
                shell.cancel();
            }
            Err(ReadlineError::Eof) => {
                println!("*** Au revoir !");
                break;
            }
            Err(err) => {
                eprintln!("*** {err}");
                break;
            }
        }
    }
    if let Some(history) = &history {
        let _ = editor.save_history(history);
    }
    EXIT_OK
}

fn install_interrupt_handler(interp: &Interp) {
    let flag = interp.interrupt_handle();
    let _ = ctrlc::set_handler(move || {
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
    });
}

fn setup_editor() -> anyhow::Result<(DefaultEditor, Option<PathBuf>)> {
    let mut editor =
        DefaultEditor::new().context("initialisation de la ligne de commande impossible")?;
    let history = dirs::home_dir().map(|home| home.join(".fralgohistory"));
    if let Some(history) = &history {
        ensure_history_file(history);
        let _ = editor.load_history(history);
    }
    Ok((editor, history))
}

#[cfg(unix)]
fn ensure_history_file(path: &std::path::Path) {
    use std::os::unix::fs::OpenOptionsExt;
    if !path.exists() {
        let _ = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .mode(0o600)
            .open(path);
    }
}

#[cfg(not(unix))]
fn ensure_history_file(path: &std::path::Path) {
    if !path.exists() {
        let _ = std::fs::File::create(path);
    }
}

/// Buffering state of the shell.
#[derive(Default)]
struct Shell {
    buffer: Vec<String>,
    level: i32,
    cancelled: bool,
    trace: bool,
}

impl Shell {
    fn prompt(&self) -> &'static str {
        if self.level > 0 {
            "... "
        } else if self.cancelled {
            ":x: "
        } else {
            "::: "
        }
    }

    fn buffering(&self) -> bool {
        self.level > 0
    }

    /// Ctrl-C: drop the block being typed.
    fn cancel(&mut self) {
        self.cancelled = self.buffering();
        self.buffer.clear();
        self.level = 0;
    }

    fn handle_line(&mut self, interp: &mut Interp, line: &str) {
        self.cancelled = false;
        let trimmed = line.trim();
        if trimmed.is_empty() && !self.buffering() {
            return;
        }
        if !self.buffering() {
            if let Some(meta) = trimmed.strip_prefix('.') {
                self.meta_command(interp, meta);
                return;
            }
            if FORBIDDEN.contains(&trimmed) {
                println!("*** Instruction {trimmed} non admise en mode interactif");
                return;
            }
        }

        let words: Vec<&str> = trimmed.split_whitespace().collect();
        if let Some(first) = words.first() {
            if OPENERS.contains(first) || words.last() == Some(&"Table") {
                self.level += 1;
            }
            if CLOSERS.contains(first) || words.last() == Some(&"Suivant") {
                self.level -= 1;
            }
        }
        self.buffer.push(line.to_string());
        if self.level > 0 {
            return;
        }
        self.level = 0;
        let source = self.buffer.join("\n");
        self.buffer.clear();
        self.execute(interp, &source);
    }

    fn execute(&self, interp: &mut Interp, source: &str) {
        let program = match fralgo_par::parse(&format!("{source}\n")) {
            Ok(program) => program,
            Err(err) => {
                println!("*** {err}");
                return;
            }
        };
        match interp.run_program(&program) {
            Ok(Some(value)) => println!("{value}"),
            Ok(None) => {}
            Err(err) => {
                println!("*** {err}");
                if self.trace {
                    println!("-v- {err:?}");
                }
            }
        }
    }

    fn meta_command(&mut self, interp: &mut Interp, command: &str) {
        let mut parts = command.split_whitespace();
        match parts.next() {
            Some("trace") => {
                self.trace = !self.trace;
                let state = if self.trace { "VRAI" } else { "FAUX" };
                println!("*** TRACE est {state}");
            }
            Some("réinit") => {
                interp.env.reset();
                println!("*** Environnement réinitialisé");
            }
            Some("espaces") => {
                for name in interp.env.namespace_names() {
                    println!("{name}");
                }
            }
            Some("symboles") => {
                let name = parts.next().unwrap_or("main");
                self.dump_symbols(interp, name);
            }
            Some(other) => println!("*** Commande inconnue : .{other}"),
            None => println!("*** Commande attendue"),
        }
        debug!(commande = command, "méta-commande");
    }

    fn dump_symbols(&self, interp: &Interp, namespace: &str) {
        let Some(symbols) = interp.env.namespace(namespace) else {
            println!("*** Espace de noms inconnu : {namespace}");
            return;
        };
        for (name, def) in &symbols.structs {
            let fields: Vec<String> = def
                .fields
                .iter()
                .map(|(field, ty)| format!("{field} en {ty}"))
                .collect();
            println!("Structure {name} ({})", fields.join(", "));
        }
        for (name, def) in &symbols.funcs {
            let kind = if def.is_procedure() {
                "Procédure"
            } else {
                "Fonction"
            };
            println!("{kind} {name}");
        }
        for (name, slot) in &symbols.globals {
            let tag = if slot.constant { "Constante" } else { "Variable" };
            println!("{tag} {name} en {} → {}", slot.value.type_spec(), slot.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(shell: &mut Shell, interp: &mut Interp, lines: &[&str]) {
        for line in lines {
            shell.handle_line(interp, line);
        }
    }

    #[test]
    fn test_single_line_executes_immediately() {
        let mut shell = Shell::default();
        let mut interp = Interp::new();
        feed(&mut shell, &mut interp, &["Variable x en Entier", "x ← 5"]);
        assert!(!shell.buffering());
        let loc = interp.env.resolve_var("main", "x").unwrap();
        assert_eq!(interp.env.slot(&loc).value, fralgo_eval::Value::int(5));
    }

    #[test]
    fn test_block_buffers_until_closer() {
        let mut shell = Shell::default();
        let mut interp = Interp::new();
        feed(
            &mut shell,
            &mut interp,
            &["Variable x en Entier", "x ← 0", "Si 1 = 1 Alors"],
        );
        assert!(shell.buffering());
        assert_eq!(shell.prompt(), "... ");
        feed(&mut shell, &mut interp, &[" x ← 7", "FinSi"]);
        assert!(!shell.buffering());
        let loc = interp.env.resolve_var("main", "x").unwrap();
        assert_eq!(interp.env.slot(&loc).value, fralgo_eval::Value::int(7));
    }

    #[test]
    fn test_nested_blocks_track_level() {
        let mut shell = Shell::default();
        let mut interp = Interp::new();
        feed(
            &mut shell,
            &mut interp,
            &[
                "Variables i, s en Entier",
                "s ← 0",
                "Pour i ← 1 à 3",
                " Si i > 1 Alors",
                "  s ← s + i",
                " FinSi",
            ],
        );
        assert!(shell.buffering());
        feed(&mut shell, &mut interp, &["i Suivant"]);
        assert!(!shell.buffering());
        let loc = interp.env.resolve_var("main", "s").unwrap();
        assert_eq!(interp.env.slot(&loc).value, fralgo_eval::Value::int(5));
    }

    #[test]
    fn test_cancel_drops_block() {
        let mut shell = Shell::default();
        let mut interp = Interp::new();
        feed(&mut shell, &mut interp, &["TantQue VRAI"]);
        assert!(shell.buffering());
        shell.cancel();
        assert!(!shell.buffering());
        assert_eq!(shell.prompt(), ":x: ");
        // The next line resets the cancelled marker.
        feed(&mut shell, &mut interp, &["1 + 1"]);
        assert_eq!(shell.prompt(), "::: ");
    }

    #[test]
    fn test_forbidden_statements() {
        let mut shell = Shell::default();
        let mut interp = Interp::new();
        feed(&mut shell, &mut interp, &["Début"]);
        assert!(!shell.buffering());
        feed(&mut shell, &mut interp, &["Librairie"]);
        assert!(!shell.buffering());
    }

    #[test]
    fn test_reinit_meta_command() {
        let mut shell = Shell::default();
        let mut interp = Interp::new();
        feed(&mut shell, &mut interp, &["Variable x en Entier", ".réinit"]);
        assert!(interp.env.resolve_var("main", "x").is_err());
    }
}
