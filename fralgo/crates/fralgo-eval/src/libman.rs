//! Library import resolution.
//!
//! `Importer "nom"` resolves `nom.algo` next to the main source file
//! first, then under `~/.local/lib/fralgo/`. The file must open with the
//! `Librairie` token. The import machinery keeps a stack of namespaces
//! so nested imports restore the right current namespace, and rolls the
//! new namespace back when the import fails.

use std::path::{Path, PathBuf};

use fralgo_util::{AlgoError, Result};

use crate::namespaces::MAIN;

/// Path resolution state and the import stack.
#[derive(Debug)]
pub struct LibManager {
    main_dir: PathBuf,
    local_lib_dir: PathBuf,
    /// Namespace stack; the bottom entry is always `main`.
    pub imports: Vec<String>,
}

impl Default for LibManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LibManager {
    pub fn new() -> Self {
        let local_lib_dir = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_default()
            .join(".local/lib/fralgo");
        Self {
            main_dir: std::env::current_dir().unwrap_or_default(),
            local_lib_dir,
            imports: vec![MAIN.to_string()],
        }
    }

    /// Records the main source file; libraries resolve relative to its
    /// directory.
    pub fn set_main(&mut self, mainfile: &Path) {
        let absolute = mainfile
            .canonicalize()
            .unwrap_or_else(|_| mainfile.to_path_buf());
        if let Some(dir) = absolute.parent() {
            self.main_dir = dir.to_path_buf();
        }
    }

    pub fn main_dir(&self) -> &Path {
        &self.main_dir
    }

    /// `<main dir>/<lib>.algo`, falling back to the user library
    /// directory.
    pub fn resolve(&self, libfile: &str) -> PathBuf {
        let local = self.main_dir.join(format!("{libfile}.algo"));
        if local.is_file() {
            local
        } else {
            self.local_lib_dir.join(format!("{libfile}.algo"))
        }
    }

    /// Reads a library source, checking the `Librairie` header.
    pub fn load(&self, libfile: &str) -> Result<String> {
        let path = self.resolve(libfile);
        let content = std::fs::read_to_string(&path).map_err(|_| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| libfile.to_string());
            AlgoError::Fatal(format!("Importer : fichier `{name}` non trouvé"))
        })?;
        let first_significant = content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'));
        if first_significant != Some("Librairie") {
            return Err(AlgoError::Fatal(format!(
                "`{libfile}` n'est pas une librairie."
            )));
        }
        Ok(content)
    }

    /// Default namespace for an import without alias.
    pub fn default_alias(libfile: &str) -> String {
        Path::new(libfile)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| libfile.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_resolution_prefers_main_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("outils.algo"), "Librairie\n").unwrap();
        let mut libs = LibManager::new();
        libs.set_main(&dir.path().join("prog.algo"));
        assert_eq!(libs.resolve("outils"), dir.path().join("outils.algo"));
    }

    #[test]
    fn test_header_check() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("bonne.algo"),
            "# commentaire\n\nLibrairie\nFonction f() en Entier\nRetourne 1\nFinFonction\n",
        )
        .unwrap();
        fs::write(dir.path().join("mauvaise.algo"), "Variable x en Entier\n").unwrap();

        let mut libs = LibManager::new();
        libs.set_main(&dir.path().join("prog.algo"));
        assert!(libs.load("bonne").is_ok());
        let err = libs.load("mauvaise").unwrap_err();
        assert!(err.to_string().contains("n'est pas une librairie"));
    }

    #[test]
    fn test_missing_library() {
        let dir = tempdir().unwrap();
        let mut libs = LibManager::new();
        libs.set_main(&dir.path().join("prog.algo"));
        let err = libs.load("fantôme").unwrap_err();
        assert!(err.to_string().contains("non trouvé"));
    }

    #[test]
    fn test_default_alias_is_basename() {
        assert_eq!(LibManager::default_alias("outils"), "outils");
        assert_eq!(LibManager::default_alias("lib/outils"), "outils");
    }
}
