//! The namespace collection and the variable lookup cascade.
//!
//! One [`Environment`] holds every namespace (the `main` namespace
//! always exists), the process-wide superglobal map, and the name of the
//! current namespace. Lookups cascade:
//!
//! 1. local frames of the namespace, top-down - unless the current
//!    context carries the dereference flag, in which case the reference
//!    maps are consulted first (a reference parameter may shadow a
//!    same-named variable of the caller);
//! 2. reference maps top-down, following targets recursively with a
//!    visited set so reference chains always terminate;
//! 3. local frames again (dereference case);
//! 4. namespace globals;
//! 5. `main` globals;
//! 6. superglobals.

use std::rc::Rc;

use indexmap::IndexMap;

use fralgo_par::ast::FunctionDef;
use fralgo_util::{AlgoError, FxHashMap, FxHashSet, Result};

use crate::structure::StructDef;
use crate::symbols::{Slot, Symbols};
use crate::values::StructDefs;

pub const MAIN: &str = "main";

/// Where a resolved variable lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarPlace {
    /// Index into the frame stack of the owning namespace.
    Frame(usize),
    /// Namespace globals.
    Global,
    /// The process-wide superglobal map.
    Superglobal,
}

/// A resolved variable location. Resolution happens before any mutable
/// borrow so reads and writes share one cascade.
#[derive(Debug, Clone)]
pub struct VarLoc {
    pub namespace: String,
    pub place: VarPlace,
    pub name: String,
}

/// Every namespace plus the shared maps.
#[derive(Debug)]
pub struct Environment {
    namespaces: IndexMap<String, Symbols>,
    superglobals: FxHashMap<String, Slot>,
    current: String,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        let mut namespaces = IndexMap::new();
        namespaces.insert(MAIN.to_string(), Symbols::new(MAIN));
        Self {
            namespaces,
            superglobals: FxHashMap::default(),
            current: MAIN.to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Namespace management
    // ------------------------------------------------------------------

    pub fn current_name(&self) -> &str {
        &self.current
    }

    pub fn current(&self) -> &Symbols {
        &self.namespaces[&self.current]
    }

    pub fn current_mut(&mut self) -> &mut Symbols {
        self.namespaces
            .get_mut(&self.current)
            .expect("current namespace always exists")
    }

    /// An empty or absent name designates `main`.
    pub fn namespace(&self, name: &str) -> Option<&Symbols> {
        let name = if name.is_empty() { MAIN } else { name };
        self.namespaces.get(name)
    }

    pub fn namespace_names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// Creates a namespace and makes it current.
    pub fn declare_namespace(&mut self, name: &str) -> Result<()> {
        if self.namespaces.contains_key(name) {
            return Err(AlgoError::Redeclared(format!(
                "Espace de noms >{name}< déjà déclaré"
            )));
        }
        self.namespaces.insert(name.to_string(), Symbols::new(name));
        self.current = name.to_string();
        Ok(())
    }

    pub fn del_namespace(&mut self, name: &str) {
        if name != MAIN {
            self.namespaces.shift_remove(name);
            if self.current == name {
                self.current = MAIN.to_string();
            }
        }
    }

    pub fn set_current(&mut self, name: &str) -> Result<()> {
        let name = if name.is_empty() { MAIN } else { name };
        if !self.namespaces.contains_key(name) {
            return Err(AlgoError::Fatal(format!(
                "Espace de noms inconnu : {name}"
            )));
        }
        self.current = name.to_string();
        Ok(())
    }

    /// Drops every namespace but `main`, every declaration of `main`,
    /// and the superglobals. The shell's `.réinit`.
    pub fn reset(&mut self) {
        self.namespaces.retain(|name, _| name == MAIN);
        self.namespaces[MAIN].reset();
        self.superglobals.clear();
        self.current = MAIN.to_string();
    }

    // ------------------------------------------------------------------
    // Superglobals
    // ------------------------------------------------------------------

    /// Declares a value visible from every namespace (`_ARGS`, `_REP`).
    pub fn declare_superglobal(&mut self, name: &str, slot: Slot) -> Result<()> {
        if self.superglobals.contains_key(name) {
            return Err(AlgoError::Redeclared(format!(
                "Redéclaration de la variable >{name}<"
            )));
        }
        self.superglobals.insert(name.to_string(), slot);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Variable resolution
    // ------------------------------------------------------------------

    /// Resolves a name to a location, following the cascade and the
    /// reference maps (with a visited set: chains always terminate).
    pub fn resolve_var(&self, namespace: &str, name: &str) -> Result<VarLoc> {
        let mut visited = FxHashSet::default();
        self.resolve_var_inner(namespace, name, &mut visited)
            .ok_or_else(|| AlgoError::Undeclared(format!("Variable >{name}< non déclarée")))
    }

    fn resolve_var_inner(
        &self,
        namespace: &str,
        name: &str,
        visited: &mut FxHashSet<String>,
    ) -> Option<VarLoc> {
        let ns = self.namespace(namespace)?;
        if ns.is_local() {
            let deref = ns.frames.last().map(|f| f.deref).unwrap_or(false);
            if !deref {
                if let Some(loc) = self.find_in_frames(ns, name) {
                    return Some(loc);
                }
            }
            for frame in ns.frames.iter().rev() {
                if let Some(target) = frame.refs.get(name) {
                    let tag = format!("{namespace}:{name}");
                    if visited.insert(tag) {
                        if let Some(loc) =
                            self.resolve_var_inner(&target.namespace, &target.name, visited)
                        {
                            return Some(loc);
                        }
                    }
                }
            }
            if deref {
                if let Some(loc) = self.find_in_frames(ns, name) {
                    return Some(loc);
                }
            }
        }
        if ns.globals.contains_key(name) {
            return Some(VarLoc {
                namespace: ns.name.clone(),
                place: VarPlace::Global,
                name: name.to_string(),
            });
        }
        if ns.name != MAIN {
            if let Some(main) = self.namespaces.get(MAIN) {
                if main.globals.contains_key(name) {
                    return Some(VarLoc {
                        namespace: MAIN.to_string(),
                        place: VarPlace::Global,
                        name: name.to_string(),
                    });
                }
            }
        }
        if self.superglobals.contains_key(name) {
            return Some(VarLoc {
                namespace: String::new(),
                place: VarPlace::Superglobal,
                name: name.to_string(),
            });
        }
        None
    }

    fn find_in_frames(&self, ns: &Symbols, name: &str) -> Option<VarLoc> {
        for (idx, frame) in ns.frames.iter().enumerate().rev() {
            if frame.vars.contains_key(name) {
                return Some(VarLoc {
                    namespace: ns.name.clone(),
                    place: VarPlace::Frame(idx),
                    name: name.to_string(),
                });
            }
        }
        None
    }

    pub fn slot(&self, loc: &VarLoc) -> &Slot {
        match &loc.place {
            VarPlace::Superglobal => &self.superglobals[&loc.name],
            VarPlace::Global => &self.namespaces[&loc.namespace].globals[&loc.name],
            VarPlace::Frame(idx) => &self.namespaces[&loc.namespace].frames[*idx].vars[&loc.name],
        }
    }

    pub fn slot_mut(&mut self, loc: &VarLoc) -> &mut Slot {
        match &loc.place {
            VarPlace::Superglobal => self
                .superglobals
                .get_mut(&loc.name)
                .expect("resolved superglobal"),
            VarPlace::Global => self
                .namespaces
                .get_mut(&loc.namespace)
                .and_then(|ns| ns.globals.get_mut(&loc.name))
                .expect("resolved global"),
            VarPlace::Frame(idx) => self
                .namespaces
                .get_mut(&loc.namespace)
                .and_then(|ns| ns.frames.get_mut(*idx))
                .and_then(|frame| frame.vars.get_mut(&loc.name))
                .expect("resolved local"),
        }
    }

    // ------------------------------------------------------------------
    // Functions and structures (analogous cascades)
    // ------------------------------------------------------------------

    pub fn resolve_function(&self, namespace: &str, name: &str) -> Result<Rc<FunctionDef>> {
        let undeclared =
            || AlgoError::Undeclared(format!("Fonction >{name}< non déclarée"));
        let ns = self.namespace(namespace).ok_or_else(undeclared)?;
        if let Some(def) = ns.function(name) {
            return Ok(def);
        }
        if ns.name != MAIN {
            if let Some(main) = self.namespaces.get(MAIN) {
                if let Some(def) = main.function(name) {
                    return Ok(def);
                }
            }
        }
        Err(undeclared())
    }

    pub fn resolve_struct(&self, namespace: &str, name: &str) -> Result<Rc<StructDef>> {
        let undeclared =
            || AlgoError::Undeclared(format!("Structure >{name}< non déclarée"));
        let ns = self.namespace(namespace).ok_or_else(undeclared)?;
        if let Some(def) = ns.structure(name) {
            return Ok(def);
        }
        if ns.name != MAIN {
            if let Some(main) = self.namespaces.get(MAIN) {
                if let Some(def) = main.structure(name) {
                    return Ok(def);
                }
            }
        }
        Err(undeclared())
    }

    /// Collects every structure definition reachable from the given
    /// namespace into a self-contained registry, so value construction
    /// never borrows the environment.
    pub fn struct_defs(&self, namespace: &str) -> StructDefs {
        let mut defs = StructDefs::default();
        if let Some(main) = self.namespaces.get(MAIN) {
            defs.extend(main.structs.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(ns) = self.namespace(namespace) {
            defs.extend(ns.structs.iter().map(|(k, v)| (k.clone(), v.clone())));
            for frame in &ns.frames {
                defs.extend(frame.structs.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        defs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::RefTarget;
    use crate::values::Value;

    #[test]
    fn test_main_always_exists() {
        let env = Environment::new();
        assert_eq!(env.current_name(), MAIN);
        assert!(env.namespace("").is_some());
    }

    #[test]
    fn test_declare_namespace_switches_current() {
        let mut env = Environment::new();
        env.declare_namespace("util").unwrap();
        assert_eq!(env.current_name(), "util");
        assert!(env.declare_namespace("util").is_err());
        env.del_namespace("util");
        assert_eq!(env.current_name(), MAIN);
    }

    #[test]
    fn test_lookup_falls_back_to_main_then_superglobals() {
        let mut env = Environment::new();
        env.current_mut()
            .declare("g", Slot::variable(Value::int(1)))
            .unwrap();
        env.declare_superglobal("_REP", Slot::constant(Value::string("/tmp")))
            .unwrap();
        env.declare_namespace("util").unwrap();

        let loc = env.resolve_var("util", "g").unwrap();
        assert_eq!(loc.namespace, MAIN);
        let loc = env.resolve_var("util", "_REP").unwrap();
        assert_eq!(loc.place, VarPlace::Superglobal);
        assert!(env.resolve_var("util", "absente").is_err());
    }

    #[test]
    fn test_reference_resolution_with_deref_flag() {
        let mut env = Environment::new();
        env.current_mut()
            .declare("t", Slot::variable(Value::int(42)))
            .unwrap();
        env.current_mut().set_local("p", true);
        env.current_mut()
            .declare_ref(
                "t",
                RefTarget {
                    name: "t".to_string(),
                    namespace: MAIN.to_string(),
                },
            )
            .unwrap();
        // With the dereference flag set, `t` resolves through the
        // reference map to the caller's global despite sharing its name.
        let loc = env.resolve_var(MAIN, "t").unwrap();
        assert_eq!(loc.place, VarPlace::Global);
        assert_eq!(env.slot(&loc).value, Value::int(42));
    }

    #[test]
    fn test_reference_cycle_terminates() {
        let mut env = Environment::new();
        env.current_mut().set_local("p", true);
        env.current_mut()
            .declare_ref(
                "a",
                RefTarget {
                    name: "a".to_string(),
                    namespace: MAIN.to_string(),
                },
            )
            .unwrap();
        // `a` refers to itself; the visited set stops the walk and the
        // lookup reports an undeclared variable instead of spinning.
        assert!(env.resolve_var(MAIN, "a").is_err());
    }

    #[test]
    fn test_reset_keeps_main_only() {
        let mut env = Environment::new();
        env.declare_namespace("util").unwrap();
        env.current_mut()
            .declare("x", Slot::variable(Value::int(1)))
            .unwrap();
        env.reset();
        assert_eq!(env.namespace_names().count(), 1);
        assert_eq!(env.current_name(), MAIN);
    }
}
