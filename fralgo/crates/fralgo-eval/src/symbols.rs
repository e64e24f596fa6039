//! Per-namespace symbol tables and call frames.
//!
//! A namespace owns its globals, structure registry, callable map and a
//! stack of frames. A frame is pushed on call entry and popped on every
//! exit path; it holds local variables, local callables and structures
//! (declarations nested in a body), the reference map of by-reference
//! parameters, and a context descriptor: the callee name plus the
//! dereference flag that turns on reference-map lookups.

use std::rc::Rc;

use fralgo_par::ast::FunctionDef;
use fralgo_util::{AlgoError, FxHashMap, Result};

use crate::structure::StructDef;
use crate::values::Value;

/// A variable slot; constants are write-once.
#[derive(Debug, Clone)]
pub struct Slot {
    pub value: Value,
    pub constant: bool,
}

impl Slot {
    pub fn variable(value: Value) -> Self {
        Self {
            value,
            constant: false,
        }
    }

    pub fn constant(value: Value) -> Self {
        Self {
            value,
            constant: true,
        }
    }
}

/// Target of a reference binding: a variable descriptor in the caller's
/// world, resolved lazily through the lookup cascade.
#[derive(Debug, Clone)]
pub struct RefTarget {
    pub name: String,
    pub namespace: String,
}

/// One call frame.
#[derive(Debug, Default)]
pub struct Frame {
    pub vars: FxHashMap<String, Slot>,
    pub refs: FxHashMap<String, RefTarget>,
    pub funcs: FxHashMap<String, Rc<FunctionDef>>,
    pub structs: FxHashMap<String, Rc<StructDef>>,
    /// Callee name, for context in dumps and errors.
    pub context: String,
    /// When set, reference-map lookups take precedence so a reference
    /// parameter may shadow a same-named local of the caller.
    pub deref: bool,
}

/// The symbol table of one namespace.
#[derive(Debug, Default)]
pub struct Symbols {
    pub name: String,
    pub globals: FxHashMap<String, Slot>,
    pub funcs: FxHashMap<String, Rc<FunctionDef>>,
    pub structs: FxHashMap<String, Rc<StructDef>>,
    pub frames: Vec<Frame>,
}

impl Symbols {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_local(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Declares a variable or constant in the current scope: the top
    /// frame when one is pushed, the namespace globals otherwise.
    pub fn declare(&mut self, name: &str, slot: Slot) -> Result<()> {
        let scope = match self.frames.last_mut() {
            Some(frame) => &mut frame.vars,
            None => &mut self.globals,
        };
        if scope.contains_key(name) {
            return Err(AlgoError::Redeclared(format!(
                "Redéclaration de la variable >{name}<"
            )));
        }
        scope.insert(name.to_string(), slot);
        Ok(())
    }

    /// Binds a reference parameter in the top frame.
    pub fn declare_ref(&mut self, name: &str, target: RefTarget) -> Result<()> {
        let frame = self
            .frames
            .last_mut()
            .expect("reference binding outside of a call frame");
        if frame.refs.contains_key(name) {
            return Err(AlgoError::Redeclared(format!(
                "Redéclaration de la référence >{name}<"
            )));
        }
        frame.refs.insert(name.to_string(), target);
        Ok(())
    }

    pub fn declare_function(&mut self, def: Rc<FunctionDef>) -> Result<()> {
        let scope = match self.frames.last_mut() {
            Some(frame) => &mut frame.funcs,
            None => &mut self.funcs,
        };
        if scope.contains_key(&def.name) {
            return Err(AlgoError::Redeclared(format!(
                "Redéclaration de la fonction >{}<",
                def.name
            )));
        }
        scope.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn declare_structure(&mut self, def: Rc<StructDef>) -> Result<()> {
        let scope = match self.frames.last_mut() {
            Some(frame) => &mut frame.structs,
            None => &mut self.structs,
        };
        if scope.contains_key(&def.name) {
            return Err(AlgoError::Redeclared(format!(
                "Redéclaration de la structure >{}<",
                def.name
            )));
        }
        scope.insert(def.name.clone(), def);
        Ok(())
    }

    /// Pushes the aligned local maps and context descriptor.
    pub fn set_local(&mut self, context: &str, deref: bool) {
        self.frames.push(Frame {
            context: context.to_string(),
            deref,
            ..Default::default()
        });
    }

    /// Pops them; call sites guarantee this runs on every exit path.
    pub fn del_local(&mut self) {
        self.frames.pop();
    }

    /// Looks a function up through local frames, then the namespace map.
    pub fn function(&self, name: &str) -> Option<Rc<FunctionDef>> {
        for frame in self.frames.iter().rev() {
            if let Some(def) = frame.funcs.get(name) {
                return Some(def.clone());
            }
        }
        self.funcs.get(name).cloned()
    }

    /// Looks a structure up through local frames, then the namespace map.
    pub fn structure(&self, name: &str) -> Option<Rc<StructDef>> {
        for frame in self.frames.iter().rev() {
            if let Some(def) = frame.structs.get(name) {
                return Some(def.clone());
            }
        }
        self.structs.get(name).cloned()
    }

    /// Drops every user declaration of the namespace.
    pub fn reset(&mut self) {
        self.globals.clear();
        self.funcs.clear();
        self.structs.clear();
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeclaration_fails() {
        let mut sym = Symbols::new("main");
        sym.declare("x", Slot::variable(Value::Integer(None))).unwrap();
        let err = sym
            .declare("x", Slot::variable(Value::Integer(None)))
            .unwrap_err();
        assert!(matches!(err, AlgoError::Redeclared(_)));
    }

    #[test]
    fn test_local_frame_shadows_scope() {
        let mut sym = Symbols::new("main");
        sym.declare("x", Slot::variable(Value::int(1))).unwrap();
        sym.set_local("f", false);
        // Same name is a fresh declaration in the frame scope.
        sym.declare("x", Slot::variable(Value::int(2))).unwrap();
        assert_eq!(sym.frames.last().unwrap().vars["x"].value, Value::int(2));
        sym.del_local();
        assert_eq!(sym.globals["x"].value, Value::int(1));
    }

    #[test]
    fn test_local_functions_resolve_before_globals() {
        let mut sym = Symbols::new("main");
        let global = Rc::new(FunctionDef {
            name: "f".to_string(),
            params: vec![],
            body: fralgo_par::ast::Block::default(),
            return_type: None,
        });
        sym.declare_function(global.clone()).unwrap();
        sym.set_local("g", false);
        assert!(sym.function("f").is_some());
        sym.del_local();
        assert!(sym.function("f").is_some());
        assert!(sym.function("absente").is_none());
    }
}
