//! The tree-walking evaluator.
//!
//! Executes the AST recursively against the namespace environment.
//! Control flow uses sentinel values rather than errors: a statement
//! evaluates to a [`Flow`], and loops and function bodies recognize
//! `Return`, `Continue` and `Exit`. Errors propagate as `AlgoError`;
//! the driver decides whether they are fatal (file mode, exit 666) or
//! recoverable (shell mode).
//!
//! Every function or procedure call pushes a frame that is popped on
//! every exit path, normal or not, so the scope discipline survives
//! propagated errors, panics and user interruptions.

use std::path::Path as FsPath;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fralgo_par::ast::{Accessor, Block, Expr, Path, Program, Stmt, StmtKind};
use fralgo_par::types::TypeSpec;
use fralgo_util::{AlgoError, Result};

use crate::fileio::FileTable;
use crate::libman::LibManager;
use crate::namespaces::{Environment, VarLoc, MAIN};
use crate::symbols::{RefTarget, Slot};
use crate::values::{
    binary_op, coerce, default_value, truthy, ArrayValue, CharValue, Record, TableKey,
    TableValue, Value,
};

/// Call depth beyond which recursion is reported.
pub const RECURSION_LIMIT: usize = 1000;

/// Result of executing a statement.
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Return(Value),
    Continue,
    Exit,
}

/// An access path with its index expressions already evaluated, so that
/// walking the target value never re-enters the evaluator.
enum ResolvedAccessor {
    Field(String),
    Index(Vec<Value>),
}

/// The interpreter state: environment, file channels, library manager.
pub struct Interp {
    pub env: Environment,
    pub files: FileTable,
    pub libs: LibManager,
    line: u32,
    depth: usize,
    interrupt: Arc<AtomicBool>,
}

impl Default for Interp {
    fn default() -> Self {
        Self::new()
    }
}

impl Interp {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            files: FileTable::new(),
            libs: LibManager::new(),
            line: 0,
            depth: 0,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Line of the statement being executed, for error reporting.
    pub fn current_line(&self) -> u32 {
        self.line
    }

    /// Shared flag raised by the driver's SIGINT handler; loops check it
    /// and surface `Interrompu par l'utilisateur`.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    fn check_interrupt(&self) -> Result<()> {
        if self.interrupt.swap(false, Ordering::SeqCst) {
            Err(AlgoError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Declares a process-wide constant (`_ARGS`, `_REP`).
    pub fn declare_superglobal_const(&mut self, name: &str, value: Value) -> Result<()> {
        self.env.declare_superglobal(name, Slot::constant(value))
    }

    /// Records the main source file for library resolution.
    pub fn set_main_file(&mut self, path: &FsPath) {
        self.libs.set_main(path);
    }

    // ==================================================================
    // Program entry points
    // ==================================================================

    /// Runs a parsed program. The returned value is the echo of a final
    /// expression statement, used by the interactive shell.
    pub fn run_program(&mut self, program: &Program) -> Result<Option<Value>> {
        match program {
            Program::Main { decls, body } => {
                self.exec_toplevel(decls)?;
                self.exec_toplevel(body)?;
                Ok(None)
            }
            Program::Declarations(block) => {
                self.exec_toplevel(block)?;
                Ok(None)
            }
            Program::Library { decls, init } => {
                self.exec_toplevel(decls)?;
                if let Some(init) = init {
                    self.exec_toplevel(init)?;
                }
                Ok(None)
            }
            Program::Statements(block) => {
                let mut last = None;
                for stmt in &block.stmts {
                    if let StmtKind::Expr(expr) = &stmt.kind {
                        self.line = stmt.line;
                        let value = self.eval_expr(expr)?;
                        last = match value {
                            Value::Nothing => None,
                            value => Some(value),
                        };
                    } else {
                        self.exec_one_toplevel(stmt)?;
                        last = None;
                    }
                }
                Ok(last)
            }
        }
    }

    fn exec_toplevel(&mut self, block: &Block) -> Result<()> {
        for stmt in &block.stmts {
            self.exec_one_toplevel(stmt)?;
        }
        Ok(())
    }

    fn exec_one_toplevel(&mut self, stmt: &Stmt) -> Result<()> {
        match self.exec_stmt(stmt)? {
            Flow::Normal => Ok(()),
            Flow::Return(_) => Err(AlgoError::BadType(
                "Retourne hors d'une fonction".to_string(),
            )),
            Flow::Continue => Err(AlgoError::Fatal("Continuer hors boucle".to_string())),
            Flow::Exit => Err(AlgoError::Fatal("Sortir hors boucle".to_string())),
        }
    }

    // ==================================================================
    // Statements
    // ==================================================================

    fn exec_block(&mut self, block: &Block) -> Result<Flow> {
        for stmt in &block.stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        self.line = stmt.line;
        match &stmt.kind {
            StmtKind::Declare { names, ty } => {
                for name in names {
                    let defs = self.env.struct_defs(self.env.current_name());
                    let value = default_value(ty, &defs)?;
                    self.env.current_mut().declare(name, Slot::variable(value))?;
                }
                Ok(Flow::Normal)
            }
            StmtKind::DeclareArray { arrays, elem } => {
                if let TypeSpec::Char(size) = elem {
                    CharValue::new(*size)?;
                }
                for (name, maxes) in arrays {
                    let ty = TypeSpec::Array {
                        elem: Box::new(elem.clone()),
                        maxes: maxes.clone(),
                    };
                    let defs = self.env.struct_defs(self.env.current_name());
                    let value = default_value(&ty, &defs)?;
                    self.env.current_mut().declare(name, Slot::variable(value))?;
                }
                Ok(Flow::Normal)
            }
            StmtKind::DeclareTable { name, key, value } => {
                let table = TableValue::new(key.clone(), value.clone())?;
                self.env
                    .current_mut()
                    .declare(name, Slot::variable(Value::Table(table)))?;
                Ok(Flow::Normal)
            }
            StmtKind::DeclareConst { name, value } => {
                let value = self.eval_expr(value)?;
                self.env.current_mut().declare(name, Slot::constant(value))?;
                Ok(Flow::Normal)
            }
            StmtKind::DeclareStruct { name, fields } => {
                self.declare_struct(name, fields)?;
                Ok(Flow::Normal)
            }
            StmtKind::Function(def) => {
                self.env
                    .current_mut()
                    .declare_function(Rc::new(def.clone()))?;
                Ok(Flow::Normal)
            }
            StmtKind::Import { lib, alias } => {
                self.import(lib, alias.as_deref())?;
                Ok(Flow::Normal)
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval_expr(value)?;
                self.assign_path(target, value)?;
                Ok(Flow::Normal)
            }
            StmtKind::AssignSeq { target, values } => {
                self.assign_record_tuple(target, values)?;
                Ok(Flow::Normal)
            }
            StmtKind::Print { args, newline, err } => {
                self.print(args, *newline, *err)?;
                Ok(Flow::Normal)
            }
            StmtKind::Read { target } => {
                self.read_into(target)?;
                Ok(Flow::Normal)
            }
            StmtKind::Resize { target, dims } => {
                self.resize(target, dims)?;
                Ok(Flow::Normal)
            }
            StmtKind::OpenFile {
                filename,
                channel,
                mode,
            } => {
                let filename = match self.eval_expr(filename)? {
                    Value::Str(Some(s)) => s,
                    other => {
                        return Err(AlgoError::BadType(format!(
                            "Type Chaîne attendu [{other}]"
                        )))
                    }
                };
                let channel = self.eval_to_int(channel)?;
                self.files.open(&filename, channel, *mode)?;
                Ok(Flow::Normal)
            }
            StmtKind::CloseFile { channel } => {
                let channel = self.eval_to_int(channel)?;
                self.files.close(channel)?;
                Ok(Flow::Normal)
            }
            StmtKind::ReadFile { channel, target } => {
                let channel = self.eval_to_int(channel)?;
                let line = self.files.read(channel)?;
                self.assign_path(target, Value::string(line))?;
                Ok(Flow::Normal)
            }
            StmtKind::WriteFile { channel, value } => {
                let channel = self.eval_to_int(channel)?;
                let value = self.eval_expr(value)?;
                self.files.write(channel, &value.to_string())?;
                Ok(Flow::Normal)
            }
            StmtKind::If { arms, otherwise } => {
                for (cond, block) in arms {
                    let cond = self.eval_expr(cond)?;
                    if truthy(&cond)? {
                        return self.exec_block(block);
                    }
                }
                if let Some(block) = otherwise {
                    return self.exec_block(block);
                }
                Ok(Flow::Normal)
            }
            StmtKind::While { cond, body } => {
                loop {
                    self.check_interrupt()?;
                    let value = self.eval_expr(cond)?;
                    if !truthy(&value)? {
                        break;
                    }
                    match self.exec_block(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Exit => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::For {
                var,
                start,
                end,
                step,
                body,
                next_var,
            } => self.exec_for(var, start, end, step.as_ref(), body, next_var),
            StmtKind::Return(expr) => {
                let value = self.eval_expr(expr)?;
                Ok(Flow::Return(value))
            }
            StmtKind::Panic(expr) => {
                let message = self.eval_expr(expr)?;
                Err(AlgoError::Panic(message.to_string()))
            }
            StmtKind::Continue => Ok(Flow::Continue),
            StmtKind::Exit => Ok(Flow::Exit),
            StmtKind::Sleep(expr) => {
                let duration = match self.eval_expr(expr)? {
                    Value::Integer(Some(n)) => n as f64,
                    Value::Float(Some(x)) => x,
                    _ => {
                        return Err(AlgoError::BadType(
                            "Dormir(E|N) : Type Entier ou Numérique attendu".to_string(),
                        ))
                    }
                };
                std::thread::sleep(std::time::Duration::from_secs_f64(duration.max(0.0)));
                Ok(Flow::Normal)
            }
            StmtKind::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn declare_struct(&mut self, name: &str, fields: &[(String, TypeSpec)]) -> Result<()> {
        for (field, ty) in fields {
            let valid = match ty {
                TypeSpec::Boolean
                | TypeSpec::Integer
                | TypeSpec::Float
                | TypeSpec::Str => true,
                TypeSpec::Char(size) => {
                    CharValue::new(*size)?;
                    true
                }
                TypeSpec::Struct(other) => {
                    other == name
                        || self
                            .env
                            .resolve_struct(self.env.current_name(), other)
                            .is_ok()
                }
                _ => false,
            };
            if !valid {
                return Err(AlgoError::BadType(format!(
                    "Type invalide : {name}.{field} en >{ty}<"
                )));
            }
        }
        let def = crate::structure::StructDef::new(name, fields.to_vec());
        self.env.current_mut().declare_structure(Rc::new(def))
    }

    fn exec_for(
        &mut self,
        var: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &Block,
        next_var: &str,
    ) -> Result<Flow> {
        if var != next_var {
            return Err(AlgoError::Fatal(format!(
                "Pour >>{var}<< ... >>{next_var}<< Suivant"
            )));
        }
        let start = self.eval_expr(start)?;
        let end = self.eval_expr(end)?;
        let step = match step {
            Some(expr) => self.eval_expr(expr)?,
            None => Value::int(1),
        };
        let target = Path::variable(var);

        // Integer loop when every bound is an integer, float otherwise.
        match (&start, &end, &step) {
            (Value::Integer(Some(s)), Value::Integer(Some(e)), Value::Integer(Some(st))) => {
                let (mut i, e, st) = (*s, *e, *st);
                if st == 0 {
                    return Err(AlgoError::Fatal("Pas invalide : 0".to_string()));
                }
                self.assign_path(&target, Value::int(i))?;
                while if st > 0 { i <= e } else { i >= e } {
                    self.check_interrupt()?;
                    match self.exec_block(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Exit => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    i += st;
                    self.assign_path(&target, Value::int(i))?;
                }
                Ok(Flow::Normal)
            }
            _ => {
                let to_f = |v: &Value| -> Result<f64> {
                    match v {
                        Value::Integer(Some(n)) => Ok(*n as f64),
                        Value::Float(Some(x)) => Ok(*x),
                        other => Err(AlgoError::BadType(format!(
                            "Pour : Type Entier ou Numérique attendu [{other}]"
                        ))),
                    }
                };
                let (mut i, e, st) = (to_f(&start)?, to_f(&end)?, to_f(&step)?);
                if st == 0.0 {
                    return Err(AlgoError::Fatal("Pas invalide : 0".to_string()));
                }
                self.assign_path(&target, Value::float(i))?;
                while if st > 0.0 { i <= e } else { i >= e } {
                    self.check_interrupt()?;
                    match self.exec_block(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Exit => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    i += st;
                    self.assign_path(&target, Value::float(i))?;
                }
                Ok(Flow::Normal)
            }
        }
    }

    fn print(&mut self, args: &[Expr], newline: bool, err: bool) -> Result<()> {
        use std::io::Write;
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.eval_expr(arg)?;
            parts.push(value.to_string());
        }
        let text = parts.join(" ");
        if err {
            let mut stderr = std::io::stderr();
            if newline {
                let _ = writeln!(stderr, "{text}");
            } else {
                let _ = write!(stderr, "{text}");
            }
            let _ = stderr.flush();
        } else {
            let mut stdout = std::io::stdout();
            if newline {
                let _ = writeln!(stdout, "{text}");
            } else {
                let _ = write!(stdout, "{text}");
            }
            let _ = stdout.flush();
        }
        Ok(())
    }

    fn read_into(&mut self, target: &Path) -> Result<()> {
        let mut input = String::new();
        match std::io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => {
                println!();
                return Err(AlgoError::Interrupted);
            }
            Ok(_) => {}
        }
        let line = input.trim_end_matches(['\n', '\r']);

        self.check_namespace_access(target)?;
        let accessors = self.resolve_accessors(&target.accessors)?;
        let loc = self.locate(target)?;
        let ty = self.terminal_type(&loc, &accessors)?;
        let value = parse_input(line, &ty)?;
        self.assign_resolved(target, &accessors, value)
    }

    fn resize(&mut self, target: &Path, dims: &[Expr]) -> Result<()> {
        let mut maxes = Vec::with_capacity(dims.len());
        for dim in dims {
            maxes.push(self.eval_to_int(dim)?);
        }
        let defs = self.env.struct_defs(self.env.current_name());
        let loc = self.locate(target)?;
        if self.env.slot(&loc).constant {
            return Err(AlgoError::ReadOnly(target.base.clone()));
        }
        match &mut self.env.slot_mut(&loc).value {
            Value::Array(array) => array.resize(maxes, &defs),
            other => Err(AlgoError::BadType(format!(
                "Redim : Type Tableau attendu [{}]",
                other.type_spec()
            ))),
        }
    }

    // ==================================================================
    // Paths: reading, writing, typing
    // ==================================================================

    /// Rejects qualified access to another namespace's `@`-private
    /// symbols.
    fn check_namespace_access(&self, path: &Path) -> Result<()> {
        if let Some(ns) = &path.namespace {
            if self.env.namespace(ns).is_none() {
                return Err(AlgoError::Fatal(format!("Espace de noms inconnu : {ns}")));
            }
            if path.base.starts_with('@') && ns != self.env.current_name() {
                return Err(AlgoError::Undeclared(format!(
                    "Symbole >{}< privé",
                    path.base
                )));
            }
        }
        Ok(())
    }

    fn locate(&self, path: &Path) -> Result<VarLoc> {
        let ns = path
            .namespace
            .clone()
            .unwrap_or_else(|| self.env.current_name().to_string());
        self.env.resolve_var(&ns, &path.base)
    }

    /// Evaluates index expressions ahead of the walk.
    fn resolve_accessors(&mut self, accessors: &[Accessor]) -> Result<Vec<ResolvedAccessor>> {
        let mut resolved = Vec::with_capacity(accessors.len());
        for accessor in accessors {
            match accessor {
                Accessor::Field(name) => resolved.push(ResolvedAccessor::Field(name.clone())),
                Accessor::Index(exprs) => {
                    let mut indexes = Vec::with_capacity(exprs.len());
                    for expr in exprs {
                        indexes.push(self.eval_expr(expr)?);
                    }
                    resolved.push(ResolvedAccessor::Index(indexes));
                }
            }
        }
        Ok(resolved)
    }

    /// Reads the raw value a path designates (no definedness check).
    fn read_path_raw(&mut self, path: &Path) -> Result<Value> {
        self.check_namespace_access(path)?;
        let accessors = self.resolve_accessors(&path.accessors)?;
        let loc = self.locate(path)?;
        let mut value = &self.env.slot(&loc).value;
        for accessor in &accessors {
            value = walk_step(value, accessor)?;
        }
        Ok(value.clone())
    }

    /// Reads a path for expression use: scalars must be defined, sized
    /// characters surface as strings, `Quelconque` unwraps.
    fn eval_path(&mut self, path: &Path) -> Result<Value> {
        let raw = self.read_path_raw(path)?;
        expression_value(raw)
    }

    /// Declared type at the end of an access path, derived from the
    /// slot's value tags and the structure registry.
    fn terminal_type(&self, loc: &VarLoc, accessors: &[ResolvedAccessor]) -> Result<TypeSpec> {
        let struct_ns = if loc.namespace.is_empty() {
            self.env.current_name().to_string()
        } else {
            loc.namespace.clone()
        };
        let mut ty = self.env.slot(loc).value.type_spec();
        for accessor in accessors {
            ty = match (accessor, ty) {
                (ResolvedAccessor::Field(field), TypeSpec::Struct(name)) => {
                    let def = self.env.resolve_struct(&struct_ns, &name)?;
                    def.field_type(field).cloned().ok_or_else(|| {
                        AlgoError::UnknownField(format!(
                            "{field} ne fait pas partie de {name}"
                        ))
                    })?
                }
                (ResolvedAccessor::Index(_), TypeSpec::Array { elem, .. }) => *elem,
                (ResolvedAccessor::Index(_), TypeSpec::Table { value, .. }) => *value,
                (_, other) => {
                    return Err(AlgoError::BadType(format!(
                        "{other} : Type d'accès invalide"
                    )))
                }
            };
        }
        Ok(ty)
    }

    /// Assignment through a path, with the coercions of the language.
    fn assign_path(&mut self, path: &Path, value: Value) -> Result<()> {
        self.check_namespace_access(path)?;
        let accessors = self.resolve_accessors(&path.accessors)?;
        self.assign_resolved(path, &accessors, value)
    }

    fn assign_resolved(
        &mut self,
        path: &Path,
        accessors: &[ResolvedAccessor],
        value: Value,
    ) -> Result<()> {
        let loc = self.locate(path)?;
        if self.env.slot(&loc).constant {
            return Err(AlgoError::ReadOnly(path.base.clone()));
        }
        let ty = self.terminal_type(&loc, accessors)?;
        let coerced = coerce(value, &ty)?;

        let slot = self.env.slot_mut(&loc);
        if accessors.is_empty() {
            slot.value = coerced;
            return Ok(());
        }
        let mut container = &mut slot.value;
        let (last, intermediate) = accessors.split_last().expect("non-empty accessors");
        for accessor in intermediate {
            container = walk_step_mut(container, accessor)?;
        }
        set_terminal(container, last, coerced)
    }

    /// `cible ← v1, v2, …`: fills a structure, one value per field.
    fn assign_record_tuple(&mut self, target: &Path, values: &[Expr]) -> Result<()> {
        self.check_namespace_access(target)?;
        let accessors = self.resolve_accessors(&target.accessors)?;
        let loc = self.locate(target)?;
        let ty = self.terminal_type(&loc, &accessors)?;
        let name = match ty {
            TypeSpec::Struct(name) => name,
            other => {
                return Err(AlgoError::BadType(format!(
                    "Type {other} attendu [structure]"
                )))
            }
        };
        let def = self
            .env
            .resolve_struct(self.env.current_name(), &name)?;
        if values.len() != def.fields.len() {
            return Err(AlgoError::InvalidValueCount(name));
        }
        let mut record = Record {
            name: name.clone(),
            fields: indexmap::IndexMap::new(),
        };
        for ((field, field_ty), expr) in def.fields.iter().zip(values) {
            let value = self.eval_expr(expr)?;
            let coerced = coerce(value, field_ty)?;
            record.fields.insert(field.clone(), coerced);
        }
        self.assign_resolved(target, &accessors, Value::Record(record))
    }

    // ==================================================================
    // Expressions
    // ==================================================================

    fn eval_to_int(&mut self, expr: &Expr) -> Result<i64> {
        match self.eval_expr(expr)? {
            Value::Integer(Some(n)) => Ok(n),
            other => Err(AlgoError::BadType(format!(
                "Type Entier attendu [{other}]"
            ))),
        }
    }

    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Bool(b) => Ok(Value::boolean(*b)),
            Expr::Int(n) => Ok(Value::int(*n)),
            Expr::Float(x) => Ok(Value::float(*x)),
            Expr::Str(s) => Ok(Value::string(s.clone())),
            Expr::Path(path) => self.eval_path(path),
            Expr::Reference(_) => Err(AlgoError::BadType(
                "Référence non autorisée dans une expression".to_string(),
            )),
            Expr::ArrayLit(elems) => self.eval_array_literal(elems),
            Expr::TableLit(entries) => self.eval_table_literal(entries),
            Expr::Binary { op, lhs, rhs } => {
                let a = self.eval_expr(lhs)?;
                let b = self.eval_expr(rhs)?;
                binary_op(*op, &a, &b)
            }
            Expr::Not(inner) => {
                let value = self.eval_expr(inner)?;
                Ok(Value::boolean(!truthy(&value)?))
            }
            Expr::Neg(inner) => match self.eval_expr(inner)? {
                Value::Integer(Some(n)) => Ok(Value::int(-n)),
                Value::Float(Some(x)) => Ok(Value::float(-x)),
                _ => Err(AlgoError::BadType(
                    "-E|N : Type Entier ou Numérique attendu".to_string(),
                )),
            },
            Expr::Call {
                namespace,
                name,
                args,
            } => {
                let result = self.call(namespace.as_deref(), name, args)?;
                Ok(result.unwrap_or(Value::Nothing))
            }
            Expr::Builtin(builtin) => self.eval_builtin(builtin),
        }
    }

    fn eval_array_literal(&mut self, elems: &[Expr]) -> Result<Value> {
        if elems.is_empty() {
            return Ok(Value::Array(ArrayValue {
                elem: TypeSpec::Any,
                maxes: vec![-1],
                data: Vec::new(),
            }));
        }
        let mut values = Vec::with_capacity(elems.len());
        for elem in elems {
            values.push(self.eval_expr(elem)?);
        }
        let nested = values.iter().all(|v| matches!(v, Value::Array(_)));
        if nested {
            let first = match &values[0] {
                Value::Array(a) => a.clone(),
                _ => unreachable!(),
            };
            for value in &values {
                let Value::Array(sub) = value else { unreachable!() };
                if sub.maxes != first.maxes {
                    return Err(AlgoError::BadType(
                        "Tableau non rectangulaire".to_string(),
                    ));
                }
                if sub.elem != first.elem {
                    return Err(AlgoError::BadType(
                        "Types mélangés dans le tableau".to_string(),
                    ));
                }
            }
            let mut maxes = vec![values.len() as i64 - 1];
            maxes.extend(first.maxes.iter().copied());
            let mut data = Vec::new();
            for value in values {
                let Value::Array(sub) = value else { unreachable!() };
                data.extend(sub.data);
            }
            return Ok(Value::Array(ArrayValue {
                elem: first.elem,
                maxes,
                data,
            }));
        }
        let elem = values[0].type_spec();
        for value in &values[1..] {
            if value.type_spec() != elem {
                return Err(AlgoError::BadType(
                    "Types mélangés dans le tableau".to_string(),
                ));
            }
        }
        Ok(Value::Array(ArrayValue {
            elem,
            maxes: vec![values.len() as i64 - 1],
            data: values,
        }))
    }

    fn eval_table_literal(&mut self, entries: &[(Expr, Expr)]) -> Result<Value> {
        if entries.is_empty() {
            return Ok(Value::Table(TableValue::new(TypeSpec::Str, TypeSpec::Any)?));
        }
        let mut evaluated = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let key = self.eval_expr(key)?;
            let value = self.eval_expr(value)?;
            evaluated.push((key, value));
        }
        let key_ty = evaluated[0].0.type_spec();
        let value_ty = evaluated[0].1.type_spec();
        let mut table = TableValue::new(key_ty, value_ty)?;
        for (key, value) in evaluated {
            let key = TableKey::from_value(&key, &table.key)?;
            let value = coerce(value, &table.value.clone())?;
            table.entries.insert(key, value);
        }
        Ok(Value::Table(table))
    }

    // ==================================================================
    // Calls
    // ==================================================================

    /// Calls a function or procedure. Returns `None` for procedures.
    pub fn call(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        args: &[Expr],
    ) -> Result<Option<Value>> {
        if let Some(ns) = namespace {
            if self.env.namespace(ns).is_none() {
                return Err(AlgoError::Fatal(format!("Espace de noms inconnu : {ns}")));
            }
            if name.starts_with('@') && ns != self.env.current_name() {
                return Err(AlgoError::Undeclared(format!("Symbole >{name}< privé")));
            }
        }
        if self.depth >= RECURSION_LIMIT {
            return Err(AlgoError::RecursionLimit);
        }
        let caller_ns = self.env.current_name().to_string();
        let target_ns = namespace.unwrap_or(&caller_ns).to_string();
        let func = self.env.resolve_function(&target_ns, name)?;
        if args.len() != func.params.len() {
            return Err(AlgoError::InvalidParameterCount {
                actual: args.len(),
                expected: func.params.len(),
            });
        }

        // Bindings evaluate in the caller's scope, before the frame.
        enum Binding {
            Value(String, Value),
            Ref(String, RefTarget),
        }
        let mut bindings = Vec::with_capacity(args.len());
        let mut any_ref = false;
        for (param, arg) in func.params.iter().zip(args) {
            if param.by_ref {
                let target = match arg {
                    Expr::Reference(name) => name.clone(),
                    Expr::Path(p) if p.is_bare() && p.namespace.is_none() => p.base.clone(),
                    _ => {
                        return Err(AlgoError::BadType(format!(
                            "&variable attendu pour >{}<",
                            param.name
                        )))
                    }
                };
                any_ref = true;
                bindings.push(Binding::Ref(
                    param.name.clone(),
                    RefTarget {
                        name: target,
                        namespace: caller_ns.clone(),
                    },
                ));
            } else {
                let value = self.eval_expr(arg)?;
                let coerced = coerce(value, &param.ty).map_err(|_| {
                    AlgoError::BadType(format!(
                        "Type invalide : >{}< type {} attendu",
                        param.name, param.ty
                    ))
                })?;
                bindings.push(Binding::Value(param.name.clone(), coerced));
            }
        }

        let switched = target_ns != caller_ns;
        if switched {
            self.env.set_current(&target_ns)?;
        }
        self.env.current_mut().set_local(name, any_ref);
        self.depth += 1;

        let outcome = (|| -> Result<Flow> {
            for binding in bindings {
                match binding {
                    Binding::Value(name, value) => self
                        .env
                        .current_mut()
                        .declare(&name, Slot::variable(value))?,
                    Binding::Ref(name, target) => {
                        self.env.current_mut().declare_ref(&name, target)?
                    }
                }
            }
            self.exec_block(&func.body)
        })();

        // The frame pops on every exit path, error included.
        self.depth -= 1;
        self.env.current_mut().del_local();
        if switched {
            let _ = self.env.set_current(&caller_ns);
        }

        match outcome? {
            Flow::Return(value) => match &func.return_type {
                Some(ty) => {
                    let returned = coerce(value, ty).map_err(|_| {
                        AlgoError::BadType(format!(
                            "Fonction >{name}< : type {ty} attendu en retour"
                        ))
                    })?;
                    Ok(Some(expression_value(returned)?))
                }
                None => Err(AlgoError::BadType(format!(
                    "Procédure >{name}< : Retourne non autorisé"
                ))),
            },
            Flow::Normal => {
                if func.return_type.is_some() {
                    Err(AlgoError::BadType(format!(
                        "Fonction >{name}< : aucune valeur retournée"
                    )))
                } else {
                    Ok(None)
                }
            }
            Flow::Continue => Err(AlgoError::Fatal("Continuer hors boucle".to_string())),
            Flow::Exit => Err(AlgoError::Fatal("Sortir hors boucle".to_string())),
        }
    }

    // ==================================================================
    // Imports
    // ==================================================================

    /// `Importer "lib" [Alias nom]`: binds a library file to a
    /// namespace. On failure the namespace rolls back; the current
    /// namespace is restored either way.
    pub fn import(&mut self, lib: &str, alias: Option<&str>) -> Result<()> {
        let content = self.libs.load(lib)?;
        let alias = alias
            .map(str::to_string)
            .unwrap_or_else(|| LibManager::default_alias(lib));
        self.env.declare_namespace(&alias)?;
        self.libs.imports.push(alias.clone());

        let outcome = (|| -> Result<()> {
            let program = fralgo_par::parse(&content)?;
            match program {
                Program::Library { decls, init } => {
                    self.exec_toplevel(&decls)?;
                    if let Some(init) = init {
                        self.exec_toplevel(&init)?;
                    }
                    Ok(())
                }
                _ => Err(AlgoError::Fatal(format!(
                    "`{lib}` n'est pas une librairie."
                ))),
            }
        })();

        self.libs.imports.pop();
        let previous = self
            .libs
            .imports
            .last()
            .cloned()
            .unwrap_or_else(|| MAIN.to_string());
        if outcome.is_err() {
            self.env.del_namespace(&alias);
        }
        let _ = self.env.set_current(&previous);
        outcome
    }

    // ==================================================================
    // Support shared with builtins
    // ==================================================================

    /// `Type(cible)`: the declared type of a path, without requiring the
    /// value to be defined.
    pub(crate) fn path_type_name(&mut self, path: &Path) -> Result<String> {
        self.check_namespace_access(path)?;
        let accessors = self.resolve_accessors(&path.accessors)?;
        let loc = self.locate(path)?;
        Ok(self.terminal_type(&loc, &accessors)?.to_string())
    }

    pub(crate) fn eval_int_arg(&mut self, expr: &Expr) -> Result<i64> {
        self.eval_to_int(expr)
    }
}

/// Normalizes a raw stored value into an expression operand: scalar
/// payloads must be present, sized characters read as strings, and
/// `Quelconque` unwraps to its content.
fn expression_value(raw: Value) -> Result<Value> {
    let undefined = || AlgoError::Undefined("Valeur indéfinie".to_string());
    match raw {
        Value::Boolean(None)
        | Value::Integer(None)
        | Value::Float(None)
        | Value::Str(None) => Err(undefined()),
        Value::Char(CharValue { text, .. }) => match text {
            Some(text) => Ok(Value::Str(Some(text))),
            None => Err(undefined()),
        },
        Value::Any(Some(inner)) => expression_value(*inner),
        Value::Any(None) => Err(undefined()),
        other => Ok(other),
    }
}

fn deref_any(value: &Value) -> &Value {
    match value {
        Value::Any(Some(inner)) => deref_any(inner),
        other => other,
    }
}

fn deref_any_mut(value: &mut Value) -> &mut Value {
    if matches!(value, Value::Any(Some(_))) {
        match value {
            Value::Any(Some(inner)) => deref_any_mut(inner),
            _ => unreachable!(),
        }
    } else {
        value
    }
}

fn index_ints(indexes: &[Value]) -> Result<Vec<i64>> {
    indexes
        .iter()
        .map(|v| match deref_any(v) {
            Value::Integer(Some(n)) => Ok(*n),
            other => Err(AlgoError::BadType(format!(
                "Type Entier attendu [{other}]"
            ))),
        })
        .collect()
}

/// One step of a read walk.
fn walk_step<'v>(value: &'v Value, accessor: &ResolvedAccessor) -> Result<&'v Value> {
    let value = deref_any(value);
    match accessor {
        ResolvedAccessor::Field(field) => match value {
            Value::Record(record) => record.fields.get(field).ok_or_else(|| {
                AlgoError::UnknownField(format!(
                    "{field} ne fait pas partie de {}",
                    record.name
                ))
            }),
            Value::Nothing => Err(AlgoError::Undefined("Valeur indéfinie".to_string())),
            other => Err(AlgoError::BadType(format!(
                "{} : Type d'accès invalide",
                other.type_spec()
            ))),
        },
        ResolvedAccessor::Index(indexes) => match value {
            Value::Array(array) => {
                let indexes = index_ints(indexes)?;
                array.get(&indexes)
            }
            Value::Table(table) => {
                let key = single_key(indexes, &table.key)?;
                table
                    .entries
                    .get(&key)
                    .ok_or_else(|| AlgoError::Undefined(format!("Clef inexistante : {key}")))
            }
            other => Err(AlgoError::BadType(format!(
                "{} : Type d'accès invalide",
                other.type_spec()
            ))),
        },
    }
}

/// One step of a write walk (intermediate accessors only).
fn walk_step_mut<'v>(value: &'v mut Value, accessor: &ResolvedAccessor) -> Result<&'v mut Value> {
    let value = deref_any_mut(value);
    match accessor {
        ResolvedAccessor::Field(field) => match value {
            Value::Record(record) => {
                let name = record.name.clone();
                record.fields.get_mut(field).ok_or_else(|| {
                    AlgoError::UnknownField(format!("{field} ne fait pas partie de {name}"))
                })
            }
            Value::Nothing => Err(AlgoError::Undefined("Valeur indéfinie".to_string())),
            other => Err(AlgoError::BadType(format!(
                "{} : Type d'accès invalide",
                other.type_spec()
            ))),
        },
        ResolvedAccessor::Index(indexes) => match value {
            Value::Array(array) => {
                let indexes = index_ints(indexes)?;
                array.get_mut(&indexes)
            }
            Value::Table(table) => {
                let key = single_key(indexes, &table.key)?;
                table
                    .entries
                    .get_mut(&key)
                    .ok_or_else(|| AlgoError::Undefined(format!("Clef inexistante : {key}")))
            }
            other => Err(AlgoError::BadType(format!(
                "{} : Type d'accès invalide",
                other.type_spec()
            ))),
        },
    }
}

/// Terminal write. Table writes insert missing keys.
fn set_terminal(container: &mut Value, accessor: &ResolvedAccessor, value: Value) -> Result<()> {
    let container = deref_any_mut(container);
    match accessor {
        ResolvedAccessor::Field(field) => match container {
            Value::Record(record) => {
                let name = record.name.clone();
                let slot = record.fields.get_mut(field).ok_or_else(|| {
                    AlgoError::UnknownField(format!("{field} ne fait pas partie de {name}"))
                })?;
                *slot = value;
                Ok(())
            }
            Value::Nothing => Err(AlgoError::Undefined("Valeur indéfinie".to_string())),
            other => Err(AlgoError::BadType(format!(
                "{} : Type d'accès invalide",
                other.type_spec()
            ))),
        },
        ResolvedAccessor::Index(indexes) => match container {
            Value::Array(array) => {
                let indexes = index_ints(indexes)?;
                *array.get_mut(&indexes)? = value;
                Ok(())
            }
            Value::Table(table) => {
                let key = single_key(indexes, &table.key)?;
                table.entries.insert(key, value);
                Ok(())
            }
            other => Err(AlgoError::BadType(format!(
                "{} : Type d'accès invalide",
                other.type_spec()
            ))),
        },
    }
}

fn single_key(indexes: &[Value], key_type: &TypeSpec) -> Result<TableKey> {
    match indexes {
        [key] => TableKey::from_value(deref_any(key), key_type),
        _ => Err(AlgoError::BadType(
            "Table : une seule clef attendue".to_string(),
        )),
    }
}

/// Parses a line of user or file input according to the target type.
fn parse_input(line: &str, ty: &TypeSpec) -> Result<Value> {
    match ty {
        TypeSpec::Integer => line
            .trim()
            .parse::<i64>()
            .map(Value::int)
            .map_err(|_| AlgoError::BadType("Type Entier attendu".to_string())),
        TypeSpec::Float => line
            .trim()
            .parse::<f64>()
            .map(Value::float)
            .map_err(|_| AlgoError::BadType("Type Numérique attendu".to_string())),
        TypeSpec::Boolean => match line.trim() {
            "VRAI" => Ok(Value::boolean(true)),
            "FAUX" => Ok(Value::boolean(false)),
            _ => Err(AlgoError::BadType("Type Booléen attendu".to_string())),
        },
        TypeSpec::Str | TypeSpec::Char(_) | TypeSpec::Any => Ok(Value::string(line)),
        other => Err(AlgoError::BadType(format!("Type {other} attendu"))),
    }
}
