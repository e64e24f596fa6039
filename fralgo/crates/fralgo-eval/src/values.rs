//! The Algo value model.
//!
//! Values are a tagged union; every variant knows its own type, so the
//! declared type of a variable can always be recovered at run time, even
//! before the first assignment: a declared-but-unassigned scalar carries
//! `None` in its payload and reads as `Valeur indéfinie`.
//!
//! Arithmetic and comparison are a matrix over (operator, left tag,
//! right tag) with one numeric coercion rule: integers promote to floats
//! whenever a float is expected. Division floors toward negative
//! infinity when both operands are integers.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use fralgo_par::ast::BinOp;
use fralgo_par::types::TypeSpec;
use fralgo_util::{AlgoError, Result};

use crate::structure::{StructDef, StructLookup};

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `Booléen`; `None` until first assignment.
    Boolean(Option<bool>),
    /// `Entier`
    Integer(Option<i64>),
    /// `Numérique`
    Float(Option<f64>),
    /// `Chaîne`
    Str(Option<String>),
    /// `Caractère*N` - fixed-size text.
    Char(CharValue),
    /// `Tableau`
    Array(ArrayValue),
    /// A structure instance.
    Record(Record),
    /// `Table`
    Table(TableValue),
    /// `Quelconque`; becomes concrete on first assignment.
    Any(Option<Box<Value>>),
    /// Declared but typeless emptiness: recursive structure fields
    /// before their first assignment. Prints as `?`, reads as false in
    /// boolean contexts.
    Nothing,
}

impl Value {
    /// Declared type of this value, recoverable at any time.
    pub fn type_spec(&self) -> TypeSpec {
        match self {
            Value::Boolean(_) => TypeSpec::Boolean,
            Value::Integer(_) => TypeSpec::Integer,
            Value::Float(_) => TypeSpec::Float,
            Value::Str(_) => TypeSpec::Str,
            Value::Char(c) => TypeSpec::Char(c.size),
            Value::Array(a) => TypeSpec::Array {
                elem: Box::new(a.elem.clone()),
                maxes: a.maxes.clone(),
            },
            Value::Record(r) => TypeSpec::Struct(r.name.clone()),
            Value::Table(t) => TypeSpec::Table {
                key: Box::new(t.key.clone()),
                value: Box::new(t.value.clone()),
            },
            Value::Any(Some(inner)) => inner.type_spec(),
            Value::Any(None) | Value::Nothing => TypeSpec::Any,
        }
    }

    /// True while no value has been assigned.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Boolean(v) => v.is_none(),
            Value::Integer(v) => v.is_none(),
            Value::Float(v) => v.is_none(),
            Value::Str(v) => v.is_none(),
            Value::Char(c) => c.text.is_none(),
            Value::Array(a) => a.data.iter().all(Value::is_empty),
            Value::Record(r) => r.fields.values().all(Value::is_empty),
            Value::Table(t) => t.entries.is_empty(),
            Value::Any(v) => v.is_none(),
            Value::Nothing => true,
        }
    }
}

/// `Caractère*N`: text padded or truncated to exactly `size` characters.
#[derive(Debug, Clone, PartialEq)]
pub struct CharValue {
    pub text: Option<String>,
    pub size: i64,
}

impl CharValue {
    /// An empty sized character; the size must lie in 1..=255.
    pub fn new(size: i64) -> Result<Self> {
        if !(1..=255).contains(&size) {
            return Err(AlgoError::InvalidCharSize(size));
        }
        Ok(Self { text: None, size })
    }

    /// Writes `text`, right-padding with spaces below the declared size
    /// and silently truncating above it.
    pub fn assign(&mut self, text: &str) {
        let size = self.size as usize;
        let count = text.chars().count();
        let fitted = if count < size {
            let mut s = String::with_capacity(size);
            s.push_str(text);
            s.extend(std::iter::repeat(' ').take(size - count));
            s
        } else {
            text.chars().take(size).collect()
        };
        self.text = Some(fitted);
    }
}

/// `Tableau`: rectangular storage, 0-based indexes, one maximum index
/// per dimension. `maxes == [-1]` is the undimensioned state produced by
/// `Tableau t[] en T`; storage appears at the first `Redim`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub elem: TypeSpec,
    pub maxes: Vec<i64>,
    /// Row-major storage, `∏ (max_i + 1)` elements.
    pub data: Vec<Value>,
}

impl ArrayValue {
    pub fn new(elem: TypeSpec, maxes: Vec<i64>, structs: &dyn StructLookup) -> Result<Self> {
        if maxes.iter().any(|&m| m < 0) {
            return Ok(Self {
                elem,
                maxes,
                data: Vec::new(),
            });
        }
        let total: i64 = maxes.iter().map(|&m| m + 1).product();
        let template = default_value(&elem, structs)?;
        let data = vec![template; total as usize];
        Ok(Self { elem, maxes, data })
    }

    pub fn is_dimensioned(&self) -> bool {
        self.maxes.iter().all(|&m| m >= 0)
    }

    /// Row-major offset of a fully validated index tuple.
    pub fn offset(&self, indexes: &[i64]) -> Result<usize> {
        if indexes.len() != self.maxes.len() || !self.is_dimensioned() {
            return Err(AlgoError::ResizeFailed);
        }
        let mut offset: i64 = 0;
        for (&idx, &max) in indexes.iter().zip(&self.maxes) {
            if idx < 0 || idx > max {
                return Err(AlgoError::IndexOutOfRange(idx));
            }
            offset = offset * (max + 1) + idx;
        }
        Ok(offset as usize)
    }

    pub fn get(&self, indexes: &[i64]) -> Result<&Value> {
        let offset = self.offset(indexes)?;
        Ok(&self.data[offset])
    }

    pub fn get_mut(&mut self, indexes: &[i64]) -> Result<&mut Value> {
        let offset = self.offset(indexes)?;
        Ok(&mut self.data[offset])
    }

    /// Resizes to new maximum indexes, preserving every value that
    /// remains within bounds (row-major copy over the index overlap).
    /// Resizing an undimensioned array creates fresh storage; a negative
    /// dimension or a rank change fails.
    pub fn resize(&mut self, maxes: Vec<i64>, structs: &dyn StructLookup) -> Result<()> {
        if maxes.iter().any(|&m| m < 0) {
            return Err(AlgoError::ResizeFailed);
        }
        if !self.is_dimensioned() {
            *self = ArrayValue::new(self.elem.clone(), maxes, structs)?;
            return Ok(());
        }
        if maxes.len() != self.maxes.len() {
            return Err(AlgoError::ResizeFailed);
        }
        if maxes == self.maxes {
            return Ok(());
        }
        let mut resized = ArrayValue::new(self.elem.clone(), maxes, structs)?;
        for indexes in overlap_indexes(&self.maxes, &resized.maxes) {
            let value = self.get(&indexes)?.clone();
            *resized.get_mut(&indexes)? = value;
        }
        *self = resized;
        Ok(())
    }

    /// `Taille`: the size for one dimension, an array of sizes beyond.
    pub fn size_value(&self) -> Value {
        if self.maxes.len() == 1 {
            let size = if self.maxes[0] < 0 { 0 } else { self.maxes[0] + 1 };
            return Value::Integer(Some(size));
        }
        let data = self
            .maxes
            .iter()
            .map(|&m| Value::Integer(Some(m + 1)))
            .collect();
        Value::Array(ArrayValue {
            elem: TypeSpec::Integer,
            maxes: vec![self.maxes.len() as i64 - 1],
            data,
        })
    }

    /// `Longueur`: how many elements hold a value.
    pub fn assigned_count(&self) -> i64 {
        self.data.iter().filter(|v| !v.is_empty()).count() as i64
    }
}

/// All index tuples valid in both the old and the new bounds.
fn overlap_indexes(old: &[i64], new: &[i64]) -> Vec<Vec<i64>> {
    fn build(bounds: &[i64], prefix: &mut Vec<i64>, out: &mut Vec<Vec<i64>>) {
        match bounds.split_first() {
            None => out.push(prefix.clone()),
            Some((&max, rest)) => {
                for idx in 0..=max {
                    prefix.push(idx);
                    build(rest, prefix, out);
                    prefix.pop();
                }
            }
        }
    }
    let bounds: Vec<i64> = old.iter().zip(new).map(|(&a, &b)| a.min(b)).collect();
    let mut out = Vec::new();
    build(&bounds, &mut Vec::new(), &mut out);
    out
}

/// A structure instance: ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub fields: IndexMap<String, Value>,
}

impl Record {
    /// Builds an instance with every field at its default. A field whose
    /// type is a structure already being instantiated (the recursive
    /// case) starts as [`Value::Nothing`].
    pub fn instantiate(def: &StructDef, structs: &dyn StructLookup) -> Result<Record> {
        let mut visiting = Vec::new();
        Self::instantiate_inner(def, structs, &mut visiting)
    }

    fn instantiate_inner(
        def: &StructDef,
        structs: &dyn StructLookup,
        visiting: &mut Vec<String>,
    ) -> Result<Record> {
        visiting.push(def.name.clone());
        let mut fields = IndexMap::new();
        for (field, ty) in &def.fields {
            let value = default_value_inner(ty, structs, visiting)?;
            fields.insert(field.clone(), value);
        }
        visiting.pop();
        Ok(Record {
            name: def.name.clone(),
            fields,
        })
    }
}

/// A hashable table key. Restricting keys to these variants keeps a
/// stable text form and a total equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableKey {
    Int(i64),
    Text(String),
    Bool(bool),
}

impl TableKey {
    /// Converts an evaluated expression into a key of the declared type.
    pub fn from_value(value: &Value, key_type: &TypeSpec) -> Result<TableKey> {
        match (key_type, value) {
            (TypeSpec::Integer, Value::Integer(Some(n))) => Ok(TableKey::Int(*n)),
            (TypeSpec::Str, Value::Str(Some(s))) => Ok(TableKey::Text(s.clone())),
            (TypeSpec::Char(_), Value::Str(Some(s))) => Ok(TableKey::Text(s.clone())),
            (TypeSpec::Char(_), Value::Char(CharValue { text: Some(s), .. })) => {
                Ok(TableKey::Text(s.clone()))
            }
            (TypeSpec::Boolean, Value::Boolean(Some(b))) => Ok(TableKey::Bool(*b)),
            _ => Err(AlgoError::BadType(format!(
                "Type {key_type} attendu [{value}]"
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            TableKey::Int(n) => Value::Integer(Some(*n)),
            TableKey::Text(s) => Value::Str(Some(s.clone())),
            TableKey::Bool(b) => Value::Boolean(Some(*b)),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKey::Int(n) => write!(f, "{n}"),
            TableKey::Text(s) => write!(f, "{s}"),
            TableKey::Bool(b) => f.write_str(if *b { "VRAI" } else { "FAUX" }),
        }
    }
}

/// `Table`: an insertion-ordered mapping with declared key and value
/// types. Keys are unique; writing an existing key replaces its value.
#[derive(Debug, Clone, PartialEq)]
pub struct TableValue {
    pub key: TypeSpec,
    pub value: TypeSpec,
    pub entries: IndexMap<TableKey, Value>,
}

impl TableValue {
    pub fn new(key: TypeSpec, value: TypeSpec) -> Result<Self> {
        match key {
            TypeSpec::Integer | TypeSpec::Str | TypeSpec::Char(_) | TypeSpec::Boolean => {
                Ok(Self {
                    key,
                    value,
                    entries: IndexMap::new(),
                })
            }
            other => Err(AlgoError::BadType(format!(
                "Type de clef invalide : {other}"
            ))),
        }
    }
}

/// Default (unassigned) value for a declared type.
pub fn default_value(ty: &TypeSpec, structs: &dyn StructLookup) -> Result<Value> {
    let mut visiting = Vec::new();
    default_value_inner(ty, structs, &mut visiting)
}

fn default_value_inner(
    ty: &TypeSpec,
    structs: &dyn StructLookup,
    visiting: &mut Vec<String>,
) -> Result<Value> {
    let value = match ty {
        TypeSpec::Boolean => Value::Boolean(None),
        TypeSpec::Integer => Value::Integer(None),
        TypeSpec::Float => Value::Float(None),
        TypeSpec::Str => Value::Str(None),
        TypeSpec::Char(size) => Value::Char(CharValue::new(*size)?),
        TypeSpec::Any => Value::Any(None),
        TypeSpec::Struct(name) => {
            if visiting.iter().any(|seen| seen == name) {
                // Recursive field: null until assigned.
                return Ok(Value::Nothing);
            }
            let def = structs.lookup_struct(name).ok_or_else(|| {
                AlgoError::Undeclared(format!("Structure >{name}< non déclarée"))
            })?;
            Value::Record(Record::instantiate_inner(&def, structs, visiting)?)
        }
        TypeSpec::Array { elem, maxes } => {
            // Arrays of structures need the same visiting guard, so we
            // build the element template here rather than in new().
            if maxes.iter().any(|&m| m < 0) {
                Value::Array(ArrayValue {
                    elem: (**elem).clone(),
                    maxes: maxes.clone(),
                    data: Vec::new(),
                })
            } else {
                let total: i64 = maxes.iter().map(|&m| m + 1).product();
                let template = default_value_inner(elem, structs, visiting)?;
                Value::Array(ArrayValue {
                    elem: (**elem).clone(),
                    maxes: maxes.clone(),
                    data: vec![template; total as usize],
                })
            }
        }
        TypeSpec::Table { key, value } => {
            Value::Table(TableValue::new((**key).clone(), (**value).clone())?)
        }
    };
    Ok(value)
}

/// Validates `value` against a declared type, applying the coercions of
/// the language: integer→float promotion, `Chaîne`↔`Caractère` with
/// padding/truncation, `Quelconque` accepting anything.
pub fn coerce(value: Value, ty: &TypeSpec) -> Result<Value> {
    // A value stored through a Quelconque slot compares by its content.
    let value = match value {
        Value::Any(Some(inner)) if !matches!(ty, TypeSpec::Any) => *inner,
        other => other,
    };
    match (ty, value) {
        (TypeSpec::Boolean, v @ Value::Boolean(Some(_))) => Ok(v),
        (TypeSpec::Integer, v @ Value::Integer(Some(_))) => Ok(v),
        (TypeSpec::Float, v @ Value::Float(Some(_))) => Ok(v),
        (TypeSpec::Float, Value::Integer(Some(n))) => Ok(Value::Float(Some(n as f64))),
        (TypeSpec::Str, v @ Value::Str(Some(_))) => Ok(v),
        (TypeSpec::Str, Value::Char(CharValue { text: Some(s), .. })) => {
            Ok(Value::Str(Some(s)))
        }
        (TypeSpec::Char(size), value) => {
            let text = match &value {
                Value::Str(Some(s)) => s.clone(),
                Value::Char(CharValue { text: Some(s), .. }) => s.clone(),
                other => {
                    return Err(AlgoError::BadType(format!(
                        "Type Caractère attendu [{other}]"
                    )))
                }
            };
            let mut sized = CharValue::new(*size)?;
            sized.assign(&text);
            Ok(Value::Char(sized))
        }
        (TypeSpec::Any, value) => match value {
            already @ Value::Any(_) => Ok(already),
            concrete => Ok(Value::Any(Some(Box::new(concrete)))),
        },
        (TypeSpec::Struct(name), Value::Record(record)) => {
            if &record.name == name {
                Ok(Value::Record(record))
            } else {
                Err(AlgoError::BadType(format!(
                    "{} n'est pas {name}",
                    record.name
                )))
            }
        }
        (TypeSpec::Array { elem, maxes }, Value::Array(array)) => {
            let elem_ok = matches!(**elem, TypeSpec::Any) || **elem == array.elem;
            if !elem_ok {
                return Err(AlgoError::BadType(format!(
                    "Type {elem} attendu [{}]",
                    array.elem
                )));
            }
            let any_size = maxes.iter().all(|&m| m < 0);
            if any_size || *maxes == array.maxes {
                Ok(Value::Array(array))
            } else {
                Err(AlgoError::BadType(
                    "Tableaux de taille differentes".to_string(),
                ))
            }
        }
        (TypeSpec::Table { key, value }, Value::Table(table)) => {
            if **key == table.key && **value == table.value {
                Ok(Value::Table(table))
            } else {
                Err(AlgoError::BadType(format!(
                    "Type Table ({key}, {value}) attendu"
                )))
            }
        }
        (expected, got) => Err(AlgoError::BadType(format!(
            "Type {expected} attendu [{got}]"
        ))),
    }
}

/// Truthiness for `Si` and `TantQue` conditions.
pub fn truthy(value: &Value) -> Result<bool> {
    match value {
        Value::Boolean(Some(b)) => Ok(*b),
        Value::Integer(Some(n)) => Ok(*n != 0),
        Value::Float(Some(x)) => Ok(*x != 0.0),
        Value::Str(Some(s)) => Ok(!s.is_empty()),
        Value::Nothing => Ok(false),
        other => Err(AlgoError::BadType(format!(
            "Type Booléen attendu [{other}]"
        ))),
    }
}

/// Floor division, toward negative infinity.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

/// Floor modulo: the result takes the sign of the divisor.
fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

/// The (operator, left tag, right tag) dispatch matrix.
///
/// Operands are already evaluated, so scalar payloads are always
/// present; sized characters reach here as plain strings.
pub fn binary_op(op: BinOp, a: &Value, b: &Value) -> Result<Value> {
    use BinOp::*;
    use Value::{Boolean, Float, Integer, Str};

    match op {
        Concat => match (a, b) {
            (Str(Some(x)), Str(Some(y))) => Ok(Str(Some(format!("{x}{y}")))),
            _ => Err(AlgoError::BadType(
                "C & C : Type Chaîne attendu".to_string(),
            )),
        },
        And | Or | Xor => match (a, b) {
            (Boolean(Some(x)), Boolean(Some(y))) => {
                let r = match op {
                    And => *x && *y,
                    Or => *x || *y,
                    _ => *x != *y,
                };
                Ok(Boolean(Some(r)))
            }
            (Integer(Some(x)), Integer(Some(y))) => {
                let r = match op {
                    And => x & y,
                    Or => x | y,
                    _ => x ^ y,
                };
                Ok(Integer(Some(r)))
            }
            _ => Err(AlgoError::BadType(
                "Type Booléen attendu".to_string(),
            )),
        },
        Eq | Ne | Gt | Ge | Lt | Le => compare(op, a, b),
        DivBy => match (a, b) {
            (Integer(Some(x)), Integer(Some(y))) => {
                if *y == 0 {
                    Err(AlgoError::ZeroDivide)
                } else {
                    Ok(Boolean(Some(floor_mod(*x, *y) == 0)))
                }
            }
            _ => Err(AlgoError::BadType(
                "E DP E : Type Entier attendu".to_string(),
            )),
        },
        Add | Sub | Mul | Div | Mod | Pow => arithmetic(op, a, b),
    }
}

fn arithmetic(op: BinOp, a: &Value, b: &Value) -> Result<Value> {
    use BinOp::*;
    use Value::{Float, Integer};

    match (a, b) {
        (Integer(Some(x)), Integer(Some(y))) => {
            let (x, y) = (*x, *y);
            let result = match op {
                Add => Integer(Some(x.wrapping_add(y))),
                Sub => Integer(Some(x.wrapping_sub(y))),
                Mul => Integer(Some(x.wrapping_mul(y))),
                Div => {
                    if y == 0 {
                        return Err(AlgoError::ZeroDivide);
                    }
                    Integer(Some(floor_div(x, y)))
                }
                Mod => {
                    if y == 0 {
                        return Err(AlgoError::ZeroDivide);
                    }
                    Integer(Some(floor_mod(x, y)))
                }
                Pow => {
                    if y >= 0 {
                        match u32::try_from(y).ok().and_then(|e| x.checked_pow(e)) {
                            Some(n) => Integer(Some(n)),
                            None => Float(Some((x as f64).powf(y as f64))),
                        }
                    } else {
                        Float(Some((x as f64).powi(y as i32)))
                    }
                }
                _ => unreachable!(),
            };
            Ok(result)
        }
        _ => {
            let x = as_float(a)?;
            let y = as_float(b)?;
            let result = match op {
                Add => x + y,
                Sub => x - y,
                Mul => x * y,
                Div => {
                    if y == 0.0 {
                        return Err(AlgoError::ZeroDivide);
                    }
                    x / y
                }
                Mod => {
                    if y == 0.0 {
                        return Err(AlgoError::ZeroDivide);
                    }
                    x - y * (x / y).floor()
                }
                Pow => x.powf(y),
                _ => unreachable!(),
            };
            Ok(Float(Some(result)))
        }
    }
}

fn as_float(value: &Value) -> Result<f64> {
    match value {
        Value::Integer(Some(n)) => Ok(*n as f64),
        Value::Float(Some(x)) => Ok(*x),
        other => Err(AlgoError::BadType(format!(
            "E|N {} E|N : Type Entier ou Numérique attendu",
            type_label(other)
        ))),
    }
}

fn type_label(value: &Value) -> String {
    value.type_spec().to_string()
}

fn compare(op: BinOp, a: &Value, b: &Value) -> Result<Value> {
    use std::cmp::Ordering;
    use Value::{Boolean, Float, Integer, Str};

    let ordering: Option<Ordering> = match (a, b) {
        (Integer(Some(x)), Integer(Some(y))) => Some(x.cmp(y)),
        (Float(Some(x)), Float(Some(y))) => x.partial_cmp(y),
        (Integer(Some(x)), Float(Some(y))) => (*x as f64).partial_cmp(y),
        (Float(Some(x)), Integer(Some(y))) => x.partial_cmp(&(*y as f64)),
        (Str(Some(x)), Str(Some(y))) => Some(x.cmp(y)),
        (Boolean(Some(x)), Boolean(Some(y))) => Some(x.cmp(y)),
        // Mismatched variants never compare equal, matching the
        // permissive equality of the language.
        _ => {
            let equal = match (a, b) {
                (Value::Array(x), Value::Array(y)) => x == y,
                (Value::Record(x), Value::Record(y)) => x == y,
                (Value::Table(x), Value::Table(y)) => x == y,
                _ => false,
            };
            let result = match op {
                BinOp::Eq => equal,
                BinOp::Ne => !equal,
                _ => false,
            };
            return Ok(Boolean(Some(result)));
        }
    };
    let Some(ordering) = ordering else {
        return Ok(Boolean(Some(matches!(op, BinOp::Ne))));
    };
    let result = match op {
        BinOp::Eq => ordering == Ordering::Equal,
        BinOp::Ne => ordering != Ordering::Equal,
        BinOp::Gt => ordering == Ordering::Greater,
        BinOp::Ge => ordering != Ordering::Less,
        BinOp::Lt => ordering == Ordering::Less,
        BinOp::Le => ordering != Ordering::Greater,
        _ => unreachable!(),
    };
    Ok(Boolean(Some(result)))
}

/// Prints a float the way the language expects: whole values keep one
/// decimal (`5.0`), others use the shortest representation.
fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(Some(true)) => f.write_str("VRAI"),
            Value::Boolean(Some(false)) => f.write_str("FAUX"),
            Value::Integer(Some(n)) => write!(f, "{n}"),
            Value::Float(Some(x)) => f.write_str(&format_float(*x)),
            Value::Str(Some(s)) => f.write_str(s),
            Value::Char(CharValue { text: Some(s), .. }) => f.write_str(s),
            Value::Array(array) => {
                f.write_str("[")?;
                write_array(f, array, &array.maxes, &mut 0)?;
                f.write_str("]")
            }
            Value::Record(record) => {
                let mut first = true;
                for value in record.fields.values() {
                    if !first {
                        f.write_str(" | ")?;
                    }
                    first = false;
                    write!(f, "{value}")?;
                }
                Ok(())
            }
            Value::Table(table) => {
                f.write_str("{")?;
                let mut first = true;
                for (key, value) in &table.entries {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Any(Some(inner)) => write!(f, "{inner}"),
            _ => f.write_str("?"),
        }
    }
}

/// Writes array contents, nesting brackets per dimension. `cursor` walks
/// the row-major storage.
fn write_array(
    f: &mut fmt::Formatter<'_>,
    array: &ArrayValue,
    dims: &[i64],
    cursor: &mut usize,
) -> fmt::Result {
    match dims.split_first() {
        None | Some((_, [])) => {
            let count = dims.first().map(|&m| m + 1).unwrap_or(0).max(0);
            for i in 0..count {
                if i > 0 {
                    f.write_str(",")?;
                }
                match array.data.get(*cursor) {
                    Some(value) => write!(f, "{value}")?,
                    None => f.write_str("?")?,
                }
                *cursor += 1;
            }
            Ok(())
        }
        Some((&max, rest)) => {
            for i in 0..=max {
                if i > 0 {
                    f.write_str(",")?;
                }
                f.write_str("[")?;
                write_array(f, array, rest, cursor)?;
                f.write_str("]")?;
            }
            Ok(())
        }
    }
}

/// Convenience constructors used by the evaluator and the tests.
impl Value {
    pub fn int(n: i64) -> Value {
        Value::Integer(Some(n))
    }

    pub fn float(x: f64) -> Value {
        Value::Float(Some(x))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::Str(Some(s.into()))
    }

    pub fn boolean(b: bool) -> Value {
        Value::Boolean(Some(b))
    }
}

/// Struct registries for value construction: a plain map suffices.
pub type StructDefs = fralgo_util::FxHashMap<String, Rc<StructDef>>;

#[cfg(test)]
mod tests {
    use super::*;
    use fralgo_util::FxHashMap;

    fn no_structs() -> StructDefs {
        FxHashMap::default()
    }

    #[test]
    fn test_integer_division_floors_toward_negative_infinity() {
        let r = binary_op(BinOp::Div, &Value::int(-7), &Value::int(2)).unwrap();
        assert_eq!(r, Value::int(-4));
        let r = binary_op(BinOp::Div, &Value::int(7), &Value::int(2)).unwrap();
        assert_eq!(r, Value::int(3));
    }

    #[test]
    fn test_division_with_float_operand_returns_float() {
        let r = binary_op(BinOp::Div, &Value::int(7), &Value::float(2.0)).unwrap();
        assert_eq!(r, Value::float(3.5));
    }

    #[test]
    fn test_division_by_zero() {
        let err = binary_op(BinOp::Div, &Value::int(1), &Value::int(0)).unwrap_err();
        assert!(matches!(err, AlgoError::ZeroDivide));
        let err = binary_op(BinOp::Div, &Value::float(1.0), &Value::float(0.0)).unwrap_err();
        assert!(matches!(err, AlgoError::ZeroDivide));
    }

    #[test]
    fn test_divisibility() {
        let r = binary_op(BinOp::DivBy, &Value::int(9), &Value::int(3)).unwrap();
        assert_eq!(r, Value::boolean(true));
        let r = binary_op(BinOp::DivBy, &Value::int(10), &Value::int(3)).unwrap();
        assert_eq!(r, Value::boolean(false));
    }

    #[test]
    fn test_concat_demands_strings() {
        let r = binary_op(BinOp::Concat, &Value::string("a"), &Value::string("b")).unwrap();
        assert_eq!(r, Value::string("ab"));
        let err = binary_op(BinOp::Concat, &Value::string("a"), &Value::int(1)).unwrap_err();
        assert!(matches!(err, AlgoError::BadType(_)));
    }

    #[test]
    fn test_integer_promotes_to_float() {
        let r = binary_op(BinOp::Add, &Value::int(1), &Value::float(0.5)).unwrap();
        assert_eq!(r, Value::float(1.5));
    }

    #[test]
    fn test_mixed_comparison() {
        let r = binary_op(BinOp::Lt, &Value::int(1), &Value::float(1.5)).unwrap();
        assert_eq!(r, Value::boolean(true));
        let r = binary_op(BinOp::Eq, &Value::int(1), &Value::string("1")).unwrap();
        assert_eq!(r, Value::boolean(false));
    }

    #[test]
    fn test_sized_char_pads_and_truncates() {
        let mut c = CharValue::new(5).unwrap();
        c.assign("ab");
        assert_eq!(c.text.as_deref(), Some("ab   "));
        c.assign("abcdefgh");
        assert_eq!(c.text.as_deref(), Some("abcde"));
    }

    #[test]
    fn test_char_size_bounds() {
        assert!(CharValue::new(0).is_err());
        assert!(CharValue::new(256).is_err());
        assert!(CharValue::new(255).is_ok());
    }

    #[test]
    fn test_array_row_major_offsets() {
        let a = ArrayValue::new(TypeSpec::Integer, vec![1, 2], &no_structs()).unwrap();
        assert_eq!(a.data.len(), 6);
        assert_eq!(a.offset(&[0, 0]).unwrap(), 0);
        assert_eq!(a.offset(&[0, 2]).unwrap(), 2);
        assert_eq!(a.offset(&[1, 0]).unwrap(), 3);
        assert!(matches!(
            a.offset(&[2, 0]),
            Err(AlgoError::IndexOutOfRange(2))
        ));
    }

    #[test]
    fn test_array_resize_preserves_overlap() {
        let mut a = ArrayValue::new(TypeSpec::Integer, vec![2], &no_structs()).unwrap();
        for i in 0..=2 {
            *a.get_mut(&[i]).unwrap() = Value::int(i * 10);
        }
        a.resize(vec![4], &no_structs()).unwrap();
        assert_eq!(a.get(&[2]).unwrap(), &Value::int(20));
        assert!(a.get(&[4]).unwrap().is_empty());
        a.resize(vec![1], &no_structs()).unwrap();
        assert_eq!(a.get(&[1]).unwrap(), &Value::int(10));
        assert!(a.get(&[2]).is_err());
    }

    #[test]
    fn test_array_resize_same_size_is_noop() {
        let mut a = ArrayValue::new(TypeSpec::Integer, vec![2], &no_structs()).unwrap();
        *a.get_mut(&[1]).unwrap() = Value::int(7);
        a.resize(vec![2], &no_structs()).unwrap();
        assert_eq!(a.get(&[1]).unwrap(), &Value::int(7));
    }

    #[test]
    fn test_array_resize_negative_fails() {
        let mut a = ArrayValue::new(TypeSpec::Integer, vec![2], &no_structs()).unwrap();
        assert!(matches!(
            a.resize(vec![-2], &no_structs()),
            Err(AlgoError::ResizeFailed)
        ));
    }

    #[test]
    fn test_undimensioned_array_resizes_lazily() {
        let mut a = ArrayValue::new(TypeSpec::Str, vec![-1], &no_structs()).unwrap();
        assert!(!a.is_dimensioned());
        a.resize(vec![0], &no_structs()).unwrap();
        *a.get_mut(&[0]).unwrap() = Value::string("X");
        assert_eq!(a.assigned_count(), 1);
    }

    #[test]
    fn test_taille_laws() {
        let a = ArrayValue::new(TypeSpec::Integer, vec![2], &no_structs()).unwrap();
        assert_eq!(a.size_value(), Value::int(3));
        let b = ArrayValue::new(TypeSpec::Integer, vec![1, 2], &no_structs()).unwrap();
        match b.size_value() {
            Value::Array(sizes) => {
                assert_eq!(sizes.data, vec![Value::int(2), Value::int(3)]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_recursive_structure_field_starts_as_nothing() {
        let mut defs = no_structs();
        let node = Rc::new(StructDef::new(
            "N",
            vec![
                ("v".to_string(), TypeSpec::Integer),
                ("suiv".to_string(), TypeSpec::Struct("N".to_string())),
            ],
        ));
        defs.insert("N".to_string(), node.clone());
        let record = Record::instantiate(&node, &defs).unwrap();
        assert_eq!(record.fields["v"], Value::Integer(None));
        assert_eq!(record.fields["suiv"], Value::Nothing);
    }

    #[test]
    fn test_coerce_string_to_sized_char() {
        let v = coerce(Value::string("ab"), &TypeSpec::Char(4)).unwrap();
        match v {
            Value::Char(c) => assert_eq!(c.text.as_deref(), Some("ab  ")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_coerce_rejects_mismatch() {
        let err = coerce(Value::string("x"), &TypeSpec::Integer).unwrap_err();
        assert!(matches!(err, AlgoError::BadType(_)));
    }

    #[test]
    fn test_any_wraps_and_unwraps() {
        let wrapped = coerce(Value::int(3), &TypeSpec::Any).unwrap();
        assert_eq!(wrapped.type_spec(), TypeSpec::Integer);
        let back = coerce(wrapped, &TypeSpec::Integer).unwrap();
        assert_eq!(back, Value::int(3));
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Value::boolean(true).to_string(), "VRAI");
        assert_eq!(Value::Integer(None).to_string(), "?");
        assert_eq!(Value::float(5.0).to_string(), "5.0");
        assert_eq!(Value::float(0.25).to_string(), "0.25");
        assert_eq!(Value::Nothing.to_string(), "?");

        let mut a = ArrayValue::new(TypeSpec::Integer, vec![2], &no_structs()).unwrap();
        for i in 0..=2 {
            *a.get_mut(&[i]).unwrap() = Value::int(i + 1);
        }
        assert_eq!(Value::Array(a).to_string(), "[1,2,3]");
    }

    #[test]
    fn test_nested_array_display() {
        let mut a = ArrayValue::new(TypeSpec::Integer, vec![1, 1], &no_structs()).unwrap();
        *a.get_mut(&[0, 0]).unwrap() = Value::int(1);
        *a.get_mut(&[0, 1]).unwrap() = Value::int(2);
        *a.get_mut(&[1, 0]).unwrap() = Value::int(3);
        *a.get_mut(&[1, 1]).unwrap() = Value::int(4);
        assert_eq!(Value::Array(a).to_string(), "[[1,2],[3,4]]");
    }

    #[test]
    fn test_truthiness() {
        assert!(truthy(&Value::boolean(true)).unwrap());
        assert!(!truthy(&Value::Nothing).unwrap());
        assert!(truthy(&Value::int(2)).unwrap());
        assert!(!truthy(&Value::string("")).unwrap());
        assert!(truthy(&Value::string("x")).unwrap());
        assert!(truthy(&Value::Integer(None)).is_err());
    }

    #[test]
    fn test_table_keys() {
        let mut table = TableValue::new(TypeSpec::Str, TypeSpec::Integer).unwrap();
        let key = TableKey::from_value(&Value::string("a"), &table.key).unwrap();
        table.entries.insert(key.clone(), Value::int(1));
        table.entries.insert(key, Value::int(2));
        assert_eq!(table.entries.len(), 1);
        assert!(TableValue::new(TypeSpec::Float, TypeSpec::Integer).is_err());
    }
}
