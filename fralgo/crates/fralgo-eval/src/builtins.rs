//! Built-in functions.
//!
//! String primitives are 1-based and character-oriented (`Extraire`,
//! `Trouve`), matching the pedagogical conventions of the language.
//! `Type` answers the declared type of its target without requiring a
//! value, so `Type(x)` works right after `Variable x en Entier`.

use std::time::{SystemTime, UNIX_EPOCH};

use fralgo_par::ast::{Builtin, Expr};
use fralgo_util::{AlgoError, Result};

use crate::eval::Interp;
use crate::values::{ArrayValue, Value};

impl Interp {
    pub(crate) fn eval_builtin(&mut self, builtin: &Builtin) -> Result<Value> {
        match builtin {
            Builtin::Len(arg) => self.len(arg),
            Builtin::SizeOf(arg) => self.size_of(arg),
            Builtin::Mid(text, start, length) => self.mid(text, start, length),
            Builtin::Left(text, count) => self.trim(text, count, false),
            Builtin::Right(text, count) => self.trim(text, count, true),
            Builtin::Find(haystack, needle) => self.find(haystack, needle),
            Builtin::Chr(code) => self.chr(code),
            Builtin::Ord(text) => self.ord(text),
            Builtin::Random => Ok(Value::float(rand::random::<f64>())),
            Builtin::UnixTime => {
                let seconds = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0);
                Ok(Value::int(seconds))
            }
            Builtin::ToInteger(arg) => self.to_integer(arg),
            Builtin::ToFloat(arg) => self.to_float(arg),
            Builtin::ToString(arg) => {
                let value = self.eval_expr(arg)?;
                Ok(Value::string(value.to_string()))
            }
            Builtin::ToBoolean(arg) => self.to_boolean(arg),
            Builtin::TypeOf(arg) => self.type_of(arg),
            Builtin::Eof(channel) => {
                let channel = self.eval_int_arg(channel)?;
                Ok(Value::boolean(self.files.eof(channel)?))
            }
            Builtin::Exists(table, key) => {
                let table = self.table_arg(table)?;
                let key = self.eval_expr(key)?;
                let key = crate::values::TableKey::from_value(&key, &table.key)?;
                Ok(Value::boolean(table.entries.contains_key(&key)))
            }
            Builtin::KeyAt(table, index) => {
                let table = self.table_arg(table)?;
                let index = self.eval_int_arg(index)?;
                match usize::try_from(index)
                    .ok()
                    .and_then(|i| table.entries.get_index(i))
                {
                    Some((key, _)) => Ok(key.to_value()),
                    None => Err(AlgoError::IndexOutOfRange(index)),
                }
            }
            Builtin::ValueFor(table, key) => {
                let table = self.table_arg(table)?;
                let key = self.eval_expr(key)?;
                let key = crate::values::TableKey::from_value(&key, &table.key)?;
                table
                    .entries
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| AlgoError::Undefined(format!("Clef inexistante : {key}")))
            }
            Builtin::Keys(table) => {
                let table = self.table_arg(table)?;
                let data: Vec<Value> = table.entries.keys().map(|k| k.to_value()).collect();
                Ok(Value::Array(ArrayValue {
                    elem: table.key.clone(),
                    maxes: vec![data.len() as i64 - 1],
                    data,
                }))
            }
            Builtin::Values(table) => {
                let table = self.table_arg(table)?;
                let data: Vec<Value> = table.entries.values().cloned().collect();
                Ok(Value::Array(ArrayValue {
                    elem: table.value.clone(),
                    maxes: vec![data.len() as i64 - 1],
                    data,
                }))
            }
        }
    }

    fn table_arg(&mut self, expr: &Expr) -> Result<crate::values::TableValue> {
        match self.eval_expr(expr)? {
            Value::Table(table) => Ok(table),
            other => Err(AlgoError::BadType(format!(
                "Type Table attendu [{}]",
                other.type_spec()
            ))),
        }
    }

    fn string_arg(&mut self, expr: &Expr, context: &str) -> Result<String> {
        match self.eval_expr(expr)? {
            Value::Str(Some(s)) => Ok(s),
            _ => Err(AlgoError::BadType(context.to_string())),
        }
    }

    fn len(&mut self, arg: &Expr) -> Result<Value> {
        match self.eval_expr(arg)? {
            Value::Str(Some(s)) => Ok(Value::int(s.chars().count() as i64)),
            Value::Array(array) => Ok(Value::int(array.assigned_count())),
            Value::Table(table) => Ok(Value::int(table.entries.len() as i64)),
            _ => Err(AlgoError::BadType(
                "Longueur(>C<) : Type Chaîne attendu".to_string(),
            )),
        }
    }

    fn size_of(&mut self, arg: &Expr) -> Result<Value> {
        match self.eval_expr(arg)? {
            Value::Array(array) => Ok(array.size_value()),
            Value::Str(Some(s)) => Ok(Value::int(s.chars().count() as i64)),
            Value::Table(table) => Ok(Value::int(table.entries.len() as i64)),
            other => Err(AlgoError::BadType(format!(
                "Taille(T|C) : type invalide [{}]",
                other.type_spec()
            ))),
        }
    }

    fn mid(&mut self, text: &Expr, start: &Expr, length: &Expr) -> Result<Value> {
        let text = self.string_arg(text, "Extraire(>C<, E, E) : Type Chaîne attendu")?;
        let start = match self.eval_expr(start)? {
            Value::Integer(Some(n)) => n,
            _ => {
                return Err(AlgoError::BadType(
                    "Extraire(C, >E<, E) : Type Entier attendu".to_string(),
                ))
            }
        };
        let length = match self.eval_expr(length)? {
            Value::Integer(Some(n)) => n,
            _ => {
                return Err(AlgoError::BadType(
                    "Extraire(C, E, >E<) : Type Entier attendu".to_string(),
                ))
            }
        };
        let skip = (start.max(1) - 1) as usize;
        let take = length.max(0) as usize;
        let result: String = text.chars().skip(skip).take(take).collect();
        Ok(Value::string(result))
    }

    fn trim(&mut self, text: &Expr, count: &Expr, right: bool) -> Result<Value> {
        let command = if right { "Droite" } else { "Gauche" };
        let text = self.string_arg(
            text,
            &format!("{command}(>C<, E) : Type Chaîne attendu"),
        )?;
        let count = match self.eval_expr(count)? {
            Value::Integer(Some(n)) => n.max(0) as usize,
            _ => {
                return Err(AlgoError::BadType(format!(
                    "{command}(C, >E<) : Type Entier attendu"
                )))
            }
        };
        let total = text.chars().count();
        let result: String = if right {
            text.chars().skip(total.saturating_sub(count)).collect()
        } else {
            text.chars().take(count).collect()
        };
        Ok(Value::string(result))
    }

    fn find(&mut self, haystack: &Expr, needle: &Expr) -> Result<Value> {
        let haystack = self.string_arg(haystack, "Trouve(>C<, C) : Type Chaîne attendu")?;
        let needle = self.string_arg(needle, "Trouve(C, >C<) : Type Chaîne attendu")?;
        let position = match haystack.find(&needle) {
            // 1-based, counted in characters.
            Some(byte_pos) => haystack[..byte_pos].chars().count() as i64 + 1,
            None => 0,
        };
        Ok(Value::int(position))
    }

    fn chr(&mut self, code: &Expr) -> Result<Value> {
        match self.eval_expr(code)? {
            Value::Integer(Some(n)) => {
                let c = u32::try_from(n).ok().and_then(char::from_u32).ok_or_else(|| {
                    AlgoError::BadType(format!("Car(>E<) : code invalide {n}"))
                })?;
                Ok(Value::string(c.to_string()))
            }
            _ => Err(AlgoError::BadType(
                "Car(>E<) : Type Entier attendu".to_string(),
            )),
        }
    }

    fn ord(&mut self, text: &Expr) -> Result<Value> {
        let text = self.string_arg(text, "CodeCar(>C<) : Type Chaîne attendu")?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Value::int(c as i64)),
            _ => Err(AlgoError::BadType(
                "CodeCar(>C<) : Chaîne de longueur 1 attendue".to_string(),
            )),
        }
    }

    fn to_integer(&mut self, arg: &Expr) -> Result<Value> {
        match self.eval_expr(arg)? {
            value @ Value::Integer(Some(_)) => Ok(value),
            Value::Float(Some(x)) => Ok(Value::int(x as i64)),
            Value::Boolean(Some(b)) => Ok(Value::int(b as i64)),
            Value::Str(Some(s)) => s.trim().parse::<i64>().map(Value::int).map_err(|_| {
                AlgoError::BadType(format!("Entier(>N|C<) : Conversion de >{s}< impossible"))
            }),
            other => Err(AlgoError::BadType(format!(
                "Entier(>N|C<) : Conversion de >{other}< impossible"
            ))),
        }
    }

    fn to_float(&mut self, arg: &Expr) -> Result<Value> {
        match self.eval_expr(arg)? {
            value @ Value::Float(Some(_)) => Ok(value),
            Value::Integer(Some(n)) => Ok(Value::float(n as f64)),
            Value::Boolean(Some(b)) => Ok(Value::float(if b { 1.0 } else { 0.0 })),
            Value::Str(Some(s)) => s.trim().parse::<f64>().map(Value::float).map_err(|_| {
                AlgoError::BadType(format!(
                    "Numérique(>E|C<) : Conversion de >{s}< impossible"
                ))
            }),
            other => Err(AlgoError::BadType(format!(
                "Numérique(>E|C<) : Conversion de >{other}< impossible"
            ))),
        }
    }

    fn to_boolean(&mut self, arg: &Expr) -> Result<Value> {
        match self.eval_expr(arg)? {
            value @ Value::Boolean(Some(_)) => Ok(value),
            Value::Integer(Some(n)) => Ok(Value::boolean(n != 0)),
            Value::Str(Some(s)) => match s.as_str() {
                "VRAI" => Ok(Value::boolean(true)),
                "FAUX" => Ok(Value::boolean(false)),
                _ => Err(AlgoError::BadType(format!(
                    "Booléen(>C<) : Conversion de >{s}< impossible"
                ))),
            },
            other => Err(AlgoError::BadType(format!(
                "Booléen(>C<) : Conversion de >{other}< impossible"
            ))),
        }
    }

    fn type_of(&mut self, arg: &Expr) -> Result<Value> {
        // A path answers its declared type even before any assignment.
        if let Expr::Path(path) = arg {
            let name = self.path_type_name(path)?;
            return Ok(Value::string(name));
        }
        let value = self.eval_expr(arg)?;
        Ok(Value::string(value.type_spec().to_string()))
    }
}
