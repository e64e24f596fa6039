//! Declared type specifications.
//!
//! A [`TypeSpec`] is what appears after `en` in a declaration or a
//! parameter list. The evaluator validates values against these.

use std::fmt;

/// A declared Algo type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    /// `Booléen`
    Boolean,

    /// `Entier`
    Integer,

    /// `Numérique`
    Float,

    /// `Chaîne`
    Str,

    /// `Caractère` or `Caractère*N`; the size is validated (1..=255) at
    /// declaration time, not by the parser.
    Char(i64),

    /// `Quelconque` - accepts a value of any type.
    Any,

    /// A user structure, by name. Also produced for a structure field
    /// whose type is the structure being defined (recursive field).
    Struct(String),

    /// An array parameter or declaration: element type plus one maximum
    /// index per dimension. `-1` means undimensioned (any size accepted
    /// for parameters, storage created by `Redim` otherwise).
    Array {
        elem: Box<TypeSpec>,
        maxes: Vec<i64>,
    },

    /// An associative table: key type and value type.
    Table {
        key: Box<TypeSpec>,
        value: Box<TypeSpec>,
    },
}

impl TypeSpec {
    /// True for the primitive scalar types that may appear as structure
    /// field types or table key types.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TypeSpec::Boolean
                | TypeSpec::Integer
                | TypeSpec::Float
                | TypeSpec::Str
                | TypeSpec::Char(_)
        )
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Boolean => f.write_str("Booléen"),
            TypeSpec::Integer => f.write_str("Entier"),
            TypeSpec::Float => f.write_str("Numérique"),
            TypeSpec::Str => f.write_str("Chaîne"),
            TypeSpec::Char(1) => f.write_str("Caractère"),
            TypeSpec::Char(n) => write!(f, "Caractère*{n}"),
            TypeSpec::Any => f.write_str("Quelconque"),
            TypeSpec::Struct(name) => f.write_str(name),
            TypeSpec::Array { .. } => f.write_str("Tableau"),
            TypeSpec::Table { .. } => f.write_str("Table"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(TypeSpec::Integer.to_string(), "Entier");
        assert_eq!(TypeSpec::Char(1).to_string(), "Caractère");
        assert_eq!(TypeSpec::Char(12).to_string(), "Caractère*12");
        assert_eq!(TypeSpec::Struct("Point".into()).to_string(), "Point");
        let t = TypeSpec::Array {
            elem: Box::new(TypeSpec::Str),
            maxes: vec![-1],
        };
        assert_eq!(t.to_string(), "Tableau");
    }
}
