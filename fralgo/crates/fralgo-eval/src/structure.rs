//! Structure (record type) skeletons.
//!
//! A [`StructDef`] is the declared shape of a record: ordered field
//! names and types. Instances are [`crate::values::Record`] values built
//! from the skeleton. A field may have the type of the structure being
//! defined; such recursive fields start out as `Nothing` and only accept
//! values of that structure type.

use std::rc::Rc;

use fralgo_par::types::TypeSpec;

/// A declared structure: ordered `name → type` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<(String, TypeSpec)>,
}

impl StructDef {
    pub fn new(name: impl Into<String>, fields: Vec<(String, TypeSpec)>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Declared type of a field, if the field exists.
    pub fn field_type(&self, field: &str) -> Option<&TypeSpec> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, ty)| ty)
    }
}

/// Read access to declared structures, passed to value construction so
/// record instantiation does not borrow the whole environment.
pub trait StructLookup {
    fn lookup_struct(&self, name: &str) -> Option<Rc<StructDef>>;
}

impl StructLookup for fralgo_util::FxHashMap<String, Rc<StructDef>> {
    fn lookup_struct(&self, name: &str) -> Option<Rc<StructDef>> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type() {
        let def = StructDef::new(
            "Point",
            vec![
                ("x".to_string(), TypeSpec::Integer),
                ("y".to_string(), TypeSpec::Integer),
            ],
        );
        assert_eq!(def.field_type("x"), Some(&TypeSpec::Integer));
        assert_eq!(def.field_type("z"), None);
    }
}
