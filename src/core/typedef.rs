//! core::typedef
//!
//! Explicitly declared type descriptors.
//!
//! # Design
//!
//! A [`TypeDef`] is the concrete "class" a [`ClassRef`](crate::refs::ClassRef)
//! binds to. Types are declared through [`TypeDefBuilder`] with an explicit
//! parent and an explicit list of structural field hints; nothing is
//! discovered by instantiating or inspecting values.
//!
//! Every built type receives a process-unique [`TypeKey`]. Two handles refer
//! to the same type exactly when their keys are equal, regardless of name.
//!
//! # Example
//!
//! ```
//! use schemaref::core::typedef::{FieldShape, TypeDef};
//!
//! let vehicle = TypeDef::builder("Vehicle")
//!     .value_field("wheels", 4)
//!     .build()
//!     .unwrap();
//! let car = TypeDef::builder("Car")
//!     .extends(&vehicle)
//!     .field("registeredAt", FieldShape::Date)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(car.parent().map(|p| p.name()), Some("Vehicle"));
//! assert_ne!(car.key(), vehicle.key());
//! ```

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

use super::types::{TypeError, TypeName, ANONYMOUS_NAME};

static NEXT_TYPE_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(u64);

impl TypeKey {
    fn next() -> Self {
        TypeKey(NEXT_TYPE_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

/// Shared handle to a declared type.
pub type TypeHandle = Arc<TypeDef>;

/// Shape of a structurally declared field.
///
/// These hints describe fields the type carries without a decorated
/// property record. A decorated record for the same field name always
/// wins over the hint.
#[derive(Debug, Clone)]
pub enum FieldShape {
    /// A literal default value; the JSON kind decides the property type.
    /// `Value::Null` carries no type information.
    Value(Value),
    /// A date/time value.
    Date,
    /// An embedded value of another declared type.
    Type(TypeHandle),
    /// Nothing is known about the field.
    Unknown,
}

/// A structural field hint.
#[derive(Debug, Clone)]
pub struct FieldHint {
    pub name: String,
    pub shape: FieldShape,
}

/// A declared type.
#[derive(Debug)]
pub struct TypeDef {
    key: TypeKey,
    name: TypeName,
    parent: Option<TypeHandle>,
    fields: Vec<FieldHint>,
    anonymous: bool,
    stand_in: bool,
}

impl TypeDef {
    /// Start declaring a type.
    pub fn builder(name: impl Into<String>) -> TypeDefBuilder {
        TypeDefBuilder {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
            stand_in: false,
            free_name: false,
        }
    }

    /// A fresh anonymous type with no fields.
    ///
    /// Each call yields a distinct type even though all are named
    /// `anonymous`.
    pub fn anonymous() -> TypeHandle {
        Arc::new(TypeDef {
            key: TypeKey::next(),
            name: TypeName::from_static(ANONYMOUS_NAME),
            parent: None,
            fields: Vec::new(),
            anonymous: true,
            stand_in: false,
        })
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Explicitly declared parent type.
    pub fn parent(&self) -> Option<&TypeHandle> {
        self.parent.as_ref()
    }

    /// Structural field hints in declaration order.
    pub fn fields(&self) -> &[FieldHint] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldHint> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Whether the type was synthesized to stand in for a missing
    /// concrete type (see [`ClassRef::get_class`](crate::refs::ClassRef::get_class)).
    pub fn is_stand_in(&self) -> bool {
        self.stand_in
    }
}

impl PartialEq for TypeDef {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TypeDef {}

impl Hash for TypeDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Builder for [`TypeDef`].
#[derive(Debug, Clone)]
pub struct TypeDefBuilder {
    name: String,
    parent: Option<TypeHandle>,
    fields: Vec<FieldHint>,
    stand_in: bool,
    free_name: bool,
}

impl TypeDefBuilder {
    /// Declare the parent (super) type.
    pub fn extends(mut self, parent: &TypeHandle) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    /// Declare a structural field.
    pub fn field(mut self, name: impl Into<String>, shape: FieldShape) -> Self {
        self.fields.push(FieldHint {
            name: name.into(),
            shape,
        });
        self
    }

    /// Declare a structural field from its default value.
    pub fn value_field(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.field(name, FieldShape::Value(default.into()))
    }

    pub(crate) fn stand_in(mut self) -> Self {
        self.stand_in = true;
        self
    }

    /// Accept any non-empty name instead of an identifier.
    ///
    /// For types named after document titles or definition keys.
    pub fn free_name(mut self) -> Self {
        self.free_name = true;
        self
    }

    /// Finish the declaration.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidTypeName` if the name is not an identifier,
    /// or is empty when [`free_name`](Self::free_name) is set.
    pub fn build(self) -> Result<TypeHandle, TypeError> {
        let name = if self.free_name {
            TypeName::free(self.name)?
        } else {
            TypeName::new(self.name)?
        };
        Ok(Arc::new(TypeDef {
            key: TypeKey::next(),
            name,
            parent: self.parent,
            fields: self.fields,
            anonymous: false,
            stand_in: self.stand_in,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_unique_per_build() {
        let a = TypeDef::builder("Car").build().unwrap();
        let b = TypeDef::builder("Car").build().unwrap();
        assert_ne!(a.key(), b.key());
        assert_ne!(*a, *b);
        assert_eq!(*a, *Arc::clone(&a));
    }

    #[test]
    fn anonymous_types_are_distinct() {
        let a = TypeDef::anonymous();
        let b = TypeDef::anonymous();
        assert_eq!(a.name(), "anonymous");
        assert!(a.is_anonymous());
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn fields_keep_declaration_order() {
        let ty = TypeDef::builder("Sample")
            .value_field("b", true)
            .field("a", FieldShape::Date)
            .value_field("c", json!(null))
            .build()
            .unwrap();
        let names: Vec<&str> = ty.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
        assert!(matches!(ty.field("a").unwrap().shape, FieldShape::Date));
    }

    #[test]
    fn invalid_name_rejected() {
        assert!(TypeDef::builder("not valid").build().is_err());
        assert_eq!(
            TypeDef::builder("car-model").free_name().build().unwrap().name(),
            "car-model"
        );
        assert!(TypeDef::builder("").free_name().build().is_err());
    }
}
