//! core::metadata::schema
//!
//! Raw option records and their typed builders.
//!
//! # Record Kinds
//!
//! - **Entity**: promotes a type to an independently addressable entity
//! - **Property**: declares one property slot on a type
//! - **Schema**: adds an entity type to a named schema
//! - **Namespace**: binds a type to a namespace
//!
//! Records are produced by the typed builders in this module
//! ([`EntityRecord`], [`PropertyRecord`], [`SchemaRecord`],
//! [`NamespaceRecord`]) and stored as [`OptionRecord`]s.
//!
//! # Example
//!
//! ```
//! use schemaref::core::metadata::schema::{EntityRecord, OptionRecord, PropertyRecord, RecordKind};
//! use schemaref::core::typedef::TypeDef;
//! use schemaref::core::types::PrimitiveType;
//!
//! let car = TypeDef::builder("Car").build().unwrap();
//!
//! let entity: OptionRecord = EntityRecord::new(&car).option("name", "car").into();
//! assert_eq!(entity.kind, RecordKind::Entity);
//!
//! let wheels: OptionRecord = PropertyRecord::new(&car, "wheels")
//!     .primitive(PrimitiveType::Number)
//!     .into();
//! assert_eq!(wheels.property_name(), Some("wheels"));
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::core::options::Options;
use crate::core::typedef::TypeHandle;
use crate::core::types::{Cardinality, PrimitiveType};
use crate::refs::{ClassRef, TypeHint};

/// What a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Entity,
    Property,
    Schema,
    Namespace,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Entity => "entity",
            RecordKind::Property => "property",
            RecordKind::Schema => "schema",
            RecordKind::Namespace => "namespace",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declaration of a single property slot.
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: String,
    pub hint: TypeHint,
    pub cardinality: Cardinality,
    /// The name is a regular expression matched against keys.
    pub pattern: bool,
    /// Declared from outside the owning type.
    pub appended: bool,
}

/// A raw record in the metadata store.
#[derive(Debug, Clone)]
pub struct OptionRecord {
    pub kind: RecordKind,
    /// The type the record is about.
    pub target: TypeHandle,
    /// Namespace the record belongs to; `None` means the default namespace.
    pub namespace: Option<String>,
    /// Present for property records.
    pub property: Option<PropertyDecl>,
    /// Free-form options (entity name, schema name, validator keys, ...).
    pub options: Options,
}

impl OptionRecord {
    /// Whether the record targets this exact type.
    pub fn targets(&self, ty: &TypeHandle) -> bool {
        self.target.key() == ty.key()
    }

    pub fn property_name(&self) -> Option<&str> {
        self.property.as_ref().map(|p| p.name.as_str())
    }

    /// The namespace the record applies to.
    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default)
    }
}

/// Builder for entity records.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    target: TypeHandle,
    namespace: Option<String>,
    options: Options,
}

impl EntityRecord {
    pub fn new(target: &TypeHandle) -> Self {
        Self {
            target: Arc::clone(target),
            namespace: None,
            options: Options::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key, value);
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options.deep_merge(&options);
        self
    }
}

impl From<EntityRecord> for OptionRecord {
    fn from(r: EntityRecord) -> Self {
        OptionRecord {
            kind: RecordKind::Entity,
            target: r.target,
            namespace: r.namespace,
            property: None,
            options: r.options,
        }
    }
}

/// Builder for property records.
///
/// The type hint defaults to [`TypeHint::Unknown`] and the cardinality to a
/// single value.
#[derive(Debug, Clone)]
pub struct PropertyRecord {
    target: TypeHandle,
    namespace: Option<String>,
    decl: PropertyDecl,
    options: Options,
}

impl PropertyRecord {
    pub fn new(target: &TypeHandle, name: impl Into<String>) -> Self {
        Self {
            target: Arc::clone(target),
            namespace: None,
            decl: PropertyDecl {
                name: name.into(),
                hint: TypeHint::Unknown,
                cardinality: Cardinality::one(),
                pattern: false,
                appended: false,
            },
            options: Options::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn hint(mut self, hint: TypeHint) -> Self {
        self.decl.hint = hint;
        self
    }

    pub fn primitive(self, ty: PrimitiveType) -> Self {
        self.hint(TypeHint::Primitive(ty))
    }

    /// Type given by name; resolved against the owning namespace.
    pub fn named(self, name: impl Into<String>) -> Self {
        self.hint(TypeHint::Name(name.into()))
    }

    /// Reference to another declared type.
    pub fn references(self, ty: &TypeHandle) -> Self {
        self.hint(TypeHint::Type(Arc::clone(ty)))
    }

    /// Reference to an existing class reference, possibly in another namespace.
    pub fn class_ref(self, class_ref: &ClassRef) -> Self {
        self.hint(TypeHint::Class(class_ref.clone()))
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.decl.cardinality = cardinality;
        self
    }

    /// Mark the name as a pattern-property regular expression.
    pub fn pattern(mut self) -> Self {
        self.decl.pattern = true;
        self
    }

    /// Mark the property as declared outside the owning type.
    pub fn appended(mut self) -> Self {
        self.decl.appended = true;
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key, value);
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options.deep_merge(&options);
        self
    }
}

impl From<PropertyRecord> for OptionRecord {
    fn from(r: PropertyRecord) -> Self {
        OptionRecord {
            kind: RecordKind::Property,
            target: r.target,
            namespace: r.namespace,
            property: Some(r.decl),
            options: r.options,
        }
    }
}

/// Builder for schema membership records.
#[derive(Debug, Clone)]
pub struct SchemaRecord {
    target: TypeHandle,
    namespace: Option<String>,
    schema: String,
    options: Options,
}

impl SchemaRecord {
    pub fn new(target: &TypeHandle, schema: impl Into<String>) -> Self {
        Self {
            target: Arc::clone(target),
            namespace: None,
            schema: schema.into(),
            options: Options::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key, value);
        self
    }
}

impl From<SchemaRecord> for OptionRecord {
    fn from(r: SchemaRecord) -> Self {
        let mut options = r.options;
        options.insert("name", r.schema);
        OptionRecord {
            kind: RecordKind::Schema,
            target: r.target,
            namespace: r.namespace,
            property: None,
            options,
        }
    }
}

/// Builder for namespace binding records.
#[derive(Debug, Clone)]
pub struct NamespaceRecord {
    target: TypeHandle,
    namespace: String,
}

impl NamespaceRecord {
    pub fn new(target: &TypeHandle, namespace: impl Into<String>) -> Self {
        Self {
            target: Arc::clone(target),
            namespace: namespace.into(),
        }
    }
}

impl From<NamespaceRecord> for OptionRecord {
    fn from(r: NamespaceRecord) -> Self {
        OptionRecord {
            kind: RecordKind::Namespace,
            target: r.target,
            namespace: Some(r.namespace),
            property: None,
            options: Options::new(),
        }
    }
}
