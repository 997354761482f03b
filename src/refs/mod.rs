//! refs
//!
//! Reference objects: the nodes of the reference graph.
//!
//! # Modules
//!
//! - [`class_ref`] - [`ClassRef`], identity of a type within a namespace
//! - [`property_ref`] - [`PropertyRef`], one typed property slot
//! - [`entity_ref`] - [`EntityRef`], a class promoted to a root entity
//! - [`schema_ref`] - [`SchemaRef`], a named group of entities
//!
//! # Identity
//!
//! Every reference is a cheap handle around shared state. Cloning a handle
//! never copies the reference; two handles are the same reference exactly
//! when [`is_same`](ClassRef::is_same) says so. Mutations such as a
//! placeholder upgrade or an option merge are visible through every handle.
//!
//! References are created by a
//! [`NamespaceRegistry`](crate::registry::NamespaceRegistry), never directly.

pub mod class_ref;
pub mod entity_ref;
pub mod property_ref;
pub mod schema_ref;

use thiserror::Error;

use crate::core::types::TypeError;

pub use class_ref::ClassRef;
pub use entity_ref::EntityRef;
pub use property_ref::{Converted, PropertyRef, PropertyTarget, TypeHint};
pub use schema_ref::SchemaRef;

/// Errors from reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// No conversion rule exists for this value and column type.
    #[error("not yet implemented: cannot convert {value} ({kind}) to column type '{column}'")]
    NotYetImplemented {
        value: String,
        kind: &'static str,
        column: String,
    },

    /// A placeholder has no concrete type and may not synthesize one.
    #[error("class '{name}' in namespace '{namespace}' has no concrete type")]
    MissingTarget { name: String, namespace: String },

    #[error(transparent)]
    Type(#[from] TypeError),
}
