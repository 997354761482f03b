//! registry
//!
//! Per-namespace indices of references and the factory that owns them.
//!
//! # Modules
//!
//! - [`lookup`] - [`LookupRegistry`], flat indices by kind
//! - [`namespaced`] - [`DefaultNamespacedRegistry`], materializes references from store records
//! - [`factory`] - [`RegistryFactory`], namespace to registry mapping and the shared store
//!
//! # Architecture
//!
//! A [`NamespaceRegistry`] owns every reference of one namespace. References
//! are created lazily on first lookup from the records in the shared
//! [`MetadataStore`](crate::core::metadata::MetadataStore); later records are
//! picked up by [`refresh`](NamespaceRegistry::refresh), which replays the
//! store's change log.
//!
//! Registries are reached through a [`RegistryFactory`] the host constructs
//! and passes around. There is no global registry.

pub mod factory;
pub mod lookup;
pub mod namespaced;

use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::core::metadata::schema::PropertyDecl;
use crate::core::metadata::{MetadataStore, StoreError};
use crate::core::options::Options;
use crate::core::typedef::TypeHandle;
use crate::core::types::TypeError;
use crate::refs::{ClassRef, EntityRef, PropertyRef, RefError, SchemaRef};

pub use factory::{RegistryBuilder, RegistryFactory, RegistryPattern, SharedRegistry};
pub use lookup::LookupRegistry;
pub use namespaced::DefaultNamespacedRegistry;

/// The metadata store shared by the factory and all registries.
pub type SharedStore = Arc<RwLock<MetadataStore>>;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The operation has no implementation here, or the request is ambiguous.
    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("invalid registry pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error(transparent)]
    Ref(#[from] RefError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a class reference is looked up by.
#[derive(Debug, Clone, Copy)]
pub enum ClassTarget<'a> {
    /// A declared type.
    Type(&'a TypeHandle),
    /// A bare name; creates a placeholder when nothing matches.
    Name(&'a str),
}

impl<'a> From<&'a TypeHandle> for ClassTarget<'a> {
    fn from(ty: &'a TypeHandle) -> Self {
        ClassTarget::Type(ty)
    }
}

impl<'a> From<&'a str> for ClassTarget<'a> {
    fn from(name: &'a str) -> Self {
        ClassTarget::Name(name)
    }
}

/// Everything a registry builder gets to construct a registry.
#[derive(Debug, Clone)]
pub struct RegistryContext {
    pub namespace: String,
    /// Namespace that records without one belong to.
    pub default_namespace: String,
    pub store: SharedStore,
}

/// Index of all references in one namespace.
///
/// Lookups create what they do not find; `create_*` methods always create,
/// producing duplicates on purpose.
pub trait NamespaceRegistry: Send {
    fn namespace(&self) -> &str;

    /// Canonical class reference for a type or name, created if absent.
    ///
    /// A placeholder with the same name is upgraded when a type is given.
    fn get_class_ref(&mut self, target: ClassTarget<'_>) -> Result<ClassRef, RegistryError>;

    /// A new class reference, even if an equivalent one exists.
    fn create_class_ref(&mut self, target: ClassTarget<'_>) -> Result<ClassRef, RegistryError>;

    fn find_class_refs_by_name(&self, name: &str) -> Vec<ClassRef>;

    /// Entity for a type or name, synthesized from entity records.
    ///
    /// Returns `None` when the type has no entity records.
    fn get_entity_ref_for(
        &mut self,
        target: ClassTarget<'_>,
    ) -> Result<Option<EntityRef>, RegistryError>;

    /// Existing entity for the class with `options` merged in, or a new one.
    fn declare_entity_ref(&mut self, class_ref: &ClassRef, options: &Options) -> EntityRef;

    /// A new entity, even if the class already has one.
    fn create_entity_ref(&mut self, class_ref: &ClassRef, options: &Options) -> EntityRef;

    /// # Errors
    ///
    /// [`RegistryError::NotSupported`] when several entities carry the name.
    fn get_entity_ref_by_name(&self, name: &str) -> Result<Option<EntityRef>, RegistryError>;

    /// Properties of a class in declaration order.
    fn get_property_refs(&mut self, class_ref: &ClassRef) -> Result<Vec<PropertyRef>, RegistryError>;

    fn get_property_ref(
        &mut self,
        class_ref: &ClassRef,
        name: &str,
    ) -> Result<Option<PropertyRef>, RegistryError> {
        Ok(self
            .get_property_refs(class_ref)?
            .into_iter()
            .find(|p| p.name() == name))
    }

    /// A new property, even if the class already has one with this name.
    fn create_property_ref(
        &mut self,
        owner: &ClassRef,
        decl: PropertyDecl,
        options: Options,
    ) -> Result<PropertyRef, RegistryError>;

    /// Schema reference by name, created if absent.
    fn get_schema_ref(&mut self, name: &str) -> SchemaRef;

    /// Every entity that belongs to the schema.
    fn get_entity_refs_for_schema(
        &mut self,
        schema: &SchemaRef,
    ) -> Result<Vec<EntityRef>, RegistryError> {
        Err(RegistryError::NotSupported(format!(
            "entity lookup by schema '{}' in namespace '{}'",
            schema.name(),
            self.namespace()
        )))
    }

    fn list_class_refs(&self) -> Vec<ClassRef>;

    fn list_entity_refs(&self) -> Vec<EntityRef>;

    fn list_schema_refs(&self) -> Vec<SchemaRef>;

    /// Apply store changes recorded since the last refresh.
    fn refresh(&mut self) -> Result<(), RegistryError>;

    /// Resolve every property target still pending. Returns how many were resolved.
    fn link(&mut self) -> Result<usize, RegistryError>;

    /// Drop every reference bound to `ty`, cascading to entities and properties.
    fn remove_target(&mut self, ty: &TypeHandle) -> usize;

    /// Clear the whole namespace index.
    fn reset(&mut self);
}
