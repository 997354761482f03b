//! registry::lookup
//!
//! Flat per-kind indices of one namespace.
//!
//! Lists are append-only apart from [`remove_classes`](LookupRegistry::remove_classes),
//! which cascades to entities and properties, and [`clear`](LookupRegistry::clear).

use crate::core::typedef::TypeHandle;
use crate::refs::{ClassRef, EntityRef, PropertyRef, SchemaRef};

#[derive(Debug, Default)]
pub struct LookupRegistry {
    class_refs: Vec<ClassRef>,
    entities: Vec<EntityRef>,
    properties: Vec<PropertyRef>,
    schemas: Vec<SchemaRef>,
}

impl LookupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class_ref(&mut self, class_ref: ClassRef) {
        self.class_refs.push(class_ref);
    }

    pub fn add_entity(&mut self, entity: EntityRef) {
        self.entities.push(entity);
    }

    pub fn add_property(&mut self, property: PropertyRef) {
        self.properties.push(property);
    }

    pub fn add_schema(&mut self, schema: SchemaRef) {
        self.schemas.push(schema);
    }

    pub fn class_refs(&self) -> &[ClassRef] {
        &self.class_refs
    }

    pub fn entities(&self) -> &[EntityRef] {
        &self.entities
    }

    pub fn properties(&self) -> &[PropertyRef] {
        &self.properties
    }

    pub fn schemas(&self) -> &[SchemaRef] {
        &self.schemas
    }

    /// First class reference bound to `ty`.
    pub fn class_for_type(&self, ty: &TypeHandle) -> Option<&ClassRef> {
        self.class_refs.iter().find(|c| c.has_type(ty))
    }

    pub fn classes_named(&self, name: &str) -> Vec<ClassRef> {
        self.class_refs
            .iter()
            .filter(|c| c.name() == name)
            .cloned()
            .collect()
    }

    pub fn entity_for(&self, class_ref: &ClassRef) -> Option<&EntityRef> {
        self.entities
            .iter()
            .find(|e| e.class_ref().is_same(class_ref))
    }

    pub fn properties_of(&self, owner: &ClassRef) -> Vec<PropertyRef> {
        self.properties
            .iter()
            .filter(|p| p.owner().is_same(owner))
            .cloned()
            .collect()
    }

    pub fn property_of(&self, owner: &ClassRef, name: &str) -> Option<&PropertyRef> {
        self.properties
            .iter()
            .find(|p| p.owner().is_same(owner) && p.name() == name)
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaRef> {
        self.schemas.iter().find(|s| s.name() == name)
    }

    /// Remove every class matching the predicate together with its entities
    /// and properties. Returns the number of references removed.
    pub fn remove_classes(&mut self, predicate: impl Fn(&ClassRef) -> bool) -> usize {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.class_refs)
            .into_iter()
            .partition(|c| predicate(c));
        self.class_refs = kept;

        let gone = |c: &ClassRef| removed.iter().any(|r| r.is_same(c));
        let entities_before = self.entities.len();
        let properties_before = self.properties.len();
        self.entities.retain(|e| !gone(e.class_ref()));
        self.properties.retain(|p| !gone(p.owner()));

        removed.len()
            + (entities_before - self.entities.len())
            + (properties_before - self.properties.len())
    }

    /// Remove properties matching the predicate.
    pub fn remove_properties(&mut self, predicate: impl Fn(&PropertyRef) -> bool) -> usize {
        let before = self.properties.len();
        self.properties.retain(|p| !predicate(p));
        before - self.properties.len()
    }

    pub fn clear(&mut self) {
        self.class_refs.clear();
        self.entities.clear();
        self.properties.clear();
        self.schemas.clear();
    }
}
