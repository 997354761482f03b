//! registry::namespaced
//!
//! Default [`NamespaceRegistry`] backed by the shared metadata store.
//!
//! # Materialization
//!
//! - A class reference is created on first lookup. Its parent is resolved
//!   from the type's declared parent and becomes `extends[0]`. Its
//!   properties are created right away.
//! - Properties come from the type's structural field hints merged with
//!   its decorated property records. A decorated record wins over a hint
//!   of the same name; decorated-only properties follow the hints.
//! - Each property's target is resolved as soon as it is created.
//! - Entities are synthesized from the type's entity records, deep-merged
//!   in store order.
//!
//! # Refresh
//!
//! [`refresh`](NamespaceRegistry::refresh) replays store events since the
//! registry's cursor. Additions are upserts: an existing reference only
//! gets the record's options merged in. Removals cascade.

use serde_json::Value;

use super::{ClassTarget, LookupRegistry, NamespaceRegistry, RegistryContext, RegistryError};
use crate::core::metadata::schema::{OptionRecord, PropertyDecl, RecordKind};
use crate::core::metadata::StoreEvent;
use crate::core::options::Options;
use crate::core::sync::read;
use crate::core::typedef::{FieldHint, FieldShape, TypeHandle};
use crate::core::types::{Cardinality, PrimitiveType, TypeName};
use crate::refs::entity_ref::SCHEMA_OPTION;
use crate::refs::schema_ref::DEFAULT_SCHEMA;
use crate::refs::{ClassRef, EntityRef, PropertyRef, PropertyTarget, SchemaRef, TypeHint};

/// Registry for one namespace.
#[derive(Debug)]
pub struct DefaultNamespacedRegistry {
    ctx: RegistryContext,
    default_schema: String,
    lookup: LookupRegistry,
    cursor: usize,
}

impl DefaultNamespacedRegistry {
    pub fn new(ctx: RegistryContext) -> Self {
        Self::with_default_schema(ctx, DEFAULT_SCHEMA)
    }

    /// Entities without explicit schema membership join `schema`.
    pub fn with_default_schema(ctx: RegistryContext, schema: &str) -> Self {
        let cursor = read(&ctx.store).cursor();
        Self {
            ctx,
            default_schema: schema.to_string(),
            lookup: LookupRegistry::new(),
            cursor,
        }
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    fn owns(&self, record: &OptionRecord) -> bool {
        let store = read(&self.ctx.store);
        store.effective_namespace(record, &self.ctx.default_namespace) == self.ctx.namespace
    }

    /// Records of a kind for `ty` that apply to this namespace.
    fn records(&self, kind: RecordKind, ty: &TypeHandle) -> Vec<OptionRecord> {
        let store = read(&self.ctx.store);
        store
            .get_by_context_and_target(kind, ty)
            .into_iter()
            .filter(|r| store.effective_namespace(r, &self.ctx.default_namespace) == self.ctx.namespace)
            .cloned()
            .collect()
    }

    fn create_bound(&mut self, ty: &TypeHandle) -> Result<ClassRef, RegistryError> {
        let class_ref = ClassRef::bound(ty, &self.ctx.namespace);
        tracing::debug!(class = %class_ref, "class reference created");
        self.lookup.add_class_ref(class_ref.clone());
        self.attach_parent(&class_ref, ty)?;
        self.populate_properties(&class_ref, ty);
        Ok(class_ref)
    }

    fn attach_parent(&mut self, class_ref: &ClassRef, ty: &TypeHandle) -> Result<(), RegistryError> {
        if let Some(parent) = ty.parent() {
            let parent_ref = self.get_class_ref(ClassTarget::Type(parent))?;
            class_ref.add_extend(&parent_ref);
        }
        Ok(())
    }

    /// Create the properties `ty` declares that the class does not have yet.
    fn populate_properties(&mut self, class_ref: &ClassRef, ty: &TypeHandle) {
        let mut decorated: Vec<(PropertyDecl, Options)> = Vec::new();
        for record in self.records(RecordKind::Property, ty) {
            let Some(decl) = record.property else {
                continue;
            };
            match decorated.iter_mut().find(|(d, _)| d.name == decl.name) {
                Some((_, options)) => options.deep_merge(&record.options),
                None => decorated.push((decl, record.options)),
            }
        }

        let mut planned: Vec<(PropertyDecl, Options, bool)> = Vec::new();
        for hint in ty.fields() {
            match decorated.iter().position(|(d, _)| d.name == hint.name) {
                Some(i) => {
                    let (decl, options) = decorated.remove(i);
                    planned.push((decl, options, false));
                }
                None => {
                    let (decl, options) = inferred_decl(hint);
                    planned.push((decl, options, true));
                }
            }
        }
        planned.extend(decorated.into_iter().map(|(d, o)| (d, o, false)));

        for (decl, options, inferred) in planned {
            if self.lookup.property_of(class_ref, &decl.name).is_none() {
                self.attach_property(class_ref, decl, options, inferred);
            }
        }
    }

    fn attach_property(
        &mut self,
        owner: &ClassRef,
        decl: PropertyDecl,
        options: Options,
        inferred: bool,
    ) -> PropertyRef {
        let property = PropertyRef::new(owner, decl, options, inferred);
        self.lookup.add_property(property.clone());
        self.link_property(&property);
        property
    }

    fn link_property(&mut self, property: &PropertyRef) -> bool {
        if property.is_resolved() {
            return false;
        }
        let target = self.resolve_hint(property.hint().clone());
        property.resolve(target)
    }

    fn resolve_hint(&mut self, hint: TypeHint) -> PropertyTarget {
        match hint {
            TypeHint::Primitive(p) => PropertyTarget::Primitive(p),
            TypeHint::Class(c) => PropertyTarget::Class(c),
            TypeHint::Type(ty) => match self.get_class_ref(ClassTarget::Type(&ty)) {
                Ok(c) => PropertyTarget::Class(c),
                Err(err) => {
                    tracing::warn!(ty = ty.name(), %err, "property target not resolved");
                    PropertyTarget::Unknown
                }
            },
            TypeHint::Name(name) => match PrimitiveType::from_hint(&name) {
                Some(p) => PropertyTarget::Primitive(p),
                None => self
                    .get_class_ref(ClassTarget::Name(&name))
                    .map(PropertyTarget::Class)
                    .unwrap_or(PropertyTarget::Unknown),
            },
            TypeHint::Unknown => PropertyTarget::Unknown,
        }
    }

    fn schema_names(&self, ty: Option<&TypeHandle>) -> Vec<String> {
        let Some(ty) = ty else {
            return Vec::new();
        };
        self.records(RecordKind::Schema, ty)
            .iter()
            .filter_map(|r| r.options.get_str("name").map(str::to_string))
            .collect()
    }

    fn materialize_entity(&mut self, class_ref: &ClassRef, mut options: Options) -> EntityRef {
        if !options.contains_key("name") {
            options.insert("name", class_ref.name());
        }

        let mut schemas = options.string_list(SCHEMA_OPTION);
        for name in self.schema_names(class_ref.type_handle().as_ref()) {
            if !schemas.contains(&name) {
                schemas.push(name);
            }
        }
        if schemas.is_empty() {
            schemas.push(self.default_schema.clone());
        }
        for name in &schemas {
            self.get_schema_ref(name);
        }
        options.insert(SCHEMA_OPTION, schemas);

        let entity = EntityRef::new(class_ref, options);
        tracing::debug!(entity = %entity.id(), "entity reference created");
        self.lookup.add_entity(entity.clone());
        entity
    }

    fn apply_added(&mut self, record: OptionRecord) -> Result<(), RegistryError> {
        let Some(class_ref) = self.lookup.class_for_type(&record.target).cloned() else {
            // Materialized lazily on first lookup.
            if record.kind == RecordKind::Schema {
                if let Some(name) = record.options.get_str("name") {
                    self.get_schema_ref(name);
                }
            }
            return Ok(());
        };

        match record.kind {
            RecordKind::Entity => match self.lookup.entity_for(&class_ref) {
                Some(entity) => entity.merge_options(&record.options),
                None => {
                    self.get_entity_ref_for(ClassTarget::Type(&record.target))?;
                }
            },
            RecordKind::Property => {
                let Some(decl) = record.property else {
                    return Ok(());
                };
                match self.lookup.property_of(&class_ref, &decl.name) {
                    Some(existing) => existing.merge_options(&record.options),
                    None => {
                        self.attach_property(&class_ref, decl, record.options, false);
                    }
                }
            }
            RecordKind::Schema => {
                if let Some(name) = record.options.get_str("name") {
                    self.get_schema_ref(name);
                    if let Some(entity) = self.lookup.entity_for(&class_ref) {
                        entity.add_schema(name);
                    }
                }
            }
            RecordKind::Namespace => {}
        }
        Ok(())
    }

    fn apply_removed(&mut self, record: &OptionRecord) {
        let removed = match (&record.kind, record.property_name()) {
            (RecordKind::Property, Some(name)) => self
                .lookup
                .remove_properties(|p| p.owner().has_type(&record.target) && p.name() == name),
            _ => self.remove_target(&record.target),
        };
        tracing::debug!(namespace = %self.ctx.namespace, removed, "records removed");
    }
}

/// Property declaration for a structural field hint.
fn inferred_decl(hint: &FieldHint) -> (PropertyDecl, Options) {
    let mut options = Options::new();
    let type_hint = match &hint.shape {
        FieldShape::Value(Value::Null) | FieldShape::Unknown => TypeHint::Unknown,
        FieldShape::Value(value) => {
            options.insert("default", value.clone());
            TypeHint::Primitive(match value {
                Value::Bool(_) => PrimitiveType::Boolean,
                Value::Number(_) => PrimitiveType::Number,
                Value::String(_) => PrimitiveType::String,
                Value::Array(_) => PrimitiveType::Array,
                _ => PrimitiveType::Object,
            })
        }
        FieldShape::Date => TypeHint::Primitive(PrimitiveType::DateTime),
        FieldShape::Type(ty) => TypeHint::Type(ty.clone()),
    };

    let decl = PropertyDecl {
        name: hint.name.clone(),
        hint: type_hint,
        cardinality: Cardinality::one(),
        pattern: false,
        appended: false,
    };
    (decl, options)
}

impl NamespaceRegistry for DefaultNamespacedRegistry {
    fn namespace(&self) -> &str {
        &self.ctx.namespace
    }

    fn get_class_ref(&mut self, target: ClassTarget<'_>) -> Result<ClassRef, RegistryError> {
        match target {
            ClassTarget::Type(ty) => {
                if let Some(found) = self.lookup.class_for_type(ty) {
                    return Ok(found.clone());
                }

                let placeholder = self
                    .lookup
                    .class_refs()
                    .iter()
                    .find(|c| c.is_placeholder() && !ty.is_anonymous() && c.name() == ty.name())
                    .cloned();
                if let Some(class_ref) = placeholder {
                    class_ref.update_class(ty);
                    if class_ref.get_extend().is_none() {
                        self.attach_parent(&class_ref, ty)?;
                    }
                    self.populate_properties(&class_ref, ty);
                    return Ok(class_ref);
                }

                self.create_bound(ty)
            }
            ClassTarget::Name(name) => {
                if let Some(found) = self.lookup.class_refs().iter().find(|c| c.name() == name) {
                    return Ok(found.clone());
                }
                self.create_class_ref(target)
            }
        }
    }

    fn create_class_ref(&mut self, target: ClassTarget<'_>) -> Result<ClassRef, RegistryError> {
        match target {
            ClassTarget::Type(ty) => self.create_bound(ty),
            ClassTarget::Name(name) => {
                let name = TypeName::new(name)?;
                let class_ref = ClassRef::placeholder(name.as_str(), &self.ctx.namespace);
                tracing::debug!(class = %class_ref, "placeholder created");
                self.lookup.add_class_ref(class_ref.clone());
                Ok(class_ref)
            }
        }
    }

    fn find_class_refs_by_name(&self, name: &str) -> Vec<ClassRef> {
        self.lookup.classes_named(name)
    }

    fn get_entity_ref_for(
        &mut self,
        target: ClassTarget<'_>,
    ) -> Result<Option<EntityRef>, RegistryError> {
        let class_ref = self.get_class_ref(target)?;
        if let Some(entity) = self.lookup.entity_for(&class_ref) {
            return Ok(Some(entity.clone()));
        }

        let Some(ty) = class_ref.type_handle() else {
            return Ok(None);
        };
        let records = self.records(RecordKind::Entity, &ty);
        if records.is_empty() {
            return Ok(None);
        }

        let mut options = Options::new();
        for record in &records {
            options.deep_merge(&record.options);
        }
        Ok(Some(self.materialize_entity(&class_ref, options)))
    }

    fn declare_entity_ref(&mut self, class_ref: &ClassRef, options: &Options) -> EntityRef {
        if let Some(entity) = self.lookup.entity_for(class_ref) {
            entity.merge_options(options);
            return entity.clone();
        }
        self.materialize_entity(class_ref, options.clone())
    }

    fn create_entity_ref(&mut self, class_ref: &ClassRef, options: &Options) -> EntityRef {
        self.materialize_entity(class_ref, options.clone())
    }

    fn get_entity_ref_by_name(&self, name: &str) -> Result<Option<EntityRef>, RegistryError> {
        let mut matches = self.lookup.entities().iter().filter(|e| e.name() == name);
        let first = matches.next().cloned();
        if matches.next().is_some() {
            return Err(RegistryError::NotSupported(format!(
                "entity name '{}' is ambiguous in namespace '{}'",
                name, self.ctx.namespace
            )));
        }
        Ok(first)
    }

    fn get_property_refs(&mut self, class_ref: &ClassRef) -> Result<Vec<PropertyRef>, RegistryError> {
        let existing = self.lookup.properties_of(class_ref);
        if !existing.is_empty() {
            return Ok(existing);
        }
        if let Some(ty) = class_ref.type_handle() {
            self.populate_properties(class_ref, &ty);
        }
        Ok(self.lookup.properties_of(class_ref))
    }

    fn create_property_ref(
        &mut self,
        owner: &ClassRef,
        decl: PropertyDecl,
        options: Options,
    ) -> Result<PropertyRef, RegistryError> {
        let property = self.attach_property(owner, decl, options, false);
        tracing::debug!(property = %property.id(), "property reference created");
        Ok(property)
    }

    fn get_schema_ref(&mut self, name: &str) -> SchemaRef {
        if let Some(schema) = self.lookup.schema(name) {
            return schema.clone();
        }
        let schema = SchemaRef::new(name, &self.ctx.namespace);
        self.lookup.add_schema(schema.clone());
        schema
    }

    fn get_entity_refs_for_schema(
        &mut self,
        schema: &SchemaRef,
    ) -> Result<Vec<EntityRef>, RegistryError> {
        let targets: Vec<TypeHandle> = {
            let store = read(&self.ctx.store);
            store
                .filter(|r| {
                    r.kind == RecordKind::Schema
                        && r.options.get_str("name") == Some(schema.name())
                        && store.effective_namespace(r, &self.ctx.default_namespace)
                            == self.ctx.namespace
                })
                .into_iter()
                .map(|r| r.target.clone())
                .collect()
        };

        for ty in targets {
            if self.get_entity_ref_for(ClassTarget::Type(&ty))?.is_none() {
                let class_ref = self.get_class_ref(ClassTarget::Type(&ty))?;
                self.declare_entity_ref(&class_ref, &Options::new());
            }
        }

        Ok(self
            .lookup
            .entities()
            .iter()
            .filter(|e| e.schemas().iter().any(|s| s == schema.name()))
            .cloned()
            .collect())
    }

    fn list_class_refs(&self) -> Vec<ClassRef> {
        self.lookup.class_refs().to_vec()
    }

    fn list_entity_refs(&self) -> Vec<EntityRef> {
        self.lookup.entities().to_vec()
    }

    fn list_schema_refs(&self) -> Vec<SchemaRef> {
        self.lookup.schemas().to_vec()
    }

    fn refresh(&mut self) -> Result<(), RegistryError> {
        let events: Vec<StoreEvent> = {
            let store = read(&self.ctx.store);
            let events = store.events_since(self.cursor).to_vec();
            self.cursor = store.cursor();
            events
        };

        for event in events {
            match event {
                StoreEvent::Added(id) => {
                    let record = read(&self.ctx.store).get(id).cloned();
                    match record {
                        Some(record) if self.owns(&record) => self.apply_added(record)?,
                        _ => {}
                    }
                }
                StoreEvent::Removed(record) => {
                    if self.owns(&record) {
                        self.apply_removed(&record);
                    }
                }
            }
        }
        Ok(())
    }

    fn link(&mut self) -> Result<usize, RegistryError> {
        let pending: Vec<PropertyRef> = self
            .lookup
            .properties()
            .iter()
            .filter(|p| !p.is_resolved())
            .cloned()
            .collect();
        let mut linked = 0;
        for property in pending {
            if self.link_property(&property) {
                linked += 1;
            }
        }
        Ok(linked)
    }

    fn remove_target(&mut self, ty: &TypeHandle) -> usize {
        self.lookup.remove_classes(|c| c.has_type(ty))
    }

    fn reset(&mut self) {
        tracing::debug!(namespace = %self.ctx.namespace, "namespace reset");
        self.lookup.clear();
        self.cursor = read(&self.ctx.store).cursor();
    }
}
