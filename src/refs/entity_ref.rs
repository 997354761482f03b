//! refs::entity_ref
//!
//! A class reference promoted to an independently addressable entity.
//!
//! Schema membership lives in the entity's own options under `schema`, as
//! a list of schema names.

use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use super::property_ref::json_kind;
use super::{ClassRef, PropertyRef, RefError};
use crate::core::options::Options;
use crate::core::sync::{read, write};

/// Option key holding schema membership.
pub const SCHEMA_OPTION: &str = "schema";

/// Shared handle to an entity reference.
#[derive(Clone)]
pub struct EntityRef {
    inner: Arc<EntityInner>,
}

struct EntityInner {
    class_ref: ClassRef,
    options: RwLock<Options>,
}

impl EntityRef {
    pub(crate) fn new(class_ref: &ClassRef, options: Options) -> Self {
        Self {
            inner: Arc::new(EntityInner {
                class_ref: class_ref.clone(),
                options: RwLock::new(options),
            }),
        }
    }

    /// `entity--<class id>`.
    pub fn id(&self) -> String {
        format!("entity--{}", self.inner.class_ref.id())
    }

    /// The `name` option, falling back to the class name.
    pub fn name(&self) -> String {
        read(&self.inner.options)
            .get_str("name")
            .map(str::to_string)
            .unwrap_or_else(|| self.inner.class_ref.name().to_string())
    }

    pub fn class_ref(&self) -> &ClassRef {
        &self.inner.class_ref
    }

    pub fn namespace(&self) -> &str {
        self.inner.class_ref.namespace()
    }

    pub fn options(&self) -> Options {
        read(&self.inner.options).clone()
    }

    pub fn merge_options(&self, options: &Options) {
        write(&self.inner.options).deep_merge(options);
    }

    /// Names of the schemas this entity belongs to.
    pub fn schemas(&self) -> Vec<String> {
        read(&self.inner.options).string_list(SCHEMA_OPTION)
    }

    pub fn add_schema(&self, schema: &str) {
        let mut options = write(&self.inner.options);
        let mut schemas = options.string_list(SCHEMA_OPTION);
        if !schemas.iter().any(|s| s == schema) {
            schemas.push(schema.to_string());
            options.insert(SCHEMA_OPTION, schemas);
        }
    }

    /// Build a typed object from plain data.
    ///
    /// Each property reads its key off `data` and converts it. Collection
    /// properties convert element by element. Keys without a property are
    /// dropped; missing keys come out as `null`. Pattern properties are
    /// skipped.
    ///
    /// # Errors
    ///
    /// [`RefError::NotYetImplemented`] if `data` is not an object or any
    /// value has no conversion rule.
    pub fn build(&self, data: &Value, props: &[PropertyRef]) -> Result<Value, RefError> {
        if !data.is_object() {
            return Err(RefError::NotYetImplemented {
                value: data.to_string(),
                kind: json_kind(data),
                column: self.name(),
            });
        }

        let mut out = Map::new();
        for prop in props.iter().filter(|p| !p.is_pattern()) {
            let raw = prop.get(data);
            let value = match &raw {
                Value::Array(items) if prop.is_collection() => Value::Array(
                    items
                        .iter()
                        .map(|item| prop.convert(item).map(|c| c.into_value()))
                        .collect::<Result<_, _>>()?,
                ),
                _ => prop.convert(&raw)?.into_value(),
            };
            out.insert(prop.name().to_string(), value);
        }
        Ok(Value::Object(out))
    }

    pub fn is_same(&self, other: &EntityRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl Eq for EntityRef {}

impl std::fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRef")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}
