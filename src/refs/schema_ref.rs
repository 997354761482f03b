//! refs::schema_ref
//!
//! A named group of entities. Membership is recorded on the entities, so a
//! schema reference only carries its name and options.

use std::sync::{Arc, RwLock};

use crate::core::options::Options;
use crate::core::sync::{read, write};

/// Name of the schema entities join when nothing else is declared.
pub const DEFAULT_SCHEMA: &str = "default";

/// Shared handle to a schema reference.
#[derive(Clone)]
pub struct SchemaRef {
    inner: Arc<SchemaInner>,
}

struct SchemaInner {
    name: String,
    namespace: String,
    options: RwLock<Options>,
}

impl SchemaRef {
    pub(crate) fn new(name: &str, namespace: &str) -> Self {
        Self {
            inner: Arc::new(SchemaInner {
                name: name.to_string(),
                namespace: namespace.to_string(),
                options: RwLock::new(Options::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    pub fn options(&self) -> Options {
        read(&self.inner.options).clone()
    }

    pub fn merge_options(&self, options: &Options) {
        write(&self.inner.options).deep_merge(options);
    }

    pub fn is_same(&self, other: &SchemaRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for SchemaRef {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl Eq for SchemaRef {}

impl std::fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SchemaRef({}/{})", self.inner.namespace, self.inner.name)
    }
}
