//! codec::options
//!
//! Options for the serializer and the unserializer.
//!
//! Both option sets start from defaults that can be seeded from
//! [`Config`] and then adjusted per call.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::fetch::RefAddress;
use crate::core::config::Config;
use crate::core::options::Options;
use crate::refs::{ClassRef, PropertyRef};

/// Keys never copied from options into a schema node.
pub const DEFAULT_KEYS_TO_SKIP: &[&str] = &[
    "type",
    "$ref",
    "target",
    "propertyName",
    "metaType",
    "namespace",
    "name",
];

/// How references to classes of other schemas are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultipleSchemas {
    /// Describe the target locally.
    #[default]
    Clone,
    /// Point at `<schema>#/definitions/<Name>`.
    Reference,
}

/// The node a [`PostProcess`] hook is called for.
#[derive(Debug, Clone, Copy)]
pub enum SchemaNode<'a> {
    Class(&'a ClassRef),
    Property(&'a PropertyRef),
}

/// Hook run on every generated node after it was populated.
pub type PostProcess = Arc<dyn Fn(SchemaNode<'_>, &mut Map<String, Value>) + Send + Sync>;

/// Serializer options.
#[derive(Clone)]
pub struct SerializeOptions {
    /// Namespace bare types are looked up in.
    pub namespace: Option<String>,
    /// Tag definitions with `$target`, the bound type's key.
    pub append_target: bool,
    pub handle_multiple_schemas: MultipleSchemas,
    /// Tag definitions with `$namespace`.
    pub append_namespace: bool,
    /// Skip properties inferred from structural field hints.
    pub only_decorated: bool,
    /// Drop properties of unknown type instead of using `default_type_hint`.
    pub ignore_unknown_type: bool,
    pub default_type_hint: String,
    pub post_process: Option<PostProcess>,
    pub keys_to_skip: Vec<String>,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            append_target: false,
            handle_multiple_schemas: MultipleSchemas::default(),
            append_namespace: false,
            only_decorated: false,
            ignore_unknown_type: false,
            default_type_hint: "string".to_string(),
            post_process: None,
            keys_to_skip: DEFAULT_KEYS_TO_SKIP.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl SerializeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            append_namespace: config.append_namespace(),
            ..Self::default()
        }
    }

    pub(crate) fn skips(&self, key: &str) -> bool {
        self.keys_to_skip.iter().any(|k| k == key)
    }
}

impl std::fmt::Debug for SerializeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializeOptions")
            .field("namespace", &self.namespace)
            .field("append_target", &self.append_target)
            .field("handle_multiple_schemas", &self.handle_multiple_schemas)
            .field("append_namespace", &self.append_namespace)
            .field("only_decorated", &self.only_decorated)
            .field("ignore_unknown_type", &self.ignore_unknown_type)
            .field("default_type_hint", &self.default_type_hint)
            .field("post_process", &self.post_process.is_some())
            .field("keys_to_skip", &self.keys_to_skip)
            .finish()
    }
}

/// What kind of reference a [`Collector`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorTarget {
    Class,
    Entity,
    Property,
}

/// Harvests an extra document key into the options of a reference.
///
/// The extractor gets the key, the whole schema node and the options
/// gathered so far. A `Some` result is stored under the key.
#[derive(Clone)]
pub struct Collector {
    pub target: CollectorTarget,
    pub key: String,
    extract: Arc<dyn Fn(&str, &Value, &Options) -> Option<Value> + Send + Sync>,
}

impl Collector {
    pub fn new(
        target: CollectorTarget,
        key: impl Into<String>,
        extract: impl Fn(&str, &Value, &Options) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            target,
            key: key.into(),
            extract: Arc::new(extract),
        }
    }

    /// Copy the node's value for `key` verbatim.
    pub fn copy(target: CollectorTarget, key: impl Into<String>) -> Self {
        Self::new(target, key, |key, node, _| node.get(key).cloned())
    }

    pub(crate) fn apply(&self, node: &Value, options: &mut Options) {
        if let Some(value) = (self.extract)(&self.key, node, options) {
            options.insert(self.key.clone(), value);
        }
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("target", &self.target)
            .field("key", &self.key)
            .finish()
    }
}

/// Shape of the unserialize result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnKind {
    /// Whatever each node parsed to.
    #[default]
    Default,
    /// Promote class references to entities.
    EntityRefs,
    /// Reduce entities to their class references.
    ClassRefs,
}

/// Unserializer options.
#[derive(Debug, Clone)]
pub struct UnserializeOptions {
    /// Treat the document root as an entity.
    pub root_as_entity: bool,
    /// Name of the root class, overriding its title.
    pub class_name: Option<String>,
    pub namespace: Option<String>,
    pub force_class_ref_creation: bool,
    pub force_entity_ref_creation: bool,
    pub force_property_ref_creation: bool,
    /// Prefix names synthesized from property names with the owner's name.
    pub prepend_class: bool,
    /// Ignore `$namespace` tags in the document.
    pub skip_namespace: bool,
    /// Base for relative file references when the document has no address.
    pub cwd: Option<PathBuf>,
    /// Where the document itself came from.
    pub base_address: Option<RefAddress>,
    pub collectors: Vec<Collector>,
    pub return_kind: ReturnKind,
}

impl Default for UnserializeOptions {
    fn default() -> Self {
        Self {
            root_as_entity: true,
            class_name: None,
            namespace: None,
            force_class_ref_creation: false,
            force_entity_ref_creation: false,
            force_property_ref_creation: false,
            prepend_class: false,
            skip_namespace: false,
            cwd: None,
            base_address: None,
            collectors: Vec::new(),
            return_kind: ReturnKind::default(),
        }
    }
}

impl UnserializeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            root_as_entity: config.root_as_entity(),
            prepend_class: config.prepend_class(),
            ..Self::default()
        }
    }

    pub(crate) fn collectors_for(&self, target: CollectorTarget) -> impl Iterator<Item = &Collector> {
        self.collectors.iter().filter(move |c| c.target == target)
    }
}
