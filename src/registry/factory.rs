//! registry::factory
//!
//! Namespace to registry mapping.
//!
//! # Design
//!
//! The factory owns the shared [`MetadataStore`] and one registry per
//! namespace, materialized on first use. Which registry implementation a
//! namespace gets is decided by builders registered against an exact name
//! or a regular expression; unmatched namespaces get a
//! [`DefaultNamespacedRegistry`].
//!
//! Lookup order is exact builders, then regex builders in registration
//! order, then the default.
//!
//! # Example
//!
//! ```
//! use schemaref::core::metadata::schema::PropertyRecord;
//! use schemaref::core::typedef::TypeDef;
//! use schemaref::core::types::PrimitiveType;
//! use schemaref::registry::{ClassTarget, RegistryFactory};
//!
//! let factory = RegistryFactory::default();
//! let car = TypeDef::builder("Car").build().unwrap();
//! factory
//!     .register(PropertyRecord::new(&car, "brand").primitive(PrimitiveType::String))
//!     .unwrap();
//!
//! let class_ref = factory.class_ref(ClassTarget::Type(&car), None).unwrap();
//! let props = factory
//!     .with_registry(None, |reg| reg.get_property_refs(&class_ref))
//!     .unwrap();
//! assert_eq!(props[0].name(), "brand");
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use regex::Regex;

use super::{
    ClassTarget, DefaultNamespacedRegistry, NamespaceRegistry, RegistryContext, RegistryError,
    SharedStore,
};
use crate::core::config::Config;
use crate::core::metadata::schema::OptionRecord;
use crate::core::metadata::{MetadataStore, RecordId};
use crate::core::sync::{lock, read, write};
use crate::core::typedef::TypeHandle;
use crate::core::types::{validate_namespace, DEFAULT_NAMESPACE, GLOBAL_NAMESPACE};
use crate::refs::{ClassRef, EntityRef};

/// Constructs the registry for a namespace.
pub type RegistryBuilder = Arc<dyn Fn(RegistryContext) -> Box<dyn NamespaceRegistry> + Send + Sync>;

/// A materialized registry, shared between callers.
pub type SharedRegistry = Arc<Mutex<Box<dyn NamespaceRegistry>>>;

/// Which namespaces a builder applies to.
#[derive(Debug, Clone)]
pub enum RegistryPattern {
    Exact(String),
    Regex(Regex),
}

impl RegistryPattern {
    pub fn exact(namespace: impl Into<String>) -> Self {
        RegistryPattern::Exact(namespace.into())
    }

    /// # Errors
    ///
    /// [`RegistryError::InvalidPattern`] if the expression does not compile.
    pub fn regex(pattern: &str) -> Result<Self, RegistryError> {
        Regex::new(pattern)
            .map(RegistryPattern::Regex)
            .map_err(|e| RegistryError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    pub fn matches(&self, namespace: &str) -> bool {
        match self {
            RegistryPattern::Exact(name) => name == namespace,
            RegistryPattern::Regex(re) => re.is_match(namespace),
        }
    }
}

/// Owner of the metadata store and every namespace registry.
pub struct RegistryFactory {
    store: SharedStore,
    default_namespace: String,
    exact: RwLock<BTreeMap<String, RegistryBuilder>>,
    /// Keyed by source so re-registering a pattern replaces its builder.
    patterns: RwLock<Vec<(String, Regex, RegistryBuilder)>>,
    registries: Mutex<BTreeMap<String, SharedRegistry>>,
}

impl Default for RegistryFactory {
    fn default() -> Self {
        Self::with_default_namespace(DEFAULT_NAMESPACE)
    }
}

impl std::fmt::Debug for RegistryFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryFactory")
            .field("default_namespace", &self.default_namespace)
            .field("namespaces", &self.namespaces())
            .finish()
    }
}

impl RegistryFactory {
    /// A factory whose unnamed namespace is `default_namespace`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Type`] if the namespace is not a valid name.
    pub fn new(default_namespace: &str) -> Result<Self, RegistryError> {
        validate_namespace(default_namespace)?;
        Ok(Self::with_default_namespace(default_namespace))
    }

    fn with_default_namespace(default_namespace: &str) -> Self {
        Self {
            store: Arc::new(RwLock::new(MetadataStore::new())),
            default_namespace: default_namespace.to_string(),
            exact: RwLock::new(BTreeMap::new()),
            patterns: RwLock::new(Vec::new()),
            registries: Mutex::new(BTreeMap::new()),
        }
    }

    /// A factory set up from configuration.
    ///
    /// Each configured registry pattern gets a default registry with the
    /// entry's default schema.
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let factory = Self::new(config.default_namespace())?;
        let mut seen = HashSet::new();
        // Project entries come first; a repeated pattern keeps the first entry.
        for entry in config.registries() {
            if !seen.insert((entry.pattern.as_str(), entry.regex)) {
                continue;
            }
            let pattern = if entry.regex {
                RegistryPattern::regex(&entry.pattern)?
            } else {
                RegistryPattern::exact(entry.pattern.as_str())
            };
            let schema = entry.default_schema.clone();
            let builder: RegistryBuilder = Arc::new(move |ctx: RegistryContext| {
                let registry = match &schema {
                    Some(schema) => DefaultNamespacedRegistry::with_default_schema(ctx, schema),
                    None => DefaultNamespacedRegistry::new(ctx),
                };
                Box::new(registry) as Box<dyn NamespaceRegistry>
            });
            factory.set_registry_for(pattern, builder);
        }
        Ok(factory)
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// The namespace a lookup goes to. Absent, empty and global names map
    /// to the default namespace.
    pub fn resolve_namespace<'a>(&'a self, namespace: Option<&'a str>) -> &'a str {
        match namespace {
            None | Some("") | Some(GLOBAL_NAMESPACE) => &self.default_namespace,
            Some(ns) => ns,
        }
    }

    /// Register a builder for namespaces matching `pattern`.
    ///
    /// Namespaces already materialized keep their registry.
    pub fn set_registry_for(&self, pattern: RegistryPattern, builder: RegistryBuilder) {
        match pattern {
            RegistryPattern::Exact(name) => {
                write(&self.exact).insert(name, builder);
            }
            RegistryPattern::Regex(re) => {
                let mut patterns = write(&self.patterns);
                let source = re.as_str().to_string();
                match patterns.iter_mut().find(|(s, _, _)| *s == source) {
                    Some(slot) => slot.2 = builder,
                    None => patterns.push((source, re, builder)),
                }
            }
        }
    }

    fn builder_for(&self, namespace: &str) -> Option<RegistryBuilder> {
        if let Some(builder) = read(&self.exact).get(namespace) {
            return Some(Arc::clone(builder));
        }
        read(&self.patterns)
            .iter()
            .find(|(_, re, _)| re.is_match(namespace))
            .map(|(_, _, builder)| Arc::clone(builder))
    }

    /// The registry for a namespace, materialized on first use.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Type`] if the namespace is not a valid name.
    pub fn get(&self, namespace: Option<&str>) -> Result<SharedRegistry, RegistryError> {
        let namespace = self.resolve_namespace(namespace);
        let mut registries = lock(&self.registries);
        if let Some(registry) = registries.get(namespace) {
            return Ok(Arc::clone(registry));
        }

        validate_namespace(namespace)?;
        let ctx = RegistryContext {
            namespace: namespace.to_string(),
            default_namespace: self.default_namespace.clone(),
            store: Arc::clone(&self.store),
        };
        let registry: Box<dyn NamespaceRegistry> = match self.builder_for(namespace) {
            Some(builder) => builder(ctx),
            None => Box::new(DefaultNamespacedRegistry::new(ctx)),
        };
        tracing::debug!(namespace, "registry materialized");

        let shared = Arc::new(Mutex::new(registry));
        registries.insert(namespace.to_string(), Arc::clone(&shared));
        Ok(shared)
    }

    /// Run `f` against a namespace's registry.
    ///
    /// The registry stays locked while `f` runs; `f` must not reach back
    /// into the factory for the same namespace.
    pub fn with_registry<R>(
        &self,
        namespace: Option<&str>,
        f: impl FnOnce(&mut dyn NamespaceRegistry) -> Result<R, RegistryError>,
    ) -> Result<R, RegistryError> {
        let registry = self.get(namespace)?;
        let mut guard = lock(&registry);
        f(guard.as_mut())
    }

    /// Namespaces with a materialized registry.
    pub fn namespaces(&self) -> Vec<String> {
        lock(&self.registries).keys().cloned().collect()
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    fn materialized(&self) -> Vec<SharedRegistry> {
        lock(&self.registries).values().cloned().collect()
    }

    fn refresh_all(&self) -> Result<(), RegistryError> {
        for registry in self.materialized() {
            lock(&registry).refresh()?;
        }
        Ok(())
    }

    /// Add a record to the store and bring materialized registries up to date.
    pub fn register(&self, record: impl Into<OptionRecord>) -> Result<RecordId, RegistryError> {
        let record = record.into();
        let id = write(&self.store).add(record)?;
        self.refresh_all()?;
        Ok(id)
    }

    /// Remove matching records; registries drop what they built from them.
    pub fn remove_records(
        &self,
        predicate: impl Fn(&OptionRecord) -> bool,
    ) -> Result<usize, RegistryError> {
        let removed = write(&self.store).remove(predicate).len();
        if removed > 0 {
            self.refresh_all()?;
        }
        Ok(removed)
    }

    /// Namespace bound to a type by a namespace record.
    pub fn namespace_of(&self, ty: &TypeHandle) -> Option<String> {
        read(&self.store).namespace_of(ty).map(str::to_string)
    }

    /// Class reference in `namespace`.
    ///
    /// Without a namespace, a type is looked up where its namespace record
    /// puts it and a name in the default namespace.
    pub fn class_ref(
        &self,
        target: ClassTarget<'_>,
        namespace: Option<&str>,
    ) -> Result<ClassRef, RegistryError> {
        let bound = match (namespace, target) {
            (None, ClassTarget::Type(ty)) => self.namespace_of(ty),
            _ => None,
        };
        let namespace = namespace.or(bound.as_deref());
        self.with_registry(namespace, |reg| reg.get_class_ref(target))
    }

    /// Entity reference in `namespace`, resolved like [`class_ref`](Self::class_ref).
    pub fn entity_ref(
        &self,
        target: ClassTarget<'_>,
        namespace: Option<&str>,
    ) -> Result<Option<EntityRef>, RegistryError> {
        let bound = match (namespace, target) {
            (None, ClassTarget::Type(ty)) => self.namespace_of(ty),
            _ => None,
        };
        let namespace = namespace.or(bound.as_deref());
        self.with_registry(namespace, |reg| reg.get_entity_ref_for(target))
    }

    /// Clear one namespace index, or all of them.
    pub fn reset(&self, namespace: Option<&str>) -> Result<(), RegistryError> {
        match namespace {
            Some(_) => self.with_registry(namespace, |reg| {
                reg.reset();
                Ok(())
            }),
            None => {
                for registry in self.materialized() {
                    lock(&registry).reset();
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ProjectConfig, RegistryEntry};
    use crate::core::metadata::schema::{EntityRecord, NamespaceRecord, PropertyRecord};
    use crate::core::typedef::TypeDef;
    use crate::core::types::PrimitiveType;

    /// Registry that records which namespaces it was built for.
    fn tagged_builder(tag: &'static str, seen: Arc<Mutex<Vec<String>>>) -> RegistryBuilder {
        Arc::new(move |ctx: RegistryContext| {
            lock(&seen).push(format!("{}:{}", tag, ctx.namespace));
            Box::new(DefaultNamespacedRegistry::new(ctx)) as Box<dyn NamespaceRegistry>
        })
    }

    mod namespaces {
        use super::*;

        #[test]
        fn global_and_empty_map_to_default() {
            let factory = RegistryFactory::default();
            assert_eq!(factory.resolve_namespace(None), "default");
            assert_eq!(factory.resolve_namespace(Some("")), "default");
            assert_eq!(factory.resolve_namespace(Some(GLOBAL_NAMESPACE)), "default");
            assert_eq!(factory.resolve_namespace(Some("fleet")), "fleet");
        }

        #[test]
        fn same_namespace_same_registry() {
            let factory = RegistryFactory::default();
            let a = factory.get(Some("fleet")).unwrap();
            let b = factory.get(Some("fleet")).unwrap();
            assert!(Arc::ptr_eq(&a, &b));
            assert_eq!(factory.namespaces(), ["fleet"]);
        }

        #[test]
        fn invalid_namespace_rejected() {
            let factory = RegistryFactory::default();
            assert!(factory.get(Some("two words")).is_err());
            assert!(RegistryFactory::new(" ").is_err());
        }

        #[test]
        fn exact_beats_regex() {
            let factory = RegistryFactory::default();
            let seen = Arc::new(Mutex::new(Vec::new()));
            factory.set_registry_for(
                RegistryPattern::regex("^tenant_").unwrap(),
                tagged_builder("regex", Arc::clone(&seen)),
            );
            factory.set_registry_for(
                RegistryPattern::exact("tenant_a"),
                tagged_builder("exact", Arc::clone(&seen)),
            );

            factory.get(Some("tenant_a")).unwrap();
            factory.get(Some("tenant_b")).unwrap();
            factory.get(Some("other")).unwrap();

            assert_eq!(*lock(&seen), ["exact:tenant_a", "regex:tenant_b"]);
        }

        #[test]
        fn pattern_matching() {
            assert!(RegistryPattern::exact("fleet").matches("fleet"));
            assert!(!RegistryPattern::exact("fleet").matches("fleet_a"));
            assert!(RegistryPattern::regex("^fleet").unwrap().matches("fleet_a"));
        }

        #[test]
        fn invalid_regex_pattern() {
            let err = RegistryPattern::regex("([").unwrap_err();
            assert!(matches!(err, RegistryError::InvalidPattern { .. }));
        }

        #[test]
        fn from_config_applies_default_schema() {
            let mut config = Config::default();
            config.project = Some(ProjectConfig {
                default_namespace: Some("fleet".to_string()),
                registries: vec![RegistryEntry {
                    pattern: "^tenant_".to_string(),
                    regex: true,
                    default_schema: Some("tenant".to_string()),
                }],
                ..Default::default()
            });
            let factory = RegistryFactory::from_config(&config).unwrap();
            assert_eq!(factory.default_namespace(), "fleet");

            let car = TypeDef::builder("Car").build().unwrap();
            factory
                .register(EntityRecord::new(&car).namespace("tenant_a"))
                .unwrap();
            let entity = factory
                .entity_ref(ClassTarget::Type(&car), Some("tenant_a"))
                .unwrap()
                .unwrap();
            assert_eq!(entity.schemas(), ["tenant"]);
        }
    }

    mod records {
        use super::*;

        #[test]
        fn register_refreshes_materialized_registries() {
            let factory = RegistryFactory::default();
            let car = TypeDef::builder("Car").build().unwrap();
            let class_ref = factory.class_ref(ClassTarget::Type(&car), None).unwrap();

            factory
                .register(PropertyRecord::new(&car, "brand").primitive(PrimitiveType::String))
                .unwrap();

            let prop = factory
                .with_registry(None, |reg| reg.get_property_ref(&class_ref, "brand"))
                .unwrap();
            assert!(prop.is_some());
        }

        #[test]
        fn namespace_record_routes_type_lookups() {
            let factory = RegistryFactory::default();
            let car = TypeDef::builder("Car").build().unwrap();
            factory.register(NamespaceRecord::new(&car, "fleet")).unwrap();
            factory.register(EntityRecord::new(&car)).unwrap();

            let class_ref = factory.class_ref(ClassTarget::Type(&car), None).unwrap();
            assert_eq!(class_ref.namespace(), "fleet");
            assert!(factory.entity_ref(ClassTarget::Type(&car), None).unwrap().is_some());
            assert!(factory
                .entity_ref(ClassTarget::Type(&car), Some("default"))
                .unwrap()
                .is_none());
        }

        #[test]
        fn names_go_to_default_namespace() {
            let factory = RegistryFactory::default();
            let class_ref = factory.class_ref(ClassTarget::Name("Car"), None).unwrap();
            assert_eq!(class_ref.namespace(), "default");
            assert!(class_ref.is_placeholder());
        }

        #[test]
        fn remove_records_cascades() {
            let factory = RegistryFactory::default();
            let car = TypeDef::builder("Car").build().unwrap();
            factory.register(EntityRecord::new(&car)).unwrap();
            factory.entity_ref(ClassTarget::Type(&car), None).unwrap();

            let removed = factory.remove_records(|r| r.targets(&car)).unwrap();
            assert_eq!(removed, 1);

            let remaining = factory
                .with_registry(None, |reg| Ok(reg.list_entity_refs()))
                .unwrap();
            assert!(remaining.is_empty());
        }

        #[test]
        fn reset_clears_every_namespace() {
            let factory = RegistryFactory::default();
            factory.class_ref(ClassTarget::Name("Car"), Some("a")).unwrap();
            factory.class_ref(ClassTarget::Name("Car"), Some("b")).unwrap();

            factory.reset(None).unwrap();

            for ns in ["a", "b"] {
                let classes = factory
                    .with_registry(Some(ns), |reg| Ok(reg.list_class_refs()))
                    .unwrap();
                assert!(classes.is_empty());
            }
        }
    }
}
