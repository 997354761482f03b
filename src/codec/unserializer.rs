//! codec::unserializer
//!
//! JSON Schema draft-07 documents to references.
//!
//! # Design
//!
//! Unserializing runs in two phases:
//!
//! 1. **Prefetch**: every remote `$ref` reachable from the document is
//!    fetched, one at a time, into a per-call cache. Fetched documents are
//!    scanned for further remote refs.
//! 2. **Parse**: the document is walked synchronously. Type objects become
//!    class references (or entities), their properties are registered as
//!    property records, and refs are followed within the cached documents.
//!
//! Parsed refs are remembered per call, so a ref cycle yields the class
//! reference created on first visit instead of recursing.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use schemaref::codec::{JsonSchema7Unserializer, MockFetcher, UnserializeOptions};
//! use schemaref::registry::RegistryFactory;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let factory = RegistryFactory::default();
//! let mut unserializer = JsonSchema7Unserializer::new(
//!     &factory,
//!     Arc::new(MockFetcher::new()),
//!     UnserializeOptions::default(),
//! );
//!
//! let doc = json!({
//!     "title": "car",
//!     "type": "object",
//!     "properties": {"brand": {"type": "string"}}
//! });
//! let result = unserializer.unserialize(&doc).await.unwrap();
//!
//! let entity = result.first().unwrap();
//! assert_eq!(entity.class_ref().name(), "Car");
//! assert!(entity.as_entity().is_some());
//! # });
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use convert_case::{Case, Casing};
use serde_json::Value;

use super::fetch::{split_ref, RefAddress, RefFetcher};
use super::options::{CollectorTarget, ReturnKind, UnserializeOptions};
use super::CodecError;
use crate::core::metadata::schema::{EntityRecord, PropertyDecl, PropertyRecord};
use crate::core::options::Options;
use crate::core::typedef::TypeDef;
use crate::core::types::{Cardinality, PrimitiveType, TypeName, ANONYMOUS_NAME};
use crate::refs::{ClassRef, EntityRef, TypeHint};
use crate::registry::{ClassTarget, RegistryFactory};

/// Keys of a node that describe its shape rather than options.
const STRUCTURAL_KEYS: &[&str] = &[
    "type",
    "$ref",
    "items",
    "properties",
    "patternProperties",
    "format",
    "minItems",
    "maxItems",
    "title",
    "$id",
    "id",
    "$namespace",
    "namespace",
    "allOf",
    "anyOf",
    "definitions",
    "$schema",
    "$target",
];

/// One parsed root.
#[derive(Debug, Clone)]
pub enum UnserializedRef {
    Class(ClassRef),
    Entity(EntityRef),
}

impl UnserializedRef {
    pub fn class_ref(&self) -> &ClassRef {
        match self {
            UnserializedRef::Class(c) => c,
            UnserializedRef::Entity(e) => e.class_ref(),
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            UnserializedRef::Entity(e) => Some(e),
            UnserializedRef::Class(_) => None,
        }
    }
}

/// Result of [`JsonSchema7Unserializer::unserialize`].
#[derive(Debug, Clone)]
pub enum Unserialized {
    One(UnserializedRef),
    /// The document root was an `anyOf`.
    Many(Vec<UnserializedRef>),
}

impl Unserialized {
    pub fn first(&self) -> Option<&UnserializedRef> {
        match self {
            Unserialized::One(r) => Some(r),
            Unserialized::Many(refs) => refs.first(),
        }
    }

    pub fn into_vec(self) -> Vec<UnserializedRef> {
        match self {
            Unserialized::One(r) => vec![r],
            Unserialized::Many(refs) => refs,
        }
    }
}

/// Draft-07 unserializer.
pub struct JsonSchema7Unserializer<'a> {
    factory: &'a RegistryFactory,
    fetcher: Arc<dyn RefFetcher>,
    options: UnserializeOptions,
    /// Fetched documents by address key, kept for one call.
    cache: HashMap<String, Value>,
}

impl<'a> JsonSchema7Unserializer<'a> {
    pub fn new(
        factory: &'a RegistryFactory,
        fetcher: Arc<dyn RefFetcher>,
        options: UnserializeOptions,
    ) -> Self {
        Self {
            factory,
            fetcher,
            options,
            cache: HashMap::new(),
        }
    }

    pub fn options(&self) -> &UnserializeOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut UnserializeOptions {
        &mut self.options
    }

    /// Turn `document` into references.
    ///
    /// # Errors
    ///
    /// - [`CodecError::UnresolvableRef`] for a `$ref` that leads nowhere
    /// - [`CodecError::NotSupported`] for tuple `items`, `null` types and
    ///   boolean schemas
    /// - [`CodecError::Fetch`] if a remote document cannot be loaded
    pub async fn unserialize(&mut self, document: &Value) -> Result<Unserialized, CodecError> {
        self.cache.clear();
        let cwd = self.cwd();
        self.prefetch(document, &cwd).await?;

        let mut parser = Parser {
            factory: self.factory,
            options: &self.options,
            cache: &self.cache,
            cwd,
            seen: HashMap::new(),
        };
        let ctx = DocContext {
            root: document,
            base: self.options.base_address.clone(),
        };
        let parsed = parser.parse_root(&ctx)?;
        self.apply_return(parsed)
    }

    fn cwd(&self) -> PathBuf {
        self.options
            .cwd
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default())
    }

    /// Fetch every remote document reachable from `document`.
    async fn prefetch(&mut self, document: &Value, cwd: &std::path::Path) -> Result<(), CodecError> {
        let mut pending = vec![(document.clone(), self.options.base_address.clone())];
        while let Some((doc, base)) = pending.pop() {
            let mut refs = Vec::new();
            collect_refs(&doc, &mut refs);
            for reference in refs {
                let (address, _) = split_ref(&reference);
                if address.is_empty() {
                    continue;
                }
                let address = RefAddress::resolve(address, base.as_ref(), cwd)?;
                let key = address.key();
                if self.cache.contains_key(&key) {
                    continue;
                }
                let fetched = self.fetcher.fetch(&address).await?;
                self.cache.insert(key, fetched.clone());
                pending.push((fetched, Some(address)));
            }
        }
        Ok(())
    }

    fn apply_return(&self, parsed: Unserialized) -> Result<Unserialized, CodecError> {
        let convert = |r: UnserializedRef| -> Result<UnserializedRef, CodecError> {
            Ok(match (self.options.return_kind, r) {
                (ReturnKind::EntityRefs, UnserializedRef::Class(c)) => {
                    let entity = self.factory.with_registry(Some(c.namespace()), |reg| {
                        Ok(reg.declare_entity_ref(&c, &Options::new()))
                    })?;
                    UnserializedRef::Entity(entity)
                }
                (ReturnKind::ClassRefs, UnserializedRef::Entity(e)) => {
                    UnserializedRef::Class(e.class_ref().clone())
                }
                (_, r) => r,
            })
        };
        match parsed {
            Unserialized::One(r) => Ok(Unserialized::One(convert(r)?)),
            Unserialized::Many(refs) => Ok(Unserialized::Many(
                refs.into_iter().map(convert).collect::<Result<_, _>>()?,
            )),
        }
    }
}

/// Every `$ref` string in a document, in document order.
fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("$ref", Value::String(r)) => out.push(r.clone()),
                    _ => collect_refs(child, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_refs(v, out)),
        _ => {}
    }
}

/// The document a node belongs to.
#[derive(Debug, Clone)]
struct DocContext<'d> {
    root: &'d Value,
    base: Option<RefAddress>,
}

impl DocContext<'_> {
    fn key(&self) -> String {
        self.base.as_ref().map(RefAddress::key).unwrap_or_default()
    }
}

/// What is known about a node from where it was reached.
#[derive(Debug, Clone, Default)]
struct NodeInfo {
    is_root: bool,
    namespace: Option<String>,
    /// Trailing segment of the ref that led here.
    ref_name: Option<String>,
    /// Property the node was found under.
    property_name: Option<String>,
    owner_name: Option<String>,
    /// Cycle-guard key when reached through a ref.
    seen_key: Option<String>,
}

struct Parser<'a> {
    factory: &'a RegistryFactory,
    options: &'a UnserializeOptions,
    cache: &'a HashMap<String, Value>,
    cwd: PathBuf,
    seen: HashMap<String, UnserializedRef>,
}

impl<'a> Parser<'a> {
    fn parse_root(&mut self, ctx: &DocContext<'a>) -> Result<Unserialized, CodecError> {
        let info = NodeInfo {
            is_root: true,
            namespace: self.options.namespace.clone(),
            seen_key: Some(format!("{}#", ctx.key())),
            ..Default::default()
        };

        if let Some(Value::Array(branches)) = ctx.root.get("anyOf") {
            if !is_type_object(ctx.root) {
                let mut refs = Vec::with_capacity(branches.len());
                for branch in branches {
                    let info = NodeInfo {
                        seen_key: None,
                        ..info.clone()
                    };
                    refs.push(self.parse_node(ctx, branch, info)?);
                }
                return Ok(Unserialized::Many(refs));
            }
        }
        Ok(Unserialized::One(self.parse_node(ctx, ctx.root, info)?))
    }

    /// Parse a node that must describe a class.
    fn parse_node(
        &mut self,
        ctx: &DocContext<'a>,
        node: &'a Value,
        mut info: NodeInfo,
    ) -> Result<UnserializedRef, CodecError> {
        if node.is_boolean() {
            return Err(CodecError::NotSupported(
                "boolean schema definitions".to_string(),
            ));
        }
        if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
            let target = self.follow_ref(ctx, reference)?;
            if let Some(done) = self.seen.get(&target.key) {
                return Ok(done.clone());
            }
            if info.ref_name.is_none() {
                info.ref_name = target.segment;
            }
            info.seen_key = Some(target.key);
            return self.parse_node(&target.ctx, target.node, info);
        }
        if let Some(key) = &info.seen_key {
            if let Some(done) = self.seen.get(key) {
                return Ok(done.clone());
            }
        }
        if node.get("type").and_then(Value::as_str) == Some("null") {
            return Err(CodecError::NotSupported("'null' type".to_string()));
        }
        self.parse_type_object(ctx, node, info)
    }

    fn parse_type_object(
        &mut self,
        ctx: &DocContext<'a>,
        node: &'a Value,
        info: NodeInfo,
    ) -> Result<UnserializedRef, CodecError> {
        let namespace = match node_namespace(node) {
            Some(ns) if !self.options.skip_namespace => Some(ns.to_string()),
            _ => info.namespace.clone(),
        };
        let ns = self.factory.resolve_namespace(namespace.as_deref()).to_string();

        let name = self.class_name(node, &info);
        let class_ref = self.class_for(name.as_deref(), &ns)?;
        tracing::debug!(class = %class_ref, "parsed type object");
        if let Some(key) = &info.seen_key {
            self.seen
                .insert(key.clone(), UnserializedRef::Class(class_ref.clone()));
        }

        let id = node
            .get("$id")
            .or_else(|| node.get("id"))
            .and_then(Value::as_str);
        let is_entity = (info.is_root && self.options.root_as_entity) || id.is_some();

        // Leftover keys belong to the entity when there is one.
        let mut class_options = if is_entity {
            Options::new()
        } else {
            extra_options(node)
        };
        for collector in self.options.collectors_for(CollectorTarget::Class) {
            collector.apply(node, &mut class_options);
        }
        if !class_options.is_empty() {
            class_ref.merge_options(&class_options);
        }

        for key in ["allOf", "anyOf"] {
            let Some(Value::Array(branches)) = node.get(key) else {
                continue;
            };
            for branch in branches {
                let parent = self.parse_node(
                    ctx,
                    branch,
                    NodeInfo {
                        namespace: namespace.clone(),
                        ..Default::default()
                    },
                )?;
                class_ref.add_extend(parent.class_ref());
            }
        }

        for (key, pattern) in [("properties", false), ("patternProperties", true)] {
            let Some(Value::Object(props)) = node.get(key) else {
                continue;
            };
            for (prop_name, prop_node) in props {
                self.parse_property(ctx, &class_ref, &ns, namespace.as_deref(), prop_name, prop_node, pattern)?;
            }
        }

        if !is_entity {
            return Ok(UnserializedRef::Class(class_ref));
        }

        let mut entity_options = extra_options(node);
        if let Some(id) = id {
            entity_options.insert("$id", id);
        }
        for collector in self.options.collectors_for(CollectorTarget::Entity) {
            collector.apply(node, &mut entity_options);
        }
        let entity = self.entity_for(&class_ref, &ns, entity_options)?;
        let parsed = UnserializedRef::Entity(entity);
        if let Some(key) = info.seen_key {
            self.seen.insert(key, parsed.clone());
        }
        Ok(parsed)
    }

    /// Name for a type object, `None` for anonymous.
    fn class_name(&self, node: &Value, info: &NodeInfo) -> Option<String> {
        if info.is_root {
            if let Some(name) = &self.options.class_name {
                return Some(name.clone());
            }
        }
        let title = node
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty());
        if let Some(title) = title {
            if title == ANONYMOUS_NAME {
                return None;
            }
            let cased = title.to_case(Case::UpperCamel);
            return Some(if cased.is_empty() { title.to_string() } else { cased });
        }
        if let Some(name) = &info.ref_name {
            return Some(name.clone());
        }
        let property = info.property_name.as_ref().filter(|p| !p.is_empty())?;
        let name = match property.to_case(Case::UpperCamel) {
            cased if cased.is_empty() => property.clone(),
            cased => cased,
        };
        match (&info.owner_name, self.options.prepend_class) {
            (Some(owner), true) => Some(format!("{}{}", owner, name)),
            _ => Some(name),
        }
    }

    /// Class reference for a parsed type object.
    ///
    /// Reuses a bound class of the same name unless creation is forced.
    fn class_for(&self, name: Option<&str>, ns: &str) -> Result<ClassRef, CodecError> {
        let Some(name) = name else {
            let ty = TypeDef::anonymous();
            return Ok(self
                .factory
                .with_registry(Some(ns), |reg| reg.create_class_ref(ClassTarget::Type(&ty)))?);
        };

        let name = TypeName::free(name)?;
        let force = self.options.force_class_ref_creation;
        let class_ref = self.factory.with_registry(Some(ns), |reg| {
            if !force {
                let existing = reg
                    .find_class_refs_by_name(name.as_str())
                    .into_iter()
                    .find(|c| !c.is_placeholder());
                if let Some(existing) = existing {
                    return Ok(existing);
                }
            }
            let ty = TypeDef::builder(name.as_str()).free_name().build()?;
            if force {
                reg.create_class_ref(ClassTarget::Type(&ty))
            } else {
                reg.get_class_ref(ClassTarget::Type(&ty))
            }
        })?;
        Ok(class_ref)
    }

    fn entity_for(
        &self,
        class_ref: &ClassRef,
        ns: &str,
        options: Options,
    ) -> Result<EntityRef, CodecError> {
        if self.options.force_entity_ref_creation {
            return Ok(self
                .factory
                .with_registry(Some(ns), |reg| Ok(reg.create_entity_ref(class_ref, &options)))?);
        }

        let ty = class_ref.get_class(true)?;
        self.factory
            .register(EntityRecord::new(&ty).namespace(ns).options(options.clone()))?;
        let entity = self.factory.with_registry(Some(ns), |reg| {
            match reg.get_entity_ref_for(ClassTarget::Type(&ty))? {
                Some(entity) => Ok(entity),
                None => Ok(reg.declare_entity_ref(class_ref, &options)),
            }
        })?;
        Ok(entity)
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_property(
        &mut self,
        ctx: &DocContext<'a>,
        owner: &ClassRef,
        ns: &str,
        namespace: Option<&str>,
        name: &str,
        node: &'a Value,
        pattern: bool,
    ) -> Result<(), CodecError> {
        let item_info = NodeInfo {
            namespace: namespace.map(str::to_string),
            property_name: Some(name.to_string()),
            owner_name: Some(owner.name().to_string()),
            ..Default::default()
        };

        let (hint, cardinality) = if node.get("type").and_then(Value::as_str) == Some("array") {
            let hint = match node.get("items") {
                Some(Value::Array(_)) => {
                    return Err(CodecError::NotSupported(format!(
                        "tuple-style items on property '{}'",
                        name
                    )))
                }
                Some(items) => self.type_hint(ctx, items, item_info)?,
                None => TypeHint::Unknown,
            };
            (hint, array_cardinality(node))
        } else {
            (self.type_hint(ctx, node, item_info)?, Cardinality::one())
        };

        let mut options = extra_options(node);
        for collector in self.options.collectors_for(CollectorTarget::Property) {
            collector.apply(node, &mut options);
        }

        if self.options.force_property_ref_creation {
            let decl = PropertyDecl {
                name: name.to_string(),
                hint,
                cardinality,
                pattern,
                appended: false,
            };
            self.factory
                .with_registry(Some(ns), |reg| reg.create_property_ref(owner, decl, options))?;
            return Ok(());
        }

        let ty = owner.get_class(true)?;
        let mut record = PropertyRecord::new(&ty, name)
            .namespace(ns)
            .hint(hint)
            .cardinality(cardinality)
            .options(options);
        if pattern {
            record = record.pattern();
        }
        self.factory.register(record)?;
        Ok(())
    }

    /// Type of a property value or array item.
    fn type_hint(
        &mut self,
        ctx: &DocContext<'a>,
        node: &'a Value,
        info: NodeInfo,
    ) -> Result<TypeHint, CodecError> {
        if node.is_boolean() {
            return Err(CodecError::NotSupported(
                "boolean schema definitions".to_string(),
            ));
        }
        if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
            let target = self.follow_ref(ctx, reference)?;
            if !is_type_object(target.node) {
                return self.type_hint(&target.ctx, target.node, info);
            }
            let parsed = self.parse_node(ctx, node, info)?;
            return Ok(TypeHint::Class(parsed.class_ref().clone()));
        }

        let primitive = match node.get("type") {
            None if is_type_object(node) => None,
            None => return Ok(TypeHint::Unknown),
            Some(Value::String(ty)) => match ty.as_str() {
                "string" => Some(match node.get("format").and_then(Value::as_str) {
                    Some("date-time") => PrimitiveType::DateTime,
                    Some("date") => PrimitiveType::Date,
                    Some("time") => PrimitiveType::Time,
                    _ => PrimitiveType::String,
                }),
                "boolean" => Some(PrimitiveType::Boolean),
                "integer" | "number" => Some(PrimitiveType::Number),
                "array" => Some(PrimitiveType::Array),
                "object" if is_type_object(node) => None,
                "object" => Some(PrimitiveType::Object),
                "null" => return Err(CodecError::NotSupported("'null' type".to_string())),
                _ => return Ok(TypeHint::Unknown),
            },
            Some(other) => {
                return Err(CodecError::NotSupported(format!(
                    "type declaration {}",
                    other
                )))
            }
        };

        match primitive {
            Some(p) => Ok(TypeHint::Primitive(p)),
            None => {
                let parsed = self.parse_node(ctx, node, info)?;
                Ok(TypeHint::Class(parsed.class_ref().clone()))
            }
        }
    }

    fn follow_ref(
        &self,
        ctx: &DocContext<'a>,
        reference: &str,
    ) -> Result<RefTarget<'a>, CodecError> {
        let unresolvable = || CodecError::UnresolvableRef(reference.to_string());
        let (address, fragment) = split_ref(reference);

        let doc = if address.is_empty() {
            ctx.clone()
        } else {
            let address = RefAddress::resolve(address, ctx.base.as_ref(), &self.cwd)?;
            let root = self.cache.get(&address.key()).ok_or_else(unresolvable)?;
            DocContext {
                root,
                base: Some(address),
            }
        };

        let (node, segment) = if fragment.is_empty() {
            (doc.root, None)
        } else if fragment.starts_with('/') {
            let node = doc.root.pointer(fragment).ok_or_else(unresolvable)?;
            let segment = fragment
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(|s| s.replace("~1", "/").replace("~0", "~"));
            (node, segment)
        } else {
            (find_by_id(doc.root, fragment).ok_or_else(unresolvable)?, None)
        };

        Ok(RefTarget {
            key: format!("{}#{}", doc.key(), fragment),
            ctx: doc,
            node,
            segment,
        })
    }
}

struct RefTarget<'a> {
    key: String,
    ctx: DocContext<'a>,
    node: &'a Value,
    segment: Option<String>,
}

/// The document itself or one of its definitions, by `$id`.
fn find_by_id<'v>(root: &'v Value, fragment: &str) -> Option<&'v Value> {
    let matches = |node: &Value| {
        node.get("$id")
            .or_else(|| node.get("id"))
            .and_then(Value::as_str)
            .is_some_and(|id| id == fragment || id.strip_prefix('#') == Some(fragment))
    };
    if matches(root) {
        return Some(root);
    }
    root.get("definitions")?
        .as_object()?
        .values()
        .find(|def| matches(def))
}

/// Keys of a node that are not part of its shape.
fn extra_options(node: &Value) -> Options {
    let mut options = Options::new();
    if let Value::Object(map) = node {
        for (key, value) in map {
            if !STRUCTURAL_KEYS.contains(&key.as_str()) {
                options.insert(key.clone(), value.clone());
            }
        }
    }
    options
}

fn node_namespace(node: &Value) -> Option<&str> {
    node.get("$namespace")
        .or_else(|| node.get("namespace"))
        .and_then(Value::as_str)
}

/// Whether a node describes a class rather than a primitive.
fn is_type_object(node: &Value) -> bool {
    let Value::Object(map) = node else {
        return false;
    };
    match map.get("type").and_then(Value::as_str) {
        Some("object") => ["properties", "patternProperties", "title", "allOf", "anyOf", "$id", "id"]
            .iter()
            .any(|k| map.contains_key(*k)),
        Some(_) => false,
        None => ["properties", "patternProperties", "allOf"]
            .iter()
            .any(|k| map.contains_key(*k)),
    }
}

fn array_cardinality(node: &Value) -> Cardinality {
    let bound = |key: &str| {
        node.get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    };
    match (bound("minItems"), bound("maxItems")) {
        (None, None) => Cardinality::unbounded(),
        (min, max) => Cardinality::range(min.unwrap_or(0), max),
    }
}
