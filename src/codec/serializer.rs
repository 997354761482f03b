//! codec::serializer
//!
//! References to a JSON Schema draft-07 document.
//!
//! # Design
//!
//! A serializer accumulates one document. Each class is described once,
//! keyed by name in `definitions`; a stub entry is written before the
//! class's parents and properties are described so cyclic graphs
//! terminate. Every serialized root adds a pointer to the document root:
//! the first becomes `$ref`, further distinct ones turn the root into a
//! flat `anyOf`.
//!
//! # Example
//!
//! ```
//! use schemaref::codec::{JsonSchema7Serializer, SerializeOptions, SerializeTarget};
//! use schemaref::core::typedef::TypeDef;
//! use schemaref::registry::RegistryFactory;
//! use serde_json::json;
//!
//! let factory = RegistryFactory::default();
//! let car = TypeDef::builder("Car").value_field("wheels", 4).build().unwrap();
//!
//! let mut serializer = JsonSchema7Serializer::new(&factory, SerializeOptions::default());
//! let doc = serializer.serialize(SerializeTarget::Type(&car)).unwrap();
//!
//! assert_eq!(doc["$ref"], "#/definitions/Car");
//! assert_eq!(
//!     doc["definitions"]["Car"]["properties"]["wheels"],
//!     json!({"type": "number", "default": 4})
//! );
//! ```

use serde_json::{json, Map, Value};

use super::options::{MultipleSchemas, SchemaNode, SerializeOptions};
use super::{CodecError, DEFINITIONS_PREFIX, DRAFT_07};
use crate::core::options::Options;
use crate::core::typedef::TypeHandle;
use crate::core::types::PrimitiveType;
use crate::refs::entity_ref::SCHEMA_OPTION;
use crate::refs::{ClassRef, EntityRef, PropertyRef, PropertyTarget, SchemaRef};
use crate::registry::{ClassTarget, RegistryFactory};

/// What to serialize.
#[derive(Debug, Clone, Copy)]
pub enum SerializeTarget<'a> {
    /// A declared type; serialized as its entity when it has one.
    Type(&'a TypeHandle),
    Class(&'a ClassRef),
    Entity(&'a EntityRef),
}

/// Draft-07 serializer.
pub struct JsonSchema7Serializer<'a> {
    factory: &'a RegistryFactory,
    options: SerializeOptions,
    definitions: Map<String, Value>,
    roots: Vec<Value>,
    current_schemas: Vec<String>,
}

impl<'a> JsonSchema7Serializer<'a> {
    pub fn new(factory: &'a RegistryFactory, options: SerializeOptions) -> Self {
        Self {
            factory,
            options,
            definitions: Map::new(),
            roots: Vec::new(),
            current_schemas: Vec::new(),
        }
    }

    /// Add `target` to the document and return the document so far.
    pub fn serialize(&mut self, target: SerializeTarget<'_>) -> Result<Value, CodecError> {
        let name = match target {
            SerializeTarget::Type(ty) => {
                let namespace = self.options.namespace.clone();
                match self.factory.entity_ref(ClassTarget::Type(ty), namespace.as_deref())? {
                    Some(entity) => self.describe_entity(&entity)?,
                    None => {
                        let class_ref =
                            self.factory.class_ref(ClassTarget::Type(ty), namespace.as_deref())?;
                        self.describe_class(&class_ref)?
                    }
                }
            }
            SerializeTarget::Class(class_ref) => self.describe_class(class_ref)?,
            SerializeTarget::Entity(entity) => self.describe_entity(entity)?,
        };
        self.apply_ref(&name);
        Ok(self.get_json_schema())
    }

    /// Add every entity of `schema` to the document.
    ///
    /// With [`MultipleSchemas::Reference`], classes that only belong to
    /// other schemas are referenced instead of described.
    pub fn serialize_schema(&mut self, schema: &SchemaRef) -> Result<Value, CodecError> {
        self.current_schemas = vec![schema.name().to_string()];
        let entities = self
            .factory
            .with_registry(Some(schema.namespace()), |reg| reg.get_entity_refs_for_schema(schema))?;
        for entity in &entities {
            let name = self.describe_entity(entity)?;
            self.apply_ref(&name);
        }
        self.current_schemas.clear();
        Ok(self.get_json_schema())
    }

    /// The document built so far.
    pub fn get_json_schema(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("$schema".to_string(), json!(DRAFT_07));
        match self.roots.as_slice() {
            [] => {}
            [single] => {
                if let Some(pointer) = single.get("$ref") {
                    doc.insert("$ref".to_string(), pointer.clone());
                }
            }
            many => {
                doc.insert("anyOf".to_string(), Value::Array(many.to_vec()));
            }
        }
        doc.insert(
            "definitions".to_string(),
            Value::Object(self.definitions.clone()),
        );
        Value::Object(doc)
    }

    /// Point the document root at a definition, growing a flat `anyOf`.
    fn apply_ref(&mut self, name: &str) {
        let pointer = json!({ "$ref": local_ref(name) });
        if !self.roots.contains(&pointer) {
            self.roots.push(pointer);
        }
    }

    fn describe_entity(&mut self, entity: &EntityRef) -> Result<String, CodecError> {
        let name = self.describe_class(entity.class_ref())?;
        let options = entity.options();
        if let Some(Value::Object(node)) = self.definitions.get_mut(&name) {
            passthrough(node, &options, &self.options);
        }
        Ok(name)
    }

    /// Describe a class unless a definition of that name exists.
    fn describe_class(&mut self, class_ref: &ClassRef) -> Result<String, CodecError> {
        let name = class_ref.name().to_string();
        if self.definitions.contains_key(&name) {
            return Ok(name);
        }
        self.definitions.insert(name.clone(), Value::Object(Map::new()));
        tracing::trace!(class = %class_ref, "describing class");

        let mut node = Map::new();
        node.insert("type".to_string(), json!("object"));
        node.insert("title".to_string(), json!(name));
        if self.options.append_target {
            if let Some(ty) = class_ref.type_handle() {
                node.insert("$target".to_string(), json!(ty.key().to_string()));
            }
        }
        if self.options.append_namespace {
            node.insert("$namespace".to_string(), json!(class_ref.namespace()));
        }

        let extends = class_ref.extends();
        if !extends.is_empty() {
            let mut all_of = Vec::with_capacity(extends.len());
            for parent in &extends {
                all_of.push(json!({ "$ref": self.describe_reference(parent)? }));
            }
            node.insert("allOf".to_string(), Value::Array(all_of));
        }

        let props = self
            .factory
            .with_registry(Some(class_ref.namespace()), |reg| reg.get_property_refs(class_ref))?;
        let mut properties = Map::new();
        let mut pattern_properties = Map::new();
        for prop in &props {
            if self.options.only_decorated && prop.is_inferred() {
                continue;
            }
            let Some(schema) = self.describe_property(prop)? else {
                continue;
            };
            let slot = if prop.is_pattern() {
                &mut pattern_properties
            } else {
                &mut properties
            };
            slot.insert(prop.name().to_string(), Value::Object(schema));
        }
        node.insert("properties".to_string(), Value::Object(properties));
        if !pattern_properties.is_empty() {
            node.insert(
                "patternProperties".to_string(),
                Value::Object(pattern_properties),
            );
        }

        passthrough(&mut node, &class_ref.options(), &self.options);
        if let Some(hook) = &self.options.post_process {
            hook(SchemaNode::Class(class_ref), &mut node);
        }

        self.definitions.insert(name.clone(), Value::Object(node));
        Ok(name)
    }

    /// `$ref` value for a property or parent target.
    fn describe_reference(&mut self, target: &ClassRef) -> Result<String, CodecError> {
        if let Some(schema) = self.external_schema(target)? {
            return Ok(format!(
                "{}{}{}",
                schema,
                DEFINITIONS_PREFIX,
                escape_pointer(target.name())
            ));
        }
        let name = self.describe_class(target)?;
        Ok(local_ref(&name))
    }

    /// The schema to point at when `target` belongs only to other schemas.
    fn external_schema(&self, target: &ClassRef) -> Result<Option<String>, CodecError> {
        if self.options.handle_multiple_schemas != MultipleSchemas::Reference
            || self.current_schemas.is_empty()
        {
            return Ok(None);
        }
        let entity = self
            .factory
            .with_registry(Some(target.namespace()), |reg| {
                Ok(reg
                    .list_entity_refs()
                    .into_iter()
                    .find(|e| e.class_ref().is_same(target)))
            })?;
        let Some(entity) = entity else {
            return Ok(None);
        };
        let schemas = entity.schemas();
        if schemas.iter().any(|s| self.current_schemas.contains(s)) {
            return Ok(None);
        }
        Ok(schemas.into_iter().next())
    }

    fn describe_property(
        &mut self,
        prop: &PropertyRef,
    ) -> Result<Option<Map<String, Value>>, CodecError> {
        let item = match prop.target() {
            PropertyTarget::Class(target) => {
                let mut node = Map::new();
                node.insert("$ref".to_string(), json!(self.describe_reference(&target)?));
                node
            }
            PropertyTarget::Primitive(p) => primitive_schema(p),
            PropertyTarget::Unknown if prop.is_collection() => type_only("object"),
            PropertyTarget::Unknown if self.options.ignore_unknown_type => return Ok(None),
            PropertyTarget::Unknown => type_only(&self.options.default_type_hint),
        };

        let mut node = if prop.is_collection() {
            let cardinality = prop.cardinality();
            let mut node = type_only("array");
            node.insert("items".to_string(), Value::Object(item));
            if let Some(min) = cardinality.min_items() {
                node.insert("minItems".to_string(), json!(min));
            }
            if let Some(max) = cardinality.max_items() {
                node.insert("maxItems".to_string(), json!(max));
            }
            node
        } else {
            item
        };

        passthrough(&mut node, &prop.options(), &self.options);
        if let Some(hook) = &self.options.post_process {
            hook(SchemaNode::Property(prop), &mut node);
        }
        Ok(Some(node))
    }
}

fn local_ref(name: &str) -> String {
    format!("{}{}", DEFINITIONS_PREFIX, escape_pointer(name))
}

/// Escape a definition key for use as a JSON pointer token.
fn escape_pointer(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

fn type_only(ty: &str) -> Map<String, Value> {
    let mut node = Map::new();
    node.insert("type".to_string(), json!(ty));
    node
}

fn primitive_schema(primitive: PrimitiveType) -> Map<String, Value> {
    let with_format = |format: &str| {
        let mut node = type_only("string");
        node.insert("format".to_string(), json!(format));
        node
    };
    match primitive {
        PrimitiveType::Date => with_format("date"),
        PrimitiveType::DateTime | PrimitiveType::Timestamp => with_format("date-time"),
        PrimitiveType::Time => with_format("time"),
        PrimitiveType::String | PrimitiveType::Text | PrimitiveType::Byte => type_only("string"),
        PrimitiveType::Integer => type_only("integer"),
        PrimitiveType::Number | PrimitiveType::Double => type_only("number"),
        PrimitiveType::Boolean => type_only("boolean"),
        PrimitiveType::Json | PrimitiveType::Object => type_only("object"),
        PrimitiveType::Array => type_only("array"),
    }
}

/// Copy option keys the node does not have yet, minus the skipped ones.
fn passthrough(node: &mut Map<String, Value>, options: &Options, settings: &SerializeOptions) {
    for (key, value) in options.iter() {
        if key == SCHEMA_OPTION || settings.skips(key) || node.contains_key(key) {
            continue;
        }
        node.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::schema::{EntityRecord, PropertyRecord, SchemaRecord};
    use crate::core::typedef::{FieldShape, TypeDef};
    use crate::core::types::Cardinality;
    use std::sync::Arc;

    fn serialize(factory: &RegistryFactory, ty: &TypeHandle) -> Value {
        JsonSchema7Serializer::new(factory, SerializeOptions::default())
            .serialize(SerializeTarget::Type(ty))
            .unwrap()
    }

    mod document {
        use super::*;

        #[test]
        fn anonymous_type() {
            let factory = RegistryFactory::default();
            let doc = serialize(&factory, &TypeDef::anonymous());
            assert_eq!(
                doc,
                json!({
                    "$ref": "#/definitions/anonymous",
                    "$schema": "http://json-schema.org/draft-07/schema#",
                    "definitions": {
                        "anonymous": {"type": "object", "title": "anonymous", "properties": {}}
                    }
                })
            );
        }

        #[test]
        fn second_root_promotes_to_any_of() {
            let factory = RegistryFactory::default();
            let car = TypeDef::builder("Car").build().unwrap();
            let bike = TypeDef::builder("Bike").build().unwrap();

            let mut serializer = JsonSchema7Serializer::new(&factory, SerializeOptions::default());
            let doc = serializer.serialize(SerializeTarget::Type(&car)).unwrap();
            assert_eq!(doc["$ref"], "#/definitions/Car");

            serializer.serialize(SerializeTarget::Type(&car)).unwrap();
            serializer.serialize(SerializeTarget::Type(&bike)).unwrap();
            let doc = serializer.serialize(SerializeTarget::Type(&car)).unwrap();

            assert!(doc.get("$ref").is_none());
            assert_eq!(
                doc["anyOf"],
                json!([{"$ref": "#/definitions/Car"}, {"$ref": "#/definitions/Bike"}])
            );
        }

        #[test]
        fn five_value_fields_in_order() {
            let factory = RegistryFactory::default();
            let ty = TypeDef::builder("Values")
                .value_field("boolValue", true)
                .field("dateValue", FieldShape::Date)
                .value_field("nullValue", Value::Null)
                .value_field("numberValue", 1)
                .value_field("strValue", "a")
                .build()
                .unwrap();

            let doc = serialize(&factory, &ty);
            let props = doc["definitions"]["Values"]["properties"].as_object().unwrap();

            let names: Vec<&str> = props.keys().map(String::as_str).collect();
            assert_eq!(
                names,
                ["boolValue", "dateValue", "nullValue", "numberValue", "strValue"]
            );
            assert_eq!(props["boolValue"], json!({"type": "boolean", "default": true}));
            assert_eq!(props["dateValue"], json!({"type": "string", "format": "date-time"}));
            assert_eq!(props["nullValue"], json!({"type": "string"}));
            assert_eq!(props["numberValue"], json!({"type": "number", "default": 1}));
            assert_eq!(props["strValue"], json!({"type": "string", "default": "a"}));
        }
    }

    mod references {
        use super::*;

        #[test]
        fn mutual_embedding_terminates() {
            let factory = RegistryFactory::default();
            let a = TypeDef::builder("A").build().unwrap();
            let b = TypeDef::builder("B").build().unwrap();
            factory.register(PropertyRecord::new(&a, "b").references(&b)).unwrap();
            factory.register(PropertyRecord::new(&b, "a").references(&a)).unwrap();

            let doc = serialize(&factory, &a);
            let defs = doc["definitions"].as_object().unwrap();

            assert_eq!(defs.len(), 2);
            assert_eq!(defs["A"]["properties"]["b"], json!({"$ref": "#/definitions/B"}));
            assert_eq!(defs["B"]["properties"]["a"], json!({"$ref": "#/definitions/A"}));
        }

        #[test]
        fn superclass_described_once() {
            let factory = RegistryFactory::default();
            let vehicle = TypeDef::builder("Vehicle").value_field("wheels", 4).build().unwrap();
            let car = TypeDef::builder("Car").extends(&vehicle).build().unwrap();

            let mut serializer = JsonSchema7Serializer::new(&factory, SerializeOptions::default());
            serializer.serialize(SerializeTarget::Type(&vehicle)).unwrap();
            let doc = serializer.serialize(SerializeTarget::Type(&car)).unwrap();
            let defs = doc["definitions"].as_object().unwrap();

            assert_eq!(defs.len(), 2);
            assert_eq!(defs["Car"]["allOf"], json!([{"$ref": "#/definitions/Vehicle"}]));
        }

        #[test]
        fn collections_carry_bounds() {
            let factory = RegistryFactory::default();
            let car = TypeDef::builder("Car").build().unwrap();
            let wheel = TypeDef::builder("Wheel").build().unwrap();
            factory
                .register(
                    PropertyRecord::new(&car, "wheels")
                        .references(&wheel)
                        .cardinality(Cardinality::range(1, Some(5))),
                )
                .unwrap();
            factory
                .register(PropertyRecord::new(&car, "tags").cardinality(Cardinality::unbounded()))
                .unwrap();

            let doc = serialize(&factory, &car);
            let props = &doc["definitions"]["Car"]["properties"];

            assert_eq!(
                props["wheels"],
                json!({
                    "type": "array",
                    "items": {"$ref": "#/definitions/Wheel"},
                    "minItems": 1,
                    "maxItems": 5
                })
            );
            assert_eq!(props["tags"], json!({"type": "array", "items": {"type": "object"}}));
        }

        #[test]
        fn reference_mode_points_at_other_schema() {
            let factory = RegistryFactory::default();
            let car = TypeDef::builder("Car").build().unwrap();
            let wheel = TypeDef::builder("Wheel").build().unwrap();
            factory.register(SchemaRecord::new(&car, "fleet")).unwrap();
            factory.register(SchemaRecord::new(&wheel, "parts")).unwrap();
            factory.register(EntityRecord::new(&wheel)).unwrap();
            factory.register(PropertyRecord::new(&car, "wheel").references(&wheel)).unwrap();
            factory.entity_ref(ClassTarget::Type(&wheel), None).unwrap();

            let schema = factory
                .with_registry(None, |reg| Ok(reg.get_schema_ref("fleet")))
                .unwrap();
            let options = SerializeOptions {
                handle_multiple_schemas: MultipleSchemas::Reference,
                ..Default::default()
            };
            let doc = JsonSchema7Serializer::new(&factory, options)
                .serialize_schema(&schema)
                .unwrap();

            assert_eq!(
                doc["definitions"]["Car"]["properties"]["wheel"],
                json!({"$ref": "parts#/definitions/Wheel"})
            );
            assert!(doc["definitions"].get("Wheel").is_none());
        }
    }

    mod options {
        use super::*;

        #[test]
        fn passthrough_skips_structural_keys() {
            let factory = RegistryFactory::default();
            let car = TypeDef::builder("Car").build().unwrap();
            factory
                .register(
                    PropertyRecord::new(&car, "brand")
                        .primitive(PrimitiveType::String)
                        .option("minLength", 2)
                        .option("type", "number")
                        .option("namespace", "elsewhere"),
                )
                .unwrap();
            factory
                .register(EntityRecord::new(&car).option("description", "A car"))
                .unwrap();

            let doc = serialize(&factory, &car);
            let def = &doc["definitions"]["Car"];

            assert_eq!(def["properties"]["brand"], json!({"type": "string", "minLength": 2}));
            assert_eq!(def["description"], "A car");
            assert!(def.get("schema").is_none());
            assert!(def.get("name").is_none());
        }

        #[test]
        fn only_decorated_and_unknown_types() {
            let factory = RegistryFactory::default();
            let car = TypeDef::builder("Car")
                .value_field("wheels", 4)
                .field("mystery", FieldShape::Unknown)
                .build()
                .unwrap();
            factory
                .register(PropertyRecord::new(&car, "brand").primitive(PrimitiveType::String))
                .unwrap();

            let options = SerializeOptions {
                only_decorated: true,
                ..Default::default()
            };
            let doc = JsonSchema7Serializer::new(&factory, options)
                .serialize(SerializeTarget::Type(&car))
                .unwrap();
            let props = doc["definitions"]["Car"]["properties"].as_object().unwrap();
            assert_eq!(props.keys().collect::<Vec<_>>(), ["brand"]);

            let options = SerializeOptions {
                ignore_unknown_type: true,
                ..Default::default()
            };
            let doc = JsonSchema7Serializer::new(&factory, options)
                .serialize(SerializeTarget::Type(&car))
                .unwrap();
            assert!(doc["definitions"]["Car"]["properties"].get("mystery").is_none());
        }

        #[test]
        fn pattern_properties_and_tags() {
            let factory = RegistryFactory::default();
            let car = TypeDef::builder("Car").build().unwrap();
            factory
                .register(
                    PropertyRecord::new(&car, "^x-")
                        .primitive(PrimitiveType::String)
                        .pattern(),
                )
                .unwrap();

            let options = SerializeOptions {
                append_namespace: true,
                append_target: true,
                ..Default::default()
            };
            let doc = JsonSchema7Serializer::new(&factory, options)
                .serialize(SerializeTarget::Type(&car))
                .unwrap();
            let def = &doc["definitions"]["Car"];

            assert_eq!(def["patternProperties"]["^x-"], json!({"type": "string"}));
            assert_eq!(def["properties"], json!({}));
            assert_eq!(def["$namespace"], "default");
            assert_eq!(def["$target"], json!(car.key().to_string()));
        }

        #[test]
        fn post_process_sees_every_node() {
            let factory = RegistryFactory::default();
            let car = TypeDef::builder("Car").value_field("wheels", 4).build().unwrap();

            let options = SerializeOptions {
                post_process: Some(Arc::new(|node, map| {
                    let tag = match node {
                        SchemaNode::Class(c) => format!("class:{}", c.name()),
                        SchemaNode::Property(p) => format!("property:{}", p.name()),
                    };
                    map.insert("x-tag".to_string(), json!(tag));
                })),
                ..Default::default()
            };
            let doc = JsonSchema7Serializer::new(&factory, options)
                .serialize(SerializeTarget::Type(&car))
                .unwrap();
            let def = &doc["definitions"]["Car"];

            assert_eq!(def["x-tag"], "class:Car");
            assert_eq!(def["properties"]["wheels"]["x-tag"], "property:wheels");
        }
    }
}
