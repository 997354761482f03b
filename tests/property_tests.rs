//! Property-based tests for reference identity and codec invariants.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use proptest::prelude::*;
use serde_json::json;

use schemaref::codec::{JsonSchema7Serializer, SerializeOptions, SerializeTarget};
use schemaref::core::metadata::schema::PropertyRecord;
use schemaref::core::options::Options;
use schemaref::core::typedef::TypeDef;
use schemaref::core::types::{Cardinality, PrimitiveType, TypeName};
use schemaref::registry::{ClassTarget, RegistryFactory};

/// Strategy for generating valid type names.
fn type_name() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z0-9_]{0,15}"
}

/// Strategy for generating namespaces.
fn namespace() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.-]{0,10}"
}

proptest! {
    /// Any identifier is accepted as a type name and kept verbatim.
    #[test]
    fn type_name_accepts_identifiers(name in type_name()) {
        let parsed = TypeName::new(&name).unwrap();
        prop_assert_eq!(parsed.as_str(), name.as_str());
    }

    /// Names with whitespace never validate.
    #[test]
    fn type_name_rejects_whitespace(left in type_name(), right in type_name()) {
        let name = format!("{} {}", left, right);
        prop_assert!(TypeName::new(name).is_err());
    }

    /// Looking a name up twice in one namespace yields one reference.
    #[test]
    fn lookup_by_name_is_idempotent(name in type_name(), ns in namespace()) {
        let factory = RegistryFactory::default();
        let first = factory.class_ref(ClassTarget::Name(&name), Some(&ns)).unwrap();
        let second = factory.class_ref(ClassTarget::Name(&name), Some(&ns)).unwrap();
        prop_assert!(first.is_same(&second));
        prop_assert!(first.is_placeholder());
    }

    /// A type gets one reference per namespace, distinct across namespaces.
    #[test]
    fn identity_is_per_namespace(name in type_name(), a in namespace(), b in namespace()) {
        prop_assume!(a != b);
        let factory = RegistryFactory::default();
        let ty = TypeDef::builder(name).build().unwrap();

        let in_a = factory.class_ref(ClassTarget::Type(&ty), Some(&a)).unwrap();
        let in_b = factory.class_ref(ClassTarget::Type(&ty), Some(&b)).unwrap();
        let in_a_again = factory.class_ref(ClassTarget::Type(&ty), Some(&a)).unwrap();

        prop_assert!(in_a.is_same(&in_a_again));
        prop_assert!(!in_a.is_same(&in_b));
    }

    /// Collections always serialize as arrays carrying their bounds.
    #[test]
    fn collections_serialize_as_arrays(min in 0u32..5, extra in proptest::option::of(0u32..5)) {
        let max = extra.map(|e| min + e);
        let cardinality = Cardinality::range(min, max);

        let factory = RegistryFactory::default();
        let ty = TypeDef::builder("Car").build().unwrap();
        factory
            .register(
                PropertyRecord::new(&ty, "tags")
                    .primitive(PrimitiveType::String)
                    .cardinality(cardinality),
            )
            .unwrap();

        let mut serializer = JsonSchema7Serializer::new(&factory, SerializeOptions::default());
        let doc = serializer.serialize(SerializeTarget::Type(&ty)).unwrap();
        let node = &doc["definitions"]["Car"]["properties"]["tags"];

        prop_assert_eq!(&node["type"], &json!("array"));
        prop_assert_eq!(&node["items"], &json!({"type": "string"}));
        prop_assert_eq!(node.get("minItems").cloned(), (min > 0).then(|| json!(min)));
        prop_assert_eq!(node.get("maxItems").cloned(), max.map(|m| json!(m)));
    }

    /// Deep merging the same options twice changes nothing.
    #[test]
    fn deep_merge_is_idempotent(keys in proptest::collection::vec("[a-z]{1,6}", 0..6)) {
        let mut incoming = Options::new();
        for (i, key) in keys.iter().enumerate() {
            incoming.insert(key.clone(), json!({"n": i, "nested": {"k": key}}));
        }

        let mut once = Options::new().with("base", true);
        once.deep_merge(&incoming);
        let mut twice = once.clone();
        twice.deep_merge(&incoming);
        prop_assert_eq!(once, twice);
    }
}
