//! Integration tests for registries and the factory.
//!
//! These tests go through the public factory API only: records in, references out.

use std::sync::Arc;

use schemaref::codec::{JsonSchema7Serializer, MultipleSchemas, SerializeOptions};
use schemaref::core::metadata::schema::{EntityRecord, NamespaceRecord, PropertyRecord, SchemaRecord};
use schemaref::core::typedef::TypeDef;
use schemaref::core::types::PrimitiveType;
use schemaref::registry::{
    ClassTarget, DefaultNamespacedRegistry, NamespaceRegistry, RegistryContext, RegistryFactory,
    RegistryPattern,
};
use serde_json::json;

mod namespaces {
    use super::*;

    #[test]
    fn property_targets_cross_namespaces() {
        let factory = RegistryFactory::default();
        let engine = TypeDef::builder("Engine").build().unwrap();
        factory.register(NamespaceRecord::new(&engine, "parts")).unwrap();
        let engine_ref = factory.class_ref(ClassTarget::Type(&engine), None).unwrap();
        assert_eq!(engine_ref.namespace(), "parts");

        let car = TypeDef::builder("Car").build().unwrap();
        factory
            .register(PropertyRecord::new(&car, "engine").class_ref(&engine_ref))
            .unwrap();

        let car_ref = factory.class_ref(ClassTarget::Type(&car), None).unwrap();
        let engine_prop = factory
            .with_registry(None, |reg| reg.get_property_ref(&car_ref, "engine"))
            .unwrap()
            .unwrap();
        assert!(engine_prop.target_ref().unwrap().is_same(&engine_ref));
    }

    #[test]
    fn same_type_distinct_per_namespace() {
        let factory = RegistryFactory::default();
        let car = TypeDef::builder("Car").build().unwrap();

        let a = factory.class_ref(ClassTarget::Type(&car), Some("a")).unwrap();
        let b = factory.class_ref(ClassTarget::Type(&car), Some("b")).unwrap();
        let a_again = factory.class_ref(ClassTarget::Type(&car), Some("a")).unwrap();

        assert!(a.is_same(&a_again));
        assert!(!a.is_same(&b));
    }

    #[test]
    fn pattern_builder_sets_default_schema() {
        let factory = RegistryFactory::default();
        factory.set_registry_for(
            RegistryPattern::regex("^audit_").unwrap(),
            Arc::new(|ctx: RegistryContext| {
                Box::new(DefaultNamespacedRegistry::with_default_schema(ctx, "audit"))
                    as Box<dyn NamespaceRegistry>
            }),
        );

        let log = TypeDef::builder("LogLine").build().unwrap();
        factory
            .register(EntityRecord::new(&log).namespace("audit_2024"))
            .unwrap();
        let entity = factory
            .entity_ref(ClassTarget::Type(&log), Some("audit_2024"))
            .unwrap()
            .unwrap();
        assert_eq!(entity.schemas(), ["audit"]);

        factory.register(EntityRecord::new(&log)).unwrap();
        let plain = factory
            .entity_ref(ClassTarget::Type(&log), None)
            .unwrap()
            .unwrap();
        assert_eq!(plain.schemas(), ["default"]);
    }
}

mod records {
    use super::*;

    #[test]
    fn late_records_reach_existing_refs() {
        let factory = RegistryFactory::default();
        let car = TypeDef::builder("Car").build().unwrap();
        let car_ref = factory.class_ref(ClassTarget::Type(&car), None).unwrap();

        factory
            .register(PropertyRecord::new(&car, "brand").primitive(PrimitiveType::String))
            .unwrap();
        factory
            .register(PropertyRecord::new(&car, "brand").option("maxLength", 40))
            .unwrap();

        let props = factory
            .with_registry(None, |reg| reg.get_property_refs(&car_ref))
            .unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].get_option("maxLength"), Some(json!(40)));
        assert_eq!(props[0].primitive(), Some(PrimitiveType::String));
    }

    #[test]
    fn removing_type_records_drops_references() {
        let factory = RegistryFactory::default();
        let car = TypeDef::builder("Car").build().unwrap();
        factory.register(EntityRecord::new(&car)).unwrap();
        assert!(factory.entity_ref(ClassTarget::Type(&car), None).unwrap().is_some());

        let removed = factory.remove_records(|r| r.targets(&car)).unwrap();
        assert_eq!(removed, 1);

        let listed = factory
            .with_registry(None, |reg| Ok(reg.list_entity_refs()))
            .unwrap();
        assert!(listed.is_empty());
    }
}

mod schemas {
    use super::*;

    #[test]
    fn schema_serialization_references_foreign_classes() {
        let factory = RegistryFactory::default();
        let owner = TypeDef::builder("Owner").build().unwrap();
        factory.register(SchemaRecord::new(&owner, "people")).unwrap();
        factory.register(EntityRecord::new(&owner)).unwrap();

        let car = TypeDef::builder("Car").build().unwrap();
        factory.register(SchemaRecord::new(&car, "fleet")).unwrap();
        factory.register(EntityRecord::new(&car)).unwrap();
        factory
            .register(PropertyRecord::new(&car, "owner").references(&owner))
            .unwrap();

        // Materialize both entities so schema membership is known.
        factory.entity_ref(ClassTarget::Type(&owner), None).unwrap();
        factory.entity_ref(ClassTarget::Type(&car), None).unwrap();
        let fleet = factory
            .with_registry(None, |reg| Ok(reg.get_schema_ref("fleet")))
            .unwrap();

        let mut serializer = JsonSchema7Serializer::new(
            &factory,
            SerializeOptions {
                handle_multiple_schemas: MultipleSchemas::Reference,
                ..Default::default()
            },
        );
        let doc = serializer.serialize_schema(&fleet).unwrap();

        assert_eq!(
            doc["definitions"]["Car"]["properties"]["owner"],
            json!({"$ref": "people#/definitions/Owner"})
        );
        assert!(doc["definitions"].get("Owner").is_none());
    }
}
