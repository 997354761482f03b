//! cli::commands::parse
//!
//! Unserialize a schema document and print the reference graph.
//!
//! # Example
//!
//! ```bash
//! schemaref parse car.schema.json
//! entity Car (default)
//!   brand: string
//!   wheels: Wheel[0..4]
//! class Wheel (default)
//!   size: number
//! ```

use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;

use super::load_document;
use crate::cli::Context;
use crate::codec::UnserializeOptions;
use crate::core::types::Cardinality;
use crate::refs::{ClassRef, PropertyRef};
use crate::registry::RegistryFactory;

/// Run the parse command.
pub fn parse(ctx: &Context, file: &Path, namespace: Option<&str>, as_class: bool) -> Result<()> {
    let factory = RegistryFactory::from_config(&ctx.config)?;
    let options = UnserializeOptions {
        namespace: namespace.map(str::to_string),
        root_as_entity: ctx.config.root_as_entity() && !as_class,
        ..UnserializeOptions::from_config(&ctx.config)
    };

    let rt = tokio::runtime::Runtime::new()?;
    let parsed = rt.block_on(load_document(ctx, &factory, file, options))?;

    let mut printed = HashSet::new();
    let mut pending: Vec<ClassRef> = parsed
        .into_vec()
        .iter()
        .map(|r| r.class_ref().clone())
        .collect();
    pending.reverse();

    while let Some(class_ref) = pending.pop() {
        if !printed.insert(class_ref.id()) {
            continue;
        }
        let (properties, is_entity) = factory.with_registry(Some(class_ref.namespace()), |reg| {
            let is_entity = reg
                .list_entity_refs()
                .iter()
                .any(|e| e.class_ref().is_same(&class_ref));
            Ok((reg.get_property_refs(&class_ref)?, is_entity))
        })?;

        println!(
            "{} {} ({})",
            if is_entity { "entity" } else { "class" },
            class_ref.name(),
            class_ref.namespace()
        );
        for parent in class_ref.extends() {
            println!("  extends {}", parent.name());
            pending.push(parent);
        }
        for property in &properties {
            println!("  {}", describe(property));
        }
        for target in properties.iter().rev().filter_map(PropertyRef::target_ref) {
            pending.push(target);
        }
    }
    Ok(())
}

/// `name: type` with a collection suffix.
fn describe(property: &PropertyRef) -> String {
    let name = if property.is_pattern() {
        format!("/{}/", property.name())
    } else {
        property.name().to_string()
    };
    let suffix = match property.cardinality() {
        c if !c.is_collection() => String::new(),
        Cardinality::Range { min: 0, max: None } => "[]".to_string(),
        Cardinality::Range { min, max: None } => format!("[{}..]", min),
        Cardinality::Range {
            min,
            max: Some(max),
        } => format!("[{}..{}]", min, max),
        Cardinality::Exact(n) => format!("[{}]", n),
    };
    format!("{}: {}{}", name, property.type_name(), suffix)
}
