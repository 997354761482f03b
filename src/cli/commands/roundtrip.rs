//! cli::commands::roundtrip
//!
//! Unserialize a schema document, then serialize the parsed roots back
//! into a single draft-07 document printed to stdout.

use anyhow::Result;
use std::path::Path;

use super::load_document;
use crate::cli::Context;
use crate::codec::{
    JsonSchema7Serializer, SerializeOptions, SerializeTarget, UnserializeOptions, UnserializedRef,
};
use crate::registry::RegistryFactory;

/// Run the roundtrip command.
pub fn roundtrip(ctx: &Context, file: &Path, namespace: Option<&str>) -> Result<()> {
    let factory = RegistryFactory::from_config(&ctx.config)?;
    let options = UnserializeOptions {
        namespace: namespace.map(str::to_string),
        ..UnserializeOptions::from_config(&ctx.config)
    };

    let rt = tokio::runtime::Runtime::new()?;
    let parsed = rt.block_on(load_document(ctx, &factory, file, options))?;

    let mut serializer = JsonSchema7Serializer::new(
        &factory,
        SerializeOptions {
            namespace: namespace.map(str::to_string),
            ..SerializeOptions::from_config(&ctx.config)
        },
    );
    for root in parsed.into_vec() {
        match &root {
            UnserializedRef::Entity(entity) => serializer.serialize(SerializeTarget::Entity(entity))?,
            UnserializedRef::Class(class_ref) => serializer.serialize(SerializeTarget::Class(class_ref))?,
        };
    }

    println!("{}", serde_json::to_string_pretty(&serializer.get_json_schema())?);
    Ok(())
}
