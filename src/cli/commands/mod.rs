//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Async Commands
//!
//! Unserializing may fetch remote `$ref` documents, so both commands run
//! their async part on a `tokio` runtime created per invocation.

mod parse;
mod roundtrip;

pub use parse::parse;
pub use roundtrip::roundtrip;

use anyhow::{Context as _, Result};
use serde_json::Value;
use std::path::Path;

use super::{Command, Context};
use crate::codec::{
    DefaultFetcher, JsonSchema7Unserializer, RefAddress, UnserializeOptions, Unserialized,
};
use crate::registry::RegistryFactory;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Parse {
            file,
            namespace,
            as_class,
        } => parse::parse(ctx, &file, namespace.as_deref(), as_class),
        Command::Roundtrip { file, namespace } => {
            roundtrip::roundtrip(ctx, &file, namespace.as_deref())
        }
    }
}

/// Read `file` and unserialize it into `factory`.
///
/// Relative `$ref`s resolve against the file's directory.
pub(crate) async fn load_document(
    ctx: &Context,
    factory: &RegistryFactory,
    file: &Path,
    mut options: UnserializeOptions,
) -> Result<Unserialized> {
    let path = ctx.cwd.join(file);
    let contents = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document: Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    options.cwd = path.parent().map(Path::to_path_buf);
    options.base_address = Some(RefAddress::File(path.clone()));

    let fetcher = DefaultFetcher::new(ctx.config.http_timeout())?;
    let mut unserializer =
        JsonSchema7Unserializer::new(factory, std::sync::Arc::new(fetcher), options);
    let parsed = unserializer
        .unserialize(&document)
        .await
        .with_context(|| format!("failed to unserialize {}", path.display()))?;
    Ok(parsed)
}
