//! codec
//!
//! JSON Schema draft-07 conversion of the reference graph.
//!
//! # Modules
//!
//! - [`options`] - Serialize and unserialize options
//! - [`serializer`] - [`JsonSchema7Serializer`], references to a document
//! - [`unserializer`] - [`JsonSchema7Unserializer`], a document to references
//! - [`fetch`] - [`RefFetcher`] for remote `$ref` documents
//!
//! # Document Shape
//!
//! ```json
//! {
//!   "$schema": "http://json-schema.org/draft-07/schema#",
//!   "$ref": "#/definitions/Car",
//!   "definitions": {
//!     "Car": { "type": "object", "title": "Car", "properties": {} }
//!   }
//! }
//! ```
//!
//! A document serialized from several root classes carries an `anyOf` of
//! refs instead of a single `$ref`.

pub mod fetch;
pub mod options;
pub mod serializer;
pub mod unserializer;

use thiserror::Error;

use crate::core::types::TypeError;
use crate::refs::RefError;
use crate::registry::RegistryError;

pub use fetch::{DefaultFetcher, MockFetcher, RefAddress, RefFetcher};
pub use options::{
    Collector, CollectorTarget, MultipleSchemas, PostProcess, ReturnKind, SchemaNode,
    SerializeOptions, UnserializeOptions,
};
pub use serializer::{JsonSchema7Serializer, SerializeTarget};
pub use unserializer::{JsonSchema7Unserializer, Unserialized, UnserializedRef};

/// Draft identifier written to `$schema`.
pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Prefix of local definition pointers.
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Errors from codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A `$ref` that resolves neither locally nor remotely.
    #[error("unresolvable reference '{0}'")]
    UnresolvableRef(String),

    /// A schema construct with no mapping onto references.
    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("failed to fetch '{address}': {message}")]
    Fetch { address: String, message: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ref(#[from] RefError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
