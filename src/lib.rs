//! schemaref - Namespaced reference registry with a JSON Schema codec
//!
//! schemaref keeps a graph of references describing data types: classes,
//! their properties, entities (classes promoted to roots) and schemas
//! (groups of entities). References live in namespaces and are built
//! lazily from raw metadata records. The graph converts to and from
//! JSON Schema draft-07 documents.
//!
//! # Architecture
//!
//! The codebase is layered:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to codec)
//! - [`codec`] - JSON Schema draft-07 serializer and unserializer
//! - [`registry`] - Namespace registries and the factory that owns them
//! - [`refs`] - Class, property, entity and schema references
//! - [`core`] - Domain types, metadata records, and configuration
//!
//! # Invariants
//!
//! 1. Within a namespace, one type has at most one canonical class reference
//! 2. A placeholder is upgraded in place, never replaced
//! 3. Property order is declaration order
//! 4. Reference graphs may be cyclic; every traversal terminates

pub mod cli;
pub mod codec;
pub mod core;
pub mod refs;
pub mod registry;
