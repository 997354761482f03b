//! core
//!
//! Core domain types, metadata records, and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: TypeName, Cardinality, PrimitiveType
//! - [`options`] - Option maps attached to records and references
//! - [`typedef`] - Runtime type descriptors with identity
//! - [`metadata`] - Option records and the metadata store
//! - [`config`] - Configuration schema and loading
//! - `sync` - Poison-tolerant lock helpers
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Records are raw data; references are built from them on demand
//! - Type identity is explicit, never derived from names

pub mod config;
pub mod metadata;
pub mod options;
pub(crate) mod sync;
pub mod typedef;
pub mod types;
