//! core::metadata
//!
//! Raw metadata records and their store.
//!
//! # Modules
//!
//! - [`schema`] - Record kinds, [`OptionRecord`] and typed record builders
//! - [`store`] - Append-only [`MetadataStore`] with a change log
//!
//! # Architecture
//!
//! Registration code builds typed records and appends them to the store.
//! Namespace registries turn matching records into references lazily and
//! replay the store's change log to stay current.

pub mod schema;
pub mod store;

pub use schema::{
    EntityRecord, NamespaceRecord, OptionRecord, PropertyDecl, PropertyRecord, RecordKind,
    SchemaRecord,
};
pub use store::{MetadataStore, RecordId, StoreError, StoreEvent};
