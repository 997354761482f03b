//! core::metadata::store
//!
//! Append-only store of raw option records.
//!
//! # Architecture
//!
//! The store is a flat list in id order. Lookups by id bisect it and the
//! namespace binding of each type is indexed; other queries scan. Every
//! mutation is also
//! appended to a change log; registries keep a cursor into that log and
//! replay new events on [`refresh`](crate::registry::NamespaceRegistry::refresh).
//! This replaces event emitters: nothing is pushed to listeners, consumers
//! pull what changed since they last looked.
//!
//! # Example
//!
//! ```
//! use schemaref::core::metadata::schema::{EntityRecord, RecordKind};
//! use schemaref::core::metadata::store::{MetadataStore, StoreEvent};
//! use schemaref::core::typedef::TypeDef;
//!
//! let car = TypeDef::builder("Car").build().unwrap();
//! let mut store = MetadataStore::new();
//!
//! let cursor = store.cursor();
//! let id = store.add(EntityRecord::new(&car).option("name", "car")).unwrap();
//!
//! assert_eq!(store.get_by_context_and_target(RecordKind::Entity, &car).len(), 1);
//! assert!(matches!(store.events_since(cursor), [StoreEvent::Added(added)] if *added == id));
//! ```

use std::collections::HashMap;

use thiserror::Error;

use super::schema::{OptionRecord, RecordKind};
use crate::core::options::Options;
use crate::core::typedef::{TypeHandle, TypeKey};

/// Errors from metadata store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record is missing data its kind requires.
    #[error("invalid {kind} record for '{target}': {message}")]
    InvalidRecord {
        kind: RecordKind,
        target: String,
        message: String,
    },
}

/// Identifier assigned to a record when it is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "record#{}", self.0)
    }
}

/// A change to the store.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A record was appended.
    Added(RecordId),
    /// A record was removed; the removed record is carried along.
    Removed(OptionRecord),
}

/// The raw record store.
#[derive(Debug, Default)]
pub struct MetadataStore {
    /// Sorted by id.
    records: Vec<(RecordId, OptionRecord)>,
    next_id: u64,
    log: Vec<StoreEvent>,
    /// Latest namespace record per target type.
    namespaces: HashMap<TypeKey, String>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidRecord`] if a property record has no declaration
    ///   or a schema record has no `name` option
    pub fn add(&mut self, record: impl Into<OptionRecord>) -> Result<RecordId, StoreError> {
        let record = record.into();
        Self::validate(&record)?;

        self.next_id += 1;
        let id = RecordId(self.next_id);
        tracing::trace!(%id, kind = %record.kind, target = record.target.name(), "record added");
        if let (RecordKind::Namespace, Some(ns)) = (record.kind, &record.namespace) {
            self.namespaces.insert(record.target.key(), ns.clone());
        }
        self.records.push((id, record));
        self.log.push(StoreEvent::Added(id));
        Ok(id)
    }

    fn validate(record: &OptionRecord) -> Result<(), StoreError> {
        let invalid = |message: &str| StoreError::InvalidRecord {
            kind: record.kind,
            target: record.target.name().to_string(),
            message: message.to_string(),
        };

        match record.kind {
            RecordKind::Property if record.property.is_none() => {
                Err(invalid("property records need a property declaration"))
            }
            RecordKind::Schema if record.options.get_str("name").is_none() => {
                Err(invalid("schema records need a 'name' option"))
            }
            RecordKind::Namespace if record.namespace.is_none() => {
                Err(invalid("namespace records need a namespace"))
            }
            _ => Ok(()),
        }
    }

    pub fn get(&self, id: RecordId) -> Option<&OptionRecord> {
        self.records
            .binary_search_by_key(&id, |(rid, _)| *rid)
            .ok()
            .map(|index| &self.records[index].1)
    }

    /// First record satisfying the predicate.
    pub fn find(&self, predicate: impl Fn(&OptionRecord) -> bool) -> Option<&OptionRecord> {
        self.records.iter().map(|(_, r)| r).find(|r| predicate(r))
    }

    /// All records satisfying the predicate, in insertion order.
    pub fn filter(&self, predicate: impl Fn(&OptionRecord) -> bool) -> Vec<&OptionRecord> {
        self.records
            .iter()
            .map(|(_, r)| r)
            .filter(|r| predicate(r))
            .collect()
    }

    /// Records of a kind whose options contain every key of `pattern`.
    pub fn find_matching(&self, kind: RecordKind, pattern: &Options) -> Vec<&OptionRecord> {
        self.filter(|r| r.kind == kind && r.options.matches(pattern))
    }

    /// Records of a kind about one target type.
    pub fn get_by_context_and_target(
        &self,
        kind: RecordKind,
        target: &TypeHandle,
    ) -> Vec<&OptionRecord> {
        self.filter(|r| r.kind == kind && r.targets(target))
    }

    /// Remove every record satisfying the predicate.
    ///
    /// Returns the removed records; each also lands in the change log.
    pub fn remove(&mut self, predicate: impl Fn(&OptionRecord) -> bool) -> Vec<OptionRecord> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.records)
                .into_iter()
                .partition(|(_, r)| predicate(r));
        self.records = kept;

        let removed: Vec<OptionRecord> = removed.into_iter().map(|(_, r)| r).collect();
        if removed.iter().any(|r| r.kind == RecordKind::Namespace) {
            self.reindex_namespaces();
        }
        for record in &removed {
            self.log.push(StoreEvent::Removed(record.clone()));
        }
        removed
    }

    /// Namespace bound to a type by its latest namespace record.
    pub fn namespace_of(&self, ty: &TypeHandle) -> Option<&str> {
        self.namespaces.get(&ty.key()).map(String::as_str)
    }

    fn reindex_namespaces(&mut self) {
        self.namespaces.clear();
        for (_, record) in &self.records {
            if let (RecordKind::Namespace, Some(ns)) = (record.kind, &record.namespace) {
                self.namespaces.insert(record.target.key(), ns.clone());
            }
        }
    }

    /// Namespace a record applies to: its own, else the one bound to its
    /// target, else `default`.
    pub fn effective_namespace<'a>(&'a self, record: &'a OptionRecord, default: &'a str) -> &'a str {
        record
            .namespace
            .as_deref()
            .or_else(|| self.namespace_of(&record.target))
            .unwrap_or(default)
    }

    /// Position at the end of the change log.
    pub fn cursor(&self) -> usize {
        self.log.len()
    }

    /// Events recorded after `cursor`.
    pub fn events_since(&self, cursor: usize) -> &[StoreEvent] {
        self.log.get(cursor..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &OptionRecord> {
        self.records.iter().map(|(_, r)| r)
    }
}
