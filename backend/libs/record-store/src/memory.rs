//! In-memory store implementations.
//!
//! Backs the test suites and local development. Collection access goes
//! through a per-collection map entry, so `increment` holds exclusive
//! access for the whole read-add-write and is atomic with respect to
//! concurrent callers. Write fault injection per collection simulates
//! the partial fan-out failures the coordinator has to tolerate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::{BlobStore, Document, Predicate, RecordStore};

/// DashMap-backed [`RecordStore`].
#[derive(Default)]
pub struct MemoryRecordStore {
    collections: DashMap<String, BTreeMap<String, Document>>,
    failing_writes: DashSet<String>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write (`set`/`delete`/`increment`) against
    /// `collection` fail with [`StoreError::Unavailable`]. Reads are
    /// unaffected.
    pub fn fail_writes_to(&self, collection: &str) {
        tracing::debug!(collection, "injecting write failures");
        self.failing_writes.insert(collection.to_string());
    }

    /// Clear all injected write failures.
    pub fn clear_write_failures(&self) {
        self.failing_writes.clear();
    }

    fn check_writable(&self, collection: &str) -> StoreResult<()> {
        if self.failing_writes.contains(collection) {
            return Err(StoreError::Unavailable(format!(
                "writes to {collection} are failing"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn query(
        &self,
        collection: &str,
        predicates: &[Predicate],
    ) -> StoreResult<Vec<Document>> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .values()
            .filter(|doc| predicates.iter().all(|p| p.matches(doc)))
            .cloned()
            .collect())
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> StoreResult<()> {
        self.check_writable(collection)?;
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) if merge => {
                for (key, value) in fields {
                    existing.insert(key, value);
                }
            }
            _ => {
                docs.insert(id.to_string(), fields);
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.check_writable(collection)?;
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> StoreResult<()> {
        self.check_writable(collection)?;
        let mut docs = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
        let current = match doc.get(field) {
            None => 0,
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
                StoreError::Backend(format!("field {field} is not an integer"))
            })?,
            Some(other) => {
                return Err(StoreError::Backend(format!(
                    "field {field} is not numeric: {other}"
                )))
            }
        };
        doc.insert(field.to_string(), Value::from(current + delta));
        Ok(())
    }
}

/// DashMap-backed [`BlobStore`].
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.blobs.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, path: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.blobs.get(path).map(|b| b.value().clone()))
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        self.blobs.remove(path);
        Ok(())
    }
}
