//! Document-store and blob-store contracts for the club backend.
//!
//! The backing service is a collection/document store with arbitrary
//! field updates, equality queries, and an atomic single-field
//! increment. There is no multi-document transaction primitive; every
//! cross-collection guarantee is orchestrated by the caller.

mod error;
mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryBlobStore, MemoryRecordStore};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Raw document payload: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// Equality predicate for [`RecordStore::query`].
#[derive(Debug, Clone)]
pub struct Predicate {
    pub field: String,
    pub value: Value,
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }

    /// True if `doc` carries `field` with exactly `value`.
    pub fn matches(&self, doc: &Document) -> bool {
        doc.get(&self.field) == Some(&self.value)
    }
}

/// Document store interface
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a single document, `None` if absent.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// All documents in `collection` matching every predicate (equality only).
    async fn query(&self, collection: &str, predicates: &[Predicate])
        -> StoreResult<Vec<Document>>;

    /// Write a document. With `merge`, existing fields not present in
    /// `fields` are preserved; otherwise the document is replaced.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> StoreResult<()>;

    /// Delete a document. Deleting an absent document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Atomically add `delta` to a numeric field. This is a store-level
    /// primitive, never a read-modify-write round trip.
    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> StoreResult<()>;
}

/// Blob store interface for binary assets (club covers, avatars).
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> StoreResult<()>;

    async fn get(&self, path: &str) -> StoreResult<Option<Vec<u8>>>;

    async fn delete(&self, path: &str) -> StoreResult<()>;
}

/// Encode a schema struct into a raw document.
///
/// Together with [`from_document`] this is the decode-or-fail boundary:
/// typed structs on one side, JSON objects on the other, nothing dynamic
/// leaking past it.
pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Backend(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Decode a raw document into a schema struct, failing on any mismatch.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}
