//! DocStore - schemaless document store contract
//!
//! The Flourish engine talks to its backend through a small document-database
//! contract: list with filters, get by id, create, shallow-merge update, delete.
//! Documents are JSON objects grouped into named collections; every document
//! carries a string `id` field.
//!
//! # Backends
//!
//! - [`MemoryStore`] - process-local maps, used by tests and embedding apps
//! - [`JsonlStore`] - append-only JSONL log per collection on disk
//!
//! ```text
//! store/
//! ├── .lock                 # fs2 exclusive lock, one writer per directory
//! ├── task_templates.jsonl
//! ├── task_instances.jsonl
//! └── plant_instances.jsonl
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docstore::{DocumentStore, Filter, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let doc = store.create_document("plants", json!({"species_id": "fern"})).await?;
//! let ferns = store.list_documents("plants", &[Filter::eq("species_id", "fern")]).await?;
//! ```

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

mod error;
mod filter;
mod jsonl;
mod memory;

pub use error::StoreError;
pub use filter::{Filter, FilterOp, IndexValue};
pub use jsonl::JsonlStore;
pub use memory::MemoryStore;

/// A stored document: always a JSON object with a string `id`
pub type Document = serde_json::Value;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The document-database contract consumed by the engine
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List all documents in a collection matching every filter
    async fn list_documents(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<Document>>;

    /// Fetch a single document by id
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Insert a document, assigning a UUIDv7 `id` if the data has none
    async fn create_document(&self, collection: &str, data: Document) -> StoreResult<Document>;

    /// Shallow-merge `partial` into an existing document and return the result
    async fn update_document(&self, collection: &str, id: &str, partial: Document) -> StoreResult<Document>;

    /// Remove a document
    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn list_documents(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<Document>> {
        (**self).list_documents(collection, filters).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        (**self).get_document(collection, id).await
    }

    async fn create_document(&self, collection: &str, data: Document) -> StoreResult<Document> {
        (**self).create_document(collection, data).await
    }

    async fn update_document(&self, collection: &str, id: &str, partial: Document) -> StoreResult<Document> {
        (**self).update_document(collection, id, partial).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        (**self).delete_document(collection, id).await
    }
}

/// A strongly-typed record that lives in one collection
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    /// The record's document id
    fn id(&self) -> &str;

    /// Name of the collection this record type is stored in
    fn collection_name() -> &'static str;
}

/// Current time in Unix milliseconds
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Generate a new time-ordered document id
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Validate new document data and make sure it carries an `id`
pub(crate) fn prepare_new(mut data: Document) -> StoreResult<(String, Document)> {
    let obj = data
        .as_object_mut()
        .ok_or_else(|| StoreError::Invalid("document must be a JSON object".to_string()))?;

    let id = match obj.get("id") {
        Some(serde_json::Value::String(id)) if !id.is_empty() => id.clone(),
        Some(serde_json::Value::String(_)) | None | Some(serde_json::Value::Null) => {
            let id = new_id();
            obj.insert("id".to_string(), serde_json::Value::String(id.clone()));
            id
        }
        Some(other) => return Err(StoreError::Invalid(format!("document id must be a string, got {}", other))),
    };

    Ok((id, data))
}

/// Shallow-merge top-level keys of `partial` into `existing`. The `id` key is never overwritten.
pub(crate) fn merge_into(existing: &mut Document, partial: Document) -> StoreResult<()> {
    let serde_json::Value::Object(patch) = partial else {
        return Err(StoreError::Invalid("update data must be a JSON object".to_string()));
    };
    let target = existing
        .as_object_mut()
        .ok_or_else(|| StoreError::Invalid("stored document is not a JSON object".to_string()))?;

    for (key, value) in patch {
        if key == "id" {
            continue;
        }
        target.insert(key, value);
    }
    Ok(())
}

/// Collection names become file names, so keep them to a safe alphabet
pub(crate) fn validate_collection(collection: &str) -> StoreResult<()> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::Invalid(format!("invalid collection name: {:?}", collection)))
    }
}
