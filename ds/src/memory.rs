//! In-memory document store

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::filter::matches_all;
use crate::{Document, DocumentStore, Filter, StoreError, StoreResult, merge_into, prepare_new, validate_collection};

/// Collection name -> (id -> document). Ids are UUIDv7 so map order is creation order.
#[derive(Debug, Default)]
pub(crate) struct Collections {
    inner: HashMap<String, BTreeMap<String, Document>>,
}

impl Collections {
    pub(crate) fn list(&self, collection: &str, filters: &[Filter]) -> Vec<Document> {
        self.inner
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| matches_all(doc, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn get(&self, collection: &str, id: &str) -> Option<Document> {
        self.inner.get(collection).and_then(|docs| docs.get(id)).cloned()
    }

    pub(crate) fn put(&mut self, collection: &str, id: String, doc: Document) {
        self.inner.entry(collection.to_string()).or_default().insert(id, doc);
    }

    /// Merge a patch and return the merged document without committing it
    pub(crate) fn merged(&self, collection: &str, id: &str, partial: Document) -> StoreResult<Document> {
        let mut doc = self
            .get(collection, id)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        merge_into(&mut doc, partial)?;
        Ok(doc)
    }

    pub(crate) fn remove(&mut self, collection: &str, id: &str) -> Option<Document> {
        self.inner.get_mut(collection).and_then(|docs| docs.remove(id))
    }

    pub(crate) fn collection_names(&self) -> Vec<String> {
        self.inner.keys().cloned().collect()
    }

    pub(crate) fn documents(&self, collection: &str) -> Vec<Document> {
        self.list(collection, &[])
    }
}

/// Process-local store. Cheap to create; each test gets a fresh one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of documents in a collection
    pub fn len(&self, collection: &str) -> usize {
        self.lock().list(collection, &[]).len()
    }

    /// Whether a collection holds no documents
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_documents(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<Document>> {
        debug!(%collection, filter_count = filters.len(), "MemoryStore::list_documents: called");
        validate_collection(collection)?;
        Ok(self.lock().list(collection, filters))
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        debug!(%collection, %id, "MemoryStore::get_document: called");
        validate_collection(collection)?;
        Ok(self.lock().get(collection, id))
    }

    async fn create_document(&self, collection: &str, data: Document) -> StoreResult<Document> {
        validate_collection(collection)?;
        let (id, doc) = prepare_new(data)?;
        debug!(%collection, %id, "MemoryStore::create_document: called");
        self.lock().put(collection, id, doc.clone());
        Ok(doc)
    }

    async fn update_document(&self, collection: &str, id: &str, partial: Document) -> StoreResult<Document> {
        debug!(%collection, %id, "MemoryStore::update_document: called");
        validate_collection(collection)?;
        let mut guard = self.lock();
        let doc = guard.merged(collection, id, partial)?;
        guard.put(collection, id.to_string(), doc.clone());
        Ok(doc)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        debug!(%collection, %id, "MemoryStore::delete_document: called");
        validate_collection(collection)?;
        self.lock()
            .remove(collection, id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(collection, id))
    }
}
