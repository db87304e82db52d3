// In-process persistence service.
//
// Applies the same partial-update semantics as the docsync server and keeps a
// monotonic update clock so listings come back most recently updated first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use docsync_common::patch::SavePatch;
use docsync_common::types::{CreatedDocument, Document};
use uuid::Uuid;

use super::{DocumentStore, StoreError};

#[derive(Default)]
struct MemoryInner {
    documents: HashMap<Uuid, StoredDocument>,
    clock: u64,
}

struct StoredDocument {
    document: Document,
    updated_seq: u64,
}

impl MemoryInner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Thread-safe in-memory document store. Clones share the same documents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing documents.
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let store = Self::new();
        for document in documents {
            store.insert(document);
        }
        store
    }

    /// Insert or replace a document verbatim.
    pub fn insert(&self, document: Document) {
        let mut inner = self.lock();
        let updated_seq = inner.tick();
        inner.documents.insert(document.id, StoredDocument { document, updated_seq });
    }

    /// Current stored copy of a document.
    pub fn get(&self, id: Uuid) -> Option<Document> {
        self.lock().documents.get(&id).map(|stored| stored.document.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentStore for MemoryStore {
    async fn fetch_document(&self, id: Uuid) -> Result<Document, StoreError> {
        self.get(id).ok_or(StoreError::NotFound(id))
    }

    async fn save_document(&self, patch: &SavePatch) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let updated_seq = inner.tick();
        let stored = inner.documents.get_mut(&patch.id).ok_or(StoreError::NotFound(patch.id))?;
        stored
            .document
            .apply_patch(patch)
            .map_err(|error| StoreError::Server { status: 400, message: error.to_string() })?;
        stored.updated_seq = updated_seq;
        Ok(())
    }

    async fn create_document(&self) -> Result<CreatedDocument, StoreError> {
        let id = Uuid::new_v4();
        self.insert(Document::empty(id));
        Ok(CreatedDocument { id })
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError> {
        self.lock().documents.remove(&id).map(|_| ()).ok_or(StoreError::NotFound(id))
    }

    async fn list_documents(&self) -> Result<Vec<Document>, StoreError> {
        let inner = self.lock();
        let mut entries: Vec<&StoredDocument> = inner.documents.values().collect();
        entries.sort_by(|a, b| b.updated_seq.cmp(&a.updated_seq));
        Ok(entries.into_iter().map(|stored| stored.document.clone()).collect())
    }
}
