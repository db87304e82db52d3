// Client-side document query cache.
//
// Holds the last-known server copy of each document plus the last fetched
// listing. Successful saves are written back so every view of the same id
// observes the new state; create/update/delete invalidate the listing.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use docsync_common::patch::SavePatch;
use docsync_common::types::Document;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

/// Change notifications for cache observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// The cached copy of a document was inserted or updated.
    Updated(Uuid),
    /// A document was evicted (deleted).
    Removed(Uuid),
    /// Listings are stale and must be refetched.
    ListInvalidated,
}

#[derive(Default)]
struct CacheInner {
    documents: HashMap<Uuid, Document>,
    list: Option<Vec<Document>>,
}

/// Shared document cache. Clones refer to the same entries.
#[derive(Clone)]
pub struct DocumentCache {
    inner: Arc<RwLock<CacheInner>>,
    events: broadcast::Sender<CacheEvent>,
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { inner: Arc::new(RwLock::new(CacheInner::default())), events }
    }

    /// Subscribe to cache change events.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    pub fn get(&self, id: Uuid) -> Option<Document> {
        self.read().documents.get(&id).cloned()
    }

    /// Store a freshly fetched server copy.
    pub fn insert(&self, document: Document) {
        let id = document.id;
        self.write().documents.insert(id, document);
        self.notify(CacheEvent::Updated(id));
    }

    /// Write back a successfully persisted patch. Returns `false` if the
    /// document is not cached (nothing to update).
    pub fn apply_saved(&self, patch: &SavePatch) -> bool {
        let applied = match self.write().documents.get_mut(&patch.id) {
            Some(document) => document.apply_patch(patch).is_ok(),
            None => false,
        };
        if applied {
            debug!(doc_id = %patch.id, "cache updated from saved patch");
            self.notify(CacheEvent::Updated(patch.id));
        }
        applied
    }

    /// Evict a document.
    pub fn remove(&self, id: Uuid) -> Option<Document> {
        let removed = self.write().documents.remove(&id);
        if removed.is_some() {
            self.notify(CacheEvent::Removed(id));
        }
        removed
    }

    /// Cached listing, if still valid.
    pub fn list(&self) -> Option<Vec<Document>> {
        self.read().list.clone()
    }

    pub fn set_list(&self, documents: Vec<Document>) {
        self.write().list = Some(documents);
    }

    /// Mark listings stale.
    pub fn invalidate_list(&self) {
        self.write().list = None;
        self.notify(CacheEvent::ListInvalidated);
    }

    fn notify(&self, event: CacheEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
