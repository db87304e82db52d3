// Document operations through the cache.
//
// `Documents` pairs a persistence service with the shared query cache:
// reads are served from the cache when possible, and every successful write
// is reflected in it so other views of the same document stay current.

use std::sync::Arc;

use docsync_common::patch::SavePatch;
use docsync_common::types::{CreatedDocument, Document};
use tracing::debug;
use uuid::Uuid;

use crate::cache::DocumentCache;
use crate::store::{DocumentStore, StoreError};

pub struct Documents<S> {
    store: Arc<S>,
    cache: DocumentCache,
}

impl<S> Clone for Documents<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), cache: self.cache.clone() }
    }
}

impl<S: DocumentStore> Documents<S> {
    pub fn new(store: S) -> Self {
        Self::with_cache(store, DocumentCache::new())
    }

    pub fn with_cache(store: S, cache: DocumentCache) -> Self {
        Self { store: Arc::new(store), cache }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Cached copy if present, otherwise fetch and cache.
    pub async fn get(&self, id: Uuid) -> Result<Document, StoreError> {
        if let Some(document) = self.cache.get(id) {
            debug!(doc_id = %id, "document served from cache");
            return Ok(document);
        }
        self.refresh(id).await
    }

    /// Always fetch from the store and replace the cached copy.
    pub async fn refresh(&self, id: Uuid) -> Result<Document, StoreError> {
        match self.store.fetch_document(id).await {
            Ok(document) => {
                self.cache.insert(document.clone());
                Ok(document)
            }
            Err(error) => {
                if error.is_not_found() {
                    self.cache.remove(id);
                }
                Err(error)
            }
        }
    }

    /// Cached listing if valid, otherwise fetch and cache.
    pub async fn list(&self) -> Result<Vec<Document>, StoreError> {
        if let Some(list) = self.cache.list() {
            return Ok(list);
        }
        let list = self.store.list_documents().await?;
        self.cache.set_list(list.clone());
        Ok(list)
    }

    pub async fn create(&self) -> Result<CreatedDocument, StoreError> {
        let created = self.store.create_document().await?;
        self.cache.invalidate_list();
        Ok(created)
    }

    /// Persist a patch; on success write it back into the cache.
    pub async fn save(&self, patch: &SavePatch) -> Result<(), StoreError> {
        self.store.save_document(patch).await?;
        self.cache.apply_saved(patch);
        self.cache.invalidate_list();
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.store.delete_document(id).await?;
        self.cache.remove(id);
        self.cache.invalidate_list();
        Ok(())
    }
}
