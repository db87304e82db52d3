// Persistence service interface.
//
// Sessions reach the authoritative copy of a document only through
// `DocumentStore`. `MemoryStore` keeps documents in-process; `HttpStore`
// talks to the docsync server API.

use std::future::Future;

use docsync_common::patch::SavePatch;
use docsync_common::types::{CreatedDocument, Document};
use thiserror::Error;
use uuid::Uuid;

pub mod http;
pub mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

/// Errors from the persistence service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The document id is unknown to the service. Terminal for the operation.
    #[error("document {0} not found")]
    NotFound(Uuid),
    /// Network unreachable, connection reset, timeout.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The service answered with a non-success status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// The service answered with a body we could not decode.
    #[error("malformed response: {message}")]
    Decode { message: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether a later attempt may succeed without user intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound(_) | Self::Decode { .. } => false,
            Self::Transport { .. } => true,
            Self::Server { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

/// Abstraction over the persistence service. Trait-based for testability.
///
/// All methods return `Send` futures so saves can be dispatched onto a
/// multi-threaded tokio runtime.
pub trait DocumentStore: Send + Sync + 'static {
    /// Fetch the authoritative copy of a document.
    fn fetch_document(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Document, StoreError>> + Send;

    /// Apply a partial update. Absent fields are left unchanged server-side,
    /// cleared fields are set to null.
    fn save_document(
        &self,
        patch: &SavePatch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Create an empty document.
    fn create_document(&self) -> impl Future<Output = Result<CreatedDocument, StoreError>> + Send;

    /// Delete a document.
    fn delete_document(&self, id: Uuid) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// List all documents, most recently updated first.
    fn list_documents(&self) -> impl Future<Output = Result<Vec<Document>, StoreError>> + Send;
}
