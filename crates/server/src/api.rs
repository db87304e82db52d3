// Document endpoints.
//
// Routes:
//   GET    /api/editor/documents        list, most recently updated first
//   POST   /api/editor/documents        create an empty document
//   GET    /api/editor/documents/{id}   fetch one
//   PUT    /api/editor/documents/{id}   partial update
//   DELETE /api/editor/documents/{id}   delete

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use docsync_common::patch::{PatchField, SavePatch};
use docsync_common::types::{CreatedDocument, Document};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::db::DocumentDb;
use crate::error::ApiError;

// ── Request types ──────────────────────────────────────────────────

/// Partial update body. An absent field is left alone, `null` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDocumentRequest {
    #[serde(default)]
    pub title: PatchField<String>,
    #[serde(default)]
    pub content: PatchField<String>,
}

// ── Router ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct ApiState {
    db: Arc<DocumentDb>,
}

pub fn router(db: Arc<DocumentDb>) -> Router {
    Router::new()
        .route("/api/editor/documents", get(list_documents).post(create_document))
        .route(
            "/api/editor/documents/{id}",
            get(get_document).put(update_document).delete(delete_document),
        )
        .with_state(ApiState { db })
}

// ── Handlers ───────────────────────────────────────────────────────

async fn list_documents(State(state): State<ApiState>) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.db.list()?))
}

async fn create_document(
    State(state): State<ApiState>,
) -> Result<(StatusCode, Json<CreatedDocument>), ApiError> {
    let id = state.db.create()?;
    info!(doc_id = %id, "document created");
    Ok((StatusCode::CREATED, Json(CreatedDocument { id })))
}

async fn get_document(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    let id = parse_id(&raw_id)?;
    state.db.get(id)?.map(Json).ok_or_else(|| not_found(id))
}

async fn update_document(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
    Json(payload): Json<UpdateDocumentRequest>,
) -> Result<Json<CreatedDocument>, ApiError> {
    let id = parse_id(&raw_id)?;
    let patch = SavePatch { id, title: payload.title, content: payload.content };

    match state.db.update(&patch)? {
        Some(_) => Ok(Json(CreatedDocument { id })),
        None => Err(not_found(id)),
    }
}

async fn delete_document(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id)?;
    if state.db.delete(id)? {
        info!(doc_id = %id, "document deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation(format!("invalid document id `{raw}`")))
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::not_found(format!("document {id} not found"))
}
