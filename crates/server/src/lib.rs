pub mod api;
pub mod config;
pub mod db;
pub mod error;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::db::DocumentDb;

const MAX_REQUEST_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Full application router: health check, document API and middleware.
pub fn build_router(db: Arc<DocumentDb>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .merge(api::router(db))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(middleware::from_fn(request_log_middleware))
        .layer(CorsLayer::permissive())
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn request_log_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started_at = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started_at.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}
