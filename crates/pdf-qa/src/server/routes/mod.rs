//! API routes for the query server

pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/query", post(query::query_pdf))
        .route("/info", get(info))
        // Replace axum's 2 MB default with the configured upload limit
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_upload_size)),
        )
}

/// API info endpoint
async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "pdf-qa",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over an uploaded PDF, grounded in retrieved passages",
        "endpoints": {
            "POST /api/query": "Multipart upload with fields `file` (PDF) and `question`",
            "GET /api/info": "This description",
            "GET /health": "Liveness check",
            "GET /ready": "Readiness check"
        },
        "response": {
            "answer": "string",
            "relevant_context": ["string"]
        }
    }))
}
