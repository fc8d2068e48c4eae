//! Query endpoint: one PDF upload, one question

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::Instrument;

use crate::server::state::AppState;
use crate::types::{Document, ErrorResponse, QueryRequest, QueryResponse};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

/// POST /api/query - Answer a question about an uploaded PDF
///
/// Multipart fields: `file` (the PDF) and `question` (text). Every failure
/// is reported as `{"error": ...}`.
pub async fn query_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<QueryResponse>, ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut question: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read multipart field: {}", e);
                return Err((e.status(), Json(ErrorResponse::new(e.body_text()))));
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.pdf").to_string();
                let data = field.bytes().await.map_err(|e| {
                    (e.status(), Json(ErrorResponse::new(e.body_text())))
                })?;
                file = Some((filename, data));
            }
            Some("question") => {
                let text = field.text().await.map_err(|e| {
                    (e.status(), Json(ErrorResponse::new(e.body_text())))
                })?;
                question = Some(text);
            }
            other => {
                tracing::debug!("Ignoring multipart field {:?}", other);
            }
        }
    }

    let Some((filename, data)) = file else {
        return Err(bad_request("No file provided"));
    };
    let Some(question) = question else {
        return Err(bad_request("No question provided"));
    };

    tracing::info!("Query on {} ({} bytes): \"{}\"", filename, data.len(), question);

    let request = QueryRequest::new(Document::new(filename, data), question);

    // Detached so a disconnecting client cannot cut a run short
    let pipeline = Arc::clone(state.pipeline());
    let run = tokio::spawn(async move { pipeline.run(request).await }.in_current_span());

    match run.await {
        Ok(Ok(result)) => Ok(Json(result.into())),
        Ok(Err(failure)) => Err(bad_request(failure.user_message())),
        Err(e) => {
            tracing::error!("Query task failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("An error occurred: {}", e))),
            ))
        }
    }
}
