//! Error types for the question-answering pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::types::response::ErrorResponse;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors, one variant per failing stage plus plumbing errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or malformed request input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Unreadable or empty PDF
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    /// No meaningful chunks could be produced
    #[error("Chunking failed: {0}")]
    Chunking(String),

    /// Embedding capability failure or malformed output
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Index build, persist, load or search failure
    #[error("Index error: {0}")]
    Index(String),

    /// Generation capability failure
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Generation refused by the model's content policy
    #[error("Content blocked: {0}")]
    ContentBlocked(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an index error
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the caller is at fault (maps to a 4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Extraction(_) | Error::Chunking(_)
        )
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Validation(_) | Error::Extraction(_) | Error::Chunking(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Embedding(_) | Error::Index(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Generation(_) | Error::ContentBlocked(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Io(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::Http(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Validation messages are written for the caller already
            Error::Validation(msg) => msg.clone(),
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
