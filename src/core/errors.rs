use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream failure: {0}")]
    BadGateway(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Failures of the structured-completion and embedding capability.
///
/// `Transport` and `SchemaValidation` are kept apart so callers can tell an
/// unreachable service from a model that answered in the wrong shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("LLM transport error: {0}")]
    Transport(String),
    #[error("LLM output failed schema validation: {0}")]
    SchemaValidation(String),
    #[error("LLM gateway is not configured: {0}")]
    Configuration(String),
}

impl LlmError {
    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        LlmError::Transport(err.to_string())
    }

    pub fn schema<E: std::fmt::Display>(err: E) -> Self {
        LlmError::SchemaValidation(err.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("vector index transport error: {0}")]
    Transport(String),
    #[error("query embedding failed: {0}")]
    Embedding(#[from] LlmError),
    #[error("retriever is not configured: {0}")]
    Configuration(String),
}

impl RetrievalError {
    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        RetrievalError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history storage error: {0}")]
    Storage(String),
    #[error("remote history log error: {0}")]
    Remote(String),
}

impl HistoryError {
    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        HistoryError::Storage(err.to_string())
    }

    pub fn remote<E: std::fmt::Display>(err: E) -> Self {
        HistoryError::Remote(err.to_string())
    }
}

impl From<HistoryError> for ApiError {
    fn from(err: HistoryError) -> Self {
        ApiError::internal(err)
    }
}
