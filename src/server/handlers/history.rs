use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteHistoryQuery {
    /// Entries to drop from the tail; omitted clears everything.
    pub count: Option<usize>,
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let messages = state.history.read_recent(&user_id, limit).await?;
    Ok(Json(json!({
        "user_id": user_id,
        "messages": messages,
    })))
}

pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<DeleteHistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let count = query.count.unwrap_or(usize::MAX);
    let removed = state.history.delete_recent(&user_id, count).await?;
    tracing::info!("Removed {} history entries for {}", removed, user_id);
    Ok(Json(json!({ "removed": removed })))
}
