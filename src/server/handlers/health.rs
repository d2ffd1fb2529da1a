use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "llm": state.services.llm.name(),
        "retriever": state.services.retriever.name(),
        "top_k": state.services.top_k,
        "remote_history": state.services.history.remote_name(),
        "stages": state
            .graph_runtime
            .stage_ids()
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>(),
    }))
}
