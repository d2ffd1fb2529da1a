use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::graph::{ConversationRequest, ConversationState, LearningStyle};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub question: String,
    /// UI label ("Kinestésico", "Visual"), numeric code, or absent
    #[serde(default)]
    pub learning_style: Value,
}

/// One supporting chunk, as shown under the answer (source / page / URL).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub name: Option<String>,
    pub page_number: Option<u32>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub attachment_url: Option<String>,
    pub sources: Vec<SourceRef>,
    pub elapsed_ms: u64,
}

impl ChatResponse {
    fn from_state(state: &ConversationState, elapsed_ms: u64) -> Self {
        Self {
            answer: state.answer_text().unwrap_or_default().to_string(),
            attachment_url: state.answer_attachment_url().map(str::to_string),
            sources: state
                .retrieved_chunks()
                .iter()
                .map(|chunk| SourceRef {
                    name: chunk.metadata.name.clone(),
                    page_number: chunk.metadata.page_number,
                    url: chunk.metadata.url.clone(),
                })
                .collect(),
            elapsed_ms,
        }
    }
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id must not be empty".to_string()));
    }
    if payload.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    let request = ConversationRequest::new(
        user_id,
        payload.question,
        LearningStyle::from_value(&payload.learning_style),
    );

    let started = Instant::now();
    let result = state
        .graph_runtime
        .invoke(request, &state.services)
        .await?;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    tracing::info!(
        "Chat for {} answered in {} ms ({} source(s))",
        result.user_id(),
        elapsed_ms,
        result.retrieved_chunks().len()
    );
    Ok(Json(ChatResponse::from_state(&result, elapsed_ms)))
}
