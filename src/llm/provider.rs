use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::LlmError;
use super::types::{ResponseSchema, RouteDecision, TextResponse};

/// Chat-completion capability with schema-constrained output, plus the
/// embedding capability used by retrieval.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// return the gateway name (e.g. "azure_openai")
    fn name(&self) -> &str;

    /// Completes `input` under `instructions`, returning output that has
    /// already been validated against `schema`.
    async fn structured_complete(
        &self,
        instructions: &str,
        input: &str,
        schema: ResponseSchema,
    ) -> Result<Value, LlmError>;

    /// generate embeddings, one vector per input
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;

    async fn complete_bool(&self, instructions: &str, input: &str) -> Result<bool, LlmError> {
        let value = self
            .structured_complete(instructions, input, ResponseSchema::Boolean)
            .await?;
        let decision: RouteDecision = serde_json::from_value(value).map_err(LlmError::schema)?;
        Ok(decision.response)
    }

    async fn complete_text(&self, instructions: &str, input: &str) -> Result<String, LlmError> {
        let value = self
            .structured_complete(instructions, input, ResponseSchema::Text)
            .await?;
        let parsed: TextResponse = serde_json::from_value(value).map_err(LlmError::schema)?;
        Ok(parsed.response)
    }
}
