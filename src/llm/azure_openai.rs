use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::config::LlmConfig;
use crate::core::errors::LlmError;
use super::provider::LlmGateway;
use super::types::ResponseSchema;

/// Azure OpenAI gateway using the Responses API for structured output and
/// the deployment embeddings endpoint for vectors.
#[derive(Clone)]
pub struct AzureOpenAiGateway {
    endpoint: String,
    api_key: String,
    chat_deployment: String,
    embedding_deployment: String,
    responses_api_version: String,
    embeddings_api_version: String,
    max_output_tokens: u32,
    temperature: f32,
    client: Client,
}

impl AzureOpenAiGateway {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let endpoint = config.endpoint.trim().trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(LlmError::Configuration("llm.endpoint is not set".to_string()));
        }
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LlmError::Configuration("llm.api_key is not set".to_string()))?
            .to_string();
        if config.chat_deployment.trim().is_empty() {
            return Err(LlmError::Configuration(
                "llm.chat_deployment is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;

        Ok(Self {
            endpoint,
            api_key,
            chat_deployment: config.chat_deployment.trim().to_string(),
            embedding_deployment: config.embedding_deployment.trim().to_string(),
            responses_api_version: config.responses_api_version.clone(),
            embeddings_api_version: config.embeddings_api_version.clone(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            client,
        })
    }

    fn responses_url(&self) -> String {
        format!(
            "{}/openai/responses?api-version={}",
            self.endpoint, self.responses_api_version
        )
    }

    fn embeddings_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.endpoint, self.embedding_deployment, self.embeddings_api_version
        )
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, LlmError> {
        let res = self
            .client
            .post(url)
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(LlmError::transport)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Transport(format!("HTTP {}: {}", status, text)));
        }

        res.json::<Value>().await.map_err(LlmError::transport)
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl LlmGateway for AzureOpenAiGateway {
    fn name(&self) -> &str {
        "azure_openai"
    }

    async fn structured_complete(
        &self,
        instructions: &str,
        input: &str,
        schema: ResponseSchema,
    ) -> Result<Value, LlmError> {
        let body = build_responses_body(
            &self.chat_deployment,
            instructions,
            input,
            schema,
            self.max_output_tokens,
            self.temperature,
        );

        let payload = self.post_json(&self.responses_url(), &body).await?;
        let text = extract_output_text(&payload)?;
        parse_structured_output(&text, schema)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        if self.embedding_deployment.is_empty() {
            return Err(LlmError::Configuration(
                "llm.embedding_deployment is not set".to_string(),
            ));
        }

        let body = json!({ "input": inputs });
        let payload = self.post_json(&self.embeddings_url(), &body).await?;
        let mut response: EmbeddingsResponse =
            serde_json::from_value(payload).map_err(LlmError::schema)?;

        if response.data.len() != inputs.len() {
            return Err(LlmError::SchemaValidation(format!(
                "expected {} embeddings, received {}",
                inputs.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|item| item.index);
        Ok(response.data.into_iter().map(|item| item.embedding).collect())
    }
}

pub(crate) fn build_responses_body(
    model: &str,
    instructions: &str,
    input: &str,
    schema: ResponseSchema,
    max_output_tokens: u32,
    temperature: f32,
) -> Value {
    json!({
        "model": model,
        "instructions": instructions,
        "input": input,
        "max_output_tokens": max_output_tokens,
        "temperature": temperature,
        "text": {
            "format": {
                "type": "json_schema",
                "name": schema.name(),
                "schema": schema.json_schema(),
                "strict": true,
            }
        }
    })
}

/// Pulls the first `output_text` part out of a Responses API payload.
pub(crate) fn extract_output_text(payload: &Value) -> Result<String, LlmError> {
    if payload["status"].as_str() == Some("incomplete") {
        let reason = payload["incomplete_details"]["reason"]
            .as_str()
            .unwrap_or("unknown");
        return Err(LlmError::SchemaValidation(format!(
            "response incomplete: {}",
            reason
        )));
    }

    let parts = payload["output"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|item| item["type"].as_str() == Some("message"))
        .flat_map(|item| item["content"].as_array().into_iter().flatten());

    for part in parts {
        match part["type"].as_str() {
            Some("output_text") => {
                if let Some(text) = part["text"].as_str() {
                    return Ok(text.to_string());
                }
            }
            Some("refusal") => {
                let reason = part["refusal"].as_str().unwrap_or_default();
                return Err(LlmError::SchemaValidation(format!(
                    "model refused: {}",
                    reason
                )));
            }
            _ => {}
        }
    }

    Err(LlmError::SchemaValidation(
        "response contained no output text".to_string(),
    ))
}

pub(crate) fn parse_structured_output(
    text: &str,
    schema: ResponseSchema,
) -> Result<Value, LlmError> {
    let value: Value = serde_json::from_str(text.trim()).map_err(LlmError::schema)?;
    schema.validate(&value)?;
    Ok(value)
}
