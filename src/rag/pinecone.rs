//! Pinecone serverless index client.
//!
//! Queries are embedded through the LLM gateway and sent to the index data
//! plane. The data-plane host is taken from config or looked up once from the
//! control plane by index name.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;

use crate::core::config::PineconeConfig;
use crate::core::errors::RetrievalError;
use crate::llm::LlmGateway;

use super::store::{ChunkMetadata, DocumentChunk, Retriever};

const PINECONE_API_VERSION: &str = "2024-07";

pub struct PineconeRetriever {
    api_key: String,
    index_name: String,
    control_plane_url: String,
    text_key: String,
    host: OnceCell<String>,
    embedder: Arc<dyn LlmGateway>,
    client: Client,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

impl PineconeRetriever {
    pub fn new(config: &PineconeConfig, embedder: Arc<dyn LlmGateway>) -> Result<Self, RetrievalError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                RetrievalError::Configuration("retrieval.pinecone.api_key is not set".to_string())
            })?
            .to_string();

        let host = OnceCell::new();
        if let Some(configured) = config.host.as_deref().filter(|h| !h.trim().is_empty()) {
            let _ = host.set(normalize_host(configured));
        }

        Ok(Self {
            api_key,
            index_name: config.index_name.clone(),
            control_plane_url: config.control_plane_url.trim_end_matches('/').to_string(),
            text_key: config.text_key.clone(),
            host,
            embedder,
            client: Client::new(),
        })
    }

    async fn data_plane_host(&self) -> Result<&str, RetrievalError> {
        let host = self
            .host
            .get_or_try_init(|| async {
                let url = format!(
                    "{}/indexes/{}",
                    self.control_plane_url,
                    urlencoding::encode(&self.index_name)
                );
                let res = self
                    .client
                    .get(&url)
                    .header("Api-Key", &self.api_key)
                    .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
                    .send()
                    .await
                    .map_err(RetrievalError::transport)?;

                if !res.status().is_success() {
                    let status = res.status();
                    let text = res.text().await.unwrap_or_default();
                    return Err(RetrievalError::Transport(format!(
                        "describe index '{}' failed with HTTP {}: {}",
                        self.index_name, status, text
                    )));
                }

                let described: DescribeIndexResponse =
                    res.json().await.map_err(RetrievalError::transport)?;
                tracing::info!(
                    "Resolved Pinecone index '{}' to host {}",
                    self.index_name,
                    described.host
                );
                Ok::<_, RetrievalError>(normalize_host(&described.host))
            })
            .await?;
        Ok(host.as_str())
    }
}

#[async_trait]
impl Retriever for PineconeRetriever {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let vector = vectors.pop().ok_or_else(|| {
            RetrievalError::Transport("embedding service returned no vector".to_string())
        })?;

        let host = self.data_plane_host().await?;
        let url = format!("{}/query", host);
        let body = json!({
            "vector": vector,
            "topK": k,
            "includeMetadata": true,
            "includeValues": false,
        });

        let res = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(RetrievalError::transport)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RetrievalError::Transport(format!(
                "query failed with HTTP {}: {}",
                status, text
            )));
        }

        let payload: QueryResponse = res.json().await.map_err(RetrievalError::transport)?;
        let chunks = matches_to_chunks(payload.matches, &self.text_key, k);
        tracing::debug!("Pinecone returned {} chunks for k={}", chunks.len(), k);
        Ok(chunks)
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn matches_to_chunks(matches: Vec<QueryMatch>, text_key: &str, k: usize) -> Vec<DocumentChunk> {
    matches
        .into_iter()
        .take(k)
        .map(|m| {
            let mut metadata = m.metadata.unwrap_or_default();
            let content = match metadata.remove(text_key) {
                Some(Value::String(text)) => text,
                Some(other) => other.to_string(),
                None => String::new(),
            };
            DocumentChunk::new(content, ChunkMetadata::from_map(metadata)).with_score(m.score)
        })
        .collect()
}
