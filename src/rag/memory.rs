//! In-process cosine-similarity index.
//!
//! Holds pre-embedded chunks in memory and embeds only the query at search
//! time. Used for local runs without a hosted index and for tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::core::errors::RetrievalError;
use crate::llm::LlmGateway;
use crate::vector_math::rank_descending_by_cosine;

use super::store::{ChunkMetadata, DocumentChunk, Retriever};

/// One entry of a corpus file: chunk text, metadata and its embedding.
#[derive(Debug, Clone, Deserialize)]
pub struct CorpusEntry {
    pub content: String,
    #[serde(default)]
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

pub struct MemoryRetriever {
    embedder: Arc<dyn LlmGateway>,
    entries: RwLock<Vec<(DocumentChunk, Vec<f32>)>>,
}

impl MemoryRetriever {
    pub fn new(embedder: Arc<dyn LlmGateway>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Loads a JSON array of [`CorpusEntry`] values.
    pub async fn from_corpus_file(
        embedder: Arc<dyn LlmGateway>,
        path: &Path,
    ) -> Result<Self, RetrievalError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            RetrievalError::Configuration(format!("cannot read corpus {}: {}", path.display(), e))
        })?;
        let entries: Vec<CorpusEntry> = serde_json::from_str(&raw).map_err(|e| {
            RetrievalError::Configuration(format!("invalid corpus {}: {}", path.display(), e))
        })?;

        let retriever = Self::new(embedder);
        for entry in entries {
            retriever
                .insert(DocumentChunk::new(entry.content, entry.metadata), entry.embedding)
                .await;
        }
        tracing::info!(
            "Loaded {} chunks into memory index from {}",
            retriever.len().await,
            path.display()
        );
        Ok(retriever)
    }

    pub async fn insert(&self, chunk: DocumentChunk, embedding: Vec<f32>) {
        self.entries.write().await.push((chunk, embedding));
    }

    /// Embeds the chunk contents through the gateway and indexes them.
    pub async fn insert_documents(&self, chunks: Vec<DocumentChunk>) -> Result<(), RetrievalError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(RetrievalError::Transport(format!(
                "embedding count mismatch: {} chunks, {} vectors",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut entries = self.entries.write().await;
        entries.extend(chunks.into_iter().zip(embeddings));
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Retriever for MemoryRetriever {
    fn name(&self) -> &str {
        "memory"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>, RetrievalError> {
        if k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_vector = vectors.pop().ok_or_else(|| {
            RetrievalError::Transport("embedding service returned no vector".to_string())
        })?;

        let entries = self.entries.read().await;
        let candidates: Vec<Vec<f32>> = entries.iter().map(|(_, v)| v.clone()).collect();
        let ranked = rank_descending_by_cosine(&query_vector, &candidates);

        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(idx, score)| entries[idx].0.clone().with_score(score))
            .collect())
    }
}
