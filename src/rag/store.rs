//! Retriever trait: the interface over vector index backends.
//!
//! The graph only ever sees ranked `DocumentChunk`s; how the index embeds,
//! stores and scores them is the implementation's business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::RetrievalError;

/// Provenance of a chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    /// MIME type tagged at ingestion, when known (e.g. `image/png`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Any other keys the index stored alongside the chunk.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChunkMetadata {
    /// Builds metadata from a loosely typed map as returned by vector indexes,
    /// where numbers may arrive as floats and pages as strings.
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        Self {
            name: take_string(&mut map, "name"),
            page_number: take_u32(&mut map, "page_number"),
            url: take_string(&mut map, "url"),
            total_pages: take_u32(&mut map, "total_pages"),
            source_type: take_string(&mut map, "source_type")
                .or_else(|| take_string(&mut map, "source")),
            content_type: take_string(&mut map, "content_type")
                .or_else(|| take_string(&mut map, "mime_type")),
            extra: map,
        }
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key)? {
        Value::String(text) => Some(text),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn take_u32(map: &mut Map<String, Value>, key: &str) -> Option<u32> {
    let value = map.remove(key)?;
    match &value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// A ranked retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Similarity score (higher = better).
    #[serde(default)]
    pub score: f32,
}

impl DocumentChunk {
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
            score: 0.0,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }
}

/// Abstract trait for similarity-search backends.
///
/// Implementations must return at most `k` chunks ordered by descending
/// similarity. An empty result is a valid answer, not an error.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>, RetrievalError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_map_coerces_loose_numbers_and_keeps_extras() {
        let map = json!({
            "name": "Manual.pdf",
            "page_number": 3.0,
            "total_pages": "12",
            "url": "https://drive/x",
            "source": "drive",
            "folder": "alexandria"
        });
        let Value::Object(map) = map else { unreachable!() };

        let metadata = ChunkMetadata::from_map(map);

        assert_eq!(metadata.name.as_deref(), Some("Manual.pdf"));
        assert_eq!(metadata.page_number, Some(3));
        assert_eq!(metadata.total_pages, Some(12));
        assert_eq!(metadata.source_type.as_deref(), Some("drive"));
        assert_eq!(metadata.content_type, None);
        assert_eq!(metadata.extra.get("folder"), Some(&json!("alexandria")));
    }

    #[test]
    fn metadata_serializes_flat() {
        let mut extra = Map::new();
        extra.insert("folder".to_string(), json!("a"));
        let metadata = ChunkMetadata {
            name: Some("diagram.png".to_string()),
            url: Some("https://x/diagram.png".to_string()),
            extra,
            ..Default::default()
        };

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(
            value,
            json!({ "name": "diagram.png", "url": "https://x/diagram.png", "folder": "a" })
        );
    }
}
