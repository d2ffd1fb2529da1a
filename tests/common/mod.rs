#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use alexandria_backend::core::errors::{HistoryError, LlmError, RetrievalError};
use alexandria_backend::graph::{GraphServices, PromptSet};
use alexandria_backend::history::{
    HistoryEntry, HistoryMessage, HistoryRecorder, HistoryStore, JsonHistoryStore, RemoteHistoryLog,
};
use alexandria_backend::llm::{LlmGateway, ResponseSchema};
use alexandria_backend::rag::{ChunkMetadata, DocumentChunk, Retriever};

/// Routes questions containing `answerable_marker` to the answer path and
/// echoes the question back as the answer.
pub struct FakeLlm {
    pub answerable_marker: String,
    pub route_error: Option<LlmError>,
    pub answer_error: Option<LlmError>,
    pub calls: Mutex<Vec<ResponseSchema>>,
}

impl FakeLlm {
    pub fn answering(marker: &str) -> Self {
        Self {
            answerable_marker: marker.to_string(),
            route_error: None,
            answer_error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            route_error: Some(LlmError::Transport("connection refused".to_string())),
            ..Self::answering("")
        }
    }

    /// Routes like `answering` but the answer call fails.
    pub fn failing_answers(marker: &str) -> Self {
        Self {
            answer_error: Some(LlmError::Transport("read timed out".to_string())),
            ..Self::answering(marker)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmGateway for FakeLlm {
    fn name(&self) -> &str {
        "fake"
    }

    async fn structured_complete(
        &self,
        _instructions: &str,
        input: &str,
        schema: ResponseSchema,
    ) -> Result<Value, LlmError> {
        self.calls.lock().unwrap().push(schema);
        match schema {
            ResponseSchema::Boolean => match &self.route_error {
                Some(err) => Err(err.clone()),
                None => Ok(json!({ "response": input.contains(&self.answerable_marker) })),
            },
            ResponseSchema::Text => {
                if let Some(err) = &self.answer_error {
                    return Err(err.clone());
                }
                let question = input
                    .rsplit("responde a la pregunta: ")
                    .next()
                    .unwrap_or(input);
                Ok(json!({ "response": format!("Respuesta a: {}", question) }))
            }
        }
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Ok(inputs.iter().map(|_| vec![1.0]).collect())
    }
}

pub struct FakeRetriever {
    pub chunks: Vec<DocumentChunk>,
    pub error: Option<RetrievalError>,
    pub calls: Mutex<usize>,
}

impl FakeRetriever {
    pub fn new(chunks: Vec<DocumentChunk>) -> Self {
        Self {
            chunks,
            error: None,
            calls: Mutex::new(0),
        }
    }

    pub fn down() -> Self {
        Self {
            error: Some(RetrievalError::Transport("index unreachable".to_string())),
            ..Self::new(Vec::new())
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    fn name(&self) -> &str {
        "fake"
    }

    async fn search(&self, _query: &str, k: usize) -> Result<Vec<DocumentChunk>, RetrievalError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        Ok(self.chunks.iter().take(k).cloned().collect())
    }
}

/// Local store whose disk is gone.
pub struct BrokenStore;

#[async_trait]
impl HistoryStore for BrokenStore {
    async fn append(&self, _user_id: &str, _q: &str, _a: &str) -> Result<(), HistoryError> {
        Err(HistoryError::Storage("disk full".to_string()))
    }

    async fn read_recent(&self, _user_id: &str, _n: usize) -> Result<Vec<HistoryMessage>, HistoryError> {
        Err(HistoryError::Storage("disk full".to_string()))
    }

    async fn delete_recent(&self, _user_id: &str, _n: usize) -> Result<usize, HistoryError> {
        Err(HistoryError::Storage("disk full".to_string()))
    }
}

pub struct DownRemoteLog;

#[async_trait]
impl RemoteHistoryLog for DownRemoteLog {
    fn name(&self) -> &str {
        "down"
    }

    async fn append(&self, _entry: &HistoryEntry) -> Result<(), HistoryError> {
        Err(HistoryError::Remote("service unavailable".to_string()))
    }
}

pub fn chunk(content: &str, name: &str, url: &str, score: f32) -> DocumentChunk {
    DocumentChunk::new(
        content,
        ChunkMetadata {
            name: Some(name.to_string()),
            page_number: Some(3),
            url: Some(url.to_string()),
            ..Default::default()
        },
    )
    .with_score(score)
}

pub struct Harness {
    pub services: GraphServices,
    pub store: Arc<JsonHistoryStore>,
    pub llm: Arc<FakeLlm>,
    pub retriever: Arc<FakeRetriever>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub fn with_retriever(mut self, retriever: FakeRetriever) -> Self {
        self.retriever = Arc::new(retriever);
        self.services.retriever = self.retriever.clone();
        self
    }

    /// Replaces the local store the graph writes to; `store` stays readable.
    pub fn with_local(mut self, local: Arc<dyn HistoryStore>) -> Self {
        self.services.history = HistoryRecorder::new(local, None);
        self
    }
}

pub fn harness(llm: FakeLlm, chunks: Vec<DocumentChunk>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        JsonHistoryStore::new(dir.path().join("data/silver/chat_history.json")).unwrap(),
    );
    let llm = Arc::new(llm);
    let retriever = Arc::new(FakeRetriever::new(chunks));
    let remote: Arc<dyn RemoteHistoryLog> = Arc::new(DownRemoteLog);
    let local: Arc<dyn HistoryStore> = store.clone();

    let services = GraphServices {
        llm: llm.clone(),
        retriever: retriever.clone(),
        history: HistoryRecorder::new(local, Some(remote)),
        prompts: Arc::new(PromptSet::default()),
        top_k: 2,
    };

    Harness {
        services,
        store,
        llm,
        retriever,
        dir,
    }
}
