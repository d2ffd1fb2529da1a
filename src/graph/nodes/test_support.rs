// In-crate fakes for stage tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::errors::{LlmError, RetrievalError};
use crate::graph::node::{GraphServices, NodeContext};
use crate::graph::prompts::PromptSet;
use crate::history::{HistoryRecorder, JsonHistoryStore};
use crate::llm::{LlmGateway, ResponseSchema};
use crate::rag::{ChunkMetadata, DocumentChunk, Retriever};

/// Answers the boolean schema with `route` and the text schema with `answer`.
pub struct ScriptedLlm {
    pub route: Result<bool, LlmError>,
    pub answer: Result<String, LlmError>,
    pub calls: Mutex<Vec<(String, String, ResponseSchema)>>,
}

impl ScriptedLlm {
    pub fn new(route: bool, answer: &str) -> Self {
        Self {
            route: Ok(route),
            answer: Ok(answer.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_route(err: LlmError) -> Self {
        Self {
            route: Err(err),
            ..Self::new(false, "")
        }
    }
}

#[async_trait]
impl LlmGateway for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn structured_complete(
        &self,
        instructions: &str,
        input: &str,
        schema: ResponseSchema,
    ) -> Result<Value, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((instructions.to_string(), input.to_string(), schema));
        match schema {
            ResponseSchema::Boolean => self.route.clone().map(|r| json!({ "response": r })),
            ResponseSchema::Text => self.answer.clone().map(|a| json!({ "response": a })),
        }
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Returns a fixed result list (or error) and counts calls.
pub struct StaticRetriever {
    pub result: Result<Vec<DocumentChunk>, RetrievalError>,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl StaticRetriever {
    pub fn new(chunks: Vec<DocumentChunk>) -> Self {
        Self {
            result: Ok(chunks),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: RetrievalError) -> Self {
        Self {
            result: Err(err),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>, RetrievalError> {
        self.calls.lock().unwrap().push((query.to_string(), k));
        self.result.clone()
    }
}

pub fn chunk(content: &str, name: &str, url: Option<&str>, score: f32) -> DocumentChunk {
    DocumentChunk::new(
        content,
        ChunkMetadata {
            name: Some(name.to_string()),
            page_number: Some(1),
            url: url.map(str::to_string),
            ..Default::default()
        },
    )
    .with_score(score)
}

pub fn services(
    llm: Arc<ScriptedLlm>,
    retriever: Arc<StaticRetriever>,
    dir: &tempfile::TempDir,
) -> (GraphServices, Arc<JsonHistoryStore>) {
    let store = Arc::new(JsonHistoryStore::new(dir.path().join("chat_history.json")).unwrap());
    let services = GraphServices {
        llm,
        retriever,
        history: HistoryRecorder::new(store.clone(), None),
        prompts: Arc::new(PromptSet::default()),
        top_k: 2,
    };
    (services, store)
}

pub fn context(services: &GraphServices) -> NodeContext<'_> {
    NodeContext {
        services,
        run_id: "test-run",
    }
}
