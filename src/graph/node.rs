// Node trait and types
// Base abstraction for conversation stages

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::core::errors::{ApiError, HistoryError, LlmError, RetrievalError};
use crate::history::HistoryRecorder;
use crate::llm::LlmGateway;
use crate::rag::Retriever;

use super::prompts::PromptSet;
use super::state::{ConversationState, StateError};

/// Closed set of stages a run can visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    Router,
    Retrieve,
    Answer,
    Reject,
    History,
}

impl StageId {
    pub const ALL: [StageId; 5] = [
        StageId::Router,
        StageId::Retrieve,
        StageId::Answer,
        StageId::Reject,
        StageId::History,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Router => "router",
            StageId::Retrieve => "retrieve",
            StageId::Answer => "answer",
            StageId::Reject => "reject",
            StageId::History => "history",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Router decision carried on conditional edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Answerable,
    Unanswerable,
}

impl Branch {
    pub fn from_answerable(answerable: bool) -> Self {
        if answerable {
            Branch::Answerable
        } else {
            Branch::Unanswerable
        }
    }
}

/// Output from a stage execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutput {
    /// Follow the single unconditional edge
    Continue,
    /// Follow the edge labelled with this branch
    Branch(Branch),
    /// Run complete
    Final,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StageFailure {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Storage(#[from] HistoryError),
    #[error("{0}")]
    Runtime(String),
}

impl From<StateError> for StageFailure {
    fn from(err: StateError) -> Self {
        StageFailure::Runtime(err.to_string())
    }
}

impl StageFailure {
    /// True when an upstream service was unreachable or answered badly.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            StageFailure::Llm(LlmError::Transport(_) | LlmError::SchemaValidation(_))
                | StageFailure::Retrieval(
                    RetrievalError::Transport(_)
                        | RetrievalError::Embedding(
                            LlmError::Transport(_) | LlmError::SchemaValidation(_)
                        )
                )
        )
    }
}

/// Graph execution error
///
/// `stage` is `None` for structural problems found outside any stage
/// (building the graph, resolving edges). `execution_trace` lists the stages
/// entered before the failure, failing stage last.
#[derive(Debug, Clone)]
pub struct GraphError {
    pub stage: Option<StageId>,
    pub failure: StageFailure,
    pub execution_trace: Vec<StageId>,
}

impl GraphError {
    pub fn new(stage: StageId, failure: impl Into<StageFailure>) -> Self {
        Self {
            stage: Some(stage),
            failure: failure.into(),
            execution_trace: Vec::new(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self {
            stage: None,
            failure: StageFailure::Runtime(message.into()),
            execution_trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<StageId>) -> Self {
        self.execution_trace = trace;
        self
    }

    fn location(&self) -> String {
        let stage = self.stage.map(|s| s.as_str()).unwrap_or("graph");
        if self.execution_trace.is_empty() {
            stage.to_string()
        } else {
            let trace: Vec<&str> = self.execution_trace.iter().map(|s| s.as_str()).collect();
            format!("{} (trace: {})", stage, trace.join(" -> "))
        }
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphError in {}: {}", self.location(), self.failure)
    }
}

impl std::error::Error for GraphError {}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        let message = format!("Graph error in {}: {}", err.location(), err.failure);
        if err.failure.is_upstream() {
            ApiError::BadGateway(message)
        } else {
            ApiError::Internal(message)
        }
    }
}

/// Shared, read-only collaborators of every run.
#[derive(Clone)]
pub struct GraphServices {
    pub llm: Arc<dyn LlmGateway>,
    pub retriever: Arc<dyn Retriever>,
    pub history: HistoryRecorder,
    pub prompts: Arc<PromptSet>,
    pub top_k: usize,
}

/// Context passed to stages during execution
pub struct NodeContext<'a> {
    pub services: &'a GraphServices,
    /// Correlates the log lines of one run
    pub run_id: &'a str,
}

/// Node trait - every stage implements this
#[async_trait]
pub trait Node: Send + Sync {
    fn id(&self) -> StageId;

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id().as_str()
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, StageFailure>;
}
