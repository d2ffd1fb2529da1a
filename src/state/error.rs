use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize history store: {0}")]
    History(#[source] anyhow::Error),

    #[error("Failed to initialize retriever: {0}")]
    Retrieval(#[source] anyhow::Error),

    #[error("Failed to load prompt templates: {0}")]
    Prompts(#[source] anyhow::Error),

    #[error("Failed to build conversation graph: {0}")]
    Graph(#[source] anyhow::Error),

    #[error("Failed to initialize LLM gateway: {0}")]
    Llm(#[source] anyhow::Error),
}
