use std::sync::Arc;

use crate::core::config::service::parse_app_config;
use crate::core::config::{AppConfig, AppPaths, ConfigService, RetrieverBackend};
use crate::graph::{build_assistant_graph, GraphRuntime, GraphServices, PromptSet};
use crate::history::{
    HistoryRecorder, HistoryStore, JsonHistoryStore, RemoteHistoryLog, SheetsHistoryLog,
};
use crate::llm::{AzureOpenAiGateway, LlmGateway};
use crate::rag::{MemoryRetriever, PineconeRetriever, Retriever};

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes.
///
/// Holds the typed configuration, the conversation graph and the
/// collaborators every graph run borrows.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub history: Arc<dyn HistoryStore>,
    pub services: GraphServices,
    pub graph_runtime: Arc<GraphRuntime>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Load the merged configuration (logging must already be up)
    /// 2. Connect the LLM gateway and the configured retriever
    /// 3. Open the local history store and the optional remote log
    /// 4. Load prompt templates and build the conversation graph
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config_service = ConfigService::new(paths.clone());
        let raw = config_service
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;
        tracing::info!("Loaded configuration from {}", config_service.config_path().display());
        tracing::debug!(
            "Effective configuration: {}",
            config_service.redact_sensitive_values(&raw)
        );

        let config = parse_app_config(&raw).map_err(|e| InitializationError::Config(e.into()))?;

        Self::from_config(paths, config).await
    }

    pub async fn from_config(
        paths: Arc<AppPaths>,
        config: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let llm: Arc<dyn LlmGateway> = Arc::new(
            AzureOpenAiGateway::new(&config.llm).map_err(|e| InitializationError::Llm(e.into()))?,
        );

        let retriever = build_retriever(&paths, &config, llm.clone())
            .await
            .map_err(|e| InitializationError::Retrieval(e.into()))?;

        let local_path = paths.resolve(&config.history.local_path);
        let history: Arc<dyn HistoryStore> = Arc::new(
            JsonHistoryStore::new(local_path.clone())
                .map_err(|e| InitializationError::History(e.into()))?,
        );
        tracing::info!("Local chat history at {}", local_path.display());

        let remote: Option<Arc<dyn RemoteHistoryLog>> = match &config.history.remote {
            Some(remote_config) => match SheetsHistoryLog::new(remote_config) {
                Ok(log) => {
                    tracing::info!(
                        "Remote history enabled for spreadsheet {}",
                        remote_config.spreadsheet_id
                    );
                    Some(Arc::new(log))
                }
                Err(e) => {
                    tracing::warn!("Remote history disabled: {}", e);
                    None
                }
            },
            None => None,
        };

        let prompts_dir = config.prompts.dir.as_ref().map(|dir| paths.resolve(dir));
        let prompts = PromptSet::load(prompts_dir.as_deref())
            .map_err(|e| InitializationError::Prompts(e.into()))?;

        let graph_runtime =
            Arc::new(build_assistant_graph().map_err(|e| InitializationError::Graph(e.into()))?);

        let services = GraphServices {
            llm,
            retriever,
            history: HistoryRecorder::new(history.clone(), remote),
            prompts: Arc::new(prompts),
            top_k: config.retrieval.top_k,
        };

        Ok(Arc::new(AppState {
            paths,
            config: Arc::new(config),
            history,
            services,
            graph_runtime,
        }))
    }
}

async fn build_retriever(
    paths: &AppPaths,
    config: &AppConfig,
    llm: Arc<dyn LlmGateway>,
) -> Result<Arc<dyn Retriever>, crate::core::errors::RetrievalError> {
    match config.retrieval.backend {
        RetrieverBackend::Pinecone => {
            let retriever = PineconeRetriever::new(&config.retrieval.pinecone, llm)?;
            tracing::info!(
                "Using Pinecone index '{}'",
                config.retrieval.pinecone.index_name
            );
            Ok(Arc::new(retriever))
        }
        RetrieverBackend::Memory => match &config.retrieval.memory.corpus_path {
            Some(path) => Ok(Arc::new(
                MemoryRetriever::from_corpus_file(llm, &paths.resolve(path)).await?,
            )),
            None => {
                tracing::warn!("Memory retriever has no corpus_path; every search returns nothing");
                Ok(Arc::new(MemoryRetriever::new(llm)))
            }
        },
    }
}
