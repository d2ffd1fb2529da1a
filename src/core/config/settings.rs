//! Typed view of the merged `config.yml` + `secrets.yaml` document.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub history: HistoryConfig,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Azure OpenAI resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub chat_deployment: String,
    pub embedding_deployment: String,
    pub responses_api_version: String,
    pub embeddings_api_version: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            chat_deployment: String::new(),
            embedding_deployment: String::new(),
            responses_api_version: DEFAULT_RESPONSES_API_VERSION.to_string(),
            embeddings_api_version: DEFAULT_EMBEDDINGS_API_VERSION.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrieverBackend {
    #[default]
    Pinecone,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub backend: RetrieverBackend,
    pub top_k: usize,
    pub pinecone: PineconeConfig,
    pub memory: MemoryCorpusConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: RetrieverBackend::default(),
            top_k: DEFAULT_TOP_K,
            pinecone: PineconeConfig::default(),
            memory: MemoryCorpusConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeConfig {
    pub api_key: Option<String>,
    pub index_name: String,
    /// Data-plane host of the index. Resolved from the control plane when absent.
    pub host: Option<String>,
    pub control_plane_url: String,
    /// Metadata key holding the chunk text.
    pub text_key: String,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: DEFAULT_PINECONE_INDEX.to_string(),
            host: None,
            control_plane_url: DEFAULT_PINECONE_CONTROL_PLANE.to_string(),
            text_key: DEFAULT_PINECONE_TEXT_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryCorpusConfig {
    /// JSON file of pre-embedded chunks loaded at startup.
    pub corpus_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub local_path: PathBuf,
    pub remote: Option<RemoteHistoryConfig>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            local_path: PathBuf::from(DEFAULT_HISTORY_PATH),
            remote: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteHistoryConfig {
    pub spreadsheet_id: String,
    pub access_token: Option<String>,
    pub sheet_candidates: Vec<String>,
    pub base_url: String,
}

impl Default for RemoteHistoryConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            access_token: None,
            sheet_candidates: default_sheet_candidates(),
            base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory whose prompt files override the built-in templates.
    pub dir: Option<PathBuf>,
}
