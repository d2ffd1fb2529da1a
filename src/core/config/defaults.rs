pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_RESPONSES_API_VERSION: &str = "2025-03-01-preview";
pub const DEFAULT_EMBEDDINGS_API_VERSION: &str = "2024-12-01-preview";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.0;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_TOP_K: usize = 2;
pub const DEFAULT_PINECONE_INDEX: &str = "alexandria-embeddings2";
pub const DEFAULT_PINECONE_CONTROL_PLANE: &str = "https://api.pinecone.io";
pub const DEFAULT_PINECONE_TEXT_KEY: &str = "text";

pub const DEFAULT_HISTORY_PATH: &str = "data/silver/chat_history.json";
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Sheet names tried in order when appending a remote log row.
pub fn default_sheet_candidates() -> Vec<String> {
    ["Sheet1", "sheets1", "Hoja1", "Logs"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

pub fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://localhost:8501".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
        "http://127.0.0.1:8501".to_string(),
    ]
}
