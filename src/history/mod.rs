//! Conversation history persistence.
//!
//! The local store is the system of record; the remote log is a best-effort
//! copy for people who review conversations outside the app.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::core::errors::HistoryError;

mod json_store;
mod recorder;
mod sheets;

pub use json_store::JsonHistoryStore;
pub use recorder::HistoryRecorder;
pub use sheets::SheetsHistoryLog;

/// One persisted question/answer pair in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub message: String,
    pub response: String,
}

/// A history record as produced by the history stage.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Local>,
    pub user_id: String,
    pub question: String,
    pub answer: String,
}

impl HistoryEntry {
    pub fn new(user_id: &str, question: &str, answer: &str) -> Self {
        Self {
            timestamp: Local::now(),
            user_id: user_id.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }
}

/// Durable per-user history, append-only from the core's point of view.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, user_id: &str, question: &str, answer: &str)
        -> Result<(), HistoryError>;

    /// Last `min(n, total)` entries for the user, most recent first.
    async fn read_recent(&self, user_id: &str, n: usize)
        -> Result<Vec<HistoryMessage>, HistoryError>;

    /// Removes the last `min(n, total)` entries and returns how many went.
    async fn delete_recent(&self, user_id: &str, n: usize) -> Result<usize, HistoryError>;
}

/// Secondary history sink whose failures never fail a run.
#[async_trait]
pub trait RemoteHistoryLog: Send + Sync {
    fn name(&self) -> &str;

    async fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError>;
}
