use std::sync::Arc;

use crate::core::errors::HistoryError;

use super::{HistoryEntry, HistoryStore, RemoteHistoryLog};

/// Writes a finished exchange to the local store and, when configured, the
/// remote log. Only the local write can fail a run.
#[derive(Clone)]
pub struct HistoryRecorder {
    local: Arc<dyn HistoryStore>,
    remote: Option<Arc<dyn RemoteHistoryLog>>,
}

impl HistoryRecorder {
    pub fn new(local: Arc<dyn HistoryStore>, remote: Option<Arc<dyn RemoteHistoryLog>>) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &Arc<dyn HistoryStore> {
        &self.local
    }

    /// Name of the remote log, if one is active.
    pub fn remote_name(&self) -> Option<&str> {
        self.remote.as_ref().map(|remote| remote.name())
    }

    pub async fn record(
        &self,
        user_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<HistoryEntry, HistoryError> {
        let entry = HistoryEntry::new(user_id, question, answer);

        self.local.append(user_id, question, answer).await?;

        if let Some(remote) = &self.remote {
            if let Err(err) = remote.append(&entry).await {
                tracing::warn!(
                    "Remote history log '{}' failed for user {}: {}",
                    remote.name(),
                    user_id,
                    err
                );
            }
        }

        Ok(entry)
    }
}
