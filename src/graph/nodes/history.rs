// History Node
// Persists the finished exchange before the run ends

use async_trait::async_trait;

use crate::graph::node::{Node, NodeContext, NodeOutput, StageFailure, StageId};
use crate::graph::state::ConversationState;

pub struct HistoryNode;

impl HistoryNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HistoryNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for HistoryNode {
    fn id(&self) -> StageId {
        StageId::History
    }

    fn name(&self) -> &'static str {
        "Chat History"
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, StageFailure> {
        let answer = state.answer_text().ok_or_else(|| {
            StageFailure::Runtime("history reached without an answer".to_string())
        })?;

        let entry = ctx
            .services
            .history
            .record(state.user_id(), state.user_question(), answer)
            .await?;

        tracing::debug!(
            "Run {}: history recorded for {} at {}",
            ctx.run_id,
            entry.user_id,
            entry.timestamp
        );
        Ok(NodeOutput::Final)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::graph::nodes::test_support::*;
    use crate::graph::state::{ConversationRequest, LearningStyle};
    use crate::history::HistoryStore;

    #[tokio::test]
    async fn records_the_answer_locally() {
        let dir = tempfile::tempdir().unwrap();
        let (services, store) = services(
            Arc::new(ScriptedLlm::new(true, "")),
            Arc::new(StaticRetriever::new(vec![])),
            &dir,
        );
        let mut s =
            ConversationState::new(ConversationRequest::new("ana", "¿Qué es?", LearningStyle::None));
        s.set_answer("Una respuesta", None).unwrap();

        let out = HistoryNode::new().execute(&mut s, &context(&services)).await.unwrap();

        assert_eq!(out, NodeOutput::Final);
        let recent = store.read_recent("ana", 1).await.unwrap();
        assert_eq!(recent[0].message, "¿Qué es?");
        assert_eq!(recent[0].response, "Una respuesta");
    }

    #[tokio::test]
    async fn missing_answer_is_a_runtime_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (services, store) = services(
            Arc::new(ScriptedLlm::new(true, "")),
            Arc::new(StaticRetriever::new(vec![])),
            &dir,
        );
        let mut s = ConversationState::new(ConversationRequest::new("ana", "q", LearningStyle::None));

        let err = HistoryNode::new()
            .execute(&mut s, &context(&services))
            .await
            .unwrap_err();

        assert!(matches!(err, StageFailure::Runtime(_)));
        assert!(store.read_recent("ana", 1).await.unwrap().is_empty());
    }
}
