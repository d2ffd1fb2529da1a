// Retrieve Node
// Fetches the top-k supporting chunks for an answerable question

use async_trait::async_trait;

use crate::graph::node::{Node, NodeContext, NodeOutput, StageFailure, StageId};
use crate::graph::state::ConversationState;

pub struct RetrieveNode;

impl RetrieveNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RetrieveNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RetrieveNode {
    fn id(&self) -> StageId {
        StageId::Retrieve
    }

    fn name(&self) -> &'static str {
        "Document Retrieval"
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, StageFailure> {
        let k = ctx.services.top_k;
        let mut chunks = ctx
            .services
            .retriever
            .search(state.user_question(), k)
            .await?;

        // Backends promise both; hold them to it.
        chunks.sort_by(|a, b| b.score.total_cmp(&a.score));
        chunks.truncate(k);

        tracing::info!(
            "Run {}: retrieved {} chunk(s) from {} (k={})",
            ctx.run_id,
            chunks.len(),
            ctx.services.retriever.name(),
            k
        );
        state.set_retrieved_chunks(chunks)?;
        Ok(NodeOutput::Continue)
    }
}
