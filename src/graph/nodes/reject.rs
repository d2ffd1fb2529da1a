// Reject Node
// Fixed refusal for questions the router turned down

use async_trait::async_trait;

use crate::graph::node::{Node, NodeContext, NodeOutput, StageFailure, StageId};
use crate::graph::prompts::REFUSAL_MESSAGE;
use crate::graph::state::ConversationState;

pub struct RejectNode;

impl RejectNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RejectNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RejectNode {
    fn id(&self) -> StageId {
        StageId::Reject
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, StageFailure> {
        tracing::info!("Run {}: question rejected", ctx.run_id);
        state.set_answer(REFUSAL_MESSAGE, None)?;
        Ok(NodeOutput::Continue)
    }
}
