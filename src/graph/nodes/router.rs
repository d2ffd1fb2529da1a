// Router Node
// Entry point that asks the LLM whether the question can be answered

use async_trait::async_trait;

use crate::graph::node::{Branch, Node, NodeContext, NodeOutput, StageFailure, StageId};
use crate::graph::prompts::router_input;
use crate::graph::state::ConversationState;

pub struct RouterNode;

impl RouterNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RouterNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RouterNode {
    fn id(&self) -> StageId {
        StageId::Router
    }

    fn name(&self) -> &'static str {
        "Question Router"
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, StageFailure> {
        let prompts = &ctx.services.prompts;
        let answerable = ctx
            .services
            .llm
            .complete_bool(prompts.router(), &router_input(state.user_question()))
            .await?;

        state.set_answerable(answerable);

        let branch = Branch::from_answerable(answerable);
        tracing::info!(
            "Run {}: router classified question as {:?}",
            ctx.run_id,
            branch
        );
        Ok(NodeOutput::Branch(branch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::core::errors::LlmError;
    use crate::graph::nodes::test_support::*;
    use crate::graph::state::{ConversationRequest, LearningStyle};
    use crate::llm::ResponseSchema;

    fn state(question: &str) -> ConversationState {
        ConversationState::new(ConversationRequest::new("u", question, LearningStyle::None))
    }

    #[tokio::test]
    async fn positive_classification_branches_to_answerable() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedLlm::new(true, ""));
        let (services, _) = services(llm.clone(), Arc::new(StaticRetriever::new(vec![])), &dir);
        let mut s = state("¿Qué es la fotosíntesis?");

        let out = RouterNode::new().execute(&mut s, &context(&services)).await.unwrap();

        assert_eq!(out, NodeOutput::Branch(Branch::Answerable));
        assert!(s.question_is_answerable());
        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[0].1, "Responde a la siguiente pregunta: ¿Qué es la fotosíntesis?");
        assert_eq!(calls[0].2, ResponseSchema::Boolean);
    }

    #[tokio::test]
    async fn negative_classification_branches_to_unanswerable() {
        let dir = tempfile::tempdir().unwrap();
        let (services, _) = services(
            Arc::new(ScriptedLlm::new(false, "")),
            Arc::new(StaticRetriever::new(vec![])),
            &dir,
        );
        let mut s = state("¿Cuándo fue la última vez que llovió en mi casa?");

        let out = RouterNode::new().execute(&mut s, &context(&services)).await.unwrap();

        assert_eq!(out, NodeOutput::Branch(Branch::Unanswerable));
        assert!(!s.question_is_answerable());
    }

    #[tokio::test]
    async fn llm_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (services, _) = services(
            Arc::new(ScriptedLlm::failing_route(LlmError::SchemaValidation(
                "missing response".into(),
            ))),
            Arc::new(StaticRetriever::new(vec![])),
            &dir,
        );

        let err = RouterNode::new()
            .execute(&mut state("q"), &context(&services))
            .await
            .unwrap_err();

        assert!(matches!(err, StageFailure::Llm(LlmError::SchemaValidation(_))));
    }
}
