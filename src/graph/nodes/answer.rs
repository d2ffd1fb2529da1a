// Answer Node
// Generates the answer from retrieved context and picks a media attachment

use async_trait::async_trait;

use crate::graph::node::{Node, NodeContext, NodeOutput, StageFailure, StageId};
use crate::graph::prompts::answer_input;
use crate::graph::state::ConversationState;
use crate::rag::DocumentChunk;

const MEDIA_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".mp4", ".mov"];

pub struct AnswerNode;

impl AnswerNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnswerNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for AnswerNode {
    fn id(&self) -> StageId {
        StageId::Answer
    }

    fn name(&self) -> &'static str {
        "Answer Synthesis"
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, StageFailure> {
        let chunks = state.retrieved_chunks();
        let context = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let style = state.learning_style();
        let instructions = ctx.services.prompts.for_style(style);

        let text = ctx
            .services
            .llm
            .complete_text(instructions, &answer_input(&context, state.user_question()))
            .await?;
        let attachment = select_attachment(chunks);

        tracing::info!(
            "Run {}: answered with {} template from {} chunk(s), attachment={}",
            ctx.run_id,
            style.as_str(),
            chunks.len(),
            attachment.is_some()
        );

        state.set_answer(text, attachment)?;
        Ok(NodeOutput::Continue)
    }
}

/// URL of the first chunk that looks like an image or video.
///
/// A chunk qualifies when it has a URL and either its content type is
/// `image/*`/`video/*` or its name carries a media extension. The name check
/// will also match a non-media file that happens to be named `*.png`.
pub fn select_attachment(chunks: &[DocumentChunk]) -> Option<String> {
    chunks.iter().find_map(|chunk| {
        let meta = &chunk.metadata;
        let url = meta.url.as_deref().filter(|u| !u.trim().is_empty())?;

        let media_type = meta
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("image/") || ct.contains("video/"));
        let media_name = meta.name.as_deref().is_some_and(|name| {
            let lower = name.to_lowercase();
            MEDIA_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        });

        (media_type || media_name).then(|| url.to_string())
    })
}
