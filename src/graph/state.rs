// Graph State
// ConversationState threaded through every stage of a run

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::rag::DocumentChunk;

/// How the user prefers to learn; picks the answer template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    #[default]
    None,
    Kinesthetic,
    Visual,
}

impl LearningStyle {
    /// Accepts the UI labels ("Kinestésico", "Visual") and the English names.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "kinestésico" | "kinestesico" | "kinesthetic" | "1" => LearningStyle::Kinesthetic,
            "visual" | "2" => LearningStyle::Visual,
            _ => LearningStyle::None,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => LearningStyle::Kinesthetic,
            2 => LearningStyle::Visual,
            _ => LearningStyle::None,
        }
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(label) => Self::from_label(label),
            Value::Number(n) => n.as_i64().map(Self::from_code).unwrap_or_default(),
            _ => LearningStyle::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LearningStyle::None => "none",
            LearningStyle::Kinesthetic => "kinesthetic",
            LearningStyle::Visual => "visual",
        }
    }
}

/// Caller-supplied inputs of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRequest {
    pub user_id: String,
    pub question: String,
    pub learning_style: LearningStyle,
}

impl ConversationRequest {
    pub fn new(
        user_id: impl Into<String>,
        question: impl Into<String>,
        learning_style: LearningStyle,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            question: question.into(),
            learning_style,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("answer was already set for this run")]
    AnswerAlreadySet,
    #[error("retrieved chunks were already set for this run")]
    ChunksAlreadySet,
}

/// Typed record owned by one run.
///
/// `user_id`, `user_question` and `learning_style` are fixed at creation.
/// The answer can be written once; retrieval results distinguish "never
/// ran" (`None`) from "ran and found nothing" (empty).
#[derive(Debug, Clone)]
pub struct ConversationState {
    user_id: String,
    user_question: String,
    learning_style: LearningStyle,
    question_is_answerable: bool,
    retrieved_chunks: Option<Vec<DocumentChunk>>,
    answer_text: Option<String>,
    answer_attachment_url: Option<String>,
}

impl ConversationState {
    pub fn new(request: ConversationRequest) -> Self {
        Self {
            user_id: request.user_id,
            user_question: request.question,
            learning_style: request.learning_style,
            question_is_answerable: false,
            retrieved_chunks: None,
            answer_text: None,
            answer_attachment_url: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn user_question(&self) -> &str {
        &self.user_question
    }

    pub fn learning_style(&self) -> LearningStyle {
        self.learning_style
    }

    pub fn question_is_answerable(&self) -> bool {
        self.question_is_answerable
    }

    pub fn set_answerable(&mut self, answerable: bool) {
        self.question_is_answerable = answerable;
    }

    pub fn retrieval_ran(&self) -> bool {
        self.retrieved_chunks.is_some()
    }

    pub fn retrieved_chunks(&self) -> &[DocumentChunk] {
        self.retrieved_chunks.as_deref().unwrap_or(&[])
    }

    pub fn set_retrieved_chunks(&mut self, chunks: Vec<DocumentChunk>) -> Result<(), StateError> {
        if self.retrieved_chunks.is_some() {
            return Err(StateError::ChunksAlreadySet);
        }
        self.retrieved_chunks = Some(chunks);
        Ok(())
    }

    pub fn answer_text(&self) -> Option<&str> {
        self.answer_text.as_deref()
    }

    pub fn answer_attachment_url(&self) -> Option<&str> {
        self.answer_attachment_url.as_deref()
    }

    pub fn set_answer(
        &mut self,
        text: impl Into<String>,
        attachment_url: Option<String>,
    ) -> Result<(), StateError> {
        if self.answer_text.is_some() {
            return Err(StateError::AnswerAlreadySet);
        }
        self.answer_text = Some(text.into());
        self.answer_attachment_url = attachment_url;
        Ok(())
    }
}
