// Alexandria Graph Module
// State-machine orchestration of a single conversation turn

pub mod builder;
pub mod node;
pub mod nodes;
pub mod prompts;
pub mod runtime;
pub mod state;

pub use builder::build_assistant_graph;
pub use node::{Branch, GraphError, GraphServices, Node, NodeContext, NodeOutput, StageFailure, StageId};
pub use prompts::{PromptSet, REFUSAL_MESSAGE};
pub use runtime::{EdgeCondition, GraphBuilder, GraphRuntime};
pub use state::{ConversationRequest, ConversationState, LearningStyle, StateError};
