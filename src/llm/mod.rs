pub mod azure_openai;
pub mod provider;
pub mod types;


pub use azure_openai::AzureOpenAiGateway;
pub use provider::LlmGateway;
pub use types::{ResponseSchema, RouteDecision, TextResponse};
