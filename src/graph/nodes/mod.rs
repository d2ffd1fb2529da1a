// Graph Nodes Module
// One node per conversation stage

pub mod answer;
pub mod history;
pub mod reject;
pub mod retrieve;
pub mod router;

#[cfg(test)]
pub(crate) mod test_support;

pub use answer::{select_attachment, AnswerNode};
pub use history::HistoryNode;
pub use reject::RejectNode;
pub use retrieve::RetrieveNode;
pub use router::RouterNode;
