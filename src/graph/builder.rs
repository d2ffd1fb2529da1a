// Graph Builder
// Constructs the conversation graph using petgraph

use super::node::{Branch, GraphError, StageId};
use super::nodes::{AnswerNode, HistoryNode, RejectNode, RetrieveNode, RouterNode};
use super::runtime::{GraphBuilder, GraphRuntime};

/// Router -> {Retrieve -> Answer | Reject} -> History
pub fn build_assistant_graph() -> Result<GraphRuntime, GraphError> {
    let runtime = GraphBuilder::new()
        .entry(StageId::Router)
        .node(Box::new(RouterNode::new()))
        .node(Box::new(RetrieveNode::new()))
        .node(Box::new(AnswerNode::new()))
        .node(Box::new(RejectNode::new()))
        .node(Box::new(HistoryNode::new()))
        .conditional_edge(StageId::Router, StageId::Retrieve, Branch::Answerable)
        .conditional_edge(StageId::Router, StageId::Reject, Branch::Unanswerable)
        .edge(StageId::Retrieve, StageId::Answer)
        .edge(StageId::Answer, StageId::History)
        .edge(StageId::Reject, StageId::History)
        .build()?;

    let present = runtime.stage_ids();
    if let Some(missing) = StageId::ALL.iter().find(|s| !present.contains(s)) {
        return Err(GraphError::structural(format!("Stage missing from graph: {}", missing)));
    }
    Ok(runtime)
}
