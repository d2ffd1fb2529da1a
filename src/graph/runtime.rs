// Graph Runtime - petgraph based
// Type-safe execution engine for the conversation stages

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use super::node::{
    Branch, GraphError, GraphServices, Node, NodeContext, NodeOutput, StageFailure, StageId,
};
use super::state::{ConversationRequest, ConversationState};

/// Edge condition for graph routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeCondition {
    /// Followed on `NodeOutput::Continue`
    Always,
    /// Followed when the stage returns this branch
    On(Branch),
}

impl EdgeCondition {
    pub fn matches(&self, branch: Option<Branch>) -> bool {
        match (self, branch) {
            (EdgeCondition::Always, None) => true,
            (EdgeCondition::On(expected), Some(actual)) => *expected == actual,
            _ => false,
        }
    }
}

/// petgraph-based conversation graph
pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, EdgeCondition>,
    node_indices: HashMap<StageId, NodeIndex>,
    entry: Option<StageId>,
}

impl GraphRuntime {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry: None,
        }
    }

    pub fn add_node(&mut self, node: Box<dyn Node>) -> Result<NodeIndex, GraphError> {
        let id = node.id();
        if self.node_indices.contains_key(&id) {
            return Err(GraphError::structural(format!("Duplicate stage: {}", id)));
        }
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
        Ok(index)
    }

    pub fn add_edge(
        &mut self,
        from: StageId,
        to: StageId,
        condition: EdgeCondition,
    ) -> Result<(), GraphError> {
        let from_idx = self.index_of(from)?;
        let to_idx = self.index_of(to)?;

        let clash = self
            .graph
            .edges_directed(from_idx, Direction::Outgoing)
            .any(|edge| *edge.weight() == condition);
        if clash {
            return Err(GraphError::structural(format!(
                "Stage {} already has an edge for {:?}",
                from, condition
            )));
        }

        self.graph.add_edge(from_idx, to_idx, condition);
        Ok(())
    }

    fn index_of(&self, stage: StageId) -> Result<NodeIndex, GraphError> {
        self.node_indices
            .get(&stage)
            .copied()
            .ok_or_else(|| GraphError::structural(format!("Stage not in graph: {}", stage)))
    }

    pub fn entry(&self) -> Option<StageId> {
        self.entry
    }

    pub fn stage_ids(&self) -> Vec<StageId> {
        let mut ids: Vec<StageId> = self.node_indices.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Every edge as (from, to, condition), sorted for stable comparison.
    pub fn transitions(&self) -> Vec<(StageId, StageId, EdgeCondition)> {
        let mut edges: Vec<(StageId, StageId, EdgeCondition)> = self
            .graph
            .edge_references()
            .map(|edge| {
                (
                    self.graph[edge.source()].id(),
                    self.graph[edge.target()].id(),
                    *edge.weight(),
                )
            })
            .collect();
        edges.sort_by_key(|(from, to, _)| (*from, *to));
        edges
    }

    /// Runs one conversation from the entry stage to completion.
    pub async fn invoke(
        &self,
        request: ConversationRequest,
        services: &GraphServices,
    ) -> Result<ConversationState, GraphError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut state = ConversationState::new(request);
        let ctx = NodeContext {
            services,
            run_id: &run_id,
        };

        tracing::debug!("Run {} started for user {}", run_id, state.user_id());
        match self.run(&mut state, &ctx).await {
            Ok(()) => Ok(state),
            Err(err) => {
                tracing::error!("Run {} failed: {}", run_id, err);
                Err(err)
            }
        }
    }

    /// Execute the graph against `state`.
    pub async fn run(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<(), GraphError> {
        let entry = self
            .entry
            .ok_or_else(|| GraphError::structural("No entry stage set"))?;
        let mut current_idx = self.index_of(entry)?;

        let mut visited: HashSet<StageId> = HashSet::new();
        let mut trace: Vec<StageId> = Vec::new();

        loop {
            let node = &self.graph[current_idx];
            let stage = node.id();
            trace.push(stage);

            if !visited.insert(stage) {
                return Err(GraphError::new(
                    stage,
                    StageFailure::Runtime(format!("Stage {} revisited", stage)),
                )
                .with_trace(trace));
            }

            tracing::debug!("Run {}: executing stage {} (step {})", ctx.run_id, stage, trace.len());

            let output = match node.execute(state, ctx).await {
                Ok(output) => output,
                Err(failure) => {
                    return Err(GraphError::new(stage, failure).with_trace(trace));
                }
            };

            match output {
                NodeOutput::Final => {
                    if state.answer_text().is_none() {
                        return Err(GraphError::new(
                            stage,
                            StageFailure::Runtime(
                                "Run finished without an answer".to_string(),
                            ),
                        )
                        .with_trace(trace));
                    }
                    tracing::debug!("Run {} complete at stage {}", ctx.run_id, stage);
                    return Ok(());
                }
                NodeOutput::Continue => {
                    current_idx = self
                        .resolve_next(current_idx, None)
                        .map_err(|e| e.with_trace(trace.clone()))?;
                }
                NodeOutput::Branch(branch) => {
                    current_idx = self
                        .resolve_next(current_idx, Some(branch))
                        .map_err(|e| e.with_trace(trace.clone()))?;
                }
            }
        }
    }

    /// Exactly one outgoing edge must match; there is no default fallback.
    fn resolve_next(
        &self,
        current_idx: NodeIndex,
        branch: Option<Branch>,
    ) -> Result<NodeIndex, GraphError> {
        let current = self.graph[current_idx].id();

        self.graph
            .edges_directed(current_idx, Direction::Outgoing)
            .find(|edge| edge.weight().matches(branch))
            .map(|edge| edge.target())
            .ok_or_else(|| {
                GraphError::new(
                    current,
                    StageFailure::Runtime(format!(
                        "No edge from {} for {:?}",
                        current, branch
                    )),
                )
            })
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing graphs fluently
pub struct GraphBuilder {
    nodes: Vec<Box<dyn Node>>,
    edges: Vec<(StageId, StageId, EdgeCondition)>,
    entry: Option<StageId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            entry: None,
        }
    }

    pub fn entry(mut self, stage: StageId) -> Self {
        self.entry = Some(stage);
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn edge(mut self, from: StageId, to: StageId) -> Self {
        self.edges.push((from, to, EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(mut self, from: StageId, to: StageId, branch: Branch) -> Self {
        self.edges.push((from, to, EdgeCondition::On(branch)));
        self
    }

    /// Fails on duplicate stages, dangling edges, a missing entry or a cycle.
    pub fn build(self) -> Result<GraphRuntime, GraphError> {
        let mut runtime = GraphRuntime::new();
        for node in self.nodes {
            runtime.add_node(node)?;
        }
        for (from, to, condition) in self.edges {
            runtime.add_edge(from, to, condition)?;
        }

        let entry = self
            .entry
            .ok_or_else(|| GraphError::structural("No entry stage set"))?;
        runtime.index_of(entry)?;
        runtime.entry = Some(entry);

        if runtime.has_cycle() {
            return Err(GraphError::structural("Graph contains a cycle"));
        }
        Ok(runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(StageId, NodeOutput);

    #[async_trait]
    impl Node for Fixed {
        fn id(&self) -> StageId {
            self.0
        }

        async fn execute(
            &self,
            _state: &mut ConversationState,
            _ctx: &NodeContext<'_>,
        ) -> Result<NodeOutput, StageFailure> {
            Ok(self.1)
        }
    }

    #[test]
    fn test_edge_condition_matching() {
        assert!(EdgeCondition::Always.matches(None));
        assert!(!EdgeCondition::Always.matches(Some(Branch::Answerable)));

        let answerable = EdgeCondition::On(Branch::Answerable);
        assert!(answerable.matches(Some(Branch::Answerable)));
        assert!(!answerable.matches(Some(Branch::Unanswerable)));
        assert!(!answerable.matches(None));
    }

    #[test]
    fn cycles_are_rejected_at_build_time() {
        let result = GraphBuilder::new()
            .entry(StageId::Router)
            .node(Box::new(Fixed(StageId::Router, NodeOutput::Continue)))
            .node(Box::new(Fixed(StageId::History, NodeOutput::Continue)))
            .edge(StageId::Router, StageId::History)
            .conditional_edge(StageId::History, StageId::Router, Branch::Answerable)
            .build();
        assert!(matches!(result, Err(GraphError { stage: None, .. })));
    }

    #[test]
    fn dangling_edge_and_missing_entry_are_rejected() {
        let dangling = GraphBuilder::new()
            .entry(StageId::Router)
            .node(Box::new(Fixed(StageId::Router, NodeOutput::Continue)))
            .edge(StageId::Router, StageId::Answer)
            .build();
        assert!(dangling.is_err());

        let no_entry = GraphBuilder::new()
            .node(Box::new(Fixed(StageId::Router, NodeOutput::Final)))
            .build();
        assert!(no_entry.is_err());
    }

    #[test]
    fn duplicate_stage_is_rejected() {
        let result = GraphBuilder::new()
            .entry(StageId::Router)
            .node(Box::new(Fixed(StageId::Router, NodeOutput::Final)))
            .node(Box::new(Fixed(StageId::Router, NodeOutput::Final)))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn transitions_are_listed() {
        let runtime = GraphBuilder::new()
            .entry(StageId::Router)
            .node(Box::new(Fixed(StageId::Router, NodeOutput::Continue)))
            .node(Box::new(Fixed(StageId::Reject, NodeOutput::Final)))
            .conditional_edge(StageId::Router, StageId::Reject, Branch::Unanswerable)
            .build()
            .unwrap();

        assert_eq!(
            runtime.transitions(),
            vec![(
                StageId::Router,
                StageId::Reject,
                EdgeCondition::On(Branch::Unanswerable)
            )]
        );
        assert_eq!(runtime.entry(), Some(StageId::Router));
    }
}
