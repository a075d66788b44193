//! The authoritative in-memory workflow graph.
//!
//! `GraphModel` owns the live node/edge collections for one editing
//! session. Edge insertion is gated by the cycle policy and branch-slot
//! allocation; configuration updates go through the reconciler. The model
//! knows nothing about persistence — the session snapshots it and hands
//! the snapshot to the autosave coordinator.

use crate::branch;
use crate::cycle;
use crate::edge::{BranchLabel, Edge, EdgeId};
use crate::error::GraphError;
use crate::node::{BlockKind, Node, NodeId};
use crate::snapshot::{GraphSnapshot, SNAPSHOT_VERSION};
use crate::trigger::TriggerMeta;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde_json::Value;
use std::collections::HashMap;

/// The live workflow graph owned by an editor session.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    /// The underlying directed graph.
    graph: DiGraph<Node, Edge>,
    /// Map from NodeId to petgraph's NodeIndex for O(1) lookup.
    node_index_map: HashMap<NodeId, NodeIndex>,
}

impl GraphModel {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a model from a persisted snapshot.
    ///
    /// Edges whose endpoints are missing from the snapshot are dropped.
    #[must_use]
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let mut model = Self::new();
        for node in &snapshot.nodes {
            let id = node.id;
            let index = model.graph.add_node(node.clone());
            model.node_index_map.insert(id, index);
        }
        for edge in &snapshot.edges {
            let (Some(&source), Some(&target)) = (
                model.node_index_map.get(&edge.source),
                model.node_index_map.get(&edge.target),
            ) else {
                continue;
            };
            model.graph.add_edge(source, target, edge.clone());
        }
        model
    }

    /// Adds a node to the graph.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNode` if a node with the same ID is present.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let node_id = node.id;
        if self.node_index_map.contains_key(&node_id) {
            return Err(GraphError::DuplicateNode { node_id });
        }
        let index = self.graph.add_node(node);
        self.node_index_map.insert(node_id, index);
        Ok(node_id)
    }

    /// Removes a node, cascading removal of every edge touching it.
    ///
    /// Removing a trigger node whose metadata is a server-side
    /// Subscription does **not** delete the subscription; callers that
    /// skip `TriggerLifecycle::delete_trigger` leave an orphaned
    /// subscription behind on the server.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let index = self.node_index_map.remove(&node_id)?;
        let removed = self.graph.remove_node(index)?;
        // petgraph backfills the freed slot with the last node; re-point
        // that node's map entry at its new index.
        if let Some(moved) = self.graph.node_weight(index) {
            self.node_index_map.insert(moved.id, index);
        }
        Some(removed)
    }

    /// Returns a reference to a node by its ID.
    #[must_use]
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns all nodes in the graph.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Returns all edges in the graph.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights()
    }

    /// Returns an edge by its ID.
    #[must_use]
    pub fn edge(&self, edge_id: EdgeId) -> Option<&Edge> {
        self.graph.edge_weights().find(|e| e.id == edge_id)
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the edges leaving a node.
    #[must_use]
    pub fn outgoing(&self, node_id: NodeId) -> Vec<&Edge> {
        let Some(&index) = self.node_index_map.get(&node_id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .map(|e| e.weight())
            .collect()
    }

    /// Returns the nodes of kind `input`.
    ///
    /// A runnable graph is expected to have exactly one, but the model
    /// does not enforce it — the shell may warn based on this.
    #[must_use]
    pub fn input_nodes(&self) -> Vec<&Node> {
        self.nodes().filter(|n| n.kind == BlockKind::Input).collect()
    }

    /// Inserts an edge from `source` to `target`.
    ///
    /// The candidate passes the cycle policy first, then branch-slot
    /// allocation for branching source kinds. `requested` is the explicit
    /// handle the user targeted, if any; when `None`, branching sources
    /// get the first free slot of their pair.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound`, `CycleRejected`, `BranchesExhausted`,
    /// `BranchOccupied` or `BranchNotSupported`. On error the edge set is
    /// unchanged.
    pub fn connect(
        &mut self,
        source: NodeId,
        target: NodeId,
        requested: Option<BranchLabel>,
    ) -> Result<EdgeId, GraphError> {
        let source_index = *self
            .node_index_map
            .get(&source)
            .ok_or(GraphError::NodeNotFound { node_id: source })?;
        let target_index = *self
            .node_index_map
            .get(&target)
            .ok_or(GraphError::NodeNotFound { node_id: target })?;

        cycle::check(
            self.graph.edge_weights().map(|e| (e.source, e.target)),
            source,
            target,
        )?;

        let kind = self
            .graph
            .node_weight(source_index)
            .map(|n| n.kind)
            .ok_or(GraphError::NodeNotFound { node_id: source })?;
        let taken: Vec<BranchLabel> = self
            .graph
            .edges_directed(source_index, Direction::Outgoing)
            .filter_map(|e| e.weight().branch)
            .collect();

        let edge = match branch::allocate(kind, source, &taken, requested)? {
            Some(label) => Edge::branched(source, target, label),
            None => Edge::new(source, target),
        };
        let edge_id = edge.id;
        self.graph.add_edge(source_index, target_index, edge);
        Ok(edge_id)
    }

    /// Removes an edge by its ID.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Option<Edge> {
        let index = self
            .graph
            .edge_references()
            .find(|e| e.weight().id == edge_id)
            .map(|e| e.id())?;
        self.graph.remove_edge(index)
    }

    /// Applies a partial configuration update to a node via the
    /// reconciler.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` or `InvalidConfigShape`. A malformed update
    /// is never partially applied.
    pub fn update_node_config(
        &mut self,
        node_id: NodeId,
        update: &Value,
    ) -> Result<(), GraphError> {
        let index = *self
            .node_index_map
            .get(&node_id)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        let node = self
            .graph
            .node_weight_mut(index)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        node.config = node.config.reconciled_with(update)?;
        Ok(())
    }

    /// Returns the trigger metadata of a node, if any.
    #[must_use]
    pub fn trigger_meta(&self, node_id: NodeId) -> Option<&TriggerMeta> {
        self.node(node_id)?.trigger.as_ref()
    }

    /// Sets or clears the trigger metadata on a trigger node.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` or `NotATrigger`.
    pub fn set_trigger_meta(
        &mut self,
        node_id: NodeId,
        meta: Option<TriggerMeta>,
    ) -> Result<(), GraphError> {
        let index = *self
            .node_index_map
            .get(&node_id)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        let node = self
            .graph
            .node_weight_mut(index)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        if node.kind != BlockKind::Trigger {
            return Err(GraphError::NotATrigger { node_id });
        }
        node.trigger = meta;
        Ok(())
    }

    /// Produces the persisted shape of the graph.
    ///
    /// Draft trigger metadata exists only in editor memory and is
    /// stripped; Subscription metadata round-trips.
    #[must_use]
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .nodes()
            .map(|node| {
                let mut node = node.clone();
                if matches!(node.trigger, Some(TriggerMeta::Draft(_))) {
                    node.trigger = None;
                }
                node
            })
            .collect();
        GraphSnapshot {
            version: SNAPSHOT_VERSION,
            nodes,
            edges: self.edges().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FIELDS_KEY;
    use crate::trigger::{CronConfig, ProviderConfig, TriggerDraft};
    use serde_json::json;

    fn tool(label: &str) -> Node {
        Node::new(BlockKind::Tool, label)
    }

    #[test]
    fn add_and_get_node() {
        let mut model = GraphModel::new();
        let node = tool("Fetch");
        let node_id = model.add_node(node).expect("add");

        assert_eq!(model.node(node_id).map(|n| n.label.as_str()), Some("Fetch"));
        assert_eq!(model.node_count(), 1);
    }

    #[test]
    fn duplicate_node_rejected() {
        let mut model = GraphModel::new();
        let node = tool("Fetch");
        let copy = node.clone();
        model.add_node(node).expect("add");

        let err = model.add_node(copy).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNode { .. }));
        assert_eq!(model.node_count(), 1);
    }

    #[test]
    fn remove_node_cascades_edges() {
        let mut model = GraphModel::new();
        let a = model.add_node(tool("a")).expect("add");
        let b = model.add_node(tool("b")).expect("add");
        let c = model.add_node(tool("c")).expect("add");
        model.connect(a, b, None).expect("a -> b");
        model.connect(b, c, None).expect("b -> c");

        model.remove_node(b).expect("node removed");

        assert_eq!(model.node_count(), 2);
        assert_eq!(model.edge_count(), 0);
    }

    #[test]
    fn lookups_survive_node_removal() {
        let mut model = GraphModel::new();
        let a = model.add_node(tool("a")).expect("add");
        let b = model.add_node(tool("b")).expect("add");
        let c = model.add_node(tool("c")).expect("add");

        model.remove_node(a).expect("node removed");

        // The index map must track petgraph's slot reuse.
        assert_eq!(model.node(b).map(|n| n.label.as_str()), Some("b"));
        assert_eq!(model.node(c).map(|n| n.label.as_str()), Some("c"));
        let d = model.add_node(tool("d")).expect("add");
        assert_eq!(model.node(d).map(|n| n.label.as_str()), Some("d"));
    }

    #[test]
    fn connect_allocates_branch_slots_in_order() {
        let mut model = GraphModel::new();
        let cond = model
            .add_node(Node::new(BlockKind::IfElse, "Check"))
            .expect("add");
        let yes = model.add_node(tool("yes")).expect("add");
        let no = model.add_node(tool("no")).expect("add");

        let first = model.connect(cond, yes, None).expect("first edge");
        let second = model.connect(cond, no, None).expect("second edge");

        assert_eq!(model.edge(first).and_then(|e| e.branch), Some(BranchLabel::True));
        assert_eq!(model.edge(second).and_then(|e| e.branch), Some(BranchLabel::False));
    }

    #[test]
    fn third_branch_edge_rejected_and_edge_set_unchanged() {
        let mut model = GraphModel::new();
        let cond = model
            .add_node(Node::new(BlockKind::IfElse, "Check"))
            .expect("add");
        let targets: Vec<NodeId> = (0..3)
            .map(|i| model.add_node(tool(&format!("t{i}"))).expect("add"))
            .collect();

        model.connect(cond, targets[0], None).expect("true edge");
        model.connect(cond, targets[1], None).expect("false edge");

        let err = model.connect(cond, targets[2], None).unwrap_err();
        assert_eq!(err, GraphError::BranchesExhausted { node_id: cond });
        assert_eq!(model.edge_count(), 2);
    }

    #[test]
    fn explicit_slot_reuse_rejected() {
        let mut model = GraphModel::new();
        let looper = model
            .add_node(Node::new(BlockKind::ForLoop, "Each"))
            .expect("add");
        let body = model.add_node(tool("body")).expect("add");
        let next = model.add_node(tool("next")).expect("add");

        model
            .connect(looper, body, Some(BranchLabel::Loop))
            .expect("loop edge");
        let err = model
            .connect(looper, next, Some(BranchLabel::Loop))
            .unwrap_err();
        assert!(matches!(err, GraphError::BranchOccupied { .. }));
    }

    #[test]
    fn ordinary_fan_out_is_unbounded() {
        let mut model = GraphModel::new();
        let hub = model.add_node(tool("hub")).expect("add");
        for i in 0..4 {
            let target = model.add_node(tool(&format!("t{i}"))).expect("add");
            model.connect(hub, target, None).expect("fan-out edge");
        }
        assert_eq!(model.edge_count(), 4);
    }

    #[test]
    fn two_node_cycle_rejected() {
        let mut model = GraphModel::new();
        let a = model.add_node(tool("a")).expect("add");
        let b = model.add_node(tool("b")).expect("add");
        model.connect(a, b, None).expect("a -> b");

        let err = model.connect(b, a, None).unwrap_err();
        assert_eq!(err, GraphError::CycleRejected { source: b, target: a });
        assert_eq!(model.edge_count(), 1);
    }

    #[test]
    fn three_node_cycle_currently_allowed() {
        let mut model = GraphModel::new();
        let a = model.add_node(tool("a")).expect("add");
        let b = model.add_node(tool("b")).expect("add");
        let c = model.add_node(tool("c")).expect("add");
        model.connect(a, b, None).expect("a -> b");
        model.connect(b, c, None).expect("b -> c");

        // Pins the local-check policy: only direct cycles are rejected.
        model.connect(c, a, None).expect("c -> a closes a three-node cycle");
        assert_eq!(model.edge_count(), 3);
    }

    #[test]
    fn update_node_config_preserves_empty_fields() {
        let mut model = GraphModel::new();
        let node_id = model.add_node(tool("form")).expect("add");
        model
            .update_node_config(node_id, &json!({"fields": [{"name": "a"}], "other": 1}))
            .expect("seed config");

        model
            .update_node_config(node_id, &json!({"fields": []}))
            .expect("clear fields");

        let config = &model.node(node_id).expect("node").config;
        assert_eq!(config.fields(), Some(&Vec::new()));
        assert_eq!(config.get("other"), Some(&json!(1)));
    }

    #[test]
    fn malformed_config_update_leaves_node_unchanged() {
        let mut model = GraphModel::new();
        let node_id = model.add_node(tool("form")).expect("add");
        model
            .update_node_config(node_id, &json!({"other": 1}))
            .expect("seed config");

        let err = model.update_node_config(node_id, &json!(42)).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConfigShape { .. }));
        assert_eq!(
            model.node(node_id).expect("node").config.get("other"),
            Some(&json!(1))
        );
    }

    #[test]
    fn trigger_meta_only_on_trigger_nodes() {
        let mut model = GraphModel::new();
        let plain = model.add_node(tool("plain")).expect("add");
        let draft = TriggerDraft::new(
            ProviderConfig::Cron(CronConfig {
                expression: "0 7 * * *".to_string(),
                timezone: "UTC".to_string(),
            }),
            &[],
        );

        let err = model
            .set_trigger_meta(plain, Some(TriggerMeta::Draft(draft)))
            .unwrap_err();
        assert_eq!(err, GraphError::NotATrigger { node_id: plain });
    }

    #[test]
    fn snapshot_strips_draft_trigger_meta() {
        let mut model = GraphModel::new();
        let trigger = model
            .add_node(Node::new(BlockKind::Trigger, "On schedule"))
            .expect("add");
        let draft = TriggerDraft::new(
            ProviderConfig::Cron(CronConfig {
                expression: "*/5 * * * *".to_string(),
                timezone: "UTC".to_string(),
            }),
            &[],
        );
        model
            .set_trigger_meta(trigger, Some(TriggerMeta::Draft(draft)))
            .expect("set draft");

        let snapshot = model.to_snapshot();
        assert_eq!(snapshot.nodes.len(), 1);
        assert!(snapshot.nodes[0].trigger.is_none());
        // The live model still holds the draft.
        assert!(model.trigger_meta(trigger).is_some());
    }

    #[test]
    fn snapshot_roundtrip_rebuilds_graph() {
        let mut model = GraphModel::new();
        let a = model.add_node(tool("a")).expect("add");
        let b = model.add_node(tool("b")).expect("add");
        model.connect(a, b, None).expect("a -> b");
        model
            .update_node_config(a, &json!({FIELDS_KEY: [{"name": "q"}]}))
            .expect("config");

        let snapshot = model.to_snapshot();
        let rebuilt = GraphModel::from_snapshot(&snapshot);

        assert_eq!(rebuilt.node_count(), 2);
        assert_eq!(rebuilt.edge_count(), 1);
        assert_eq!(rebuilt.to_snapshot(), snapshot);
    }
}
