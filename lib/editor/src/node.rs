//! Workflow node types.
//!
//! Nodes are the building blocks of a workflow definition. Each node has:
//! - A unique ID within the workflow
//! - A block kind (tool call, LLM step, branch, loop, input, trigger)
//! - A canvas position
//! - An open configuration map, interpreted per kind
//! - Optional trigger metadata (trigger nodes only)

use crate::config::Config;
use crate::edge::BranchLabel;
use crate::trigger::TriggerMeta;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A unique identifier for a node within a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Ulid);

impl NodeId {
    /// Creates a new random node ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Creates a node ID from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// The kind of a workflow block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// A tool call step.
    Tool,
    /// An LLM step.
    Llm,
    /// Conditional branch with `true`/`false` output slots.
    IfElse,
    /// Loop with `loop`/`exit` output slots.
    ForLoop,
    /// Workflow input entry point.
    Input,
    /// External event source; carries trigger metadata.
    Trigger,
    /// Deprecated code block. Kept so legacy graphs still deserialize;
    /// the editor no longer offers it.
    Code,
}

impl BlockKind {
    /// Returns true for kinds whose output slots carry branch labels.
    #[must_use]
    pub fn is_branching(&self) -> bool {
        matches!(self, Self::IfElse | Self::ForLoop)
    }

    /// Returns the ordered pair of branch labels for branching kinds.
    ///
    /// The first label of the pair is the one auto-allocation hands out
    /// first. Non-branching kinds have a single unlabeled output slot
    /// with unbounded fan-out and return `None`.
    #[must_use]
    pub fn branch_pair(&self) -> Option<(BranchLabel, BranchLabel)> {
        match self {
            Self::IfElse => Some((BranchLabel::True, BranchLabel::False)),
            Self::ForLoop => Some((BranchLabel::Loop, BranchLabel::Exit)),
            _ => None,
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Tool => "tool",
            Self::Llm => "llm",
            Self::IfElse => "if_else",
            Self::ForLoop => "for_loop",
            Self::Input => "input",
            Self::Trigger => "trigger",
            Self::Code => "code",
        };
        write!(f, "{name}")
    }
}

/// A position on the editor canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node within the workflow.
    pub id: NodeId,
    /// The block kind.
    pub kind: BlockKind,
    /// Human-readable name shown on the canvas.
    pub label: String,
    /// Canvas position.
    pub position: Position,
    /// Kind-specific configuration.
    pub config: Config,
    /// Trigger metadata; only meaningful when `kind` is `Trigger`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerMeta>,
}

impl Node {
    /// Creates a new node with an empty configuration at the origin.
    #[must_use]
    pub fn new(kind: BlockKind, label: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            label: label.into(),
            position: Position::default(),
            config: Config::new(),
            trigger: None,
        }
    }

    /// Sets the canvas position.
    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Returns true if this node's output slots carry branch labels.
    #[must_use]
    pub fn is_branching(&self) -> bool {
        self.kind.is_branching()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        let id = NodeId::new();
        assert!(id.to_string().starts_with("node_"));
    }

    #[test]
    fn branch_pair_for_if_else() {
        let pair = BlockKind::IfElse.branch_pair();
        assert_eq!(pair, Some((BranchLabel::True, BranchLabel::False)));
    }

    #[test]
    fn branch_pair_for_for_loop() {
        let pair = BlockKind::ForLoop.branch_pair();
        assert_eq!(pair, Some((BranchLabel::Loop, BranchLabel::Exit)));
    }

    #[test]
    fn ordinary_kinds_have_no_branch_pair() {
        assert!(BlockKind::Tool.branch_pair().is_none());
        assert!(BlockKind::Llm.branch_pair().is_none());
        assert!(BlockKind::Input.branch_pair().is_none());
        assert!(BlockKind::Trigger.branch_pair().is_none());
    }

    #[test]
    fn block_kind_serde_uses_snake_case() {
        let json = serde_json::to_string(&BlockKind::IfElse).expect("serialize");
        assert_eq!(json, "\"if_else\"");
        let parsed: BlockKind = serde_json::from_str("\"for_loop\"").expect("deserialize");
        assert_eq!(parsed, BlockKind::ForLoop);
    }

    #[test]
    fn node_serde_roundtrip() {
        let node = Node::new(BlockKind::Tool, "Fetch page").with_position(Position::new(80.0, 120.0));
        let json = serde_json::to_string(&node).expect("serialize");
        let parsed: Node = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(node, parsed);
    }

    #[test]
    fn node_without_trigger_omits_field() {
        let node = Node::new(BlockKind::Llm, "Summarize");
        let json = serde_json::to_string(&node).expect("serialize");
        assert!(!json.contains("\"trigger\""));
    }
}
