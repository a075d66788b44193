//! Edge types for workflow graphs.
//!
//! Edges connect a source node's output slot to a target node. Ordinary
//! nodes expose a single unlabeled slot with unbounded fan-out; branching
//! nodes (`if_else`, `for_loop`) label each outgoing edge with the branch
//! it occupies.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A unique identifier for an edge within a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(Ulid);

impl EdgeId {
    /// Creates a new random edge ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Creates an edge ID from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "edge_{}", self.0)
    }
}

/// The branch slot an edge leaves from on a branching node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchLabel {
    /// The condition-held branch of an `if_else` node.
    True,
    /// The condition-failed branch of an `if_else` node.
    False,
    /// The loop-body branch of a `for_loop` node.
    Loop,
    /// The after-loop branch of a `for_loop` node.
    Exit,
}

impl std::fmt::Display for BranchLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::True => "true",
            Self::False => "false",
            Self::Loop => "loop",
            Self::Exit => "exit",
        };
        write!(f, "{name}")
    }
}

/// An edge in a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge.
    pub id: EdgeId,
    /// The source node.
    pub source: NodeId,
    /// The target node.
    pub target: NodeId,
    /// The branch slot this edge occupies on the source node.
    /// `None` for the unlabeled slot of ordinary nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchLabel>,
}

impl Edge {
    /// Creates an unlabeled edge.
    #[must_use]
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: EdgeId::new(),
            source,
            target,
            branch: None,
        }
    }

    /// Creates an edge occupying a branch slot.
    #[must_use]
    pub fn branched(source: NodeId, target: NodeId, branch: BranchLabel) -> Self {
        Self {
            id: EdgeId::new(),
            source,
            target,
            branch: Some(branch),
        }
    }
}
