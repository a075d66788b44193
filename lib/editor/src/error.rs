//! Error types for the editor crate.
//!
//! Three layers, matching how failures are resolved:
//! - `GraphError`: structural edit rejections, resolved synchronously —
//!   the attempted mutation is simply not applied.
//! - `PersistError`: per-save-attempt failures from the persistence
//!   collaborator; local edits are preserved so the user can retry.
//! - `TriggerError` / `ValidationError`: trigger lifecycle failures,
//!   with per-field detail for provider configuration problems.

use crate::edge::{BranchLabel, EdgeId};
use crate::node::NodeId;
use crate::store::DraftRevision;
use crate::trigger::TriggerKey;
use std::collections::BTreeMap;
use std::fmt;

/// Errors from structural graph edits.
///
/// None of these are fatal: the edit is rejected, the graph is left
/// unchanged, and the caller is told synchronously so it can give
/// immediate feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// Edge with the given ID was not found in the graph.
    EdgeNotFound { edge_id: EdgeId },
    /// A node with the same ID is already present.
    DuplicateNode { node_id: NodeId },
    /// The operation only applies to trigger nodes.
    NotATrigger { node_id: NodeId },
    /// Both branch slots on the source node are already connected.
    BranchesExhausted { node_id: NodeId },
    /// The explicitly requested branch slot is already connected.
    BranchOccupied { node_id: NodeId, branch: BranchLabel },
    /// The requested branch label does not exist on the source node kind.
    BranchNotSupported { node_id: NodeId, branch: BranchLabel },
    /// The edge would close a direct two-node cycle.
    CycleRejected { source: NodeId, target: NodeId },
    /// The configuration update was not an object; nothing was applied.
    InvalidConfigShape { reason: String },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => {
                write!(f, "node not found: {node_id}")
            }
            Self::EdgeNotFound { edge_id } => {
                write!(f, "edge not found: {edge_id}")
            }
            Self::DuplicateNode { node_id } => {
                write!(f, "node already present: {node_id}")
            }
            Self::NotATrigger { node_id } => {
                write!(f, "node {node_id} is not a trigger")
            }
            Self::BranchesExhausted { node_id } => {
                write!(f, "no free branch slot on node {node_id}")
            }
            Self::BranchOccupied { node_id, branch } => {
                write!(f, "branch '{branch}' on node {node_id} is already connected")
            }
            Self::BranchNotSupported { node_id, branch } => {
                write!(f, "node {node_id} has no '{branch}' branch")
            }
            Self::CycleRejected { source, target } => {
                write!(f, "edge {source} -> {target} would close a cycle")
            }
            Self::InvalidConfigShape { reason } => {
                write!(f, "invalid config update: {reason}")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors from the persistence collaborator.
///
/// Scoped to a single save attempt; nothing here discards local edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// The server's draft revision advanced past what the client last read.
    Conflict { server_revision: DraftRevision },
    /// The request exceeded the save timeout.
    Timeout,
    /// Generic network or server failure.
    Failed { message: String },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict { server_revision } => {
                write!(f, "server draft revision advanced to {server_revision}")
            }
            Self::Timeout => write!(f, "persistence request timed out"),
            Self::Failed { message } => write!(f, "persistence request failed: {message}"),
        }
    }
}

impl std::error::Error for PersistError {}

/// Per-field validation failures for a trigger save.
///
/// Keys name the offending field (`expression`, `connection`,
/// `bindings.<input>`, ...); values are human-readable reasons. The map is
/// ordered so errors render deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    /// Field name -> reason.
    pub fields: BTreeMap<String, String>,
}

impl ValidationError {
    /// Creates an empty validation error to accumulate into.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for a field.
    pub fn insert(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.fields.insert(field.into(), reason.into());
    }

    /// Returns true if no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trigger validation failed:")?;
        for (field, reason) in &self.fields {
            write!(f, " {field}: {reason};")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Errors from trigger lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    /// Provider configuration or bindings failed validation.
    Validation(ValidationError),
    /// Underlying graph operation failed.
    Graph(GraphError),
    /// The node's trigger is not in the Draft state.
    NotADraft { node_id: NodeId },
    /// The node's trigger has no server-side subscription.
    NotSubscribed { node_id: NodeId },
    /// The trigger uses a different provider than the operation expects.
    WrongProvider {
        node_id: NodeId,
        expected: TriggerKey,
        actual: TriggerKey,
    },
    /// The trigger collaborator call failed.
    Store(PersistError),
}

impl fmt::Display for TriggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "{e}"),
            Self::Graph(e) => write!(f, "graph operation failed: {e}"),
            Self::NotADraft { node_id } => {
                write!(f, "trigger on node {node_id} is not a draft")
            }
            Self::NotSubscribed { node_id } => {
                write!(f, "trigger on node {node_id} has no subscription")
            }
            Self::WrongProvider {
                node_id,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "trigger on node {node_id} is a {actual} trigger, expected {expected}"
                )
            }
            Self::Store(e) => write!(f, "trigger store call failed: {e}"),
        }
    }
}

impl std::error::Error for TriggerError {}

impl From<ValidationError> for TriggerError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<GraphError> for TriggerError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<PersistError> for TriggerError {
    fn from(e: PersistError) -> Self {
        Self::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_display() {
        let node_id = NodeId::new();
        let err = GraphError::BranchesExhausted { node_id };
        assert!(err.to_string().contains("no free branch slot"));
    }

    #[test]
    fn cycle_error_names_both_nodes() {
        let source = NodeId::new();
        let target = NodeId::new();
        let err = GraphError::CycleRejected { source, target };
        let rendered = err.to_string();
        assert!(rendered.contains(&source.to_string()));
        assert!(rendered.contains(&target.to_string()));
    }

    #[test]
    fn validation_error_collects_fields() {
        let mut err = ValidationError::new();
        assert!(err.is_empty());

        err.insert("expression", "expected 5 fields, got 4");
        err.insert("timezone", "timezone is required");

        assert_eq!(err.fields.len(), 2);
        let rendered = err.to_string();
        assert!(rendered.contains("expression"));
        assert!(rendered.contains("timezone"));
    }

    #[test]
    fn trigger_error_wraps_validation() {
        let mut inner = ValidationError::new();
        inner.insert("connection", "Gmail connection required");
        let err = TriggerError::from(inner);
        assert!(matches!(err, TriggerError::Validation(_)));
    }

    #[test]
    fn persist_error_display() {
        let err = PersistError::Failed {
            message: "503".to_string(),
        };
        assert!(err.to_string().contains("503"));
    }
}
