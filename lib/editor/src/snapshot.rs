//! The persisted shape of a workflow graph.
//!
//! A snapshot is the serialized body sent to the persistence collaborator
//! and the unit of structural comparison for autosave change detection.
//! Equality is deep and order-sensitive: two snapshots whose `fields`
//! sequences differ only in order are different states.

use crate::edge::Edge;
use crate::node::Node;
use serde::{Deserialize, Serialize};

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A point-in-time copy of a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Snapshot schema version.
    pub version: u32,
    /// All nodes, in insertion order.
    pub nodes: Vec<Node>,
    /// All edges, in insertion order.
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Creates an empty snapshot at the current schema version.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl Default for GraphSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
