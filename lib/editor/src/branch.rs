//! Branch-slot allocation for edges leaving branching nodes.
//!
//! An `if_else` node has exactly one `true` and one `false` output slot;
//! a `for_loop` node has `loop` and `exit`. Each slot holds at most one
//! edge. When the user connects without targeting a specific handle, the
//! first free slot of the pair is assigned; an explicit handle choice is
//! honored directly but validated against the same exclusivity rule.

use crate::edge::BranchLabel;
use crate::error::GraphError;
use crate::node::{BlockKind, NodeId};

/// Decides which branch slot a new edge from `node_id` occupies.
///
/// `taken` lists the branch labels already carried by edges leaving the
/// node. `requested` is the explicit handle the user targeted, if any.
///
/// Returns `Ok(None)` for non-branching kinds: their single output slot
/// is unlabeled and has unbounded fan-out.
///
/// # Errors
///
/// - `BranchNotSupported` when a label is requested on a kind that does
///   not carry it (including any label on a non-branching kind).
/// - `BranchOccupied` when the requested slot already holds an edge.
/// - `BranchesExhausted` when auto-allocation finds no free slot.
pub fn allocate(
    kind: BlockKind,
    node_id: NodeId,
    taken: &[BranchLabel],
    requested: Option<BranchLabel>,
) -> Result<Option<BranchLabel>, GraphError> {
    let Some((first, second)) = kind.branch_pair() else {
        return match requested {
            None => Ok(None),
            Some(branch) => Err(GraphError::BranchNotSupported { node_id, branch }),
        };
    };

    if let Some(branch) = requested {
        if branch != first && branch != second {
            return Err(GraphError::BranchNotSupported { node_id, branch });
        }
        if taken.contains(&branch) {
            return Err(GraphError::BranchOccupied { node_id, branch });
        }
        return Ok(Some(branch));
    }

    if !taken.contains(&first) {
        Ok(Some(first))
    } else if !taken.contains(&second) {
        Ok(Some(second))
    } else {
        Err(GraphError::BranchesExhausted { node_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn if_else_auto_allocates_true_then_false() {
        let node_id = NodeId::new();

        let first = allocate(BlockKind::IfElse, node_id, &[], None).expect("first slot");
        assert_eq!(first, Some(BranchLabel::True));

        let second =
            allocate(BlockKind::IfElse, node_id, &[BranchLabel::True], None).expect("second slot");
        assert_eq!(second, Some(BranchLabel::False));
    }

    #[test]
    fn if_else_third_edge_exhausts_branches() {
        let node_id = NodeId::new();
        let taken = [BranchLabel::True, BranchLabel::False];

        let err = allocate(BlockKind::IfElse, node_id, &taken, None).unwrap_err();
        assert_eq!(err, GraphError::BranchesExhausted { node_id });
    }

    #[test]
    fn for_loop_auto_allocates_loop_then_exit() {
        let node_id = NodeId::new();

        let first = allocate(BlockKind::ForLoop, node_id, &[], None).expect("first slot");
        assert_eq!(first, Some(BranchLabel::Loop));

        let second =
            allocate(BlockKind::ForLoop, node_id, &[BranchLabel::Loop], None).expect("second slot");
        assert_eq!(second, Some(BranchLabel::Exit));
    }

    #[test]
    fn explicit_free_slot_is_honored() {
        let node_id = NodeId::new();

        let slot = allocate(BlockKind::IfElse, node_id, &[], Some(BranchLabel::False))
            .expect("explicit slot");
        assert_eq!(slot, Some(BranchLabel::False));

        // Auto-allocation afterwards picks up the remaining slot.
        let next =
            allocate(BlockKind::IfElse, node_id, &[BranchLabel::False], None).expect("auto slot");
        assert_eq!(next, Some(BranchLabel::True));
    }

    #[test]
    fn explicit_occupied_slot_rejected() {
        let node_id = NodeId::new();

        let err = allocate(
            BlockKind::IfElse,
            node_id,
            &[BranchLabel::True],
            Some(BranchLabel::True),
        )
        .unwrap_err();
        assert_eq!(
            err,
            GraphError::BranchOccupied {
                node_id,
                branch: BranchLabel::True,
            }
        );
    }

    #[test]
    fn foreign_label_rejected() {
        let node_id = NodeId::new();

        let err =
            allocate(BlockKind::IfElse, node_id, &[], Some(BranchLabel::Loop)).unwrap_err();
        assert_eq!(
            err,
            GraphError::BranchNotSupported {
                node_id,
                branch: BranchLabel::Loop,
            }
        );
    }

    #[test]
    fn ordinary_kind_gets_unlabeled_slot() {
        let node_id = NodeId::new();
        let slot = allocate(BlockKind::Tool, node_id, &[], None).expect("unlabeled slot");
        assert_eq!(slot, None);
    }

    #[test]
    fn label_on_ordinary_kind_rejected() {
        let node_id = NodeId::new();
        let err = allocate(BlockKind::Tool, node_id, &[], Some(BranchLabel::True)).unwrap_err();
        assert!(matches!(err, GraphError::BranchNotSupported { .. }));
    }
}
