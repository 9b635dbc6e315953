//! Error type for tree construction and lookups.

use crate::{CellId, NodeId, PortalId};

/// Data-integrity errors raised while building or querying a [`crate::BspTree`].
///
/// Geometric degeneracy (empty polygons, points outside the world) is not an
/// error and is reported through `Option` or empty results instead.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BspError {
    /// A node with this id was already created.
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    /// Two leaves claim the same cell.
    #[error("cell {0} is already owned by another leaf")]
    DuplicateCell(CellId),

    #[error("cell {0} does not exist")]
    UnknownCell(CellId),

    #[error("portal {0} does not exist")]
    UnknownPortal(PortalId),

    /// Leaf-only accessor used on a split node.
    #[error("node {0} is not a leaf")]
    NotALeaf(NodeId),

    /// Split-only accessor used on a leaf.
    #[error("node {0} is not a split node")]
    NotASplit(NodeId),

    #[error("split node {0} has no plane")]
    MissingSplitPlane(NodeId),

    #[error("tree has no root node")]
    MissingRoot,

    /// A serialized row refers to a negative plane index or one past the plane table.
    #[error("node {node} refers to missing plane {index}")]
    MissingPlane { node: NodeId, index: i64 },

    /// A serialized row refers to a child row that does not exist.
    #[error("node {node} refers to missing child {child}")]
    MissingChild { node: NodeId, child: NodeId },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BspError>;
