//! BSP tree node implementation.

use nalgebra::Point3;

use crate::error::{BspError, Result};
use crate::{NodeId, Plane3D, PlaneSide};

use super::cell::Cell;

/// Inner node: a splitting plane and two optional children.
///
/// The plane and children are filled in after creation, once every node of
/// the level exists. A missing child stands for space outside the world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitNode {
    pub(crate) plane: Option<Plane3D>,
    pub(crate) front: Option<NodeId>,
    pub(crate) back: Option<NodeId>,
}

/// What a node holds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Split(SplitNode),
    Leaf(Cell),
}

/// A node in the BSP tree.
///
/// Exactly one of two shapes holds: a split node with a plane and children,
/// or a leaf owning a [`Cell`]. Accessors for the other shape return
/// [`BspError::NotALeaf`] or [`BspError::NotASplit`].
#[derive(Debug, Clone, PartialEq)]
pub struct BspNode {
    id: NodeId,
    kind: NodeKind,
}

impl BspNode {
    /// Creates a split node without plane or children.
    pub fn split(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::Split(SplitNode::default()),
        }
    }

    /// Creates a leaf owning `cell`.
    pub fn leaf(id: NodeId, cell: Cell) -> Self {
        Self {
            id,
            kind: NodeKind::Leaf(cell),
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// The splitting plane.
    pub fn split_plane(&self) -> Result<&Plane3D> {
        self.as_split()?
            .plane
            .as_ref()
            .ok_or(BspError::MissingSplitPlane(self.id))
    }

    /// Child in front of the plane, `None` if that side is outside the world.
    pub fn front(&self) -> Result<Option<NodeId>> {
        Ok(self.as_split()?.front)
    }

    /// Child behind the plane, `None` if that side is outside the world.
    pub fn back(&self) -> Result<Option<NodeId>> {
        Ok(self.as_split()?.back)
    }

    /// Signed distance of `point` to the splitting plane.
    pub fn distance(&self, point: Point3<f32>) -> Result<f32> {
        Ok(self.split_plane()?.signed_distance(point))
    }

    /// Side of the splitting plane `point` is on.
    pub fn side(&self, point: Point3<f32>) -> Result<PlaneSide> {
        Ok(self.split_plane()?.classify_point(point))
    }

    /// Child to descend into for `point`. Points on the plane go to the front.
    pub fn next_node(&self, point: Point3<f32>) -> Result<Option<NodeId>> {
        match self.side(point)? {
            PlaneSide::Back => self.back(),
            PlaneSide::Front | PlaneSide::OnPlane => self.front(),
        }
    }

    /// The cell of a leaf.
    pub fn cell(&self) -> Result<&Cell> {
        match &self.kind {
            NodeKind::Leaf(cell) => Ok(cell),
            NodeKind::Split(_) => Err(BspError::NotALeaf(self.id)),
        }
    }

    pub fn cell_mut(&mut self) -> Result<&mut Cell> {
        match &mut self.kind {
            NodeKind::Leaf(cell) => Ok(cell),
            NodeKind::Split(_) => Err(BspError::NotALeaf(self.id)),
        }
    }

    pub(crate) fn as_split(&self) -> Result<&SplitNode> {
        match &self.kind {
            NodeKind::Split(split) => Ok(split),
            NodeKind::Leaf(_) => Err(BspError::NotASplit(self.id)),
        }
    }

    pub(crate) fn as_split_mut(&mut self) -> Result<&mut SplitNode> {
        match &mut self.kind {
            NodeKind::Split(split) => Ok(split),
            NodeKind::Leaf(_) => Err(BspError::NotASplit(self.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellId;
    use nalgebra::Vector3;

    fn make_split() -> BspNode {
        let mut node = BspNode::split(NodeId::new(0));
        let split = node.as_split_mut().unwrap();
        split.plane = Some(Plane3D::new(Vector3::x(), 5.0));
        split.front = Some(NodeId::new(1));
        split.back = Some(NodeId::new(2));
        node
    }

    #[test]
    fn split_node_routes_points() {
        let node = make_split();
        assert_eq!(node.next_node(Point3::new(6.0, 0.0, 0.0)), Ok(Some(NodeId::new(1))));
        assert_eq!(node.next_node(Point3::new(4.0, 0.0, 0.0)), Ok(Some(NodeId::new(2))));
        assert!((node.distance(Point3::new(7.0, 0.0, 0.0)).unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn on_plane_goes_front() {
        let node = make_split();
        assert_eq!(node.next_node(Point3::new(5.0, 3.0, 3.0)), Ok(Some(NodeId::new(1))));
    }

    #[test]
    fn wrong_kind_accessors_fail() {
        let leaf = BspNode::leaf(NodeId::new(3), Cell::new(CellId::new(0)));
        assert_eq!(leaf.front(), Err(BspError::NotASplit(NodeId::new(3))));
        assert!(leaf.split_plane().is_err());

        let split = BspNode::split(NodeId::new(4));
        assert_eq!(split.cell().err(), Some(BspError::NotALeaf(NodeId::new(4))));
        assert_eq!(split.split_plane().err(), Some(BspError::MissingSplitPlane(NodeId::new(4))));
    }
}
