//! BSP tree container: node arena, cell lookup and portal storage.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};
use nalgebra::Point3;

use crate::error::{BspError, Result};
use crate::{CellId, LightId, NodeId, ObjectId, Plane3D, Portal, PortalId};

use super::cell::{Aabb, Cell, CellFlags};
use super::node::{BspNode, NodeKind};

/// A BSP tree whose leaves are the cells of a level.
///
/// Nodes live in an arena indexed by [`NodeId`]; children and portal endpoints
/// are ids, never references. The tree is built once per level through the
/// construction API (or [`BspTree::from_records`]) and is read-only for the
/// traversal afterwards, apart from cell flags, object tags and light sets.
///
/// # Point location
///
/// ```ignore
/// let cell = tree.find_leaf(camera_position);
/// ```
///
/// Points lying exactly on a splitting plane go to the front child.
#[derive(Debug, Clone, Default)]
pub struct BspTree {
    nodes: Vec<Option<BspNode>>,
    leaves: HashMap<CellId, NodeId>,
    portals: Vec<Option<Portal>>,
    root: Option<NodeId>,
    object_cells: HashMap<ObjectId, Vec<CellId>>,
}

impl BspTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node. With `leaf` set the node is a leaf owning a new cell,
    /// otherwise a split node whose plane and children are set later.
    pub fn create_node(&mut self, id: NodeId, leaf: Option<CellId>) -> Result<()> {
        if self.contains_node(id) {
            return Err(BspError::DuplicateNode(id));
        }

        let node = match leaf {
            Some(cell) => {
                if self.leaves.contains_key(&cell) {
                    return Err(BspError::DuplicateCell(cell));
                }
                self.leaves.insert(cell, id);
                BspNode::leaf(id, Cell::new(cell))
            }
            None => BspNode::split(id),
        };

        if self.nodes.len() <= id.index() {
            self.nodes.resize_with(id.index() + 1, || None);
        }
        self.nodes[id.index()] = Some(node);
        Ok(())
    }

    pub fn set_split_plane(&mut self, node: NodeId, plane: Plane3D) -> Result<()> {
        self.node_mut(node)?.as_split_mut()?.plane = Some(plane);
        Ok(())
    }

    /// Sets (or with `None` removes) the front child of a split node.
    pub fn set_front_child(&mut self, node: NodeId, child: Option<NodeId>) -> Result<()> {
        self.check_child(child)?;
        self.node_mut(node)?.as_split_mut()?.front = child;
        Ok(())
    }

    /// Sets (or with `None` removes) the back child of a split node.
    pub fn set_back_child(&mut self, node: NodeId, child: Option<NodeId>) -> Result<()> {
        self.check_child(child)?;
        self.node_mut(node)?.as_split_mut()?.back = child;
        Ok(())
    }

    pub fn set_root_node(&mut self, node: NodeId) -> Result<()> {
        if !self.contains_node(node) {
            return Err(BspError::UnknownNode(node));
        }
        self.root = Some(node);
        Ok(())
    }

    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Result<&BspNode> {
        self.get_node(id).ok_or(BspError::UnknownNode(id))
    }

    /// The leaf node owning `cell`.
    pub fn leaf_node(&self, cell: CellId) -> Result<&BspNode> {
        let id = self.leaves.get(&cell).ok_or(BspError::UnknownCell(cell))?;
        self.node(*id)
    }

    pub fn cell(&self, cell: CellId) -> Result<&Cell> {
        self.leaf_node(cell)?.cell()
    }

    pub fn has_cell(&self, cell: CellId) -> bool {
        self.leaves.contains_key(&cell)
    }

    /// All cells, in order of their leaf node ids.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.nodes.iter().flatten().filter_map(|node| match node.kind() {
            NodeKind::Leaf(cell) => Some(cell),
            NodeKind::Split(_) => None,
        })
    }

    /// Cell containing `point`, or `None` when the point is outside the world.
    pub fn find_leaf(&self, point: Point3<f32>) -> Option<CellId> {
        let mut current = self.root?;

        loop {
            let node = self.get_node(current)?;
            match node.kind() {
                NodeKind::Leaf(cell) => return Some(cell.id()),
                NodeKind::Split(_) => match node.next_node(point) {
                    Ok(next) => current = next?,
                    Err(err) => {
                        warn!("point location stopped: {err}");
                        return None;
                    }
                },
            }
        }
    }

    /// Cells reached by a sphere, descending into both children wherever the
    /// sphere crosses a splitting plane.
    pub fn find_leaves_for_sphere(&self, center: Point3<f32>, radius: f32) -> Vec<CellId> {
        let mut found = Vec::new();
        if let Some(root) = self.root {
            self.collect_sphere_leaves(root, center, radius, &mut found);
        }
        found
    }

    fn collect_sphere_leaves(&self, id: NodeId, center: Point3<f32>, radius: f32, found: &mut Vec<CellId>) {
        let Some(node) = self.get_node(id) else {
            return;
        };

        match node.kind() {
            NodeKind::Leaf(cell) => found.push(cell.id()),
            NodeKind::Split(split) => {
                let Some(plane) = split.plane.as_ref() else {
                    warn!("split node {id} has no plane, sphere query skips it");
                    return;
                };
                let distance = plane.signed_distance(center);

                if distance.abs() < radius {
                    if let Some(back) = split.back {
                        self.collect_sphere_leaves(back, center, radius, found);
                    }
                    if let Some(front) = split.front {
                        self.collect_sphere_leaves(front, center, radius, found);
                    }
                } else if distance < 0.0 {
                    if let Some(back) = split.back {
                        self.collect_sphere_leaves(back, center, radius, found);
                    }
                } else if let Some(front) = split.front {
                    self.collect_sphere_leaves(front, center, radius, found);
                }
            }
        }
    }

    /// Creates a portal from `source` into `target` and attaches it to both.
    ///
    /// Vertices are added afterwards through [`BspTree::portal_mut`].
    pub fn create_portal(&mut self, source: CellId, target: CellId, plane: Plane3D) -> Result<PortalId> {
        self.cell(source)?;
        self.cell(target)?;

        let id = PortalId::from_index(self.portals.len());
        self.portals.push(Some(Portal::new(id, source, target, plane)));
        self.attach_portal(id)?;
        Ok(id)
    }

    pub fn portal(&self, id: PortalId) -> Result<&Portal> {
        self.portals
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(BspError::UnknownPortal(id))
    }

    pub fn portal_mut(&mut self, id: PortalId) -> Result<&mut Portal> {
        self.portals
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(BspError::UnknownPortal(id))
    }

    /// All live portals.
    pub fn portals(&self) -> impl Iterator<Item = &Portal> + '_ {
        self.portals.iter().flatten()
    }

    /// Registers the portal in its source's outgoing and its target's incoming set.
    pub fn attach_portal(&mut self, id: PortalId) -> Result<()> {
        let (source, target) = self.endpoints(id)?;
        self.cell_mut(source)?.attach_out(id);
        self.cell_mut(target)?.attach_in(id);
        Ok(())
    }

    /// Removes the portal from both endpoint cells. Detaching twice is a no-op.
    pub fn detach_portal(&mut self, id: PortalId) -> Result<()> {
        let (source, target) = self.endpoints(id)?;
        self.cell_mut(source)?.detach_out(id);
        self.cell_mut(target)?.detach_in(id);
        Ok(())
    }

    /// Detaches and removes the portal. Its id is not reused.
    pub fn destroy_portal(&mut self, id: PortalId) -> Result<Portal> {
        self.detach_portal(id)?;
        self.portals
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(BspError::UnknownPortal(id))
    }

    /// Sets or clears the vis-block bit on `cell` and spreads the change.
    ///
    /// When the flags of a cell change, the same update is offered to the
    /// targets of its outgoing portals. Those take it only if they are
    /// doorways, and spread it further only if their own flags changed.
    pub fn block_vision(&mut self, cell: CellId, block: bool) -> Result<()> {
        let mut pending = vec![(cell, true)];

        while let Some((id, origin)) = pending.pop() {
            let target = self.cell_mut(id)?;
            if !origin && !target.flags().contains(CellFlags::DOORWAY) {
                continue;
            }

            let previous = target.flags();
            let mut flags = previous;
            flags.set(CellFlags::VIS_BLOCK, block);
            if flags == previous {
                continue;
            }
            target.set_flags(flags);

            let out: Vec<PortalId> = target.out_portals().collect();
            for portal in out {
                pending.push((self.portal(portal)?.target(), false));
            }
        }

        Ok(())
    }

    pub fn is_vis_blocked(&self, cell: CellId) -> Result<bool> {
        Ok(self.cell(cell)?.is_vis_blocked())
    }

    /// Replaces the flags of a single cell, without spreading.
    pub fn set_cell_flags(&mut self, cell: CellId, flags: CellFlags) -> Result<()> {
        self.cell_mut(cell)?.set_flags(flags);
        Ok(())
    }

    pub fn set_cell_bounds(&mut self, cell: CellId, bounds: Option<Aabb>) -> Result<()> {
        self.cell_mut(cell)?.set_bounds(bounds);
        Ok(())
    }

    /// Sets the boundary planes of a cell and which portals lie on each.
    pub fn set_plane_list(
        &mut self,
        cell: CellId,
        planes: Vec<Plane3D>,
        plane_portals: BTreeMap<usize, Vec<PortalId>>,
    ) -> Result<()> {
        self.cell_mut(cell)?.set_planes(planes, plane_portals);
        Ok(())
    }

    /// Tags every cell reached by the object's bounding sphere, replacing
    /// the previous tags of that object.
    pub fn tag_object(&mut self, object: ObjectId, center: Point3<f32>, radius: f32) -> Result<()> {
        self.detach_object(object)?;

        let cells = self.find_leaves_for_sphere(center, radius);
        for cell in &cells {
            self.cell_mut(*cell)?.insert_object(object);
        }
        self.object_cells.insert(object, cells);
        Ok(())
    }

    /// Removes the object from every cell it was tagged in.
    pub fn detach_object(&mut self, object: ObjectId) -> Result<()> {
        if let Some(cells) = self.object_cells.remove(&object) {
            for cell in cells {
                self.cell_mut(cell)?.remove_object(object);
            }
        }
        Ok(())
    }

    /// Cells the object is currently tagged in.
    pub fn object_cells(&self, object: ObjectId) -> &[CellId] {
        self.object_cells
            .get(&object)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Lights affecting any cell the object is tagged in, sorted and unique.
    pub fn object_lights(&self, object: ObjectId) -> Result<Vec<LightId>> {
        let mut lights = Vec::new();
        for cell in self.object_cells(object) {
            lights.extend(self.cell(*cell)?.lights());
        }
        lights.sort_unstable();
        lights.dedup();
        Ok(lights)
    }

    pub fn add_affecting_light(&mut self, cell: CellId, light: LightId, dynamic: bool) -> Result<()> {
        self.cell_mut(cell)?.add_light(light, dynamic);
        Ok(())
    }

    pub fn remove_affecting_light(&mut self, cell: CellId, light: LightId) -> Result<()> {
        self.cell_mut(cell)?.remove_light(light);
        Ok(())
    }

    /// Drops only the dynamic registration of `light`; a static one stays.
    pub fn remove_dynamic_light(&mut self, cell: CellId, light: LightId) -> Result<()> {
        self.cell_mut(cell)?.remove_dynamic_light(light);
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn cell_count(&self) -> usize {
        self.leaves.len()
    }

    /// Number of live portals.
    pub fn portal_count(&self) -> usize {
        self.portals().count()
    }

    /// One past the highest portal id handed out.
    pub fn portal_capacity(&self) -> usize {
        self.portals.len()
    }

    /// One past the highest cell id in use.
    pub fn cell_capacity(&self) -> usize {
        self.leaves.keys().map(|c| c.index() + 1).max().unwrap_or(0)
    }

    /// Depth of the tree below the root (1 for a lone leaf, 0 when empty).
    pub fn depth(&self) -> usize {
        self.root.map_or(0, |root| self.subtree_depth(root))
    }

    fn subtree_depth(&self, id: NodeId) -> usize {
        match self.get_node(id).map(BspNode::kind) {
            Some(NodeKind::Split(split)) => {
                let front = split.front.map_or(0, |n| self.subtree_depth(n));
                let back = split.back.map_or(0, |n| self.subtree_depth(n));
                1 + front.max(back)
            }
            Some(NodeKind::Leaf(_)) => 1,
            None => 0,
        }
    }

    /// Checks that the tree is complete: a root exists and every split node
    /// has a plane.
    pub fn validate(&self) -> Result<()> {
        let root = self.root.ok_or(BspError::MissingRoot)?;
        self.node(root)?;

        for node in self.nodes.iter().flatten() {
            if !node.is_leaf() {
                node.split_plane()?;
            }
        }
        Ok(())
    }

    /// Drops every node, portal and tag.
    pub fn clear(&mut self) {
        debug!(
            "clearing BSP tree: {} nodes, {} portals",
            self.node_count(),
            self.portal_count()
        );
        self.nodes.clear();
        self.leaves.clear();
        self.portals.clear();
        self.object_cells.clear();
        self.root = None;
    }

    fn get_node(&self, id: NodeId) -> Option<&BspNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn contains_node(&self, id: NodeId) -> bool {
        self.get_node(id).is_some()
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut BspNode> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(BspError::UnknownNode(id))
    }

    fn cell_mut(&mut self, cell: CellId) -> Result<&mut Cell> {
        let id = *self.leaves.get(&cell).ok_or(BspError::UnknownCell(cell))?;
        self.node_mut(id)?.cell_mut()
    }

    fn check_child(&self, child: Option<NodeId>) -> Result<()> {
        match child {
            Some(id) if !self.contains_node(id) => Err(BspError::UnknownNode(id)),
            _ => Ok(()),
        }
    }

    fn endpoints(&self, id: PortalId) -> Result<(CellId, CellId)> {
        let portal = self.portal(id)?;
        Ok((portal.source(), portal.target()))
    }
}
