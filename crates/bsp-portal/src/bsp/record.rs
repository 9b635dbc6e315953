//! Building a [`BspTree`] from the flat node and portal tables of level data.

use std::collections::BTreeMap;

use bitflags::bitflags;
use log::debug;
use nalgebra::Point3;

use crate::error::{BspError, Result};
use crate::{CellId, NodeId, Plane3D, PortalId};

use super::tree::BspTree;

/// Child field value meaning "no child".
pub const NO_CHILD: u32 = 0x00FF_FFFF;

bitflags! {
    /// Flags in the top byte of a packed node word.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeRecordFlags: u8 {
        /// The row is a leaf; its front field holds the cell id.
        const LEAF     = 0x01;
        /// Front and back children are stored swapped.
        const INVERTED = 0x04;
    }
}

/// Where a split node's plane is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneRef {
    /// Index into the level's table of extra planes.
    Extra(usize),
    /// Index into the boundary plane list of a cell.
    Cell { cell: CellId, index: usize },
}

/// One row of the node table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BspNodeRecord {
    pub flags: NodeRecordFlags,
    /// Cell whose plane list holds the split plane, negative for extra planes.
    pub cell: i32,
    pub plane: i32,
    pub front: u32,
    pub back: u32,
}

impl BspNodeRecord {
    /// Decodes a row whose first word packs flags (top byte) and node number.
    pub fn from_raw(word: u32, cell: i32, plane: i32, front: u32, back: u32) -> Self {
        Self {
            flags: NodeRecordFlags::from_bits_truncate((word >> 24) as u8),
            cell,
            plane,
            front,
            back,
        }
    }

    pub fn leaf(cell: CellId) -> Self {
        Self {
            flags: NodeRecordFlags::LEAF,
            cell: -1,
            plane: -1,
            front: cell.raw(),
            back: NO_CHILD,
        }
    }

    pub fn split(plane: PlaneRef, front: Option<NodeId>, back: Option<NodeId>) -> Self {
        let (cell, plane) = match plane {
            PlaneRef::Extra(index) => (-1, index as i32),
            PlaneRef::Cell { cell, index } => (cell.raw() as i32, index as i32),
        };
        Self {
            flags: NodeRecordFlags::empty(),
            cell,
            plane,
            front: front.map_or(NO_CHILD, NodeId::raw),
            back: back.map_or(NO_CHILD, NodeId::raw),
        }
    }

    /// Marks the children as stored swapped.
    pub fn inverted(mut self) -> Self {
        self.flags |= NodeRecordFlags::INVERTED;
        self
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.flags.contains(NodeRecordFlags::LEAF)
    }

    /// The cell of a leaf row.
    pub fn leaf_cell(&self) -> CellId {
        CellId::new(self.front)
    }

    /// Where the split plane is stored, or `None` for a negative plane index.
    pub fn plane_ref(&self) -> Option<PlaneRef> {
        let index = usize::try_from(self.plane).ok()?;
        if self.cell < 0 {
            Some(PlaneRef::Extra(index))
        } else {
            Some(PlaneRef::Cell {
                cell: CellId::new(self.cell as u32),
                index,
            })
        }
    }

    /// Front and back children as they should be linked, swap applied.
    pub fn children(&self) -> (Option<NodeId>, Option<NodeId>) {
        let decode = |raw: u32| (raw != NO_CHILD).then(|| NodeId::new(raw));
        let front = decode(self.front);
        let back = decode(self.back);
        if self.flags.contains(NodeRecordFlags::INVERTED) {
            (back, front)
        } else {
            (front, back)
        }
    }
}

/// A portal as stored with its source cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalRecord {
    pub source: CellId,
    pub target: CellId,
    pub plane: Plane3D,
    /// Index of the source cell's boundary plane the portal lies on.
    pub plane_index: Option<usize>,
    pub vertices: Vec<Point3<f32>>,
}

/// Everything needed to build the tree of one level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelRecords {
    /// Node table; row `i` becomes node `i`, row 0 is the root.
    pub nodes: Vec<BspNodeRecord>,
    pub extra_planes: Vec<Plane3D>,
    /// Boundary planes per cell, indexed by cell id.
    pub cell_planes: Vec<Vec<Plane3D>>,
    pub portals: Vec<PortalRecord>,
}

impl BspTree {
    /// Builds a complete tree from level tables.
    ///
    /// Nodes are created first, then planes and children are linked, then
    /// portals are added and cell plane lists filled in. Any dangling index
    /// is an error.
    pub fn from_records(level: &LevelRecords) -> Result<Self> {
        let mut tree = BspTree::new();

        for (i, row) in level.nodes.iter().enumerate() {
            let leaf = row.is_leaf().then(|| row.leaf_cell());
            tree.create_node(NodeId::from_index(i), leaf)?;
        }

        for (i, row) in level.nodes.iter().enumerate() {
            if row.is_leaf() {
                continue;
            }
            let node = NodeId::from_index(i);

            let plane_ref = row.plane_ref().ok_or(BspError::MissingPlane {
                node,
                index: i64::from(row.plane),
            })?;
            let plane = resolve_plane(level, node, plane_ref)?;
            tree.set_split_plane(node, plane)?;

            let (front, back) = row.children();
            for child in [front, back].into_iter().flatten() {
                if child.index() >= level.nodes.len() {
                    return Err(BspError::MissingChild { node, child });
                }
            }
            tree.set_front_child(node, front)?;
            tree.set_back_child(node, back)?;
        }

        if !level.nodes.is_empty() {
            tree.set_root_node(NodeId::new(0))?;
        }

        let mut removed = 0;
        let mut plane_portals: BTreeMap<CellId, BTreeMap<usize, Vec<PortalId>>> = BTreeMap::new();
        for record in &level.portals {
            let (id, dropped) = tree.add_portal(record)?;
            removed += dropped;
            if let Some(index) = record.plane_index {
                plane_portals
                    .entry(record.source)
                    .or_default()
                    .entry(index)
                    .or_default()
                    .push(id);
            }
        }

        for (i, planes) in level.cell_planes.iter().enumerate() {
            let cell = CellId::from_index(i);
            let on_planes = plane_portals.remove(&cell).unwrap_or_default();
            tree.set_plane_list(cell, planes.clone(), on_planes)?;
        }

        tree.validate()?;

        debug!(
            "built BSP: {} nodes, {} cells, {} portals, depth {}",
            tree.node_count(),
            tree.cell_count(),
            tree.portal_count(),
            tree.depth()
        );
        debug!("portal optimization removed {removed} vertices");

        Ok(tree)
    }

    /// Creates a portal from a record, attaches it and prepares it for
    /// traversal. Returns the id and the number of redundant vertices dropped.
    pub fn add_portal(&mut self, record: &PortalRecord) -> Result<(PortalId, usize)> {
        let id = self.create_portal(record.source, record.target, record.plane.clone())?;
        let portal = self.portal_mut(id)?;
        for point in &record.vertices {
            portal.add_point(*point);
        }
        let removed = portal.optimize();
        portal.refresh_bounding_volume();
        Ok((id, removed))
    }
}

fn resolve_plane(level: &LevelRecords, node: NodeId, plane: PlaneRef) -> Result<Plane3D> {
    let found = match plane {
        PlaneRef::Extra(index) => level.extra_planes.get(index),
        PlaneRef::Cell { cell, index } => level
            .cell_planes
            .get(cell.index())
            .and_then(|planes| planes.get(index)),
    };
    let index = match plane {
        PlaneRef::Extra(index) | PlaneRef::Cell { index, .. } => index as i64,
    };
    found.cloned().ok_or(BspError::MissingPlane { node, index })
}
