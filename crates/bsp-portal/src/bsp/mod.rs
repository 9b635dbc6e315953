//! Binary Space Partitioning tree of level cells.
//!
//! The tree locates the cell containing a point and owns the cells and the
//! portals joining them. It is built once per level, either node by node or
//! from level tables with [`BspTree::from_records`].
//!
//! # Example
//!
//! ```ignore
//! use bsp_portal::{BspTree, CellId, NodeId, Plane3D};
//! use nalgebra::{Point3, Vector3};
//!
//! let mut tree = BspTree::new();
//! tree.create_node(NodeId::new(0), None)?;
//! tree.create_node(NodeId::new(1), Some(CellId::new(0)))?;
//! tree.create_node(NodeId::new(2), Some(CellId::new(1)))?;
//! tree.set_split_plane(NodeId::new(0), Plane3D::new(Vector3::x(), 10.0))?;
//! tree.set_back_child(NodeId::new(0), Some(NodeId::new(1)))?;
//! tree.set_front_child(NodeId::new(0), Some(NodeId::new(2)))?;
//! tree.set_root_node(NodeId::new(0))?;
//!
//! assert_eq!(tree.find_leaf(Point3::new(15.0, 0.0, 0.0)), Some(CellId::new(1)));
//! ```
//!
//! # Architecture
//!
//! - [`BspTree`]: node arena, cell lookup and portal storage
//! - [`BspNode`]: a split plane with two children, or a leaf holding a [`Cell`]
//! - [`BspNodeRecord`]: one row of the serialized node table

mod cell;
mod node;
mod record;
mod tree;

pub use cell::{Aabb, Cell, CellFlags};
pub use node::{BspNode, NodeKind, SplitNode};
pub use record::{BspNodeRecord, LevelRecords, NodeRecordFlags, PlaneRef, PortalRecord, NO_CHILD};
pub use tree::BspTree;
