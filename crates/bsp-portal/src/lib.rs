//! Portal-based cell visibility for BSP levels.
//!
//! A level is split by a BSP tree whose leaves are convex cells; cells are
//! connected by convex portals. Each frame, [`PortalTraversal`] starts from
//! the cell holding the viewer and walks portals outward, narrowing the
//! screen rectangle each cell is seen through, and yields the set of cells
//! that may be visible.
//!
//! ```ignore
//! use bsp_portal::{PortalTraversal, ViewCamera, Viewport};
//!
//! let camera = ViewCamera::new(eye, direction, up);
//! let mut traversal = PortalTraversal::new();
//! let visible = traversal.traverse(&tree, &camera.view_setup(Viewport::default()))?;
//! ```

mod bsp;
mod camera;
mod clip;
mod error;
mod frustum;
mod ids;
mod light;
mod plane;
mod polygon;
mod portal;
mod rect;
mod rect_cache;
mod traversal;
mod visitor;

#[cfg(test)]
mod test_levels;

pub use bsp::{
    Aabb, BspNode, BspNodeRecord, BspTree, Cell, CellFlags, LevelRecords, NodeKind,
    NodeRecordFlags, PlaneRef, PortalRecord, SplitNode, NO_CHILD,
};
pub use camera::{ViewCamera, ViewSetup};
pub use clip::{ClipClass, ClipOutcome};
pub use error::{BspError, Result};
pub use frustum::{PortalFrustum, SphereClassification};
pub use ids::{CellId, LightId, NodeId, ObjectId, PortalId};
pub use light::{DynamicLight, LightKind};
pub use plane::{Classification, Plane3D, PlaneSide, Ray, PLANE_EPSILON};
pub use polygon::ConvexPolygon;
pub use portal::Portal;
pub use rect::{ScreenRect, Viewport};
pub use rect_cache::{CellRectInfo, PortalRectInfo, ScreenRectCache};
pub use traversal::{PortalTraversal, TraversalConfig};
pub use visitor::{CollectingVisitor, FnVisitor, NoopVisitor, TraversalVisitor};
