//! Dynamic lights and the cells they reach.
//!
//! A light is treated as a viewer: the portal traversal runs from its
//! position, limited to portals within its range, and every cell reached is
//! marked as affected. A point light looks down the six axis directions, each
//! covering one face of a cube around it; a spot light looks along its cone.

use std::collections::BTreeSet;
use std::f32::consts::{FRAC_PI_4, SQRT_2};

use log::debug;
use nalgebra::{Point3, Vector3};

use crate::error::Result;
use crate::{
    BspTree, CellId, LightId, NoopVisitor, PortalFrustum, PortalTraversal, TraversalConfig,
    ViewCamera, Viewport,
};

/// Screen used when projecting portals from a light.
const LIGHT_VIEWPORT: Viewport = Viewport::new(256, 256);

/// Widest half angle a single light view may have.
const MAX_HALF_ANGLE: f32 = 89.0 * std::f32::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Shines in every direction up to `range`.
    Point { range: f32 },
    /// Shines along `direction` inside a cone of half angle `outer_angle`.
    Spot {
        direction: Vector3<f32>,
        outer_angle: f32,
        range: f32,
    },
}

impl LightKind {
    pub fn range(&self) -> f32 {
        match *self {
            LightKind::Point { range } | LightKind::Spot { range, .. } => range,
        }
    }
}

/// A light that moves, and therefore needs its affected cells recomputed.
#[derive(Debug)]
pub struct DynamicLight {
    id: LightId,
    pub position: Point3<f32>,
    pub kind: LightKind,
    traversal: PortalTraversal,
}

impl DynamicLight {
    pub fn point(id: LightId, position: Point3<f32>, range: f32) -> Self {
        Self::new(id, position, LightKind::Point { range })
    }

    pub fn spot(
        id: LightId,
        position: Point3<f32>,
        direction: Vector3<f32>,
        outer_angle: f32,
        range: f32,
    ) -> Self {
        Self::new(
            id,
            position,
            LightKind::Spot {
                direction,
                outer_angle,
                range,
            },
        )
    }

    fn new(id: LightId, position: Point3<f32>, kind: LightKind) -> Self {
        Self {
            id,
            position,
            kind,
            traversal: PortalTraversal::with_config(TraversalConfig {
                max_portal_distance: Some(kind.range()),
                ..TraversalConfig::default()
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> LightId {
        self.id
    }

    /// Cells found by the last update.
    pub fn affected_cells(&self) -> &BTreeSet<CellId> {
        self.traversal.visible_cells()
    }

    /// Marks `cell` as affected without a traversal.
    pub fn affects_cell(&mut self, tree: &mut BspTree, cell: CellId) -> Result<()> {
        tree.add_affecting_light(cell, self.id, true)?;
        self.traversal.add_cell(cell);
        Ok(())
    }

    /// Withdraws the dynamic registration from every cell this light reached.
    ///
    /// A static registration under the same id is left in place.
    pub fn clear_affected_cells(&mut self, tree: &mut BspTree) -> Result<()> {
        for cell in self.traversal.visible_cells() {
            tree.remove_dynamic_light(*cell, self.id)?;
        }
        self.traversal.clear();
        Ok(())
    }

    /// Recomputes the affected cells from the current position and kind.
    ///
    /// Returns how many cells the light now reaches.
    pub fn update_affected_cells(&mut self, tree: &mut BspTree) -> Result<usize> {
        self.clear_affected_cells(tree)?;
        self.traversal.set_config(TraversalConfig {
            max_portal_distance: Some(self.kind.range()),
            ..*self.traversal.config()
        });

        let views: Vec<(Vector3<f32>, f32)> = match self.kind {
            LightKind::Point { .. } => [
                Vector3::x(),
                -Vector3::x(),
                Vector3::y(),
                -Vector3::y(),
                Vector3::z(),
                -Vector3::z(),
            ]
            .into_iter()
            .map(|direction| (direction, FRAC_PI_4))
            .collect(),
            LightKind::Spot {
                direction,
                outer_angle,
                ..
            } => vec![(direction, outer_angle)],
        };

        for (i, (direction, half_angle)) in views.into_iter().enumerate() {
            if direction.norm() <= f32::EPSILON {
                continue;
            }
            let half_angle = half_angle.clamp(f32::EPSILON, MAX_HALF_ANGLE);
            let camera = ViewCamera::new(self.position, direction, Vector3::z())
                .with_fov(2.0 * half_angle)
                .with_aspect(1.0);

            let mut view = camera.view_setup(LIGHT_VIEWPORT);
            // Pyramid edges reach out to the corners of the square the cone spans.
            let edge_angle = (half_angle.tan() * SQRT_2).atan();
            view.frustum = PortalFrustum::cone(self.position, direction, edge_angle, 4);

            self.traversal
                .traverse_with(tree, &view, i == 0, &mut NoopVisitor)?;
        }

        let cells: Vec<CellId> = self.traversal.visible_cells().iter().copied().collect();
        for cell in &cells {
            tree.add_affecting_light(*cell, self.id, true)?;
        }

        debug!("light {} affects {} cells", self.id, cells.len());
        Ok(cells.len())
    }
}
