//! Directed openings between cells.

use nalgebra::{Matrix4, Point3};

use crate::clip;
use crate::{
    CellId, ConvexPolygon, Plane3D, PlaneSide, PortalFrustum, PortalId, PortalRectInfo,
    SphereClassification, Viewport,
};

/// A convex opening leading from `source` into `target`.
///
/// The plane normal points from the source cell into the target cell. Per-run
/// screen state lives in the [`crate::ScreenRectCache`], so a portal is not
/// touched while a traversal runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Portal {
    id: PortalId,
    source: CellId,
    target: CellId,
    polygon: ConvexPolygon,
    center: Point3<f32>,
    radius: f32,
}

impl Portal {
    /// Creates a portal without vertices. Add them with [`Portal::add_point`]
    /// and call [`Portal::refresh_bounding_volume`] afterwards.
    pub fn new(id: PortalId, source: CellId, target: CellId, plane: Plane3D) -> Self {
        Self {
            id,
            source,
            target,
            polygon: ConvexPolygon::new(plane),
            center: Point3::origin(),
            radius: -1.0,
        }
    }

    #[inline]
    pub fn id(&self) -> PortalId {
        self.id
    }

    #[inline]
    pub fn source(&self) -> CellId {
        self.source
    }

    #[inline]
    pub fn target(&self) -> CellId {
        self.target
    }

    #[inline]
    pub fn polygon(&self) -> &ConvexPolygon {
        &self.polygon
    }

    #[inline]
    pub fn vertices(&self) -> &[Point3<f32>] {
        self.polygon.vertices()
    }

    #[inline]
    pub fn plane(&self) -> &Plane3D {
        self.polygon.plane()
    }

    pub fn add_point(&mut self, point: Point3<f32>) {
        self.polygon.add_point(point);
    }

    /// Center of the bounding sphere.
    #[inline]
    pub fn center(&self) -> Point3<f32> {
        self.center
    }

    /// Radius of the bounding sphere, negative while the portal has no vertices.
    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Recomputes the bounding sphere from the current vertices.
    pub fn refresh_bounding_volume(&mut self) {
        match self.polygon.bounding_sphere() {
            Some((center, radius)) => {
                self.center = center;
                self.radius = radius;
            }
            None => {
                self.center = Point3::origin();
                self.radius = -1.0;
            }
        }
    }

    /// Drops collinear vertices. See [`ConvexPolygon::optimize`].
    pub fn optimize(&mut self) -> usize {
        self.polygon.optimize()
    }

    /// True when `viewpoint` is on or behind the back face of the portal.
    ///
    /// Tested against the first vertex. A portal without vertices is always
    /// culled.
    pub fn is_backface_culled_for(&self, viewpoint: Point3<f32>) -> bool {
        match self.vertices().first() {
            Some(v0) => (viewpoint - v0).dot(&self.plane().normal()) >= 0.0,
            None => true,
        }
    }

    /// Distance from `point` to the bounding sphere, zero inside it.
    pub fn distance_from(&self, point: Point3<f32>) -> f32 {
        ((point - self.center).norm() - self.radius.max(0.0)).max(0.0)
    }

    /// Projects the portal after clipping it by a multi-plane frustum.
    ///
    /// Used for the outgoing portals of the cell the viewer stands in.
    pub fn refresh_screen_rect_with_frustum(
        &self,
        view_pos: Point3<f32>,
        to_screen: &Matrix4<f32>,
        viewport: Viewport,
        frustum: &PortalFrustum,
        info: &mut PortalRectInfo,
    ) {
        info.invalidate();

        info.culled = self.is_backface_culled_for(view_pos);
        if info.culled {
            return;
        }

        match frustum.portal_classification(self) {
            SphereClassification::Outside => {}
            SphereClassification::Inside => {
                for point in self.vertices() {
                    info.screen_rect
                        .enlarge_to_contain(to_screen.transform_point(point), viewport);
                }
            }
            SphereClassification::Intersecting => {
                if let Some(on_screen) = frustum.clip_portal(self) {
                    for point in on_screen.vertices() {
                        info.screen_rect
                            .enlarge_to_contain(to_screen.transform_point(point), viewport);
                    }
                }
            }
        }
    }

    /// Projects the part of the portal in front of `cut_plane`.
    ///
    /// Clipping and projection happen in a single walk over the vertices.
    /// Returns false when the portal is culled or lies wholly behind the plane.
    pub fn refresh_screen_rect_with_cut_plane(
        &self,
        view_pos: Point3<f32>,
        to_screen: &Matrix4<f32>,
        viewport: Viewport,
        cut_plane: &Plane3D,
        info: &mut PortalRectInfo,
    ) -> bool {
        info.invalidate();

        info.culled = self.is_backface_culled_for(view_pos);
        if info.culled {
            return false;
        }

        let mut sides = Vec::with_capacity(self.polygon.len());
        clip::classify_loop(self.vertices(), cut_plane, &mut sides);
        if !sides.contains(&PlaneSide::Front) {
            return false;
        }

        let rect = &mut info.screen_rect;
        clip::walk_loop(self.vertices(), &sides, cut_plane, |point| {
            rect.enlarge_to_contain(to_screen.transform_point(&point), viewport);
        });

        true
    }
}
