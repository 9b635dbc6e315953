//! Plane sets bounding a view volume, used to classify and clip portals.

use std::f32::consts::TAU;

use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

use crate::{ConvexPolygon, Plane3D, Portal, ViewCamera};

/// Where a bounding sphere lies relative to a frustum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SphereClassification {
    Outside = -1,
    Intersecting = 0,
    Inside = 1,
}

/// A convex volume given as planes; inside is the front side of every plane.
///
/// An empty frustum constrains nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortalFrustum {
    planes: Vec<Plane3D>,
}

impl PortalFrustum {
    pub fn new() -> Self {
        Self::default()
    }

    /// The volume seen through `portal` from `camera`, closed by the portal plane.
    ///
    /// A degenerate portal gives an empty frustum.
    pub fn from_camera_and_portal(camera: Point3<f32>, portal: &Portal) -> Self {
        let mut frustum = Self::from_point_and_portal(camera, portal);
        if !frustum.planes.is_empty() {
            frustum.planes.push(portal.plane().clone());
        }
        frustum
    }

    /// The four side planes of a camera's view volume.
    pub fn from_camera(camera: &ViewCamera) -> Self {
        Self {
            planes: camera.frustum_planes(),
        }
    }

    /// Fan of planes from `point` through every edge of `portal`.
    pub fn from_point_and_portal(point: Point3<f32>, portal: &Portal) -> Self {
        let vertices = portal.vertices();
        if vertices.len() < 3 {
            return Self::default();
        }

        let inside = portal.polygon().centroid();
        let mut prev = vertices[vertices.len() - 1];
        let mut planes = Vec::with_capacity(vertices.len() + 1);

        for &current in vertices {
            // An edge collinear with the apex bounds nothing.
            if let Some(plane) = Plane3D::try_from_three_points(prev, current, point) {
                planes.push(plane.facing(inside));
            }
            prev = current;
        }

        Self { planes }
    }

    /// `sides`-sided pyramid approximating a cone around `direction`.
    ///
    /// Its edges leave `point` at `half_angle` from the axis. The first edge
    /// is rotated half a step around the axis, so four sides with a half
    /// angle of `atan(sqrt(2))` cover one face of an axis-aligned cube.
    pub fn cone(point: Point3<f32>, direction: Vector3<f32>, half_angle: f32, sides: usize) -> Self {
        let Some(axis) = Unit::try_new(direction, f32::EPSILON) else {
            return Self::default();
        };
        if sides < 3 {
            return Self::default();
        }

        let perpendicular = perpendicular_to(&axis);
        let (sin, cos) = half_angle.sin_cos();
        let step = TAU / sides as f32;
        let edge = |k: usize| {
            let rotation = UnitQuaternion::from_axis_angle(&axis, step * (k as f32 + 0.5));
            axis.into_inner() * cos + rotation * perpendicular * sin
        };

        let inside = point + axis.into_inner();
        let planes = (0..sides)
            .filter_map(|k| {
                let a = point + edge(k);
                let b = point + edge(k + 1);
                Plane3D::try_from_three_points(point, a, b).map(|plane| plane.facing(inside))
            })
            .collect();

        Self { planes }
    }

    #[inline]
    pub fn planes(&self) -> &[Plane3D] {
        &self.planes
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Classifies a bounding sphere, stopping at the first plane that decides.
    pub fn classify_sphere(&self, center: Point3<f32>, radius: f32) -> SphereClassification {
        for plane in &self.planes {
            let distance = plane.signed_distance(center);
            if distance.abs() < radius {
                return SphereClassification::Intersecting;
            }
            if distance < -radius {
                return SphereClassification::Outside;
            }
        }
        SphereClassification::Inside
    }

    /// Conservative classification of a portal by its bounding sphere.
    ///
    /// Degenerate portals are outside.
    pub fn portal_classification(&self, portal: &Portal) -> SphereClassification {
        if portal.polygon().is_degenerate() || portal.radius() < 0.0 {
            return SphereClassification::Outside;
        }
        self.classify_sphere(portal.center(), portal.radius())
    }

    /// Part of `portal` inside the frustum, or `None` if nothing is left.
    pub fn clip_portal(&self, portal: &Portal) -> Option<ConvexPolygon> {
        match self.portal_classification(portal) {
            SphereClassification::Inside => Some(portal.polygon().clone()),
            SphereClassification::Outside => None,
            SphereClassification::Intersecting => self.clip_polygon(portal.polygon().clone()),
        }
    }

    /// Clips `polygon` by every plane in turn.
    pub fn clip_polygon(&self, mut polygon: ConvexPolygon) -> Option<ConvexPolygon> {
        if polygon.is_degenerate() {
            return None;
        }
        for plane in &self.planes {
            if polygon.clip_by_plane(plane).vertex_count <= 2 {
                return None;
            }
        }
        Some(polygon)
    }
}

/// A unit vector perpendicular to `axis`, built from the least aligned world axis.
fn perpendicular_to(axis: &Unit<Vector3<f32>>) -> Vector3<f32> {
    let a = axis.into_inner().abs();
    let helper = if a.x <= a.y && a.x <= a.z {
        Vector3::x()
    } else if a.y <= a.z {
        Vector3::y()
    } else {
        Vector3::z()
    };
    axis.cross(&helper).normalize()
}
