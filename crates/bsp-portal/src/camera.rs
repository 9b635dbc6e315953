//! Perspective viewer and the per-frame inputs the traversal needs from it.

use nalgebra::{Isometry3, Matrix4, Perspective3, Point3, Vector3};

use crate::{Plane3D, PortalFrustum, Viewport};

/// Offset of the cut plane in front of the eye.
const CUT_PLANE_OFFSET: f32 = 0.01;

/// A perspective viewer: camera or light.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewCamera {
    pub position: Point3<f32>,
    direction: Vector3<f32>,
    up: Vector3<f32>,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl ViewCamera {
    /// Camera at `position` looking along `direction`.
    ///
    /// Defaults to a 60 degree vertical field of view and the aspect of the
    /// default viewport.
    ///
    /// # Panics
    /// Panics if `direction` has zero length.
    pub fn new(position: Point3<f32>, direction: Vector3<f32>, up: Vector3<f32>) -> Self {
        let norm = direction.norm();
        assert!(norm > f32::EPSILON, "Camera direction cannot be zero");
        let direction = direction / norm;
        Self {
            position,
            direction,
            up: pick_up(direction, up),
            fov_y: std::f32::consts::FRAC_PI_3,
            aspect: Viewport::default().aspect(),
            near: 0.1,
            far: 10_000.0,
        }
    }

    pub fn with_fov(mut self, fov_y: f32) -> Self {
        self.fov_y = fov_y;
        self
    }

    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Unit view direction.
    #[inline]
    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    #[inline]
    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    /// Points the camera along `direction`; zero vectors are ignored.
    pub fn set_direction(&mut self, direction: Vector3<f32>) {
        if let Some(direction) = direction.try_normalize(f32::EPSILON) {
            self.direction = direction;
            self.up = pick_up(direction, self.up);
        }
    }

    /// Unit vector to the right of the view direction.
    pub fn right(&self) -> Vector3<f32> {
        self.direction.cross(&self.up).normalize()
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        let target = self.position + self.direction;
        Isometry3::look_at_rh(&self.position, &target, &self.up).to_homogeneous()
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Perspective3::new(self.aspect, self.fov_y, self.near, self.far).to_homogeneous()
    }

    /// World to normalized device coordinates.
    pub fn to_screen(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Plane just in front of the eye, facing along the view direction.
    pub fn cut_plane(&self) -> Plane3D {
        Plane3D::from_point_and_normal(
            self.position + self.direction * CUT_PLANE_OFFSET,
            self.direction,
        )
    }

    /// Bottom, left, top and right side planes of the view volume, facing inward.
    pub fn frustum_planes(&self) -> Vec<Plane3D> {
        let right = self.right();
        let up = right.cross(&self.direction);
        let ty = (self.fov_y * 0.5).tan();
        let tx = ty * self.aspect;

        let corner = |sx: f32, sy: f32| self.direction + right * (tx * sx) + up * (ty * sy);
        let bottom_left = corner(-1.0, -1.0);
        let bottom_right = corner(1.0, -1.0);
        let top_right = corner(1.0, 1.0);
        let top_left = corner(-1.0, 1.0);

        let inside = self.position + self.direction;
        [
            (bottom_right, bottom_left),
            (bottom_left, top_left),
            (top_left, top_right),
            (top_right, bottom_right),
        ]
        .into_iter()
        .filter_map(|(a, b)| {
            Plane3D::try_from_three_points(self.position, self.position + a, self.position + b)
                .map(|plane| plane.facing(inside))
        })
        .collect()
    }

    /// Everything a traversal from this viewer needs.
    pub fn view_setup(&self, viewport: Viewport) -> ViewSetup {
        ViewSetup {
            position: self.position,
            to_screen: self.to_screen(),
            cut_plane: self.cut_plane(),
            frustum: PortalFrustum::from_camera(self),
            viewport,
        }
    }
}

/// Per-frame traversal inputs derived from a viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSetup {
    pub position: Point3<f32>,
    /// Projection times view.
    pub to_screen: Matrix4<f32>,
    /// Clips the portals of cells past the first one.
    pub cut_plane: Plane3D,
    /// Clips the portals of the cell the viewer stands in.
    pub frustum: PortalFrustum,
    pub viewport: Viewport,
}

/// Replaces an up vector that is parallel to `direction`.
fn pick_up(direction: Vector3<f32>, up: Vector3<f32>) -> Vector3<f32> {
    if direction.cross(&up).norm() > 1e-4 {
        return up.normalize();
    }
    if direction.z.abs() < 0.9 {
        Vector3::z()
    } else {
        Vector3::y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_camera() -> ViewCamera {
        ViewCamera::new(Point3::new(1.0, 2.0, 3.0), Vector3::new(2.0, 0.0, 0.0), Vector3::z())
    }

    #[test]
    fn direction_is_normalized() {
        let camera = make_camera();
        assert!((camera.direction().norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn parallel_up_is_replaced() {
        let camera = ViewCamera::new(Point3::origin(), Vector3::z(), Vector3::z());
        assert!(camera.direction().cross(&camera.up()).norm() > 0.5);
    }

    #[test]
    fn cut_plane_sits_in_front_of_eye() {
        let camera = make_camera();
        let plane = camera.cut_plane();
        assert!(plane.signed_distance(camera.position) < 0.0);
        assert!(plane.signed_distance(Point3::new(5.0, 2.0, 3.0)) > 0.0);
    }

    #[test]
    fn side_planes_contain_the_view_axis() {
        let camera = make_camera();
        let planes = camera.frustum_planes();
        assert_eq!(planes.len(), 4);

        let ahead = Point3::new(50.0, 2.0, 3.0);
        let behind = Point3::new(-50.0, 2.0, 3.0);
        let far_left = Point3::new(2.0, 200.0, 3.0);
        for plane in &planes {
            assert!(plane.signed_distance(ahead) > 0.0);
        }
        assert!(planes.iter().any(|p| p.signed_distance(behind) < 0.0));
        assert!(planes.iter().any(|p| p.signed_distance(far_left) < 0.0));
    }

    #[test]
    fn view_axis_projects_to_screen_center() {
        let camera = make_camera();
        let ndc = camera.to_screen().transform_point(&Point3::new(10.0, 2.0, 3.0));
        assert!(ndc.x.abs() < 1e-4);
        assert!(ndc.y.abs() < 1e-4);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }

    #[test]
    fn zero_width_viewport_still_projects() {
        let viewport = Viewport::new(0, 768);
        let view = make_camera().with_aspect(viewport.aspect()).view_setup(viewport);
        assert!(view.to_screen.iter().all(|v| v.is_finite()));
    }
}
