//! Oriented planes, side tests and rays.

use nalgebra::{Point3, Vector3};

/// Half width of the band around a plane in which points count as on it.
pub const PLANE_EPSILON: f32 = 1e-5;

/// Side of a plane a point is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Positive side, the one the normal points to.
    Front,
    Back,
    /// Inside the epsilon band.
    OnPlane,
}

/// Where a whole polygon lies relative to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Front,
    Back,
    /// Every vertex inside the epsilon band.
    Coplanar,
    /// Vertices strictly on both sides.
    Spanning,
}

/// An oriented plane `normal · p = offset` with a unit normal.
///
/// Portal planes point from the source cell into the target cell; cell
/// boundary planes point into the cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane3D {
    normal: Vector3<f32>,
    offset: f32,
}

impl Plane3D {
    /// Plane `normal · p = offset`. Both are scaled so the normal has unit length.
    ///
    /// # Panics
    /// Panics if the normal vector has zero length.
    pub fn new(normal: Vector3<f32>, offset: f32) -> Self {
        let norm = normal.norm();
        assert!(norm > f32::EPSILON, "Plane normal cannot be zero");
        Self {
            normal: normal / norm,
            offset: offset / norm,
        }
    }

    /// Creates a plane from the `normal · point + d = 0` form used by level data.
    ///
    /// # Panics
    /// Panics if the normal vector has zero length.
    pub fn from_equation(normal: Vector3<f32>, d: f32) -> Self {
        Self::new(normal, -d)
    }

    /// Plane through `point` with the given (not necessarily unit) normal.
    ///
    /// # Panics
    /// Panics if the normal vector has zero length.
    pub fn from_point_and_normal(point: Point3<f32>, normal: Vector3<f32>) -> Self {
        let norm = normal.norm();
        assert!(norm > f32::EPSILON, "Plane normal cannot be zero");
        let unit_normal = normal / norm;
        let offset = unit_normal.dot(&point.coords);
        Self {
            normal: unit_normal,
            offset,
        }
    }

    /// Plane through three points with normal `(b - a) × (c - a)`, or `None`
    /// when the points are collinear.
    pub fn try_from_three_points(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Option<Self> {
        let normal = (b - a).cross(&(c - a));
        let unit_normal = normal.try_normalize(f32::EPSILON)?;
        Some(Self {
            normal: unit_normal,
            offset: unit_normal.dot(&a.coords),
        })
    }

    #[inline]
    pub fn normal(&self) -> Vector3<f32> {
        self.normal
    }

    /// Distance of the plane from the origin, along the normal.
    #[inline]
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Positive in front of the plane, negative behind it.
    #[inline]
    pub fn signed_distance(&self, point: Point3<f32>) -> f32 {
        self.normal.dot(&point.coords) - self.offset
    }

    /// Side of `point`, using [`PLANE_EPSILON`].
    #[inline]
    pub fn classify_point(&self, point: Point3<f32>) -> PlaneSide {
        let dist = self.signed_distance(point);
        if dist > PLANE_EPSILON {
            PlaneSide::Front
        } else if dist < -PLANE_EPSILON {
            PlaneSide::Back
        } else {
            PlaneSide::OnPlane
        }
    }

    /// The same plane facing the other way.
    #[inline]
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            offset: -self.offset,
        }
    }

    /// Returns this plane, flipped if needed so that `point` is not behind it.
    pub fn facing(self, point: Point3<f32>) -> Self {
        if self.signed_distance(point) < 0.0 {
            self.flipped()
        } else {
            self
        }
    }

    /// Point where the edge `inside -> outside` crosses the plane.
    ///
    /// The caller guarantees the endpoints lie on different sides, so the
    /// denominator cannot vanish.
    #[inline]
    pub(crate) fn edge_intersection(&self, outside: Point3<f32>, inside: Point3<f32>) -> Point3<f32> {
        let dv = inside - outside;
        let t = self.signed_distance(inside) / self.normal.dot(&dv);
        inside - dv * t
    }
}

/// A half-line with an origin and a (not necessarily unit) direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t` along the ray.
    #[inline]
    pub fn point_at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Parameter of the forward intersection with `plane`, if any.
    ///
    /// Returns `None` when the ray is parallel to the plane or the plane lies
    /// behind the origin.
    pub fn intersect_plane(&self, plane: &Plane3D) -> Option<f32> {
        let denom = plane.normal().dot(&self.direction);
        if denom.abs() < f32::EPSILON {
            return None;
        }
        let t = -plane.signed_distance(self.origin) / denom;
        (t >= 0.0).then_some(t)
    }
}
