//! Convex polygon with an owned plane, the shape shared by portals and clip results.

use nalgebra::{Point3, Vector3};

use crate::clip::{self, ClipOutcome};
use crate::{Classification, Plane3D, PlaneSide, Ray};

/// Largest bend, in radians, between consecutive edges that still counts as
/// a straight line: a few f32 ulps of a unit vector.
const COLLINEAR_TOLERANCE: f32 = 1e-6;

/// A convex planar polygon.
///
/// The vertex order is whatever the producer supplied; the polygon does not
/// validate convexity or coplanarity. Fewer than three vertices means the
/// polygon is degenerate and carries no visibility meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolygon {
    vertices: Vec<Point3<f32>>,
    plane: Plane3D,
}

impl ConvexPolygon {
    /// Creates an empty polygon lying on `plane`.
    pub fn new(plane: Plane3D) -> Self {
        Self {
            vertices: Vec::new(),
            plane,
        }
    }

    /// Creates a polygon from a plane and a vertex list.
    pub fn with_vertices(plane: Plane3D, vertices: Vec<Point3<f32>>) -> Self {
        Self { vertices, plane }
    }

    /// Appends a vertex. No validation is done.
    pub fn add_point(&mut self, point: Point3<f32>) {
        self.vertices.push(point);
    }

    #[inline]
    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.vertices
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// True when the polygon has fewer than three vertices.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() < 3
    }

    #[inline]
    pub fn plane(&self) -> &Plane3D {
        &self.plane
    }

    pub fn set_plane(&mut self, plane: Plane3D) {
        self.plane = plane;
    }

    /// Number of vertices strictly behind `plane`.
    pub fn out_count(&self, plane: &Plane3D) -> usize {
        self.vertices
            .iter()
            .filter(|v| plane.classify_point(**v) == PlaneSide::Back)
            .count()
    }

    /// Clips the polygon in place, keeping the part in front of `plane`.
    ///
    /// Clipping an already clipped polygon by the same plane is a no-op.
    pub fn clip_by_plane(&mut self, plane: &Plane3D) -> ClipOutcome {
        clip::clip_in_place(&mut self.vertices, plane)
    }

    /// Removes vertices that lie on the line through their neighbours.
    ///
    /// Returns the number of vertices removed. Never reduces a polygon below
    /// three vertices.
    pub fn optimize(&mut self) -> usize {
        let mut removed = 0;
        let mut idx = 0;

        while self.vertices.len() > 3 && idx < self.vertices.len() {
            let n = self.vertices.len();
            let prev = self.vertices[(idx + n - 1) % n];
            let current = self.vertices[idx];
            let next = self.vertices[(idx + 1) % n];

            if is_redundant(prev, current, next) {
                self.vertices.remove(idx);
                removed += 1;
            } else {
                idx += 1;
            }
        }

        removed
    }

    /// Tests whether `ray` passes through the polygon.
    ///
    /// The hit point on the polygon's plane has to lie on the same side of
    /// every plane spanned by the ray origin and a polygon edge. Works for
    /// either winding.
    pub fn is_hit_by(&self, ray: &Ray) -> bool {
        if self.is_degenerate() {
            return false;
        }

        let Some(t) = ray.intersect_plane(&self.plane) else {
            return false;
        };
        let hit = ray.point_at(t);

        let mut positive = 0;
        let mut negative = 0;
        for (a, b) in self.edges() {
            let normal = (a - ray.origin).cross(&(b - ray.origin));
            let side = normal.dot(&(hit - ray.origin));
            if side > 0.0 {
                positive += 1;
            } else if side < 0.0 {
                negative += 1;
            } else {
                return false;
            }
        }

        positive == 0 || negative == 0
    }

    /// Tests whether the circle cut from a sphere by the polygon's plane lies
    /// entirely inside the polygon.
    ///
    /// `distance` is the signed distance of `position` to the polygon plane,
    /// as the caller usually has it at hand already.
    pub fn encloses_sphere(&self, position: Point3<f32>, radius: f32, distance: f32) -> bool {
        if self.is_degenerate() || distance.abs() > radius {
            return false;
        }

        let normal = self.plane.normal();
        let projected = position - normal * distance;
        let circle_radius = (radius * radius - distance * distance).sqrt();
        let centroid = self.centroid();

        self.edges().all(|(a, b)| {
            let Some(inward) = normal.cross(&(b - a)).try_normalize(f32::EPSILON) else {
                return false;
            };
            let inward = if inward.dot(&(centroid - a)) < 0.0 {
                -inward
            } else {
                inward
            };
            inward.dot(&(projected - a)) >= circle_radius
        })
    }

    /// Average of the vertices. The origin for an empty polygon.
    pub fn centroid(&self) -> Point3<f32> {
        if self.vertices.is_empty() {
            return Point3::origin();
        }
        let sum: Vector3<f32> = self.vertices.iter().map(|p| p.coords).sum();
        Point3::from(sum / self.vertices.len() as f32)
    }

    /// Vertex average and the largest vertex distance from it.
    ///
    /// Returns `None` for an empty polygon.
    pub fn bounding_sphere(&self) -> Option<(Point3<f32>, f32)> {
        if self.vertices.is_empty() {
            return None;
        }
        let center = self.centroid();
        let radius = self
            .vertices
            .iter()
            .map(|v| (v - center).norm())
            .fold(0.0_f32, f32::max);
        Some((center, radius))
    }

    /// Classifies this polygon relative to a plane.
    ///
    /// Returns:
    /// - `Front` if all vertices are in front of the plane
    /// - `Back` if all vertices are behind the plane
    /// - `Coplanar` if all vertices lie on the plane
    /// - `Spanning` if vertices are on both sides
    pub fn classify(&self, plane: &Plane3D) -> Classification {
        let mut front = 0;
        let mut back = 0;
        let mut on_plane = 0;

        for vertex in &self.vertices {
            match plane.classify_point(*vertex) {
                PlaneSide::Front => front += 1,
                PlaneSide::Back => back += 1,
                PlaneSide::OnPlane => on_plane += 1,
            }
        }

        if on_plane == self.vertices.len() {
            Classification::Coplanar
        } else if back == 0 {
            Classification::Front
        } else if front == 0 {
            Classification::Back
        } else {
            Classification::Spanning
        }
    }

    /// Consecutive vertex pairs, closing the loop.
    fn edges(&self) -> impl Iterator<Item = (Point3<f32>, Point3<f32>)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

fn is_redundant(prev: Point3<f32>, current: Point3<f32>, next: Point3<f32>) -> bool {
    let incoming = (current - prev).try_normalize(f32::EPSILON);
    let outgoing = (next - current).try_normalize(f32::EPSILON);
    match (incoming, outgoing) {
        (Some(a), Some(b)) => a.dot(&b) > 0.0 && a.cross(&b).norm() <= COLLINEAR_TOLERANCE,
        // zero-length edge
        _ => true,
    }
}

impl From<ConvexPolygon> for Plane3D {
    fn from(polygon: ConvexPolygon) -> Self {
        polygon.plane
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_square(half: f32) -> ConvexPolygon {
        let plane = Plane3D::new(Vector3::new(0.0, 0.0, 1.0), 0.0);
        ConvexPolygon::with_vertices(
            plane,
            vec![
                Point3::new(-half, -half, 0.0),
                Point3::new(half, -half, 0.0),
                Point3::new(half, half, 0.0),
                Point3::new(-half, half, 0.0),
            ],
        )
    }

    #[test]
    fn clip_through_center_keeps_half() {
        let mut square = make_square(1.0);
        let plane = Plane3D::new(Vector3::new(1.0, 0.0, 0.0), 0.0);
        let outcome = square.clip_by_plane(&plane);

        assert!(outcome.did_clip);
        assert_eq!(outcome.vertex_count, 4);
        for v in square.vertices() {
            assert!(v.x >= -1e-5);
        }
        assert!(square.vertices().iter().any(|v| v.x.abs() < 1e-5 && (v.y - 1.0).abs() < 1e-5));
        assert!(square.vertices().iter().any(|v| v.x.abs() < 1e-5 && (v.y + 1.0).abs() < 1e-5));
    }

    #[test]
    fn clip_twice_is_idempotent() {
        let mut square = make_square(1.0);
        let plane = Plane3D::new(Vector3::new(1.0, 1.0, 0.0), 0.2);
        square.clip_by_plane(&plane);
        let once = square.clone();

        let outcome = square.clip_by_plane(&plane);
        assert!(!outcome.did_clip);
        assert_eq!(square, once);
    }

    #[test]
    fn triangle_behind_plane_is_clipped_away() {
        let plane = Plane3D::new(Vector3::new(0.0, 0.0, 1.0), 0.0);
        let mut triangle = ConvexPolygon::with_vertices(
            plane.clone(),
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
        );
        let clip = Plane3D::new(Vector3::new(1.0, 0.0, 0.0), 5.0);
        let outcome = triangle.clip_by_plane(&clip);

        assert!(outcome.did_clip);
        assert_eq!(outcome.vertex_count, 0);
        assert!(triangle.is_empty());
    }

    #[test]
    fn classification_agrees_with_clip() {
        let plane = Plane3D::new(Vector3::new(1.0, 0.0, 0.0), 0.5);

        let square = make_square(1.0);
        assert_eq!(square.classify(&plane), Classification::Spanning);
        assert_eq!(square.out_count(&plane), 2);

        let mut behind = make_square(1.0);
        let far = Plane3D::new(Vector3::new(1.0, 0.0, 0.0), 3.0);
        assert_eq!(behind.classify(&far), Classification::Back);
        assert_eq!(behind.clip_by_plane(&far).vertex_count, 0);

        let mut ahead = make_square(1.0);
        let near = Plane3D::new(Vector3::new(1.0, 0.0, 0.0), -3.0);
        assert_eq!(ahead.classify(&near), Classification::Front);
        assert!(!ahead.clip_by_plane(&near).did_clip);
    }

    #[test]
    fn optimize_removes_collinear_vertices() {
        let plane = Plane3D::new(Vector3::new(0.0, 0.0, 1.0), 0.0);
        let mut poly = ConvexPolygon::with_vertices(
            plane,
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
        );

        assert_eq!(poly.optimize(), 2);
        assert_eq!(poly.len(), 4);
        assert_eq!(poly.optimize(), 0);
    }

    #[test]
    fn optimize_keeps_slight_bends() {
        // A bend of about 1e-3 rad at (5, -0.0025).
        let plane = Plane3D::new(Vector3::new(0.0, 0.0, 1.0), 0.0);
        let mut poly = ConvexPolygon::with_vertices(
            plane,
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(5.0, -0.0025, 0.0),
                Point3::new(10.0, 0.0, 0.0),
                Point3::new(10.0, 10.0, 0.0),
                Point3::new(0.0, 10.0, 0.0),
            ],
        );
        assert_eq!(poly.optimize(), 0);
        assert_eq!(poly.len(), 5);
    }

    #[test]
    fn optimize_keeps_triangles() {
        let plane = Plane3D::new(Vector3::new(0.0, 0.0, 1.0), 0.0);
        let mut poly = ConvexPolygon::with_vertices(
            plane,
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
        );
        assert_eq!(poly.optimize(), 0);
        assert_eq!(poly.len(), 3);
    }

    #[test]
    fn ray_hits_square_from_either_side() {
        let square = make_square(1.0);
        let down = Ray::new(Point3::new(0.2, 0.3, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let up = Ray::new(Point3::new(0.2, 0.3, -5.0), Vector3::new(0.0, 0.0, 1.0));
        let miss = Ray::new(Point3::new(3.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let away = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, 1.0));

        assert!(square.is_hit_by(&down));
        assert!(square.is_hit_by(&up));
        assert!(!square.is_hit_by(&miss));
        assert!(!square.is_hit_by(&away));
    }

    #[test]
    fn sphere_enclosure() {
        let square = make_square(2.0);
        assert!(square.encloses_sphere(Point3::new(0.0, 0.0, 0.5), 1.0, 0.5));
        // Touches the edge at x = 2.
        assert!(!square.encloses_sphere(Point3::new(1.5, 0.0, 0.0), 1.0, 0.0));
        // Plane not reached.
        assert!(!square.encloses_sphere(Point3::new(0.0, 0.0, 3.0), 1.0, 3.0));
    }

    #[test]
    fn bounding_sphere_covers_vertices() {
        let square = make_square(1.0);
        let (center, radius) = square.bounding_sphere().unwrap();
        assert!(center.coords.norm() < 1e-6);
        assert!((radius - 2.0_f32.sqrt()).abs() < 1e-5);

        let empty = ConvexPolygon::new(Plane3D::new(Vector3::new(0.0, 0.0, 1.0), 0.0));
        assert!(empty.bounding_sphere().is_none());
    }
}
