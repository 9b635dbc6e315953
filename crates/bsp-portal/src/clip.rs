//! Half-space clipping of convex vertex loops.

use nalgebra::Point3;

use crate::{Plane3D, PlaneSide};

/// How a vertex loop relates to the half-space in front of a clip plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipClass {
    /// No vertex is behind the plane; nothing would be removed.
    Inside,
    /// No vertex is in front of the plane; everything would be removed.
    Outside,
    /// Vertices on both sides; the loop has to be walked.
    Spanning,
}

/// Result of clipping a polygon in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipOutcome {
    /// Number of vertices left after the clip (0 when clipped away).
    pub vertex_count: usize,
    /// Whether the clip changed the polygon.
    pub did_clip: bool,
}

/// Classifies every vertex and counts the front/back ones.
pub(crate) fn classify_loop(
    vertices: &[Point3<f32>],
    plane: &Plane3D,
    sides: &mut Vec<PlaneSide>,
) -> ClipClass {
    sides.clear();
    let mut front = 0;
    let mut back = 0;

    for vertex in vertices {
        let side = plane.classify_point(*vertex);
        match side {
            PlaneSide::Front => front += 1,
            PlaneSide::Back => back += 1,
            PlaneSide::OnPlane => {}
        }
        sides.push(side);
    }

    if back == 0 {
        ClipClass::Inside
    } else if front == 0 {
        ClipClass::Outside
    } else {
        ClipClass::Spanning
    }
}

/// Walks a classified vertex loop and emits the part in front of the plane.
///
/// Uses the Sutherland-Hodgman scheme: front vertices are kept, and every
/// edge leaving or entering the front half-space contributes its crossing
/// point. Vertices lying on the plane next to a front vertex come out as
/// their own crossing point; other on-plane or back vertices are dropped.
pub(crate) fn walk_loop<F>(vertices: &[Point3<f32>], sides: &[PlaneSide], plane: &Plane3D, mut emit: F)
where
    F: FnMut(Point3<f32>),
{
    let n = vertices.len();
    if n == 0 {
        return;
    }

    let mut prev = n - 1;
    for idx in 0..n {
        let current = vertices[idx];
        let prev_front = sides[prev] == PlaneSide::Front;

        if sides[idx] == PlaneSide::Front {
            if !prev_front {
                // entering the kept half-space
                emit(plane.edge_intersection(vertices[prev], current));
            }
            emit(current);
        } else if prev_front {
            // leaving the kept half-space
            emit(plane.edge_intersection(current, vertices[prev]));
        }

        prev = idx;
    }
}

/// Clips `vertices` in place against `plane`, keeping the front part.
///
/// A result with fewer than three vertices is degenerate and is cleared.
pub(crate) fn clip_in_place(vertices: &mut Vec<Point3<f32>>, plane: &Plane3D) -> ClipOutcome {
    if vertices.is_empty() {
        return ClipOutcome {
            vertex_count: 0,
            did_clip: false,
        };
    }

    let mut sides = Vec::with_capacity(vertices.len());
    match classify_loop(vertices, plane, &mut sides) {
        ClipClass::Inside => ClipOutcome {
            vertex_count: vertices.len(),
            did_clip: false,
        },
        ClipClass::Outside => {
            vertices.clear();
            ClipOutcome {
                vertex_count: 0,
                did_clip: true,
            }
        }
        ClipClass::Spanning => {
            let mut clipped = Vec::with_capacity(vertices.len() + 1);
            walk_loop(vertices, &sides, plane, |p| clipped.push(p));

            if clipped.len() < 3 {
                vertices.clear();
            } else {
                *vertices = clipped;
            }

            ClipOutcome {
                vertex_count: vertices.len(),
                did_clip: true,
            }
        }
    }
}
