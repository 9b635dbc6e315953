//! Small hand-built levels shared by the unit tests.

use nalgebra::{Point3, Vector3};

use crate::{Aabb, BspTree, CellId, NodeId, Plane3D};

fn make_box(min: [f32; 3], max: [f32; 3]) -> Option<Aabb> {
    Some(Aabb::new(Point3::from(min), Point3::from(max)))
}

/// Adds a quad portal given as a center and two half-extent vectors.
pub(crate) fn add_square_portal(
    tree: &mut BspTree,
    source: CellId,
    target: CellId,
    normal: Vector3<f32>,
    center: Point3<f32>,
    u: Vector3<f32>,
    v: Vector3<f32>,
) {
    let plane = Plane3D::from_point_and_normal(center, normal);
    let id = tree.create_portal(source, target, plane).unwrap();
    let portal = tree.portal_mut(id).unwrap();
    portal.add_point(center - u - v);
    portal.add_point(center + u - v);
    portal.add_point(center + u + v);
    portal.add_point(center - u + v);
    portal.refresh_bounding_volume();
}

/// One cell, `[0, 10]` on every axis, as the lone leaf of the tree.
pub(crate) fn single_cell() -> BspTree {
    let mut tree = BspTree::new();
    tree.create_node(NodeId::new(0), Some(CellId::new(0))).unwrap();
    tree.set_root_node(NodeId::new(0)).unwrap();
    tree.set_cell_bounds(CellId::new(0), make_box([0.0; 3], [10.0; 3]))
        .unwrap();
    tree
}

/// `n` box cells in a row along x, each 10 units long.
///
/// Cell `k` spans `x` in `[10k, 10k + 10]` and `[0, 10]` on y and z. Each
/// shared wall has a 6x6 opening with a portal in either direction; portal
/// `2k` leads forward out of cell `k`, portal `2k + 1` back into it.
/// Space behind `x = 0` is outside the world.
pub(crate) fn chain(n: usize) -> BspTree {
    assert!(n >= 1);
    let mut tree = BspTree::new();
    let leaf = |k: usize| NodeId::from_index(100 + k);

    for k in 0..n {
        tree.create_node(leaf(k), Some(CellId::from_index(k))).unwrap();
        let x = 10.0 * k as f32;
        tree.set_cell_bounds(
            CellId::from_index(k),
            make_box([x, 0.0, 0.0], [x + 10.0, 10.0, 10.0]),
        )
        .unwrap();
    }

    // Guard node, then one split per wall.
    for k in 0..n {
        tree.create_node(NodeId::from_index(k), None).unwrap();
    }
    tree.set_split_plane(NodeId::new(0), Plane3D::new(Vector3::x(), 0.0))
        .unwrap();
    tree.set_back_child(NodeId::new(0), None).unwrap();
    let first = if n > 1 { NodeId::new(1) } else { leaf(0) };
    tree.set_front_child(NodeId::new(0), Some(first)).unwrap();

    for k in 0..n - 1 {
        let node = NodeId::from_index(k + 1);
        let x = 10.0 * (k + 1) as f32;
        tree.set_split_plane(node, Plane3D::new(Vector3::x(), x)).unwrap();
        tree.set_back_child(node, Some(leaf(k))).unwrap();
        let front = if k + 2 < n { NodeId::from_index(k + 2) } else { leaf(k + 1) };
        tree.set_front_child(node, Some(front)).unwrap();
    }
    tree.set_root_node(NodeId::new(0)).unwrap();

    for k in 0..n - 1 {
        let center = Point3::new(10.0 * (k + 1) as f32, 5.0, 5.0);
        let (u, v) = (Vector3::new(0.0, 3.0, 0.0), Vector3::new(0.0, 0.0, 3.0));
        let here = CellId::from_index(k);
        let next = CellId::from_index(k + 1);
        add_square_portal(&mut tree, here, next, Vector3::x(), center, u, v);
        add_square_portal(&mut tree, next, here, -Vector3::x(), center, u, v);
    }

    tree
}

/// Three cells around a corner.
///
/// A (cell 0) is `[0, 10] x [0, 10]`, B (cell 1) `[10, 20] x [0, 10]` and
/// C (cell 2) `[0, 20] x [10, 20]`, all with z in `[0, 10]`. Every pair
/// shares an opening with portals both ways.
pub(crate) fn triangle() -> BspTree {
    let (a, b, c) = (CellId::new(0), CellId::new(1), CellId::new(2));
    let mut tree = BspTree::new();

    tree.create_node(NodeId::new(0), None).unwrap();
    tree.create_node(NodeId::new(1), None).unwrap();
    tree.create_node(NodeId::new(10), Some(a)).unwrap();
    tree.create_node(NodeId::new(11), Some(b)).unwrap();
    tree.create_node(NodeId::new(12), Some(c)).unwrap();

    tree.set_split_plane(NodeId::new(0), Plane3D::new(Vector3::y(), 10.0))
        .unwrap();
    tree.set_front_child(NodeId::new(0), Some(NodeId::new(12))).unwrap();
    tree.set_back_child(NodeId::new(0), Some(NodeId::new(1))).unwrap();

    tree.set_split_plane(NodeId::new(1), Plane3D::new(Vector3::x(), 10.0))
        .unwrap();
    tree.set_front_child(NodeId::new(1), Some(NodeId::new(11))).unwrap();
    tree.set_back_child(NodeId::new(1), Some(NodeId::new(10))).unwrap();
    tree.set_root_node(NodeId::new(0)).unwrap();

    tree.set_cell_bounds(a, make_box([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]))
        .unwrap();
    tree.set_cell_bounds(b, make_box([10.0, 0.0, 0.0], [20.0, 10.0, 10.0]))
        .unwrap();
    tree.set_cell_bounds(c, make_box([0.0, 10.0, 0.0], [20.0, 20.0, 10.0]))
        .unwrap();

    let z = Vector3::new(0.0, 0.0, 3.0);
    let along_y = Vector3::new(0.0, 3.0, 0.0);
    let along_x = Vector3::new(3.0, 0.0, 0.0);

    let ab = Point3::new(10.0, 5.0, 5.0);
    add_square_portal(&mut tree, a, b, Vector3::x(), ab, along_y, z);
    add_square_portal(&mut tree, b, a, -Vector3::x(), ab, along_y, z);

    let ac = Point3::new(5.0, 10.0, 5.0);
    add_square_portal(&mut tree, a, c, Vector3::y(), ac, along_x, z);
    add_square_portal(&mut tree, c, a, -Vector3::y(), ac, along_x, z);

    let bc = Point3::new(15.0, 10.0, 5.0);
    add_square_portal(&mut tree, b, c, Vector3::y(), bc, along_x, z);
    add_square_portal(&mut tree, c, b, -Vector3::y(), bc, along_x, z);

    tree
}

/// Four cells where one room is seen along two routes.
///
/// R (cell 0) is `[0, 10] x [0, 10]`, A (cell 1) `[0, 10] x [10, 20]`, X
/// (cell 2) `[10, 20] x [0, 20]` and Y (cell 3) `[10, 20] x [20, 30]`, all
/// with z in `[0, 10]`. Portals run one way only: 0 is R to X, 1 is R to A,
/// 2 is A to X and 3 is X to Y. From the corner of R looking diagonally, Y
/// shows only through the part of X seen by way of A.
pub(crate) fn fork() -> BspTree {
    let (r, a, x, y) = (CellId::new(0), CellId::new(1), CellId::new(2), CellId::new(3));
    let mut tree = BspTree::new();

    for id in 0..3 {
        tree.create_node(NodeId::new(id), None).unwrap();
    }
    tree.create_node(NodeId::new(10), Some(r)).unwrap();
    tree.create_node(NodeId::new(11), Some(a)).unwrap();
    tree.create_node(NodeId::new(12), Some(x)).unwrap();
    tree.create_node(NodeId::new(13), Some(y)).unwrap();

    tree.set_split_plane(NodeId::new(0), Plane3D::new(Vector3::x(), 10.0))
        .unwrap();
    tree.set_front_child(NodeId::new(0), Some(NodeId::new(1))).unwrap();
    tree.set_back_child(NodeId::new(0), Some(NodeId::new(2))).unwrap();

    tree.set_split_plane(NodeId::new(1), Plane3D::new(Vector3::y(), 20.0))
        .unwrap();
    tree.set_front_child(NodeId::new(1), Some(NodeId::new(13))).unwrap();
    tree.set_back_child(NodeId::new(1), Some(NodeId::new(12))).unwrap();

    tree.set_split_plane(NodeId::new(2), Plane3D::new(Vector3::y(), 10.0))
        .unwrap();
    tree.set_front_child(NodeId::new(2), Some(NodeId::new(11))).unwrap();
    tree.set_back_child(NodeId::new(2), Some(NodeId::new(10))).unwrap();
    tree.set_root_node(NodeId::new(0)).unwrap();

    tree.set_cell_bounds(r, make_box([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]))
        .unwrap();
    tree.set_cell_bounds(a, make_box([0.0, 10.0, 0.0], [10.0, 20.0, 10.0]))
        .unwrap();
    tree.set_cell_bounds(x, make_box([10.0, 0.0, 0.0], [20.0, 20.0, 10.0]))
        .unwrap();
    tree.set_cell_bounds(y, make_box([10.0, 20.0, 0.0], [20.0, 30.0, 10.0]))
        .unwrap();

    let z = Vector3::new(0.0, 0.0, 3.0);
    let along_y = Vector3::new(0.0, 3.0, 0.0);
    let along_x = Vector3::new(3.0, 0.0, 0.0);

    add_square_portal(&mut tree, r, x, Vector3::x(), Point3::new(10.0, 5.0, 5.0), along_y, z);
    add_square_portal(&mut tree, r, a, Vector3::y(), Point3::new(5.0, 10.0, 5.0), along_x, z);
    add_square_portal(&mut tree, a, x, Vector3::x(), Point3::new(10.0, 15.0, 5.0), along_y, z);
    add_square_portal(&mut tree, x, y, Vector3::y(), Point3::new(15.0, 20.0, 5.0), along_x, z);

    tree
}
