//! Shared visualization utilities for the portal traversal viewer.

use std::hash::{Hash, Hasher};

use bsp_portal::{
    Aabb, BspTree, CellId, ConvexPolygon, NodeId, Plane3D, Result, ViewCamera,
};
use macroquad::models::{draw_mesh, Mesh, Vertex};
use macroquad::prelude::*;
use nalgebra::{Point3, Vector3};

pub mod navigator;
pub use navigator::TreeNavigator;

/// Generates a deterministic color from a cell id using hashing.
/// Cells keep their color across frames and runs.
pub fn cell_color(cell: CellId) -> Color {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    cell.hash(&mut hasher);
    let hash = hasher.finish();

    let r = ((hash >> 16) & 0xFF) as u8;
    let g = ((hash >> 8) & 0xFF) as u8;
    let b = (hash & 0xFF) as u8;

    // Ensure colors aren't too dark by adding a minimum brightness
    Color::from_rgba(r.max(40), g.max(40), b.max(40), 255)
}

fn to_vec3(p: &Point3<f32>) -> Vec3 {
    vec3(p.x, p.y, p.z)
}

/// Draws a convex polygon by fan triangulation using a Mesh.
pub fn draw_polygon(polygon: &ConvexPolygon, color: Color) {
    let verts = polygon.vertices();
    if verts.len() < 3 {
        return;
    }

    let mesh_vertices: Vec<Vertex> = verts
        .iter()
        .map(|p| Vertex::new2(to_vec3(p), vec2(0.0, 0.0), color))
        .collect();

    let mut indices: Vec<u16> = Vec::with_capacity((verts.len() - 2) * 3);
    for i in 1..verts.len() - 1 {
        indices.push(0);
        indices.push(i as u16);
        indices.push((i + 1) as u16);
    }

    draw_mesh(&Mesh {
        vertices: mesh_vertices,
        indices,
        texture: None,
    });
}

/// Draws the outline of a polygon.
pub fn draw_polygon_outline(polygon: &ConvexPolygon, color: Color) {
    let verts = polygon.vertices();
    for (i, a) in verts.iter().enumerate() {
        let b = &verts[(i + 1) % verts.len()];
        draw_line_3d(to_vec3(a), to_vec3(b), color);
    }
}

/// Draws the bounding box of a cell as wires.
pub fn draw_cell_box(bounds: &Aabb, color: Color) {
    let center = to_vec3(&bounds.center());
    let size = to_vec3(&Point3::from(bounds.max - bounds.min));
    draw_cube_wires(center, size, color);
}

/// Builds a `cols` by `rows` grid of box rooms, `size` units on every side.
///
/// Cell `r * cols + c` is the room in column `c` and row `r`. Neighbouring
/// rooms are joined by a doorway with a portal each way, and the tree splits
/// the grid in halves along its longer side until single rooms remain.
pub fn generate_room_grid(cols: usize, rows: usize, size: f32) -> Result<BspTree> {
    let mut tree = BspTree::new();
    let cols = cols.max(1);
    let rows = rows.max(1);
    let cell = |c: usize, r: usize| CellId::from_index(r * cols + c);

    let mut next_node = 0;
    let root = build_grid_node(&mut tree, &mut next_node, (0, cols), (0, rows), cols, size)?;
    tree.set_root_node(root)?;

    for r in 0..rows {
        for c in 0..cols {
            let min = Point3::new(c as f32 * size, r as f32 * size, 0.0);
            let max = min + Vector3::repeat(size);
            tree.set_cell_bounds(cell(c, r), Some(Aabb::new(min, max)))?;
        }
    }

    let door_width = size * 0.2;
    let door_height = size * 0.35;
    for r in 0..rows {
        for c in 0..cols {
            let x = (c as f32 + 0.5) * size;
            let y = (r as f32 + 0.5) * size;
            if c + 1 < cols {
                let center = Point3::new((c + 1) as f32 * size, y, door_height);
                let (u, v) = (Vector3::y() * door_width, Vector3::z() * door_height);
                add_doorway(&mut tree, cell(c, r), cell(c + 1, r), Vector3::x(), center, u, v)?;
            }
            if r + 1 < rows {
                let center = Point3::new(x, (r + 1) as f32 * size, door_height);
                let (u, v) = (Vector3::x() * door_width, Vector3::z() * door_height);
                add_doorway(&mut tree, cell(c, r), cell(c, r + 1), Vector3::y(), center, u, v)?;
            }
        }
    }

    log::info!(
        "generated {}x{} room grid: {} nodes, {} portals, depth {}",
        cols,
        rows,
        tree.node_count(),
        tree.portal_count(),
        tree.depth()
    );

    Ok(tree)
}

fn build_grid_node(
    tree: &mut BspTree,
    next_node: &mut u32,
    (c0, c1): (usize, usize),
    (r0, r1): (usize, usize),
    cols: usize,
    size: f32,
) -> Result<NodeId> {
    let id = NodeId::new(*next_node);
    *next_node += 1;

    if c1 - c0 == 1 && r1 - r0 == 1 {
        tree.create_node(id, Some(CellId::from_index(r0 * cols + c0)))?;
        return Ok(id);
    }

    tree.create_node(id, None)?;
    let (plane, front, back) = if c1 - c0 >= r1 - r0 {
        let mid = (c0 + c1) / 2;
        let plane = Plane3D::new(Vector3::x(), mid as f32 * size);
        let front = build_grid_node(tree, next_node, (mid, c1), (r0, r1), cols, size)?;
        let back = build_grid_node(tree, next_node, (c0, mid), (r0, r1), cols, size)?;
        (plane, front, back)
    } else {
        let mid = (r0 + r1) / 2;
        let plane = Plane3D::new(Vector3::y(), mid as f32 * size);
        let front = build_grid_node(tree, next_node, (c0, c1), (mid, r1), cols, size)?;
        let back = build_grid_node(tree, next_node, (c0, c1), (r0, mid), cols, size)?;
        (plane, front, back)
    };

    tree.set_split_plane(id, plane)?;
    tree.set_front_child(id, Some(front))?;
    tree.set_back_child(id, Some(back))?;
    Ok(id)
}

/// Adds a rectangular doorway with a portal in each direction.
fn add_doorway(
    tree: &mut BspTree,
    a: CellId,
    b: CellId,
    normal: Vector3<f32>,
    center: Point3<f32>,
    u: Vector3<f32>,
    v: Vector3<f32>,
) -> Result<()> {
    let corners = [center - u - v, center + u - v, center + u + v, center - u + v];
    for (source, target, n) in [(a, b, normal), (b, a, -normal)] {
        let id = tree.create_portal(source, target, Plane3D::from_point_and_normal(center, n))?;
        let portal = tree.portal_mut(id)?;
        for corner in corners {
            portal.add_point(corner);
        }
        portal.refresh_bounding_volume();
    }
    Ok(())
}

/// Orbit camera looking down on the level, z up.
pub struct OrbitCamera {
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub target: Vec3,
    /// Multiplier for scroll wheel zoom
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitCamera {
    pub fn new(distance: f32, yaw: f32, pitch: f32) -> Self {
        Self {
            distance,
            yaw,
            pitch,
            target: vec3(0.0, 0.0, 0.0),
            zoom_speed: 5.0,
            min_distance: 10.0,
            max_distance: 500.0,
        }
    }

    /// Sets the zoom configuration (speed and distance limits).
    pub fn with_zoom(mut self, speed: f32, min: f32, max: f32) -> Self {
        self.zoom_speed = speed;
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    pub fn with_target(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    /// Updates camera state from mouse drag and scroll.
    pub fn update(&mut self) {
        if is_mouse_button_down(MouseButton::Left) {
            let delta = mouse_delta_position();
            self.yaw -= delta.x * 2.0;
            self.pitch -= delta.y * 2.0;
        }

        // Clamp pitch to avoid gimbal lock
        self.pitch = self.pitch.clamp(0.05, 1.5);

        let scroll = mouse_wheel().1;
        self.distance -= scroll * self.zoom_speed;
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.cos();
        let y = self.distance * self.pitch.cos() * self.yaw.sin();
        let z = self.distance * self.pitch.sin();
        self.target + vec3(x, y, z)
    }

    /// Converts to macroquad's Camera3D for rendering.
    pub fn to_camera3d(&self) -> Camera3D {
        Camera3D {
            position: self.position(),
            up: vec3(0.0, 0.0, 1.0),
            target: self.target,
            ..Default::default()
        }
    }
}

/// First-person camera walking through the level, z up.
pub struct WalkCamera {
    pub position: Point3<f32>,
    pub yaw: f32,
    pub pitch: f32,
    /// Units per second
    pub speed: f32,
    /// Radians per second
    pub turn_speed: f32,
}

impl WalkCamera {
    pub fn new(position: Point3<f32>, yaw: f32) -> Self {
        Self {
            position,
            yaw,
            pitch: 0.0,
            speed: 15.0,
            turn_speed: 1.8,
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        Vector3::new(
            self.pitch.cos() * self.yaw.cos(),
            self.pitch.cos() * self.yaw.sin(),
            self.pitch.sin(),
        )
    }

    /// WASD moves in the horizontal plane, arrows turn and look up or down.
    pub fn update(&mut self, dt: f32) {
        if is_key_down(KeyCode::Left) {
            self.yaw += self.turn_speed * dt;
        }
        if is_key_down(KeyCode::Right) {
            self.yaw -= self.turn_speed * dt;
        }
        if is_key_down(KeyCode::Up) {
            self.pitch += self.turn_speed * dt;
        }
        if is_key_down(KeyCode::Down) {
            self.pitch -= self.turn_speed * dt;
        }
        self.pitch = self.pitch.clamp(-1.4, 1.4);

        let ahead = Vector3::new(self.yaw.cos(), self.yaw.sin(), 0.0);
        let left = Vector3::new(-self.yaw.sin(), self.yaw.cos(), 0.0);
        let mut step = Vector3::zeros();
        if is_key_down(KeyCode::W) {
            step += ahead;
        }
        if is_key_down(KeyCode::S) {
            step -= ahead;
        }
        if is_key_down(KeyCode::A) {
            step += left;
        }
        if is_key_down(KeyCode::D) {
            step -= left;
        }
        if let Some(dir) = step.try_normalize(f32::EPSILON) {
            self.position += dir * self.speed * dt;
        }
    }

    /// The traversal viewer matching this camera.
    pub fn view_camera(&self, fov_y: f32, aspect: f32) -> ViewCamera {
        ViewCamera::new(self.position, self.forward(), Vector3::z())
            .with_fov(fov_y)
            .with_aspect(aspect)
    }

    pub fn to_camera3d(&self, fov_y: f32) -> Camera3D {
        let eye = to_vec3(&self.position);
        let f = self.forward();
        Camera3D {
            position: eye,
            target: eye + vec3(f.x, f.y, f.z),
            up: vec3(0.0, 0.0, 1.0),
            fovy: fov_y,
            ..Default::default()
        }
    }

    /// Draws the eye and view direction, for the overview.
    pub fn draw_marker(&self, color: Color) {
        let eye = to_vec3(&self.position);
        let f = self.forward() * 3.0;
        draw_sphere(eye, 0.4, None, color);
        draw_line_3d(eye, eye + vec3(f.x, f.y, f.z), color);
    }
}
