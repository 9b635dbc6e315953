//! Leaf payload: a convex region of the world and its portal connections.

use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use nalgebra::Point3;

use crate::{CellId, LightId, ObjectId, Plane3D, PlaneSide, PortalId};

bitflags! {
    /// Per-cell flags as stored in level data.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CellFlags: u32 {
        const WIREFRAME = 0x02;
        /// Traversal does not look through this cell.
        const VIS_BLOCK = 0x08;
        /// Takes part in vis-block spreading.
        const DOORWAY   = 0x10;
        const FOG       = 0x40;
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all `points`, `None` if there are none.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f32>>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Self::new(first, first), |b, p| Self {
            min: b.min.inf(p),
            max: b.max.sup(p),
        }))
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn contains(&self, point: Point3<f32>) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }
}

/// A convex region of the world, stored in a BSP leaf.
///
/// Portal sets are ordered so iteration is deterministic and attach/detach
/// are idempotent.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    id: CellId,
    bounds: Option<Aabb>,
    out_portals: BTreeSet<PortalId>,
    in_portals: BTreeSet<PortalId>,
    flags: CellFlags,
    static_lights: BTreeSet<LightId>,
    dynamic_lights: BTreeSet<LightId>,
    objects: BTreeSet<ObjectId>,
    planes: Vec<Plane3D>,
    plane_portals: BTreeMap<usize, Vec<PortalId>>,
}

impl Cell {
    pub fn new(id: CellId) -> Self {
        Self {
            id,
            bounds: None,
            out_portals: BTreeSet::new(),
            in_portals: BTreeSet::new(),
            flags: CellFlags::empty(),
            static_lights: BTreeSet::new(),
            dynamic_lights: BTreeSet::new(),
            objects: BTreeSet::new(),
            planes: Vec::new(),
            plane_portals: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> CellId {
        self.id
    }

    #[inline]
    pub fn bounds(&self) -> Option<&Aabb> {
        self.bounds.as_ref()
    }

    /// Portals leading out of this cell.
    pub fn out_portals(&self) -> impl Iterator<Item = PortalId> + '_ {
        self.out_portals.iter().copied()
    }

    /// Portals leading into this cell.
    pub fn in_portals(&self) -> impl Iterator<Item = PortalId> + '_ {
        self.in_portals.iter().copied()
    }

    pub fn out_portal_count(&self) -> usize {
        self.out_portals.len()
    }

    #[inline]
    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    #[inline]
    pub fn is_vis_blocked(&self) -> bool {
        self.flags.contains(CellFlags::VIS_BLOCK)
    }

    /// Every light affecting the cell, static or dynamic, each once.
    pub fn lights(&self) -> impl Iterator<Item = LightId> + '_ {
        self.static_lights.union(&self.dynamic_lights).copied()
    }

    /// Lights registered by a dynamic pass.
    pub fn dynamic_lights(&self) -> impl Iterator<Item = LightId> + '_ {
        self.dynamic_lights.iter().copied()
    }

    pub fn is_lit_by(&self, light: LightId) -> bool {
        self.static_lights.contains(&light) || self.dynamic_lights.contains(&light)
    }

    /// Objects whose bounding sphere reaches into the cell.
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.iter().copied()
    }

    pub fn has_object(&self, object: ObjectId) -> bool {
        self.objects.contains(&object)
    }

    /// Inward facing boundary planes.
    pub fn planes(&self) -> &[Plane3D] {
        &self.planes
    }

    /// Portals lying on boundary plane `index`.
    pub fn portals_on_plane(&self, index: usize) -> &[PortalId] {
        self.plane_portals
            .get(&index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True if `point` is inside the cell.
    ///
    /// Uses the boundary planes when present, the bounding box otherwise.
    /// Points on a boundary count as inside.
    pub fn contains_point(&self, point: Point3<f32>) -> bool {
        if !self.planes.is_empty() {
            return self
                .planes
                .iter()
                .all(|plane| plane.classify_point(point) != PlaneSide::Back);
        }
        self.bounds.is_some_and(|b| b.contains(point))
    }

    pub(crate) fn set_bounds(&mut self, bounds: Option<Aabb>) {
        self.bounds = bounds;
    }

    pub(crate) fn set_flags(&mut self, flags: CellFlags) {
        self.flags = flags;
    }

    pub(crate) fn attach_out(&mut self, portal: PortalId) {
        self.out_portals.insert(portal);
    }

    pub(crate) fn attach_in(&mut self, portal: PortalId) {
        self.in_portals.insert(portal);
    }

    pub(crate) fn detach_out(&mut self, portal: PortalId) {
        self.out_portals.remove(&portal);
    }

    pub(crate) fn detach_in(&mut self, portal: PortalId) {
        self.in_portals.remove(&portal);
    }

    pub(crate) fn add_light(&mut self, light: LightId, dynamic: bool) {
        if dynamic {
            self.dynamic_lights.insert(light);
        } else {
            self.static_lights.insert(light);
        }
    }

    pub(crate) fn remove_light(&mut self, light: LightId) {
        self.static_lights.remove(&light);
        self.dynamic_lights.remove(&light);
    }

    pub(crate) fn remove_dynamic_light(&mut self, light: LightId) {
        self.dynamic_lights.remove(&light);
    }

    pub(crate) fn insert_object(&mut self, object: ObjectId) {
        self.objects.insert(object);
    }

    pub(crate) fn remove_object(&mut self, object: ObjectId) {
        self.objects.remove(&object);
    }

    pub(crate) fn set_planes(&mut self, planes: Vec<Plane3D>, plane_portals: BTreeMap<usize, Vec<PortalId>>) {
        self.planes = planes;
        self.plane_portals = plane_portals;
    }
}
