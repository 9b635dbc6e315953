//! Screen-rectangle portal traversal.
//!
//! Starting from the cell containing the viewer, the traversal walks outgoing
//! portals breadth first. Every cell carries the screen rectangle it is seen
//! through; a portal lets vision pass into its target only where its own
//! projected rectangle overlaps that of the source cell. A cell whose
//! rectangle grows after it was processed is queued again so the growth
//! reaches its neighbours.

use std::collections::BTreeSet;

use log::{trace, warn};

use crate::error::Result;
use crate::{
    BspTree, CellId, NoopVisitor, PortalId, PortalRectInfo, ScreenRect, ScreenRectCache,
    TraversalVisitor, ViewSetup,
};

/// Limits applied to a traversal run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraversalConfig {
    /// Queue pops after which a run stops early.
    pub max_cell_visits: usize,
    /// Portals farther than this from the viewer are ignored.
    pub max_portal_distance: Option<f32>,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_cell_visits: 1 << 20,
            max_portal_distance: None,
        }
    }
}

/// How the outgoing portals of a cell are brought to screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    /// Clip by the view frustum; used for the viewer's own cell.
    Frustum,
    /// Clip by the plane just in front of the viewer.
    CutPlane,
}

/// Computes the set of cells visible from a viewpoint.
///
/// The traversal keeps its per-run records between calls, so repeated runs
/// do not reallocate. The tree is only read.
#[derive(Debug, Default)]
pub struct PortalTraversal {
    rects: ScreenRectCache,
    update_id: u32,
    visible: BTreeSet<CellId>,
    queue: Vec<Option<CellId>>,
    config: TraversalConfig,
}

impl PortalTraversal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TraversalConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: TraversalConfig) {
        self.config = config;
    }

    /// Replaces the visible set with the cells seen from `view`.
    pub fn traverse(&mut self, tree: &BspTree, view: &ViewSetup) -> Result<&BTreeSet<CellId>> {
        self.traverse_with(tree, view, true, &mut NoopVisitor)
    }

    /// Runs one traversal, reporting progress to `visitor`.
    ///
    /// With `clean_first` unset the cells found are added to the current
    /// visible set, which lets several views accumulate into one set.
    /// A viewer outside every cell sees nothing.
    pub fn traverse_with<V: TraversalVisitor>(
        &mut self,
        tree: &BspTree,
        view: &ViewSetup,
        clean_first: bool,
        visitor: &mut V,
    ) -> Result<&BTreeSet<CellId>> {
        self.update_id = self.update_id.wrapping_add(1);
        if self.update_id == 0 {
            self.rects.reset();
            self.update_id = 1;
        }
        self.rects
            .start_update(tree.portal_capacity(), tree.cell_capacity(), self.update_id);

        if clean_first {
            self.visible.clear();
        }
        self.queue.clear();

        let Some(root) = tree.find_leaf(view.position) else {
            trace!("traversal {}: viewer outside the world", self.update_id);
            return Ok(&self.visible);
        };

        self.rects.invalidate_cell(root);
        refresh_cell_portals(&mut self.rects, tree, root, view, Projection::Frustum, visitor)?;

        let full = ScreenRect::full(view.viewport);
        let info = self.rects.cell_mut(root);
        info.rect = full;
        info.initialized = true;
        info.list_position = 0;

        self.queue.push(Some(root));
        if self.visible.insert(root) {
            visitor.cell_visible(root, &full);
        }

        let mut finished = 0;
        let mut visits = 0;

        while finished < self.queue.len() {
            let slot = self.queue[finished];
            finished += 1;

            let Some(cell_id) = slot else {
                continue;
            };
            let cell = tree.cell(cell_id)?;
            if cell.is_vis_blocked() {
                continue;
            }

            visits += 1;
            if visits > self.config.max_cell_visits {
                warn!(
                    "traversal {}: stopped after {} cell visits",
                    self.update_id, self.config.max_cell_visits
                );
                break;
            }

            let boundary = self.rects.cell_mut(cell_id).rect;

            for portal_id in cell.out_portals() {
                let portal = tree.portal(portal_id)?;

                if self
                    .config
                    .max_portal_distance
                    .is_some_and(|max| portal.distance_from(view.position) > max)
                {
                    continue;
                }

                let seen = {
                    let info = self.rects.portal_mut(portal_id);
                    if info.culled {
                        continue;
                    }
                    match info.intersect(&boundary) {
                        Some(rect) if info.union_actual_with(&rect) => rect,
                        _ => continue,
                    }
                };

                let target = portal.target();
                let target_info = self.rects.cell_mut(target);
                if !target_info.update_screen_rect(&seen) {
                    continue;
                }

                if !target_info.initialized {
                    refresh_cell_portals(
                        &mut self.rects,
                        tree,
                        target,
                        view,
                        Projection::CutPlane,
                        visitor,
                    )?;

                    self.queue.push(Some(target));
                    let target_info = self.rects.cell_mut(target);
                    target_info.initialized = true;
                    target_info.list_position = self.queue.len() - 1;

                    let rect = target_info.rect;
                    if self.visible.insert(target) {
                        visitor.cell_visible(target, &rect);
                    }
                } else if finished > target_info.list_position {
                    let old = target_info.list_position;
                    target_info.list_position = self.queue.len();
                    self.queue[old] = None;
                    self.queue.push(Some(target));
                }
            }
        }

        trace!(
            "traversal {}: {} cells visible, {} cell visits, queue length {}",
            self.update_id,
            self.visible.len(),
            visits,
            self.queue.len()
        );

        Ok(&self.visible)
    }

    /// Cells found by the runs since the last clean start.
    pub fn visible_cells(&self) -> &BTreeSet<CellId> {
        &self.visible
    }

    pub fn is_visible(&self, cell: CellId) -> bool {
        self.visible.contains(&cell)
    }

    /// Screen rectangle a cell was seen through in the last run.
    pub fn cell_rect(&self, cell: CellId) -> Option<ScreenRect> {
        if !self.visible.contains(&cell) {
            return None;
        }
        self.rects.cell(cell).map(|info| info.rect)
    }

    /// Nearest projected depth at which a cell was seen in the last run.
    pub fn cell_screen_distance(&self, cell: CellId) -> Option<f32> {
        self.cell_rect(cell).map(|rect| rect.distance)
    }

    /// Screen record of a portal from the last run.
    pub fn portal_rect(&self, portal: PortalId) -> Option<&PortalRectInfo> {
        self.rects.portal(portal)
    }

    /// Adds a cell to the visible set by hand.
    pub fn add_cell(&mut self, cell: CellId) {
        self.visible.insert(cell);
    }

    /// Empties the visible set and the queue.
    pub fn clear(&mut self) {
        self.visible.clear();
        self.queue.clear();
    }
}

/// Projects every outgoing portal of `cell` into the per-run records.
fn refresh_cell_portals<V: TraversalVisitor>(
    rects: &mut ScreenRectCache,
    tree: &BspTree,
    cell: CellId,
    view: &ViewSetup,
    projection: Projection,
    visitor: &mut V,
) -> Result<()> {
    for portal_id in tree.cell(cell)?.out_portals() {
        let portal = tree.portal(portal_id)?;
        let info = rects.portal_mut(portal_id);

        match projection {
            Projection::Frustum => portal.refresh_screen_rect_with_frustum(
                view.position,
                &view.to_screen,
                view.viewport,
                &view.frustum,
                info,
            ),
            Projection::CutPlane => {
                portal.refresh_screen_rect_with_cut_plane(
                    view.position,
                    &view.to_screen,
                    view.viewport,
                    &view.cut_plane,
                    info,
                );
            }
        }

        visitor.portal_projected(portal_id, info);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_levels;
    use crate::{CollectingVisitor, ViewCamera, Viewport};
    use nalgebra::{Point3, Vector3};

    fn make_view(position: Point3<f32>, direction: Vector3<f32>) -> ViewSetup {
        ViewCamera::new(position, direction, Vector3::z()).view_setup(Viewport::default())
    }

    fn ids(raw: &[u32]) -> BTreeSet<CellId> {
        raw.iter().copied().map(CellId::new).collect()
    }

    #[test]
    fn single_cell_sees_itself() {
        let tree = test_levels::single_cell();
        let mut traversal = PortalTraversal::new();
        let view = make_view(Point3::new(5.0, 5.0, 5.0), Vector3::x());
        assert_eq!(traversal.traverse(&tree, &view).unwrap(), &ids(&[0]));
    }

    #[test]
    fn viewer_outside_sees_nothing() {
        let tree = test_levels::chain(2);
        let mut traversal = PortalTraversal::new();
        let view = make_view(Point3::new(-5.0, 5.0, 5.0), Vector3::x());
        assert!(traversal.traverse(&tree, &view).unwrap().is_empty());
    }

    #[test]
    fn looking_through_a_portal() {
        let tree = test_levels::chain(2);
        let mut traversal = PortalTraversal::new();

        let view = make_view(Point3::new(5.0, 5.0, 5.0), Vector3::x());
        assert_eq!(traversal.traverse(&tree, &view).unwrap(), &ids(&[0, 1]));

        let view = make_view(Point3::new(5.0, 5.0, 5.0), -Vector3::x());
        assert_eq!(traversal.traverse(&tree, &view).unwrap(), &ids(&[0]));
    }

    #[test]
    fn vision_reaches_down_the_chain() {
        let tree = test_levels::chain(3);
        let mut traversal = PortalTraversal::new();
        let view = make_view(Point3::new(5.0, 5.0, 5.0), Vector3::x());
        assert_eq!(traversal.traverse(&tree, &view).unwrap(), &ids(&[0, 1, 2]));

        // Seen through a narrower opening, so the rectangle shrinks.
        let near = traversal.cell_rect(CellId::new(1)).unwrap();
        let far = traversal.cell_rect(CellId::new(2)).unwrap();
        assert!(far.width() <= near.width());
        assert!(far.width() > 0);
    }

    #[test]
    fn blocked_cell_is_seen_but_not_seen_through() {
        let mut tree = test_levels::chain(3);
        tree.block_vision(CellId::new(1), true).unwrap();
        let mut traversal = PortalTraversal::new();
        let view = make_view(Point3::new(5.0, 5.0, 5.0), Vector3::x());
        assert_eq!(traversal.traverse(&tree, &view).unwrap(), &ids(&[0, 1]));
    }

    #[test]
    fn blocked_root_sees_only_itself() {
        let mut tree = test_levels::chain(3);
        tree.block_vision(CellId::new(0), true).unwrap();
        let mut traversal = PortalTraversal::new();
        let view = make_view(Point3::new(5.0, 5.0, 5.0), Vector3::x());
        assert_eq!(traversal.traverse(&tree, &view).unwrap(), &ids(&[0]));
    }

    #[test]
    fn root_is_always_visible() {
        let tree = test_levels::triangle();
        let mut traversal = PortalTraversal::new();
        for direction in [Vector3::x(), -Vector3::x(), Vector3::y(), -Vector3::y(), Vector3::z()] {
            let view = make_view(Point3::new(3.0, 3.0, 5.0), direction);
            assert!(traversal.traverse(&tree, &view).unwrap().contains(&CellId::new(0)));
        }
    }

    #[test]
    fn each_cell_reported_once() {
        let tree = test_levels::triangle();
        let mut traversal = PortalTraversal::new();
        let view = ViewCamera::new(Point3::new(2.0, 2.0, 5.0), Vector3::new(1.0, 1.0, 0.0), Vector3::z())
            .with_fov(100f32.to_radians())
            .view_setup(Viewport::default());
        let mut visitor = CollectingVisitor::new();

        traversal.traverse_with(&tree, &view, true, &mut visitor).unwrap();

        let mut cells = visitor.cells().to_vec();
        assert_eq!(cells.first(), Some(&CellId::new(0)));
        cells.sort();
        assert_eq!(cells, vec![CellId::new(0), CellId::new(1), CellId::new(2)]);
        assert_eq!(traversal.visible_cells(), &ids(&[0, 1, 2]));
        assert!(!visitor.portals().is_empty());
    }

    #[test]
    fn grown_cell_is_walked_again() {
        let tree = test_levels::fork();
        let (x, y) = (CellId::new(2), CellId::new(3));
        let mut traversal = PortalTraversal::new();
        let view = ViewCamera::new(Point3::new(2.0, 2.0, 5.0), Vector3::new(1.0, 1.0, 0.0), Vector3::z())
            .with_fov(100f32.to_radians())
            .view_setup(Viewport::default());
        let mut visitor = CollectingVisitor::new();

        traversal.traverse_with(&tree, &view, true, &mut visitor).unwrap();

        // X is expanded before the route through A widens it, and Y is only
        // in view through that wider part.
        assert_eq!(traversal.visible_cells(), &ids(&[0, 1, 2, 3]));
        assert_eq!(visitor.cells().iter().filter(|&&cell| cell == x).count(), 1);
        assert_eq!(visitor.cells().last(), Some(&y));

        let direct = traversal.portal_rect(PortalId::new(0)).unwrap().actual_rect;
        let around = traversal.portal_rect(PortalId::new(2)).unwrap().actual_rect;
        assert!(direct.intersect(&around).is_none());
        let mut expected = direct;
        expected.merge(&around);

        let rect = traversal.cell_rect(x).unwrap();
        assert_eq!(
            (rect.left, rect.right, rect.bottom, rect.top),
            (expected.left, expected.right, expected.bottom, expected.top)
        );

        let onward = traversal.portal_rect(PortalId::new(3)).unwrap();
        assert!(onward.screen_rect.intersect(&direct).is_none());
        assert!(!onward.actual_rect.is_empty());
        assert!(traversal.cell_rect(y).is_some());
    }

    #[test]
    fn runs_do_not_leak_into_each_other() {
        let tree = test_levels::chain(3);
        let mut traversal = PortalTraversal::new();
        let ahead = make_view(Point3::new(5.0, 5.0, 5.0), Vector3::x());
        let behind = make_view(Point3::new(5.0, 5.0, 5.0), -Vector3::x());

        for _ in 0..3 {
            assert_eq!(traversal.traverse(&tree, &ahead).unwrap().len(), 3);
            assert_eq!(traversal.traverse(&tree, &behind).unwrap().len(), 1);
            assert!(traversal.cell_rect(CellId::new(2)).is_none());
        }
    }

    #[test]
    fn accumulating_runs_keep_earlier_cells() {
        let tree = test_levels::chain(3);
        let mut traversal = PortalTraversal::new();

        let behind = make_view(Point3::new(25.0, 5.0, 5.0), -Vector3::x());
        traversal.traverse(&tree, &behind).unwrap();
        assert_eq!(traversal.visible_cells(), &ids(&[0, 1, 2]));

        let ahead = make_view(Point3::new(25.0, 5.0, 5.0), Vector3::x());
        let visible = traversal
            .traverse_with(&tree, &ahead, false, &mut NoopVisitor)
            .unwrap();
        assert_eq!(visible, &ids(&[0, 1, 2]));

        traversal.traverse(&tree, &ahead).unwrap();
        assert_eq!(traversal.visible_cells(), &ids(&[2]));
    }

    #[test]
    fn portal_distance_limit() {
        let tree = test_levels::chain(3);
        let mut traversal = PortalTraversal::with_config(TraversalConfig {
            max_portal_distance: Some(3.0),
            ..TraversalConfig::default()
        });
        let view = make_view(Point3::new(5.0, 5.0, 5.0), Vector3::x());
        assert_eq!(traversal.traverse(&tree, &view).unwrap(), &ids(&[0, 1]));
    }

    #[test]
    fn visit_budget_stops_the_run() {
        let tree = test_levels::chain(3);
        let mut traversal = PortalTraversal::with_config(TraversalConfig {
            max_cell_visits: 1,
            ..TraversalConfig::default()
        });
        let view = make_view(Point3::new(5.0, 5.0, 5.0), Vector3::x());
        assert_eq!(traversal.traverse(&tree, &view).unwrap(), &ids(&[0, 1]));
    }

    #[test]
    fn root_rect_covers_the_screen() {
        let tree = test_levels::chain(2);
        let mut traversal = PortalTraversal::new();
        let view = make_view(Point3::new(5.0, 5.0, 5.0), Vector3::x());
        traversal.traverse(&tree, &view).unwrap();
        assert_eq!(
            traversal.cell_rect(CellId::new(0)),
            Some(ScreenRect::full(Viewport::default()))
        );
        assert_eq!(traversal.cell_screen_distance(CellId::new(0)), Some(0.0));
        assert!(traversal.cell_screen_distance(CellId::new(1)).is_some_and(|d| d > 0.0));
    }

    #[test]
    fn clear_and_add_cell() {
        let tree = test_levels::chain(2);
        let mut traversal = PortalTraversal::new();
        let view = make_view(Point3::new(5.0, 5.0, 5.0), Vector3::x());
        traversal.traverse(&tree, &view).unwrap();

        traversal.clear();
        assert!(traversal.visible_cells().is_empty());
        traversal.add_cell(CellId::new(1));
        assert!(traversal.is_visible(CellId::new(1)));
    }
}
