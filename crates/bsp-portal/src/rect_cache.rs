//! Per-run screen rectangle records for cells and portals.
//!
//! Records are tagged with the run id that last touched them. A record from
//! an older run is reset the first time the current run reaches it, which
//! spares the traversal a full reset per frame.

use crate::{CellId, PortalId, ScreenRect};

/// Screen state of one portal during a traversal run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalRectInfo {
    /// Bounds of the projected (clipped) portal.
    pub screen_rect: ScreenRect,
    /// Union of every part of the portal seen through so far.
    pub actual_rect: ScreenRect,
    /// Set when the viewer is on the portal's back side.
    pub culled: bool,
    pub update_id: u32,
}

impl PortalRectInfo {
    /// Clears both rectangles and the cull flag.
    pub fn invalidate(&mut self) {
        self.screen_rect = ScreenRect::EMPTY;
        self.actual_rect = ScreenRect::EMPTY;
        self.culled = false;
    }

    /// Part of the portal visible through `boundary`.
    pub fn intersect(&self, boundary: &ScreenRect) -> Option<ScreenRect> {
        self.screen_rect.intersect(boundary)
    }

    /// Adds `rect` to the seen-through area; true if it grew.
    pub fn union_actual_with(&mut self, rect: &ScreenRect) -> bool {
        self.actual_rect.merge(rect)
    }
}

impl Default for PortalRectInfo {
    fn default() -> Self {
        Self {
            screen_rect: ScreenRect::EMPTY,
            actual_rect: ScreenRect::EMPTY,
            culled: false,
            update_id: 0,
        }
    }
}

/// Screen state of one cell during a traversal run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellRectInfo {
    /// Accumulated area of the screen through which the cell is seen.
    pub rect: ScreenRect,
    /// Outgoing portals have been projected this run.
    pub initialized: bool,
    /// Slot of the cell in the traversal queue.
    pub list_position: usize,
    pub update_id: u32,
}

impl CellRectInfo {
    pub fn invalidate(&mut self, update_id: u32) {
        self.rect = ScreenRect::EMPTY;
        self.initialized = false;
        self.list_position = 0;
        self.update_id = update_id;
    }

    /// Grows the cell rectangle by `rect`.
    ///
    /// On growth the depth becomes the nearer of the two.
    pub fn update_screen_rect(&mut self, rect: &ScreenRect) -> bool {
        if self.rect.merge(rect) {
            self.rect.distance = self.rect.distance.min(rect.distance);
            true
        } else {
            false
        }
    }
}

impl Default for CellRectInfo {
    fn default() -> Self {
        Self {
            rect: ScreenRect::EMPTY,
            initialized: false,
            list_position: 0,
            update_id: 0,
        }
    }
}

/// Rectangle records of one traversal, indexed by cell and portal id.
#[derive(Debug, Default, Clone)]
pub struct ScreenRectCache {
    cells: Vec<CellRectInfo>,
    portals: Vec<PortalRectInfo>,
    update_id: u32,
}

impl ScreenRectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins run `update_id`, making room for the given id ranges.
    pub fn start_update(&mut self, portal_capacity: usize, cell_capacity: usize, update_id: u32) {
        if self.cells.len() < cell_capacity {
            self.cells.resize(cell_capacity, CellRectInfo::default());
        }
        if self.portals.len() < portal_capacity {
            self.portals.resize(portal_capacity, PortalRectInfo::default());
        }
        self.update_id = update_id;
    }

    /// Forgets every record, so that run ids can start over.
    pub fn reset(&mut self) {
        self.cells.fill(CellRectInfo::default());
        self.portals.fill(PortalRectInfo::default());
        self.update_id = 0;
    }

    #[inline]
    pub fn update_id(&self) -> u32 {
        self.update_id
    }

    /// Resets the cell's record for the current run.
    pub fn invalidate_cell(&mut self, cell: CellId) {
        let update_id = self.update_id;
        self.cell_slot(cell).invalidate(update_id);
    }

    /// Record of `cell` for the current run, reset first if stale.
    pub fn cell_mut(&mut self, cell: CellId) -> &mut CellRectInfo {
        let update_id = self.update_id;
        let info = self.cell_slot(cell);
        if info.update_id != update_id {
            info.invalidate(update_id);
        }
        info
    }

    /// Record of `portal` for the current run, reset first if stale.
    pub fn portal_mut(&mut self, portal: PortalId) -> &mut PortalRectInfo {
        let update_id = self.update_id;
        let idx = portal.index();
        if idx >= self.portals.len() {
            self.portals.resize(idx + 1, PortalRectInfo::default());
        }
        let info = &mut self.portals[idx];
        if info.update_id != update_id {
            info.invalidate();
            info.update_id = update_id;
        }
        info
    }

    /// Record of `cell` if the current run has touched it.
    pub fn cell(&self, cell: CellId) -> Option<&CellRectInfo> {
        self.cells
            .get(cell.index())
            .filter(|info| info.update_id == self.update_id && self.update_id != 0)
    }

    /// Record of `portal` if the current run has touched it.
    pub fn portal(&self, portal: PortalId) -> Option<&PortalRectInfo> {
        self.portals
            .get(portal.index())
            .filter(|info| info.update_id == self.update_id && self.update_id != 0)
    }

    fn cell_slot(&mut self, cell: CellId) -> &mut CellRectInfo {
        let idx = cell.index();
        if idx >= self.cells.len() {
            self.cells.resize(idx + 1, CellRectInfo::default());
        }
        &mut self.cells[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_records_reset_on_first_touch() {
        let mut cache = ScreenRectCache::new();
        cache.start_update(4, 4, 1);

        let info = cache.cell_mut(CellId::new(2));
        info.rect = ScreenRect::new(0, 10, 0, 10, 1.0);
        info.initialized = true;

        cache.start_update(4, 4, 2);
        assert!(cache.cell(CellId::new(2)).is_none());

        let info = cache.cell_mut(CellId::new(2));
        assert_eq!(info.rect, ScreenRect::EMPTY);
        assert!(!info.initialized);
        assert_eq!(info.update_id, 2);
    }

    #[test]
    fn current_records_survive_touches() {
        let mut cache = ScreenRectCache::new();
        cache.start_update(1, 1, 7);

        cache.portal_mut(PortalId::new(0)).culled = true;
        assert!(cache.portal_mut(PortalId::new(0)).culled);
        assert!(cache.portal(PortalId::new(0)).is_some_and(|p| p.culled));
    }

    #[test]
    fn cache_grows_for_unseen_ids() {
        let mut cache = ScreenRectCache::new();
        cache.start_update(0, 0, 1);
        cache.cell_mut(CellId::new(9)).initialized = true;
        assert!(cache.cell(CellId::new(9)).is_some_and(|c| c.initialized));
    }

    #[test]
    fn cell_update_tracks_nearest_distance() {
        let mut info = CellRectInfo::default();
        assert!(info.update_screen_rect(&ScreenRect::new(0, 10, 0, 10, 5.0)));
        assert_eq!(info.rect.distance, 5.0);

        assert!(info.update_screen_rect(&ScreenRect::new(5, 20, 0, 10, 2.0)));
        assert_eq!(info.rect.distance, 2.0);

        // Contained rectangle: no change, distance untouched.
        assert!(!info.update_screen_rect(&ScreenRect::new(1, 2, 1, 2, 0.1)));
        assert_eq!(info.rect.distance, 2.0);
    }

    #[test]
    fn portal_union_reports_growth() {
        let mut info = PortalRectInfo::default();
        let r = ScreenRect::new(0, 10, 0, 10, 1.0);
        assert!(info.union_actual_with(&r));
        assert!(!info.union_actual_with(&r));
    }
}
