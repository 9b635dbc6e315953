//! Visitor pattern for portal traversal.
//!
//! Visitors receive cells as they become visible and portals as they are
//! projected, without coupling the traversal to a particular consumer.

use crate::{CellId, PortalId, PortalRectInfo, ScreenRect};

/// Receives traversal events.
///
/// Both methods default to doing nothing. Common uses include:
/// - Collecting the visible set in discovery order
/// - Drawing screen rectangles for debugging
/// - Queueing cell geometry for rendering
pub trait TraversalVisitor {
    /// Called once per run, when `cell` first enters the visible set.
    ///
    /// `rect` is the screen area the cell was first seen through.
    fn cell_visible(&mut self, _cell: CellId, _rect: &ScreenRect) {}

    /// Called after `portal` was projected to the screen.
    fn portal_projected(&mut self, _portal: PortalId, _info: &PortalRectInfo) {}
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopVisitor;

impl TraversalVisitor for NoopVisitor {}

/// Collects visible cells in discovery order and projected portal rectangles.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    cells: Vec<CellId>,
    portals: Vec<(PortalId, ScreenRect)>,
}

impl CollectingVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    /// Projected portals with the rectangle they covered on screen.
    pub fn portals(&self) -> &[(PortalId, ScreenRect)] {
        &self.portals
    }

    pub fn into_cells(self) -> Vec<CellId> {
        self.cells
    }
}

impl TraversalVisitor for CollectingVisitor {
    fn cell_visible(&mut self, cell: CellId, _rect: &ScreenRect) {
        self.cells.push(cell);
    }

    fn portal_projected(&mut self, portal: PortalId, info: &PortalRectInfo) {
        if !info.culled && !info.screen_rect.is_empty() {
            self.portals.push((portal, info.screen_rect));
        }
    }
}

/// A visitor that calls a closure for each newly visible cell.
pub struct FnVisitor<F>
where
    F: FnMut(CellId, &ScreenRect),
{
    func: F,
}

impl<F> FnVisitor<F>
where
    F: FnMut(CellId, &ScreenRect),
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> TraversalVisitor for FnVisitor<F>
where
    F: FnMut(CellId, &ScreenRect),
{
    fn cell_visible(&mut self, cell: CellId, rect: &ScreenRect) {
        (self.func)(cell, rect);
    }
}
