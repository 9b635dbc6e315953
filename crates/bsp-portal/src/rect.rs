//! Integer screen-space rectangles used to bound projected portals.

use nalgebra::Point3;

const INF: i32 = 100_000;
const FAR: f32 = 1e37;

/// Output surface dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn half_width(&self) -> i32 {
        self.width / 2
    }

    #[inline]
    pub fn half_height(&self) -> i32 {
        self.height / 2
    }

    /// Width over height, each taken as at least one pixel.
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1024, 768)
    }
}

/// Axis-aligned screen rectangle with the smallest depth that contributed to it.
///
/// `bottom` is the smaller y, `top` the larger. An empty rectangle has its
/// bounds inverted so that any point enlarges it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub left: i32,
    pub right: i32,
    pub bottom: i32,
    pub top: i32,
    pub distance: f32,
}

impl ScreenRect {
    /// The empty sentinel.
    pub const EMPTY: ScreenRect = ScreenRect {
        left: INF,
        right: -INF,
        bottom: INF,
        top: -INF,
        distance: FAR,
    };

    pub const fn new(left: i32, right: i32, bottom: i32, top: i32, distance: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
            distance,
        }
    }

    /// The whole viewport at depth zero.
    pub const fn full(viewport: Viewport) -> Self {
        Self::new(0, viewport.width, 0, viewport.height, 0.0)
    }

    /// True when the bounds are inverted, i.e. nothing is covered.
    pub fn is_empty(&self) -> bool {
        self.right < self.left || self.top < self.bottom
    }

    /// Grows this rectangle to cover `other` as well.
    ///
    /// Returns whether any bound moved. Distance is left alone.
    pub fn merge(&mut self, other: &ScreenRect) -> bool {
        let mut changed = false;

        if other.left < self.left {
            self.left = other.left;
            changed = true;
        }
        if other.right > self.right {
            self.right = other.right;
            changed = true;
        }
        if other.bottom < self.bottom {
            self.bottom = other.bottom;
            changed = true;
        }
        if other.top > self.top {
            self.top = other.top;
            changed = true;
        }

        changed
    }

    /// Overlap of the two rectangles, or `None` when they do not overlap.
    ///
    /// The result keeps this rectangle's distance so that a zero-depth
    /// boundary never spreads through the graph.
    pub fn intersect(&self, other: &ScreenRect) -> Option<ScreenRect> {
        let result = ScreenRect {
            left: self.left.max(other.left),
            right: self.right.min(other.right),
            bottom: self.bottom.max(other.bottom),
            top: self.top.min(other.top),
            distance: self.distance,
        };

        (!result.is_empty()).then_some(result)
    }

    /// Grows the rectangle to contain a point in normalized device coordinates.
    pub fn enlarge_to_contain(&mut self, ndc: Point3<f32>, viewport: Viewport) {
        let w2 = viewport.half_width();
        let h2 = viewport.half_height();
        let x = (ndc.x * w2 as f32) as i32 + w2;
        let y = (ndc.y * h2 as f32) as i32 + h2;

        self.top = self.top.max(y);
        self.bottom = self.bottom.min(y);
        self.right = self.right.max(x);
        self.left = self.left.min(x);
        self.distance = self.distance.min(ndc.z);
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.top - self.bottom).max(0)
    }
}

impl Default for ScreenRect {
    fn default() -> Self {
        Self::EMPTY
    }
}
