#![forbid(unsafe_code)]

//! Edge-distance geometry for floating containers.
//!
//! Containers are positioned by their distance from each viewport edge
//! rather than by origin and size. Maximizing is then "all edges zero",
//! resizing from any side touches exactly one field, and adjacency between
//! two containers can be decided by comparing edge distances directly.
//!
//! All values are CSS pixels and may be fractional.

use serde::{Deserialize, Serialize};

/// Default minimum container width in pixels.
pub const MIN_CONTAINER_WIDTH: f64 = 200.0;

/// Default minimum container height in pixels.
pub const MIN_CONTAINER_HEIGHT: f64 = 100.0;

/// Size of the host viewport.
///
/// `Viewport::ZERO` is the "never measured" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Unmeasured viewport.
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    /// Create a new viewport size.
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when the viewport was never measured.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

/// Pointer position in viewport coordinates (origin at top-left).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Minimum size a container may be clamped down to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinSize {
    pub width: f64,
    pub height: f64,
}

impl MinSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for MinSize {
    fn default() -> Self {
        Self::new(MIN_CONTAINER_WIDTH, MIN_CONTAINER_HEIGHT)
    }
}

/// Axis of a size change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Width changes.
    Horizontal,
    /// Height changes.
    Vertical,
}

/// One side of an [`EdgeRect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Top,
    Left,
    Right,
    Bottom,
}

impl Edge {
    /// All edges in canonical order.
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Left, Edge::Right, Edge::Bottom];

    /// The edge facing this one on an adjacent rectangle.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Axis whose size changes when this edge moves.
    #[must_use]
    pub const fn axis(self) -> Axis {
        match self {
            Self::Top | Self::Bottom => Axis::Vertical,
            Self::Left | Self::Right => Axis::Horizontal,
        }
    }
}

/// A rectangle expressed as distances from the four viewport edges.
///
/// # Invariants
///
/// After [`EdgeRect::clamped`]: every distance is `>= 0` and, whenever the
/// viewport is at least the minimum size, `left + right + min.width <=
/// viewport.width` (same vertically).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeRect {
    pub top: f64,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
}

impl EdgeRect {
    /// Create a rectangle from its four edge distances.
    #[inline]
    pub const fn new(top: f64, left: f64, right: f64, bottom: f64) -> Self {
        Self {
            top,
            left,
            right,
            bottom,
        }
    }

    /// Rectangle covering the whole viewport.
    pub const FULL: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Build from an origin/size rectangle measured inside `viewport`.
    #[must_use]
    pub fn from_bounds(x: f64, y: f64, width: f64, height: f64, viewport: Viewport) -> Self {
        Self {
            top: y,
            left: x,
            right: viewport.width - x - width,
            bottom: viewport.height - y - height,
        }
    }

    /// Width of the rectangle inside `viewport`.
    #[inline]
    pub fn width(&self, viewport: Viewport) -> f64 {
        viewport.width - self.left - self.right
    }

    /// Height of the rectangle inside `viewport`.
    #[inline]
    pub fn height(&self, viewport: Viewport) -> f64 {
        viewport.height - self.top - self.bottom
    }

    /// X coordinate of the right edge.
    #[inline]
    pub fn absolute_right(&self, viewport: Viewport) -> f64 {
        viewport.width - self.right
    }

    /// Y coordinate of the bottom edge.
    #[inline]
    pub fn absolute_bottom(&self, viewport: Viewport) -> f64 {
        viewport.height - self.bottom
    }

    /// Distance of `edge` from its viewport side.
    #[inline]
    pub fn edge(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Top => self.top,
            Edge::Left => self.left,
            Edge::Right => self.right,
            Edge::Bottom => self.bottom,
        }
    }

    /// Mutable access to one edge distance.
    #[inline]
    pub fn edge_mut(&mut self, edge: Edge) -> &mut f64 {
        match edge {
            Edge::Top => &mut self.top,
            Edge::Left => &mut self.left,
            Edge::Right => &mut self.right,
            Edge::Bottom => &mut self.bottom,
        }
    }

    /// Absolute coordinate of `edge` (x for left/right, y for top/bottom).
    #[inline]
    pub fn edge_position(&self, edge: Edge, viewport: Viewport) -> f64 {
        match edge {
            Edge::Top => self.top,
            Edge::Left => self.left,
            Edge::Right => self.absolute_right(viewport),
            Edge::Bottom => self.absolute_bottom(viewport),
        }
    }

    /// True if `pointer` lies inside the title band
    /// (`top..=top + title_height`) and the horizontal extent.
    pub fn title_band_contains(
        &self,
        pointer: PointerPosition,
        viewport: Viewport,
        title_height: f64,
    ) -> bool {
        pointer.y >= self.top
            && pointer.y <= self.top + title_height
            && pointer.x >= self.left
            && pointer.x <= self.absolute_right(viewport)
    }

    /// True if the horizontal extents of both rectangles overlap.
    pub fn overlaps_horizontally(&self, other: &EdgeRect, viewport: Viewport) -> bool {
        self.left < other.absolute_right(viewport) && other.left < self.absolute_right(viewport)
    }

    /// True if the vertical extents of both rectangles overlap.
    pub fn overlaps_vertically(&self, other: &EdgeRect, viewport: Viewport) -> bool {
        self.top < other.absolute_bottom(viewport) && other.top < self.absolute_bottom(viewport)
    }

    /// Move the rectangle by `(dx, dy)` without changing its size.
    #[must_use]
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self {
            top: self.top + dy,
            left: self.left + dx,
            right: self.right - dx,
            bottom: self.bottom - dy,
        }
    }

    /// Grow (or shrink, for negative deltas) by `(dw, dh)`.
    ///
    /// The right and bottom edges absorb the change first. When the far
    /// edge would cross the viewport, the excess is taken from the near
    /// edge instead so the rectangle grows back toward the origin.
    #[must_use]
    pub fn resized_by(self, dw: f64, dh: f64) -> Self {
        let (left, right) = spill(self.left, self.right - dw);
        let (top, bottom) = spill(self.top, self.bottom - dh);
        Self {
            top,
            left,
            right,
            bottom,
        }
    }

    /// Force the width to `width`, keeping the left edge where possible.
    #[must_use]
    pub fn with_width(self, width: f64, viewport: Viewport) -> Self {
        let (left, right) = spill(self.left, viewport.width - self.left - width);
        Self {
            left,
            right,
            ..self
        }
    }

    /// Replace negative or non-finite distances with zero.
    #[must_use]
    pub fn non_negative(self) -> Self {
        Self {
            top: non_negative(self.top),
            left: non_negative(self.left),
            right: non_negative(self.right),
            bottom: non_negative(self.bottom),
        }
    }

    /// Clamp to the viewport and the minimum size.
    ///
    /// Negative or non-finite distances become zero. If the remaining space
    /// is smaller than `min`, the far edge (right/bottom) gives way first,
    /// then the near edge.
    #[must_use]
    pub fn clamped(self, viewport: Viewport, min: MinSize) -> Self {
        let Self {
            top,
            left,
            right,
            bottom,
        } = self.non_negative();

        let (left, right) = restore_min(left, right, viewport.width, min.width);
        let (top, bottom) = restore_min(top, bottom, viewport.height, min.height);

        Self {
            top,
            left,
            right,
            bottom,
        }
    }

    /// Re-home the rectangle after the viewport changed from `old` to `new`.
    ///
    /// On each axis the rectangle stays anchored to the nearer viewport
    /// side; the distance to the far side absorbs the delta. An unmeasured
    /// `old` viewport leaves the rectangle untouched. The result is not
    /// clamped.
    #[must_use]
    pub fn reflowed(self, old: Viewport, new: Viewport) -> Self {
        if old.is_zero() || old == new {
            return self;
        }
        let dw = new.width - old.width;
        let dh = new.height - old.height;
        let mut next = self;
        if self.left <= self.right {
            next.right += dw;
        } else {
            next.left += dw;
        }
        if self.top <= self.bottom {
            next.bottom += dh;
        } else {
            next.top += dh;
        }
        next
    }

    /// True if all four distances are finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        Edge::ALL.iter().all(|edge| {
            let value = self.edge(*edge);
            value.is_finite() && value >= 0.0
        })
    }
}

#[inline]
fn non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Push a negative far-edge distance back onto the near edge.
#[inline]
fn spill(near: f64, far: f64) -> (f64, f64) {
    if far < 0.0 {
        ((near + far).max(0.0), 0.0)
    } else {
        (near, far)
    }
}

fn restore_min(near: f64, far: f64, extent: f64, min: f64) -> (f64, f64) {
    let mut excess = near + far + min - extent;
    if excess <= 0.0 {
        return (near, far);
    }
    let take_far = excess.min(far);
    let far = far - take_far;
    excess -= take_far;
    let near = (near - excess).max(0.0);
    (near, far)
}
