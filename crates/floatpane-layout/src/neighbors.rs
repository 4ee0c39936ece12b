//! Neighbor-aware resize propagation.
//!
//! When one edge of a container moves, every other container whose
//! opposing edge touched it (within [`LayoutTuning::neighbor_tolerance`])
//! and that overlaps it on the perpendicular axis follows by the same
//! delta. Neighbors that were glued this way stop auto-fitting on that
//! axis, otherwise the next content measurement would tear them apart
//! again.

use floatpane_core::geometry::{Axis, Edge, EdgeRect, Viewport};
use tracing::trace;

use crate::model::{ContainerId, WindowManagerState};
use crate::tuning::LayoutTuning;

/// Per-edge difference between two rectangles (`new - old`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeDelta {
    pub top: f64,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
}

impl EdgeDelta {
    #[must_use]
    pub fn between(old: EdgeRect, new: EdgeRect) -> Self {
        Self {
            top: new.top - old.top,
            left: new.left - old.left,
            right: new.right - old.right,
            bottom: new.bottom - old.bottom,
        }
    }

    #[must_use]
    pub fn get(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Top => self.top,
            Edge::Left => self.left,
            Edge::Right => self.right,
            Edge::Bottom => self.bottom,
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        Edge::ALL.iter().all(|edge| self.get(*edge) == 0.0)
    }

    /// True if either edge bounding `axis` moved.
    #[must_use]
    pub fn changes_axis(&self, axis: Axis) -> bool {
        match axis {
            Axis::Horizontal => self.left != 0.0 || self.right != 0.0,
            Axis::Vertical => self.top != 0.0 || self.bottom != 0.0,
        }
    }
}

/// Containers whose opposing edge touches `edge` of `rect`.
///
/// `container_id` itself is never reported. Containers without geometry
/// are skipped.
#[must_use]
pub fn find_neighbors(
    state: &WindowManagerState,
    container_id: &str,
    rect: EdgeRect,
    edge: Edge,
    tuning: &LayoutTuning,
) -> Vec<ContainerId> {
    let viewport = state.window_size;
    let position = rect.edge_position(edge, viewport);
    state
        .containers
        .iter()
        .filter(|(id, _)| id.as_str() != container_id)
        .filter_map(|(id, container)| container.rect.map(|other| (id, other)))
        .filter(|(_, other)| {
            let facing = other.edge_position(edge.opposite(), viewport);
            (position - facing).abs() <= tuning.neighbor_tolerance
                && overlaps_across(rect, *other, edge, viewport)
        })
        .map(|(id, _)| id.clone())
        .collect()
}

fn overlaps_across(rect: EdgeRect, other: EdgeRect, edge: Edge, viewport: Viewport) -> bool {
    match edge.axis() {
        Axis::Vertical => rect.overlaps_horizontally(&other, viewport),
        Axis::Horizontal => rect.overlaps_vertically(&other, viewport),
    }
}

/// Drag the touching edges of every neighbor along with `old → new`.
///
/// Neighbors are matched against `old`, so an edge that moves away from a
/// neighbor still pulls it. Skipped while the viewport is unmeasured.
/// Returns the number of neighbor edges moved.
pub(crate) fn propagate_resize(
    state: &mut WindowManagerState,
    container_id: &str,
    old: EdgeRect,
    new: EdgeRect,
    tuning: &LayoutTuning,
) -> usize {
    if state.window_size.is_zero() {
        return 0;
    }
    let delta = EdgeDelta::between(old, new);
    if delta.is_zero() {
        return 0;
    }

    let mut moved = 0;
    for edge in Edge::ALL {
        let shift = delta.get(edge);
        if shift == 0.0 {
            continue;
        }
        for neighbor in find_neighbors(state, container_id, old, edge, tuning) {
            let Some(rect) = state.containers.get(&neighbor).and_then(|c| c.rect) else {
                continue;
            };
            let mut next = rect;
            *next.edge_mut(edge.opposite()) -= shift;
            let next = state.clamp_rect(next, tuning);
            trace!(
                container = container_id,
                neighbor = %neighbor,
                ?edge,
                shift,
                "neighbor edge follows"
            );
            if let Some(container) = state.containers.get_mut(&neighbor) {
                container.rect = Some(next);
                container.resize_to_content = container.resize_to_content.without(edge.axis());
            }
            moved += 1;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResizeToContent, Window};

    const VIEW: Viewport = Viewport::new(1000.0, 800.0);

    /// Two containers side by side: `a` on the left, `b` on the right,
    /// sharing the x = 500 edge.
    fn side_by_side() -> WindowManagerState {
        let tuning = LayoutTuning::default();
        let mut state = WindowManagerState::new(VIEW);
        state.register_window(Window::new("wa", "A"), Some("a"), false);
        state.register_window(Window::new("wb", "B"), Some("b"), false);
        state.set_container_dimension(
            "a",
            Some(EdgeRect::new(100.0, 100.0, 500.0, 300.0)),
            false,
            &tuning,
        );
        state.set_container_dimension(
            "b",
            Some(EdgeRect::new(100.0, 500.0, 100.0, 300.0)),
            false,
            &tuning,
        );
        state
    }

    #[test]
    fn delta_axes() {
        let delta = EdgeDelta::between(
            EdgeRect::new(0.0, 0.0, 10.0, 0.0),
            EdgeRect::new(0.0, 0.0, 5.0, 0.0),
        );
        assert_eq!(delta.right, -5.0);
        assert!(delta.changes_axis(Axis::Horizontal));
        assert!(!delta.changes_axis(Axis::Vertical));
        assert!(!delta.is_zero());
    }

    #[test]
    fn finds_right_neighbor_within_tolerance() {
        let mut state = side_by_side();
        let rect = state.container("a").unwrap().rect.unwrap();
        let tuning = LayoutTuning::default();
        assert_eq!(find_neighbors(&state, "a", rect, Edge::Right, &tuning), vec!["b"]);
        assert!(find_neighbors(&state, "a", rect, Edge::Left, &tuning).is_empty());

        // 4px gap still counts.
        if let Some(container) = state.containers.get_mut("b") {
            container.rect = Some(EdgeRect::new(100.0, 504.0, 100.0, 300.0));
        }
        assert_eq!(find_neighbors(&state, "a", rect, Edge::Right, &tuning), vec!["b"]);
    }

    #[test]
    fn no_neighbor_without_perpendicular_overlap() {
        let mut state = side_by_side();
        if let Some(container) = state.containers.get_mut("b") {
            // Same x edge but entirely below `a`.
            container.rect = Some(EdgeRect::new(600.0, 500.0, 100.0, 0.0));
        }
        let rect = state.container("a").unwrap().rect.unwrap();
        assert!(find_neighbors(&state, "a", rect, Edge::Right, &LayoutTuning::default()).is_empty());
    }

    #[test]
    fn widening_pushes_neighbor_edge() {
        let mut state = side_by_side();
        let tuning = LayoutTuning::default();
        state.set_container_dimension(
            "a",
            Some(EdgeRect::new(100.0, 100.0, 450.0, 300.0)),
            true,
            &tuning,
        );
        let b = state.container("b").unwrap();
        assert_eq!(b.rect.unwrap().left, 550.0);
        assert_eq!(b.resize_to_content, ResizeToContent::Height);
        // The resized container keeps its own policy.
        assert_eq!(
            state.container("a").unwrap().resize_to_content,
            ResizeToContent::Both
        );
    }

    #[test]
    fn propagation_can_be_disabled() {
        let mut state = side_by_side();
        state.set_container_dimension(
            "a",
            Some(EdgeRect::new(100.0, 100.0, 450.0, 300.0)),
            false,
            &LayoutTuning::default(),
        );
        assert_eq!(state.container("b").unwrap().rect.unwrap().left, 500.0);
    }

    #[test]
    fn unmeasured_viewport_skips_propagation() {
        let mut state = side_by_side();
        state.window_size = Viewport::ZERO;
        let moved = propagate_resize(
            &mut state,
            "a",
            EdgeRect::new(100.0, 100.0, 500.0, 300.0),
            EdgeRect::new(100.0, 100.0, 450.0, 300.0),
            &LayoutTuning::default(),
        );
        assert_eq!(moved, 0);
    }

    #[test]
    fn pushed_neighbor_is_clamped_to_min_width() {
        let mut state = side_by_side();
        let tuning = LayoutTuning::default();
        // `a` grows until only 150px remain for `b`.
        state.set_container_dimension(
            "a",
            Some(EdgeRect::new(100.0, 100.0, 250.0, 300.0)),
            true,
            &tuning,
        );
        let b = state.container("b").unwrap().rect.unwrap();
        assert!(b.is_well_formed());
        assert!(b.width(VIEW) >= tuning.min_size.width);
    }
}
