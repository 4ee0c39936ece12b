//! Resize-to-content.
//!
//! The host measures the rendered container and its scrollable content
//! after each layout; the overflow (or slack) on every axis the container
//! still auto-fits becomes a size delta. The result goes through the same
//! clamp and neighbor propagation as any other resize.

use floatpane_core::geometry::EdgeRect;
use tracing::trace;

use crate::model::{ContainerState, WindowManagerState};
use crate::selectors::active_window;
use crate::tuning::LayoutTuning;

/// DOM measurements of one container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentMeasurement {
    /// Rectangle the container currently renders at.
    pub rendered: EdgeRect,
    /// Scroll size of the content.
    pub content_width: f64,
    pub content_height: f64,
    /// Visible size of the content area.
    pub client_width: f64,
    pub client_height: f64,
}

/// Why a fit was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitSkipReason {
    MissingContainer,
    /// The user is dragging a resize handle.
    UserResizing,
    Moving,
    /// Minimized, maximized and popped-out containers keep their size.
    NotNormal,
    /// Auto-resize is switched off on both axes.
    Disabled,
    NoChange,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitOutcome {
    Applied(EdgeRect),
    Skipped(FitSkipReason),
}

impl WindowManagerState {
    /// Fit a container to its measured content.
    ///
    /// A fixed `width` on the active window forces the container width;
    /// `fill_height` windows are never fitted vertically.
    pub fn fit_to_content(
        &mut self,
        container_id: &str,
        measurement: ContentMeasurement,
        user_resizing: bool,
        tuning: &LayoutTuning,
    ) -> FitOutcome {
        let Some(container) = self.containers.get(container_id) else {
            return FitOutcome::Skipped(FitSkipReason::MissingContainer);
        };
        if user_resizing {
            return FitOutcome::Skipped(FitSkipReason::UserResizing);
        }
        if container.is_moving {
            return FitOutcome::Skipped(FitSkipReason::Moving);
        }
        if container.state != ContainerState::Normal {
            return FitOutcome::Skipped(FitSkipReason::NotNormal);
        }
        let mode = container.resize_to_content;
        if !mode.resizes_width() && !mode.resizes_height() {
            return FitOutcome::Skipped(FitSkipReason::Disabled);
        }
        let current = container.rect;

        let window = active_window(self, container_id);
        let fixed_width = window.and_then(|window| window.width);
        let fill_height = window.is_some_and(|window| window.fill_height);

        let mut rect = measurement.rendered;
        let mut dw = 0.0;
        if mode.resizes_width() {
            match fixed_width {
                Some(width) => rect = rect.with_width(width, self.window_size),
                None => dw = measurement.content_width - measurement.client_width,
            }
        }
        let dh = if mode.resizes_height() && !fill_height {
            measurement.content_height - measurement.client_height
        } else {
            0.0
        };

        let next = self.clamp_rect(rect.resized_by(dw, dh), tuning);
        if current == Some(next) {
            return FitOutcome::Skipped(FitSkipReason::NoChange);
        }
        trace!(container = container_id, dw, dh, "fit to content");
        self.set_container_dimension(container_id, Some(next), true, tuning);
        FitOutcome::Applied(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResizeToContent, Window};
    use floatpane_core::geometry::Viewport;

    const VIEW: Viewport = Viewport::new(1000.0, 800.0);
    const RECT: EdgeRect = EdgeRect::new(100.0, 100.0, 500.0, 400.0);

    fn state_with(window: Window) -> WindowManagerState {
        let mut state = WindowManagerState::new(VIEW);
        state.register_window(window, Some("c1"), true);
        state.set_container_dimension("c1", Some(RECT), false, &LayoutTuning::default());
        state
    }

    fn overflow(dw: f64, dh: f64) -> ContentMeasurement {
        ContentMeasurement {
            rendered: RECT,
            content_width: 400.0 + dw,
            content_height: 300.0 + dh,
            client_width: 400.0,
            client_height: 300.0,
        }
    }

    #[test]
    fn grows_by_overflow() {
        let mut state = state_with(Window::new("w1", "One"));
        let outcome = state.fit_to_content("c1", overflow(50.0, 20.0), false, &LayoutTuning::default());
        let expected = EdgeRect::new(100.0, 100.0, 450.0, 380.0);
        assert_eq!(outcome, FitOutcome::Applied(expected));
        assert_eq!(state.container("c1").unwrap().rect, Some(expected));
    }

    #[test]
    fn exact_fit_reports_no_change() {
        let mut state = state_with(Window::new("w1", "One"));
        assert_eq!(
            state.fit_to_content("c1", overflow(0.0, 0.0), false, &LayoutTuning::default()),
            FitOutcome::Skipped(FitSkipReason::NoChange)
        );
    }

    #[test]
    fn fixed_width_wins_over_measurement() {
        let mut state = state_with(Window::new("w1", "One").with_width(320.0));
        let FitOutcome::Applied(rect) =
            state.fit_to_content("c1", overflow(50.0, 0.0), false, &LayoutTuning::default())
        else {
            panic!("fit should apply");
        };
        assert_eq!(rect.width(VIEW), 320.0);
        assert_eq!(rect.left, 100.0);
    }

    #[test]
    fn fill_height_is_not_fitted_vertically() {
        let mut state = state_with(Window::new("w1", "One").with_fill_height(true));
        assert_eq!(
            state.fit_to_content("c1", overflow(0.0, 80.0), false, &LayoutTuning::default()),
            FitOutcome::Skipped(FitSkipReason::NoChange)
        );
    }

    #[test]
    fn gates() {
        let tuning = LayoutTuning::default();
        let mut state = state_with(Window::new("w1", "One"));
        let skipped = |reason| FitOutcome::Skipped(reason);

        assert_eq!(
            state.fit_to_content("nope", overflow(10.0, 0.0), false, &tuning),
            skipped(FitSkipReason::MissingContainer)
        );
        assert_eq!(
            state.fit_to_content("c1", overflow(10.0, 0.0), true, &tuning),
            skipped(FitSkipReason::UserResizing)
        );

        state.set_container_is_moving("c1", true);
        assert_eq!(
            state.fit_to_content("c1", overflow(10.0, 0.0), false, &tuning),
            skipped(FitSkipReason::Moving)
        );
        state.set_container_is_moving("c1", false);

        state.set_container_state("c1", ContainerState::Maximized);
        assert_eq!(
            state.fit_to_content("c1", overflow(10.0, 0.0), false, &tuning),
            skipped(FitSkipReason::NotNormal)
        );
        state.set_container_state("c1", ContainerState::Normal);

        state.set_should_resize_to_content("c1", ResizeToContent::None);
        assert_eq!(
            state.fit_to_content("c1", overflow(10.0, 0.0), false, &tuning),
            skipped(FitSkipReason::Disabled)
        );
    }

    #[test]
    fn width_only_mode_ignores_vertical_overflow() {
        let mut state = state_with(Window::new("w1", "One"));
        state.set_should_resize_to_content("c1", ResizeToContent::Width);
        let outcome = state.fit_to_content("c1", overflow(30.0, 90.0), false, &LayoutTuning::default());
        assert_eq!(
            outcome,
            FitOutcome::Applied(EdgeRect::new(100.0, 100.0, 470.0, 400.0))
        );
    }
}
