//! Store actions over [`WindowManagerState`].
//!
//! Every action mutates a private copy of the state and leaves all
//! invariants intact when it returns. References to ids that no longer
//! exist are expected races with host teardown: they are logged at `debug`
//! and reported as "unchanged" (`false`/`None`), never as errors.

use floatpane_core::geometry::{Axis, EdgeRect, Viewport};
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{debug, warn};

use crate::model::{
    CloseHandler, Container, ContainerId, ContainerState, Nonce, ResizeToContent, Window,
    WindowManagerState,
};
use crate::neighbors::{EdgeDelta, propagate_resize};
use crate::tuning::LayoutTuning;

/// Length of generated container ids.
pub const CONTAINER_ID_LEN: usize = 16;

/// Attempts made to find an unused container id.
pub const CONTAINER_ID_ATTEMPTS: usize = 50;

impl WindowManagerState {
    /// Upsert a window and give it a home container.
    ///
    /// The home is, in order: the container already mapped for this id,
    /// `default_container_id`, or a freshly generated id. A missing home is
    /// created. New ids are appended to the end of the tab list. On the
    /// window's first placement with `activate_on_open`, it becomes the
    /// active tab and its container gains focus.
    ///
    /// Returns the home container id, or `None` if no unused id could be
    /// generated.
    pub fn register_window(
        &mut self,
        window: Window,
        default_container_id: Option<&str>,
        activate_on_open: bool,
    ) -> Option<ContainerId> {
        let window_id = window.id.clone();
        let mapped = self.window_container_mapping.get(&window_id).cloned();
        let first_placement = mapped.is_none();

        let container_id = match mapped {
            Some(id) => id,
            None => match default_container_id {
                Some(id) => id.to_owned(),
                None => {
                    let Some(id) = self.fresh_container_id() else {
                        warn!(window = %window_id, "no unused container id; registration skipped");
                        return None;
                    };
                    id
                }
            },
        };

        self.windows.insert(window_id.clone(), window);

        let container = self
            .containers
            .entry(container_id.clone())
            .or_insert_with(|| Container::new(container_id.clone()));
        if !container.contains(&window_id) {
            container.window_ids.push(window_id.clone());
        }
        if first_placement && activate_on_open {
            container.active_window_id = Some(window_id.clone());
            self.active_container_id = Some(container_id.clone());
        }

        self.window_container_mapping
            .insert(window_id, container_id.clone());
        Some(container_id)
    }

    /// Remove a window's registration.
    ///
    /// A `nonce` that differs from the stored one marks a stale call from an
    /// instance that was already superseded; nothing happens and `false` is
    /// returned. Tab membership is left in place: the slot stays until a
    /// drag or close flow clears it.
    pub fn unregister_window(&mut self, window_id: &str, nonce: Option<Nonce>) -> bool {
        let Some(existing) = self.windows.get(window_id) else {
            debug!(window = window_id, "unregister of unknown window");
            return false;
        };
        if let Some(nonce) = nonce {
            if existing.nonce != nonce {
                debug!(
                    window = window_id,
                    stored = existing.nonce.get(),
                    presented = nonce.get(),
                    "stale unregister ignored"
                );
                return false;
            }
        }
        self.windows.remove(window_id);
        true
    }

    /// Drop a window's tab slot and mapping.
    ///
    /// Deletes the container if this was its last tab.
    pub fn remove_window_from_container(&mut self, window_id: &str) -> bool {
        let detached = self.detach_window(window_id).is_some();
        let unmapped = self.window_container_mapping.remove(window_id).is_some();
        detached || unmapped
    }

    /// Set (or clear) a container's geometry.
    ///
    /// With `resize_neighbours`, edges of other containers that touch a
    /// moved edge follow it. The rectangle is clamped to the viewport.
    pub fn set_container_dimension(
        &mut self,
        container_id: &str,
        rect: Option<EdgeRect>,
        resize_neighbours: bool,
        tuning: &LayoutTuning,
    ) -> bool {
        let Some(container) = self.containers.get(container_id) else {
            debug!(container = container_id, "dimension for unknown container");
            return false;
        };
        let old = container.rect;
        let next = rect.map(|rect| self.clamp_rect(rect, tuning));
        if old == next {
            return false;
        }

        if resize_neighbours {
            if let (Some(old), Some(new)) = (old, next) {
                propagate_resize(self, container_id, old, new, tuning);
            }
        }

        self.update_container(container_id, |container| container.rect = next)
    }

    /// Apply a rectangle the user dragged out by hand.
    ///
    /// Axes whose size changed are removed from the container's own
    /// auto-resize policy before committing with neighbor propagation, so
    /// fit-to-content never undoes the gesture.
    pub fn resize_container_by_user(
        &mut self,
        container_id: &str,
        rect: EdgeRect,
        tuning: &LayoutTuning,
    ) -> bool {
        let Some(container) = self.containers.get(container_id) else {
            return false;
        };
        let mut mode = container.resize_to_content;
        if let Some(old) = container.rect {
            let delta = EdgeDelta::between(old, rect);
            if delta.changes_axis(Axis::Horizontal) {
                mode = mode.without(Axis::Horizontal);
            }
            if delta.changes_axis(Axis::Vertical) {
                mode = mode.without(Axis::Vertical);
            }
        }
        let downgraded = self.set_should_resize_to_content(container_id, mode);
        let resized = self.set_container_dimension(container_id, Some(rect), true, tuning);
        downgraded || resized
    }

    /// Replace the display state.
    pub fn set_container_state(&mut self, container_id: &str, state: ContainerState) -> bool {
        self.update_container_state(container_id, |_| state)
    }

    /// Replace the display state with a function of the previous one.
    pub fn update_container_state(
        &mut self,
        container_id: &str,
        reducer: impl FnOnce(ContainerState) -> ContainerState,
    ) -> bool {
        self.update_container(container_id, |container| {
            container.state = reducer(container.state);
        })
    }

    pub fn toggle_minimized(&mut self, container_id: &str) -> bool {
        self.update_container_state(container_id, ContainerState::toggled_minimized)
    }

    pub fn toggle_maximized(&mut self, container_id: &str) -> bool {
        self.update_container_state(container_id, ContainerState::toggled_maximized)
    }

    /// Move the container into its own browser window.
    pub fn open_in_popup(&mut self, container_id: &str) -> bool {
        self.set_container_state(container_id, ContainerState::Popup)
    }

    /// The popup window was closed; bring the container back in-page.
    pub fn close_popup(&mut self, container_id: &str) -> bool {
        self.update_container_state(container_id, |state| match state {
            ContainerState::Popup => ContainerState::Normal,
            other => other,
        })
    }

    /// Make `window_id` the visible tab, restore a minimized container and
    /// focus it.
    pub fn set_active_window_in_container(&mut self, container_id: &str, window_id: &str) -> bool {
        let listed = self
            .containers
            .get(container_id)
            .is_some_and(|container| container.contains(window_id));
        if !listed {
            debug!(
                container = container_id,
                window = window_id,
                "activate of unlisted tab"
            );
            return false;
        }
        let changed = self.update_container(container_id, |container| {
            container.active_window_id = Some(window_id.to_owned());
            if container.state == ContainerState::Minimized {
                container.state = ContainerState::Normal;
            }
        });
        self.set_active_container(container_id) || changed
    }

    /// Focus a container. No-op if it does not exist.
    pub fn set_active_container(&mut self, container_id: &str) -> bool {
        if !self.containers.contains_key(container_id) {
            return false;
        }
        if self.active_container_id.as_deref() == Some(container_id) {
            return false;
        }
        self.active_container_id = Some(container_id.to_owned());
        true
    }

    /// Record a new viewport size and re-home every rectangle.
    ///
    /// The first measurement (previous size `0×0`) only records the size.
    pub fn set_window_size(&mut self, viewport: Viewport, tuning: &LayoutTuning) -> bool {
        let old = self.window_size;
        if old == viewport {
            return false;
        }
        self.window_size = viewport;
        if old.is_zero() {
            return true;
        }

        let ids: Vec<ContainerId> = self.containers.keys().cloned().collect();
        for id in ids {
            if let Some(container) = self.containers.get_mut(&id) {
                if let Some(rect) = container.rect {
                    container.rect =
                        Some(rect.reflowed(old, viewport).clamped(viewport, tuning.min_size));
                }
            }
        }
        true
    }

    pub fn set_button_width(&mut self, container_id: &str, width: f64) -> bool {
        self.update_container(container_id, |container| container.button_width = width)
    }

    pub fn set_container_is_moving(&mut self, container_id: &str, is_moving: bool) -> bool {
        self.update_container(container_id, |container| container.is_moving = is_moving)
    }

    pub fn set_container_is_locked(&mut self, container_id: &str, is_locked: bool) -> bool {
        self.update_container(container_id, |container| container.is_locked = is_locked)
    }

    pub fn set_should_resize_to_content(
        &mut self,
        container_id: &str,
        mode: ResizeToContent,
    ) -> bool {
        self.update_container(container_id, |container| {
            container.resize_to_content = mode;
        })
    }

    /// Close callbacks of every window tabbed in the container.
    ///
    /// Nothing is removed: owners react to the callback by unregistering.
    #[must_use]
    pub fn close_handlers(&self, container_id: &str) -> Vec<CloseHandler> {
        let Some(container) = self.containers.get(container_id) else {
            return Vec::new();
        };
        container
            .window_ids
            .iter()
            .filter_map(|id| self.windows.get(id))
            .filter_map(|window| window.on_close.clone())
            .collect()
    }

    /// Forget the window being dragged (pointer-up).
    pub fn clear_dragging_window(&mut self) -> bool {
        self.dragging_window_id.take().is_some()
    }

    // ====================================================================
    // Internals shared with drag/neighbors/auto_fit
    // ====================================================================

    /// Clamp to the current viewport, or only to non-negative distances
    /// while the viewport is still unmeasured.
    pub(crate) fn clamp_rect(&self, rect: EdgeRect, tuning: &LayoutTuning) -> EdgeRect {
        if self.window_size.is_zero() {
            rect.non_negative()
        } else {
            rect.clamped(self.window_size, tuning.min_size)
        }
    }

    /// Mutate one container; `true` if it existed and changed.
    pub(crate) fn update_container(
        &mut self,
        container_id: &str,
        f: impl FnOnce(&mut Container),
    ) -> bool {
        let Some(container) = self.containers.get_mut(container_id) else {
            debug!(container = container_id, "update of unknown container");
            return false;
        };
        let before = container.clone();
        f(container);
        *container != before
    }

    /// Take the window out of its container's tab list.
    ///
    /// The mapping is left for the caller to rewrite. An emptied container
    /// is deleted; otherwise a removed active tab hands focus to its left
    /// neighbor.
    pub(crate) fn detach_window(&mut self, window_id: &str) -> Option<ContainerId> {
        let container_id = self.window_container_mapping.get(window_id)?.clone();
        let container = self.containers.get_mut(&container_id)?;
        let index = container.position_of(window_id)?;
        container.window_ids.remove(index);

        if container.window_ids.is_empty() {
            self.containers.remove(&container_id);
            if self.active_container_id.as_deref() == Some(container_id.as_str()) {
                self.active_container_id = None;
            }
            return Some(container_id);
        }

        if container.active_window_id.as_deref() == Some(window_id) {
            let fallback = index.saturating_sub(1).min(container.window_ids.len() - 1);
            container.active_window_id = Some(container.window_ids[fallback].clone());
        }
        Some(container_id)
    }

    /// Random alphanumeric id not used by any container.
    pub(crate) fn fresh_container_id(&self) -> Option<ContainerId> {
        let mut rng = rand::rng();
        (0..CONTAINER_ID_ATTEMPTS).find_map(|_| {
            let candidate: String = (&mut rng)
                .sample_iter(Alphanumeric)
                .take(CONTAINER_ID_LEN)
                .map(char::from)
                .collect();
            (!self.containers.contains_key(&candidate)).then_some(candidate)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    const VIEW: Viewport = Viewport::new(1000.0, 800.0);

    fn state() -> WindowManagerState {
        WindowManagerState::new(VIEW)
    }

    fn tuning() -> LayoutTuning {
        LayoutTuning::default()
    }

    #[test]
    fn register_creates_default_container() {
        let mut state = state();
        let home = state
            .register_window(Window::new("w1", "One"), Some("c1"), false)
            .unwrap();
        assert_eq!(home, "c1");
        let container = state.container("c1").unwrap();
        assert_eq!(container.window_ids, vec!["w1".to_string()]);
        assert_eq!(container.state, ContainerState::Normal);
        assert_eq!(container.resize_to_content, ResizeToContent::Both);
        assert!(!container.is_locked);
        assert_eq!(container.active_window_id, None);
        assert_eq!(state.active_container_id(), None);
        assert!(state.check_invariants().is_empty());
    }

    #[test]
    fn register_generates_random_container_id() {
        let mut state = state();
        let home = state
            .register_window(Window::new("w1", "One"), None, true)
            .unwrap();
        assert_eq!(home.len(), CONTAINER_ID_LEN);
        assert!(home.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(state.active_container_id(), Some(home.as_str()));
        assert_eq!(
            state.container(&home).unwrap().active_window_id.as_deref(),
            Some("w1")
        );
    }

    #[test]
    fn register_appends_in_registration_order() {
        let mut state = state();
        for id in ["w1", "w2", "w3"] {
            state.register_window(Window::new(id, id), Some("c1"), false);
        }
        assert_eq!(
            state.container("c1").unwrap().window_ids,
            vec!["w1", "w2", "w3"]
        );
    }

    #[test]
    fn re_registration_is_idempotent() {
        let window = Window::new("w1", "One");
        let mut once = state();
        once.register_window(window.clone(), Some("c1"), true);
        let mut twice = once.clone();
        twice.register_window(window, Some("c1"), true);
        assert_eq!(once, twice);
    }

    #[test]
    fn re_registration_keeps_existing_home_and_focus() {
        let mut state = state();
        state.register_window(Window::new("w1", "One"), Some("c1"), false);
        state.register_window(Window::new("w2", "Two"), Some("c2"), true);
        state.register_window(Window::new("w1", "Renamed"), Some("c2"), true);
        assert_eq!(state.container_of("w1").map(String::as_str), Some("c1"));
        assert_eq!(state.window("w1").unwrap().title, "Renamed");
        assert_eq!(state.active_container_id(), Some("c2"));
    }

    #[test]
    fn unregister_nonce_race() {
        let mut state = state();
        let n1 = Nonce::from_raw(1);
        let n2 = Nonce::from_raw(2);
        state.register_window(Window::new("w1", "One").with_nonce(n1), Some("c1"), false);

        assert!(!state.unregister_window("w1", Some(n2)));
        assert!(state.window("w1").is_some());

        assert!(state.unregister_window("w1", Some(n1)));
        assert!(state.window("w1").is_none());
        // The tab slot survives until a drag or close clears it.
        assert!(state.container("c1").unwrap().contains("w1"));
        assert!(state.check_invariants().is_empty());
    }

    #[test]
    fn unregister_without_nonce_always_removes() {
        let mut state = state();
        state.register_window(Window::new("w1", "One"), Some("c1"), false);
        assert!(state.unregister_window("w1", None));
        assert!(!state.unregister_window("w1", None));
    }

    #[test]
    fn remove_last_tab_deletes_container() {
        let mut state = state();
        state.register_window(Window::new("w1", "One"), Some("c1"), true);
        assert!(state.remove_window_from_container("w1"));
        assert!(state.container("c1").is_none());
        assert!(state.container_of("w1").is_none());
        assert_eq!(state.active_container_id(), None);
        assert!(state.check_invariants().is_empty());
    }

    #[test]
    fn removing_active_tab_activates_left_neighbor() {
        let mut state = state();
        for id in ["w1", "w2", "w3"] {
            state.register_window(Window::new(id, id), Some("c1"), false);
        }
        state.set_active_window_in_container("c1", "w3");
        state.remove_window_from_container("w3");
        assert_eq!(
            state.container("c1").unwrap().active_window_id.as_deref(),
            Some("w2")
        );
    }

    #[test]
    fn activate_restores_minimized_and_focuses() {
        let mut state = state();
        state.register_window(Window::new("w1", "One"), Some("c1"), false);
        state.register_window(Window::new("w2", "Two"), Some("c1"), false);
        state.set_container_state("c1", ContainerState::Minimized);

        assert!(state.set_active_window_in_container("c1", "w2"));
        let container = state.container("c1").unwrap();
        assert_eq!(container.state, ContainerState::Normal);
        assert_eq!(container.active_window_id.as_deref(), Some("w2"));
        assert_eq!(state.active_container_id(), Some("c1"));

        assert!(!state.set_active_window_in_container("c1", "missing"));
        assert!(!state.set_active_window_in_container("missing", "w1"));
    }

    #[test]
    fn state_reducer_toggles() {
        let mut state = state();
        state.register_window(Window::new("w1", "One"), Some("c1"), false);
        assert!(state.toggle_maximized("c1"));
        assert_eq!(state.container("c1").unwrap().state, ContainerState::Maximized);
        assert!(state.toggle_maximized("c1"));
        assert_eq!(state.container("c1").unwrap().state, ContainerState::Normal);
        assert!(state.open_in_popup("c1"));
        assert!(state.close_popup("c1"));
        assert!(!state.close_popup("c1"));
        assert!(!state.toggle_minimized("missing"));
    }

    #[test]
    fn set_active_container_ignores_unknown() {
        let mut state = state();
        assert!(!state.set_active_container("nope"));
        assert_eq!(state.active_container_id(), None);
    }

    #[test]
    fn scoped_setters_noop_on_missing_container() {
        let mut state = state();
        let before = state.clone();
        assert!(!state.set_button_width("nope", 40.0));
        assert!(!state.set_container_is_moving("nope", true));
        assert!(!state.set_container_is_locked("nope", true));
        assert!(!state.set_should_resize_to_content("nope", ResizeToContent::None));
        assert!(!state.set_container_dimension("nope", Some(EdgeRect::FULL), true, &tuning()));
        assert_eq!(state, before);
    }

    #[test]
    fn dimension_is_clamped() {
        let mut state = state();
        state.register_window(Window::new("w1", "One"), Some("c1"), false);
        state.set_container_dimension(
            "c1",
            Some(EdgeRect::new(-10.0, 900.0, 0.0, 0.0)),
            false,
            &tuning(),
        );
        let rect = state.container("c1").unwrap().rect.unwrap();
        assert_eq!(rect.top, 0.0);
        assert_eq!(rect.left, 800.0);
    }

    #[test]
    fn unmeasured_viewport_only_floors_edges() {
        let mut state = WindowManagerState::default();
        state.register_window(Window::new("w1", "One"), Some("c1"), false);
        state.set_container_dimension(
            "c1",
            Some(EdgeRect::new(-1.0, 10.0, 20.0, 30.0)),
            false,
            &tuning(),
        );
        assert_eq!(
            state.container("c1").unwrap().rect,
            Some(EdgeRect::new(0.0, 10.0, 20.0, 30.0))
        );
    }

    #[test]
    fn viewport_resize_translates_rectangles() {
        let mut state = state();
        state.register_window(Window::new("w1", "One"), Some("c1"), false);
        state.set_container_dimension(
            "c1",
            Some(EdgeRect::new(10.0, 10.0, 10.0, 10.0)),
            false,
            &tuning(),
        );
        assert!(state.set_window_size(Viewport::new(1200.0, 800.0), &tuning()));
        assert_eq!(
            state.container("c1").unwrap().rect,
            Some(EdgeRect::new(10.0, 10.0, 210.0, 10.0))
        );
        assert!(!state.set_window_size(Viewport::new(1200.0, 800.0), &tuning()));
    }

    #[test]
    fn first_viewport_measurement_does_not_move_rects() {
        let mut state = WindowManagerState::default();
        state.register_window(Window::new("w1", "One"), Some("c1"), false);
        state.set_container_dimension(
            "c1",
            Some(EdgeRect::new(10.0, 10.0, 10.0, 10.0)),
            false,
            &tuning(),
        );
        assert!(state.set_window_size(VIEW, &tuning()));
        assert_eq!(
            state.container("c1").unwrap().rect,
            Some(EdgeRect::new(10.0, 10.0, 10.0, 10.0))
        );
        assert_eq!(state.window_size(), VIEW);
    }

    #[test]
    fn manual_resize_clears_own_axis() {
        let mut state = state();
        state.register_window(Window::new("w1", "One"), Some("c1"), false);
        state.set_container_dimension(
            "c1",
            Some(EdgeRect::new(100.0, 100.0, 500.0, 300.0)),
            false,
            &tuning(),
        );
        state.resize_container_by_user("c1", EdgeRect::new(100.0, 100.0, 450.0, 300.0), &tuning());
        let container = state.container("c1").unwrap();
        assert_eq!(container.resize_to_content, ResizeToContent::Height);
        assert_eq!(container.rect.unwrap().right, 450.0);
    }

    #[test]
    fn close_handlers_skip_unregistered_and_callbackless() {
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let handler = CloseHandler::new(move || counter.set(counter.get() + 1));

        let mut state = state();
        state.register_window(
            Window::new("w1", "One").with_close_handler(handler),
            Some("c1"),
            false,
        );
        state.register_window(Window::new("w2", "Two"), Some("c1"), false);
        state.register_window(Window::new("w3", "Three"), Some("c1"), false);
        state.unregister_window("w3", None);

        let handlers = state.close_handlers("c1");
        assert_eq!(handlers.len(), 1);
        for handler in &handlers {
            handler.call();
        }
        assert_eq!(hits.get(), 1);
        assert!(state.close_handlers("missing").is_empty());
    }

    #[test]
    fn clear_dragging_reports_change() {
        let mut state = state();
        assert!(!state.clear_dragging_window());
        state.dragging_window_id = Some("w1".into());
        assert!(state.clear_dragging_window());
        assert_eq!(state.dragging_window_id(), None);
    }
}
