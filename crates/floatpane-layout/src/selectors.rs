//! Read-only views the presentation layer renders from.

use crate::model::{Window, WindowId, WindowManagerState};

/// One entry of a container's tab strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabEntry {
    pub id: WindowId,
    /// `None` while the tab's window is unregistered; such a tab is drawn
    /// inert.
    pub title: Option<String>,
}

/// Visible tab of a container.
///
/// The stored active id wins if it is listed and backed by a registered
/// window; otherwise the first such tab is used.
#[must_use]
pub fn active_window_id<'a>(state: &'a WindowManagerState, container_id: &str) -> Option<&'a str> {
    let container = state.container(container_id)?;
    let live = |id: &str| container.contains(id) && state.window(id).is_some();
    if let Some(active) = container.active_window_id.as_deref() {
        if live(active) {
            return Some(active);
        }
    }
    container
        .window_ids
        .iter()
        .map(String::as_str)
        .find(|id| state.window(id).is_some())
}

#[must_use]
pub fn active_window<'a>(state: &'a WindowManagerState, container_id: &str) -> Option<&'a Window> {
    active_window_id(state, container_id).and_then(|id| state.window(id))
}

/// Tabs in display order.
#[must_use]
pub fn tab_strip(state: &WindowManagerState, container_id: &str) -> Vec<TabEntry> {
    let Some(container) = state.container(container_id) else {
        return Vec::new();
    };
    container
        .window_ids
        .iter()
        .map(|id| TabEntry {
            id: id.clone(),
            title: state.window(id).map(|window| window.title.clone()),
        })
        .collect()
}

/// Whether the container shows a close button.
///
/// Every tab must either accept closing or be unregistered already; an
/// unregistered tab has no owner left to object.
#[must_use]
pub fn is_closable(state: &WindowManagerState, container_id: &str) -> bool {
    let Some(container) = state.container(container_id) else {
        return false;
    };
    container
        .window_ids
        .iter()
        .all(|id| state.window(id).is_none_or(|window| window.on_close.is_some()))
}

#[must_use]
pub fn is_dragging(state: &WindowManagerState, window_id: &str) -> bool {
    state.dragging_window_id() == Some(window_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CloseHandler;
    use floatpane_core::geometry::Viewport;

    fn state() -> WindowManagerState {
        let mut state = WindowManagerState::new(Viewport::new(1000.0, 800.0));
        state.register_window(Window::new("w1", "One"), Some("c1"), false);
        state.register_window(Window::new("w2", "Two"), Some("c1"), false);
        state
    }

    #[test]
    fn active_falls_back_to_first_registered_tab() {
        let mut state = state();
        assert_eq!(active_window_id(&state, "c1"), Some("w1"));

        state.set_active_window_in_container("c1", "w2");
        assert_eq!(active_window_id(&state, "c1"), Some("w2"));

        state.unregister_window("w2", None);
        assert_eq!(active_window_id(&state, "c1"), Some("w1"));
        assert_eq!(active_window(&state, "c1").map(|w| w.title.as_str()), Some("One"));

        state.unregister_window("w1", None);
        assert_eq!(active_window_id(&state, "c1"), None);
        assert_eq!(active_window_id(&state, "missing"), None);
    }

    #[test]
    fn tab_strip_marks_unregistered_tabs() {
        let mut state = state();
        state.unregister_window("w1", None);
        assert_eq!(
            tab_strip(&state, "c1"),
            vec![
                TabEntry {
                    id: "w1".into(),
                    title: None,
                },
                TabEntry {
                    id: "w2".into(),
                    title: Some("Two".into()),
                },
            ]
        );
        assert!(tab_strip(&state, "missing").is_empty());
    }

    #[test]
    fn close_gating_requires_every_tab_closable() {
        let mut state = state();
        assert!(!is_closable(&state, "c1"));

        let handler = CloseHandler::new(|| {});
        state.register_window(
            Window::new("w1", "One").with_close_handler(handler.clone()),
            None,
            false,
        );
        assert!(!is_closable(&state, "c1"));

        state.register_window(
            Window::new("w2", "Two").with_close_handler(handler),
            None,
            false,
        );
        assert!(is_closable(&state, "c1"));
        assert!(!is_closable(&state, "missing"));
    }

    #[test]
    fn unregistered_tabs_do_not_block_closing() {
        let mut state = state();
        state.register_window(
            Window::new("w2", "Two").with_close_handler(CloseHandler::new(|| {})),
            None,
            false,
        );
        state.unregister_window("w1", None);
        assert!(is_closable(&state, "c1"));

        state.unregister_window("w2", None);
        assert!(is_closable(&state, "c1"));
    }

    #[test]
    fn dragging_marker() {
        let mut state = state();
        assert!(!is_dragging(&state, "w1"));
        state.dragging_window_id = Some("w1".into());
        assert!(is_dragging(&state, "w1"));
        assert!(!is_dragging(&state, "w2"));
    }
}
