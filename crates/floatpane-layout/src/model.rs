//! Window and container data model.
//!
//! A [`Window`] is a logical content panel; a [`Container`] is the floating
//! chrome that hosts one or more windows as tabs. [`WindowManagerState`]
//! ties them together through a window → container mapping that is kept in
//! lock-step with every container's tab list.
//!
//! The maps are persistent (`im::OrdMap`), so cloning a state is O(1) and a
//! mutated copy shares every untouched node with its predecessor.

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use floatpane_core::geometry::{Axis, EdgeRect, Viewport};
use im::OrdMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Identifier of a logical window.
pub type WindowId = String;

/// Identifier of a container.
pub type ContainerId = String;

static NEXT_NONCE: AtomicU64 = AtomicU64::new(1);

/// Registration generation token.
///
/// Every registration of a window carries one. An unregister call that
/// presents a nonce other than the stored one is stale (a newer instance
/// already took the id over) and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(u64);

impl Nonce {
    /// Draw the next process-wide generation.
    #[must_use]
    pub fn fresh() -> Self {
        Self(NEXT_NONCE.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a host-provided token.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Opaque window payload, compared by identity.
#[derive(Clone)]
pub struct WindowContent(Rc<dyn Any>);

impl WindowContent {
    pub fn new<T: Any>(value: T) -> Self {
        Self(Rc::new(value))
    }

    /// Borrow the payload as `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl PartialEq for WindowContent {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for WindowContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WindowContent").finish_non_exhaustive()
    }
}

/// Close callback attached to a window, compared by identity.
#[derive(Clone)]
pub struct CloseHandler(Rc<dyn Fn()>);

impl CloseHandler {
    pub fn new(callback: impl Fn() + 'static) -> Self {
        Self(Rc::new(callback))
    }

    /// Invoke the callback.
    pub fn call(&self) {
        (self.0)();
    }
}

impl PartialEq for CloseHandler {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for CloseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CloseHandler").finish_non_exhaustive()
    }
}

/// A logical content panel.
///
/// Everything except `id` is replaced wholesale on every re-registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub id: WindowId,
    pub title: String,
    pub content: Option<WindowContent>,
    /// Fixed width in pixels; auto-fit forces the container to it.
    pub width: Option<f64>,
    /// Content stretches to the available height instead of being measured.
    pub fill_height: bool,
    pub on_close: Option<CloseHandler>,
    pub nonce: Nonce,
}

impl Window {
    /// Create a window with a fresh nonce.
    pub fn new(id: impl Into<WindowId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: None,
            width: None,
            fill_height: false,
            on_close: None,
            nonce: Nonce::fresh(),
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: WindowContent) -> Self {
        self.content = Some(content);
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn with_fill_height(mut self, fill_height: bool) -> Self {
        self.fill_height = fill_height;
        self
    }

    #[must_use]
    pub fn with_close_handler(mut self, handler: CloseHandler) -> Self {
        self.on_close = Some(handler);
        self
    }

    #[must_use]
    pub fn with_nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = nonce;
        self
    }
}

/// Display mode of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    /// Free-floating, draggable and resizable.
    #[default]
    Normal,
    /// Collapsed to its title bar.
    Minimized,
    /// Fills the viewport.
    Maximized,
    /// Rendered inside a separate browser window.
    Popup,
}

impl ContainerState {
    /// Minimized ↔ Normal; any other state minimizes.
    #[must_use]
    pub const fn toggled_minimized(self) -> Self {
        match self {
            Self::Minimized => Self::Normal,
            _ => Self::Minimized,
        }
    }

    /// Maximized ↔ Normal; any other state maximizes.
    #[must_use]
    pub const fn toggled_maximized(self) -> Self {
        match self {
            Self::Maximized => Self::Normal,
            _ => Self::Maximized,
        }
    }

    /// Whether the engine may move or resize the container in-page.
    #[must_use]
    pub const fn is_free_floating(self) -> bool {
        matches!(self, Self::Normal)
    }

    /// Whether the container is drawn inside the host page at all.
    #[must_use]
    pub const fn is_in_page(self) -> bool {
        !matches!(self, Self::Popup)
    }
}

/// Auto-resize-to-content policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeToContent {
    None,
    /// Fit both width and height.
    #[default]
    Both,
    Width,
    Height,
}

impl ResizeToContent {
    #[must_use]
    pub const fn resizes_width(self) -> bool {
        matches!(self, Self::Both | Self::Width)
    }

    #[must_use]
    pub const fn resizes_height(self) -> bool {
        matches!(self, Self::Both | Self::Height)
    }

    /// Drop `axis` from the policy, keeping the other axis if it was set.
    #[must_use]
    pub const fn without(self, axis: Axis) -> Self {
        match (self, axis) {
            (Self::Both, Axis::Horizontal) => Self::Height,
            (Self::Both, Axis::Vertical) => Self::Width,
            (Self::Width, Axis::Horizontal) | (Self::Height, Axis::Vertical) => Self::None,
            (other, _) => other,
        }
    }
}

/// A floating panel hosting an ordered list of windows as tabs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: ContainerId,
    /// Tab order.
    pub window_ids: Vec<WindowId>,
    #[serde(default)]
    pub active_window_id: Option<WindowId>,
    #[serde(default)]
    pub state: ContainerState,
    /// Absent until first measured.
    #[serde(default)]
    pub rect: Option<EdgeRect>,
    #[serde(skip)]
    pub is_moving: bool,
    #[serde(default)]
    pub is_locked: bool,
    /// Measured width of the title-bar button cluster.
    #[serde(default)]
    pub button_width: f64,
    #[serde(default)]
    pub resize_to_content: ResizeToContent,
}

impl Container {
    /// Empty container with default display state.
    pub fn new(id: impl Into<ContainerId>) -> Self {
        Self {
            id: id.into(),
            window_ids: Vec::new(),
            active_window_id: None,
            state: ContainerState::Normal,
            rect: None,
            is_moving: false,
            is_locked: false,
            button_width: 0.0,
            resize_to_content: ResizeToContent::Both,
        }
    }

    /// Tab index of `window_id`.
    #[must_use]
    pub fn position_of(&self, window_id: &str) -> Option<usize> {
        self.window_ids.iter().position(|id| id == window_id)
    }

    #[must_use]
    pub fn contains(&self, window_id: &str) -> bool {
        self.position_of(window_id).is_some()
    }

    /// True if `window_id` is the only tab.
    #[must_use]
    pub fn is_sole_tab(&self, window_id: &str) -> bool {
        self.window_ids.len() == 1 && self.window_ids[0] == window_id
    }
}

/// One broken invariant found by [`WindowManagerState::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    EmptyContainer {
        container: ContainerId,
    },
    ContainerKeyMismatch {
        key: ContainerId,
        id: ContainerId,
    },
    DuplicateTab {
        window: WindowId,
        container: ContainerId,
    },
    UnmappedTab {
        window: WindowId,
        container: ContainerId,
    },
    MappingMismatch {
        window: WindowId,
        mapped: ContainerId,
        listed_in: ContainerId,
    },
    DanglingMapping {
        window: WindowId,
        container: ContainerId,
    },
    ActiveWindowNotListed {
        container: ContainerId,
        window: WindowId,
    },
    MalformedRect {
        container: ContainerId,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyContainer { container } => {
                write!(f, "container {container} has no tabs")
            }
            Self::ContainerKeyMismatch { key, id } => {
                write!(f, "container stored under {key} carries id {id}")
            }
            Self::DuplicateTab { window, container } => {
                write!(f, "window {window} is listed more than once (again in {container})")
            }
            Self::UnmappedTab { window, container } => {
                write!(f, "window {window} is listed in {container} but not mapped")
            }
            Self::MappingMismatch {
                window,
                mapped,
                listed_in,
            } => write!(
                f,
                "window {window} is mapped to {mapped} but listed in {listed_in}"
            ),
            Self::DanglingMapping { window, container } => {
                write!(f, "window {window} is mapped to {container} which does not list it")
            }
            Self::ActiveWindowNotListed { container, window } => {
                write!(f, "container {container} activates unlisted window {window}")
            }
            Self::MalformedRect { container } => {
                write!(f, "container {container} has a negative or non-finite rect")
            }
        }
    }
}

/// The complete engine state.
///
/// Mutated only through the actions in [`crate::store`] and
/// [`crate::drag`], each of which leaves every invariant intact.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowManagerState {
    pub(crate) windows: OrdMap<WindowId, Window>,
    pub(crate) containers: OrdMap<ContainerId, Container>,
    pub(crate) window_container_mapping: OrdMap<WindowId, ContainerId>,
    pub(crate) active_container_id: Option<ContainerId>,
    pub(crate) dragging_window_id: Option<WindowId>,
    pub(crate) window_size: Viewport,
}

impl WindowManagerState {
    /// Empty state for a viewport.
    #[must_use]
    pub fn new(window_size: Viewport) -> Self {
        Self {
            window_size,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn windows(&self) -> &OrdMap<WindowId, Window> {
        &self.windows
    }

    #[must_use]
    pub fn window(&self, window_id: &str) -> Option<&Window> {
        self.windows.get(window_id)
    }

    #[must_use]
    pub fn containers(&self) -> &OrdMap<ContainerId, Container> {
        &self.containers
    }

    #[must_use]
    pub fn container(&self, container_id: &str) -> Option<&Container> {
        self.containers.get(container_id)
    }

    #[must_use]
    pub fn window_container_mapping(&self) -> &OrdMap<WindowId, ContainerId> {
        &self.window_container_mapping
    }

    /// Container currently hosting `window_id`.
    #[must_use]
    pub fn container_of(&self, window_id: &str) -> Option<&ContainerId> {
        self.window_container_mapping.get(window_id)
    }

    #[must_use]
    pub fn active_container_id(&self) -> Option<&str> {
        self.active_container_id.as_deref()
    }

    #[must_use]
    pub fn dragging_window_id(&self) -> Option<&str> {
        self.dragging_window_id.as_deref()
    }

    #[must_use]
    pub fn window_size(&self) -> Viewport {
        self.window_size
    }

    /// Audit the mapping, tab-list and geometry invariants.
    ///
    /// Returns an empty list for every state reachable through the public
    /// actions.
    #[must_use]
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut issues = Vec::new();
        let mut seen: FxHashSet<&str> = FxHashSet::default();

        for (key, container) in self.containers.iter() {
            if *key != container.id {
                issues.push(InvariantViolation::ContainerKeyMismatch {
                    key: key.clone(),
                    id: container.id.clone(),
                });
            }
            if container.window_ids.is_empty() {
                issues.push(InvariantViolation::EmptyContainer {
                    container: key.clone(),
                });
            }
            if container.rect.is_some_and(|rect| !rect.is_well_formed()) {
                issues.push(InvariantViolation::MalformedRect {
                    container: key.clone(),
                });
            }
            if let Some(active) = &container.active_window_id {
                if !container.contains(active) {
                    issues.push(InvariantViolation::ActiveWindowNotListed {
                        container: key.clone(),
                        window: active.clone(),
                    });
                }
            }
            for window_id in &container.window_ids {
                if !seen.insert(window_id.as_str()) {
                    issues.push(InvariantViolation::DuplicateTab {
                        window: window_id.clone(),
                        container: key.clone(),
                    });
                }
                match self.window_container_mapping.get(window_id) {
                    None => issues.push(InvariantViolation::UnmappedTab {
                        window: window_id.clone(),
                        container: key.clone(),
                    }),
                    Some(mapped) if mapped != key => {
                        issues.push(InvariantViolation::MappingMismatch {
                            window: window_id.clone(),
                            mapped: mapped.clone(),
                            listed_in: key.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        for (window_id, container_id) in self.window_container_mapping.iter() {
            let listed = self
                .containers
                .get(container_id)
                .is_some_and(|container| container.contains(window_id));
            if !listed {
                issues.push(InvariantViolation::DanglingMapping {
                    window: window_id.clone(),
                    container: container_id.clone(),
                });
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonces_are_unique() {
        let a = Nonce::fresh();
        let b = Nonce::fresh();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn content_compares_by_identity() {
        let a = WindowContent::new(String::from("body"));
        let b = WindowContent::new(String::from("body"));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<String>().map(String::as_str), Some("body"));
        assert!(a.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn close_handler_invokes_callback() {
        let hits = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&hits);
        let handler = CloseHandler::new(move || counter.set(counter.get() + 1));
        handler.call();
        handler.clone().call();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn state_toggles() {
        assert_eq!(ContainerState::Normal.toggled_minimized(), ContainerState::Minimized);
        assert_eq!(ContainerState::Minimized.toggled_minimized(), ContainerState::Normal);
        assert_eq!(ContainerState::Maximized.toggled_maximized(), ContainerState::Normal);
        assert_eq!(ContainerState::Minimized.toggled_maximized(), ContainerState::Maximized);
        assert!(!ContainerState::Popup.is_in_page());
    }

    #[test]
    fn resize_mode_downgrades_per_axis() {
        type Mode = ResizeToContent;
        assert_eq!(Mode::Both.without(Axis::Vertical), Mode::Width);
        assert_eq!(Mode::Both.without(Axis::Horizontal), Mode::Height);
        assert_eq!(Mode::Width.without(Axis::Horizontal), Mode::None);
        assert_eq!(Mode::Width.without(Axis::Vertical), Mode::Width);
        assert_eq!(Mode::Height.without(Axis::Vertical), Mode::None);
        assert_eq!(Mode::None.without(Axis::Vertical), Mode::None);
    }

    #[test]
    fn container_serde_skips_moving_flag() {
        let mut container = Container::new("c1");
        container.window_ids.push("w1".into());
        container.is_moving = true;
        let json = serde_json::to_string(&container).unwrap();
        assert!(json.contains("\"windowIds\":[\"w1\"]"));
        assert!(!json.contains("isMoving"));
        let back: Container = serde_json::from_str(&json).unwrap();
        assert!(!back.is_moving);
        assert_eq!(back.resize_to_content, ResizeToContent::Both);
    }

    #[test]
    fn invariant_audit_reports_dangling_mapping() {
        let mut state = WindowManagerState::new(Viewport::new(800.0, 600.0));
        state
            .window_container_mapping
            .insert("w1".into(), "ghost".into());
        assert_eq!(
            state.check_invariants(),
            vec![InvariantViolation::DanglingMapping {
                window: "w1".into(),
                container: "ghost".into(),
            }]
        );
    }
}
