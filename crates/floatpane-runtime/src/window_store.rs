#![forbid(unsafe_code)]

//! One named window store: the published snapshot, its tuning and the
//! persistence adapter behind it.
//!
//! Every action clones the current [`WindowManagerState`] (cheap: the maps
//! are persistent `im` maps), applies the pure action from
//! `floatpane-layout`, and publishes the result as a new [`StateSnapshot`]
//! if anything changed. When the durable subset changed too, the layout is
//! written through to storage. Write failures are logged and swallowed.
//!
//! # Re-entrancy
//!
//! No borrow is held while subscribers or close callbacks run, so both may
//! call back into the store. Callbacks that outlive the store should hold a
//! [`WeakWindowStore`] to avoid a reference cycle through the state.

use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use floatpane_core::geometry::{EdgeRect, PointerPosition, Viewport};
use floatpane_layout::persist::PersistedLayout;
use floatpane_layout::selectors;
use floatpane_layout::{
    ContainerId, ContainerState, ContentMeasurement, DragOutcome, FitOutcome, LayoutTuning, Nonce,
    ResizeToContent, TabEntry, Window, WindowManagerState,
};
use tracing::{debug, debug_span, warn};

use crate::observable::{Observable, Subscription};
use crate::state_persistence::{LayoutPersistence, StorageResult};

/// An immutable published state.
///
/// Equality is identity: two snapshots are equal only if they are the same
/// publication.
#[derive(Clone)]
pub struct StateSnapshot(Rc<WindowManagerState>);

impl StateSnapshot {
    #[must_use]
    pub fn new(state: WindowManagerState) -> Self {
        Self(Rc::new(state))
    }

    /// Copy the state out for modification.
    #[must_use]
    pub fn to_state(&self) -> WindowManagerState {
        WindowManagerState::clone(&self.0)
    }
}

impl PartialEq for StateSnapshot {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for StateSnapshot {
    type Target = WindowManagerState;

    fn deref(&self) -> &WindowManagerState {
        &self.0
    }
}

impl fmt::Debug for StateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateSnapshot").field(&*self.0).finish()
    }
}

struct StoreInner {
    name: String,
    tuning: LayoutTuning,
    snapshot: Observable<StateSnapshot>,
    persistence: Option<LayoutPersistence>,
}

/// Cloneable handle to a named store. Clones share state.
#[derive(Clone)]
pub struct WindowStore {
    inner: Rc<StoreInner>,
}

impl fmt::Debug for WindowStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowStore")
            .field("name", &self.inner.name)
            .field("version", &self.version())
            .field("persistence", &self.inner.persistence)
            .finish_non_exhaustive()
    }
}

/// Non-owning handle to a [`WindowStore`].
#[derive(Clone)]
pub struct WeakWindowStore {
    inner: Weak<StoreInner>,
}

impl WeakWindowStore {
    /// The store, if any strong handle is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<WindowStore> {
        self.inner.upgrade().map(|inner| WindowStore { inner })
    }
}

impl fmt::Debug for WeakWindowStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakWindowStore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl WindowStore {
    /// An in-memory store with nothing persisted.
    pub fn new(name: impl Into<String>, viewport: Viewport, tuning: LayoutTuning) -> Self {
        Self::from_parts(name.into(), WindowManagerState::new(viewport), tuning, None)
    }

    /// A store rehydrated from `persistence` that writes every durable
    /// change back through it.
    pub fn with_persistence(
        name: impl Into<String>,
        persistence: LayoutPersistence,
        viewport: Viewport,
        tuning: LayoutTuning,
    ) -> Self {
        let name = name.into();
        let state = {
            let _span = debug_span!("floatpane.rehydrate", store = %name).entered();
            persistence.restore(viewport, &tuning)
        };
        Self::from_parts(name, state, tuning, Some(persistence))
    }

    fn from_parts(
        name: String,
        state: WindowManagerState,
        tuning: LayoutTuning,
        persistence: Option<LayoutPersistence>,
    ) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                name,
                tuning,
                snapshot: Observable::new(StateSnapshot::new(state)),
                persistence,
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn tuning(&self) -> &LayoutTuning {
        &self.inner.tuning
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.inner.persistence.is_some()
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakWindowStore {
        WeakWindowStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles refer to the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &WindowStore) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The current published state.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.snapshot.get()
    }

    /// Call `callback` with every newly published snapshot.
    pub fn subscribe(&self, callback: impl Fn(&StateSnapshot) + 'static) -> Subscription {
        self.inner.snapshot.subscribe(callback)
    }

    /// Number of snapshots published since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.snapshot.version()
    }

    /// Write the current layout to storage now.
    ///
    /// A store without persistence has nothing to flush.
    pub fn flush(&self) -> StorageResult<()> {
        let Some(persistence) = &self.inner.persistence else {
            return Ok(());
        };
        let layout = self.inner.snapshot.with(|s| PersistedLayout::capture(s));
        persistence.save_layout(&layout)
    }

    fn commit<R>(&self, action: &'static str, f: impl FnOnce(&mut WindowManagerState) -> R) -> R {
        let _span = debug_span!("floatpane.action", store = %self.inner.name, action).entered();
        let current = self.inner.snapshot.get();
        let mut next = current.to_state();
        let result = f(&mut next);
        if next == *current {
            return result;
        }
        let durable = !next.persisted_eq(&current);
        drop(current);
        self.inner.snapshot.set(StateSnapshot::new(next));
        if durable {
            self.write_through();
        }
        result
    }

    fn write_through(&self) {
        let Some(persistence) = &self.inner.persistence else {
            return;
        };
        let layout = self.inner.snapshot.with(|s| PersistedLayout::capture(s));
        if let Err(e) = persistence.save_layout(&layout) {
            warn!(
                store = %self.inner.name,
                key = persistence.key(),
                error = %e,
                "layout write failed"
            );
        }
    }

    // --------------------------------------------------------------------
    // Actions
    // --------------------------------------------------------------------

    pub fn register_window(
        &self,
        window: Window,
        default_container_id: Option<&str>,
        activate_on_open: bool,
    ) -> Option<ContainerId> {
        self.commit("register_window", |state| {
            state.register_window(window, default_container_id, activate_on_open)
        })
    }

    pub fn unregister_window(&self, window_id: &str, nonce: Option<Nonce>) -> bool {
        self.commit("unregister_window", |state| {
            state.unregister_window(window_id, nonce)
        })
    }

    pub fn remove_window_from_container(&self, window_id: &str) -> bool {
        self.commit("remove_window_from_container", |state| {
            state.remove_window_from_container(window_id)
        })
    }

    pub fn set_container_dimension(
        &self,
        container_id: &str,
        rect: Option<EdgeRect>,
        resize_neighbours: bool,
    ) -> bool {
        let tuning = self.inner.tuning;
        self.commit("set_container_dimension", |state| {
            state.set_container_dimension(container_id, rect, resize_neighbours, &tuning)
        })
    }

    pub fn resize_container_by_user(&self, container_id: &str, rect: EdgeRect) -> bool {
        let tuning = self.inner.tuning;
        self.commit("resize_container_by_user", |state| {
            state.resize_container_by_user(container_id, rect, &tuning)
        })
    }

    pub fn set_container_state(&self, container_id: &str, container_state: ContainerState) -> bool {
        self.commit("set_container_state", |state| {
            state.set_container_state(container_id, container_state)
        })
    }

    pub fn update_container_state(
        &self,
        container_id: &str,
        reducer: impl FnOnce(ContainerState) -> ContainerState,
    ) -> bool {
        self.commit("update_container_state", |state| {
            state.update_container_state(container_id, reducer)
        })
    }

    pub fn toggle_minimized(&self, container_id: &str) -> bool {
        self.commit("toggle_minimized", |state| state.toggle_minimized(container_id))
    }

    pub fn toggle_maximized(&self, container_id: &str) -> bool {
        self.commit("toggle_maximized", |state| state.toggle_maximized(container_id))
    }

    pub fn open_in_popup(&self, container_id: &str) -> bool {
        self.commit("open_in_popup", |state| state.open_in_popup(container_id))
    }

    pub fn close_popup(&self, container_id: &str) -> bool {
        self.commit("close_popup", |state| state.close_popup(container_id))
    }

    pub fn set_active_window_in_container(&self, container_id: &str, window_id: &str) -> bool {
        self.commit("set_active_window_in_container", |state| {
            state.set_active_window_in_container(container_id, window_id)
        })
    }

    pub fn set_active_container(&self, container_id: &str) -> bool {
        self.commit("set_active_container", |state| {
            state.set_active_container(container_id)
        })
    }

    pub fn set_window_size(&self, viewport: Viewport) -> bool {
        let tuning = self.inner.tuning;
        self.commit("set_window_size", |state| {
            state.set_window_size(viewport, &tuning)
        })
    }

    pub fn set_button_width(&self, container_id: &str, width: f64) -> bool {
        self.commit("set_button_width", |state| {
            state.set_button_width(container_id, width)
        })
    }

    pub fn set_container_is_moving(&self, container_id: &str, is_moving: bool) -> bool {
        self.commit("set_container_is_moving", |state| {
            state.set_container_is_moving(container_id, is_moving)
        })
    }

    pub fn set_container_is_locked(&self, container_id: &str, is_locked: bool) -> bool {
        self.commit("set_container_is_locked", |state| {
            state.set_container_is_locked(container_id, is_locked)
        })
    }

    pub fn set_should_resize_to_content(&self, container_id: &str, mode: ResizeToContent) -> bool {
        self.commit("set_should_resize_to_content", |state| {
            state.set_should_resize_to_content(container_id, mode)
        })
    }

    pub fn update_dragging(
        &self,
        window_id: &str,
        pointer: PointerPosition,
        proposed: EdgeRect,
        ignored: Option<&str>,
    ) -> Option<DragOutcome> {
        let tuning = self.inner.tuning;
        self.commit("update_dragging", |state| {
            state.update_dragging(window_id, pointer, proposed, ignored, &tuning)
        })
    }

    pub fn move_window(&self, window_id: &str, target: &str, index: usize) -> bool {
        self.commit("move_window", |state| state.move_window(window_id, target, index))
    }

    pub fn clear_dragging_window(&self) -> bool {
        self.commit("clear_dragging_window", |state| state.clear_dragging_window())
    }

    pub fn fit_to_content(
        &self,
        container_id: &str,
        measurement: ContentMeasurement,
        user_resizing: bool,
    ) -> FitOutcome {
        let tuning = self.inner.tuning;
        self.commit("fit_to_content", |state| {
            state.fit_to_content(container_id, measurement, user_resizing, &tuning)
        })
    }

    /// Invoke the close callback of every window tabbed in the container.
    ///
    /// The store itself removes nothing; owners react by unregistering and
    /// dropping their tab. Returns the number of callbacks invoked.
    pub fn close_container(&self, container_id: &str) -> usize {
        let handlers = self
            .inner
            .snapshot
            .with(|s| s.close_handlers(container_id));
        debug!(
            store = %self.inner.name,
            container = container_id,
            handlers = handlers.len(),
            "closing container"
        );
        for handler in &handlers {
            handler.call();
        }
        handlers.len()
    }

    // --------------------------------------------------------------------
    // Selectors
    // --------------------------------------------------------------------

    #[must_use]
    pub fn active_window_id(&self, container_id: &str) -> Option<String> {
        self.inner.snapshot.with(|s| {
            selectors::active_window_id(s, container_id).map(str::to_owned)
        })
    }

    #[must_use]
    pub fn active_window(&self, container_id: &str) -> Option<Window> {
        self.inner
            .snapshot
            .with(|s| selectors::active_window(s, container_id).cloned())
    }

    #[must_use]
    pub fn tab_strip(&self, container_id: &str) -> Vec<TabEntry> {
        self.inner
            .snapshot
            .with(|s| selectors::tab_strip(s, container_id))
    }

    #[must_use]
    pub fn is_closable(&self, container_id: &str) -> bool {
        self.inner
            .snapshot
            .with(|s| selectors::is_closable(s, container_id))
    }

    #[must_use]
    pub fn is_dragging(&self, window_id: &str) -> bool {
        self.inner
            .snapshot
            .with(|s| selectors::is_dragging(s, window_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_persistence::{MemoryStorage, StorageBackend};
    use floatpane_layout::CloseHandler;
    use std::cell::{Cell, RefCell};

    const VIEW: Viewport = Viewport::new(1000.0, 800.0);

    fn store() -> WindowStore {
        WindowStore::new("test", VIEW, LayoutTuning::default())
    }

    #[test]
    fn snapshot_equality_is_identity() {
        let a = StateSnapshot::new(WindowManagerState::new(VIEW));
        let b = StateSnapshot::new(WindowManagerState::new(VIEW));
        assert_eq!(*a, *b);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn unchanged_action_publishes_nothing() {
        let store = store();
        let before = store.snapshot();
        assert!(!store.set_active_container("missing"));
        assert_eq!(store.version(), 0);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn each_change_publishes_once() {
        let store = store();
        let seen = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&seen);
        let _sub = store.subscribe(move |_| counter.set(counter.get() + 1));

        store.register_window(Window::new("a", "A"), Some("c"), true);
        assert_eq!(seen.get(), 1);
        assert_eq!(store.version(), 1);

        store.set_active_container("c");
        assert_eq!(seen.get(), 1);

        store.toggle_minimized("c");
        assert_eq!(seen.get(), 2);
        assert_eq!(
            store.snapshot().container("c").map(|c| c.state),
            Some(ContainerState::Minimized)
        );
    }

    #[test]
    fn old_snapshots_stay_frozen() {
        let store = store();
        store.register_window(Window::new("a", "A"), Some("c"), true);
        let before = store.snapshot();
        store.register_window(Window::new("b", "B"), Some("c"), false);
        assert_eq!(before.container("c").map(|c| c.window_ids.len()), Some(1));
        assert_eq!(store.tab_strip("c").len(), 2);
    }

    #[test]
    fn durable_changes_write_through() {
        let storage = MemoryStorage::new();
        let persistence = LayoutPersistence::new(Rc::new(storage.clone()), "floatpane:main");
        let store =
            WindowStore::with_persistence("main", persistence, VIEW, LayoutTuning::default());
        assert!(store.is_persistent());
        assert!(storage.is_empty());

        store.register_window(Window::new("a", "A"), Some("c"), true);
        let stored = storage.load("floatpane:main").unwrap().unwrap();
        let layout = PersistedLayout::from_json(&stored).unwrap();
        assert_eq!(layout.containers["c"].window_ids, vec!["a".to_string()]);
    }

    #[test]
    fn transient_changes_are_not_written() {
        let storage = MemoryStorage::new();
        let persistence = LayoutPersistence::new(Rc::new(storage.clone()), "k");
        let store =
            WindowStore::with_persistence("main", persistence, VIEW, LayoutTuning::default());
        store.register_window(Window::new("a", "A"), Some("c"), false);
        storage.remove("k").unwrap();

        assert!(store.set_active_container("c"));
        assert!(store.set_container_is_moving("c", true));
        assert!(storage.is_empty());

        store.flush().unwrap();
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn close_container_allows_reentrant_unregister() {
        let store = store();
        let weak = store.downgrade();
        for id in ["a", "b"] {
            let weak = weak.clone();
            let handler = CloseHandler::new(move || {
                if let Some(store) = weak.upgrade() {
                    store.unregister_window(id, None);
                    store.remove_window_from_container(id);
                }
            });
            store.register_window(
                Window::new(id, id.to_uppercase()).with_close_handler(handler),
                Some("c"),
                true,
            );
        }
        assert!(store.is_closable("c"));

        assert_eq!(store.close_container("c"), 2);
        let snapshot = store.snapshot();
        assert!(snapshot.container("c").is_none());
        assert!(snapshot.windows().is_empty());
        assert!(snapshot.check_invariants().is_empty());
    }

    #[test]
    fn close_container_missing_is_noop() {
        let store = store();
        assert_eq!(store.close_container("nope"), 0);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn subscriber_may_commit() {
        let store = store();
        let handle = store.downgrade();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = store.subscribe(move |snapshot| {
            sink.borrow_mut().push(snapshot.active_container_id().map(str::to_owned));
            if snapshot.active_container_id().is_none() {
                if let Some(store) = handle.upgrade() {
                    store.set_active_container("c");
                }
            }
        });

        store.register_window(Window::new("a", "A"), Some("c"), false);
        assert_eq!(store.snapshot().active_container_id(), Some("c"));
        assert_eq!(*log.borrow(), vec![None, Some("c".to_string())]);
    }

    #[test]
    fn drag_marks_and_clears() {
        let store = store();
        store.register_window(Window::new("a", "A"), Some("c"), true);
        store.update_dragging(
            "a",
            PointerPosition::new(500.0, 400.0),
            EdgeRect::new(100.0, 100.0, 100.0, 100.0),
            None,
        );
        assert!(store.is_dragging("a"));
        assert!(store.clear_dragging_window());
        assert!(!store.is_dragging("a"));
    }

    #[test]
    fn weak_handle_does_not_keep_store_alive() {
        let store = store();
        let weak = store.downgrade();
        assert!(weak.upgrade().is_some_and(|s| s.ptr_eq(&store)));
        drop(store);
        assert!(weak.upgrade().is_none());
    }
}
