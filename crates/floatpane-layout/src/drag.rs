//! Tab dragging: re-docking into another container's tab strip, moving a
//! lone tab's container, or tearing a tab out into a container of its own.
//!
//! Pointer-driven and called at frame rate by the host, so the hit test is
//! a single linear scan without allocation.

use floatpane_core::geometry::{EdgeRect, PointerPosition, Viewport};
use tracing::{debug, warn};

use crate::model::{Container, ContainerId, ContainerState, WindowManagerState};
use crate::tuning::LayoutTuning;

/// A container tab strip under the pointer and the slot the tab would land
/// in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedockTarget {
    pub container_id: ContainerId,
    pub index: usize,
}

/// What a drag step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// The tab joined (or was reordered within) `container_id`'s strip.
    ///
    /// Geometry was not touched. The host restarts its tab drag against the
    /// new container without an ignored container.
    Redocked {
        container_id: ContainerId,
        index: usize,
    },
    /// The window was the only tab; its container followed the pointer.
    Moved { container_id: ContainerId },
    /// The tab was torn out of `from` into the new `container_id`.
    Detached {
        container_id: ContainerId,
        from: ContainerId,
    },
}

impl DragOutcome {
    /// Container that owns the dragged window after this step.
    #[must_use]
    pub fn container_id(&self) -> &str {
        match self {
            Self::Redocked { container_id, .. }
            | Self::Moved { container_id }
            | Self::Detached { container_id, .. } => container_id,
        }
    }
}

/// Tab slot under `pointer` in `container`'s strip.
///
/// Tabs share the strip width evenly after the button cluster, the grab
/// handle and the padding on both sides. The pointer offset is measured
/// from the container's left edge plus the padding. The result is clamped to
/// `0..=tab_count`; a strip with no room left always appends.
#[must_use]
pub fn drop_index(
    container: &Container,
    pointer: PointerPosition,
    viewport: Viewport,
    tuning: &LayoutTuning,
) -> usize {
    let tabs = container.window_ids.len();
    let Some(rect) = container.rect else {
        return tabs;
    };
    if tabs == 0 {
        return 0;
    }
    let available = viewport.width
        - rect.left
        - rect.right
        - container.button_width
        - tuning.tab_handle_width
        - 2.0 * tuning.title_padding;
    if available <= 0.0 {
        return tabs;
    }
    let tab_width = available / tabs as f64;
    let offset = pointer.x - rect.left + tuning.title_padding;
    let slot = (offset / tab_width).floor();
    if slot <= 0.0 {
        0
    } else {
        (slot as usize).min(tabs)
    }
}

/// First container whose title band is under `pointer`.
///
/// Containers are scanned in id order. Skipped: `ignored`, containers
/// without tabs or geometry, popped-out containers, containers whose tabs
/// are all unregistered, and the window's own container when it is the
/// only tab there (dropping onto yourself is a plain move).
#[must_use]
pub fn find_redock_target(
    state: &WindowManagerState,
    window_id: &str,
    pointer: PointerPosition,
    ignored: Option<&str>,
    tuning: &LayoutTuning,
) -> Option<RedockTarget> {
    let viewport = state.window_size;
    state.containers.iter().find_map(|(id, container)| {
        if ignored == Some(id.as_str()) {
            return None;
        }
        if container.window_ids.is_empty() || container.state == ContainerState::Popup {
            return None;
        }
        if container.is_sole_tab(window_id) {
            return None;
        }
        let rect = container.rect?;
        if !rect.title_band_contains(pointer, viewport, tuning.title_height) {
            return None;
        }
        let live = container
            .window_ids
            .iter()
            .any(|tab| state.windows.contains_key(tab));
        if !live {
            return None;
        }
        Some(RedockTarget {
            container_id: id.clone(),
            index: drop_index(container, pointer, viewport, tuning),
        })
    })
}

impl WindowManagerState {
    /// Place `window_id` at tab `index` of `target`.
    ///
    /// Within the same container this is a reorder; dropping a tab onto its
    /// own slot changes nothing. Otherwise the tab leaves its container
    /// (deleting it if emptied) and is spliced in at `index` (clamped to
    /// the strip length). The moved tab becomes active and `target` gains
    /// focus.
    pub fn move_window(&mut self, window_id: &str, target: &str, index: usize) -> bool {
        let Some(target_container) = self.containers.get(target) else {
            debug!(window = window_id, target, "move into unknown container");
            return false;
        };

        let same_container = self.window_container_mapping.get(window_id).map(String::as_str)
            == Some(target);
        if same_container {
            let Some(position) = target_container.position_of(window_id) else {
                return false;
            };
            let last = target_container.window_ids.len() - 1;
            if position == index.min(last) {
                return false;
            }
        } else {
            self.detach_window(window_id);
        }

        let Some(container) = self.containers.get_mut(target) else {
            return false;
        };
        if let Some(position) = container.position_of(window_id) {
            container.window_ids.remove(position);
        }
        let slot = index.min(container.window_ids.len());
        container.window_ids.insert(slot, window_id.to_owned());
        container.active_window_id = Some(window_id.to_owned());

        self.window_container_mapping
            .insert(window_id.to_owned(), target.to_owned());
        self.active_container_id = Some(target.to_owned());
        true
    }

    /// One pointer-move step of a tab drag.
    ///
    /// `proposed` is the rectangle the host computed for the dragged
    /// container at the current pointer position. Returns `None` if the
    /// window has no container (a race with teardown). Tabs of containers
    /// that are not free-floating stay put and their geometry is untouched.
    pub fn update_dragging(
        &mut self,
        window_id: &str,
        pointer: PointerPosition,
        proposed: EdgeRect,
        ignored: Option<&str>,
        tuning: &LayoutTuning,
    ) -> Option<DragOutcome> {
        self.dragging_window_id = Some(window_id.to_owned());

        let Some(current) = self.window_container_mapping.get(window_id).cloned() else {
            debug!(window = window_id, "drag of unmapped window");
            return None;
        };
        let free = self
            .containers
            .get(&current)
            .is_some_and(|container| container.state.is_free_floating());
        if !free {
            debug!(window = window_id, container = %current, "drag of pinned container ignored");
            return Some(DragOutcome::Moved {
                container_id: current,
            });
        }

        if let Some(target) = find_redock_target(self, window_id, pointer, ignored, tuning) {
            self.move_window(window_id, &target.container_id, target.index);
            return Some(DragOutcome::Redocked {
                container_id: target.container_id,
                index: target.index,
            });
        }

        let container = self.containers.get(&current)?;
        if container.window_ids.len() <= 1 {
            if !container.is_locked {
                let rect = self.clamp_rect(proposed, tuning);
                self.update_container(&current, |container| {
                    container.rect = Some(rect);
                    container.is_moving = true;
                });
            }
            self.set_active_container(&current);
            return Some(DragOutcome::Moved {
                container_id: current,
            });
        }

        let Some(fresh) = self.fresh_container_id() else {
            warn!(window = window_id, "no unused container id; tab stays docked");
            return None;
        };
        let rect = match container.rect {
            Some(old) => old.translated(proposed.left - old.left, proposed.top - old.top),
            None => proposed,
        };
        let rect = self.clamp_rect(rect, tuning);
        let button_width = container.button_width;

        self.detach_window(window_id);
        let mut detached = Container::new(fresh.clone());
        detached.window_ids.push(window_id.to_owned());
        detached.active_window_id = Some(window_id.to_owned());
        detached.rect = Some(rect);
        detached.button_width = button_width;
        detached.is_moving = true;
        self.containers.insert(fresh.clone(), detached);
        self.window_container_mapping
            .insert(window_id.to_owned(), fresh.clone());
        self.active_container_id = Some(fresh.clone());

        Some(DragOutcome::Detached {
            container_id: fresh,
            from: current,
        })
    }
}
