//! Persisted layout schema, migration scaffolding and rehydrate repair.
//!
//! Only the geometry-bearing subset of [`WindowManagerState`] survives a
//! reload: containers, the window → container mapping and the viewport the
//! rectangles were measured in. Windows themselves are re-registered by
//! their owners on every page load.
//!
//! Stored layouts come from older builds, other tabs racing on the same
//! key, or hand edits, so [`rehydrate`] never rejects structure. It repairs
//! every invariant violation it finds and reports what it did as a list of
//! [`RepairAction`]s.
//!
//! # Example
//!
//! ```
//! use floatpane_core::geometry::Viewport;
//! use floatpane_layout::persist::{PersistedLayout, rehydrate};
//! use floatpane_layout::{LayoutTuning, Window, WindowManagerState};
//!
//! let mut state = WindowManagerState::new(Viewport::new(1000.0, 800.0));
//! state.register_window(Window::new("log", "Log"), Some("main"), true);
//!
//! let json = PersistedLayout::capture(&state).to_json().unwrap();
//! let restored = rehydrate(
//!     PersistedLayout::from_json(&json).unwrap(),
//!     Viewport::new(1000.0, 800.0),
//!     &LayoutTuning::default(),
//! );
//! assert!(restored.actions.is_empty());
//! assert_eq!(restored.state.container_of("log").map(String::as_str), Some("main"));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use floatpane_core::geometry::{EdgeRect, Viewport};
use im::OrdMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{Container, ContainerId, WindowId, WindowManagerState};
use crate::tuning::LayoutTuning;

/// Current persisted layout schema version.
pub const PERSISTED_LAYOUT_SCHEMA_VERSION: u16 = 1;

// =========================================================================
// Schema
// =========================================================================

/// The durable subset of a [`WindowManagerState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLayout {
    #[serde(default = "default_layout_version")]
    pub schema_version: u16,
    #[serde(default)]
    pub containers: BTreeMap<ContainerId, Container>,
    #[serde(default)]
    pub window_container_mapping: BTreeMap<WindowId, ContainerId>,
    /// Viewport the rectangles were measured in.
    #[serde(default)]
    pub window_size: Viewport,
}

fn default_layout_version() -> u16 {
    PERSISTED_LAYOUT_SCHEMA_VERSION
}

impl Default for PersistedLayout {
    fn default() -> Self {
        Self {
            schema_version: PERSISTED_LAYOUT_SCHEMA_VERSION,
            containers: BTreeMap::new(),
            window_container_mapping: BTreeMap::new(),
            window_size: Viewport::ZERO,
        }
    }
}

impl PersistedLayout {
    /// Copy the durable subset out of a live state.
    #[must_use]
    pub fn capture(state: &WindowManagerState) -> Self {
        let containers = state
            .containers
            .iter()
            .map(|(id, container)| {
                let mut container = container.clone();
                container.is_moving = false;
                (id.clone(), container)
            })
            .collect();
        let window_container_mapping = state
            .window_container_mapping
            .iter()
            .map(|(window, container)| (window.clone(), container.clone()))
            .collect();
        Self {
            schema_version: PERSISTED_LAYOUT_SCHEMA_VERSION,
            containers,
            window_container_mapping,
            window_size: state.window_size,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check the schema version and the stored viewport.
    ///
    /// Structural problems are not errors here; [`rehydrate`] repairs them.
    pub fn validate(&self) -> Result<(), PersistedLayoutError> {
        if self.schema_version != PERSISTED_LAYOUT_SCHEMA_VERSION {
            return Err(PersistedLayoutError::UnsupportedVersion {
                found: self.schema_version,
                expected: PERSISTED_LAYOUT_SCHEMA_VERSION,
            });
        }
        let Viewport { width, height } = self.window_size;
        if !width.is_finite() || !height.is_finite() || width < 0.0 || height < 0.0 {
            return Err(PersistedLayoutError::InvalidViewport { width, height });
        }
        Ok(())
    }
}

/// Why a stored layout cannot be used as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistedLayoutError {
    UnsupportedVersion { found: u16, expected: u16 },
    InvalidViewport { width: f64, height: f64 },
}

impl fmt::Display for PersistedLayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, expected } => {
                write!(f, "unsupported layout schema version {found} (expected {expected})")
            }
            Self::InvalidViewport { width, height } => {
                write!(f, "stored viewport {width}x{height} is not a valid size")
            }
        }
    }
}

impl std::error::Error for PersistedLayoutError {}

// =========================================================================
// Migration scaffolding
// =========================================================================

/// Result of migrating a layout to the current schema.
#[derive(Debug, Clone)]
pub struct LayoutMigration {
    pub layout: PersistedLayout,
    pub from_version: u16,
    pub to_version: u16,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutMigrationError {
    /// Written by a newer build.
    UnsupportedVersion { version: u16 },
    NoMigrationPath { from: u16, to: u16 },
}

impl fmt::Display for LayoutMigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { version } => {
                write!(f, "unsupported layout schema version {version} for migration")
            }
            Self::NoMigrationPath { from, to } => {
                write!(f, "no layout migration path from v{from} to v{to}")
            }
        }
    }
}

impl std::error::Error for LayoutMigrationError {}

/// Bring a layout up to [`PERSISTED_LAYOUT_SCHEMA_VERSION`].
///
/// v1 is the only version so far, so this is the identity for current
/// layouts and an error for everything else.
pub fn migrate_persisted_layout(
    layout: PersistedLayout,
) -> Result<LayoutMigration, LayoutMigrationError> {
    match layout.schema_version {
        PERSISTED_LAYOUT_SCHEMA_VERSION => Ok(LayoutMigration {
            from_version: PERSISTED_LAYOUT_SCHEMA_VERSION,
            to_version: PERSISTED_LAYOUT_SCHEMA_VERSION,
            warnings: Vec::new(),
            layout,
        }),
        v if v > PERSISTED_LAYOUT_SCHEMA_VERSION => {
            Err(LayoutMigrationError::UnsupportedVersion { version: v })
        }
        v => Err(LayoutMigrationError::NoMigrationPath {
            from: v,
            to: PERSISTED_LAYOUT_SCHEMA_VERSION,
        }),
    }
}

#[must_use]
pub fn needs_migration(layout: &PersistedLayout) -> bool {
    layout.schema_version != PERSISTED_LAYOUT_SCHEMA_VERSION
}

// =========================================================================
// Rehydrate
// =========================================================================

/// One repair made while rehydrating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RepairAction {
    /// The rectangle was re-homed to the live viewport or clamped.
    ReflowRect {
        container: ContainerId,
        from: EdgeRect,
        to: EdgeRect,
    },
    /// A container's `id` disagreed with its map key; the key wins.
    FixContainerId {
        container: ContainerId,
        found: ContainerId,
    },
    /// Repeated ids inside one tab list were dropped.
    DedupeTabs {
        container: ContainerId,
        removed: usize,
    },
    /// The window was also listed here but belongs to another container.
    RemoveDuplicateTab {
        window: WindowId,
        container: ContainerId,
    },
    /// A mapped window was missing from its container's tab list.
    AppendMissingTab {
        window: WindowId,
        container: ContainerId,
    },
    /// A listed window had no mapping.
    MapOrphanTab {
        window: WindowId,
        container: ContainerId,
    },
    /// Mapping into a container that does not exist.
    DropDanglingMapping {
        window: WindowId,
        container: ContainerId,
    },
    /// Mapping pointed at a container that does not list the window.
    RehomeMapping {
        window: WindowId,
        from: ContainerId,
        to: ContainerId,
    },
    RemoveEmptyContainer {
        container: ContainerId,
    },
    ClearStaleActiveWindow {
        container: ContainerId,
        window: WindowId,
    },
}

/// A repaired state and the repairs that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RehydrateOutcome {
    pub state: WindowManagerState,
    pub actions: Vec<RepairAction>,
}

/// Rebuild a state from a stored layout.
///
/// Rectangles are re-homed from the stored viewport to `live` and clamped;
/// tab lists and the mapping are made consistent (a mapping that points
/// at a container listing the window wins, otherwise the first listing
/// container in id order does); emptied containers are removed. The
/// result always passes [`WindowManagerState::check_invariants`]. No
/// window is registered and nothing is focused.
///
/// While `live` is unmeasured the stored viewport is kept as the state's
/// window size, so the first [`WindowManagerState::set_window_size`]
/// reflows from the coordinates the rectangles were saved in.
#[must_use]
pub fn rehydrate(layout: PersistedLayout, live: Viewport, tuning: &LayoutTuning) -> RehydrateOutcome {
    let PersistedLayout {
        containers,
        window_container_mapping: mut mapping,
        window_size: stored,
        ..
    } = layout;
    let mut actions = Vec::new();

    let mut containers: BTreeMap<ContainerId, Container> = containers
        .into_iter()
        .map(|(key, mut container)| {
            if container.id != key {
                actions.push(RepairAction::FixContainerId {
                    container: key.clone(),
                    found: std::mem::replace(&mut container.id, key.clone()),
                });
            }
            container.is_moving = false;
            if let Some(rect) = container.rect {
                let next = rehome(rect, stored, live, tuning);
                if next != rect {
                    actions.push(RepairAction::ReflowRect {
                        container: key.clone(),
                        from: rect,
                        to: next,
                    });
                    container.rect = Some(next);
                }
            }
            let removed = dedupe(&mut container.window_ids);
            if removed > 0 {
                actions.push(RepairAction::DedupeTabs {
                    container: key.clone(),
                    removed,
                });
            }
            (key, container)
        })
        .collect();

    // Every listing container per window, in id order.
    let mut listings: BTreeMap<WindowId, Vec<ContainerId>> = BTreeMap::new();
    for (id, container) in &containers {
        for window in &container.window_ids {
            listings.entry(window.clone()).or_default().push(id.clone());
        }
    }

    for (window, listed_in) in &listings {
        let mapped = mapping.get(window).cloned();
        let owner = match &mapped {
            Some(mapped) if listed_in.contains(mapped) => mapped.clone(),
            _ => listed_in[0].clone(),
        };
        for other in listed_in.iter().filter(|id| **id != owner) {
            if let Some(container) = containers.get_mut(other) {
                container.window_ids.retain(|id| id != window);
            }
            actions.push(RepairAction::RemoveDuplicateTab {
                window: window.clone(),
                container: other.clone(),
            });
        }
        match mapped {
            None => actions.push(RepairAction::MapOrphanTab {
                window: window.clone(),
                container: owner.clone(),
            }),
            Some(from) if from != owner => actions.push(RepairAction::RehomeMapping {
                window: window.clone(),
                from,
                to: owner.clone(),
            }),
            Some(_) => {}
        }
        mapping.insert(window.clone(), owner);
    }

    // Mappings of windows no container lists.
    let unlisted: Vec<(WindowId, ContainerId)> = mapping
        .iter()
        .filter(|(window, _)| !listings.contains_key(*window))
        .map(|(window, container)| (window.clone(), container.clone()))
        .collect();
    for (window, container_id) in unlisted {
        match containers.get_mut(&container_id) {
            Some(container) => {
                container.window_ids.push(window.clone());
                actions.push(RepairAction::AppendMissingTab {
                    window,
                    container: container_id,
                });
            }
            None => {
                mapping.remove(&window);
                actions.push(RepairAction::DropDanglingMapping {
                    window,
                    container: container_id,
                });
            }
        }
    }

    containers.retain(|id, container| {
        if container.window_ids.is_empty() {
            actions.push(RepairAction::RemoveEmptyContainer {
                container: id.clone(),
            });
            return false;
        }
        true
    });

    for (id, container) in containers.iter_mut() {
        let stale = container
            .active_window_id
            .as_ref()
            .filter(|active| !container.window_ids.contains(active))
            .cloned();
        if let Some(window) = stale {
            container.active_window_id = None;
            actions.push(RepairAction::ClearStaleActiveWindow {
                container: id.clone(),
                window,
            });
        }
    }

    if !actions.is_empty() {
        info!(repairs = actions.len(), "rehydrated layout repaired");
    }

    let state = WindowManagerState {
        windows: OrdMap::new(),
        containers: containers.into_iter().collect(),
        window_container_mapping: mapping.into_iter().collect(),
        active_container_id: None,
        dragging_window_id: None,
        window_size: if live.is_zero() { stored } else { live },
    };
    RehydrateOutcome { state, actions }
}

/// An unmeasured `live` viewport leaves the rectangle in the stored
/// coordinates; the first real measurement reflows it from there.
fn rehome(rect: EdgeRect, stored: Viewport, live: Viewport, tuning: &LayoutTuning) -> EdgeRect {
    if live.is_zero() {
        return rect.non_negative();
    }
    rect.reflowed(stored, live).clamped(live, tuning.min_size)
}

/// Keep the first occurrence of every id; returns how many were dropped.
fn dedupe(ids: &mut Vec<WindowId>) -> usize {
    let before = ids.len();
    let mut seen = FxHashSet::default();
    ids.retain(|id| seen.insert(id.clone()));
    before - ids.len()
}

impl WindowManagerState {
    /// True if both states persist to the same layout.
    ///
    /// Registered windows, focus, the drag marker and the transient moving
    /// flag are ignored.
    #[must_use]
    pub fn persisted_eq(&self, other: &WindowManagerState) -> bool {
        self.window_size == other.window_size
            && self.window_container_mapping == other.window_container_mapping
            && self.containers.len() == other.containers.len()
            && self
                .containers
                .iter()
                .zip(other.containers.iter())
                .all(|((a_id, a), (b_id, b))| a_id == b_id && same_durable_fields(a, b))
    }
}

fn same_durable_fields(a: &Container, b: &Container) -> bool {
    a.id == b.id
        && a.window_ids == b.window_ids
        && a.active_window_id == b.active_window_id
        && a.state == b.state
        && a.rect == b.rect
        && a.is_locked == b.is_locked
        && a.button_width == b.button_width
        && a.resize_to_content == b.resize_to_content
}
