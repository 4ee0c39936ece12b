#![forbid(unsafe_code)]

//! Window/container state engine.
//!
//! [`WindowManagerState`] holds every registered window, the containers
//! that host them as tabs and the mapping between the two. All mutation
//! goes through methods grouped by concern:
//!
//! - [`store`]: registration, focus, display state, geometry setters.
//! - [`drag`]: tab dragging, re-docking and tearing tabs out.
//! - [`neighbors`]: resize propagation to adjacent containers.
//! - [`auto_fit`]: resize-to-content.
//! - [`persist`]: the stored layout schema and rehydrate repair.
//!
//! The crate does no I/O and has no clocks. Observability, storage and
//! named stores live in `floatpane-runtime`.

pub mod auto_fit;
pub mod drag;
pub mod model;
pub mod neighbors;
pub mod persist;
pub mod selectors;
pub mod store;
pub mod tuning;

pub use auto_fit::{ContentMeasurement, FitOutcome, FitSkipReason};
pub use drag::{DragOutcome, RedockTarget, drop_index, find_redock_target};
pub use model::{
    CloseHandler, Container, ContainerId, ContainerState, InvariantViolation, Nonce,
    ResizeToContent, Window, WindowContent, WindowId, WindowManagerState,
};
pub use neighbors::{EdgeDelta, find_neighbors};
pub use persist::{
    PERSISTED_LAYOUT_SCHEMA_VERSION, PersistedLayout, PersistedLayoutError, RehydrateOutcome,
    RepairAction, rehydrate,
};
pub use selectors::TabEntry;
pub use tuning::LayoutTuning;
