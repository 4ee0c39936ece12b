#![forbid(unsafe_code)]

//! floatpane runtime
//!
//! Wraps the pure state engine from `floatpane-layout` in observable,
//! persistent, named stores.
//!
//! # Key Components
//!
//! - [`WindowStore`] - One store: publishes [`StateSnapshot`]s and writes
//!   the durable layout through a [`StorageBackend`]
//! - [`StoreRegistry`] - Named stores created on first access
//! - [`Observable`] - Version-tracked value with change notification
//! - [`WindowManagerConfig`] - Layout thresholds and persistence settings,
//!   loadable from TOML or JSON
//!
//! # Threading
//!
//! Everything here is single-threaded (`Rc`, `RefCell`); a store lives on
//! the thread that drives the UI.

pub mod config;
pub mod observable;
pub mod registry;
pub mod state_persistence;
pub mod window_store;

pub use config::{ConfigError, PersistenceConfig, WindowManagerConfig};
pub use observable::{Observable, Subscription};
pub use registry::{RegistryStats, StoreRegistry};
#[cfg(feature = "file-storage")]
pub use state_persistence::FileStorage;
pub use state_persistence::{
    LayoutPersistence, MemoryStorage, StorageBackend, StorageError, StorageResult,
};
pub use window_store::{StateSnapshot, WeakWindowStore, WindowStore};
