#![forbid(unsafe_code)]

//! Named store registry.
//!
//! Hosts run several independent window managers on one page (a main
//! workspace, a settings dialog, ...). Each gets its own [`WindowStore`]
//! under a name; the registry creates a store on first access, rehydrating
//! it from `<key_prefix>:<name>` when persistence is on.

use std::collections::BTreeMap;
use std::rc::Rc;

use floatpane_core::geometry::Viewport;
use floatpane_layout::LayoutTuning;
use tracing::{debug, info};

use crate::config::{PersistenceConfig, WindowManagerConfig};
use crate::state_persistence::{LayoutPersistence, MemoryStorage, StorageBackend};
use crate::window_store::WindowStore;

/// Registry summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub stores: usize,
    pub persistent: usize,
}

/// Name → store map with lazy creation.
pub struct StoreRegistry {
    tuning: LayoutTuning,
    persistence: PersistenceConfig,
    backend: Option<Rc<dyn StorageBackend>>,
    stores: BTreeMap<String, WindowStore>,
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_owned()))
            .field("key_prefix", &self.persistence.key_prefix)
            .field("stores", &self.stores.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::in_memory(LayoutTuning::default())
    }
}

impl StoreRegistry {
    /// Registry whose stores persist nothing.
    #[must_use]
    pub fn in_memory(tuning: LayoutTuning) -> Self {
        Self {
            tuning,
            persistence: PersistenceConfig {
                enabled: false,
                ..PersistenceConfig::default()
            },
            backend: None,
            stores: BTreeMap::new(),
        }
    }

    /// Registry persisting through an explicit backend.
    pub fn with_backend(config: &WindowManagerConfig, backend: Rc<dyn StorageBackend>) -> Self {
        Self {
            tuning: config.layout,
            persistence: config.persistence.clone(),
            backend: Some(backend),
            stores: BTreeMap::new(),
        }
    }

    /// Registry with the backend the config asks for: files in
    /// `persistence.directory` if set, otherwise process memory.
    pub fn from_config(config: &WindowManagerConfig) -> Self {
        if !config.persistence.enabled {
            return Self {
                persistence: config.persistence.clone(),
                ..Self::in_memory(config.layout)
            };
        }
        let backend: Rc<dyn StorageBackend> = match &config.persistence.directory {
            #[cfg(feature = "file-storage")]
            Some(dir) => Rc::new(crate::state_persistence::FileStorage::new(dir)),
            _ => Rc::new(MemoryStorage::new()),
        };
        info!(
            backend = backend.name(),
            key_prefix = %config.persistence.key_prefix,
            "store registry created"
        );
        Self::with_backend(config, backend)
    }

    #[must_use]
    pub fn tuning(&self) -> &LayoutTuning {
        &self.tuning
    }

    /// The store named `name`, if it was created.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<WindowStore> {
        self.stores.get(name).cloned()
    }

    /// The store named `name`, created (and rehydrated) on first access.
    ///
    /// `viewport` is only used when the store is created.
    pub fn get_or_create(&mut self, name: &str, viewport: Viewport) -> WindowStore {
        if let Some(store) = self.stores.get(name) {
            return store.clone();
        }
        let store = match (&self.backend, self.persistence.enabled) {
            (Some(backend), true) => {
                let persistence =
                    LayoutPersistence::new(Rc::clone(backend), self.persistence.key_for(name));
                WindowStore::with_persistence(name, persistence, viewport, self.tuning)
            }
            _ => WindowStore::new(name, viewport, self.tuning),
        };
        debug!(store = name, persistent = store.is_persistent(), "store created");
        self.stores.insert(name.to_owned(), store.clone());
        store
    }

    /// Forget a store. Its stored layout is kept.
    pub fn remove(&mut self, name: &str) -> Option<WindowStore> {
        self.stores.remove(name)
    }

    /// Names of the created stores, in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            stores: self.stores.len(),
            persistent: self.stores.values().filter(|s| s.is_persistent()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floatpane_layout::Window;

    const VIEW: Viewport = Viewport::new(1000.0, 800.0);

    #[test]
    fn stores_are_created_lazily_and_reused() {
        let mut registry = StoreRegistry::default();
        assert!(registry.get("main").is_none());
        let a = registry.get_or_create("main", VIEW);
        let b = registry.get_or_create("main", Viewport::new(10.0, 10.0));
        assert!(a.ptr_eq(&b));
        assert_eq!(b.snapshot().window_size(), VIEW);
        assert!(registry.get("main").is_some_and(|s| s.ptr_eq(&a)));
    }

    #[test]
    fn names_do_not_share_state() {
        let mut registry = StoreRegistry::default();
        let main = registry.get_or_create("main", VIEW);
        let dialog = registry.get_or_create("dialog", VIEW);
        main.register_window(Window::new("a", "A"), Some("c"), true);
        assert!(dialog.snapshot().containers().is_empty());
        assert_eq!(registry.names(), vec!["dialog".to_string(), "main".to_string()]);
    }

    #[test]
    fn remove_forgets_store() {
        let mut registry = StoreRegistry::default();
        registry.get_or_create("main", VIEW);
        assert!(registry.remove("main").is_some());
        assert!(registry.remove("main").is_none());
        assert!(registry.names().is_empty());
    }

    #[test]
    fn shared_backend_rehydrates_new_registry() {
        let storage = MemoryStorage::new();
        let config = WindowManagerConfig::default();

        let mut first = StoreRegistry::with_backend(&config, Rc::new(storage.clone()));
        first
            .get_or_create("main", VIEW)
            .register_window(Window::new("a", "A"), Some("c"), true);
        assert_eq!(storage.keys(), vec!["floatpane:main".to_string()]);

        let mut second = StoreRegistry::with_backend(&config, Rc::new(storage.clone()));
        let restored = second.get_or_create("main", VIEW);
        assert_eq!(
            restored.snapshot().container_of("a").map(String::as_str),
            Some("c")
        );
        assert!(restored.snapshot().windows().is_empty());
        assert_eq!(
            second.stats(),
            RegistryStats {
                stores: 1,
                persistent: 1
            }
        );
    }

    #[test]
    fn disabled_persistence_ignores_backend() {
        let storage = MemoryStorage::new();
        let mut config = WindowManagerConfig::default();
        config.persistence.enabled = false;
        let mut registry = StoreRegistry::with_backend(&config, Rc::new(storage.clone()));
        let store = registry.get_or_create("main", VIEW);
        store.register_window(Window::new("a", "A"), None, true);
        assert!(!store.is_persistent());
        assert!(storage.is_empty());
    }

    #[test]
    fn from_config_without_directory_uses_memory() {
        let mut registry = StoreRegistry::from_config(&WindowManagerConfig::default());
        let store = registry.get_or_create("main", VIEW);
        assert!(store.is_persistent());
        assert_eq!(registry.stats().persistent, 1);
    }
}
