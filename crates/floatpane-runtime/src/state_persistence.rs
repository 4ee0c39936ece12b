//! Storage backends and the layout persistence adapter.
//!
//! A [`StorageBackend`] is a string key/value store: browser local storage
//! on the web host, [`FileStorage`] natively, [`MemoryStorage`] in tests.
//! [`LayoutPersistence`] binds one store key to a backend and speaks
//! [`PersistedLayout`] JSON over it.
//!
//! # Failure policy
//!
//! Reads that fail for any reason (I/O, corrupt JSON, a schema written by
//! a newer build) degrade to an empty layout with a `warn!`; a broken
//! store never prevents the window manager from starting.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::rc::Rc;

use floatpane_core::geometry::Viewport;
use floatpane_layout::persist::{
    LayoutMigrationError, PersistedLayout, PersistedLayoutError, migrate_persisted_layout,
    needs_migration, rehydrate,
};
use floatpane_layout::{LayoutTuning, WindowManagerState};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from storage backends and layout decoding.
#[derive(Debug)]
pub enum StorageError {
    Io(io::Error),
    Serialization(serde_json::Error),
    /// Stored value exists but cannot be used.
    Corrupt { key: String, detail: String },
    /// Stored layout was written with another schema version.
    SchemaMismatch { found: u16, expected: u16 },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Serialization(e) => write!(f, "serialization error: {e}"),
            Self::Corrupt { key, detail } => write!(f, "corrupt entry {key}: {detail}"),
            Self::SchemaMismatch { found, expected } => {
                write!(f, "schema version {found} does not match expected {expected}")
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::Corrupt { .. } | Self::SchemaMismatch { .. } => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// String key/value storage.
pub trait StorageBackend {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Stored value, or `None` if the key was never written.
    fn load(&self, key: &str) -> StorageResult<Option<String>>;

    fn store(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// In-memory backend. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temp file that is renamed over the target, so a crash
/// mid-write leaves the previous value intact. The directory is created on
/// first write.
#[cfg(feature = "file-storage")]
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: std::path::PathBuf,
}

#[cfg(feature = "file-storage")]
impl FileStorage {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> std::path::PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

#[cfg(feature = "file-storage")]
impl StorageBackend for FileStorage {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, key: &str, value: &str) -> StorageResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let temp = path.with_extension("json.tmp");
        std::fs::write(&temp, value)?;
        std::fs::rename(&temp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Layout adapter
// ---------------------------------------------------------------------------

/// Reads and writes one store's layout under a fixed key.
#[derive(Clone)]
pub struct LayoutPersistence {
    backend: Rc<dyn StorageBackend>,
    key: String,
}

impl fmt::Debug for LayoutPersistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutPersistence")
            .field("backend", &self.backend.name())
            .field("key", &self.key)
            .finish()
    }
}

impl LayoutPersistence {
    pub fn new(backend: Rc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Decode the stored layout, migrating older schemas.
    pub fn load_layout(&self) -> StorageResult<Option<PersistedLayout>> {
        let Some(json) = self.backend.load(&self.key)? else {
            return Ok(None);
        };
        let layout = PersistedLayout::from_json(&json).map_err(|e| StorageError::Corrupt {
            key: self.key.clone(),
            detail: e.to_string(),
        })?;

        let layout = if needs_migration(&layout) {
            let migrated = migrate_persisted_layout(layout).map_err(|e| match e {
                LayoutMigrationError::UnsupportedVersion { version }
                | LayoutMigrationError::NoMigrationPath { from: version, .. } => {
                    StorageError::SchemaMismatch {
                        found: version,
                        expected: floatpane_layout::PERSISTED_LAYOUT_SCHEMA_VERSION,
                    }
                }
            })?;
            for warning in &migrated.warnings {
                warn!(key = %self.key, warning = %warning, "layout migration");
            }
            migrated.layout
        } else {
            layout
        };

        layout.validate().map_err(|e| match e {
            PersistedLayoutError::UnsupportedVersion { found, expected } => {
                StorageError::SchemaMismatch { found, expected }
            }
            other => StorageError::Corrupt {
                key: self.key.clone(),
                detail: other.to_string(),
            },
        })?;
        Ok(Some(layout))
    }

    pub fn save_layout(&self, layout: &PersistedLayout) -> StorageResult<()> {
        let json = layout.to_json()?;
        self.backend.store(&self.key, &json)
    }

    pub fn clear(&self) -> StorageResult<()> {
        self.backend.remove(&self.key)
    }

    /// Initial state for a store: the repaired stored layout, or an empty
    /// state if nothing usable is stored.
    pub fn restore(&self, live: Viewport, tuning: &LayoutTuning) -> WindowManagerState {
        match self.load_layout() {
            Ok(Some(layout)) => {
                let outcome = rehydrate(layout, live, tuning);
                for action in &outcome.actions {
                    debug!(key = %self.key, ?action, "layout repair");
                }
                info!(
                    key = %self.key,
                    backend = self.backend.name(),
                    containers = outcome.state.containers().len(),
                    repairs = outcome.actions.len(),
                    "layout restored"
                );
                outcome.state
            }
            Ok(None) => WindowManagerState::new(live),
            Err(e) => {
                warn!(
                    key = %self.key,
                    backend = self.backend.name(),
                    error = %e,
                    "stored layout unusable; starting empty"
                );
                WindowManagerState::new(live)
            }
        }
    }
}
