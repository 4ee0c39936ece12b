#![forbid(unsafe_code)]

//! Window manager configuration.
//!
//! A single [`WindowManagerConfig`] carries the layout thresholds and the
//! persistence settings. It can be loaded from TOML or JSON at startup;
//! every field has a default, so an empty document is a valid config.
//!
//! ```toml
//! [layout]
//! title_height = 28.0
//! neighbor_tolerance = 6.0
//!
//! [persistence]
//! key_prefix = "myapp"
//! directory = "/var/lib/myapp/layouts"
//! ```

use std::path::{Path, PathBuf};

use floatpane_layout::LayoutTuning;
use serde::{Deserialize, Serialize};

/// Default prefix of store keys.
pub const DEFAULT_KEY_PREFIX: &str = "floatpane";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowManagerConfig {
    pub layout: LayoutTuning,
    pub persistence: PersistenceConfig,
}

/// Where and whether layouts are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub enabled: bool,
    /// Store keys are `<key_prefix>:<store name>`.
    pub key_prefix: String,
    /// Directory for file storage. Without one, layouts are kept in memory
    /// for the life of the process.
    pub directory: Option<PathBuf>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            directory: None,
        }
    }
}

impl PersistenceConfig {
    /// Storage key of a named store.
    #[must_use]
    pub fn key_for(&self, store_name: &str) -> String {
        format!("{}:{store_name}", self.key_prefix)
    }
}

impl WindowManagerConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config-toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-toml")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// List every problem. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors: Vec<String> = self
            .layout
            .validate()
            .into_iter()
            .map(|e| format!("layout.{e}"))
            .collect();

        let prefix = &self.persistence.key_prefix;
        if prefix.is_empty() {
            errors.push("persistence.key_prefix must not be empty".to_string());
        } else if prefix.contains(':') {
            errors.push(format!(
                "persistence.key_prefix must not contain ':', got {prefix:?}"
            ));
        }
        errors
    }

    /// [`validate`](Self::validate) as a `Result`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors from loading a configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    #[cfg(feature = "config-toml")]
    Toml(toml::de::Error),
    Json(serde_json::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-toml")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-toml")]
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
